use std::cmp::Reverse;

use crate::grid::{SlotRef, TimeGrid};
use crate::state::ScheduleState;

/// Prefer-early searches only consider the first slots of each day as
/// candidate block starts.
pub const EARLY_SLOTS: usize = 2;

/// One request for a contiguous run of free slots on a single day.
#[derive(Debug, Clone, Copy)]
pub struct BlockQuery<'a> {
    pub day: usize,
    pub block_size: usize,
    pub section_id: &'a str,
    pub teacher_id: &'a str,
}

/// Finds the chronologically first fully-free, time-contiguous window of
/// `block_size` slots. With `early_only`, candidate starts are limited to
/// the first two available slots of the day.
pub fn find_block(
    grid: &TimeGrid,
    state: &ScheduleState,
    query: BlockQuery,
    early_only: bool,
) -> Option<Vec<SlotRef>> {
    candidate_windows(grid, state, query, early_only).into_iter().next()
}

/// Like [`find_block`], but ranks every valid window by adjacency to the
/// section's already-placed entries and returns the best-scored one
/// (chronologically first among ties). Used on fallback passes to keep the
/// day compact.
pub fn find_block_compact(
    grid: &TimeGrid,
    state: &ScheduleState,
    query: BlockQuery,
) -> Option<Vec<SlotRef>> {
    let mut windows = candidate_windows(grid, state, query, false);
    windows.sort_by_key(|w| Reverse(window_score(grid, state, query.section_id, w)));
    windows.into_iter().next()
}

fn candidate_windows(
    grid: &TimeGrid,
    state: &ScheduleState,
    query: BlockQuery,
    early_only: bool,
) -> Vec<Vec<SlotRef>> {
    let available = grid.available_slots(query.day);
    if query.block_size == 0 || available.len() < query.block_size {
        return Vec::new();
    }

    let last_start = available.len() - query.block_size;
    let start_limit = if early_only {
        EARLY_SLOTS.min(last_start + 1)
    } else {
        last_start + 1
    };

    (0..start_limit)
        .filter_map(|i| {
            let window = &available[i..i + query.block_size];
            (time_contiguous_run(grid, window) && window_free(state, query, window)).then(|| {
                window
                    .iter()
                    .map(|&slot| SlotRef { day: query.day, slot })
                    .collect()
            })
        })
        .collect()
}

/// List-adjacent available slots may still straddle an excluded break slot;
/// a block must be contiguous by literal slot boundaries.
fn time_contiguous_run(grid: &TimeGrid, window: &[usize]) -> bool {
    window.windows(2).all(|pair| grid.time_contiguous(pair[0], pair[1]))
}

fn window_free(state: &ScheduleState, query: BlockQuery, window: &[usize]) -> bool {
    window.iter().all(|&slot| {
        let at = SlotRef { day: query.day, slot };
        state.section_free(query.section_id, at) && state.teacher_free(query.teacher_id, at)
    })
}

fn window_score(grid: &TimeGrid, state: &ScheduleState, section_id: &str, window: &[SlotRef]) -> u32 {
    let first = window[0];
    let last = window[window.len() - 1];
    let mut score = 0;
    if first.slot > 0
        && grid.time_contiguous(first.slot - 1, first.slot)
        && !state.section_free(section_id, SlotRef { day: first.day, slot: first.slot - 1 })
    {
        score += 1;
    }
    let next = last.slot + 1;
    if next < grid.slot_count()
        && grid.time_contiguous(last.slot, next)
        && !state.section_free(section_id, SlotRef { day: last.day, slot: next })
    {
        score += 1;
    }
    score
}
