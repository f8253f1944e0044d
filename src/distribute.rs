use std::cmp::Reverse;
use std::collections::HashSet;

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use crate::blocks::{BlockQuery, EARLY_SLOTS, find_block, find_block_compact};
use crate::data::{ScheduleEntry, Section, SessionType, Subject, Teacher};
use crate::grid::{SlotRef, TimeGrid};
use crate::state::{RunLog, ScheduleState};

/// All labs are taught in continuous 2-hour blocks.
pub const LAB_BLOCK_SIZE: u32 = 2;

/// Read-only placement context shared by every distributor call.
#[derive(Debug, Clone, Copy)]
pub struct DistributionCtx<'a> {
    pub grid: &'a TimeGrid,
    pub classrooms: &'a [String],
    pub labs: &'a [String],
}

impl DistributionCtx<'_> {
    /// Labs rotate through the lab-room pool by block index.
    fn lab_room(&self, block: u32) -> String {
        if self.labs.is_empty() {
            "Lab-TBD".to_string()
        } else {
            self.labs[block as usize % self.labs.len()].clone()
        }
    }

    /// Theory uses the section's home room when set, else a random pick.
    fn theory_room<R: Rng>(&self, section: &Section, rng: &mut R) -> String {
        section.home_room.clone().unwrap_or_else(|| {
            self.classrooms
                .choose(rng)
                .cloned()
                .unwrap_or_else(|| "Room-TBD".to_string())
        })
    }
}

fn theory_entry(subject: &Subject, teacher: &Teacher, room: String) -> ScheduleEntry {
    ScheduleEntry {
        subject: format!("{} (Theory)", subject.name),
        subject_id: subject.id.clone(),
        teacher: teacher.name.clone(),
        teacher_id: teacher.id.clone(),
        session_type: SessionType::Theory,
        room,
        block_part: None,
    }
}

fn shuffled_days<R: Rng>(grid: &TimeGrid, rng: &mut R) -> Vec<usize> {
    let mut days: Vec<usize> = (0..grid.day_count()).collect();
    days.shuffle(rng);
    days
}

/// Find a block window for one day, honoring the subject's early preference:
/// the early-restricted pass first, then the compactness-scored fallback.
fn block_window(
    grid: &TimeGrid,
    state: &ScheduleState,
    query: BlockQuery,
    prefer_early: bool,
) -> Option<Vec<SlotRef>> {
    if prefer_early {
        find_block(grid, state, query, true).or_else(|| find_block_compact(grid, state, query))
    } else {
        find_block_compact(grid, state, query)
    }
}

/// Place all lab hours of `subject` for one section as 2-hour blocks, at most
/// one lab per day per section, never on half-days. Returns hours placed.
pub fn distribute_lab_hours<R: Rng>(
    ctx: &DistributionCtx,
    subject: &Subject,
    teacher: &Teacher,
    section: &Section,
    state: &mut ScheduleState,
    rng: &mut R,
    log: &mut RunLog,
) -> u32 {
    if subject.lab_hours == 0 {
        return 0;
    }

    let blocks_needed = subject.lab_hours.div_ceil(LAB_BLOCK_SIZE);
    let days = shuffled_days(ctx.grid, rng);
    let mut blocks_scheduled = 0;

    for block in 0..blocks_needed {
        if state.workload_of(&teacher.id) + LAB_BLOCK_SIZE > teacher.max_load {
            log.add(format!(
                "Skipped lab block {}/{} of {} in {}: would exceed max load of {}",
                block + 1,
                blocks_needed,
                subject.name,
                section.id,
                teacher.name
            ));
            break;
        }

        let mut placed = false;
        for &day in &days {
            if ctx.grid.is_half_day(day) || state.section_has_lab_on_day(&section.id, day) {
                continue;
            }
            let query = BlockQuery {
                day,
                block_size: LAB_BLOCK_SIZE as usize,
                section_id: &section.id,
                teacher_id: &teacher.id,
            };
            let Some(window) = block_window(ctx.grid, state, query, subject.prefer_early) else {
                continue;
            };

            let room = ctx.lab_room(block);
            for (i, &at) in window.iter().enumerate() {
                state.place(&section.id, at, ScheduleEntry {
                    subject: format!("{} (Lab)", subject.name),
                    subject_id: subject.id.clone(),
                    teacher: teacher.name.clone(),
                    teacher_id: teacher.id.clone(),
                    session_type: SessionType::Lab,
                    room: room.clone(),
                    block_part: Some(format!("{}/{}", i + 1, LAB_BLOCK_SIZE)),
                });
            }
            state.add_workload(&teacher.id, LAB_BLOCK_SIZE);
            blocks_scheduled += 1;
            placed = true;
            log.add(format!(
                "Placed {}-hour lab for {} in {} on {} at {}",
                LAB_BLOCK_SIZE,
                subject.name,
                section.id,
                ctx.grid.days()[day],
                room
            ));
            break;
        }

        if !placed {
            log.add(format!(
                "Could not place lab block {}/{} for {} in {}",
                block + 1,
                blocks_needed,
                subject.name,
                section.id
            ));
        }
    }

    blocks_scheduled * LAB_BLOCK_SIZE
}

/// Place all theory hours of `subject` for one section: contiguous blocks
/// plus a scattered remainder for continuous subjects, scattered singles
/// otherwise. Returns hours placed.
pub fn distribute_theory_hours<R: Rng>(
    ctx: &DistributionCtx,
    subject: &Subject,
    teacher: &Teacher,
    section: &Section,
    state: &mut ScheduleState,
    rng: &mut R,
    log: &mut RunLog,
) -> u32 {
    let hours = subject.theory_hours;
    if hours == 0 {
        return 0;
    }

    let block_size = subject.continuous_block_size;
    if !subject.is_continuous || block_size < 2 || hours < block_size {
        // hours below the block size fall through to fully scattered
        return scatter_hours(ctx, subject, teacher, section, hours, state, rng, log);
    }

    let blocks_needed = hours / block_size;
    let remaining = hours % block_size;
    let days = shuffled_days(ctx.grid, rng);
    let mut scheduled = 0;

    for block in 0..blocks_needed {
        if state.workload_of(&teacher.id) + block_size > teacher.max_load {
            log.add(format!(
                "Skipped theory block {}/{} of {} in {}: would exceed max load of {}",
                block + 1,
                blocks_needed,
                subject.name,
                section.id,
                teacher.name
            ));
            break;
        }

        let mut placed = false;
        for &day in &days {
            let query = BlockQuery {
                day,
                block_size: block_size as usize,
                section_id: &section.id,
                teacher_id: &teacher.id,
            };
            let Some(window) = block_window(ctx.grid, state, query, subject.prefer_early) else {
                continue;
            };

            let room = ctx.theory_room(section, rng);
            for (i, &at) in window.iter().enumerate() {
                let mut entry = theory_entry(subject, teacher, room.clone());
                entry.block_part = Some(format!("{}/{}", i + 1, block_size));
                state.place(&section.id, at, entry);
            }
            state.add_workload(&teacher.id, block_size);
            scheduled += block_size;
            placed = true;
            break;
        }

        if !placed {
            log.add(format!(
                "Could not place theory block {}/{} for {} in {}",
                block + 1,
                blocks_needed,
                subject.name,
                section.id
            ));
        }
    }

    scheduled + scatter_hours(ctx, subject, teacher, section, remaining, state, rng, log)
}

/// Place `hours` single scattered hours: an early pass over the first two
/// slots of each day when preferred, then all slots ranked by compactness.
fn scatter_hours<R: Rng>(
    ctx: &DistributionCtx,
    subject: &Subject,
    teacher: &Teacher,
    section: &Section,
    hours: u32,
    state: &mut ScheduleState,
    rng: &mut R,
    log: &mut RunLog,
) -> u32 {
    let days = shuffled_days(ctx.grid, rng);
    let mut placed_hours = 0;

    for _ in 0..hours {
        if state.workload_of(&teacher.id) >= teacher.max_load {
            log.add(format!(
                "Stopped scattering {} in {}: {} reached max load",
                subject.name, section.id, teacher.name
            ));
            break;
        }

        let slot = scatter_slot(ctx, subject, teacher, section, &days, state, rng);
        let Some(at) = slot else { break };

        let room = ctx.theory_room(section, rng);
        state.place(&section.id, at, theory_entry(subject, teacher, room));
        state.add_workload(&teacher.id, 1);
        placed_hours += 1;
    }

    placed_hours
}

fn scatter_slot<R: Rng>(
    ctx: &DistributionCtx,
    subject: &Subject,
    teacher: &Teacher,
    section: &Section,
    days: &[usize],
    state: &ScheduleState,
    rng: &mut R,
) -> Option<SlotRef> {
    if subject.prefer_early {
        for &day in days {
            for &slot in ctx.grid.available_slots(day).iter().take(EARLY_SLOTS) {
                let at = SlotRef { day, slot };
                if state.can_place_subject(&section.id, &teacher.id, &subject.id, at) {
                    return Some(at);
                }
            }
        }
    }

    for &day in days {
        let mut slots = ctx.grid.available_slots(day);
        slots.shuffle(rng);
        slots.sort_by_key(|&slot| {
            Reverse(state.compactness_score(ctx.grid, &section.id, SlotRef { day, slot }))
        });
        for &slot in &slots {
            let at = SlotRef { day, slot };
            if state.can_place_subject(&section.id, &teacher.id, &subject.id, at) {
                return Some(at);
            }
        }
    }

    None
}

/// Place a basket subject's theory hours at one identical slot across every
/// participating section, with a room free in all of them. Returns hours
/// placed (one per simultaneous slot).
pub fn distribute_basket_hours<R: Rng>(
    ctx: &DistributionCtx,
    subject: &Subject,
    teacher: &Teacher,
    sections: &[&Section],
    state: &mut ScheduleState,
    rng: &mut R,
    log: &mut RunLog,
) -> u32 {
    let hours = subject.theory_hours;
    if hours == 0 || sections.is_empty() {
        return 0;
    }

    let days = shuffled_days(ctx.grid, rng);
    let mut placed_hours = 0;

    for hour in 0..hours {
        if state.workload_of(&teacher.id) >= teacher.max_load {
            log.add(format!(
                "Stopped basket {}: {} reached max load",
                subject.name, teacher.name
            ));
            break;
        }

        let Some(at) = basket_slot(ctx, subject, teacher, sections, &days, state, rng) else {
            log.add(format!(
                "No simultaneous free slot found for hour {} of {}",
                hour + 1,
                subject.name
            ));
            break;
        };

        let room = basket_room(ctx, state, at, rng);
        for section in sections {
            state.place(&section.id, at, theory_entry(subject, teacher, room.clone()));
        }
        state.add_workload(&teacher.id, 1);
        placed_hours += 1;
        log.add(format!(
            "Placed basket {} across {} sections on {} at {}",
            subject.name,
            sections.len(),
            ctx.grid.days()[at.day],
            room
        ));
    }

    placed_hours
}

fn basket_slot<R: Rng>(
    ctx: &DistributionCtx,
    subject: &Subject,
    teacher: &Teacher,
    sections: &[&Section],
    days: &[usize],
    state: &ScheduleState,
    rng: &mut R,
) -> Option<SlotRef> {
    let feasible = |at: SlotRef| {
        sections
            .iter()
            .all(|s| state.can_place_subject(&s.id, &teacher.id, &subject.id, at))
    };

    if subject.prefer_early {
        for &day in days {
            for &slot in ctx.grid.available_slots(day).iter().take(EARLY_SLOTS) {
                let at = SlotRef { day, slot };
                if feasible(at) {
                    return Some(at);
                }
            }
        }
    }

    // fallback: rank by summed compactness over all participating sections
    for &day in days {
        let mut slots = ctx.grid.available_slots(day);
        slots.shuffle(rng);
        slots.sort_by_key(|&slot| {
            let at = SlotRef { day, slot };
            let total: u32 = sections
                .iter()
                .map(|s| state.compactness_score(ctx.grid, &s.id, at))
                .sum();
            Reverse(total)
        });
        for &slot in &slots {
            let at = SlotRef { day, slot };
            if feasible(at) {
                return Some(at);
            }
        }
    }

    None
}

/// A room for a simultaneous session must be free in every section at that
/// instant: the classroom pool minus any room in use anywhere at the slot.
fn basket_room<R: Rng>(
    ctx: &DistributionCtx,
    state: &ScheduleState,
    at: SlotRef,
    rng: &mut R,
) -> String {
    let in_use: HashSet<&str> = state
        .sections()
        .filter_map(|(_, entries)| entries.get(&at))
        .map(|entry| entry.room.as_str())
        .collect();
    let free: Vec<&String> = ctx
        .classrooms
        .iter()
        .filter(|room| !in_use.contains(room.as_str()))
        .collect();
    free.choose(rng)
        .map(|room| (*room).clone())
        .unwrap_or_else(|| "Room-TBD".to_string())
}
