use std::collections::{HashMap, HashSet};
use std::time::Instant;

use log::debug;

use crate::data::{LogEntry, ScheduleEntry, SectionId, SessionType, TeacherId};
use crate::grid::{SlotRef, TimeGrid};

/// Ordered diagnostic log captured during a run, timestamped relative to run
/// start. Entries are also forwarded to the `log` facade.
#[derive(Debug)]
pub struct RunLog {
    started: Instant,
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self { started: Instant::now(), entries: Vec::new() }
    }

    pub fn add(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("{message}");
        self.entries.push(LogEntry {
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            message,
        });
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

/// Mutable state of one generation run: per-section entries, per-teacher
/// occupancy, workload counters, and counseling reservations. Owned by the
/// orchestrator, passed down to the distributors by reference, and frozen
/// into the output once generation completes.
#[derive(Debug, Default)]
pub struct ScheduleState {
    schedule: HashMap<SectionId, HashMap<SlotRef, ScheduleEntry>>,
    teacher_busy: HashMap<TeacherId, HashSet<SlotRef>>,
    workload: HashMap<TeacherId, u32>,
    counseling: HashMap<TeacherId, HashSet<SlotRef>>,
}

impl ScheduleState {
    pub fn new<'a>(
        section_ids: impl IntoIterator<Item = &'a str>,
        teacher_ids: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut state = Self::default();
        for id in section_ids {
            state.schedule.insert(id.to_string(), HashMap::new());
        }
        for id in teacher_ids {
            state.teacher_busy.insert(id.to_string(), HashSet::new());
            state.workload.insert(id.to_string(), 0);
        }
        state
    }

    pub fn reserve_counseling(&mut self, teacher_id: &str, at: SlotRef) {
        self.counseling
            .entry(teacher_id.to_string())
            .or_default()
            .insert(at);
    }

    pub fn is_counseling_slot(&self, teacher_id: &str, at: SlotRef) -> bool {
        self.counseling
            .get(teacher_id)
            .is_some_and(|slots| slots.contains(&at))
    }

    pub fn entry(&self, section_id: &str, at: SlotRef) -> Option<&ScheduleEntry> {
        self.schedule.get(section_id)?.get(&at)
    }

    pub fn section_free(&self, section_id: &str, at: SlotRef) -> bool {
        self.entry(section_id, at).is_none()
    }

    pub fn teacher_free(&self, teacher_id: &str, at: SlotRef) -> bool {
        let busy = self
            .teacher_busy
            .get(teacher_id)
            .is_some_and(|slots| slots.contains(&at));
        !busy && !self.is_counseling_slot(teacher_id, at)
    }

    /// True if the section already holds any entry for `subject_id` on `day`.
    /// Scattered subjects are capped at one hour per day per section.
    pub fn subject_on_day(&self, section_id: &str, subject_id: &str, day: usize) -> bool {
        self.section_entries(section_id).is_some_and(|entries| {
            entries
                .iter()
                .any(|(at, e)| at.day == day && e.subject_id == subject_id)
        })
    }

    pub fn section_has_lab_on_day(&self, section_id: &str, day: usize) -> bool {
        self.section_entries(section_id).is_some_and(|entries| {
            entries
                .iter()
                .any(|(at, e)| at.day == day && e.session_type == SessionType::Lab)
        })
    }

    /// The full placement feasibility test for a single scattered hour.
    pub fn can_place_subject(
        &self,
        section_id: &str,
        teacher_id: &str,
        subject_id: &str,
        at: SlotRef,
    ) -> bool {
        self.section_free(section_id, at)
            && self.teacher_free(teacher_id, at)
            && !self.subject_on_day(section_id, subject_id, at.day)
    }

    /// Number of already-placed entries time-adjacent to `at` for this
    /// section. Higher means less fragmentation if placed here.
    pub fn compactness_score(&self, grid: &TimeGrid, section_id: &str, at: SlotRef) -> u32 {
        let mut score = 0;
        if at.slot > 0
            && grid.time_contiguous(at.slot - 1, at.slot)
            && !self.section_free(section_id, SlotRef { day: at.day, slot: at.slot - 1 })
        {
            score += 1;
        }
        let next = at.slot + 1;
        if next < grid.slot_count()
            && grid.time_contiguous(at.slot, next)
            && !self.section_free(section_id, SlotRef { day: at.day, slot: next })
        {
            score += 1;
        }
        score
    }

    /// Insert an entry and mark the teacher occupied. Workload accounting is
    /// the caller's responsibility.
    pub fn place(&mut self, section_id: &str, at: SlotRef, entry: ScheduleEntry) {
        self.teacher_busy
            .entry(entry.teacher_id.clone())
            .or_default()
            .insert(at);
        self.schedule
            .entry(section_id.to_string())
            .or_default()
            .insert(at, entry);
    }

    pub fn add_workload(&mut self, teacher_id: &str, hours: u32) {
        *self.workload.entry(teacher_id.to_string()).or_insert(0) += hours;
    }

    pub fn workload_of(&self, teacher_id: &str) -> u32 {
        self.workload.get(teacher_id).copied().unwrap_or(0)
    }

    pub fn workload(&self) -> &HashMap<TeacherId, u32> {
        &self.workload
    }

    pub fn section_entries(&self, section_id: &str) -> Option<&HashMap<SlotRef, ScheduleEntry>> {
        self.schedule.get(section_id)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&SectionId, &HashMap<SlotRef, ScheduleEntry>)> {
        self.schedule.iter()
    }

    pub fn teacher_slots(&self, teacher_id: &str) -> Option<&HashSet<SlotRef>> {
        self.teacher_busy.get(teacher_id)
    }
}
