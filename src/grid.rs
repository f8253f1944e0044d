use crate::data::{BreakWindow, GenerationError, ALL_SECTIONS};

/// On a half-day, only slots starting before 13:30 are usable.
pub const HALF_DAY_CUTOFF_MIN: u16 = 13 * 60 + 30;

/// Structured position in the weekly grid: indices into the grid's day and
/// slot lists. Used for all internal occupancy maps; the string
/// `"Day-HH:MM-HH:MM"` form only appears in serialized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotRef {
    pub day: usize,
    pub slot: usize,
}

/// A time slot parsed into minutes since midnight.
#[derive(Debug, Clone)]
pub struct Slot {
    pub raw: String,
    pub start_min: u16,
    pub end_min: u16,
}

#[derive(Debug, Clone)]
struct ResolvedBreak {
    /// `None` applies to every day.
    day: Option<String>,
    start_min: u16,
    end_min: u16,
}

/// The weekly structure: working days, chronologically ordered slots,
/// break windows, and half-days. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct TimeGrid {
    days: Vec<String>,
    slots: Vec<Slot>,
    breaks: Vec<ResolvedBreak>,
    half_days: Vec<bool>,
}

fn parse_hhmm(text: &str) -> Option<u16> {
    let (h, m) = text.split_once(':')?;
    let h: u16 = h.parse().ok()?;
    let m: u16 = m.parse().ok()?;
    if h >= 24 || m >= 60 {
        return None;
    }
    Some(h * 60 + m)
}

fn parse_slot(raw: &str) -> Result<Slot, GenerationError> {
    let invalid = || GenerationError::InvalidTimeSlot(raw.to_string());
    let (start, end) = raw.split_once('-').ok_or_else(invalid)?;
    Ok(Slot {
        raw: raw.to_string(),
        start_min: parse_hhmm(start).ok_or_else(invalid)?,
        end_min: parse_hhmm(end).ok_or_else(invalid)?,
    })
}

impl TimeGrid {
    pub fn build(
        working_days: &[String],
        time_slots: &[String],
        breaks: &[BreakWindow],
        half_days: &[String],
    ) -> Result<Self, GenerationError> {
        let slots = time_slots
            .iter()
            .map(|raw| parse_slot(raw))
            .collect::<Result<Vec<_>, _>>()?;

        let breaks = breaks
            .iter()
            .map(|br| {
                let invalid = || {
                    GenerationError::InvalidBreak(format!(
                        "{} {}-{}",
                        br.day, br.start_time, br.end_time
                    ))
                };
                Ok(ResolvedBreak {
                    day: (br.day != ALL_SECTIONS).then(|| br.day.clone()),
                    start_min: parse_hhmm(&br.start_time).ok_or_else(invalid)?,
                    end_min: parse_hhmm(&br.end_time).ok_or_else(invalid)?,
                })
            })
            .collect::<Result<Vec<_>, GenerationError>>()?;

        let half = working_days
            .iter()
            .map(|d| half_days.contains(d))
            .collect();

        Ok(Self {
            days: working_days.to_vec(),
            slots,
            breaks,
            half_days: half,
        })
    }

    pub fn days(&self) -> &[String] {
        &self.days
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, at: SlotRef) -> &Slot {
        &self.slots[at.slot]
    }

    pub fn day_index(&self, name: &str) -> Option<usize> {
        self.days.iter().position(|d| d == name)
    }

    pub fn slot_index(&self, raw: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.raw == raw)
    }

    /// True if the slot's start time falls within a break window scoped to
    /// this day or to all days.
    pub fn is_break_time(&self, day: usize, slot: usize) -> bool {
        let start = self.slots[slot].start_min;
        self.breaks.iter().any(|br| {
            br.day.as_deref().is_none_or(|d| d == self.days[day])
                && start >= br.start_min
                && start < br.end_min
        })
    }

    pub fn is_half_day(&self, day: usize) -> bool {
        self.half_days[day]
    }

    fn within_half_day(&self, day: usize, slot: usize) -> bool {
        !self.is_half_day(day) || self.slots[slot].start_min < HALF_DAY_CUTOFF_MIN
    }

    /// True if the slot is schedulable on `day`: not a break, and before the
    /// cutoff on a half-day.
    pub fn slot_usable(&self, day: usize, slot: usize) -> bool {
        !self.is_break_time(day, slot) && self.within_half_day(day, slot)
    }

    /// Slot indices usable on `day`: break slots removed unless explicitly
    /// included, and everything at or after the cutoff removed on half-days.
    pub fn usable_slots(&self, day: usize, include_breaks: bool) -> Vec<usize> {
        (0..self.slots.len())
            .filter(|&i| {
                if include_breaks {
                    self.within_half_day(day, i)
                } else {
                    self.slot_usable(day, i)
                }
            })
            .collect()
    }

    pub fn available_slots(&self, day: usize) -> Vec<usize> {
        self.usable_slots(day, false)
    }

    /// True if slot `a` ends exactly when slot `b` starts.
    pub fn time_contiguous(&self, a: usize, b: usize) -> bool {
        self.slots[a].end_min == self.slots[b].start_min
    }

    /// Output key for a placed entry, e.g. `"Monday-09:00-10:00"`.
    pub fn slot_key(&self, at: SlotRef) -> String {
        format!("{}-{}", self.days[at.day], self.slot(at).raw)
    }
}
