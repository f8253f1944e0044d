use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

// Type aliases for clarity
pub type SectionId = String;
pub type SubjectId = String;
pub type TeacherId = String;

/// Mapping scope value meaning "any section".
pub const ALL_SECTIONS: &str = "All";

/// A class-section (program + section + semester) receiving one weekly schedule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: SectionId,
    #[serde(default)]
    pub subjects: Vec<SubjectId>,
    #[serde(default)]
    pub home_room: Option<String>,
}

/// A subject with weekly hour requirements and placement preferences.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    #[serde(default)]
    pub theory_hours: u32,
    /// Lab hours are always scheduled in continuous 2-hour blocks.
    #[serde(default)]
    pub lab_hours: u32,
    /// Theory hours placed as contiguous blocks instead of scattered singles.
    #[serde(default)]
    pub is_continuous: bool,
    #[serde(default = "default_block_size")]
    pub continuous_block_size: u32,
    /// Scheduled at one identical slot across every section offering it.
    #[serde(default)]
    pub is_basket: bool,
    /// Try the first two slots of each day before falling back.
    #[serde(default)]
    pub prefer_early: bool,
}

fn default_block_size() -> u32 {
    2
}

/// A teacher with a weekly hour cap.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    pub max_load: u32,
}

/// Qualifies a teacher for a subject, optionally scoped to one section.
/// Section-specific entries take precedence over `"All"`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSubjectMapping {
    pub teacher_id: TeacherId,
    pub subject_id: SubjectId,
    #[serde(default = "default_all_sections")]
    pub section_id: SectionId,
}

fn default_all_sections() -> SectionId {
    ALL_SECTIONS.to_string()
}

/// A break window; slots whose start time falls in `[start, end)` on a
/// matching day are unusable.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakWindow {
    #[serde(default = "default_all_sections")]
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub label: String,
}

/// Fixed (teacher, day, slot) reservation pre-empting normal scheduling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounselingPeriod {
    pub teacher_id: TeacherId,
    pub day: String,
    pub time_slot: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SessionType {
    Theory,
    Lab,
    Counseling,
}

/// One placed session in a section's weekly schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// Display label, e.g. `"Physics (Theory)"`.
    pub subject: String,
    pub subject_id: SubjectId,
    pub teacher: String,
    pub teacher_id: TeacherId,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub room: String,
    /// `"i/n"` position within a contiguous block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_part: Option<String>,
}

/// The complete input for one generation run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationInput {
    pub sections: Vec<Section>,
    pub subjects: Vec<Subject>,
    pub teachers: Vec<Teacher>,
    pub mappings: Vec<TeacherSubjectMapping>,
    #[serde(default)]
    pub classrooms: Vec<String>,
    #[serde(default)]
    pub labs: Vec<String>,
    pub working_days: Vec<String>,
    /// Each `"HH:MM-HH:MM"`, in chronological order.
    pub time_slots: Vec<String>,
    #[serde(default)]
    pub breaks: Vec<BreakWindow>,
    #[serde(default)]
    pub half_days: Vec<String>,
    #[serde(default)]
    pub counseling_periods: Vec<CounselingPeriod>,
    /// Fixes the RNG for reproducible runs; fresh entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Satisfied/violated constraint summary for one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintReport {
    pub violations: Vec<String>,
    pub satisfied_constraints: Vec<String>,
    pub teacher_workload: HashMap<TeacherId, u32>,
    pub assumptions: Vec<String>,
}

/// Diagnostic entry with run-relative timestamp.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub elapsed_ms: u64,
    pub message: String,
}

/// The final output of the generator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutput {
    /// Per section, entries keyed by `"Day-HH:MM-HH:MM"`.
    pub schedule: BTreeMap<SectionId, BTreeMap<String, ScheduleEntry>>,
    pub teacher_daily_schedule: BTreeMap<TeacherId, BTreeMap<String, Vec<String>>>,
    pub constraint_report: ConstraintReport,
    pub generation_log: Vec<LogEntry>,
}

/// Rejected before any scheduling attempt; no partial schedule is produced.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    #[error("empty required inputs: {}", .0.join(", "))]
    EmptyInputs(Vec<&'static str>),
    #[error("invalid time slot {0:?}: expected \"HH:MM-HH:MM\"")]
    InvalidTimeSlot(String),
    #[error("invalid break window {0:?}: expected \"HH:MM\" bounds")]
    InvalidBreak(String),
    #[error("no teacher mapping for: {}", .0.join(", "))]
    UnmappedSubjects(Vec<String>),
}
