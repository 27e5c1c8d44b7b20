//! Optimizing planner.
//!
//! Builds a solver model from teachers, floors and a school week, solves
//! it in three lexicographic phases (coverage, floor cost, fairness) and
//! writes the result back into a [`Plan`].
//!
//! # Reference
//! Ahuja, Magnanti & Orlin (1993), "Network Flows", Ch. 9 (min-cost flow)

mod flow;
mod input;
mod solver;

pub use flow::{EdgeId, MinCostFlow};
pub use input::{
    BreakSlotSpec, SolverConfig, TeacherSpec, DEFAULT_PRIO_RANK, MAX_TIME_LIMIT_SECS,
};
pub use solver::{AssignmentDecision, BreakSupervisionSolver, SolverResult, SolverStatus};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::info;

use crate::models::duty::{after_period, before_period};
use crate::models::{DateRange, DutySlot, Floor, Plan, Teacher, Violation, Weekday};

/// Result of [`optimize_week`].
#[derive(Debug, Clone)]
pub struct OptimizeOutcome {
    /// The full plan with the week replaced.
    pub plan: Plan,
    pub result: SolverResult,
}

/// Solver view of a teacher: lessons only on days the teacher is present.
pub fn teacher_spec(teacher: &Teacher) -> TeacherSpec {
    let mut spec = TeacherSpec::new(teacher.id, teacher.target_duties)
        .with_availability_days(teacher.available_day_count() as u32);
    spec.preferred_floor = teacher.preferred_floor;
    for weekday in teacher.attendance.days() {
        let periods = teacher.periods_on(weekday);
        if !periods.is_empty() {
            spec = spec.with_periods(weekday, periods);
        }
    }
    spec
}

/// Slots of every school day in `range`, one per break.
pub fn break_slots(floors: &[Floor], range: &DateRange, breaks_per_day: u8) -> Vec<BreakSlotSpec> {
    let needs: BTreeMap<_, _> = floors.iter().map(|f| (f.id, f.required())).collect();
    let mut slots = Vec::new();
    for date in range.school_days() {
        let Some(weekday) = Weekday::of_date(date) else {
            continue;
        };
        for break_index in 1..=breaks_per_day {
            slots.push(BreakSlotSpec {
                slot_id: format!("{date}-{break_index}"),
                date,
                weekday,
                break_index,
                before_period: before_period(break_index),
                after_period: after_period(break_index),
                needs: needs.clone(),
            });
        }
    }
    slots
}

/// Plans the school week starting at `monday` with the solver.
///
/// Exempt teachers and teachers without a quota are left out. Assignments
/// outside the week are kept; uncovered positions become shortfall
/// violations.
pub fn optimize_week(
    teachers: &[Teacher],
    floors: &[Floor],
    existing: &Plan,
    monday: NaiveDate,
    breaks_per_day: u8,
    config: &SolverConfig,
) -> OptimizeOutcome {
    let range = DateRange::school_week(monday);
    let specs: Vec<TeacherSpec> = teachers
        .iter()
        .filter(|t| t.is_plannable())
        .map(teacher_spec)
        .collect();
    let slots = break_slots(floors, &range, breaks_per_day);
    let dates: BTreeMap<String, (NaiveDate, u8)> = slots
        .iter()
        .map(|s| (s.slot_id.clone(), (s.date, s.break_index)))
        .collect();

    info!(
        week = %monday,
        teachers = specs.len(),
        breaks = slots.len(),
        floors = floors.len(),
        "optimizing week"
    );
    let result = BreakSupervisionSolver::new(specs, slots, config.clone()).solve();

    let mut plan = existing.clone();
    plan.clear_range(&range);
    for a in &result.assignments {
        plan.assign(DutySlot::new(a.date, a.break_index, a.floor_id), a.teacher_id);
    }
    for ((slot_id, floor_id), missing) in &result.shortfalls {
        if let Some(&(date, break_index)) = dates.get(slot_id) {
            plan.add_violation(Violation::shortfall(
                DutySlot::new(date, break_index, *floor_id),
                *missing,
            ));
        }
    }
    plan.sort();

    OptimizeOutcome { plan, result }
}
