//! Plan quality metrics (KPIs) and rule audit.
//!
//! Computes coverage and fairness indicators from a finished plan and its
//! inputs, and re-checks the hard rules of a plan that may have been
//! edited by hand.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Coverage | filled positions / required positions |
//! | Shortfall | Sum of max(0, required - assigned) over slots |
//! | Deviation | load - quota per teacher |
//! | Max deviation | Largest \|deviation\| of a plannable teacher |
//! | Daily excess | Sum of max(0, duties on a day - 1) |

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use super::greedy::build_slots;
use crate::models::{DateRange, Floor, Plan, Teacher, TeacherId, Violation};

/// Load of one teacher in the evaluated range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeacherLoad {
    pub teacher_id: TeacherId,
    pub load: u32,
    pub target: u32,
    /// `load - target`.
    pub deviation: i64,
}

/// Plan performance indicators.
#[derive(Debug, Clone)]
pub struct PlanKpi {
    /// Positions demanded by the floors over the range.
    pub required_positions: usize,
    /// Positions filled (capped at the requirement per slot).
    pub filled_positions: usize,
    /// Fraction of positions filled (0.0..1.0).
    pub coverage: f64,
    /// Missing positions.
    pub shortfall: usize,
    /// Per-teacher loads, ordered by teacher id.
    pub loads: Vec<TeacherLoad>,
    /// Largest absolute deviation among plannable teachers.
    pub max_deviation: u32,
    /// Duties above quota, summed.
    pub total_over: u32,
    /// Duties below quota, summed.
    pub total_under: u32,
    /// Duties beyond the first per teacher and day, summed.
    pub daily_excess: u32,
}

impl PlanKpi {
    /// Computes KPIs of `plan` restricted to `range`.
    pub fn calculate(
        plan: &Plan,
        teachers: &[Teacher],
        floors: &[Floor],
        range: &DateRange,
        breaks_per_day: u8,
    ) -> Self {
        let required: HashMap<_, _> = floors.iter().map(|f| (f.id, f.required() as usize)).collect();

        let mut required_positions = 0;
        let mut filled_positions = 0;
        for slot in build_slots(floors, range, breaks_per_day) {
            let need = required.get(&slot.floor_id).copied().unwrap_or(1);
            required_positions += need;
            filled_positions += plan.assigned_count(&slot).min(need);
        }

        let loads_by_teacher = plan.loads_in(range);
        let mut loads: Vec<TeacherLoad> = teachers
            .iter()
            .filter(|t| t.is_plannable() || loads_by_teacher.contains_key(&t.id))
            .map(|t| {
                let load = loads_by_teacher.get(&t.id).copied().unwrap_or(0);
                TeacherLoad {
                    teacher_id: t.id,
                    load,
                    target: t.target_duties,
                    deviation: i64::from(load) - i64::from(t.target_duties),
                }
            })
            .collect();
        loads.sort_by_key(|l| l.teacher_id);

        let plannable: HashMap<TeacherId, bool> =
            teachers.iter().map(|t| (t.id, t.is_plannable())).collect();
        let max_deviation = loads
            .iter()
            .filter(|l| plannable.get(&l.teacher_id).copied().unwrap_or(false))
            .map(|l| l.deviation.unsigned_abs() as u32)
            .max()
            .unwrap_or(0);
        let total_over = loads.iter().map(|l| l.deviation.max(0) as u32).sum();
        let total_under = loads
            .iter()
            .filter(|l| plannable.get(&l.teacher_id).copied().unwrap_or(false))
            .map(|l| (-l.deviation).max(0) as u32)
            .sum();

        let daily_excess = duties_per_day(plan, range)
            .values()
            .map(|&n| n.saturating_sub(1))
            .sum();

        let coverage = if required_positions == 0 {
            1.0
        } else {
            filled_positions as f64 / required_positions as f64
        };

        Self {
            required_positions,
            filled_positions,
            coverage,
            shortfall: required_positions - filled_positions,
            loads,
            max_deviation,
            total_over,
            total_under,
            daily_excess,
        }
    }

    /// Whether the plan meets the given quality thresholds.
    pub fn meets_thresholds(&self, min_coverage: f64, max_deviation: u32) -> bool {
        self.coverage >= min_coverage && self.max_deviation <= max_deviation
    }
}

fn duties_per_day(plan: &Plan, range: &DateRange) -> BTreeMap<(TeacherId, NaiveDate), u32> {
    let mut per_day = BTreeMap::new();
    for a in plan.assignments_in(range) {
        *per_day.entry((a.teacher_id, a.date())).or_insert(0) += 1;
    }
    per_day
}

/// Re-checks the hard rules for every assignment in `range`.
///
/// Reports assignments without an adjacent lesson, teachers with more
/// than one duty on a day, neighbouring breaks and loads above quota.
/// Shortfalls are not reported here.
pub fn audit_plan(plan: &Plan, teachers: &[Teacher], range: &DateRange) -> Vec<Violation> {
    let by_id: HashMap<TeacherId, &Teacher> = teachers.iter().map(|t| (t.id, t)).collect();
    let mut violations = Vec::new();

    let mut assignments = plan.assignments_in(range);
    assignments.sort();

    for a in &assignments {
        let Some(teacher) = by_id.get(&a.teacher_id) else {
            continue;
        };
        let Some(weekday) = a.slot.weekday() else {
            continue;
        };
        if !teacher.is_available_for_supervision(weekday, a.break_index()) {
            violations.push(Violation::no_lesson(a.slot, a.teacher_id));
        }
        let neighbour_later = plan
            .breaks_on(a.teacher_id, a.date())
            .into_iter()
            .any(|b| b.checked_sub(1) == Some(a.break_index()));
        if neighbour_later {
            violations.push(Violation::consecutive_breaks(a.slot, a.teacher_id));
        }
    }

    for ((teacher_id, date), n) in duties_per_day(plan, range) {
        if n > 1 {
            violations.push(Violation::double_duty(date, teacher_id, n as usize));
        }
    }

    let loads = plan.loads_in(range);
    let mut over: Vec<(TeacherId, u32, u32)> = loads
        .iter()
        .filter_map(|(id, &load)| {
            let t = by_id.get(id)?;
            (t.target_duties > 0 && load > t.target_duties).then_some((*id, load, t.target_duties))
        })
        .collect();
    over.sort_unstable();
    for (id, load, target) in over {
        violations.push(Violation::over_target(id, load, target));
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DutySlot, ViolationKind, Weekday};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, day).unwrap()
    }

    fn teachers() -> Vec<Teacher> {
        vec![
            Teacher::new(1, "Anna", "Albers")
                .with_target(2)
                .with_lesson(Weekday::Monday, 1)
                .with_lesson(Weekday::Monday, 3)
                .with_lesson(Weekday::Monday, 5),
            Teacher::new(2, "Bernd", "Brandt")
                .with_target(2)
                .with_lesson(Weekday::Monday, 2),
            Teacher::new(3, "Carla", "Claus").exempted(),
        ]
    }

    #[test]
    fn test_kpi_basic() {
        let floors = vec![Floor::new(1, "EG")];
        let mut plan = Plan::new();
        plan.assign(DutySlot::new(d(2), 1, 1), 1);
        plan.assign(DutySlot::new(d(2), 2, 1), 2);

        let range = DateRange::new(d(2), d(2));
        let kpi = PlanKpi::calculate(&plan, &teachers(), &floors, &range, 2);
        assert_eq!(kpi.required_positions, 2);
        assert_eq!(kpi.filled_positions, 2);
        assert_eq!(kpi.shortfall, 0);
        assert!((kpi.coverage - 1.0).abs() < 1e-10);
        assert_eq!(kpi.max_deviation, 1);
        assert_eq!(kpi.total_under, 2);
        assert_eq!(kpi.total_over, 0);
        assert_eq!(kpi.daily_excess, 0);
        // Exempt teacher without duties is not listed.
        assert_eq!(kpi.loads.len(), 2);
    }

    #[test]
    fn test_kpi_shortfall_and_excess() {
        let floors = vec![Floor::new(1, "EG").with_required(2)];
        let mut plan = Plan::new();
        plan.assign(DutySlot::new(d(2), 1, 1), 1);
        plan.assign(DutySlot::new(d(2), 3, 1), 1);

        let range = DateRange::new(d(2), d(2));
        let kpi = PlanKpi::calculate(&plan, &teachers(), &floors, &range, 3);
        assert_eq!(kpi.required_positions, 6);
        assert_eq!(kpi.filled_positions, 2);
        assert_eq!(kpi.shortfall, 4);
        assert_eq!(kpi.daily_excess, 1);
        assert!(!kpi.meets_thresholds(0.5, 2));
        assert!(kpi.meets_thresholds(0.3, 2));
    }

    #[test]
    fn test_kpi_empty() {
        let kpi = PlanKpi::calculate(
            &Plan::new(),
            &[],
            &[],
            &DateRange::new(d(2), d(6)),
            4,
        );
        assert_eq!(kpi.required_positions, 0);
        assert!((kpi.coverage - 1.0).abs() < 1e-10);
        assert_eq!(kpi.max_deviation, 0);
    }

    #[test]
    fn test_audit_detects_rule_breaks() {
        let mut plan = Plan::new();
        plan.assign(DutySlot::new(d(2), 1, 1), 1);
        plan.assign(DutySlot::new(d(2), 2, 1), 1);
        plan.assign(DutySlot::new(d(2), 3, 1), 1);

        let violations = audit_plan(&plan, &teachers(), &DateRange::new(d(2), d(2)));
        let kinds: Vec<ViolationKind> = violations.iter().map(|v| v.kind).collect();

        // Every break touches a lesson of teacher 1; only neighbouring
        // breaks, the daily count and the quota are broken.
        assert!(!kinds.contains(&ViolationKind::NoLesson));
        assert_eq!(
            kinds.iter().filter(|k| **k == ViolationKind::ConsecutiveBreaks).count(),
            2
        );
        assert!(kinds.contains(&ViolationKind::DoubleDuty));
        assert!(kinds.contains(&ViolationKind::OverTarget));
    }

    #[test]
    fn test_audit_no_lesson() {
        let mut plan = Plan::new();
        plan.assign(DutySlot::new(d(2), 1, 1), 2);

        let violations = audit_plan(&plan, &teachers(), &DateRange::new(d(2), d(2)));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::NoLesson);
    }
}
