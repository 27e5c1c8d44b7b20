//! Greedy, multi-stage supervision planner.
//!
//! # Algorithm
//!
//! 1. Build every slot of the range (school day × break × floor) and drop
//!    the range's previous assignments.
//! 2. Walk the slots chronologically. Each open position goes to the best
//!    candidate under the full rule set (primary pick).
//! 3. Positions nobody qualifies for are retried with relaxed rules:
//!    - fallback 1: same hard rules, simpler ranking
//!    - fallback 2: more than two duties per day allowed
//!    - fallback 3: quotas ignored
//!
//! Presence, the adjacent-lesson rule and the ban on neighbouring breaks
//! hold at every stage.
//!
//! # Complexity
//! O(s * t * a) where s=slots, t=teachers, a=assignments in the range.

use std::cmp::Ordering;
use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, warn};

use crate::models::duty::{relevant_periods, DEFAULT_BREAKS_PER_DAY, MAX_BREAKS_PER_DAY};
use crate::models::{
    DateRange, DutySlot, Floor, FloorId, Plan, Teacher, TeacherId, Violation, Weekday,
};

/// Hard daily limit during the primary pick and fallback 1.
const MAX_DUTIES_PER_DAY: usize = 2;

/// Result of a planning run.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// The full plan: untouched assignments outside the range plus the new ones.
    pub plan: Plan,
    pub stats: PlanStats,
}

/// Counters of a planning run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanStats {
    /// Slots in the planned range.
    pub slots: usize,
    /// Positions demanded by the floors' contingents.
    pub required_positions: usize,
    /// Positions filled.
    pub filled_positions: usize,
    /// Positions filled by fallback 1, 2 and 3.
    pub fallback_assignments: [usize; 3],
    /// Slots left with fewer teachers than required.
    pub unfilled_slots: usize,
    /// Teachers that took part in planning.
    pub eligible_teachers: usize,
}

/// Relaxation level used after the primary pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    /// Quotas and the daily limit still apply.
    Relaxed,
    /// The daily limit is lifted.
    NoDailyLimit,
    /// Quotas are ignored.
    Emergency,
}

impl Fallback {
    const ALL: [Fallback; 3] = [Fallback::Relaxed, Fallback::NoDailyLimit, Fallback::Emergency];

    fn level(self) -> usize {
        match self {
            Fallback::Relaxed => 1,
            Fallback::NoDailyLimit => 2,
            Fallback::Emergency => 3,
        }
    }
}

/// Preference of a teacher relative to a floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PreferenceGroup {
    Preferred,
    Neutral,
    Conflicting,
}

impl PreferenceGroup {
    fn of(teacher: &Teacher, floor_id: FloorId) -> Self {
        match teacher.preferred_floor {
            Some(f) if f == floor_id => PreferenceGroup::Preferred,
            None => PreferenceGroup::Neutral,
            Some(_) => PreferenceGroup::Conflicting,
        }
    }
}

/// Greedy supervision planner.
///
/// # Example
///
/// ```
/// use aufsichtsplan::models::{DateRange, Floor, Plan, Teacher, Weekday};
/// use aufsichtsplan::scheduler::GreedyPlanner;
/// use chrono::NaiveDate;
///
/// let floors = vec![Floor::new(1, "EG")];
/// let teachers = vec![
///     Teacher::new(1, "Anna", "Albers")
///         .with_abbreviation("ALB")
///         .with_target(1)
///         .with_lesson(Weekday::Monday, 1),
/// ];
/// let monday = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
/// let range = DateRange::new(monday, monday);
///
/// let planner = GreedyPlanner::new().with_breaks_per_day(1).with_seed(7);
/// let outcome = planner.plan(&teachers, &floors, &Plan::new(), range);
/// assert_eq!(outcome.plan.assignment_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct GreedyPlanner {
    breaks_per_day: u8,
    seed: Option<u64>,
}

impl GreedyPlanner {
    /// Creates a planner for four breaks per day with a random seed.
    pub fn new() -> Self {
        Self {
            breaks_per_day: DEFAULT_BREAKS_PER_DAY,
            seed: None,
        }
    }

    /// Sets the number of supervised breaks per day, clamped to
    /// `1..=MAX_BREAKS_PER_DAY`.
    pub fn with_breaks_per_day(mut self, breaks_per_day: u8) -> Self {
        self.breaks_per_day = breaks_per_day.clamp(1, MAX_BREAKS_PER_DAY);
        self
    }

    /// Fixes the seed of the per-run tie-break bias.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Optionally fixes the seed.
    pub fn with_optional_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Plans `range`, keeping assignments of `existing` outside it.
    pub fn plan(
        &self,
        teachers: &[Teacher],
        floors: &[Floor],
        existing: &Plan,
        range: DateRange,
    ) -> PlanOutcome {
        let mut plan = existing.clone();
        plan.clear_range(&range);

        let mut eligible: Vec<&Teacher> = teachers.iter().filter(|t| t.is_plannable()).collect();
        eligible.sort_by_key(|t| t.id);
        for t in teachers.iter().filter(|t| !t.is_plannable()) {
            debug!(
                teacher = %t.display_label(),
                exempt = t.exempt,
                target = t.target_duties,
                "teacher not considered by the planner"
            );
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let bias: HashMap<TeacherId, f64> =
            eligible.iter().map(|t| (t.id, rng.random::<f64>())).collect();

        let required: HashMap<FloorId, usize> =
            floors.iter().map(|f| (f.id, f.required() as usize)).collect();
        let slots = build_slots(floors, &range, self.breaks_per_day);

        let mut stats = PlanStats {
            slots: slots.len(),
            required_positions: slots
                .iter()
                .map(|s| required.get(&s.floor_id).copied().unwrap_or(1))
                .sum(),
            eligible_teachers: eligible.len(),
            ..PlanStats::default()
        };

        let mut run = Run {
            eligible,
            plan,
            counts: HashMap::new(),
            bias,
            range,
            breaks_per_day: self.breaks_per_day,
        };

        if run.eligible.is_empty() {
            warn!("no teachers with a duty quota available for planning");
        } else {
            info!(
                teachers = run.eligible.len(),
                slots = slots.len(),
                "planning supervision duties"
            );
        }

        let mut unassigned: Vec<DutySlot> = Vec::new();
        for slot in &slots {
            let need = required.get(&slot.floor_id).copied().unwrap_or(1);
            let needed = need.saturating_sub(run.plan.assigned_count(slot));
            for _ in 0..needed {
                match run.primary_pick(slot) {
                    Some(teacher_id) => {
                        run.assign(*slot, teacher_id);
                        stats.filled_positions += 1;
                    }
                    None => {
                        unassigned.push(*slot);
                        break;
                    }
                }
            }
        }

        if !unassigned.is_empty() {
            debug!(
                open_slots = unassigned.len(),
                "slots left open, starting fallback stages"
            );
        }
        for stage in Fallback::ALL {
            if unassigned.is_empty() {
                break;
            }
            unassigned.retain(|slot| {
                let need = required.get(&slot.floor_id).copied().unwrap_or(1);
                while run.plan.assigned_count(slot) < need {
                    let Some(teacher_id) = run.fallback_pick(slot, stage) else {
                        return true;
                    };
                    run.assign(*slot, teacher_id);
                    stats.filled_positions += 1;
                    stats.fallback_assignments[stage.level() - 1] += 1;
                    warn!(
                        stage = stage.level(),
                        date = %slot.date,
                        break_index = slot.break_index,
                        floor = slot.floor_id,
                        teacher = teacher_id,
                        "position filled by fallback"
                    );
                }
                false
            });
        }

        for slot in &slots {
            let need = required.get(&slot.floor_id).copied().unwrap_or(1);
            let have = run.plan.assigned_count(slot);
            if have < need {
                stats.unfilled_slots += 1;
                error!(
                    date = %slot.date,
                    break_index = slot.break_index,
                    floor = slot.floor_id,
                    missing = need - have,
                    "slot could not be filled"
                );
                run.plan
                    .add_violation(Violation::shortfall(*slot, (need - have) as u32));
            }
        }

        run.log_summary();
        run.plan.sort();

        PlanOutcome {
            plan: run.plan,
            stats,
        }
    }
}

impl Default for GreedyPlanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Slots of a range in chronological order.
pub fn build_slots(floors: &[Floor], range: &DateRange, breaks_per_day: u8) -> Vec<DutySlot> {
    let mut floor_ids: Vec<FloorId> = floors.iter().map(|f| f.id).collect();
    floor_ids.sort_unstable();

    let mut slots = Vec::new();
    for date in range.school_days() {
        for break_index in 1..=breaks_per_day {
            for &floor_id in &floor_ids {
                slots.push(DutySlot::new(date, break_index, floor_id));
            }
        }
    }
    slots
}

/// Ranking key of the primary pick; compared lexicographically, lower wins.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
struct PrimaryKey {
    future_options: u32,
    distribution: f64,
    load_ratio: f64,
    assigned: u32,
    bias: f64,
}

/// Ranking key of fallback 3; lower wins.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
struct EmergencyKey {
    at_or_over_target: u8,
    load_ratio: f64,
    duties_today: usize,
    assigned: u32,
    teacher_id: TeacherId,
}

struct Candidate<'a> {
    teacher: &'a Teacher,
    duties_today: usize,
    breaks_today: Vec<u8>,
}

struct Run<'a> {
    eligible: Vec<&'a Teacher>,
    plan: Plan,
    counts: HashMap<TeacherId, u32>,
    bias: HashMap<TeacherId, f64>,
    range: DateRange,
    breaks_per_day: u8,
}

impl<'a> Run<'a> {
    fn assigned(&self, teacher_id: TeacherId) -> u32 {
        self.counts.get(&teacher_id).copied().unwrap_or(0)
    }

    fn assign(&mut self, slot: DutySlot, teacher_id: TeacherId) {
        if self.plan.assign(slot, teacher_id) {
            *self.counts.entry(teacher_id).or_insert(0) += 1;
        }
    }

    fn primary_pick(&self, slot: &DutySlot) -> Option<TeacherId> {
        let weekday = slot.weekday()?;
        let mut excluded: Vec<String> = Vec::new();
        let mut candidates: Vec<Candidate<'a>> = Vec::new();

        for &t in &self.eligible {
            let label = t.display_label();
            if self.plan.is_busy(t.id, slot.date, slot.break_index) {
                excluded.push(format!("{label}: already on duty this break"));
                continue;
            }
            if !t.is_available_on_weekday(weekday) {
                excluded.push(format!("{label}: not present on {weekday}"));
                continue;
            }
            if !t.is_available_for_supervision(weekday, slot.break_index) {
                excluded.push(format!(
                    "{label}: no lesson in periods {:?}",
                    relevant_periods(slot.break_index)
                ));
                continue;
            }
            let assigned = self.assigned(t.id);
            if assigned >= t.target_duties {
                excluded.push(format!(
                    "{label}: quota reached ({assigned}/{})",
                    t.target_duties
                ));
                continue;
            }

            let breaks_today = self.plan.breaks_on(t.id, slot.date);
            if has_neighbouring_break(&breaks_today, slot.break_index) {
                continue;
            }
            if breaks_today.len() >= MAX_DUTIES_PER_DAY {
                continue;
            }
            candidates.push(Candidate {
                teacher: t,
                duties_today: breaks_today.len(),
                breaks_today,
            });
        }

        if candidates.is_empty() {
            if !excluded.is_empty() {
                debug!(
                    date = %slot.date,
                    break_index = slot.break_index,
                    floor = slot.floor_id,
                    reasons = ?excluded.iter().take(5).collect::<Vec<_>>(),
                    "no candidates for slot"
                );
            }
            return None;
        }

        // Teachers without a duty today always win over those with one.
        let has_fresh = candidates.iter().any(|c| c.duties_today == 0);
        if has_fresh {
            candidates.retain(|c| c.duties_today == 0);
        }

        let mut order: Vec<(PreferenceGroup, bool)> = Vec::new();
        for group in [
            PreferenceGroup::Preferred,
            PreferenceGroup::Neutral,
            PreferenceGroup::Conflicting,
        ] {
            order.push((group, false));
            if !has_fresh {
                order.push((group, true));
            }
        }

        for (group, busy_today) in order {
            let best = candidates
                .iter()
                .filter(|c| {
                    PreferenceGroup::of(c.teacher, slot.floor_id) == group
                        && (c.duties_today > 0) == busy_today
                })
                .map(|c| (c, self.primary_key(c, slot, weekday)))
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

            if let Some((chosen, _)) = best {
                if group == PreferenceGroup::Conflicting {
                    info!(
                        teacher = %chosen.teacher.display_label(),
                        preferred = ?chosen.teacher.preferred_floor,
                        floor = slot.floor_id,
                        "assigned outside preferred floor for lack of alternatives"
                    );
                }
                return Some(chosen.teacher.id);
            }
        }

        None
    }

    fn primary_key(&self, c: &Candidate<'_>, slot: &DutySlot, weekday: Weekday) -> PrimaryKey {
        let t = c.teacher;
        let assigned = self.assigned(t.id);
        let load_ratio = assigned as f64 / t.target_duties.max(1) as f64;
        let same_day_penalty = c.duties_today as f64 * 5.0;

        let days_with_duties = self.plan.days_with_duties(t.id, &self.range);
        let available_days = t.available_day_count();
        let part_time_bonus = match available_days {
            0..=2 => -2.0,
            3 => -1.0,
            4 => -0.5,
            _ => 0.0,
        };
        let day_distribution = days_with_duties as f64 / available_days.max(1) as f64;
        let floor_bonus = if t.preferred_floor == Some(slot.floor_id) {
            -0.8
        } else {
            0.0
        };

        let future_options = (slot.break_index.saturating_add(1)..=self.breaks_per_day)
            .filter(|&future| {
                !has_neighbouring_break(&c.breaks_today, future)
                    && t.is_available_for_supervision(weekday, future)
            })
            .count() as u32;

        PrimaryKey {
            future_options,
            distribution: day_distribution + floor_bonus + part_time_bonus,
            load_ratio: load_ratio + same_day_penalty,
            assigned,
            bias: self.bias.get(&t.id).copied().unwrap_or(0.0),
        }
    }

    fn fallback_pick(&self, slot: &DutySlot, stage: Fallback) -> Option<TeacherId> {
        let weekday = slot.weekday()?;

        let mut candidates: Vec<Candidate<'a>> = Vec::new();
        for &t in &self.eligible {
            if self.plan.is_busy(t.id, slot.date, slot.break_index) {
                continue;
            }
            if stage != Fallback::Emergency && self.assigned(t.id) >= t.target_duties {
                continue;
            }
            if !t.is_available_on_weekday(weekday)
                || !t.is_available_for_supervision(weekday, slot.break_index)
            {
                continue;
            }
            let breaks_today = self.plan.breaks_on(t.id, slot.date);
            if stage == Fallback::Relaxed && breaks_today.len() >= MAX_DUTIES_PER_DAY {
                continue;
            }
            if has_neighbouring_break(&breaks_today, slot.break_index) {
                continue;
            }
            candidates.push(Candidate {
                teacher: t,
                duties_today: breaks_today.len(),
                breaks_today,
            });
        }

        for group in [
            PreferenceGroup::Preferred,
            PreferenceGroup::Neutral,
            PreferenceGroup::Conflicting,
        ] {
            let pool: Vec<&Candidate<'a>> = candidates
                .iter()
                .filter(|c| PreferenceGroup::of(c.teacher, slot.floor_id) == group)
                .collect();
            if pool.is_empty() {
                continue;
            }
            let fresh: Vec<&Candidate<'a>> =
                pool.iter().copied().filter(|c| c.duties_today == 0).collect();
            let pool = if fresh.is_empty() { pool } else { fresh };

            let chosen = match stage {
                Fallback::Relaxed | Fallback::NoDailyLimit => pool
                    .into_iter()
                    .min_by_key(|c| (self.assigned(c.teacher.id), c.teacher.id)),
                Fallback::Emergency => pool
                    .into_iter()
                    .map(|c| (c, self.emergency_key(c)))
                    .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
                    .map(|(c, _)| c),
            };

            if let Some(c) = chosen {
                if group == PreferenceGroup::Conflicting {
                    warn!(
                        stage = stage.level(),
                        teacher = %c.teacher.display_label(),
                        preferred = ?c.teacher.preferred_floor,
                        floor = slot.floor_id,
                        "fallback overrides floor preference"
                    );
                }
                return Some(c.teacher.id);
            }
        }
        None
    }

    fn emergency_key(&self, c: &Candidate<'_>) -> EmergencyKey {
        let t = c.teacher;
        let assigned = self.assigned(t.id);
        let (at_or_over_target, load_ratio) = if t.target_duties > 0 {
            (
                u8::from(assigned >= t.target_duties),
                assigned as f64 / t.target_duties as f64,
            )
        } else {
            (1, assigned as f64)
        };
        EmergencyKey {
            at_or_over_target,
            load_ratio,
            duties_today: c.duties_today,
            assigned,
            teacher_id: t.id,
        }
    }

    fn log_summary(&self) {
        let mut under = Vec::new();
        let mut reached = 0usize;
        for t in &self.eligible {
            let count = self.assigned(t.id);
            if count < t.target_duties {
                under.push((t, count));
            } else {
                reached += 1;
            }
        }
        under.sort_by_key(|(t, _)| t.available_day_count());
        for (t, count) in under.iter().take(5) {
            info!(
                teacher = %t.display_label(),
                assigned = count,
                target = t.target_duties,
                attendance = %t.attendance,
                "below quota"
            );
        }
        info!(
            below_quota = under.len(),
            quota_reached = reached,
            "planning finished"
        );
    }
}

fn has_neighbouring_break(breaks_today: &[u8], break_index: u8) -> bool {
    breaks_today
        .iter()
        .any(|&b| b.abs_diff(break_index) == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attendance, ViolationKind};
    use chrono::NaiveDate;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
    }

    fn one_day() -> DateRange {
        DateRange::new(monday(), monday())
    }

    fn full_day_teacher(id: TeacherId, abbr: &str, target: u32) -> Teacher {
        let mut t = Teacher::new(id, abbr, abbr)
            .with_abbreviation(abbr)
            .with_target(target);
        for day in Weekday::ALL {
            for period in 1..=7 {
                t = t.with_lesson(day, period);
            }
        }
        t
    }

    #[test]
    fn test_build_slots_skips_weekend() {
        let floors = vec![Floor::new(2, "OG"), Floor::new(1, "EG")];
        let sat = NaiveDate::from_ymd_opt(2024, 9, 7).unwrap();
        let range = DateRange::new(monday(), sat);
        let slots = build_slots(&floors, &range, 2);
        assert_eq!(slots.len(), 5 * 2 * 2);
        assert_eq!(slots[0], DutySlot::new(monday(), 1, 1));
        assert_eq!(slots[1], DutySlot::new(monday(), 1, 2));
    }

    #[test]
    fn test_single_slot_single_teacher() {
        let floors = vec![Floor::new(1, "EG")];
        let teachers = vec![full_day_teacher(1, "AAA", 1)];
        let outcome = GreedyPlanner::new()
            .with_breaks_per_day(1)
            .with_seed(1)
            .plan(&teachers, &floors, &Plan::new(), one_day());

        assert_eq!(outcome.plan.assignment_count(), 1);
        assert!(outcome.plan.is_valid());
        assert_eq!(outcome.stats.filled_positions, 1);
        assert_eq!(outcome.stats.unfilled_slots, 0);
    }

    #[test]
    fn test_requires_adjacent_lesson() {
        let floors = vec![Floor::new(1, "EG")];
        let teachers = vec![
            Teacher::new(1, "A", "A").with_target(5),
            Teacher::new(2, "B", "B")
                .with_target(5)
                .with_lesson(Weekday::Monday, 3),
        ];
        let outcome = GreedyPlanner::new()
            .with_breaks_per_day(2)
            .with_seed(1)
            .plan(&teachers, &floors, &Plan::new(), one_day());

        // Break 1 needs period 1: nobody qualifies, not even in emergency.
        let b1 = DutySlot::new(monday(), 1, 1);
        let b2 = DutySlot::new(monday(), 2, 1);
        assert!(outcome.plan.teachers_for_slot(&b1).is_empty());
        assert_eq!(outcome.plan.teachers_for_slot(&b2), vec![2]);
        assert_eq!(outcome.plan.violations_of(ViolationKind::Shortfall).len(), 1);
        assert_eq!(outcome.stats.unfilled_slots, 1);
    }

    #[test]
    fn test_exempt_and_quota_less_teachers_ignored() {
        let floors = vec![Floor::new(1, "EG")];
        let teachers = vec![
            full_day_teacher(1, "AAA", 3).exempted(),
            full_day_teacher(2, "BBB", 0),
        ];
        let outcome = GreedyPlanner::new()
            .with_seed(1)
            .plan(&teachers, &floors, &Plan::new(), one_day());

        assert_eq!(outcome.plan.assignment_count(), 0);
        assert_eq!(outcome.stats.eligible_teachers, 0);
        assert_eq!(outcome.stats.unfilled_slots, 4);
    }

    #[test]
    fn test_never_neighbouring_breaks() {
        let floors = vec![Floor::new(1, "EG")];
        let teachers = vec![full_day_teacher(1, "AAA", 10)];
        let outcome = GreedyPlanner::new()
            .with_seed(3)
            .plan(&teachers, &floors, &Plan::new(), one_day());

        let breaks = outcome.plan.breaks_on(1, monday());
        for (i, a) in breaks.iter().enumerate() {
            for b in &breaks[i + 1..] {
                assert_ne!(a.abs_diff(*b), 1, "neighbouring breaks {a} and {b}");
            }
        }
        // Breaks 1 and 3 (or 2 and 4, ...) at most: two of four positions.
        assert_eq!(breaks.len(), 2);
    }

    #[test]
    fn test_spreads_duties_across_teachers() {
        let floors = vec![Floor::new(1, "EG")];
        let teachers = vec![
            full_day_teacher(1, "AAA", 2),
            full_day_teacher(2, "BBB", 2),
        ];
        let outcome = GreedyPlanner::new()
            .with_seed(11)
            .plan(&teachers, &floors, &Plan::new(), one_day());

        let week = one_day();
        assert_eq!(outcome.plan.assignment_count(), 4);
        assert_eq!(outcome.plan.load_in(1, &week), 2);
        assert_eq!(outcome.plan.load_in(2, &week), 2);
    }

    #[test]
    fn test_preferred_floor_wins() {
        let floors = vec![Floor::new(1, "EG"), Floor::new(2, "OG")];
        let teachers = vec![
            full_day_teacher(1, "AAA", 1).with_preferred_floor(2),
            full_day_teacher(2, "BBB", 1).with_preferred_floor(1),
        ];
        let outcome = GreedyPlanner::new()
            .with_breaks_per_day(1)
            .with_seed(5)
            .plan(&teachers, &floors, &Plan::new(), one_day());

        assert_eq!(
            outcome.plan.teachers_for_slot(&DutySlot::new(monday(), 1, 1)),
            vec![2]
        );
        assert_eq!(
            outcome.plan.teachers_for_slot(&DutySlot::new(monday(), 1, 2)),
            vec![1]
        );
    }

    #[test]
    fn test_absent_day_respected() {
        let floors = vec![Floor::new(1, "EG")];
        let teachers = vec![full_day_teacher(1, "AAA", 5)
            .with_attendance("Di,Mi".parse::<Attendance>().unwrap())];
        let outcome = GreedyPlanner::new()
            .with_breaks_per_day(1)
            .with_seed(2)
            .plan(&teachers, &floors, &Plan::new(), one_day());
        assert_eq!(outcome.plan.assignment_count(), 0);
    }

    #[test]
    fn test_emergency_fallback_exceeds_quota() {
        let floors = vec![Floor::new(1, "EG")];
        let teachers = vec![full_day_teacher(1, "AAA", 1)];
        let outcome = GreedyPlanner::new()
            .with_breaks_per_day(3)
            .with_seed(2)
            .plan(&teachers, &floors, &Plan::new(), one_day());

        // Breaks 1 and 3 are reachable without neighbouring duties.
        assert_eq!(outcome.plan.load_in(1, &one_day()), 2);
        assert_eq!(outcome.stats.fallback_assignments[2], 1);
        assert_eq!(outcome.stats.unfilled_slots, 1);
    }

    #[test]
    fn test_second_fallback_lifts_daily_limit() {
        let floors = vec![Floor::new(1, "EG")];
        let mut teacher = Teacher::new(1, "AAA", "AAA")
            .with_abbreviation("AAA")
            .with_target(5);
        for period in 1..=9 {
            teacher = teacher.with_lesson(Weekday::Monday, period);
        }
        let outcome = GreedyPlanner::new()
            .with_breaks_per_day(5)
            .with_seed(6)
            .plan(&[teacher], &floors, &Plan::new(), one_day());

        // Breaks 1 and 3 in the primary pick, break 5 only once two duties
        // a day are no longer a limit; 2 and 4 neighbour existing duties.
        assert_eq!(outcome.plan.breaks_on(1, monday()), vec![1, 3, 5]);
        assert_eq!(outcome.stats.fallback_assignments, [0, 1, 0]);
        assert_eq!(outcome.stats.unfilled_slots, 2);
    }

    #[test]
    fn test_fallback_pick_stages() {
        let long_day = |id: TeacherId, abbr: &str| {
            let mut t = Teacher::new(id, abbr, abbr)
                .with_abbreviation(abbr)
                .with_target(5);
            for period in 1..=11 {
                t = t.with_lesson(Weekday::Monday, period);
            }
            t
        };
        let teachers = vec![long_day(1, "AAA"), long_day(2, "BBB").with_preferred_floor(2)];
        let week = DateRange::school_week(monday());
        let mut plan = Plan::new();
        plan.assign(DutySlot::new(monday(), 1, 1), 1);
        plan.assign(DutySlot::new(monday(), 3, 1), 1);

        let run = Run {
            eligible: teachers.iter().collect(),
            counts: plan.loads_in(&week),
            plan,
            bias: HashMap::new(),
            range: week,
            breaks_per_day: 6,
        };

        // AAA neighbours its own duties around break 2 at every stage.
        let between = DutySlot::new(monday(), 2, 1);
        assert_eq!(run.fallback_pick(&between, Fallback::Relaxed), Some(2));
        assert_eq!(run.fallback_pick(&between, Fallback::NoDailyLimit), Some(2));

        // AAA already holds two duties: the daily limit leaves only the
        // off-preference BBB, without it the neutral AAA ranks first.
        let late = DutySlot::new(monday(), 5, 1);
        assert_eq!(run.fallback_pick(&late, Fallback::Relaxed), Some(2));
        assert_eq!(run.fallback_pick(&late, Fallback::NoDailyLimit), Some(1));
    }

    #[test]
    fn test_breaks_per_day_is_clamped() {
        let floors = vec![Floor::new(1, "EG")];
        let teachers = vec![full_day_teacher(1, "AAA", 3)];
        let outcome = GreedyPlanner::new()
            .with_breaks_per_day(200)
            .with_seed(1)
            .plan(&teachers, &floors, &Plan::new(), one_day());

        assert_eq!(outcome.stats.slots, usize::from(MAX_BREAKS_PER_DAY));
        assert!(outcome.plan.assignment_count() > 0);

        let outcome = GreedyPlanner::new()
            .with_breaks_per_day(0)
            .plan(&teachers, &floors, &Plan::new(), one_day());
        assert_eq!(outcome.stats.slots, 1);
    }

    #[test]
    fn test_contingent_fills_multiple_positions() {
        let floors = vec![Floor::new(1, "Hof").with_required(2)];
        let teachers = vec![
            full_day_teacher(1, "AAA", 1),
            full_day_teacher(2, "BBB", 1),
        ];
        let outcome = GreedyPlanner::new()
            .with_breaks_per_day(1)
            .with_seed(9)
            .plan(&teachers, &floors, &Plan::new(), one_day());

        let mut assigned = outcome
            .plan
            .teachers_for_slot(&DutySlot::new(monday(), 1, 1));
        assigned.sort();
        assert_eq!(assigned, vec![1, 2]);
        assert_eq!(outcome.stats.required_positions, 2);
    }

    #[test]
    fn test_keeps_assignments_outside_range() {
        let floors = vec![Floor::new(1, "EG")];
        let teachers = vec![full_day_teacher(1, "AAA", 1)];
        let other_week = NaiveDate::from_ymd_opt(2024, 9, 9).unwrap();
        let mut existing = Plan::new();
        existing.assign(DutySlot::new(other_week, 1, 1), 1);
        existing.assign(DutySlot::new(monday(), 2, 1), 1);

        let outcome = GreedyPlanner::new()
            .with_breaks_per_day(1)
            .with_seed(4)
            .plan(&teachers, &floors, &existing, one_day());

        assert_eq!(outcome.plan.assignment_count(), 2);
        assert_eq!(
            outcome
                .plan
                .teachers_for_slot(&DutySlot::new(other_week, 1, 1)),
            vec![1]
        );
        assert!(outcome
            .plan
            .teachers_for_slot(&DutySlot::new(monday(), 2, 1))
            .is_empty());
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let floors = vec![Floor::new(1, "EG"), Floor::new(2, "OG")];
        let teachers: Vec<Teacher> = (1..=6)
            .map(|i| full_day_teacher(i, &format!("T{i}"), 3))
            .collect();
        let week = DateRange::school_week(monday());
        let planner = GreedyPlanner::new().with_seed(42);

        let a = planner.plan(&teachers, &floors, &Plan::new(), week);
        let b = planner.plan(&teachers, &floors, &Plan::new(), week);
        assert_eq!(a.plan, b.plan);
    }
}
