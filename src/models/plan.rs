//! Supervision plan (solution) model.
//!
//! A plan is the set of teacher-to-slot assignments, plus the
//! violations detected while building or editing it. Assignments are
//! unique per (slot, teacher).

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Assignment, DateRange, DutySlot, FloorId, TeacherId};

/// A supervision plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Teacher-slot assignments.
    pub assignments: Vec<Assignment>,
    /// Problems detected in this plan.
    #[serde(default)]
    pub violations: Vec<Violation>,
}

/// A rule the plan does not satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub slot: Option<DutySlot>,
    pub teacher_id: Option<TeacherId>,
    /// Human-readable description.
    pub message: String,
}

/// Classification of plan violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// A slot has fewer teachers than its floor requires.
    Shortfall,
    /// A teacher supervises a break without an adjacent lesson.
    NoLesson,
    /// A teacher has more than one duty on a day.
    DoubleDuty,
    /// A teacher supervises two neighbouring breaks.
    ConsecutiveBreaks,
    /// A teacher exceeds their quota.
    OverTarget,
}

impl Violation {
    pub fn shortfall(slot: DutySlot, missing: u32) -> Self {
        Self {
            kind: ViolationKind::Shortfall,
            slot: Some(slot),
            teacher_id: None,
            message: format!(
                "{} break {} floor {}: {} teacher(s) missing",
                slot.date, slot.break_index, slot.floor_id, missing
            ),
        }
    }

    pub fn no_lesson(slot: DutySlot, teacher_id: TeacherId) -> Self {
        Self {
            kind: ViolationKind::NoLesson,
            slot: Some(slot),
            teacher_id: Some(teacher_id),
            message: format!(
                "teacher {} has no lesson around break {} on {}",
                teacher_id, slot.break_index, slot.date
            ),
        }
    }

    pub fn double_duty(date: NaiveDate, teacher_id: TeacherId, duties: usize) -> Self {
        Self {
            kind: ViolationKind::DoubleDuty,
            slot: None,
            teacher_id: Some(teacher_id),
            message: format!("teacher {teacher_id} has {duties} duties on {date}"),
        }
    }

    pub fn consecutive_breaks(slot: DutySlot, teacher_id: TeacherId) -> Self {
        Self {
            kind: ViolationKind::ConsecutiveBreaks,
            slot: Some(slot),
            teacher_id: Some(teacher_id),
            message: format!(
                "teacher {} supervises neighbouring breaks around break {} on {}",
                teacher_id, slot.break_index, slot.date
            ),
        }
    }

    pub fn over_target(teacher_id: TeacherId, load: u32, target: u32) -> Self {
        Self {
            kind: ViolationKind::OverTarget,
            slot: None,
            teacher_id: Some(teacher_id),
            message: format!("teacher {teacher_id} has {load} duties, quota is {target}"),
        }
    }
}

impl Plan {
    /// Creates an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an assignment. Returns `false` if it already existed.
    pub fn add_assignment(&mut self, assignment: Assignment) -> bool {
        if self.assignments.contains(&assignment) {
            return false;
        }
        self.assignments.push(assignment);
        true
    }

    /// Convenience: assigns `teacher_id` to `slot`.
    pub fn assign(&mut self, slot: DutySlot, teacher_id: TeacherId) -> bool {
        self.add_assignment(Assignment::new(slot, teacher_id))
    }

    pub fn add_violation(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Whether the plan has no violations.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    /// Violations of one kind.
    pub fn violations_of(&self, kind: ViolationKind) -> Vec<&Violation> {
        self.violations.iter().filter(|v| v.kind == kind).collect()
    }

    /// Teachers assigned to a slot, in insertion order.
    pub fn teachers_for_slot(&self, slot: &DutySlot) -> Vec<TeacherId> {
        self.assignments
            .iter()
            .filter(|a| &a.slot == slot)
            .map(|a| a.teacher_id)
            .collect()
    }

    /// Number of teachers assigned to a slot.
    pub fn assigned_count(&self, slot: &DutySlot) -> usize {
        self.assignments.iter().filter(|a| &a.slot == slot).count()
    }

    /// Whether the teacher supervises any floor during the given break.
    pub fn is_busy(&self, teacher_id: TeacherId, date: NaiveDate, break_index: u8) -> bool {
        self.assignments.iter().any(|a| {
            a.teacher_id == teacher_id && a.date() == date && a.break_index() == break_index
        })
    }

    /// Break indices a teacher supervises on a date.
    pub fn breaks_on(&self, teacher_id: TeacherId, date: NaiveDate) -> Vec<u8> {
        self.assignments
            .iter()
            .filter(|a| a.teacher_id == teacher_id && a.date() == date)
            .map(|a| a.break_index())
            .collect()
    }

    /// Duties of a teacher within a range.
    pub fn load_in(&self, teacher_id: TeacherId, range: &DateRange) -> u32 {
        self.assignments
            .iter()
            .filter(|a| a.teacher_id == teacher_id && range.contains(a.date()))
            .count() as u32
    }

    /// Duty counts for every teacher with assignments in a range.
    pub fn loads_in(&self, range: &DateRange) -> HashMap<TeacherId, u32> {
        let mut loads = HashMap::new();
        for a in self.assignments.iter().filter(|a| range.contains(a.date())) {
            *loads.entry(a.teacher_id).or_insert(0) += 1;
        }
        loads
    }

    /// Number of distinct days a teacher has duties within a range.
    pub fn days_with_duties(&self, teacher_id: TeacherId, range: &DateRange) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.teacher_id == teacher_id && range.contains(a.date()))
            .map(|a| a.date())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Assignments within a range.
    pub fn assignments_in(&self, range: &DateRange) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| range.contains(a.date()))
            .collect()
    }

    /// Removes assignments within a range. Returns how many were removed.
    pub fn clear_range(&mut self, range: &DateRange) -> usize {
        let before = self.assignments.len();
        self.assignments.retain(|a| !range.contains(a.date()));
        self.violations
            .retain(|v| v.slot.map_or(true, |s| !range.contains(s.date)));
        before - self.assignments.len()
    }

    /// Removes every assignment on a floor.
    pub fn remove_floor(&mut self, floor_id: FloorId) -> usize {
        let before = self.assignments.len();
        self.assignments.retain(|a| a.floor_id() != floor_id);
        before - self.assignments.len()
    }

    /// Removes every assignment of a teacher.
    pub fn remove_teacher(&mut self, teacher_id: TeacherId) -> usize {
        let before = self.assignments.len();
        self.assignments.retain(|a| a.teacher_id != teacher_id);
        before - self.assignments.len()
    }

    /// Sorts assignments chronologically.
    pub fn sort(&mut self) {
        self.assignments.sort();
    }
}
