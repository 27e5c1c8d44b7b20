//! Teacher model.
//!
//! Teachers are the resources of the supervision plan. Each carries a
//! duty quota (`target_duties`), an optional preferred floor, the days
//! they are present at school and the lessons imported from the
//! timetable. A teacher can only supervise a break that is adjacent to
//! one of their own lessons.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::duty::relevant_periods;
use super::{Attendance, FloorId, Weekday};

/// Teacher identifier.
pub type TeacherId = u32;

/// One taught period in the weekly timetable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Lesson {
    pub weekday: Weekday,
    pub period: u8,
}

impl Lesson {
    pub fn new(weekday: Weekday, period: u8) -> Self {
        Self { weekday, period }
    }
}

/// A teacher who can be assigned to supervision duties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    /// Unique teacher identifier.
    pub id: TeacherId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Short code used in timetables and exports (e.g. `HOO`).
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    /// Exempt teachers are never planned.
    #[serde(default)]
    pub exempt: bool,
    #[serde(default)]
    pub preferred_floor: Option<FloorId>,
    /// Duty quota for the planning period.
    #[serde(default)]
    pub target_duties: u32,
    #[serde(default)]
    pub attendance: Attendance,
    #[serde(default)]
    pub lessons: BTreeSet<Lesson>,
}

impl Teacher {
    /// Creates a teacher present every day with no quota.
    pub fn new(id: TeacherId, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            abbreviation: None,
            department: None,
            exempt: false,
            preferred_floor: None,
            target_duties: 0,
            attendance: Attendance::ALL,
            lessons: BTreeSet::new(),
        }
    }

    pub fn with_abbreviation(mut self, abbreviation: impl Into<String>) -> Self {
        self.abbreviation = Some(abbreviation.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// Marks the teacher as exempt from supervision.
    pub fn exempted(mut self) -> Self {
        self.exempt = true;
        self
    }

    pub fn with_preferred_floor(mut self, floor_id: FloorId) -> Self {
        self.preferred_floor = Some(floor_id);
        self
    }

    pub fn with_target(mut self, target_duties: u32) -> Self {
        self.target_duties = target_duties;
        self
    }

    pub fn with_attendance(mut self, attendance: Attendance) -> Self {
        self.attendance = attendance;
        self
    }

    /// Adds a taught period.
    pub fn with_lesson(mut self, weekday: Weekday, period: u8) -> Self {
        self.lessons.insert(Lesson::new(weekday, period));
        self
    }

    /// Label shown in plans: the abbreviation, else `"Last, First"`.
    pub fn display_label(&self) -> String {
        match self.abbreviation.as_deref() {
            Some(abbr) if !abbr.is_empty() => abbr.to_string(),
            _ => self.full_name(),
        }
    }

    /// `"Last, First"`.
    pub fn full_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }

    /// Code for timetable exports: the abbreviation, else the first three
    /// letters of the last name in upper case.
    pub fn export_code(&self) -> String {
        match self.abbreviation.as_deref() {
            Some(abbr) if !abbr.is_empty() => abbr.to_string(),
            _ => self
                .last_name
                .chars()
                .take(3)
                .collect::<String>()
                .to_uppercase(),
        }
    }

    /// Whether the teacher takes part in automatic planning.
    pub fn is_plannable(&self) -> bool {
        !self.exempt && self.target_duties > 0
    }

    pub fn is_available_on_weekday(&self, weekday: Weekday) -> bool {
        self.attendance.contains(weekday)
    }

    /// Number of days the teacher is present.
    pub fn available_day_count(&self) -> usize {
        self.attendance.day_count()
    }

    /// Whether the teacher teaches around the given break.
    ///
    /// Presence is not checked here; combine with
    /// [`is_available_on_weekday`](Self::is_available_on_weekday).
    pub fn is_available_for_supervision(&self, weekday: Weekday, break_index: u8) -> bool {
        relevant_periods(break_index)
            .into_iter()
            .any(|period| self.teaches(weekday, period))
    }

    /// Whether the teacher teaches either neighbouring period.
    pub fn has_adjacent_lesson(
        &self,
        weekday: Weekday,
        before_period: Option<u8>,
        after_period: Option<u8>,
    ) -> bool {
        before_period.is_some_and(|p| self.teaches(weekday, p))
            || after_period.is_some_and(|p| self.teaches(weekday, p))
    }

    pub fn teaches(&self, weekday: Weekday, period: u8) -> bool {
        self.lessons.contains(&Lesson::new(weekday, period))
    }

    /// Periods taught on a weekday.
    pub fn periods_on(&self, weekday: Weekday) -> BTreeSet<u8> {
        self.lessons
            .iter()
            .filter(|l| l.weekday == weekday)
            .map(|l| l.period)
            .collect()
    }

    /// Days on which the teacher has at least one lesson.
    pub fn lesson_weekdays(&self) -> Attendance {
        Attendance::from_weekdays(self.lessons.iter().map(|l| l.weekday))
    }
}
