//! Week overview and manual plan edits.
//!
//! The week grid is indexed `[day][break]`; every cell holds one line per
//! floor, e.g. `"EG: HOO, MEY|warn:no-lesson"`. A teacher label carries a
//! `|warn:` suffix listing `no-lesson` (no lesson next to the break) and
//! `double-duty` (more than one duty that day).

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AufsichtError, Result};
use crate::models::duty::MAX_BREAKS_PER_DAY;
use crate::models::{
    sort_for_display, DateRange, DutySlot, Floor, Plan, Teacher, TeacherId, Weekday,
};
use crate::store::Store;

/// Placeholder for a floor without supervision.
pub const EMPTY_CELL: &str = "—";

/// Supervision lines of a school week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekGrid {
    pub monday: NaiveDate,
    pub breaks_per_day: u8,
    /// `cells[day][break - 1]` holds one line per floor.
    pub cells: Vec<Vec<Vec<String>>>,
}

impl WeekGrid {
    pub fn cell(&self, weekday: Weekday, break_index: u8) -> Option<&[String]> {
        self.cells
            .get(weekday.index())?
            .get(usize::from(break_index).checked_sub(1)?)
            .map(Vec::as_slice)
    }
}

/// Builds the grid for the school week starting at `monday`.
pub fn week_grid(
    plan: &Plan,
    teachers: &[Teacher],
    floors: &[Floor],
    monday: NaiveDate,
    breaks_per_day: u8,
) -> WeekGrid {
    let range = DateRange::school_week(monday);
    let monday = range.start;
    let mut floors = floors.to_vec();
    sort_for_display(&mut floors);
    let by_id: HashMap<TeacherId, &Teacher> = teachers.iter().map(|t| (t.id, t)).collect();

    let mut duties_per_day: HashMap<(TeacherId, NaiveDate), usize> = HashMap::new();
    for a in plan.assignments_in(&range) {
        *duties_per_day.entry((a.teacher_id, a.date())).or_insert(0) += 1;
    }

    let mut cells = Vec::with_capacity(Weekday::ALL.len());
    for (offset, weekday) in Weekday::ALL.into_iter().enumerate() {
        let date = monday + Duration::days(offset as i64);
        let mut row = Vec::with_capacity(usize::from(breaks_per_day));
        for break_index in 1..=breaks_per_day {
            let lines = floors
                .iter()
                .map(|floor| {
                    let slot = DutySlot::new(date, break_index, floor.id);
                    let mut assigned: Vec<&Teacher> = plan
                        .teachers_for_slot(&slot)
                        .into_iter()
                        .filter_map(|id| by_id.get(&id).copied())
                        .collect();
                    assigned.sort_by(|a, b| {
                        a.last_name
                            .cmp(&b.last_name)
                            .then_with(|| a.first_name.cmp(&b.first_name))
                    });

                    let labels: Vec<String> = assigned
                        .into_iter()
                        .map(|t| {
                            let mut reasons = Vec::new();
                            if !t.is_available_for_supervision(weekday, break_index) {
                                reasons.push("no-lesson");
                            }
                            if duties_per_day.get(&(t.id, date)).copied().unwrap_or(0) > 1 {
                                reasons.push("double-duty");
                            }
                            if reasons.is_empty() {
                                t.display_label()
                            } else {
                                format!("{}|warn:{}", t.display_label(), reasons.join(";"))
                            }
                        })
                        .collect();

                    if labels.is_empty() {
                        format!("{}: {EMPTY_CELL}", floor.name)
                    } else {
                        format!("{}: {}", floor.name, labels.join(", "))
                    }
                })
                .collect();
            row.push(lines);
        }
        cells.push(row);
    }

    WeekGrid {
        monday,
        breaks_per_day,
        cells,
    }
}

/// Duties of one teacher in a week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekCount {
    pub abbreviation: String,
    pub first_name: String,
    pub last_name: String,
    pub count: u32,
    pub target: u32,
}

/// Per-teacher duty counts of a range, ordered by name, and their total.
pub fn week_counts(plan: &Plan, teachers: &[Teacher], range: &DateRange) -> (Vec<WeekCount>, u32) {
    let loads = plan.loads_in(range);
    let mut rows: Vec<WeekCount> = teachers
        .iter()
        .map(|t| WeekCount {
            abbreviation: t.abbreviation.clone().unwrap_or_default(),
            first_name: t.first_name.clone(),
            last_name: t.last_name.clone(),
            count: loads.get(&t.id).copied().unwrap_or(0),
            target: t.target_duties,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.last_name
            .cmp(&b.last_name)
            .then_with(|| a.first_name.cmp(&b.first_name))
    });
    let total = rows.iter().map(|r| r.count).sum();
    (rows, total)
}

/// One edited grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEdit {
    /// Day offset from Monday, 0..=4.
    pub day: u8,
    pub break_index: u8,
    /// Floor name; unknown names create a floor.
    pub floor: String,
    /// Abbreviations, `"Last, First"` or last names.
    pub teachers: Vec<String>,
}

/// Outcome of [`apply_manual_changes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualChangeSummary {
    pub created_assignments: usize,
    pub total_cells: usize,
    pub created_floors: Vec<String>,
    /// Names that matched no teacher.
    pub unknown_teachers: Vec<String>,
}

/// Replaces the week's assignments with the edited cells.
///
/// Edits are checked before anything changes: a day outside Monday to
/// Friday or a break outside `1..=MAX_BREAKS_PER_DAY` is an error.
pub fn apply_manual_changes(
    store: &mut Store,
    monday: NaiveDate,
    edits: &[CellEdit],
) -> Result<ManualChangeSummary> {
    if let Some(bad) = edits
        .iter()
        .find(|e| {
            usize::from(e.day) >= Weekday::ALL.len()
                || !(1..=MAX_BREAKS_PER_DAY).contains(&e.break_index)
        })
    {
        return Err(AufsichtError::validation(format!(
            "invalid cell: day {} break {}",
            bad.day, bad.break_index
        )));
    }

    let range = DateRange::school_week(monday);
    let lookup = TeacherLookup::new(&store.teachers);
    let mut summary = ManualChangeSummary {
        total_cells: edits.len(),
        ..Default::default()
    };

    store.plan.clear_range(&range);
    for edit in edits.iter().filter(|e| !e.teachers.is_empty()) {
        let floor_id = match store.floor_by_name(&edit.floor) {
            Some(floor) => floor.id,
            None => {
                let order = store.floors.len() as i32;
                let id = store.add_floor(&edit.floor, 1, order)?;
                summary.created_floors.push(edit.floor.trim().to_string());
                id
            }
        };
        let slot = DutySlot::new(
            range.start + Duration::days(i64::from(edit.day)),
            edit.break_index,
            floor_id,
        );

        for name in edit.teachers.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            match lookup.find(name) {
                Some(teacher_id) => {
                    if store.plan.assign(slot, teacher_id) {
                        summary.created_assignments += 1;
                    }
                }
                None => {
                    warn!(name, "teacher not found while saving manual changes");
                    summary.unknown_teachers.push(name.to_string());
                }
            }
        }
    }
    store.plan.sort();

    info!(
        week = %range.start,
        cells = summary.total_cells,
        assignments = summary.created_assignments,
        "manual changes applied"
    );
    Ok(summary)
}

/// Resolves names typed into the grid: abbreviation first, then
/// `"Last, First"`, then last name alone.
struct TeacherLookup {
    by_abbreviation: HashMap<String, TeacherId>,
    by_full_name: HashMap<String, TeacherId>,
    by_last_name: HashMap<String, TeacherId>,
}

impl TeacherLookup {
    fn new(teachers: &[Teacher]) -> Self {
        let mut lookup = Self {
            by_abbreviation: HashMap::new(),
            by_full_name: HashMap::new(),
            by_last_name: HashMap::new(),
        };
        for t in teachers {
            if let Some(abbr) = t.abbreviation.as_deref().filter(|a| !a.is_empty()) {
                lookup.by_abbreviation.entry(abbr.to_string()).or_insert(t.id);
            }
            lookup.by_full_name.entry(t.full_name()).or_insert(t.id);
            lookup.by_last_name.entry(t.last_name.clone()).or_insert(t.id);
        }
        lookup
    }

    fn find(&self, name: &str) -> Option<TeacherId> {
        self.by_abbreviation
            .get(name)
            .or_else(|| self.by_full_name.get(name))
            .or_else(|| self.by_last_name.get(name))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
    }

    fn floors() -> Vec<Floor> {
        vec![Floor::new(1, "OG").with_order(2), Floor::new(2, "EG").with_order(1)]
    }

    fn teachers() -> Vec<Teacher> {
        vec![
            Teacher::new(1, "Hanna", "Hoofe")
                .with_abbreviation("HOO")
                .with_target(3)
                .with_lesson(Weekday::Monday, 1),
            Teacher::new(2, "Max", "Meyer").with_target(2),
        ]
    }

    #[test]
    fn test_week_grid_lines_and_markers() {
        let mut plan = Plan::new();
        plan.assign(DutySlot::new(monday(), 1, 2), 1);
        plan.assign(DutySlot::new(monday(), 1, 2), 2);
        plan.assign(DutySlot::new(monday(), 2, 1), 2);

        let grid = week_grid(&plan, &teachers(), &floors(), monday(), 4);
        assert_eq!(grid.cells.len(), 5);
        assert_eq!(grid.cells[0].len(), 4);
        assert_eq!(
            grid.cell(Weekday::Monday, 1).unwrap(),
            &[
                "EG: HOO, Meyer, Max|warn:no-lesson;double-duty".to_string(),
                "OG: —".to_string(),
            ]
        );
        assert_eq!(
            grid.cell(Weekday::Monday, 2).unwrap()[1],
            "OG: Meyer, Max|warn:no-lesson;double-duty"
        );
        assert_eq!(grid.cell(Weekday::Friday, 4).unwrap()[0], "EG: —");
        assert!(grid.cell(Weekday::Friday, 5).is_none());
    }

    #[test]
    fn test_week_counts() {
        let mut plan = Plan::new();
        plan.assign(DutySlot::new(monday(), 1, 1), 2);
        plan.assign(DutySlot::new(monday() + Duration::days(7), 1, 1), 2);

        let (rows, total) = week_counts(&plan, &teachers(), &DateRange::school_week(monday()));
        assert_eq!(total, 1);
        assert_eq!(rows[0].abbreviation, "HOO");
        assert_eq!(rows[0].count, 0);
        assert_eq!(rows[1].last_name, "Meyer");
        assert_eq!((rows[1].count, rows[1].target), (1, 2));
    }

    #[test]
    fn test_apply_manual_changes() {
        let mut store = Store::empty("unused.json");
        store.teachers = teachers();
        store.floors = floors();
        store.plan.assign(DutySlot::new(monday(), 3, 1), 1);
        let next_week = DutySlot::new(monday() + Duration::days(7), 1, 1);
        store.plan.assign(next_week, 1);

        let edits = vec![
            CellEdit {
                day: 1,
                break_index: 2,
                floor: "EG".into(),
                teachers: vec!["HOO".into(), "Meyer, Max".into(), "Unbekannt".into()],
            },
            CellEdit {
                day: 4,
                break_index: 1,
                floor: "Hof".into(),
                teachers: vec![" Meyer ".into(), "".into()],
            },
            CellEdit {
                day: 0,
                break_index: 1,
                floor: "Keller".into(),
                teachers: vec![],
            },
        ];
        let summary = apply_manual_changes(&mut store, monday(), &edits).unwrap();

        assert_eq!(summary.created_assignments, 3);
        assert_eq!(summary.total_cells, 3);
        assert_eq!(summary.created_floors, vec!["Hof".to_string()]);
        assert_eq!(summary.unknown_teachers, vec!["Unbekannt".to_string()]);

        let hof = store.floor_by_name("Hof").unwrap();
        assert_eq!((hof.id, hof.order_index), (3, 2));
        assert!(store.floor_by_name("Keller").is_none());

        let tuesday = DutySlot::new(monday() + Duration::days(1), 2, 2);
        assert_eq!(store.plan.teachers_for_slot(&tuesday), vec![1, 2]);
        assert_eq!(store.plan.assignment_count(), 4);
        assert_eq!(store.plan.teachers_for_slot(&next_week), vec![1]);
    }

    #[test]
    fn test_apply_rejects_invalid_cells() {
        let mut store = Store::empty("unused.json");
        store.plan.assign(DutySlot::new(monday(), 1, 1), 1);
        let edits = vec![CellEdit {
            day: 5,
            break_index: 1,
            floor: "EG".into(),
            teachers: vec!["X".into()],
        }];
        assert!(apply_manual_changes(&mut store, monday(), &edits).is_err());
        assert_eq!(store.plan.assignment_count(), 1);
    }

    #[test]
    fn test_apply_rejects_breaks_past_last_period() {
        let mut store = Store::empty("unused.json");
        store.teachers = teachers();
        store.floors = floors();

        for break_index in [0, MAX_BREAKS_PER_DAY + 1, 200] {
            let edits = vec![CellEdit {
                day: 0,
                break_index,
                floor: "EG".into(),
                teachers: vec!["HOO".into()],
            }];
            let err = apply_manual_changes(&mut store, monday(), &edits).unwrap_err();
            assert!(matches!(err, AufsichtError::Validation(_)));
        }
        assert_eq!(store.plan.assignment_count(), 0);

        let edits = vec![CellEdit {
            day: 0,
            break_index: MAX_BREAKS_PER_DAY,
            floor: "EG".into(),
            teachers: vec!["HOO".into()],
        }];
        let summary = apply_manual_changes(&mut store, monday(), &edits).unwrap();
        assert_eq!(summary.created_assignments, 1);

        let week = DateRange::school_week(monday());
        let violations = crate::scheduler::audit_plan(&store.plan, &store.teachers, &week);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, crate::models::ViolationKind::NoLesson);
    }
}
