//! JSON file persistence of teachers, floors and the plan.
//!
//! The store lives in a single JSON document. The location is, in order:
//! `DATABASE_PATH`, `$APP_DATA_DIR/aufsichtsplan.json`, then
//! `./aufsichtsplan.json`. Saving writes a temporary file next to the
//! target and renames it over the old document.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AufsichtError, Result};
use crate::models::{sort_for_display, Attendance, Floor, FloorId, Plan, Teacher, TeacherId};

/// File name used when no explicit path is configured.
pub const STORE_FILE_NAME: &str = "aufsichtsplan.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    teachers: Vec<Teacher>,
    #[serde(default)]
    floors: Vec<Floor>,
    #[serde(default)]
    plan: Plan,
}

#[derive(Serialize)]
struct StoreFileRef<'a> {
    teachers: &'a [Teacher],
    floors: &'a [Floor],
    plan: &'a Plan,
}

/// Teachers, floors and plan backed by a JSON file.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    pub teachers: Vec<Teacher>,
    pub floors: Vec<Floor>,
    pub plan: Plan,
}

/// Picks the store path from an explicit database path or a data directory.
pub fn resolve_path(database_path: Option<&str>, app_data_dir: Option<&str>) -> PathBuf {
    if let Some(path) = database_path.filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    match app_data_dir.filter(|d| !d.is_empty()) {
        Some(dir) => Path::new(dir).join(STORE_FILE_NAME),
        None => PathBuf::from(".").join(STORE_FILE_NAME),
    }
}

/// Store path from the `DATABASE_PATH` and `APP_DATA_DIR` environment.
pub fn default_path() -> PathBuf {
    let database_path = std::env::var("DATABASE_PATH").ok();
    let app_data_dir = std::env::var("APP_DATA_DIR").ok();
    resolve_path(database_path.as_deref(), app_data_dir.as_deref())
}

impl Store {
    /// An empty store that will be saved to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            teachers: Vec::new(),
            floors: Vec::new(),
            plan: Plan::new(),
        }
    }

    /// Loads the store at `path`; a missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "store file missing, starting empty");
            return Ok(Self::empty(path));
        }
        let text = fs::read_to_string(&path)?;
        let file: StoreFile = serde_json::from_str(&text)?;
        debug!(
            path = %path.display(),
            teachers = file.teachers.len(),
            floors = file.floors.len(),
            assignments = file.plan.assignment_count(),
            "store loaded"
        );
        Ok(Self {
            path,
            teachers: file.teachers,
            floors: file.floors,
            plan: file.plan,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the store atomically.
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let body = serde_json::to_string_pretty(&StoreFileRef {
            teachers: &self.teachers,
            floors: &self.floors,
            plan: &self.plan,
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(body.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| AufsichtError::Io(e.error))?;
        debug!(path = %self.path.display(), "store saved");
        Ok(())
    }

    pub fn teacher(&self, id: TeacherId) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.id == id)
    }

    fn teacher_mut(&mut self, id: TeacherId) -> Result<&mut Teacher> {
        self.teachers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| AufsichtError::not_found(format!("teacher {id}")))
    }

    pub fn floor(&self, id: FloorId) -> Option<&Floor> {
        self.floors.iter().find(|f| f.id == id)
    }

    pub fn floor_by_name(&self, name: &str) -> Option<&Floor> {
        self.floors.iter().find(|f| f.name == name)
    }

    /// Teachers ordered by last name, then first name.
    pub fn teachers_sorted(&self) -> Vec<&Teacher> {
        let mut teachers: Vec<&Teacher> = self.teachers.iter().collect();
        teachers.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        teachers
    }

    /// Floors in display order.
    pub fn floors_sorted(&self) -> Vec<Floor> {
        let mut floors = self.floors.clone();
        sort_for_display(&mut floors);
        floors
    }

    /// Adds a floor, or returns the id of the floor with that name.
    pub fn add_floor(&mut self, name: &str, required_per_break: u32, order_index: i32) -> Result<FloorId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AufsichtError::validation("floor name must not be empty"));
        }
        if let Some(existing) = self.floor_by_name(name) {
            return Ok(existing.id);
        }
        let id = self.floors.iter().map(|f| f.id).max().unwrap_or(0) + 1;
        self.floors.push(
            Floor::new(id, name)
                .with_required(required_per_break.max(1))
                .with_order(order_index),
        );
        info!(floor = name, id, "floor added");
        Ok(id)
    }

    pub fn reorder_floor(&mut self, id: FloorId, order_index: i32) -> Result<()> {
        let floor = self
            .floors
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| AufsichtError::not_found(format!("floor {id}")))?;
        floor.order_index = order_index;
        Ok(())
    }

    /// Deletes a floor with its assignments and clears preferences for it.
    ///
    /// Returns the number of assignments removed.
    pub fn delete_floor(&mut self, id: FloorId) -> Result<usize> {
        let before = self.floors.len();
        self.floors.retain(|f| f.id != id);
        if self.floors.len() == before {
            return Err(AufsichtError::not_found(format!("floor {id}")));
        }
        for t in self.teachers.iter_mut() {
            if t.preferred_floor == Some(id) {
                t.preferred_floor = None;
            }
        }
        let removed = self.plan.remove_floor(id);
        self.plan.violations.retain(|v| v.slot.map_or(true, |s| s.floor_id != id));
        info!(floor = id, assignments = removed, "floor deleted");
        Ok(removed)
    }

    pub fn set_exempt(&mut self, id: TeacherId, exempt: bool) -> Result<()> {
        self.teacher_mut(id)?.exempt = exempt;
        Ok(())
    }

    /// Sets the exemption of several teachers. Returns how many changed.
    pub fn bulk_set_exempt(&mut self, ids: &[TeacherId], exempt: bool) -> usize {
        let mut changed = 0;
        for t in self.teachers.iter_mut().filter(|t| ids.contains(&t.id)) {
            if t.exempt != exempt {
                t.exempt = exempt;
                changed += 1;
            }
        }
        changed
    }

    pub fn set_quota(&mut self, id: TeacherId, target_duties: u32) -> Result<()> {
        self.teacher_mut(id)?.target_duties = target_duties;
        Ok(())
    }

    /// Sets the quota of several teachers. Returns how many changed.
    pub fn bulk_set_quota(&mut self, ids: &[TeacherId], target_duties: u32) -> usize {
        let mut changed = 0;
        for t in self.teachers.iter_mut().filter(|t| ids.contains(&t.id)) {
            if t.target_duties != target_duties {
                t.target_duties = target_duties;
                changed += 1;
            }
        }
        changed
    }

    /// Sets or clears a teacher's preferred floor; the floor must exist.
    pub fn set_preferred_floor(&mut self, id: TeacherId, floor: Option<FloorId>) -> Result<()> {
        if let Some(floor_id) = floor {
            if self.floor(floor_id).is_none() {
                return Err(AufsichtError::not_found(format!("floor {floor_id}")));
            }
        }
        self.teacher_mut(id)?.preferred_floor = floor;
        Ok(())
    }

    /// Deletes a teacher and their assignments. Returns the number of
    /// assignments removed.
    pub fn delete_teacher(&mut self, id: TeacherId) -> Result<usize> {
        let before = self.teachers.len();
        self.teachers.retain(|t| t.id != id);
        if self.teachers.len() == before {
            return Err(AufsichtError::not_found(format!("teacher {id}")));
        }
        let removed = self.plan.remove_teacher(id);
        self.plan.violations.retain(|v| v.teacher_id != Some(id));
        Ok(removed)
    }

    /// Sets the attendance of every teacher with the given last name.
    /// Returns how many teachers matched.
    pub fn set_attendance_by_last_name(&mut self, last_name: &str, attendance: Attendance) -> usize {
        let mut matched = 0;
        for t in self.teachers.iter_mut().filter(|t| t.last_name == last_name) {
            t.attendance = attendance;
            matched += 1;
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DutySlot;
    use chrono::NaiveDate;

    fn store() -> Store {
        let mut s = Store::empty("unused.json");
        s.teachers = vec![
            Teacher::new(1, "Hanna", "Hoofe").with_preferred_floor(1),
            Teacher::new(2, "Max", "Meyer").with_target(2),
            Teacher::new(3, "Anna", "Meyer"),
        ];
        s.floors = vec![Floor::new(1, "EG"), Floor::new(2, "OG").with_order(-1)];
        let d = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        s.plan.assign(DutySlot::new(d, 1, 1), 1);
        s.plan.assign(DutySlot::new(d, 1, 2), 2);
        s
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path(Some("/data/x.json"), Some("/app")), PathBuf::from("/data/x.json"));
        assert_eq!(resolve_path(None, Some("/app")), PathBuf::from("/app/aufsichtsplan.json"));
        assert_eq!(resolve_path(Some(""), None), PathBuf::from("./aufsichtsplan.json"));
    }

    #[test]
    fn test_add_floor_is_idempotent_by_name() {
        let mut s = store();
        assert_eq!(s.add_floor(" Hof ", 0, 3).unwrap(), 3);
        assert_eq!(s.floor(3).unwrap().required_per_break, 1);
        assert_eq!(s.add_floor("Hof", 2, 0).unwrap(), 3);
        assert!(matches!(s.add_floor("  ", 1, 0), Err(AufsichtError::Validation(_))));
    }

    #[test]
    fn test_delete_floor_cascades() {
        let mut s = store();
        assert_eq!(s.delete_floor(1).unwrap(), 1);
        assert_eq!(s.teacher(1).unwrap().preferred_floor, None);
        assert_eq!(s.plan.assignment_count(), 1);
        assert!(matches!(s.delete_floor(1), Err(AufsichtError::NotFound(_))));
    }

    #[test]
    fn test_floors_sorted() {
        let names: Vec<String> = store().floors_sorted().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["OG", "EG"]);
    }

    #[test]
    fn test_bulk_updates_count_changes() {
        let mut s = store();
        assert_eq!(s.bulk_set_exempt(&[1, 2, 99], true), 2);
        assert_eq!(s.bulk_set_exempt(&[1, 2], true), 0);
        assert_eq!(s.bulk_set_quota(&[1, 2, 3], 2), 2);
        assert!(s.teachers.iter().all(|t| t.target_duties == 2));
    }

    #[test]
    fn test_preferred_floor_must_exist() {
        let mut s = store();
        s.set_preferred_floor(2, Some(2)).unwrap();
        assert_eq!(s.teacher(2).unwrap().preferred_floor, Some(2));
        assert!(s.set_preferred_floor(2, Some(9)).is_err());
        s.set_preferred_floor(2, None).unwrap();
        assert_eq!(s.teacher(2).unwrap().preferred_floor, None);
    }

    #[test]
    fn test_delete_teacher_and_attendance() {
        let mut s = store();
        assert_eq!(s.delete_teacher(2).unwrap(), 1);
        assert!(s.set_exempt(2, true).is_err());

        let days: Attendance = "Mo,Mi".parse().unwrap();
        assert_eq!(s.set_attendance_by_last_name("Meyer", days), 1);
        assert_eq!(s.set_attendance_by_last_name("Nobody", days), 0);
        assert_eq!(s.teacher(3).unwrap().attendance, days);
    }

    #[test]
    fn test_teachers_sorted() {
        let s = store();
        let names: Vec<String> = s.teachers_sorted().iter().map(|t| t.full_name()).collect();
        assert_eq!(names, vec!["Hoofe, Hanna", "Meyer, Anna", "Meyer, Max"]);
    }
}
