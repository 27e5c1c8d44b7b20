//! GPU001 timetable import.
//!
//! One lesson per line, fields separated by `;`, text fields quoted:
//!
//! ```text
//! 4063;"12ZU4A";"HOO";"ENG";"3035";2;13;;
//!                ^^^^^            ^ ^^
//!        abbreviation      weekday  period
//! ```
//!
//! Column 3 holds the teacher abbreviation, column 6 the weekday
//! (1 = Monday .. 5 = Friday) and column 7 the period (1..=20).
//!
//! Files must be UTF-8. Timetable programs often write Windows-1252;
//! such files need converting first, a single undecodable line aborts
//! the import.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{AufsichtError, Result};
use crate::models::duty::MAX_PERIOD;
use crate::models::{Lesson, Teacher, Weekday};

/// Counters of a GPU001 import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Gpu001Stats {
    /// Lines read.
    pub processed: usize,
    /// Distinct lessons stored.
    pub imported: usize,
    /// Lines that could not be parsed.
    pub errors: usize,
    /// Lines naming an abbreviation no teacher has.
    pub unknown_teachers: usize,
}

/// Parses one GPU001 line into `(abbreviation, weekday, period)`.
///
/// Returns `None` for short lines, empty fields, non-numeric values and
/// weekdays or periods out of range.
pub fn parse_gpu001_line(line: &str) -> Option<(String, Weekday, u8)> {
    let parts: Vec<&str> = line.trim().split(';').collect();
    if parts.len() < 7 {
        return None;
    }

    let field = |i: usize| parts[i].trim().trim_matches('"');
    let abbreviation = field(2);
    let weekday = field(5);
    let period = field(6);
    if abbreviation.is_empty() || weekday.is_empty() || period.is_empty() {
        return None;
    }

    let weekday = Weekday::from_gpu_number(weekday.parse().ok()?)?;
    let period: u8 = period.parse().ok()?;
    if period == 0 || period > MAX_PERIOD {
        return None;
    }
    Some((abbreviation.to_string(), weekday, period))
}

/// Imports lessons from a GPU001 stream, replacing every teacher's lessons.
///
/// Afterwards the attendance of teachers whose attendance is empty or
/// covers the whole week is derived from their lesson days.
pub fn import_gpu001<R: BufRead>(reader: R, teachers: &mut [Teacher]) -> Result<Gpu001Stats> {
    let mut stats = Gpu001Stats::default();

    let index: HashMap<String, usize> = teachers
        .iter()
        .enumerate()
        .filter_map(|(i, t)| {
            t.abbreviation
                .as_deref()
                .filter(|a| !a.is_empty())
                .map(|a| (a.to_string(), i))
        })
        .collect();

    let mut lessons: HashMap<usize, BTreeSet<Lesson>> = HashMap::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| {
            AufsichtError::import(format!(
                "GPU001 line {} unreadable (file must be UTF-8): {e}",
                line_no + 1
            ))
        })?;
        stats.processed += 1;

        let Some((abbreviation, weekday, period)) = parse_gpu001_line(&line) else {
            stats.errors += 1;
            debug!(line = line_no + 1, "skipping malformed GPU001 line");
            continue;
        };
        let Some(&teacher) = index.get(&abbreviation) else {
            stats.unknown_teachers += 1;
            continue;
        };
        lessons
            .entry(teacher)
            .or_default()
            .insert(Lesson::new(weekday, period));
    }

    for t in teachers.iter_mut() {
        t.lessons.clear();
    }
    for (i, set) in lessons {
        stats.imported += set.len();
        teachers[i].lessons = set;
    }

    let derived = derive_attendance(teachers, false);
    info!(
        processed = stats.processed,
        imported = stats.imported,
        errors = stats.errors,
        unknown_teachers = stats.unknown_teachers,
        attendance_updated = derived,
        "GPU001 import finished"
    );
    if stats.unknown_teachers > 0 {
        warn!(
            lines = stats.unknown_teachers,
            "GPU001 lines reference unknown abbreviations"
        );
    }
    Ok(stats)
}

/// Opens `path` and imports it with [`import_gpu001`].
pub fn import_gpu001_file(path: &Path, teachers: &mut [Teacher]) -> Result<Gpu001Stats> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            AufsichtError::not_found(format!("GPU001 file {}", path.display()))
        }
        _ => AufsichtError::Io(e),
    })?;
    import_gpu001(BufReader::new(file), teachers)
}

/// Sets every teacher's attendance to their lesson days.
///
/// Teachers without lessons keep their attendance. Returns how many
/// teachers changed.
pub fn update_attendance_from_lessons(teachers: &mut [Teacher]) -> usize {
    derive_attendance(teachers, true)
}

fn derive_attendance(teachers: &mut [Teacher], force: bool) -> usize {
    let mut changed = 0;
    for t in teachers.iter_mut() {
        if t.lessons.is_empty() {
            continue;
        }
        let days = t.lesson_weekdays();
        let replaceable = force || t.attendance.is_empty() || t.attendance.is_full();
        if replaceable && t.attendance != days {
            debug!(
                teacher = %t.display_label(),
                from = %t.attendance,
                to = %days,
                "attendance derived from lessons"
            );
            t.attendance = days;
            changed += 1;
        }
    }
    changed
}

/// Removes every lesson. Returns how many were removed.
pub fn clear_lessons(teachers: &mut [Teacher]) -> usize {
    teachers
        .iter_mut()
        .map(|t| {
            let n = t.lessons.len();
            t.lessons.clear();
            n
        })
        .sum()
}

/// Lesson counts across all teachers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonStats {
    pub total_lessons: usize,
    pub teachers_with_lessons: usize,
    pub teachers_total: usize,
}

pub fn lesson_stats(teachers: &[Teacher]) -> LessonStats {
    LessonStats {
        total_lessons: teachers.iter().map(|t| t.lessons.len()).sum(),
        teachers_with_lessons: teachers.iter().filter(|t| !t.lessons.is_empty()).count(),
        teachers_total: teachers.len(),
    }
}
