//! Teacher roster import from CSV.
//!
//! Two layouts are understood:
//!
//! - the timetable export layout, recognised by a header starting with
//!   `Nachname`, `Vorname`, `Kürzel` (or `Kuerzel`): columns are read by
//!   position;
//! - any other header: columns are found by name prefix (`nachname` /
//!   `name`, `vorname`, `kürzel` / `kuerzel` / `abk` / `abbr`, `e-mail` /
//!   `email` / `mail`).
//!
//! Rows are merged into the existing teachers: a teacher with the same
//! abbreviation is updated, else one with the same first and last name,
//! else a new teacher is created.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{AufsichtError, Result};
use crate::models::{Teacher, TeacherId};

/// Counters of a roster import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    /// Rows without both names.
    pub skipped: usize,
}

/// One roster row after column mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RosterRow {
    last_name: String,
    first_name: String,
    abbreviation: Option<String>,
    email: Option<String>,
}

const LAST_NAME: &[&str] = &["nachname", "name"];
const FIRST_NAME: &[&str] = &["vorname"];
const ABBREVIATION: &[&str] = &["kürzel", "kuerzel", "abk", "abbr"];
const EMAIL: &[&str] = &["e-mail", "email", "mail"];

/// Imports a roster with the given field delimiter.
pub fn import_roster<R: Read>(
    reader: R,
    delimiter: u8,
    teachers: &mut Vec<Teacher>,
) -> Result<ImportSummary> {
    let mut csv = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records: Vec<Vec<String>> = Vec::new();
    for record in csv.records() {
        let record = record?;
        records.push(record.iter().map(|f| f.trim().to_string()).collect());
    }

    let Some((header, body)) = records.split_first() else {
        return Err(AufsichtError::import("no header row found"));
    };
    let header: Vec<String> = header
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();
    if header.iter().all(|h| h.is_empty()) {
        return Err(AufsichtError::import("no header row found"));
    }

    let rows: Vec<RosterRow> = if is_positional(&header) {
        debug!("roster uses the positional layout");
        body.iter()
            .filter(|r| r.len() >= 2)
            .map(|r| RosterRow {
                last_name: r[0].clone(),
                first_name: r[1].clone(),
                abbreviation: r.get(2).filter(|a| !a.is_empty()).cloned(),
                email: None,
            })
            .collect()
    } else {
        let columns = HeaderColumns::new(&header);
        body.iter().map(|r| columns.row(r)).collect()
    };

    if rows.is_empty() {
        warn!("roster contains no data rows");
    }

    let mut summary = ImportSummary::default();
    for row in rows {
        upsert(teachers, row, &mut summary);
    }
    info!(
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped,
        "roster import finished"
    );
    Ok(summary)
}

/// Opens `path` and imports it with [`import_roster`].
pub fn import_roster_file(
    path: &Path,
    delimiter: u8,
    teachers: &mut Vec<Teacher>,
) -> Result<ImportSummary> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            AufsichtError::not_found(format!("roster file {}", path.display()))
        }
        _ => AufsichtError::Io(e),
    })?;
    import_roster(file, delimiter, teachers)
}

fn is_positional(header: &[String]) -> bool {
    header.len() >= 3
        && header[0].starts_with("nachname")
        && header[1].starts_with("vorname")
        && (header[2].starts_with("kürzel") || header[2].starts_with("kuerzel"))
}

/// Column indices matching each field, in header order.
struct HeaderColumns {
    last_name: Vec<usize>,
    first_name: Vec<usize>,
    abbreviation: Vec<usize>,
    email: Vec<usize>,
}

impl HeaderColumns {
    fn new(header: &[String]) -> Self {
        let find = |prefixes: &[&str]| -> Vec<usize> {
            header
                .iter()
                .enumerate()
                .filter(|(_, h)| prefixes.iter().any(|p| h.starts_with(p)))
                .map(|(i, _)| i)
                .collect()
        };
        Self {
            last_name: find(LAST_NAME),
            first_name: find(FIRST_NAME),
            abbreviation: find(ABBREVIATION),
            email: find(EMAIL),
        }
    }

    /// First non-empty value among the matching columns.
    fn value(columns: &[usize], record: &[String]) -> Option<String> {
        columns
            .iter()
            .filter_map(|&i| record.get(i))
            .find(|v| !v.is_empty())
            .cloned()
    }

    fn row(&self, record: &[String]) -> RosterRow {
        RosterRow {
            last_name: Self::value(&self.last_name, record).unwrap_or_default(),
            first_name: Self::value(&self.first_name, record).unwrap_or_default(),
            abbreviation: Self::value(&self.abbreviation, record),
            email: Self::value(&self.email, record),
        }
    }
}

fn upsert(teachers: &mut Vec<Teacher>, row: RosterRow, summary: &mut ImportSummary) {
    if row.first_name.is_empty() || row.last_name.is_empty() {
        summary.skipped += 1;
        return;
    }

    let by_abbreviation = row.abbreviation.as_deref().and_then(|abbr| {
        teachers
            .iter()
            .position(|t| t.abbreviation.as_deref() == Some(abbr))
    });
    let existing = by_abbreviation.or_else(|| {
        teachers
            .iter()
            .position(|t| t.first_name == row.first_name && t.last_name == row.last_name)
    });

    match existing {
        Some(i) => {
            let t = &mut teachers[i];
            t.first_name = row.first_name;
            t.last_name = row.last_name;
            if row.abbreviation.is_some() {
                t.abbreviation = row.abbreviation;
            }
            if row.email.is_some() {
                t.email = row.email;
            }
            summary.updated += 1;
        }
        None => {
            let id: TeacherId = teachers.iter().map(|t| t.id).max().unwrap_or(0) + 1;
            let mut t = Teacher::new(id, row.first_name, row.last_name);
            t.abbreviation = row.abbreviation;
            t.email = row.email;
            teachers.push(t);
            summary.created += 1;
        }
    }
}
