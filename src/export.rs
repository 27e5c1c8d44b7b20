//! Printable text tables and CSV export of a week's plan.

use std::collections::HashMap;
use std::io::Write;

use chrono::{Duration, NaiveDate};

use crate::error::Result;
use crate::models::duty::break_label;
use crate::models::{sort_for_display, DateRange, DutySlot, Floor, Plan, Teacher, TeacherId, Weekday};
use crate::views::EMPTY_CELL;

/// Week table: one row per break, one column per weekday, each cell
/// listing every floor.
pub fn week_table(
    plan: &Plan,
    teachers: &[Teacher],
    floors: &[Floor],
    monday: NaiveDate,
    breaks_per_day: u8,
) -> String {
    let range = DateRange::school_week(monday);
    let floors = display_floors(floors);
    let names = Labels::new(teachers);

    let mut rows = Vec::new();
    for break_index in 1..=breaks_per_day {
        let mut row = vec![vec![break_label(break_index)]];
        for date in week_dates(range.start) {
            let lines = floors
                .iter()
                .map(|f| {
                    let slot = DutySlot::new(date, break_index, f.id);
                    format!("{}: {}", f.name, names.cell(plan, &slot))
                })
                .collect();
            row.push(lines);
        }
        rows.push(row);
    }

    let mut out = format!(
        "Pausenaufsicht {} - {}\n\n",
        range.start.format("%d.%m.%Y"),
        range.end.format("%d.%m.%Y")
    );
    out.push_str(&render_table(&header(), &rows));
    out
}

/// One table per floor: rows are breaks, columns weekdays.
pub fn floor_tables(
    plan: &Plan,
    teachers: &[Teacher],
    floors: &[Floor],
    monday: NaiveDate,
    breaks_per_day: u8,
) -> String {
    let range = DateRange::school_week(monday);
    let names = Labels::new(teachers);

    let mut out = format!(
        "Pausenaufsicht nach Stockwerken {} - {}\n",
        range.start.format("%d.%m.%Y"),
        range.end.format("%d.%m.%Y")
    );
    for floor in display_floors(floors) {
        let rows: Vec<Vec<Vec<String>>> = (1..=breaks_per_day)
            .map(|break_index| {
                let mut row = vec![vec![break_label(break_index)]];
                row.extend(week_dates(range.start).map(|date| {
                    vec![names.cell(plan, &DutySlot::new(date, break_index, floor.id))]
                }));
                row
            })
            .collect();
        out.push('\n');
        out.push_str(&floor.name);
        out.push('\n');
        out.push_str(&render_table(&header(), &rows));
    }
    out
}

/// Writes the assignments of `range` as CSV.
///
/// Columns: date, weekday, break, floor, teacher code, teacher name.
/// Rows are ordered by date, break, floor name and teacher name.
pub fn write_plan_csv<W: Write>(
    writer: W,
    plan: &Plan,
    teachers: &[Teacher],
    floors: &[Floor],
    range: &DateRange,
) -> Result<usize> {
    let teachers: HashMap<TeacherId, &Teacher> = teachers.iter().map(|t| (t.id, t)).collect();
    let floors: HashMap<_, _> = floors.iter().map(|f| (f.id, f)).collect();

    let mut rows = Vec::new();
    for a in plan.assignments_in(range) {
        let (Some(teacher), Some(floor)) = (teachers.get(&a.teacher_id), floors.get(&a.floor_id()))
        else {
            continue;
        };
        rows.push((
            a.date(),
            a.break_index(),
            floor.name.clone(),
            teacher.last_name.clone(),
            teacher.first_name.clone(),
            teacher.export_code(),
        ));
    }
    rows.sort();

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["date", "weekday", "break", "floor", "teacher_code", "teacher_name"])?;
    for (date, break_index, floor, last, first, code) in &rows {
        let weekday = Weekday::of_date(*date).map(Weekday::short_label).unwrap_or("");
        csv.write_record([
            date.to_string(),
            weekday.to_string(),
            break_index.to_string(),
            floor.clone(),
            code.clone(),
            format!("{last}, {first}"),
        ])?;
    }
    csv.flush()?;
    Ok(rows.len())
}

fn display_floors(floors: &[Floor]) -> Vec<Floor> {
    let mut floors = floors.to_vec();
    sort_for_display(&mut floors);
    floors
}

fn week_dates(monday: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (0..Weekday::ALL.len() as i64).map(move |offset| monday + Duration::days(offset))
}

fn header() -> Vec<String> {
    std::iter::once("Pause".to_string())
        .chain(Weekday::ALL.iter().map(|d| d.label().to_string()))
        .collect()
}

struct Labels<'a> {
    by_id: HashMap<TeacherId, &'a Teacher>,
}

impl<'a> Labels<'a> {
    fn new(teachers: &'a [Teacher]) -> Self {
        Self {
            by_id: teachers.iter().map(|t| (t.id, t)).collect(),
        }
    }

    /// Teachers of a slot by name, or the empty-cell mark.
    fn cell(&self, plan: &Plan, slot: &DutySlot) -> String {
        let mut assigned: Vec<&Teacher> = plan
            .teachers_for_slot(slot)
            .into_iter()
            .filter_map(|id| self.by_id.get(&id).copied())
            .collect();
        if assigned.is_empty() {
            return EMPTY_CELL.to_string();
        }
        assigned.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        assigned
            .iter()
            .map(|t| t.display_label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Renders a table whose cells may span several lines.
fn render_table(header: &[String], rows: &[Vec<Vec<String>>]) -> String {
    let columns = header.len();
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(columns) {
            for line in cell {
                widths[i] = widths[i].max(line.chars().count());
            }
        }
    }

    let separator = widths
        .iter()
        .map(|w| "-".repeat(*w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let format_line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(text, width)| {
                let pad = width - text.chars().count();
                format!(" {text}{} ", " ".repeat(pad))
            })
            .collect::<Vec<_>>()
            .join("|")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&format_line(header.iter().map(String::as_str).collect()));
    out.push('\n');
    out.push_str(&separator);
    out.push('\n');
    for row in rows {
        let height = row.iter().map(Vec::len).max().unwrap_or(0);
        for line in 0..height {
            let cells = (0..columns)
                .map(|i| {
                    row.get(i)
                        .and_then(|c| c.get(line))
                        .map(String::as_str)
                        .unwrap_or("")
                })
                .collect();
            out.push_str(&format_line(cells));
            out.push('\n');
        }
        out.push_str(&separator);
        out.push('\n');
    }
    out
}
