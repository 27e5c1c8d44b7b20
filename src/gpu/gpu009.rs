//! GPU009 supervision export.
//!
//! One line per assigned teacher:
//!
//! ```text
//! "FLOOR";"CODE";WEEKDAY;BREAK;1;
//! ```
//!
//! `WEEKDAY` runs from 1 (Monday) to 5 (Friday); `BREAK` names the period
//! the supervision precedes (1, 3, 5, 7, ...).

use std::collections::HashMap;

use crate::models::duty::gpu_break_index;
use crate::models::{DateRange, Floor, Plan, Teacher};

/// Renders the assignments of `range` as GPU009 text.
///
/// Lines are ordered by date, break, floor name and teacher name; the
/// output always ends with a newline. Assignments referencing unknown
/// teachers or floors and weekend dates are skipped.
pub fn generate_gpu009(plan: &Plan, teachers: &[Teacher], floors: &[Floor], range: &DateRange) -> String {
    let teachers: HashMap<_, _> = teachers.iter().map(|t| (t.id, t)).collect();
    let floors: HashMap<_, _> = floors.iter().map(|f| (f.id, f)).collect();

    let mut rows = Vec::new();
    for a in plan.assignments_in(range) {
        let (Some(teacher), Some(floor), Some(weekday)) = (
            teachers.get(&a.teacher_id),
            floors.get(&a.floor_id()),
            a.slot.weekday(),
        ) else {
            continue;
        };
        rows.push((
            a.date(),
            a.break_index(),
            floor.name.as_str(),
            teacher.last_name.as_str(),
            teacher.first_name.as_str(),
            weekday.gpu_number(),
            teacher.export_code(),
        ));
    }
    rows.sort();

    let mut lines: Vec<String> = rows
        .into_iter()
        .map(|(_, break_index, floor, _, _, weekday, code)| {
            format!(
                "\"{floor}\";\"{code}\";{weekday};{};1;",
                gpu_break_index(break_index)
            )
        })
        .collect();
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DutySlot;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, day).unwrap()
    }

    #[test]
    fn test_lines_and_order() {
        let floors = vec![Floor::new(1, "OG"), Floor::new(2, "EG")];
        let teachers = vec![
            Teacher::new(1, "Hanna", "Hoofe").with_abbreviation("HOO"),
            Teacher::new(2, "Max", "Meyer"),
            Teacher::new(3, "Anna", "Albers").with_abbreviation("ALB"),
        ];
        let mut plan = Plan::new();
        plan.assign(DutySlot::new(d(3), 1, 1), 1);
        plan.assign(DutySlot::new(d(2), 2, 1), 2);
        plan.assign(DutySlot::new(d(2), 2, 2), 1);
        plan.assign(DutySlot::new(d(2), 1, 1), 2);
        plan.assign(DutySlot::new(d(2), 1, 1), 3);

        let text = generate_gpu009(&plan, &teachers, &floors, &DateRange::school_week(d(2)));
        let expected = [
            r#""OG";"ALB";1;1;1;"#,
            r#""OG";"MEY";1;1;1;"#,
            r#""EG";"HOO";1;3;1;"#,
            r#""OG";"MEY";1;3;1;"#,
            r#""OG";"HOO";2;1;1;"#,
            "",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }

    #[test]
    fn test_range_filter_and_empty_output() {
        let floors = vec![Floor::new(1, "EG")];
        let teachers = vec![Teacher::new(1, "A", "Albers")];
        let mut plan = Plan::new();
        plan.assign(DutySlot::new(d(9), 4, 1), 1);

        assert_eq!(
            generate_gpu009(&plan, &teachers, &floors, &DateRange::school_week(d(2))),
            "\n"
        );
        assert_eq!(
            generate_gpu009(&plan, &teachers, &floors, &DateRange::school_week(d(9))),
            "\"EG\";\"ALB\";1;7;1;\n"
        );
    }
}
