//! Duty slots, assignments and the break timetable.
//!
//! Breaks are numbered from 1. Break `b` sits between lesson periods
//! `2b-2` and `2b-1`; the first break is the early supervision before
//! period 1 and has no preceding period.
//!
//! | Break | Before | After | Label |
//! |-------|--------|-------|-------|
//! | 1 | — | 1 | 0. Stunde |
//! | 2 | 2 | 3 | 2./3. Stunde |
//! | 3 | 4 | 5 | 4./5. Stunde |
//! | 4 | 6 | 7 | 6./7. Stunde |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{FloorId, TeacherId, Weekday};

/// Highest lesson period accepted from timetable imports.
pub const MAX_PERIOD: u8 = 20;

/// Highest break whose following period is still an importable period.
pub const MAX_BREAKS_PER_DAY: u8 = (MAX_PERIOD + 1) / 2;

/// Default number of supervised breaks per school day.
pub const DEFAULT_BREAKS_PER_DAY: u8 = 4;

/// Lesson period directly before break `break_index`.
pub fn before_period(break_index: u8) -> Option<u8> {
    if break_index <= 1 {
        None
    } else {
        break_index.checked_mul(2).map(|p| p - 2)
    }
}

/// Lesson period directly after break `break_index`.
pub fn after_period(break_index: u8) -> Option<u8> {
    if break_index == 0 {
        None
    } else {
        break_index.checked_mul(2).map(|p| p - 1)
    }
}

/// Periods that make a teacher present around a break.
pub fn relevant_periods(break_index: u8) -> Vec<u8> {
    before_period(break_index)
        .into_iter()
        .chain(after_period(break_index))
        .collect()
}

/// Human-readable break label.
pub fn break_label(break_index: u8) -> String {
    match (before_period(break_index), after_period(break_index)) {
        (Some(b), Some(a)) => format!("{b}./{a}. Stunde"),
        _ => "0. Stunde".to_string(),
    }
}

/// Break numbering used by GPU009 (supervision *before* the given period).
pub fn gpu_break_index(break_index: u8) -> u32 {
    (break_index.max(1) as u32 - 1) * 2 + 1
}

/// One supervision position: a floor during one break on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DutySlot {
    pub date: NaiveDate,
    pub break_index: u8,
    pub floor_id: FloorId,
}

impl DutySlot {
    pub fn new(date: NaiveDate, break_index: u8, floor_id: FloorId) -> Self {
        Self {
            date,
            break_index,
            floor_id,
        }
    }

    /// School weekday of the slot, `None` for weekend dates.
    pub fn weekday(&self) -> Option<Weekday> {
        Weekday::of_date(self.date)
    }
}

/// A teacher supervising a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Assignment {
    pub slot: DutySlot,
    pub teacher_id: TeacherId,
}

impl Assignment {
    pub fn new(slot: DutySlot, teacher_id: TeacherId) -> Self {
        Self { slot, teacher_id }
    }

    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.slot.date
    }

    #[inline]
    pub fn break_index(&self) -> u8 {
        self.slot.break_index
    }

    #[inline]
    pub fn floor_id(&self) -> FloorId {
        self.slot.floor_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_periods() {
        assert_eq!(before_period(1), None);
        assert_eq!(after_period(1), Some(1));
        assert_eq!(before_period(2), Some(2));
        assert_eq!(after_period(2), Some(3));
        assert_eq!(relevant_periods(1), vec![1]);
        assert_eq!(relevant_periods(3), vec![4, 5]);
        assert_eq!(relevant_periods(4), vec![6, 7]);
        assert_eq!(after_period(MAX_BREAKS_PER_DAY), Some(MAX_PERIOD - 1));
    }

    #[test]
    fn test_break_periods_beyond_u8_range() {
        assert_eq!(before_period(200), None);
        assert_eq!(after_period(200), None);
        assert!(relevant_periods(255).is_empty());
        assert_eq!(before_period(128), None);
        assert_eq!(before_period(127), Some(252));
    }

    #[test]
    fn test_break_labels() {
        assert_eq!(break_label(1), "0. Stunde");
        assert_eq!(break_label(2), "2./3. Stunde");
        assert_eq!(break_label(4), "6./7. Stunde");
    }

    #[test]
    fn test_gpu_break_index() {
        assert_eq!(gpu_break_index(1), 1);
        assert_eq!(gpu_break_index(2), 3);
        assert_eq!(gpu_break_index(3), 5);
        assert_eq!(gpu_break_index(4), 7);
    }

    #[test]
    fn test_slot_ordering_is_chronological() {
        let d1 = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 9, 3).unwrap();
        let mut slots = vec![
            DutySlot::new(d2, 1, 1),
            DutySlot::new(d1, 2, 1),
            DutySlot::new(d1, 1, 2),
            DutySlot::new(d1, 1, 1),
        ];
        slots.sort();
        assert_eq!(slots[0], DutySlot::new(d1, 1, 1));
        assert_eq!(slots[1], DutySlot::new(d1, 1, 2));
        assert_eq!(slots[2], DutySlot::new(d1, 2, 1));
        assert_eq!(slots[3], DutySlot::new(d2, 1, 1));
    }
}
