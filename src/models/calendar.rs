//! School-week calendar primitives.
//!
//! Only Monday to Friday are school days. Weekends never carry duty
//! slots, so [`Weekday::of_date`] maps them to `None`.
//!
//! # Attendance
//! A teacher's attendance is a five-bit set: bit `i` is weekday `i`
//! (Monday = bit 0). The full set (`31`, written `Mo-Fr`) is also the
//! default for teachers whose timetable has not been imported yet.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AufsichtError;

/// A school day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    /// All school days in order.
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    /// Zero-based index (Monday = 0).
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Weekday for a zero-based index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Weekday for the one-based numbering used in GPU files (1 = Monday).
    pub fn from_gpu_number(number: u32) -> Option<Self> {
        if number == 0 {
            return None;
        }
        Self::from_index(number as usize - 1)
    }

    /// One-based GPU numbering (1 = Monday).
    pub fn gpu_number(self) -> u32 {
        self.index() as u32 + 1
    }

    /// Weekday of a calendar date, `None` on weekends.
    pub fn of_date(date: NaiveDate) -> Option<Self> {
        Self::from_index(date.weekday().num_days_from_monday() as usize)
    }

    /// Two-letter German label.
    pub fn short_label(self) -> &'static str {
        match self {
            Weekday::Monday => "Mo",
            Weekday::Tuesday => "Di",
            Weekday::Wednesday => "Mi",
            Weekday::Thursday => "Do",
            Weekday::Friday => "Fr",
        }
    }

    /// Full German label.
    pub fn label(self) -> &'static str {
        match self {
            Weekday::Monday => "Montag",
            Weekday::Tuesday => "Dienstag",
            Weekday::Wednesday => "Mittwoch",
            Weekday::Thursday => "Donnerstag",
            Weekday::Friday => "Freitag",
        }
    }

    /// Parses a two-letter label (`Mo`, `Di`, ...).
    pub fn from_short_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.short_label() == label)
    }

    #[inline]
    fn bit(self) -> u8 {
        1 << self.index()
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_label())
    }
}

/// Set of school days a teacher is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attendance(u8);

impl Attendance {
    /// Present every school day (`Mo-Fr`).
    pub const ALL: Attendance = Attendance(0b1_1111);
    /// Never present.
    pub const NONE: Attendance = Attendance(0);

    /// Builds from raw bits; bits above Friday are dropped.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Raw bit representation.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Builds from a list of weekdays.
    pub fn from_weekdays(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut set = Self::NONE;
        for day in days {
            set.insert(day);
        }
        set
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & day.bit() != 0
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= day.bit();
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !day.bit();
    }

    /// Number of days present.
    pub fn day_count(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_full(self) -> bool {
        self.0 == Self::ALL.0
    }

    /// Present days in weekday order.
    pub fn days(self) -> impl Iterator<Item = Weekday> {
        Weekday::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

impl Default for Attendance {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromStr for Attendance {
    type Err = AufsichtError;

    /// Parses `Mo-Fr` or a comma list such as `Mo,Mi,Fr`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "Mo-Fr" {
            return Ok(Self::ALL);
        }
        let mut set = Self::NONE;
        for token in s.split(',') {
            let token = token.trim();
            let day = Weekday::from_short_label(token)
                .ok_or_else(|| AufsichtError::validation(format!("Unknown day: '{token}'")))?;
            set.insert(day);
        }
        Ok(set)
    }
}

impl fmt::Display for Attendance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Keine");
        }
        let labels: Vec<&str> = self.days().map(Weekday::short_label).collect();
        f.write_str(&labels.join(", "))
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range; `start` and `end` are swapped if reversed.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Monday to Friday of the week containing `date`.
    pub fn school_week(date: NaiveDate) -> Self {
        let start = monday_of_week(date);
        Self {
            start,
            end: start + Duration::days(4),
        }
    }

    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Every calendar day in the range.
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut out = Vec::new();
        let mut current = self.start;
        while current <= self.end {
            out.push(current);
            current += Duration::days(1);
        }
        out
    }

    /// School days (Monday..Friday) in the range.
    pub fn school_days(&self) -> Vec<NaiveDate> {
        self.days()
            .into_iter()
            .filter(|d| Weekday::of_date(*d).is_some())
            .collect()
    }
}

/// Monday of the week containing `date`.
pub fn monday_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_weekday_of_date() {
        assert_eq!(Weekday::of_date(d(2024, 9, 2)), Some(Weekday::Monday));
        assert_eq!(Weekday::of_date(d(2024, 9, 6)), Some(Weekday::Friday));
        assert_eq!(Weekday::of_date(d(2024, 9, 7)), None);
        assert_eq!(Weekday::of_date(d(2024, 9, 8)), None);
    }

    #[test]
    fn test_gpu_numbering() {
        assert_eq!(Weekday::from_gpu_number(1), Some(Weekday::Monday));
        assert_eq!(Weekday::from_gpu_number(5), Some(Weekday::Friday));
        assert_eq!(Weekday::from_gpu_number(0), None);
        assert_eq!(Weekday::from_gpu_number(6), None);
        assert_eq!(Weekday::Wednesday.gpu_number(), 3);
    }

    #[test]
    fn test_attendance_parse() {
        let a: Attendance = "Mo,Mi,Fr".parse().unwrap();
        assert_eq!(a.bits(), 1 | 4 | 16);
        assert!(a.contains(Weekday::Wednesday));
        assert!(!a.contains(Weekday::Tuesday));
        assert_eq!(a.day_count(), 3);

        let all: Attendance = "Mo-Fr".parse().unwrap();
        assert!(all.is_full());
        assert_eq!(all.bits(), 31);

        assert!("Mo,Sa".parse::<Attendance>().is_err());
    }

    #[test]
    fn test_attendance_display() {
        assert_eq!(Attendance::from_bits(0b0_1010).to_string(), "Di, Do");
        assert_eq!(Attendance::NONE.to_string(), "Keine");
        assert_eq!(Attendance::default(), Attendance::ALL);
    }

    #[test]
    fn test_attendance_from_bits_masks_weekend() {
        assert_eq!(Attendance::from_bits(0xFF).bits(), 31);
    }

    #[test]
    fn test_school_week() {
        let week = DateRange::school_week(d(2024, 9, 5));
        assert_eq!(week.start, d(2024, 9, 2));
        assert_eq!(week.end, d(2024, 9, 6));
        assert_eq!(week.school_days().len(), 5);
    }

    #[test]
    fn test_school_days_skip_weekend() {
        let range = DateRange::new(d(2024, 9, 6), d(2024, 9, 9));
        assert_eq!(range.days().len(), 4);
        assert_eq!(range.school_days(), vec![d(2024, 9, 6), d(2024, 9, 9)]);
    }

    #[test]
    fn test_reversed_range() {
        let range = DateRange::new(d(2024, 9, 9), d(2024, 9, 2));
        assert_eq!(range.start, d(2024, 9, 2));
        assert!(range.contains(d(2024, 9, 5)));
        assert!(!range.contains(d(2024, 9, 10)));
    }
}
