//! Supervision planning domain models.
//!
//! Provides the core data types for representing a school's break
//! supervision problem and its solutions.
//!
//! # Domain Mappings
//!
//! | aufsichtsplan | Scheduling term |
//! |---------------|-----------------|
//! | Teacher | Resource (with quota) |
//! | Floor | Location with demand per period |
//! | DutySlot | Demand point (date × break × floor) |
//! | Plan | Schedule |

mod calendar;
pub mod duty;
mod floor;
mod plan;
mod teacher;

pub use calendar::{monday_of_week, Attendance, DateRange, Weekday};
pub use duty::{Assignment, DutySlot};
pub use floor::{sort_for_display, Floor, FloorId};
pub use plan::{Plan, Violation, ViolationKind};
pub use teacher::{Lesson, Teacher, TeacherId};
