//! GPU timetable files.
//!
//! `GPU001` carries the lessons of the timetable and feeds teacher
//! attendance; `GPU009` carries the finished supervision plan back to the
//! timetable software.

mod gpu001;
mod gpu009;

pub use gpu001::{
    clear_lessons, import_gpu001, import_gpu001_file, lesson_stats, parse_gpu001_line,
    update_attendance_from_lessons, Gpu001Stats, LessonStats,
};
pub use gpu009::generate_gpu009;
