//! Break supervision planning for schools.
//!
//! Assigns teachers to supervision duties during the breaks of a school
//! week, respecting floor contingents, teacher quotas, attendance days and
//! the rule that a teacher supervises only next to their own lessons.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Teacher`, `Floor`, `DutySlot`,
//!   `Assignment`, `Plan`, `Attendance`, `DateRange`
//! - **`validation`**: Input integrity checks (duplicate IDs and codes,
//!   floor references, lesson periods)
//! - **`scheduler`**: Greedy multi-stage planner with fallbacks, plan KPIs
//!   and rule audit
//! - **`optimize`**: Min-cost-flow coverage with a fairness local search
//! - **`gpu`**: GPU001 timetable import, GPU009 supervision export
//! - **`roster`**: CSV teacher roster import
//! - **`views`**: Week grid, duty counts and manual edits
//! - **`export`**: Text tables and CSV of a week
//! - **`store`**: JSON persistence
//! - **`config`**: TOML configuration
//! - **`update`**, **`version`**: Release check and self-update
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Ahuja, Magnanti & Orlin (1993), "Network Flows"

pub mod config;
pub mod error;
pub mod export;
pub mod gpu;
pub mod models;
pub mod optimize;
pub mod roster;
pub mod scheduler;
pub mod store;
pub mod update;
pub mod validation;
pub mod version;
pub mod views;

pub use error::{AufsichtError, Result};
