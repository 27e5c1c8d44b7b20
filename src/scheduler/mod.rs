//! Greedy planner and KPI evaluation.
//!
//! Provides the multi-stage greedy supervision planner and plan quality
//! metrics.
//!
//! # Algorithm
//!
//! `GreedyPlanner` walks the slots chronologically and fills each
//! position with the best candidate under the full rule set, then relaxes
//! the rules in three fallback stages. It is not optimal, but fast and
//! predictable; see [`crate::optimize`] for the exact model.
//!
//! # KPI
//!
//! `PlanKpi` computes coverage, shortfall and quota deviation;
//! `audit_plan` re-checks the hard rules of an edited plan.

mod greedy;
mod kpi;

pub use greedy::{build_slots, GreedyPlanner, PlanOutcome, PlanStats};
pub use kpi::{audit_plan, PlanKpi, TeacherLoad};
