//! Solver input: teachers, break slots and tuning knobs.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{FloorId, TeacherId, Weekday};

/// Longest fairness phase accepted, in seconds.
pub const MAX_TIME_LIMIT_SECS: u64 = 3600;

/// Default priority rank of a teacher.
pub const DEFAULT_PRIO_RANK: u32 = 10;

/// A teacher as seen by the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct TeacherSpec {
    pub id: TeacherId,
    /// Duties the teacher should receive.
    pub target: u32,
    /// Scales the floor costs; higher ranks make off-preference duties dearer.
    pub prio_rank: u32,
    pub preferred_floor: Option<FloorId>,
    /// Explicit cost per floor, overriding `preferred_floor`.
    pub floor_weights: Option<BTreeMap<FloorId, u32>>,
    /// Taught periods per weekday.
    pub day_periods: HashMap<Weekday, BTreeSet<u8>>,
    /// Days present at school; weights missing duties.
    pub availability_days: u32,
}

impl TeacherSpec {
    pub fn new(id: TeacherId, target: u32) -> Self {
        Self {
            id,
            target,
            prio_rank: DEFAULT_PRIO_RANK,
            preferred_floor: None,
            floor_weights: None,
            day_periods: HashMap::new(),
            availability_days: 0,
        }
    }

    pub fn with_preferred_floor(mut self, floor_id: FloorId) -> Self {
        self.preferred_floor = Some(floor_id);
        self
    }

    pub fn with_prio_rank(mut self, prio_rank: u32) -> Self {
        self.prio_rank = prio_rank;
        self
    }

    pub fn with_floor_weights(mut self, weights: BTreeMap<FloorId, u32>) -> Self {
        self.floor_weights = Some(weights);
        self
    }

    pub fn with_periods(mut self, weekday: Weekday, periods: impl IntoIterator<Item = u8>) -> Self {
        self.day_periods.entry(weekday).or_default().extend(periods);
        self
    }

    pub fn with_availability_days(mut self, days: u32) -> Self {
        self.availability_days = days;
        self
    }

    /// Whether the teacher teaches right before or after a break.
    pub fn has_adjacent_lesson(
        &self,
        weekday: Weekday,
        before_period: Option<u8>,
        after_period: Option<u8>,
    ) -> bool {
        let Some(periods) = self.day_periods.get(&weekday) else {
            return false;
        };
        before_period.is_some_and(|p| periods.contains(&p))
            || after_period.is_some_and(|p| periods.contains(&p))
    }

    /// Cost of placing this teacher on a floor.
    ///
    /// With floor weights the weight is used (unknown floors cost one more
    /// than the heaviest weight); otherwise the preferred floor costs 0, no
    /// preference 1 and any other floor 3. The base is multiplied by
    /// `100 + min(prio_rank, 100)`.
    pub fn priority_cost(&self, floor_id: FloorId) -> u64 {
        let base = match &self.floor_weights {
            Some(weights) if !weights.is_empty() => {
                let fallback = weights.values().copied().max().unwrap_or(3) + 1;
                weights.get(&floor_id).copied().unwrap_or(fallback)
            }
            _ => match self.preferred_floor {
                None => 1,
                Some(f) if f == floor_id => 0,
                Some(_) => 3,
            },
        };
        u64::from(base) * (100 + u64::from(self.prio_rank.min(100)))
    }
}

/// One break on one date, with the teachers needed per floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakSlotSpec {
    pub slot_id: String,
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub break_index: u8,
    pub before_period: Option<u8>,
    pub after_period: Option<u8>,
    /// Teachers needed per floor.
    pub needs: BTreeMap<FloorId, u32>,
}

impl BreakSlotSpec {
    /// Total teachers needed in this break.
    pub fn total_need(&self) -> u32 {
        self.needs.values().sum()
    }
}

/// Solver tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Allowed distance of a load from its target before it is penalised.
    pub fairness_band: Option<u32>,
    /// Penalise a second duty on the same day heavily.
    pub max_one_per_day: bool,
    /// Wall-clock budget of the fairness phase, in seconds.
    pub time_limit_secs: f64,
    /// Local search passes.
    pub max_iterations: usize,
    /// Weight of one duty outside the fairness band.
    pub band_penalty: u64,
    /// Hard cap on duties above `target + fairness_band`.
    pub max_extra_duties: Option<u32>,
    /// Seed of the local search; random when unset.
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            fairness_band: Some(1),
            max_one_per_day: false,
            time_limit_secs: 30.0,
            max_iterations: 10_000,
            band_penalty: 200_000,
            max_extra_duties: None,
            seed: None,
        }
    }
}

impl SolverConfig {
    /// Budget of the fairness phase, between one second and
    /// `MAX_TIME_LIMIT_SECS`.
    pub fn time_limit(&self) -> Duration {
        let ceiling = Duration::from_secs(MAX_TIME_LIMIT_SECS);
        Duration::try_from_secs_f64(self.time_limit_secs.max(1.0))
            .map_or(ceiling, |limit| limit.min(ceiling))
    }

    /// Hard load cap of a teacher, if any.
    pub fn load_cap(&self, target: u32) -> Option<u32> {
        self.max_extra_duties
            .map(|extra| target + self.fairness_band.unwrap_or(0) + extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_cost_by_preference() {
        let neutral = TeacherSpec::new(1, 2);
        assert_eq!(neutral.priority_cost(1), 110);

        let prefers = TeacherSpec::new(1, 2).with_preferred_floor(1);
        assert_eq!(prefers.priority_cost(1), 0);
        assert_eq!(prefers.priority_cost(2), 330);
    }

    #[test]
    fn test_priority_cost_by_weights() {
        let t = TeacherSpec::new(1, 2)
            .with_prio_rank(500)
            .with_floor_weights(BTreeMap::from([(1, 2), (2, 5)]));
        assert_eq!(t.priority_cost(1), 400);
        assert_eq!(t.priority_cost(2), 1000);
        assert_eq!(t.priority_cost(9), 1200);
    }

    #[test]
    fn test_adjacent_lesson() {
        let t = TeacherSpec::new(1, 1).with_periods(Weekday::Monday, [2]);
        assert!(t.has_adjacent_lesson(Weekday::Monday, Some(2), Some(3)));
        assert!(!t.has_adjacent_lesson(Weekday::Monday, Some(4), Some(5)));
        assert!(!t.has_adjacent_lesson(Weekday::Tuesday, Some(2), Some(3)));
    }

    #[test]
    fn test_load_cap() {
        let config = SolverConfig {
            fairness_band: Some(1),
            max_extra_duties: Some(2),
            ..SolverConfig::default()
        };
        assert_eq!(config.load_cap(3), Some(6));
        assert_eq!(SolverConfig::default().load_cap(3), None);
    }

    #[test]
    fn test_time_limit_floor() {
        let config = SolverConfig {
            time_limit_secs: 0.1,
            ..SolverConfig::default()
        };
        assert_eq!(config.time_limit(), Duration::from_secs(1));
    }

    #[test]
    fn test_time_limit_ceiling() {
        let ceiling = Duration::from_secs(MAX_TIME_LIMIT_SECS);
        for time_limit_secs in [1e30, f64::INFINITY, f64::NAN, 7200.0] {
            let config = SolverConfig {
                time_limit_secs,
                ..SolverConfig::default()
            };
            let limit = config.time_limit();
            assert!(limit >= Duration::from_secs(1) && limit <= ceiling);
        }
    }
}
