//! Break supervision solver.
//!
//! # Phases
//!
//! 1. Minimise the number of uncovered positions.
//! 2. Among those plans, minimise the summed floor cost.
//! 3. Among those plans, balance loads (fairness objective).
//!
//! Phases 1 and 2 are solved exactly as one min-cost max-flow:
//!
//! ```text
//! source -> teacher -> teacher x break -> break x floor -> sink
//! ```
//!
//! The teacher x break node admits one unit, so a teacher covers at most
//! one floor per break. Each unit a teacher takes above its target costs a
//! little more than the previous one; these costs are scaled below the
//! floor costs and only break ties, spreading the initial loads.
//!
//! Phase 3 is a seeded local search over moves that keep coverage and the
//! floor cost unchanged: handing a position to another eligible teacher of
//! equal cost, and exchanging the positions of two teachers.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::flow::{EdgeId, MinCostFlow};
use super::input::{BreakSlotSpec, SolverConfig, TeacherSpec};
use crate::models::{FloorId, TeacherId, Weekday};

const WEIGHT_MAX_DEV: u64 = 1_000_000;
const WEIGHT_TOTAL_DEV: u64 = 10_000;
const WEIGHT_DAILY_STRICT: u64 = 500_000;
const WEIGHT_DAILY_SOFT: u64 = 100;

/// Outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStatus {
    /// Coverage and cost are minimal and the fairness objective is zero.
    Optimal,
    /// Coverage and cost are minimal; fairness is a local optimum.
    Feasible,
    /// Nothing could be planned.
    Infeasible,
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SolverStatus::Optimal => "OPTIMAL",
            SolverStatus::Feasible => "FEASIBLE",
            SolverStatus::Infeasible => "INFEASIBLE",
        };
        f.write_str(s)
    }
}

/// A teacher placed on a floor during a break.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AssignmentDecision {
    pub date: NaiveDate,
    pub break_index: u8,
    pub floor_id: FloorId,
    pub teacher_id: TeacherId,
    pub slot_id: String,
    pub weekday: Weekday,
}

/// Solver output.
#[derive(Debug, Clone)]
pub struct SolverResult {
    pub status: SolverStatus,
    /// Decisions ordered by date, break, floor and teacher.
    pub assignments: Vec<AssignmentDecision>,
    /// Duties per teacher, including teachers without any.
    pub loads: BTreeMap<TeacherId, u32>,
    /// Largest distance of a load from its target.
    pub max_dev: u32,
    pub priority_cost: u64,
    /// Duties above target plus missing duties weighted by presence days.
    pub total_dev: u64,
    /// Duties beyond the first per teacher and day.
    pub daily_excess: u32,
    /// Duties outside the fairness band.
    pub band_violation: u32,
    pub total_shortfall: u32,
    /// Missing teachers per (slot, floor); only non-zero entries.
    pub shortfalls: BTreeMap<(String, FloorId), u32>,
    pub wall_time: Duration,
    /// Local search passes run.
    pub iterations: usize,
}

/// Supervision planning model over one set of break slots.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use aufsichtsplan::models::Weekday;
/// use aufsichtsplan::optimize::{BreakSlotSpec, BreakSupervisionSolver, SolverConfig, TeacherSpec};
/// use chrono::NaiveDate;
///
/// let teachers = vec![TeacherSpec::new(1, 1).with_periods(Weekday::Monday, [2])];
/// let slots = vec![BreakSlotSpec {
///     slot_id: "mo-2".into(),
///     date: NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
///     weekday: Weekday::Monday,
///     break_index: 2,
///     before_period: Some(2),
///     after_period: Some(3),
///     needs: BTreeMap::from([(1, 1)]),
/// }];
///
/// let result = BreakSupervisionSolver::new(teachers, slots, SolverConfig::default()).solve();
/// assert_eq!(result.total_shortfall, 0);
/// assert_eq!(result.loads[&1], 1);
/// ```
#[derive(Debug, Clone)]
pub struct BreakSupervisionSolver {
    teachers: Vec<TeacherSpec>,
    slots: Vec<BreakSlotSpec>,
    config: SolverConfig,
    /// `eligible[teacher][slot]`
    eligible: Vec<Vec<bool>>,
    total_need: u32,
}

/// One demand of a slot: `need` teachers on `floor_id`.
#[derive(Debug, Clone, Copy)]
struct Demand {
    slot: usize,
    floor_id: FloorId,
    need: u32,
}

impl BreakSupervisionSolver {
    pub fn new(
        teachers: impl IntoIterator<Item = TeacherSpec>,
        slots: impl IntoIterator<Item = BreakSlotSpec>,
        config: SolverConfig,
    ) -> Self {
        let teachers: Vec<TeacherSpec> = teachers.into_iter().collect();
        let slots: Vec<BreakSlotSpec> = slots.into_iter().collect();

        let eligible = teachers
            .iter()
            .map(|t| {
                slots
                    .iter()
                    .map(|s| t.has_adjacent_lesson(s.weekday, s.before_period, s.after_period))
                    .collect()
            })
            .collect();
        let total_need = slots.iter().map(BreakSlotSpec::total_need).sum();

        let total_target: u32 = teachers.iter().map(|t| t.target).sum();
        if total_target < total_need {
            warn!(
                total_target,
                total_need, "summed targets are below the total need; some duties exceed targets"
            );
        }

        Self {
            teachers,
            slots,
            config,
            eligible,
            total_need,
        }
    }

    /// Whether a teacher may supervise a slot.
    pub fn is_eligible(&self, teacher_id: TeacherId, slot_id: &str) -> bool {
        let Some(ti) = self.teachers.iter().position(|t| t.id == teacher_id) else {
            return false;
        };
        self.slots
            .iter()
            .position(|s| s.slot_id == slot_id)
            .is_some_and(|si| self.eligible[ti][si])
    }

    /// Number of teachers eligible for a slot.
    pub fn eligible_count(&self, slot_id: &str) -> usize {
        let Some(si) = self.slots.iter().position(|s| s.slot_id == slot_id) else {
            return 0;
        };
        self.eligible.iter().filter(|row| row[si]).count()
    }

    pub fn total_need(&self) -> u32 {
        self.total_need
    }

    /// Runs all phases.
    pub fn solve(&self) -> SolverResult {
        let started = Instant::now();

        if self.teachers.is_empty() {
            warn!("no teachers available for planning");
            let status = if self.total_need > 0 {
                SolverStatus::Infeasible
            } else {
                SolverStatus::Optimal
            };
            return SolverResult {
                status,
                assignments: Vec::new(),
                loads: BTreeMap::new(),
                max_dev: 0,
                priority_cost: 0,
                total_dev: 0,
                daily_excess: 0,
                band_violation: 0,
                total_shortfall: self.total_need,
                shortfalls: BTreeMap::new(),
                wall_time: started.elapsed(),
                iterations: 0,
            };
        }

        let demands: Vec<Demand> = self
            .slots
            .iter()
            .enumerate()
            .flat_map(|(si, s)| {
                s.needs
                    .iter()
                    .filter(|(_, need)| **need > 0)
                    .map(move |(&floor_id, &need)| Demand {
                        slot: si,
                        floor_id,
                        need,
                    })
            })
            .collect();

        let (positions, covered) = self.cover(&demands);

        let mut shortfalls = BTreeMap::new();
        for (di, d) in demands.iter().enumerate() {
            let missing = d.need - covered[di];
            if missing == 0 {
                continue;
            }
            let slot = &self.slots[d.slot];
            let eligible = self.eligible.iter().filter(|row| row[d.slot]).count();
            error!(
                date = %slot.date,
                weekday = %slot.weekday,
                break_index = slot.break_index,
                floor = d.floor_id,
                need = d.need,
                eligible,
                missing,
                "break cannot be fully covered"
            );
            shortfalls.insert((slot.slot_id.clone(), d.floor_id), missing);
        }
        let total_shortfall = shortfalls.values().sum();

        let mut search = LocalSearch::new(self, positions);
        let phase_two_cost = search.priority_cost();
        let (iterations, converged) = search.run();
        debug_assert_eq!(phase_two_cost, search.priority_cost());

        let metrics = search.metrics();
        let status = if metrics.score == 0 {
            SolverStatus::Optimal
        } else {
            SolverStatus::Feasible
        };

        let mut assignments: Vec<AssignmentDecision> = search
            .positions
            .iter()
            .map(|p| {
                let slot = &self.slots[p.slot];
                AssignmentDecision {
                    date: slot.date,
                    break_index: slot.break_index,
                    floor_id: p.floor_id,
                    teacher_id: self.teachers[p.teacher].id,
                    slot_id: slot.slot_id.clone(),
                    weekday: slot.weekday,
                }
            })
            .collect();
        assignments.sort();

        let loads = self
            .teachers
            .iter()
            .zip(&search.loads)
            .map(|(t, &load)| (t.id, load))
            .collect();

        info!(
            %status,
            assigned = assignments.len(),
            shortfall = total_shortfall,
            priority_cost = phase_two_cost,
            max_dev = metrics.max_dev,
            daily_excess = metrics.daily_excess,
            iterations,
            converged,
            "solver finished"
        );

        SolverResult {
            status,
            assignments,
            loads,
            max_dev: metrics.max_dev,
            priority_cost: phase_two_cost,
            total_dev: metrics.total_dev,
            daily_excess: metrics.daily_excess,
            band_violation: metrics.band_violation,
            total_shortfall,
            shortfalls,
            wall_time: started.elapsed(),
            iterations,
        }
    }

    /// Phases 1 and 2. Returns the positions and the coverage per demand.
    fn cover(&self, demands: &[Demand]) -> (Vec<Position>, Vec<u32>) {
        let need = i64::from(self.total_need);
        // Tie-break costs stay below one unit of floor cost.
        let scale = need * (need + 1) / 2 + 1;

        let mut g = MinCostFlow::new();
        let source = g.add_node();
        let sink = g.add_node();

        let teacher_nodes: Vec<usize> = self.teachers.iter().map(|_| g.add_node()).collect();
        let demand_nodes: Vec<usize> = demands.iter().map(|_| g.add_node()).collect();
        let sink_edges: Vec<EdgeId> = demands
            .iter()
            .zip(&demand_nodes)
            .map(|(d, &node)| g.add_edge(node, sink, i64::from(d.need), 0))
            .collect();

        let mut demands_by_slot: HashMap<usize, Vec<usize>> = HashMap::new();
        for (di, d) in demands.iter().enumerate() {
            demands_by_slot.entry(d.slot).or_default().push(di);
        }

        let mut placement_edges: Vec<(EdgeId, usize, usize)> = Vec::new();
        for (ti, t) in self.teachers.iter().enumerate() {
            let reachable: Vec<usize> = (0..self.slots.len())
                .filter(|&si| self.eligible[ti][si] && demands_by_slot.contains_key(&si))
                .collect();
            if reachable.is_empty() {
                continue;
            }

            let mut units = reachable.len() as u32;
            if let Some(cap) = self.config.load_cap(t.target) {
                units = units.min(cap);
            }
            for k in 1..=units {
                let tie_break = i64::from(k.saturating_sub(t.target));
                g.add_edge(source, teacher_nodes[ti], 1, tie_break);
            }

            for si in reachable {
                let node = g.add_node();
                g.add_edge(teacher_nodes[ti], node, 1, 0);
                for &di in &demands_by_slot[&si] {
                    let cost = t.priority_cost(demands[di].floor_id) as i64 * scale;
                    let edge = g.add_edge(node, demand_nodes[di], 1, cost);
                    placement_edges.push((edge, ti, di));
                }
            }
        }

        let (flow, cost) = g.solve(source, sink);
        debug!(
            nodes = g.node_count(),
            flow,
            priority_cost = cost / scale,
            "coverage phase solved"
        );

        let positions = placement_edges
            .into_iter()
            .filter(|&(edge, _, _)| g.flow(edge) > 0)
            .map(|(_, ti, di)| Position {
                slot: demands[di].slot,
                floor_id: demands[di].floor_id,
                teacher: ti,
            })
            .collect();
        let covered = sink_edges.iter().map(|&e| g.flow(e) as u32).collect();
        (positions, covered)
    }
}

#[derive(Debug, Clone, Copy)]
struct Position {
    slot: usize,
    floor_id: FloorId,
    teacher: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Metrics {
    max_dev: u32,
    total_dev: u64,
    daily_excess: u32,
    band_violation: u32,
    score: u64,
}

/// Phase 3 state.
struct LocalSearch<'a> {
    solver: &'a BreakSupervisionSolver,
    positions: Vec<Position>,
    loads: Vec<u32>,
    day_loads: HashMap<(usize, NaiveDate), u32>,
    busy: HashSet<(usize, usize)>,
    rng: StdRng,
}

impl<'a> LocalSearch<'a> {
    fn new(solver: &'a BreakSupervisionSolver, positions: Vec<Position>) -> Self {
        let mut loads = vec![0; solver.teachers.len()];
        let mut day_loads = HashMap::new();
        let mut busy = HashSet::new();
        for p in &positions {
            loads[p.teacher] += 1;
            *day_loads
                .entry((p.teacher, solver.slots[p.slot].date))
                .or_insert(0) += 1;
            busy.insert((p.teacher, p.slot));
        }
        let rng = match solver.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            solver,
            positions,
            loads,
            day_loads,
            busy,
            rng,
        }
    }

    fn cost(&self, teacher: usize, floor_id: FloorId) -> u64 {
        self.solver.teachers[teacher].priority_cost(floor_id)
    }

    fn priority_cost(&self) -> u64 {
        self.positions
            .iter()
            .map(|p| self.cost(p.teacher, p.floor_id))
            .sum()
    }

    fn metrics(&self) -> Metrics {
        let config = &self.solver.config;
        let mut m = Metrics::default();

        for (t, &load) in self.solver.teachers.iter().zip(&self.loads) {
            let over = load.saturating_sub(t.target);
            let under = t.target.saturating_sub(load);
            m.max_dev = m.max_dev.max(over.max(under));
            m.total_dev += u64::from(over) + u64::from(under) * u64::from(t.availability_days.max(1));

            if let Some(band) = config.fairness_band {
                let low = t.target.saturating_sub(band);
                let high = t.target + band;
                m.band_violation += low.saturating_sub(load) + load.saturating_sub(high);
            }
        }
        m.daily_excess = self.day_loads.values().map(|n| n.saturating_sub(1)).sum();

        let daily_weight = if config.max_one_per_day {
            WEIGHT_DAILY_STRICT
        } else {
            WEIGHT_DAILY_SOFT
        };
        let band_weight = if config.fairness_band.is_some() || config.max_extra_duties.is_some() {
            config.band_penalty
        } else {
            0
        };
        m.score = u64::from(m.max_dev) * WEIGHT_MAX_DEV
            + m.total_dev * WEIGHT_TOTAL_DEV
            + u64::from(m.daily_excess) * daily_weight
            + u64::from(m.band_violation) * band_weight;
        m
    }

    fn set_teacher(&mut self, index: usize, teacher: usize) {
        let p = self.positions[index];
        let date = self.solver.slots[p.slot].date;

        self.loads[p.teacher] -= 1;
        if let Some(n) = self.day_loads.get_mut(&(p.teacher, date)) {
            *n -= 1;
            if *n == 0 {
                self.day_loads.remove(&(p.teacher, date));
            }
        }
        self.busy.remove(&(p.teacher, p.slot));

        self.loads[teacher] += 1;
        *self.day_loads.entry((teacher, date)).or_insert(0) += 1;
        self.busy.insert((teacher, p.slot));
        self.positions[index].teacher = teacher;
    }

    fn can_take(&self, teacher: usize, slot: usize) -> bool {
        self.solver.eligible[teacher][slot] && !self.busy.contains(&(teacher, slot))
    }

    fn within_cap(&self, teacher: usize) -> bool {
        let target = self.solver.teachers[teacher].target;
        self.solver
            .config
            .load_cap(target)
            .map_or(true, |cap| self.loads[teacher] < cap)
    }

    /// Hands position `index` to another teacher if that lowers the score.
    fn try_transfer(&mut self, index: usize, current: u64) -> Option<u64> {
        let p = self.positions[index];
        let cost = self.cost(p.teacher, p.floor_id);

        let mut candidates: Vec<usize> = (0..self.solver.teachers.len())
            .filter(|&b| {
                b != p.teacher
                    && self.can_take(b, p.slot)
                    && self.within_cap(b)
                    && self.cost(b, p.floor_id) == cost
            })
            .collect();
        candidates.shuffle(&mut self.rng);

        for b in candidates {
            self.set_teacher(index, b);
            let score = self.metrics().score;
            if score < current {
                return Some(score);
            }
            self.set_teacher(index, p.teacher);
        }
        None
    }

    /// Exchanges the teachers of two positions if that lowers the score.
    fn try_swap(&mut self, i: usize, j: usize, current: u64) -> Option<u64> {
        let (p, q) = (self.positions[i], self.positions[j]);
        if p.teacher == q.teacher || p.slot == q.slot {
            return None;
        }
        let slots = &self.solver.slots;
        if slots[p.slot].date == slots[q.slot].date {
            return None;
        }
        if !self.can_take(p.teacher, q.slot) || !self.can_take(q.teacher, p.slot) {
            return None;
        }
        let before = self.cost(p.teacher, p.floor_id) + self.cost(q.teacher, q.floor_id);
        let after = self.cost(p.teacher, q.floor_id) + self.cost(q.teacher, p.floor_id);
        if before != after {
            return None;
        }

        self.set_teacher(i, q.teacher);
        self.set_teacher(j, p.teacher);
        let score = self.metrics().score;
        if score < current {
            return Some(score);
        }
        self.set_teacher(j, q.teacher);
        self.set_teacher(i, p.teacher);
        None
    }

    /// Returns the passes run and whether a local optimum was reached.
    fn run(&mut self) -> (usize, bool) {
        let solver = self.solver;
        let deadline = Instant::now() + solver.config.time_limit();
        let max_iterations = solver.config.max_iterations;

        if self.positions.is_empty() {
            return (0, true);
        }

        let n = self.positions.len();
        let mut current = self.metrics().score;
        let mut order: Vec<usize> = (0..n).collect();
        let mut pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();
        let mut iterations = 0;

        while iterations < max_iterations {
            if Instant::now() >= deadline {
                debug!(iterations, "fairness search hit its time limit");
                return (iterations, false);
            }
            if current == 0 {
                return (iterations, true);
            }
            iterations += 1;
            let mut improved = false;

            order.shuffle(&mut self.rng);
            for &i in &order {
                if let Some(score) = self.try_transfer(i, current) {
                    current = score;
                    improved = true;
                }
            }

            pairs.shuffle(&mut self.rng);
            for &(i, j) in &pairs {
                if let Some(score) = self.try_swap(i, j, current) {
                    current = score;
                    improved = true;
                }
            }

            if !improved {
                return (iterations, true);
            }
        }
        (iterations, false)
    }
}
