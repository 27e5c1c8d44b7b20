//! Min-cost max-flow by successive shortest paths.
//!
//! Shortest paths are found with a queue-based Bellman-Ford (SPFA), so
//! residual edges with negative cost are handled without potentials.
//!
//! # Complexity
//! O(F * V * E) where F=total flow.

use std::collections::VecDeque;

/// Edge handle returned by [`MinCostFlow::add_edge`].
pub type EdgeId = usize;

#[derive(Debug, Clone)]
struct Edge {
    to: usize,
    capacity: i64,
    cost: i64,
    flow: i64,
}

/// Flow network with integer capacities and costs.
#[derive(Debug, Clone, Default)]
pub struct MinCostFlow {
    edges: Vec<Edge>,
    adjacency: Vec<Vec<EdgeId>>,
}

impl MinCostFlow {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its index.
    pub fn add_node(&mut self) -> usize {
        self.adjacency.push(Vec::new());
        self.adjacency.len() - 1
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Adds a directed edge and its residual twin.
    pub fn add_edge(&mut self, from: usize, to: usize, capacity: i64, cost: i64) -> EdgeId {
        let id = self.edges.len();
        self.edges.push(Edge {
            to,
            capacity,
            cost,
            flow: 0,
        });
        self.adjacency[from].push(id);
        self.edges.push(Edge {
            to: from,
            capacity: 0,
            cost: -cost,
            flow: 0,
        });
        self.adjacency[to].push(id + 1);
        id
    }

    /// Flow currently on an edge.
    pub fn flow(&self, edge: EdgeId) -> i64 {
        self.edges[edge].flow
    }

    fn residual(&self, edge: EdgeId) -> i64 {
        let e = &self.edges[edge];
        e.capacity - e.flow
    }

    /// Pushes as much flow as possible from `source` to `sink` at minimum
    /// cost. Returns `(flow, cost)`.
    pub fn solve(&mut self, source: usize, sink: usize) -> (i64, i64) {
        let n = self.adjacency.len();
        let mut total_flow = 0;
        let mut total_cost = 0;

        loop {
            let mut dist = vec![i64::MAX; n];
            let mut via: Vec<Option<EdgeId>> = vec![None; n];
            let mut queued = vec![false; n];
            let mut queue = VecDeque::new();

            dist[source] = 0;
            queue.push_back(source);
            queued[source] = true;

            while let Some(u) = queue.pop_front() {
                queued[u] = false;
                for &id in &self.adjacency[u] {
                    if self.residual(id) <= 0 {
                        continue;
                    }
                    let e = &self.edges[id];
                    let candidate = dist[u] + e.cost;
                    if candidate < dist[e.to] {
                        dist[e.to] = candidate;
                        via[e.to] = Some(id);
                        if !queued[e.to] {
                            queued[e.to] = true;
                            queue.push_back(e.to);
                        }
                    }
                }
            }

            if dist[sink] == i64::MAX {
                break;
            }

            let mut push = i64::MAX;
            let mut v = sink;
            while let Some(id) = via[v] {
                push = push.min(self.residual(id));
                v = self.edges[id ^ 1].to;
            }

            let mut v = sink;
            while let Some(id) = via[v] {
                self.edges[id].flow += push;
                self.edges[id ^ 1].flow -= push;
                v = self.edges[id ^ 1].to;
            }

            total_flow += push;
            total_cost += push * dist[sink];
        }

        (total_flow, total_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_path() {
        let mut g = MinCostFlow::new();
        let s = g.add_node();
        let t = g.add_node();
        let e = g.add_edge(s, t, 3, 2);
        assert_eq!(g.solve(s, t), (3, 6));
        assert_eq!(g.flow(e), 3);
    }

    #[test]
    fn test_prefers_cheaper_path() {
        let mut g = MinCostFlow::new();
        let s = g.add_node();
        let a = g.add_node();
        let b = g.add_node();
        let t = g.add_node();
        g.add_edge(s, a, 1, 0);
        g.add_edge(s, b, 1, 0);
        let cheap = g.add_edge(a, t, 1, 1);
        let dear = g.add_edge(b, t, 1, 5);
        let (flow, cost) = g.solve(s, t);
        assert_eq!(flow, 2);
        assert_eq!(cost, 6);
        assert_eq!(g.flow(cheap), 1);
        assert_eq!(g.flow(dear), 1);
    }

    #[test]
    fn test_reroutes_through_residual_edge() {
        // Both units share x->t; one of them has to come back over x and
        // leave through the expensive a->t edge.
        let mut g = MinCostFlow::new();
        let s = g.add_node();
        let a = g.add_node();
        let b = g.add_node();
        let x = g.add_node();
        let t = g.add_node();
        g.add_edge(s, a, 1, 0);
        g.add_edge(s, b, 1, 0);
        g.add_edge(a, x, 1, 0);
        g.add_edge(b, x, 1, 0);
        g.add_edge(x, t, 1, 0);
        g.add_edge(a, t, 1, 3);
        let (flow, cost) = g.solve(s, t);
        assert_eq!(flow, 2);
        assert_eq!(cost, 3);
    }

    #[test]
    fn test_disconnected() {
        let mut g = MinCostFlow::new();
        let s = g.add_node();
        let t = g.add_node();
        assert_eq!(g.solve(s, t), (0, 0));
        assert_eq!(g.node_count(), 2);
    }
}
