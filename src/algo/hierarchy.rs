//! Levelization of logic networks.
//!
//! A [`NetworkHierarchy`] assigns every vertex a `level` (the longest path
//! from any primary input) and an `inv_level` (the longest path to any
//! primary output). Long fan-in edges can be subdivided with *balance
//! vertices* so that every predecessor of a vertex sits exactly one level
//! below it, which exact placement uses for symmetry breaking and path
//! balancing.

use std::collections::VecDeque;

use fixedbitset::FixedBitSet;
use hashbrown::HashMap;

use crate::network::{EdgeIndex, LogicNetwork, NodeIndex};

/// Rank information over a logic network.
#[derive(Clone, Debug, Default)]
pub struct NetworkHierarchy {
    levels: Vec<u32>,
    inv_levels: Vec<u32>,
    max_level: u32,
    max_inv_level: u32,
    /// Maps balance vertices to the original edge they subdivide. Chains of
    /// balance vertices all map to the original edge.
    balance_edges: HashMap<NodeIndex, EdgeIndex>,
}

impl NetworkHierarchy {
    /// Levelizes `network`: every vertex without predecessors gets level 0,
    /// every other vertex one more than the maximum of its predecessors;
    /// inverse levels are computed symmetrically from the outputs.
    pub fn new(network: &LogicNetwork) -> Self {
        let mut hierarchy = NetworkHierarchy {
            levels: vec![0; network.node_count()],
            inv_levels: vec![0; network.node_count()],
            ..Default::default()
        };
        hierarchy.levelize(network);
        hierarchy
    }

    /// The height of the hierarchy, i.e., the highest stored level.
    pub fn height(&self) -> u32 {
        self.max_level
    }

    /// The inverse height, i.e., the highest stored inverse level.
    pub fn inv_height(&self) -> u32 {
        self.max_inv_level
    }

    /// The level of `v`, or 0 if none was assigned.
    pub fn level(&self, v: NodeIndex) -> u32 {
        self.levels.get(v.index()).copied().unwrap_or(0)
    }

    /// The inverse level of `v`, or 0 if none was assigned.
    pub fn inv_level(&self, v: NodeIndex) -> u32 {
        self.inv_levels.get(v.index()).copied().unwrap_or(0)
    }

    /// Assigns level `l` to `v`.
    pub fn set_level(&mut self, v: NodeIndex, l: u32) {
        if self.levels.len() <= v.index() {
            self.levels.resize(v.index() + 1, 0);
        }
        self.levels[v.index()] = l;
        self.max_level = self.max_level.max(l);
    }

    /// Assigns inverse level `l` to `v`.
    pub fn set_inv_level(&mut self, v: NodeIndex, l: u32) {
        if self.inv_levels.len() <= v.index() {
            self.inv_levels.resize(v.index() + 1, 0);
        }
        self.inv_levels[v.index()] = l;
        self.max_inv_level = self.max_inv_level.max(l);
    }

    /// The original edge of balance vertex `v`, or `None` if `v` is not a
    /// balance vertex.
    pub fn balance_edge(&self, v: NodeIndex) -> Option<EdgeIndex> {
        self.balance_edges.get(&v).copied()
    }

    /// Subdivides `e` by inserting a balance vertex, which is recorded
    /// together with the original edge it stands for. Returns the balance
    /// vertex.
    pub fn subdivide_edge(&mut self, network: &mut LogicNetwork, e: EdgeIndex) -> NodeIndex {
        let source = network.source(e);
        let b = network.subdivide_edge(e);

        self.store_balance_edge(network, b, e);
        self.set_level(b, self.level(source) + 1);
        self.set_inv_level(b, self.inv_level(network.target(network.out_edges(b)[0])) + 1);

        b
    }

    /// Uses iterative subdivision to elongate paths which skip levels:
    /// afterwards, every edge spans exactly one level.
    pub fn balance_paths(&mut self, network: &mut LogicNetwork) {
        let unbalanced: Vec<EdgeIndex> = network
            .edges()
            .filter(|&e| self.level(network.source(e)) + 1 < self.level(network.target(e)))
            .collect();

        for e in unbalanced {
            let diff = self.level(network.target(e)) - self.level(network.source(e)) - 1;

            let mut div = e;
            for _ in 0..diff {
                let b = self.subdivide_edge(network, div);
                div = network.out_edges(b)[0];
            }
        }
    }

    /// Moves all primary outputs to the same highest level. This does not
    /// subdivide any edges; call [`Self::balance_paths`] for that.
    pub fn unify_output_ranks(&mut self, network: &LogicNetwork) {
        let height = self.height();
        for po in network.pos().collect::<Vec<_>>() {
            self.set_level(po, height);
        }
    }

    /// Moves all primary inputs to the same highest inverse level.
    pub fn unify_inv_input_ranks(&mut self, network: &LogicNetwork) {
        let inv_height = self.inv_height();
        for pi in network.pis().collect::<Vec<_>>() {
            self.set_inv_level(pi, inv_height);
        }
    }

    /// Balance vertices chained onto the same original edge all resolve to
    /// that edge.
    fn store_balance_edge(&mut self, network: &LogicNetwork, v: NodeIndex, e: EdgeIndex) {
        let original = self
            .balance_edges
            .get(&network.source(e))
            .or_else(|| self.balance_edges.get(&network.target(e)))
            .copied()
            .unwrap_or(e);
        self.balance_edges.insert(v, original);
    }

    /// Forward and backward longest-path relaxation in topological order.
    fn levelize(&mut self, network: &LogicNetwork) {
        let order = topological_order(network);

        for &v in &order {
            let level = network
                .predecessors(v)
                .map(|p| self.level(p) + 1)
                .max()
                .unwrap_or(0);
            self.set_level(v, level);
        }

        for &v in order.iter().rev() {
            let inv_level = network
                .successors(v)
                .map(|s| self.inv_level(s) + 1)
                .max()
                .unwrap_or(0);
            self.set_inv_level(v, inv_level);
        }
    }
}

/// Kahn's algorithm over the network's vertices.
fn topological_order(network: &LogicNetwork) -> Vec<NodeIndex> {
    let n = network.node_count();
    let mut in_degrees: Vec<usize> = network.vertices().map(|v| network.in_degree(v)).collect();
    let mut emitted = FixedBitSet::with_capacity(n);
    let mut queue: VecDeque<NodeIndex> = network
        .vertices()
        .filter(|&v| network.in_degree(v) == 0)
        .collect();
    let mut order = Vec::with_capacity(n);

    while let Some(v) = queue.pop_front() {
        if emitted.contains(v.index()) {
            continue;
        }
        emitted.insert(v.index());
        order.push(v);

        for s in network.successors(v) {
            in_degrees[s.index()] = in_degrees[s.index()].saturating_sub(1);
            if in_degrees[s.index()] == 0 {
                queue.push_back(s);
            }
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> (LogicNetwork, NodeIndex, NodeIndex) {
        let mut ntk = LogicNetwork::new();
        let a = ntk.create_pi("a");
        let b = ntk.create_pi("b");
        let inv = ntk.create_not(a);
        let g = ntk.create_and(inv, b);
        let po = ntk.create_po(g, "f");
        (ntk, b, po)
    }

    #[test]
    fn levels_follow_longest_paths() {
        let (ntk, b, po) = diamond();
        let h = NetworkHierarchy::new(&ntk);

        assert_eq!(h.level(b), 0);
        assert_eq!(h.level(po), 3);
        assert_eq!(h.height(), 3);
        assert_eq!(h.inv_level(po), 0);
        assert_eq!(h.inv_level(b), 2);
    }

    #[test]
    fn balancing_subdivides_level_skipping_edges() {
        let (mut ntk, b, _) = diamond();
        let mut h = NetworkHierarchy::new(&ntk);

        // b -> AND skips a level (0 -> 2)
        h.balance_paths(&mut ntk);

        for e in ntk.edges().collect::<Vec<_>>() {
            assert_eq!(
                h.level(ntk.source(e)) + 1,
                h.level(ntk.target(e)),
                "edge spans exactly one level"
            );
        }

        // exactly one balance vertex was inserted after b
        let balance = ntk
            .successors(b)
            .find(|&s| h.balance_edge(s).is_some())
            .expect("balance vertex exists");
        assert_eq!(h.level(balance), 1);
    }

    #[test]
    fn output_ranks_unify() {
        let mut ntk = LogicNetwork::new();
        let a = ntk.create_pi("a");
        let b = ntk.create_pi("b");
        let g = ntk.create_and(a, b);
        let po1 = ntk.create_po(g, "f");
        let po2 = ntk.create_po(b, "g");

        let mut h = NetworkHierarchy::new(&ntk);
        assert_ne!(h.level(po1), h.level(po2));

        h.unify_output_ranks(&ntk);
        assert_eq!(h.level(po1), h.level(po2));
        assert_eq!(h.level(po2), h.height());
    }
}
