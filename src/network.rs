//! Logic networks: directed acyclic multigraphs of gates with labeled
//! primary inputs and outputs.
//!
//! The network is stored as an arena of nodes and edges addressed by
//! integer indices; adjacency is kept as per-node edge lists. Back-edges
//! are index lookups, never owning references.

use core::fmt;

/// Index of a network vertex.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub usize);

/// Index of a network edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeIndex(pub usize);

impl NodeIndex {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl EdgeIndex {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The operation a network vertex computes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    And,
    Or,
    Not,
    Maj,
    Fanout,
    Wire,
    Buf,
    Pi,
    Po,
}

impl Operation {
    /// The FGL type string of this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::And => "AND",
            Operation::Or => "OR",
            Operation::Not => "NOT",
            Operation::Maj => "MAJ",
            Operation::Fanout => "FANOUT",
            Operation::Wire => "WIRE",
            Operation::Buf => "BUF",
            Operation::Pi => "PI",
            Operation::Po => "PO",
        }
    }

    /// Parses an FGL type string.
    pub fn from_str(s: &str) -> Option<Operation> {
        match s {
            "AND" => Some(Operation::And),
            "OR" => Some(Operation::Or),
            "NOT" | "INV" => Some(Operation::Not),
            "MAJ" => Some(Operation::Maj),
            "FANOUT" | "F1O2" => Some(Operation::Fanout),
            "WIRE" => Some(Operation::Wire),
            "BUF" => Some(Operation::Buf),
            "PI" => Some(Operation::Pi),
            "PO" => Some(Operation::Po),
            _ => None,
        }
    }

    /// The fan-in arity this operation requires.
    pub fn arity(&self) -> usize {
        match self {
            Operation::Pi => 0,
            Operation::And | Operation::Or => 2,
            Operation::Maj => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
struct Node {
    op: Operation,
    name: Option<String>,
}

#[derive(Clone, Debug)]
struct Edge {
    source: NodeIndex,
    target: NodeIndex,
}

/// A directed acyclic multigraph of logic gates.
#[derive(Clone, Debug, Default)]
pub struct LogicNetwork {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    incoming: Vec<Vec<EdgeIndex>>,
    outgoing: Vec<Vec<EdgeIndex>>,
}

impl LogicNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_node(&mut self, op: Operation, name: Option<String>) -> NodeIndex {
        let idx = NodeIndex(self.nodes.len());
        self.nodes.push(Node { op, name });
        self.incoming.push(Vec::new());
        self.outgoing.push(Vec::new());
        idx
    }

    /// Creates a named primary input.
    pub fn create_pi(&mut self, name: impl Into<String>) -> NodeIndex {
        self.add_node(Operation::Pi, Some(name.into()))
    }

    /// Creates a named primary output fed by `fanin`.
    pub fn create_po(&mut self, fanin: NodeIndex, name: impl Into<String>) -> NodeIndex {
        let po = self.add_node(Operation::Po, Some(name.into()));
        self.create_edge(fanin, po);
        po
    }

    /// Creates a two-input AND gate.
    pub fn create_and(&mut self, a: NodeIndex, b: NodeIndex) -> NodeIndex {
        let v = self.add_node(Operation::And, None);
        self.create_edge(a, v);
        self.create_edge(b, v);
        v
    }

    /// Creates a two-input OR gate.
    pub fn create_or(&mut self, a: NodeIndex, b: NodeIndex) -> NodeIndex {
        let v = self.add_node(Operation::Or, None);
        self.create_edge(a, v);
        self.create_edge(b, v);
        v
    }

    /// Creates an inverter.
    pub fn create_not(&mut self, a: NodeIndex) -> NodeIndex {
        let v = self.add_node(Operation::Not, None);
        self.create_edge(a, v);
        v
    }

    /// Creates a three-input majority gate.
    pub fn create_maj(&mut self, a: NodeIndex, b: NodeIndex, c: NodeIndex) -> NodeIndex {
        let v = self.add_node(Operation::Maj, None);
        self.create_edge(a, v);
        self.create_edge(b, v);
        self.create_edge(c, v);
        v
    }

    /// Creates a buffer.
    pub fn create_buf(&mut self, a: NodeIndex) -> NodeIndex {
        let v = self.add_node(Operation::Buf, None);
        self.create_edge(a, v);
        v
    }

    /// Creates an explicit 1-to-2 fan-out fed by `a`.
    pub fn create_fanout(&mut self, a: NodeIndex) -> NodeIndex {
        let v = self.add_node(Operation::Fanout, None);
        self.create_edge(a, v);
        v
    }

    /// Creates a directed edge from `source` to `target`.
    pub fn create_edge(&mut self, source: NodeIndex, target: NodeIndex) -> EdgeIndex {
        let idx = EdgeIndex(self.edges.len());
        self.edges.push(Edge { source, target });
        self.outgoing[source.0].push(idx);
        self.incoming[target.0].push(idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All vertices in creation order.
    pub fn vertices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        (0..self.nodes.len()).map(NodeIndex)
    }

    /// All edges in creation order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        (0..self.edges.len()).map(EdgeIndex)
    }

    pub fn source(&self, e: EdgeIndex) -> NodeIndex {
        self.edges[e.0].source
    }

    pub fn target(&self, e: EdgeIndex) -> NodeIndex {
        self.edges[e.0].target
    }

    pub fn in_edges(&self, v: NodeIndex) -> &[EdgeIndex] {
        &self.incoming[v.0]
    }

    pub fn out_edges(&self, v: NodeIndex) -> &[EdgeIndex] {
        &self.outgoing[v.0]
    }

    pub fn in_degree(&self, v: NodeIndex) -> usize {
        self.incoming[v.0].len()
    }

    pub fn out_degree(&self, v: NodeIndex) -> usize {
        self.outgoing[v.0].len()
    }

    pub fn operation(&self, v: NodeIndex) -> Operation {
        self.nodes[v.0].op
    }

    pub fn name(&self, v: NodeIndex) -> Option<&str> {
        self.nodes[v.0].name.as_deref()
    }

    pub fn is_pi(&self, v: NodeIndex) -> bool {
        self.nodes[v.0].op == Operation::Pi
    }

    pub fn is_po(&self, v: NodeIndex) -> bool {
        self.nodes[v.0].op == Operation::Po
    }

    /// All primary inputs in creation order.
    pub fn pis(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.vertices().filter(|&v| self.is_pi(v))
    }

    /// All primary outputs in creation order.
    pub fn pos(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.vertices().filter(|&v| self.is_po(v))
    }

    pub fn num_pis(&self) -> usize {
        self.pis().count()
    }

    pub fn num_pos(&self) -> usize {
        self.pos().count()
    }

    /// The number of vertices computing `op`.
    pub fn operation_count(&self, op: Operation) -> usize {
        self.nodes.iter().filter(|n| n.op == op).count()
    }

    /// Predecessor vertices of `v` (with multiplicity).
    pub fn predecessors(&self, v: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.incoming[v.0].iter().map(|&e| self.source(e))
    }

    /// Successor vertices of `v` (with multiplicity).
    pub fn successors(&self, v: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.outgoing[v.0].iter().map(|&e| self.target(e))
    }

    /// `true` iff `v` has a primary input among its predecessors.
    pub fn pre_pi(&self, v: NodeIndex) -> bool {
        self.predecessors(v).any(|p| self.is_pi(p))
    }

    /// `true` iff `v` has a primary output among its successors.
    pub fn post_po(&self, v: NodeIndex) -> bool {
        self.successors(v).any(|s| self.is_po(s))
    }

    /// Subdivides edge `e` by inserting a wire vertex `b`, turning
    /// `s -> t` into `s -> b -> t`. The original edge is retargeted onto
    /// `b`; a fresh edge leads from `b` to `t`. Returns `b`.
    pub fn subdivide_edge(&mut self, e: EdgeIndex) -> NodeIndex {
        let target = self.edges[e.0].target;
        let b = self.add_node(Operation::Wire, None);

        self.edges[e.0].target = b;
        self.incoming[target.0].retain(|&ie| ie != e);
        self.incoming[b.0].push(e);
        self.create_edge(b, target);

        b
    }

    /// Inserts explicit fan-out vertices so that no vertex other than a
    /// fan-out drives more than one successor, and every fan-out drives at
    /// most two. Required before exact placement, whose counting
    /// constraints equate tile connections with vertex degrees.
    pub fn substitute_fanouts(&mut self) {
        for i in 0..self.nodes.len() {
            let v = NodeIndex(i);
            if self.nodes[i].op == Operation::Fanout || self.out_degree(v) < 2 {
                continue;
            }

            // move all out-edges of v onto a fresh fan-out fed by v
            let outs = core::mem::take(&mut self.outgoing[i]);
            let mut f = self.add_node(Operation::Fanout, None);
            for &e in &outs {
                self.edges[e.0].source = f;
            }
            self.outgoing[f.0] = outs;
            self.create_edge(v, f);

            // cap each fan-out at two outputs by chaining further fan-outs
            while self.outgoing[f.0].len() > 2 {
                let rest = self.outgoing[f.0].split_off(1);
                let g = self.add_node(Operation::Fanout, None);
                for &e in &rest {
                    self.edges[e.0].source = g;
                }
                self.outgoing[g.0] = rest;
                self.create_edge(f, g);
                f = g;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_query() {
        let mut ntk = LogicNetwork::new();
        let a = ntk.create_pi("a");
        let b = ntk.create_pi("b");
        let g = ntk.create_and(a, b);
        let po = ntk.create_po(g, "f");

        assert_eq!(ntk.node_count(), 4);
        assert_eq!(ntk.edge_count(), 3);
        assert_eq!(ntk.in_degree(g), 2);
        assert_eq!(ntk.out_degree(g), 1);
        assert!(ntk.is_pi(a));
        assert!(ntk.is_po(po));
        assert!(ntk.pre_pi(g));
        assert!(ntk.post_po(g));
        assert_eq!(ntk.name(a), Some("a"));
    }

    #[test]
    fn subdivision_retargets_edges() {
        let mut ntk = LogicNetwork::new();
        let a = ntk.create_pi("a");
        let inv = ntk.create_not(a);
        let e = ntk.in_edges(inv)[0];

        let b = ntk.subdivide_edge(e);
        assert_eq!(ntk.operation(b), Operation::Wire);
        assert_eq!(ntk.target(e), b);
        assert_eq!(ntk.predecessors(inv).next(), Some(b));
        assert_eq!(ntk.in_degree(inv), 1);
    }

    #[test]
    fn fanout_substitution_caps_out_degree() {
        let mut ntk = LogicNetwork::new();
        let a = ntk.create_pi("a");
        let i1 = ntk.create_not(a);
        let i2 = ntk.create_not(a);
        let i3 = ntk.create_not(a);

        ntk.substitute_fanouts();

        assert_eq!(ntk.out_degree(a), 1);
        for v in ntk.vertices() {
            let cap = if ntk.operation(v) == Operation::Fanout {
                2
            } else {
                1
            };
            assert!(ntk.out_degree(v) <= cap);
        }
        for v in [i1, i2, i3] {
            assert_eq!(ntk.in_degree(v), 1);
        }
        assert_eq!(ntk.operation_count(Operation::Fanout), 2);
    }
}
