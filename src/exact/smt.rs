//! SMT instance generation and incremental solver bookkeeping for the
//! exact placement & routing engine.
//!
//! The variable model follows the classic formulation: per ground tile and
//! network vertex a placement variable `tv`, per tile and network edge a
//! wire variable `te`, per clocked tile pair a connection variable `tc`,
//! and per tile pair a path variable `tp` that forbids data-flow cycles.
//! Primary-input clock offsets (`vcl`), open-scheme tile clocks (`tcl`),
//! and artificial latch delays (`tl`) are integer-valued.
//!
//! Instead of push/pop, incremental growth uses assumption literals: all
//! constraints that mention the eastern or southern border are asserted
//! under an implication from a border literal. When the layout grows, the
//! superseded literal is permanently negated, which deactivates the stale
//! constraints while keeping the solver's learned clauses alive; fresh
//! constraints are generated over the added column/row and the tiles that
//! used to sit on the border.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use hashbrown::HashSet;
use tracing::trace;
use z3::ast::{Ast, Bool, Int};
use z3::{Context, Model, Optimize, Params, SatResult, Solver};

use super::{Dimension, ExactParams};
use crate::algo::hierarchy::NetworkHierarchy;
use crate::coords::Coord;
use crate::layout::{Layout, Parity, ShiftAxis, Topology};
use crate::network::{EdgeIndex, LogicNetwork, NodeIndex, Operation};

/// Result of one satisfiability check.
pub(crate) enum CheckOutcome {
    /// A model was found and extracted into a layout.
    Sat(Layout),
    /// The dimension admits no placement; the solver state is preserved
    /// for reuse by larger dimensions.
    Unsat,
    /// The check hit its time limit.
    Timeout,
}

/// The placement universe: network vertices and edges as seen by the
/// engine, honoring the `io_ports` switch. Without designated I/O pins,
/// primary inputs/outputs and their incident edges are not placed; the
/// gates adjacent to them inherit the I/O roles.
pub(crate) struct PlacementView<'a> {
    network: &'a LogicNetwork,
    io_ports: bool,
    vertices: Vec<NodeIndex>,
    edges: Vec<EdgeIndex>,
}

impl<'a> PlacementView<'a> {
    pub(crate) fn new(network: &'a LogicNetwork, io_ports: bool) -> Self {
        let io = |v: NodeIndex| network.is_pi(v) || network.is_po(v);
        let vertices = network
            .vertices()
            .filter(|&v| io_ports || !io(v))
            .collect();
        let edges = network
            .edges()
            .filter(|&e| io_ports || (!io(network.source(e)) && !io(network.target(e))))
            .collect();
        PlacementView {
            network,
            io_ports,
            vertices,
            edges,
        }
    }

    pub(crate) fn network(&self) -> &'a LogicNetwork {
        self.network
    }

    pub(crate) fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    fn vertices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.vertices.iter().copied()
    }

    fn edges(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.edges.iter().copied()
    }

    fn contains_vertex(&self, v: NodeIndex) -> bool {
        self.vertices.contains(&v)
    }

    fn in_edges(&self, v: NodeIndex) -> Vec<EdgeIndex> {
        self.network
            .in_edges(v)
            .iter()
            .copied()
            .filter(|e| self.edges.contains(e))
            .collect()
    }

    fn out_edges(&self, v: NodeIndex) -> Vec<EdgeIndex> {
        self.network
            .out_edges(v)
            .iter()
            .copied()
            .filter(|e| self.edges.contains(e))
            .collect()
    }

    fn in_degree(&self, v: NodeIndex) -> usize {
        self.in_edges(v).len()
    }

    fn out_degree(&self, v: NodeIndex) -> usize {
        self.out_edges(v).len()
    }

    fn operation(&self, v: NodeIndex) -> Operation {
        self.network.operation(v)
    }

    /// `true` iff `v` takes the primary-input role in this universe.
    fn pi_like(&self, v: NodeIndex) -> bool {
        if self.io_ports {
            self.network.is_pi(v)
        } else {
            self.network.pre_pi(v)
        }
    }

    /// `true` iff `v` takes the primary-output role in this universe.
    fn po_like(&self, v: NodeIndex) -> bool {
        if self.io_ports {
            self.network.is_po(v)
        } else {
            self.network.post_po(v)
        }
    }

    /// The vertices carrying the PI clock-offset variables.
    fn pi_roots(&self) -> Vec<NodeIndex> {
        let mut roots: Vec<NodeIndex> = self
            .vertices()
            .filter(|&v| self.pi_like(v))
            .collect();
        roots.dedup();
        roots
    }

    /// The vertices whose fan-in paths are globally synchronized.
    fn po_roots(&self) -> Vec<NodeIndex> {
        let mut roots: Vec<NodeIndex> = self
            .vertices()
            .filter(|&v| self.po_like(v))
            .collect();
        roots.dedup();
        roots
    }

    /// All edge paths from fan-in roots to `v`, discovered backwards.
    fn all_fanin_paths(&self, v: NodeIndex) -> Vec<Vec<EdgeIndex>> {
        let mut paths = Vec::new();
        let mut suffix: Vec<EdgeIndex> = Vec::new();
        self.collect_fanin_paths(v, &mut suffix, &mut paths);
        paths
    }

    fn collect_fanin_paths(
        &self,
        v: NodeIndex,
        suffix: &mut Vec<EdgeIndex>,
        paths: &mut Vec<Vec<EdgeIndex>>,
    ) {
        let in_edges = self.in_edges(v);
        if in_edges.is_empty() {
            if !suffix.is_empty() {
                let mut path = suffix.clone();
                path.reverse();
                paths.push(path);
            }
            return;
        }
        for e in in_edges {
            suffix.push(e);
            self.collect_fanin_paths(self.network.source(e), suffix, paths);
            suffix.pop();
        }
    }
}

/// Watched literals for eastern and southern border constraints.
struct AssumptionLits<'ctx> {
    e: Bool<'ctx>,
    s: Bool<'ctx>,
}

/// A solver plus its current assumption literals; shared between the
/// solver tree and the active check point. Every asserted formula is also
/// recorded so that the optimization stage can replay the instance into an
/// optimizing solver.
struct SolverState<'ctx> {
    solver: Solver<'ctx>,
    lits: RefCell<AssumptionLits<'ctx>>,
    assertions: RefCell<Vec<Bool<'ctx>>>,
}

impl<'ctx> SolverState<'ctx> {
    fn assert(&self, constraint: &Bool<'ctx>) {
        self.solver.assert(constraint);
        self.assertions.borrow_mut().push(constraint.clone());
    }
}

/// The active dimension's solver alongside the tiles that are new to it
/// (`added`) and the tiles that used to sit on the border (`updated`).
struct CheckPoint<'ctx> {
    state: Rc<SolverState<'ctx>>,
    added: Vec<Coord>,
    updated: Vec<Coord>,
}

/// Generates SMT instances and manages solver reuse across dimensions.
pub(crate) struct SmtHandler<'a, 'ctx> {
    ctx: &'ctx Context,
    view: &'a PlacementView<'a>,
    hierarchy: &'a NetworkHierarchy,
    params: &'a ExactParams,
    solver_tree: BTreeMap<Dimension, Rc<SolverState<'ctx>>>,
    check_point: Option<CheckPoint<'ctx>>,
    layout: Layout,
    /// Assumption literal counter.
    lc: usize,
}

impl<'a, 'ctx> SmtHandler<'a, 'ctx> {
    pub(crate) fn new(
        ctx: &'ctx Context,
        view: &'a PlacementView<'a>,
        hierarchy: &'a NetworkHierarchy,
        params: &'a ExactParams,
    ) -> Self {
        let layout = Layout::new((0, 0, 0), params.scheme.clone(), sketch_topology(params));
        SmtHandler {
            ctx,
            view,
            hierarchy,
            params,
            solver_tree: BTreeMap::new(),
            check_point: None,
            layout,
            lc: 0,
        }
    }

    /// Evaluates whether `dim` can be skipped without losing optimality.
    pub(crate) fn skippable(&self, dim: Dimension) -> bool {
        if self.params.is_topolinano() {
            let network = self.view.network();
            let fanouts = network.operation_count(Operation::Fanout);
            if usize::try_from(dim.0).unwrap_or(usize::MAX)
                <= (self.hierarchy.height() as usize + fanouts).saturating_sub(1)
                || (dim.1 as usize) < network.num_pis().max(network.num_pos())
            {
                return true;
            }
        }
        false
    }

    /// Resizes the layout sketch and creates a solver check point for
    /// `dim`, reusing the nearest ancestor solver if one exists.
    pub(crate) fn update(&mut self, dim: Dimension) {
        let z = u8::from(self.params.crossings);
        self.layout = Layout::new(
            (dim.0 - 1, dim.1 - 1, z),
            self.params.scheme.clone(),
            sketch_topology(self.params),
        );

        let check_point = self.fetch_solver(dim);
        self.solver_tree.insert(dim, check_point.state.clone());
        self.check_point = Some(check_point);
    }

    /// Sets the remaining time budget for the current solver.
    pub(crate) fn set_timeout(&self, remaining: Duration) {
        if let Some(cp) = &self.check_point {
            // clamp to a millisecond; 0 would mean "no limit" to the backend
            let millis = remaining
                .as_millis()
                .clamp(1, u128::from(u32::MAX)) as u32;
            let mut params = Params::new(self.ctx);
            params.set_u32("timeout", millis);
            cp.state.solver.set_params(&params);
        }
    }

    /// Generates the instance for the current check point and runs the
    /// check. On satisfiability, the model — optimized if requested — is
    /// extracted into a layout.
    pub(crate) fn is_satisfiable(&mut self) -> Result<CheckOutcome, String> {
        self.generate_smt_instance();

        let Some(cp) = &self.check_point else {
            return Err("no dimension has been set up".to_owned());
        };

        let (lit_e, lit_s) = {
            let lits = cp.state.lits.borrow();
            (lits.e.clone(), lits.s.clone())
        };

        match cp
            .state
            .solver
            .check_assumptions(&[lit_e.clone(), lit_s.clone()])
        {
            SatResult::Sat => {
                let layout = if self.wants_optimization() {
                    let model = self.optimize(&lit_e, &lit_s)?;
                    self.extract_layout(&model)
                } else {
                    let model = cp
                        .state
                        .solver
                        .get_model()
                        .ok_or_else(|| "solver reported SAT without a model".to_owned())?;
                    self.extract_layout(&model)
                };
                Ok(CheckOutcome::Sat(layout))
            }
            SatResult::Unsat => Ok(CheckOutcome::Unsat),
            SatResult::Unknown => Ok(CheckOutcome::Timeout),
        }
    }

    // --- solver tree ------------------------------------------------------

    fn fresh_lit(&mut self, direction: &str) -> Bool<'ctx> {
        self.lc += 1;
        Bool::new_const(self.ctx, format!("lit_{direction}_{}", self.lc))
    }

    /// Looks for a solver state one column or row smaller than `dim` and
    /// prepares it for reuse; otherwise creates a fresh solver. The
    /// ancestor entry is consumed: a solver only ever evolves along a
    /// single monotone growth lineage, so that the constraints retired by
    /// negating a border literal are exactly the ones of its previous
    /// border.
    fn fetch_solver(&mut self, dim: Dimension) -> CheckPoint<'ctx> {
        // eastern ancestor: the old border column gained neighbors
        if dim.0 > 1 {
            if let Some(state) = self.solver_tree.remove(&(dim.0 - 1, dim.1)) {
                let added = column(dim.0 - 1, dim.1);
                let updated = column(dim.0 - 2, dim.1);
                let fresh = self.fresh_lit("e");
                {
                    let mut lits = state.lits.borrow_mut();
                    // permanently retire the old eastern constraints
                    let retired = lits.e.not();
                    lits.e = fresh;
                    drop(lits);
                    state.assert(&retired);
                }
                return CheckPoint {
                    state,
                    added,
                    updated,
                };
            }
        }

        // southern ancestor: the old border row gained neighbors
        if dim.1 > 1 {
            if let Some(state) = self.solver_tree.remove(&(dim.0, dim.1 - 1)) {
                let added = row(dim.1 - 1, dim.0);
                let updated = row(dim.1 - 2, dim.0);
                let fresh = self.fresh_lit("s");
                {
                    let mut lits = state.lits.borrow_mut();
                    let retired = lits.s.not();
                    lits.s = fresh;
                    drop(lits);
                    state.assert(&retired);
                }
                return CheckPoint {
                    state,
                    added,
                    updated,
                };
            }
        }

        // no ancestor: start from scratch
        let lits = AssumptionLits {
            e: self.fresh_lit("e"),
            s: self.fresh_lit("s"),
        };
        let state = Rc::new(SolverState {
            solver: Solver::new(self.ctx),
            lits: RefCell::new(lits),
            assertions: RefCell::new(Vec::new()),
        });
        let added = self.layout.ground_coords().collect();
        CheckPoint {
            state,
            added,
            updated: Vec::new(),
        }
    }

    fn check_point(&self) -> &CheckPoint<'ctx> {
        self.check_point
            .as_ref()
            .unwrap_or_else(|| unreachable!("update() precedes instance generation"))
    }

    // --- variables --------------------------------------------------------

    fn tv(&self, t: Coord, v: NodeIndex) -> Bool<'ctx> {
        Bool::new_const(self.ctx, format!("tv_{}_{}_{}", t.x, t.y, v.index()))
    }

    fn te(&self, t: Coord, e: EdgeIndex) -> Bool<'ctx> {
        Bool::new_const(self.ctx, format!("te_{}_{}_{}", t.x, t.y, e.index()))
    }

    fn tc(&self, t1: Coord, t2: Coord) -> Bool<'ctx> {
        Bool::new_const(
            self.ctx,
            format!("tc_{}_{}_{}_{}", t1.x, t1.y, t2.x, t2.y),
        )
    }

    fn tp(&self, t1: Coord, t2: Coord) -> Bool<'ctx> {
        Bool::new_const(
            self.ctx,
            format!("tp_{}_{}_{}_{}", t1.x, t1.y, t2.x, t2.y),
        )
    }

    fn vcl(&self, v: NodeIndex) -> Int<'ctx> {
        Int::new_const(self.ctx, format!("vcl_{}", v.index()))
    }

    fn tcl(&self, t: Coord) -> Int<'ctx> {
        Int::new_const(self.ctx, format!("tcl_{}_{}", t.x, t.y))
    }

    fn tl(&self, t: Coord) -> Int<'ctx> {
        Int::new_const(self.ctx, format!("tl_{}_{}", t.x, t.y))
    }

    // --- small expression helpers ----------------------------------------

    fn int(&self, value: i64) -> Int<'ctx> {
        Int::from_i64(self.ctx, value)
    }

    fn or(&self, terms: &[Bool<'ctx>]) -> Bool<'ctx> {
        let refs: Vec<&Bool<'ctx>> = terms.iter().collect();
        Bool::or(self.ctx, &refs)
    }

    fn and(&self, terms: &[Bool<'ctx>]) -> Bool<'ctx> {
        let refs: Vec<&Bool<'ctx>> = terms.iter().collect();
        Bool::and(self.ctx, &refs)
    }

    fn at_most(&self, terms: &[Bool<'ctx>], k: usize) -> Bool<'ctx> {
        if terms.is_empty() {
            return Bool::from_bool(self.ctx, true);
        }
        let weighted: Vec<(&Bool<'ctx>, i32)> = terms.iter().map(|b| (b, 1)).collect();
        Bool::pb_le(self.ctx, &weighted, k as i32)
    }

    fn at_least(&self, terms: &[Bool<'ctx>], k: usize) -> Bool<'ctx> {
        if terms.is_empty() {
            return Bool::from_bool(self.ctx, k == 0);
        }
        let weighted: Vec<(&Bool<'ctx>, i32)> = terms.iter().map(|b| (b, 1)).collect();
        Bool::pb_ge(self.ctx, &weighted, k as i32)
    }

    fn exactly(&self, terms: &[Bool<'ctx>], k: usize) -> Bool<'ctx> {
        if terms.is_empty() {
            return Bool::from_bool(self.ctx, k == 0);
        }
        let weighted: Vec<(&Bool<'ctx>, i32)> = terms.iter().map(|b| (b, 1)).collect();
        Bool::pb_eq(self.ctx, &weighted, k as i32)
    }

    fn sum(&self, terms: &[Int<'ctx>]) -> Int<'ctx> {
        if terms.is_empty() {
            return self.int(0);
        }
        let refs: Vec<&Int<'ctx>> = terms.iter().collect();
        Int::add(self.ctx, &refs)
    }

    /// `true` iff the clock of `t2` is one phase ahead of `t1`'s. Constant
    /// for regular schemes; a disjunction over the `tcl` variables for
    /// open ones.
    fn phase_successor(&self, t1: Coord, t2: Coord) -> Bool<'ctx> {
        let n = i64::from(self.layout.num_phases());
        if self.layout.is_regularly_clocked() {
            Bool::from_bool(self.ctx, self.layout.is_outgoing_clocked(t1, t2))
        } else {
            let options: Vec<Bool<'ctx>> = (0..n)
                .map(|p| {
                    self.and(&[
                        self.tcl(t1)._eq(&self.int(p)),
                        self.tcl(t2)._eq(&self.int((p + 1) % n)),
                    ])
                })
                .collect();
            self.or(&options)
        }
    }

    /// The clocking successors of `t` the instance may connect to:
    /// data-flow neighbors under regular schemes, all neighbors under open
    /// ones (the phase relation is then decided by the solver).
    fn connectable_successors(&self, t: Coord) -> Vec<Coord> {
        if self.layout.is_regularly_clocked() {
            self.layout.outgoing_clocked(t)
        } else {
            self.layout.surrounding(t)
        }
    }

    fn connectable_predecessors(&self, t: Coord) -> Vec<Coord> {
        if self.layout.is_regularly_clocked() {
            self.layout.incoming_clocked(t)
        } else {
            self.layout.surrounding(t)
        }
    }

    // --- assertion plumbing ----------------------------------------------

    /// Asserts a constraint that only mentions tile `t` and its neighbors.
    /// Border tiles gain neighbors when the layout grows, so their
    /// constraints are guarded by the corresponding border literal;
    /// interior tiles keep their neighborhood forever and are asserted
    /// plainly.
    fn assert_tile(&self, t: Coord, constraint: &Bool<'ctx>) {
        let cp = self.check_point();
        let lits = cp.state.lits.borrow();
        let east = t.x == self.layout.x();
        let south = t.y == self.layout.y();

        let guarded = match (east, south) {
            (true, true) => self.and(&[lits.e.clone(), lits.s.clone()]).implies(constraint),
            (true, false) => lits.e.implies(constraint),
            (false, true) => lits.s.implies(constraint),
            (false, false) => constraint.clone(),
        };
        drop(lits);
        cp.state.assert(&guarded);
    }

    /// Asserts a constraint that ranges over the whole tile set. Any
    /// growth invalidates it, so it is implied by both border literals and
    /// regenerated for every dimension.
    fn assert_global(&self, constraint: &Bool<'ctx>) {
        let cp = self.check_point();
        let lits = cp.state.lits.borrow();
        let guard = self.and(&[lits.e.clone(), lits.s.clone()]);
        drop(lits);
        cp.state.assert(&guard.implies(constraint));
    }

    /// Asserts a constraint unconditionally; it must stay valid on every
    /// larger dimension.
    fn assert_plain(&self, constraint: &Bool<'ctx>) {
        self.check_point().state.assert(constraint);
    }

    /// `true` iff cycles are possible under the configured scheme: the
    /// strictly directional schemes cannot loop data back by construction.
    fn needs_path_constraints(&self) -> bool {
        !self.params.is_topolinano() && !self.params.is_twoddwave()
    }

    fn wants_optimization(&self) -> bool {
        self.params.minimize_wires
            || self.params.minimize_crossings
            || self.params.artificial_latches
    }

    // --- instance generation ---------------------------------------------

    fn generate_smt_instance(&self) {
        let cp = self.check_point();
        let fresh: Vec<Coord> = cp.added.iter().chain(cp.updated.iter()).copied().collect();
        let added: Vec<Coord> = cp.added.clone();

        trace!(
            added = added.len(),
            updated = fresh.len() - added.len(),
            "generating SMT instance"
        );

        // constraints that never change once a tile exists
        for &t in &added {
            self.restrict_tile_elements(t);
            if !self.layout.is_regularly_clocked() {
                self.restrict_clocks(t);
            }
            if self.params.artificial_latches && !self.params.desynchronize {
                self.restrict_latches(t);
            }
        }

        // neighborhood-dependent constraints for new and formerly-border
        // tiles
        for &t in &fresh {
            if !self.layout.is_regularly_clocked() {
                self.restrict_connections(t);
            }
            self.define_adjacent_vertex_tiles(t);
            self.define_inv_adjacent_vertex_tiles(t);
            self.define_adjacent_edge_tiles(t);
            self.define_inv_adjacent_edge_tiles(t);
            self.define_number_of_connections(t);
            self.prevent_insufficiencies(t);
            if self.needs_path_constraints() {
                self.establish_sub_paths(t);
            }
            if self.params.straight_inverters {
                self.enforce_straight_inverters(t);
            }
            if self.params.border_io {
                self.enforce_border_io(t);
            }
        }

        // constraints over the whole tile set, regenerated per dimension
        self.restrict_vertices();
        if self.needs_path_constraints() {
            self.establish_transitive_paths();
            self.eliminate_cycles();
            self.define_path_emptiness();
        }
        if self.params.crossings && self.params.crossings_limit > 0 {
            self.limit_crossings();
        }
        if self.params.wire_limit > 0 {
            self.limit_wire_length();
        }
        if !self.params.desynchronize && !self.params.is_topolinano() {
            self.assign_pi_clockings();
            self.global_synchronization();
        }
        if self.params.is_topolinano() {
            self.utilize_hierarchical_information();
            if self.params.vertical_offset {
                self.topology_specific_constraints();
            }
        }
    }

    /// At most one vertex per tile; with crossings additionally at most
    /// two edges, without them at most one element in total.
    fn restrict_tile_elements(&self, t: Coord) {
        let tvs: Vec<Bool<'ctx>> = self.view.vertices().map(|v| self.tv(t, v)).collect();
        let tes: Vec<Bool<'ctx>> = self.view.edges().map(|e| self.te(t, e)).collect();

        if self.params.crossings {
            if !tvs.is_empty() {
                self.assert_plain(&self.at_most(&tvs, 1));
            }
            if !tes.is_empty() {
                self.assert_plain(&self.at_most(&tes, 2));
            }
        } else {
            let all: Vec<Bool<'ctx>> = tvs.into_iter().chain(tes).collect();
            if !all.is_empty() {
                self.assert_plain(&self.at_most(&all, 1));
            }
        }
    }

    /// Every vertex is placed on exactly one tile.
    fn restrict_vertices(&self) {
        for v in self.view.vertices() {
            let tvs: Vec<Bool<'ctx>> = self
                .layout
                .ground_coords()
                .map(|t| self.tv(t, v))
                .collect();
            self.assert_global(&self.exactly(&tvs, 1));
        }
    }

    /// Open schemes: every tile clock is a valid phase.
    fn restrict_clocks(&self, t: Coord) {
        let n = i64::from(self.layout.num_phases());
        let options: Vec<Bool<'ctx>> = (0..n).map(|p| self.tcl(t)._eq(&self.int(p))).collect();
        self.assert_plain(&self.or(&options));
    }

    /// Open schemes: connections only between tiles whose phases differ by
    /// one.
    fn restrict_connections(&self, t: Coord) {
        for at in self.layout.surrounding(t) {
            let constraint = self.tc(t, at).implies(&self.phase_successor(t, at));
            self.assert_tile(t, &constraint);
        }
    }

    /// Latch delays are non-negative, and tiles without wires are not
    /// latched.
    fn restrict_latches(&self, t: Coord) {
        self.assert_plain(&self.tl(t).ge(&self.int(0)));

        let tes: Vec<Bool<'ctx>> = self.view.edges().map(|e| self.te(t, e)).collect();
        if !tes.is_empty() {
            let no_wire = self.at_most(&tes, 0);
            self.assert_plain(&no_wire.implies(&self.tl(t)._eq(&self.int(0))));
        }
    }

    /// A tile holding vertex `v` connects towards tiles holding each
    /// fan-out target or its connecting edge.
    fn define_adjacent_vertex_tiles(&self, t: Coord) {
        for v in self.view.vertices() {
            let mut conjunction: Vec<Bool<'ctx>> = Vec::new();
            for ae in self.view.out_edges(v) {
                let tgt = self.view.network().target(ae);
                let mut disjunction: Vec<Bool<'ctx>> = Vec::new();
                for at in self.connectable_successors(t) {
                    let elem = self.or(&[self.tv(at, tgt), self.te(at, ae)]);
                    let mut term = vec![elem, self.tc(t, at)];
                    if !self.layout.is_regularly_clocked() {
                        term.push(self.phase_successor(t, at));
                    }
                    disjunction.push(self.and(&term));
                }
                if !disjunction.is_empty() {
                    conjunction.push(self.or(&disjunction));
                }
            }
            if !conjunction.is_empty() {
                let constraint = self.tv(t, v).implies(&self.and(&conjunction));
                self.assert_tile(t, &constraint);
            }
        }
    }

    /// A tile holding vertex `v` is connected from tiles holding each
    /// fan-in source or its connecting edge.
    fn define_inv_adjacent_vertex_tiles(&self, t: Coord) {
        for v in self.view.vertices() {
            let mut conjunction: Vec<Bool<'ctx>> = Vec::new();
            for ie in self.view.in_edges(v) {
                let src = self.view.network().source(ie);
                let mut disjunction: Vec<Bool<'ctx>> = Vec::new();
                for iat in self.connectable_predecessors(t) {
                    let elem = self.or(&[self.tv(iat, src), self.te(iat, ie)]);
                    let mut term = vec![elem, self.tc(iat, t)];
                    if !self.layout.is_regularly_clocked() {
                        term.push(self.phase_successor(iat, t));
                    }
                    disjunction.push(self.and(&term));
                }
                if !disjunction.is_empty() {
                    conjunction.push(self.or(&disjunction));
                }
            }
            if !conjunction.is_empty() {
                let constraint = self.tv(t, v).implies(&self.and(&conjunction));
                self.assert_tile(t, &constraint);
            }
        }
    }

    /// A tile holding an edge connects towards a tile holding the edge's
    /// target vertex or the edge itself.
    fn define_adjacent_edge_tiles(&self, t: Coord) {
        for e in self.view.edges() {
            let tgt = self.view.network().target(e);
            let mut disjunction: Vec<Bool<'ctx>> = Vec::new();
            for at in self.connectable_successors(t) {
                let elem = self.or(&[self.tv(at, tgt), self.te(at, e)]);
                let mut term = vec![elem, self.tc(t, at)];
                if !self.layout.is_regularly_clocked() {
                    term.push(self.phase_successor(t, at));
                }
                disjunction.push(self.and(&term));
            }
            if !disjunction.is_empty() {
                let constraint = self.te(t, e).implies(&self.or(&disjunction));
                self.assert_tile(t, &constraint);
            }
        }
    }

    /// A tile holding an edge is connected from a tile holding the edge's
    /// source vertex or the edge itself.
    fn define_inv_adjacent_edge_tiles(&self, t: Coord) {
        for e in self.view.edges() {
            let src = self.view.network().source(e);
            let mut disjunction: Vec<Bool<'ctx>> = Vec::new();
            for iat in self.connectable_predecessors(t) {
                let elem = self.or(&[self.tv(iat, src), self.te(iat, e)]);
                let mut term = vec![elem, self.tc(iat, t)];
                if !self.layout.is_regularly_clocked() {
                    term.push(self.phase_successor(iat, t));
                }
                disjunction.push(self.and(&term));
            }
            if !disjunction.is_empty() {
                let constraint = self.te(t, e).implies(&self.or(&disjunction));
                self.assert_tile(t, &constraint);
            }
        }
    }

    /// Established connections imply sub-paths.
    fn establish_sub_paths(&self, t: Coord) {
        for at in self.connectable_successors(t) {
            let constraint = self.tc(t, at).implies(&self.tp(t, at));
            self.assert_tile(t, &constraint);
        }
    }

    /// Sub-paths expand transitively.
    fn establish_transitive_paths(&self) {
        let tiles: Vec<Coord> = self.layout.ground_coords().collect();
        for &t1 in &tiles {
            for &t2 in &tiles {
                if t1 == t2 {
                    continue;
                }
                for &t3 in &tiles {
                    if t2 == t3 {
                        continue;
                    }
                    let premise = self.and(&[self.tp(t1, t2), self.tp(t2, t3)]);
                    self.assert_global(&premise.implies(&self.tp(t1, t3)));
                }
            }
        }
    }

    /// No data-flow cycles.
    fn eliminate_cycles(&self) {
        for t in self.layout.ground_coords() {
            self.assert_global(&self.tp(t, t).not());
        }
    }

    /// Empty tiles participate in no paths.
    fn define_path_emptiness(&self) {
        let tiles: Vec<Coord> = self.layout.ground_coords().collect();
        for &t in &tiles {
            let mut elements: Vec<Bool<'ctx>> = Vec::new();
            for v in self.view.vertices() {
                elements.push(self.tv(t, v));
            }
            for e in self.view.edges() {
                elements.push(self.te(t, e));
            }

            let mut paths: Vec<Bool<'ctx>> = Vec::new();
            for &t2 in &tiles {
                paths.push(self.tp(t, t2));
                if t != t2 {
                    paths.push(self.tp(t2, t));
                }
            }

            if !elements.is_empty() && !paths.is_empty() {
                let empty = self.at_most(&elements, 0);
                let no_paths = self.at_most(&paths, 0);
                self.assert_global(&empty.iff(&no_paths));
            }
        }
    }

    /// Primary inputs record the clock phase of their tile, which global
    /// synchronization offsets path lengths by.
    fn assign_pi_clockings(&self) {
        for v in self.view.pi_roots() {
            let cl = self.vcl(v);
            for t in self.layout.ground_coords() {
                let phase = if self.layout.is_regularly_clocked() {
                    self.int(i64::from(self.layout.phase(t)))
                } else {
                    self.tcl(t)
                };
                self.assert_global(&self.tv(t, v).implies(&cl._eq(&phase)));
            }
        }
    }

    /// All fan-in paths towards each primary output have equal length,
    /// modulo PI clock offsets and artificial latch delays.
    fn global_synchronization(&self) {
        for po in self.view.po_roots() {
            let paths = self.view.all_fanin_paths(po);
            if paths.len() < 2 {
                continue;
            }

            let max_length = paths.iter().map(Vec::len).max().unwrap_or(0);

            let mut lengths: Vec<Int<'ctx>> = Vec::new();
            for path in &paths {
                let mut terms: Vec<Int<'ctx>> = Vec::new();

                // vertices on shorter paths still occupy one tile each
                let offset = path.len() as i64 - max_length as i64;
                if offset != 0 {
                    terms.push(self.int(offset));
                }

                for &e in path {
                    let src = self.view.network().source(e);
                    if self.view.pi_like(src) {
                        terms.push(self.vcl(src));
                    }
                    self.tile_ite_counters(e, &mut terms);
                }
                lengths.push(self.sum(&terms));
            }

            for pair in lengths.windows(2) {
                self.assert_global(&pair[0]._eq(&pair[1]));
            }
        }
    }

    /// Adds `ite(te, 1 + tl·N, 0)` per tile to `terms`: a wire tile
    /// counts one clock phase, plus its artificial latch delay.
    fn tile_ite_counters(&self, e: EdgeIndex, terms: &mut Vec<Int<'ctx>>) {
        let n = i64::from(self.layout.num_phases());
        for t in self.layout.ground_coords() {
            let occupied = if self.params.artificial_latches {
                Int::add(self.ctx, &[&self.int(1), &(self.tl(t) * self.int(n))])
            } else {
                self.int(1)
            };
            terms.push(self.te(t, e).ite(&occupied, &self.int(0)));
        }
    }

    /// Vertices cannot sit on tiles with fewer connections than their
    /// degrees require; edges cannot sit on disconnected tiles.
    fn prevent_insufficiencies(&self, t: Coord) {
        if self.layout.is_regularly_clocked() {
            let out_degree = self.layout.out_degree(t);
            let in_degree = self.layout.in_degree(t);

            for v in self.view.vertices() {
                if out_degree < self.view.out_degree(v) || in_degree < self.view.in_degree(v) {
                    self.assert_tile(t, &self.tv(t, v).not());
                }
            }
            if out_degree == 0 || in_degree == 0 {
                for e in self.view.edges() {
                    self.assert_tile(t, &self.te(t, e).not());
                }
            }
        } else {
            let tile_degree = self.layout.surrounding(t).len();
            for v in self.view.vertices() {
                if tile_degree < self.view.out_degree(v) + self.view.in_degree(v) {
                    self.assert_tile(t, &self.tv(t, v).not());
                }
            }
        }
    }

    /// The number of connections at a tile corresponds to the degrees of
    /// the element placed there; empty tiles have none.
    fn define_number_of_connections(&self, t: Coord) {
        let successors = self.connectable_successors(t);
        let predecessors = self.connectable_predecessors(t);

        let acc: Vec<Bool<'ctx>> = successors.iter().map(|&at| self.tc(t, at)).collect();
        let iacc: Vec<Bool<'ctx>> = predecessors.iter().map(|&iat| self.tc(iat, t)).collect();

        let mut all_connections: Vec<Bool<'ctx>> = acc.clone();
        all_connections.extend(iacc.iter().cloned());

        let mut elements: Vec<Bool<'ctx>> = Vec::new();

        for v in self.view.vertices() {
            let tv = self.tv(t, v);
            elements.push(tv.clone());

            if !acc.is_empty() {
                let wanted = self.exactly(&acc, self.view.out_degree(v));
                self.assert_tile(t, &tv.implies(&wanted));
            }
            if !iacc.is_empty() {
                let wanted = self.exactly(&iacc, self.view.in_degree(v));
                self.assert_tile(t, &tv.implies(&wanted));
            }
        }

        let wires: Vec<Bool<'ctx>> = self.view.edges().map(|e| self.te(t, e)).collect();
        elements.extend(wires.iter().cloned());

        if !wires.is_empty() {
            let single_wire = self.exactly(&wires, 1);
            if !acc.is_empty() {
                self.assert_tile(t, &single_wire.implies(&self.exactly(&acc, 1)));
            }
            if !iacc.is_empty() {
                self.assert_tile(t, &single_wire.implies(&self.exactly(&iacc, 1)));
            }

            if self.params.crossings {
                let double_wire = self.exactly(&wires, 2);
                if !acc.is_empty() {
                    self.assert_tile(t, &double_wire.implies(&self.exactly(&acc, 2)));
                }
                if !iacc.is_empty() {
                    self.assert_tile(t, &double_wire.implies(&self.exactly(&iacc, 2)));
                }
            }
        }

        if !elements.is_empty() && !all_connections.is_empty() {
            let empty = self.at_most(&elements, 0);
            let unconnected = self.at_most(&all_connections, 0);
            self.assert_tile(t, &empty.iff(&unconnected));
        }
    }

    /// ToPoliNano-style symmetry breaking: a vertex at hierarchy level `l`
    /// cannot be placed in the first `l` columns, nor in the last
    /// `inv_level` columns.
    fn utilize_hierarchical_information(&self) {
        if !(self.params.io_ports && self.params.border_io) {
            return;
        }

        for v in self.view.vertices() {
            let level = self.hierarchy.level(v);
            let inv_level = self.hierarchy.inv_level(v);
            let out_edges = self.view.out_edges(v);
            let in_edges = self.view.in_edges(v);

            for t in self.layout.ground_coords() {
                // too close to the western border
                if t.x < level {
                    self.assert_global(&self.tv(t, v).not());
                    for &e in &out_edges {
                        self.assert_global(&self.te(t, e).not());
                    }
                }
                // too close to the eastern border
                if t.x + inv_level > self.layout.x() {
                    self.assert_global(&self.tv(t, v).not());
                    for &e in &in_edges {
                        self.assert_global(&self.te(t, e).not());
                    }
                }
            }
        }
    }

    /// Primary inputs and outputs sit on the layout borders: the western
    /// resp. eastern one for columnar schemes, any border otherwise.
    fn enforce_border_io(&self, t: Coord) {
        let topolinano = self.params.is_topolinano();

        for v in self.view.vertices() {
            if self.view.pi_like(v) {
                let banned = if topolinano {
                    t.x != 0
                } else {
                    !self.layout.is_border(t)
                };
                if banned {
                    self.assert_tile(t, &self.tv(t, v).not());
                }
            }
            if self.view.po_like(v) {
                let banned = if topolinano {
                    !self.layout.is_eastern_border(t)
                } else {
                    !self.layout.is_border(t)
                };
                if banned {
                    self.assert_tile(t, &self.tv(t, v).not());
                }
            }
        }
    }

    /// Inverters only connect collinearly: north-south, east-west, or the
    /// shifted diagonals on vertically offset layouts.
    fn enforce_straight_inverters(&self, t: Coord) {
        for inv in self.view.vertices() {
            if self.view.operation(inv) != Operation::Not {
                continue;
            }
            // I/O-adjacent inverters are straight by construction
            if self.view.network().pre_pi(inv) || self.view.network().post_po(inv) {
                continue;
            }

            let mut options: Vec<Bool<'ctx>> = Vec::new();
            let pairs: [(Option<Coord>, Option<Coord>); 4] = [
                (self.layout.north(t), self.layout.south(t)),
                (self.layout.east(t), self.layout.west(t)),
                (self.layout.north_west(t), self.layout.north_east(t)),
                (self.layout.south_west(t), self.layout.south_east(t)),
            ];

            for (a, b) in pairs.into_iter() {
                let (Some(a), Some(b)) = (a, b) else { continue };
                if self.layout.is_regularly_clocked() {
                    if self.layout.is_incoming_clocked(t, a) && self.layout.is_outgoing_clocked(t, b)
                    {
                        options.push(self.and(&[self.tc(a, t), self.tc(t, b)]));
                    } else if self.layout.is_incoming_clocked(t, b)
                        && self.layout.is_outgoing_clocked(t, a)
                    {
                        options.push(self.and(&[self.tc(b, t), self.tc(t, a)]));
                    }
                } else {
                    options.push(self.and(&[self.tc(a, t), self.tc(t, b)]));
                    options.push(self.and(&[self.tc(b, t), self.tc(t, a)]));
                }
            }

            if options.is_empty() {
                self.assert_tile(t, &self.tv(t, inv).not());
            } else {
                let constraint = self.tv(t, inv).implies(&self.or(&options));
                self.assert_tile(t, &constraint);
            }
        }
    }

    /// ToPoliNano topology rules: fan-outs take input from the north-west
    /// only and are never preceded by crossings; AND/OR/MAJ gates are not
    /// directly followed by another AND/OR/MAJ or a fan-out and never
    /// connect to the south-east.
    fn topology_specific_constraints(&self) {
        let gate_like = |op: Operation| {
            matches!(op, Operation::And | Operation::Or | Operation::Maj)
        };
        let tiles: Vec<Coord> = self.layout.ground_coords().collect();

        for fo in self.view.vertices() {
            if self.view.operation(fo) != Operation::Fanout {
                continue;
            }

            // no fan-out directly behind a fan-out
            for afo in self.view.network().successors(fo) {
                if !self.view.contains_vertex(afo)
                    || self.view.operation(afo) != Operation::Fanout
                {
                    continue;
                }
                for &t in &tiles {
                    for at in self.layout.outgoing_clocked(t) {
                        let constraint = self.tv(t, fo).implies(&self.tv(at, afo).not());
                        self.assert_global(&constraint);
                    }
                }
            }

            if self.view.in_degree(fo) == 0 {
                continue;
            }

            // fan-outs read from their north-western tile, never across a
            // crossing
            for &t in &tiles {
                if let Some(nw) = self.layout.north_west(t) {
                    self.assert_global(&self.tv(t, fo).implies(&self.tc(nw, t)));

                    let wires: Vec<Bool<'ctx>> =
                        self.view.edges().map(|e| self.te(nw, e)).collect();
                    if !wires.is_empty() {
                        let no_crossing = self.at_most(&wires, 1);
                        self.assert_global(&self.tv(t, fo).implies(&no_crossing));
                    }
                } else {
                    self.assert_global(&self.tv(t, fo).not());
                }
            }
        }

        for v1 in self.view.vertices() {
            if !gate_like(self.view.operation(v1)) {
                continue;
            }

            for v2 in self.view.network().successors(v1) {
                if !self.view.contains_vertex(v2) {
                    continue;
                }
                let op2 = self.view.operation(v2);
                let restricted = gate_like(op2)
                    || op2 == Operation::Fanout
                    || (self.params.straight_inverters && op2 == Operation::Not);
                if !restricted {
                    continue;
                }

                for &t in &tiles {
                    for at in self.layout.outgoing_clocked(t) {
                        let constraint = self.tv(t, v1).implies(&self.tv(at, v2).not());
                        self.assert_global(&constraint);
                    }
                }
            }

            for &t in &tiles {
                match self.layout.north_east(t) {
                    Some(ne) => {
                        let wires: Vec<Bool<'ctx>> =
                            self.view.edges().map(|e| self.te(ne, e)).collect();
                        if !wires.is_empty() {
                            let no_crossing = self.at_most(&wires, 1);
                            self.assert_global(&self.tv(t, v1).implies(&no_crossing));
                        }
                    }
                    None => {
                        self.assert_global(&self.tv(t, v1).not());
                    }
                }
                if let Some(se) = self.layout.south_east(t) {
                    self.assert_global(&self.tv(t, v1).implies(&self.tc(t, se).not()));
                }
            }
        }
    }

    /// Upper-bounds the number of crossing tiles.
    fn limit_crossings(&self) {
        let counters = self.crossing_counters();
        let total = self.sum(&counters);
        self.assert_global(&total.le(&self.int(self.params.crossings_limit as i64)));
    }

    /// Upper-bounds the number of wire tiles per edge.
    fn limit_wire_length(&self) {
        for e in self.view.edges() {
            let tes: Vec<Bool<'ctx>> = self
                .layout
                .ground_coords()
                .map(|t| self.te(t, e))
                .collect();
            self.assert_global(&self.at_most(&tes, self.params.wire_limit));
        }
    }

    /// One counter per tile that evaluates to 1 iff the tile carries two
    /// wires, i.e., a crossing.
    fn crossing_counters(&self) -> Vec<Int<'ctx>> {
        self.layout
            .ground_coords()
            .map(|t| {
                let wires: Vec<Bool<'ctx>> = self.view.edges().map(|e| self.te(t, e)).collect();
                self.at_least(&wires, 2).ite(&self.int(1), &self.int(0))
            })
            .collect()
    }

    // --- optimization -----------------------------------------------------

    /// Moves all assertions to an optimizing solver, adds the configured
    /// objectives, and re-solves. Only called after the plain instance was
    /// found satisfiable, so no optimization effort is wasted on UNSAT
    /// dimensions.
    fn optimize(&self, lit_e: &Bool<'ctx>, lit_s: &Bool<'ctx>) -> Result<Model<'ctx>, String> {
        let cp = self.check_point();
        let optimize = Optimize::new(self.ctx);

        for assertion in cp.state.assertions.borrow().iter() {
            optimize.assert(assertion);
        }
        // the border literals hold unconditionally in this run
        optimize.assert(lit_e);
        optimize.assert(lit_s);

        if self.params.minimize_wires {
            let wires: Vec<Int<'ctx>> = self
                .layout
                .ground_coords()
                .flat_map(|t| {
                    self.view
                        .edges()
                        .map(|e| self.te(t, e).ite(&self.int(1), &self.int(0)))
                        .collect::<Vec<_>>()
                })
                .collect();
            optimize.minimize(&self.sum(&wires));
        }
        if self.params.minimize_crossings {
            let counters = self.crossing_counters();
            optimize.minimize(&self.sum(&counters));
        }
        if self.params.artificial_latches {
            let latches: Vec<Int<'ctx>> =
                self.layout.ground_coords().map(|t| self.tl(t)).collect();
            optimize.minimize(&self.sum(&latches));
        }

        match optimize.check(&[]) {
            SatResult::Sat => optimize
                .get_model()
                .ok_or_else(|| "optimizer reported SAT without a model".to_owned()),
            _ => Err("optimization diverged from the satisfiable instance".to_owned()),
        }
    }

    // --- model extraction -------------------------------------------------

    fn eval_bool(&self, model: &Model<'ctx>, expr: &Bool<'ctx>) -> bool {
        model
            .eval(expr, true)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn eval_int(&self, model: &Model<'ctx>, expr: &Int<'ctx>) -> i64 {
        model
            .eval(expr, true)
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    }

    /// Assigns vertices, wires, clocks, directions, and latches to a fresh
    /// layout according to the model.
    fn extract_layout(&self, model: &Model<'ctx>) -> Layout {
        let mut layout = self.layout.clone();

        // vertices (balance vertices become wires of their original edge)
        for t in self.layout.ground_coords() {
            let mut placed = false;
            for v in self.view.vertices() {
                if self.eval_bool(model, &self.tv(t, v)) {
                    if let Some(original) = self.hierarchy.balance_edge(v) {
                        layout.assign_wire(t, original.index() as u32);
                    } else {
                        let name = self.view.network().name(v).map(str::to_owned);
                        layout.assign_gate(t, self.view.operation(v), v.index() as u32, name);
                    }
                    placed = true;
                    break;
                }
            }
            if placed {
                continue;
            }

            // wires; a second edge on the same tile moves to the crossing
            // layer
            for e in self.view.edges() {
                if self.eval_bool(model, &self.te(t, e)) {
                    if layout.is_occupied(t) {
                        if layout.within_bounds(t.above()) {
                            layout.assign_wire(t.above(), e.index() as u32);
                        }
                    } else {
                        layout.assign_wire(t, e.index() as u32);
                    }
                }
            }
        }

        // open schemes: clock phases are part of the model
        if !self.layout.is_regularly_clocked() {
            for t in self.layout.ground_coords() {
                let phase = self.eval_int(model, &self.tcl(t));
                layout.assign_phase(t, phase.rem_euclid(i64::from(layout.num_phases())) as u8);
            }
        }

        // directions from the committed connections
        for t1 in self.layout.ground_coords() {
            for t2 in self.connectable_successors(t1) {
                if !self.eval_bool(model, &self.tc(t1, t2)) {
                    continue;
                }
                if let Some((from, to)) = self.resolve_flow(&layout, t1, t2) {
                    layout.add_outgoing(from, to);
                    layout.add_incoming(to, from);
                }
            }
        }

        // artificial latch delays
        if self.params.artificial_latches {
            for t in self.layout.ground_coords() {
                let delay = self.eval_int(model, &self.tl(t));
                if delay > 0 {
                    layout.assign_latch(t, delay as u32);
                }
            }
        }

        layout
    }

    /// Resolves which layer combination of two connected tile positions
    /// actually carries the data flow.
    fn resolve_flow(&self, layout: &Layout, t1: Coord, t2: Coord) -> Option<(Coord, Coord)> {
        let candidates = [
            (t1, t2),
            (t1, t2.above()),
            (t1.above(), t2),
            (t1.above(), t2.above()),
        ];
        candidates
            .into_iter()
            .find(|&(a, b)| self.is_data_flow(layout, a, b))
    }

    /// `true` iff the elements on `a` and `b` are adjacent in the network:
    /// some edge leaves `a`'s element and enters `b`'s.
    fn is_data_flow(&self, layout: &Layout, a: Coord, b: Coord) -> bool {
        let (Some(_), Some(_)) = (layout.tile(a), layout.tile(b)) else {
            return false;
        };
        let out = self.carried_edges(layout, a, false);
        let inc = self.carried_edges(layout, b, true);
        out.iter().any(|e| inc.contains(e))
    }

    /// The network edges touching the element on `c`: a wire carries its
    /// own edge, a gate its incident edges on the requested side.
    fn carried_edges(&self, layout: &Layout, c: Coord, incoming: bool) -> HashSet<EdgeIndex> {
        let Some(tile) = layout.tile(c) else {
            return HashSet::new();
        };
        if tile.op == Operation::Wire {
            let mut set = HashSet::new();
            set.insert(EdgeIndex(tile.id as usize));
            set
        } else {
            let v = NodeIndex(tile.id as usize);
            let edges = if incoming {
                self.view.in_edges(v)
            } else {
                self.view.out_edges(v)
            };
            edges.into_iter().collect()
        }
    }
}

/// The tile arrangement the sketch layouts are built with.
fn sketch_topology(params: &ExactParams) -> Topology {
    if params.vertical_offset && params.topology.is_cartesian() {
        Topology::ShiftedCartesian {
            axis: ShiftAxis::Column,
            parity: Parity::Odd,
        }
    } else {
        params.topology
    }
}

fn column(x: u32, height: u32) -> Vec<Coord> {
    (0..height).map(|y| Coord::new(x, y)).collect()
}

fn row(y: u32, width: u32) -> Vec<Coord> {
    (0..width).map(|x| Coord::new(x, y)).collect()
}
