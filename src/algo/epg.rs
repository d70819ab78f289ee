//! Edge-intersection graphs of routing paths.
//!
//! For a list of routing objectives, every satisfying path becomes a
//! vertex of an undirected graph whose edges record pairwise conflicts.
//! Two paths conflict if they *intersect* (share at least one interior
//! coordinate) or, when crossings are permitted, only if they *overlap*
//! (share a segment of two consecutive coordinates). All paths that belong
//! to the same objective conflict by definition and hence form a clique;
//! those cliques are recorded for symmetry breaking in SAT coloring.

use hashbrown::HashSet;
use itertools::Itertools;
use tracing::debug;

use crate::algo::{enumerate_all_paths, yen_k_shortest_paths, EnumerationParams};
use crate::coords::Coord;
use crate::error::RoutingError;
use crate::layout::Layout;
use crate::obstruction::ObstructionLayout;
use crate::path::{CoordPath, RoutingObjective};

/// Parameters for the edge-intersection graph generation.
#[derive(Copy, Clone, Debug, Default)]
pub struct EpgParams {
    /// Allow crossings by not creating edges between paths that only share
    /// single-coordinate sub-paths.
    pub crossings: bool,
    /// If set, only up to `path_limit` shortest paths are enumerated per
    /// objective (via Yen's algorithm) instead of all paths.
    pub path_limit: Option<u32>,
}

/// Statistics of the edge-intersection graph generation.
#[derive(Clone, Debug, Default)]
pub struct EpgStats {
    /// Objectives that could not be satisfied by any path.
    pub unroutable_objectives: Vec<RoutingObjective>,
    /// For each routable objective, the vertex labels of its paths. Each
    /// such set forms a clique in the graph.
    pub cliques: Vec<Vec<usize>>,
    /// Number of vertices in the generated graph.
    pub num_vertices: usize,
    /// Number of edges in the generated graph.
    pub num_edges: usize,
}

/// An undirected graph whose vertices are layout paths (labeled by their
/// insertion index) and whose edges record routing conflicts.
#[derive(Clone, Debug, Default)]
pub struct EdgeIntersectionGraph {
    paths: Vec<CoordPath>,
    adjacency: Vec<HashSet<usize>>,
    num_edges: usize,
}

impl EdgeIntersectionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a path as a new vertex and returns its label.
    pub fn add_vertex(&mut self, path: CoordPath) -> usize {
        let label = self.paths.len();
        self.paths.push(path);
        self.adjacency.push(HashSet::new());
        label
    }

    /// Inserts an undirected conflict edge between `a` and `b`.
    pub fn add_edge(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        if self.adjacency[a].insert(b) {
            self.adjacency[b].insert(a);
            self.num_edges += 1;
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.paths.len()
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// All vertex labels.
    pub fn vertices(&self) -> impl Iterator<Item = usize> + '_ {
        0..self.paths.len()
    }

    /// The neighbors of `v`.
    pub fn neighbors(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[v].iter().copied()
    }

    pub fn degree(&self, v: usize) -> usize {
        self.adjacency[v].len()
    }

    /// `true` iff `a` and `b` conflict.
    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.adjacency[a].contains(&b)
    }

    /// The path stored at vertex `v`.
    pub fn path(&self, v: usize) -> &CoordPath {
        &self.paths[v]
    }
}

/// A path augmented with constant-time coordinate and segment lookup plus
/// its vertex label in the graph.
struct LabeledPath {
    label: usize,
    path: CoordPath,
    elements: HashSet<Coord>,
    segments: HashSet<(Coord, Coord)>,
}

impl LabeledPath {
    fn new(label: usize, path: CoordPath) -> Self {
        let elements = path.iter().copied().collect();
        let segments = path.iter().copied().tuple_windows().collect();
        LabeledPath {
            label,
            path,
            elements,
            segments,
        }
    }

    /// `true` iff this path and `other` are not disjoint: they connect the
    /// same endpoints, or any interior coordinate of `other` occurs on this
    /// path.
    fn has_intersection_with(&self, other: &LabeledPath) -> bool {
        if self.path.source() == other.path.source() && self.path.target() == other.path.target() {
            return true;
        }

        if other.path.len() <= 2 {
            return false;
        }
        let len = other.path.len();
        other.path[1..len - 1]
            .iter()
            .any(|c| self.elements.contains(c))
    }

    /// Like [`Self::has_intersection_with`], but paths may share
    /// single-coordinate crossings: only a shared segment of two
    /// consecutive coordinates (endpoints included) counts as a conflict.
    fn has_overlap_with(&self, other: &LabeledPath) -> bool {
        if self.path.source() == other.path.source() && self.path.target() == other.path.target() {
            return true;
        }

        other
            .path
            .iter()
            .copied()
            .tuple_windows()
            .any(|seg: (Coord, Coord)| self.segments.contains(&seg))
    }
}

/// Creates an edge-intersection graph of all paths satisfying the given
/// routing objectives in `layout`.
///
/// Paths are enumerated objective by objective — exhaustively, or up to
/// `params.path_limit` shortest ones. Each objective's paths are pairwise
/// connected (they conflict by definition) and recorded as a clique; edges
/// towards previously stored paths are added according to the conflict
/// notion selected by `params.crossings`.
///
/// # Errors
///
/// Propagates [`RoutingError`] from path enumeration for invalid objective
/// coordinates. Objectives without any satisfying path are counted in the
/// statistics, not errors.
pub fn generate_edge_intersection_graph(
    layout: &Layout,
    objectives: &[RoutingObjective],
    params: EpgParams,
) -> Result<(EdgeIntersectionGraph, EpgStats), RoutingError> {
    let mut graph = EdgeIntersectionGraph::new();
    let mut stats = EpgStats::default();
    let mut all_paths: Vec<LabeledPath> = Vec::new();

    let enumeration = EnumerationParams {
        crossings: params.crossings,
    };

    for objective in objectives {
        let obstructed = ObstructionLayout::new(layout);
        let obj_paths = match params.path_limit {
            None => enumerate_all_paths(&obstructed, objective, enumeration)?,
            Some(k) => yen_k_shortest_paths(&obstructed, objective, k, enumeration)?,
        };

        // assign a unique label to each path and insert it as a vertex
        let labeled: Vec<LabeledPath> = obj_paths
            .into_iter()
            .map(|p| {
                let label = graph.add_vertex(p.clone());
                LabeledPath::new(label, p)
            })
            .collect();

        if labeled.is_empty() {
            // the objective cannot be fulfilled
            stats.unroutable_objectives.push(*objective);
        } else {
            stats
                .cliques
                .push(labeled.iter().map(|p| p.label).collect());

            // paths of the same objective conflict by definition
            for (p, q) in labeled.iter().tuple_combinations() {
                graph.add_edge(p.label, q.label);
            }
        }

        // conflicts against all previously stored paths
        for p in &labeled {
            for q in &all_paths {
                let conflict = if params.crossings {
                    p.has_overlap_with(q)
                } else {
                    p.has_intersection_with(q) || q.has_intersection_with(p)
                };
                if conflict {
                    graph.add_edge(p.label, q.label);
                }
            }
        }

        all_paths.extend(labeled);
    }

    stats.num_vertices = graph.num_vertices();
    stats.num_edges = graph.num_edges();

    debug!(
        vertices = stats.num_vertices,
        edges = stats.num_edges,
        unroutable = stats.unroutable_objectives.len(),
        "generated edge intersection graph"
    );

    Ok((graph, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clocking::ClockingScheme;
    use crate::layout::Topology;

    fn grid(x: u32, y: u32) -> Layout {
        Layout::new((x, y, 1), ClockingScheme::twoddwave(3), Topology::Cartesian)
    }

    #[test]
    fn objective_paths_form_a_clique() {
        let lyt = grid(2, 2);
        let objectives = [RoutingObjective::new((0, 0), (2, 2))];
        let (graph, stats) =
            generate_edge_intersection_graph(&lyt, &objectives, EpgParams::default()).unwrap();

        assert_eq!(graph.num_vertices(), 6);
        assert_eq!(stats.cliques.len(), 1);
        let clique = &stats.cliques[0];
        for (i, &a) in clique.iter().enumerate() {
            for &b in &clique[i + 1..] {
                assert!(graph.has_edge(a, b));
            }
        }
    }

    #[test]
    fn crossing_paths_do_not_conflict_when_crossings_are_enabled() {
        // two unique straight paths sharing exactly the center tile
        let lyt = grid(2, 2);
        let objectives = [
            RoutingObjective::new((1, 0), (1, 2)),
            RoutingObjective::new((0, 1), (2, 1)),
        ];

        let (strict, _) =
            generate_edge_intersection_graph(&lyt, &objectives, EpgParams::default()).unwrap();
        assert_eq!(strict.num_vertices(), 2);
        assert_eq!(strict.num_edges(), 1);

        let (crossing, _) = generate_edge_intersection_graph(
            &lyt,
            &objectives,
            EpgParams {
                crossings: true,
                path_limit: None,
            },
        )
        .unwrap();
        assert_eq!(crossing.num_edges(), 0);
    }

    #[test]
    fn unroutable_objectives_are_counted() {
        let lyt = grid(2, 2);
        // 2DDWave cannot route westwards
        let objectives = [RoutingObjective::new((2, 2), (0, 0))];
        let (graph, stats) =
            generate_edge_intersection_graph(&lyt, &objectives, EpgParams::default()).unwrap();

        assert_eq!(graph.num_vertices(), 0);
        assert_eq!(stats.unroutable_objectives.len(), 1);
        assert!(stats.cliques.is_empty());
    }
}
