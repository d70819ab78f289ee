//! Multi-path signal routing based on coloring edge-intersection graphs.
//!
//! Given a gate-level layout and a set of routing objectives, this
//! algorithm tries to fulfill all objectives by routing several
//! conflict-free wire paths simultaneously. All satisfying paths are
//! enumerated and turned into an edge-intersection graph whose vertices
//! are paths and whose edges are conflicts; a vertex coloring then yields
//! compatible path sets, and the largest such set (the most frequent
//! color) is committed to the layout.

use tracing::{debug, info};

use crate::algo::coloring::{
    determine_vertex_coloring, ColoringEngine, ColoringParams, ColoringStats,
};
use crate::algo::epg::{generate_edge_intersection_graph, EpgParams, EpgStats};
use crate::error::RoutingError;
use crate::layout::Layout;
use crate::path::{route_path, RoutingObjective};

/// Parameters for the color-routing orchestrator.
#[derive(Clone, Debug)]
pub struct ColorRoutingParams {
    /// Do not abort if some objectives cannot be fulfilled, but partially
    /// route the layout as much as possible.
    pub conduct_partial_routing: bool,
    /// Enable crossings.
    pub crossings: bool,
    /// If set, only up to `path_limit` shortest paths are enumerated per
    /// objective (via Yen's algorithm) instead of all paths.
    pub path_limit: Option<u32>,
    /// The coloring engine to use.
    pub engine: ColoringEngine,
    /// Seed for the randomized coloring engines.
    pub seed: u64,
}

impl Default for ColorRoutingParams {
    fn default() -> Self {
        ColorRoutingParams {
            conduct_partial_routing: false,
            crossings: false,
            path_limit: None,
            engine: ColoringEngine::Sat,
            seed: 0,
        }
    }
}

/// Statistics of a color-routing run.
#[derive(Clone, Debug, Default)]
pub struct ColorRoutingStats {
    /// Objectives that were not fulfilled.
    pub number_of_unsatisfied_objectives: usize,
    /// Statistics of the edge-intersection graph generation.
    pub epg_stats: EpgStats,
    /// Statistics of the vertex coloring.
    pub color_stats: ColoringStats,
}

/// Satisfies the given routing objectives in `layout` by committing a
/// conflict-free subset of enumerated paths.
///
/// In strict mode (`conduct_partial_routing = false`), the call fails with
/// [`RoutingError::UnroutableObjective`] if any objective admits no path at
/// all and with [`RoutingError::ColoringInfeasible`] if no coloring covers
/// every objective with one color; *nothing* is committed to the layout in
/// either case. With partial routing enabled, both conditions are recovered
/// and as many objectives as possible are routed.
///
/// Returns the run's statistics on success.
pub fn color_routing(
    layout: &mut Layout,
    objectives: &[RoutingObjective],
    params: &ColorRoutingParams,
) -> Result<ColorRoutingStats, RoutingError> {
    let mut stats = ColorRoutingStats::default();

    let (graph, epg_stats) = generate_edge_intersection_graph(
        layout,
        objectives,
        EpgParams {
            crossings: params.crossings,
            path_limit: params.path_limit,
        },
    )?;
    stats.epg_stats = epg_stats;

    // in strict mode, abort if path enumeration already failed an objective
    if !params.conduct_partial_routing {
        if let Some(&unroutable) = stats.epg_stats.unroutable_objectives.first() {
            return Err(RoutingError::UnroutableObjective(unroutable));
        }
    }

    let coloring_params = ColoringParams {
        engine: params.engine,
        seed: params.seed,
        cliques: stats.epg_stats.cliques.clone(),
        verify_coloring_after_computation: false,
        ..Default::default()
    };
    let (coloring, color_stats) = determine_vertex_coloring(&graph, &coloring_params);
    stats.color_stats = color_stats;

    // a coloring fulfills all objectives iff its most frequent color hits
    // every clique, i.e., occurs exactly once per objective
    if !params.conduct_partial_routing
        && stats.color_stats.color_frequency != stats.epg_stats.cliques.len()
    {
        return Err(RoutingError::ColoringInfeasible);
    }

    let mut satisfied = 0usize;
    for v in graph.vertices() {
        if coloring.get(&v) == Some(&stats.color_stats.most_frequent_color) {
            route_path(layout, graph.path(v));
            satisfied += 1;
        }
    }

    stats.number_of_unsatisfied_objectives = objectives.len() - satisfied;

    if stats.number_of_unsatisfied_objectives > 0 {
        debug!(
            unsatisfied = stats.number_of_unsatisfied_objectives,
            "conducted partial routing"
        );
    } else {
        info!(objectives = objectives.len(), "routed all objectives");
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clocking::ClockingScheme;
    use crate::coords::Coord;
    use crate::layout::Topology;

    fn grid() -> Layout {
        Layout::new((2, 2, 1), ClockingScheme::twoddwave(3), Topology::Cartesian)
    }

    #[test]
    fn intersecting_objectives_fail_without_crossings() {
        let mut lyt = grid();
        let before = lyt.clone();
        let objectives = [
            RoutingObjective::new((1, 0), (1, 2)),
            RoutingObjective::new((0, 1), (2, 1)),
        ];

        let result = color_routing(&mut lyt, &objectives, &ColorRoutingParams::default());
        assert_eq!(result.unwrap_err(), RoutingError::ColoringInfeasible);
        // nothing must have been committed
        assert_eq!(lyt, before);
    }

    #[test]
    fn crossings_resolve_single_tile_conflicts() {
        let mut lyt = grid();
        let objectives = [
            RoutingObjective::new((1, 0), (1, 2)),
            RoutingObjective::new((0, 1), (2, 1)),
        ];

        let stats = color_routing(
            &mut lyt,
            &objectives,
            &ColorRoutingParams {
                crossings: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(stats.number_of_unsatisfied_objectives, 0);
        assert!(lyt.is_wire_tile(Coord::new(1, 1)));
        // the second wire was promoted to the crossing layer
        assert!(lyt.is_crossing(Coord::new(1, 1)));
    }

    #[test]
    fn partial_routing_commits_what_it_can() {
        let mut lyt = grid();
        let objectives = [
            RoutingObjective::new((1, 0), (1, 2)),
            RoutingObjective::new((0, 1), (2, 1)),
        ];

        let stats = color_routing(
            &mut lyt,
            &objectives,
            &ColorRoutingParams {
                conduct_partial_routing: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(stats.number_of_unsatisfied_objectives, 1);
    }
}
