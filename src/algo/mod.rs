//! Algorithms operating on clocked layouts and logic networks: path
//! finding, edge-intersection graph construction, graph coloring,
//! multi-path color routing, and network levelization.

pub mod astar;
pub mod color_routing;
pub mod coloring;
pub mod distance;
pub mod enumerate;
pub mod epg;
pub mod hierarchy;
pub mod jump_point_search;

pub use astar::{a_star, a_star_distance, AStarParams};
pub use color_routing::{color_routing, ColorRoutingParams, ColorRoutingStats};
pub use coloring::{
    determine_vertex_coloring, verify_coloring, ColoringEngine, ColoringParams, ColoringStats,
    VertexColoring,
};
pub use distance::{euclidean_distance, manhattan_distance, unit_cost};
pub use enumerate::{enumerate_all_paths, yen_k_shortest_paths, EnumerationParams};
pub use epg::{generate_edge_intersection_graph, EdgeIntersectionGraph, EpgParams, EpgStats};
pub use hierarchy::NetworkHierarchy;
pub use jump_point_search::jump_point_search;

use crate::coords::Coord;
use crate::obstruction::ObstructionLayout;

/// Resolves a raw clocking successor to the coordinate a path may actually
/// step onto, taking obstructions and the crossing policy into account.
///
/// Obstructed ground coordinates are only admissible when they are the
/// target itself, or when crossings are enabled and the path may pass over
/// them in the crossing layer (see
/// [`ObstructionLayout::is_crossable_wire`]). Returns `None` when the step
/// is blocked.
pub(crate) fn resolve_successor(
    layout: &ObstructionLayout<'_>,
    current: Coord,
    raw: Coord,
    target: Coord,
    crossings: bool,
) -> Option<Coord> {
    // return to the ground layer to avoid getting stuck in the crossing layer
    let mut successor = raw.below();

    if layout.is_obstructed_coordinate(successor) && successor != target {
        let may_cross = crossings
            && (layout.is_crossable_wire(current, successor) || successor.above() == target);
        if !may_cross {
            return None;
        }

        let above = successor.above();
        if layout.layout().within_bounds(above)
            && (!layout.is_obstructed_coordinate(above) || above == target)
        {
            successor = above;
        } else {
            return None;
        }
    }

    if layout.is_obstructed_connection(current, successor) {
        return None;
    }

    Some(successor)
}
