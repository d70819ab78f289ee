//! The A* path-finding algorithm for shortest loop-less paths between a
//! source and a target coordinate in a clocked layout.
//!
//! A* extends Dijkstra's algorithm by a heuristic distance function that
//! estimates the remaining cost towards the target in every step. For the
//! returned path to be cost-minimal, the heuristic must be admissible,
//! i.e., never overestimate the remaining cost; the Manhattan and the
//! Euclidean distance qualify on uniform-cost clocked grids (see
//! [`crate::algo::distance`]).
//!
//! Paths never run through obstructed coordinates or connections. If
//! crossings are enabled, paths may pass over obstructed wire tiles in the
//! crossing layer; such crossings are orthogonal only and never run along
//! the wire below.

use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};

use crate::algo::resolve_successor;
use crate::coords::Coord;
use crate::error::RoutingError;
use crate::obstruction::ObstructionLayout;
use crate::path::{CoordPath, RoutingObjective};
use crate::scored::MinScored;

/// Parameters for the A* algorithm.
#[derive(Copy, Clone, Debug, Default)]
pub struct AStarParams {
    /// Allow paths to cross over obstructed tiles if they are occupied by
    /// wire segments.
    pub crossings: bool,
}

/// Determines the shortest loop-less path from `objective.source` to
/// `objective.target` in `layout`.
///
/// `distance` is the heuristic estimation function and `cost` the per-step
/// cost function. With an admissible heuristic, the returned path minimizes
/// the sum of step costs. Ties on the f-value are broken by insertion
/// order, which makes the result deterministic for identical inputs.
///
/// # Errors
///
/// Fails with [`RoutingError::InvalidCoordinate`] if source or target are
/// dead, and with [`RoutingError::OutOfBounds`] if either lies outside the
/// layout. An unreachable target is *not* an error: the result is an empty
/// path.
pub fn a_star<D, C>(
    layout: &ObstructionLayout<'_>,
    objective: &RoutingObjective,
    distance: D,
    cost: C,
    params: AStarParams,
) -> Result<CoordPath, RoutingError>
where
    D: Fn(Coord, Coord) -> u64,
    C: Fn(Coord, Coord) -> u64,
{
    let (source, target) = (objective.source, objective.target);

    if source.is_dead() || target.is_dead() {
        return Err(RoutingError::InvalidCoordinate);
    }
    for c in [source, target] {
        if !layout.layout().within_bounds(c) {
            return Err(RoutingError::OutOfBounds(c));
        }
    }

    // open set keyed on (f, insertion order)
    let mut open_list = BinaryHeap::new();
    let mut closed_list: HashSet<Coord> = HashSet::new();
    let mut g_values: HashMap<Coord, u64> = HashMap::new();
    let mut came_from: HashMap<Coord, Coord> = HashMap::new();
    let mut insertion: u64 = 0;

    g_values.insert(source, 0);
    open_list.push(MinScored((distance(source, target), insertion), source));

    while let Some(MinScored(_, current)) = open_list.pop() {
        if current == target {
            return Ok(reconstruct_path(&came_from, source, target));
        }

        // don't examine the current coordinate again
        if !closed_list.insert(current) {
            continue;
        }

        for raw in layout.layout().outgoing_clocked(current) {
            let Some(successor) = resolve_successor(layout, current, raw, target, params.crossings)
            else {
                continue;
            };

            if closed_list.contains(&successor) {
                continue;
            }

            let tentative_g = g_values[&current] + cost(current, successor);
            if tentative_g >= g_values.get(&successor).copied().unwrap_or(u64::MAX) {
                // no improvement over the best known path to successor
                continue;
            }

            came_from.insert(successor, current);
            g_values.insert(successor, tentative_g);

            insertion += 1;
            let f = tentative_g + distance(successor, target);
            open_list.push(MinScored((f, insertion), successor));
        }
    }

    // open list is empty, no path has been found
    Ok(CoordPath::new())
}

/// The actual minimum path length between `source` and `target` in
/// `layout`, computed via A* traversal with unit costs.
///
/// Returns `None` if no path exists (the `∞` case) or if source or target
/// are invalid coordinates.
pub fn a_star_distance(
    layout: &ObstructionLayout<'_>,
    source: Coord,
    target: Coord,
) -> Option<u64> {
    let path = a_star(
        layout,
        &RoutingObjective::new(source, target),
        super::manhattan_distance,
        super::unit_cost,
        AStarParams::default(),
    )
    .ok()?;

    if path.is_empty() {
        return None;
    }

    Some(path.len() as u64 - 1)
}

/// Walks the `came_from` map backwards from `target` and reverses the
/// result into source-to-target order.
fn reconstruct_path(came_from: &HashMap<Coord, Coord>, source: Coord, target: Coord) -> CoordPath {
    let mut path = vec![target];

    let mut current = target;
    while current != source {
        current = came_from[&current];
        path.push(current);
    }

    path.reverse();
    path.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clocking::ClockingScheme;
    use crate::layout::{Layout, Topology};

    fn grid(x: u32, y: u32) -> Layout {
        Layout::new((x, y, 1), ClockingScheme::twoddwave(3), Topology::Cartesian)
    }

    #[test]
    fn straight_line() {
        let lyt = grid(3, 0);
        let obs = ObstructionLayout::new(&lyt);
        let path = a_star(
            &obs,
            &RoutingObjective::new((0, 0), (3, 0)),
            super::super::manhattan_distance,
            super::super::unit_cost,
            AStarParams::default(),
        )
        .unwrap();

        assert_eq!(path.len(), 4);
        assert_eq!(path.source(), Coord::new(0, 0));
        assert_eq!(path.target(), Coord::new(3, 0));
    }

    #[test]
    fn dead_coordinates_are_rejected() {
        let lyt = grid(2, 2);
        let obs = ObstructionLayout::new(&lyt);
        let result = a_star(
            &obs,
            &RoutingObjective::new(Coord::dead(), Coord::new(1, 1)),
            super::super::manhattan_distance,
            super::super::unit_cost,
            AStarParams::default(),
        );
        assert_eq!(result, Err(RoutingError::InvalidCoordinate));
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let lyt = grid(2, 2);
        let obs = ObstructionLayout::new(&lyt);
        let result = a_star(
            &obs,
            &RoutingObjective::new((0, 0), (5, 5)),
            super::super::manhattan_distance,
            super::super::unit_cost,
            AStarParams::default(),
        );
        assert_eq!(result, Err(RoutingError::OutOfBounds(Coord::new(5, 5))));
    }

    #[test]
    fn unreachable_is_empty() {
        // 2DDWave flows east/south only, so the north-western corner is
        // unreachable from the south-eastern one
        let lyt = grid(2, 2);
        let obs = ObstructionLayout::new(&lyt);
        let path = a_star(
            &obs,
            &RoutingObjective::new((2, 2), (0, 0)),
            super::super::manhattan_distance,
            super::super::unit_cost,
            AStarParams::default(),
        )
        .unwrap();
        assert!(path.is_empty());
        assert_eq!(a_star_distance(&obs, Coord::new(2, 2), Coord::new(0, 0)), None);
    }
}
