//! Exhaustive and bounded path enumeration.
//!
//! [`enumerate_all_paths`] lists every simple source-to-target path that
//! respects clocking and obstructions; the loop-less constraint and the
//! bounded grid keep the search finite. [`yen_k_shortest_paths`] enumerates
//! up to `k` shortest distinct simple paths using A* as its shortest-path
//! oracle with temporary obstructions for the spur searches.

use hashbrown::HashSet;

use crate::algo::{a_star, resolve_successor, AStarParams};
use crate::coords::Coord;
use crate::error::RoutingError;
use crate::obstruction::ObstructionLayout;
use crate::path::{CoordPath, PathCollection, RoutingObjective};

/// Parameters for the path enumeration algorithms.
#[derive(Copy, Clone, Debug, Default)]
pub struct EnumerationParams {
    /// Allow paths to cross over obstructed tiles if they are occupied by
    /// wire segments.
    pub crossings: bool,
}

/// Enumerates all simple paths from `objective.source` to
/// `objective.target` in `layout` by depth-first search over the outgoing
/// clocked neighbors.
///
/// # Errors
///
/// Fails with [`RoutingError::InvalidCoordinate`] for dead endpoints and
/// [`RoutingError::OutOfBounds`] for endpoints outside the layout.
pub fn enumerate_all_paths(
    layout: &ObstructionLayout<'_>,
    objective: &RoutingObjective,
    params: EnumerationParams,
) -> Result<PathCollection, RoutingError> {
    let (source, target) = (objective.source, objective.target);

    if source.is_dead() || target.is_dead() {
        return Err(RoutingError::InvalidCoordinate);
    }
    for c in [source, target] {
        if !layout.layout().within_bounds(c) {
            return Err(RoutingError::OutOfBounds(c));
        }
    }

    let mut collection = PathCollection::new();
    let mut visited: HashSet<Coord> = HashSet::new();
    let mut stack = vec![source];

    visited.insert(source);
    recurse(
        layout,
        target,
        params.crossings,
        &mut stack,
        &mut visited,
        &mut collection,
    );

    Ok(collection)
}

fn recurse(
    layout: &ObstructionLayout<'_>,
    target: Coord,
    crossings: bool,
    stack: &mut Vec<Coord>,
    visited: &mut HashSet<Coord>,
    collection: &mut PathCollection,
) {
    let current = *stack.last().expect("stack is never empty");

    if current == target {
        collection.add(stack.iter().copied().collect());
        return;
    }

    for raw in layout.layout().outgoing_clocked(current) {
        let Some(successor) = resolve_successor(layout, current, raw, target, crossings) else {
            continue;
        };
        if !visited.insert(successor) {
            continue;
        }

        stack.push(successor);
        recurse(layout, target, crossings, stack, visited, collection);
        stack.pop();
        visited.remove(&successor);
    }
}

/// Enumerates up to `k` shortest loop-less paths from `objective.source`
/// to `objective.target` via Yen's algorithm. The sequence of returned
/// path lengths is non-decreasing.
///
/// # Errors
///
/// Same error conditions as [`enumerate_all_paths`]; `k = 0` yields an
/// empty collection.
pub fn yen_k_shortest_paths(
    layout: &ObstructionLayout<'_>,
    objective: &RoutingObjective,
    k: u32,
    params: EnumerationParams,
) -> Result<PathCollection, RoutingError> {
    let astar_params = AStarParams {
        crossings: params.crossings,
    };
    let shortest = |l: &ObstructionLayout<'_>, obj: &RoutingObjective| {
        a_star(
            l,
            obj,
            super::manhattan_distance,
            super::unit_cost,
            astar_params,
        )
    };

    let mut found: Vec<CoordPath> = Vec::new();
    let mut candidates: Vec<CoordPath> = Vec::new();

    if k == 0 {
        return Ok(PathCollection::new());
    }

    let first = shortest(layout, objective)?;
    if first.is_empty() {
        return Ok(PathCollection::new());
    }
    found.push(first);

    while (found.len() as u32) < k {
        let previous = found.last().expect("at least one path was found").clone();

        // deviate at every spur node of the previously found path
        for i in 0..previous.len() - 1 {
            let spur_node = previous[i];
            let root = &previous[..=i];

            let mut spur_layout = layout.clone();

            // remove the edges that earlier paths with the same root took
            for p in &found {
                if p.len() > i + 1 && p[..=i] == *root {
                    spur_layout.obstruct_connection(p[i], p[i + 1]);
                }
            }
            // remove the root nodes except for the spur node itself
            for &c in &root[..i] {
                spur_layout.obstruct_coordinate(c);
            }

            let spur = shortest(
                &spur_layout,
                &RoutingObjective::new(spur_node, objective.target),
            )?;
            if spur.is_empty() {
                continue;
            }

            let mut total: Vec<Coord> = root[..i].to_vec();
            total.extend(spur.iter().copied());
            let total: CoordPath = total.into_iter().collect();

            if !found.contains(&total) && !candidates.contains(&total) {
                candidates.push(total);
            }
        }

        if candidates.is_empty() {
            break;
        }

        // accept the shortest candidate; stable sort keeps discovery order
        // among equal lengths for determinism
        candidates.sort_by_key(|p| p.len());
        found.push(candidates.remove(0));
    }

    Ok(found.into_iter().collect())
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
    fn all_paths_on_a_2x2_grid() {
        let lyt = grid(1, 1);
        let obs = ObstructionLayout::new(&lyt);
        let paths = enumerate_all_paths(
            &obs,
            &RoutingObjective::new((0, 0), (1, 1)),
            EnumerationParams::default(),
        )
        .unwrap();

        // east-then-south and south-then-east
        assert_eq!(paths.len(), 2);
        for p in paths.iter() {
            assert_eq!(p.len(), 3);
            assert_eq!(p.source(), Coord::new(0, 0));
            assert_eq!(p.target(), Coord::new(1, 1));
        }
    }

    #[test]
    fn all_paths_count_matches_binomial() {
        // on an unobstructed 2DDWave grid, monotone lattice paths from the
        // origin to (x, y) number (x + y over x)
        let lyt = grid(2, 2);
        let obs = ObstructionLayout::new(&lyt);
        let paths = enumerate_all_paths(
            &obs,
            &RoutingObjective::new((0, 0), (2, 2)),
            EnumerationParams::default(),
        )
        .unwrap();
        assert_eq!(paths.len(), 6);
    }

    #[test]
    fn yen_lengths_are_non_decreasing() {
        let lyt = grid(3, 3);
        let obs = ObstructionLayout::new(&lyt);
        let paths = yen_k_shortest_paths(
            &obs,
            &RoutingObjective::new((0, 0), (3, 3)),
            10,
            EnumerationParams::default(),
        )
        .unwrap();

        assert!(!paths.is_empty());
        for w in paths.windows(2) {
            assert!(w[0].len() <= w[1].len());
        }
        // all monotone paths have equal length here
        assert!(paths.iter().all(|p| p.len() == 7));
    }

    #[test]
    fn yen_zero_paths() {
        let lyt = grid(2, 2);
        let obs = ObstructionLayout::new(&lyt);
        let paths = yen_k_shortest_paths(
            &obs,
            &RoutingObjective::new((0, 0), (2, 2)),
            0,
            EnumerationParams::default(),
        )
        .unwrap();
        assert!(paths.is_empty());
    }
}
