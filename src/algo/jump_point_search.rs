//! The Jump Point Search (JPS) path-finding algorithm for shortest
//! loop-less paths on Cartesian layouts.
//!
//! JPS prunes A*'s frontier by jumping straight through uniform regions
//! until a *forced neighbor* is detected, i.e., a neighbor whose
//! availability depends on an obstruction perpendicular to the direction
//! of travel. Gaps between jump points are filled by Bresenham
//! interpolation after the path has been reconstructed.
//!
//! JPS assumes a unit-cost grid, supports no wire crossings, and disallows
//! diagonal movement (which grid-based FCN technologies do not offer
//! anyway). Under clocking schemes whose data flow deviates from plain
//! Cartesian adjacency, the pruning loses its optimality argument; A* (see
//! [`crate::algo::a_star`]) is the recommended default on clocked grids,
//! with JPS as an optional fast path on Cartesian-adjacency ones.

use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};

use crate::coords::Coord;
use crate::error::RoutingError;
use crate::obstruction::ObstructionLayout;
use crate::path::{CoordPath, RoutingObjective};
use crate::scored::MinScored;

/// Determines a path from `objective.source` to `objective.target` in
/// `layout` via jump point search, using `distance` as the heuristic
/// estimation function.
///
/// # Errors
///
/// Fails with [`RoutingError::InvalidCoordinate`] for dead endpoints and
/// [`RoutingError::OutOfBounds`] for endpoints outside the layout. An
/// unreachable target yields an empty path.
pub fn jump_point_search<D>(
    layout: &ObstructionLayout<'_>,
    objective: &RoutingObjective,
    distance: D,
) -> Result<CoordPath, RoutingError>
where
    D: Fn(Coord, Coord) -> u64,
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

    let search = JumpPointSearch {
        layout,
        target,
        distance,
    };

    let mut open_list = BinaryHeap::new();
    let mut closed_list: HashSet<Coord> = HashSet::new();
    let mut g_values: HashMap<Coord, u64> = HashMap::new();
    let mut came_from: HashMap<Coord, Coord> = HashMap::new();
    let mut insertion: u64 = 0;

    g_values.insert(source, 0);
    open_list.push(MinScored((search.h(source), insertion), source));

    while let Some(MinScored(_, current)) = open_list.pop() {
        if current == target {
            return Ok(fill_in_jumps(&reconstruct(&came_from, source, target)));
        }

        if !closed_list.insert(current) {
            continue;
        }

        for successor in layout.layout().outgoing_clocked(current) {
            if layout.is_obstructed_connection(current, successor) {
                continue;
            }
            if layout.is_obstructed_coordinate(successor) && successor != target {
                continue;
            }

            // compute the next jump point to prune the search space
            let Some(jump_point) = search.jump(point(current), point(successor)) else {
                continue;
            };

            if closed_list.contains(&jump_point) {
                continue;
            }

            // the jump point might not be adjacent; add its distance
            let tentative_g = g_values[&current] + search.step(current, jump_point);
            if tentative_g >= g_values.get(&jump_point).copied().unwrap_or(u64::MAX) {
                continue;
            }

            came_from.insert(jump_point, current);
            g_values.insert(jump_point, tentative_g);

            insertion += 1;
            let f = tentative_g + search.h(jump_point);
            open_list.push(MinScored((f, insertion), jump_point));
        }
    }

    Ok(CoordPath::new())
}

/// Signed grid position, so that probes beyond the layout borders stay
/// representable.
type Point = (i64, i64);

fn point(c: Coord) -> Point {
    (i64::from(c.x), i64::from(c.y))
}

struct JumpPointSearch<'a, 'l, D> {
    layout: &'a ObstructionLayout<'l>,
    target: Coord,
    distance: D,
}

impl<D> JumpPointSearch<'_, '_, D>
where
    D: Fn(Coord, Coord) -> u64,
{
    fn h(&self, c: Coord) -> u64 {
        (self.distance)(c, self.target)
    }

    fn step(&self, a: Coord, b: Coord) -> u64 {
        (self.distance)(a, b)
    }

    fn coord(&self, p: Point) -> Option<Coord> {
        if p.0 < 0 || p.1 < 0 {
            return None;
        }
        let c = Coord::new(p.0 as u32, p.1 as u32);
        self.layout.layout().within_bounds(c).then_some(c)
    }

    /// `true` iff `c2` is directly reachable from `c1`: the coordinates
    /// differ, the clocking checks out, and no obstruction is in the way.
    fn is_traversable(&self, c1: Point, c2: Point) -> bool {
        if c1 == c2 {
            return false;
        }
        let (Some(a), Some(b)) = (self.coord(c1), self.coord(c2)) else {
            return false;
        };
        if !self.layout.layout().is_outgoing_clocked(a, b) {
            return false;
        }
        if self.layout.is_obstructed_connection(a, b) {
            return false;
        }
        if self.layout.is_obstructed_coordinate(b) && b != self.target {
            return false;
        }
        true
    }

    /// Computes the next jump point starting from `successor` with
    /// `current` as its parent; the vector between them defines the
    /// direction of travel. A jump point must be stepwise traversable from
    /// `successor` through non-obstructed tiles.
    fn jump(&self, current: Point, successor: Point) -> Option<Coord> {
        if !self.is_traversable(current, successor) {
            return None;
        }

        let successor_coord = self.coord(successor)?;
        if successor_coord == self.target {
            return Some(successor_coord);
        }

        let (cx, cy) = current;
        let (sx, sy) = successor;
        let (dx, dy) = (sx - cx, sy - cy);

        if dx != 0 {
            // forced neighbors perpendicular to horizontal travel
            if (self.is_traversable(successor, (sx, sy - 1))
                && !self.is_traversable(successor, (sx - dx, sy - 1)))
                || (self.is_traversable(successor, (sx, sy + 1))
                    && !self.is_traversable(successor, (sx - dx, sy + 1)))
            {
                return Some(successor_coord);
            }
        } else if dy != 0 {
            // forced neighbors perpendicular to vertical travel
            if (self.is_traversable(successor, (sx - 1, sy))
                && !self.is_traversable(successor, (sx - 1, sy - dy)))
                || (self.is_traversable(successor, (sx + 1, sy))
                    && !self.is_traversable(successor, (sx + 1, sy - dy)))
            {
                return Some(successor_coord);
            }
            // horizontal jump points while traversing vertically
            if self.jump(successor, (sx + 1, sy)).is_some()
                || self.jump(successor, (sx - 1, sy)).is_some()
            {
                return Some(successor_coord);
            }
        }

        self.jump(successor, (sx + dx, sy + dy))
    }
}

fn reconstruct(came_from: &HashMap<Coord, Coord>, source: Coord, target: Coord) -> CoordPath {
    let mut path = vec![target];

    let mut current = target;
    while current != source {
        current = came_from[&current];
        path.push(current);
    }

    path.reverse();
    path.into_iter().collect()
}

/// Completes a reconstructed path by interpolating the gaps that were
/// skipped via jump points.
fn fill_in_jumps(path: &CoordPath) -> CoordPath {
    if path.len() < 2 {
        return path.clone();
    }

    let mut expanded = Vec::new();
    for window in path.windows(2) {
        let line = interpolate(window[0], window[1]);
        expanded.extend_from_slice(&line[..line.len() - 1]);
    }
    expanded.push(path.target());

    expanded.into_iter().collect()
}

/// A straight line between two coordinates via Bresenham's algorithm.
fn interpolate(c1: Coord, c2: Coord) -> Vec<Coord> {
    let mut line = Vec::new();

    let dx = i64::from(c1.x.abs_diff(c2.x));
    let dy = i64::from(c1.y.abs_diff(c2.y));
    let sx: i64 = if c1.x < c2.x { 1 } else { -1 };
    let sy: i64 = if c1.y < c2.y { 1 } else { -1 };

    let (mut x, mut y) = (i64::from(c1.x), i64::from(c1.y));
    let mut err = dx - dy;

    loop {
        line.push(Coord::new(x as u32, y as u32));

        if x == i64::from(c2.x) && y == i64::from(c2.y) {
            break;
        }

        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clocking::ClockingScheme;
    use crate::layout::{Layout, Topology};

    #[test]
    fn interpolation_is_a_straight_line() {
        let line = interpolate(Coord::new(0, 0), Coord::new(3, 0));
        assert_eq!(
            line,
            vec![
                Coord::new(0, 0),
                Coord::new(1, 0),
                Coord::new(2, 0),
                Coord::new(3, 0)
            ]
        );
    }

    #[test]
    fn finds_a_valid_path_on_an_open_grid() {
        let lyt = Layout::new((4, 4, 0), ClockingScheme::twoddwave(3), Topology::Cartesian);
        let obs = ObstructionLayout::new(&lyt);
        let path = jump_point_search(
            &obs,
            &RoutingObjective::new((0, 0), (4, 4)),
            super::super::manhattan_distance,
        )
        .unwrap();

        assert_eq!(path.source(), Coord::new(0, 0));
        assert_eq!(path.target(), Coord::new(4, 4));
        assert_eq!(path.len(), 9);
        for w in path.windows(2) {
            assert!(lyt.is_outgoing_clocked(w[0], w[1]));
        }
    }
}
