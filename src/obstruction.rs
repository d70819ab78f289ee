//! Obstruction overlay for layouts.
//!
//! Path finding must not route through tiles or connections that are
//! already in use or explicitly blocked. [`ObstructionLayout`] layers a set
//! of blocked coordinates and connections over a borrowed [`Layout`];
//! occupied tiles of the underlying layout count as obstructed as well.
//! The overlay is cheap to clone, which lets spur-path searches add
//! temporary obstructions without touching the shared state.

use hashbrown::HashSet;

use crate::coords::Coord;
use crate::layout::Layout;

/// A [`Layout`] view extended by obstruction predicates.
#[derive(Clone, Debug)]
pub struct ObstructionLayout<'a> {
    layout: &'a Layout,
    coordinates: HashSet<Coord>,
    connections: HashSet<(Coord, Coord)>,
}

impl<'a> ObstructionLayout<'a> {
    /// Wraps `layout` with initially no explicit obstructions.
    pub fn new(layout: &'a Layout) -> Self {
        ObstructionLayout {
            layout,
            coordinates: HashSet::new(),
            connections: HashSet::new(),
        }
    }

    /// The wrapped layout.
    #[inline]
    pub fn layout(&self) -> &'a Layout {
        self.layout
    }

    /// Marks `c` as blocked.
    pub fn obstruct_coordinate(&mut self, c: Coord) {
        self.coordinates.insert(c);
    }

    /// Marks the directed connection `a -> b` as blocked.
    pub fn obstruct_connection(&mut self, a: Coord, b: Coord) {
        self.connections.insert((a, b));
    }

    /// Removes an explicit coordinate obstruction.
    pub fn clear_obstructed_coordinate(&mut self, c: Coord) {
        self.coordinates.remove(&c);
    }

    /// Removes an explicit connection obstruction.
    pub fn clear_obstructed_connection(&mut self, a: Coord, b: Coord) {
        self.connections.remove(&(a, b));
    }

    /// `true` iff `c` is explicitly blocked or occupied in the layout.
    pub fn is_obstructed_coordinate(&self, c: Coord) -> bool {
        self.coordinates.contains(&c) || self.layout.is_occupied(c)
    }

    /// `true` iff the directed connection `a -> b` is blocked.
    pub fn is_obstructed_connection(&self, a: Coord, b: Coord) -> bool {
        self.connections.contains(&(a, b))
    }

    /// `true` iff a path travelling from `current` onto the obstructed
    /// ground coordinate `successor` may pass over it in the crossing
    /// layer: the ground tile must hold a wire running orthogonally to the
    /// direction of travel, and the crossing layer must exist. This keeps
    /// crossings from running *along* another wire.
    pub fn is_crossable_wire(&self, current: Coord, successor: Coord) -> bool {
        let ground = successor.below();
        if !self.layout.is_wire_tile(ground) {
            return false;
        }
        if !self.layout.within_bounds(ground.above()) {
            return false;
        }

        let Some(travel) = self.layout.bearing(current, successor) else {
            return false;
        };

        // the wire below must run orthogonally to the direction of travel
        let wire_dirs: Vec<_> = self
            .layout
            .incoming_directions(ground)
            .into_iter()
            .chain(self.layout.outgoing_directions(ground))
            .collect();
        if wire_dirs.is_empty() {
            return false;
        }
        if travel.is_horizontal() {
            wire_dirs.iter().all(|d| d.is_vertical())
        } else if travel.is_vertical() {
            wire_dirs.iter().all(|d| d.is_horizontal())
        } else {
            // diagonal travel on shifted/hexagonal grids: require the wire
            // not to share any bearing axis with the travel direction
            wire_dirs.iter().all(|d| *d != travel && *d != travel.opposite())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clocking::ClockingScheme;
    use crate::layout::Topology;
    use crate::network::Operation;

    #[test]
    fn occupied_tiles_are_obstructed() {
        let mut lyt = Layout::new((2, 2, 1), ClockingScheme::twoddwave(3), Topology::Cartesian);
        lyt.assign_gate(Coord::new(1, 1), Operation::And, 0, None);

        let mut obs = ObstructionLayout::new(&lyt);
        assert!(obs.is_obstructed_coordinate(Coord::new(1, 1)));
        assert!(!obs.is_obstructed_coordinate(Coord::new(0, 0)));

        obs.obstruct_coordinate(Coord::new(0, 0));
        assert!(obs.is_obstructed_coordinate(Coord::new(0, 0)));
        obs.clear_obstructed_coordinate(Coord::new(0, 0));
        assert!(!obs.is_obstructed_coordinate(Coord::new(0, 0)));
    }

    #[test]
    fn orthogonal_wires_are_crossable() {
        let mut lyt = Layout::new((2, 2, 1), ClockingScheme::twoddwave(3), Topology::Cartesian);
        // vertical wire through (1, 1)
        lyt.assign_wire(Coord::new(1, 1), 0);
        lyt.add_incoming(Coord::new(1, 1), Coord::new(1, 0));
        lyt.add_outgoing(Coord::new(1, 1), Coord::new(1, 2));

        let obs = ObstructionLayout::new(&lyt);
        // horizontal travel across the vertical wire is allowed
        assert!(obs.is_crossable_wire(Coord::new(0, 1), Coord::new(1, 1)));
        // vertical travel would run along the wire
        assert!(!obs.is_crossable_wire(Coord::new(1, 0), Coord::new(1, 1)));
    }
}
