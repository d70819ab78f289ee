//! Routing objectives, coordinate paths, and wire commit.

use core::ops::{Deref, DerefMut};

use crate::coords::Coord;
use crate::layout::Layout;

/// A source-target coordinate pair to be connected by a path whose
/// interior honors the clocking discipline.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoutingObjective {
    pub source: Coord,
    pub target: Coord,
}

impl RoutingObjective {
    pub fn new(source: impl Into<Coord>, target: impl Into<Coord>) -> Self {
        RoutingObjective {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl core::fmt::Display for RoutingObjective {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// An ordered, loop-less sequence of coordinates from a source to a target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoordPath(Vec<Coord>);

impl CoordPath {
    pub fn new() -> Self {
        CoordPath(Vec::new())
    }

    pub fn from_coords(coords: Vec<Coord>) -> Self {
        CoordPath(coords)
    }

    /// Appends a coordinate to the end of the path.
    pub fn append(&mut self, c: Coord) {
        self.0.push(c);
    }

    /// The first coordinate, or the dead sentinel for an empty path.
    pub fn source(&self) -> Coord {
        self.0.first().copied().unwrap_or(Coord::dead())
    }

    /// The last coordinate, or the dead sentinel for an empty path.
    pub fn target(&self) -> Coord {
        self.0.last().copied().unwrap_or(Coord::dead())
    }

    /// `true` iff `c` occurs anywhere on the path.
    pub fn contains(&self, c: Coord) -> bool {
        self.0.contains(&c)
    }
}

impl Deref for CoordPath {
    type Target = Vec<Coord>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for CoordPath {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<Coord> for CoordPath {
    fn from_iter<I: IntoIterator<Item = Coord>>(iter: I) -> Self {
        CoordPath(iter.into_iter().collect())
    }
}

impl IntoIterator for CoordPath {
    type Item = Coord;
    type IntoIter = std::vec::IntoIter<Coord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// An ordered collection of paths. Duplicates are allowed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathCollection(Vec<CoordPath>);

impl PathCollection {
    pub fn new() -> Self {
        PathCollection(Vec::new())
    }

    pub fn add(&mut self, path: CoordPath) {
        self.0.push(path);
    }

    /// `true` iff an equal path is already contained.
    pub fn contains(&self, path: &CoordPath) -> bool {
        self.0.contains(path)
    }
}

impl Deref for PathCollection {
    type Target = Vec<CoordPath>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PathCollection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl IntoIterator for PathCollection {
    type Item = CoordPath;
    type IntoIter = std::vec::IntoIter<CoordPath>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<CoordPath> for PathCollection {
    fn from_iter<I: IntoIterator<Item = CoordPath>>(iter: I) -> Self {
        PathCollection(iter.into_iter().collect())
    }
}

/// Commits `path` to `layout`: every interior coordinate becomes a wire
/// segment with its in/out connections set. A hop onto a ground tile that
/// already carries a wire is promoted to the crossing layer, which creates
/// a crossing tile. The endpoints, which usually hold gates, only get
/// their connection records extended.
pub fn route_path(layout: &mut Layout, path: &CoordPath) {
    if path.len() < 2 {
        return;
    }

    let wire_id = layout.num_tiles() as u32;

    // place wires, promoting to the crossing layer where the ground is taken
    let mut placed: Vec<Coord> = Vec::with_capacity(path.len());
    placed.push(path.source());
    for (i, &c) in path.iter().enumerate().take(path.len() - 1).skip(1) {
        let mut c = c;
        if c.is_ground()
            && layout.is_wire_tile(c)
            && layout.within_bounds(c.above())
            && layout.is_empty_tile(c.above())
        {
            c = c.above();
        }
        if layout.is_empty_tile(c) {
            layout.assign_wire(c, wire_id + i as u32);
        }
        placed.push(c);
    }
    placed.push(path.target());

    for w in placed.windows(2) {
        layout.add_outgoing(w[0], w[1]);
        layout.add_incoming(w[1], w[0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clocking::ClockingScheme;
    use crate::layout::Topology;

    #[test]
    fn endpoints_of_empty_path_are_dead() {
        let p = CoordPath::new();
        assert!(p.source().is_dead());
        assert!(p.target().is_dead());
    }

    #[test]
    fn route_marks_interior_as_wires() {
        let mut lyt = Layout::new((3, 1, 1), ClockingScheme::twoddwave(3), Topology::Cartesian);
        let path: CoordPath = [
            Coord::new(0, 0),
            Coord::new(1, 0),
            Coord::new(2, 0),
            Coord::new(3, 0),
        ]
        .into_iter()
        .collect();

        route_path(&mut lyt, &path);

        assert!(lyt.is_wire_tile(Coord::new(1, 0)));
        assert!(lyt.is_wire_tile(Coord::new(2, 0)));
        assert!(lyt.is_empty_tile(Coord::new(0, 0)));
        assert_eq!(
            lyt.tile(Coord::new(1, 0)).unwrap().incoming,
            vec![Coord::new(0, 0)]
        );
        assert_eq!(
            lyt.tile(Coord::new(2, 0)).unwrap().outgoing,
            vec![Coord::new(3, 0)]
        );
    }
}
