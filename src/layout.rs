//! Clocked gate-level layouts.
//!
//! A [`Layout`] combines a bounded coordinate space with a clocking scheme
//! and per-tile gate storage. Tiles live on a ground layer (`z = 0`) and an
//! optional crossing layer (`z = 1`); each ground tile holds at most one
//! gate, or a wire segment with a possible second wire segment above it.
//!
//! The coordinate space is one of three tile arrangements: Cartesian,
//! shifted Cartesian (brick-wall), or hexagonal. Shifted and hexagonal
//! arrangements share their offset-coordinate adjacency; they differ only
//! in tile geometry.

use indexmap::IndexMap;

use crate::clocking::ClockingScheme;
use crate::coords::{AspectRatio, Coord};
use crate::network::Operation;
use crate::Direction;

/// Whether shifted rows/columns are the odd or the even ones.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parity {
    Odd,
    Even,
}

/// Which axis of the grid is shifted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShiftAxis {
    Row,
    Column,
}

/// The tile arrangement of a layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Topology {
    Cartesian,
    ShiftedCartesian { axis: ShiftAxis, parity: Parity },
    Hex { axis: ShiftAxis, parity: Parity },
}

impl Topology {
    /// The FGL name of this topology.
    pub fn as_str(&self) -> &'static str {
        use Parity::*;
        use ShiftAxis::*;
        match self {
            Topology::Cartesian => "cartesian",
            Topology::ShiftedCartesian { axis: Row, parity: Odd } => "odd_row_cartesian",
            Topology::ShiftedCartesian { axis: Row, parity: Even } => "even_row_cartesian",
            Topology::ShiftedCartesian { axis: Column, parity: Odd } => "odd_column_cartesian",
            Topology::ShiftedCartesian { axis: Column, parity: Even } => "even_column_cartesian",
            Topology::Hex { axis: Row, parity: Odd } => "odd_row_hex",
            Topology::Hex { axis: Row, parity: Even } => "even_row_hex",
            Topology::Hex { axis: Column, parity: Odd } => "odd_column_hex",
            Topology::Hex { axis: Column, parity: Even } => "even_column_hex",
        }
    }

    /// Parses an FGL topology name.
    pub fn from_str(s: &str) -> Option<Topology> {
        use Parity::*;
        use ShiftAxis::*;
        match s {
            "cartesian" => Some(Topology::Cartesian),
            "odd_row_cartesian" => Some(Topology::ShiftedCartesian { axis: Row, parity: Odd }),
            "even_row_cartesian" => Some(Topology::ShiftedCartesian { axis: Row, parity: Even }),
            "odd_column_cartesian" => {
                Some(Topology::ShiftedCartesian { axis: Column, parity: Odd })
            }
            "even_column_cartesian" => {
                Some(Topology::ShiftedCartesian { axis: Column, parity: Even })
            }
            "odd_row_hex" => Some(Topology::Hex { axis: Row, parity: Odd }),
            "even_row_hex" => Some(Topology::Hex { axis: Row, parity: Even }),
            "odd_column_hex" => Some(Topology::Hex { axis: Column, parity: Odd }),
            "even_column_hex" => Some(Topology::Hex { axis: Column, parity: Even }),
            _ => None,
        }
    }

    /// `true` iff the arrangement uses plain 4-neighbor adjacency.
    #[inline]
    pub fn is_cartesian(&self) -> bool {
        matches!(self, Topology::Cartesian)
    }
}

/// Contents of a single occupied tile.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    /// The operation placed here. `Operation::Wire` marks wire segments.
    pub op: Operation,
    /// Gate id, unique within the layout.
    pub id: u32,
    /// PI/PO name, if any.
    pub name: Option<String>,
    /// Coordinates feeding into this tile.
    pub incoming: Vec<Coord>,
    /// Coordinates this tile feeds.
    pub outgoing: Vec<Coord>,
    /// Artificial clock-latch delay in whole clock cycles.
    pub latch: u32,
}

impl Tile {
    fn new(op: Operation, id: u32, name: Option<String>) -> Self {
        Tile {
            op,
            id,
            name,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            latch: 0,
        }
    }
}

/// A clocked gate-level layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    name: String,
    ar: AspectRatio,
    scheme: ClockingScheme,
    topology: Topology,
    tiles: IndexMap<Coord, Tile>,
}

impl Layout {
    /// An empty layout spanning `ar` under the given clocking scheme.
    pub fn new(ar: impl Into<AspectRatio>, scheme: ClockingScheme, topology: Topology) -> Self {
        Layout {
            name: String::new(),
            ar: ar.into(),
            scheme,
            topology,
            tiles: IndexMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    // --- geometry ---------------------------------------------------------

    #[inline]
    pub fn aspect_ratio(&self) -> AspectRatio {
        self.ar
    }

    #[inline]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Highest x-coordinate.
    #[inline]
    pub fn x(&self) -> u32 {
        self.ar.x
    }

    /// Highest y-coordinate.
    #[inline]
    pub fn y(&self) -> u32 {
        self.ar.y
    }

    /// Highest z-coordinate (1 iff a crossing layer exists).
    #[inline]
    pub fn z(&self) -> u8 {
        self.ar.z
    }

    /// The number of ground-layer tiles.
    #[inline]
    pub fn area(&self) -> u64 {
        self.ar.area()
    }

    #[inline]
    pub fn within_bounds(&self, c: Coord) -> bool {
        self.ar.within_bounds(c)
    }

    /// Grows the layout towards east and/or south. Layouts never shrink;
    /// components smaller than the current extent are ignored.
    pub fn resize(&mut self, ar: impl Into<AspectRatio>) {
        let ar = ar.into();
        self.ar.x = self.ar.x.max(ar.x);
        self.ar.y = self.ar.y.max(ar.y);
        self.ar.z = self.ar.z.max(ar.z);
    }

    /// `true` iff `c` touches the layout's outer perimeter.
    pub fn is_border(&self, c: Coord) -> bool {
        c.x == 0 || c.y == 0 || c.x == self.ar.x || c.y == self.ar.y
    }

    /// `true` iff `c` lies on the western border.
    pub fn is_western_border(&self, c: Coord) -> bool {
        c.x == 0
    }

    /// `true` iff `c` lies on the eastern border.
    pub fn is_eastern_border(&self, c: Coord) -> bool {
        c.x == self.ar.x
    }

    /// All ground-layer coordinates in row-major order.
    pub fn ground_coords(&self) -> impl Iterator<Item = Coord> + '_ {
        let (xs, ys) = (self.ar.x, self.ar.y);
        (0..=ys).flat_map(move |y| (0..=xs).map(move |x| Coord::new(x, y)))
    }

    fn in_bounds(&self, x: i64, y: i64, z: u8) -> Option<Coord> {
        if x < 0 || y < 0 {
            return None;
        }
        let c = Coord::with_z(x as u32, y as u32, z);
        self.within_bounds(c).then_some(c)
    }

    /// `true` iff the row/column through `c` is the shifted one.
    fn is_shifted(&self, c: Coord) -> bool {
        let (axis, parity) = match self.topology {
            Topology::Cartesian => return false,
            Topology::ShiftedCartesian { axis, parity } | Topology::Hex { axis, parity } => {
                (axis, parity)
            }
        };
        let line = match axis {
            ShiftAxis::Row => c.y,
            ShiftAxis::Column => c.x,
        };
        match parity {
            Parity::Odd => line % 2 == 1,
            Parity::Even => line % 2 == 0,
        }
    }

    pub fn north(&self, c: Coord) -> Option<Coord> {
        self.in_bounds(i64::from(c.x), i64::from(c.y) - 1, c.z)
    }

    pub fn east(&self, c: Coord) -> Option<Coord> {
        self.in_bounds(i64::from(c.x) + 1, i64::from(c.y), c.z)
    }

    pub fn south(&self, c: Coord) -> Option<Coord> {
        self.in_bounds(i64::from(c.x), i64::from(c.y) + 1, c.z)
    }

    pub fn west(&self, c: Coord) -> Option<Coord> {
        self.in_bounds(i64::from(c.x) - 1, i64::from(c.y), c.z)
    }

    /// The diagonal neighbors of `c`. Only defined on shifted and hexagonal
    /// arrangements; Cartesian layouts return `None`.
    pub fn north_east(&self, c: Coord) -> Option<Coord> {
        self.diagonal(c, 1, false)
    }

    pub fn south_east(&self, c: Coord) -> Option<Coord> {
        self.diagonal(c, 1, true)
    }

    pub fn south_west(&self, c: Coord) -> Option<Coord> {
        self.diagonal(c, -1, true)
    }

    pub fn north_west(&self, c: Coord) -> Option<Coord> {
        self.diagonal(c, -1, false)
    }

    /// Offset-coordinate diagonal lookup. `side` is the cross-axis step
    /// (+1 east/south of the shift axis, -1 west/north); `forward` selects
    /// the diagonal further along the shift direction.
    fn diagonal(&self, c: Coord, side: i64, forward: bool) -> Option<Coord> {
        let axis = match self.topology {
            Topology::Cartesian => return None,
            Topology::ShiftedCartesian { axis, .. } | Topology::Hex { axis, .. } => axis,
        };
        let shifted = self.is_shifted(c);
        let (x, y) = (i64::from(c.x), i64::from(c.y));
        match axis {
            // columns shifted downwards: diagonals live in the adjacent columns
            ShiftAxis::Column => {
                let dy = match (shifted, forward) {
                    (true, true) => 1,
                    (true, false) => 0,
                    (false, true) => 0,
                    (false, false) => -1,
                };
                self.in_bounds(x + side, y + dy, c.z)
            }
            // rows shifted to the east: diagonals live in the adjacent rows
            ShiftAxis::Row => {
                let dx = match (shifted, forward) {
                    (true, true) => 1,
                    (true, false) => 0,
                    (false, true) => 0,
                    (false, false) => -1,
                };
                self.in_bounds(x + dx, y + side, c.z)
            }
        }
    }

    /// All ground-layer neighbors of `c`, regardless of clocking.
    pub fn surrounding(&self, c: Coord) -> Vec<Coord> {
        let c = c.below();
        let mut n = Vec::with_capacity(6);
        match self.topology {
            Topology::Cartesian => {
                for cand in [self.north(c), self.east(c), self.south(c), self.west(c)] {
                    if let Some(cand) = cand {
                        n.push(cand);
                    }
                }
            }
            Topology::ShiftedCartesian { axis, .. } | Topology::Hex { axis, .. } => {
                let straight = match axis {
                    ShiftAxis::Column => [self.north(c), self.south(c)],
                    ShiftAxis::Row => [self.east(c), self.west(c)],
                };
                for cand in straight
                    .into_iter()
                    .chain([
                        self.north_east(c),
                        self.south_east(c),
                        self.south_west(c),
                        self.north_west(c),
                    ])
                    .flatten()
                {
                    n.push(cand);
                }
            }
        }
        n
    }

    /// `true` iff `a` and `b` are ground-adjacent under the topology.
    pub fn is_adjacent(&self, a: Coord, b: Coord) -> bool {
        self.surrounding(a).contains(&b.below())
    }

    /// The bearing from `a` towards an adjacent coordinate `b`, or `None`
    /// if the two are not ground-adjacent.
    pub fn bearing(&self, a: Coord, b: Coord) -> Option<Direction> {
        let (a, b) = (a.below(), b.below());
        if !self.topology.is_cartesian() {
            if self.north_east(a) == Some(b) {
                return Some(Direction::NorthEast);
            }
            if self.south_east(a) == Some(b) {
                return Some(Direction::SouthEast);
            }
            if self.south_west(a) == Some(b) {
                return Some(Direction::SouthWest);
            }
            if self.north_west(a) == Some(b) {
                return Some(Direction::NorthWest);
            }
        }
        if self.north(a) == Some(b) {
            return Some(Direction::North);
        }
        if self.south(a) == Some(b) {
            return Some(Direction::South);
        }
        if self.east(a) == Some(b) && self.is_adjacent(a, b) {
            return Some(Direction::East);
        }
        if self.west(a) == Some(b) && self.is_adjacent(a, b) {
            return Some(Direction::West);
        }
        None
    }

    // --- clocking ---------------------------------------------------------

    pub fn scheme(&self) -> &ClockingScheme {
        &self.scheme
    }

    #[inline]
    pub fn num_phases(&self) -> u8 {
        self.scheme.num_phases()
    }

    #[inline]
    pub fn phase(&self, c: Coord) -> u8 {
        self.scheme.phase(c)
    }

    #[inline]
    pub fn is_regularly_clocked(&self) -> bool {
        self.scheme.is_regular()
    }

    /// Assigns a clock phase in an open scheme.
    pub fn assign_phase(&mut self, c: Coord, phase: u8) {
        self.scheme.assign_phase(c, phase);
    }

    /// `true` iff data may flow from `a` to its neighbor `b`.
    pub fn is_outgoing_clocked(&self, a: Coord, b: Coord) -> bool {
        self.is_adjacent(a, b)
            && (self.phase(b) + self.num_phases() - self.phase(a)) % self.num_phases() == 1
    }

    /// `true` iff data may flow from the neighbor `b` into `a`.
    pub fn is_incoming_clocked(&self, a: Coord, b: Coord) -> bool {
        self.is_outgoing_clocked(b, a)
    }

    /// Ground neighbors of `a` that are one clock phase ahead.
    pub fn outgoing_clocked(&self, a: Coord) -> Vec<Coord> {
        let n = self.num_phases();
        let pa = self.phase(a);
        self.surrounding(a)
            .into_iter()
            .filter(|&b| (self.phase(b) + n - pa) % n == 1)
            .collect()
    }

    /// Ground neighbors of `a` that are one clock phase behind.
    pub fn incoming_clocked(&self, a: Coord) -> Vec<Coord> {
        let n = self.num_phases();
        let pa = self.phase(a);
        self.surrounding(a)
            .into_iter()
            .filter(|&b| (pa + n - self.phase(b)) % n == 1)
            .collect()
    }

    /// The number of clocking successors of `a`.
    pub fn out_degree(&self, a: Coord) -> usize {
        self.outgoing_clocked(a).len()
    }

    /// The number of clocking predecessors of `a`.
    pub fn in_degree(&self, a: Coord) -> usize {
        self.incoming_clocked(a).len()
    }

    // --- gate storage -----------------------------------------------------

    /// Places a gate at `c`.
    pub fn assign_gate(&mut self, c: Coord, op: Operation, id: u32, name: Option<String>) {
        self.tiles.insert(c, Tile::new(op, id, name));
    }

    /// Places a wire segment at `c`.
    pub fn assign_wire(&mut self, c: Coord, id: u32) {
        self.tiles.insert(c, Tile::new(Operation::Wire, id, None));
    }

    /// Removes whatever occupies `c`.
    pub fn clear_tile(&mut self, c: Coord) {
        self.tiles.shift_remove(&c);
    }

    pub fn tile(&self, c: Coord) -> Option<&Tile> {
        self.tiles.get(&c)
    }

    pub fn tile_mut(&mut self, c: Coord) -> Option<&mut Tile> {
        self.tiles.get_mut(&c)
    }

    /// All occupied coordinates with their tiles, in insertion order.
    pub fn tiles(&self) -> impl Iterator<Item = (Coord, &Tile)> + '_ {
        self.tiles.iter().map(|(&c, t)| (c, t))
    }

    /// The number of occupied tiles.
    pub fn num_tiles(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty_tile(&self, c: Coord) -> bool {
        !self.tiles.contains_key(&c)
    }

    #[inline]
    pub fn is_occupied(&self, c: Coord) -> bool {
        self.tiles.contains_key(&c)
    }

    pub fn operation_at(&self, c: Coord) -> Option<Operation> {
        self.tiles.get(&c).map(|t| t.op)
    }

    pub fn is_pi_tile(&self, c: Coord) -> bool {
        self.operation_at(c) == Some(Operation::Pi)
    }

    pub fn is_po_tile(&self, c: Coord) -> bool {
        self.operation_at(c) == Some(Operation::Po)
    }

    pub fn is_and(&self, c: Coord) -> bool {
        self.operation_at(c) == Some(Operation::And)
    }

    pub fn is_or(&self, c: Coord) -> bool {
        self.operation_at(c) == Some(Operation::Or)
    }

    pub fn is_inv(&self, c: Coord) -> bool {
        self.operation_at(c) == Some(Operation::Not)
    }

    pub fn is_maj(&self, c: Coord) -> bool {
        self.operation_at(c) == Some(Operation::Maj)
    }

    pub fn is_fanout(&self, c: Coord) -> bool {
        self.operation_at(c) == Some(Operation::Fanout)
    }

    pub fn is_wire_tile(&self, c: Coord) -> bool {
        self.operation_at(c) == Some(Operation::Wire)
    }

    /// `true` iff a second wire runs above the ground tile at `c`.
    pub fn is_crossing(&self, c: Coord) -> bool {
        self.is_occupied(c.above()) && self.is_occupied(c.below())
    }

    /// The name of the gate at `c`, if any.
    pub fn gate_name(&self, c: Coord) -> Option<&str> {
        self.tiles.get(&c).and_then(|t| t.name.as_deref())
    }

    /// Records that the tile at `c` is fed from `from`.
    pub fn add_incoming(&mut self, c: Coord, from: Coord) {
        if let Some(t) = self.tiles.get_mut(&c) {
            if !t.incoming.contains(&from) {
                t.incoming.push(from);
            }
        }
    }

    /// Records that the tile at `c` feeds `to`.
    pub fn add_outgoing(&mut self, c: Coord, to: Coord) {
        if let Some(t) = self.tiles.get_mut(&c) {
            if !t.outgoing.contains(&to) {
                t.outgoing.push(to);
            }
        }
    }

    /// The bearings from which the tile at `c` receives data.
    pub fn incoming_directions(&self, c: Coord) -> Vec<Direction> {
        self.tiles
            .get(&c)
            .map(|t| {
                t.incoming
                    .iter()
                    .filter_map(|&from| self.bearing(c, from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The bearings towards which the tile at `c` sends data.
    pub fn outgoing_directions(&self, c: Coord) -> Vec<Direction> {
        self.tiles
            .get(&c)
            .map(|t| {
                t.outgoing
                    .iter()
                    .filter_map(|&to| self.bearing(c, to))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sets the artificial latch delay (in whole clock cycles) at `c`.
    pub fn assign_latch(&mut self, c: Coord, delay: u32) {
        if let Some(t) = self.tiles.get_mut(&c) {
            t.latch = delay;
        }
    }

    /// The artificial latch delay at `c`; 0 for unlatched and empty tiles.
    pub fn latch_delay(&self, c: Coord) -> u32 {
        self.tiles.get(&c).map(|t| t.latch).unwrap_or(0)
    }
}
