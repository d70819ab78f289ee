//! **nanoplace** is a physical-design library for Field-Coupled
//! Nanocomputing (FCN).
//!
//! FCN circuits are laid out on planar grids of tiles that obey a clocking
//! discipline: information may only flow from a tile in clock phase *n* to a
//! tile in phase *n + 1 (mod N)*. This crate provides the physical-design
//! core for such grids:
//!
//! - [`Layout`]: a clocked, gate-level grid layout over Cartesian, shifted
//!   Cartesian, or hexagonal tile arrangements, together with the named
//!   clocking schemes of the literature ([`clocking`]).
//! - [`ObstructionLayout`](obstruction::ObstructionLayout): an overlay that
//!   marks coordinates and connections as blocked.
//! - Path finding that respects clocking and obstructions: [`algo::a_star`],
//!   [`algo::jump_point_search`], [`algo::enumerate_all_paths`], and
//!   [`algo::yen_k_shortest_paths`].
//! - Multi-path signal routing by coloring edge-intersection graphs of
//!   enumerated paths: [`algo::color_routing`].
//! - Exact placement & routing through incremental SMT solving over growing
//!   layout dimensions: [`exact::exact`] (enabled by the `exact` feature).
//! - FGL file I/O for persisting gate-level layouts: [`io::read_fgl_layout`]
//!   and [`io::write_fgl_layout`].

pub mod algo;
pub mod clocking;
pub mod coords;
mod error;
#[cfg(feature = "exact")]
pub mod exact;
pub mod io;
pub mod layout;
pub mod network;
pub mod obstruction;
pub mod path;
mod scored;

pub use clocking::ClockingScheme;
pub use coords::{AspectRatio, Coord};
pub use error::{FglError, RoutingError};
#[cfg(feature = "exact")]
pub use error::ExactError;
pub use layout::{Layout, Topology};
pub use network::{LogicNetwork, Operation};
pub use obstruction::ObstructionLayout;
pub use path::{CoordPath, PathCollection, RoutingObjective};

/// Cardinal and intercardinal bearings between adjacent tiles.
///
/// Cartesian layouts only ever produce the four cardinal directions;
/// vertically shifted and hexagonal layouts additionally use the diagonals.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    /// The bearing pointing the opposite way.
    #[inline]
    pub fn opposite(&self) -> Direction {
        match *self {
            Direction::North => Direction::South,
            Direction::NorthEast => Direction::SouthWest,
            Direction::East => Direction::West,
            Direction::SouthEast => Direction::NorthWest,
            Direction::South => Direction::North,
            Direction::SouthWest => Direction::NorthEast,
            Direction::West => Direction::East,
            Direction::NorthWest => Direction::SouthEast,
        }
    }

    /// `true` iff this bearing runs along the east-west axis.
    #[inline]
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Direction::East | Direction::West)
    }

    /// `true` iff this bearing runs along the north-south axis.
    #[inline]
    pub fn is_vertical(&self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }
}
