//! Semantic error kinds surfaced by the physical-design algorithms.

use thiserror::Error;

use crate::coords::Coord;
use crate::path::RoutingObjective;

/// Errors produced by path finding and color routing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// A dead coordinate was passed to a path-finding primitive.
    #[error("dead coordinate passed to path search")]
    InvalidCoordinate,
    /// A coordinate outside the layout bounds was passed to a path-finding
    /// primitive.
    #[error("coordinate {0} lies outside the layout bounds")]
    OutOfBounds(Coord),
    /// An objective has no path under the current obstructions and crossing
    /// policy. Recovered by the color-routing orchestrator when partial
    /// routing is enabled.
    #[error("objective {0} cannot be routed")]
    UnroutableObjective(RoutingObjective),
    /// No coloring satisfies all routing objectives simultaneously.
    /// Recovered by the color-routing orchestrator when partial routing is
    /// enabled.
    #[error("no coloring satisfies all routing objectives")]
    ColoringInfeasible,
}

/// Errors produced by the exact placement & routing engine.
///
/// An UNSAT result for a single dimension is *not* an error; the engine
/// proceeds to the next dimension. Only exhausting the bounds, running out
/// of time, or a backend failure surface to the caller.
#[cfg(feature = "exact")]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExactError {
    /// No dimension within the configured upper bound admits a placement.
    #[error("no layout dimension within the upper bound is satisfiable")]
    Unsatisfiable,
    /// The global time budget was exhausted.
    #[error("time budget exhausted while examining dimension {0}x{1}")]
    TimeoutExceeded(u32, u32),
    /// The solver backend signalled a failure.
    #[error("solver backend error at dimension {dim_x}x{dim_y}: {message}")]
    SolverError {
        dim_x: u32,
        dim_y: u32,
        message: String,
    },
    /// The configuration is contradictory or unsupported.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors produced while reading FGL layout files.
#[derive(Debug, Error)]
pub enum FglError {
    /// A required element is missing or carries malformed content.
    #[error("malformed FGL input: {0}")]
    MalformedInput(String),
    /// The clocking scheme name is not recognized.
    #[error("unknown clocking scheme: {0}")]
    UnknownClocking(String),
    /// The layout topology name is not recognized.
    #[error("unknown layout topology: {0}")]
    UnknownTopology(String),
    /// The underlying XML document could not be parsed.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}
