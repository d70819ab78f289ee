//! Exact placement & routing through incremental SMT solving.
//!
//! Starting from a lower bound equal to the number of network vertices,
//! every possible layout dimension is examined in factorization order and
//! tested for realizability with an SMT solver. Solver states are kept in
//! a tree keyed by dimension so that growing a layout eastwards or
//! southwards reuses learned clauses; constraints that referenced the old
//! border are deactivated through assumption literals instead of solver
//! restarts.
//!
//! Multiple worker threads can explore dimensions in parallel. Each worker
//! owns its solver context; a worker that finds a satisfiable dimension
//! cooperatively cancels all workers exploring strictly larger dimensions,
//! while workers on smaller dimensions are allowed to finish, since a
//! satisfiable smaller dimension supersedes.

mod smt;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::algo::hierarchy::NetworkHierarchy;
use crate::clocking::ClockingScheme;
use crate::error::ExactError;
use crate::layout::{Layout, Topology};
use crate::network::{LogicNetwork, Operation};

use smt::{CheckOutcome, PlacementView, SmtHandler};

/// Configuration of the exact placement & routing engine.
#[derive(Clone, Debug)]
pub struct ExactParams {
    /// Maximum number of tiles to examine.
    pub upper_bound: usize,
    /// If non-zero, only dimensions with exactly this many tiles are
    /// examined.
    pub fixed_size: usize,
    /// Create a vertically shifted layout.
    pub vertical_offset: bool,
    /// Allow wire crossings.
    pub crossings: bool,
    /// Maximum number of crossing tiles. 0 leaves the count unbounded.
    pub crossings_limit: usize,
    /// Maximum number of wire tiles per network edge. 0 leaves the count
    /// unbounded.
    pub wire_limit: usize,
    /// Minimize the number of wire tiles after the first satisfiable
    /// dimension.
    pub minimize_wires: bool,
    /// Minimize the number of crossing tiles after the first satisfiable
    /// dimension.
    pub minimize_crossings: bool,
    /// Route designated I/O pins.
    pub io_ports: bool,
    /// Force primary inputs and outputs onto the layout borders.
    pub border_io: bool,
    /// Allow a discrepancy in fan-in path lengths (disables global
    /// synchronization).
    pub desynchronize: bool,
    /// Use artificial clock latches to balance fan-in paths.
    pub artificial_latches: bool,
    /// Only use straight inverters (instead of bent ones).
    pub straight_inverters: bool,
    /// The clocking scheme to lay out under.
    pub scheme: ClockingScheme,
    /// The tile arrangement of the layout.
    pub topology: Topology,
    /// Global time budget.
    pub timeout: Duration,
    /// Number of worker threads to explore dimensions with.
    pub num_threads: usize,
}

impl Default for ExactParams {
    fn default() -> Self {
        ExactParams {
            upper_bound: usize::MAX,
            fixed_size: 0,
            vertical_offset: false,
            crossings: false,
            crossings_limit: 0,
            wire_limit: 0,
            minimize_wires: false,
            minimize_crossings: false,
            io_ports: true,
            border_io: false,
            desynchronize: false,
            artificial_latches: false,
            straight_inverters: false,
            scheme: ClockingScheme::twoddwave(4),
            topology: Topology::Cartesian,
            timeout: Duration::from_millis(u32::MAX as u64),
            num_threads: 1,
        }
    }
}

impl ExactParams {
    /// `true` iff the configured scheme is a ToPoliNano clocking.
    pub(crate) fn is_topolinano(&self) -> bool {
        self.scheme.name().starts_with("ToPoliNano")
    }

    /// `true` iff the configured scheme is a 2DDWave clocking.
    pub(crate) fn is_twoddwave(&self) -> bool {
        self.scheme.name().starts_with("2DDWave")
    }
}

/// Statistics of an exact physical design run.
#[derive(Clone, Debug, Default)]
pub struct ExactStats {
    /// Wall-clock time of the whole run.
    pub runtime: Duration,
    /// The dimension (in tiles per direction) of the found layout.
    pub dimension: Option<(u32, u32)>,
    /// How many dimensions were examined.
    pub num_dimensions_examined: usize,
}

/// A dimension in tiles per direction, e.g. `(3, 2)` for a `3 × 2` layout.
type Dimension = (u32, u32);

/// Iterates over candidate dimensions in factorization order: for each
/// tile count, all `(x, y)` factor pairs in ascending `x`.
struct DimensionIterator {
    current_size: usize,
    upper_bound: usize,
    fixed_size: bool,
    pending: Vec<Dimension>,
}

impl DimensionIterator {
    fn new(lower_bound: usize, upper_bound: usize, fixed_size: usize) -> Self {
        let (start, fixed) = if fixed_size > 0 {
            (fixed_size, true)
        } else {
            (lower_bound.max(1), false)
        };
        DimensionIterator {
            current_size: start,
            upper_bound: if fixed { start } else { upper_bound },
            fixed_size: fixed,
            pending: Vec::new(),
        }
    }

    fn factorize(n: usize) -> Vec<Dimension> {
        let mut factors = Vec::new();
        for x in 1..=n {
            if n % x == 0 {
                factors.push((x as u32, (n / x) as u32));
            }
        }
        factors
    }
}

impl Iterator for DimensionIterator {
    type Item = Dimension;

    fn next(&mut self) -> Option<Dimension> {
        loop {
            if let Some(dim) = self.pending.first().copied() {
                self.pending.remove(0);
                return Some(dim);
            }
            if self.current_size > self.upper_bound {
                return None;
            }
            self.pending = Self::factorize(self.current_size);
            self.current_size += 1;
            if self.fixed_size {
                self.upper_bound = self.current_size - 1;
            }
        }
    }
}

/// Shared exploration state of the worker threads.
struct Exploration {
    dimensions: Mutex<DimensionIterator>,
    /// The smallest satisfiable dimension found so far, with its layout.
    result: Mutex<Option<(Dimension, Layout)>>,
    timed_out: Mutex<Option<Dimension>>,
    examined: AtomicUsize,
    deadline: Instant,
}

impl Exploration {
    /// `true` iff exploring `dim` is already pointless because a result at
    /// most as large exists.
    fn superseded(&self, dim: Dimension) -> bool {
        lock(&self.result)
            .as_ref()
            .map(|((x, y), _)| area(*x, *y) <= area(dim.0, dim.1))
            .unwrap_or(false)
    }

    fn offer(&self, dim: Dimension, layout: Layout) {
        let mut result = lock(&self.result);
        let better = result
            .as_ref()
            .map(|((x, y), _)| area(dim.0, dim.1) < area(*x, *y))
            .unwrap_or(true);
        if better {
            *result = Some((dim, layout));
        }
    }

    fn record_timeout(&self, dim: Dimension) {
        lock(&self.timed_out).get_or_insert(dim);
    }
}

/// Mutex access that shrugs off poisoning; the guarded state stays
/// consistent even if another worker panicked.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn area(x: u32, y: u32) -> u64 {
    u64::from(x) * u64::from(y)
}

/// Determines a minimal-size placement and routing of `network` under the
/// given configuration.
///
/// # Errors
///
/// - [`ExactError::Config`] for contradictory configurations (e.g. MAJ
///   gates under a clocking scheme that cannot serve three inputs).
/// - [`ExactError::Unsatisfiable`] when no dimension within the upper
///   bound admits a placement.
/// - [`ExactError::TimeoutExceeded`] when the time budget runs out; the
///   layout is never touched in that case.
/// - [`ExactError::SolverError`] when the backend fails.
pub fn exact(network: &LogicNetwork, params: &ExactParams) -> Result<Layout, ExactError> {
    exact_with_stats(network, params).map(|(layout, _)| layout)
}

/// Like [`exact`], but also returns run statistics.
pub fn exact_with_stats(
    network: &LogicNetwork,
    params: &ExactParams,
) -> Result<(Layout, ExactStats), ExactError> {
    let start = Instant::now();

    if network.operation_count(Operation::Maj) > 0 && !params.scheme.allows_majority_gates() {
        return Err(ExactError::Config(
            "the configured clocking scheme cannot serve three-input majority gates".into(),
        ));
    }
    if params.num_threads == 0 {
        return Err(ExactError::Config("num_threads must be at least 1".into()));
    }

    // explicit fan-outs keep vertex degrees within tile degrees
    let mut prepared = network.clone();
    prepared.substitute_fanouts();

    let mut hierarchy = NetworkHierarchy::new(&prepared);
    hierarchy.unify_output_ranks(&prepared);
    hierarchy.unify_inv_input_ranks(&prepared);

    let view = PlacementView::new(&prepared, params.io_ports);
    let lower_bound = view.num_vertices().max(1);

    let exploration = Exploration {
        dimensions: Mutex::new(DimensionIterator::new(
            lower_bound,
            params.upper_bound,
            params.fixed_size,
        )),
        result: Mutex::new(None),
        timed_out: Mutex::new(None),
        examined: AtomicUsize::new(0),
        deadline: start + params.timeout,
    };

    let mut worker_error: Option<ExactError> = None;

    if params.num_threads == 1 {
        worker_error = explore(&exploration, &view, &hierarchy, params).err();
    } else {
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..params.num_threads)
                .map(|_| scope.spawn(|| explore(&exploration, &view, &hierarchy, params)))
                .collect();
            for handle in handles {
                if let Err(e) = handle.join().unwrap_or(Ok(())) {
                    worker_error.get_or_insert(e);
                }
            }
        });
    }

    let stats = ExactStats {
        runtime: start.elapsed(),
        dimension: lock(&exploration.result).as_ref().map(|(d, _)| *d),
        num_dimensions_examined: exploration.examined.load(Ordering::Relaxed),
    };

    let result = lock(&exploration.result).take();

    match result {
        Some((dim, layout)) => {
            info!(x = dim.0, y = dim.1, "found satisfiable dimension");
            Ok((layout, stats))
        }
        None => {
            if let Some(e) = worker_error {
                return Err(e);
            }
            if let Some((x, y)) = *lock(&exploration.timed_out) {
                return Err(ExactError::TimeoutExceeded(x, y));
            }
            Err(ExactError::Unsatisfiable)
        }
    }
}

/// Worker loop: pull dimensions from the shared iterator and test them
/// with an own solver context until the search space is exhausted, the
/// deadline passes, or a result supersedes the remaining work.
fn explore(
    exploration: &Exploration,
    view: &PlacementView<'_>,
    hierarchy: &NetworkHierarchy,
    params: &ExactParams,
) -> Result<(), ExactError> {
    let ctx_config = z3::Config::new();
    let ctx = z3::Context::new(&ctx_config);
    let mut handler = SmtHandler::new(&ctx, view, hierarchy, params);

    loop {
        // cooperative cancellation point between dimensions
        let dim = lock(&exploration.dimensions).next();
        let Some(dim) = dim else {
            return Ok(());
        };

        if exploration.superseded(dim) {
            return Ok(());
        }
        if handler.skippable(dim) {
            continue;
        }

        let remaining = exploration
            .deadline
            .saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            exploration.record_timeout(dim);
            return Ok(());
        }

        exploration.examined.fetch_add(1, Ordering::Relaxed);
        debug!(x = dim.0, y = dim.1, "examining layout dimension");

        handler.update(dim);
        handler.set_timeout(remaining);

        match handler.is_satisfiable() {
            Ok(CheckOutcome::Sat(layout)) => {
                exploration.offer(dim, layout);
                // keep looping: strictly smaller dimensions may still be
                // pending and would supersede this result
            }
            Ok(CheckOutcome::Unsat) => {
                // solver state is preserved for reuse by larger dimensions
            }
            Ok(CheckOutcome::Timeout) => {
                exploration.record_timeout(dim);
                return Ok(());
            }
            Err(message) => {
                return Err(ExactError::SolverError {
                    dim_x: dim.0,
                    dim_y: dim.1,
                    message,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_iterator_ascends_by_tile_count() {
        let dims: Vec<_> = DimensionIterator::new(4, 6, 0).collect();
        assert_eq!(
            dims,
            vec![
                (1, 4),
                (2, 2),
                (4, 1),
                (1, 5),
                (5, 1),
                (1, 6),
                (2, 3),
                (3, 2),
                (6, 1)
            ]
        );
    }

    #[test]
    fn fixed_size_restricts_to_one_tile_count() {
        let dims: Vec<_> = DimensionIterator::new(2, 100, 6).collect();
        assert_eq!(dims, vec![(1, 6), (2, 3), (3, 2), (6, 1)]);
    }
}
