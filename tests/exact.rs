#![cfg(feature = "exact")]

use std::time::{Duration, Instant};

use nanoplace::exact::{exact, exact_with_stats, ExactParams};
use nanoplace::{ClockingScheme, ExactError, LogicNetwork, Operation, Topology};

fn and_network() -> LogicNetwork {
    let mut ntk = LogicNetwork::new();
    let a = ntk.create_pi("a");
    let b = ntk.create_pi("b");
    let g = ntk.create_and(a, b);
    ntk.create_po(g, "f");
    ntk
}

fn small_params() -> ExactParams {
    ExactParams {
        upper_bound: 12,
        scheme: ClockingScheme::twoddwave(3),
        topology: Topology::Cartesian,
        border_io: true,
        desynchronize: true,
        timeout: Duration::from_secs(120),
        ..Default::default()
    }
}

#[test]
fn places_and_routes_a_single_and_gate() {
    let ntk = and_network();
    let (layout, stats) = exact_with_stats(&ntk, &small_params()).unwrap();

    let (w, h) = stats.dimension.expect("a dimension was found");
    assert!(w as u64 * h as u64 <= 12);

    // all four vertices were placed
    let and_tile = layout
        .tiles()
        .find(|(_, t)| t.op == Operation::And)
        .map(|(c, _)| c)
        .expect("AND gate is placed");
    let pis = layout.tiles().filter(|(_, t)| t.op == Operation::Pi).count();
    let pos = layout.tiles().filter(|(_, t)| t.op == Operation::Po).count();
    assert_eq!(pis, 2);
    assert_eq!(pos, 1);

    // the AND gate has exactly two committed incoming connections
    assert_eq!(layout.tile(and_tile).unwrap().incoming.len(), 2);

    // border I/O
    for (c, t) in layout.tiles() {
        if matches!(t.op, Operation::Pi | Operation::Po) {
            assert!(layout.is_border(c), "I/O gate at {c} is not on the border");
        }
    }
}

#[test]
fn found_dimensions_are_minimal() {
    // if a dimension is satisfiable, the engine must not have skipped a
    // smaller satisfiable one: re-running with the found size as a fixed
    // bound reproduces a result, and every smaller tile count is UNSAT
    let ntk = and_network();
    let (_, stats) = exact_with_stats(&ntk, &small_params()).unwrap();
    let (w, h) = stats.dimension.expect("a dimension was found");
    let found_area = w as usize * h as usize;

    for smaller in 4..found_area {
        let params = ExactParams {
            fixed_size: smaller,
            ..small_params()
        };
        assert!(
            matches!(exact(&ntk, &params), Err(ExactError::Unsatisfiable)),
            "tile count {smaller} should be unsatisfiable"
        );
    }
}

#[test]
fn majority_gates_require_a_suitable_scheme() {
    let mut ntk = LogicNetwork::new();
    let a = ntk.create_pi("a");
    let b = ntk.create_pi("b");
    let c = ntk.create_pi("c");
    let m = ntk.create_maj(a, b, c);
    ntk.create_po(m, "f");

    let result = exact(&ntk, &small_params());
    assert!(matches!(result, Err(ExactError::Config(_))));
}

#[test]
fn timeout_is_respected_and_nothing_is_committed() {
    // a budget far below what a 100-tile instance needs; several workers
    let mut ntk = LogicNetwork::new();
    let a = ntk.create_pi("a");
    let b = ntk.create_pi("b");
    let c = ntk.create_pi("c");
    let ab = ntk.create_and(a, b);
    let bc = ntk.create_or(b, c);
    let e = ntk.create_and(ab, bc);
    ntk.create_po(e, "f");

    let params = ExactParams {
        upper_bound: 100,
        fixed_size: 100,
        scheme: ClockingScheme::twoddwave(3),
        topology: Topology::Cartesian,
        crossings: true,
        timeout: Duration::from_millis(1),
        num_threads: 4,
        ..Default::default()
    };

    let start = Instant::now();
    let result = exact(&ntk, &params);
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(ExactError::TimeoutExceeded(_, _))));
    // all workers return within a small constant of the deadline
    assert!(elapsed < Duration::from_secs(30));
}

#[test]
fn unsatisfiable_within_bounds_is_reported() {
    let ntk = and_network();
    let params = ExactParams {
        upper_bound: 3,
        ..small_params()
    };
    assert!(matches!(exact(&ntk, &params), Err(ExactError::Unsatisfiable)));
}
