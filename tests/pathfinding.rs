use nanoplace::algo::{
    a_star, a_star_distance, enumerate_all_paths, jump_point_search, manhattan_distance,
    unit_cost, yen_k_shortest_paths, AStarParams, EnumerationParams,
};
use nanoplace::{ClockingScheme, Coord, Layout, ObstructionLayout, RoutingObjective, Topology};

fn twoddwave_grid(x: u32, y: u32) -> Layout {
    Layout::new((x, y, 1), ClockingScheme::twoddwave(3), Topology::Cartesian)
}

fn assert_valid_path(lyt: &Layout, path: &[Coord], source: Coord, target: Coord) {
    assert_eq!(*path.first().unwrap(), source);
    assert_eq!(*path.last().unwrap(), target);
    // loop-less
    for (i, a) in path.iter().enumerate() {
        for b in &path[i + 1..] {
            assert_ne!(a, b);
        }
    }
    // consecutive coordinates follow the data flow
    for w in path.windows(2) {
        assert!(
            lyt.is_outgoing_clocked(w[0], w[1]),
            "{} -> {} violates clocking",
            w[0],
            w[1]
        );
    }
}

#[test]
fn a_star_on_an_open_5x5_grid() {
    let lyt = twoddwave_grid(4, 4);
    let obs = ObstructionLayout::new(&lyt);

    let path = a_star(
        &obs,
        &RoutingObjective::new((0, 0), (4, 4)),
        manhattan_distance,
        unit_cost,
        AStarParams::default(),
    )
    .unwrap();

    assert_eq!(path.len(), 9);
    assert_valid_path(&lyt, &path, Coord::new(0, 0), Coord::new(4, 4));
}

#[test]
fn a_star_distance_matches_path_length() {
    let lyt = twoddwave_grid(4, 4);
    let obs = ObstructionLayout::new(&lyt);

    assert_eq!(
        a_star_distance(&obs, Coord::new(0, 0), Coord::new(4, 4)),
        Some(8)
    );
    assert_eq!(
        a_star_distance(&obs, Coord::new(2, 2), Coord::new(2, 2)),
        Some(0)
    );
    // 2DDWave cannot route westwards
    assert_eq!(a_star_distance(&obs, Coord::new(4, 4), Coord::new(0, 0)), None);
}

#[test]
fn a_star_is_optimal_for_admissible_heuristics() {
    // the zero heuristic turns A* into Dijkstra; both lengths must agree
    let lyt = twoddwave_grid(4, 4);
    let mut obs = ObstructionLayout::new(&lyt);
    obs.obstruct_coordinate(Coord::new(1, 1));
    obs.obstruct_coordinate(Coord::new(3, 2));

    let objective = RoutingObjective::new((0, 0), (4, 4));
    let informed = a_star(
        &obs,
        &objective,
        manhattan_distance,
        unit_cost,
        AStarParams::default(),
    )
    .unwrap();
    let dijkstra = a_star(&obs, &objective, |_, _| 0, unit_cost, AStarParams::default()).unwrap();

    assert!(!informed.is_empty());
    assert_eq!(informed.len(), dijkstra.len());
}

#[test]
fn obstructed_column_disconnects_the_grid() {
    let lyt = twoddwave_grid(4, 4);
    let mut obs = ObstructionLayout::new(&lyt);
    for y in 0..=4 {
        obs.obstruct_coordinate(Coord::new(2, y));
    }

    let objective = RoutingObjective::new((0, 0), (4, 4));
    let astar_path = a_star(
        &obs,
        &objective,
        manhattan_distance,
        unit_cost,
        AStarParams::default(),
    )
    .unwrap();
    let jps_path = jump_point_search(&obs, &objective, manhattan_distance).unwrap();

    assert!(astar_path.is_empty());
    assert!(jps_path.is_empty());
}

#[test]
fn jump_point_search_agrees_with_a_star_on_open_grids() {
    let lyt = twoddwave_grid(4, 4);
    let obs = ObstructionLayout::new(&lyt);
    let objective = RoutingObjective::new((0, 0), (4, 4));

    let astar_path = a_star(
        &obs,
        &objective,
        manhattan_distance,
        unit_cost,
        AStarParams::default(),
    )
    .unwrap();
    let jps_path = jump_point_search(&obs, &objective, manhattan_distance).unwrap();

    assert_eq!(astar_path.len(), jps_path.len());
    assert_valid_path(&lyt, &jps_path, Coord::new(0, 0), Coord::new(4, 4));
}

#[test]
fn crossings_pass_over_orthogonal_wires_only() {
    let mut lyt = twoddwave_grid(2, 2);
    // a committed vertical wire through the center
    lyt.assign_wire(Coord::new(1, 1), 0);
    lyt.add_incoming(Coord::new(1, 1), Coord::new(1, 0));
    lyt.add_outgoing(Coord::new(1, 1), Coord::new(1, 2));

    let obs = ObstructionLayout::new(&lyt);
    let objective = RoutingObjective::new((0, 1), (2, 1));

    // without crossings the wire blocks the only path
    let blocked = a_star(
        &obs,
        &objective,
        manhattan_distance,
        unit_cost,
        AStarParams::default(),
    )
    .unwrap();
    assert!(blocked.is_empty());

    // with crossings the path takes the elevated tile
    let crossed = a_star(
        &obs,
        &objective,
        manhattan_distance,
        unit_cost,
        AStarParams { crossings: true },
    )
    .unwrap();
    assert_eq!(crossed.len(), 3);
    assert_eq!(crossed[1], Coord::with_z(1, 1, 1));
}

#[test]
fn enumeration_is_exhaustive() {
    // the number of monotone lattice paths to (x, y) is the binomial
    // coefficient (x + y over x)
    let lyt = twoddwave_grid(3, 2);
    let obs = ObstructionLayout::new(&lyt);

    let paths = enumerate_all_paths(
        &obs,
        &RoutingObjective::new((0, 0), (3, 2)),
        EnumerationParams::default(),
    )
    .unwrap();

    assert_eq!(paths.len(), 10);
    for p in paths.iter() {
        assert_valid_path(&lyt, p, Coord::new(0, 0), Coord::new(3, 2));
    }
}

#[test]
fn yen_returns_k_distinct_paths_with_non_decreasing_lengths() {
    let lyt = twoddwave_grid(2, 2);
    let obs = ObstructionLayout::new(&lyt);

    let paths = yen_k_shortest_paths(
        &obs,
        &RoutingObjective::new((0, 0), (2, 2)),
        4,
        EnumerationParams::default(),
    )
    .unwrap();

    assert_eq!(paths.len(), 4);
    for w in paths.windows(2) {
        assert!(w[0].len() <= w[1].len());
        assert_ne!(w[0], w[1]);
    }
    for p in paths.iter() {
        assert_valid_path(&lyt, p, Coord::new(0, 0), Coord::new(2, 2));
    }
}
