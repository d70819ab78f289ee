use nanoplace::algo::{
    color_routing, determine_vertex_coloring, generate_edge_intersection_graph, verify_coloring,
    ColorRoutingParams, ColoringEngine, ColoringParams, EpgParams,
};
use nanoplace::{
    ClockingScheme, Coord, Layout, RoutingError, RoutingObjective, Topology,
};

fn grid(x: u32, y: u32) -> Layout {
    Layout::new((x, y, 1), ClockingScheme::twoddwave(3), Topology::Cartesian)
}

/// Two straight objectives whose only paths share the center tile.
fn crossing_objectives() -> [RoutingObjective; 2] {
    [
        RoutingObjective::new((1, 0), (1, 2)),
        RoutingObjective::new((0, 1), (2, 1)),
    ]
}

#[test]
fn epg_vertices_conflict_iff_paths_conflict() {
    let lyt = grid(2, 2);
    let objectives = [
        RoutingObjective::new((0, 0), (2, 2)),
        RoutingObjective::new((1, 0), (1, 2)),
    ];

    let (graph, stats) =
        generate_edge_intersection_graph(&lyt, &objectives, EpgParams::default()).unwrap();

    // 6 paths for the first objective, 1 for the second
    assert_eq!(stats.num_vertices, 7);
    assert_eq!(stats.cliques.len(), 2);

    for a in graph.vertices() {
        for b in graph.vertices() {
            if a == b {
                continue;
            }
            let (pa, pb) = (graph.path(a), graph.path(b));
            let same_objective = pa.source() == pb.source() && pa.target() == pb.target();
            let share_interior = pa
                .iter()
                .skip(1)
                .take(pa.len().saturating_sub(2))
                .any(|c| pb.contains(*c))
                || pb
                    .iter()
                    .skip(1)
                    .take(pb.len().saturating_sub(2))
                    .any(|c| pa.contains(*c));
            assert_eq!(graph.has_edge(a, b), same_objective || share_interior);
        }
    }
}

#[test]
fn colorings_of_generated_graphs_are_sound() {
    let lyt = grid(3, 3);
    let objectives = [
        RoutingObjective::new((0, 0), (3, 3)),
        RoutingObjective::new((1, 0), (1, 3)),
        RoutingObjective::new((0, 2), (3, 2)),
    ];
    let (graph, stats) = generate_edge_intersection_graph(
        &lyt,
        &objectives,
        EpgParams {
            crossings: false,
            path_limit: Some(5),
        },
    )
    .unwrap();

    for engine in [
        ColoringEngine::Mcs,
        ColoringEngine::Dsatur,
        ColoringEngine::Lmxrlf,
        ColoringEngine::Sat,
    ] {
        let params = ColoringParams {
            engine,
            cliques: stats.cliques.clone(),
            seed: 42,
            ..Default::default()
        };
        let (coloring, _) = determine_vertex_coloring(&graph, &params);
        assert!(verify_coloring(&graph, &coloring), "{engine:?}");
    }
}

#[test]
fn strict_routing_fails_on_unavoidable_intersection() {
    let mut lyt = grid(2, 2);
    let before = lyt.clone();

    let result = color_routing(&mut lyt, &crossing_objectives(), &ColorRoutingParams::default());

    assert_eq!(result.unwrap_err(), RoutingError::ColoringInfeasible);
    // atomicity: the layout is untouched on the failure path
    assert_eq!(lyt, before);
}

#[test]
fn strict_routing_fails_on_unroutable_objective() {
    let mut lyt = grid(2, 2);
    let before = lyt.clone();
    // 2DDWave cannot route westwards
    let objectives = [RoutingObjective::new((2, 2), (0, 0))];

    let result = color_routing(&mut lyt, &objectives, &ColorRoutingParams::default());

    assert_eq!(
        result.unwrap_err(),
        RoutingError::UnroutableObjective(RoutingObjective::new((2, 2), (0, 0)))
    );
    assert_eq!(lyt, before);
}

#[test]
fn crossings_make_the_conflicting_pair_routable() {
    let mut lyt = grid(2, 2);

    let stats = color_routing(
        &mut lyt,
        &crossing_objectives(),
        &ColorRoutingParams {
            crossings: true,
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(stats.number_of_unsatisfied_objectives, 0);
    // both wires cross at the center tile
    assert!(lyt.is_wire_tile(Coord::new(1, 1)));
    assert!(lyt.is_crossing(Coord::new(1, 1)));
    // straight segments committed around the crossing
    assert!(lyt.is_wire_tile(Coord::new(0, 1)) || lyt.is_empty_tile(Coord::new(0, 1)));
}

#[test]
fn partial_routing_reports_the_leftovers() {
    let mut lyt = grid(2, 2);

    let stats = color_routing(
        &mut lyt,
        &crossing_objectives(),
        &ColorRoutingParams {
            conduct_partial_routing: true,
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(stats.number_of_unsatisfied_objectives, 1);
    // exactly one of the two wires was committed
    assert!(lyt.is_wire_tile(Coord::new(1, 1)));
    assert!(!lyt.is_crossing(Coord::new(1, 1)));
}

#[test]
fn non_conflicting_objectives_route_together() {
    let mut lyt = grid(3, 3);
    let objectives = [
        RoutingObjective::new((0, 0), (0, 3)),
        RoutingObjective::new((2, 0), (2, 3)),
    ];

    let stats = color_routing(&mut lyt, &objectives, &ColorRoutingParams::default()).unwrap();

    assert_eq!(stats.number_of_unsatisfied_objectives, 0);
    assert!(lyt.is_wire_tile(Coord::new(0, 1)));
    assert!(lyt.is_wire_tile(Coord::new(0, 2)));
    assert!(lyt.is_wire_tile(Coord::new(2, 1)));
    assert!(lyt.is_wire_tile(Coord::new(2, 2)));
}
