use nanoplace::algo::{
    determine_vertex_coloring, verify_coloring, ColoringEngine, ColoringParams,
    EdgeIntersectionGraph,
};
use nanoplace::CoordPath;

fn graph_with_edges(n: usize, edges: &[(usize, usize)]) -> EdgeIntersectionGraph {
    let mut g = EdgeIntersectionGraph::new();
    for _ in 0..n {
        g.add_vertex(CoordPath::new());
    }
    for &(a, b) in edges {
        g.add_edge(a, b);
    }
    g
}

fn cycle(n: usize) -> EdgeIntersectionGraph {
    let edges: Vec<(usize, usize)> = (0..n).map(|i| (i, (i + 1) % n)).collect();
    graph_with_edges(n, &edges)
}

fn bipartite() -> EdgeIntersectionGraph {
    graph_with_edges(
        12,
        &[
            (0, 1),
            (0, 6),
            (0, 11),
            (1, 3),
            (1, 7),
            (1, 10),
            (2, 3),
            (2, 10),
            (3, 11),
            (4, 5),
            (4, 9),
            (5, 8),
            (5, 11),
            (6, 7),
            (6, 9),
            (6, 10),
            (7, 8),
            (8, 9),
            (8, 10),
        ],
    )
}

#[test]
fn dsatur_colors_an_even_cycle_with_two_colors() {
    let g = cycle(6);
    let params = ColoringParams {
        engine: ColoringEngine::Dsatur,
        verify_coloring_after_computation: true,
        ..Default::default()
    };
    let (coloring, stats) = determine_vertex_coloring(&g, &params);

    assert_eq!(stats.chromatic_number, 2);
    assert_eq!(coloring.len(), 6);
    assert_eq!(stats.coloring_verified, Some(true));
}

#[test]
fn dsatur_colors_a_bipartite_graph_with_two_colors() {
    let g = bipartite();
    let params = ColoringParams {
        engine: ColoringEngine::Dsatur,
        verify_coloring_after_computation: true,
        ..Default::default()
    };
    let (_, stats) = determine_vertex_coloring(&g, &params);

    assert_eq!(stats.chromatic_number, 2);
    assert_eq!(stats.coloring_verified, Some(true));
}

#[test]
fn mcs_is_sound_on_odd_cycles() {
    let g = cycle(5);
    let params = ColoringParams {
        engine: ColoringEngine::Mcs,
        verify_coloring_after_computation: true,
        ..Default::default()
    };
    let (coloring, stats) = determine_vertex_coloring(&g, &params);

    assert!(stats.chromatic_number >= 3);
    assert!(verify_coloring(&g, &coloring));
}

#[test]
fn lmxrlf_is_reproducible_for_a_fixed_seed() {
    let g = bipartite();
    let run = |seed| {
        let params = ColoringParams {
            engine: ColoringEngine::Lmxrlf,
            seed,
            ..Default::default()
        };
        determine_vertex_coloring(&g, &params).0
    };

    assert_eq!(run(7), run(7));
    for coloring in [run(7), run(8)] {
        assert!(verify_coloring(&g, &coloring));
    }
}

#[test]
fn tabucol_finds_a_three_coloring_of_an_odd_cycle() {
    let g = cycle(5);
    let params = ColoringParams {
        engine: ColoringEngine::Tabucol,
        k_color_value: 3,
        seed: 1,
        verify_coloring_after_computation: true,
        ..Default::default()
    };
    let (coloring, stats) = determine_vertex_coloring(&g, &params);

    assert_eq!(stats.coloring_verified, Some(true));
    assert!(coloring.values().all(|&c| c < 3));
}

#[test]
fn sat_matches_the_known_chromatic_numbers() {
    for (graph, chromatic) in [
        (cycle(6), 2),
        (cycle(5), 3),
        (bipartite(), 2),
        (graph_with_edges(4, &[(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]), 4),
    ] {
        let params = ColoringParams {
            engine: ColoringEngine::Sat,
            verify_coloring_after_computation: true,
            ..Default::default()
        };
        let (_, stats) = determine_vertex_coloring(&graph, &params);
        assert_eq!(stats.chromatic_number, chromatic);
        assert_eq!(stats.coloring_verified, Some(true));
    }
}
