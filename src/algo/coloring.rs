//! Vertex coloring of edge-intersection graphs.
//!
//! Offers a selection of heuristic engines (MCS, DSATUR, LMXRLF, TABUCOL)
//! and a complete SAT-based engine. The heuristics return a valid but not
//! necessarily minimum coloring; the SAT engine ascends the color count
//! linearly from the largest recorded clique size (the chromatic number is
//! bounded from below by the maximum clique size) and is therefore exact.

use fixedbitset::FixedBitSet;
use hashbrown::{HashMap, HashSet};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BinaryHeap;
use tracing::debug;
use varisat::{ExtendFormula, Lit, Solver};

use crate::algo::epg::EdgeIntersectionGraph;
use crate::scored::MaxScored;

/// The available coloring engines.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColoringEngine {
    /// Maximum cardinality search.
    Mcs,
    /// Saturation-degree ordering.
    Dsatur,
    /// Randomized independent-set peeling.
    Lmxrlf,
    /// Tabu search towards a fixed color count.
    Tabucol,
    /// Complete SAT-based search.
    Sat,
}

/// Parameters for [`determine_vertex_coloring`].
#[derive(Clone, Debug)]
pub struct ColoringParams {
    /// The engine to use.
    pub engine: ColoringEngine,
    /// The target color count for TABUCOL.
    pub k_color_value: usize,
    /// Seed for the randomized engines (LMXRLF, TABUCOL).
    pub seed: u64,
    /// Known cliques, used by the SAT engine for symmetry breaking. The
    /// lexicographically first clique is pre-colored `0..len`.
    pub cliques: Vec<Vec<usize>>,
    /// Verify the produced coloring and report the result in the stats.
    pub verify_coloring_after_computation: bool,
}

impl Default for ColoringParams {
    fn default() -> Self {
        ColoringParams {
            engine: ColoringEngine::Dsatur,
            k_color_value: 0,
            seed: 0,
            cliques: Vec::new(),
            verify_coloring_after_computation: false,
        }
    }
}

/// A vertex coloring: a map from vertex labels to colors.
pub type VertexColoring = HashMap<usize, usize>;

/// Statistics of a coloring run.
#[derive(Clone, Debug, Default)]
pub struct ColoringStats {
    /// The number of colors used.
    pub chromatic_number: usize,
    /// The color with the highest number of occurrences (ties broken
    /// towards the smaller color).
    pub most_frequent_color: usize,
    /// How often the most frequent color occurs.
    pub color_frequency: usize,
    /// Whether the verification pass found the coloring valid. `None` if
    /// verification was not requested.
    pub coloring_verified: Option<bool>,
}

/// Computes a vertex coloring of `graph` with the engine selected in
/// `params`.
pub fn determine_vertex_coloring(
    graph: &EdgeIntersectionGraph,
    params: &ColoringParams,
) -> (VertexColoring, ColoringStats) {
    let mut stats = ColoringStats::default();

    let (coloring, num_colors) = match params.engine {
        ColoringEngine::Mcs => mcs_coloring(graph),
        ColoringEngine::Dsatur => dsatur_coloring(graph),
        ColoringEngine::Lmxrlf => lmxrlf_coloring(graph, params.seed),
        ColoringEngine::Tabucol => {
            let k = params.k_color_value.max(1);
            tabucol_coloring(graph, k, params.seed)
        }
        ColoringEngine::Sat => sat_coloring(graph, &params.cliques),
    };

    stats.chromatic_number = num_colors;
    if let Some((color, frequency)) = most_frequent_color(&coloring) {
        stats.most_frequent_color = color;
        stats.color_frequency = frequency;
    }
    if params.verify_coloring_after_computation {
        stats.coloring_verified = Some(verify_coloring(graph, &coloring));
    }

    debug!(
        engine = ?params.engine,
        colors = stats.chromatic_number,
        frequency = stats.color_frequency,
        "determined vertex coloring"
    );

    (coloring, stats)
}

/// `true` iff no edge of `graph` is monochromatic under `coloring` and all
/// vertices are colored.
pub fn verify_coloring(graph: &EdgeIntersectionGraph, coloring: &VertexColoring) -> bool {
    graph.vertices().all(|v| coloring.contains_key(&v))
        && graph.vertices().all(|v| {
            graph
                .neighbors(v)
                .all(|w| coloring.get(&v) != coloring.get(&w))
        })
}

fn most_frequent_color(coloring: &VertexColoring) -> Option<(usize, usize)> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for &color in coloring.values() {
        *counts.entry(color).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(ca, fa), (cb, fb)| fa.cmp(fb).then(cb.cmp(ca)))
}

/// The smallest color not used by any neighbor of `v`.
fn smallest_free_color(
    graph: &EdgeIntersectionGraph,
    coloring: &VertexColoring,
    v: usize,
) -> usize {
    let used: HashSet<usize> = graph
        .neighbors(v)
        .filter_map(|w| coloring.get(&w).copied())
        .collect();
    (0..).find(|c| !used.contains(c)).expect("color exists")
}

/// Maximum cardinality search: repeatedly pick the unprocessed vertex with
/// the most already processed neighbors and greedily assign the smallest
/// free color.
fn mcs_coloring(graph: &EdgeIntersectionGraph) -> (VertexColoring, usize) {
    let n = graph.num_vertices();
    let mut coloring = VertexColoring::new();
    let mut processed = FixedBitSet::with_capacity(n);
    let mut weights = vec![0usize; n];
    let mut max_color = 0;

    for _ in 0..n {
        let v = (0..n)
            .filter(|&v| !processed.contains(v))
            .max_by_key(|&v| (weights[v], core::cmp::Reverse(v)))
            .expect("unprocessed vertex exists");

        processed.insert(v);
        for w in graph.neighbors(v) {
            weights[w] += 1;
        }

        let color = smallest_free_color(graph, &coloring, v);
        max_color = max_color.max(color);
        coloring.insert(v, color);
    }

    (coloring, if n == 0 { 0 } else { max_color + 1 })
}

/// DSATUR: repeatedly color the vertex with the highest saturation
/// (number of distinct neighbor colors), ties broken by larger degree.
fn dsatur_coloring(graph: &EdgeIntersectionGraph) -> (VertexColoring, usize) {
    let n = graph.num_vertices();
    let mut queue = BinaryHeap::with_capacity(n);
    let mut coloring = VertexColoring::new();
    let mut adjacent_colors: Vec<HashSet<usize>> = vec![HashSet::new(); n];
    let mut seen = FixedBitSet::with_capacity(n);
    let mut max_color = 0;

    for v in graph.vertices() {
        queue.push(MaxScored((0usize, graph.degree(v)), v));
    }

    while let Some(MaxScored(_, v)) = queue.pop() {
        if seen.contains(v) {
            continue;
        }
        seen.insert(v);

        let color = smallest_free_color(graph, &coloring, v);
        coloring.insert(v, color);
        max_color = max_color.max(color);

        for w in graph.neighbors(v) {
            if !seen.contains(w) {
                adjacent_colors[w].insert(color);
                queue.push(MaxScored((adjacent_colors[w].len(), graph.degree(w)), w));
            }
        }
    }

    (coloring, if n == 0 { 0 } else { max_color + 1 })
}

/// LMXRLF-style coloring: peel off randomized maximal independent sets and
/// assign one color per set. The seed makes runs reproducible.
fn lmxrlf_coloring(graph: &EdgeIntersectionGraph, seed: u64) -> (VertexColoring, usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut coloring = VertexColoring::new();
    let mut remaining: Vec<usize> = graph.vertices().collect();
    let mut current_color = 0;

    while !remaining.is_empty() {
        remaining.shuffle(&mut rng);

        let mut independent: Vec<usize> = Vec::new();
        let mut rest: Vec<usize> = Vec::new();
        for &v in &remaining {
            let adjacent = independent.iter().any(|&w| graph.has_edge(v, w));
            if adjacent {
                rest.push(v);
            } else {
                independent.push(v);
                coloring.insert(v, current_color);
            }
        }

        remaining = rest;
        current_color += 1;
    }

    (coloring, current_color)
}

/// TABUCOL: tabu search for a proper coloring with exactly `k` colors.
/// Falls back to the best (possibly conflicting) assignment found when the
/// iteration budget runs out; verification (see [`verify_coloring`])
/// reveals whether `k` was feasible.
fn tabucol_coloring(
    graph: &EdgeIntersectionGraph,
    k: usize,
    seed: u64,
) -> (VertexColoring, usize) {
    const MAX_ITERATIONS: usize = 20_000;
    const TABU_TENURE: usize = 7;

    let n = graph.num_vertices();
    if n == 0 {
        return (VertexColoring::new(), 0);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut colors: Vec<usize> = (0..n).map(|_| rng.gen_range(0..k)).collect();
    let mut tabu: HashMap<(usize, usize), usize> = HashMap::new();

    let conflicts = |colors: &[usize]| -> Vec<usize> {
        (0..n)
            .filter(|&v| graph.neighbors(v).any(|w| colors[w] == colors[v]))
            .collect()
    };

    let mut best = colors.clone();
    let mut best_conflicts = conflicts(&colors).len();

    for iteration in 0..MAX_ITERATIONS {
        let conflicted = conflicts(&colors);
        if conflicted.is_empty() {
            best = colors;
            best_conflicts = 0;
            break;
        }

        // best non-tabu move: recolor one conflicted vertex
        let mut best_move: Option<(usize, usize, isize)> = None;
        for &v in &conflicted {
            let current_penalty =
                graph.neighbors(v).filter(|&w| colors[w] == colors[v]).count() as isize;
            for c in 0..k {
                if c == colors[v] {
                    continue;
                }
                if tabu.get(&(v, c)).copied().unwrap_or(0) > iteration {
                    continue;
                }
                let penalty = graph.neighbors(v).filter(|&w| colors[w] == c).count() as isize;
                let delta = penalty - current_penalty;
                if best_move.map_or(true, |(_, _, d)| delta < d) {
                    best_move = Some((v, c, delta));
                }
            }
        }

        let Some((v, c, _)) = best_move else {
            // all moves tabu; perturb randomly
            let v = conflicted[rng.gen_range(0..conflicted.len())];
            colors[v] = rng.gen_range(0..k);
            continue;
        };

        tabu.insert((v, colors[v]), iteration + TABU_TENURE + conflicted.len() / 2);
        colors[v] = c;

        let current = conflicts(&colors).len();
        if current < best_conflicts {
            best_conflicts = current;
            best = colors.clone();
        }
    }

    let coloring: VertexColoring = best.iter().copied().enumerate().collect();
    (coloring, k)
}

/// Complete SAT-based coloring: encodes k-colorability in CNF and ascends
/// `k` linearly from the largest recorded clique size. Cliques pre-color
/// the search: the first recorded clique is fixed to colors `0..len`,
/// which breaks the color permutation symmetry.
fn sat_coloring(
    graph: &EdgeIntersectionGraph,
    cliques: &[Vec<usize>],
) -> (VertexColoring, usize) {
    let n = graph.num_vertices();
    if n == 0 {
        return (VertexColoring::new(), 0);
    }

    let lower = cliques
        .iter()
        .map(|c| c.len())
        .max()
        .unwrap_or(1)
        .clamp(1, n);

    for k in lower..=n {
        if let Some(coloring) = sat_k_coloring(graph, cliques, k) {
            return (coloring, k);
        }
    }

    // n colors always suffice; the loop cannot fall through
    unreachable!("a graph is always colorable with one color per vertex")
}

/// One k-colorability check. Returns the coloring on satisfiability.
fn sat_k_coloring(
    graph: &EdgeIntersectionGraph,
    cliques: &[Vec<usize>],
    k: usize,
) -> Option<VertexColoring> {
    let n = graph.num_vertices();
    let mut solver = Solver::new();

    // one literal per (vertex, color)
    let lits: Vec<Vec<Lit>> = (0..n)
        .map(|_| (0..k).map(|_| solver.new_lit()).collect())
        .collect();

    for v in 0..n {
        // every vertex receives at least one color...
        solver.add_clause(&lits[v]);
        // ...and at most one
        for c1 in 0..k {
            for c2 in c1 + 1..k {
                solver.add_clause(&[!lits[v][c1], !lits[v][c2]]);
            }
        }
    }

    // no monochromatic edge
    for v in 0..n {
        for w in graph.neighbors(v) {
            if v < w {
                for c in 0..k {
                    solver.add_clause(&[!lits[v][c], !lits[w][c]]);
                }
            }
        }
    }

    // symmetry breaking: fix the first clique to the first colors
    if let Some(first) = cliques.first() {
        for (color, &v) in first.iter().take(k).enumerate() {
            solver.add_clause(&[lits[v][color]]);
        }
    }

    match solver.solve() {
        Ok(true) => {
            let model = solver.model()?;
            let mut assignment = vec![false; model.len() + 1];
            for lit in model {
                if lit.is_positive() {
                    let idx = lit.var().index();
                    if idx < assignment.len() {
                        assignment[idx] = true;
                    }
                }
            }

            let mut coloring = VertexColoring::new();
            for v in 0..n {
                let color = (0..k).find(|&c| assignment[lits[v][c].var().index()])?;
                coloring.insert(v, color);
            }
            Some(coloring)
        }
        _ => None,
    }
}
