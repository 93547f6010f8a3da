//! Safe structural decomposition of KPP instances.
//!
//! Splitting at cut vertices and peeling low-degree vertices both preserve
//! the optimal clash count additively: a vertex shared between two
//! biconnected components can be re-coloured in each independently, and a
//! vertex of degree below k can always pick a class none of its neighbors
//! uses. The decomposition therefore yields sub-problems whose optima sum to
//! the optimum of the input graph.
//!
//! The k-core pruning step has only been validated for unit edge weights;
//! non-uniform weights are accepted but flagged with a warning.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::graph::ClashGraph;

/// Decompose a graph into independently solvable KPP sub-problems.
///
/// Work-list algorithm: a graph with more than one biconnected component is
/// split into its components' induced subgraphs; a graph with minimum degree
/// below `k` is replaced by its k-core (discarded outright when the core has
/// at most `k` vertices, since such a core is colourable without clashes);
/// a biconnected graph of minimum degree >= `k` is irreducible and emitted.
///
/// Every step shrinks the graph or splits it, so termination is guaranteed.
/// The result may be empty (sparse graphs frequently peel away completely).
pub fn decompose(graph: &ClashGraph, k: usize) -> Vec<ClashGraph> {
    if !graph.has_unit_weights() {
        warn!("k-core pruning is only validated for unit edge weights");
    }
    let mut work = vec![graph.clone()];
    let mut components = Vec::new();

    while let Some(g) = work.pop() {
        if g.edge_count() == 0 {
            continue;
        }
        let bicomps = g.biconnected_components();
        if bicomps.len() > 1 {
            debug!(
                vertices = g.vertex_count(),
                parts = bicomps.len(),
                "splitting at cut vertices"
            );
            for comp in &bicomps {
                work.push(g.induced_subgraph(comp));
            }
            continue;
        }
        if g.min_degree().unwrap_or(0) < k {
            let core = g.k_core(k);
            debug!(
                vertices = g.vertex_count(),
                core_vertices = core.vertex_count(),
                "peeled to {k}-core"
            );
            if core.vertex_count() > k {
                work.push(core);
            }
            continue;
        }
        components.push(g);
    }
    components
}

/// Size statistics for a decomposition, for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompositionSummary {
    pub components: usize,
    /// Fraction of the original edges eliminated by the decomposition.
    pub edge_reduction: f64,
    pub max_vertices: usize,
    pub max_edges: usize,
    /// Largest component size measured as vertices + edges.
    pub max_size: usize,
}

/// Summarize how much a decomposition shrank the original instance.
pub fn summarize_decomposition(
    original: &ClashGraph,
    components: &[ClashGraph],
) -> DecompositionSummary {
    let orig_edges = original.edge_count();
    let decomp_edges: usize = components.iter().map(|g| g.edge_count()).sum();
    let edge_reduction = if orig_edges > 0 {
        (orig_edges as f64 - decomp_edges as f64) / orig_edges as f64
    } else {
        0.0
    };
    DecompositionSummary {
        components: components.len(),
        edge_reduction,
        max_vertices: components.iter().map(|g| g.vertex_count()).max().unwrap_or(0),
        max_edges: components.iter().map(|g| g.edge_count()).max().unwrap_or(0),
        max_size: components
            .iter()
            .map(|g| g.vertex_count() + g.edge_count())
            .max()
            .unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::generate::random_geometric_graph;
    use crate::test_utils::brute_force_optimum;

    #[test]
    fn bowtie_splits_into_triangles() {
        let g = ClashGraph::from_edges(5, &[(0, 1), (0, 2), (1, 2), (2, 3), (2, 4), (3, 4)]);
        let comps = decompose(&g, 2);
        assert_eq!(comps.len(), 2);
        for c in &comps {
            assert_eq!(c.vertex_count(), 3);
            assert_eq!(c.edge_count(), 3);
        }
    }

    #[test]
    fn sparse_graphs_peel_away_completely() {
        // A tree has min degree 1 everywhere; the 2-core is empty.
        let g = ClashGraph::from_edges(5, &[(0, 1), (1, 2), (1, 3), (3, 4)]);
        assert!(decompose(&g, 2).is_empty());
    }

    #[test]
    fn small_cores_are_discarded() {
        // A single triangle is a 2-core on 3 vertices; with k = 3 it cannot
        // force a clash and must be pruned.
        let g = ClashGraph::complete(3);
        assert!(decompose(&g, 3).is_empty());
        // With k = 2 it survives as an irreducible component.
        assert_eq!(decompose(&g, 2).len(), 1);
    }

    #[test]
    fn components_are_irreducible() {
        let mut rng = StdRng::seed_from_u64(7);
        let g = random_geometric_graph(60, 0.22, false, &mut rng);
        for c in decompose(&g, 3) {
            assert!(c.min_degree().unwrap_or(0) >= 3);
            assert!(c.biconnected_components().len() <= 1);
            assert!(c.vertex_count() > 3);
        }
    }

    #[test]
    fn decomposition_is_additive_for_brute_force_optimum() {
        // The headline correctness property: the optimal clash counts of the
        // components sum to the optimum of the whole graph.
        for seed in [1u64, 5, 11, 23] {
            let mut rng = StdRng::seed_from_u64(seed);
            let g = random_geometric_graph(11, 0.45, false, &mut rng);
            for k in [2usize, 3] {
                let whole = brute_force_optimum(&g, k);
                let parts: f64 = decompose(&g, k)
                    .iter()
                    .map(|c| brute_force_optimum(c, k))
                    .sum();
                assert!(
                    (whole - parts).abs() < 1e-9,
                    "seed {seed}, k {k}: whole {whole} != sum of parts {parts}"
                );
            }
        }
    }
}
