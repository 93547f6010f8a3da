//! Brute-force reference implementations shared by tests across the
//! workspace. Exponential in the vertex count; only call on small graphs.

use crate::graph::ClashGraph;

/// Weighted clash count of a fixed class assignment.
pub fn clash_count(graph: &ClashGraph, assignment: &[usize]) -> f64 {
    graph
        .edges()
        .filter(|e| assignment[e.u] == assignment[e.v])
        .map(|e| e.weight)
        .sum()
}

/// Exact KPP optimum by exhaustive enumeration of all k^n assignments.
pub fn brute_force_optimum(graph: &ClashGraph, k: usize) -> f64 {
    let n = graph.vertex_count();
    assert!(k >= 1, "need at least one class");
    assert!(
        (k as f64).powi(n as i32) <= 2e7,
        "instance too large for brute force"
    );
    let mut assignment = vec![0usize; n];
    let mut best = f64::INFINITY;
    loop {
        best = best.min(clash_count(graph, &assignment));
        // Odometer increment over base-k digits.
        let mut pos = 0;
        loop {
            if pos == n {
                return if best.is_finite() { best } else { 0.0 };
            }
            assignment[pos] += 1;
            if assignment[pos] < k {
                break;
            }
            assignment[pos] = 0;
            pos += 1;
        }
    }
}

/// Exact two-level optimum: assignments over `k * k2` fine classes, counting
/// a primary clash for endpoints sharing a residue mod `k` and a secondary
/// clash for endpoints sharing the fine class.
pub fn brute_force_two_level_optimum(graph: &ClashGraph, k: usize, k2: usize) -> f64 {
    let n = graph.vertex_count();
    let classes = k * k2;
    assert!(classes >= 1);
    assert!(
        (classes as f64).powi(n as i32) <= 2e7,
        "instance too large for brute force"
    );
    let mut assignment = vec![0usize; n];
    let mut best = f64::INFINITY;
    loop {
        let mut cost = 0.0;
        for e in graph.edges() {
            if assignment[e.u] % k == assignment[e.v] % k {
                cost += e.weight;
            }
            if assignment[e.u] == assignment[e.v] {
                cost += e.weight;
            }
        }
        best = best.min(cost);
        let mut pos = 0;
        loop {
            if pos == n {
                return if best.is_finite() { best } else { 0.0 };
            }
            assignment[pos] += 1;
            if assignment[pos] < classes {
                break;
            }
            assignment[pos] = 0;
            pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_with_two_classes_forces_one_clash() {
        let g = ClashGraph::complete(3);
        assert_eq!(brute_force_optimum(&g, 2), 1.0);
        assert_eq!(brute_force_optimum(&g, 3), 0.0);
    }

    #[test]
    fn complete_graph_balanced_colouring() {
        // K6 with 3 classes: balanced pairs give 3 intra-class edges.
        assert_eq!(brute_force_optimum(&ClashGraph::complete(6), 3), 3.0);
    }

    #[test]
    fn empty_graph_is_free() {
        assert_eq!(brute_force_optimum(&ClashGraph::with_vertices(0), 3), 0.0);
        assert_eq!(brute_force_optimum(&ClashGraph::with_vertices(4), 2), 0.0);
    }

    #[test]
    fn two_level_counts_both_granularities() {
        // K4 with k = 3, k2 = 2: all four vertices can take distinct fine
        // classes (no secondary clash) but only three residues exist, so one
        // primary clash is forced.
        let g = ClashGraph::complete(4);
        assert_eq!(brute_force_two_level_optimum(&g, 3, 2), 1.0);
    }
}
