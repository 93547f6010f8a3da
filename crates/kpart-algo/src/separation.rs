//! Clique-based separation oracles.
//!
//! Distributing the `p` vertices of a clique over `m` classes as evenly as
//! possible forces a computable minimum number of intra-class edges,
//! [`clique_rhs`]. An LP relaxation whose clash variables sum below that
//! bound on some clique is violating a valid inequality; the oracles here
//! scan a precomputed candidate set of p-cliques for such violations and
//! emit the corresponding tightening constraints.
//!
//! Candidate sets are built once per oracle from the graph's maximal
//! cliques: every p-subset of every maximal clique of size at least p,
//! paired with its induced edge set. The same p-clique may appear through
//! several maximal cliques; violations are recomputed per call, so the
//! duplication is harmless.

use tracing::debug;

use crate::model::{CutConstraint, FractionalSolution, Sense};

/// A violation below this threshold is noise, not a cut.
pub const VIOLATION_TOLERANCE: f64 = 1e-3;
/// Cap on cuts emitted per oracle call; the most violated are kept.
pub const MAX_CUTS_PER_CALL: usize = 10;

/// A detector of violated clique inequalities against a fractional
/// solution. Implementations are read-only with respect to the solution.
pub trait SeparationOracle {
    fn find_violated_constraints(&self, solution: &FractionalSolution) -> Vec<CutConstraint>;
}

/// Minimum number of intra-class edges forced among `p` items spread as
/// evenly as possible over `m` classes: with `t = p / m` and `r = p mod m`,
/// `r` classes hold `t + 1` items and the rest hold `t`.
pub fn clique_rhs(p: usize, m: usize) -> f64 {
    assert!(m >= 1, "need at least one class");
    let t = (p / m) as f64;
    let r = (p % m) as f64;
    let m = m as f64;
    0.5 * t * ((t - 1.0) * (m - r) + (t + 1.0) * r)
}

/// Parity-aware bound for the gap between the two clash levels on a
/// p-clique.
pub fn yz_clique_rhs(p: usize) -> f64 {
    if p % 2 == 1 {
        (p - 1) as f64 / 4.0
    } else {
        p as f64 / 4.0
    }
}

/// All `p`-subsets of `items`, in lexicographic order.
fn p_subsets(items: &[usize], p: usize) -> Vec<Vec<usize>> {
    let n = items.len();
    if p == 0 || p > n {
        return Vec::new();
    }
    let mut idx: Vec<usize> = (0..p).collect();
    let mut out = Vec::new();
    'outer: loop {
        out.push(idx.iter().map(|&i| items[i]).collect());
        let mut i = p;
        while i > 0 {
            i -= 1;
            if idx[i] < i + n - p {
                idx[i] += 1;
                for j in (i + 1)..p {
                    idx[j] = idx[j - 1] + 1;
                }
                continue 'outer;
            }
        }
        return out;
    }
}

fn clique_edges(clique: &[usize]) -> Vec<(usize, usize)> {
    let mut edges = Vec::with_capacity(clique.len() * (clique.len() - 1) / 2);
    for (i, &u) in clique.iter().enumerate() {
        for &v in &clique[i + 1..] {
            edges.push((u.min(v), u.max(v)));
        }
    }
    edges
}

/// The candidate p-cliques of one oracle, precomputed at construction and
/// immutable for the oracle's lifetime.
#[derive(Debug, Clone)]
struct CliqueCandidates {
    p: usize,
    cliques: Vec<Vec<usize>>,
    edge_sets: Vec<Vec<(usize, usize)>>,
}

impl CliqueCandidates {
    fn new(max_cliques: &[Vec<usize>], p: usize) -> Self {
        let mut cliques = Vec::new();
        for clique in max_cliques {
            cliques.extend(p_subsets(clique, p));
        }
        let edge_sets = cliques.iter().map(|c| clique_edges(c)).collect();
        Self {
            p,
            cliques,
            edge_sets,
        }
    }

    /// Indices of candidates whose violation exceeds the tolerance, capped
    /// at the most violated `max_cuts`.
    fn violated<F>(&self, tolerance: f64, max_cuts: usize, score: F) -> Vec<usize>
    where
        F: Fn(&[usize], &[(usize, usize)]) -> f64,
    {
        let mut hits: Vec<(usize, f64)> = Vec::new();
        for (i, (nodes, edges)) in self.cliques.iter().zip(&self.edge_sets).enumerate() {
            let violation = score(nodes, edges);
            if violation > tolerance {
                hits.push((i, violation));
            }
        }
        let found = hits.len();
        if found > max_cuts {
            hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            hits.truncate(max_cuts);
        }
        debug!(
            p = self.p,
            found,
            selected = hits.len(),
            "separated violated clique inequalities"
        );
        hits.into_iter().map(|(i, _)| i).collect()
    }
}

/// Separates `sum y(clique edges) >= clique_rhs(p, k)`.
#[derive(Debug, Clone)]
pub struct YCliqueSeparator {
    candidates: CliqueCandidates,
    k: usize,
    tolerance: f64,
    max_cuts: usize,
}

impl YCliqueSeparator {
    pub fn new(max_cliques: &[Vec<usize>], p: usize, k: usize) -> Self {
        Self {
            candidates: CliqueCandidates::new(max_cliques, p),
            k,
            tolerance: VIOLATION_TOLERANCE,
            max_cuts: MAX_CUTS_PER_CALL,
        }
    }
}

impl SeparationOracle for YCliqueSeparator {
    fn find_violated_constraints(&self, solution: &FractionalSolution) -> Vec<CutConstraint> {
        let rhs = clique_rhs(self.candidates.p, self.k);
        self.candidates
            .violated(self.tolerance, self.max_cuts, |_, edges| {
                rhs - edges.iter().map(|&e| solution.y_value(e)).sum::<f64>()
            })
            .into_iter()
            .map(|i| CutConstraint {
                x_terms: Vec::new(),
                y_terms: self.candidates.edge_sets[i].iter().map(|&e| (e, 1.0)).collect(),
                z_terms: Vec::new(),
                sense: Sense::Geq,
                rhs,
            })
            .collect()
    }
}

/// Separates `sum z(clique edges) >= clique_rhs(p, num_classes)` at the fine
/// granularity of the two-level model.
#[derive(Debug, Clone)]
pub struct ZCliqueSeparator {
    candidates: CliqueCandidates,
    num_classes: usize,
    tolerance: f64,
    max_cuts: usize,
}

impl ZCliqueSeparator {
    /// `num_classes` is the fine class count, `k * k2`.
    pub fn new(max_cliques: &[Vec<usize>], p: usize, num_classes: usize) -> Self {
        Self {
            candidates: CliqueCandidates::new(max_cliques, p),
            num_classes,
            tolerance: VIOLATION_TOLERANCE,
            max_cuts: MAX_CUTS_PER_CALL,
        }
    }
}

impl SeparationOracle for ZCliqueSeparator {
    fn find_violated_constraints(&self, solution: &FractionalSolution) -> Vec<CutConstraint> {
        let rhs = clique_rhs(self.candidates.p, self.num_classes);
        self.candidates
            .violated(self.tolerance, self.max_cuts, |_, edges| {
                rhs - edges.iter().map(|&e| solution.z_value(e)).sum::<f64>()
            })
            .into_iter()
            .map(|i| CutConstraint {
                x_terms: Vec::new(),
                y_terms: Vec::new(),
                z_terms: self.candidates.edge_sets[i].iter().map(|&e| (e, 1.0)).collect(),
                sense: Sense::Geq,
                rhs,
            })
            .collect()
    }
}

/// Separates `0.5 * sum y - sum z <= yz_clique_rhs(p)`, bounding how far the
/// primary clash count can run ahead of the secondary one on a clique.
///
/// The parity bound assumes exactly two fine classes per coarse group
/// (k2 = 2); the orchestrator rejects this family for any other k2.
#[derive(Debug, Clone)]
pub struct YzCliqueSeparator {
    candidates: CliqueCandidates,
    tolerance: f64,
    max_cuts: usize,
}

impl YzCliqueSeparator {
    pub fn new(max_cliques: &[Vec<usize>], p: usize) -> Self {
        Self {
            candidates: CliqueCandidates::new(max_cliques, p),
            tolerance: VIOLATION_TOLERANCE,
            max_cuts: MAX_CUTS_PER_CALL,
        }
    }
}

impl SeparationOracle for YzCliqueSeparator {
    fn find_violated_constraints(&self, solution: &FractionalSolution) -> Vec<CutConstraint> {
        let rhs = yz_clique_rhs(self.candidates.p);
        self.candidates
            .violated(self.tolerance, self.max_cuts, |_, edges| {
                let lhs: f64 = edges
                    .iter()
                    .map(|&e| 0.5 * solution.y_value(e) - solution.z_value(e))
                    .sum();
                lhs - rhs
            })
            .into_iter()
            .map(|i| CutConstraint {
                x_terms: Vec::new(),
                y_terms: self.candidates.edge_sets[i].iter().map(|&e| (e, 0.5)).collect(),
                z_terms: self.candidates.edge_sets[i].iter().map(|&e| (e, -1.0)).collect(),
                sense: Sense::Leq,
                rhs,
            })
            .collect()
    }
}

/// Separates the projected clique inequality: assignment variables over a
/// chosen class subset join the clash variables, with the clique size
/// inflated by the subset size.
#[derive(Debug, Clone)]
pub struct ProjectedCliqueSeparator {
    candidates: CliqueCandidates,
    k: usize,
    classes: Vec<usize>,
    tolerance: f64,
    max_cuts: usize,
}

impl ProjectedCliqueSeparator {
    pub fn new(max_cliques: &[Vec<usize>], p: usize, k: usize, classes: Vec<usize>) -> Self {
        Self {
            candidates: CliqueCandidates::new(max_cliques, p),
            k,
            classes,
            tolerance: VIOLATION_TOLERANCE,
            max_cuts: MAX_CUTS_PER_CALL,
        }
    }
}

impl SeparationOracle for ProjectedCliqueSeparator {
    fn find_violated_constraints(&self, solution: &FractionalSolution) -> Vec<CutConstraint> {
        let rhs = clique_rhs(self.candidates.p + self.classes.len(), self.k);
        self.candidates
            .violated(self.tolerance, self.max_cuts, |nodes, edges| {
                let x_total: f64 = nodes
                    .iter()
                    .flat_map(|&v| self.classes.iter().map(move |&c| solution.x_value(v, c)))
                    .sum();
                let y_total: f64 = edges.iter().map(|&e| solution.y_value(e)).sum();
                rhs - (x_total + y_total)
            })
            .into_iter()
            .map(|i| CutConstraint {
                x_terms: self.candidates.cliques[i]
                    .iter()
                    .flat_map(|&v| self.classes.iter().map(move |&c| ((v, c), 1.0)))
                    .collect(),
                y_terms: self.candidates.edge_sets[i].iter().map(|&e| (e, 1.0)).collect(),
                z_terms: Vec::new(),
                sense: Sense::Geq,
                rhs,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    /// Exhaustive minimum intra-class edge count for p items in m classes,
    /// over all class-size distributions.
    fn min_forced_edges(p: usize, m: usize) -> f64 {
        fn go(remaining: usize, classes: usize) -> usize {
            if classes == 1 {
                return remaining * remaining.saturating_sub(1) / 2;
            }
            (0..=remaining)
                .map(|take| take * take.saturating_sub(1) / 2 + go(remaining - take, classes - 1))
                .min()
                .unwrap()
        }
        go(p, m) as f64
    }

    #[test]
    fn clique_rhs_matches_exhaustive_minimum() {
        for p in 2..=9 {
            for m in 1..=4 {
                assert_eq!(
                    clique_rhs(p, m),
                    min_forced_edges(p, m),
                    "p = {p}, m = {m}"
                );
            }
        }
    }

    #[test]
    fn clique_rhs_known_values() {
        assert_eq!(clique_rhs(4, 3), 1.0);
        assert_eq!(clique_rhs(6, 3), 3.0);
        assert_eq!(clique_rhs(7, 3), 5.0);
        assert_eq!(clique_rhs(3, 4), 0.0);
    }

    #[test]
    fn yz_clique_rhs_is_parity_aware() {
        assert_eq!(yz_clique_rhs(4), 1.0);
        assert_eq!(yz_clique_rhs(7), 1.5);
        assert_eq!(yz_clique_rhs(8), 2.0);
    }

    #[test]
    fn p_subsets_enumerate_combinations() {
        let subsets = p_subsets(&[0, 1, 2, 3], 3);
        assert_eq!(
            subsets,
            vec![vec![0, 1, 2], vec![0, 1, 3], vec![0, 2, 3], vec![1, 2, 3]]
        );
        assert!(p_subsets(&[0, 1], 3).is_empty());
    }

    #[test]
    fn oversized_p_yields_no_candidates() {
        let sep = YCliqueSeparator::new(&[vec![0, 1, 2]], 5, 3);
        let solution = FractionalSolution::default();
        assert!(sep.find_violated_constraints(&solution).is_empty());
    }

    fn zero_y_solution(edges: &[(usize, usize)]) -> FractionalSolution {
        FractionalSolution {
            x: BTreeMap::new(),
            y: edges.iter().map(|&e| (e, 0.0)).collect(),
            z: BTreeMap::new(),
        }
    }

    #[test]
    fn y_separator_detects_a_zero_solution() {
        // K4 with k = 3: four vertices cannot take three classes without a
        // clash, so all-zero y violates the clique bound by exactly 1.
        let max_cliques = vec![vec![0, 1, 2, 3]];
        let edges = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        let sep = YCliqueSeparator::new(&max_cliques, 4, 3);
        let cuts = sep.find_violated_constraints(&zero_y_solution(&edges));
        assert_eq!(cuts.len(), 1);
        assert_eq!(cuts[0].y_terms.len(), 6);
        assert_eq!(cuts[0].rhs, 1.0);
        assert_eq!(cuts[0].sense, Sense::Geq);
    }

    #[test]
    fn satisfied_solutions_produce_no_cuts() {
        let max_cliques = vec![vec![0, 1, 2, 3]];
        let edges = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        let mut solution = zero_y_solution(&edges);
        for value in solution.y.values_mut() {
            *value = 0.2; // sums to 1.2 >= clique_rhs(4, 3) = 1
        }
        let sep = YCliqueSeparator::new(&max_cliques, 4, 3);
        assert!(sep.find_violated_constraints(&solution).is_empty());
    }

    #[test]
    fn cut_count_is_capped_at_the_most_violated() {
        // K8 has 70 sub-cliques of size 4; an all-zero solution violates
        // every one of them, but only the cap may come back.
        let clique: Vec<usize> = (0..8).collect();
        let edges = clique_edges(&clique);
        let sep = YCliqueSeparator::new(&[clique], 4, 3);
        let cuts = sep.find_violated_constraints(&zero_y_solution(&edges));
        assert_eq!(cuts.len(), MAX_CUTS_PER_CALL);
    }

    #[test]
    fn yz_separator_bounds_the_level_gap() {
        // y = 1 and z = 0 on every edge of a 4-clique: lhs = 3 > 1 = rhs.
        let max_cliques = vec![vec![0, 1, 2, 3]];
        let edges = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        let mut solution = zero_y_solution(&edges);
        for value in solution.y.values_mut() {
            *value = 1.0;
        }
        solution.z = edges.iter().map(|&e| (e, 0.0)).collect();
        let sep = YzCliqueSeparator::new(&max_cliques, 4);
        let cuts = sep.find_violated_constraints(&solution);
        assert_eq!(cuts.len(), 1);
        assert_eq!(cuts[0].sense, Sense::Leq);
        assert_eq!(cuts[0].rhs, 1.0);
        assert_eq!(cuts[0].y_terms[0].1, 0.5);
        assert_eq!(cuts[0].z_terms[0].1, -1.0);
    }

    #[test]
    fn projected_separator_counts_assignment_mass() {
        // Triangle, k = 3, projected onto class {0}: rhs = clique_rhs(4, 3)
        // = 1. Zero x and zero y violate by 1.
        let max_cliques = vec![vec![0, 1, 2]];
        let edges = [(0, 1), (0, 2), (1, 2)];
        let mut solution = zero_y_solution(&edges);
        let sep = ProjectedCliqueSeparator::new(&max_cliques, 3, 3, vec![0]);
        let cuts = sep.find_violated_constraints(&solution);
        assert_eq!(cuts.len(), 1);
        assert_eq!(cuts[0].x_terms.len(), 3);
        assert_eq!(cuts[0].rhs, 1.0);

        // Full assignment mass on the projected class satisfies the bound.
        for v in 0..3 {
            solution.x.insert((v, 0), 1.0);
        }
        assert!(sep.find_violated_constraints(&solution).is_empty());
    }
}
