//! Undirected weighted graph wrapper for clash-count partitioning.
//!
//! [`ClashGraph`] keeps vertex ids contiguous (`0..vertex_count()`) and edge
//! keys canonical (`u < v`), which is the indexing scheme the partition
//! models and separation oracles key their variables by. The struct is a thin
//! wrapper over a petgraph `UnGraph`; the derived queries that petgraph does
//! not provide (biconnected components, k-cores) are implemented here.

use std::collections::HashSet;

use petgraph::algo::maximal_cliques::maximal_cliques;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

/// A weighted edge with canonical endpoint order (`u < v`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedEdge {
    pub u: usize,
    pub v: usize,
    pub weight: f64,
}

/// Undirected simple graph with weighted edges.
///
/// Vertices are dense indices `0..vertex_count()`. Parallel edges are
/// collapsed (the last inserted weight wins) and self loops are ignored, so
/// every edge is uniquely identified by its canonical `(u, v)` pair.
#[derive(Debug, Clone, Default)]
pub struct ClashGraph {
    graph: UnGraph<(), f64>,
}

impl ClashGraph {
    /// Create a graph with `n` isolated vertices.
    pub fn with_vertices(n: usize) -> Self {
        let mut graph = UnGraph::default();
        for _ in 0..n {
            graph.add_node(());
        }
        Self { graph }
    }

    /// Create a graph from unit-weight edges over `n` vertices.
    pub fn from_edges(n: usize, edges: &[(usize, usize)]) -> Self {
        let mut g = Self::with_vertices(n);
        for &(u, v) in edges {
            g.add_edge(u, v, 1.0);
        }
        g
    }

    /// Create a graph from weighted edges over `n` vertices.
    pub fn from_weighted_edges(n: usize, edges: &[(usize, usize, f64)]) -> Self {
        let mut g = Self::with_vertices(n);
        for &(u, v, w) in edges {
            g.add_edge(u, v, w);
        }
        g
    }

    /// The complete graph on `n` vertices with unit weights.
    pub fn complete(n: usize) -> Self {
        let mut g = Self::with_vertices(n);
        for u in 0..n {
            for v in (u + 1)..n {
                g.add_edge(u, v, 1.0);
            }
        }
        g
    }

    /// Insert an edge, collapsing duplicates and dropping self loops.
    pub fn add_edge(&mut self, u: usize, v: usize, weight: f64) {
        assert!(
            u < self.vertex_count() && v < self.vertex_count(),
            "edge ({u}, {v}) out of range for {} vertices",
            self.vertex_count()
        );
        if u == v {
            return;
        }
        self.graph
            .update_edge(NodeIndex::new(u), NodeIndex::new(v), weight);
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Canonical weighted edge enumeration.
    pub fn edges(&self) -> impl Iterator<Item = WeightedEdge> + '_ {
        self.graph.edge_references().map(|e| {
            let a = e.source().index();
            let b = e.target().index();
            WeightedEdge {
                u: a.min(b),
                v: a.max(b),
                weight: *e.weight(),
            }
        })
    }

    /// Canonical `(u, v)` edge keys, the indexing scheme for clash variables.
    pub fn edge_keys(&self) -> Vec<(usize, usize)> {
        let mut keys: Vec<(usize, usize)> = self.edges().map(|e| (e.u, e.v)).collect();
        keys.sort_unstable();
        keys
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.graph
            .find_edge(NodeIndex::new(u), NodeIndex::new(v))
            .is_some()
    }

    pub fn neighbors(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph.neighbors(NodeIndex::new(v)).map(|n| n.index())
    }

    pub fn degree(&self, v: usize) -> usize {
        self.neighbors(v).count()
    }

    /// Minimum vertex degree, `None` for the empty graph.
    pub fn min_degree(&self) -> Option<usize> {
        (0..self.vertex_count()).map(|v| self.degree(v)).min()
    }

    /// True when every edge carries weight 1.0 (the unweighted problem).
    pub fn has_unit_weights(&self) -> bool {
        self.edges().all(|e| (e.weight - 1.0).abs() < 1e-12)
    }

    /// Sum of edge weights.
    pub fn total_weight(&self) -> f64 {
        self.edges().map(|e| e.weight).sum()
    }

    /// The subgraph induced by `vertices`, re-indexed to `0..vertices.len()`.
    ///
    /// Duplicate entries in `vertices` are ignored; the re-indexing follows
    /// the order of first occurrence.
    pub fn induced_subgraph(&self, vertices: &[usize]) -> ClashGraph {
        let mut map = vec![usize::MAX; self.vertex_count()];
        let mut count = 0;
        for &v in vertices {
            if map[v] == usize::MAX {
                map[v] = count;
                count += 1;
            }
        }
        let mut sub = ClashGraph::with_vertices(count);
        for e in self.edges() {
            if map[e.u] != usize::MAX && map[e.v] != usize::MAX {
                sub.add_edge(map[e.u], map[e.v], e.weight);
            }
        }
        sub
    }

    /// Biconnected components as vertex sets (Hopcroft-Tarjan).
    ///
    /// Every edge belongs to exactly one component; isolated vertices belong
    /// to none. A bridge forms a two-vertex component of its own.
    pub fn biconnected_components(&self) -> Vec<Vec<usize>> {
        let n = self.vertex_count();
        let adj: Vec<Vec<usize>> = (0..n).map(|v| self.neighbors(v).collect()).collect();

        const UNSET: usize = usize::MAX;
        let mut disc = vec![UNSET; n];
        let mut low = vec![0usize; n];
        let mut timer = 0usize;
        let mut components = Vec::new();
        let mut edge_stack: Vec<(usize, usize)> = Vec::new();
        // DFS frames: (vertex, parent, next unexplored neighbor index)
        let mut frames: Vec<(usize, Option<usize>, usize)> = Vec::new();

        for start in 0..n {
            if disc[start] != UNSET {
                continue;
            }
            disc[start] = timer;
            low[start] = timer;
            timer += 1;
            frames.push((start, None, 0));

            while let Some(frame) = frames.last_mut() {
                let (v, parent, i) = *frame;
                if i < adj[v].len() {
                    frame.2 += 1;
                    let w = adj[v][i];
                    if Some(w) == parent {
                        continue;
                    }
                    if disc[w] == UNSET {
                        edge_stack.push((v, w));
                        disc[w] = timer;
                        low[w] = timer;
                        timer += 1;
                        frames.push((w, Some(v), 0));
                    } else if disc[w] < disc[v] {
                        // Back edge to an ancestor.
                        edge_stack.push((v, w));
                        low[v] = low[v].min(disc[w]);
                    }
                } else {
                    frames.pop();
                    if let Some(&mut (p, _, _)) = frames.last_mut() {
                        low[p] = low[p].min(low[v]);
                        if low[v] >= disc[p] {
                            // p is an articulation point (or the root); the
                            // edges stacked since (p, v) form one component.
                            let mut members = HashSet::new();
                            while let Some(&(a, b)) = edge_stack.last() {
                                if a == p && b == v {
                                    edge_stack.pop();
                                    members.insert(a);
                                    members.insert(b);
                                    break;
                                }
                                edge_stack.pop();
                                members.insert(a);
                                members.insert(b);
                            }
                            let mut component: Vec<usize> = members.into_iter().collect();
                            component.sort_unstable();
                            components.push(component);
                        }
                    }
                }
            }
        }
        components.sort();
        components
    }

    /// The k-core: the maximal subgraph where every vertex has degree >= k,
    /// obtained by iteratively peeling lower-degree vertices. Re-indexed like
    /// [`induced_subgraph`](Self::induced_subgraph).
    pub fn k_core(&self, k: usize) -> ClashGraph {
        let n = self.vertex_count();
        let mut degree: Vec<usize> = (0..n).map(|v| self.degree(v)).collect();
        let mut alive = vec![true; n];
        let mut queue: Vec<usize> = (0..n).filter(|&v| degree[v] < k).collect();

        while let Some(v) = queue.pop() {
            if !alive[v] {
                continue;
            }
            alive[v] = false;
            for w in self.neighbors(v) {
                if alive[w] {
                    degree[w] -= 1;
                    if degree[w] < k {
                        queue.push(w);
                    }
                }
            }
        }

        let survivors: Vec<usize> = (0..n).filter(|&v| alive[v]).collect();
        self.induced_subgraph(&survivors)
    }

    /// Maximal cliques (Bron-Kerbosch, via petgraph), each a sorted vertex
    /// list, in a deterministic order.
    pub fn maximal_cliques(&self) -> Vec<Vec<usize>> {
        let mut cliques: Vec<Vec<usize>> = maximal_cliques(&self.graph)
            .into_iter()
            .map(|set| {
                let mut clique: Vec<usize> = set.into_iter().map(|n| n.index()).collect();
                clique.sort_unstable();
                clique
            })
            .collect();
        cliques.sort();
        cliques
    }

    /// Largest clique size, `None` when the graph has no vertices.
    pub fn clique_number(&self) -> Option<usize> {
        self.maximal_cliques().iter().map(|c| c.len()).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two triangles sharing vertex 2 ("bowtie").
    fn bowtie() -> ClashGraph {
        ClashGraph::from_edges(5, &[(0, 1), (0, 2), (1, 2), (2, 3), (2, 4), (3, 4)])
    }

    #[test]
    fn edge_keys_are_canonical() {
        let mut g = ClashGraph::with_vertices(3);
        g.add_edge(2, 0, 1.0);
        g.add_edge(1, 2, 1.0);
        assert_eq!(g.edge_keys(), vec![(0, 2), (1, 2)]);
    }

    #[test]
    fn duplicate_edges_collapse_and_self_loops_drop() {
        let mut g = ClashGraph::with_vertices(3);
        g.add_edge(0, 1, 1.0);
        g.add_edge(1, 0, 2.5);
        g.add_edge(2, 2, 1.0);
        assert_eq!(g.edge_count(), 1);
        let e = g.edges().next().unwrap();
        assert_eq!((e.u, e.v), (0, 1));
        assert!((e.weight - 2.5).abs() < 1e-12);
    }

    #[test]
    fn bowtie_has_two_biconnected_components() {
        let comps = bowtie().biconnected_components();
        assert_eq!(comps, vec![vec![0, 1, 2], vec![2, 3, 4]]);
    }

    #[test]
    fn path_splits_into_bridges() {
        let g = ClashGraph::from_edges(4, &[(0, 1), (1, 2), (2, 3)]);
        assert_eq!(
            g.biconnected_components(),
            vec![vec![0, 1], vec![1, 2], vec![2, 3]]
        );
    }

    #[test]
    fn cycle_is_a_single_component() {
        let g = ClashGraph::from_edges(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        assert_eq!(g.biconnected_components(), vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn isolated_vertices_belong_to_no_component() {
        let g = ClashGraph::from_edges(4, &[(0, 1)]);
        assert_eq!(g.biconnected_components(), vec![vec![0, 1]]);
    }

    #[test]
    fn k_core_peels_iteratively() {
        // A triangle with a pendant path; the 2-core is the triangle alone,
        // and peeling must cascade down the path.
        let g = ClashGraph::from_edges(6, &[(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 5)]);
        let core = g.k_core(2);
        assert_eq!(core.vertex_count(), 3);
        assert_eq!(core.edge_count(), 3);
        assert!(g.k_core(3).vertex_count() == 0);
    }

    #[test]
    fn induced_subgraph_reindexes() {
        let sub = bowtie().induced_subgraph(&[2, 3, 4]);
        assert_eq!(sub.vertex_count(), 3);
        assert_eq!(sub.edge_keys(), vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn maximal_cliques_of_bowtie() {
        assert_eq!(
            bowtie().maximal_cliques(),
            vec![vec![0, 1, 2], vec![2, 3, 4]]
        );
        assert_eq!(bowtie().clique_number(), Some(3));
    }

    #[test]
    fn complete_graph_counts() {
        let g = ClashGraph::complete(6);
        assert_eq!(g.vertex_count(), 6);
        assert_eq!(g.edge_count(), 15);
        assert_eq!(g.min_degree(), Some(5));
        assert_eq!(g.clique_number(), Some(6));
        assert!(g.has_unit_weights());
    }
}
