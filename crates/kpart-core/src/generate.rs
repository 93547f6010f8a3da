//! Random graph generation for drivers and tests.
//!
//! Random geometric graphs are the standard benchmark family for clash-style
//! partitioning: points scattered in the unit square, joined whenever they
//! fall within a radius of one another, optionally with wrap-around (torus)
//! distance. The second-order augmentation joins each vertex to the
//! neighbors of its neighbors, densifying an instance while keeping its
//! geometric structure.

use rand::Rng;

use crate::graph::ClashGraph;

fn torus_hypot(mut dx: f64, mut dy: f64) -> f64 {
    dx = dx.abs();
    dy = dy.abs();
    if dx > 0.5 {
        dx = 1.0 - dx;
    }
    if dy > 0.5 {
        dy = 1.0 - dy;
    }
    dx.hypot(dy)
}

/// Connect every pair of points within `radius` of each other.
pub fn disk_graph(points: &[(f64, f64)], radius: f64, torus: bool) -> ClashGraph {
    let mut g = ClashGraph::with_vertices(points.len());
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let dx = points[i].0 - points[j].0;
            let dy = points[i].1 - points[j].1;
            let dist = if torus {
                torus_hypot(dx, dy)
            } else {
                dx.hypot(dy)
            };
            if dist < radius {
                g.add_edge(i, j, 1.0);
            }
        }
    }
    g
}

/// Random geometric graph: `n` uniform points in the unit square, joined
/// within `radius`.
pub fn random_geometric_graph<R: Rng>(
    n: usize,
    radius: f64,
    torus: bool,
    rng: &mut R,
) -> ClashGraph {
    let points: Vec<(f64, f64)> = (0..n).map(|_| (rng.gen::<f64>(), rng.gen::<f64>())).collect();
    disk_graph(&points, radius, torus)
}

/// Second-order augmentation: additionally join each vertex to every vertex
/// at distance exactly two in the input graph.
pub fn neighbors_of_neighbors(graph: &ClashGraph) -> ClashGraph {
    let mut g = graph.clone();
    for i in 0..graph.vertex_count() {
        let direct: Vec<usize> = graph.neighbors(i).collect();
        for &j in &direct {
            for l in graph.neighbors(j) {
                if l > i && !direct.contains(&l) {
                    g.add_edge(i, l, 1.0);
                }
            }
        }
    }
    g
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn seeded_generation_is_deterministic() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let g1 = random_geometric_graph(30, 0.2, false, &mut a);
        let g2 = random_geometric_graph(30, 0.2, false, &mut b);
        assert_eq!(g1.edge_keys(), g2.edge_keys());
    }

    #[test]
    fn radius_grows_edge_count() {
        let points: Vec<(f64, f64)> = (0..20)
            .map(|i| (0.05 * i as f64, (0.07 * i as f64) % 1.0))
            .collect();
        let sparse = disk_graph(&points, 0.1, false);
        let dense = disk_graph(&points, 0.4, false);
        assert!(sparse.edge_count() <= dense.edge_count());
    }

    #[test]
    fn torus_wraps_around() {
        let points = vec![(0.02, 0.5), (0.98, 0.5)];
        assert_eq!(disk_graph(&points, 0.1, false).edge_count(), 0);
        assert_eq!(disk_graph(&points, 0.1, true).edge_count(), 1);
    }

    #[test]
    fn second_order_augmentation_adds_path_shortcuts() {
        let path = ClashGraph::from_edges(3, &[(0, 1), (1, 2)]);
        let g = neighbors_of_neighbors(&path);
        assert!(g.has_edge(0, 2));
        assert_eq!(g.edge_count(), 3);
    }
}
