//! # kpart-core: Clash Graph Modeling Core
//!
//! Provides the graph model and structural preprocessing for the k-partition
//! problem (KPP): partition the vertices of a graph into k classes minimising
//! the weighted number of *clashing* edges (edges whose endpoints land in the
//! same class).
//!
//! ## Design Philosophy
//!
//! Graphs are modeled as **undirected simple graphs** ([`ClashGraph`], a thin
//! wrapper over a petgraph `UnGraph`) with:
//! - Contiguous `usize` vertex ids and canonical `(u, v)` edge keys with `u < v`
//! - Weighted edges (weight 1.0 for the unweighted problem)
//! - Derived structural queries: biconnected components, k-cores, maximal
//!   cliques
//!
//! ## Preprocessing
//!
//! The [`decompose`] function splits a graph into independent KPP
//! sub-problems whose optimal clash counts sum to the optimum of the whole
//! graph:
//! - Biconnected-component splitting (clash structure never crosses a cut
//!   vertex)
//! - k-core peeling (vertices of degree below k never force a clash)
//!
//! ## Quick Start
//!
//! ```rust
//! use kpart_core::{decompose, ClashGraph};
//!
//! // Two triangles joined at vertex 2 decompose into two sub-problems.
//! let graph = ClashGraph::from_edges(5, &[(0, 1), (0, 2), (1, 2), (2, 3), (2, 4), (3, 4)]);
//! let components = decompose(&graph, 2);
//! assert_eq!(components.len(), 2);
//! ```

pub mod decompose;
pub mod generate;
pub mod graph;
pub mod test_utils;

pub use decompose::{decompose, summarize_decomposition, DecompositionSummary};
pub use generate::{disk_graph, neighbors_of_neighbors, random_geometric_graph};
pub use graph::{ClashGraph, WeightedEdge};
