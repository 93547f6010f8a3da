//! # kpart-algo: Exact Graph k-Partition Solving
//!
//! This crate provides the branch-and-cut machinery for the k-partition
//! problem (KPP): assign the vertices of a graph to k classes minimising the
//! weighted number of *clashing* edges (endpoints sharing a class), exactly,
//! via an LP/IP formulation tightened with clique cutting planes.
//!
//! ## Architecture
//!
//! | Component | Role |
//! |-----------|------|
//! | [`SingleLevelModel`] / [`TwoLevelModel`] | Map an instance onto a solver model (variables, linkage rows) |
//! | [`ModelBuilder`] | Capability interface the engine and orchestrator drive variants through |
//! | [`YCliqueSeparator`], [`ZCliqueSeparator`], [`YzCliqueSeparator`], [`ProjectedCliqueSeparator`] | Detect violated clique inequalities in a fractional solution |
//! | [`run_cutting_plane`] | Alternate relaxation solves and separation until no violation remains |
//! | [`KppSolver`] | Decomposition, cut phases, symmetry breaking, final solve, report assembly |
//!
//! Relaxations solve on the Clarabel backend, the final branch and bound on
//! HiGHS, both through `good_lp`. Graphs come from
//! [`kpart_core`](kpart_core).
//!
//! ## Example
//!
//! ```no_run
//! use kpart_algo::{KppSolver, KppSolverConfig};
//! use kpart_core::ClashGraph;
//!
//! let graph = ClashGraph::complete(6);
//! let config = KppSolverConfig {
//!     preprocess: true,
//!     y_cut_sizes: vec![4, 5],
//!     ..KppSolverConfig::default()
//! };
//! let report = KppSolver::new(config)?.solve(&graph, 3)?;
//! println!("optimum: {:?}", report.objective());
//! # Ok::<(), kpart_algo::KpartError>(())
//! ```

pub mod cutting;
pub mod error;
pub mod model;
pub mod report;
pub mod separation;
pub mod solver;

pub use cutting::{run_cutting_plane, CutLoopStats};
pub use error::KpartError;
pub use model::{
    CutConstraint, FractionalSolution, ModelBuilder, ModelCore, ModelState, Sense,
    SingleLevelModel, TwoLevelModel,
};
pub use report::{
    ComponentReport, CutFamily, CutPhaseReport, KppRunReport, PreprocessReport, SolveReport,
    SolveStatus,
};
pub use separation::{
    clique_rhs, yz_clique_rhs, ProjectedCliqueSeparator, SeparationOracle, YCliqueSeparator,
    YzCliqueSeparator, ZCliqueSeparator,
};
pub use solver::{KppSolver, KppSolverConfig, RemovalPolicy};
