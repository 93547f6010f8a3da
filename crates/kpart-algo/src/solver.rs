//! The exact solution algorithm: decomposition, cut phases, symmetry
//! breaking, branch and bound.
//!
//! [`KppSolver`] composes the pieces in a fixed order per sub-problem:
//! primary (y) cuts on the bare clash relaxation, then for the two-level
//! variant the yz and z families once the secondary variables exist, then
//! assignment variables, projected cuts (single level), optional symmetry
//! breaking, and the final integer solve. Each cut phase completes its own
//! cutting-plane loop and optional pruning before the next begins.
//!
//! Configuration is an explicit record validated at construction; there are
//! no stringly-typed options to mistype.

use std::time::Instant;

use kpart_core::{decompose, ClashGraph};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cutting::run_cutting_plane;
use crate::error::KpartError;
use crate::model::{ModelBuilder, SingleLevelModel, TwoLevelModel};
use crate::report::{
    ComponentReport, CutFamily, CutPhaseReport, KppRunReport, PreprocessReport,
};
use crate::separation::{
    ProjectedCliqueSeparator, SeparationOracle, YCliqueSeparator, YzCliqueSeparator,
    ZCliqueSeparator,
};

/// What to do with the cuts of a phase once its loop has converged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Keep every cut for the remainder of the run.
    #[default]
    Keep,
    /// Drop cuts the final relaxation left slack.
    DropSlack,
    /// Additionally drop cuts with a zero dual value.
    DropSlackOrZeroDual,
}

impl RemovalPolicy {
    fn is_enabled(self) -> bool {
        !matches!(self, RemovalPolicy::Keep)
    }

    fn aggressive(self) -> bool {
        matches!(self, RemovalPolicy::DropSlackOrZeroDual)
    }
}

/// Fully-enumerated configuration of the exact algorithm.
///
/// Cut sizes are the target sub-clique sizes `p` of the corresponding
/// separator family; an empty list disables the phase. The yz and z
/// families apply to two-level solves only, the projected family to
/// single-level solves only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KppSolverConfig {
    /// Decompose the graph into independent sub-problems first.
    pub preprocess: bool,
    pub y_cut_sizes: Vec<usize>,
    pub y_cut_removal: RemovalPolicy,
    pub yz_cut_sizes: Vec<usize>,
    pub yz_cut_removal: RemovalPolicy,
    pub z_cut_sizes: Vec<usize>,
    pub z_cut_removal: RemovalPolicy,
    pub projected_cut_sizes: Vec<usize>,
    /// Class subsets the projected separators restrict to; one separator is
    /// built per (size, subset) pair.
    pub projected_cut_classes: Vec<Vec<usize>>,
    pub projected_cut_removal: RemovalPolicy,
    /// Slack tolerance of the removal passes.
    pub removal_slack: f64,
    pub symmetry_breaking: bool,
    /// Round a fractional y-phase bound up to the next integer.
    pub fractional_y_cut: bool,
}

impl Default for KppSolverConfig {
    fn default() -> Self {
        Self {
            preprocess: false,
            y_cut_sizes: Vec::new(),
            y_cut_removal: RemovalPolicy::Keep,
            yz_cut_sizes: Vec::new(),
            yz_cut_removal: RemovalPolicy::Keep,
            z_cut_sizes: Vec::new(),
            z_cut_removal: RemovalPolicy::Keep,
            projected_cut_sizes: Vec::new(),
            projected_cut_classes: Vec::new(),
            projected_cut_removal: RemovalPolicy::Keep,
            removal_slack: 1e-3,
            symmetry_breaking: false,
            fractional_y_cut: false,
        }
    }
}

impl KppSolverConfig {
    fn validate(&self) -> Result<(), KpartError> {
        if !self.removal_slack.is_finite() || self.removal_slack < 0.0 {
            return Err(KpartError::Config(format!(
                "removal slack must be a non-negative number, got {}",
                self.removal_slack
            )));
        }
        for &p in self
            .y_cut_sizes
            .iter()
            .chain(&self.yz_cut_sizes)
            .chain(&self.z_cut_sizes)
            .chain(&self.projected_cut_sizes)
        {
            if p < 2 {
                return Err(KpartError::Config(format!(
                    "clique size {p} cannot carry an inequality"
                )));
            }
        }
        if !self.projected_cut_sizes.is_empty() && self.projected_cut_classes.is_empty() {
            return Err(KpartError::Config(
                "projected cuts need at least one class subset".into(),
            ));
        }
        Ok(())
    }
}

/// Exact KPP solver over a validated configuration.
#[derive(Debug, Clone)]
pub struct KppSolver {
    config: KppSolverConfig,
}

impl KppSolver {
    /// Validate the configuration eagerly; bad options never reach a solve.
    pub fn new(config: KppSolverConfig) -> Result<Self, KpartError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &KppSolverConfig {
        &self.config
    }

    /// Solve the single-level problem with `k` classes.
    pub fn solve(&self, graph: &ClashGraph, k: usize) -> Result<KppRunReport, KpartError> {
        if k < 1 {
            return Err(KpartError::Config("need at least one class".into()));
        }
        if !self.config.yz_cut_sizes.is_empty() || !self.config.z_cut_sizes.is_empty() {
            return Err(KpartError::Config(
                "yz and z cut families apply to two-level solves only".into(),
            ));
        }
        for subset in &self.config.projected_cut_classes {
            if subset.iter().any(|&c| c >= k) {
                return Err(KpartError::Config(format!(
                    "projected class subset {subset:?} exceeds k = {k}"
                )));
            }
        }
        self.run(graph, k, |g| self.solve_single_component(g, k))
    }

    /// Solve the two-level problem with `k * k2` fine classes.
    pub fn solve_two_level(
        &self,
        graph: &ClashGraph,
        k: usize,
        k2: usize,
    ) -> Result<KppRunReport, KpartError> {
        if k < 1 || k2 < 1 {
            return Err(KpartError::Config(
                "need at least one class per level".into(),
            ));
        }
        if !self.config.projected_cut_sizes.is_empty() {
            return Err(KpartError::Config(
                "projected cuts apply to single-level solves only".into(),
            ));
        }
        // The parity bound behind the yz inequality is derived for exactly
        // two subclasses per coarse group; with any other k2 the cut is not
        // valid.
        if !self.config.yz_cut_sizes.is_empty() && k2 != 2 {
            return Err(KpartError::Config(format!(
                "yz cuts require k2 = 2, got k2 = {k2}"
            )));
        }
        self.run(graph, k, |g| self.solve_two_level_component(g, k, k2))
    }

    fn run<F>(
        &self,
        graph: &ClashGraph,
        k: usize,
        solve_component: F,
    ) -> Result<KppRunReport, KpartError>
    where
        F: Fn(&ClashGraph) -> Result<ComponentReport, KpartError>,
    {
        info!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            k,
            "solving k-partition problem"
        );
        if !self.config.preprocess {
            return Ok(KppRunReport {
                preprocess: None,
                components: vec![solve_component(graph)?],
            });
        }

        let start = Instant::now();
        let parts = decompose(graph, k);
        let preprocess = PreprocessReport {
            elapsed: start.elapsed(),
            components: parts.len(),
            largest_component: parts.iter().map(|g| g.vertex_count()).max().unwrap_or(0),
        };
        info!(
            components = preprocess.components,
            largest = preprocess.largest_component,
            "graph decomposition complete"
        );

        let mut components = Vec::with_capacity(parts.len());
        for (index, part) in parts.iter().enumerate() {
            debug!(
                component = index,
                vertices = part.vertex_count(),
                edges = part.edge_count(),
                "solving component"
            );
            components.push(solve_component(part)?);
        }
        Ok(KppRunReport {
            preprocess: Some(preprocess),
            components,
        })
    }

    fn run_phase<M: ModelBuilder>(
        &self,
        model: &mut M,
        oracles: Vec<Box<dyn SeparationOracle>>,
        family: CutFamily,
        removal: RemovalPolicy,
        fractional: bool,
    ) -> Result<CutPhaseReport, KpartError> {
        let start = Instant::now();
        let stats = run_cutting_plane(model, &oracles)?;
        let fractional_cut = if fractional {
            model.add_fractional_cut()?
        } else {
            false
        };
        let removed = if removal.is_enabled() {
            model.remove_redundant_constraints(removal.aggressive(), self.config.removal_slack)?
        } else {
            0
        };
        Ok(CutPhaseReport {
            family,
            added: stats.added,
            removed,
            iterations: stats.iterations,
            lower_bound: stats.lower_bound,
            elapsed: start.elapsed(),
            fractional_cut,
        })
    }

    fn solve_single_component(
        &self,
        graph: &ClashGraph,
        k: usize,
    ) -> Result<ComponentReport, KpartError> {
        let config = &self.config;
        let needs_cliques =
            !config.y_cut_sizes.is_empty() || !config.projected_cut_sizes.is_empty();
        let max_cliques = needs_cliques.then(|| graph.maximal_cliques());
        let clique_number = max_cliques
            .as_ref()
            .and_then(|cliques| cliques.iter().map(|c| c.len()).max());

        let mut model = SingleLevelModel::new(graph, k);
        let mut phases = Vec::new();

        if let Some(cliques) = &max_cliques {
            if !config.y_cut_sizes.is_empty() {
                let oracles: Vec<Box<dyn SeparationOracle>> = config
                    .y_cut_sizes
                    .iter()
                    .map(|&p| {
                        Box::new(YCliqueSeparator::new(cliques, p, k))
                            as Box<dyn SeparationOracle>
                    })
                    .collect();
                phases.push(self.run_phase(
                    &mut model,
                    oracles,
                    CutFamily::Y,
                    config.y_cut_removal,
                    config.fractional_y_cut,
                )?);
            }
        }

        model.add_assignment_variables()?;

        if let Some(cliques) = &max_cliques {
            if !config.projected_cut_sizes.is_empty() {
                let oracles: Vec<Box<dyn SeparationOracle>> = config
                    .projected_cut_sizes
                    .iter()
                    .flat_map(|&p| {
                        config.projected_cut_classes.iter().map(move |classes| {
                            Box::new(ProjectedCliqueSeparator::new(
                                cliques,
                                p,
                                k,
                                classes.clone(),
                            )) as Box<dyn SeparationOracle>
                        })
                    })
                    .collect();
                phases.push(self.run_phase(
                    &mut model,
                    oracles,
                    CutFamily::Projected,
                    config.projected_cut_removal,
                    false,
                )?);
            }
        }

        if config.symmetry_breaking {
            model.break_symmetry()?;
        }

        let solve = model.solve()?;
        Ok(ComponentReport {
            vertices: graph.vertex_count(),
            edges: graph.edge_count(),
            clique_number,
            phases,
            solve,
        })
    }

    fn solve_two_level_component(
        &self,
        graph: &ClashGraph,
        k: usize,
        k2: usize,
    ) -> Result<ComponentReport, KpartError> {
        let config = &self.config;
        let needs_cliques = !config.y_cut_sizes.is_empty()
            || !config.yz_cut_sizes.is_empty()
            || !config.z_cut_sizes.is_empty();
        let max_cliques = needs_cliques.then(|| graph.maximal_cliques());
        let clique_number = max_cliques
            .as_ref()
            .and_then(|cliques| cliques.iter().map(|c| c.len()).max());

        let mut model = TwoLevelModel::new(graph, k, k2);
        let mut phases = Vec::new();

        if let Some(cliques) = &max_cliques {
            if !config.y_cut_sizes.is_empty() {
                let oracles: Vec<Box<dyn SeparationOracle>> = config
                    .y_cut_sizes
                    .iter()
                    .map(|&p| {
                        Box::new(YCliqueSeparator::new(cliques, p, k))
                            as Box<dyn SeparationOracle>
                    })
                    .collect();
                phases.push(self.run_phase(
                    &mut model,
                    oracles,
                    CutFamily::Y,
                    config.y_cut_removal,
                    config.fractional_y_cut,
                )?);
            }
        }

        model.add_secondary_clash_variables()?;

        if let Some(cliques) = &max_cliques {
            if !config.yz_cut_sizes.is_empty() {
                let oracles: Vec<Box<dyn SeparationOracle>> = config
                    .yz_cut_sizes
                    .iter()
                    .map(|&p| {
                        Box::new(YzCliqueSeparator::new(cliques, p))
                            as Box<dyn SeparationOracle>
                    })
                    .collect();
                phases.push(self.run_phase(
                    &mut model,
                    oracles,
                    CutFamily::Yz,
                    config.yz_cut_removal,
                    false,
                )?);
            }
            if !config.z_cut_sizes.is_empty() {
                let oracles: Vec<Box<dyn SeparationOracle>> = config
                    .z_cut_sizes
                    .iter()
                    .map(|&p| {
                        Box::new(ZCliqueSeparator::new(cliques, p, k * k2))
                            as Box<dyn SeparationOracle>
                    })
                    .collect();
                phases.push(self.run_phase(
                    &mut model,
                    oracles,
                    CutFamily::Z,
                    config.z_cut_removal,
                    false,
                )?);
            }
        }

        model.add_assignment_variables()?;
        if config.symmetry_breaking {
            model.break_symmetry()?;
        }

        let solve = model.solve()?;
        Ok(ComponentReport {
            vertices: graph.vertex_count(),
            edges: graph.edge_count(),
            clique_number,
            phases,
            solve,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(KppSolver::new(KppSolverConfig::default()).is_ok());
    }

    #[test]
    fn negative_removal_slack_is_rejected() {
        let config = KppSolverConfig {
            removal_slack: -1.0,
            ..KppSolverConfig::default()
        };
        assert!(matches!(
            KppSolver::new(config),
            Err(KpartError::Config(_))
        ));
    }

    #[test]
    fn degenerate_clique_sizes_are_rejected() {
        let config = KppSolverConfig {
            y_cut_sizes: vec![4, 1],
            ..KppSolverConfig::default()
        };
        assert!(matches!(
            KppSolver::new(config),
            Err(KpartError::Config(_))
        ));
    }

    #[test]
    fn projected_cuts_require_class_subsets() {
        let config = KppSolverConfig {
            projected_cut_sizes: vec![4],
            ..KppSolverConfig::default()
        };
        assert!(matches!(
            KppSolver::new(config),
            Err(KpartError::Config(_))
        ));
    }

    #[test]
    fn two_level_families_are_rejected_on_single_level_solves() {
        let config = KppSolverConfig {
            z_cut_sizes: vec![6],
            ..KppSolverConfig::default()
        };
        let solver = KppSolver::new(config).unwrap();
        assert!(matches!(
            solver.solve(&ClashGraph::complete(4), 3),
            Err(KpartError::Config(_))
        ));
    }

    #[test]
    fn yz_cuts_demand_two_subclasses_per_group() {
        let config = KppSolverConfig {
            yz_cut_sizes: vec![4],
            ..KppSolverConfig::default()
        };
        let solver = KppSolver::new(config).unwrap();
        assert!(matches!(
            solver.solve_two_level(&ClashGraph::complete(4), 3, 3),
            Err(KpartError::Config(_))
        ));
    }

    #[test]
    fn projected_class_subsets_must_fit_k() {
        let config = KppSolverConfig {
            projected_cut_sizes: vec![4],
            projected_cut_classes: vec![vec![0, 3]],
            ..KppSolverConfig::default()
        };
        let solver = KppSolver::new(config).unwrap();
        assert!(matches!(
            solver.solve(&ClashGraph::complete(4), 3),
            Err(KpartError::Config(_))
        ));
    }
}
