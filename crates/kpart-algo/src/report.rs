//! Structured run reports.
//!
//! Results are assembled once per run and returned immutably; there is no
//! free-form accumulation across phases. Reports serialize cleanly so
//! drivers can emit them as JSON.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Status of the final branch-and-bound solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Optimal solution found and proven.
    Optimal,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
}

impl SolveStatus {
    /// Check if this status represents a successful solve.
    pub fn is_success(&self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::Infeasible => write!(f, "infeasible"),
            SolveStatus::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Outcome of a branch-and-bound solve.
///
/// Check `status` before trusting `objective`: a non-optimal solve carries
/// no objective value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveReport {
    pub status: SolveStatus,
    pub objective: Option<f64>,
    /// Relative optimality gap, when the backend proves one.
    pub gap: Option<f64>,
    pub elapsed: Duration,
    /// Whether any feasible incumbent was found.
    pub incumbent: bool,
}

/// The separation family a cut phase ran with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutFamily {
    Y,
    Yz,
    Z,
    Projected,
}

impl fmt::Display for CutFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutFamily::Y => write!(f, "y"),
            CutFamily::Yz => write!(f, "yz"),
            CutFamily::Z => write!(f, "z"),
            CutFamily::Projected => write!(f, "projected"),
        }
    }
}

/// Statistics of one completed cutting-plane phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutPhaseReport {
    pub family: CutFamily,
    /// Cuts added across the phase's cutting-plane loop.
    pub added: usize,
    /// Cuts pruned again by the phase's removal pass.
    pub removed: usize,
    /// Relaxation solves performed.
    pub iterations: usize,
    /// Lower bound on the integer optimum after the phase.
    pub lower_bound: f64,
    pub elapsed: Duration,
    /// Whether the phase rounded a fractional bound up.
    pub fractional_cut: bool,
}

/// Statistics of the decomposition preprocessing step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessReport {
    pub elapsed: Duration,
    pub components: usize,
    pub largest_component: usize,
}

/// Per-sub-problem results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentReport {
    pub vertices: usize,
    pub edges: usize,
    /// Largest maximal clique, when a cut phase needed the clique set.
    pub clique_number: Option<usize>,
    pub phases: Vec<CutPhaseReport>,
    pub solve: SolveReport,
}

/// Aggregated result of a full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KppRunReport {
    pub preprocess: Option<PreprocessReport>,
    pub components: Vec<ComponentReport>,
}

impl KppRunReport {
    /// Sum of component objectives, available only when every component
    /// solved to proven optimality. An empty decomposition is optimally
    /// zero.
    pub fn objective(&self) -> Option<f64> {
        if !self.is_optimal() {
            return None;
        }
        Some(
            self.components
                .iter()
                .filter_map(|c| c.solve.objective)
                .sum(),
        )
    }

    pub fn is_optimal(&self) -> bool {
        self.components.iter().all(|c| c.solve.status.is_success())
    }

    /// Cuts added across all components and phases.
    pub fn total_cuts_added(&self) -> usize {
        self.components
            .iter()
            .flat_map(|c| c.phases.iter())
            .map(|p| p.added)
            .sum()
    }

    /// Total branch-and-bound time across components.
    pub fn solve_time(&self) -> Duration {
        self.components.iter().map(|c| c.solve.elapsed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optimal_component(objective: f64) -> ComponentReport {
        ComponentReport {
            vertices: 4,
            edges: 6,
            clique_number: Some(4),
            phases: Vec::new(),
            solve: SolveReport {
                status: SolveStatus::Optimal,
                objective: Some(objective),
                gap: Some(0.0),
                elapsed: Duration::from_millis(5),
                incumbent: true,
            },
        }
    }

    #[test]
    fn empty_run_is_optimally_zero() {
        let report = KppRunReport {
            preprocess: None,
            components: Vec::new(),
        };
        assert!(report.is_optimal());
        assert_eq!(report.objective(), Some(0.0));
    }

    #[test]
    fn objectives_sum_over_components() {
        let report = KppRunReport {
            preprocess: None,
            components: vec![optimal_component(1.0), optimal_component(2.5)],
        };
        assert_eq!(report.objective(), Some(3.5));
    }

    #[test]
    fn non_optimal_components_withhold_the_objective() {
        let mut bad = optimal_component(1.0);
        bad.solve.status = SolveStatus::Infeasible;
        bad.solve.objective = None;
        let report = KppRunReport {
            preprocess: None,
            components: vec![optimal_component(1.0), bad],
        };
        assert!(!report.is_optimal());
        assert_eq!(report.objective(), None);
    }

    #[test]
    fn reports_serialize_to_json() {
        let report = KppRunReport {
            preprocess: Some(PreprocessReport {
                elapsed: Duration::from_millis(1),
                components: 1,
                largest_component: 4,
            }),
            components: vec![optimal_component(1.0)],
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"optimal\""));
    }
}
