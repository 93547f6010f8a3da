//! The cutting-plane loop.
//!
//! Alternates relaxation solves with separation until no oracle finds a
//! violated inequality. All cuts found in one iteration are added together;
//! the loop converges because every added cut excludes the fractional point
//! it was separated from.

use tracing::{debug, info};

use crate::error::KpartError;
use crate::model::{ModelBuilder, ModelState};
use crate::separation::SeparationOracle;

/// Outcome of one cutting-plane run.
#[derive(Debug, Clone, Copy)]
pub struct CutLoopStats {
    /// Relaxation solves performed (at least one).
    pub iterations: usize,
    /// Cuts added across the run.
    pub added: usize,
    /// Objective of the final (violation-free) relaxation; a valid lower
    /// bound on the integer optimum.
    pub lower_bound: f64,
}

/// Run the cutting-plane loop on `model` with the given oracles.
///
/// Must be called while the model still has a linear relaxation; once the
/// assignment variables are discretized this is a sequencing error.
pub fn run_cutting_plane<M>(
    model: &mut M,
    oracles: &[Box<dyn SeparationOracle>],
) -> Result<CutLoopStats, KpartError>
where
    M: ModelBuilder + ?Sized,
{
    let core = model.core_mut();
    if matches!(core.state(), ModelState::Discretized | ModelState::Solved) {
        return Err(KpartError::CutAfterDiscretize);
    }

    let mut iterations = 0usize;
    let mut added = 0usize;
    loop {
        iterations += 1;
        let objective = core.solve_relaxation()?;
        debug!(iterations, objective, "relaxation solved");

        let new_cuts = {
            let solution = core.fractional_solution()?;
            let mut cuts = Vec::new();
            for oracle in oracles {
                cuts.extend(oracle.find_violated_constraints(solution));
            }
            cuts
        };

        if new_cuts.is_empty() {
            info!(added, iterations, "cutting plane loop converged");
            return Ok(CutLoopStats {
                iterations,
                added,
                lower_bound: objective,
            });
        }
        added += new_cuts.len();
        for cut in &new_cuts {
            core.add_constraint(cut)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use kpart_core::ClashGraph;

    use super::*;
    use crate::model::SingleLevelModel;
    use crate::separation::YCliqueSeparator;

    #[test]
    fn loop_without_oracles_solves_once_and_stops() {
        let mut model = SingleLevelModel::new(&ClashGraph::complete(4), 3);
        let stats = run_cutting_plane(&mut model, &[]).unwrap();
        assert_eq!(stats.iterations, 1);
        assert_eq!(stats.added, 0);
        assert!(stats.lower_bound.abs() < 1e-6);
    }

    #[test]
    fn clique_cuts_lift_the_bound_until_convergence() {
        let graph = ClashGraph::complete(4);
        let mut model = SingleLevelModel::new(&graph, 3);
        let oracles: Vec<Box<dyn SeparationOracle>> =
            vec![Box::new(YCliqueSeparator::new(&graph.maximal_cliques(), 4, 3))];
        let stats = run_cutting_plane(&mut model, &oracles).unwrap();
        assert!(stats.added >= 1);
        // clique_rhs(4, 3) = 1 is the exact lower bound here.
        assert!((stats.lower_bound - 1.0).abs() < 1e-5);
        // A second run finds nothing new.
        let again = run_cutting_plane(&mut model, &oracles).unwrap();
        assert_eq!(again.added, 0);
    }

    #[test]
    fn cutting_after_discretization_is_rejected() {
        let mut model = SingleLevelModel::new(&ClashGraph::complete(3), 2);
        model.add_assignment_variables().unwrap();
        model.discretize().unwrap();
        assert!(matches!(
            run_cutting_plane(&mut model, &[]),
            Err(KpartError::CutAfterDiscretize)
        ));
    }
}
