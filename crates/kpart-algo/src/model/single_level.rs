//! Single-level partition model: k classes, one clash granularity.

use kpart_core::ClashGraph;

use crate::error::KpartError;
use crate::model::{ModelBuilder, ModelCore, Sense};

/// Partition into `k` classes minimising the weighted clash count.
///
/// Owns one solver model. The clash variables `y[u,v]` exist from
/// construction so cutting-plane phases can run before the assignment
/// variables are created.
#[derive(Debug)]
pub struct SingleLevelModel {
    core: ModelCore,
    k: usize,
}

impl SingleLevelModel {
    pub fn new(graph: &ClashGraph, k: usize) -> Self {
        assert!(k >= 1, "need at least one class");
        Self {
            core: ModelCore::new(graph),
            k,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

impl ModelBuilder for SingleLevelModel {
    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn num_classes(&self) -> usize {
        self.k
    }

    fn add_assignment_variables(&mut self) -> Result<(), KpartError> {
        self.core.ensure_accepts_assignment()?;
        let n = self.core.graph().vertex_count();
        for i in 0..n {
            for c in 0..self.k {
                self.core.add_x_variable(i, c);
            }
        }

        // Exactly one class per vertex.
        for i in 0..n {
            let terms: Vec<(usize, f64)> = (0..self.k)
                .map(|c| (self.core.x_id(i, c).unwrap(), 1.0))
                .collect();
            self.core.push_structural(terms, Sense::Eq, 1.0);
        }

        // Linearization of "same class <=> clash" per edge and class:
        //   y >= x_u + x_v - 1,  x_u >= x_v + y - 1,  x_v >= x_u + y - 1.
        let keys = self.core.graph().edge_keys();
        for (u, v) in keys {
            let y = self.core.y_id((u, v)).unwrap();
            for c in 0..self.k {
                let xu = self.core.x_id(u, c).unwrap();
                let xv = self.core.x_id(v, c).unwrap();
                self.core
                    .push_structural(vec![(y, 1.0), (xu, -1.0), (xv, -1.0)], Sense::Geq, -1.0);
                self.core
                    .push_structural(vec![(xu, 1.0), (xv, -1.0), (y, -1.0)], Sense::Geq, -1.0);
                self.core
                    .push_structural(vec![(xv, 1.0), (xu, -1.0), (y, -1.0)], Sense::Geq, -1.0);
            }
        }
        self.core.mark_assignment_added();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CutConstraint, ModelState};

    #[test]
    fn relaxation_without_cuts_is_trivially_zero() {
        let mut model = SingleLevelModel::new(&ClashGraph::complete(3), 2);
        let objective = model.relax().unwrap();
        assert!(objective.abs() < 1e-6);
    }

    #[test]
    fn a_clique_cut_lifts_the_relaxation() {
        let mut model = SingleLevelModel::new(&ClashGraph::complete(3), 2);
        model
            .add_constraint(&CutConstraint {
                x_terms: vec![],
                y_terms: vec![((0, 1), 1.0), ((0, 2), 1.0), ((1, 2), 1.0)],
                z_terms: vec![],
                sense: Sense::Geq,
                rhs: 1.0,
            })
            .unwrap();
        let objective = model.relax().unwrap();
        assert!((objective - 1.0).abs() < 1e-6);
    }

    #[test]
    fn tight_cuts_survive_removal_and_loose_cuts_do_not() {
        let mut model = SingleLevelModel::new(&ClashGraph::complete(3), 2);
        // Tight at the optimum (sum y = 1) and strictly slack (sum y >= 0.25).
        model
            .add_constraint(&CutConstraint {
                x_terms: vec![],
                y_terms: vec![((0, 1), 1.0), ((0, 2), 1.0), ((1, 2), 1.0)],
                z_terms: vec![],
                sense: Sense::Geq,
                rhs: 1.0,
            })
            .unwrap();
        model
            .add_constraint(&CutConstraint {
                x_terms: vec![],
                y_terms: vec![((0, 1), 1.0), ((0, 2), 1.0), ((1, 2), 1.0)],
                z_terms: vec![],
                sense: Sense::Geq,
                rhs: 0.25,
            })
            .unwrap();
        model.relax().unwrap();
        let removed = model.remove_redundant_constraints(false, 1e-3).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(model.core().num_cuts(), 1);
    }

    #[test]
    fn constraint_on_missing_variables_is_rejected() {
        let mut model = SingleLevelModel::new(&ClashGraph::complete(3), 2);
        let err = model
            .add_constraint(&CutConstraint {
                x_terms: vec![((0, 0), 1.0)],
                y_terms: vec![],
                z_terms: vec![],
                sense: Sense::Geq,
                rhs: 1.0,
            })
            .unwrap_err();
        assert!(matches!(err, KpartError::MissingVariable { .. }));
    }

    #[test]
    fn assignment_variables_cannot_be_added_twice() {
        let mut model = SingleLevelModel::new(&ClashGraph::complete(3), 2);
        model.add_assignment_variables().unwrap();
        assert!(matches!(
            model.add_assignment_variables(),
            Err(KpartError::AssignmentVariablesExist)
        ));
    }

    #[test]
    fn discretization_is_one_way() {
        let mut model = SingleLevelModel::new(&ClashGraph::complete(3), 2);
        assert!(matches!(
            model.discretize(),
            Err(KpartError::AssignmentVariablesMissing)
        ));
        model.add_assignment_variables().unwrap();
        model.discretize().unwrap();
        assert_eq!(model.core().state(), ModelState::Discretized);
        assert!(matches!(
            model.discretize(),
            Err(KpartError::AlreadyDiscretized)
        ));
        // The relaxation (and with it the cutting loop) is now off limits.
        assert!(matches!(
            model.relax(),
            Err(KpartError::AlreadyDiscretized)
        ));
    }

    #[test]
    fn fractional_cut_needs_a_relaxation_first() {
        let mut model = SingleLevelModel::new(&ClashGraph::complete(3), 2);
        assert!(matches!(
            model.add_fractional_cut(),
            Err(KpartError::NoRelaxation)
        ));
    }

    #[test]
    fn fractional_cut_rounds_up_a_fractional_bound() {
        let mut model = SingleLevelModel::new(&ClashGraph::complete(3), 2);
        model
            .add_constraint(&CutConstraint {
                x_terms: vec![],
                y_terms: vec![((0, 1), 1.0), ((0, 2), 1.0), ((1, 2), 1.0)],
                z_terms: vec![],
                sense: Sense::Geq,
                rhs: 0.5,
            })
            .unwrap();
        let structural_before = model.core().num_structural_constraints();
        model.relax().unwrap();
        assert!(model.add_fractional_cut().unwrap());
        assert_eq!(
            model.core().num_structural_constraints(),
            structural_before + 1
        );
        // The strengthened relaxation now meets the rounded bound.
        let objective = model.relax().unwrap();
        assert!((objective - 1.0).abs() < 1e-6);
    }

    #[test]
    fn symmetry_breaking_needs_assignment_variables() {
        let mut model = SingleLevelModel::new(&ClashGraph::complete(4), 2);
        assert!(matches!(
            model.break_symmetry(),
            Err(KpartError::AssignmentVariablesMissing)
        ));
        model.add_assignment_variables().unwrap();
        let before = model.core().num_structural_constraints();
        model.break_symmetry().unwrap();
        assert_eq!(model.core().num_structural_constraints(), before + 1);
    }

    #[test]
    fn symmetry_breaking_degrades_to_a_noop_on_small_graphs() {
        let mut model = SingleLevelModel::new(&ClashGraph::complete(3), 3);
        model.add_assignment_variables().unwrap();
        let before = model.core().num_structural_constraints();
        model.break_symmetry().unwrap();
        assert_eq!(model.core().num_structural_constraints(), before);
    }
}
