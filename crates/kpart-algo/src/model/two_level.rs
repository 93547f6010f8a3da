//! Two-level partition model: clashes at two granularities.
//!
//! Vertices are assigned to `k * k2` fine classes. The primary clash `y`
//! fires when both endpoints of an edge land in the same residue class mod
//! `k` (the coarse grouping); the secondary clash `z` fires when they share
//! the full fine class. The objective counts both, so an optimal solution
//! first avoids coarse clashes and then spreads within coarse groups.

use kpart_core::ClashGraph;

use crate::error::KpartError;
use crate::model::{ModelBuilder, ModelCore, Sense};

/// Partition into `k * k2` classes with clashes at granularity `k` (primary)
/// and `k * k2` (secondary).
#[derive(Debug)]
pub struct TwoLevelModel {
    core: ModelCore,
    k: usize,
    k2: usize,
}

impl TwoLevelModel {
    pub fn new(graph: &ClashGraph, k: usize, k2: usize) -> Self {
        assert!(k >= 1 && k2 >= 1, "need at least one class per level");
        Self {
            core: ModelCore::new(graph),
            k,
            k2,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn k2(&self) -> usize {
        self.k2
    }

    /// Create the `z[u,v]` family. Must happen before assignment variables;
    /// [`add_assignment_variables`](ModelBuilder::add_assignment_variables)
    /// adds them implicitly when the caller has not.
    pub fn add_secondary_clash_variables(&mut self) -> Result<(), KpartError> {
        self.core.add_z_variables()
    }

    /// Edges whose endpoints share a fine class in the integer solution.
    pub fn secondary_clash_edges(&self) -> Result<Vec<(usize, usize)>, KpartError> {
        self.core.secondary_clash_edges()
    }
}

impl ModelBuilder for TwoLevelModel {
    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn num_classes(&self) -> usize {
        self.k * self.k2
    }

    fn add_assignment_variables(&mut self) -> Result<(), KpartError> {
        self.core.ensure_accepts_assignment()?;
        if !self.core.has_secondary_variables() {
            self.core.add_z_variables()?;
        }
        let n = self.core.graph().vertex_count();
        let classes = self.num_classes();
        for i in 0..n {
            for c in 0..classes {
                self.core.add_x_variable(i, c);
            }
        }

        // Exactly one fine class per vertex.
        for i in 0..n {
            let terms: Vec<(usize, f64)> = (0..classes)
                .map(|c| (self.core.x_id(i, c).unwrap(), 1.0))
                .collect();
            self.core.push_structural(terms, Sense::Eq, 1.0);
        }

        let keys = self.core.graph().edge_keys();
        for (u, v) in keys {
            // Primary clash: y fires when both endpoints occupy the same
            // residue class mod k, whichever fine class within it.
            let y = self.core.y_id((u, v)).unwrap();
            for r in 0..self.k {
                let mut terms = vec![(y, 1.0)];
                for j in 0..self.k2 {
                    let c = r + j * self.k;
                    terms.push((self.core.x_id(u, c).unwrap(), -1.0));
                    terms.push((self.core.x_id(v, c).unwrap(), -1.0));
                }
                self.core.push_structural(terms, Sense::Geq, -1.0);
            }

            // Secondary clash: full linearization per fine class.
            let z = self.core.z_id((u, v)).unwrap();
            for c in 0..classes {
                let xu = self.core.x_id(u, c).unwrap();
                let xv = self.core.x_id(v, c).unwrap();
                self.core
                    .push_structural(vec![(z, 1.0), (xu, -1.0), (xv, -1.0)], Sense::Geq, -1.0);
                self.core
                    .push_structural(vec![(xu, 1.0), (xv, -1.0), (z, -1.0)], Sense::Geq, -1.0);
                self.core
                    .push_structural(vec![(xv, 1.0), (xu, -1.0), (z, -1.0)], Sense::Geq, -1.0);
            }
        }
        self.core.mark_assignment_added();
        Ok(())
    }
}
