//! Partition models: the mapping from a KPP instance onto a linear/integer
//! program.
//!
//! [`ModelCore`] owns the solver-level bookkeeping shared by both model
//! variants: variable definitions for the clash indicators `y[u,v]` (one per
//! edge, objective coefficient = edge weight), the secondary clash
//! indicators `z[u,v]` (two-level variant), and the assignment indicators
//! `x[i,c]`; the structural rows that link them; and the removable cutting
//! planes found by the separation oracles.
//!
//! The model walks a one-way state machine:
//!
//! ```text
//! Fresh -> (cutting-plane phases) -> AssignmentAdded -> Discretized -> Solved
//! ```
//!
//! Relaxations are solved with the Clarabel backend (which also provides the
//! dual values used for aggressive cut pruning); the final branch-and-bound
//! solve runs on HiGHS. `good_lp` consumes a model on `solve()`, so each
//! solve rebuilds the program from the retained definitions; all slack
//! bookkeeping is evaluated directly against the returned solution, which
//! keeps the violation arithmetic under our control.

mod single_level;
mod two_level;

pub use single_level::SingleLevelModel;
pub use two_level::TwoLevelModel;

use std::collections::BTreeMap;
use std::time::Instant;

use good_lp::solvers::clarabel::clarabel;
use good_lp::solvers::highs::highs;
use good_lp::solvers::{DualValues, SolutionWithDual};
use good_lp::{
    constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel, Variable,
};
use kpart_core::graph::WeightedEdge;
use kpart_core::ClashGraph;
use tracing::{debug, info, warn};

use crate::error::KpartError;
use crate::report::{SolveReport, SolveStatus};

/// Tolerance below which a fractional bound counts as integral.
const INTEGRALITY_TOLERANCE: f64 = 1e-6;
/// Dual values this close to zero mark a constraint as economically
/// inactive.
const DUAL_TOLERANCE: f64 = 1e-9;

/// Relational operator of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Leq,
    Geq,
    Eq,
}

/// A sparse inequality over the model's variable families, as produced by
/// the separation oracles. Terms are keyed the same way the families are
/// indexed: `(vertex, class)` for x, canonical `(u, v)` edges for y and z.
#[derive(Debug, Clone)]
pub struct CutConstraint {
    pub x_terms: Vec<((usize, usize), f64)>,
    pub y_terms: Vec<((usize, usize), f64)>,
    pub z_terms: Vec<((usize, usize), f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

/// Snapshot of the most recent solve, keyed like the variable families.
/// Valid only until the next solve.
#[derive(Debug, Clone, Default)]
pub struct FractionalSolution {
    pub x: BTreeMap<(usize, usize), f64>,
    pub y: BTreeMap<(usize, usize), f64>,
    pub z: BTreeMap<(usize, usize), f64>,
}

impl FractionalSolution {
    pub fn x_value(&self, vertex: usize, class: usize) -> f64 {
        self.x.get(&(vertex, class)).copied().unwrap_or(0.0)
    }

    pub fn y_value(&self, edge: (usize, usize)) -> f64 {
        self.y.get(&edge).copied().unwrap_or(0.0)
    }

    pub fn z_value(&self, edge: (usize, usize)) -> f64 {
        self.z.get(&edge).copied().unwrap_or(0.0)
    }
}

/// Lifecycle of a partition model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// Clash variables only; cutting-plane phases run here.
    Fresh,
    /// Assignment variables added, still continuous.
    AssignmentAdded,
    /// Assignment variables promoted to binary; cutting is now illegal.
    Discretized,
    /// Branch and bound has run.
    Solved,
}

#[derive(Debug, Clone, Copy)]
struct VarDef {
    lower: f64,
    upper: f64,
    objective: f64,
    /// Integer in the final program; relaxations always treat the variable
    /// as continuous.
    integer: bool,
}

/// An internal row: resolved variable ids with coefficients.
#[derive(Debug, Clone)]
struct RowSpec {
    terms: Vec<(usize, f64)>,
    sense: Sense,
    rhs: f64,
}

/// Bookkeeping for the most recent relaxation solve. The slack and dual
/// vectors are index-aligned with the cut list at the time of the solve.
#[derive(Debug, Clone)]
struct Relaxation {
    solution: FractionalSolution,
    objective: f64,
    cut_slack: Vec<f64>,
    cut_dual: Vec<f64>,
}

/// Shared state of a partition model: one solver model per instance.
#[derive(Debug)]
pub struct ModelCore {
    graph: ClashGraph,
    vars: Vec<VarDef>,
    x: BTreeMap<(usize, usize), usize>,
    y: BTreeMap<(usize, usize), usize>,
    z: BTreeMap<(usize, usize), usize>,
    structural: Vec<RowSpec>,
    cuts: Vec<RowSpec>,
    state: ModelState,
    last_relaxation: Option<Relaxation>,
    integer_solution: Option<FractionalSolution>,
}

impl ModelCore {
    pub(crate) fn new(graph: &ClashGraph) -> Self {
        let mut core = Self {
            graph: graph.clone(),
            vars: Vec::new(),
            x: BTreeMap::new(),
            y: BTreeMap::new(),
            z: BTreeMap::new(),
            structural: Vec::new(),
            cuts: Vec::new(),
            state: ModelState::Fresh,
            last_relaxation: None,
            integer_solution: None,
        };
        for e in core.sorted_edges() {
            let id = core.push_var(VarDef {
                lower: 0.0,
                upper: 1.0,
                objective: e.weight,
                integer: false,
            });
            core.y.insert((e.u, e.v), id);
        }
        core
    }

    fn sorted_edges(&self) -> Vec<WeightedEdge> {
        let mut edges: Vec<WeightedEdge> = self.graph.edges().collect();
        edges.sort_by(|a, b| (a.u, a.v).cmp(&(b.u, b.v)));
        edges
    }

    fn push_var(&mut self, def: VarDef) -> usize {
        self.vars.push(def);
        self.vars.len() - 1
    }

    pub fn graph(&self) -> &ClashGraph {
        &self.graph
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn num_cuts(&self) -> usize {
        self.cuts.len()
    }

    pub fn num_structural_constraints(&self) -> usize {
        self.structural.len()
    }

    pub fn has_secondary_variables(&self) -> bool {
        !self.z.is_empty()
    }

    // === variable management (used by the model variants) ===

    pub(crate) fn ensure_accepts_assignment(&self) -> Result<(), KpartError> {
        match self.state {
            ModelState::Fresh => Ok(()),
            ModelState::AssignmentAdded => Err(KpartError::AssignmentVariablesExist),
            _ => Err(KpartError::ModelFrozen),
        }
    }

    pub(crate) fn add_x_variable(&mut self, vertex: usize, class: usize) {
        let id = self.push_var(VarDef {
            lower: 0.0,
            upper: 1.0,
            objective: 0.0,
            integer: true,
        });
        self.x.insert((vertex, class), id);
    }

    pub(crate) fn add_z_variables(&mut self) -> Result<(), KpartError> {
        if !matches!(self.state, ModelState::Fresh) {
            return Err(KpartError::ModelFrozen);
        }
        if self.has_secondary_variables() {
            return Err(KpartError::SecondaryVariablesExist);
        }
        for e in self.sorted_edges() {
            let id = self.push_var(VarDef {
                lower: 0.0,
                upper: 1.0,
                objective: e.weight,
                integer: false,
            });
            self.z.insert((e.u, e.v), id);
        }
        Ok(())
    }

    pub(crate) fn x_id(&self, vertex: usize, class: usize) -> Option<usize> {
        self.x.get(&(vertex, class)).copied()
    }

    pub(crate) fn y_id(&self, edge: (usize, usize)) -> Option<usize> {
        self.y.get(&edge).copied()
    }

    pub(crate) fn z_id(&self, edge: (usize, usize)) -> Option<usize> {
        self.z.get(&edge).copied()
    }

    pub(crate) fn push_structural(&mut self, terms: Vec<(usize, f64)>, sense: Sense, rhs: f64) {
        self.structural.push(RowSpec { terms, sense, rhs });
    }

    pub(crate) fn mark_assignment_added(&mut self) {
        self.state = ModelState::AssignmentAdded;
    }

    // === constraint management ===

    /// Register an oracle-produced constraint with the solver model.
    pub fn add_constraint(&mut self, cut: &CutConstraint) -> Result<(), KpartError> {
        let mut terms =
            Vec::with_capacity(cut.x_terms.len() + cut.y_terms.len() + cut.z_terms.len());
        for &(key, coef) in &cut.x_terms {
            let id = self.x.get(&key).copied().ok_or(KpartError::MissingVariable {
                family: "assignment",
                index: key,
            })?;
            terms.push((id, coef));
        }
        for &(key, coef) in &cut.y_terms {
            let id = self.y.get(&key).copied().ok_or(KpartError::MissingVariable {
                family: "primary clash",
                index: key,
            })?;
            terms.push((id, coef));
        }
        for &(key, coef) in &cut.z_terms {
            let id = self.z.get(&key).copied().ok_or(KpartError::MissingVariable {
                family: "secondary clash",
                index: key,
            })?;
            terms.push((id, coef));
        }
        self.cuts.push(RowSpec {
            terms,
            sense: cut.sense,
            rhs: cut.rhs,
        });
        Ok(())
    }

    /// Drop cuts that the last relaxation left slack (not tight), and in
    /// aggressive mode also cuts with a zero dual value. Structural linkage
    /// rows are never touched. Returns the number of removed cuts.
    pub fn remove_redundant_constraints(
        &mut self,
        aggressive: bool,
        slack_tolerance: f64,
    ) -> Result<usize, KpartError> {
        let relaxation = self
            .last_relaxation
            .as_mut()
            .ok_or(KpartError::NoRelaxation)?;
        if relaxation.cut_slack.len() != self.cuts.len() {
            return Err(KpartError::StaleRelaxation);
        }

        let mut keep = Vec::with_capacity(self.cuts.len());
        let mut slack_removed = 0usize;
        let mut dual_removed = 0usize;
        for i in 0..self.cuts.len() {
            if relaxation.cut_slack[i].abs() > slack_tolerance {
                keep.push(false);
                slack_removed += 1;
            } else if aggressive && relaxation.cut_dual[i].abs() < DUAL_TOLERANCE {
                keep.push(false);
                dual_removed += 1;
            } else {
                keep.push(true);
            }
        }

        let mut it = keep.iter();
        self.cuts.retain(|_| *it.next().unwrap());
        let mut it = keep.iter();
        relaxation.cut_slack.retain(|_| *it.next().unwrap());
        let mut it = keep.iter();
        relaxation.cut_dual.retain(|_| *it.next().unwrap());

        info!(
            slack_removed,
            dual_removed,
            remaining = self.cuts.len(),
            "removed redundant cutting planes"
        );
        Ok(slack_removed + dual_removed)
    }

    /// Strengthen the relaxation by rounding a fractional lower bound on the
    /// total clash count up to the next integer. Only meaningful for
    /// unit-weight clash objectives and only between a successful relaxation
    /// solve and discretization. Returns whether a bound was added.
    pub fn add_fractional_cut(&mut self) -> Result<bool, KpartError> {
        if matches!(self.state, ModelState::Discretized | ModelState::Solved) {
            return Err(KpartError::AlreadyDiscretized);
        }
        let bound = self
            .last_relaxation
            .as_ref()
            .ok_or(KpartError::NoRelaxation)?
            .objective;

        let clash_ids: Vec<usize> = self.y.values().chain(self.z.values()).copied().collect();
        let unit_weights = clash_ids
            .iter()
            .all(|&id| (self.vars[id].objective - 1.0).abs() < 1e-12);
        if !unit_weights {
            warn!("fractional clash bound skipped: clash objective is not a unit-weight count");
            return Ok(false);
        }
        if (bound - bound.round()).abs() <= INTEGRALITY_TOLERANCE {
            debug!(bound, "fractional clash bound skipped: bound already integral");
            return Ok(false);
        }

        let rhs = bound.ceil();
        let terms: Vec<(usize, f64)> = clash_ids.into_iter().map(|id| (id, 1.0)).collect();
        // Valid for every integer solution, so it is kept as a permanent row
        // rather than a removable cut.
        self.push_structural(terms, Sense::Geq, rhs);
        info!(bound, rhs, "rounded fractional clash bound up");
        Ok(true)
    }

    // === state transitions ===

    /// Promote the assignment variables to binary. One-way; after this the
    /// model only accepts the final branch-and-bound solve.
    pub fn discretize(&mut self) -> Result<(), KpartError> {
        match self.state {
            ModelState::Fresh => Err(KpartError::AssignmentVariablesMissing),
            ModelState::AssignmentAdded => {
                self.state = ModelState::Discretized;
                Ok(())
            }
            ModelState::Discretized | ModelState::Solved => Err(KpartError::AlreadyDiscretized),
        }
    }

    /// Fix vertex `i` (for `i < num_classes - 1`) to the first `i + 1`
    /// classes, eliminating class-relabeling symmetry. On graphs with at
    /// most `num_classes` vertices this is skipped with a diagnostic.
    pub(crate) fn break_symmetry(&mut self, num_classes: usize) -> Result<(), KpartError> {
        if self.x.is_empty() {
            return Err(KpartError::AssignmentVariablesMissing);
        }
        if matches!(self.state, ModelState::Solved) {
            return Err(KpartError::AlreadySolved);
        }
        let n = self.graph.vertex_count();
        if n <= num_classes {
            warn!(
                vertices = n,
                classes = num_classes,
                "skipping symmetry breaking: graph has no more vertices than classes"
            );
            return Ok(());
        }
        for i in 0..num_classes.saturating_sub(1) {
            let terms: Vec<(usize, f64)> = (0..=i).map(|c| (self.x[&(i, c)], 1.0)).collect();
            self.push_structural(terms, Sense::Eq, 1.0);
        }
        debug!(rows = num_classes - 1, "added symmetry breaking constraints");
        Ok(())
    }

    // === solving ===

    fn build_variables(&self, relaxed: bool) -> (good_lp::ProblemVariables, Vec<Variable>, Expression) {
        let mut pvars = variables!();
        let mut handles = Vec::with_capacity(self.vars.len());
        for def in &self.vars {
            let mut vd = variable().min(def.lower).max(def.upper);
            if def.integer && !relaxed {
                vd = vd.integer();
            }
            handles.push(pvars.add(vd));
        }
        let mut objective = Expression::from(0.0);
        for (id, def) in self.vars.iter().enumerate() {
            if def.objective != 0.0 {
                objective += def.objective * handles[id];
            }
        }
        (pvars, handles, objective)
    }

    fn row_constraint(handles: &[Variable], row: &RowSpec) -> good_lp::Constraint {
        let mut expr = Expression::from(0.0);
        for &(id, coef) in &row.terms {
            expr += coef * handles[id];
        }
        match row.sense {
            Sense::Leq => constraint::leq(expr, row.rhs),
            Sense::Geq => constraint::geq(expr, row.rhs),
            Sense::Eq => constraint::eq(expr, row.rhs),
        }
    }

    fn signed_slack(values: &[f64], row: &RowSpec) -> f64 {
        let lhs: f64 = row.terms.iter().map(|&(id, coef)| coef * values[id]).sum();
        match row.sense {
            Sense::Leq => row.rhs - lhs,
            Sense::Geq | Sense::Eq => lhs - row.rhs,
        }
    }

    fn snapshot(&self, values: &[f64]) -> FractionalSolution {
        let collect = |map: &BTreeMap<(usize, usize), usize>| {
            map.iter().map(|(&key, &id)| (key, values[id])).collect()
        };
        FractionalSolution {
            x: collect(&self.x),
            y: collect(&self.y),
            z: collect(&self.z),
        }
    }

    /// Solve the current linear relaxation and snapshot the fractional
    /// solution along with per-cut slack and dual values. Returns the
    /// relaxation objective.
    pub fn solve_relaxation(&mut self) -> Result<f64, KpartError> {
        if matches!(self.state, ModelState::Discretized | ModelState::Solved) {
            return Err(KpartError::AlreadyDiscretized);
        }
        if self.vars.is_empty() {
            // Vertex-free instance: nothing to relax.
            self.last_relaxation = Some(Relaxation {
                solution: FractionalSolution::default(),
                objective: 0.0,
                cut_slack: Vec::new(),
                cut_dual: Vec::new(),
            });
            return Ok(0.0);
        }
        let (pvars, handles, objective) = self.build_variables(true);
        let mut model = pvars.minimise(objective).using(clarabel);
        for row in &self.structural {
            model.add_constraint(Self::row_constraint(&handles, row));
        }
        let mut cut_refs = Vec::with_capacity(self.cuts.len());
        for row in &self.cuts {
            cut_refs.push(model.add_constraint(Self::row_constraint(&handles, row)));
        }

        let mut solution = model
            .solve()
            .map_err(|e| KpartError::Solver(format!("relaxation solve failed: {e:?}")))?;
        let values: Vec<f64> = handles.iter().map(|&h| solution.value(h)).collect();
        let cut_dual: Vec<f64> = {
            let duals = solution.compute_dual();
            cut_refs.iter().map(|&r| duals.dual(r)).collect()
        };

        let objective_value: f64 = self
            .vars
            .iter()
            .enumerate()
            .map(|(id, def)| def.objective * values[id])
            .sum();
        let cut_slack: Vec<f64> = self
            .cuts
            .iter()
            .map(|row| Self::signed_slack(&values, row))
            .collect();
        self.last_relaxation = Some(Relaxation {
            solution: self.snapshot(&values),
            objective: objective_value,
            cut_slack,
            cut_dual,
        });
        Ok(objective_value)
    }

    /// The fractional solution of the most recent relaxation solve.
    pub fn fractional_solution(&self) -> Result<&FractionalSolution, KpartError> {
        self.last_relaxation
            .as_ref()
            .map(|r| &r.solution)
            .ok_or(KpartError::NoRelaxation)
    }

    /// Objective value of the most recent relaxation solve.
    pub fn relaxation_objective(&self) -> Result<f64, KpartError> {
        self.last_relaxation
            .as_ref()
            .map(|r| r.objective)
            .ok_or(KpartError::NoRelaxation)
    }

    /// Run the final branch-and-bound solve on the discretized program.
    /// Infeasibility is reported in the returned status, not as an error.
    pub(crate) fn solve_integer(&mut self) -> Result<SolveReport, KpartError> {
        match self.state {
            ModelState::Solved => return Err(KpartError::AlreadySolved),
            ModelState::Discretized => {}
            _ => return Err(KpartError::AssignmentVariablesMissing),
        }
        if self.vars.is_empty() {
            // Vertex-free instance: optimally zero without a backend call.
            self.state = ModelState::Solved;
            self.integer_solution = Some(FractionalSolution::default());
            return Ok(SolveReport {
                status: SolveStatus::Optimal,
                objective: Some(0.0),
                gap: Some(0.0),
                elapsed: std::time::Duration::ZERO,
                incumbent: true,
            });
        }
        let (pvars, handles, objective) = self.build_variables(false);
        let mut model = pvars.minimise(objective).using(highs);
        for row in self.structural.iter().chain(self.cuts.iter()) {
            model.add_constraint(Self::row_constraint(&handles, row));
        }

        let start = Instant::now();
        let outcome = model.solve();
        let elapsed = start.elapsed();
        self.state = ModelState::Solved;

        match outcome {
            Ok(solution) => {
                let values: Vec<f64> = handles.iter().map(|&h| solution.value(h)).collect();
                let objective_value: f64 = self
                    .vars
                    .iter()
                    .enumerate()
                    .map(|(id, def)| def.objective * values[id])
                    .sum();
                self.integer_solution = Some(self.snapshot(&values));
                info!(objective = objective_value, ?elapsed, "branch and bound finished");
                Ok(SolveReport {
                    status: SolveStatus::Optimal,
                    objective: Some(objective_value),
                    gap: Some(0.0),
                    elapsed,
                    incumbent: true,
                })
            }
            Err(ResolutionError::Infeasible) => {
                warn!("integer program is infeasible");
                Ok(SolveReport {
                    status: SolveStatus::Infeasible,
                    objective: None,
                    gap: None,
                    elapsed,
                    incumbent: false,
                })
            }
            Err(ResolutionError::Unbounded) => Ok(SolveReport {
                status: SolveStatus::Unbounded,
                objective: None,
                gap: None,
                elapsed,
                incumbent: false,
            }),
            Err(e) => Err(KpartError::Solver(format!(
                "branch and bound failed: {e:?}"
            ))),
        }
    }

    // === solution readback ===

    pub(crate) fn class_assignment(&self, num_classes: usize) -> Result<Vec<usize>, KpartError> {
        let solution = self
            .integer_solution
            .as_ref()
            .ok_or(KpartError::SolutionNotAvailable)?;
        let n = self.graph.vertex_count();
        let mut assignment = Vec::with_capacity(n);
        for i in 0..n {
            let class = (0..num_classes)
                .find(|&c| solution.x_value(i, c) > 0.5)
                .ok_or(KpartError::SolutionNotAvailable)?;
            assignment.push(class);
        }
        Ok(assignment)
    }

    pub(crate) fn clash_edges(&self) -> Result<Vec<(usize, usize)>, KpartError> {
        let solution = self
            .integer_solution
            .as_ref()
            .ok_or(KpartError::SolutionNotAvailable)?;
        Ok(solution
            .y
            .iter()
            .filter(|&(_, &v)| v > 0.5)
            .map(|(&e, _)| e)
            .collect())
    }

    pub(crate) fn secondary_clash_edges(&self) -> Result<Vec<(usize, usize)>, KpartError> {
        let solution = self
            .integer_solution
            .as_ref()
            .ok_or(KpartError::SolutionNotAvailable)?;
        Ok(solution
            .z
            .iter()
            .filter(|&(_, &v)| v > 0.5)
            .map(|(&e, _)| e)
            .collect())
    }
}

/// Capability surface of a partition model variant. The cutting-plane
/// engine and the orchestrator drive models exclusively through this trait.
pub trait ModelBuilder {
    fn core(&self) -> &ModelCore;
    fn core_mut(&mut self) -> &mut ModelCore;

    /// Number of classes at the finest assignment granularity.
    fn num_classes(&self) -> usize;

    /// Create the `x[i,c]` family (continuous until [`discretize`]) together
    /// with the one-class-per-vertex rows and the clash linkage rows.
    /// Illegal to repeat.
    ///
    /// [`discretize`]: ModelBuilder::discretize
    fn add_assignment_variables(&mut self) -> Result<(), KpartError>;

    /// Solve the current linear relaxation; see
    /// [`ModelCore::solve_relaxation`].
    fn relax(&mut self) -> Result<f64, KpartError> {
        self.core_mut().solve_relaxation()
    }

    fn add_constraint(&mut self, cut: &CutConstraint) -> Result<(), KpartError> {
        self.core_mut().add_constraint(cut)
    }

    fn remove_redundant_constraints(
        &mut self,
        aggressive: bool,
        slack_tolerance: f64,
    ) -> Result<usize, KpartError> {
        self.core_mut()
            .remove_redundant_constraints(aggressive, slack_tolerance)
    }

    fn add_fractional_cut(&mut self) -> Result<bool, KpartError> {
        self.core_mut().add_fractional_cut()
    }

    /// Promote assignment variables to binary; one-way.
    fn discretize(&mut self) -> Result<(), KpartError> {
        self.core_mut().discretize()
    }

    fn break_symmetry(&mut self) -> Result<(), KpartError> {
        let num_classes = self.num_classes();
        self.core_mut().break_symmetry(num_classes)
    }

    /// Run branch and bound, adding and discretizing the assignment
    /// variables first when the caller has not done so.
    fn solve(&mut self) -> Result<SolveReport, KpartError> {
        if matches!(self.core().state(), ModelState::Fresh) {
            self.add_assignment_variables()?;
        }
        if matches!(self.core().state(), ModelState::AssignmentAdded) {
            self.core_mut().discretize()?;
        }
        self.core_mut().solve_integer()
    }

    /// Class of every vertex in the integer solution.
    fn class_assignment(&self) -> Result<Vec<usize>, KpartError> {
        let num_classes = self.num_classes();
        self.core().class_assignment(num_classes)
    }

    /// Edges whose endpoints clash at the primary granularity in the
    /// integer solution.
    fn clash_edges(&self) -> Result<Vec<(usize, usize)>, KpartError> {
        self.core().clash_edges()
    }
}
