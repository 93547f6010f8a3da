//! Error type for the exact KPP solver.

use thiserror::Error;

/// Error type for model sequencing, configuration, and solver failures.
///
/// Solver-reported infeasibility or unboundedness of the final integer
/// program is *not* an error; it is carried in
/// [`SolveStatus`](crate::report::SolveStatus) so callers can inspect it
/// alongside the rest of the run report.
#[derive(Debug, Error)]
pub enum KpartError {
    /// Assignment variables were requested twice.
    #[error("assignment variables have already been added")]
    AssignmentVariablesExist,

    /// Secondary clash variables were requested twice.
    #[error("secondary clash variables have already been added")]
    SecondaryVariablesExist,

    /// An operation needed assignment variables that do not exist yet.
    #[error("assignment variables have not been added")]
    AssignmentVariablesMissing,

    /// `discretize` is a one-way transition and was attempted again.
    #[error("assignment variables are already discretized")]
    AlreadyDiscretized,

    /// Cutting planes must be separated against a linear relaxation.
    #[error("cutting plane separation is illegal once assignment variables are discretized")]
    CutAfterDiscretize,

    /// Variable creation is frozen once the model is discretized or solved.
    #[error("the model no longer accepts new variables")]
    ModelFrozen,

    /// The model was already solved to completion.
    #[error("the model has already been solved")]
    AlreadySolved,

    /// An operation needed a relaxation solve that has not happened.
    #[error("no linear relaxation has been solved yet")]
    NoRelaxation,

    /// Cuts changed since the last relaxation, so its slack/dual bookkeeping
    /// no longer lines up with the constraint list.
    #[error("constraints changed since the last relaxation solve")]
    StaleRelaxation,

    /// A constraint referenced a variable the model does not have.
    #[error("constraint references missing {family} variable {index:?}")]
    MissingVariable {
        family: &'static str,
        index: (usize, usize),
    },

    /// Class assignments can only be read back from a successful integer
    /// solve.
    #[error("no integer solution is available")]
    SolutionNotAvailable,

    /// Rejected configuration, reported eagerly at construction.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The underlying mathematical-programming backend failed.
    #[error("solver failure: {0}")]
    Solver(String),
}
