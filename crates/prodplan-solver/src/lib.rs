mod branch;
mod config;
mod problem;
pub mod report;
mod simplex;
mod solution;

pub use config::SolverConfig;
pub use problem::{Constraint, ConstraintOp, LpProblem, ModelError, Objective, Sense, Variable, VariableId};
pub use report::ReportError;
pub use solution::{SolveStats, Solution, SolutionStatus, SolverError};

use branch::BranchAndBound;
use simplex::Simplex;

/// Solve `problem` to integer optimality
///
/// Infeasible and unbounded problems come back as a [`Solution`] with the
/// matching status; only an invalid configuration or a simplex that runs out
/// of pivots is an error.
pub fn solve(problem: &LpProblem, config: &SolverConfig) -> Result<Solution, SolverError> {
    config.validate()?;
    BranchAndBound::new(config).solve(problem)
}

/// Solve the continuous relaxation of `problem`, ignoring integrality
pub fn solve_relaxation(problem: &LpProblem, config: &SolverConfig) -> Result<Solution, SolverError> {
    config.validate()?;
    Simplex::new(config).solve(problem, &problem.root_bounds())
}
