use thiserror::Error;

use crate::problem::VariableId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// The simplex ran out of its pivot budget. Well-posed small models never
    /// get here; it points at a model or tolerance defect.
    #[error("Simplex did not converge within {iterations} iterations")]
    Divergence { iterations: usize },
    #[error("Invalid solver configuration: {0}")]
    InvalidConfig(String),
}

/// The result of solving a problem
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Value of each variable, indexed by [`VariableId::index`]. Empty unless
    /// the status is optimal.
    pub values: Vec<f64>,
    /// Objective value in the problem's own sense
    pub objective_value: f64,
    /// How the search went
    pub stats: SolveStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolveStats {
    /// Relaxations solved
    pub nodes: usize,
    /// Nodes discarded because their bound could not beat the incumbent
    pub pruned_by_bound: usize,
    /// Nodes whose relaxation was infeasible
    pub infeasible_nodes: usize,
    /// Times a strictly better integer solution was recorded
    pub incumbent_updates: usize,
    /// Pivots over all relaxations
    pub simplex_iterations: usize,
    /// The time limit stopped the search before the frontier was exhausted
    pub deadline_reached: bool,
    /// The node budget stopped the search before the frontier was exhausted
    pub node_limit_reached: bool,
}

impl Solution {
    pub(crate) fn optimal(values: Vec<f64>, objective_value: f64) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            stats: SolveStats::default(),
        }
    }

    pub fn infeasible() -> Self {
        Self {
            status: SolutionStatus::Infeasible,
            values: Vec::new(),
            objective_value: f64::NAN,
            stats: SolveStats::default(),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            status: SolutionStatus::Unbounded,
            values: Vec::new(),
            objective_value: f64::NAN,
            stats: SolveStats::default(),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    /// Value assigned to `id`, if the solution carries values
    pub fn value(&self, id: VariableId) -> Option<f64> {
        self.values.get(id.index()).copied()
    }

    pub(crate) fn with_stats(mut self, stats: SolveStats) -> Self {
        self.stats = stats;
        self
    }
}
