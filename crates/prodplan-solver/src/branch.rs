use std::time::Instant;

use tracing::{debug, trace};

use crate::config::SolverConfig;
use crate::problem::{LpProblem, Sense};
use crate::simplex::Simplex;
use crate::solution::{SolutionStatus, SolveStats, Solution, SolverError};

/// Pending subproblem: the root problem under its own bounds
///
/// Nodes never touch the root problem; each one owns a full copy of the
/// variable bounds with its branching decisions applied.
#[derive(Debug, Clone)]
struct Node {
    bounds: Vec<(f64, f64)>,
    depth: usize,
}

impl Node {
    fn root(problem: &LpProblem) -> Self {
        Self {
            bounds: problem.root_bounds(),
            depth: 0,
        }
    }

    /// Child with `x <= floor(value)`
    fn down(&self, var: usize, value: f64) -> Self {
        let mut bounds = self.bounds.clone();
        bounds[var].1 = value.floor();
        Self {
            bounds,
            depth: self.depth + 1,
        }
    }

    /// Child with `x >= ceil(value)`
    fn up(&self, var: usize, value: f64) -> Self {
        let mut bounds = self.bounds.clone();
        bounds[var].0 = value.ceil();
        Self {
            bounds,
            depth: self.depth + 1,
        }
    }
}

struct Incumbent {
    values: Vec<f64>,
    objective_value: f64,
}

/// Depth-first branch-and-bound over simplex relaxations
pub(crate) struct BranchAndBound<'a> {
    config: &'a SolverConfig,
    simplex: Simplex<'a>,
}

impl<'a> BranchAndBound<'a> {
    pub(crate) fn new(config: &'a SolverConfig) -> Self {
        Self {
            config,
            simplex: Simplex::new(config),
        }
    }

    pub(crate) fn solve(&self, problem: &LpProblem) -> Result<Solution, SolverError> {
        let started = Instant::now();
        let sense = problem.objective().sense;
        let mut stats = SolveStats::default();
        let mut incumbent: Option<Incumbent> = None;
        let mut frontier = vec![Node::root(problem)];

        debug!(
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            "starting branch-and-bound"
        );

        while let Some(node) = frontier.pop() {
            if let Some(limit) = self.config.time_limit {
                if started.elapsed() >= limit {
                    debug!(pending = frontier.len() + 1, "time limit reached");
                    stats.deadline_reached = true;
                    break;
                }
            }
            if stats.nodes >= self.config.max_nodes {
                debug!(pending = frontier.len() + 1, "node limit reached");
                stats.node_limit_reached = true;
                break;
            }

            let relaxation = self.simplex.solve(problem, &node.bounds)?;
            stats.nodes += 1;
            stats.simplex_iterations += relaxation.stats.simplex_iterations;

            match relaxation.status {
                SolutionStatus::Infeasible => {
                    trace!(depth = node.depth, "node infeasible");
                    stats.infeasible_nodes += 1;
                    continue;
                }
                SolutionStatus::Unbounded => {
                    // The integer region is a subset of the relaxed one
                    debug!(depth = node.depth, "relaxation unbounded");
                    return Ok(Solution::unbounded().with_stats(stats));
                }
                SolutionStatus::Optimal => {}
            }

            if let Some(best) = &incumbent {
                if !self.improves(sense, relaxation.objective_value, best.objective_value) {
                    trace!(
                        depth = node.depth,
                        bound = relaxation.objective_value,
                        incumbent = best.objective_value,
                        "node pruned by bound"
                    );
                    stats.pruned_by_bound += 1;
                    continue;
                }
            }

            match self.fractional_variable(problem, &relaxation.values) {
                None => {
                    debug!(
                        depth = node.depth,
                        objective = relaxation.objective_value,
                        "new incumbent"
                    );
                    stats.incumbent_updates += 1;
                    incumbent = Some(Incumbent {
                        values: relaxation.values,
                        objective_value: relaxation.objective_value,
                    });
                }
                Some(var) => {
                    let value = relaxation.values[var];
                    trace!(depth = node.depth, var, value, "branching");
                    // Down branch is explored first
                    frontier.push(node.up(var, value));
                    frontier.push(node.down(var, value));
                }
            }
        }

        debug!(
            nodes = stats.nodes,
            pruned = stats.pruned_by_bound,
            iterations = stats.simplex_iterations,
            found = incumbent.is_some(),
            "branch-and-bound finished"
        );

        Ok(match incumbent {
            Some(best) => Solution::optimal(best.values, best.objective_value).with_stats(stats),
            None => Solution::infeasible().with_stats(stats),
        })
    }

    /// Whether `candidate` is strictly better than `reference` under `sense`
    fn improves(&self, sense: Sense, candidate: f64, reference: f64) -> bool {
        let tol = self.config.tolerance;
        match sense {
            Sense::Maximize => candidate > reference + tol,
            Sense::Minimize => candidate < reference - tol,
        }
    }

    /// First integer variable whose value is not integral
    fn fractional_variable(&self, problem: &LpProblem, values: &[f64]) -> Option<usize> {
        let tol = self.config.integrality_tolerance;
        problem
            .variables()
            .iter()
            .zip(values)
            .position(|(var, &value)| var.integer && (value - value.round()).abs() > tol)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::problem::ConstraintOp;

    fn solve(problem: &LpProblem) -> Solution {
        let config = SolverConfig::default();
        BranchAndBound::new(&config).solve(problem).unwrap()
    }

    #[test]
    fn test_knapsack() {
        // Maximize 10a + 7b + 4c with 5a + 4b + 3c <= 10, binaries
        // LP optimum is fractional; integer optimum takes a and b for 17
        let mut problem = LpProblem::new();
        let a = problem.add_variable("a", 0.0, 1.0).unwrap();
        let b = problem.add_variable("b", 0.0, 1.0).unwrap();
        let c = problem.add_variable("c", 0.0, 1.0).unwrap();
        problem.set_objective([(a, 10.0), (b, 7.0), (c, 4.0)], Sense::Maximize).unwrap();
        problem
            .add_constraint("weight", [(a, 5.0), (b, 4.0), (c, 3.0)], ConstraintOp::Le, 10.0)
            .unwrap();

        let solution = solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value - 17.0).abs() < 1e-6, "obj = {}", solution.objective_value);
        assert!((solution.values[0] - 1.0).abs() < 1e-6);
        assert!((solution.values[1] - 1.0).abs() < 1e-6);
        assert!(solution.values[2].abs() < 1e-6);
        assert!(solution.stats.nodes > 1);
    }

    #[test]
    fn test_contradictory_bounds_are_infeasible() {
        // x >= 5 and x <= 2
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, f64::INFINITY).unwrap();
        problem.set_objective([(x, 1.0)], Sense::Maximize).unwrap();
        problem.add_constraint("lower", [(x, 1.0)], ConstraintOp::Ge, 5.0).unwrap();
        problem.add_constraint("upper", [(x, 1.0)], ConstraintOp::Le, 2.0).unwrap();

        let solution = solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert_eq!(solution.stats.infeasible_nodes, 1);
    }

    #[test]
    fn test_no_integer_point_in_relaxation() {
        // 2x + 2y = 3 has real solutions but no integer one
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, f64::INFINITY).unwrap();
        let y = problem.add_variable("y", 0.0, f64::INFINITY).unwrap();
        problem.set_objective([(x, 1.0)], Sense::Maximize).unwrap();
        problem.add_constraint("odd", [(x, 2.0), (y, 2.0)], ConstraintOp::Eq, 3.0).unwrap();

        let solution = solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.stats.nodes > 1);
    }

    #[test]
    fn test_unbounded_propagates() {
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, f64::INFINITY).unwrap();
        let y = problem.add_variable("y", 0.0, f64::INFINITY).unwrap();
        problem.set_objective([(x, 1.0), (y, 1.0)], Sense::Maximize).unwrap();
        problem.add_constraint("diff", [(x, 1.0), (y, -1.0)], ConstraintOp::Le, 0.5).unwrap();

        assert_eq!(solve(&problem).status, SolutionStatus::Unbounded);
    }

    #[test]
    fn test_minimization() {
        // Minimize x + y with 2x + 2y >= 5 -> relaxation 2.5, integer 3
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, f64::INFINITY).unwrap();
        let y = problem.add_variable("y", 0.0, f64::INFINITY).unwrap();
        problem.set_objective([(x, 1.0), (y, 1.0)], Sense::Minimize).unwrap();
        problem.add_constraint("cover", [(x, 2.0), (y, 2.0)], ConstraintOp::Ge, 5.0).unwrap();

        let solution = solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value - 3.0).abs() < 1e-6, "obj = {}", solution.objective_value);
    }

    #[test]
    fn test_continuous_variables_are_not_branched() {
        // x integer, y continuous
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, f64::INFINITY).unwrap();
        let y = problem.add_continuous_variable("y", 0.0, f64::INFINITY).unwrap();
        problem.set_objective([(x, 1.0), (y, 1.0)], Sense::Maximize).unwrap();
        problem.add_constraint("x_cap", [(x, 1.0)], ConstraintOp::Le, 2.5).unwrap();
        problem.add_constraint("y_cap", [(y, 1.0)], ConstraintOp::Le, 1.5).unwrap();

        let solution = solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 2.0).abs() < 1e-6);
        assert!((solution.values[1] - 1.5).abs() < 1e-6);
        assert!((solution.objective_value - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_bound_pruning() {
        // Ten identical binaries under a half-integral budget: every equal-value
        // subtree after the first incumbent gets pruned
        let mut problem = LpProblem::new();
        let vars: Vec<_> = (0..10)
            .map(|i| problem.add_variable(format!("x{i}"), 0.0, 1.0).unwrap())
            .collect();
        problem
            .set_objective(vars.iter().map(|&v| (v, 1.0)), Sense::Maximize)
            .unwrap();
        problem
            .add_constraint("budget", vars.iter().map(|&v| (v, 2.0)), ConstraintOp::Le, 9.0)
            .unwrap();

        let solution = solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value - 4.0).abs() < 1e-6);
        assert!(solution.stats.pruned_by_bound > 0);
        assert_eq!(solution.stats.incumbent_updates, 1);
    }

    #[test]
    fn test_zero_time_limit_returns_without_search() {
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, f64::INFINITY).unwrap();
        problem.set_objective([(x, 1.0)], Sense::Maximize).unwrap();
        problem.add_constraint("cap", [(x, 1.0)], ConstraintOp::Le, 3.0).unwrap();

        let config = SolverConfig::default().with_time_limit(Duration::ZERO);
        let solution = BranchAndBound::new(&config).solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.stats.deadline_reached);
        assert_eq!(solution.stats.nodes, 0);
    }

    #[test]
    fn test_node_limit_stops_endless_branching() {
        // 2x - 2y = 1 has no integer point and the relaxation stays feasible
        // however far x and y are pushed
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, f64::INFINITY).unwrap();
        let y = problem.add_variable("y", 0.0, f64::INFINITY).unwrap();
        problem.set_objective([(x, 1.0)], Sense::Minimize).unwrap();
        problem.add_constraint("odd", [(x, 2.0), (y, -2.0)], ConstraintOp::Eq, 1.0).unwrap();

        let config = SolverConfig::default().with_max_nodes(50);
        let solution = BranchAndBound::new(&config).solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.stats.node_limit_reached);
        assert!(!solution.stats.deadline_reached);
        assert_eq!(solution.stats.nodes, 50);
    }

    #[test]
    fn test_node_limit_keeps_incumbent() {
        let mut problem = LpProblem::new();
        let vars: Vec<_> = (0..10)
            .map(|i| problem.add_variable(format!("x{i}"), 0.0, 1.0).unwrap())
            .collect();
        problem
            .set_objective(vars.iter().map(|&v| (v, 1.0)), Sense::Maximize)
            .unwrap();
        problem
            .add_constraint("budget", vars.iter().map(|&v| (v, 2.0)), ConstraintOp::Le, 9.0)
            .unwrap();

        let config = SolverConfig::default().with_max_nodes(200);
        let solution = BranchAndBound::new(&config).solve(&problem).unwrap();

        assert!(solution.stats.node_limit_reached);
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_divergence_is_surfaced() {
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, f64::INFINITY).unwrap();
        let y = problem.add_variable("y", 0.0, f64::INFINITY).unwrap();
        problem.set_objective([(x, 1.0), (y, 1.0)], Sense::Maximize).unwrap();
        problem.add_constraint("x_max", [(x, 1.0)], ConstraintOp::Le, 1.0).unwrap();
        problem.add_constraint("y_max", [(y, 1.0)], ConstraintOp::Le, 1.0).unwrap();

        let config = SolverConfig::default().with_max_iterations(1);
        let result = BranchAndBound::new(&config).solve(&problem);

        assert!(matches!(result, Err(SolverError::Divergence { .. })));
    }
}
