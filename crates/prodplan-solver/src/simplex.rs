use tracing::trace;

use crate::config::SolverConfig;
use crate::problem::{ConstraintOp, LpProblem, Sense};
use crate::solution::{SolveStats, Solution, SolverError};

/// Dense two-phase simplex over the continuous relaxation of a problem
///
/// Entering and leaving variables follow Bland's rule, so the same problem and
/// bounds always produce the same vertex.
pub(crate) struct Simplex<'a> {
    config: &'a SolverConfig,
}

impl<'a> Simplex<'a> {
    pub(crate) fn new(config: &'a SolverConfig) -> Self {
        Self { config }
    }

    /// Solve the relaxation of `problem` with `bounds` in place of the
    /// declared variable bounds
    ///
    /// The returned solution carries `nodes = 1` and the pivot count in its
    /// stats.
    pub(crate) fn solve(
        &self,
        problem: &LpProblem,
        bounds: &[(f64, f64)],
    ) -> Result<Solution, SolverError> {
        let tol = self.config.tolerance;
        if bounds.iter().any(|&(lower, upper)| lower > upper + tol) {
            return Ok(Solution::infeasible().with_stats(Self::stats(0)));
        }

        let mut tableau = self.build_tableau(problem, bounds);
        let mut iterations = 0;

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 && !self.phase1(&mut tableau, &mut iterations)? {
            trace!(iterations, "relaxation infeasible after phase 1");
            return Ok(Solution::infeasible().with_stats(Self::stats(iterations)));
        }

        // Phase 2: Optimize
        self.load_objective(&mut tableau, problem);
        let exclude_from = tableau.n_vars + tableau.n_slack;
        match self.optimize(&mut tableau, exclude_from, &mut iterations)? {
            SimplexResult::Optimal => {}
            SimplexResult::Unbounded => {
                trace!(iterations, "relaxation unbounded");
                return Ok(Solution::unbounded().with_stats(Self::stats(iterations)));
            }
        }

        let values = self.extract_values(&tableau, bounds);
        let objective_value = problem
            .dense_objective()
            .iter()
            .zip(&values)
            .map(|(c, x)| c * x)
            .sum();
        trace!(iterations, objective_value, "relaxation optimal");

        Ok(Solution::optimal(values, objective_value).with_stats(Self::stats(iterations)))
    }

    fn stats(iterations: usize) -> SolveStats {
        SolveStats {
            nodes: 1,
            simplex_iterations: iterations,
            ..SolveStats::default()
        }
    }

    fn build_tableau(&self, problem: &LpProblem, bounds: &[(f64, f64)]) -> Tableau {
        let tol = self.config.tolerance;
        let n_vars = problem.num_variables();

        // Shift every variable by its lower bound, so x = lower + x' with x' >= 0,
        // and turn finite upper bounds into x' <= upper - lower rows.
        let mut rows: Vec<(Vec<f64>, ConstraintOp, f64)> = Vec::new();
        for c in problem.constraints() {
            let coefficients = c.dense(n_vars);
            let shift: f64 = coefficients
                .iter()
                .zip(bounds)
                .map(|(a, &(lower, _))| a * lower)
                .sum();
            rows.push((coefficients, c.op, c.rhs - shift));
        }
        for (j, &(lower, upper)) in bounds.iter().enumerate() {
            if upper.is_finite() {
                let mut coefficients = vec![0.0; n_vars];
                coefficients[j] = 1.0;
                rows.push((coefficients, ConstraintOp::Le, (upper - lower).max(0.0)));
            }
        }

        // Zero out noise and make every RHS non-negative
        for (coefficients, op, rhs) in rows.iter_mut() {
            for a in coefficients.iter_mut() {
                if a.abs() <= tol {
                    *a = 0.0;
                }
            }
            if rhs.abs() <= tol {
                *rhs = 0.0;
            }
            if *rhs < 0.0 {
                *rhs = -*rhs;
                for a in coefficients.iter_mut() {
                    *a = -*a;
                }
                *op = match *op {
                    ConstraintOp::Le => ConstraintOp::Ge,
                    ConstraintOp::Ge => ConstraintOp::Le,
                    ConstraintOp::Eq => ConstraintOp::Eq,
                };
            }
        }

        // Count slack and artificial variables needed
        let mut n_slack = 0;
        let mut n_artificial = 0;
        for (_, op, _) in &rows {
            match op {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let n_constraints = rows.len();
        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let total_rows = n_constraints + 1; // +1 for objective

        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; total_rows],
            basic_vars: vec![0; n_constraints],
            n_vars,
            n_slack,
            n_artificial,
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;
        let rhs_col = total_cols - 1;

        for (i, (coefficients, op, rhs)) in rows.into_iter().enumerate() {
            tableau.data[i][..n_vars].copy_from_slice(&coefficients);
            tableau.data[i][rhs_col] = rhs;

            match op {
                ConstraintOp::Le => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        tableau
    }

    /// Returns `false` when no feasible point exists
    fn phase1(&self, tableau: &mut Tableau, iterations: &mut usize) -> Result<bool, SolverError> {
        let tol = self.config.tolerance;
        let obj_row = tableau.obj_row();
        let n_cols = tableau.n_cols();
        let art_start = tableau.art_start();

        // Maximize -sum(artificials), priced out against the artificial basis
        tableau.data[obj_row].fill(0.0);
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[obj_row][j] = -1.0;
        }
        for i in 0..obj_row {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[obj_row][j] += tableau.data[i][j];
                }
            }
        }

        // The phase 1 objective is bounded by zero, so it cannot run away
        if let SimplexResult::Unbounded = self.optimize(tableau, n_cols - 1, iterations)? {
            return Ok(false);
        }

        let rhs_col = n_cols - 1;
        let residual: f64 = (0..obj_row)
            .filter(|&i| tableau.basic_vars[i] >= art_start)
            .map(|i| tableau.data[i][rhs_col])
            .sum();
        if residual > tol {
            return Ok(false);
        }

        // Drive artificials that stayed basic at zero out of the basis. Rows with
        // no usable pivot are redundant and keep their artificial at zero.
        for i in 0..obj_row {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            if let Some(col) = (0..art_start).find(|&j| tableau.data[i][j].abs() > tol) {
                tableau.pivot(i, col);
                *iterations += 1;
            }
        }

        Ok(true)
    }

    /// Install the real objective (as a maximization) and price out the basis
    fn load_objective(&self, tableau: &mut Tableau, problem: &LpProblem) {
        let obj_row = tableau.obj_row();
        let n_cols = tableau.n_cols();
        let sign = match problem.objective().sense {
            Sense::Maximize => 1.0,
            Sense::Minimize => -1.0,
        };

        tableau.data[obj_row].fill(0.0);
        for (j, coef) in problem.dense_objective().into_iter().enumerate() {
            tableau.data[obj_row][j] = sign * coef;
        }
        for i in 0..obj_row {
            let ratio = tableau.data[obj_row][tableau.basic_vars[i]];
            if ratio != 0.0 {
                for j in 0..n_cols {
                    tableau.data[obj_row][j] -= ratio * tableau.data[i][j];
                }
            }
        }
    }

    /// Pivot until no column below `exclude_from` can improve the objective
    fn optimize(
        &self,
        tableau: &mut Tableau,
        exclude_from: usize,
        iterations: &mut usize,
    ) -> Result<SimplexResult, SolverError> {
        let tol = self.config.tolerance;
        loop {
            let Some(pivot_col) = tableau.find_pivot_column(exclude_from, tol) else {
                return Ok(SimplexResult::Optimal);
            };
            let Some(pivot_row) = tableau.find_pivot_row(pivot_col, tol) else {
                return Ok(SimplexResult::Unbounded);
            };
            if *iterations >= self.config.max_iterations {
                return Err(SolverError::Divergence {
                    iterations: *iterations,
                });
            }
            tableau.pivot(pivot_row, pivot_col);
            *iterations += 1;
        }
    }

    fn extract_values(&self, tableau: &Tableau, bounds: &[(f64, f64)]) -> Vec<f64> {
        let rhs_col = tableau.n_cols() - 1;
        let mut shifted = vec![0.0; tableau.n_vars];
        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            if basic < tableau.n_vars {
                shifted[basic] = tableau.data[i][rhs_col].max(0.0);
            }
        }
        shifted
            .into_iter()
            .zip(bounds)
            .map(|(x, &(lower, _))| lower + x)
            .collect()
    }
}

struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
}

impl Tableau {
    fn obj_row(&self) -> usize {
        self.data.len() - 1
    }

    /// Column count including the RHS column
    fn n_cols(&self) -> usize {
        self.data[0].len()
    }

    fn art_start(&self) -> usize {
        self.n_vars + self.n_slack
    }

    /// Smallest-index column with an improving reduced cost
    fn find_pivot_column(&self, exclude_from: usize, tol: f64) -> Option<usize> {
        let obj_row = self.obj_row();
        (0..exclude_from).find(|&j| self.data[obj_row][j] > tol)
    }

    /// Minimum-ratio row, ties broken by the smallest basic variable index
    fn find_pivot_row(&self, col: usize, tol: f64) -> Option<usize> {
        let rhs_col = self.n_cols() - 1;

        let mut best: Option<(usize, f64)> = None;
        for i in 0..self.obj_row() {
            let val = self.data[i][col];
            if val <= tol {
                continue;
            }
            let ratio = self.data[i][rhs_col] / val;
            best = match best {
                None => Some((i, ratio)),
                Some((row, min_ratio)) => {
                    if ratio < min_ratio - tol
                        || (ratio <= min_ratio + tol && self.basic_vars[i] < self.basic_vars[row])
                    {
                        Some((i, ratio))
                    } else {
                        Some((row, min_ratio))
                    }
                }
            };
        }

        best.map(|(row, _)| row)
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let n_rows = self.data.len();
        let n_cols = self.n_cols();

        // Update basic variable
        self.basic_vars[row] = col;

        // Scale pivot row
        let pivot_val = self.data[row][col];
        for j in 0..n_cols {
            self.data[row][j] /= pivot_val;
        }

        // Eliminate column in other rows
        let pivot_row = self.data[row].clone();
        for i in 0..n_rows {
            if i != row {
                let factor = self.data[i][col];
                if factor != 0.0 {
                    for j in 0..n_cols {
                        self.data[i][j] -= factor * pivot_row[j];
                    }
                }
            }
        }
    }
}

enum SimplexResult {
    Optimal,
    Unbounded,
}
