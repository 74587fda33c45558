//! Turning solved values into caller-facing integer quantities
//!
//! Simplex arithmetic leaves small residuals (`2.9999999999999996`), so values
//! are rounded only when they sit within a tolerance of an integer. Anything
//! further away is an error rather than a silent truncation.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::problem::{LpProblem, VariableId};
use crate::solution::{Solution, SolutionStatus};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    #[error("No solution to report: status is {0:?}")]
    NoSolution(SolutionStatus),
    #[error("Variable #{0} has no value in this solution")]
    MissingValue(usize),
    #[error("Value {value} of {variable} is not integral")]
    NotIntegral { variable: String, value: f64 },
    #[error("Value {value} of {variable} does not fit in an i64")]
    OutOfRange { variable: String, value: f64 },
}

/// Value of `id` rounded to the nearest integer, if it is within `tolerance`
pub fn integer_value(solution: &Solution, id: VariableId, tolerance: f64) -> Result<i64, ReportError> {
    if solution.status != SolutionStatus::Optimal {
        return Err(ReportError::NoSolution(solution.status));
    }
    let value = solution
        .value(id)
        .ok_or(ReportError::MissingValue(id.index()))?;
    round_within(value, tolerance, || format!("#{}", id.index()))
}

/// Every variable of `problem` by name, rounded as in [`integer_value`]
pub fn named_integer_values(
    problem: &LpProblem,
    solution: &Solution,
    tolerance: f64,
) -> Result<BTreeMap<String, i64>, ReportError> {
    problem
        .variable_ids()
        .zip(problem.variables())
        .map(|(id, var)| {
            let rounded = integer_value(solution, id, tolerance).map_err(|e| match e {
                ReportError::NotIntegral { value, .. } => ReportError::NotIntegral {
                    variable: var.name.clone(),
                    value,
                },
                ReportError::OutOfRange { value, .. } => ReportError::OutOfRange {
                    variable: var.name.clone(),
                    value,
                },
                other => other,
            })?;
            Ok((var.name.clone(), rounded))
        })
        .collect()
}

// 2^63; every f64 strictly below it in magnitude converts to i64 exactly
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

fn round_within(value: f64, tolerance: f64, variable: impl FnOnce() -> String) -> Result<i64, ReportError> {
    let rounded = value.round();
    if !rounded.is_finite() || rounded.abs() >= I64_LIMIT {
        return Err(ReportError::OutOfRange {
            variable: variable(),
            value,
        });
    }
    if (value - rounded).abs() > tolerance {
        return Err(ReportError::NotIntegral {
            variable: variable(),
            value,
        });
    }
    Ok(rounded as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem_with(names: &[&str]) -> LpProblem {
        let mut problem = LpProblem::new();
        for name in names {
            problem.add_variable(*name, 0.0, f64::INFINITY).unwrap();
        }
        problem
    }

    #[test]
    fn test_rounds_residuals() {
        let problem = problem_with(&["a", "b"]);
        let solution = Solution::optimal(vec![2.9999999999999996, 4.0000000001], 7.0);

        let values = named_integer_values(&problem, &solution, 1e-6).unwrap();

        assert_eq!(values.get("a"), Some(&3));
        assert_eq!(values.get("b"), Some(&4));
    }

    #[test]
    fn test_rejects_fractional_values() {
        let problem = problem_with(&["a"]);
        let solution = Solution::optimal(vec![2.5], 2.5);

        assert_eq!(
            named_integer_values(&problem, &solution, 1e-6),
            Err(ReportError::NotIntegral {
                variable: "a".to_string(),
                value: 2.5
            })
        );
    }

    #[test]
    fn test_rejects_values_beyond_i64() {
        let problem = problem_with(&["a", "b"]);
        let solution = Solution::optimal(vec![1.0e19, f64::INFINITY], 0.0);

        assert_eq!(
            named_integer_values(&problem, &solution, 1e-6),
            Err(ReportError::OutOfRange {
                variable: "a".to_string(),
                value: 1.0e19
            })
        );
        let b = problem.variable_by_name("b").unwrap();
        assert!(matches!(
            integer_value(&solution, b, 1e-6),
            Err(ReportError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_requires_optimal_status() {
        let problem = problem_with(&["a"]);
        let id = problem.variable_by_name("a").unwrap();

        assert_eq!(
            integer_value(&Solution::infeasible(), id, 1e-6),
            Err(ReportError::NoSolution(SolutionStatus::Infeasible))
        );
        assert_eq!(
            integer_value(&Solution::unbounded(), id, 1e-6),
            Err(ReportError::NoSolution(SolutionStatus::Unbounded))
        );
    }

    #[test]
    fn test_missing_value() {
        let problem = problem_with(&["a", "b"]);
        let id = problem.variable_by_name("b").unwrap();
        let solution = Solution::optimal(vec![1.0], 1.0);

        assert_eq!(integer_value(&solution, id, 1e-6), Err(ReportError::MissingValue(1)));
    }
}
