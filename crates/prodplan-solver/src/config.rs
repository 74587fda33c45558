use std::time::Duration;

use crate::solution::SolverError;

/// Settings passed into every solve call
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Tolerance for feasibility and optimality comparisons in the simplex
    pub tolerance: f64,
    /// Distance from the nearest integer still accepted as integral
    pub integrality_tolerance: f64,
    /// Pivot budget for a single relaxation, shared by both phases
    pub max_iterations: usize,
    /// Relaxations branch-and-bound may solve before it stops with the best
    /// incumbent found so far
    pub max_nodes: usize,
    /// Wall-clock budget for branch-and-bound; the best incumbent found so far
    /// is returned when it runs out
    pub time_limit: Option<Duration>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            integrality_tolerance: 1e-6,
            max_iterations: 10000,
            max_nodes: 100_000,
            time_limit: None,
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_integrality_tolerance(mut self, tol: f64) -> Self {
        self.integrality_tolerance = tol;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Tolerances must be finite and strictly positive
    pub fn validate(&self) -> Result<(), SolverError> {
        for (name, value) in [
            ("tolerance", self.tolerance),
            ("integrality_tolerance", self.integrality_tolerance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SolverError::InvalidConfig(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(SolverConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_tolerances() {
        for tol in [0.0, -1e-9, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                SolverConfig::default().with_tolerance(tol).validate(),
                Err(SolverError::InvalidConfig(_))
            ));
            assert!(matches!(
                SolverConfig::default().with_integrality_tolerance(tol).validate(),
                Err(SolverError::InvalidConfig(_))
            ));
        }
    }
}
