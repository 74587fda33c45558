use std::collections::HashSet;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unknown variable handle #{0}")]
    UnknownVariable(usize),
    #[error("Duplicate variable name: {0}")]
    DuplicateVariable(String),
    #[error("Duplicate constraint name: {0}")]
    DuplicateConstraint(String),
    #[error("Variable {variable} appears more than once in {context}")]
    DuplicateCoefficient { variable: String, context: String },
    #[error("Invalid lower bound {lower} for {name}: must be finite and non-negative")]
    InvalidLowerBound { name: String, lower: f64 },
    #[error("Inconsistent bounds for {name}: lower {lower} exceeds upper {upper}")]
    InconsistentBounds { name: String, lower: f64, upper: f64 },
    #[error("Non-finite value {value} in {context}")]
    NonFinite { context: String, value: f64 },
}

/// Handle to a variable registered in an [`LpProblem`]
///
/// Handles index the model's variables in insertion order, which is also the
/// order of [`Solution::values`](crate::Solution::values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableId(usize);

impl VariableId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variable {
    pub name: String,
    pub lower: f64,
    /// `f64::INFINITY` when unbounded above
    pub upper: f64,
    pub integer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sense {
    Maximize,
    Minimize,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Sparse coefficients, one entry per variable
    pub coefficients: Vec<(VariableId, f64)>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Objective {
    pub coefficients: Vec<(VariableId, f64)>,
    pub sense: Sense,
}

/// A mixed-integer linear program
///
/// Built once by a single writer, then handed read-only to
/// [`solve`](crate::solve) or [`solve_relaxation`](crate::solve_relaxation).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LpProblem {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Objective,
}

impl Default for LpProblem {
    fn default() -> Self {
        Self::new()
    }
}

impl LpProblem {
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: Objective {
                coefficients: Vec::new(),
                sense: Sense::Minimize,
            },
        }
    }

    /// Register an integer variable with bounds `lower <= x <= upper`
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
    ) -> Result<VariableId, ModelError> {
        self.push_variable(name.into(), lower, upper, true)
    }

    /// Register a continuous variable with bounds `lower <= x <= upper`
    pub fn add_continuous_variable(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
    ) -> Result<VariableId, ModelError> {
        self.push_variable(name.into(), lower, upper, false)
    }

    fn push_variable(
        &mut self,
        name: String,
        lower: f64,
        upper: f64,
        integer: bool,
    ) -> Result<VariableId, ModelError> {
        if self.variables.iter().any(|v| v.name == name) {
            return Err(ModelError::DuplicateVariable(name));
        }
        if !lower.is_finite() || lower < 0.0 {
            return Err(ModelError::InvalidLowerBound { name, lower });
        }
        if upper.is_nan() {
            return Err(ModelError::NonFinite {
                context: format!("upper bound of {name}"),
                value: upper,
            });
        }
        if lower > upper {
            return Err(ModelError::InconsistentBounds { name, lower, upper });
        }

        let id = VariableId(self.variables.len());
        self.variables.push(Variable {
            name,
            lower,
            upper,
            integer,
        });
        Ok(id)
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        coefficients: impl IntoIterator<Item = (VariableId, f64)>,
        op: ConstraintOp,
        rhs: f64,
    ) -> Result<(), ModelError> {
        let name = name.into();
        if self.constraints.iter().any(|c| c.name == name) {
            return Err(ModelError::DuplicateConstraint(name));
        }
        if !rhs.is_finite() {
            return Err(ModelError::NonFinite {
                context: format!("right-hand side of {name}"),
                value: rhs,
            });
        }
        let coefficients = self.check_coefficients(coefficients, &format!("constraint {name}"))?;

        self.constraints.push(Constraint {
            name,
            coefficients,
            op,
            rhs,
        });
        Ok(())
    }

    /// Set the objective, replacing any previous one
    pub fn set_objective(
        &mut self,
        coefficients: impl IntoIterator<Item = (VariableId, f64)>,
        sense: Sense,
    ) -> Result<(), ModelError> {
        let coefficients = self.check_coefficients(coefficients, "objective")?;
        self.objective = Objective { coefficients, sense };
        Ok(())
    }

    fn check_coefficients(
        &self,
        coefficients: impl IntoIterator<Item = (VariableId, f64)>,
        context: &str,
    ) -> Result<Vec<(VariableId, f64)>, ModelError> {
        let mut seen = HashSet::new();
        let mut checked = Vec::new();
        for (id, coef) in coefficients {
            let variable = self
                .variables
                .get(id.0)
                .ok_or(ModelError::UnknownVariable(id.0))?;
            if !seen.insert(id) {
                return Err(ModelError::DuplicateCoefficient {
                    variable: variable.name.clone(),
                    context: context.to_string(),
                });
            }
            if !coef.is_finite() {
                return Err(ModelError::NonFinite {
                    context: format!("coefficient of {} in {context}", variable.name),
                    value: coef,
                });
            }
            checked.push((id, coef));
        }
        Ok(checked)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.0)
    }

    pub fn variable_by_name(&self, name: &str) -> Option<VariableId> {
        self.variables.iter().position(|v| v.name == name).map(VariableId)
    }

    pub fn variable_ids(&self) -> impl Iterator<Item = VariableId> + '_ {
        (0..self.variables.len()).map(VariableId)
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Declared `(lower, upper)` bounds of every variable, in index order
    pub(crate) fn root_bounds(&self) -> Vec<(f64, f64)> {
        self.variables.iter().map(|v| (v.lower, v.upper)).collect()
    }

    pub(crate) fn dense_objective(&self) -> Vec<f64> {
        densify(&self.objective.coefficients, self.variables.len())
    }
}

impl Constraint {
    pub(crate) fn dense(&self, n: usize) -> Vec<f64> {
        densify(&self.coefficients, n)
    }

    /// Left-hand side evaluated at `values`
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .map(|&(id, coef)| coef * values.get(id.0).copied().unwrap_or(0.0))
            .sum()
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.activity(values);
        match self.op {
            ConstraintOp::Le => lhs <= self.rhs + tolerance,
            ConstraintOp::Ge => lhs >= self.rhs - tolerance,
            ConstraintOp::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

fn densify(coefficients: &[(VariableId, f64)], n: usize) -> Vec<f64> {
    let mut dense = vec![0.0; n];
    for &(id, coef) in coefficients {
        dense[id.0] = coef;
    }
    dense
}
