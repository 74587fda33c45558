use std::collections::BTreeMap;

use prodplan_solver::report::integer_value;
use prodplan_solver::{
    ConstraintOp, LpProblem, ModelError, ReportError, Sense, SolutionStatus, SolverConfig, SolverError,
    VariableId,
};
use thiserror::Error;
use tracing::debug;

use crate::resources::{Product, Resource, ResourceLimits};

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Missing limit for resource: {0}")]
    MissingResource(Resource),
    #[error("Unknown resource: {0}")]
    UnknownResource(String),
    #[error("Invalid model: {0}")]
    Model(#[from] ModelError),
    #[error("Solver failure: {0}")]
    Solver(#[from] SolverError),
    #[error("Cannot report plan: {0}")]
    Report(#[from] ReportError),
    #[error("No production plan: solver status is {0:?}")]
    NoPlan(SolutionStatus),
    #[error("Negative quantity {value} for {product}")]
    NegativeQuantity { product: Product, value: i64 },
    #[error("Limit {limit} for {resource} exceeds the exactly representable maximum {MAX_LIMIT}")]
    LimitTooLarge { resource: Resource, limit: u64 },
    #[error("Solved plan overdraws {resource}: needs {needed}, limit is {limit}")]
    Overdraw { resource: Resource, needed: u64, limit: u64 },
}

/// Largest resource limit accepted (2^53). Limits travel through `f64`, which
/// holds every integer up to here exactly.
pub const MAX_LIMIT: u64 = 1 << 53;

/// Handles of the product variables inside a model built by [`build_model`]
#[derive(Debug, Clone, Copy)]
pub struct ProductVars {
    pub lemonade: VariableId,
    pub fruit_juice: VariableId,
}

impl ProductVars {
    pub fn get(&self, product: Product) -> VariableId {
        match product {
            Product::Lemonade => self.lemonade,
            Product::FruitJuice => self.fruit_juice,
        }
    }
}

/// Units of each product to make
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProductionPlan {
    pub lemonade: u64,
    pub fruit_juice: u64,
    pub total_products: u64,
}

impl ProductionPlan {
    pub fn new(lemonade: u64, fruit_juice: u64) -> Self {
        Self {
            lemonade,
            fruit_juice,
            total_products: lemonade.saturating_add(fruit_juice),
        }
    }

    pub fn quantity(&self, product: Product) -> u64 {
        match product {
            Product::Lemonade => self.lemonade,
            Product::FruitJuice => self.fruit_juice,
        }
    }

    /// Amount of `resource` this plan uses up, saturating at `u64::MAX`
    pub fn consumption(&self, resource: Resource) -> u64 {
        Product::ALL
            .into_iter()
            .map(|p| p.usage(resource).saturating_mul(self.quantity(p)))
            .fold(0, u64::saturating_add)
    }

    pub fn fits(&self, limits: &ResourceLimits) -> bool {
        Resource::ALL
            .into_iter()
            .all(|r| self.consumption(r) <= limits.get(r))
    }

    /// The plan keyed by `lemonade`, `fruit_juice` and `total_products`
    pub fn to_map(&self) -> BTreeMap<&'static str, u64> {
        BTreeMap::from([
            (Product::Lemonade.key(), self.lemonade),
            (Product::FruitJuice.key(), self.fruit_juice),
            ("total_products", self.total_products),
        ])
    }
}

/// Integer program maximizing total units under one `<=` row per resource
pub fn build_model(limits: &ResourceLimits) -> Result<(LpProblem, ProductVars), ModelError> {
    let mut problem = LpProblem::new();
    let vars = ProductVars {
        lemonade: problem.add_variable(Product::Lemonade.key(), 0.0, f64::INFINITY)?,
        fruit_juice: problem.add_variable(Product::FruitJuice.key(), 0.0, f64::INFINITY)?,
    };

    problem.set_objective(Product::ALL.map(|p| (vars.get(p), 1.0)), Sense::Maximize)?;

    for resource in Resource::ALL {
        let coefficients: Vec<(VariableId, f64)> = Product::ALL
            .into_iter()
            .filter(|p| p.usage(resource) > 0)
            .map(|p| (vars.get(p), p.usage(resource) as f64))
            .collect();
        problem.add_constraint(
            resource.key(),
            coefficients,
            ConstraintOp::Le,
            limits.get(resource) as f64,
        )?;
    }

    Ok((problem, vars))
}

pub fn optimize_production(limits: &ResourceLimits) -> Result<ProductionPlan, PlanError> {
    optimize_production_with(limits, &SolverConfig::default())
}

pub fn optimize_production_with(
    limits: &ResourceLimits,
    config: &SolverConfig,
) -> Result<ProductionPlan, PlanError> {
    for resource in Resource::ALL {
        let limit = limits.get(resource);
        if limit > MAX_LIMIT {
            return Err(PlanError::LimitTooLarge { resource, limit });
        }
    }

    let (problem, vars) = build_model(limits)?;
    let solution = prodplan_solver::solve(&problem, config)?;
    if solution.status != SolutionStatus::Optimal {
        return Err(PlanError::NoPlan(solution.status));
    }

    let quantity = |product: Product| -> Result<u64, PlanError> {
        let value = integer_value(&solution, vars.get(product), config.integrality_tolerance)?;
        u64::try_from(value).map_err(|_| PlanError::NegativeQuantity { product, value })
    };
    let plan = ProductionPlan::new(quantity(Product::Lemonade)?, quantity(Product::FruitJuice)?);
    if let Some(resource) = Resource::ALL.into_iter().find(|&r| plan.consumption(r) > limits.get(r)) {
        return Err(PlanError::Overdraw {
            resource,
            needed: plan.consumption(resource),
            limit: limits.get(resource),
        });
    }

    debug!(
        ?limits,
        lemonade = plan.lemonade,
        fruit_juice = plan.fruit_juice,
        nodes = solution.stats.nodes,
        "production plan solved"
    );
    Ok(plan)
}
