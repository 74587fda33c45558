//! Production planning for a two-product juice line
//!
//! Lemonade and fruit juice compete for water; each also needs its own
//! ingredients. [`optimize_production`] picks the whole-unit mix that makes
//! the most products without overdrawing any resource.

pub mod planner;
pub mod resources;

pub use planner::{
    MAX_LIMIT, PlanError, ProductVars, ProductionPlan, build_model, optimize_production, optimize_production_with,
};
pub use resources::{Product, Resource, ResourceLimits};
