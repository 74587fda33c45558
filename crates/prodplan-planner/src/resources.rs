use std::collections::HashMap;
use std::fmt;

use crate::planner::PlanError;

/// Raw material consumed by production
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Resource {
    Water,
    Sugar,
    LemonJuice,
    FruitPuree,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Water,
        Resource::Sugar,
        Resource::LemonJuice,
        Resource::FruitPuree,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Resource::Water => "water",
            Resource::Sugar => "sugar",
            Resource::LemonJuice => "lemon_juice",
            Resource::FruitPuree => "fruit_puree",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.key() == key)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Product {
    Lemonade,
    FruitJuice,
}

impl Product {
    pub const ALL: [Product; 2] = [Product::Lemonade, Product::FruitJuice];

    pub fn key(self) -> &'static str {
        match self {
            Product::Lemonade => "lemonade",
            Product::FruitJuice => "fruit_juice",
        }
    }

    /// Units of `resource` needed for one unit of this product
    pub fn usage(self, resource: Resource) -> u64 {
        match (self, resource) {
            (Product::Lemonade, Resource::Water) => 2,
            (Product::Lemonade, Resource::Sugar) => 1,
            (Product::Lemonade, Resource::LemonJuice) => 1,
            (Product::Lemonade, Resource::FruitPuree) => 0,
            (Product::FruitJuice, Resource::Water) => 1,
            (Product::FruitJuice, Resource::Sugar) => 0,
            (Product::FruitJuice, Resource::LemonJuice) => 0,
            (Product::FruitJuice, Resource::FruitPuree) => 2,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Available stock of every resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceLimits {
    pub water: u64,
    pub sugar: u64,
    pub lemon_juice: u64,
    pub fruit_puree: u64,
}

impl ResourceLimits {
    pub fn new(water: u64, sugar: u64, lemon_juice: u64, fruit_puree: u64) -> Self {
        Self {
            water,
            sugar,
            lemon_juice,
            fruit_puree,
        }
    }

    pub fn get(&self, resource: Resource) -> u64 {
        match resource {
            Resource::Water => self.water,
            Resource::Sugar => self.sugar,
            Resource::LemonJuice => self.lemon_juice,
            Resource::FruitPuree => self.fruit_puree,
        }
    }

    pub fn set(&mut self, resource: Resource, amount: u64) {
        match resource {
            Resource::Water => self.water = amount,
            Resource::Sugar => self.sugar = amount,
            Resource::LemonJuice => self.lemon_juice = amount,
            Resource::FruitPuree => self.fruit_puree = amount,
        }
    }

    pub fn with(mut self, resource: Resource, amount: u64) -> Self {
        self.set(resource, amount);
        self
    }

    /// Build limits from string keys; every resource must be present exactly
    /// once and no other key is accepted
    pub fn from_map(map: &HashMap<String, u64>) -> Result<Self, PlanError> {
        if let Some(unknown) = map.keys().find(|k| Resource::from_key(k).is_none()) {
            return Err(PlanError::UnknownResource(unknown.clone()));
        }
        let mut limits = Self::default();
        for resource in Resource::ALL {
            let amount = map
                .get(resource.key())
                .ok_or(PlanError::MissingResource(resource))?;
            limits.set(resource, *amount);
        }
        Ok(limits)
    }
}
