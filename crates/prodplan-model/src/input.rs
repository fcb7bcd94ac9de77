use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::catalog::{ProductCatalog, ResourceCatalog};
use crate::error::PlanError;

/// A plan file: resource capacities and product definitions, keyed by name.
///
/// ```json
/// {
///   "name": "bakery",
///   "resources": { "flour": 100, "oven": 40 },
///   "products": {
///     "bread": { "profit": 3, "consumption": { "flour": 2, "oven": 1 } }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub resources: IndexMap<String, f64>,
    pub products: IndexMap<String, ProductInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    pub profit: f64,
    #[serde(default)]
    pub consumption: IndexMap<String, f64>,
}

impl PlanInput {
    pub fn from_json(source: &str) -> Result<Self, PlanError> {
        serde_json::from_str(source).map_err(|e| PlanError::Parse("<input>".to_string(), e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| PlanError::Io(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&source).map_err(|e| PlanError::Parse(path.display().to_string(), e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, PlanError> {
        serde_json::to_string_pretty(self).map_err(|e| PlanError::Parse("<output>".to_string(), e.to_string()))
    }

    /// Validate every entry and every resource reference
    pub fn into_catalogs(&self) -> Result<(ResourceCatalog, ProductCatalog), PlanError> {
        let mut resources = ResourceCatalog::new();
        for (name, &capacity) in &self.resources {
            resources.insert(name.as_str(), capacity)?;
        }

        let mut products = ProductCatalog::new();
        for (name, product) in &self.products {
            products.insert(
                name.as_str(),
                product.profit,
                product.consumption.iter().map(|(r, &amount)| (r.as_str(), amount)),
            )?;
        }

        products.check_references(&resources)?;
        Ok((resources, products))
    }
}
