//! Insertion-ordered catalogs of shared resources and the products that
//! consume them.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::PlanError;

/// A shared input resource with a fixed capacity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub name: String,
    pub capacity: f64,
}

/// A product with its unit profit and per-unit resource consumption
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub name: String,
    pub profit: f64,
    /// Resource name -> units consumed per unit produced. Absent means zero.
    pub consumption: IndexMap<String, f64>,
}

impl Product {
    pub fn consumption_of(&self, resource: &str) -> f64 {
        self.consumption.get(resource).copied().unwrap_or(0.0)
    }
}

fn check_name(kind: &str, name: &str) -> Result<(), PlanError> {
    if name.trim().is_empty() {
        return Err(PlanError::invalid(format!("{} name must not be empty", kind)));
    }
    Ok(())
}

fn check_amount(what: impl FnOnce() -> String, value: f64) -> Result<(), PlanError> {
    if !value.is_finite() {
        return Err(PlanError::invalid(format!("{} is not a finite number", what())));
    }
    if value < 0.0 {
        return Err(PlanError::invalid(format!("{} is negative ({})", what(), value)));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceCatalog {
    resources: IndexMap<String, Resource>,
}

impl ResourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource. Rejects empty or duplicate names and capacities that
    /// are negative or not finite.
    pub fn insert(&mut self, name: impl Into<String>, capacity: f64) -> Result<(), PlanError> {
        let name = name.into();
        check_name("Resource", &name)?;
        check_amount(|| format!("Capacity of resource '{}'", name), capacity)?;
        if self.resources.contains_key(&name) {
            return Err(PlanError::invalid(format!("Duplicate resource '{}'", name)));
        }
        self.resources.insert(name.clone(), Resource { name, capacity });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductCatalog {
    products: IndexMap<String, Product>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product. The profit may have any sign but must be finite;
    /// consumption entries must be finite and non-negative.
    pub fn insert<K, I>(&mut self, name: impl Into<String>, profit: f64, consumption: I) -> Result<(), PlanError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        let name = name.into();
        check_name("Product", &name)?;
        if !profit.is_finite() {
            return Err(PlanError::invalid(format!(
                "Profit of product '{}' is not a finite number",
                name
            )));
        }
        if self.products.contains_key(&name) {
            return Err(PlanError::invalid(format!("Duplicate product '{}'", name)));
        }

        let mut usage = IndexMap::new();
        for (resource, amount) in consumption {
            let resource = resource.into();
            check_name("Resource", &resource)?;
            check_amount(
                || format!("Consumption of '{}' by product '{}'", resource, name),
                amount,
            )?;
            if usage.insert(resource.clone(), amount).is_some() {
                return Err(PlanError::invalid(format!(
                    "Product '{}' lists resource '{}' twice",
                    name, resource
                )));
            }
        }

        self.products.insert(
            name.clone(),
            Product {
                name,
                profit,
                consumption: usage,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Product> {
        self.products.get(name)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// First resource reference that `resources` does not know, as
    /// `(product, resource)`
    pub fn dangling_reference(&self, resources: &ResourceCatalog) -> Option<(&str, &str)> {
        self.iter().find_map(|p| {
            p.consumption
                .keys()
                .find(|r| !resources.contains(r))
                .map(|r| (p.name.as_str(), r.as_str()))
        })
    }

    /// Reject products consuming resources missing from `resources`
    pub fn check_references(&self, resources: &ResourceCatalog) -> Result<(), PlanError> {
        match self.dangling_reference(resources) {
            Some((product, resource)) => Err(PlanError::invalid(format!(
                "Product '{}' consumes unknown resource '{}'",
                product, resource
            ))),
            None => Ok(()),
        }
    }
}
