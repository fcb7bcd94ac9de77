use prodplan_solver::{ConstraintOp, LpProblem};
use tracing::debug;

use crate::catalog::{ProductCatalog, ResourceCatalog};
use crate::error::PlanError;

/// A production planning LP together with the names it was built from.
///
/// Variable `j` is the quantity of `products[j]`; constraint `i` is the
/// capacity row of `resources[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningModel {
    lp: LpProblem,
    products: Vec<String>,
    resources: Vec<String>,
}

impl PlanningModel {
    pub fn lp(&self) -> &LpProblem {
        &self.lp
    }

    pub fn products(&self) -> &[String] {
        &self.products
    }

    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    pub fn num_products(&self) -> usize {
        self.products.len()
    }

    pub fn num_resources(&self) -> usize {
        self.resources.len()
    }

    pub fn product_index(&self, name: &str) -> Option<usize> {
        self.products.iter().position(|p| p == name)
    }

    pub fn resource_index(&self, name: &str) -> Option<usize> {
        self.resources.iter().position(|r| r == name)
    }
}

/// Build the profit maximization LP: one non-negative variable per product,
/// one `<=` capacity row per resource, both in catalog order.
pub fn build(resources: &ResourceCatalog, products: &ProductCatalog) -> Result<PlanningModel, PlanError> {
    if products.is_empty() {
        return Err(PlanError::ModelBuild("No products to plan".to_string()));
    }
    if let Some((product, resource)) = products.dangling_reference(resources) {
        return Err(PlanError::ModelBuild(format!(
            "Product '{}' consumes resource '{}' which is not in the resource catalog",
            product, resource
        )));
    }

    let product_names: Vec<String> = products.iter().map(|p| p.name.clone()).collect();
    let resource_names: Vec<String> = resources.iter().map(|r| r.name.clone()).collect();

    let mut lp = LpProblem::new(product_names.clone());
    lp.set_objective(products.iter().map(|p| p.profit).collect(), false);

    for resource in resources.iter() {
        let coefficients = products
            .iter()
            .map(|p| p.consumption_of(&resource.name))
            .collect();
        lp.add_constraint(resource.name.clone(), coefficients, ConstraintOp::Le, resource.capacity);
    }

    debug!(
        products = product_names.len(),
        resources = resource_names.len(),
        "built planning model"
    );

    Ok(PlanningModel {
        lp,
        products: product_names,
        resources: resource_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalogs() -> (ResourceCatalog, ProductCatalog) {
        let mut resources = ResourceCatalog::new();
        resources.insert("flour", 100.0).unwrap();
        resources.insert("oven", 40.0).unwrap();

        let mut products = ProductCatalog::new();
        products.insert("bread", 3.0, [("flour", 2.0), ("oven", 1.0)]).unwrap();
        products.insert("cake", 5.0, [("oven", 2.0)]).unwrap();
        (resources, products)
    }

    #[test]
    fn test_build_layout() {
        let (resources, products) = catalogs();
        let model = build(&resources, &products).unwrap();
        let lp = model.lp();

        assert_eq!(lp.variables, vec!["bread", "cake"]);
        assert!(!lp.objective.minimize);
        assert_eq!(lp.objective.coefficients, vec![3.0, 5.0]);

        assert_eq!(lp.constraints.len(), 2);
        assert_eq!(lp.constraints[0].name, "flour");
        assert_eq!(lp.constraints[0].coefficients, vec![2.0, 0.0]);
        assert_eq!(lp.constraints[0].rhs, 100.0);
        assert_eq!(lp.constraints[1].coefficients, vec![1.0, 2.0]);
        assert!(lp.constraints.iter().all(|c| c.op == ConstraintOp::Le));

        assert_eq!(model.product_index("cake"), Some(1));
        assert_eq!(model.resource_index("oven"), Some(1));
    }

    #[test]
    fn test_build_does_not_touch_catalogs() {
        let (resources, products) = catalogs();
        let before = (resources.clone(), products.clone());
        build(&resources, &products).unwrap();
        assert_eq!((resources, products), before);
    }

    #[test]
    fn test_dangling_resource_fails_build() {
        let (resources, mut products) = catalogs();
        products.insert("pie", 4.0, [("apples", 3.0)]).unwrap();

        assert!(matches!(
            build(&resources, &products),
            Err(PlanError::ModelBuild(_))
        ));
    }

    #[test]
    fn test_no_products_fails_build() {
        let (resources, _) = catalogs();
        assert!(matches!(
            build(&resources, &ProductCatalog::new()),
            Err(PlanError::ModelBuild(_))
        ));
    }

    #[test]
    fn test_unused_resource_gets_empty_row() {
        let (mut resources, products) = catalogs();
        resources.insert("sugar", 10.0).unwrap();
        let model = build(&resources, &products).unwrap();

        assert_eq!(model.lp().constraints[2].coefficients, vec![0.0, 0.0]);
    }
}
