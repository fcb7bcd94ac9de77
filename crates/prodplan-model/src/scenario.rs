//! Built-in planning scenarios

use indexmap::IndexMap;

use crate::input::{PlanInput, ProductInput};

const BREWERY_RESOURCES: [(&str, f64); 5] = [
    ("levadura", 7000.0),
    ("cebada", 5000.0),
    ("malta", 5000.0),
    ("trigo", 7000.0),
    ("lupulo", 2000.0),
];

/// Profit, then consumption in resource order
const BREWERY_PRODUCTS: [(&str, f64, [f64; 5]); 7] = [
    ("cervezaA", 2.0, [2.0, 1.0, 0.0, 7.0, 2.0]),
    ("cervezaB", 2.0, [7.0, 1.0, 3.0, 1.0, 2.0]),
    ("cervezaC", 6.0, [1.0, 3.0, 1.0, 3.0, 0.0]),
    ("cervezaD", 10.0, [3.0, 5.0, 2.0, 9.0, 4.0]),
    ("cervezaE", 10.0, [9.0, 5.0, 0.0, 0.0, 9.0]),
    ("cervezaF", 2.0, [0.0, 1.0, 0.0, 1.0, 1.0]),
    ("cervezaG", 8.0, [1.0, 4.0, 4.0, 6.0, 2.0]),
];

/// Seven beers competing for five brewing inputs
pub fn brewery() -> PlanInput {
    let resources = BREWERY_RESOURCES
        .iter()
        .map(|&(name, capacity)| (name.to_string(), capacity))
        .collect();

    let products = BREWERY_PRODUCTS
        .iter()
        .map(|&(name, profit, usage)| {
            let consumption: IndexMap<String, f64> = BREWERY_RESOURCES
                .iter()
                .zip(usage)
                .filter(|(_, amount)| *amount > 0.0)
                .map(|(&(resource, _), amount)| (resource.to_string(), amount))
                .collect();
            (name.to_string(), ProductInput { profit, consumption })
        })
        .collect();

    PlanInput {
        name: Some("brewery".to_string()),
        resources,
        products,
    }
}
