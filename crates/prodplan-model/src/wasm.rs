//! WASM bindings for browser front ends

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::builder::build;
use crate::input::PlanInput;
use crate::report::{SensitivityReport, report};
use crate::runner::{RunConfig, Runner};

/// Outcome of one algorithm for JavaScript
#[derive(Serialize)]
struct AlgorithmResult {
    algorithm: String,
    report: Option<SensitivityReport>,
    error: Option<String>,
}

/// Check a plan file and return the problems found, empty when it is valid
#[derive(Serialize)]
struct Validation {
    valid: bool,
    resources: usize,
    products: usize,
    errors: Vec<String>,
}

/// Solve a JSON plan with every algorithm and return the reports as JSON
#[wasm_bindgen]
pub fn solve_plan(source: &str) -> Result<JsValue, JsValue> {
    let to_js = |e: crate::PlanError| JsValue::from_str(&e.to_string());

    let input = PlanInput::from_json(source).map_err(to_js)?;
    let (resources, products) = input.into_catalogs().map_err(to_js)?;
    let model = build(&resources, &products).map_err(to_js)?;

    let results: Vec<AlgorithmResult> = Runner::new(RunConfig::default())
        .run(&model)
        .iter()
        .map(|run| match report(&model, run) {
            Ok(report) => AlgorithmResult {
                algorithm: run.algorithm.name().to_string(),
                report: Some(report),
                error: None,
            },
            Err(e) => AlgorithmResult {
                algorithm: run.algorithm.name().to_string(),
                report: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    serde_wasm_bindgen::to_value(&results).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn validate_plan(source: &str) -> JsValue {
    let validation = match PlanInput::from_json(source) {
        Ok(input) => {
            let checked = input
                .into_catalogs()
                .and_then(|(resources, products)| build(&resources, &products).map(|_| ()));
            Validation {
                valid: checked.is_ok(),
                resources: input.resources.len(),
                products: input.products.len(),
                errors: checked.err().map(|e| e.to_string()).into_iter().collect(),
            }
        }
        Err(e) => Validation {
            valid: false,
            resources: 0,
            products: 0,
            errors: vec![e.to_string()],
        },
    };
    serde_wasm_bindgen::to_value(&validation).unwrap_or(JsValue::NULL)
}
