//! Economic reading of an optimal run: quantities, reduced costs, shadow
//! prices, slacks and the ranges over which they hold.

use prodplan_solver::SensitivityRange;
use serde::Serialize;
use tracing::warn;

use crate::builder::PlanningModel;
use crate::error::PlanError;
use crate::runner::{AlgorithmRun, RunOutcome, SolutionRecord};

/// A closed interval; `None` marks an unbounded side
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl From<SensitivityRange> for Interval {
    fn from(range: SensitivityRange) -> Self {
        let finite = |v: f64| v.is_finite().then_some(v);
        Self {
            low: finite(range.lower_bound),
            high: finite(range.upper_bound),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductReport {
    pub name: String,
    pub quantity: f64,
    pub reduced_cost: f64,
    pub profit: f64,
    pub profit_range: Option<Interval>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceReport {
    pub name: String,
    pub usage: f64,
    pub slack: f64,
    pub shadow_price: f64,
    pub capacity: f64,
    pub binding: bool,
    pub capacity_range: Option<Interval>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityReport {
    pub algorithm: String,
    pub algorithm_id: u8,
    /// Sub-method that produced the result of a concurrent run
    pub winner: Option<String>,
    pub iterations: usize,
    pub objective_value: f64,
    pub products: Vec<ProductReport>,
    pub resources: Vec<ResourceReport>,
    /// Resources used up at the optimum, in catalog order
    pub binding_resources: Vec<String>,
}

/// Report on one run. Runs without an optimum, including runs where the
/// engine failed, have nothing to report.
pub fn report(model: &PlanningModel, run: &AlgorithmRun) -> Result<SensitivityReport, PlanError> {
    match &run.outcome {
        RunOutcome::Solved(record) => report_record(model, record),
        RunOutcome::NotOptimal(status) => Err(PlanError::ReportOnNonOptimal(Some(*status))),
        RunOutcome::EngineFailed(e) => {
            warn!(algorithm = %run.algorithm, error = %e, "no report for a failed run");
            Err(PlanError::ReportOnNonOptimal(None))
        }
    }
}

pub fn report_record(model: &PlanningModel, record: &SolutionRecord) -> Result<SensitivityReport, PlanError> {
    let same_products = record.products.iter().map(|p| &p.name).eq(model.products());
    let same_resources = record.resources.iter().map(|r| &r.name).eq(model.resources());
    if !same_products || !same_resources {
        return Err(PlanError::ModelBuild(format!(
            "Solution of {} was recorded for a different model",
            record.algorithm
        )));
    }

    let products = record
        .products
        .iter()
        .map(|p| ProductReport {
            name: p.name.clone(),
            quantity: p.quantity,
            reduced_cost: p.reduced_cost,
            profit: p.profit,
            profit_range: p.profit_range.map(Interval::from),
        })
        .collect();

    let resources: Vec<ResourceReport> = record
        .resources
        .iter()
        .map(|r| ResourceReport {
            name: r.name.clone(),
            usage: r.usage,
            slack: r.slack,
            shadow_price: r.shadow_price,
            capacity: r.capacity,
            binding: r.binding,
            capacity_range: r.capacity_range.map(Interval::from),
        })
        .collect();

    let binding_resources = resources
        .iter()
        .filter(|r| r.binding)
        .map(|r| r.name.clone())
        .collect();

    Ok(SensitivityReport {
        algorithm: record.algorithm.name().to_string(),
        algorithm_id: record.algorithm.id(),
        winner: record.winner.map(|w| w.name().to_string()),
        iterations: record.iterations,
        objective_value: record.objective_value,
        products,
        resources,
        binding_resources,
    })
}

/// Reports for every solved run, keeping the failures as they are
pub fn report_all(model: &PlanningModel, runs: &[AlgorithmRun]) -> Vec<Result<SensitivityReport, PlanError>> {
    runs.iter().map(|run| report(model, run)).collect()
}
