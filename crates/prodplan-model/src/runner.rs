//! Solve one planning model with every configured algorithm.
//!
//! Each algorithm gets a freshly reset and fully configured engine, so no
//! basis or parameter from an earlier run can influence a later one.

use std::time::Duration;

use prodplan_solver::{Method, Params, SensitivityRange, Session, SolutionStatus, SolverError};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::builder::PlanningModel;
use crate::engine::SolverEngine;

/// Settings applied to the engine before every algorithm
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Algorithms to run, in output order
    pub algorithms: Vec<Method>,
    /// Let the engine log its own progress
    pub output: bool,
    pub ranging: bool,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub time_limit: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        let params = Params::default();
        Self {
            algorithms: Method::ALL.to_vec(),
            output: false,
            ranging: params.ranging,
            max_iterations: params.max_iterations,
            tolerance: params.tolerance,
            time_limit: params.time_limit,
        }
    }
}

impl RunConfig {
    /// Complete engine parameters for one algorithm
    pub fn params_for(&self, method: Method) -> Params {
        Params {
            method,
            output: self.output,
            ranging: self.ranging,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            time_limit: self.time_limit,
        }
    }
}

/// Optimal values of one product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductResult {
    pub name: String,
    pub quantity: f64,
    pub reduced_cost: f64,
    pub profit: f64,
    pub profit_range: Option<SensitivityRange>,
}

/// Optimal values of one resource row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceResult {
    pub name: String,
    pub usage: f64,
    pub slack: f64,
    pub shadow_price: f64,
    pub capacity: f64,
    pub binding: bool,
    pub capacity_range: Option<SensitivityRange>,
}

/// Everything read back from the engine after an optimal solve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionRecord {
    pub algorithm: Method,
    pub winner: Option<Method>,
    pub objective_value: f64,
    pub iterations: usize,
    pub products: Vec<ProductResult>,
    pub resources: Vec<ResourceResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Solved(SolutionRecord),
    /// The engine finished without an optimum; nothing else was read
    NotOptimal(SolutionStatus),
    /// The engine errored instead of returning a status
    EngineFailed(SolverError),
}

impl RunOutcome {
    pub fn record(&self) -> Option<&SolutionRecord> {
        match self {
            RunOutcome::Solved(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_solved(&self) -> bool {
        matches!(self, RunOutcome::Solved(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmRun {
    pub algorithm: Method,
    pub outcome: RunOutcome,
}

/// Drives one engine through a list of algorithms
pub struct Runner<E: SolverEngine = Session> {
    engine: E,
    config: RunConfig,
}

impl Runner<Session> {
    pub fn new(config: RunConfig) -> Self {
        Self::with_engine(Session::new(), config)
    }
}

impl<E: SolverEngine> Runner<E> {
    pub fn with_engine(engine: E, config: RunConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Run every algorithm of the configuration
    pub fn run(&mut self, model: &PlanningModel) -> Vec<AlgorithmRun> {
        let algorithms = self.config.algorithms.clone();
        self.run_all(model, &algorithms)
    }

    /// Run `algorithms` in order. A failing algorithm is recorded and the
    /// batch goes on.
    pub fn run_all(&mut self, model: &PlanningModel, algorithms: &[Method]) -> Vec<AlgorithmRun> {
        algorithms
            .iter()
            .map(|&algorithm| AlgorithmRun {
                algorithm,
                outcome: self.run_one(model, algorithm),
            })
            .collect()
    }

    pub fn run_one(&mut self, model: &PlanningModel, algorithm: Method) -> RunOutcome {
        self.engine.reset();
        self.engine.configure(self.config.params_for(algorithm));
        debug!(algorithm = %algorithm, "engine reset and configured");

        let status = match self.engine.solve(model.lp()) {
            Ok(status) => status,
            Err(e) => {
                error!(algorithm = %algorithm, error = %e, "engine failed");
                return RunOutcome::EngineFailed(e);
            }
        };

        if status != SolutionStatus::Optimal {
            warn!(algorithm = %algorithm, status = %status, "no optimal solution");
            return RunOutcome::NotOptimal(status);
        }

        match self.read_record(model, algorithm) {
            Ok(record) => {
                info!(
                    algorithm = %algorithm,
                    objective = record.objective_value,
                    iterations = record.iterations,
                    "optimal"
                );
                RunOutcome::Solved(record)
            }
            Err(e) => {
                error!(algorithm = %algorithm, error = %e, "reading the optimal solution failed");
                RunOutcome::EngineFailed(e)
            }
        }
    }

    fn read_record(&self, model: &PlanningModel, algorithm: Method) -> Result<SolutionRecord, SolverError> {
        let engine = &self.engine;

        let products = model
            .products()
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let v = engine.variable(j)?;
                Ok(ProductResult {
                    name: name.clone(),
                    quantity: v.value,
                    reduced_cost: v.reduced_cost,
                    profit: v.objective,
                    profit_range: v.objective_range,
                })
            })
            .collect::<Result<Vec<_>, SolverError>>()?;

        let resources = model
            .resources()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let c = engine.constraint(i)?;
                Ok(ResourceResult {
                    name: name.clone(),
                    usage: c.activity,
                    slack: c.slack,
                    shadow_price: c.dual,
                    capacity: c.rhs,
                    binding: c.binding,
                    capacity_range: c.rhs_range,
                })
            })
            .collect::<Result<Vec<_>, SolverError>>()?;

        Ok(SolutionRecord {
            algorithm,
            winner: engine.winner(),
            objective_value: engine.objective_value()?,
            iterations: engine.iterations(),
            products,
            resources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::catalog::{ProductCatalog, ResourceCatalog};

    fn model() -> PlanningModel {
        let mut resources = ResourceCatalog::new();
        resources.insert("flour", 100.0).unwrap();
        resources.insert("oven", 40.0).unwrap();
        let mut products = ProductCatalog::new();
        products.insert("bread", 3.0, [("flour", 2.0), ("oven", 1.0)]).unwrap();
        products.insert("cake", 5.0, [("oven", 2.0)]).unwrap();
        build(&resources, &products).unwrap()
    }

    #[test]
    fn test_default_config_runs_all_algorithms() {
        let config = RunConfig::default();
        assert_eq!(config.algorithms, Method::ALL.to_vec());
        assert!(!config.output);
        assert!(config.ranging);

        let params = config.params_for(Method::Barrier);
        assert_eq!(params.method, Method::Barrier);
        assert!(!params.output);
    }

    #[test]
    fn test_run_keeps_algorithm_order() {
        let mut runner = Runner::new(RunConfig::default());
        let order = [Method::Barrier, Method::PrimalSimplex, Method::Concurrent];
        let runs = runner.run_all(&model(), &order);

        let algorithms: Vec<Method> = runs.iter().map(|r| r.algorithm).collect();
        assert_eq!(algorithms, order.to_vec());
        for run in &runs {
            let record = run.outcome.record().unwrap();
            assert_eq!(record.algorithm, run.algorithm);
            // bread = 40, cake = 0 beats everything else: 120
            assert!((record.objective_value - 120.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_record_names_follow_model() {
        let mut runner = Runner::new(RunConfig::default());
        let outcome = runner.run_one(&model(), Method::DualSimplex);
        let record = outcome.record().unwrap();

        assert_eq!(record.products[0].name, "bread");
        assert_eq!(record.products[1].name, "cake");
        assert_eq!(record.resources[1].name, "oven");
        assert!(record.resources[1].binding);
        assert!((record.resources[1].shadow_price - 3.0).abs() < 1e-6);
        assert!((record.resources[0].slack - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_optimal_is_recorded() {
        let mut resources = ResourceCatalog::new();
        resources.insert("flour", 10.0).unwrap();
        let mut products = ProductCatalog::new();
        // Uses no resource, so nothing limits it
        products.insert("air", 1.0, Vec::<(String, f64)>::new()).unwrap();
        let model = build(&resources, &products).unwrap();

        let mut runner = Runner::new(RunConfig::default());
        let runs = runner.run_all(&model, &[Method::PrimalSimplex, Method::DualSimplex]);
        assert_eq!(runs.len(), 2);
        for run in runs {
            assert_eq!(run.outcome, RunOutcome::NotOptimal(SolutionStatus::Unbounded));
        }
    }
}
