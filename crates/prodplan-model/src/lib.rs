pub mod builder;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod input;
pub mod report;
pub mod runner;
pub mod scenario;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use builder::{PlanningModel, build};
pub use catalog::{Product, ProductCatalog, Resource, ResourceCatalog};
pub use engine::SolverEngine;
pub use error::PlanError;
pub use input::{PlanInput, ProductInput};
pub use report::{Interval, ProductReport, ResourceReport, SensitivityReport, report, report_all, report_record};
pub use runner::{AlgorithmRun, ProductResult, ResourceResult, RunConfig, RunOutcome, Runner, SolutionRecord};
