use prodplan_solver::{SolutionStatus, SolverError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("Invalid data: {0}")]
    DataValidation(String),
    #[error("Cannot build model: {0}")]
    ModelBuild(String),
    /// `None` when the engine errored instead of returning a status
    #[error("Cannot report on a {} run, only optimal runs carry sensitivity data", run_end(.0))]
    ReportOnNonOptimal(Option<SolutionStatus>),
    #[error("Engine error: {0}")]
    Engine(#[from] SolverError),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error in {0}: {1}")]
    Parse(String, String),
}

fn run_end(status: &Option<SolutionStatus>) -> &'static str {
    status.map_or("failed", |s| s.as_str())
}

impl PlanError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        PlanError::DataValidation(message.into())
    }
}
