mod barrier;
mod concurrent;
mod dual;
mod error;
mod method;
mod problem;
mod session;
mod simplex;
mod solution;
mod tableau;

pub use error::SolverError;
pub use method::{Method, Params};
pub use problem::{Constraint, ConstraintOp, LpProblem, Objective};
pub use session::Session;
pub use simplex::Solver;
pub use solution::{Analysis, ConstraintInfo, SensitivityRange, Solution, SolutionStatus, VariableInfo};
