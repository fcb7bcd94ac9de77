use std::fmt;

use crate::method::Method;

/// The result of solving an LP problem
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Method the session was configured with
    pub method: Method,
    /// Strategy that produced the result when `method` races several
    pub winner: Option<Method>,
    /// Optimal values for each variable
    pub values: Vec<f64>,
    /// Optimal objective value
    pub objective_value: f64,
    /// Simplex pivots plus barrier iterations spent
    pub iterations: usize,
    /// Detailed analysis, empty unless the status is optimal
    pub analysis: Analysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// Stopped at the iteration limit
    IterationLimit,
    /// Stopped at the time limit
    TimeLimit,
    /// Numerical trouble prevented a reliable answer
    Numerical,
    /// Cancelled by another strategy finishing first
    Interrupted,
}

/// Detailed analysis of the optimal solution
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Analysis {
    /// Per-variable artifacts, in column order
    pub variables: Vec<VariableInfo>,
    /// Per-constraint artifacts, in row order
    pub constraints: Vec<ConstraintInfo>,
    /// Optimal basis. Indices below the variable count are structural
    /// columns, `num_variables + i` is the logical column of row `i`.
    pub basis: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VariableInfo {
    /// Variable name
    pub name: String,
    /// Current value in solution
    pub value: f64,
    /// Reduced cost in the problem's own objective sense
    pub reduced_cost: f64,
    /// Objective coefficient
    pub objective: f64,
    /// Is this variable in the basis?
    pub is_basic: bool,
    /// Range of the objective coefficient over which the basis stays optimal
    pub objective_range: Option<SensitivityRange>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConstraintInfo {
    /// Constraint name
    pub name: String,
    /// Left-hand side at the solution
    pub activity: f64,
    /// `rhs - activity`
    pub slack: f64,
    /// Shadow price in the problem's own objective sense
    pub dual: f64,
    /// Right-hand side value
    pub rhs: f64,
    /// Whether the constraint holds with equality at the optimum
    pub binding: bool,
    /// Range of the right-hand side over which the duals stay valid
    pub rhs_range: Option<SensitivityRange>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensitivityRange {
    /// Lower bound of range where solution structure stays same
    pub lower_bound: f64,
    /// Upper bound of range where solution structure stays same
    pub upper_bound: f64,
}

impl SensitivityRange {
    pub fn new(lower_bound: f64, upper_bound: f64) -> Self {
        Self { lower_bound, upper_bound }
    }

    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        value >= self.lower_bound - tolerance && value <= self.upper_bound + tolerance
    }
}

impl Solution {
    /// A solution carrying only a termination status
    pub fn terminated(status: SolutionStatus, method: Method, iterations: usize) -> Self {
        Self {
            status,
            method,
            winner: None,
            values: Vec::new(),
            objective_value: f64::NAN,
            iterations,
            analysis: Analysis::default(),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }
}

impl SolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolutionStatus::Optimal => "OPTIMAL",
            SolutionStatus::Infeasible => "INFEASIBLE",
            SolutionStatus::Unbounded => "UNBOUNDED",
            SolutionStatus::IterationLimit => "ITERATION_LIMIT",
            SolutionStatus::TimeLimit => "TIME_LIMIT",
            SolutionStatus::Numerical => "NUMERIC",
            SolutionStatus::Interrupted => "INTERRUPTED",
        }
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
