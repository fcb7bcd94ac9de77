use std::fmt;
use std::time::Duration;

/// Algorithm used by [`crate::Session::optimize`]
///
/// The numeric ids follow the usual solver convention, `0` primal simplex
/// through `5` deterministic concurrent simplex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Method {
    PrimalSimplex,
    DualSimplex,
    Barrier,
    /// Primal, dual and barrier race; the first optimal finisher wins
    Concurrent,
    /// Primal, dual and barrier all finish; the winner is chosen by a fixed rule
    DeterministicConcurrent,
    /// Like [`Method::DeterministicConcurrent`] over the two simplex methods
    DeterministicConcurrentSimplex,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::PrimalSimplex,
        Method::DualSimplex,
        Method::Barrier,
        Method::Concurrent,
        Method::DeterministicConcurrent,
        Method::DeterministicConcurrentSimplex,
    ];

    pub fn id(&self) -> u8 {
        match self {
            Method::PrimalSimplex => 0,
            Method::DualSimplex => 1,
            Method::Barrier => 2,
            Method::Concurrent => 3,
            Method::DeterministicConcurrent => 4,
            Method::DeterministicConcurrentSimplex => 5,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Method::PrimalSimplex => "primal simplex",
            Method::DualSimplex => "dual simplex",
            Method::Barrier => "barrier",
            Method::Concurrent => "concurrent",
            Method::DeterministicConcurrent => "deterministic concurrent",
            Method::DeterministicConcurrentSimplex => "deterministic concurrent simplex",
        }
    }

    /// Whether this method runs other methods as sub-strategies
    pub fn is_concurrent(&self) -> bool {
        matches!(
            self,
            Method::Concurrent | Method::DeterministicConcurrent | Method::DeterministicConcurrentSimplex
        )
    }

    /// Whether this method can be warm started from a retained basis
    pub fn uses_warm_start(&self) -> bool {
        matches!(self, Method::PrimalSimplex | Method::DualSimplex)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Engine parameters. [`crate::Session::configure`] replaces all of them at once.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub method: Method,
    /// Log solver progress through `tracing`
    pub output: bool,
    /// Compute objective and right-hand side ranging
    pub ranging: bool,
    /// Maximum pivots (or barrier iterations) per solve
    pub max_iterations: usize,
    /// Tolerance for floating point comparisons
    pub tolerance: f64,
    /// Wall clock budget per solve
    pub time_limit: Option<Duration>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            method: Method::PrimalSimplex,
            output: true,
            ranging: true,
            max_iterations: 10000,
            tolerance: 1e-9,
            time_limit: None,
        }
    }
}

impl Params {
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_output(mut self, output: bool) -> Self {
        self.output = output;
        self
    }

    pub fn with_ranging(mut self, ranging: bool) -> Self {
        self.ranging = ranging;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit = limit;
        self
    }
}
