use tracing::{debug, info};

use crate::error::SolverError;
use crate::method::{Method, Params};
use crate::problem::LpProblem;
use crate::simplex::Solver;
use crate::solution::{ConstraintInfo, Solution, SolutionStatus, VariableInfo};

/// Basis kept from the last optimal solve, tagged with the problem shape
#[derive(Debug, Clone)]
struct WarmStart {
    variables: usize,
    constraints: usize,
    basis: Vec<usize>,
}

/// A stateful engine session.
///
/// The session remembers the last solution and the last optimal basis.
/// Simplex methods warm start from that basis on the next
/// [`Session::optimize`] until [`Session::reset`] discards it.
#[derive(Debug, Clone, Default)]
pub struct Session {
    params: Params,
    last: Option<Solution>,
    warm_start: Option<WarmStart>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: Params) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Replace every parameter at once
    pub fn configure(&mut self, params: Params) {
        self.params = params;
    }

    /// Discard the last solution and any retained basis
    pub fn reset(&mut self) {
        self.last = None;
        self.warm_start = None;
    }

    /// Whether the next simplex solve would warm start
    pub fn has_warm_start(&self) -> bool {
        self.warm_start.is_some()
    }

    pub fn optimize(&mut self, problem: &LpProblem) -> Result<SolutionStatus, SolverError> {
        self.last = None;
        problem.validate()?;

        let method = self.params.method;
        let shape = (problem.num_variables(), problem.num_constraints());
        let warm = self
            .warm_start
            .as_ref()
            .filter(|w| method.uses_warm_start() && (w.variables, w.constraints) == shape)
            .map(|w| w.basis.as_slice());

        if self.params.output {
            info!(
                method = %method,
                variables = shape.0,
                constraints = shape.1,
                warm_start = warm.is_some(),
                "optimizing"
            );
        }

        let solution = Solver::from_params(&self.params).solve_with(problem, method, warm)?;

        if solution.is_optimal() {
            self.warm_start = Some(WarmStart {
                variables: shape.0,
                constraints: shape.1,
                basis: solution.analysis.basis.clone(),
            });
        } else {
            debug!(status = %solution.status, "solve ended without an optimal basis");
        }

        let status = solution.status;
        self.last = Some(solution);
        Ok(status)
    }

    pub fn status(&self) -> Option<SolutionStatus> {
        self.last.as_ref().map(|s| s.status)
    }

    pub fn solution(&self) -> Option<&Solution> {
        self.last.as_ref()
    }

    fn optimal(&self) -> Result<&Solution, SolverError> {
        self.last
            .as_ref()
            .filter(|s| s.is_optimal())
            .ok_or(SolverError::NoSolution)
    }

    pub fn objective_value(&self) -> Result<f64, SolverError> {
        Ok(self.optimal()?.objective_value)
    }

    pub fn iterations(&self) -> usize {
        self.last.as_ref().map_or(0, |s| s.iterations)
    }

    pub fn winner(&self) -> Option<Method> {
        self.last.as_ref().and_then(|s| s.winner)
    }

    pub fn variable(&self, index: usize) -> Result<&VariableInfo, SolverError> {
        self.optimal()?
            .analysis
            .variables
            .get(index)
            .ok_or(SolverError::NoSolution)
    }

    pub fn constraint(&self, index: usize) -> Result<&ConstraintInfo, SolverError> {
        self.optimal()?
            .analysis
            .constraints
            .get(index)
            .ok_or(SolverError::NoSolution)
    }

    pub fn constraint_by_name(&self, name: &str) -> Result<&ConstraintInfo, SolverError> {
        self.optimal()?
            .analysis
            .constraints
            .iter()
            .find(|c| c.name == name)
            .ok_or(SolverError::NoSolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ConstraintOp;

    fn sample() -> LpProblem {
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string(), "z".to_string()]);
        problem.set_objective(vec![3.0, 2.0, 4.0], false);
        problem.add_constraint("a", vec![1.0, 1.0, 2.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("b", vec![2.0, 0.0, 3.0], ConstraintOp::Le, 5.0);
        problem.add_constraint("c", vec![2.0, 1.0, 3.0], ConstraintOp::Le, 7.0);
        problem
    }

    fn params(method: Method) -> Params {
        Params::default().with_method(method).with_output(false)
    }

    #[test]
    fn test_accessors_require_optimal_solve() {
        let session = Session::new();
        assert_eq!(session.status(), None);
        assert_eq!(session.objective_value(), Err(SolverError::NoSolution));
        assert!(session.variable(0).is_err());
    }

    #[test]
    fn test_reset_discards_solution_and_basis() {
        let mut session = Session::with_params(params(Method::PrimalSimplex));
        assert_eq!(session.optimize(&sample()).unwrap(), SolutionStatus::Optimal);
        assert!(session.has_warm_start());
        assert!(session.solution().is_some());

        session.reset();
        assert!(!session.has_warm_start());
        assert!(session.solution().is_none());
        assert_eq!(session.iterations(), 0);
    }

    #[test]
    fn test_warm_start_leaks_without_reset() {
        let problem = sample();

        let mut fresh = Session::with_params(params(Method::DualSimplex));
        fresh.optimize(&problem).unwrap();
        let cold_iterations = fresh.iterations();
        assert!(cold_iterations > 0);

        let mut session = Session::with_params(params(Method::PrimalSimplex));
        session.optimize(&problem).unwrap();
        session.configure(params(Method::DualSimplex));
        session.optimize(&problem).unwrap();

        // Starting from the previous optimal basis needs no pivots at all
        assert_eq!(session.iterations(), 0);
        assert!(session.iterations() < cold_iterations);
    }

    #[test]
    fn test_reset_isolates_methods() {
        let problem = sample();

        let mut alone = Session::with_params(params(Method::DualSimplex));
        alone.optimize(&problem).unwrap();

        let mut shared = Session::with_params(params(Method::PrimalSimplex));
        shared.optimize(&problem).unwrap();
        shared.reset();
        shared.configure(params(Method::DualSimplex));
        shared.optimize(&problem).unwrap();

        let a = alone.solution().unwrap();
        let b = shared.solution().unwrap();
        assert_eq!(a.iterations, b.iterations);
        assert_eq!(a.values, b.values);
        assert_eq!(a.analysis.variables, b.analysis.variables);
        assert_eq!(a.analysis.constraints, b.analysis.constraints);
    }

    #[test]
    fn test_warm_start_ignored_for_other_shapes() {
        let mut session = Session::with_params(params(Method::PrimalSimplex));
        session.optimize(&sample()).unwrap();

        let mut smaller = LpProblem::new(vec!["x".to_string()]);
        smaller.set_objective(vec![1.0], false);
        smaller.add_constraint("cap", vec![1.0], ConstraintOp::Le, 2.0);

        assert_eq!(session.optimize(&smaller).unwrap(), SolutionStatus::Optimal);
        assert!((session.objective_value().unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_optimal_keeps_status_only() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], false);
        problem.add_constraint("floor", vec![1.0], ConstraintOp::Ge, 1.0);

        let mut session = Session::with_params(params(Method::PrimalSimplex));
        assert_eq!(session.optimize(&problem).unwrap(), SolutionStatus::Unbounded);
        assert_eq!(session.status(), Some(SolutionStatus::Unbounded));
        assert!(session.objective_value().is_err());
        assert!(!session.has_warm_start());
    }

    #[test]
    fn test_constraint_by_name() {
        let mut session = Session::with_params(params(Method::PrimalSimplex));
        session.optimize(&sample()).unwrap();
        let b = session.constraint_by_name("b").unwrap();
        assert_eq!(b.rhs, 5.0);
        assert!(session.constraint_by_name("missing").is_err());
    }
}
