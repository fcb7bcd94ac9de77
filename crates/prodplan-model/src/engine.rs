use prodplan_solver::{ConstraintInfo, LpProblem, Method, Params, Session, SolutionStatus, SolverError, VariableInfo};

/// The narrow interface the planning layer needs from an LP engine.
///
/// Accessors are only meaningful after `solve` returned
/// [`SolutionStatus::Optimal`]; otherwise they return an error.
pub trait SolverEngine {
    /// Replace every engine parameter
    fn configure(&mut self, params: Params);

    /// Forget any previous model, basis and solution
    fn reset(&mut self);

    fn solve(&mut self, problem: &LpProblem) -> Result<SolutionStatus, SolverError>;

    fn objective_value(&self) -> Result<f64, SolverError>;

    fn variable(&self, index: usize) -> Result<&VariableInfo, SolverError>;

    fn constraint(&self, index: usize) -> Result<&ConstraintInfo, SolverError>;

    fn iterations(&self) -> usize {
        0
    }

    /// Sub-method that produced the result of a concurrent run
    fn winner(&self) -> Option<Method> {
        None
    }
}

impl SolverEngine for Session {
    fn configure(&mut self, params: Params) {
        Session::configure(self, params);
    }

    fn reset(&mut self) {
        Session::reset(self);
    }

    fn solve(&mut self, problem: &LpProblem) -> Result<SolutionStatus, SolverError> {
        self.optimize(problem)
    }

    fn objective_value(&self) -> Result<f64, SolverError> {
        Session::objective_value(self)
    }

    fn variable(&self, index: usize) -> Result<&VariableInfo, SolverError> {
        Session::variable(self, index)
    }

    fn constraint(&self, index: usize) -> Result<&ConstraintInfo, SolverError> {
        Session::constraint(self, index)
    }

    fn iterations(&self) -> usize {
        Session::iterations(self)
    }

    fn winner(&self) -> Option<Method> {
        Session::winner(self)
    }
}
