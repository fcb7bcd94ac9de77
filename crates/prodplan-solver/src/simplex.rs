use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info};

use crate::error::SolverError;
use crate::method::{Method, Params};
use crate::problem::LpProblem;
use crate::solution::{Solution, SolutionStatus};
use crate::tableau::{Layout, PIVOT_TOL, Tableau, clean};

/// Consecutive degenerate pivots tolerated before switching to Bland's rule
const DEGENERATE_LIMIT: usize = 50;

/// LP solver dispatching to the simplex, barrier and concurrent methods
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum iterations before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
    /// Compute objective and RHS ranging on optimal solutions
    ranging: bool,
    /// Log progress through tracing
    output: bool,
    deadline: Option<Instant>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
            ranging: true,
            output: false,
            deadline: None,
            cancel: None,
        }
    }
}

pub(crate) enum SimplexResult {
    Optimal,
    Stopped(SolutionStatus),
}

/// Outcome of one algorithm before artifacts are extracted
pub(crate) struct Run {
    pub(crate) status: SolutionStatus,
    pub(crate) tableau: Option<Tableau>,
    pub(crate) iterations: usize,
}

impl Run {
    pub(crate) fn stopped(status: SolutionStatus, iterations: usize) -> Self {
        Self {
            status,
            tableau: None,
            iterations,
        }
    }

    pub(crate) fn from_result(result: SimplexResult, tableau: Tableau, iterations: usize) -> Self {
        match result {
            SimplexResult::Optimal => Self {
                status: SolutionStatus::Optimal,
                tableau: Some(tableau),
                iterations,
            },
            SimplexResult::Stopped(status) => Self::stopped(status, iterations),
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Solver configured from session parameters. The time limit starts now.
    pub fn from_params(params: &Params) -> Self {
        Self {
            max_iterations: params.max_iterations,
            tolerance: params.tolerance,
            ranging: params.ranging,
            output: params.output,
            deadline: params.time_limit.map(|limit| Instant::now() + limit),
            cancel: None,
        }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_ranging(mut self, ranging: bool) -> Self {
        self.ranging = ranging;
        self
    }

    pub fn with_output(mut self, output: bool) -> Self {
        self.output = output;
        self
    }

    pub(crate) fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub(crate) fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub(crate) fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub(crate) fn output(&self) -> bool {
        self.output
    }

    /// Solve the LP problem using the two-phase primal simplex method
    pub fn solve(&self, problem: &LpProblem) -> Result<Solution, SolverError> {
        self.solve_with(problem, Method::PrimalSimplex, None)
    }

    /// Solve with the given method. Simplex methods start from `warm_start`
    /// (global basis numbering) when it is given and usable.
    pub fn solve_with(
        &self,
        problem: &LpProblem,
        method: Method,
        warm_start: Option<&[usize]>,
    ) -> Result<Solution, SolverError> {
        problem.validate()?;

        let run = match method {
            Method::PrimalSimplex => self.primal(problem, warm_start),
            Method::DualSimplex => self.dual(problem, warm_start),
            Method::Barrier => self.barrier(problem)?,
            Method::Concurrent => return self.concurrent(problem),
            Method::DeterministicConcurrent => {
                return self.deterministic(
                    problem,
                    method,
                    &[Method::DualSimplex, Method::PrimalSimplex, Method::Barrier],
                );
            }
            Method::DeterministicConcurrentSimplex => {
                return self.deterministic(problem, method, &[Method::DualSimplex, Method::PrimalSimplex]);
            }
        };

        let solution = self.finish(problem, method, run);
        if self.output {
            info!(
                method = %method,
                status = %solution.status,
                iterations = solution.iterations,
                objective = solution.objective_value,
                "solve finished"
            );
        }
        Ok(solution)
    }

    /// Turn a finished run into a solution, extracting artifacts when optimal
    pub(crate) fn finish(&self, problem: &LpProblem, method: Method, run: Run) -> Solution {
        match (run.status, run.tableau) {
            (SolutionStatus::Optimal, Some(tableau)) => {
                let (values, analysis) = tableau.extract(problem, self.ranging);
                Solution {
                    status: SolutionStatus::Optimal,
                    method,
                    winner: None,
                    objective_value: clean(problem.objective_at(&values)),
                    values,
                    iterations: run.iterations,
                    analysis,
                }
            }
            (status, _) => Solution::terminated(status, method, run.iterations),
        }
    }

    /// Status to stop with once a limit is hit
    pub(crate) fn stop_reason(&self, iterations: usize) -> Option<SolutionStatus> {
        if iterations >= self.max_iterations {
            return Some(SolutionStatus::IterationLimit);
        }
        if self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Some(SolutionStatus::Interrupted);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Some(SolutionStatus::TimeLimit);
        }
        None
    }

    pub(crate) fn primal(&self, problem: &LpProblem, warm_start: Option<&[usize]>) -> Run {
        let mut iterations = 0;

        if let Some(basis) = warm_start {
            let mut tableau = Tableau::from_basis(problem, Layout::Primal, basis);
            if let Some(result) = self.settle(&mut tableau, &mut iterations) {
                return Run::from_result(result, tableau, iterations);
            }
            debug!("warm start basis rejected, starting from the slack basis");
        }

        let mut tableau = Tableau::build(problem, Layout::Primal);

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 {
            if let SimplexResult::Stopped(status) = self.phase1(&mut tableau, &mut iterations) {
                return Run::stopped(status, iterations);
            }
        }

        // Phase 2: Optimize
        let result = self.phase2(&mut tableau, &mut iterations);
        Run::from_result(result, tableau, iterations)
    }

    /// Bring an installed basis to optimality: primal simplex if it is
    /// primal feasible, dual simplex if it is dual feasible. `None` when it
    /// is neither and the caller has to start over.
    pub(crate) fn settle(&self, tableau: &mut Tableau, iterations: &mut usize) -> Option<SimplexResult> {
        tableau.drive_out_artificials();

        let feas_tol = tableau.feasibility_tol();
        let stuck = (0..tableau.num_rows())
            .any(|r| tableau.is_artificial(tableau.basic_vars[r]) && tableau.rhs(r).abs() > feas_tol);
        if stuck {
            return None;
        }

        if tableau.primal_feasible() {
            tableau.clamp_rhs();
            Some(self.phase2(tableau, iterations))
        } else if tableau.dual_feasible(self.tolerance) {
            Some(self.dual_iterate(tableau, iterations))
        } else {
            None
        }
    }

    fn phase1(&self, tableau: &mut Tableau, iterations: &mut usize) -> SimplexResult {
        // Auxiliary objective: maximize -sum(artificials)
        let obj_row = tableau.obj_row();
        let n_cols = tableau.data[0].len();
        let art_start = tableau.n_vars + tableau.n_slack;

        let orig_obj = tableau.data[obj_row].clone();

        for j in 0..n_cols {
            tableau.data[obj_row][j] = 0.0;
        }
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[obj_row][j] = -1.0;
        }

        // Make objective row consistent with basic artificial variables
        for i in 0..tableau.num_rows() {
            if tableau.is_artificial(tableau.basic_vars[i]) {
                for j in 0..n_cols {
                    tableau.data[obj_row][j] += tableau.data[i][j];
                }
            }
        }

        match self.iterate(tableau, iterations, "phase 1") {
            SimplexResult::Optimal => {}
            // Phase 1 is bounded by construction; a missing ratio means trouble
            SimplexResult::Stopped(SolutionStatus::Unbounded) => {
                return SimplexResult::Stopped(SolutionStatus::Numerical);
            }
            stopped => return stopped,
        }

        // Check if all artificials are zero
        let feas_tol = tableau.feasibility_tol();
        for i in 0..tableau.num_rows() {
            if tableau.is_artificial(tableau.basic_vars[i]) && tableau.rhs(i) > feas_tol {
                return SimplexResult::Stopped(SolutionStatus::Infeasible);
            }
        }

        // Restore original objective and adjust for basic variables
        tableau.data[obj_row] = orig_obj;
        for i in 0..tableau.num_rows() {
            let basic = tableau.basic_vars[i];
            let ratio = tableau.data[obj_row][basic];
            if ratio != 0.0 {
                for j in 0..n_cols {
                    tableau.data[obj_row][j] -= ratio * tableau.data[i][j];
                }
            }
        }

        tableau.drive_out_artificials();
        tableau.clamp_rhs();
        SimplexResult::Optimal
    }

    pub(crate) fn phase2(&self, tableau: &mut Tableau, iterations: &mut usize) -> SimplexResult {
        self.iterate(tableau, iterations, "phase 2")
    }

    /// Primal simplex pivots until no column prices out
    fn iterate(&self, tableau: &mut Tableau, iterations: &mut usize, phase: &str) -> SimplexResult {
        let feas_tol = tableau.feasibility_tol();
        let mut degenerate_run = 0;

        loop {
            let bland = degenerate_run > DEGENERATE_LIMIT;
            let Some(pivot_col) = self.find_pivot_column(tableau, bland) else {
                return SimplexResult::Optimal;
            };
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col, bland) else {
                return SimplexResult::Stopped(SolutionStatus::Unbounded);
            };
            if let Some(status) = self.stop_reason(*iterations) {
                return SimplexResult::Stopped(status);
            }

            if tableau.rhs(pivot_row) <= feas_tol {
                degenerate_run += 1;
            } else {
                degenerate_run = 0;
            }

            tableau.pivot(pivot_row, pivot_col);
            *iterations += 1;

            if self.output {
                debug!(
                    phase,
                    iteration = *iterations,
                    entering = pivot_col,
                    row = pivot_row,
                    bland,
                    "primal pivot"
                );
            }
        }
    }

    /// Entering column: most positive reduced cost, or the lowest index
    /// under Bland's rule
    fn find_pivot_column(&self, tableau: &Tableau, bland: bool) -> Option<usize> {
        let mut max_val = self.tolerance;
        let mut max_col = None;

        for j in 0..tableau.rhs_col() {
            if !tableau.is_eligible(j) {
                continue;
            }
            let d = tableau.reduced_cost(j);
            if d > max_val {
                if bland {
                    return Some(j);
                }
                max_val = d;
                max_col = Some(j);
            }
        }

        max_col
    }

    /// Leaving row by the minimum ratio test
    pub(crate) fn find_pivot_row(&self, tableau: &Tableau, col: usize, bland: bool) -> Option<usize> {
        let mut min_ratio = f64::INFINITY;
        let mut min_row: Option<usize> = None;

        for i in 0..tableau.num_rows() {
            let val = tableau.data[i][col];
            if val <= PIVOT_TOL {
                continue;
            }
            let ratio = tableau.rhs(i).max(0.0) / val;
            let better = match min_row {
                None => true,
                Some(best) => {
                    let tie = (ratio - min_ratio).abs() <= 1e-12 * (1.0 + min_ratio);
                    if tie {
                        if bland {
                            tableau.basic_vars[i] < tableau.basic_vars[best]
                        } else {
                            val > tableau.data[best][col]
                        }
                    } else {
                        ratio < min_ratio
                    }
                }
            };
            if better {
                min_ratio = ratio;
                min_row = Some(i);
            }
        }

        min_row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ConstraintOp;

    fn assert_close(actual: f64, expected: f64, what: &str) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "{} = {} (expected {})",
            what,
            actual,
            expected
        );
    }

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        //   x, y >= 0
        // Optimal: x=3, y=1, obj=11
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![3.0, 2.0], false); // maximize
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_close(solution.values[0], 3.0, "x");
        assert_close(solution.values[1], 1.0, "y");
        assert_close(solution.objective_value, 11.0, "obj");

        // Both x and y are basic; sum and x_max bind with duals 2 and 1
        let sum = &solution.analysis.constraints[0];
        let x_max = &solution.analysis.constraints[1];
        let y_max = &solution.analysis.constraints[2];
        assert_close(sum.dual, 2.0, "dual(sum)");
        assert_close(x_max.dual, 1.0, "dual(x_max)");
        assert_close(y_max.dual, 0.0, "dual(y_max)");
        assert_close(y_max.slack, 2.0, "slack(y_max)");
        assert!(sum.binding && x_max.binding && !y_max.binding);
    }

    #[test]
    fn test_simple_maximization_ranging() {
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem).unwrap();
        let vars = &solution.analysis.variables;
        let cons = &solution.analysis.constraints;

        // x stays optimal while its profit is at least y's: [2, inf)
        let x_range = vars[0].objective_range.unwrap();
        assert_close(x_range.lower_bound, 2.0, "x low");
        assert!(x_range.upper_bound.is_infinite());

        // y stays basic for profits in [0, 3]
        let y_range = vars[1].objective_range.unwrap();
        assert_close(y_range.lower_bound, 0.0, "y low");
        assert_close(y_range.upper_bound, 3.0, "y high");

        // sum capacity can move between 3 (y hits 0) and 6 (y hits 3)
        let sum_range = cons[0].rhs_range.unwrap();
        assert_close(sum_range.lower_bound, 3.0, "sum low");
        assert_close(sum_range.upper_bound, 6.0, "sum high");

        // x_max between 1 (y hits 3) and 4 (y hits 0)
        let x_max_range = cons[1].rhs_range.unwrap();
        assert_close(x_max_range.lower_bound, 1.0, "x_max low");
        assert_close(x_max_range.upper_bound, 4.0, "x_max high");

        // y_max is slack: anything down to the current usage of 1
        let y_max_range = cons[2].rhs_range.unwrap();
        assert_close(y_max_range.lower_bound, 1.0, "y_max low");
        assert!(y_max_range.upper_bound.is_infinite());
    }

    #[test]
    fn test_minimization_with_ge() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   x <= 3
        //   y <= 3
        //   x, y >= 0
        // Optimal: x=3, y=1, obj=9
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![2.0, 3.0], true);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Ge, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_close(solution.values[0], 3.0, "x");
        assert_close(solution.values[1], 1.0, "y");
        assert_close(solution.objective_value, 9.0, "obj");

        // Raising the requirement by one costs one more unit of y
        assert_close(solution.analysis.constraints[0].dual, 3.0, "dual(sum)");
        // Relaxing x_max saves the price difference
        assert_close(solution.analysis.constraints[1].dual, -1.0, "dual(x_max)");
    }

    #[test]
    fn test_equality_row() {
        // Maximize x + y with x + 2y = 4, x <= 2
        // Optimal: x=2, y=1, obj=3
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![1.0, 1.0], false);
        problem.add_constraint("blend", vec![1.0, 2.0], ConstraintOp::Eq, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 2.0);

        let solution = Solver::new().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_close(solution.values[0], 2.0, "x");
        assert_close(solution.values[1], 1.0, "y");
        assert_close(solution.analysis.constraints[0].dual, 0.5, "dual(blend)");
    }

    #[test]
    fn test_infeasible() {
        // x >= 5
        // x <= 3
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("lower", vec![1.0], ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", vec![1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_unbounded() {
        // Maximize x + y with x - y <= 1
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![1.0, 1.0], false);
        problem.add_constraint("diff", vec![1.0, -1.0], ConstraintOp::Le, 1.0);

        let solution = Solver::new().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Unbounded);
    }

    #[test]
    fn test_iteration_limit() {
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().with_max_iterations(1).solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::IterationLimit);
        assert!(solution.analysis.variables.is_empty());
    }

    #[test]
    fn test_ranging_can_be_disabled() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], false);
        problem.add_constraint("cap", vec![1.0], ConstraintOp::Le, 2.0);

        let solution = Solver::new().with_ranging(false).solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!(solution.analysis.variables[0].objective_range.is_none());
        assert!(solution.analysis.constraints[0].rhs_range.is_none());
    }

    #[test]
    fn test_degenerate_problem_terminates() {
        // Classic cycling example under the largest-coefficient rule
        let mut problem = LpProblem::new(vec![
            "x1".to_string(),
            "x2".to_string(),
            "x3".to_string(),
            "x4".to_string(),
        ]);
        problem.set_objective(vec![0.75, -150.0, 0.02, -6.0], false);
        problem.add_constraint("r1", vec![0.25, -60.0, -0.04, 9.0], ConstraintOp::Le, 0.0);
        problem.add_constraint("r2", vec![0.5, -90.0, -0.02, 3.0], ConstraintOp::Le, 0.0);
        problem.add_constraint("r3", vec![0.0, 0.0, 1.0, 0.0], ConstraintOp::Le, 1.0);

        let solution = Solver::new().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_close(solution.objective_value, 0.05, "obj");
    }

    #[test]
    fn test_zero_plan_has_positive_zero_objective() {
        // Only losses on offer: nothing is produced and the total is +0.0
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![-2.0, -1.0], false);
        problem.add_constraint("cap", vec![1.0, 1.0], ConstraintOp::Le, 4.0);

        for method in Method::ALL {
            let solution = Solver::new().solve_with(&problem, method, None).unwrap();
            assert_eq!(solution.status, SolutionStatus::Optimal, "{}", method);
            assert_eq!(solution.objective_value, 0.0, "{}", method);
            assert!(solution.objective_value.is_sign_positive(), "{}", method);
        }
    }

    #[test]
    fn test_invalid_problem_is_an_error() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0, 2.0], false);

        assert!(matches!(
            Solver::new().solve(&problem),
            Err(SolverError::DimensionMismatch { .. })
        ));
    }
}
