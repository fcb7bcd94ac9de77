//! Concurrent solving: several methods run on their own threads, each on a
//! private copy of the problem, and one result is kept.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::debug;

use crate::error::SolverError;
use crate::method::Method;
use crate::problem::LpProblem;
use crate::simplex::Solver;
use crate::solution::{Solution, SolutionStatus};

/// Strategies raced by [`Method::Concurrent`]
const RACE: [Method; 3] = [Method::PrimalSimplex, Method::DualSimplex, Method::Barrier];

/// A status that settles the problem, as opposed to a limit or cancellation
fn is_conclusive(status: SolutionStatus) -> bool {
    matches!(
        status,
        SolutionStatus::Optimal | SolutionStatus::Infeasible | SolutionStatus::Unbounded
    )
}

impl Solver {
    /// Race the strategies; the first conclusive finisher wins and stops the rest
    pub(crate) fn concurrent(&self, problem: &LpProblem) -> Result<Solution, SolverError> {
        let solved = Arc::new(AtomicBool::new(false));

        let results: Vec<Result<(Solution, bool), SolverError>> = thread::scope(|scope| {
            let handles: Vec<_> = RACE
                .iter()
                .map(|&method| {
                    let worker = self.clone().with_cancel(Arc::clone(&solved));
                    let solved = Arc::clone(&solved);
                    let problem = problem.clone();
                    scope.spawn(move || {
                        let solution = worker.solve_with(&problem, method, None)?;
                        // Check if we're the first to finish
                        let won = is_conclusive(solution.status) && !solved.swap(true, Ordering::SeqCst);
                        Ok((solution, won))
                    })
                })
                .collect();

            handles
                .into_iter()
                .zip(RACE)
                .map(|(handle, method)| {
                    handle
                        .join()
                        .map_err(|_| SolverError::WorkerPanicked(method.name().to_string()))?
                })
                .collect()
        });

        let mut finished = Vec::with_capacity(results.len());
        for result in results {
            finished.push(result?);
        }

        let index = finished
            .iter()
            .position(|(_, won)| *won)
            .unwrap_or(0);
        let (mut solution, _) = finished.swap_remove(index);

        if self.output() {
            debug!(winner = %solution.method, status = %solution.status, "concurrent race decided");
        }

        solution.winner = Some(solution.method);
        solution.method = Method::Concurrent;
        Ok(solution)
    }

    /// Run every strategy to completion and pick the optimal run with the
    /// fewest iterations, ties going to the earlier strategy. The choice
    /// depends only on the problem, never on thread timing.
    pub(crate) fn deterministic(
        &self,
        problem: &LpProblem,
        method: Method,
        strategies: &[Method],
    ) -> Result<Solution, SolverError> {
        let results: Vec<Result<Solution, SolverError>> = thread::scope(|scope| {
            let handles: Vec<_> = strategies
                .iter()
                .map(|&strategy| {
                    let worker = self.clone();
                    let problem = problem.clone();
                    scope.spawn(move || worker.solve_with(&problem, strategy, None))
                })
                .collect();

            handles
                .into_iter()
                .zip(strategies)
                .map(|(handle, strategy)| {
                    handle
                        .join()
                        .map_err(|_| SolverError::WorkerPanicked(strategy.name().to_string()))?
                })
                .collect()
        });

        let mut finished = Vec::with_capacity(results.len());
        for result in results {
            finished.push(result?);
        }

        let optimal = finished
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_optimal())
            .min_by_key(|&(i, s)| (s.iterations, i))
            .map(|(i, _)| i);
        let index = optimal
            .or_else(|| finished.iter().position(|s| is_conclusive(s.status)))
            .unwrap_or(0);
        let mut solution = finished.swap_remove(index);

        if self.output() {
            debug!(winner = %solution.method, iterations = solution.iterations, "deterministic choice made");
        }

        solution.winner = Some(solution.method);
        solution.method = method;
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ConstraintOp;

    fn sample() -> LpProblem {
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);
        problem
    }

    #[test]
    fn test_concurrent_reports_a_winner() {
        let solution = Solver::new()
            .solve_with(&sample(), Method::Concurrent, None)
            .unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.method, Method::Concurrent);
        assert!(RACE.contains(&solution.winner.unwrap()));
        assert!((solution.objective_value - 11.0).abs() < 1e-6);
    }

    #[test]
    fn test_deterministic_choice_is_repeatable() {
        let solver = Solver::new();
        let first = solver
            .solve_with(&sample(), Method::DeterministicConcurrent, None)
            .unwrap();
        for _ in 0..5 {
            let again = solver
                .solve_with(&sample(), Method::DeterministicConcurrent, None)
                .unwrap();
            assert_eq!(again.winner, first.winner);
            assert_eq!(again.iterations, first.iterations);
            assert_eq!(again.values, first.values);
        }
    }

    #[test]
    fn test_deterministic_simplex_only_uses_simplex() {
        let solution = Solver::new()
            .solve_with(&sample(), Method::DeterministicConcurrentSimplex, None)
            .unwrap();

        assert_eq!(solution.method, Method::DeterministicConcurrentSimplex);
        assert!(matches!(
            solution.winner,
            Some(Method::PrimalSimplex) | Some(Method::DualSimplex)
        ));
    }

    #[test]
    fn test_concurrent_infeasible() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("lower", vec![1.0], ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", vec![1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new()
            .solve_with(&problem, Method::Concurrent, None)
            .unwrap();
        assert_eq!(solution.status, SolutionStatus::Infeasible);
    }
}
