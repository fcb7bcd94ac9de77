use tracing::debug;

use crate::problem::LpProblem;
use crate::simplex::{Run, SimplexResult, Solver};
use crate::solution::SolutionStatus;
use crate::tableau::{Layout, PIVOT_TOL, Tableau};

/// Bounding row right-hand side, relative to the largest problem RHS
const BOUND_FACTOR: f64 = 1e6;

impl Solver {
    /// Dual simplex. Starts from the slack basis with `>=` rows negated; if
    /// that basis is not dual feasible an artificial bounding row restores
    /// dual feasibility and is released again at the end.
    pub(crate) fn dual(&self, problem: &LpProblem, warm_start: Option<&[usize]>) -> Run {
        let mut iterations = 0;

        if let Some(basis) = warm_start {
            let mut tableau = Tableau::from_basis(problem, Layout::Dual, basis);
            if let Some(result) = self.settle(&mut tableau, &mut iterations) {
                return Run::from_result(result, tableau, iterations);
            }
            debug!("warm start basis rejected, starting from the slack basis");
        }

        let mut tableau = Tableau::build(problem, Layout::Dual);
        tableau.drive_out_artificials();

        // An equality row with no usable column left is either redundant or contradictory
        let feas_tol = tableau.feasibility_tol();
        if (0..tableau.num_rows())
            .any(|r| tableau.is_artificial(tableau.basic_vars[r]) && tableau.rhs(r).abs() > feas_tol)
        {
            return Run::stopped(SolutionStatus::Infeasible, iterations);
        }

        let bounded = !tableau.dual_feasible(self.tolerance());
        if bounded {
            let scale = problem
                .constraints
                .iter()
                .fold(0.0_f64, |acc, c| acc.max(c.rhs.abs()));
            tableau.add_bounding_row(BOUND_FACTOR * (1.0 + scale));
            let row = tableau.num_rows() - 1;
            if let Some(col) = self.most_attractive(&tableau) {
                tableau.pivot(row, col);
                iterations += 1;
            }
        }

        if let SimplexResult::Stopped(status) = self.dual_iterate(&mut tableau, &mut iterations) {
            return Run::stopped(status, iterations);
        }

        if bounded {
            if let Err(status) = self.release_bound(&mut tableau) {
                return Run::stopped(status, iterations);
            }
            // Refactor without the large bound to shed its rounding error
            let basis = tableau.basis();
            let mut fresh = Tableau::from_basis(problem, Layout::Dual, &basis);
            if let Some(result) = self.settle(&mut fresh, &mut iterations) {
                return Run::from_result(result, fresh, iterations);
            }
        }

        Run::from_result(SimplexResult::Optimal, tableau, iterations)
    }

    /// Dual simplex pivots on a dual feasible tableau until every basic
    /// variable is non-negative
    pub(crate) fn dual_iterate(&self, tableau: &mut Tableau, iterations: &mut usize) -> SimplexResult {
        let feas_tol = tableau.feasibility_tol();

        loop {
            // Leaving row: most negative basic value
            let mut leave = None;
            let mut worst = -feas_tol;
            for r in 0..tableau.num_rows() {
                let v = tableau.rhs(r);
                if v < worst {
                    worst = v;
                    leave = Some(r);
                }
            }
            let Some(row) = leave else {
                tableau.clamp_rhs();
                return SimplexResult::Optimal;
            };

            // Entering column: smallest |d_k / t_rk| over negative row entries
            let mut best: Option<(usize, f64, f64)> = None;
            for k in 0..tableau.rhs_col() {
                if !tableau.is_eligible(k) || tableau.is_basic(k) {
                    continue;
                }
                let t = tableau.data[row][k];
                if t >= -PIVOT_TOL {
                    continue;
                }
                let ratio = tableau.reduced_cost(k).min(0.0) / t;
                let better = match best {
                    None => true,
                    Some((_, best_ratio, best_t)) => {
                        ratio < best_ratio - 1e-12 || (ratio <= best_ratio + 1e-12 && t.abs() > best_t)
                    }
                };
                if better {
                    best = Some((k, ratio, t.abs()));
                }
            }
            let Some((col, _, _)) = best else {
                // The row cannot be made non-negative
                return SimplexResult::Stopped(SolutionStatus::Infeasible);
            };

            if let Some(status) = self.stop_reason(*iterations) {
                return SimplexResult::Stopped(status);
            }

            tableau.pivot(row, col);
            *iterations += 1;

            if self.output() {
                debug!(iteration = *iterations, entering = col, row, "dual pivot");
            }
        }
    }

    /// Nonbasic column with the largest positive reduced cost
    fn most_attractive(&self, tableau: &Tableau) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for col in 0..tableau.rhs_col() {
            if !tableau.is_eligible(col) || tableau.is_basic(col) {
                continue;
            }
            let d = tableau.reduced_cost(col);
            if d > self.tolerance() && best.is_none_or(|(_, b)| d > b) {
                best = Some((col, d));
            }
        }
        best.map(|(col, _)| col)
    }

    /// Make the bounding slack basic and drop its row. A bound that still
    /// carries a price means the objective grows without limit.
    fn release_bound(&self, tableau: &mut Tableau) -> Result<(), SolutionStatus> {
        let Some(col) = tableau.bound_col else {
            return Ok(());
        };

        if !tableau.is_basic(col) {
            if tableau.reduced_cost(col) < -self.tolerance() {
                return Err(SolutionStatus::Unbounded);
            }
            let row = self
                .find_pivot_row(tableau, col, false)
                .ok_or(SolutionStatus::Unbounded)?;
            tableau.pivot(row, col);
        }

        tableau.remove_bounding_row();
        Ok(())
    }
}
