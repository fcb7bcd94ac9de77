//! Primal-dual interior point method (Mehrotra predictor-corrector) with a
//! simplex crossover to recover an optimal basis.
//!
//! The problem is put in equality standard form `min c'x, Ax = b, x >= 0`
//! with one slack or surplus column per inequality row. Normal equations
//! `A D A' dy = r` are formed densely and factored by Cholesky.

// Indexed loops are clearer for the dense matrix kernels
#![allow(clippy::needless_range_loop)]

use tracing::debug;

use crate::error::SolverError;
use crate::problem::{ConstraintOp, LpProblem};
use crate::simplex::{Run, Solver};
use crate::solution::SolutionStatus;
use crate::tableau::{Layout, Tableau};

/// Barrier iterations are far fewer than pivots; cap them separately
const MAX_BARRIER_ITERATIONS: usize = 200;
/// Relative primal, dual and gap tolerance for convergence
const CONVERGENCE_TOL: f64 = 1e-9;
/// Iterates beyond this norm mean the problem has no finite optimum
const DIVERGENCE_LIMIT: f64 = 1e12;
/// Fraction of the step to the boundary actually taken
const STEP_DAMPING: f64 = 0.99;

/// `min c'x` subject to `Ax = b`, `x >= 0`
struct StandardForm {
    a: Vec<Vec<f64>>,
    b: Vec<f64>,
    c: Vec<f64>,
    /// Global basis index of each column
    globals: Vec<usize>,
}

impl StandardForm {
    fn new(problem: &LpProblem) -> Self {
        let n_vars = problem.num_variables();
        let sense = if problem.objective.minimize { 1.0 } else { -1.0 };

        let mut globals: Vec<usize> = (0..n_vars).collect();
        let mut logical: Vec<(usize, f64)> = Vec::new();
        for (i, c) in problem.constraints.iter().enumerate() {
            match c.op {
                ConstraintOp::Le => logical.push((i, 1.0)),
                ConstraintOp::Ge => logical.push((i, -1.0)),
                ConstraintOp::Eq => {}
            }
        }
        globals.extend(logical.iter().map(|&(i, _)| n_vars + i));

        let width = n_vars + logical.len();
        let a = problem
            .constraints
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let mut row = vec![0.0; width];
                row[..n_vars].copy_from_slice(&c.coefficients);
                for (k, &(row_idx, sign)) in logical.iter().enumerate() {
                    if row_idx == i {
                        row[n_vars + k] = sign;
                    }
                }
                row
            })
            .collect();

        let mut c = vec![0.0; width];
        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            c[j] = sense * coef;
        }

        Self {
            a,
            b: problem.constraints.iter().map(|c| c.rhs).collect(),
            c,
            globals,
        }
    }

    fn rows(&self) -> usize {
        self.a.len()
    }

    fn cols(&self) -> usize {
        self.c.len()
    }

    fn mul(&self, x: &[f64]) -> Vec<f64> {
        self.a
            .iter()
            .map(|row| row.iter().zip(x).map(|(a, v)| a * v).sum())
            .collect()
    }

    fn mul_transpose(&self, y: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.cols()];
        for (row, &yi) in self.a.iter().zip(y) {
            for (o, &a) in out.iter_mut().zip(row) {
                *o += a * yi;
            }
        }
        out
    }

    /// `A diag(d) A'`
    fn normal_matrix(&self, d: &[f64]) -> Vec<Vec<f64>> {
        let m = self.rows();
        let mut out = vec![vec![0.0; m]; m];
        for i in 0..m {
            for k in 0..=i {
                let v: f64 = (0..self.cols()).map(|j| self.a[i][j] * d[j] * self.a[k][j]).sum();
                out[i][k] = v;
                out[k][i] = v;
            }
        }
        out
    }
}

/// Cholesky factor of a symmetric positive semi-definite matrix. Pivots
/// that collapse are replaced by a huge value, which zeroes the matching
/// component of the solution instead of failing.
fn cholesky(mut m: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    let n = m.len();
    let max_diag = (0..n).fold(0.0_f64, |acc, i| acc.max(m[i][i].abs()));
    let floor = 1e-30 * (1.0 + max_diag);

    for j in 0..n {
        let mut diag = m[j][j];
        for k in 0..j {
            diag -= m[j][k] * m[j][k];
        }
        let pivot = if diag > floor { diag.sqrt() } else { 1e64 };
        m[j][j] = pivot;
        for i in (j + 1)..n {
            let mut v = m[i][j];
            for k in 0..j {
                v -= m[i][k] * m[j][k];
            }
            m[i][j] = v / pivot;
        }
    }
    for i in 0..n {
        for j in (i + 1)..n {
            m[i][j] = 0.0;
        }
    }
    m
}

fn cholesky_solve(l: &[Vec<f64>], rhs: &[f64]) -> Vec<f64> {
    let n = l.len();
    let mut z = rhs.to_vec();
    for i in 0..n {
        for k in 0..i {
            z[i] -= l[i][k] * z[k];
        }
        z[i] /= l[i][i];
    }
    for i in (0..n).rev() {
        for k in (i + 1)..n {
            z[i] -= l[k][i] * z[k];
        }
        z[i] /= l[i][i];
    }
    z
}

/// Largest step in `[0, inf)` keeping `v + step * dv >= 0`
fn max_step(v: &[f64], dv: &[f64]) -> f64 {
    v.iter()
        .zip(dv)
        .filter(|&(_, &d)| d < 0.0)
        .map(|(&x, &d)| -x / d)
        .fold(f64::INFINITY, f64::min)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm_inf(v: &[f64]) -> f64 {
    v.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
}

/// Interior point iterate
struct Iterate {
    x: Vec<f64>,
    y: Vec<f64>,
    s: Vec<f64>,
}

/// Newton direction for the perturbed KKT system with complementarity
/// right-hand side `r_c`
fn newton_direction(
    sf: &StandardForm,
    it: &Iterate,
    l: &[Vec<f64>],
    r_p: &[f64],
    r_d: &[f64],
    r_c: &[f64],
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let n = sf.cols();
    let w: Vec<f64> = (0..n)
        .map(|j| (it.x[j] * r_d[j] - r_c[j]) / it.s[j])
        .collect();
    let aw = sf.mul(&w);
    let rhs: Vec<f64> = r_p.iter().zip(&aw).map(|(p, q)| p + q).collect();

    let dy = cholesky_solve(l, &rhs);
    let atdy = sf.mul_transpose(&dy);
    let ds: Vec<f64> = (0..n).map(|j| r_d[j] - atdy[j]).collect();
    let dx: Vec<f64> = (0..n)
        .map(|j| (r_c[j] - it.x[j] * ds[j]) / it.s[j])
        .collect();
    (dx, dy, ds)
}

/// Mehrotra's starting point, kept strictly interior
fn starting_point(sf: &StandardForm) -> Iterate {
    let m = sf.rows();
    let n = sf.cols();

    let mut aat = sf.normal_matrix(&vec![1.0; n]);
    for i in 0..m {
        aat[i][i] += 1e-10;
    }
    let l = cholesky(aat);

    let x_tilde = sf.mul_transpose(&cholesky_solve(&l, &sf.b));
    let y = cholesky_solve(&l, &sf.mul(&sf.c));
    let aty = sf.mul_transpose(&y);
    let s_tilde: Vec<f64> = (0..n).map(|j| sf.c[j] - aty[j]).collect();

    let shift = |v: &[f64]| {
        let min = v.iter().copied().fold(f64::INFINITY, f64::min);
        (-1.5 * min).max(0.0)
    };
    let dx = shift(&x_tilde);
    let ds = shift(&s_tilde);
    let mut x: Vec<f64> = x_tilde.iter().map(|v| v + dx).collect();
    let mut s: Vec<f64> = s_tilde.iter().map(|v| v + ds).collect();

    let xs = dot(&x, &s);
    let sum_x: f64 = x.iter().sum();
    let sum_s: f64 = s.iter().sum();
    if xs > 0.0 && sum_x > 0.0 && sum_s > 0.0 {
        let px = 0.5 * xs / sum_s;
        let ps = 0.5 * xs / sum_x;
        x.iter_mut().for_each(|v| *v += px);
        s.iter_mut().for_each(|v| *v += ps);
    }

    let interior = |v: &[f64]| v.iter().all(|x| x.is_finite() && *x > 1e-8);
    if !interior(&x) || !interior(&s) {
        x = vec![1.0; n];
        s = vec![1.0; n];
    }

    Iterate { x, y, s }
}

impl Solver {
    pub(crate) fn barrier(&self, problem: &LpProblem) -> Result<Run, SolverError> {
        if problem.num_constraints() == 0 {
            return Ok(self.primal(problem, None));
        }

        let sf = StandardForm::new(problem);
        let mut iterations = 0;

        let iterate = match self.interior_point(&sf, &mut iterations) {
            Ok(iterate) => iterate,
            Err(status @ (SolutionStatus::TimeLimit | SolutionStatus::Interrupted)) => {
                return Ok(Run::stopped(status, iterations));
            }
            Err(status) => {
                // Divergence is how infeasible and unbounded problems show up
                // here; let the simplex method give the definitive answer
                debug!(%status, iterations, "barrier did not converge, confirming with simplex");
                let mut run = self.primal(problem, None);
                run.iterations += iterations;
                return Ok(run);
            }
        };

        // Crossover: columns in order of how clearly they sit away from zero
        let mut order: Vec<usize> = (0..sf.cols()).collect();
        order.sort_by(|&p, &q| {
            let rp = iterate.x[p] / iterate.s[p];
            let rq = iterate.x[q] / iterate.s[q];
            rq.total_cmp(&rp)
        });
        let candidates: Vec<usize> = order.iter().map(|&j| sf.globals[j]).collect();

        let mut tableau = Tableau::from_basis(problem, Layout::Primal, &candidates);
        let barrier_iterations = iterations;
        match self.settle(&mut tableau, &mut iterations) {
            Some(result) => {
                if self.output() {
                    debug!(
                        barrier_iterations,
                        crossover_pivots = iterations - barrier_iterations,
                        "crossover finished"
                    );
                }
                Ok(Run::from_result(result, tableau, iterations))
            }
            None => {
                debug!("crossover basis unusable, falling back to primal simplex");
                let mut run = self.primal(problem, None);
                run.iterations += iterations;
                Ok(run)
            }
        }
    }

    fn interior_point(&self, sf: &StandardForm, iterations: &mut usize) -> Result<Iterate, SolutionStatus> {
        let n = sf.cols();
        let mut it = starting_point(sf);
        let b_norm = 1.0 + norm_inf(&sf.b);
        let c_norm = 1.0 + norm_inf(&sf.c);
        let limit = self.max_iterations().min(MAX_BARRIER_ITERATIONS);

        loop {
            let ax = sf.mul(&it.x);
            let aty = sf.mul_transpose(&it.y);
            let r_p: Vec<f64> = sf.b.iter().zip(&ax).map(|(b, v)| b - v).collect();
            let r_d: Vec<f64> = (0..n).map(|j| sf.c[j] - aty[j] - it.s[j]).collect();
            let primal_obj = dot(&sf.c, &it.x);
            let dual_obj = dot(&sf.b, &it.y);

            let primal_inf = norm_inf(&r_p) / b_norm;
            let dual_inf = norm_inf(&r_d) / c_norm;
            let gap = (primal_obj - dual_obj).abs() / (1.0 + primal_obj.abs());

            if self.output() {
                debug!(iteration = *iterations, primal_inf, dual_inf, gap, "barrier iteration");
            }

            if primal_inf < CONVERGENCE_TOL && dual_inf < CONVERGENCE_TOL && gap < CONVERGENCE_TOL {
                return Ok(it);
            }
            if !primal_obj.is_finite() || norm_inf(&it.x) > DIVERGENCE_LIMIT || norm_inf(&it.y) > DIVERGENCE_LIMIT {
                return Err(SolutionStatus::Numerical);
            }
            if *iterations >= limit {
                return Err(SolutionStatus::IterationLimit);
            }
            if let Some(status) = self.stop_reason(*iterations) {
                return Err(status);
            }

            let mu = dot(&it.x, &it.s) / n as f64;
            let d: Vec<f64> = (0..n).map(|j| it.x[j] / it.s[j]).collect();
            let l = cholesky(sf.normal_matrix(&d));

            // Predictor (affine scaling) step
            let r_c: Vec<f64> = (0..n).map(|j| -it.x[j] * it.s[j]).collect();
            let (dx_aff, _, ds_aff) = newton_direction(sf, &it, &l, &r_p, &r_d, &r_c);
            let alpha_p = max_step(&it.x, &dx_aff).min(1.0);
            let alpha_d = max_step(&it.s, &ds_aff).min(1.0);
            let mu_aff = (0..n)
                .map(|j| (it.x[j] + alpha_p * dx_aff[j]) * (it.s[j] + alpha_d * ds_aff[j]))
                .sum::<f64>()
                / n as f64;
            let sigma = (mu_aff / mu).powi(3).clamp(0.0, 1.0);

            // Corrector with centering
            let r_c: Vec<f64> = (0..n)
                .map(|j| -it.x[j] * it.s[j] - dx_aff[j] * ds_aff[j] + sigma * mu)
                .collect();
            let (dx, dy, ds) = newton_direction(sf, &it, &l, &r_p, &r_d, &r_c);
            let alpha_p = (STEP_DAMPING * max_step(&it.x, &dx)).min(1.0);
            let alpha_d = (STEP_DAMPING * max_step(&it.s, &ds)).min(1.0);

            for j in 0..n {
                it.x[j] += alpha_p * dx[j];
                it.s[j] += alpha_d * ds[j];
            }
            for (y, d) in it.y.iter_mut().zip(&dy) {
                *y += alpha_d * d;
            }
            *iterations += 1;
        }
    }
}
