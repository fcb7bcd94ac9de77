use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::{Analysis, ConstraintInfo, SensitivityRange, VariableInfo};

/// Smallest tableau entry accepted as a pivot
pub(crate) const PIVOT_TOL: f64 = 1e-9;

/// How rows are arranged when the tableau is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Layout {
    /// Rows normalized to a non-negative right-hand side, artificials on every
    /// `>=` and `=` row. Starts primal feasible in phase 1.
    Primal,
    /// `>=` rows negated so their surplus starts basic, artificials only on
    /// `=` rows. The right-hand side may start negative.
    Dual,
}

/// Dense simplex tableau. The last row is the objective, the last column the
/// right-hand side. The objective row holds `c_j - z_j` for an internal
/// maximization; minimization problems are negated on the way in.
#[derive(Debug, Clone)]
pub(crate) struct Tableau {
    pub(crate) data: Vec<Vec<f64>>,
    pub(crate) basic_vars: Vec<usize>,
    pub(crate) n_vars: usize,
    pub(crate) n_slack: usize,
    pub(crate) n_artificial: usize,
    /// Per problem row: a column equal to `scale * B^-1 e_i` and that scale
    unit_cols: Vec<(usize, f64)>,
    /// Per problem row: the slack, surplus or (for `=` rows) artificial column
    logical_cols: Vec<usize>,
    /// Column of the dual simplex bounding row slack, while that row exists
    pub(crate) bound_col: Option<usize>,
    /// `1.0` when the problem maximizes, `-1.0` when it minimizes
    pub(crate) sense: f64,
    /// Largest absolute right-hand side, used to scale feasibility checks
    rhs_scale: f64,
}

#[derive(Debug, Clone, Copy)]
enum RowKind {
    Slack,
    SurplusAndArtificial,
    Surplus,
    Artificial,
}

impl Tableau {
    pub(crate) fn build(problem: &LpProblem, layout: Layout) -> Self {
        let n_vars = problem.num_variables();
        let n_constraints = problem.num_constraints();

        // Per row: sign applied to the stored row, and which extra columns it gets
        let plan: Vec<(f64, RowKind)> = problem
            .constraints
            .iter()
            .map(|c| match layout {
                Layout::Primal => {
                    let flip = c.rhs < 0.0;
                    let op = match (c.op, flip) {
                        (ConstraintOp::Le, true) => ConstraintOp::Ge,
                        (ConstraintOp::Ge, true) => ConstraintOp::Le,
                        (op, _) => op,
                    };
                    let sign = if flip { -1.0 } else { 1.0 };
                    let kind = match op {
                        ConstraintOp::Le => RowKind::Slack,
                        ConstraintOp::Ge => RowKind::SurplusAndArtificial,
                        ConstraintOp::Eq => RowKind::Artificial,
                    };
                    (sign, kind)
                }
                Layout::Dual => match c.op {
                    ConstraintOp::Le => (1.0, RowKind::Slack),
                    ConstraintOp::Ge => (-1.0, RowKind::Surplus),
                    ConstraintOp::Eq => (1.0, RowKind::Artificial),
                },
            })
            .collect();

        let n_slack = plan
            .iter()
            .filter(|(_, k)| !matches!(k, RowKind::Artificial))
            .count();
        let n_artificial = plan
            .iter()
            .filter(|(_, k)| matches!(k, RowKind::SurplusAndArtificial | RowKind::Artificial))
            .count();

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let total_rows = n_constraints + 1; // +1 for objective
        let sense = if problem.objective.minimize { -1.0 } else { 1.0 };

        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; total_rows],
            basic_vars: vec![0; n_constraints],
            n_vars,
            n_slack,
            n_artificial,
            unit_cols: Vec::with_capacity(n_constraints),
            logical_cols: Vec::with_capacity(n_constraints),
            bound_col: None,
            sense,
            rhs_scale: problem
                .constraints
                .iter()
                .fold(0.0_f64, |acc, c| acc.max(c.rhs.abs())),
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, (c, &(sign, kind))) in problem.constraints.iter().zip(&plan).enumerate() {
            for (j, &coef) in c.coefficients.iter().enumerate() {
                tableau.data[i][j] = sign * coef;
            }
            tableau.data[i][total_cols - 1] = sign * c.rhs;

            match kind {
                RowKind::Slack | RowKind::Surplus => {
                    // Stored with +1 so it starts basic; the original row sees `sign`
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    tableau.unit_cols.push((slack_idx, sign));
                    tableau.logical_cols.push(slack_idx);
                    slack_idx += 1;
                }
                RowKind::SurplusAndArtificial => {
                    tableau.data[i][slack_idx] = -1.0;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    tableau.unit_cols.push((slack_idx, -sign));
                    tableau.logical_cols.push(slack_idx);
                    slack_idx += 1;
                    artificial_idx += 1;
                }
                RowKind::Artificial => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    tableau.unit_cols.push((artificial_idx, sign));
                    tableau.logical_cols.push(artificial_idx);
                    artificial_idx += 1;
                }
            }
        }

        let obj_row = n_constraints;
        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            tableau.data[obj_row][j] = sense * coef;
        }

        tableau
    }

    /// Build a tableau and pivot the given columns into the basis, in order,
    /// skipping any that are dependent on the ones already placed. Columns
    /// use the global numbering of [`crate::Analysis::basis`].
    pub(crate) fn from_basis(problem: &LpProblem, layout: Layout, columns: &[usize]) -> Self {
        let mut tableau = Self::build(problem, layout);
        let n_rows = tableau.num_rows();

        let wanted: Vec<usize> = columns
            .iter()
            .filter_map(|&g| tableau.global_to_col(g))
            .filter(|&col| !tableau.is_artificial(col))
            .collect();

        let mut claimed: Vec<bool> = tableau
            .basic_vars
            .iter()
            .map(|b| wanted.contains(b))
            .collect();

        for &col in &wanted {
            if claimed.iter().all(|&c| c) {
                break;
            }
            if tableau.basic_vars.contains(&col) {
                continue;
            }
            let mut best: Option<(usize, f64)> = None;
            for r in 0..n_rows {
                if claimed[r] {
                    continue;
                }
                let v = tableau.data[r][col].abs();
                if v > PIVOT_TOL && best.is_none_or(|(_, b)| v > b) {
                    best = Some((r, v));
                }
            }
            if let Some((r, _)) = best {
                tableau.pivot(r, col);
                claimed[r] = true;
            }
        }

        tableau
    }

    pub(crate) fn num_rows(&self) -> usize {
        self.data.len() - 1
    }

    pub(crate) fn obj_row(&self) -> usize {
        self.data.len() - 1
    }

    pub(crate) fn rhs_col(&self) -> usize {
        self.data[0].len() - 1
    }

    pub(crate) fn rhs(&self, row: usize) -> f64 {
        self.data[row][self.rhs_col()]
    }

    pub(crate) fn reduced_cost(&self, col: usize) -> f64 {
        self.data[self.obj_row()][col]
    }

    pub(crate) fn feasibility_tol(&self) -> f64 {
        1e-7 * (1.0 + self.rhs_scale)
    }

    pub(crate) fn is_artificial(&self, col: usize) -> bool {
        let start = self.n_vars + self.n_slack;
        col >= start && col < start + self.n_artificial
    }

    /// Columns that may enter the basis
    pub(crate) fn is_eligible(&self, col: usize) -> bool {
        col < self.rhs_col() && !self.is_artificial(col)
    }

    pub(crate) fn is_basic(&self, col: usize) -> bool {
        self.basic_vars.contains(&col)
    }

    fn global_to_col(&self, global: usize) -> Option<usize> {
        if global < self.n_vars {
            Some(global)
        } else {
            self.logical_cols.get(global - self.n_vars).copied()
        }
    }

    fn col_to_global(&self, col: usize) -> Option<usize> {
        if col < self.n_vars {
            return Some(col);
        }
        self.logical_cols
            .iter()
            .position(|&c| c == col)
            .filter(|_| !self.is_artificial(col))
            .map(|i| self.n_vars + i)
    }

    /// Basic columns in global numbering, artificials left out
    pub(crate) fn basis(&self) -> Vec<usize> {
        self.basic_vars
            .iter()
            .filter_map(|&col| self.col_to_global(col))
            .collect()
    }

    pub(crate) fn pivot(&mut self, row: usize, col: usize) {
        let n_rows = self.data.len();
        let n_cols = self.data[0].len();

        self.basic_vars[row] = col;

        let pivot_val = self.data[row][col];
        for j in 0..n_cols {
            self.data[row][j] /= pivot_val;
        }
        // Keep the pivot entry an exact 1 so later ratio tests see a clean unit column
        self.data[row][col] = 1.0;

        let pivot_row = self.data[row].clone();
        for i in 0..n_rows {
            if i == row {
                continue;
            }
            let factor = self.data[i][col];
            if factor == 0.0 {
                continue;
            }
            for (j, &p) in pivot_row.iter().enumerate() {
                self.data[i][j] -= factor * p;
            }
            self.data[i][col] = 0.0;
        }
    }

    /// Pivot basic artificials at zero level out of the basis. Rows with no
    /// usable entry are redundant and keep their artificial.
    pub(crate) fn drive_out_artificials(&mut self) {
        for r in 0..self.num_rows() {
            if !self.is_artificial(self.basic_vars[r]) {
                continue;
            }
            let mut best: Option<(usize, f64)> = None;
            for col in 0..self.rhs_col() {
                if !self.is_eligible(col) || self.is_basic(col) {
                    continue;
                }
                let v = self.data[r][col].abs();
                if v > PIVOT_TOL && best.is_none_or(|(_, b)| v > b) {
                    best = Some((col, v));
                }
            }
            if let Some((col, _)) = best {
                self.pivot(r, col);
            }
        }
    }

    pub(crate) fn primal_feasible(&self) -> bool {
        let tol = self.feasibility_tol();
        (0..self.num_rows()).all(|r| {
            let v = self.rhs(r);
            if self.is_artificial(self.basic_vars[r]) {
                v.abs() <= tol
            } else {
                v >= -tol
            }
        })
    }

    pub(crate) fn dual_feasible(&self, tolerance: f64) -> bool {
        (0..self.rhs_col())
            .filter(|&col| self.is_eligible(col) && !self.is_basic(col))
            .all(|col| self.reduced_cost(col) <= tolerance)
    }

    /// Zero out right-hand sides that are negative only by rounding
    pub(crate) fn clamp_rhs(&mut self) {
        let tol = self.feasibility_tol();
        let rhs_col = self.rhs_col();
        for r in 0..self.num_rows() {
            let v = self.data[r][rhs_col];
            if v < 0.0 && v >= -tol {
                self.data[r][rhs_col] = 0.0;
            }
        }
    }

    /// Append `sum of nonbasic columns + s = bound` before the objective row,
    /// with `s` basic. Used by the dual simplex to restore dual feasibility.
    pub(crate) fn add_bounding_row(&mut self, bound: f64) -> usize {
        let col = self.rhs_col();
        for row in &mut self.data {
            row.insert(col, 0.0);
        }
        let n_cols = self.data[0].len();
        let mut row = vec![0.0; n_cols];
        for j in 0..col {
            if self.is_eligible(j) && !self.is_basic(j) {
                row[j] = 1.0;
            }
        }
        row[col] = 1.0;
        row[n_cols - 1] = bound;
        let at = self.obj_row();
        self.data.insert(at, row);
        self.basic_vars.push(col);
        self.bound_col = Some(col);
        col
    }

    /// Drop the bounding row. Its slack must be basic.
    pub(crate) fn remove_bounding_row(&mut self) {
        let Some(col) = self.bound_col else {
            return;
        };
        if let Some(row) = self.basic_vars.iter().position(|&b| b == col) {
            self.data.remove(row);
            self.basic_vars.remove(row);
        }
        for row in &mut self.data {
            row.remove(col);
        }
        self.bound_col = None;
    }

    /// Variable values, artifacts and (optionally) ranging at the current basis
    pub(crate) fn extract(&self, problem: &LpProblem, ranging: bool) -> (Vec<f64>, Analysis) {
        let n_vars = problem.num_variables();
        let tol = self.feasibility_tol();
        let rhs_col = self.rhs_col();

        let mut values = vec![0.0; n_vars];
        for (r, &basic) in self.basic_vars.iter().enumerate() {
            if basic < n_vars {
                let v = self.data[r][rhs_col];
                values[basic] = if v.abs() <= tol * 1e-2 { 0.0 } else { v };
            }
        }

        let variables = problem
            .variables
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let is_basic = self.is_basic(j);
                let reduced_cost = if is_basic { 0.0 } else { self.sense * self.reduced_cost(j) };
                VariableInfo {
                    name: name.clone(),
                    value: values[j],
                    reduced_cost: clean(reduced_cost),
                    objective: problem.objective.coefficients[j],
                    is_basic,
                    objective_range: ranging.then(|| self.objective_range(problem, j)),
                }
            })
            .collect();

        let activity = problem.row_activity(&values);
        let constraints = problem
            .constraints
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let (col, scale) = self.unit_cols[i];
                let dual = -self.reduced_cost(col) * scale * self.sense;
                let slack = c.rhs - activity[i];
                ConstraintInfo {
                    name: c.name.clone(),
                    activity: activity[i],
                    slack: clean(slack),
                    dual: clean(dual),
                    rhs: c.rhs,
                    binding: slack.abs() <= tol,
                    rhs_range: ranging.then(|| self.rhs_range(i, c.rhs)),
                }
            })
            .collect();

        let analysis = Analysis {
            variables,
            constraints,
            basis: self.basis(),
        };
        (values, analysis)
    }

    /// Interval for the objective coefficient of column `j` keeping the basis optimal
    fn objective_range(&self, problem: &LpProblem, j: usize) -> SensitivityRange {
        let c = problem.objective.coefficients[j];
        let internal = self.sense * c;

        let (low, high) = match self.basic_vars.iter().position(|&b| b == j) {
            None => (f64::NEG_INFINITY, internal - self.reduced_cost(j).min(0.0)),
            Some(r) => {
                let mut delta_low = f64::NEG_INFINITY;
                let mut delta_high = f64::INFINITY;
                for k in 0..self.rhs_col() {
                    if k == j || !self.is_eligible(k) || self.is_basic(k) {
                        continue;
                    }
                    let t = self.data[r][k];
                    let d = self.reduced_cost(k).min(0.0);
                    if t > PIVOT_TOL {
                        delta_low = delta_low.max(d / t);
                    } else if t < -PIVOT_TOL {
                        delta_high = delta_high.min(d / t);
                    }
                }
                (internal + delta_low, internal + delta_high)
            }
        };

        if self.sense > 0.0 {
            SensitivityRange::new(low, high)
        } else {
            SensitivityRange::new(-high, -low)
        }
    }

    /// Interval for the right-hand side of row `i` keeping the basis feasible
    fn rhs_range(&self, i: usize, rhs: f64) -> SensitivityRange {
        let (col, scale) = self.unit_cols[i];
        let rhs_col = self.rhs_col();
        let mut delta_low = f64::NEG_INFINITY;
        let mut delta_high = f64::INFINITY;

        for r in 0..self.num_rows() {
            let u = scale * self.data[r][col];
            if u.abs() <= PIVOT_TOL {
                continue;
            }
            let x = self.data[r][rhs_col].max(0.0);
            if self.is_artificial(self.basic_vars[r]) {
                // An artificial must stay at zero, so the row pins the RHS
                return SensitivityRange::new(rhs, rhs);
            }
            let limit = -x / u;
            if u > 0.0 {
                delta_low = delta_low.max(limit);
            } else {
                delta_high = delta_high.min(limit);
            }
        }

        SensitivityRange::new(rhs + delta_low, rhs + delta_high)
    }
}

/// Flush rounding noise and negative zero so reports are stable
pub(crate) fn clean(v: f64) -> f64 {
    if v.abs() < 1e-12 { 0.0 } else { v }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LpProblem {
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("low", vec![1.0, 0.0], ConstraintOp::Ge, 1.0);
        problem.add_constraint("fix", vec![0.0, 1.0], ConstraintOp::Eq, 2.0);
        problem
    }

    #[test]
    fn test_primal_layout_columns() {
        let tableau = Tableau::build(&sample(), Layout::Primal);
        // 2 vars, slack for sum, surplus for low, artificials for low and fix, RHS
        assert_eq!(tableau.data[0].len(), 2 + 2 + 2 + 1);
        assert_eq!(tableau.n_artificial, 2);
        assert!(tableau.is_artificial(tableau.basic_vars[1]));
        assert!(tableau.is_artificial(tableau.basic_vars[2]));
        assert!(!tableau.is_artificial(tableau.basic_vars[0]));
    }

    #[test]
    fn test_dual_layout_negates_ge_rows() {
        let tableau = Tableau::build(&sample(), Layout::Dual);
        assert_eq!(tableau.n_artificial, 1);
        assert_eq!(tableau.rhs(1), -1.0);
        assert_eq!(tableau.data[1][0], -1.0);
        assert!(!tableau.is_artificial(tableau.basic_vars[1]));
    }

    #[test]
    fn test_from_basis_installs_columns() {
        let problem = sample();
        // x, y and the slack of `sum`
        let tableau = Tableau::from_basis(&problem, Layout::Primal, &[0, 1, 2]);
        let mut basis = tableau.basis();
        basis.sort_unstable();
        assert_eq!(basis, vec![0, 1, 2]);
    }

    #[test]
    fn test_bounding_row_round_trip() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], false);
        problem.add_constraint("cap", vec![1.0], ConstraintOp::Le, 5.0);

        let mut tableau = Tableau::build(&problem, Layout::Dual);
        let width = tableau.data[0].len();
        let col = tableau.add_bounding_row(100.0);
        assert_eq!(tableau.num_rows(), 2);
        assert_eq!(tableau.data[1][0], 1.0);
        assert_eq!(tableau.data[1][col], 1.0);

        tableau.remove_bounding_row();
        assert_eq!(tableau.num_rows(), 1);
        assert_eq!(tableau.data[0].len(), width);
        assert_eq!(tableau.rhs(0), 5.0);
    }
}
