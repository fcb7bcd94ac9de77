use crate::error::SolverError;

/// A linear program over non-negative continuous variables
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LpProblem {
    /// Variable names, in column order
    pub variables: Vec<String>,
    /// Objective function
    pub objective: Objective,
    /// Constraints, in row order
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constraint {
    /// Name used to look up duals, slacks and ranges
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl LpProblem {
    pub fn new(variables: Vec<String>) -> Self {
        let n = variables.len();
        Self {
            variables,
            objective: Objective {
                coefficients: vec![0.0; n],
                minimize: true,
            },
            constraints: Vec::new(),
        }
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, minimize: bool) {
        self.objective = Objective { coefficients, minimize };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Row index of the constraint with the given name
    pub fn constraint_index(&self, name: &str) -> Option<usize> {
        self.constraints.iter().position(|c| c.name == name)
    }

    /// Column index of the variable with the given name
    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }

    /// Left-hand side of every constraint evaluated at `values`
    pub fn row_activity(&self, values: &[f64]) -> Vec<f64> {
        self.constraints
            .iter()
            .map(|c| c.coefficients.iter().zip(values).map(|(a, x)| a * x).sum())
            .collect()
    }

    /// Objective evaluated at `values`
    pub fn objective_at(&self, values: &[f64]) -> f64 {
        self.objective
            .coefficients
            .iter()
            .zip(values)
            .map(|(c, x)| c * x)
            .sum()
    }

    /// Check that every coefficient vector matches the variable count and
    /// that all numbers are finite.
    pub fn validate(&self) -> Result<(), SolverError> {
        let n = self.num_variables();
        if self.objective.coefficients.len() != n {
            return Err(SolverError::DimensionMismatch {
                what: "objective".to_string(),
                expected: n,
                found: self.objective.coefficients.len(),
            });
        }
        if let Some(j) = self.objective.coefficients.iter().position(|c| !c.is_finite()) {
            return Err(SolverError::NonFiniteCoefficient(format!("objective[{}]", self.variables[j])));
        }
        for c in &self.constraints {
            if c.coefficients.len() != n {
                return Err(SolverError::DimensionMismatch {
                    what: c.name.clone(),
                    expected: n,
                    found: c.coefficients.len(),
                });
            }
            if !c.rhs.is_finite() || c.coefficients.iter().any(|a| !a.is_finite()) {
                return Err(SolverError::NonFiniteCoefficient(c.name.clone()));
            }
        }
        Ok(())
    }
}
