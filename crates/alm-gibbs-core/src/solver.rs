//! Preconditioned conjugate gradient.
//!
//! Solves `A x = b` for a symmetric positive-definite `A` supplied as a
//! matrix-free [`LinearOperator`]. Convergence is declared when
//! `‖b - A x‖ ≤ tolerance · ‖b‖`, the SciPy `cg` convention.
//!
//! Hitting the iteration cap is not an error. The caller gets the last
//! iterate together with `converged = false` and decides whether to keep it.

use crate::constants::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};
use crate::error::{check_len, Result};
use crate::types::{Matrix, Vector};

/// A symmetric linear map applied without materialising its matrix.
pub trait LinearOperator {
    /// Dimension of the (square) operator.
    fn dim(&self) -> usize;

    /// `y = A x`. `x` has length [`dim`](Self::dim).
    fn apply(&self, x: &Vector) -> Vector;

    /// Diagonal of `A`, if cheaply available.
    fn diagonal(&self) -> Option<Vector> {
        None
    }
}

impl LinearOperator for Matrix {
    fn dim(&self) -> usize {
        self.nrows()
    }

    fn apply(&self, x: &Vector) -> Vector {
        self * x
    }

    fn diagonal(&self) -> Option<Vector> {
        Some(Matrix::diagonal(self))
    }
}

/// Preconditioner applied to the residual each iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Preconditioner {
    /// Plain conjugate gradient.
    #[default]
    None,
    /// Divide by the operator diagonal.
    ///
    /// Falls back to the identity when the operator exposes no diagonal.
    Jacobi,
}

/// Result of one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    /// Final iterate.
    pub solution: Vector,
    /// Number of CG iterations performed.
    pub iterations: usize,
    /// Whether the residual reached the tolerance.
    pub converged: bool,
    /// `‖b - A x‖ / ‖b‖` at the final iterate (0 for `b = 0`).
    pub relative_residual: f64,
}

/// Conjugate-gradient settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ConjugateGradient {
    /// Relative residual tolerance.
    pub tolerance: f64,
    /// Iteration cap.
    pub max_iterations: usize,
    /// Residual preconditioner.
    pub preconditioner: Preconditioner,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            preconditioner: Preconditioner::None,
        }
    }
}

impl ConjugateGradient {
    /// Unpreconditioned solver with the given tolerance and cap.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            preconditioner: Preconditioner::None,
        }
    }

    /// Set the preconditioner.
    pub fn with_preconditioner(mut self, preconditioner: Preconditioner) -> Self {
        self.preconditioner = preconditioner;
        self
    }

    /// Solve `op · x = rhs` starting from `warm_start` (zero if `None`).
    pub fn solve<A: LinearOperator + ?Sized>(
        &self,
        op: &A,
        rhs: &Vector,
        warm_start: Option<&Vector>,
    ) -> Result<SolveOutcome> {
        let n = op.dim();
        check_len("right-hand side", n, rhs.len())?;
        if let Some(x0) = warm_start {
            check_len("warm start", n, x0.len())?;
        }

        let b_norm = rhs.norm();
        if b_norm == 0.0 {
            return Ok(SolveOutcome {
                solution: Vector::zeros(n),
                iterations: 0,
                converged: true,
                relative_residual: 0.0,
            });
        }

        let inv_diag = match self.preconditioner {
            Preconditioner::None => None,
            Preconditioner::Jacobi => op.diagonal().map(|d| {
                d.map(|v| if v.is_finite() && v > 0.0 { 1.0 / v } else { 1.0 })
            }),
        };
        let precondition = |r: &Vector| match &inv_diag {
            Some(d) => r.component_mul(d),
            None => r.clone(),
        };

        let mut x = warm_start.cloned().unwrap_or_else(|| Vector::zeros(n));
        let mut r = rhs - op.apply(&x);
        let mut z = precondition(&r);
        let mut p = z.clone();
        let mut rz = r.dot(&z);

        let threshold = self.tolerance * b_norm;
        let mut residual = r.norm();
        let mut iterations = 0;

        while residual > threshold && iterations < self.max_iterations {
            let ap = op.apply(&p);
            let pap = p.dot(&ap);
            if !(pap.is_finite() && pap > 0.0) {
                // Not positive definite along p; stop with what we have.
                break;
            }

            let alpha = rz / pap;
            x.axpy(alpha, &p, 1.0);
            r.axpy(-alpha, &ap, 1.0);
            iterations += 1;

            residual = r.norm();
            if residual <= threshold {
                break;
            }

            z = precondition(&r);
            let rz_next = r.dot(&z);
            let beta = rz_next / rz;
            rz = rz_next;
            p.axpy(1.0, &z, beta);
        }

        Ok(SolveOutcome {
            solution: x,
            iterations,
            converged: residual <= threshold,
            relative_residual: residual / b_norm,
        })
    }
}
