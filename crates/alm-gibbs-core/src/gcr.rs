//! Gaussian constrained realisation (GCR) linear system.
//!
//! A draw from `a | C_ℓ, d ~ N(μ, (RᵗN⁻¹R + S⁻¹)⁻¹)` is the solution of
//!
//! ```text
//! (Reᵗ N⁻¹ Re + Imᵗ N⁻¹ Im + S⁻¹) x
//!     = Reᵗ(N⁻¹ d_re + √N⁻¹ ω₁_re) + Imᵗ(N⁻¹ d_im + √N⁻¹ ω₁_im) + S⁻¹ a₀ + √S⁻¹ ω₀
//! ```
//!
//! with ω₀ and the real and imaginary parts of ω₁ independent standard
//! normals (ω₁ components scaled by 1/√2). Setting both fluctuation terms to
//! zero gives the Wiener filter.
//!
//! Only S⁻¹ changes between iterations, so the Gram matrix and the data term
//! are precomputed in [`GcrSystem::new`].
//!
//! ## Monopole pinning
//!
//! With a pin value `c` the monopole is removed from the unknowns: row and
//! column 0 of the operator are replaced by the identity, the right-hand side
//! becomes `b - c·A e₀` with `b[0] = 0`, and `x[0] = c` is restored after the
//! solve. The reduced operator stays symmetric positive definite.

use std::f64::consts::FRAC_1_SQRT_2;

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::constants::MONOPOLE_SLOT;
use crate::error::{check_len, Result};
use crate::noise::NoiseModel;
use crate::solver::{ConjugateGradient, LinearOperator, SolveOutcome};
use crate::types::{Matrix, Vector};
use crate::visibility::{ResponseOperator, VisibilityData};

/// Random fluctuation terms that turn the Wiener-filter solve into a draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Fluctuations {
    /// Prior-side fluctuation, length N_coeff, standard normal.
    pub omega_0: Vector,
    /// Data-side fluctuation, length N_vis, each component N(0, 1/2).
    pub omega_1: VisibilityData,
}

impl Fluctuations {
    /// All-zero fluctuations (Wiener filter).
    pub fn zeros(n_coeff: usize, n_vis: usize) -> Self {
        Self {
            omega_0: Vector::zeros(n_coeff),
            omega_1: VisibilityData::zeros(n_vis),
        }
    }

    /// Draw ω₀, then the real and then the imaginary part of ω₁.
    pub fn draw<R: Rng + ?Sized>(rng: &mut R, n_coeff: usize, n_vis: usize) -> Self {
        let mut normal = || -> f64 { StandardNormal.sample(&mut *rng) };
        let omega_0 = Vector::from_fn(n_coeff, |_, _| normal());
        let real = Vector::from_fn(n_vis, |_, _| normal() * FRAC_1_SQRT_2);
        let imag = Vector::from_fn(n_vis, |_, _| normal() * FRAC_1_SQRT_2);
        Self {
            omega_0,
            omega_1: VisibilityData { real, imag },
        }
    }
}

/// Everything about the linear system that is fixed for a chain.
#[derive(Debug, Clone)]
pub struct GcrSystem {
    response: ResponseOperator,
    noise: NoiseModel,
    data: VisibilityData,
    gram: Matrix,
    data_term: Vector,
}

impl GcrSystem {
    /// Validate shapes and precompute the Gram matrix and data term.
    pub fn new(response: ResponseOperator, noise: NoiseModel, data: VisibilityData) -> Result<Self> {
        check_len("noise model", response.n_vis(), noise.len())?;
        check_len("visibility data", response.n_vis(), data.len())?;

        let precision = noise.precision();
        let gram = response.noise_weighted_gram(precision)?;
        let weighted = VisibilityData {
            real: data.real.component_mul(precision),
            imag: data.imag.component_mul(precision),
        };
        let data_term = response.adjoint(&weighted)?;

        Ok(Self {
            response,
            noise,
            data,
            gram,
            data_term,
        })
    }

    /// Response operator.
    pub fn response(&self) -> &ResponseOperator {
        &self.response
    }

    /// Noise model.
    pub fn noise(&self) -> &NoiseModel {
        &self.noise
    }

    /// Observed visibilities.
    pub fn data(&self) -> &VisibilityData {
        &self.data
    }

    /// `Reᵗ N⁻¹ Re + Imᵗ N⁻¹ Im`.
    pub fn gram(&self) -> &Matrix {
        &self.gram
    }

    /// `Reᵗ N⁻¹ d_re + Imᵗ N⁻¹ d_im`.
    pub fn data_term(&self) -> &Vector {
        &self.data_term
    }

    /// Number of realified coefficients.
    pub fn n_coeff(&self) -> usize {
        self.response.n_coeff()
    }

    /// Number of visibilities.
    pub fn n_vis(&self) -> usize {
        self.response.n_vis()
    }

    /// Right-hand side for the given signal precision and prior mean.
    ///
    /// `None` fluctuations give the Wiener-filter right-hand side.
    pub fn rhs(
        &self,
        signal_precision: &Vector,
        prior_mean: &Vector,
        fluctuations: Option<&Fluctuations>,
    ) -> Result<Vector> {
        check_len("signal precision", self.n_coeff(), signal_precision.len())?;
        check_len("prior mean", self.n_coeff(), prior_mean.len())?;

        let mut b = &self.data_term + signal_precision.component_mul(prior_mean);

        if let Some(f) = fluctuations {
            check_len("prior fluctuation", self.n_coeff(), f.omega_0.len())?;
            check_len("data fluctuation", self.n_vis(), f.omega_1.len())?;

            let sqrt_noise = self.noise.precision().map(f64::sqrt);
            let scaled = VisibilityData {
                real: f.omega_1.real.component_mul(&sqrt_noise),
                imag: f.omega_1.imag.component_mul(&sqrt_noise),
            };
            b += self.response.adjoint(&scaled)?;
            b += signal_precision.map(f64::sqrt).component_mul(&f.omega_0);
        }

        Ok(b)
    }

    /// Left-hand-side operator for the given signal precision.
    pub fn operator<'a>(
        &'a self,
        signal_precision: &'a Vector,
        pin: Option<f64>,
    ) -> Result<GcrOperator<'a>> {
        check_len("signal precision", self.n_coeff(), signal_precision.len())?;
        Ok(GcrOperator {
            gram: &self.gram,
            signal_precision,
            pin,
        })
    }

    /// Solve the system for `rhs`, starting from `warm_start`.
    ///
    /// With `pin = Some(c)` the returned solution has `x[0] == c` exactly.
    pub fn solve(
        &self,
        signal_precision: &Vector,
        pin: Option<f64>,
        rhs: &Vector,
        warm_start: Option<&Vector>,
        solver: &ConjugateGradient,
    ) -> Result<SolveOutcome> {
        let op = self.operator(signal_precision, pin)?;
        check_len("right-hand side", self.n_coeff(), rhs.len())?;

        let b = op.reduce_rhs(rhs);
        let x0 = warm_start.map(|x| op.reduce_guess(x));
        let mut outcome = solver.solve(&op, &b, x0.as_ref())?;
        outcome.solution = op.restore(outcome.solution);
        Ok(outcome)
    }
}

/// Matrix-free `x ↦ (Gram + S⁻¹) x`, optionally with the monopole pinned.
#[derive(Debug, Clone, Copy)]
pub struct GcrOperator<'a> {
    gram: &'a Matrix,
    signal_precision: &'a Vector,
    pin: Option<f64>,
}

impl GcrOperator<'_> {
    /// Monopole pin value, if any.
    pub fn pin(&self) -> Option<f64> {
        self.pin
    }

    /// Move the pinned monopole's contribution to the right-hand side.
    pub fn reduce_rhs(&self, rhs: &Vector) -> Vector {
        match self.pin {
            None => rhs.clone(),
            Some(c) => {
                let mut b = rhs - self.gram.column(MONOPOLE_SLOT) * c;
                b[MONOPOLE_SLOT] = 0.0;
                b
            }
        }
    }

    /// Zero the pinned slot of an initial guess.
    pub fn reduce_guess(&self, x: &Vector) -> Vector {
        let mut x = x.clone();
        if self.pin.is_some() {
            x[MONOPOLE_SLOT] = 0.0;
        }
        x
    }

    /// Reinsert the pinned monopole into a reduced solution.
    pub fn restore(&self, mut x: Vector) -> Vector {
        if let Some(c) = self.pin {
            x[MONOPOLE_SLOT] = c;
        }
        x
    }
}

impl LinearOperator for GcrOperator<'_> {
    fn dim(&self) -> usize {
        self.signal_precision.len()
    }

    fn apply(&self, x: &Vector) -> Vector {
        match self.pin {
            None => self.gram * x + self.signal_precision.component_mul(x),
            Some(_) => {
                let mut reduced = x.clone();
                reduced[MONOPOLE_SLOT] = 0.0;
                let mut y = self.gram * &reduced + self.signal_precision.component_mul(&reduced);
                y[MONOPOLE_SLOT] = x[MONOPOLE_SLOT];
                y
            }
        }
    }

    fn diagonal(&self) -> Option<Vector> {
        let mut d = self.gram.diagonal() + self.signal_precision;
        if self.pin.is_some() {
            d[MONOPOLE_SLOT] = 1.0;
        }
        Some(d)
    }
}
