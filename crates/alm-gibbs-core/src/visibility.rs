//! Visibility response operator and visibility vectors.
//!
//! The response operator is produced by an external visibility simulator. It
//! maps a realified alm vector to complex visibilities, stored here as two
//! real `N_vis × N_coeff` blocks so every product stays in real arithmetic.

use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::{check_len, GibbsError, Result};
use crate::noise::NoiseModel;
use crate::types::{Matrix, Vector};

/// Complex visibilities split into real and imaginary components.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityData {
    /// Real components.
    pub real: Vector,
    /// Imaginary components.
    pub imag: Vector,
}

impl VisibilityData {
    /// Pair real and imaginary components of equal length.
    pub fn new(real: Vector, imag: Vector) -> Result<Self> {
        check_len("imaginary visibility component", real.len(), imag.len())?;
        Ok(Self { real, imag })
    }

    /// All-zero visibilities.
    pub fn zeros(n_vis: usize) -> Self {
        Self {
            real: Vector::zeros(n_vis),
            imag: Vector::zeros(n_vis),
        }
    }

    /// Number of complex visibilities.
    pub fn len(&self) -> usize {
        self.real.len()
    }

    /// True if there are no visibilities.
    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    /// Simulate noisy data `d = R·x_true + n`, with `n_re`, `n_im` each drawn
    /// from `N(0, variance)` per visibility.
    ///
    /// Deterministic for a given `data_seed`.
    pub fn simulate(
        response: &ResponseOperator,
        true_sky: &Vector,
        noise: &NoiseModel,
        data_seed: u64,
    ) -> Result<Self> {
        let model = response.apply(true_sky)?;
        check_len("noise variance", model.len(), noise.len())?;

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(data_seed);
        let n_vis = model.len();
        let n_re = Vector::from_fn(n_vis, |_, _| StandardNormal.sample(&mut rng));
        let n_im = Vector::from_fn(n_vis, |_, _| StandardNormal.sample(&mut rng));

        let std = noise.variance().map(f64::sqrt);
        Ok(Self {
            real: model.real + n_re.component_mul(&std),
            imag: model.imag + n_im.component_mul(&std),
        })
    }
}

/// Linear map from realified alms to (real, imaginary) visibilities.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseOperator {
    real: Matrix,
    imag: Matrix,
}

impl ResponseOperator {
    /// Build from the real and imaginary response blocks.
    pub fn new(real: Matrix, imag: Matrix) -> Result<Self> {
        if real.shape() != imag.shape() {
            return Err(GibbsError::ShapeMismatch {
                what: "imaginary response block",
                expected: real.shape(),
                got: imag.shape(),
            });
        }
        Ok(Self { real, imag })
    }

    /// Real response block.
    pub fn real(&self) -> &Matrix {
        &self.real
    }

    /// Imaginary response block.
    pub fn imag(&self) -> &Matrix {
        &self.imag
    }

    /// Number of visibilities (rows).
    pub fn n_vis(&self) -> usize {
        self.real.nrows()
    }

    /// Number of realified coefficients (columns).
    pub fn n_coeff(&self) -> usize {
        self.real.ncols()
    }

    /// Predicted visibilities for coefficient vector `x`.
    pub fn apply(&self, x: &Vector) -> Result<VisibilityData> {
        check_len("coefficient vector", self.n_coeff(), x.len())?;
        Ok(VisibilityData {
            real: &self.real * x,
            imag: &self.imag * x,
        })
    }

    /// Adjoint map `Reᵗ v_re + Imᵗ v_im`.
    pub fn adjoint(&self, v: &VisibilityData) -> Result<Vector> {
        check_len("visibility vector", self.n_vis(), v.len())?;
        Ok(self.real.tr_mul(&v.real) + self.imag.tr_mul(&v.imag))
    }

    /// Noise-weighted Gram matrix `Reᵗ N⁻¹ Re + Imᵗ N⁻¹ Im`.
    ///
    /// Depends only on the operator and the noise precision, so it is
    /// computed once per chain.
    pub fn noise_weighted_gram(&self, precision: &Vector) -> Result<Matrix> {
        check_len("noise precision", self.n_vis(), precision.len())?;

        #[cfg(feature = "parallel")]
        let (re, im) = rayon::join(
            || weighted_gram(&self.real, precision),
            || weighted_gram(&self.imag, precision),
        );

        #[cfg(not(feature = "parallel"))]
        let (re, im) = (
            weighted_gram(&self.real, precision),
            weighted_gram(&self.imag, precision),
        );

        Ok(re + im)
    }
}

/// `Aᵗ diag(w) A`.
fn weighted_gram(a: &Matrix, weights: &Vector) -> Matrix {
    let mut weighted = a.clone();
    for (mut row, &w) in weighted.row_iter_mut().zip(weights.iter()) {
        row *= w;
    }
    a.tr_mul(&weighted)
}
