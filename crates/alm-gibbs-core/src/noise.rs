//! Diagonal noise model from the radiometer equation.
//!
//! For a cross-correlation of antennas i and j the expected visibility noise
//! variance is
//!
//! ```text
//! σ²_ij = V_ii · V_jj / (N_nights · Δt · Δf)
//! ```
//!
//! where `V_ii` are the auto-correlations predicted for the true sky. The
//! auto-correlations are real, so the complex product must have an exactly
//! zero imaginary part; anything else is an upstream simulation bug.

use num_complex::Complex64;

use crate::constants::{COMPONENT_VARIANCE_SHARE, DEFAULT_DELTA_FREQ, DEFAULT_DELTA_TIME};
use crate::error::{GibbsError, Result};
use crate::types::Vector;
use crate::visibility::VisibilityData;

/// Correlator parameters of the radiometer equation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RadiometerParams {
    /// Integration time per visibility, in seconds.
    ///
    /// Default: 60
    pub delta_time: f64,

    /// Channel width, in Hz.
    ///
    /// Default: 1e6
    pub delta_freq: f64,

    /// Number of nights averaged together.
    ///
    /// Default: 1
    pub n_nights: u32,

    /// Whether the i = j (auto) baselines are part of the data vector.
    ///
    /// Default: false
    pub include_autos: bool,
}

impl Default for RadiometerParams {
    fn default() -> Self {
        Self {
            delta_time: DEFAULT_DELTA_TIME,
            delta_freq: DEFAULT_DELTA_FREQ,
            n_nights: 1,
            include_autos: false,
        }
    }
}

impl RadiometerParams {
    /// Number of baselines formed from `n_ants` antennas.
    pub fn n_baselines(&self, n_ants: usize) -> usize {
        if self.include_autos {
            n_ants * (n_ants + 1) / 2
        } else {
            n_ants * n_ants.saturating_sub(1) / 2
        }
    }

    fn denominator(&self) -> f64 {
        f64::from(self.n_nights) * self.delta_time * self.delta_freq
    }
}

/// Radiometer-equation variance for every baseline, baseline-major.
///
/// `autos` holds the auto-correlation visibilities of each antenna in
/// equal antenna-major blocks (one entry per frequency/time sample). The
/// output has one block per antenna pair i < j (i ≤ j with
/// `include_autos`), in row-major pair order.
pub fn radiometer_variance(
    autos: &VisibilityData,
    n_ants: usize,
    params: &RadiometerParams,
) -> Result<Vector> {
    if n_ants == 0 || autos.len() % n_ants != 0 {
        return Err(GibbsError::LengthMismatch {
            what: "auto-correlation visibilities",
            expected: n_ants.max(1) * (autos.len() / n_ants.max(1)),
            got: autos.len(),
        });
    }

    let block = autos.len() / n_ants;
    let denominator = params.denominator();
    let auto = |ant: usize, k: usize| {
        let idx = ant * block + k;
        Complex64::new(autos.real[idx], autos.imag[idx])
    };

    let mut sigma = Vec::with_capacity(params.n_baselines(n_ants) * block);
    for i in 0..n_ants {
        let first_j = if params.include_autos { i } else { i + 1 };
        for j in first_j..n_ants {
            for k in 0..block {
                let product = auto(i, k) * auto(j, k);
                if product.im != 0.0 {
                    return Err(GibbsError::ConsistencyCheck {
                        index: sigma.len(),
                        imag: product.im,
                    });
                }
                sigma.push(product.re / denominator);
            }
        }
    }

    Ok(Vector::from_vec(sigma))
}

/// Diagonal noise covariance of the real and imaginary visibility components.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseModel {
    variance: Vector,
    precision: Vector,
}

impl NoiseModel {
    /// Build from a per-component variance vector.
    ///
    /// Fails if any entry is zero, negative or non-finite.
    pub fn from_variance(variance: Vector) -> Result<Self> {
        let precision = crate::covariance::precision_from_variance(&variance, "noise variance")?;
        Ok(Self {
            variance,
            precision,
        })
    }

    /// Build from auto-correlations with the radiometer equation.
    ///
    /// The complex variance is shared equally by the real and imaginary
    /// components, so each component gets half of `σ²_ij`.
    pub fn from_radiometer(
        autos: &VisibilityData,
        n_ants: usize,
        params: &RadiometerParams,
    ) -> Result<Self> {
        let sigma = radiometer_variance(autos, n_ants, params)?;
        Self::from_variance(sigma * COMPONENT_VARIANCE_SHARE)
    }

    /// Per-component variance.
    pub fn variance(&self) -> &Vector {
        &self.variance
    }

    /// Per-component precision N⁻¹.
    pub fn precision(&self) -> &Vector {
        &self.precision
    }

    /// Number of visibilities covered.
    pub fn len(&self) -> usize {
        self.variance.len()
    }

    /// True if the model covers no visibilities.
    pub fn is_empty(&self) -> bool {
        self.variance.is_empty()
    }
}
