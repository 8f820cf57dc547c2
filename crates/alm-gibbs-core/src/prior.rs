//! Gaussian prior on the realified alms.
//!
//! The prior is built around a reference ("true") sky:
//!
//! ```text
//! var_i = max((f · x_i)², σ_min²) [+ cosmic-variance term at degree ℓ(i)]
//! a₀_i  = x_i + √var_i · z_i,   z_i ~ N(0, 1)
//! a₀_0  = x_0                    (monopole pinned to the reference)
//! ```
//!
//! The variance is also the fixed covariance of the monopole for the whole
//! chain, since degree 0 is never touched by the C_ℓ update.

use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::constants::{
    DEFAULT_COSMIC_VARIANCE_FRACTION, DEFAULT_MIN_PRIOR_STD, DEFAULT_PRIOR_FRACTION, MONOPOLE_SLOT,
};
use crate::covariance::precision_from_variance;
use crate::error::{check_len, Result};
use crate::indexing::AlmIndex;
use crate::spectrum::angular_power_spectrum;
use crate::types::Vector;

/// Where the sky fraction enters the cosmic-variance term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SkyFractionPlacement {
    /// `k · √(2/(2ℓ+1)) · C_ℓ · f_sky`.
    #[default]
    Scale,
    /// `k · √(2/((2ℓ+1) f_sky)) · C_ℓ`, the textbook partial-sky form.
    InverseSqrt,
}

/// Optional inflation of the prior variance by cosmic variance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "mode", rename_all = "snake_case"))]
pub enum CosmicVariance {
    /// No inflation.
    #[default]
    Disabled,
    /// Add `k · g(ℓ, f_sky) · C_ℓ` to every slot of degree ℓ, where C_ℓ is
    /// the empirical spectrum of the reference sky.
    Enabled {
        /// Prefactor k.
        fraction: f64,
        /// Observed sky fraction.
        f_sky: f64,
        /// How `f_sky` enters.
        placement: SkyFractionPlacement,
    },
}

impl CosmicVariance {
    /// Full-sky inflation with the default prefactor.
    pub fn full_sky() -> Self {
        CosmicVariance::Enabled {
            fraction: DEFAULT_COSMIC_VARIANCE_FRACTION,
            f_sky: 1.0,
            placement: SkyFractionPlacement::Scale,
        }
    }

    /// Whether any inflation is applied.
    pub fn is_enabled(&self) -> bool {
        matches!(self, CosmicVariance::Enabled { .. })
    }

    /// Inflation term at degree `ell` for spectrum value `cl`.
    fn term(&self, ell: usize, cl: f64) -> f64 {
        match *self {
            CosmicVariance::Disabled => 0.0,
            CosmicVariance::Enabled {
                fraction,
                f_sky,
                placement,
            } => {
                let modes = (2 * ell + 1) as f64;
                match placement {
                    SkyFractionPlacement::Scale => fraction * (2.0 / modes).sqrt() * cl * f_sky,
                    SkyFractionPlacement::InverseSqrt => {
                        fraction * (2.0 / (modes * f_sky)).sqrt() * cl
                    }
                }
            }
        }
    }
}

/// How the prior is derived from the reference sky.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PriorConfig {
    /// Prior standard deviation as a fraction of each reference coefficient.
    ///
    /// Default: 0.1
    pub fractional_std: f64,

    /// Floor on the prior standard deviation.
    ///
    /// Default: 0.5
    pub min_std: f64,

    /// Cosmic-variance inflation.
    ///
    /// Default: disabled
    pub cosmic_variance: CosmicVariance,
}

impl Default for PriorConfig {
    fn default() -> Self {
        Self {
            fractional_std: DEFAULT_PRIOR_FRACTION,
            min_std: DEFAULT_MIN_PRIOR_STD,
            cosmic_variance: CosmicVariance::Disabled,
        }
    }
}

/// Diagonal prior variance for a reference sky.
pub fn prior_variance(true_sky: &Vector, config: &PriorConfig) -> Result<Vector> {
    let index = AlmIndex::from_len(true_sky.len())?;
    let floor = config.min_std * config.min_std;
    let mut variance = true_sky.map(|x| {
        let v = config.fractional_std * x;
        (v * v).max(floor)
    });

    if config.cosmic_variance.is_enabled() {
        let cls = angular_power_spectrum(true_sky.as_slice(), &index)?;
        for (slot, mode) in index.modes().enumerate() {
            variance[slot] += config.cosmic_variance.term(mode.ell, cls[mode.ell]);
        }
    }
    Ok(variance)
}

/// Prior mean, variance and precision of the realified alms.
#[derive(Debug, Clone, PartialEq)]
pub struct Prior {
    index: AlmIndex,
    mean: Vector,
    variance: Vector,
    precision: Vector,
}

impl Prior {
    /// Build from an explicit mean and variance.
    pub fn from_parts(mean: Vector, variance: Vector) -> Result<Self> {
        let index = AlmIndex::from_len(mean.len())?;
        check_len("prior variance", mean.len(), variance.len())?;
        let precision = precision_from_variance(&variance, "prior variance")?;
        Ok(Self {
            index,
            mean,
            variance,
            precision,
        })
    }

    /// Build around `true_sky`, drawing the mean with `prior_seed`.
    pub fn from_true_sky(true_sky: &Vector, config: &PriorConfig, prior_seed: u64) -> Result<Self> {
        let variance = prior_variance(true_sky, config)?;

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(prior_seed);
        let mut mean = Vector::from_fn(true_sky.len(), |i, _| {
            let z: f64 = StandardNormal.sample(&mut rng);
            true_sky[i] + variance[i].sqrt() * z
        });
        mean[MONOPOLE_SLOT] = true_sky[MONOPOLE_SLOT];

        Self::from_parts(mean, variance)
    }

    /// Index matching the prior's length.
    pub fn index(&self) -> &AlmIndex {
        &self.index
    }

    /// Prior mean a₀.
    pub fn mean(&self) -> &Vector {
        &self.mean
    }

    /// Diagonal prior variance.
    pub fn variance(&self) -> &Vector {
        &self.variance
    }

    /// Diagonal prior precision.
    pub fn precision(&self) -> &Vector {
        &self.precision
    }

    /// Prior mean of the monopole.
    pub fn monopole(&self) -> f64 {
        self.mean[MONOPOLE_SLOT]
    }
}
