//! Sampler configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use alm_gibbs_core::constants::{
    DEFAULT_COSMIC_VARIANCE_FRACTION, DEFAULT_DATA_SEED, DEFAULT_MAX_ITERATIONS,
    DEFAULT_N_SAMPLES, DEFAULT_PRIOR_SEED, DEFAULT_TOLERANCE,
};
use alm_gibbs_core::{
    ChainConfig, ConjugateGradient, CosmicVariance, Preconditioner, PriorConfig,
    RadiometerParams, SkyFractionPlacement,
};

/// Default number of samples per output file.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Configuration for one chain.
///
/// Built once, validated, and never changed while the chain runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Job identifier; distinguishes independent chains on the same data.
    ///
    /// Default: 0
    pub job_id: u64,

    /// Seed of the mock-data noise realisation.
    ///
    /// Default: 10
    pub data_seed: u64,

    /// Seed of the prior-mean draw.
    ///
    /// Default: 20
    pub prior_seed: u64,

    /// Number of Gibbs iterations.
    ///
    /// Default: 100
    pub n_samples: usize,

    /// Relative residual tolerance of each CG solve.
    ///
    /// Default: 1e-5
    pub tolerance: f64,

    /// Iteration cap of each CG solve.
    ///
    /// Default: 15,000
    pub max_iterations: usize,

    /// CG preconditioner.
    ///
    /// Default: none
    pub preconditioner: Preconditioner,

    /// Hold the monopole at its prior mean instead of sampling it.
    ///
    /// With `false` the chain resamples a₀₀ every iteration; only its prior
    /// variance stays fixed.
    ///
    /// Default: true
    pub pin_monopole: bool,

    /// Prior construction.
    pub prior: PriorConfig,

    /// Radiometer-equation parameters of the noise model.
    pub radiometer: RadiometerParams,

    /// Samples per JSON-lines output file.
    ///
    /// Default: 100
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            job_id: 0,
            data_seed: DEFAULT_DATA_SEED,
            prior_seed: DEFAULT_PRIOR_SEED,
            n_samples: DEFAULT_N_SAMPLES,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            preconditioner: Preconditioner::None,
            pin_monopole: true,
            prior: PriorConfig::default(),
            radiometer: RadiometerParams::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Short chain for smoke tests: 10 samples, one file.
    pub fn quick() -> Self {
        Self {
            n_samples: 10,
            batch_size: 10,
            ..Self::default()
        }
    }

    /// Set the job identifier.
    pub fn job_id(mut self, job_id: u64) -> Self {
        self.job_id = job_id;
        self
    }

    /// Set the data seed.
    pub fn data_seed(mut self, seed: u64) -> Self {
        self.data_seed = seed;
        self
    }

    /// Set the prior seed.
    pub fn prior_seed(mut self, seed: u64) -> Self {
        self.prior_seed = seed;
        self
    }

    /// Set the number of Gibbs iterations.
    ///
    /// # Panics
    ///
    /// Panics if `n` is 0.
    pub fn n_samples(mut self, n: usize) -> Self {
        assert!(n > 0, "n_samples must be > 0 (got {})", n);
        self.n_samples = n;
        self
    }

    /// Set the CG relative tolerance.
    ///
    /// # Panics
    ///
    /// Panics if `tolerance` is not in (0, 1).
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        assert!(
            tolerance > 0.0 && tolerance < 1.0,
            "tolerance must be in (0, 1), got {}",
            tolerance
        );
        self.tolerance = tolerance;
        self
    }

    /// Set the CG iteration cap.
    ///
    /// # Panics
    ///
    /// Panics if `n` is 0.
    pub fn max_iterations(mut self, n: usize) -> Self {
        assert!(n > 0, "max_iterations must be > 0 (got {})", n);
        self.max_iterations = n;
        self
    }

    /// Set the CG preconditioner.
    pub fn preconditioner(mut self, preconditioner: Preconditioner) -> Self {
        self.preconditioner = preconditioner;
        self
    }

    /// Pin the monopole to its prior mean, or let the chain resample it.
    pub fn pin_monopole(mut self, pin: bool) -> Self {
        self.pin_monopole = pin;
        self
    }

    /// Toggle cosmic-variance inflation of the prior.
    ///
    /// Enabling keeps an existing sky fraction and placement; from
    /// `Disabled` it switches to full-sky inflation.
    pub fn cosmic_variance(mut self, enabled: bool) -> Self {
        if !enabled {
            self.prior.cosmic_variance = CosmicVariance::Disabled;
        } else if !self.prior.cosmic_variance.is_enabled() {
            self.prior.cosmic_variance = CosmicVariance::full_sky();
        }
        self
    }

    /// Enable cosmic-variance inflation for a partial sky.
    ///
    /// # Panics
    ///
    /// Panics if `f_sky` is not in (0, 1].
    pub fn sky_fraction(mut self, f_sky: f64, placement: SkyFractionPlacement) -> Self {
        assert!(
            f_sky > 0.0 && f_sky <= 1.0,
            "f_sky must be in (0, 1], got {}",
            f_sky
        );
        let fraction = match self.prior.cosmic_variance {
            CosmicVariance::Enabled { fraction, .. } => fraction,
            CosmicVariance::Disabled => DEFAULT_COSMIC_VARIANCE_FRACTION,
        };
        self.prior.cosmic_variance = CosmicVariance::Enabled {
            fraction,
            f_sky,
            placement,
        };
        self
    }

    /// Include the auto-correlation baselines in the data vector.
    pub fn include_autos(mut self, include: bool) -> Self {
        self.radiometer.include_autos = include;
        self
    }

    /// Set the number of nights averaged in the radiometer equation.
    ///
    /// # Panics
    ///
    /// Panics if `n` is 0.
    pub fn n_nights(mut self, n: u32) -> Self {
        assert!(n > 0, "n_nights must be > 0 (got {})", n);
        self.radiometer.n_nights = n;
        self
    }

    /// Set the number of samples per output file.
    ///
    /// # Panics
    ///
    /// Panics if `n` is 0.
    pub fn batch_size(mut self, n: usize) -> Self {
        assert!(n > 0, "batch_size must be > 0 (got {})", n);
        self.batch_size = n;
        self
    }

    /// Check a configuration that did not go through the builders, e.g. one
    /// deserialized from a file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_samples == 0 {
            return Err(ConfigError::Zero("n_samples"));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::Zero("max_iterations"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Zero("batch_size"));
        }
        if self.radiometer.n_nights == 0 {
            return Err(ConfigError::Zero("n_nights"));
        }
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "tolerance",
                value: self.tolerance,
                range: "(0, 1)",
            });
        }

        let positive = [
            ("delta_time", self.radiometer.delta_time),
            ("delta_freq", self.radiometer.delta_freq),
            ("min_std", self.prior.min_std),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::OutOfRange {
                    field,
                    value,
                    range: "(0, ∞)",
                });
            }
        }
        if !(self.prior.fractional_std.is_finite() && self.prior.fractional_std >= 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "fractional_std",
                value: self.prior.fractional_std,
                range: "[0, ∞)",
            });
        }

        if let CosmicVariance::Enabled {
            fraction, f_sky, ..
        } = self.prior.cosmic_variance
        {
            if !(f_sky > 0.0 && f_sky <= 1.0) {
                return Err(ConfigError::OutOfRange {
                    field: "f_sky",
                    value: f_sky,
                    range: "(0, 1]",
                });
            }
            if !(fraction.is_finite() && fraction >= 0.0) {
                return Err(ConfigError::OutOfRange {
                    field: "cosmic variance fraction",
                    value: fraction,
                    range: "[0, ∞)",
                });
            }
        }

        Ok(())
    }

    /// CG solver settings.
    pub fn solver(&self) -> ConjugateGradient {
        ConjugateGradient::new(self.tolerance, self.max_iterations)
            .with_preconditioner(self.preconditioner)
    }

    /// Settings handed to the core chain.
    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig {
            job_id: self.job_id,
            n_samples: self.n_samples,
            solver: self.solver(),
            pin_monopole: self.pin_monopole,
        }
    }
}

/// A configuration value outside its valid range.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A count that must be positive was zero.
    Zero(&'static str),

    /// A real parameter outside its valid range.
    OutOfRange {
        /// Which parameter.
        field: &'static str,
        /// The offending value.
        value: f64,
        /// The valid range, for display.
        range: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Zero(field) => write!(f, "{} must be > 0", field),
            ConfigError::OutOfRange {
                field,
                value,
                range,
            } => write!(f, "{} must be in {}, got {}", field, range, value),
        }
    }
}

impl std::error::Error for ConfigError {}
