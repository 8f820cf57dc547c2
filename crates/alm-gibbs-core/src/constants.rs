//! Constants and defaults used throughout the crate.

/// Slot of the ℓ=0, m=0 coefficient in a realified alm vector.
pub const MONOPOLE_SLOT: usize = 0;

/// Default relative tolerance for the conjugate-gradient solve.
///
/// Matches the SciPy `cg` default the sampler was first calibrated against.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// Default iteration cap for the conjugate-gradient solve.
pub const DEFAULT_MAX_ITERATIONS: usize = 15_000;

/// Default number of Gibbs samples per chain.
pub const DEFAULT_N_SAMPLES: usize = 100;

/// Default maximum spherical-harmonic degree.
pub const DEFAULT_LMAX: usize = 20;

/// Default seed for the mock-data noise realisation.
pub const DEFAULT_DATA_SEED: u64 = 10;

/// Default seed for the prior-mean draw.
pub const DEFAULT_PRIOR_SEED: u64 = 20;

// =============================================================================
// Prior construction
// =============================================================================

/// Prior standard deviation as a fraction of the true-sky coefficient.
pub const DEFAULT_PRIOR_FRACTION: f64 = 0.1;

/// Floor on the prior standard deviation of any coefficient.
pub const DEFAULT_MIN_PRIOR_STD: f64 = 0.5;

/// Prefactor of the cosmic-variance inflation term.
pub const DEFAULT_COSMIC_VARIANCE_FRACTION: f64 = 0.1;

// =============================================================================
// Radiometer equation
// =============================================================================

/// Default correlator integration time in seconds.
pub const DEFAULT_DELTA_TIME: f64 = 60.0;

/// Default channel width in Hz.
pub const DEFAULT_DELTA_FREQ: f64 = 1e6;

/// Share of the complex radiometer variance carried by each of the real and
/// imaginary visibility components.
pub const COMPONENT_VARIANCE_SHARE: f64 = 0.5;
