//! # alm-gibbs
//!
//! Gibbs sampling of a sky's spherical-harmonic coefficients (alms) and its
//! angular power spectrum C_ℓ from interferometric visibilities.
//!
//! The numerical core lives in [`alm_gibbs_core`]; this crate wraps it with
//! what a run needs around it:
//!
//! - [`Config`]: validated, serializable chain configuration
//! - [`Problem`]: the response operators and reference sky, as JSON
//! - [`prepare`] and [`Sampler`]: noise model, prior and system setup, then
//!   an iterator of timed and logged [`SampleRecord`]s
//! - [`output`]: JSON-lines sample files with rollover, `Init` artifacts and
//!   the chain summary
//!
//! ## Quick Start
//!
//! ```ignore
//! use alm_gibbs::{output::SampleWriter, prepare, Config, Problem, Sampler};
//!
//! let config = Config::quick().job_id(1).cosmic_variance(true);
//! let problem = Problem::synthetic(4, 5, 8, &config.radiometer, 7);
//! let prepared = prepare(&problem, &config)?;
//!
//! let (sampler, artifacts) = Sampler::start(&prepared, &config)?;
//! alm_gibbs::output::write_artifacts(out_dir, &artifacts)?;
//!
//! let mut writer = SampleWriter::new(out_dir, config.data_seed, config.job_id, config.batch_size)?;
//! for record in sampler {
//!     writer.write(&record?)?;
//! }
//! writer.finish()?;
//! ```
//!
//! Logging goes through `tracing`; install a subscriber (the `alm-gibbs`
//! binary uses `tracing-subscriber` with `RUST_LOG`) to see it.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod problem;
mod sampler;

pub mod output;

pub use config::{Config, ConfigError, DEFAULT_BATCH_SIZE};
pub use error::SamplerError;
pub use problem::{ObservedData, Problem, ResponseBlocks};
pub use sampler::{
    prepare, ChainArtifacts, ChainSummary, Prepared, SampleRecord, Sampler, SolveSummary,
};

// Re-export the core types a caller needs to configure a run.
pub use alm_gibbs_core::{
    CosmicVariance, GibbsError, Preconditioner, PriorConfig, RadiometerParams,
    SkyFractionPlacement,
};
