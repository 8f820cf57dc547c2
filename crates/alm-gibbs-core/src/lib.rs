//! Core linear algebra and sampling for alm / C_ℓ Gibbs sampling.
//!
//! This crate draws joint posterior samples of a sky's realified
//! spherical-harmonic coefficients (alms) and its angular power spectrum
//! from interferometric visibilities, using a two-block Gibbs sampler:
//!
//! ```text
//! a | C_ℓ, d ~ N(μ, (RᵗN⁻¹R + S⁻¹)⁻¹)        (GCR solve, conjugate gradient)
//! C_ℓ | a    ~ σ_ℓ (2ℓ+1)/2 · InvGamma((2ℓ-1)/2, 1)
//! ```
//!
//! The crate is pure computation: it performs no I/O, does not log and never
//! reads the wall clock. Time measurement, logging and persistence are left to
//! the caller (see the `alm-gibbs` crate).
//!
//! # Features
//!
//! - `parallel`: Precompute the noise-weighted Gram blocks on rayon
//! - `serde`: Derive `Serialize`/`Deserialize` for configuration types
//!
//! # Usage
//!
//! ```ignore
//! use alm_gibbs_core::{
//!     chain::{ChainConfig, GibbsChain},
//!     gcr::GcrSystem,
//!     noise::{NoiseModel, RadiometerParams},
//!     prior::{Prior, PriorConfig},
//! };
//!
//! let noise = NoiseModel::from_radiometer(&autos, n_ants, &RadiometerParams::default())?;
//! let prior = Prior::from_true_sky(&true_sky, &PriorConfig::default(), prior_seed)?;
//! let system = GcrSystem::new(response, noise, data)?;
//! let (chain, start) = GibbsChain::init(&system, &prior, ChainConfig::default())?;
//! for draw in chain {
//!     let draw = draw?;
//!     println!("{} {:?}", draw.iteration, draw.cl);
//! }
//! ```

pub mod chain;
pub mod constants;
pub mod covariance;
pub mod error;
pub mod gcr;
pub mod indexing;
pub mod noise;
pub mod prior;
pub mod seeds;
pub mod solver;
pub mod spectrum;
pub mod types;
pub mod visibility;

// Re-export commonly used items at crate root
pub use chain::{ChainConfig, ChainStart, ChainState, GibbsChain, GibbsDraw, SolveDiagnostics};
pub use error::{GibbsError, Result};
pub use gcr::{Fluctuations, GcrOperator, GcrSystem};
pub use indexing::{AlmIndex, AlmMode, Part};
pub use noise::{NoiseModel, RadiometerParams};
pub use prior::{CosmicVariance, Prior, PriorConfig, SkyFractionPlacement};
pub use solver::{ConjugateGradient, LinearOperator, Preconditioner, SolveOutcome};
pub use spectrum::SpectrumDraw;
pub use types::{Matrix, Vector};
pub use visibility::{ResponseOperator, VisibilityData};
