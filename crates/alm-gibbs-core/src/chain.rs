//! The two-block Gibbs chain.
//!
//! ```text
//! Init ──► SampleAlms ──► SampleSpectrum ──► UpdatePrior ──┐
//!              ▲                                           │
//!              └─────────────── iteration < n ◄────────────┘ ──► Done
//! ```
//!
//! `Init` solves the Wiener-filter system once to seed the warm start. Each
//! iteration then draws `a | C_ℓ, d` with a GCR solve warm-started from the
//! previous draw, draws `C_ℓ | a`, and rebuilds the signal precision for the
//! next iteration.
//!
//! All randomness is reseeded per iteration from
//! [`stream_seed`](crate::seeds::stream_seed), so [`ChainState`] alone is
//! enough to resume a chain bit-identically.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::constants::DEFAULT_N_SAMPLES;
use crate::covariance::signal_precision;
use crate::error::{check_len, Result};
use crate::gcr::{Fluctuations, GcrSystem};
use crate::indexing::AlmIndex;
use crate::prior::Prior;
use crate::seeds::{stream_seed, Stream};
use crate::solver::{ConjugateGradient, SolveOutcome};
use crate::spectrum::sample_power_spectrum;
use crate::types::Vector;

/// Immutable chain settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainConfig {
    /// Job identifier mixed into every seed.
    pub job_id: u64,
    /// Number of Gibbs iterations after `Init`.
    pub n_samples: usize,
    /// Solver used for the Wiener filter and every alm draw.
    pub solver: ConjugateGradient,
    /// Hold the monopole at the prior mean instead of sampling it.
    ///
    /// When false, a₀₀ is resampled every iteration and only its prior
    /// variance stays fixed.
    pub pin_monopole: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            job_id: 0,
            n_samples: DEFAULT_N_SAMPLES,
            solver: ConjugateGradient::default(),
            pin_monopole: true,
        }
    }
}

/// Convergence diagnostics of one solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveDiagnostics {
    /// CG iterations performed.
    pub iterations: usize,
    /// Whether the tolerance was reached.
    pub converged: bool,
    /// Final relative residual.
    pub relative_residual: f64,
}

impl From<&SolveOutcome> for SolveDiagnostics {
    fn from(outcome: &SolveOutcome) -> Self {
        Self {
            iterations: outcome.iterations,
            converged: outcome.converged,
            relative_residual: outcome.relative_residual,
        }
    }
}

/// Everything needed to continue a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainState {
    /// Number of completed iterations.
    pub iteration: usize,
    /// Latest alm draw (the Wiener filter before the first iteration).
    pub alms: Vector,
    /// Signal precision for the next alm draw.
    pub signal_precision: Vector,
}

/// Chain-level quantities produced once by `Init`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainStart {
    /// Per-component noise precision N⁻¹.
    pub noise_precision: Vector,
    /// Initial signal precision (the prior precision).
    pub prior_precision: Vector,
    /// Wiener-filter solution.
    pub wiener_filter: Vector,
    /// Diagnostics of the Wiener-filter solve.
    pub solve: SolveDiagnostics,
}

/// One completed Gibbs iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct GibbsDraw {
    /// Zero-based iteration number.
    pub iteration: usize,
    /// Realified alm draw.
    pub alms: Vector,
    /// C_ℓ draw for ℓ = 1..=lmax.
    pub cl: Vec<f64>,
    /// σ_ℓ of `alms` for ℓ = 1..=lmax.
    pub sigma_ell: Vec<f64>,
    /// Diagnostics of the alm solve.
    pub solve: SolveDiagnostics,
    /// Seed of the fluctuation draw.
    pub alm_seed: u64,
    /// Seed of the C_ℓ draw.
    pub cl_seed: u64,
}

/// A Gibbs chain over a fixed system and prior.
///
/// Iterating yields `n_samples` draws lazily. After an error the iterator is
/// exhausted.
#[derive(Debug)]
pub struct GibbsChain<'a> {
    system: &'a GcrSystem,
    prior: &'a Prior,
    config: ChainConfig,
    index: AlmIndex,
    state: ChainState,
    failed: bool,
}

impl<'a> GibbsChain<'a> {
    /// Solve the Wiener filter and set up iteration 0.
    pub fn init(
        system: &'a GcrSystem,
        prior: &'a Prior,
        config: ChainConfig,
    ) -> Result<(Self, ChainStart)> {
        check_len("prior", system.n_coeff(), prior.mean().len())?;

        let precision = prior.precision().clone();
        let pin = config.pin_monopole.then(|| prior.monopole());
        let rhs = system.rhs(&precision, prior.mean(), None)?;
        let outcome = system.solve(&precision, pin, &rhs, None, &config.solver)?;

        let start = ChainStart {
            noise_precision: system.noise().precision().clone(),
            prior_precision: precision.clone(),
            wiener_filter: outcome.solution.clone(),
            solve: SolveDiagnostics::from(&outcome),
        };
        let state = ChainState {
            iteration: 0,
            alms: outcome.solution,
            signal_precision: precision,
        };

        Ok((Self::resume(system, prior, config, state)?, start))
    }

    /// Continue a chain from a saved state.
    pub fn resume(
        system: &'a GcrSystem,
        prior: &'a Prior,
        config: ChainConfig,
        state: ChainState,
    ) -> Result<Self> {
        check_len("prior", system.n_coeff(), prior.mean().len())?;
        check_len("chain state alms", system.n_coeff(), state.alms.len())?;
        check_len(
            "chain state signal precision",
            system.n_coeff(),
            state.signal_precision.len(),
        )?;

        Ok(Self {
            system,
            prior,
            index: *prior.index(),
            config,
            state,
            failed: false,
        })
    }

    /// Current state.
    pub fn state(&self) -> &ChainState {
        &self.state
    }

    /// Consume the chain, keeping its state.
    pub fn into_state(self) -> ChainState {
        self.state
    }

    /// Chain settings.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Whether `n_samples` iterations have completed.
    pub fn is_done(&self) -> bool {
        self.state.iteration >= self.config.n_samples
    }

    /// Run one iteration: alm draw, C_ℓ draw, precision update.
    pub fn step(&mut self) -> Result<GibbsDraw> {
        let iteration = self.state.iteration;
        let job_id = self.config.job_id;
        let pin = self.config.pin_monopole.then(|| self.prior.monopole());

        // SampleAlms
        let alm_seed = stream_seed(job_id, iteration as u64, Stream::Alms);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(alm_seed);
        let fluctuations =
            Fluctuations::draw(&mut rng, self.system.n_coeff(), self.system.n_vis());
        let rhs = self.system.rhs(
            &self.state.signal_precision,
            self.prior.mean(),
            Some(&fluctuations),
        )?;
        let outcome = self.system.solve(
            &self.state.signal_precision,
            pin,
            &rhs,
            Some(&self.state.alms),
            &self.config.solver,
        )?;

        // SampleSpectrum
        let cl_seed = stream_seed(job_id, iteration as u64, Stream::Spectrum);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(cl_seed);
        let spectrum = sample_power_spectrum(outcome.solution.as_slice(), &self.index, &mut rng)?;

        // UpdatePrior
        let next_precision = signal_precision(self.prior.variance(), &spectrum.cl, &self.index)?;

        let solve = SolveDiagnostics::from(&outcome);
        self.state = ChainState {
            iteration: iteration + 1,
            alms: outcome.solution.clone(),
            signal_precision: next_precision,
        };

        Ok(GibbsDraw {
            iteration,
            alms: outcome.solution,
            cl: spectrum.cl,
            sigma_ell: spectrum.sigma_ell,
            solve,
            alm_seed,
            cl_seed,
        })
    }
}

impl Iterator for GibbsChain<'_> {
    type Item = Result<GibbsDraw>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.is_done() {
            return None;
        }
        let draw = self.step();
        self.failed = draw.is_err();
        Some(draw)
    }
}
