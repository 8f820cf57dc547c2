//! Chain driver: problem setup, timing, logging and resumption around the
//! core [`GibbsChain`].
//!
//! # Example
//!
//! ```ignore
//! use alm_gibbs::{prepare, Config, Problem, Sampler};
//!
//! let problem = Problem::load(path)?;
//! let config = Config::quick().job_id(3);
//! let prepared = prepare(&problem, &config)?;
//! let (sampler, artifacts) = Sampler::start(&prepared, &config)?;
//! for record in sampler {
//!     let record = record?;
//!     println!("{} {:?}", record.iteration, record.cl);
//! }
//! ```

use std::time::Instant;

use serde::{Deserialize, Serialize};

use alm_gibbs_core::covariance::signal_precision;
use alm_gibbs_core::{
    AlmIndex, ChainState, GcrSystem, GibbsChain, GibbsDraw, NoiseModel, Prior, SolveDiagnostics,
    Vector, VisibilityData,
};

use crate::config::Config;
use crate::error::SamplerError;
use crate::problem::{Problem, ResponseBlocks};

/// Chain inputs derived once from a problem and a configuration.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// Alm index of the problem.
    pub index: AlmIndex,
    /// Reference sky.
    pub true_sky: Vector,
    /// Prior built around the reference sky.
    pub prior: Prior,
    /// Linear system with precomputed Gram matrix.
    pub system: GcrSystem,
    /// Wall time spent in [`prepare`], in seconds.
    pub precompute_secs: f64,
}

/// Build the noise model, data, prior and linear system for a chain.
///
/// Data come from the problem when present, otherwise they are simulated
/// with `config.data_seed`.
pub fn prepare(problem: &Problem, config: &Config) -> Result<Prepared, SamplerError> {
    let start = Instant::now();
    config.validate()?;
    problem.validate()?;

    let index = problem.index();
    let true_sky = problem.true_sky();
    let response = problem.response.to_operator()?;
    let autos = problem.auto_response.to_operator()?.apply(&true_sky)?;
    let noise = NoiseModel::from_radiometer(&autos, problem.n_antennas, &config.radiometer)?;
    tracing::debug!(
        n_vis = noise.len(),
        include_autos = config.radiometer.include_autos,
        "radiometer noise model built"
    );

    let data = match problem.observed()? {
        Some(data) => data,
        None => {
            tracing::debug!(data_seed = config.data_seed, "simulating observation");
            VisibilityData::simulate(&response, &true_sky, &noise, config.data_seed)?
        }
    };

    let prior = Prior::from_true_sky(&true_sky, &config.prior, config.prior_seed)?;
    let system = GcrSystem::new(response, noise, data)?;
    let precompute_secs = start.elapsed().as_secs_f64();

    tracing::info!(
        lmax = index.lmax(),
        n_coeff = system.n_coeff(),
        n_vis = system.n_vis(),
        cosmic_variance = config.prior.cosmic_variance.is_enabled(),
        precompute_secs,
        "precomputation finished"
    );

    Ok(Prepared {
        index,
        true_sky,
        prior,
        system,
        precompute_secs,
    })
}

/// One persisted Gibbs iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Zero-based iteration number.
    pub iteration: usize,
    /// Realified alm draw.
    pub alms: Vec<f64>,
    /// C_ℓ draw for ℓ = 1..=lmax.
    pub cl: Vec<f64>,
    /// σ_ℓ of the alm draw for ℓ = 1..=lmax.
    pub sigma_ell: Vec<f64>,
    /// CG iterations of the alm solve.
    pub solver_iterations: usize,
    /// Whether the alm solve reached its tolerance.
    pub solver_converged: bool,
    /// Final relative residual of the alm solve.
    pub relative_residual: f64,
    /// Seed of the fluctuation draw.
    pub alm_seed: u64,
    /// Seed of the C_ℓ draw.
    pub cl_seed: u64,
    /// Wall time of the iteration, in seconds.
    pub wall_time_secs: f64,
}

impl SampleRecord {
    fn from_draw(draw: GibbsDraw, wall_time_secs: f64) -> Self {
        Self {
            iteration: draw.iteration,
            alms: draw.alms.as_slice().to_vec(),
            cl: draw.cl,
            sigma_ell: draw.sigma_ell,
            solver_iterations: draw.solve.iterations,
            solver_converged: draw.solve.converged,
            relative_residual: draw.solve.relative_residual,
            alm_seed: draw.alm_seed,
            cl_seed: draw.cl_seed,
            wall_time_secs,
        }
    }
}

/// Convergence of a single solve, as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveSummary {
    /// CG iterations.
    pub iterations: usize,
    /// Whether the tolerance was reached.
    pub converged: bool,
    /// Final relative residual.
    pub relative_residual: f64,
}

impl From<SolveDiagnostics> for SolveSummary {
    fn from(d: SolveDiagnostics) -> Self {
        Self {
            iterations: d.iterations,
            converged: d.converged,
            relative_residual: d.relative_residual,
        }
    }
}

/// Chain-level quantities, written once before the first sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainArtifacts {
    /// Maximum degree.
    pub lmax: usize,
    /// Configuration the chain ran with.
    pub config: Config,
    /// Sky-to-visibility response.
    pub response_operator: ResponseBlocks,
    /// Reference sky.
    pub true_sky: Vec<f64>,
    /// Per-component noise precision N⁻¹.
    pub noise_precision: Vec<f64>,
    /// Prior mean a₀.
    pub prior_mean: Vec<f64>,
    /// Prior precision (initial signal precision).
    pub prior_precision: Vec<f64>,
    /// Wiener-filter solution.
    pub wiener_filter: Vec<f64>,
    /// Wiener-filter solve diagnostics.
    pub wiener_solve: SolveSummary,
    /// Precomputation wall time, in seconds.
    pub precompute_secs: f64,
}

/// Running diagnostics over the samples produced so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    /// Samples observed.
    pub n_samples: usize,
    /// Mean CG iterations per sample.
    pub mean_solver_iterations: f64,
    /// Samples whose solve did not converge.
    pub non_converged: usize,
    /// Longest run of consecutive non-converged solves.
    pub max_consecutive_failures: usize,
    /// Running posterior mean of C_ℓ for ℓ = 1..=lmax.
    pub mean_cl: Vec<f64>,
    /// Mean wall time per sample, in seconds.
    pub mean_wall_time_secs: f64,
    /// Total wall time of the samples, in seconds.
    pub total_wall_time_secs: f64,
}

impl ChainSummary {
    /// Fold one record into the running statistics.
    pub fn observe(&mut self, record: &SampleRecord, consecutive_failures: usize) {
        self.n_samples += 1;
        let n = self.n_samples as f64;

        self.mean_solver_iterations +=
            (record.solver_iterations as f64 - self.mean_solver_iterations) / n;
        if !record.solver_converged {
            self.non_converged += 1;
        }
        self.max_consecutive_failures = self.max_consecutive_failures.max(consecutive_failures);

        if self.mean_cl.is_empty() {
            self.mean_cl = vec![0.0; record.cl.len()];
        }
        for (mean, &c) in self.mean_cl.iter_mut().zip(record.cl.iter()) {
            *mean += (c - *mean) / n;
        }

        self.total_wall_time_secs += record.wall_time_secs;
        self.mean_wall_time_secs = self.total_wall_time_secs / n;
    }
}

/// Iterator over timed, logged sample records.
///
/// Solver non-convergence is logged and counted; the sample is kept.
pub struct Sampler<'a> {
    chain: GibbsChain<'a>,
    consecutive_failures: usize,
    summary: ChainSummary,
}

impl<'a> Sampler<'a> {
    /// Run `Init` and return the sampler with the chain artifacts.
    pub fn start(
        prepared: &'a Prepared,
        config: &Config,
    ) -> Result<(Self, ChainArtifacts), SamplerError> {
        let (chain, start) =
            GibbsChain::init(&prepared.system, &prepared.prior, config.chain_config())?;

        if start.solve.converged {
            tracing::info!(
                iterations = start.solve.iterations,
                relative_residual = start.solve.relative_residual,
                "Wiener filter solved"
            );
        } else {
            tracing::warn!(
                iterations = start.solve.iterations,
                relative_residual = start.solve.relative_residual,
                "Wiener filter did not converge; using it as the warm start anyway"
            );
        }

        let artifacts = ChainArtifacts {
            lmax: prepared.index.lmax(),
            config: config.clone(),
            response_operator: ResponseBlocks::from_operator(prepared.system.response()),
            true_sky: prepared.true_sky.as_slice().to_vec(),
            noise_precision: start.noise_precision.as_slice().to_vec(),
            prior_mean: prepared.prior.mean().as_slice().to_vec(),
            prior_precision: start.prior_precision.as_slice().to_vec(),
            wiener_filter: start.wiener_filter.as_slice().to_vec(),
            wiener_solve: start.solve.into(),
            precompute_secs: prepared.precompute_secs,
        };

        Ok((Self::from_chain(chain), artifacts))
    }

    /// Continue after `last`, the most recent persisted record.
    ///
    /// The signal precision is rebuilt from the record's C_ℓ, so the resumed
    /// chain continues bit-identically.
    pub fn resume(
        prepared: &'a Prepared,
        config: &Config,
        last: &SampleRecord,
    ) -> Result<Self, SamplerError> {
        let precision = signal_precision(prepared.prior.variance(), &last.cl, &prepared.index)?;
        let state = ChainState {
            iteration: last.iteration + 1,
            alms: Vector::from_column_slice(&last.alms),
            signal_precision: precision,
        };
        let chain = GibbsChain::resume(
            &prepared.system,
            &prepared.prior,
            config.chain_config(),
            state,
        )?;

        tracing::info!(
            next_iteration = last.iteration + 1,
            n_samples = config.n_samples,
            "resuming chain"
        );
        Ok(Self::from_chain(chain))
    }

    /// Continue after the last record of `history`, the chain's persisted
    /// records in iteration order.
    ///
    /// The summary and the run of consecutive non-converged solves are
    /// rebuilt from `history`, so they cover the whole chain rather than
    /// only the resumed part.
    pub fn resume_with_history(
        prepared: &'a Prepared,
        config: &Config,
        history: &[SampleRecord],
    ) -> Result<Self, SamplerError> {
        let last = history.last().ok_or(SamplerError::EmptyHistory)?;
        let mut sampler = Self::resume(prepared, config, last)?;

        for record in history {
            if record.solver_converged {
                sampler.consecutive_failures = 0;
            } else {
                sampler.consecutive_failures += 1;
            }
            sampler
                .summary
                .observe(record, sampler.consecutive_failures);
        }
        tracing::debug!(
            records = history.len(),
            consecutive_failures = sampler.consecutive_failures,
            "summary rebuilt from persisted samples"
        );
        Ok(sampler)
    }

    fn from_chain(chain: GibbsChain<'a>) -> Self {
        Self {
            chain,
            consecutive_failures: 0,
            summary: ChainSummary::default(),
        }
    }

    /// Next iteration number.
    pub fn next_iteration(&self) -> usize {
        self.chain.state().iteration
    }

    /// Statistics over the records yielded so far.
    pub fn summary(&self) -> &ChainSummary {
        &self.summary
    }

    /// Consecutive non-converged solves up to the latest record.
    pub fn consecutive_failures(&self) -> usize {
        self.consecutive_failures
    }
}

impl Iterator for Sampler<'_> {
    type Item = Result<SampleRecord, SamplerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let started = Instant::now();
        let draw = match self.chain.next()? {
            Ok(draw) => draw,
            Err(e) => {
                tracing::error!(
                    iteration = self.chain.state().iteration,
                    error = %e,
                    "chain aborted"
                );
                return Some(Err(e.into()));
            }
        };
        let record = SampleRecord::from_draw(draw, started.elapsed().as_secs_f64());

        if record.solver_converged {
            self.consecutive_failures = 0;
            tracing::debug!(
                iteration = record.iteration,
                cg_iterations = record.solver_iterations,
                wall_time_secs = record.wall_time_secs,
                "sample drawn"
            );
        } else {
            self.consecutive_failures += 1;
            tracing::warn!(
                iteration = record.iteration,
                cg_iterations = record.solver_iterations,
                relative_residual = record.relative_residual,
                consecutive = self.consecutive_failures,
                "CG did not converge; keeping the sample"
            );
        }

        self.summary.observe(&record, self.consecutive_failures);
        Some(Ok(record))
    }
}
