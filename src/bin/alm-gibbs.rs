//! Run one alm / C_ℓ Gibbs chain and write its samples to disk.
//!
//! # Usage
//!
//! ```bash
//! # Synthetic smoke run: lmax 8, 6 antennas, 10 time samples
//! alm-gibbs --dir ./chain -n 50
//!
//! # Externally simulated problem with cosmic variance and a given job id
//! alm-gibbs --problem hera19.json --dir ./chain --job-id 3 --cosmic-variance true
//!
//! # Continue an interrupted chain
//! alm-gibbs --problem hera19.json --dir ./chain --job-id 3 --resume
//! ```
//!
//! Logging is controlled by `RUST_LOG` (default `alm_gibbs=info`).

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use alm_gibbs::output::{read_samples, write_artifacts, write_summary, SampleWriter};
use alm_gibbs::{prepare, Config, Preconditioner, Problem, SamplerError, Sampler};

/// Gibbs sampler for sky alms and angular power spectra
#[derive(Parser, Debug)]
#[command(name = "alm-gibbs")]
#[command(about = "Draw joint posterior samples of sky alms and C_ℓ from visibilities")]
#[command(version)]
struct Args {
    /// Problem file (JSON). A synthetic problem is generated when omitted.
    #[arg(short, long)]
    problem: Option<PathBuf>,

    /// Configuration file (JSON); flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Seed of the data noise realisation
    #[arg(long)]
    data_seed: Option<u64>,

    /// Seed of the prior mean
    #[arg(long)]
    prior_seed: Option<u64>,

    /// Job id; independent chains on the same data use different ids
    #[arg(short, long)]
    job_id: Option<u64>,

    /// Relative tolerance of the conjugate-gradient solves
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// Number of Gibbs samples
    #[arg(short, long)]
    n_samples: Option<usize>,

    /// Iteration cap of each conjugate-gradient solve
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Samples per output file
    #[arg(long)]
    batch_size: Option<usize>,

    /// Inflate the prior variance with a cosmic-variance term (true/false,
    /// yes/no, t/f, y/n, 1/0)
    #[arg(long, value_parser = parse_switch)]
    cosmic_variance: Option<bool>,

    /// Include auto-correlation baselines in the data vector
    #[arg(long, value_parser = parse_switch)]
    include_autos: Option<bool>,

    /// Hold the monopole at its prior mean instead of sampling it
    /// [default: true]
    #[arg(long, value_parser = parse_switch)]
    pin_monopole: Option<bool>,

    /// Use a Jacobi preconditioner in the conjugate-gradient solves
    #[arg(long)]
    jacobi: bool,

    /// Continue after the last sample found in the output directory
    #[arg(long)]
    resume: bool,

    /// Maximum degree of the synthetic problem
    #[arg(long, default_value_t = 8)]
    lmax: usize,

    /// Number of antennas of the synthetic problem
    #[arg(long, default_value_t = 6)]
    antennas: usize,

    /// Number of time samples of the synthetic problem
    #[arg(long, default_value_t = 10)]
    times: usize,

    /// Seed of the synthetic problem
    #[arg(long, default_value_t = 1)]
    synthetic_seed: u64,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Log every sample
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.quiet {
        "warn"
    } else if args.verbose {
        "alm_gibbs=debug"
    } else {
        "alm_gibbs=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// Parse an on/off switch the way the shell scripts driving the sampler
/// spell it.
fn parse_switch(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        other => Err(format!("expected true/false, yes/no or 1/0, got '{}'", other)),
    }
}

fn load_config(args: &Args) -> Result<Config, SamplerError> {
    let mut config: Config = match &args.config {
        Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        None => Config::default(),
    };

    // Assigned directly: `prepare` validates, and a bad flag should be an
    // error message rather than a builder panic.
    if let Some(seed) = args.data_seed {
        config.data_seed = seed;
    }
    if let Some(seed) = args.prior_seed {
        config.prior_seed = seed;
    }
    if let Some(job_id) = args.job_id {
        config.job_id = job_id;
    }
    if let Some(tolerance) = args.tolerance {
        config.tolerance = tolerance;
    }
    if let Some(n) = args.n_samples {
        config.n_samples = n;
    }
    if let Some(n) = args.max_iterations {
        config.max_iterations = n;
    }
    if let Some(n) = args.batch_size {
        config.batch_size = n;
    }
    if let Some(enabled) = args.cosmic_variance {
        config = config.cosmic_variance(enabled);
    }
    if let Some(include) = args.include_autos {
        config = config.include_autos(include);
    }
    if let Some(pin) = args.pin_monopole {
        config.pin_monopole = pin;
    }
    if args.jacobi {
        config.preconditioner = Preconditioner::Jacobi;
    }

    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<(), SamplerError> {
    let config = load_config(args)?;

    let problem = match &args.problem {
        Some(path) => Problem::load(path)?,
        None => {
            tracing::info!(
                lmax = args.lmax,
                antennas = args.antennas,
                times = args.times,
                seed = args.synthetic_seed,
                "no problem file given; generating a synthetic problem"
            );
            Problem::synthetic(
                args.lmax,
                args.antennas,
                args.times,
                &config.radiometer,
                args.synthetic_seed,
            )
        }
    };

    let prepared = prepare(&problem, &config)?;

    let mut sampler = if args.resume {
        let records = read_samples(&args.dir, config.data_seed, config.job_id)?;
        if records.is_empty() {
            return Err(SamplerError::NothingToResume {
                dir: args.dir.clone(),
            });
        }
        Sampler::resume_with_history(&prepared, &config, &records)?
    } else {
        let (sampler, artifacts) = Sampler::start(&prepared, &config)?;
        let path = write_artifacts(&args.dir, &artifacts)?;
        tracing::info!(path = %path.display(), "wrote chain artifacts");
        sampler
    };

    let remaining = config.n_samples.saturating_sub(sampler.next_iteration());
    let mut writer = SampleWriter::new(&args.dir, config.data_seed, config.job_id, config.batch_size)?;

    let progress_bar = ProgressBar::new(remaining as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} | {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    if args.quiet {
        progress_bar.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    for record in sampler.by_ref() {
        let record = record?;
        writer.write(&record)?;
        progress_bar.inc(1);
        let c1 = record
            .cl
            .first()
            .map_or_else(String::new, |c| format!("C_1 = {:.3e} | ", c));
        progress_bar.set_message(format!("{}CG {} its", c1, record.solver_iterations));
    }
    progress_bar.finish_and_clear();

    let files = writer.finish()?;
    let summary = sampler.summary();
    let summary_path = write_summary(&args.dir, config.data_seed, config.job_id, summary)?;

    tracing::info!(
        samples = summary.n_samples,
        files = files.len(),
        mean_cg_iterations = summary.mean_solver_iterations,
        non_converged = summary.non_converged,
        max_consecutive_failures = summary.max_consecutive_failures,
        mean_wall_time_secs = summary.mean_wall_time_secs,
        summary = %summary_path.display(),
        "chain finished"
    );
    Ok(())
}
