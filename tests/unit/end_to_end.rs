//! Short chains on small synthetic problems.

use alm_gibbs::output::{read_samples, SampleWriter};
use alm_gibbs::{prepare, Config, Preconditioner, Problem, SampleRecord, Sampler};

const LMAX: usize = 3;

fn problem(config: &Config) -> Problem {
    Problem::synthetic(LMAX, 5, 6, &config.radiometer, 3)
}

fn run(config: &Config) -> Vec<SampleRecord> {
    let prepared = prepare(&problem(config), config).unwrap();
    let (sampler, _) = Sampler::start(&prepared, config).unwrap();
    sampler.collect::<Result<Vec<_>, _>>().unwrap()
}

/// Everything but the wall time.
fn same_draw(a: &SampleRecord, b: &SampleRecord) -> bool {
    a.iteration == b.iteration
        && a.alms == b.alms
        && a.cl == b.cl
        && a.sigma_ell == b.sigma_ell
        && a.solver_iterations == b.solver_iterations
        && a.alm_seed == b.alm_seed
        && a.cl_seed == b.cl_seed
}

#[test]
fn chain_yields_requested_samples() {
    let config = Config::quick().n_samples(6);
    let records = run(&config);

    assert_eq!(records.len(), 6);
    let n_coeff = (LMAX + 1) * (LMAX + 1);
    for (i, r) in records.iter().enumerate() {
        assert_eq!(r.iteration, i);
        assert_eq!(r.alms.len(), n_coeff);
        assert_eq!(r.cl.len(), LMAX);
        assert_eq!(r.sigma_ell.len(), LMAX);
        assert!(r.cl.iter().all(|c| c.is_finite() && *c > 0.0));
        assert!(r.alms.iter().all(|a| a.is_finite()));
        assert!(r.wall_time_secs >= 0.0);
    }
}

#[test]
fn chain_is_reproducible() {
    let config = Config::quick().n_samples(4).job_id(2);
    let a = run(&config);
    let b = run(&config);
    assert!(a.iter().zip(b.iter()).all(|(x, y)| same_draw(x, y)));
}

#[test]
fn job_id_changes_the_chain() {
    let a = run(&Config::quick().n_samples(2).job_id(0));
    let b = run(&Config::quick().n_samples(2).job_id(1));
    assert_ne!(a[0].alm_seed, b[0].alm_seed);
    assert_ne!(a[0].alms, b[0].alms);
}

#[test]
fn wiener_filter_converges() {
    let config = Config::quick();
    let prepared = prepare(&problem(&config), &config).unwrap();
    let (_, artifacts) = Sampler::start(&prepared, &config).unwrap();

    assert!(artifacts.wiener_solve.converged);
    assert!(artifacts.wiener_solve.relative_residual <= config.tolerance);
    assert_eq!(artifacts.prior_precision.len(), (LMAX + 1) * (LMAX + 1));
    assert!(artifacts.precompute_secs >= 0.0);
}

#[test]
fn pinned_monopole_never_moves() {
    let config = Config::quick().n_samples(5).pin_monopole(true);
    let prepared = prepare(&problem(&config), &config).unwrap();
    let monopole = prepared.prior.monopole();

    let (sampler, artifacts) = Sampler::start(&prepared, &config).unwrap();
    assert_eq!(artifacts.wiener_filter[0], monopole);
    for record in sampler {
        assert_eq!(record.unwrap().alms[0], monopole);
    }
}

#[test]
fn default_chain_keeps_degree_zero_fixed() {
    let config = Config::quick().n_samples(4);
    assert!(config.pin_monopole);
    let records = run(&config);
    let prepared = prepare(&problem(&config), &config).unwrap();
    assert!(records.iter().all(|r| r.alms[0] == prepared.prior.monopole()));
}

#[test]
fn unpinned_chain_resamples_monopole() {
    let records = run(&Config::quick().n_samples(3).pin_monopole(false));
    assert_ne!(records[0].alms[0], records[1].alms[0]);
    assert_ne!(records[1].alms[0], records[2].alms[0]);
}

#[test]
fn jacobi_and_plain_agree() {
    let plain = run(&Config::quick().n_samples(2).tolerance(1e-10));
    let jacobi = run(
        &Config::quick()
            .n_samples(2)
            .tolerance(1e-10)
            .preconditioner(Preconditioner::Jacobi),
    );
    for (p, j) in plain.iter().zip(jacobi.iter()) {
        let scale = p.alms.iter().fold(0.0_f64, |m, a| m.max(a.abs()));
        for (a, b) in p.alms.iter().zip(j.alms.iter()) {
            assert!((a - b).abs() <= 1e-6 * scale, "{} vs {}", a, b);
        }
    }
}

#[test]
fn summary_tracks_samples() {
    let config = Config::quick().n_samples(4);
    let prepared = prepare(&problem(&config), &config).unwrap();
    let (mut sampler, _) = Sampler::start(&prepared, &config).unwrap();

    let records: Vec<_> = sampler.by_ref().map(Result::unwrap).collect();
    let summary = sampler.summary();
    assert_eq!(summary.n_samples, 4);
    assert_eq!(summary.mean_cl.len(), LMAX);

    let mean_c1 = records.iter().map(|r| r.cl[0]).sum::<f64>() / 4.0;
    assert!((summary.mean_cl[0] - mean_c1).abs() <= 1e-12 * mean_c1.abs().max(1.0));
    assert_eq!(sampler.next_iteration(), 4);
}

#[test]
fn resume_continues_identically() {
    let config = Config::quick().n_samples(6).job_id(5);
    let full = run(&config);

    let prepared = prepare(&problem(&config), &config).unwrap();
    let (mut first, _) = Sampler::start(&prepared, &config).unwrap();
    let head: Vec<_> = first.by_ref().take(3).map(Result::unwrap).collect();

    let resumed = Sampler::resume(&prepared, &config, &head[2]).unwrap();
    assert_eq!(resumed.next_iteration(), 3);
    let tail: Vec<_> = resumed.map(Result::unwrap).collect();

    assert_eq!(tail.len(), 3);
    for (a, b) in full[3..].iter().zip(tail.iter()) {
        assert!(same_draw(a, b));
    }
}

#[test]
fn resumed_summary_covers_whole_chain() {
    let config = Config::quick().n_samples(6).job_id(1);
    let prepared = prepare(&problem(&config), &config).unwrap();

    let (mut full, _) = Sampler::start(&prepared, &config).unwrap();
    full.by_ref().for_each(|r| {
        r.unwrap();
    });
    let expected = full.summary().clone();

    let (mut first, _) = Sampler::start(&prepared, &config).unwrap();
    let head: Vec<_> = first.by_ref().take(3).map(Result::unwrap).collect();

    let mut resumed = Sampler::resume_with_history(&prepared, &config, &head).unwrap();
    assert_eq!(resumed.summary().n_samples, 3);
    resumed.by_ref().for_each(|r| {
        r.unwrap();
    });

    let summary = resumed.summary();
    assert_eq!(summary.n_samples, expected.n_samples);
    assert_eq!(summary.mean_cl, expected.mean_cl);
    assert_eq!(summary.mean_solver_iterations, expected.mean_solver_iterations);
    assert_eq!(summary.non_converged, expected.non_converged);
}

#[test]
fn resume_of_finished_chain_keeps_summary() {
    let config = Config::quick().n_samples(4);
    let records = run(&config);
    let prepared = prepare(&problem(&config), &config).unwrap();

    let mut resumed = Sampler::resume_with_history(&prepared, &config, &records).unwrap();
    assert!(resumed.next().is_none());
    assert_eq!(resumed.summary().n_samples, 4);
    assert_eq!(resumed.summary().mean_cl.len(), LMAX);
}

#[test]
fn resume_carries_trailing_failures() {
    let config = Config::quick().n_samples(6);
    let prepared = prepare(&problem(&config), &config).unwrap();
    let mut records = run(&config);
    records.truncate(4);
    records[1].solver_converged = false;
    records[2].solver_converged = false;
    records[3].solver_converged = false;

    let sampler = Sampler::resume_with_history(&prepared, &config, &records).unwrap();
    assert_eq!(sampler.consecutive_failures(), 3);
    assert_eq!(sampler.summary().non_converged, 3);
    assert_eq!(sampler.summary().max_consecutive_failures, 3);
}

#[test]
fn resume_needs_history() {
    let config = Config::quick();
    let prepared = prepare(&problem(&config), &config).unwrap();
    assert!(matches!(
        Sampler::resume_with_history(&prepared, &config, &[]),
        Err(alm_gibbs::SamplerError::EmptyHistory)
    ));
}

#[test]
fn resume_from_disk_continues_identically() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::quick().n_samples(5).batch_size(2);
    let full = run(&config);

    let prepared = prepare(&problem(&config), &config).unwrap();
    let (mut sampler, _) = Sampler::start(&prepared, &config).unwrap();
    let mut writer =
        SampleWriter::new(dir.path(), config.data_seed, config.job_id, config.batch_size).unwrap();
    for record in sampler.by_ref().take(3) {
        writer.write(&record.unwrap()).unwrap();
    }
    writer.finish().unwrap();

    let saved = read_samples(dir.path(), config.data_seed, config.job_id).unwrap();
    assert_eq!(saved.len(), 3);
    let last = saved.last().unwrap();

    let resumed = Sampler::resume(&prepared, &config, last).unwrap();
    let tail: Vec<_> = resumed.map(Result::unwrap).collect();
    assert_eq!(tail.len(), 2);
    assert!(same_draw(&full[3], &tail[0]));
    assert!(same_draw(&full[4], &tail[1]));
}

#[test]
fn supplied_data_skips_simulation() {
    let config = Config::quick().n_samples(2);
    let mut with_data = problem(&config);
    let prepared = prepare(&with_data, &config).unwrap();
    let data = prepared.system.data().clone();

    with_data.data = Some(alm_gibbs::ObservedData {
        real: data.real.as_slice().to_vec(),
        imag: data.imag.as_slice().to_vec(),
    });
    let again = prepare(&with_data, &config.clone().data_seed(999)).unwrap();
    assert_eq!(again.system.data(), &data);
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = Config::quick();
    config.n_samples = 0;
    let result = prepare(&problem(&Config::quick()), &config);
    assert!(matches!(result, Err(alm_gibbs::SamplerError::Config(_))));
}
