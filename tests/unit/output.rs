//! Tests for sample files, artifacts and summaries on disk.

use std::fs;
use std::io::Write;

use alm_gibbs::output::{
    artifacts_path, read_artifacts, read_samples, sample_files, summary_path, write_artifacts,
    write_summary, SampleWriter,
};
use alm_gibbs::{prepare, ChainSummary, Config, Problem, SampleRecord, Sampler};

fn record(iteration: usize) -> SampleRecord {
    SampleRecord {
        iteration,
        alms: vec![iteration as f64, 1.0, -1.0, 0.5],
        cl: vec![0.25 * (iteration + 1) as f64],
        sigma_ell: vec![0.2],
        solver_iterations: 3,
        solver_converged: true,
        relative_residual: 1e-7,
        alm_seed: 1000 + iteration as u64,
        cl_seed: 2000 + iteration as u64,
        wall_time_secs: 0.01,
    }
}

#[test]
fn writer_rolls_over_batches() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = SampleWriter::new(dir.path(), 10, 3, 2).unwrap();
    for i in 0..5 {
        writer.write(&record(i)).unwrap();
    }
    assert_eq!(writer.written(), 5);

    let files = writer.finish().unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "samples_10_3_000000.jsonl",
            "samples_10_3_000002.jsonl",
            "samples_10_3_000004.jsonl",
        ]
    );
    assert_eq!(sample_files(dir.path(), 10, 3).unwrap(), files);
}

#[test]
fn writer_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let mut writer = SampleWriter::new(&nested, 1, 1, 10).unwrap();
    writer.write(&record(0)).unwrap();
    writer.finish().unwrap();
    assert!(nested.is_dir());
}

#[test]
#[should_panic(expected = "batch_size must be > 0")]
fn writer_zero_batch_panics() {
    let dir = tempfile::tempdir().unwrap();
    let _ = SampleWriter::new(dir.path(), 1, 1, 0);
}

#[test]
fn read_samples_returns_records_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = SampleWriter::new(dir.path(), 10, 0, 3).unwrap();
    for i in 0..7 {
        writer.write(&record(i)).unwrap();
    }
    writer.finish().unwrap();

    let records = read_samples(dir.path(), 10, 0).unwrap();
    assert_eq!(records.len(), 7);
    for (i, r) in records.iter().enumerate() {
        assert_eq!(*r, record(i));
    }
}

#[test]
fn read_samples_ignores_other_chains() {
    let dir = tempfile::tempdir().unwrap();
    for job in [0, 1] {
        let mut writer = SampleWriter::new(dir.path(), 10, job, 10).unwrap();
        writer.write(&record(job as usize)).unwrap();
        writer.finish().unwrap();
    }
    fs::write(dir.path().join("notes.txt"), "unrelated").unwrap();

    let records = read_samples(dir.path(), 10, 1).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].iteration, 1);
}

#[test]
fn read_samples_skips_truncated_line() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = SampleWriter::new(dir.path(), 10, 0, 10).unwrap();
    writer.write(&record(0)).unwrap();
    writer.write(&record(1)).unwrap();
    let files = writer.finish().unwrap();

    let mut file = fs::OpenOptions::new().append(true).open(&files[0]).unwrap();
    write!(file, "{{\"iteration\":2,\"alms\":[1.0,").unwrap();
    drop(file);

    let records = read_samples(dir.path(), 10, 0).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].iteration, 1);
}

#[test]
fn read_samples_of_empty_dir() {
    let dir = tempfile::tempdir().unwrap();
    assert!(read_samples(dir.path(), 10, 0).unwrap().is_empty());
}

#[test]
fn artifacts_written_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::quick().job_id(4);
    let problem = Problem::synthetic(2, 3, 4, &config.radiometer, 2);
    let prepared = prepare(&problem, &config).unwrap();
    let (_, artifacts) = Sampler::start(&prepared, &config).unwrap();

    let path = write_artifacts(dir.path(), &artifacts).unwrap();
    assert_eq!(path, artifacts_path(dir.path(), config.data_seed, 4));

    let back = read_artifacts(&path).unwrap();
    assert_eq!(back.lmax, 2);
    assert_eq!(back.config, config);
    assert_eq!(back.response_operator, problem.response);
    assert_eq!(back.true_sky, problem.true_sky);
    assert_eq!(back.wiener_filter.len(), 9);
    assert_eq!(back.noise_precision.len(), 3 * 4);
    assert_eq!(back.prior_mean[0], problem.true_sky[0]);
}

#[test]
fn summary_written() {
    let dir = tempfile::tempdir().unwrap();
    let mut summary = ChainSummary::default();
    summary.observe(&record(0), 0);
    summary.observe(&record(1), 0);

    let path = write_summary(dir.path(), 10, 2, &summary).unwrap();
    assert_eq!(path, summary_path(dir.path(), 10, 2));

    let text = fs::read_to_string(&path).unwrap();
    let back: ChainSummary = serde_json::from_str(&text).unwrap();
    assert_eq!(back.n_samples, 2);
    assert!((back.mean_cl[0] - 0.375).abs() < 1e-12);
}
