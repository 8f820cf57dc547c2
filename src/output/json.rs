//! JSON serialization for chain-level files.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::SamplerError;
use crate::sampler::{ChainArtifacts, ChainSummary};

/// Serialize to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for the
/// crate's record types).
pub fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Serialize to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for the
/// crate's record types).
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Path of the `Init` artifacts file.
pub fn artifacts_path(dir: &Path, data_seed: u64, job_id: u64) -> PathBuf {
    dir.join(format!("init_{}_{}.json", data_seed, job_id))
}

/// Path of the chain summary file.
pub fn summary_path(dir: &Path, data_seed: u64, job_id: u64) -> PathBuf {
    dir.join(format!("summary_{}_{}.json", data_seed, job_id))
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), SamplerError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write the `Init` artifacts into `dir`.
pub fn write_artifacts(dir: &Path, artifacts: &ChainArtifacts) -> Result<PathBuf, SamplerError> {
    std::fs::create_dir_all(dir)?;
    let path = artifacts_path(dir, artifacts.config.data_seed, artifacts.config.job_id);
    write_pretty(&path, artifacts)?;
    Ok(path)
}

/// Read `Init` artifacts back.
pub fn read_artifacts(path: &Path) -> Result<ChainArtifacts, SamplerError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Write the chain summary into `dir`.
pub fn write_summary(
    dir: &Path,
    data_seed: u64,
    job_id: u64,
    summary: &ChainSummary,
) -> Result<PathBuf, SamplerError> {
    std::fs::create_dir_all(dir)?;
    let path = summary_path(dir, data_seed, job_id);
    write_pretty(&path, summary)?;
    Ok(path)
}
