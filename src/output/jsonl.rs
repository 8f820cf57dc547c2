//! JSON-lines sample files with batch rollover.
//!
//! Records are flushed line by line, so an interrupted chain loses at most
//! the sample being written. A truncated last line is skipped on read.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::SamplerError;
use crate::sampler::SampleRecord;

fn file_prefix(data_seed: u64, job_id: u64) -> String {
    format!("samples_{}_{}_", data_seed, job_id)
}

/// Streams sample records into `samples_{data_seed}_{job_id}_{first:06}.jsonl`
/// files of at most `batch_size` records each.
pub struct SampleWriter {
    dir: PathBuf,
    prefix: String,
    batch_size: usize,
    current: Option<BufWriter<File>>,
    in_batch: usize,
    files: Vec<PathBuf>,
    written: usize,
}

impl SampleWriter {
    /// Create a writer, creating `dir` if needed.
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is 0.
    pub fn new(
        dir: &Path,
        data_seed: u64,
        job_id: u64,
        batch_size: usize,
    ) -> Result<Self, SamplerError> {
        assert!(batch_size > 0, "batch_size must be > 0 (got {})", batch_size);
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            prefix: file_prefix(data_seed, job_id),
            batch_size,
            current: None,
            in_batch: 0,
            files: Vec::new(),
            written: 0,
        })
    }

    /// Append one record, starting a new file when the batch is full.
    pub fn write(&mut self, record: &SampleRecord) -> Result<(), SamplerError> {
        if self.current.is_none() || self.in_batch == self.batch_size {
            self.roll(record.iteration)?;
        }

        if let Some(writer) = self.current.as_mut() {
            serde_json::to_writer(&mut *writer, record)?;
            writeln!(writer)?;
            writer.flush()?;
        }
        self.in_batch += 1;
        self.written += 1;
        Ok(())
    }

    fn roll(&mut self, first_iteration: usize) -> Result<(), SamplerError> {
        if let Some(mut previous) = self.current.take() {
            previous.flush()?;
        }
        let path = self
            .dir
            .join(format!("{}{:06}.jsonl", self.prefix, first_iteration));
        tracing::debug!(path = %path.display(), "opening sample file");
        self.current = Some(BufWriter::new(File::create(&path)?));
        self.files.push(path);
        self.in_batch = 0;
        Ok(())
    }

    /// Number of records written.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the files written, in order.
    pub fn finish(mut self) -> Result<Vec<PathBuf>, SamplerError> {
        if let Some(mut writer) = self.current.take() {
            writer.flush()?;
        }
        Ok(self.files)
    }
}

/// Sample files of one chain in `dir`, in iteration order.
pub fn sample_files(dir: &Path, data_seed: u64, job_id: u64) -> Result<Vec<PathBuf>, SamplerError> {
    let prefix = file_prefix(data_seed, job_id);
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".jsonl"));
        if matches {
            files.push(path);
        }
    }
    // Zero-padded first iteration: lexicographic order is iteration order.
    files.sort();
    Ok(files)
}

/// Read every record of one chain in `dir`, in iteration order.
///
/// Lines that do not parse (e.g. a record cut short by an interruption) are
/// skipped with a warning.
pub fn read_samples(dir: &Path, data_seed: u64, job_id: u64) -> Result<Vec<SampleRecord>, SamplerError> {
    let mut records = Vec::new();
    for path in sample_files(dir, data_seed, job_id)? {
        let reader = BufReader::new(File::open(&path)?);
        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SampleRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    line = line_num + 1,
                    error = %e,
                    "skipping malformed sample line"
                ),
            }
        }
    }
    records.sort_by_key(|r| r.iteration);
    Ok(records)
}
