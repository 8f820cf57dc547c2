//! Persistence of chain output.
//!
//! A chain directory holds, for each `(data_seed, job_id)`:
//!
//! - `init_{data_seed}_{job_id}.json`: [`ChainArtifacts`](crate::ChainArtifacts), written once
//! - `samples_{data_seed}_{job_id}_{first:06}.jsonl`: one [`SampleRecord`](crate::SampleRecord)
//!   per line, a new file every `batch_size` samples
//! - `summary_{data_seed}_{job_id}.json`: [`ChainSummary`](crate::ChainSummary), written at the end

mod json;
mod jsonl;

pub use json::{
    artifacts_path, read_artifacts, summary_path, to_json, to_json_pretty, write_artifacts,
    write_summary,
};
pub use jsonl::{read_samples, sample_files, SampleWriter};
