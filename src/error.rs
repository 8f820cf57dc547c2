//! Errors surfaced by the sampler driver.

use std::fmt;

use alm_gibbs_core::GibbsError;

use crate::config::ConfigError;

/// Errors that can occur while preparing, running or persisting a chain.
#[derive(Debug)]
pub enum SamplerError {
    /// Invalid sampler configuration.
    Config(ConfigError),

    /// Failure inside the sampling core.
    Gibbs(GibbsError),

    /// IO error reading or writing chain files.
    Io(std::io::Error),

    /// Malformed JSON in a problem, config or sample file.
    Json(serde_json::Error),

    /// A problem description that is internally inconsistent.
    InvalidProblem(String),

    /// Resume requested from an empty list of records.
    EmptyHistory,

    /// Resume requested but no completed samples were found.
    NothingToResume {
        /// Directory that was searched.
        dir: std::path::PathBuf,
    },
}

impl fmt::Display for SamplerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplerError::Config(e) => write!(f, "Invalid configuration: {}", e),
            SamplerError::Gibbs(e) => write!(f, "Sampling error: {}", e),
            SamplerError::Io(e) => write!(f, "IO error: {}", e),
            SamplerError::Json(e) => write!(f, "JSON error: {}", e),
            SamplerError::InvalidProblem(msg) => write!(f, "Invalid problem: {}", msg),
            SamplerError::EmptyHistory => write!(f, "No sample records to resume from"),
            SamplerError::NothingToResume { dir } => {
                write!(f, "No samples to resume from in {}", dir.display())
            }
        }
    }
}

impl std::error::Error for SamplerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SamplerError::Config(e) => Some(e),
            SamplerError::Gibbs(e) => Some(e),
            SamplerError::Io(e) => Some(e),
            SamplerError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for SamplerError {
    fn from(e: ConfigError) -> Self {
        SamplerError::Config(e)
    }
}

impl From<GibbsError> for SamplerError {
    fn from(e: GibbsError) -> Self {
        SamplerError::Gibbs(e)
    }
}

impl From<std::io::Error> for SamplerError {
    fn from(e: std::io::Error) -> Self {
        SamplerError::Io(e)
    }
}

impl From<serde_json::Error> for SamplerError {
    fn from(e: serde_json::Error) -> Self {
        SamplerError::Json(e)
    }
}
