//! Problem description: everything the external simulator provides.
//!
//! A chain needs the visibility response of the sky, the response of each
//! antenna's auto-correlation (for the radiometer noise model), and a
//! reference sky. These arrive as a single JSON document:
//!
//! ```json
//! {
//!   "lmax": 2,
//!   "n_antennas": 3,
//!   "response":      { "real": [[...], ...], "imag": [[...], ...] },
//!   "auto_response": { "real": [[...], ...], "imag": [[...], ...] },
//!   "true_sky": [...],
//!   "data": { "real": [...], "imag": [...] }
//! }
//! ```
//!
//! `data` is optional; without it the observation is simulated from the
//! reference sky with the configured data seed.
//!
//! [`Problem::synthetic`] generates a random problem of the same shape for
//! smoke tests and benchmarks.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use alm_gibbs_core::{
    AlmIndex, GibbsError, Matrix, RadiometerParams, ResponseOperator, Vector, VisibilityData,
};

use crate::error::SamplerError;

/// Real and imaginary response blocks, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBlocks {
    /// Rows of the real block.
    pub real: Vec<Vec<f64>>,
    /// Rows of the imaginary block.
    pub imag: Vec<Vec<f64>>,
}

impl ResponseBlocks {
    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.real.len()
    }

    /// Number of columns (0 for an empty block).
    pub fn n_cols(&self) -> usize {
        self.real.first().map_or(0, Vec::len)
    }

    /// Copy out of an operator.
    pub fn from_operator(op: &ResponseOperator) -> Self {
        let rows = |m: &Matrix| -> Vec<Vec<f64>> {
            m.row_iter()
                .map(|row| row.iter().copied().collect())
                .collect()
        };
        Self {
            real: rows(op.real()),
            imag: rows(op.imag()),
        }
    }

    /// Build the operator, rejecting ragged rows.
    pub fn to_operator(&self) -> Result<ResponseOperator, SamplerError> {
        let real = to_matrix(&self.real, "real response row")?;
        let imag = to_matrix(&self.imag, "imaginary response row")?;
        Ok(ResponseOperator::new(real, imag)?)
    }
}

fn to_matrix(rows: &[Vec<f64>], what: &'static str) -> Result<Matrix, GibbsError> {
    let n_cols = rows.first().map_or(0, Vec::len);
    if let Some(row) = rows.iter().find(|r| r.len() != n_cols) {
        return Err(GibbsError::LengthMismatch {
            what,
            expected: n_cols,
            got: row.len(),
        });
    }
    Ok(Matrix::from_row_iterator(
        rows.len(),
        n_cols,
        rows.iter().flatten().copied(),
    ))
}

/// Observed visibilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedData {
    /// Real components.
    pub real: Vec<f64>,
    /// Imaginary components.
    pub imag: Vec<f64>,
}

/// A complete sampling problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// Maximum spherical-harmonic degree.
    pub lmax: usize,

    /// Number of antennas in the array.
    pub n_antennas: usize,

    /// Sky-to-visibility response, `N_vis × (lmax+1)²`.
    pub response: ResponseBlocks,

    /// Sky-to-auto-correlation response, `(n_antennas · block) × (lmax+1)²`,
    /// antenna-major.
    pub auto_response: ResponseBlocks,

    /// Reference sky as a realified alm vector.
    pub true_sky: Vec<f64>,

    /// Observed visibilities; simulated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ObservedData>,
}

impl Problem {
    /// Read a problem from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SamplerError> {
        let file = File::open(path)?;
        let problem: Problem = serde_json::from_reader(BufReader::new(file))?;
        problem.validate()?;
        Ok(problem)
    }

    /// Write the problem as JSON.
    pub fn save(&self, path: &Path) -> Result<(), SamplerError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Alm index for `lmax`.
    pub fn index(&self) -> AlmIndex {
        AlmIndex::new(self.lmax)
    }

    /// Check that every block agrees with `lmax` and `n_antennas`.
    pub fn validate(&self) -> Result<(), SamplerError> {
        let n_coeff = self.index().len();
        if self.true_sky.len() != n_coeff {
            return Err(SamplerError::InvalidProblem(format!(
                "true_sky has {} entries, lmax={} needs {}",
                self.true_sky.len(),
                self.lmax,
                n_coeff
            )));
        }
        for (name, blocks) in [("response", &self.response), ("auto_response", &self.auto_response)] {
            if blocks.n_rows() == 0 || blocks.n_cols() != n_coeff {
                return Err(SamplerError::InvalidProblem(format!(
                    "{} must have {} columns and at least one row, got {}×{}",
                    name,
                    n_coeff,
                    blocks.n_rows(),
                    blocks.n_cols()
                )));
            }
            if blocks.imag.len() != blocks.real.len() {
                return Err(SamplerError::InvalidProblem(format!(
                    "{} has {} real rows but {} imaginary rows",
                    name,
                    blocks.real.len(),
                    blocks.imag.len()
                )));
            }
        }
        if self.n_antennas == 0 || self.auto_response.n_rows() % self.n_antennas != 0 {
            return Err(SamplerError::InvalidProblem(format!(
                "auto_response has {} rows, not a multiple of n_antennas={}",
                self.auto_response.n_rows(),
                self.n_antennas
            )));
        }
        if let Some(data) = &self.data {
            if data.real.len() != self.response.n_rows() || data.imag.len() != self.response.n_rows() {
                return Err(SamplerError::InvalidProblem(format!(
                    "data has {}/{} real/imaginary entries, response has {} rows",
                    data.real.len(),
                    data.imag.len(),
                    self.response.n_rows()
                )));
            }
        }
        Ok(())
    }

    /// Reference sky as a vector.
    pub fn true_sky(&self) -> Vector {
        Vector::from_column_slice(&self.true_sky)
    }

    /// Observed data, if supplied.
    pub fn observed(&self) -> Result<Option<VisibilityData>, SamplerError> {
        self.data
            .as_ref()
            .map(|d| {
                VisibilityData::new(
                    Vector::from_column_slice(&d.real),
                    Vector::from_column_slice(&d.imag),
                )
                .map_err(SamplerError::from)
            })
            .transpose()
    }

    /// Random problem for an array of `n_antennas` observed at `n_times`
    /// instants.
    ///
    /// The reference sky has a bright monopole and a red spectrum; each
    /// auto-correlation is dominated by the monopole so the radiometer noise
    /// is strictly positive. The response has one row per baseline of
    /// `radiometer` per instant, so it matches the noise model built with the
    /// same parameters.
    pub fn synthetic(
        lmax: usize,
        n_antennas: usize,
        n_times: usize,
        radiometer: &RadiometerParams,
        seed: u64,
    ) -> Self {
        let index = AlmIndex::new(lmax);
        let n_coeff = index.len();
        let n_vis = radiometer.n_baselines(n_antennas) * n_times;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut normal = || -> f64 { StandardNormal.sample(&mut rng) };

        let true_sky = index
            .modes()
            .map(|mode| {
                if mode.ell == 0 {
                    100.0
                } else {
                    5.0 * normal() / (mode.ell as f64 + 1.0)
                }
            })
            .collect();

        let mut random_rows = |n_rows: usize, scale: f64| -> Vec<Vec<f64>> {
            (0..n_rows)
                .map(|_| (0..n_coeff).map(|_| scale * normal()).collect())
                .collect()
        };
        let response = ResponseBlocks {
            real: random_rows(n_vis, 1.0),
            imag: random_rows(n_vis, 1.0),
        };

        let mut auto_real = random_rows(n_antennas * n_times, 1e-3);
        for row in auto_real.iter_mut() {
            row[0] = 1.0;
        }
        let auto_response = ResponseBlocks {
            real: auto_real,
            imag: vec![vec![0.0; n_coeff]; n_antennas * n_times],
        };

        Self {
            lmax,
            n_antennas,
            response,
            auto_response,
            true_sky,
            data: None,
        }
    }
}
