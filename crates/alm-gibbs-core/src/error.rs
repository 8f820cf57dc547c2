//! Error types for the Gibbs sampling core.

use std::fmt;

/// Errors raised by the sampling core.
///
/// Every variant is fatal for the call that produced it. Solver
/// non-convergence is deliberately *not* an error: it is reported on the
/// [`SolveOutcome`](crate::solver::SolveOutcome) and the caller decides what
/// to do with the sample.
#[derive(Debug, Clone, PartialEq)]
pub enum GibbsError {
    /// A (m, ℓ) pair outside `0 ≤ m ≤ ℓ ≤ lmax`.
    InvalidMode {
        /// Requested order m.
        em: usize,
        /// Requested degree ℓ.
        ell: usize,
        /// Maximum degree of the index.
        lmax: usize,
    },

    /// A flat slot outside the coefficient vector.
    InvalidSlot {
        /// Requested slot.
        slot: usize,
        /// Length of the coefficient vector.
        len: usize,
    },

    /// A vector whose length disagrees with the system it is used in.
    LengthMismatch {
        /// Which quantity had the wrong length.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// A matrix whose shape disagrees with its counterpart.
    ShapeMismatch {
        /// Which quantity had the wrong shape.
        what: &'static str,
        /// Expected (rows, columns).
        expected: (usize, usize),
        /// Actual (rows, columns).
        got: (usize, usize),
    },

    /// The radiometer-equation product had a non-zero imaginary part.
    ///
    /// Auto-correlations are real by construction, so this indicates a bug
    /// in the upstream visibility simulation rather than a sampling condition.
    ConsistencyCheck {
        /// Position in the baseline-major noise vector.
        index: usize,
        /// The offending imaginary part.
        imag: f64,
    },

    /// A variance that is zero, negative or non-finite, so its precision is
    /// undefined.
    NonPositiveVariance {
        /// Which variance vector.
        what: &'static str,
        /// Position in the vector.
        index: usize,
        /// The offending value.
        value: f64,
    },
}

impl fmt::Display for GibbsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GibbsError::InvalidMode { em, ell, lmax } => write!(
                f,
                "invalid mode (m={}, ℓ={}): require 0 ≤ m ≤ ℓ ≤ lmax={}",
                em, ell, lmax
            ),
            GibbsError::InvalidSlot { slot, len } => {
                write!(f, "slot {} out of range for {} coefficients", slot, len)
            }
            GibbsError::LengthMismatch {
                what,
                expected,
                got,
            } => write!(f, "{} has length {}, expected {}", what, got, expected),
            GibbsError::ShapeMismatch {
                what,
                expected,
                got,
            } => write!(
                f,
                "{} has shape {}x{}, expected {}x{}",
                what, got.0, got.1, expected.0, expected.1
            ),
            GibbsError::ConsistencyCheck { index, imag } => write!(
                f,
                "radiometer variance at {} has non-zero imaginary part {:e}",
                index, imag
            ),
            GibbsError::NonPositiveVariance { what, index, value } => write!(
                f,
                "{} at {} is {}, precision is undefined",
                what, index, value
            ),
        }
    }
}

impl std::error::Error for GibbsError {}

/// Result alias for the sampling core.
pub type Result<T> = std::result::Result<T, GibbsError>;

/// Check that a vector has the expected length.
pub(crate) fn check_len(what: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(GibbsError::LengthMismatch {
            what,
            expected,
            got,
        })
    }
}
