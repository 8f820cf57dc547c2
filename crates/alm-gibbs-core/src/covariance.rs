//! Signal covariance from a power-spectrum draw.
//!
//! The prior on the realified alms is diagonal. After each C_ℓ draw every
//! real and imaginary slot of degree ℓ ≥ 1 gets variance `C_ℓ / 2`: a complex
//! mode of variance C_ℓ splits into two independent real Gaussians of half
//! that variance. Degree 0 is outside the inverse-gamma update and keeps the
//! prior variance it started the chain with.

use crate::error::{check_len, GibbsError, Result};
use crate::indexing::AlmIndex;
use crate::types::Vector;

/// Per-slot variance for the next alm draw.
///
/// `cl` holds C_ℓ for ℓ = 1..=lmax.
pub fn signal_variance(prior_variance: &Vector, cl: &[f64], index: &AlmIndex) -> Result<Vector> {
    check_len("prior variance", index.len(), prior_variance.len())?;
    check_len("power spectrum draw", index.lmax(), cl.len())?;

    let mut variance = prior_variance.clone();
    for ell in 1..=index.lmax() {
        let half = 0.5 * cl[ell - 1];
        for em in 0..=ell {
            let (re, im) = index.index(em, ell)?;
            variance[re] = half;
            if let Some(im) = im {
                variance[im] = half;
            }
        }
    }
    Ok(variance)
}

/// Signal precision S⁻¹ for the next alm draw.
pub fn signal_precision(prior_variance: &Vector, cl: &[f64], index: &AlmIndex) -> Result<Vector> {
    let variance = signal_variance(prior_variance, cl, index)?;
    precision_from_variance(&variance, "signal variance")
}

/// Elementwise reciprocal of a variance vector.
///
/// Zero, negative or non-finite variances leave the precision undefined and
/// are rejected.
pub fn precision_from_variance(variance: &Vector, what: &'static str) -> Result<Vector> {
    if let Some((index, &value)) = variance
        .iter()
        .enumerate()
        .find(|(_, v)| !(v.is_finite() && **v > 0.0))
    {
        return Err(GibbsError::NonPositiveVariance { what, index, value });
    }
    Ok(variance.map(|v| 1.0 / v))
}
