//! Conditional draw of the angular power spectrum given the alms.
//!
//! For an isotropic Gaussian sky, the per-degree variance C_ℓ given the alms
//! has an inverse-gamma conditional (Eriksen et al. 2004, 2007):
//!
//! ```text
//! σ_ℓ = 1/(2ℓ+1) · [ a(0,ℓ)² + 2 Σ_{m=1..ℓ} (Re a(m,ℓ)² + Im a(m,ℓ)²) ]
//! C_ℓ = X · σ_ℓ (2ℓ+1)/2,   X ~ InvGamma(shape = (2ℓ-1)/2, scale = 1)
//! ```
//!
//! The conditional is improper at ℓ = 0, so the monopole is not part of the
//! sampled spectrum: every vector here is indexed by ℓ-1 for ℓ = 1..=lmax.

use rand::Rng;
use rand_distr::{Distribution, Gamma};

use crate::error::{check_len, Result};
use crate::indexing::AlmIndex;

/// One draw of the power spectrum with its sufficient statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumDraw {
    /// C_ℓ for ℓ = 1..=lmax.
    pub cl: Vec<f64>,
    /// σ_ℓ for ℓ = 1..=lmax.
    pub sigma_ell: Vec<f64>,
}

/// Shape parameter of the inverse-gamma conditional at degree `ell ≥ 1`.
pub fn inverse_gamma_shape(ell: usize) -> f64 {
    (2 * ell - 1) as f64 / 2.0
}

/// Observed power `(2ℓ+1)·σ_ℓ` at one degree.
fn degree_power(alms: &[f64], index: &AlmIndex, ell: usize) -> Result<f64> {
    let (re0, _) = index.index(0, ell)?;
    let mut power = alms[re0] * alms[re0];
    for em in 1..=ell {
        let (re, im) = index.index(em, ell)?;
        let im = im.map_or(0.0, |i| alms[i]);
        power += 2.0 * (alms[re] * alms[re] + im * im);
    }
    Ok(power)
}

/// σ_ℓ for ℓ = 1..=lmax.
pub fn sigma_ell(alms: &[f64], index: &AlmIndex) -> Result<Vec<f64>> {
    check_len("realified alm vector", index.len(), alms.len())?;
    (1..=index.lmax())
        .map(|ell| degree_power(alms, index, ell).map(|p| p / (2 * ell + 1) as f64))
        .collect()
}

/// Empirical angular power spectrum for ℓ = 0..=lmax (HEALPix `alm2cl`).
pub fn angular_power_spectrum(alms: &[f64], index: &AlmIndex) -> Result<Vec<f64>> {
    check_len("realified alm vector", index.len(), alms.len())?;
    (0..=index.lmax())
        .map(|ell| degree_power(alms, index, ell).map(|p| p / (2 * ell + 1) as f64))
        .collect()
}

/// Draw C_ℓ | alms for ℓ = 1..=lmax.
///
/// Draws are taken in increasing ℓ from `rng`.
pub fn sample_power_spectrum<R: Rng + ?Sized>(
    alms: &[f64],
    index: &AlmIndex,
    rng: &mut R,
) -> Result<SpectrumDraw> {
    let sigma_ell = sigma_ell(alms, index)?;

    let cl = sigma_ell
        .iter()
        .enumerate()
        .map(|(i, &sigma)| {
            let ell = i + 1;
            // X ~ InvGamma(a, 1) is 1/Y with Y ~ Gamma(a, scale 1).
            let gamma = Gamma::new(inverse_gamma_shape(ell), 1.0)
                .expect("inverse-gamma shape is positive for ℓ ≥ 1");
            let x = 1.0 / gamma.sample(&mut *rng);
            x * sigma * (2 * ell + 1) as f64 / 2.0
        })
        .collect();

    Ok(SpectrumDraw { cl, sigma_ell })
}
