//! Realified alm indexing.
//!
//! A realified coefficient vector of length `(lmax+1)²` packs the positive-m
//! half of the spherical-harmonic expansion in m-major order:
//!
//! ```text
//! [ Re a(0,0) .. Re a(0,lmax) | Re a(1,1) .. Re a(lmax,lmax) | Im a(1,1) .. Im a(lmax,lmax) ]
//!   \_____________________ n_real = (lmax+1)(lmax+2)/2 _____/ \___ n_imag = (lmax+1)lmax/2 _/
//! ```
//!
//! The m=0 modes are real, so they have no imaginary slot. The real block is
//! laid out exactly like a HEALPix alm array, which makes conversion to and
//! from the complex half-sphere representation a pair of slice copies.

use num_complex::Complex64;

use crate::error::{check_len, GibbsError, Result};

/// Real or imaginary half of a complex mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Part {
    /// Real part (every mode has one).
    Real,
    /// Imaginary part (only m ≥ 1).
    Imag,
}

/// The mode stored at one slot of a realified vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlmMode {
    /// Order m.
    pub em: usize,
    /// Degree ℓ.
    pub ell: usize,
    /// Which half of the complex coefficient.
    pub part: Part,
}

/// Bijection between `(m, ℓ, part)` and slots of a realified alm vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlmIndex {
    lmax: usize,
}

impl AlmIndex {
    /// Index for all modes up to degree `lmax`.
    pub const fn new(lmax: usize) -> Self {
        Self { lmax }
    }

    /// Recover the index from a realified vector length `(lmax+1)²`.
    pub fn from_len(len: usize) -> Result<Self> {
        let side = (len as f64).sqrt().round() as usize;
        if side == 0 || side * side != len {
            return Err(GibbsError::LengthMismatch {
                what: "realified alm vector",
                expected: side.max(1) * side.max(1),
                got: len,
            });
        }
        Ok(Self::new(side - 1))
    }

    /// Recover the index from a HEALPix half-sphere array length
    /// `(lmax+1)(lmax+2)/2`.
    pub fn from_healpix_len(len: usize) -> Result<Self> {
        // Solve (l+1)(l+2)/2 = len for l.
        let l = (((8 * len + 1) as f64).sqrt() - 3.0) / 2.0;
        let lmax = l.round().max(0.0) as usize;
        let index = Self::new(lmax);
        check_len("HEALPix alm array", index.n_real(), len)?;
        Ok(index)
    }

    /// Maximum degree.
    pub const fn lmax(&self) -> usize {
        self.lmax
    }

    /// Number of real slots, `(lmax+1)(lmax+2)/2`.
    pub const fn n_real(&self) -> usize {
        (self.lmax + 1) * (self.lmax + 2) / 2
    }

    /// Number of imaginary slots, `(lmax+1)lmax/2`.
    pub const fn n_imag(&self) -> usize {
        (self.lmax + 1) * self.lmax / 2
    }

    /// Total length of a realified vector, `(lmax+1)²`.
    pub const fn len(&self) -> usize {
        (self.lmax + 1) * (self.lmax + 1)
    }

    /// Always false: even `lmax = 0` has the monopole slot.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Slots of mode (m, ℓ): the real slot and, for m ≥ 1, the imaginary slot.
    pub fn index(&self, em: usize, ell: usize) -> Result<(usize, Option<usize>)> {
        if em > ell || ell > self.lmax {
            return Err(GibbsError::InvalidMode {
                em,
                ell,
                lmax: self.lmax,
            });
        }
        let real = em * (2 * self.lmax + 3 - em) / 2 + (ell - em);
        let imag = if em == 0 {
            None
        } else {
            // The imaginary block drops the lmax+1 slots of m=0.
            Some(self.n_real() + real - (self.lmax + 1))
        };
        Ok((real, imag))
    }

    /// Inverse of [`index`](Self::index): the mode stored at `slot`.
    pub fn mode(&self, slot: usize) -> Result<AlmMode> {
        if slot >= self.len() {
            return Err(GibbsError::InvalidSlot {
                slot,
                len: self.len(),
            });
        }

        let (mut offset, first_em, part) = if slot < self.n_real() {
            (slot, 0, Part::Real)
        } else {
            (slot - self.n_real(), 1, Part::Imag)
        };

        let mut em = first_em;
        loop {
            let block = self.lmax + 1 - em;
            if offset < block {
                return Ok(AlmMode {
                    em,
                    ell: em + offset,
                    part,
                });
            }
            offset -= block;
            em += 1;
        }
    }

    /// All modes in slot order.
    pub fn modes(&self) -> impl Iterator<Item = AlmMode> + '_ {
        let real = (0..=self.lmax).flat_map(move |em| {
            (em..=self.lmax).map(move |ell| AlmMode {
                em,
                ell,
                part: Part::Real,
            })
        });
        let imag = (1..=self.lmax).flat_map(move |em| {
            (em..=self.lmax).map(move |ell| AlmMode {
                em,
                ell,
                part: Part::Imag,
            })
        });
        real.chain(imag)
    }

    /// Degree ℓ of every slot, in slot order.
    pub fn degrees(&self) -> Vec<usize> {
        self.modes().map(|mode| mode.ell).collect()
    }

    /// Convert a realified vector to the HEALPix complex half-sphere layout.
    ///
    /// The m=0 entries get a zero imaginary part.
    pub fn to_healpix(&self, alms: &[f64]) -> Result<Vec<Complex64>> {
        check_len("realified alm vector", self.len(), alms.len())?;
        let n_real = self.n_real();
        let n_m0 = self.lmax + 1;

        let modes = (0..n_real)
            .map(|i| {
                let imag = if i < n_m0 { 0.0 } else { alms[n_real + i - n_m0] };
                Complex64::new(alms[i], imag)
            })
            .collect();
        Ok(modes)
    }

    /// Convert a HEALPix complex half-sphere array to a realified vector.
    ///
    /// Imaginary parts of the m=0 entries are structurally zero and dropped.
    pub fn from_healpix(&self, modes: &[Complex64]) -> Result<Vec<f64>> {
        check_len("HEALPix alm array", self.n_real(), modes.len())?;
        let n_m0 = self.lmax + 1;

        let mut alms = Vec::with_capacity(self.len());
        alms.extend(modes.iter().map(|z| z.re));
        alms.extend(modes[n_m0..].iter().map(|z| z.im));
        Ok(alms)
    }
}
