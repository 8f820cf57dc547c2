//! Per-iteration seed derivation.
//!
//! Every random draw in the chain gets a fresh `Xoshiro256PlusPlus` seeded
//! from `(job_id, iteration, stream)`, so a chain is reproducible from any
//! iteration without carrying generator state, and independent jobs never
//! share a stream.

use rand::{RngCore, SeedableRng};
use rand_xoshiro::SplitMix64;

/// Which draw of an iteration a seed is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Fluctuation terms ω₀, ω₁ of the alm draw.
    Alms,
    /// Inverse-gamma variates of the C_ℓ draw.
    Spectrum,
}

impl Stream {
    fn tag(self) -> u64 {
        match self {
            Stream::Alms => 0x616c_6d73,
            Stream::Spectrum => 0x636c_7370,
        }
    }
}

/// Seed for one stream of one iteration of one job.
///
/// Each input is folded in through one SplitMix64 output, so nearby job ids
/// and iterations land on unrelated seeds.
pub fn stream_seed(job_id: u64, iteration: u64, stream: Stream) -> u64 {
    let h = SplitMix64::seed_from_u64(job_id).next_u64();
    let h = SplitMix64::seed_from_u64(h ^ iteration).next_u64();
    SplitMix64::seed_from_u64(h ^ stream.tag()).next_u64()
}
