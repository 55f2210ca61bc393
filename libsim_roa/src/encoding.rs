//! Field encodings for ROA strip-hit lines.
//!
//! Energies are quantized onto a 14 bit scale with 2 MeV full range, depths onto a 7 bit scale
//! across the 1.5 cm detector thickness. Hits below 1 keV get a synthetic energy drawn from a
//! Gaussian (mean 0, sigma 2 keV) resampled until it is at least 0.5 keV.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use super::constants::*;
use super::event::StripHit;

/// Quantize an energy in keV. Saturates at full scale.
pub fn energy_code(energy: f64) -> i64 {
    if energy >= ENERGY_FULL_SCALE {
        ENERGY_CODE_MAX
    } else {
        (ENERGY_CODE_MAX as f64 * energy / ENERGY_FULL_SCALE).floor() as i64
    }
}

/// Quantize a depth in cm. Not clamped: depths outside of +/- 0.75 cm give codes outside 0..128
pub fn depth_code(depth: f64) -> i64 {
    (DEPTH_CODE_SCALE * (DEPTH_OFFSET + depth) / DEPTH_RANGE).floor() as i64
}

pub fn depth_flag(hit: &StripHit) -> &'static str {
    if hit.has_flag(NO_DEPTH_FLAG) {
        "0"
    } else {
        "1"
    }
}

/// Always evaluated on the hit's recorded energy, never on a substituted one
pub fn trigger_flag(energy: f64) -> &'static str {
    if energy > TRIGGER_THRESHOLD {
        "1"
    } else {
        "0"
    }
}

/// The encoded fields of a strip hit, excluding the detector ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedHit {
    pub energy_code: i64,
    pub depth_code: i64,
    pub depth_flag: &'static str,
    pub trigger_flag: &'static str,
    pub substituted: bool,
}

/// EnergyEncoder owns the random source used for synthetic energies
#[derive(Debug)]
pub struct EnergyEncoder<R: Rng> {
    rng: R,
    noise: Normal<f64>,
    n_substituted: u64,
}

impl EnergyEncoder<StdRng> {
    /// Create an encoder from a seed, or from system entropy if there is no seed
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::new(StdRng::seed_from_u64(s)),
            None => Self::new(StdRng::from_entropy()),
        }
    }
}

impl<R: Rng> EnergyEncoder<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            // Constant, finite, positive sigma; construction cannot fail
            noise: Normal::new(0.0, SYNTHETIC_ENERGY_SIGMA).unwrap(),
            n_substituted: 0,
        }
    }

    /// Draw until the sample is at least the synthetic minimum
    pub fn synthetic_energy(&mut self) -> f64 {
        loop {
            let sample = self.noise.sample(&mut self.rng);
            if sample >= SYNTHETIC_ENERGY_MIN {
                return sample;
            }
        }
    }

    /// The energy used for quantization of a hit
    pub fn effective_energy(&mut self, energy: f64) -> (f64, bool) {
        if energy < SUBSTITUTION_THRESHOLD {
            self.n_substituted += 1;
            (self.synthetic_energy(), true)
        } else {
            (energy, false)
        }
    }

    pub fn encode(&mut self, hit: &StripHit) -> EncodedHit {
        let (energy, substituted) = self.effective_energy(hit.energy);
        EncodedHit {
            energy_code: energy_code(energy),
            depth_code: depth_code(hit.depth),
            depth_flag: depth_flag(hit),
            trigger_flag: trigger_flag(hit.energy),
            substituted,
        }
    }

    pub fn n_substituted(&self) -> u64 {
        self.n_substituted
    }
}
