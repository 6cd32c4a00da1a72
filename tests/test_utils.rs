//! Shared utilities for integration tests
#![allow(dead_code)]

use bitvec::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use rustyfec::Llr;

pub use rustyfec::bits::bits_from_str;

/// Noiseless BPSK channel: `+amplitude` nats for a 1, `-amplitude` for a 0.
pub fn bpsk_llr(bits: &BitSlice<u8, Lsb0>, amplitude: Llr) -> Vec<Llr> {
    bits.iter()
        .map(|b| if *b { amplitude } else { -amplitude })
        .collect()
}

/// Seeded AWGN channel. `ebn0_db` is the information-bit SNR and `rate`
/// the code rate; returns the channel L-values `2y / sigma^2`.
pub fn awgn_llr(bits: &BitSlice<u8, Lsb0>, ebn0_db: f64, rate: f64, seed: u64) -> Vec<Llr> {
    let esn0 = 10f64.powf(ebn0_db / 10.0) * rate;
    let sigma = (1.0 / (2.0 * esn0)).sqrt();
    let normal = Normal::new(0.0, sigma).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    bits.iter()
        .map(|b| {
            let x: f64 = if *b { 1.0 } else { -1.0 };
            let y = x + normal.sample(&mut rng);
            2.0 * y / (sigma * sigma)
        })
        .collect()
}

/// Seeded random message bits.
pub fn random_message(len: usize, seed: u64) -> BitVec<u8, Lsb0> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.random::<bool>()).collect()
}

/// Number of positions where the two bit vectors differ.
pub fn bit_errors(a: &BitSlice<u8, Lsb0>, b: &BitSlice<u8, Lsb0>) -> usize {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).filter(|(x, y)| *x != *y).count()
}
