//! Flooding belief-propagation decoder
//!
//! Messages live on the edges of the check matrix in row-major order. Each
//! iteration recomputes the variable totals from the channel values and the
//! check-to-variable messages, stops early when the hard decision passes
//! the syndrome, then refreshes the edge messages. The check update is
//! either the sum-product rule through the transform
//! `phi(x) = -ln tanh(x/2)` with sign bookkeeping, or the scaled min-sum
//! approximation.

use bitvec::prelude::*;
use tracing::trace;

use crate::llr::{saturate, slice, DecoderAlgorithm, Llr};
use crate::sparse::SparseBitMatrix;

use super::Structure;

/// Involutive magnitude transform of the sum-product check update.
#[inline]
fn phi(x: Llr) -> Llr {
    let x = x.max(1e-12);
    -((0.5 * x).tanh().ln())
}

/// Per-worker BP scratch: edge messages and variable totals.
#[derive(Debug)]
pub(crate) struct Decoder {
    row_offsets: Vec<usize>,
    row_cols: Vec<u32>,
    check_msg: Vec<Llr>,
    var_msg: Vec<Llr>,
    totals: Vec<Llr>,
    phis: Vec<Llr>,
}

impl Decoder {
    pub(crate) fn new(h: &SparseBitMatrix) -> Self {
        let mut row_offsets = Vec::with_capacity(h.row_count() + 1);
        let mut row_cols = Vec::with_capacity(h.ones());
        row_offsets.push(0);
        let mut max_weight = 0;
        for r in 0..h.row_count() {
            row_cols.extend_from_slice(h.row(r));
            row_offsets.push(row_cols.len());
            max_weight = max_weight.max(h.row_weight(r));
        }
        let edges = row_cols.len();
        Decoder {
            row_offsets,
            row_cols,
            check_msg: vec![0.0; edges],
            var_msg: vec![0.0; edges],
            totals: vec![0.0; h.col_count()],
            phis: vec![0.0; max_weight],
        }
    }

    pub(crate) fn decode_block<M: BitStore>(
        &mut self,
        structure: &Structure,
        channel: &[Llr],
        message: &mut BitSlice<M, Lsb0>,
    ) {
        self.iterate(structure, channel, None);
        for j in 0..structure.msg_size() {
            message.set(j, slice(self.totals[j]));
        }
    }

    pub(crate) fn soft_decode_block(
        &mut self,
        structure: &Structure,
        channel: &[Llr],
        extrinsic_in: Option<&[Llr]>,
        message_out: &mut [Llr],
        extrinsic_out: Option<&mut [Llr]>,
    ) {
        self.iterate(structure, channel, extrinsic_in);
        for (out, &total) in message_out
            .iter_mut()
            .zip(&self.totals[..structure.msg_size()])
        {
            *out = saturate(total);
        }
        if let Some(out) = extrinsic_out {
            out.copy_from_slice(&self.check_msg);
        }
    }

    fn iterate(&mut self, structure: &Structure, channel: &[Llr], extrinsic_in: Option<&[Llr]>) {
        let rows = self.row_offsets.len() - 1;
        let options = structure.decoder_options();
        debug_assert_eq!(channel.len(), self.totals.len());

        match extrinsic_in {
            Some(input) => self.check_msg.copy_from_slice(input),
            None => self.check_msg.fill(0.0),
        }

        for iteration in 0..=options.iterations {
            // Variable totals: channel plus every incident check message.
            for (total, &value) in self.totals.iter_mut().zip(channel) {
                *total = saturate(value);
            }
            for (edge, &col) in self.row_cols.iter().enumerate() {
                self.totals[col as usize] += self.check_msg[edge];
            }

            // Tentative decision against the syndrome.
            let satisfied = (0..rows).all(|r| {
                let mut parity = false;
                for edge in self.row_offsets[r]..self.row_offsets[r + 1] {
                    parity ^= slice(self.totals[self.row_cols[edge] as usize]);
                }
                !parity
            });
            if satisfied {
                trace!(iteration, "bp syndrome satisfied");
                return;
            }
            if iteration == options.iterations {
                trace!(iterations = options.iterations, "bp reached its iteration limit");
                return;
            }

            // Variable-to-check messages exclude each edge's own input.
            for (edge, &col) in self.row_cols.iter().enumerate() {
                self.var_msg[edge] = self.totals[col as usize] - self.check_msg[edge];
            }

            for r in 0..rows {
                let range = self.row_offsets[r]..self.row_offsets[r + 1];
                match options.algorithm {
                    DecoderAlgorithm::Exact => self.check_update_exact(range),
                    DecoderAlgorithm::Approximate => {
                        self.check_update_min_sum(range, options.gain)
                    }
                }
            }
        }
    }

    fn check_update_exact(&mut self, range: std::ops::Range<usize>) {
        let degree = range.len();
        let mut sign = false;
        let mut phi_sum = 0.0;
        for (slot, edge) in range.clone().enumerate() {
            let value = self.var_msg[edge];
            sign ^= value < 0.0;
            self.phis[slot] = phi(value.abs());
            phi_sum += self.phis[slot];
        }
        for (slot, edge) in range.enumerate() {
            let value = self.var_msg[edge];
            let others_sign = sign ^ (value < 0.0);
            let magnitude = phi((phi_sum - self.phis[slot]).max(1e-12));
            let positive = (degree - 1 + others_sign as usize) % 2 == 1;
            self.check_msg[edge] = saturate(if positive { magnitude } else { -magnitude });
        }
    }

    fn check_update_min_sum(&mut self, range: std::ops::Range<usize>, gain: f64) {
        let degree = range.len();
        let mut sign = false;
        let mut min = f64::INFINITY;
        let mut second = f64::INFINITY;
        let mut min_edge = range.start;
        for edge in range.clone() {
            let value = self.var_msg[edge];
            sign ^= value < 0.0;
            let magnitude = value.abs();
            if magnitude < min {
                second = min;
                min = magnitude;
                min_edge = edge;
            } else if magnitude < second {
                second = magnitude;
            }
        }
        for edge in range {
            let value = self.var_msg[edge];
            let others_sign = sign ^ (value < 0.0);
            let magnitude = gain * if edge == min_edge { second } else { min };
            let positive = (degree - 1 + others_sign as usize) % 2 == 1;
            self.check_msg[edge] = saturate(if positive { magnitude } else { -magnitude });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldpc::{EncoderOptions, Gallager};

    fn gallager_structure(algorithm: DecoderAlgorithm) -> Structure {
        let h = Gallager::matrix(24, 3, 6, 11).unwrap();
        let mut structure = Structure::with_encoder(EncoderOptions::new(h)).unwrap();
        let options = structure.decoder_options().algorithm(algorithm).iterations(30);
        structure.set_decoder_options(options);
        structure
    }

    fn encode_random(structure: &Structure, seed: u64) -> (BitVec<u8, Lsb0>, BitVec<u8, Lsb0>) {
        let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
        let mut message = BitVec::<u8, Lsb0>::repeat(false, structure.msg_size());
        for j in 0..message.len() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            message.set(j, state >> 63 != 0);
        }
        let mut parity = BitVec::<u8, Lsb0>::repeat(false, structure.parity_size());
        structure.encode_block(&message, &mut parity);
        (message, parity)
    }

    #[test]
    fn converges_immediately_on_a_clean_codeword() {
        for algorithm in [DecoderAlgorithm::Exact, DecoderAlgorithm::Approximate] {
            let structure = gallager_structure(algorithm);
            let (message, parity) = encode_random(&structure, 3);
            let channel: Vec<Llr> = parity.iter().map(|b| if *b { 5.0 } else { -5.0 }).collect();
            let mut decoder = structure.create_decoder();
            let mut decoded = bitvec![u8, Lsb0; 0; structure.msg_size()];
            decoder.decode_block(&structure, &channel, &mut decoded);
            assert_eq!(decoded, message, "{algorithm:?}");
        }
    }

    #[test]
    fn corrects_a_flipped_bit() {
        for algorithm in [DecoderAlgorithm::Exact, DecoderAlgorithm::Approximate] {
            let structure = gallager_structure(algorithm);
            let (message, parity) = encode_random(&structure, 7);
            let mut channel: Vec<Llr> =
                parity.iter().map(|b| if *b { 3.0 } else { -3.0 }).collect();
            channel[10] = -channel[10];
            let mut decoder = structure.create_decoder();
            let mut decoded = bitvec![u8, Lsb0; 0; structure.msg_size()];
            decoder.decode_block(&structure, &channel, &mut decoded);
            assert_eq!(decoded, message, "{algorithm:?}");
        }
    }

    #[test]
    fn treats_an_erasure_as_uninformative() {
        let structure = gallager_structure(DecoderAlgorithm::Exact);
        let (message, parity) = encode_random(&structure, 19);
        let mut channel: Vec<Llr> = parity.iter().map(|b| if *b { 3.5 } else { -3.5 }).collect();
        channel[4] = 0.0;
        channel[17] = 0.0;
        let mut decoder = structure.create_decoder();
        let mut decoded = bitvec![u8, Lsb0; 0; structure.msg_size()];
        decoder.decode_block(&structure, &channel, &mut decoded);
        assert_eq!(decoded, message);
    }
}
