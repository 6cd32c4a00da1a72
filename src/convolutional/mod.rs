//! Convolutional codec
//!
//! Encoding walks the trellis from state zero; decoding is hard-decision
//! Viterbi when no soft output is required and MAP (BCJR) otherwise. With
//! `ZeroTail` termination the encoder appends the `memory` zero-forcing
//! input symbols, so the block always ends in state zero and the parity
//! layout is `| parity(msg) | parity(tail) |`.

mod viterbi;

use bitvec::prelude::*;

use crate::bits::{read_symbol, write_symbol};
use crate::error::CodecError;
use crate::llr::{saturate, DecoderAlgorithm, Llr};
use crate::map_decoder::MapDecoder;
use crate::trellis::Trellis;

pub(crate) use viterbi::ViterbiDecoder;

/// Trellis termination at the end of each block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Termination {
    /// No tail; the final state carries no information.
    #[default]
    Truncation,
    /// Append `memory` input symbols driving the state to zero.
    ZeroTail,
}

/// Options fixed at construction.
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    pub trellis: Trellis,
    pub block_len: usize,
    pub termination: Termination,
}

impl EncoderOptions {
    pub fn new(trellis: Trellis, block_len: usize) -> Self {
        EncoderOptions {
            trellis,
            block_len,
            termination: Termination::default(),
        }
    }

    pub fn termination(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }
}

/// Options replaceable after construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoderOptions {
    pub algorithm: DecoderAlgorithm,
}

impl DecoderOptions {
    pub fn algorithm(mut self, algorithm: DecoderAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

/// Immutable convolutional code structure plus its decoder options.
#[derive(Debug, Clone)]
pub struct Structure {
    trellis: Trellis,
    block_len: usize,
    termination: Termination,
    tail_size: usize,
    decoder: DecoderOptions,
}

impl Structure {
    pub fn new(encoder: EncoderOptions, decoder: DecoderOptions) -> Result<Self, CodecError> {
        if encoder.block_len == 0 {
            return Err(CodecError::invalid_option("block length must be >= 1"));
        }
        let tail_size = match encoder.termination {
            Termination::ZeroTail => encoder.trellis.memory(),
            Termination::Truncation => 0,
        };
        Ok(Structure {
            trellis: encoder.trellis,
            block_len: encoder.block_len,
            termination: encoder.termination,
            tail_size,
            decoder,
        })
    }

    pub fn with_encoder(encoder: EncoderOptions) -> Result<Self, CodecError> {
        Self::new(encoder, DecoderOptions::default())
    }

    pub fn trellis(&self) -> &Trellis {
        &self.trellis
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Tail steps appended for termination (zero under truncation).
    pub fn tail_size(&self) -> usize {
        self.tail_size
    }

    /// Trellis sections per block, tail included.
    pub(crate) fn steps(&self) -> usize {
        self.block_len + self.tail_size
    }

    pub fn msg_size(&self) -> usize {
        self.block_len * self.trellis.input_size()
    }

    pub fn parity_size(&self) -> usize {
        self.steps() * self.trellis.output_size()
    }

    /// Extrinsic information covers the tail bits as well.
    pub fn extrinsic_size(&self) -> usize {
        self.steps() * self.trellis.input_size()
    }

    pub fn decoder_options(&self) -> DecoderOptions {
        self.decoder
    }

    pub fn set_decoder_options(&mut self, decoder: DecoderOptions) {
        self.decoder = decoder;
    }

    /// Encode one block, returning the tail input bits packed LSB-first
    /// (the turbo layer transmits them as systematic tail bits).
    pub(crate) fn encode_block<M: BitStore, P: BitStore>(
        &self,
        message: &BitSlice<M, Lsb0>,
        parity: &mut BitSlice<P, Lsb0>,
    ) -> u64 {
        let k = self.trellis.input_size();
        let n = self.trellis.output_size();
        debug_assert_eq!(message.len(), self.msg_size());
        debug_assert_eq!(parity.len(), self.parity_size());
        debug_assert!(self.tail_size * k <= u64::BITS as usize);

        let mut state = 0usize;
        for t in 0..self.block_len {
            let input = read_symbol(message, t * k, k);
            write_symbol(parity, t * n, n, self.trellis.output(state, input));
            state = self.trellis.next_state(state, input);
        }
        let mut tail = 0u64;
        for t in 0..self.tail_size {
            let input = self.trellis.tail_input(state);
            tail |= (input as u64) << (t * k);
            write_symbol(
                parity,
                (self.block_len + t) * n,
                n,
                self.trellis.output(state, input),
            );
            state = self.trellis.next_state(state, input);
        }
        debug_assert!(self.termination == Termination::Truncation || state == 0);
        tail
    }

    /// True when the hard parity bits form a valid trellis path. Tracks
    /// the set of states consistent with every observed output symbol.
    pub(crate) fn check_block<P: BitStore>(&self, parity: &BitSlice<P, Lsb0>) -> bool {
        let n = self.trellis.output_size();
        let mut reachable = vec![false; self.trellis.state_count()];
        let mut next = vec![false; self.trellis.state_count()];
        reachable[0] = true;
        for t in 0..self.steps() {
            let symbol = read_symbol(parity, t * n, n);
            next.fill(false);
            let mut any = false;
            for (state, &ok) in reachable.iter().enumerate() {
                if !ok {
                    continue;
                }
                for input in 0..self.trellis.input_count() {
                    if self.trellis.output(state, input) == symbol {
                        next[self.trellis.next_state(state, input)] = true;
                        any = true;
                    }
                }
            }
            if !any {
                return false;
            }
            std::mem::swap(&mut reachable, &mut next);
        }
        match self.termination {
            Termination::ZeroTail => reachable[0],
            Termination::Truncation => true,
        }
    }

    pub(crate) fn create_decoder(&self) -> Decoder {
        Decoder {
            viterbi: ViterbiDecoder::new(&self.trellis, self.steps(), self.termination),
            map: MapDecoder::new(self.trellis.clone(), self.steps(), self.termination),
            posterior: vec![0.0; self.extrinsic_size()],
        }
    }
}

/// Per-worker decoding scratch for one convolutional structure.
#[derive(Debug)]
pub(crate) struct Decoder {
    viterbi: ViterbiDecoder,
    map: MapDecoder,
    posterior: Vec<Llr>,
}

impl Decoder {
    /// Hard decision on one block of parity L-values.
    pub(crate) fn decode_block<M: BitStore>(
        &mut self,
        structure: &Structure,
        parity: &[Llr],
        message: &mut BitSlice<M, Lsb0>,
    ) {
        self.viterbi
            .decode(structure.trellis(), structure.block_len(), parity, message);
    }

    /// MAP decode one block: a-posteriori L-values for the message bits
    /// and extrinsic L-values for message plus tail.
    pub(crate) fn soft_decode_block(
        &mut self,
        structure: &Structure,
        parity: &[Llr],
        extrinsic_in: Option<&[Llr]>,
        message_out: &mut [Llr],
        extrinsic_out: Option<&mut [Llr]>,
    ) {
        self.map.decode(
            structure.decoder.algorithm,
            parity,
            None,
            extrinsic_in,
            &mut self.posterior,
            extrinsic_out,
        );
        let msg_size = structure.msg_size();
        message_out.copy_from_slice(&self.posterior[..msg_size]);
        for value in message_out.iter_mut() {
            *value = saturate(*value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::{bits_from_str, bits_to_string};
    use crate::llr::slice;

    fn structure(termination: Termination) -> Structure {
        let trellis = Trellis::feed_forward(3, &[0o5, 0o7]).unwrap();
        Structure::with_encoder(
            EncoderOptions::new(trellis, 10).termination(termination),
        )
        .unwrap()
    }

    #[test]
    fn encodes_the_reference_block() {
        let s = structure(Termination::Truncation);
        let message = bits_from_str("0110100001");
        let mut parity = bitvec![u8, Lsb0; 0; s.parity_size()];
        s.encode_block(&message, &mut parity);
        assert_eq!(bits_to_string(&parity), "00111010000111000011");
    }

    #[test]
    fn encodes_the_reference_tail() {
        let trellis = Trellis::feed_forward(3, &[0o5, 0o7]).unwrap();
        let s = Structure::with_encoder(
            EncoderOptions::new(trellis, 1).termination(Termination::ZeroTail),
        )
        .unwrap();
        let message = bits_from_str("1");
        let mut parity = bitvec![u8, Lsb0; 0; s.parity_size()];
        let tail = s.encode_block(&message, &mut parity);
        assert_eq!(bits_to_string(&parity), "110111");
        assert_eq!(tail, 0);
    }

    #[test]
    fn viterbi_recovers_a_clean_block() {
        for termination in [Termination::Truncation, Termination::ZeroTail] {
            let s = structure(termination);
            let message = bits_from_str("1101001110");
            let mut parity = bitvec![u8, Lsb0; 0; s.parity_size()];
            s.encode_block(&message, &mut parity);

            let channel: Vec<Llr> = parity.iter().map(|b| if *b { 4.0 } else { -4.0 }).collect();
            let mut decoder = s.create_decoder();
            let mut decoded = bitvec![u8, Lsb0; 0; s.msg_size()];
            decoder.decode_block(&s, &channel, &mut decoded);
            assert_eq!(decoded, message, "{termination:?}");
        }
    }

    #[test]
    fn map_and_viterbi_agree_on_a_clean_block() {
        let mut s = structure(Termination::ZeroTail);
        s.set_decoder_options(DecoderOptions::default().algorithm(DecoderAlgorithm::Exact));
        let message = bits_from_str("0111010010");
        let mut parity = bitvec![u8, Lsb0; 0; s.parity_size()];
        s.encode_block(&message, &mut parity);

        let channel: Vec<Llr> = parity.iter().map(|b| if *b { 3.0 } else { -3.0 }).collect();
        let mut decoder = s.create_decoder();
        let mut hard = bitvec![u8, Lsb0; 0; s.msg_size()];
        decoder.decode_block(&s, &channel, &mut hard);

        let mut soft = vec![0.0; s.msg_size()];
        decoder.soft_decode_block(&s, &channel, None, &mut soft, None);
        for (i, value) in soft.iter().enumerate() {
            assert_eq!(slice(*value), hard[i], "bit {i}");
        }
    }

    #[test]
    fn check_accepts_codewords_and_rejects_noise() {
        let s = structure(Termination::ZeroTail);
        let message = bits_from_str("1010011011");
        let mut parity = bitvec![u8, Lsb0; 0; s.parity_size()];
        s.encode_block(&message, &mut parity);
        assert!(s.check_block(&parity));
        let flipped = !parity[3];
        parity.set(3, flipped);
        assert!(!s.check_block(&parity));
    }
}
