//! Turbo codec
//!
//! Parallel concatenation of recursive convolutional codes behind
//! interleavers. The parity layout of one block is
//!
//! `| syst | systTail_1 .. systTail_C | parity_1 | parity_2 | .. |`
//!
//! where `parity_i` is constituent `i`'s convolutional parity (message part
//! followed by tail part) and `systTail_i` are its tail input bits.
//!
//! The iterative decoder runs one MAP decoder per constituent and exchanges
//! extrinsic L-values through the interleavers, either serially (each
//! constituent feeds the next) or in parallel (all constituents read one
//! snapshot, their outputs are averaged). The extrinsic buffer layout is
//! `| msg | tail_1 .. tail_C |` for serial scheduling and
//! `| msg_1 | tail_1 | .. | msg_C | tail_C |` for parallel scheduling, with
//! message parts in the de-interleaved domain.

use bitvec::prelude::*;
use tracing::trace;

use crate::convolutional;
use crate::convolutional::Termination;
use crate::error::CodecError;
use crate::llr::{saturate, slice, DecoderAlgorithm, Llr};
use crate::map_decoder::MapDecoder;
use crate::permutation::Permutation;
use crate::trellis::Trellis;

/// Extrinsic exchange order between the constituent decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheduling {
    /// Each constituent hands its extrinsic output to the next one.
    #[default]
    Serial,
    /// Every constituent reads the same snapshot; the outputs are combined
    /// and scaled by `1/C`, as in LDPC flooding.
    Parallel,
}

/// Ordering of the bits selected by a puncturing permutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitOrdering {
    /// Systematic and parity bits alternate step by step.
    #[default]
    Alternate,
    /// Systematic bits first, then each constituent's parity as a group.
    Group,
}

/// Options fixed at construction.
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    pub trellises: Vec<Trellis>,
    pub interleavers: Vec<Permutation>,
    pub terminations: Vec<Termination>,
}

impl EncoderOptions {
    /// One shared trellis for every constituent.
    pub fn new(trellis: Trellis, interleavers: Vec<Permutation>) -> Self {
        let trellises = vec![trellis; interleavers.len()];
        EncoderOptions {
            trellises,
            interleavers,
            terminations: vec![Termination::ZeroTail],
        }
    }

    pub fn with_trellises(trellises: Vec<Trellis>, interleavers: Vec<Permutation>) -> Self {
        EncoderOptions {
            trellises,
            interleavers,
            terminations: vec![Termination::ZeroTail],
        }
    }

    /// One termination for every constituent.
    pub fn termination(mut self, termination: Termination) -> Self {
        self.terminations = vec![termination];
        self
    }

    pub fn terminations(mut self, terminations: Vec<Termination>) -> Self {
        self.terminations = terminations;
        self
    }
}

/// Options replaceable after construction.
#[derive(Debug, Clone, Copy)]
pub struct DecoderOptions {
    pub iterations: usize,
    pub scheduling: Scheduling,
    pub algorithm: DecoderAlgorithm,
    pub gain: f64,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions {
            iterations: 6,
            scheduling: Scheduling::default(),
            algorithm: DecoderAlgorithm::default(),
            gain: 1.0,
        }
    }
}

impl DecoderOptions {
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn scheduling(mut self, scheduling: Scheduling) -> Self {
        self.scheduling = scheduling;
        self
    }

    pub fn algorithm(mut self, algorithm: DecoderAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }
}

/// Puncture masks, cyclically applied over each constituent's parity.
/// An empty mask keeps every bit; systematic bits are always kept.
#[derive(Debug, Clone, Default)]
pub struct PunctureOptions {
    pub mask: Vec<Vec<bool>>,
    pub tail_mask: Vec<Vec<bool>>,
    pub bit_ordering: BitOrdering,
}

impl PunctureOptions {
    pub fn mask(mut self, mask: Vec<Vec<bool>>) -> Self {
        self.mask = mask;
        self
    }

    pub fn tail_mask(mut self, tail_mask: Vec<Vec<bool>>) -> Self {
        self.tail_mask = tail_mask;
        self
    }

    pub fn bit_ordering(mut self, ordering: BitOrdering) -> Self {
        self.bit_ordering = ordering;
        self
    }
}

/// Turbo code structure: the constituent convolutional structures, their
/// interleavers, and the decoder options.
#[derive(Debug, Clone)]
pub struct Structure {
    constituents: Vec<convolutional::Structure>,
    interleavers: Vec<Permutation>,
    msg_size: usize,
    decoder: DecoderOptions,
}

impl Structure {
    pub fn new(encoder: EncoderOptions, decoder: DecoderOptions) -> Result<Self, CodecError> {
        if encoder.trellises.is_empty() {
            return Err(CodecError::invalid_option("empty constituent list"));
        }
        if encoder.trellises.len() != encoder.interleavers.len() {
            return Err(CodecError::invalid_option(format!(
                "{} trellises with {} interleavers",
                encoder.trellises.len(),
                encoder.interleavers.len()
            )));
        }
        let terminations = match encoder.terminations.len() {
            1 => vec![encoder.terminations[0]; encoder.trellises.len()],
            l if l == encoder.trellises.len() => encoder.terminations.clone(),
            l => {
                return Err(CodecError::invalid_option(format!(
                    "{} terminations for {} constituents",
                    l,
                    encoder.trellises.len()
                )))
            }
        };
        if decoder.gain <= 0.0 {
            return Err(CodecError::invalid_option("gain must be positive"));
        }

        let msg_size = encoder.interleavers[0].input_size();
        for (i, interleaver) in encoder.interleavers.iter().enumerate() {
            if !interleaver.is_bijective() || interleaver.input_size() != msg_size {
                return Err(CodecError::invalid_option(format!(
                    "interleaver {i} is not a bijection over {msg_size} message bits"
                )));
            }
        }

        let mut constituents = Vec::with_capacity(encoder.trellises.len());
        for ((trellis, interleaver), termination) in encoder
            .trellises
            .into_iter()
            .zip(&encoder.interleavers)
            .zip(terminations)
        {
            let k = trellis.input_size();
            if interleaver.output_size() % k != 0 {
                return Err(CodecError::invalid_option(
                    "interleaver length is not a whole number of input symbols",
                ));
            }
            let block_len = interleaver.output_size() / k;
            constituents.push(convolutional::Structure::with_encoder(
                convolutional::EncoderOptions::new(trellis, block_len).termination(termination),
            )?);
        }

        Ok(Structure {
            constituents,
            interleavers: encoder.interleavers,
            msg_size,
            decoder,
        })
    }

    pub fn with_encoder(encoder: EncoderOptions) -> Result<Self, CodecError> {
        Self::new(encoder, DecoderOptions::default())
    }

    pub fn constituents(&self) -> &[convolutional::Structure] {
        &self.constituents
    }

    pub fn interleavers(&self) -> &[Permutation] {
        &self.interleavers
    }

    pub fn constituent_count(&self) -> usize {
        self.constituents.len()
    }

    pub fn msg_size(&self) -> usize {
        self.msg_size
    }

    /// Total number of transmitted tail input bits.
    pub fn syst_tail_size(&self) -> usize {
        self.constituents
            .iter()
            .map(|c| c.tail_size() * c.trellis().input_size())
            .sum()
    }

    pub fn parity_size(&self) -> usize {
        self.msg_size
            + self.syst_tail_size()
            + self
                .constituents
                .iter()
                .map(|c| c.parity_size())
                .sum::<usize>()
    }

    pub fn extrinsic_size(&self) -> usize {
        match self.decoder.scheduling {
            Scheduling::Serial => self.msg_size + self.syst_tail_size(),
            Scheduling::Parallel => self
                .constituents
                .iter()
                .map(|c| self.msg_size + c.tail_size() * c.trellis().input_size())
                .sum(),
        }
    }

    pub fn iterations(&self) -> usize {
        self.decoder.iterations
    }

    pub fn scheduling(&self) -> Scheduling {
        self.decoder.scheduling
    }

    pub fn decoder_options(&self) -> DecoderOptions {
        self.decoder
    }

    pub fn set_decoder_options(&mut self, decoder: DecoderOptions) {
        self.decoder = decoder;
    }

    fn tail_bit_count(&self, i: usize) -> usize {
        self.constituents[i].tail_size() * self.constituents[i].trellis().input_size()
    }

    /// Offset of constituent `i`'s systematic tail bits inside the parity.
    fn syst_tail_offset(&self, i: usize) -> usize {
        self.msg_size
            + (0..i)
                .map(|j| self.tail_bit_count(j))
                .sum::<usize>()
    }

    /// Offset of constituent `i`'s parity segment inside the parity.
    fn parity_offset(&self, i: usize) -> usize {
        self.msg_size
            + self.syst_tail_size()
            + self.constituents[..i]
                .iter()
                .map(|c| c.parity_size())
                .sum::<usize>()
    }

    pub(crate) fn encode_block<M: BitStore, P: BitStore>(
        &self,
        message: &BitSlice<M, Lsb0>,
        parity: &mut BitSlice<P, Lsb0>,
    ) {
        debug_assert_eq!(message.len(), self.msg_size);
        debug_assert_eq!(parity.len(), self.parity_size());

        for j in 0..self.msg_size {
            parity.set(j, message[j]);
        }
        let mut interleaved = BitVec::<u8, Lsb0>::repeat(false, self.msg_size);
        for (i, (constituent, interleaver)) in
            self.constituents.iter().zip(&self.interleavers).enumerate()
        {
            for (j, &src) in interleaver.indices().iter().enumerate() {
                interleaved.set(j, message[src]);
            }
            let offset = self.parity_offset(i);
            let tail = constituent.encode_block(
                &interleaved,
                &mut parity[offset..offset + constituent.parity_size()],
            );
            let tail_offset = self.syst_tail_offset(i);
            for b in 0..self.tail_bit_count(i) {
                parity.set(tail_offset + b, (tail >> b) & 1 == 1);
            }
        }
    }

    /// True when the parity block re-encodes from its own systematic bits.
    pub(crate) fn check_block<P: BitStore>(&self, parity: &BitSlice<P, Lsb0>) -> bool {
        let mut message = BitVec::<u8, Lsb0>::repeat(false, self.msg_size);
        for j in 0..self.msg_size {
            message.set(j, parity[j]);
        }
        let mut expected = BitVec::<u8, Lsb0>::repeat(false, self.parity_size());
        self.encode_block(&message, &mut expected);
        expected.iter().zip(parity.iter()).all(|(a, b)| *a == *b)
    }

    /// Puncturing permutation over one parity block.
    pub fn puncturing(&self, options: &PunctureOptions) -> Result<Permutation, CodecError> {
        let count = self.constituent_count();
        if options.mask.len() > count || options.tail_mask.len() > count {
            return Err(CodecError::invalid_option(
                "more puncture masks than constituents",
            ));
        }
        let keep_at = |mask: Option<&Vec<bool>>, index: usize| -> bool {
            match mask {
                Some(m) if !m.is_empty() => m[index % m.len()],
                _ => true,
            }
        };

        let mut indices = Vec::new();
        match options.bit_ordering {
            BitOrdering::Group => {
                indices.extend(0..self.msg_size + self.syst_tail_size());
                for i in 0..count {
                    let c = &self.constituents[i];
                    let n = c.trellis().output_size();
                    let offset = self.parity_offset(i);
                    let msg_bits = c.block_len() * n;
                    for b in 0..msg_bits {
                        if keep_at(options.mask.get(i), b) {
                            indices.push(offset + b);
                        }
                    }
                    for b in 0..c.tail_size() * n {
                        if keep_at(options.tail_mask.get(i), b) {
                            indices.push(offset + msg_bits + b);
                        }
                    }
                }
            }
            BitOrdering::Alternate => {
                // Step by step: the systematic bit, then every constituent's
                // kept parity bits for that step.
                for t in 0..self.msg_size {
                    indices.push(t);
                    for i in 0..count {
                        let c = &self.constituents[i];
                        let n = c.trellis().output_size();
                        let offset = self.parity_offset(i);
                        for j in 0..n {
                            let b = t * n + j;
                            if keep_at(options.mask.get(i), b) {
                                indices.push(offset + b);
                            }
                        }
                    }
                }
                // Tails: input bits then kept output bits, per constituent.
                for i in 0..count {
                    let c = &self.constituents[i];
                    let n = c.trellis().output_size();
                    let k = c.trellis().input_size();
                    let offset = self.parity_offset(i);
                    let msg_bits = c.block_len() * n;
                    for t in 0..c.tail_size() {
                        for j in 0..k {
                            indices.push(self.syst_tail_offset(i) + t * k + j);
                        }
                        for j in 0..n {
                            let b = t * n + j;
                            if keep_at(options.tail_mask.get(i), b) {
                                indices.push(offset + msg_bits + b);
                            }
                        }
                    }
                }
            }
        }
        Permutation::new(indices, self.parity_size())
    }

    pub(crate) fn create_decoder(&self) -> Decoder {
        let maps = self
            .constituents
            .iter()
            .map(|c| MapDecoder::new(c.trellis().clone(), c.steps(), c.termination()))
            .collect();
        let max_bits = self
            .constituents
            .iter()
            .map(|c| c.extrinsic_size())
            .max()
            .unwrap_or(0);
        Decoder {
            maps,
            working: vec![0.0; self.msg_size],
            apriori: vec![0.0; max_bits],
            syst: vec![0.0; max_bits],
            posterior: vec![0.0; max_bits],
            extrinsic: vec![0.0; max_bits],
            msg_llr: vec![0.0; self.msg_size],
            tails: (0..self.constituent_count())
                .map(|i| vec![0.0; self.tail_bit_count(i)])
                .collect(),
            ext_msg: vec![vec![0.0; self.msg_size]; self.constituent_count()],
        }
    }
}

/// Per-worker decoding scratch: one MAP decoder per constituent plus the
/// L-value buffers the iterations cycle through.
#[derive(Debug)]
pub(crate) struct Decoder {
    maps: Vec<MapDecoder>,
    working: Vec<Llr>,
    apriori: Vec<Llr>,
    syst: Vec<Llr>,
    posterior: Vec<Llr>,
    extrinsic: Vec<Llr>,
    msg_llr: Vec<Llr>,
    tails: Vec<Vec<Llr>>,
    ext_msg: Vec<Vec<Llr>>,
}

impl Decoder {
    pub(crate) fn decode_block<M: BitStore>(
        &mut self,
        structure: &Structure,
        parity: &[Llr],
        message: &mut BitSlice<M, Lsb0>,
    ) {
        let mut msg_llr = std::mem::take(&mut self.msg_llr);
        self.soft_decode_block(structure, parity, None, &mut msg_llr, None);
        for (j, &value) in msg_llr.iter().enumerate() {
            message.set(j, slice(value));
        }
        self.msg_llr = msg_llr;
    }

    pub(crate) fn soft_decode_block(
        &mut self,
        structure: &Structure,
        parity: &[Llr],
        extrinsic_in: Option<&[Llr]>,
        message_out: &mut [Llr],
        extrinsic_out: Option<&mut [Llr]>,
    ) {
        match structure.decoder.scheduling {
            Scheduling::Serial => {
                self.serial_decode(structure, parity, extrinsic_in, message_out, extrinsic_out)
            }
            Scheduling::Parallel => {
                self.parallel_decode(structure, parity, extrinsic_in, message_out, extrinsic_out)
            }
        }
    }

    /// Run constituent `i`'s MAP decoder against the working a-priori in
    /// its interleaved domain. The extrinsic result is left in
    /// `self.extrinsic`, the posterior in `self.posterior`.
    fn run_constituent(&mut self, structure: &Structure, parity: &[Llr], i: usize) {
        let msg_size = structure.msg_size;
        let c = &structure.constituents[i];
        let pi = structure.interleavers[i].indices();
        let tail_bits = structure.tail_bit_count(i);
        let bits = msg_size + tail_bits;
        let syst_llr = &parity[..msg_size];
        let tail_syst = &parity[structure.syst_tail_offset(i)..][..tail_bits];
        let parity_seg = &parity[structure.parity_offset(i)..][..c.parity_size()];

        for (j, &src) in pi.iter().enumerate() {
            self.apriori[j] = self.working[src];
            self.syst[j] = saturate(syst_llr[src]);
        }
        for t in 0..tail_bits {
            self.apriori[msg_size + t] = self.tails[i][t];
            self.syst[msg_size + t] = saturate(tail_syst[t]);
        }
        self.maps[i].decode(
            structure.decoder.algorithm,
            parity_seg,
            Some(&self.syst[..bits]),
            Some(&self.apriori[..bits]),
            &mut self.posterior[..bits],
            Some(&mut self.extrinsic[..bits]),
        );
    }

    fn serial_decode(
        &mut self,
        structure: &Structure,
        parity: &[Llr],
        extrinsic_in: Option<&[Llr]>,
        message_out: &mut [Llr],
        extrinsic_out: Option<&mut [Llr]>,
    ) {
        let msg_size = structure.msg_size;
        let count = structure.constituent_count();
        let gain = structure.decoder.gain;
        let iterations = structure.decoder.iterations;

        match extrinsic_in {
            Some(input) => {
                self.working.copy_from_slice(&input[..msg_size]);
                let mut offset = msg_size;
                for i in 0..count {
                    let bits = structure.tail_bit_count(i);
                    self.tails[i].copy_from_slice(&input[offset..offset + bits]);
                    offset += bits;
                }
            }
            None => {
                self.working.fill(0.0);
                for tail in &mut self.tails {
                    tail.fill(0.0);
                }
            }
        }

        for iteration in 0..iterations {
            for i in 0..count {
                self.run_constituent(structure, parity, i);
                let pi = structure.interleavers[i].indices();
                for (j, &src) in pi.iter().enumerate() {
                    self.working[src] = saturate(gain * self.extrinsic[j]);
                }
                for t in 0..structure.tail_bit_count(i) {
                    self.tails[i][t] = saturate(gain * self.extrinsic[msg_size + t]);
                }
                if iteration + 1 == iterations && i + 1 == count {
                    for (j, &src) in pi.iter().enumerate() {
                        message_out[src] = self.posterior[j];
                    }
                }
            }
            trace!(iteration, "turbo serial iteration complete");
        }
        if iterations == 0 {
            for j in 0..msg_size {
                message_out[j] = saturate(saturate(parity[j]) + self.working[j]);
            }
        }

        if let Some(out) = extrinsic_out {
            out[..msg_size].copy_from_slice(&self.working);
            let mut offset = msg_size;
            for i in 0..count {
                let bits = structure.tail_bit_count(i);
                out[offset..offset + bits].copy_from_slice(&self.tails[i]);
                offset += bits;
            }
        }
    }

    fn parallel_decode(
        &mut self,
        structure: &Structure,
        parity: &[Llr],
        extrinsic_in: Option<&[Llr]>,
        message_out: &mut [Llr],
        extrinsic_out: Option<&mut [Llr]>,
    ) {
        let msg_size = structure.msg_size;
        let count = structure.constituent_count();
        let gain = structure.decoder.gain;
        let iterations = structure.decoder.iterations;

        match extrinsic_in {
            Some(input) => {
                let mut offset = 0;
                for i in 0..count {
                    self.ext_msg[i].copy_from_slice(&input[offset..offset + msg_size]);
                    offset += msg_size;
                    let bits = structure.tail_bit_count(i);
                    self.tails[i].copy_from_slice(&input[offset..offset + bits]);
                    offset += bits;
                }
            }
            None => {
                for i in 0..count {
                    self.ext_msg[i].fill(0.0);
                    self.tails[i].fill(0.0);
                }
            }
        }

        for iteration in 0..iterations {
            // Shared snapshot: scaled combination of the previous outputs.
            for j in 0..msg_size {
                let sum: Llr = self.ext_msg.iter().map(|e| e[j]).sum();
                self.working[j] = saturate(gain * sum / count as Llr);
            }
            for i in 0..count {
                self.run_constituent(structure, parity, i);
                let pi = structure.interleavers[i].indices();
                for (j, &src) in pi.iter().enumerate() {
                    self.ext_msg[i][src] = saturate(self.extrinsic[j]);
                }
                for t in 0..structure.tail_bit_count(i) {
                    self.tails[i][t] = saturate(gain * self.extrinsic[msg_size + t]);
                }
            }
            trace!(iteration, "turbo parallel iteration complete");
        }

        for j in 0..msg_size {
            let sum: Llr = self.ext_msg.iter().map(|e| e[j]).sum();
            message_out[j] = saturate(saturate(parity[j]) + sum);
        }

        if let Some(out) = extrinsic_out {
            let mut offset = 0;
            for i in 0..count {
                out[offset..offset + msg_size].copy_from_slice(&self.ext_msg[i]);
                offset += msg_size;
                let bits = structure.tail_bit_count(i);
                out[offset..offset + bits].copy_from_slice(&self.tails[i]);
                offset += bits;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::bits_from_str;

    fn two_constituent_structure(iterations: usize, scheduling: Scheduling) -> Structure {
        // Parity generator only; the systematic bits come from the turbo
        // layer itself.
        let trellis = Trellis::recursive(4, &[0o15], 0o13).unwrap();
        let second = Permutation::new(vec![5, 2, 7, 0, 4, 1, 6, 3], 8).unwrap();
        Structure::new(
            EncoderOptions::new(trellis, vec![Permutation::identity(8), second]),
            DecoderOptions::default()
                .iterations(iterations)
                .scheduling(scheduling)
                .algorithm(DecoderAlgorithm::Exact),
        )
        .unwrap()
    }

    #[test]
    fn parity_layout_starts_with_the_systematic_bits() {
        let s = two_constituent_structure(4, Scheduling::Serial);
        let message = bits_from_str("10110010");
        let mut parity = bitvec![u8, Lsb0; 0; s.parity_size()];
        s.encode_block(&message, &mut parity);
        assert_eq!(&parity[..8], &message[..]);
        // Both constituents terminated: 3 tail bits each.
        assert_eq!(s.syst_tail_size(), 6);
        assert_eq!(s.parity_size(), 8 + 6 + 2 * 11);
    }

    #[test]
    fn zero_iterations_slices_the_systematic_channel() {
        let s = two_constituent_structure(0, Scheduling::Serial);
        let parity: Vec<Llr> = (0..s.parity_size())
            .map(|i| if i % 3 == 0 { 2.0 } else { -1.5 })
            .collect();
        let mut decoder = s.create_decoder();
        let mut msg = vec![0.0; s.msg_size()];
        decoder.soft_decode_block(&s, &parity, None, &mut msg, None);
        for j in 0..s.msg_size() {
            assert_eq!(msg[j], parity[j]);
        }
    }

    #[test]
    fn serial_decoder_recovers_a_clean_block() {
        let s = two_constituent_structure(4, Scheduling::Serial);
        let message = bits_from_str("10110010");
        let mut parity = bitvec![u8, Lsb0; 0; s.parity_size()];
        s.encode_block(&message, &mut parity);
        let channel: Vec<Llr> = parity.iter().map(|b| if *b { 2.0 } else { -2.0 }).collect();

        let mut decoder = s.create_decoder();
        let mut decoded = bitvec![u8, Lsb0; 0; s.msg_size()];
        decoder.decode_block(&s, &channel, &mut decoded);
        assert_eq!(decoded, message);
    }

    #[test]
    fn parallel_decoder_recovers_a_clean_block() {
        let s = two_constituent_structure(4, Scheduling::Parallel);
        let message = bits_from_str("01101001");
        let mut parity = bitvec![u8, Lsb0; 0; s.parity_size()];
        s.encode_block(&message, &mut parity);
        let channel: Vec<Llr> = parity.iter().map(|b| if *b { 2.0 } else { -2.0 }).collect();

        let mut decoder = s.create_decoder();
        let mut decoded = bitvec![u8, Lsb0; 0; s.msg_size()];
        decoder.decode_block(&s, &channel, &mut decoded);
        assert_eq!(decoded, message);
    }

    #[test]
    fn check_block_validates_reencoding() {
        let s = two_constituent_structure(1, Scheduling::Serial);
        let message = bits_from_str("11001010");
        let mut parity = bitvec![u8, Lsb0; 0; s.parity_size()];
        s.encode_block(&message, &mut parity);
        assert!(s.check_block(&parity));
        let flipped = !parity[12];
        parity.set(12, flipped);
        assert!(!s.check_block(&parity));
    }

    #[test]
    fn group_puncturing_keeps_systematic_bits() {
        let s = two_constituent_structure(1, Scheduling::Serial);
        // Drop every second parity bit of both constituents.
        let options = PunctureOptions::default()
            .mask(vec![vec![true, false], vec![true, false]])
            .bit_ordering(BitOrdering::Group);
        let p = s.puncturing(&options).unwrap();
        assert!(p.output_size() < s.parity_size());
        // The first msg + systTail indices are identity.
        for j in 0..s.msg_size() + s.syst_tail_size() {
            assert_eq!(p.indices()[j], j);
        }
    }
}
