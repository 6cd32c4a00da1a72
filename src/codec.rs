//! Codec façade and block-parallel harness
//!
//! A [`Codec`] wraps one code [`Structure`] (a tagged variant over the
//! three code families) and runs the per-block primitives over batches.
//! Batches are split into at most `work_group_size` contiguous chunks of
//! `ceil(blocks / workers)` blocks; the last chunk absorbs the remainder.
//! Each chunk runs on its own rayon task with its own decoder scratch and
//! writes only its own output slice, so the output is identical for every
//! work group size.
//!
//! Shape violations are reported before anything is dispatched. Decoder
//! options can be replaced between batches through `&mut self`; encoder
//! options are fixed at construction.

use bitvec::prelude::*;

use crate::convolutional;
use crate::error::CodecError;
use crate::ldpc;
use crate::llr::Llr;
use crate::permutation::Permutation;
use crate::turbo;

/// Code structure of one family, owned by value.
#[derive(Debug, Clone)]
pub enum Structure {
    Convolutional(convolutional::Structure),
    Turbo(turbo::Structure),
    Ldpc(ldpc::Structure),
}

impl From<convolutional::Structure> for Structure {
    fn from(structure: convolutional::Structure) -> Self {
        Structure::Convolutional(structure)
    }
}

impl From<turbo::Structure> for Structure {
    fn from(structure: turbo::Structure) -> Self {
        Structure::Turbo(structure)
    }
}

impl From<ldpc::Structure> for Structure {
    fn from(structure: ldpc::Structure) -> Self {
        Structure::Ldpc(structure)
    }
}

impl Structure {
    /// Message bits per block.
    pub fn msg_size(&self) -> usize {
        match self {
            Structure::Convolutional(s) => s.msg_size(),
            Structure::Turbo(s) => s.msg_size(),
            Structure::Ldpc(s) => s.msg_size(),
        }
    }

    /// Parity bits (encode) or channel L-values (decode) per block.
    pub fn parity_size(&self) -> usize {
        match self {
            Structure::Convolutional(s) => s.parity_size(),
            Structure::Turbo(s) => s.parity_size(),
            Structure::Ldpc(s) => s.parity_size(),
        }
    }

    /// Extrinsic L-values per block under the current decoder options.
    pub fn extrinsic_size(&self) -> usize {
        match self {
            Structure::Convolutional(s) => s.extrinsic_size(),
            Structure::Turbo(s) => s.extrinsic_size(),
            Structure::Ldpc(s) => s.extrinsic_size(),
        }
    }

    fn encode_block<M: BitStore, P: BitStore>(
        &self,
        message: &BitSlice<M, Lsb0>,
        parity: &mut BitSlice<P, Lsb0>,
    ) {
        match self {
            Structure::Convolutional(s) => {
                s.encode_block(message, parity);
            }
            Structure::Turbo(s) => s.encode_block(message, parity),
            Structure::Ldpc(s) => s.encode_block(message, parity),
        }
    }

    fn check_block<P: BitStore>(&self, parity: &BitSlice<P, Lsb0>) -> bool {
        match self {
            Structure::Convolutional(s) => s.check_block(parity),
            Structure::Turbo(s) => s.check_block(parity),
            Structure::Ldpc(s) => s.check_block(parity),
        }
    }

    fn create_decoder(&self) -> BlockDecoder {
        match self {
            Structure::Convolutional(s) => BlockDecoder::Convolutional(s.create_decoder()),
            Structure::Turbo(s) => BlockDecoder::Turbo(s.create_decoder()),
            Structure::Ldpc(s) => BlockDecoder::Ldpc(s.create_decoder()),
        }
    }
}

/// Per-worker decoding scratch for any structure variant.
enum BlockDecoder {
    Convolutional(convolutional::Decoder),
    Turbo(turbo::Decoder),
    Ldpc(ldpc::Decoder),
}

impl BlockDecoder {
    fn decode_block<M: BitStore>(
        &mut self,
        structure: &Structure,
        parity: &[Llr],
        message: &mut BitSlice<M, Lsb0>,
    ) {
        match (self, structure) {
            (BlockDecoder::Convolutional(d), Structure::Convolutional(s)) => {
                d.decode_block(s, parity, message)
            }
            (BlockDecoder::Turbo(d), Structure::Turbo(s)) => d.decode_block(s, parity, message),
            (BlockDecoder::Ldpc(d), Structure::Ldpc(s)) => d.decode_block(s, parity, message),
            _ => unreachable!("decoder does not match its structure"),
        }
    }

    fn soft_decode_block(
        &mut self,
        structure: &Structure,
        parity: &[Llr],
        extrinsic_in: &[Llr],
        message_out: &mut [Llr],
        extrinsic_out: &mut [Llr],
    ) {
        match (self, structure) {
            (BlockDecoder::Convolutional(d), Structure::Convolutional(s)) => d.soft_decode_block(
                s,
                parity,
                Some(extrinsic_in),
                message_out,
                Some(extrinsic_out),
            ),
            (BlockDecoder::Turbo(d), Structure::Turbo(s)) => d.soft_decode_block(
                s,
                parity,
                Some(extrinsic_in),
                message_out,
                Some(extrinsic_out),
            ),
            (BlockDecoder::Ldpc(d), Structure::Ldpc(s)) => d.soft_decode_block(
                s,
                parity,
                Some(extrinsic_in),
                message_out,
                Some(extrinsic_out),
            ),
            _ => unreachable!("decoder does not match its structure"),
        }
    }
}

/// Family-tagged decoder options for [`Codec::set_decoder_options`].
#[derive(Debug, Clone, Copy)]
pub enum DecoderOptions {
    Convolutional(convolutional::DecoderOptions),
    Turbo(turbo::DecoderOptions),
    Ldpc(ldpc::DecoderOptions),
}

/// Family-tagged puncture options for [`Codec::puncturing`].
#[derive(Debug, Clone)]
pub enum PunctureOptions {
    Turbo(turbo::PunctureOptions),
    Ldpc(ldpc::PunctureOptions),
}

/// Soft-decision batch output: a-posteriori message L-values and the
/// extrinsic values to feed into the next decoding attempt.
#[derive(Debug, Clone)]
pub struct SoftDecodeOutput {
    pub message: Vec<Llr>,
    pub extrinsic: Vec<Llr>,
}

/// Encoder / decoder over batches of fixed-size blocks.
#[derive(Debug, Clone)]
pub struct Codec {
    structure: Structure,
    work_group_size: usize,
}

impl Codec {
    pub fn new(structure: impl Into<Structure>) -> Self {
        Codec {
            structure: structure.into(),
            work_group_size: 4,
        }
    }

    /// Upper bound on the number of parallel workers per batch.
    pub fn with_work_group_size(mut self, work_group_size: usize) -> Self {
        self.work_group_size = work_group_size.max(1);
        self
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn work_group_size(&self) -> usize {
        self.work_group_size
    }

    pub fn msg_size(&self) -> usize {
        self.structure.msg_size()
    }

    pub fn parity_size(&self) -> usize {
        self.structure.parity_size()
    }

    pub fn extrinsic_size(&self) -> usize {
        self.structure.extrinsic_size()
    }

    pub fn decoder_options(&self) -> DecoderOptions {
        match &self.structure {
            Structure::Convolutional(s) => DecoderOptions::Convolutional(s.decoder_options()),
            Structure::Turbo(s) => DecoderOptions::Turbo(s.decoder_options()),
            Structure::Ldpc(s) => DecoderOptions::Ldpc(s.decoder_options()),
        }
    }

    /// Replace the decoder options. Encoder options are immutable; a batch
    /// in flight borrows the codec, so this cannot race one.
    pub fn set_decoder_options(&mut self, options: DecoderOptions) -> Result<(), CodecError> {
        match (&mut self.structure, options) {
            (Structure::Convolutional(s), DecoderOptions::Convolutional(o)) => {
                s.set_decoder_options(o)
            }
            (Structure::Turbo(s), DecoderOptions::Turbo(o)) => s.set_decoder_options(o),
            (Structure::Ldpc(s), DecoderOptions::Ldpc(o)) => s.set_decoder_options(o),
            _ => {
                return Err(CodecError::invalid_option(
                    "decoder options do not match the codec family",
                ))
            }
        }
        Ok(())
    }

    /// Permutation mapping one full parity block onto its transmitted
    /// subset.
    pub fn puncturing(&self, options: &PunctureOptions) -> Result<Permutation, CodecError> {
        match (&self.structure, options) {
            (Structure::Turbo(s), PunctureOptions::Turbo(o)) => s.puncturing(o),
            (Structure::Ldpc(s), PunctureOptions::Ldpc(o)) => s.puncturing(o),
            _ => Err(CodecError::invalid_option(
                "puncture options do not match the codec family",
            )),
        }
    }

    /// Encode a batch of message blocks into parity blocks.
    pub fn encode(&self, message: &BitSlice<u8, Lsb0>) -> Result<BitVec<u8, Lsb0>, CodecError> {
        let msg_size = self.msg_size();
        let parity_size = self.parity_size();
        let blocks = check_shape(message.len(), msg_size)?;
        let mut parity = BitVec::<u8, Lsb0>::repeat(false, blocks * parity_size);
        if blocks == 0 {
            return Ok(parity);
        }
        let step = self.chunk_blocks(blocks);
        let structure = &self.structure;
        rayon::scope(|scope| {
            for (message_chunk, parity_chunk) in message
                .chunks(step * msg_size)
                .zip(parity.chunks_mut(step * parity_size))
            {
                scope.spawn(move |_| {
                    for (message_block, parity_block) in message_chunk
                        .chunks(msg_size)
                        .zip(parity_chunk.chunks_mut(parity_size))
                    {
                        structure.encode_block(message_block, parity_block);
                    }
                });
            }
        });
        Ok(parity)
    }

    /// Hard-decision decode a batch of parity L-value blocks.
    pub fn decode(&self, parity: &[Llr]) -> Result<BitVec<u8, Lsb0>, CodecError> {
        let msg_size = self.msg_size();
        let parity_size = self.parity_size();
        let blocks = check_shape(parity.len(), parity_size)?;
        let mut message = BitVec::<u8, Lsb0>::repeat(false, blocks * msg_size);
        if blocks == 0 {
            return Ok(message);
        }
        let step = self.chunk_blocks(blocks);
        let structure = &self.structure;
        rayon::scope(|scope| {
            for (parity_chunk, message_chunk) in parity
                .chunks(step * parity_size)
                .zip(message.chunks_mut(step * msg_size))
            {
                scope.spawn(move |_| {
                    let mut decoder = structure.create_decoder();
                    for (parity_block, message_block) in parity_chunk
                        .chunks(parity_size)
                        .zip(message_chunk.chunks_mut(msg_size))
                    {
                        decoder.decode_block(structure, parity_block, message_block);
                    }
                });
            }
        });
        Ok(message)
    }

    /// Soft-decision decode a batch, exchanging extrinsic information.
    pub fn soft_decode(
        &self,
        parity: &[Llr],
        extrinsic: &[Llr],
    ) -> Result<SoftDecodeOutput, CodecError> {
        let msg_size = self.msg_size();
        let parity_size = self.parity_size();
        let extrinsic_size = self.extrinsic_size();
        let blocks = check_shape(parity.len(), parity_size)?;
        if extrinsic.len() != blocks * extrinsic_size {
            return Err(CodecError::ArgumentShape {
                length: extrinsic.len(),
                block: extrinsic_size,
            });
        }
        let mut output = SoftDecodeOutput {
            message: vec![0.0; blocks * msg_size],
            extrinsic: vec![0.0; blocks * extrinsic_size],
        };
        if blocks == 0 {
            return Ok(output);
        }
        let step = self.chunk_blocks(blocks);
        let structure = &self.structure;
        rayon::scope(|scope| {
            for (((parity_chunk, ext_in_chunk), message_chunk), ext_out_chunk) in parity
                .chunks(step * parity_size)
                .zip(extrinsic.chunks(step * extrinsic_size))
                .zip(output.message.chunks_mut(step * msg_size))
                .zip(output.extrinsic.chunks_mut(step * extrinsic_size))
            {
                scope.spawn(move |_| {
                    let mut decoder = structure.create_decoder();
                    for (((parity_block, ext_in_block), message_block), ext_out_block) in
                        parity_chunk
                            .chunks(parity_size)
                            .zip(ext_in_chunk.chunks(extrinsic_size))
                            .zip(message_chunk.chunks_mut(msg_size))
                            .zip(ext_out_chunk.chunks_mut(extrinsic_size))
                    {
                        decoder.soft_decode_block(
                            structure,
                            parity_block,
                            ext_in_block,
                            message_block,
                            ext_out_block,
                        );
                    }
                });
            }
        });
        Ok(output)
    }

    /// True when every block of hard parity bits is a valid codeword.
    pub fn check(&self, parity: &BitSlice<u8, Lsb0>) -> Result<bool, CodecError> {
        let parity_size = self.parity_size();
        check_shape(parity.len(), parity_size)?;
        Ok(parity
            .chunks(parity_size)
            .all(|block| self.structure.check_block(block)))
    }

    /// Blocks per worker chunk: the batch is divided among
    /// `min(work_group_size, available parallelism)` workers.
    fn chunk_blocks(&self, blocks: usize) -> usize {
        let hardware = rayon::current_num_threads().max(1);
        let workers = self.work_group_size.min(hardware).max(1);
        blocks.div_ceil(workers)
    }
}

fn check_shape(length: usize, block: usize) -> Result<usize, CodecError> {
    if block == 0 || length % block != 0 {
        return Err(CodecError::ArgumentShape { length, block });
    }
    Ok(length / block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::bits_from_str;
    use crate::trellis::Trellis;

    fn conv_codec() -> Codec {
        let trellis = Trellis::feed_forward(3, &[0o5, 0o7]).unwrap();
        let structure = convolutional::Structure::with_encoder(
            convolutional::EncoderOptions::new(trellis, 8)
                .termination(convolutional::Termination::ZeroTail),
        )
        .unwrap();
        Codec::new(structure)
    }

    #[test]
    fn shape_violations_abort_before_dispatch() {
        let codec = conv_codec();
        let short = bits_from_str("0101");
        assert!(matches!(
            codec.encode(&short),
            Err(CodecError::ArgumentShape { .. })
        ));
        assert!(matches!(
            codec.decode(&[0.0; 7]),
            Err(CodecError::ArgumentShape { .. })
        ));
    }

    #[test]
    fn multi_block_batches_round_trip() {
        let codec = conv_codec();
        let message = bits_from_str("01101000 11001011 00000001 11111110");
        let parity = codec.encode(&message).unwrap();
        assert_eq!(parity.len(), 4 * codec.parity_size());
        let channel: Vec<Llr> = parity.iter().map(|b| if *b { 4.0 } else { -4.0 }).collect();
        let decoded = codec.decode(&channel).unwrap();
        assert_eq!(decoded, message);
        assert!(codec.check(&parity).unwrap());
    }

    #[test]
    fn work_group_size_does_not_change_results() {
        let base = conv_codec();
        let message = bits_from_str(
            "01101000 11001011 00000001 11111110 10101010 00110011 01010101 11110000 10010110",
        );
        let reference = base.encode(&message).unwrap();
        let channel: Vec<Llr> = reference
            .iter()
            .map(|b| if *b { 4.0 } else { -4.0 })
            .collect();
        let reference_decode = base.decode(&channel).unwrap();
        for w in [1, 2, 4, 8] {
            let codec = conv_codec().with_work_group_size(w);
            assert_eq!(codec.encode(&message).unwrap(), reference, "encode w={w}");
            assert_eq!(codec.decode(&channel).unwrap(), reference_decode, "decode w={w}");
        }
    }

    #[test]
    fn mismatched_options_are_rejected() {
        let mut codec = conv_codec();
        let result = codec.set_decoder_options(DecoderOptions::Ldpc(ldpc::DecoderOptions::default()));
        assert!(matches!(result, Err(CodecError::InvalidOption { .. })));
        let result = codec.puncturing(&PunctureOptions::Ldpc(ldpc::PunctureOptions::default()));
        assert!(matches!(result, Err(CodecError::InvalidOption { .. })));
    }

    #[test]
    fn empty_batches_are_legal() {
        let codec = conv_codec();
        assert!(codec.encode(BitSlice::empty()).unwrap().is_empty());
        assert!(codec.decode(&[]).unwrap().is_empty());
    }
}
