//! rustyfec: forward-error-correction codecs with soft-decision decoding
//!
//! Encoding and decoding for three families of binary channel codes:
//!
//! - **Convolutional** codes over a [`Trellis`], hard-decision Viterbi or
//!   soft MAP (BCJR) decoding with exact or max-log combining.
//! - **Turbo** codes: parallel-concatenated recursive convolutional codes
//!   decoded iteratively with serial or parallel extrinsic scheduling.
//! - **LDPC** codes over a sparse parity-check matrix, Richardson-Urbanke
//!   encoding and flooding belief propagation (sum-product or min-sum).
//!
//! All soft values are log-likelihood ratios `ln(P(1)/P(0))`. A [`Codec`]
//! runs batches of fixed-size blocks across a worker pool; per-block
//! primitives stay single-threaded.
//!
//! ```
//! use bitvec::prelude::*;
//! use rustyfec::convolutional::{EncoderOptions, Structure, Termination};
//! use rustyfec::{Codec, Trellis};
//!
//! let trellis = Trellis::feed_forward(3, &[0o5, 0o7]).unwrap();
//! let structure = Structure::with_encoder(
//!     EncoderOptions::new(trellis, 8).termination(Termination::ZeroTail),
//! )
//! .unwrap();
//! let codec = Codec::new(structure);
//!
//! let message = bitvec![u8, Lsb0; 1, 0, 1, 1, 0, 0, 1, 0];
//! let parity = codec.encode(&message).unwrap();
//! // A noiseless BPSK channel: +/- 4 nats per bit.
//! let channel: Vec<f64> = parity.iter().map(|b| if *b { 4.0 } else { -4.0 }).collect();
//! assert_eq!(codec.decode(&channel).unwrap(), message);
//! ```

pub mod bits;
pub mod codec;
pub mod convolutional;
pub mod error;
pub mod ldpc;
pub mod llr;
pub mod map_decoder;
pub mod permutation;
pub mod sparse;
pub mod tracing_init;
pub mod trellis;
pub mod turbo;

pub use codec::{Codec, DecoderOptions, PunctureOptions, SoftDecodeOutput, Structure};
pub use error::CodecError;
pub use llr::{DecoderAlgorithm, Llr, MAX_LLR, THRESHOLD_LLR};
pub use permutation::Permutation;
pub use sparse::SparseBitMatrix;
pub use trellis::Trellis;
