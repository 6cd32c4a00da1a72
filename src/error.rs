use snafu::Snafu;

/// Errors surfaced by codec construction and the batch entry points.
///
/// Numeric saturation is not represented here: saturated values are clamped
/// to the threshold silently inside the decoders.
#[derive(Debug, Snafu)]
pub enum CodecError {
    /// Input buffer length is not a whole number of blocks
    #[snafu(display(
        "buffer of {length} values is not a multiple of the {block} per-block size"
    ))]
    ArgumentShape { length: usize, block: usize },

    /// A structure was configured with inconsistent options
    #[snafu(display("invalid codec option: {reason}"))]
    InvalidOption { reason: String },

    /// LDPC preprocessing could not find a full-rank encoding submatrix
    #[snafu(display("parity-check matrix does not admit an encoder: {reason}"))]
    ConstructionFailure { reason: String },
}

impl CodecError {
    pub(crate) fn invalid_option(reason: impl Into<String>) -> Self {
        CodecError::InvalidOption {
            reason: reason.into(),
        }
    }

    pub(crate) fn construction(reason: impl Into<String>) -> Self {
        CodecError::ConstructionFailure {
            reason: reason.into(),
        }
    }
}
