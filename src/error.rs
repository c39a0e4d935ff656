//! Error taxonomy for the redaction pipeline.
//!
//! User-facing failures (`InputRejected`, `DecodeFailed`, `Io`, `Encode`) are
//! shown to the user and never leave a half-loaded buffer behind. The rest are
//! precondition violations raised by the buffer and history internals.

use thiserror::Error;

use crate::canvas::Region;

#[derive(Debug, Error)]
pub enum RedactError {
    /// The supplied data or file is not an image.
    #[error("not an image: {0}")]
    InputRejected(String),

    /// The data looked like an image but could not be decoded.
    #[error("could not decode image: {0}")]
    DecodeFailed(String),

    /// A region write received a byte count that does not match the region.
    #[error("region data is {actual} bytes, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("region {region} lies outside the {width}x{height} buffer")]
    RegionOutOfBounds {
        region: Region,
        width: u32,
        height: u32,
    },

    #[error("history index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("encode error: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RedactError {
    /// True for failures the user caused and should be told about, as opposed
    /// to internal contract violations.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            RedactError::InputRejected(_)
                | RedactError::DecodeFailed(_)
                | RedactError::Encode(_)
                | RedactError::Io(_)
        )
    }
}

impl From<png::EncodingError> for RedactError {
    fn from(e: png::EncodingError) -> Self {
        RedactError::Encode(e.to_string())
    }
}

impl From<png::DecodingError> for RedactError {
    fn from(e: png::DecodingError) -> Self {
        RedactError::DecodeFailed(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RedactError>;
