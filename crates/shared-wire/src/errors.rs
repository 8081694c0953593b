//! # Error Types
//!
//! Errors raised while reading or validating wire records.

use thiserror::Error;

/// Errors that can occur while decoding a wire structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Buffer length does not match the fixed structure size.
    #[error("{structure}: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        structure: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Buffer ended before a variable-length section was complete.
    #[error("{structure}: truncated at offset {offset}")]
    Truncated {
        structure: &'static str,
        offset: usize,
    },

    /// EC point coordinate size exceeds the largest supported curve.
    #[error("Coordinate size {size} exceeds the {max}-byte bound")]
    CoordinateTooLarge { size: u16, max: usize },

    /// Request tag is not one of the ECC request types.
    #[error("Unknown ECC request type: {0}")]
    UnknownRequestType(u16),

    /// Named curve id is not in the supported table.
    #[error("Unknown named curve: {0}")]
    UnknownCurve(u16),

    /// Hash size does not match the digest length expected for the curve.
    #[error("Hash size {actual} does not match {expected} expected for curve {curve}")]
    HashSizeMismatch {
        curve: u16,
        expected: usize,
        actual: u16,
    },

    /// A verify request must carry at least one signature.
    #[error("Signature count must be at least 1")]
    EmptySignatureBatch,

    /// ECC status word is neither SUCCESS nor FAILURE.
    #[error("Unknown ECC status: {0}")]
    UnknownStatus(u16),
}
