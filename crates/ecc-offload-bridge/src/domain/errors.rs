//! # Bridge Errors
//!
//! Every error ends the request it belongs to and is reported to the
//! firmware as `FAILURE`. The variant is for diagnostics only.

use crate::ports::outbound::{BackendError, FirmwareError};
use shared_wire::{EccStatus, HandshakeInfo, KeyHandle, WireError};
use thiserror::Error;

/// Errors that can occur while servicing an ECC request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// Payload does not match the structure its request type implies
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Request type tag is not an ECC operation
    #[error("Unsupported operation: request type {0}")]
    UnsupportedOperation(u16),

    /// Curve is unknown or not provisioned in the backend
    #[error("Unsupported curve: {0}")]
    UnsupportedCurve(String),

    /// Key handle does not reference a key in the store
    #[error("Unknown key handle: {0}")]
    UnknownKeyHandle(KeyHandle),

    /// Hash size disagrees with the curve's digest length
    #[error("Hash size mismatch: expected {expected}, got {actual}")]
    HashSizeMismatch { expected: usize, actual: usize },

    /// A request for this handshake token is already pending
    #[error("Request already in flight for handshake {0}")]
    DuplicateInFlightRequest(HandshakeInfo),

    /// The cipher-suite mask enables no known suite
    #[error("Cipher suite mask {0:#010x} selects no usable suite")]
    NoUsableCipherSuite(u32),

    /// The crypto backend rejected or failed the operation
    #[error("Crypto backend failure: {0}")]
    CryptoBackendFailure(String),

    /// The cipher-suite mask cannot change while handshakes are active
    #[error("Cipher suites are locked while {active} handshake(s) are active")]
    CipherSuitesLocked { active: usize },

    /// Out-of-band firmware buffer could not be read
    #[error("Firmware access failed: {0}")]
    FirmwareAccess(String),

    /// The backend did not answer within the request timeout
    #[error("Request timed out after {0} ms")]
    Timeout(u64),
}

impl BridgeError {
    /// Status reported on the wire; detail never crosses the boundary.
    pub fn status(&self) -> EccStatus {
        EccStatus::Failure
    }

    /// Short name used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "malformed_request",
            Self::UnsupportedOperation(_) => "unsupported_operation",
            Self::UnsupportedCurve(_) => "unsupported_curve",
            Self::UnknownKeyHandle(_) => "unknown_key_handle",
            Self::HashSizeMismatch { .. } => "hash_size_mismatch",
            Self::DuplicateInFlightRequest(_) => "duplicate_in_flight_request",
            Self::NoUsableCipherSuite(_) => "no_usable_cipher_suite",
            Self::CryptoBackendFailure(_) => "crypto_backend_failure",
            Self::CipherSuitesLocked { .. } => "cipher_suites_locked",
            Self::FirmwareAccess(_) => "firmware_access",
            Self::Timeout(_) => "timeout",
        }
    }
}

impl From<WireError> for BridgeError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::UnknownRequestType(tag) => Self::UnsupportedOperation(tag),
            WireError::UnknownCurve(id) => Self::UnsupportedCurve(format!("curve id {id}")),
            WireError::HashSizeMismatch {
                expected, actual, ..
            } => Self::HashSizeMismatch {
                expected,
                actual: actual as usize,
            },
            other => Self::MalformedRequest(other.to_string()),
        }
    }
}

impl From<BackendError> for BridgeError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::UnknownKeyHandle(handle) => Self::UnknownKeyHandle(handle),
            BackendError::UnsupportedCurve(curve) => Self::UnsupportedCurve(curve),
            other => Self::CryptoBackendFailure(other.to_string()),
        }
    }
}

impl From<FirmwareError> for BridgeError {
    fn from(err: FirmwareError) -> Self {
        Self::FirmwareAccess(err.to_string())
    }
}
