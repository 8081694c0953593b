//! # Outbound Ports (Driven Ports / SPI)
//!
//! Dependencies the bridge needs: something that owns key material, access
//! to out-of-band firmware buffers, and somewhere to deliver responses.

use crate::domain::entities::{EccCompletion, SharedSecret};
use shared_wire::{CertificateEntry, EcNamedCurve, EcPoint, KeyHandle};
use std::sync::Arc;
use thiserror::Error;

/// Error from crypto backend operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// No key is stored under this handle
    #[error("Unknown key handle: {0}")]
    UnknownKeyHandle(KeyHandle),

    /// The backend has no implementation for the curve
    #[error("Curve not provisioned: {0}")]
    UnsupportedCurve(String),

    /// Peer point is not on the curve
    #[error("Invalid EC point")]
    InvalidPoint,

    /// Key store has no free slot
    #[error("Key store full (capacity {capacity})")]
    KeyStoreFull { capacity: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal backend error: {0}")]
    Internal(String),
}

/// Provider of ECC primitives.
///
/// Private keys stay behind the backend; callers only see [`KeyHandle`]s.
/// Operations may take a long time (hardware secure elements) and are awaited
/// without blocking other handshakes.
#[async_trait::async_trait]
pub trait CryptoBackend: Send + Sync + 'static {
    /// Derive the shared secret of `peer` and the local key `key`.
    async fn ecdh(&self, peer: &EcPoint, key: KeyHandle) -> Result<SharedSecret, BackendError>;

    /// Generate a key pair; the returned point carries the new handle.
    async fn generate_key_pair(
        &self,
        curve: EcNamedCurve,
    ) -> Result<(EcPoint, KeyHandle), BackendError>;

    /// Sign a precomputed digest of `hash_size` bytes.
    async fn sign(
        &self,
        hash: &[u8],
        hash_size: usize,
        key: KeyHandle,
    ) -> Result<Vec<u8>, BackendError>;

    /// Verify each entry; one outcome per entry, in order.
    async fn verify_batch(&self, entries: &[CertificateEntry]) -> Result<Vec<bool>, BackendError>;

    /// Drop the key stored under `key`.
    async fn release_key(&self, key: KeyHandle) -> Result<(), BackendError>;
}

#[async_trait::async_trait]
impl<T: CryptoBackend> CryptoBackend for Arc<T> {
    async fn ecdh(&self, peer: &EcPoint, key: KeyHandle) -> Result<SharedSecret, BackendError> {
        (**self).ecdh(peer, key).await
    }

    async fn generate_key_pair(
        &self,
        curve: EcNamedCurve,
    ) -> Result<(EcPoint, KeyHandle), BackendError> {
        (**self).generate_key_pair(curve).await
    }

    async fn sign(
        &self,
        hash: &[u8],
        hash_size: usize,
        key: KeyHandle,
    ) -> Result<Vec<u8>, BackendError> {
        (**self).sign(hash, hash_size, key).await
    }

    async fn verify_batch(&self, entries: &[CertificateEntry]) -> Result<Vec<bool>, BackendError> {
        (**self).verify_batch(entries).await
    }

    async fn release_key(&self, key: KeyHandle) -> Result<(), BackendError> {
        (**self).release_key(key).await
    }
}

/// Error reading firmware memory.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FirmwareError {
    /// No buffer is mapped at this address
    #[error("Unmapped firmware address {0:#010x}")]
    Unmapped(u32),

    /// Read runs past the end of the mapped buffer
    #[error("Read of {len} bytes at {address:#010x} is out of bounds")]
    OutOfBounds { address: u32, len: usize },

    /// Host interface failure
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Access to buffers the firmware places after a request record (the hash of
/// a sign request, the certificate entries of a verify request).
#[async_trait::async_trait]
pub trait FirmwareMemory: Send + Sync + 'static {
    /// Read exactly `len` bytes starting at `address`.
    async fn read(&self, address: u32, len: usize) -> Result<Vec<u8>, FirmwareError>;
}

#[async_trait::async_trait]
impl<T: FirmwareMemory> FirmwareMemory for Arc<T> {
    async fn read(&self, address: u32, len: usize) -> Result<Vec<u8>, FirmwareError> {
        (**self).read(address, len).await
    }
}

/// Receives one completion per accepted request.
pub trait CompletionSink: Send + Sync + 'static {
    fn complete(&self, completion: EccCompletion);
}

impl<T: CompletionSink> CompletionSink for Arc<T> {
    fn complete(&self, completion: EccCompletion) {
        (**self).complete(completion)
    }
}
