//! Software crypto backend.
//!
//! Pure-Rust implementation of the [`CryptoBackend`] port over the RustCrypto
//! `p256` crate. Only secp256r1 is provisioned; other curves fail with
//! `UnsupportedCurve`.
//!
//! Signatures are produced as raw `r || s` (64 bytes). Verification accepts
//! raw or DER-encoded signatures.

use crate::adapters::key_store::InMemoryKeyStore;
use crate::domain::entities::SharedSecret;
use crate::ports::outbound::{BackendError, CryptoBackend};
use async_trait::async_trait;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use shared_wire::{CertificateEntry, EcNamedCurve, EcPoint, KeyHandle};
use tracing::debug;

const P256_COORDINATE_LEN: usize = 32;

pub struct SoftwareBackend {
    keys: InMemoryKeyStore,
}

impl SoftwareBackend {
    pub fn new(key_store_capacity: usize) -> Self {
        Self {
            keys: InMemoryKeyStore::new(key_store_capacity),
        }
    }

    pub fn key_store(&self) -> &InMemoryKeyStore {
        &self.keys
    }

    /// Import a 32-byte P-256 scalar as the device identity key.
    pub fn provision_identity(&self, secret: &[u8]) -> Result<KeyHandle, BackendError> {
        let key = SecretKey::from_slice(secret)
            .map_err(|_| BackendError::InvalidInput("invalid P-256 scalar".to_string()))?;
        self.keys.insert(key)
    }

    /// Public point of a stored key.
    pub fn public_point(&self, handle: KeyHandle) -> Result<EcPoint, BackendError> {
        let key = self.keys.get(handle)?;
        point_from_public(&key.public_key(), handle)
    }
}

fn require_p256(curve: EcNamedCurve) -> Result<(), BackendError> {
    match curve {
        EcNamedCurve::Secp256r1 => Ok(()),
        other => Err(BackendError::UnsupportedCurve(other.to_string())),
    }
}

fn point_from_public(public: &PublicKey, handle: KeyHandle) -> Result<EcPoint, BackendError> {
    let encoded = public.to_encoded_point(false);
    let (Some(x), Some(y)) = (encoded.x(), encoded.y()) else {
        return Err(BackendError::Internal("public key has no affine coordinates".to_string()));
    };
    EcPoint::new(x.as_slice(), y.as_slice(), handle)
        .map_err(|e| BackendError::Internal(e.to_string()))
}

fn public_from_point(point: &EcPoint) -> Result<PublicKey, BackendError> {
    if point.size as usize != P256_COORDINATE_LEN {
        return Err(BackendError::UnsupportedCurve(format!(
            "coordinate size {}",
            point.size
        )));
    }

    let mut sec1 = Vec::with_capacity(1 + 2 * P256_COORDINATE_LEN);
    sec1.push(0x04);
    sec1.extend_from_slice(point.x_coordinate());
    sec1.extend_from_slice(point.y_coordinate());
    PublicKey::from_sec1_bytes(&sec1).map_err(|_| BackendError::InvalidPoint)
}

fn verify_entry(entry: &CertificateEntry) -> bool {
    if require_p256(entry.curve).is_err() {
        return false;
    }
    let Ok(public) = public_from_point(&entry.public_key) else {
        return false;
    };
    let signature = match Signature::from_slice(&entry.signature)
        .or_else(|_| Signature::from_der(&entry.signature))
    {
        Ok(signature) => signature,
        Err(_) => return false,
    };

    VerifyingKey::from(&public)
        .verify_prehash(&entry.hash, &signature)
        .is_ok()
}

#[async_trait]
impl CryptoBackend for SoftwareBackend {
    async fn ecdh(&self, peer: &EcPoint, key: KeyHandle) -> Result<SharedSecret, BackendError> {
        let secret = self.keys.get(key)?;
        let public = public_from_point(peer)?;

        let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
        Ok(SharedSecret::new(shared.raw_secret_bytes().to_vec()))
    }

    async fn generate_key_pair(
        &self,
        curve: EcNamedCurve,
    ) -> Result<(EcPoint, KeyHandle), BackendError> {
        require_p256(curve)?;

        let secret = SecretKey::random(&mut OsRng);
        let public = secret.public_key();
        let handle = self.keys.insert(secret)?;
        let point = point_from_public(&public, handle)?;

        debug!(handle = %handle, curve = %curve, "Generated key pair");
        Ok((point, handle))
    }

    async fn sign(
        &self,
        hash: &[u8],
        hash_size: usize,
        key: KeyHandle,
    ) -> Result<Vec<u8>, BackendError> {
        // The digest length names the curve the firmware is signing for
        if let Some(curve) = u16::try_from(hash_size)
            .ok()
            .and_then(EcNamedCurve::from_coordinate_size)
        {
            require_p256(curve)?;
        }
        if hash.len() != hash_size || hash_size != P256_COORDINATE_LEN {
            return Err(BackendError::InvalidInput(format!(
                "digest of {} bytes (declared {}) cannot be signed with P-256",
                hash.len(),
                hash_size
            )));
        }

        let secret = self.keys.get(key)?;
        let signing_key = SigningKey::from(&secret);
        let signature: Signature = signing_key
            .sign_prehash(hash)
            .map_err(|e| BackendError::Internal(e.to_string()))?;

        Ok(signature.to_bytes().to_vec())
    }

    async fn verify_batch(&self, entries: &[CertificateEntry]) -> Result<Vec<bool>, BackendError> {
        Ok(entries.iter().map(verify_entry).collect())
    }

    async fn release_key(&self, key: KeyHandle) -> Result<(), BackendError> {
        if self.keys.remove(key) {
            Ok(())
        } else {
            Err(BackendError::UnknownKeyHandle(key))
        }
    }
}
