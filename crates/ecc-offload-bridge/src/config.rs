//! Bridge configuration with validation.

use serde::{Deserialize, Serialize};
use shared_wire::cipher::groups;
use shared_wire::{CipherSuite, EcNamedCurve, KeyHandle};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Main bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Upper bound on one backend operation, in milliseconds
    pub request_timeout_ms: u64,
    /// Initial cipher-suite bitmap
    pub cipher_suite_mask: u32,
    /// Curve used when a key generation request leaves the size at 0
    pub default_curve: EcNamedCurve,
    /// Handle of the device identity key used for sign requests
    pub identity_key: Option<KeyHandle>,
    /// Largest `nSig` accepted in a verify request
    pub max_verify_batch: usize,
    /// Key slots available to the software backend
    pub key_store_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
            cipher_suite_mask: groups::ALL,
            default_curve: EcNamedCurve::Secp256r1,
            identity_key: None,
            max_verify_batch: 8,
            key_store_capacity: 16,
        }
    }
}

impl BridgeConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "request_timeout_ms cannot be 0".into(),
            ));
        }

        if CipherSuite::in_mask(self.cipher_suite_mask).next().is_none() {
            return Err(ConfigError::NoCipherSuites(self.cipher_suite_mask));
        }

        if self.max_verify_batch == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_verify_batch cannot be 0".into(),
            ));
        }

        if self.key_store_capacity == 0 || self.key_store_capacity > u16::MAX as usize {
            return Err(ConfigError::InvalidLimit(format!(
                "key_store_capacity must be in 1..={}",
                u16::MAX
            )));
        }

        if self.identity_key == Some(KeyHandle::UNASSIGNED) {
            return Err(ConfigError::Invalid(
                "identity_key cannot be handle 0".into(),
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Create configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their default.
    ///
    /// # Environment Variables
    ///
    /// - `ECC_OFFLOAD_REQUEST_TIMEOUT_MS`: Backend timeout (default: 5000)
    /// - `ECC_OFFLOAD_CIPHER_SUITES`: Bitmap, decimal or `0x` hex (default: 0xFFFF)
    /// - `ECC_OFFLOAD_DEFAULT_CURVE`: `secp256r1` or `secp192r1` (default: secp256r1)
    /// - `ECC_OFFLOAD_IDENTITY_KEY`: Identity key handle (default: none)
    /// - `ECC_OFFLOAD_MAX_VERIFY_BATCH`: Largest verify batch (default: 8)
    /// - `ECC_OFFLOAD_KEY_STORE_CAPACITY`: Key slots (default: 16)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            request_timeout_ms: env::var("ECC_OFFLOAD_REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_ms),

            cipher_suite_mask: env::var("ECC_OFFLOAD_CIPHER_SUITES")
                .ok()
                .and_then(|v| parse_mask(&v))
                .unwrap_or(defaults.cipher_suite_mask),

            default_curve: env::var("ECC_OFFLOAD_DEFAULT_CURVE")
                .ok()
                .and_then(|v| parse_curve(&v))
                .unwrap_or(defaults.default_curve),

            identity_key: env::var("ECC_OFFLOAD_IDENTITY_KEY")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(KeyHandle)
                .or(defaults.identity_key),

            max_verify_batch: env::var("ECC_OFFLOAD_MAX_VERIFY_BATCH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_verify_batch),

            key_store_capacity: env::var("ECC_OFFLOAD_KEY_STORE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.key_store_capacity),
        }
    }
}

fn parse_mask(value: &str) -> Option<u32> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn parse_curve(value: &str) -> Option<EcNamedCurve> {
    EcNamedCurve::ALL
        .into_iter()
        .find(|curve| curve.to_string().eq_ignore_ascii_case(value.trim()))
}

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// The cipher-suite bitmap enables no known suite
    #[error("cipher suite mask {0:#06x} enables no known suite")]
    NoCipherSuites(u32),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Document could not be parsed
    #[error("parse error: {0}")]
    Parse(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
