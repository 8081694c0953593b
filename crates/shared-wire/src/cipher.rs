//! # Cipher Suites
//!
//! IANA cipher-suite ids the firmware can negotiate, and the bit each one
//! occupies in the 32-bit cipher-suite bitmap sent with
//! `M2M_SSL_REQ_SET_CS_LIST`.

use crate::entities::read_u32_le;
use crate::errors::WireError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `TLS_NULL_WITH_NULL_NULL`; defined for completeness, never enabled.
pub const TLS_NULL_WITH_NULL_NULL: u16 = 0x0000;

/// Cipher suites with a bit in the firmware bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum CipherSuite {
    RSA_WITH_AES_128_CBC_SHA,
    RSA_WITH_AES_128_CBC_SHA256,
    DHE_RSA_WITH_AES_128_CBC_SHA,
    DHE_RSA_WITH_AES_128_CBC_SHA256,
    RSA_WITH_AES_128_GCM_SHA256,
    DHE_RSA_WITH_AES_128_GCM_SHA256,
    RSA_WITH_AES_256_CBC_SHA,
    RSA_WITH_AES_256_CBC_SHA256,
    DHE_RSA_WITH_AES_256_CBC_SHA,
    DHE_RSA_WITH_AES_256_CBC_SHA256,
    ECDHE_RSA_WITH_AES_128_CBC_SHA,
    ECDHE_RSA_WITH_AES_256_CBC_SHA,
    ECDHE_RSA_WITH_AES_128_CBC_SHA256,
    ECDHE_ECDSA_WITH_AES_128_CBC_SHA256,
    ECDHE_RSA_WITH_AES_128_GCM_SHA256,
    ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
}

impl CipherSuite {
    /// All suites, ordered by bit position.
    pub const ALL: [CipherSuite; 16] = [
        Self::RSA_WITH_AES_128_CBC_SHA,
        Self::RSA_WITH_AES_128_CBC_SHA256,
        Self::DHE_RSA_WITH_AES_128_CBC_SHA,
        Self::DHE_RSA_WITH_AES_128_CBC_SHA256,
        Self::RSA_WITH_AES_128_GCM_SHA256,
        Self::DHE_RSA_WITH_AES_128_GCM_SHA256,
        Self::RSA_WITH_AES_256_CBC_SHA,
        Self::RSA_WITH_AES_256_CBC_SHA256,
        Self::DHE_RSA_WITH_AES_256_CBC_SHA,
        Self::DHE_RSA_WITH_AES_256_CBC_SHA256,
        Self::ECDHE_RSA_WITH_AES_128_CBC_SHA,
        Self::ECDHE_RSA_WITH_AES_256_CBC_SHA,
        Self::ECDHE_RSA_WITH_AES_128_CBC_SHA256,
        Self::ECDHE_ECDSA_WITH_AES_128_CBC_SHA256,
        Self::ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        Self::ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    ];

    /// IANA registry value.
    pub fn iana_id(self) -> u16 {
        match self {
            Self::RSA_WITH_AES_128_CBC_SHA => 0x002f,
            Self::RSA_WITH_AES_128_CBC_SHA256 => 0x003c,
            Self::DHE_RSA_WITH_AES_128_CBC_SHA => 0x0033,
            Self::DHE_RSA_WITH_AES_128_CBC_SHA256 => 0x0067,
            Self::RSA_WITH_AES_128_GCM_SHA256 => 0x009c,
            Self::DHE_RSA_WITH_AES_128_GCM_SHA256 => 0x009e,
            Self::RSA_WITH_AES_256_CBC_SHA => 0x0035,
            Self::RSA_WITH_AES_256_CBC_SHA256 => 0x003d,
            Self::DHE_RSA_WITH_AES_256_CBC_SHA => 0x0039,
            Self::DHE_RSA_WITH_AES_256_CBC_SHA256 => 0x006b,
            Self::ECDHE_RSA_WITH_AES_128_CBC_SHA => 0xc013,
            Self::ECDHE_RSA_WITH_AES_256_CBC_SHA => 0xc014,
            Self::ECDHE_RSA_WITH_AES_128_CBC_SHA256 => 0xc027,
            Self::ECDHE_ECDSA_WITH_AES_128_CBC_SHA256 => 0xc023,
            Self::ECDHE_RSA_WITH_AES_128_GCM_SHA256 => 0xc02f,
            Self::ECDHE_ECDSA_WITH_AES_128_GCM_SHA256 => 0xc02b,
        }
    }

    pub fn from_iana_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|suite| suite.iana_id() == id)
    }

    /// Bit position in the firmware bitmap.
    pub fn bit(self) -> u32 {
        self as u32
    }

    /// Single-bit mask for this suite.
    pub fn mask(self) -> u32 {
        1 << self.bit()
    }

    /// Whether the key exchange needs host ECC offload.
    pub fn uses_ecc(self) -> bool {
        self.bit() >= Self::ECDHE_RSA_WITH_AES_128_CBC_SHA.bit()
    }

    /// Known suites whose bit is set in `mask`; unknown bits are skipped.
    pub fn in_mask(mask: u32) -> impl Iterator<Item = CipherSuite> {
        Self::ALL
            .into_iter()
            .filter(move |suite| mask & suite.mask() != 0)
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TLS_{:?} (0x{:04x})", self, self.iana_id())
    }
}

/// Named bitmap groups.
pub mod groups {
    use super::CipherSuite::*;

    /// Suites that need an ECDSA identity key.
    pub const ECC_ONLY: u32 =
        1 << ECDHE_ECDSA_WITH_AES_128_CBC_SHA256 as u32 | 1 << ECDHE_ECDSA_WITH_AES_128_GCM_SHA256 as u32;

    /// All AES-128 suites with an ephemeral EC key exchange.
    pub const ECC_ALL: u32 = 1 << ECDHE_RSA_WITH_AES_128_CBC_SHA as u32
        | 1 << ECDHE_RSA_WITH_AES_128_CBC_SHA256 as u32
        | 1 << ECDHE_RSA_WITH_AES_128_GCM_SHA256 as u32
        | ECC_ONLY;

    pub const NON_ECC_AES_128: u32 = 1 << RSA_WITH_AES_128_CBC_SHA as u32
        | 1 << RSA_WITH_AES_128_CBC_SHA256 as u32
        | 1 << DHE_RSA_WITH_AES_128_CBC_SHA as u32
        | 1 << DHE_RSA_WITH_AES_128_CBC_SHA256 as u32
        | 1 << RSA_WITH_AES_128_GCM_SHA256 as u32
        | 1 << DHE_RSA_WITH_AES_128_GCM_SHA256 as u32;

    pub const ECC_AES_256: u32 = 1 << ECDHE_RSA_WITH_AES_256_CBC_SHA as u32;

    pub const NON_ECC_AES_256: u32 = 1 << RSA_WITH_AES_256_CBC_SHA as u32
        | 1 << RSA_WITH_AES_256_CBC_SHA256 as u32
        | 1 << DHE_RSA_WITH_AES_256_CBC_SHA as u32
        | 1 << DHE_RSA_WITH_AES_256_CBC_SHA256 as u32;

    pub const ALL: u32 = ECC_ALL | NON_ECC_AES_128 | ECC_AES_256 | NON_ECC_AES_256;
}

/// Payload of `M2M_SSL_REQ_SET_CS_LIST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetActiveCipherSuites {
    pub bitmap: u32,
}

impl SetActiveCipherSuites {
    pub const LEN: usize = 4;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        self.bitmap.to_le_bytes()
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() != Self::LEN {
            return Err(WireError::LengthMismatch {
                structure: "SetActiveCipherSuites",
                expected: Self::LEN,
                actual: buf.len(),
            });
        }
        Ok(Self {
            bitmap: read_u32_le(buf, 0),
        })
    }
}
