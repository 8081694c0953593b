//! # Wire Entities
//!
//! Fixed-layout structures carried in the union region of an ECC request or
//! response record.
//!
//! ## Layouts
//!
//! ```text
//! EcPoint            x[32] | y[32] | size:u16 | privKeyID:u16          = 68
//! EcdhInfo           EcPoint | key[32]                                 = 100
//! EcdsaSignReqInfo   curveType:u16 | hashSz:u16                        = 4
//! EcdsaVerifyReqInfo nSig:u32                                          = 4
//! HandshakeInfo      data[0]:u32 | data[1]:u32                         = 8
//! ```

use crate::errors::WireError;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Size of the largest supported curve (P-256).
pub const ECC_LARGEST_CURVE_SIZE: usize = 32;

/// Maximum size of one coordinate of an EC point.
pub const ECC_POINT_MAX_SIZE: usize = ECC_LARGEST_CURVE_SIZE;

/// Encoded size of [`EcPoint`].
pub const EC_POINT_LEN: usize = 2 * ECC_POINT_MAX_SIZE + 4;

/// Encoded size of [`EcdhInfo`].
pub const ECDH_INFO_LEN: usize = EC_POINT_LEN + ECC_POINT_MAX_SIZE;

/// Encoded size of [`EcdsaSignRequestInfo`].
pub const ECDSA_SIGN_INFO_LEN: usize = 4;

/// Encoded size of [`EcdsaVerifyRequestInfo`].
pub const ECDSA_VERIFY_INFO_LEN: usize = 4;

/// Encoded size of [`HandshakeInfo`].
pub const HANDSHAKE_INFO_LEN: usize = 8;

pub(crate) fn read_u16_le(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

pub(crate) fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

fn expect_len(structure: &'static str, buf: &[u8], expected: usize) -> Result<(), WireError> {
    if buf.len() != expected {
        return Err(WireError::LengthMismatch {
            structure,
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

// =============================================================================
// TAGS
// =============================================================================

/// ECC request type raised by the firmware.
///
/// The tag selects which member of the request union is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum EccRequestType {
    /// Firmware is the TLS client: derive the pre-master secret from the
    /// server's ephemeral point.
    ClientEcdh = 1,
    /// Firmware is the TLS server: derive the secret from the client's point
    /// and a previously generated local key.
    ServerEcdh = 2,
    /// Generate an ephemeral key pair.
    GenerateKey = 3,
    /// Sign the handshake hash with the device identity key.
    SignGenerate = 4,
    /// Verify one or more certificate signatures.
    SignVerify = 5,
}

impl EccRequestType {
    /// Wire value of `ECC_REQ_NONE`.
    pub const NONE: u16 = 0;

    /// Parse a request tag.
    pub fn from_wire(value: u16) -> Result<Self, WireError> {
        match value {
            1 => Ok(Self::ClientEcdh),
            2 => Ok(Self::ServerEcdh),
            3 => Ok(Self::GenerateKey),
            4 => Ok(Self::SignGenerate),
            5 => Ok(Self::SignVerify),
            other => Err(WireError::UnknownRequestType(other)),
        }
    }

    /// Wire value of this tag.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Length of the type-specific payload this tag implies.
    pub fn payload_len(self) -> usize {
        match self {
            Self::ClientEcdh | Self::ServerEcdh | Self::GenerateKey => ECDH_INFO_LEN,
            Self::SignGenerate => ECDSA_SIGN_INFO_LEN,
            Self::SignVerify => ECDSA_VERIFY_INFO_LEN,
        }
    }
}

impl TryFrom<u16> for EccRequestType {
    type Error = WireError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::from_wire(value)
    }
}

/// Status reported back to the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum EccStatus {
    Success = 0,
    Failure = 1,
}

impl EccStatus {
    pub fn from_wire(value: u16) -> Result<Self, WireError> {
        match value {
            0 => Ok(Self::Success),
            1 => Ok(Self::Failure),
            other => Err(WireError::UnknownStatus(other)),
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// Named elliptic curves the wire format can carry (IANA TLS ids).
///
/// Only curves whose coordinates fit in [`ECC_POINT_MAX_SIZE`] are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u16)]
pub enum EcNamedCurve {
    Secp192r1 = 19,
    Secp256r1 = 23,
}

impl EcNamedCurve {
    /// All curves in the supported table.
    pub const ALL: [EcNamedCurve; 2] = [Self::Secp192r1, Self::Secp256r1];

    pub fn from_id(id: u16) -> Result<Self, WireError> {
        match id {
            19 => Ok(Self::Secp192r1),
            23 => Ok(Self::Secp256r1),
            other => Err(WireError::UnknownCurve(other)),
        }
    }

    pub fn id(self) -> u16 {
        self as u16
    }

    /// Bytes per coordinate.
    pub fn coordinate_size(self) -> usize {
        match self {
            Self::Secp192r1 => 24,
            Self::Secp256r1 => 32,
        }
    }

    /// Digest length the firmware must supply for a signature on this curve.
    pub fn digest_size(self) -> usize {
        self.coordinate_size()
    }

    /// Resolve the curve implied by a point's coordinate size.
    pub fn from_coordinate_size(size: u16) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|curve| curve.coordinate_size() == size as usize)
    }
}

impl fmt::Display for EcNamedCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secp192r1 => write!(f, "secp192r1"),
            Self::Secp256r1 => write!(f, "secp256r1"),
        }
    }
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque reference to private key material held by the crypto backend.
///
/// Carried on the wire as `privKeyID`. Never the key itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyHandle(pub u16);

impl KeyHandle {
    /// Value used in points that are not backed by a local key.
    pub const UNASSIGNED: KeyHandle = KeyHandle(0);

    pub fn is_assigned(self) -> bool {
        self != Self::UNASSIGNED
    }
}

impl fmt::Display for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key#{}", self.0)
    }
}

/// Correlation token tying a request to its handshake session.
///
/// Two 32-bit words (`userData`, `seqNo` in the request header), echoed
/// unchanged in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct HandshakeInfo {
    pub data: [u32; 2],
}

impl HandshakeInfo {
    pub fn new(user_data: u32, seq_no: u32) -> Self {
        Self {
            data: [user_data, seq_no],
        }
    }

    pub fn user_data(&self) -> u32 {
        self.data[0]
    }

    pub fn seq_no(&self) -> u32 {
        self.data[1]
    }

    pub fn to_bytes(&self) -> [u8; HANDSHAKE_INFO_LEN] {
        let mut out = [0u8; HANDSHAKE_INFO_LEN];
        out[0..4].copy_from_slice(&self.data[0].to_le_bytes());
        out[4..8].copy_from_slice(&self.data[1].to_le_bytes());
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        expect_len("HandshakeInfo", buf, HANDSHAKE_INFO_LEN)?;
        Ok(Self::new(read_u32_le(buf, 0), read_u32_le(buf, 4)))
    }
}

impl fmt::Display for HandshakeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}:{:08x}", self.data[0], self.data[1])
    }
}

// =============================================================================
// EC POINT
// =============================================================================

/// Elliptic curve point representation.
///
/// Coordinates are stored left-aligned in fixed 32-byte buffers; `size`
/// gives the number of significant bytes per coordinate.
#[derive(Clone, PartialEq, Eq)]
pub struct EcPoint {
    pub x: [u8; ECC_POINT_MAX_SIZE],
    pub y: [u8; ECC_POINT_MAX_SIZE],
    pub size: u16,
    pub private_key_id: KeyHandle,
}

impl EcPoint {
    /// Build a point from coordinate slices of equal length.
    pub fn new(x: &[u8], y: &[u8], private_key_id: KeyHandle) -> Result<Self, WireError> {
        if x.len() > ECC_POINT_MAX_SIZE || y.len() > ECC_POINT_MAX_SIZE {
            return Err(WireError::CoordinateTooLarge {
                size: x.len().max(y.len()) as u16,
                max: ECC_POINT_MAX_SIZE,
            });
        }
        if x.len() != y.len() {
            return Err(WireError::LengthMismatch {
                structure: "EcPoint.y",
                expected: x.len(),
                actual: y.len(),
            });
        }

        let mut point = Self::empty(x.len() as u16);
        point.x[..x.len()].copy_from_slice(x);
        point.y[..y.len()].copy_from_slice(y);
        point.private_key_id = private_key_id;
        Ok(point)
    }

    /// A zeroed point declaring `size` bytes per coordinate.
    pub fn empty(size: u16) -> Self {
        Self {
            x: [0u8; ECC_POINT_MAX_SIZE],
            y: [0u8; ECC_POINT_MAX_SIZE],
            size,
            private_key_id: KeyHandle::UNASSIGNED,
        }
    }

    /// Significant bytes of the X coordinate.
    pub fn x_coordinate(&self) -> &[u8] {
        &self.x[..self.coordinate_len()]
    }

    /// Significant bytes of the Y coordinate.
    pub fn y_coordinate(&self) -> &[u8] {
        &self.y[..self.coordinate_len()]
    }

    fn coordinate_len(&self) -> usize {
        (self.size as usize).min(ECC_POINT_MAX_SIZE)
    }

    /// Curve implied by the coordinate size, if any.
    pub fn curve(&self) -> Option<EcNamedCurve> {
        EcNamedCurve::from_coordinate_size(self.size)
    }

    pub fn to_bytes(&self) -> [u8; EC_POINT_LEN] {
        let mut out = [0u8; EC_POINT_LEN];
        out[0..32].copy_from_slice(&self.x);
        out[32..64].copy_from_slice(&self.y);
        out[64..66].copy_from_slice(&self.size.to_le_bytes());
        out[66..68].copy_from_slice(&self.private_key_id.0.to_le_bytes());
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        expect_len("EcPoint", buf, EC_POINT_LEN)?;

        let size = read_u16_le(buf, 64);
        if size as usize > ECC_POINT_MAX_SIZE {
            return Err(WireError::CoordinateTooLarge {
                size,
                max: ECC_POINT_MAX_SIZE,
            });
        }

        let mut x = [0u8; ECC_POINT_MAX_SIZE];
        let mut y = [0u8; ECC_POINT_MAX_SIZE];
        x.copy_from_slice(&buf[0..32]);
        y.copy_from_slice(&buf[32..64]);

        Ok(Self {
            x,
            y,
            size,
            private_key_id: KeyHandle(read_u16_le(buf, 66)),
        })
    }
}

impl fmt::Debug for EcPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcPoint")
            .field("size", &self.size)
            .field("private_key_id", &self.private_key_id)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// ECDH / ECDSA INFO
// =============================================================================

/// ECDH request/response information.
///
/// On requests `public_key` is the peer's point; on responses it carries the
/// host's public point and `key` holds the shared secret.
#[derive(Clone, PartialEq, Eq)]
pub struct EcdhInfo {
    pub public_key: EcPoint,
    pub key: [u8; ECC_POINT_MAX_SIZE],
}

impl EcdhInfo {
    pub fn new(public_key: EcPoint) -> Self {
        Self {
            public_key,
            key: [0u8; ECC_POINT_MAX_SIZE],
        }
    }

    /// Attach a shared secret; its length must equal the point's coordinate size.
    pub fn with_shared_secret(mut self, secret: &[u8]) -> Result<Self, WireError> {
        if secret.len() != self.public_key.size as usize {
            return Err(WireError::LengthMismatch {
                structure: "EcdhInfo.key",
                expected: self.public_key.size as usize,
                actual: secret.len(),
            });
        }
        self.key = [0u8; ECC_POINT_MAX_SIZE];
        self.key[..secret.len()].copy_from_slice(secret);
        Ok(self)
    }

    /// Significant bytes of the shared secret.
    pub fn shared_secret(&self) -> &[u8] {
        let len = (self.public_key.size as usize).min(ECC_POINT_MAX_SIZE);
        &self.key[..len]
    }

    pub fn to_bytes(&self) -> [u8; ECDH_INFO_LEN] {
        let mut out = [0u8; ECDH_INFO_LEN];
        out[..EC_POINT_LEN].copy_from_slice(&self.public_key.to_bytes());
        out[EC_POINT_LEN..].copy_from_slice(&self.key);
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        expect_len("EcdhInfo", buf, ECDH_INFO_LEN)?;
        let public_key = EcPoint::from_bytes(&buf[..EC_POINT_LEN])?;
        let mut key = [0u8; ECC_POINT_MAX_SIZE];
        key.copy_from_slice(&buf[EC_POINT_LEN..]);
        Ok(Self { public_key, key })
    }
}

/// Wipes the shared secret; the public point is left intact.
impl Zeroize for EcdhInfo {
    fn zeroize(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for EcdhInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The key buffer may hold a shared secret.
        f.debug_struct("EcdhInfo")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// ECDSA sign request information.
///
/// The hash itself lives in firmware memory after the request record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcdsaSignRequestInfo {
    pub curve: EcNamedCurve,
    pub hash_size: u16,
}

impl EcdsaSignRequestInfo {
    pub fn new(curve: EcNamedCurve, hash_size: u16) -> Self {
        Self { curve, hash_size }
    }

    /// Check the curve/hash-size pair against the supported table.
    pub fn validate(&self) -> Result<(), WireError> {
        if self.hash_size as usize != self.curve.digest_size() {
            return Err(WireError::HashSizeMismatch {
                curve: self.curve.id(),
                expected: self.curve.digest_size(),
                actual: self.hash_size,
            });
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; ECDSA_SIGN_INFO_LEN] {
        let mut out = [0u8; ECDSA_SIGN_INFO_LEN];
        out[0..2].copy_from_slice(&self.curve.id().to_le_bytes());
        out[2..4].copy_from_slice(&self.hash_size.to_le_bytes());
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        expect_len("EcdsaSignRequestInfo", buf, ECDSA_SIGN_INFO_LEN)?;
        let curve = EcNamedCurve::from_id(read_u16_le(buf, 0))?;
        let info = Self::new(curve, read_u16_le(buf, 2));
        info.validate()?;
        Ok(info)
    }
}

/// ECDSA verify request information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcdsaVerifyRequestInfo {
    /// Number of signatures to verify (`nSig`).
    pub signature_count: u32,
}

impl EcdsaVerifyRequestInfo {
    pub fn new(signature_count: u32) -> Self {
        Self { signature_count }
    }

    pub fn to_bytes(&self) -> [u8; ECDSA_VERIFY_INFO_LEN] {
        self.signature_count.to_le_bytes()
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        expect_len("EcdsaVerifyRequestInfo", buf, ECDSA_VERIFY_INFO_LEN)?;
        let signature_count = read_u32_le(buf, 0);
        if signature_count == 0 {
            return Err(WireError::EmptySignatureBatch);
        }
        Ok(Self::new(signature_count))
    }
}
