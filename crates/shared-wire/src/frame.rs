//! # Record Framing
//!
//! The firmware moves ECC requests as a single 112-byte record: a 12-byte
//! header followed by the request union, padded to its largest member.
//!
//! ```text
//! offset 0   REQ:u16
//! offset 2   status:u16
//! offset 4   handshake word 0 (userData):u32
//! offset 8   handshake word 1 (seqNo):u32
//! offset 12  union region (EcdhInfo | EcdsaSignRequestInfo | EcdsaVerifyRequestInfo)
//! ```
//!
//! Responses reuse the header and carry only the active structure, plus an
//! optional data attachment (the signature of a sign request).

use crate::entities::{read_u16_le, EccRequestType, EccStatus, HandshakeInfo, ECDH_INFO_LEN};
use crate::errors::WireError;
use zeroize::Zeroize;

/// Encoded size of [`RecordHeader`].
pub const RECORD_HEADER_LEN: usize = 12;

/// Size of the union region (its largest member is `EcdhInfo`).
pub const UNION_LEN: usize = ECDH_INFO_LEN;

/// Size of a request record as transferred by the firmware.
pub const REQUEST_RECORD_LEN: usize = RECORD_HEADER_LEN + UNION_LEN;

/// Common header of request and response records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Raw request tag; kept raw so unknown tags can still be echoed.
    pub request: u16,
    pub status: u16,
    pub handshake: HandshakeInfo,
}

impl RecordHeader {
    pub fn new(request: u16, status: EccStatus, handshake: HandshakeInfo) -> Self {
        Self {
            request,
            status: status.as_u16(),
            handshake,
        }
    }

    pub fn to_bytes(&self) -> [u8; RECORD_HEADER_LEN] {
        let mut out = [0u8; RECORD_HEADER_LEN];
        out[0..2].copy_from_slice(&self.request.to_le_bytes());
        out[2..4].copy_from_slice(&self.status.to_le_bytes());
        out[4..12].copy_from_slice(&self.handshake.to_bytes());
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < RECORD_HEADER_LEN {
            return Err(WireError::Truncated {
                structure: "RecordHeader",
                offset: buf.len(),
            });
        }
        Ok(Self {
            request: read_u16_le(buf, 0),
            status: read_u16_le(buf, 2),
            handshake: HandshakeInfo::from_bytes(&buf[4..12])?,
        })
    }
}

/// A request record as raised by the firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub header: RecordHeader,
    pub body: [u8; UNION_LEN],
}

impl RequestRecord {
    /// Build a record around a type-specific payload, zero padding the union.
    pub fn build(
        request_type: EccRequestType,
        handshake: HandshakeInfo,
        payload: &[u8],
    ) -> Result<Self, WireError> {
        if payload.len() != request_type.payload_len() {
            return Err(WireError::LengthMismatch {
                structure: "RequestRecord.payload",
                expected: request_type.payload_len(),
                actual: payload.len(),
            });
        }

        let mut body = [0u8; UNION_LEN];
        body[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            header: RecordHeader::new(request_type.as_u16(), EccStatus::Success, handshake),
            body,
        })
    }

    pub fn parse(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() != REQUEST_RECORD_LEN {
            return Err(WireError::LengthMismatch {
                structure: "RequestRecord",
                expected: REQUEST_RECORD_LEN,
                actual: buf.len(),
            });
        }

        let header = RecordHeader::from_bytes(&buf[..RECORD_HEADER_LEN])?;
        let mut body = [0u8; UNION_LEN];
        body.copy_from_slice(&buf[RECORD_HEADER_LEN..]);
        Ok(Self { header, body })
    }

    pub fn request_type(&self) -> Result<EccRequestType, WireError> {
        EccRequestType::from_wire(self.header.request)
    }

    pub fn handshake(&self) -> HandshakeInfo {
        self.header.handshake
    }

    /// The active union member: the prefix whose length the tag implies.
    pub fn payload(&self) -> Result<&[u8], WireError> {
        let len = self.request_type()?.payload_len();
        Ok(&self.body[..len])
    }

    pub fn to_bytes(&self) -> [u8; REQUEST_RECORD_LEN] {
        let mut out = [0u8; REQUEST_RECORD_LEN];
        out[..RECORD_HEADER_LEN].copy_from_slice(&self.header.to_bytes());
        out[RECORD_HEADER_LEN..].copy_from_slice(&self.body);
        out
    }
}

/// A response record sent back to the firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub header: RecordHeader,
    /// Active structure (`EcdhInfo`, `EcdsaSignRequestInfo` or `EcdsaVerifyRequestInfo`).
    pub body: Vec<u8>,
    /// Data packet following the record (signature bytes for sign requests).
    pub data: Vec<u8>,
}

impl ResponseRecord {
    pub fn new(header: RecordHeader, body: Vec<u8>, data: Vec<u8>) -> Self {
        Self { header, body, data }
    }

    pub fn status(&self) -> Result<EccStatus, WireError> {
        EccStatus::from_wire(self.header.status)
    }

    /// Header followed by the active structure; `data` travels separately.
    pub fn record_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RECORD_HEADER_LEN + self.body.len());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    pub fn parse(record: &[u8], data: &[u8]) -> Result<Self, WireError> {
        let header = RecordHeader::from_bytes(record)?;
        Ok(Self {
            header,
            body: record[RECORD_HEADER_LEN..].to_vec(),
            data: data.to_vec(),
        })
    }
}

/// Wipes the body and data, which may hold a shared secret.
impl Zeroize for ResponseRecord {
    fn zeroize(&mut self) {
        self.body.zeroize();
        self.data.zeroize();
    }
}
