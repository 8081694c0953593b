//! # Certificate Entries
//!
//! Verify requests carry their signatures out-of-band: firmware memory after
//! the request record holds `nSig` consecutive entries of the form
//!
//! ```text
//! curve:u16 | keySz:u16 | hashSz:u16 | sigSz:u16     (big-endian)
//! X[keySz] | Y[keySz] | hash[hashSz] | signature[sigSz]
//! ```

use crate::entities::{EcNamedCurve, EcPoint, KeyHandle};
use crate::errors::WireError;

/// Encoded size of [`CertificateHeader`].
pub const CERTIFICATE_HEADER_LEN: usize = 8;

/// Largest digest an entry may carry (SHA-512).
pub const MAX_HASH_LEN: usize = 64;

/// Largest signature an entry may carry (DER-encoded P-256 signature).
pub const MAX_SIGNATURE_LEN: usize = 72;

/// Fixed-size prefix of a certificate entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateHeader {
    pub curve: EcNamedCurve,
    pub key_size: u16,
    pub hash_size: u16,
    pub signature_size: u16,
}

impl CertificateHeader {
    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() != CERTIFICATE_HEADER_LEN {
            return Err(WireError::LengthMismatch {
                structure: "CertificateHeader",
                expected: CERTIFICATE_HEADER_LEN,
                actual: buf.len(),
            });
        }

        let word = |offset: usize| u16::from_be_bytes([buf[offset], buf[offset + 1]]);
        let curve = EcNamedCurve::from_id(word(0))?;
        let header = Self {
            curve,
            key_size: word(2),
            hash_size: word(4),
            signature_size: word(6),
        };

        if header.key_size as usize != curve.coordinate_size() {
            return Err(WireError::LengthMismatch {
                structure: "CertificateHeader.keySz",
                expected: curve.coordinate_size(),
                actual: header.key_size as usize,
            });
        }
        if header.hash_size == 0 || header.hash_size as usize > MAX_HASH_LEN {
            return Err(WireError::LengthMismatch {
                structure: "CertificateHeader.hashSz",
                expected: MAX_HASH_LEN,
                actual: header.hash_size as usize,
            });
        }
        if header.signature_size == 0 || header.signature_size as usize > MAX_SIGNATURE_LEN {
            return Err(WireError::LengthMismatch {
                structure: "CertificateHeader.sigSz",
                expected: MAX_SIGNATURE_LEN,
                actual: header.signature_size as usize,
            });
        }

        Ok(header)
    }

    pub fn to_bytes(&self) -> [u8; CERTIFICATE_HEADER_LEN] {
        let mut out = [0u8; CERTIFICATE_HEADER_LEN];
        out[0..2].copy_from_slice(&self.curve.id().to_be_bytes());
        out[2..4].copy_from_slice(&self.key_size.to_be_bytes());
        out[4..6].copy_from_slice(&self.hash_size.to_be_bytes());
        out[6..8].copy_from_slice(&self.signature_size.to_be_bytes());
        out
    }

    /// Length of the variable section that follows the header.
    pub fn body_len(&self) -> usize {
        2 * self.key_size as usize + self.hash_size as usize + self.signature_size as usize
    }
}

/// One signature to verify, with the public key and digest it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateEntry {
    pub curve: EcNamedCurve,
    pub public_key: EcPoint,
    pub hash: Vec<u8>,
    pub signature: Vec<u8>,
}

impl CertificateEntry {
    /// Assemble an entry from a parsed header and its body bytes.
    pub fn from_parts(header: &CertificateHeader, body: &[u8]) -> Result<Self, WireError> {
        if body.len() != header.body_len() {
            return Err(WireError::LengthMismatch {
                structure: "CertificateEntry",
                expected: header.body_len(),
                actual: body.len(),
            });
        }

        let key = header.key_size as usize;
        let hash_end = 2 * key + header.hash_size as usize;
        let public_key = EcPoint::new(&body[..key], &body[key..2 * key], KeyHandle::UNASSIGNED)?;

        Ok(Self {
            curve: header.curve,
            public_key,
            hash: body[2 * key..hash_end].to_vec(),
            signature: body[hash_end..].to_vec(),
        })
    }

    pub fn header(&self) -> CertificateHeader {
        CertificateHeader {
            curve: self.curve,
            key_size: self.public_key.size,
            hash_size: self.hash.len() as u16,
            signature_size: self.signature.len() as u16,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let header = self.header();
        let mut out = Vec::with_capacity(CERTIFICATE_HEADER_LEN + header.body_len());
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(self.public_key.x_coordinate());
        out.extend_from_slice(self.public_key.y_coordinate());
        out.extend_from_slice(&self.hash);
        out.extend_from_slice(&self.signature);
        out
    }

    /// Parse `count` consecutive entries from a contiguous buffer.
    pub fn parse_all(buf: &[u8], count: usize) -> Result<Vec<Self>, WireError> {
        let mut entries = Vec::with_capacity(count);
        let mut offset = 0;

        for _ in 0..count {
            let header_end = offset + CERTIFICATE_HEADER_LEN;
            if buf.len() < header_end {
                return Err(WireError::Truncated {
                    structure: "CertificateEntry",
                    offset,
                });
            }
            let header = CertificateHeader::from_bytes(&buf[offset..header_end])?;

            let body_end = header_end + header.body_len();
            if buf.len() < body_end {
                return Err(WireError::Truncated {
                    structure: "CertificateEntry",
                    offset: header_end,
                });
            }
            entries.push(Self::from_parts(&header, &buf[header_end..body_end])?);
            offset = body_end;
        }

        Ok(entries)
    }
}
