//! Domain entities for the ECC offload bridge.

use shared_wire::{
    EccRequestType, EccStatus, EcPoint, EcdhInfo, EcdsaSignRequestInfo, EcdsaVerifyRequestInfo,
    HandshakeInfo, RecordHeader, RequestRecord, ResponseRecord,
};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A request event as raised by the firmware, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEvent {
    /// Raw `REQ` tag from the record header
    pub request_type: u16,
    /// Type-specific payload (the active union member)
    pub payload: Vec<u8>,
    /// Handshake token to echo in the response
    pub handshake: HandshakeInfo,
    /// Firmware address of the out-of-band buffer (hash or certificates)
    pub data_address: Option<u32>,
}

impl RequestEvent {
    pub fn new(request_type: u16, payload: Vec<u8>, handshake: HandshakeInfo) -> Self {
        Self {
            request_type,
            payload,
            handshake,
            data_address: None,
        }
    }

    pub fn with_data_address(mut self, address: u32) -> Self {
        self.data_address = Some(address);
        self
    }

    /// Lift a framed record into an event.
    ///
    /// For unknown tags the whole union region is kept as payload; decoding
    /// rejects the tag before looking at it.
    pub fn from_record(record: &RequestRecord, data_address: Option<u32>) -> Self {
        let payload = record
            .payload()
            .map(<[u8]>::to_vec)
            .unwrap_or_else(|_| record.body.to_vec());

        Self {
            request_type: record.header.request,
            payload,
            handshake: record.handshake(),
            data_address,
        }
    }
}

/// Decoded operation, one variant per request type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EccOperation {
    /// Peer (server) point; host answers with its ephemeral point and secret
    ClientEcdh(EcdhInfo),
    /// Peer (client) point; `public_key.private_key_id` names the local key
    ServerEcdh(EcdhInfo),
    /// `public_key.size` selects the curve (0 means the configured default)
    GenerateKey(EcdhInfo),
    Sign(EcdsaSignRequestInfo),
    Verify(EcdsaVerifyRequestInfo),
}

impl EccOperation {
    pub fn request_type(&self) -> EccRequestType {
        match self {
            Self::ClientEcdh(_) => EccRequestType::ClientEcdh,
            Self::ServerEcdh(_) => EccRequestType::ServerEcdh,
            Self::GenerateKey(_) => EccRequestType::GenerateKey,
            Self::Sign(_) => EccRequestType::SignGenerate,
            Self::Verify(_) => EccRequestType::SignVerify,
        }
    }
}

/// A decoded ECC request bound to its handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EccRequest {
    pub handshake: HandshakeInfo,
    pub operation: EccOperation,
    /// Firmware address of the hash (sign) or certificate entries (verify)
    pub data_address: Option<u32>,
}

impl EccRequest {
    pub fn new(handshake: HandshakeInfo, operation: EccOperation) -> Self {
        Self {
            handshake,
            operation,
            data_address: None,
        }
    }

    pub fn with_data_address(mut self, address: u32) -> Self {
        self.data_address = Some(address);
        self
    }

    pub fn request_type(&self) -> EccRequestType {
        self.operation.request_type()
    }

    /// Re-encode the payload this request was decoded from.
    pub fn to_payload(&self) -> Vec<u8> {
        match &self.operation {
            EccOperation::ClientEcdh(info)
            | EccOperation::ServerEcdh(info)
            | EccOperation::GenerateKey(info) => info.to_bytes().to_vec(),
            EccOperation::Sign(info) => info.to_bytes().to_vec(),
            EccOperation::Verify(info) => info.to_bytes().to_vec(),
        }
    }

    /// Frame this request as the firmware would raise it.
    pub fn to_record(&self) -> RequestRecord {
        let mut body = [0u8; shared_wire::frame::UNION_LEN];
        let payload = self.to_payload();
        body[..payload.len()].copy_from_slice(&payload);

        RequestRecord {
            header: RecordHeader::new(
                self.request_type().as_u16(),
                EccStatus::Success,
                self.handshake,
            ),
            body,
        }
    }
}

/// Result of a serviced operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EccOutcome {
    /// Public point and shared secret (client and server ECDH)
    Ecdh(EcdhInfo),
    /// Generated public point; `private_key_id` is the new handle
    KeyPair(EcPoint),
    /// Signature over the firmware-supplied hash
    Signature {
        info: EcdsaSignRequestInfo,
        signature: Vec<u8>,
    },
    /// Per-signature verification outcome, in request order
    Verification {
        info: EcdsaVerifyRequestInfo,
        outcomes: Vec<bool>,
    },
}

/// Wipes a shared secret carried by the outcome.
impl Zeroize for EccOutcome {
    fn zeroize(&mut self) {
        if let Self::Ecdh(info) = self {
            info.zeroize();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EccResult {
    pub request_type: EccRequestType,
    pub outcome: EccOutcome,
}

impl EccResult {
    pub fn new(request_type: EccRequestType, outcome: EccOutcome) -> Self {
        Self {
            request_type,
            outcome,
        }
    }

    /// A verify batch with any failing signature reports `FAILURE`.
    pub fn status(&self) -> EccStatus {
        match &self.outcome {
            EccOutcome::Verification { outcomes, .. } if outcomes.iter().any(|ok| !ok) => {
                EccStatus::Failure
            }
            _ => EccStatus::Success,
        }
    }
}

/// Delivered to the completion sink exactly once per accepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EccCompletion {
    pub handshake: HandshakeInfo,
    /// Raw request tag, echoed even when it was not recognized
    pub request: u16,
    pub status: EccStatus,
    pub response: ResponseRecord,
}

impl EccCompletion {
    pub fn new(handshake: HandshakeInfo, request: u16, status: EccStatus, response: ResponseRecord) -> Self {
        Self {
            handshake,
            request,
            status,
            response,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Shared secret returned by the crypto backend. Zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret([REDACTED; {}])", self.0.len())
    }
}
