//! # Response Encoder
//!
//! Builds the response record the firmware expects for each result. The
//! handshake token is copied verbatim into the header.
//!
//! | Request      | Body                      | Data      |
//! |--------------|---------------------------|-----------|
//! | Client ECDH  | `EcdhInfo` (point+secret) | none      |
//! | Server ECDH  | `EcdhInfo` (point+secret) | none      |
//! | Generate key | `EcdhInfo` (point, key=0) | none      |
//! | Sign         | `EcdsaSignRequestInfo`    | signature |
//! | Verify       | `EcdsaVerifyRequestInfo`  | none      |

use crate::domain::entities::{EccOutcome, EccResult};
use crate::domain::errors::BridgeError;
use shared_wire::{
    EccRequestType, EccStatus, EcdhInfo, EcdsaSignRequestInfo, EcdsaVerifyRequestInfo,
    HandshakeInfo, RecordHeader, ResponseRecord,
};
use zeroize::Zeroize;

/// Encode a result as a response record.
pub fn encode(result: &EccResult, handshake: HandshakeInfo) -> ResponseRecord {
    let header = RecordHeader::new(result.request_type.as_u16(), result.status(), handshake);

    let (body, data) = match &result.outcome {
        EccOutcome::Ecdh(info) => {
            let mut raw = info.to_bytes();
            let body = raw.to_vec();
            raw.zeroize();
            (body, Vec::new())
        }
        EccOutcome::KeyPair(point) => (EcdhInfo::new(point.clone()).to_bytes().to_vec(), Vec::new()),
        EccOutcome::Signature { info, signature } => (info.to_bytes().to_vec(), signature.clone()),
        EccOutcome::Verification { info, .. } => (info.to_bytes().to_vec(), Vec::new()),
    };

    ResponseRecord::new(header, body, data)
}

/// Encode a `FAILURE` response.
///
/// The body is the zeroed structure of the request type, or empty when the
/// tag itself was not recognized.
pub fn encode_failure(request: u16, handshake: HandshakeInfo) -> ResponseRecord {
    let body = EccRequestType::from_wire(request)
        .map(|tag| vec![0u8; tag.payload_len()])
        .unwrap_or_default();

    ResponseRecord::new(
        RecordHeader::new(request, EccStatus::Failure, handshake),
        body,
        Vec::new(),
    )
}

/// Parse a response record back into a result.
///
/// `FAILURE` records carry no result and yield `None`, except a verify
/// response that still names its batch size. Per-signature outcomes are not
/// on the wire, so they are rebuilt from the aggregate status.
pub fn decode_response(response: &ResponseRecord) -> Result<Option<EccResult>, BridgeError> {
    let request_type = EccRequestType::from_wire(response.header.request)?;
    let status = response.status()?;
    let failed = !status.is_success();

    let outcome = match request_type {
        _ if failed && response.body.iter().all(|b| *b == 0) => return Ok(None),
        EccRequestType::SignVerify => {
            let info = EcdsaVerifyRequestInfo::from_bytes(&response.body)?;
            EccOutcome::Verification {
                info,
                outcomes: vec![!failed; info.signature_count as usize],
            }
        }
        _ if failed => return Ok(None),
        EccRequestType::ClientEcdh | EccRequestType::ServerEcdh => {
            EccOutcome::Ecdh(EcdhInfo::from_bytes(&response.body)?)
        }
        EccRequestType::GenerateKey => {
            EccOutcome::KeyPair(EcdhInfo::from_bytes(&response.body)?.public_key)
        }
        EccRequestType::SignGenerate => EccOutcome::Signature {
            info: EcdsaSignRequestInfo::from_bytes(&response.body)?,
            signature: response.data.clone(),
        },
    };

    Ok(Some(EccResult::new(request_type, outcome)))
}
