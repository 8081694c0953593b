//! # Request Decoder
//!
//! Turns a raw `(requestType, payload, handshake)` triple into a typed
//! [`EccRequest`]. Pure: no I/O, no state.

use crate::domain::entities::{EccOperation, EccRequest};
use crate::domain::errors::BridgeError;
use shared_wire::{
    EccRequestType, EcdhInfo, EcdsaSignRequestInfo, EcdsaVerifyRequestInfo, HandshakeInfo,
};

/// Decode a firmware request.
///
/// The payload length must match the structure the tag implies exactly;
/// there is no partial decode.
pub fn decode(
    request_type: u16,
    payload: &[u8],
    handshake: HandshakeInfo,
) -> Result<EccRequest, BridgeError> {
    let tag = EccRequestType::from_wire(request_type)?;

    if payload.len() != tag.payload_len() {
        return Err(BridgeError::MalformedRequest(format!(
            "{:?} payload is {} bytes, expected {}",
            tag,
            payload.len(),
            tag.payload_len()
        )));
    }

    let operation = match tag {
        EccRequestType::ClientEcdh => EccOperation::ClientEcdh(EcdhInfo::from_bytes(payload)?),
        EccRequestType::ServerEcdh => EccOperation::ServerEcdh(EcdhInfo::from_bytes(payload)?),
        EccRequestType::GenerateKey => EccOperation::GenerateKey(EcdhInfo::from_bytes(payload)?),
        EccRequestType::SignGenerate => {
            EccOperation::Sign(EcdsaSignRequestInfo::from_bytes(payload)?)
        }
        EccRequestType::SignVerify => {
            EccOperation::Verify(EcdsaVerifyRequestInfo::from_bytes(payload)?)
        }
    };

    Ok(EccRequest::new(handshake, operation))
}
