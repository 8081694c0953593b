//! # Inbound Ports (Driving Ports / API)
//!
//! The API the host driver uses to hand firmware requests to the bridge.

use crate::domain::correlation::{SlotState, Ticket};
use crate::domain::entities::RequestEvent;
use crate::domain::errors::BridgeError;
use shared_wire::{HandshakeInfo, SetActiveCipherSuites};

/// Primary ECC offload API.
///
/// Accepted requests complete asynchronously through the
/// [`CompletionSink`](crate::ports::outbound::CompletionSink).
#[async_trait::async_trait]
pub trait EccOffloadApi: Send + Sync {
    /// Accept a request event.
    ///
    /// # Errors
    /// * `DuplicateInFlightRequest` - the token is already pending; no
    ///   completion is delivered for this event
    /// * any decode error - a `FAILURE` completion is delivered as well
    async fn submit(&self, event: RequestEvent) -> Result<Ticket, BridgeError>;

    /// Accept a framed 112-byte request record.
    async fn submit_record(
        &self,
        record: &[u8],
        data_address: Option<u32>,
    ) -> Result<Ticket, BridgeError>;

    /// Force `handshake` back to `Idle`. A late result is never delivered.
    fn cancel(&self, handshake: HandshakeInfo) -> bool;

    /// Replace the active cipher-suite bitmap.
    ///
    /// Returns the record to forward to the firmware.
    fn configure_cipher_suites(&self, mask: u32) -> Result<SetActiveCipherSuites, BridgeError>;

    fn state_of(&self, handshake: HandshakeInfo) -> SlotState;
}
