//! # Firmware Simulator
//!
//! Plays the WINC side of the host interface: frames requests as 112-byte
//! records, stages out-of-band buffers (hashes, certificate entries) in
//! firmware memory, and parses the response records the bridge sends back.

use ecc_offload_bridge::adapters::{ChannelCompletionSink, InMemoryFirmwareMemory, SoftwareBackend};
use ecc_offload_bridge::{
    decode_response, BackendError, BridgeConfig, BridgeError, ConfigError, EccBridgeService,
    EccCompletion, EccOffloadApi, EccOperation, EccRequest, EccResult, Ticket,
};
use shared_wire::{CertificateEntry, EccStatus, HandshakeInfo, KeyHandle};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

/// Bridge type driven by the simulator.
pub type SimulatedBridge =
    EccBridgeService<Arc<SoftwareBackend>, Arc<InMemoryFirmwareMemory>, ChannelCompletionSink>;

const STAGING_BASE: u32 = 0x0002_0000;
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("bridge rejected request: {0}")]
    Bridge(#[from] BridgeError),

    #[error("invalid bridge configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("identity provisioning failed: {0}")]
    Backend(#[from] BackendError),

    #[error("no response within {0:?}")]
    NoResponse(Duration),

    #[error("response for handshake {actual}, expected {expected}")]
    UnexpectedHandshake {
        expected: HandshakeInfo,
        actual: HandshakeInfo,
    },
}

/// Firmware-side view of one bridge.
pub struct FirmwareSimulator {
    bridge: SimulatedBridge,
    backend: Arc<SoftwareBackend>,
    memory: Arc<InMemoryFirmwareMemory>,
    completions: UnboundedReceiver<EccCompletion>,
    next_address: u32,
    session: u32,
}

impl FirmwareSimulator {
    /// Start a bridge, optionally provisioning `identity` as the device key.
    pub fn start(mut config: BridgeConfig, identity: Option<&[u8]>) -> Result<Self, SimulatorError> {
        offload_telemetry::init_test_logging();

        let backend = Arc::new(SoftwareBackend::new(config.key_store_capacity));
        if let Some(secret) = identity {
            config.identity_key = Some(backend.provision_identity(secret)?);
        }

        let memory = Arc::new(InMemoryFirmwareMemory::new());
        let (sink, completions) = ChannelCompletionSink::channel();
        let bridge = EccBridgeService::new(Arc::clone(&backend), Arc::clone(&memory), sink, config)?;

        Ok(Self {
            bridge,
            backend,
            memory,
            completions,
            next_address: STAGING_BASE,
            session: 0,
        })
    }

    pub fn bridge(&self) -> &SimulatedBridge {
        &self.bridge
    }

    pub fn backend(&self) -> &SoftwareBackend {
        &self.backend
    }

    pub fn identity_key(&self) -> Option<KeyHandle> {
        self.bridge.config().identity_key
    }

    /// Handshake token for a new TLS session; each call opens a new session.
    pub fn open_session(&mut self) -> HandshakeInfo {
        self.session += 1;
        HandshakeInfo::new(self.session, 0)
    }

    /// Copy `bytes` into firmware memory and return their address.
    pub fn stage(&mut self, bytes: Vec<u8>) -> u32 {
        let address = self.next_address;
        // Leave a gap so an over-read hits unmapped memory
        self.next_address += ((bytes.len() as u32 + 0xFF) & !0xFF) + 0x100;
        self.memory.write(address, bytes);
        address
    }

    pub fn stage_certificates(&mut self, entries: &[CertificateEntry]) -> u32 {
        let blob = entries.iter().flat_map(CertificateEntry::to_bytes).collect();
        self.stage(blob)
    }

    /// Frame `request` as a record and raise it.
    pub async fn raise(&self, request: &EccRequest) -> Result<Ticket, SimulatorError> {
        let record = request.to_record().to_bytes();
        Ok(self.bridge.submit_record(&record, request.data_address).await?)
    }

    pub async fn next_completion(&mut self) -> Result<EccCompletion, SimulatorError> {
        tokio::time::timeout(RESPONSE_TIMEOUT, self.completions.recv())
            .await
            .ok()
            .flatten()
            .ok_or(SimulatorError::NoResponse(RESPONSE_TIMEOUT))
    }

    /// Raise `request` and wait for its response.
    pub async fn exchange(
        &mut self,
        request: &EccRequest,
    ) -> Result<(EccStatus, Option<EccResult>), SimulatorError> {
        self.raise(request).await?;
        let completion = self.next_completion().await?;
        if completion.handshake != request.handshake {
            return Err(SimulatorError::UnexpectedHandshake {
                expected: request.handshake,
                actual: completion.handshake,
            });
        }

        let status = completion.response.status().map_err(BridgeError::from)?;
        let result = decode_response(&completion.response)?;
        Ok((status, result))
    }

    /// Build a request on `handshake` with the next sequence number.
    pub fn request(&self, handshake: &mut HandshakeInfo, operation: EccOperation) -> EccRequest {
        handshake.data[1] += 1;
        EccRequest::new(*handshake, operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_wire::{EcPoint, EcdhInfo};

    #[tokio::test]
    async fn test_stage_keeps_buffers_apart() {
        let mut sim = FirmwareSimulator::start(BridgeConfig::default(), None).unwrap();
        let a = sim.stage(vec![1; 10]);
        let b = sim.stage(vec![2; 300]);
        let c = sim.stage(vec![3; 1]);

        assert!(b >= a + 10);
        assert!(c >= b + 300);
    }

    #[tokio::test]
    async fn test_exchange_key_generation() {
        let mut sim = FirmwareSimulator::start(BridgeConfig::default(), None).unwrap();
        let mut session = sim.open_session();
        let request = sim.request(
            &mut session,
            EccOperation::GenerateKey(EcdhInfo::new(EcPoint::empty(32))),
        );

        let (status, result) = sim.exchange(&request).await.unwrap();
        assert_eq!(status, EccStatus::Success);
        assert!(result.is_some());
        assert_eq!(session.seq_no(), 1);
    }
}
