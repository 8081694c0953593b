//! # ECC Bridge Service
//!
//! Application service that implements the `EccOffloadApi` trait.
//!
//! ## Architecture
//!
//! This is the hexagonal "application service" that:
//! - Implements the inbound port (`EccOffloadApi`)
//! - Drives the outbound ports (`CryptoBackend`, `FirmwareMemory`, `CompletionSink`)
//! - Delegates decoding, encoding and policy to the domain layer
//!
//! Each accepted request runs in its own tokio task, so a slow backend
//! operation for one handshake never holds up another. A second task per
//! request enforces the timeout. Backend work is never aborted mid-call: a
//! request that times out or is cancelled still runs to the end, its result
//! is discarded, and any key it generated is released.

use crate::config::{BridgeConfig, ConfigError};
use crate::domain::correlation::{CorrelationStats, CorrelationTable, SlotState, Ticket};
use crate::domain::decoder::decode;
use crate::domain::encoder::{encode, encode_failure};
use crate::domain::entities::{
    EccCompletion, EccOperation, EccOutcome, EccRequest, EccResult, RequestEvent,
};
use crate::domain::errors::BridgeError;
use crate::domain::policy::CipherSuitePolicy;
use crate::ports::inbound::EccOffloadApi;
use crate::ports::outbound::{CompletionSink, CryptoBackend, FirmwareMemory};
use shared_wire::certificate::{CertificateHeader, CERTIFICATE_HEADER_LEN};
use shared_wire::{
    CertificateEntry, CipherSuite, EccRequestType, EcdhInfo, EcdsaSignRequestInfo,
    EcdsaVerifyRequestInfo, HandshakeInfo, KeyHandle, RecordHeader, RequestRecord,
    SetActiveCipherSuites,
};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

/// ECC offload bridge service.
pub struct EccBridgeService<B, F, S> {
    inner: Arc<Inner<B, F, S>>,
}

impl<B, F, S> Clone for EccBridgeService<B, F, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<B, F, S> {
    backend: B,
    firmware: F,
    sink: S,
    config: BridgeConfig,
    table: CorrelationTable,
    policy: CipherSuitePolicy,
    /// Serializes the policy check plus slot acceptance against suite changes.
    admission: Mutex<()>,
}

impl<B, F, S> EccBridgeService<B, F, S>
where
    B: CryptoBackend,
    F: FirmwareMemory,
    S: CompletionSink,
{
    /// Create a new bridge service.
    ///
    /// # Errors
    /// Fails if `config` does not validate.
    pub fn new(backend: B, firmware: F, sink: S, config: BridgeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = CipherSuitePolicy::new(config.cipher_suite_mask)
            .map_err(|_| ConfigError::NoCipherSuites(config.cipher_suite_mask))?;

        info!(
            timeout_ms = config.request_timeout_ms,
            cipher_suites = %format!("{:#06x}", policy.active_mask()),
            identity_key = ?config.identity_key,
            "ECC offload bridge started"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                backend,
                firmware,
                sink,
                config,
                table: CorrelationTable::new(),
                policy,
                admission: Mutex::new(()),
            }),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> &CorrelationStats {
        self.inner.table.stats()
    }

    pub fn active_suites(&self) -> BTreeSet<CipherSuite> {
        self.inner.policy.active_suites()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.table.pending_count()
    }

    /// Refuse an event that was not accepted into a slot.
    ///
    /// A FAILURE completion is sent unless the token is already pending, in
    /// which case the pending request owns the token's only completion.
    fn refuse(&self, request: u16, handshake: HandshakeInfo, err: BridgeError) -> BridgeError {
        let _admission = self.inner.admission.lock();
        if let Err(duplicate) = self.inner.table.ensure_not_pending(handshake) {
            return duplicate;
        }
        self.reject(request, handshake, &err);
        err
    }

    fn reject(&self, request: u16, handshake: HandshakeInfo, err: &BridgeError) {
        warn!(
            handshake = %handshake,
            request,
            error = err.kind(),
            detail = %err,
            "Rejecting ECC request"
        );
        self.inner.sink.complete(EccCompletion::new(
            handshake,
            request,
            err.status(),
            encode_failure(request, handshake),
        ));
    }
}

#[async_trait::async_trait]
impl<B, F, S> EccOffloadApi for EccBridgeService<B, F, S>
where
    B: CryptoBackend,
    F: FirmwareMemory,
    S: CompletionSink,
{
    async fn submit(&self, event: RequestEvent) -> Result<Ticket, BridgeError> {
        let handshake = event.handshake;

        let mut request = match decode(event.request_type, &event.payload, handshake) {
            Ok(request) => request,
            Err(err) => return Err(self.refuse(event.request_type, handshake, err)),
        };
        if let Some(address) = event.data_address {
            request = request.with_data_address(address);
        }
        let tag = request.request_type();

        let permitted = {
            let _admission = self.inner.admission.lock();
            match self.inner.policy.permits(&request.operation) {
                Ok(()) => Ok(self.inner.table.begin(handshake, tag)?),
                Err(err) => Err(err),
            }
        };
        let ticket = permitted.map_err(|err| self.refuse(event.request_type, handshake, err))?;

        let worker = Arc::clone(&self.inner);
        tokio::spawn(async move { worker.run(ticket, request).await });

        let watchdog = Arc::clone(&self.inner);
        let timer = tokio::spawn(async move { watchdog.expire(ticket, tag).await });
        if !self.inner.table.attach_task(&ticket, timer.abort_handle()) {
            timer.abort();
        }

        Ok(ticket)
    }

    async fn submit_record(
        &self,
        record: &[u8],
        data_address: Option<u32>,
    ) -> Result<Ticket, BridgeError> {
        match RequestRecord::parse(record) {
            Ok(parsed) => self.submit(RequestEvent::from_record(&parsed, data_address)).await,
            Err(wire) => {
                let err = BridgeError::MalformedRequest(wire.to_string());
                // A readable header still names the handshake to fail.
                match RecordHeader::from_bytes(record) {
                    Ok(header) => Err(self.refuse(header.request, header.handshake, err)),
                    Err(_) => Err(err),
                }
            }
        }
    }

    fn cancel(&self, handshake: HandshakeInfo) -> bool {
        self.inner.table.cancel(handshake)
    }

    fn configure_cipher_suites(&self, mask: u32) -> Result<SetActiveCipherSuites, BridgeError> {
        let _admission = self.inner.admission.lock();
        self.inner.policy.apply(mask, self.inner.table.pending_count())
    }

    fn state_of(&self, handshake: HandshakeInfo) -> SlotState {
        self.inner.table.state_of(handshake)
    }
}

impl<B, F, S> Inner<B, F, S>
where
    B: CryptoBackend,
    F: FirmwareMemory,
    S: CompletionSink,
{
    async fn run(&self, ticket: Ticket, request: EccRequest) {
        let tag = request.request_type();
        let mut result = self.handle(&request).await;

        let (status, mut response) = match &result {
            Ok(result) => (result.status(), encode(result, ticket.handshake)),
            Err(err) => {
                warn!(
                    handshake = %ticket.handshake,
                    request = ?tag,
                    error = err.kind(),
                    detail = %err,
                    "ECC request failed"
                );
                (err.status(), encode_failure(tag.as_u16(), ticket.handshake))
            }
        };

        if let Ok(result) = &mut result {
            result.outcome.zeroize();
        }

        if !self.table.finish(&ticket, status) {
            response.zeroize();
            if let Ok(result) = &result {
                self.discard(ticket, result).await;
            }
            return;
        }
        self.sink.complete(EccCompletion::new(
            ticket.handshake,
            tag.as_u16(),
            status,
            response,
        ));
        self.table.release(&ticket);
    }

    /// Fail `ticket` with `Timeout` unless its result arrived first.
    async fn expire(&self, ticket: Ticket, tag: EccRequestType) {
        tokio::time::sleep(self.config.request_timeout()).await;
        if !self.table.expire(&ticket) {
            return;
        }

        let err = BridgeError::Timeout(self.config.request_timeout_ms);
        warn!(
            handshake = %ticket.handshake,
            request = ?tag,
            error = err.kind(),
            "ECC request timed out"
        );
        self.sink.complete(EccCompletion::new(
            ticket.handshake,
            tag.as_u16(),
            err.status(),
            encode_failure(tag.as_u16(), ticket.handshake),
        ));
        self.table.release(&ticket);
    }

    /// Release what an undelivered result left in the backend.
    async fn discard(&self, ticket: Ticket, result: &EccResult) {
        let EccOutcome::KeyPair(point) = &result.outcome else {
            return;
        };
        let handle = point.private_key_id;
        match self.backend.release_key(handle).await {
            Ok(()) => debug!(
                handshake = %ticket.handshake,
                handle = %handle,
                "Released key of discarded result"
            ),
            Err(err) => warn!(
                handshake = %ticket.handshake,
                handle = %handle,
                error = %err,
                "Could not release key of discarded result"
            ),
        }
    }

    async fn handle(&self, request: &EccRequest) -> Result<EccResult, BridgeError> {
        match &request.operation {
            EccOperation::ClientEcdh(info) => self.client_ecdh(info).await,
            EccOperation::ServerEcdh(info) => self.server_ecdh(info).await,
            EccOperation::GenerateKey(info) => self.generate_key(info).await,
            EccOperation::Sign(info) => self.sign(info, request.data_address).await,
            EccOperation::Verify(info) => self.verify(info, request.data_address).await,
        }
    }

    async fn client_ecdh(&self, info: &EcdhInfo) -> Result<EccResult, BridgeError> {
        let peer = &info.public_key;
        let curve = peer.curve().ok_or_else(|| {
            BridgeError::UnsupportedCurve(format!("coordinate size {}", peer.size))
        })?;

        let (mut local, ephemeral) = self.backend.generate_key_pair(curve).await?;
        let secret = self.backend.ecdh(peer, ephemeral).await;
        if let Err(err) = self.backend.release_key(ephemeral).await {
            debug!(handle = %ephemeral, error = %err, "Ephemeral key release failed");
        }
        let secret = secret?;

        local.private_key_id = KeyHandle::UNASSIGNED;
        let response = EcdhInfo::new(local)
            .with_shared_secret(secret.as_bytes())
            .map_err(|e| BridgeError::CryptoBackendFailure(e.to_string()))?;

        Ok(EccResult::new(
            EccRequestType::ClientEcdh,
            EccOutcome::Ecdh(response),
        ))
    }

    async fn server_ecdh(&self, info: &EcdhInfo) -> Result<EccResult, BridgeError> {
        let peer = &info.public_key;
        let key = peer.private_key_id;
        if !key.is_assigned() {
            return Err(BridgeError::UnknownKeyHandle(key));
        }
        if peer.curve().is_none() {
            return Err(BridgeError::UnsupportedCurve(format!(
                "coordinate size {}",
                peer.size
            )));
        }

        let secret = self.backend.ecdh(peer, key).await?;
        let response = EcdhInfo::new(peer.clone())
            .with_shared_secret(secret.as_bytes())
            .map_err(|e| BridgeError::CryptoBackendFailure(e.to_string()))?;

        Ok(EccResult::new(
            EccRequestType::ServerEcdh,
            EccOutcome::Ecdh(response),
        ))
    }

    async fn generate_key(&self, info: &EcdhInfo) -> Result<EccResult, BridgeError> {
        let curve = match info.public_key.size {
            0 => self.config.default_curve,
            size => info.public_key.curve().ok_or_else(|| {
                BridgeError::UnsupportedCurve(format!("coordinate size {}", size))
            })?,
        };

        let (mut point, handle) = self.backend.generate_key_pair(curve).await?;
        if point.size as usize != curve.coordinate_size() || !handle.is_assigned() {
            return Err(BridgeError::CryptoBackendFailure(format!(
                "backend returned a {}-byte point for {}",
                point.size, curve
            )));
        }
        point.private_key_id = handle;

        debug!(handle = %handle, curve = %curve, "Key pair generated");
        Ok(EccResult::new(
            EccRequestType::GenerateKey,
            EccOutcome::KeyPair(point),
        ))
    }

    async fn sign(
        &self,
        info: &EcdsaSignRequestInfo,
        data_address: Option<u32>,
    ) -> Result<EccResult, BridgeError> {
        info.validate()?;
        let key = self
            .config
            .identity_key
            .ok_or(BridgeError::UnknownKeyHandle(KeyHandle::UNASSIGNED))?;
        let address = data_address.ok_or_else(|| {
            BridgeError::MalformedRequest("sign request without a hash buffer".to_string())
        })?;

        let hash_size = info.hash_size as usize;
        let hash = self.firmware.read(address, hash_size).await?;
        if hash.len() != hash_size {
            return Err(BridgeError::HashSizeMismatch {
                expected: hash_size,
                actual: hash.len(),
            });
        }

        let signature = self.backend.sign(&hash, hash_size, key).await?;
        Ok(EccResult::new(
            EccRequestType::SignGenerate,
            EccOutcome::Signature {
                info: *info,
                signature,
            },
        ))
    }

    async fn verify(
        &self,
        info: &EcdsaVerifyRequestInfo,
        data_address: Option<u32>,
    ) -> Result<EccResult, BridgeError> {
        let count = info.signature_count as usize;
        if count > self.config.max_verify_batch {
            return Err(BridgeError::MalformedRequest(format!(
                "{} signatures exceed the batch limit of {}",
                count, self.config.max_verify_batch
            )));
        }
        let mut cursor = data_address.ok_or_else(|| {
            BridgeError::MalformedRequest("verify request without certificate buffer".to_string())
        })?;

        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let raw = self.firmware.read(cursor, CERTIFICATE_HEADER_LEN).await?;
            let header = CertificateHeader::from_bytes(&raw)?;
            let body_address = advance(cursor, CERTIFICATE_HEADER_LEN)?;
            let body = self.firmware.read(body_address, header.body_len()).await?;

            entries.push(CertificateEntry::from_parts(&header, &body)?);
            cursor = advance(body_address, header.body_len())?;
        }

        let outcomes = self.backend.verify_batch(&entries).await?;
        if outcomes.len() != count {
            return Err(BridgeError::CryptoBackendFailure(format!(
                "backend returned {} outcomes for {} signatures",
                outcomes.len(),
                count
            )));
        }

        debug!(
            signatures = count,
            failed = outcomes.iter().filter(|ok| !**ok).count(),
            "Verify batch evaluated"
        );
        Ok(EccResult::new(
            EccRequestType::SignVerify,
            EccOutcome::Verification {
                info: *info,
                outcomes,
            },
        ))
    }
}

fn advance(address: u32, len: usize) -> Result<u32, BridgeError> {
    u32::try_from(len)
        .ok()
        .and_then(|len| address.checked_add(len))
        .ok_or_else(|| BridgeError::MalformedRequest("certificate buffer wraps address space".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ChannelCompletionSink, InMemoryFirmwareMemory, SoftwareBackend};
    use shared_wire::cipher::groups;
    use shared_wire::{EccStatus, EcPoint};
    use tokio::sync::mpsc::UnboundedReceiver;

    type TestService =
        EccBridgeService<Arc<SoftwareBackend>, Arc<InMemoryFirmwareMemory>, ChannelCompletionSink>;

    fn service(config: BridgeConfig) -> (TestService, UnboundedReceiver<EccCompletion>) {
        let (sink, receiver) = ChannelCompletionSink::channel();
        let service = EccBridgeService::new(
            Arc::new(SoftwareBackend::new(config.key_store_capacity)),
            Arc::new(InMemoryFirmwareMemory::new()),
            sink,
            config,
        )
        .unwrap();
        (service, receiver)
    }

    fn keygen_event(token: HandshakeInfo) -> RequestEvent {
        RequestEvent::new(
            EccRequestType::GenerateKey.as_u16(),
            EcdhInfo::new(EcPoint::empty(32)).to_bytes().to_vec(),
            token,
        )
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (sink, _receiver) = ChannelCompletionSink::channel();
        let result = EccBridgeService::new(
            SoftwareBackend::new(4),
            InMemoryFirmwareMemory::new(),
            sink,
            BridgeConfig {
                cipher_suite_mask: 0,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(ConfigError::NoCipherSuites(0))));
    }

    #[tokio::test]
    async fn test_generate_key_completes() {
        let (service, mut receiver) = service(BridgeConfig::default());
        let token = HandshakeInfo::new(1, 1);

        service.submit(keygen_event(token)).await.unwrap();
        let completion = receiver.recv().await.unwrap();

        assert_eq!(completion.handshake, token);
        assert_eq!(completion.status, EccStatus::Success);
        assert_eq!(completion.response.body.len(), 100);
        assert_eq!(service.stats().completed(), 1);
    }

    #[tokio::test]
    async fn test_malformed_event_fails_with_completion() {
        let (service, mut receiver) = service(BridgeConfig::default());
        let token = HandshakeInfo::new(2, 2);

        let result = service
            .submit(RequestEvent::new(1, vec![0; 50], token))
            .await;
        assert!(matches!(result, Err(BridgeError::MalformedRequest(_))));

        let completion = receiver.recv().await.unwrap();
        assert_eq!(completion.status, EccStatus::Failure);
        assert_eq!(completion.request, 1);
        assert_eq!(service.state_of(token), SlotState::Idle);
    }

    #[tokio::test]
    async fn test_ecdh_refused_without_ecdhe_suite() {
        let (service, mut receiver) = service(BridgeConfig {
            cipher_suite_mask: groups::NON_ECC_AES_128,
            ..Default::default()
        });

        let result = service.submit(keygen_event(HandshakeInfo::new(3, 3))).await;
        assert_eq!(result, Err(BridgeError::UnsupportedOperation(3)));
        assert!(!receiver.recv().await.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_sign_without_identity_key_fails() {
        let (service, mut receiver) = service(BridgeConfig::default());
        let info = EcdsaSignRequestInfo::new(shared_wire::EcNamedCurve::Secp256r1, 32);
        let event = RequestEvent::new(4, info.to_bytes().to_vec(), HandshakeInfo::new(4, 4))
            .with_data_address(0x100);

        service.submit(event).await.unwrap();
        let completion = receiver.recv().await.unwrap();
        assert_eq!(completion.status, EccStatus::Failure);
        assert_eq!(completion.response.body, vec![0u8; 4]);
        assert_eq!(service.stats().failed(), 1);
    }

    #[tokio::test]
    async fn test_short_record_without_header_has_no_completion() {
        let (service, mut receiver) = service(BridgeConfig::default());

        let result = service.submit_record(&[1, 0, 0], None).await;
        assert!(matches!(result, Err(BridgeError::MalformedRequest(_))));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_advance_overflow() {
        assert_eq!(advance(10, 8), Ok(18));
        assert!(advance(u32::MAX - 2, 8).is_err());
    }
}
