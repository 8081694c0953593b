//! # Handshake Flows
//!
//! Drives complete ECC offload choreographies the way WINC firmware raises
//! them during a TLS 1.2 handshake:
//!
//! 1. **Client, ECDHE-ECDSA**: verify the server chain, derive the pre-master
//!    secret from the server's ephemeral point, sign CertificateVerify.
//! 2. **Server, ECDHE-ECDSA**: generate the ephemeral key, sign the
//!    ServerKeyExchange parameters, derive the secret from the client point.
//! 3. **Many sessions**: independent handshakes in flight at once.

#[cfg(test)]
mod tests {
    use crate::simulator::{FirmwareSimulator, SimulatorError};
    use ecc_offload_bridge::{BridgeConfig, BridgeError, EccOffloadApi, EccOperation, EccOutcome};
    use p256::ecdsa::signature::hazmat::PrehashSigner;
    use p256::ecdsa::signature::Verifier;
    use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
    use p256::elliptic_curve::sec1::ToEncodedPoint;
    use p256::{PublicKey, SecretKey};
    use rand::rngs::OsRng;
    use sha2::{Digest, Sha256};
    use shared_wire::cipher::groups;
    use shared_wire::{
        CertificateEntry, EccStatus, EcNamedCurve, EcPoint, EcdhInfo, EcdsaSignRequestInfo,
        EcdsaVerifyRequestInfo, HandshakeInfo, KeyHandle,
    };
    use std::collections::HashSet;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const DEVICE_IDENTITY: [u8; 32] = [0x5E; 32];

    fn to_point(public: &PublicKey, handle: KeyHandle) -> EcPoint {
        let encoded = public.to_encoded_point(false);
        EcPoint::new(encoded.x().unwrap(), encoded.y().unwrap(), handle).unwrap()
    }

    fn to_public(point: &EcPoint) -> PublicKey {
        let mut sec1 = vec![0x04];
        sec1.extend_from_slice(point.x_coordinate());
        sec1.extend_from_slice(point.y_coordinate());
        PublicKey::from_sec1_bytes(&sec1).unwrap()
    }

    /// A certificate-style signature by `signer` over `tbs`.
    fn certificate(signer: &SigningKey, tbs: &[u8]) -> CertificateEntry {
        let digest = Sha256::digest(tbs);
        let signature: Signature = signer.sign_prehash(&digest).unwrap();
        CertificateEntry {
            curve: EcNamedCurve::Secp256r1,
            public_key: to_point(&PublicKey::from(signer.verifying_key()), KeyHandle::UNASSIGNED),
            hash: digest.to_vec(),
            signature: signature.to_bytes().to_vec(),
        }
    }

    fn identity_public() -> PublicKey {
        SecretKey::from_slice(&DEVICE_IDENTITY).unwrap().public_key()
    }

    fn simulator() -> FirmwareSimulator {
        FirmwareSimulator::start(BridgeConfig::default(), Some(&DEVICE_IDENTITY)).unwrap()
    }

    // =============================================================================
    // CLIENT ROLE
    // =============================================================================

    #[tokio::test]
    async fn test_client_ecdhe_ecdsa_handshake() {
        let mut sim = simulator();
        let mut session = sim.open_session();

        // Server side of the handshake
        let ca = SigningKey::random(&mut OsRng);
        let server_cert_key = SigningKey::random(&mut OsRng);
        let server_ephemeral = SecretKey::random(&mut OsRng);
        let server_point = to_point(&server_ephemeral.public_key(), KeyHandle::UNASSIGNED);

        // 1. Certificate chain and ServerKeyExchange signature
        let chain = vec![
            certificate(&ca, b"tbsCertificate: CN=server"),
            certificate(&server_cert_key, &EcdhInfo::new(server_point.clone()).to_bytes()),
        ];
        let address = sim.stage_certificates(&chain);
        let request = sim
            .request(&mut session, EccOperation::Verify(EcdsaVerifyRequestInfo::new(2)))
            .with_data_address(address);

        let (status, result) = sim.exchange(&request).await.unwrap();
        assert_eq!(status, EccStatus::Success);
        match result.unwrap().outcome {
            EccOutcome::Verification { outcomes, .. } => assert_eq!(outcomes, vec![true, true]),
            other => panic!("unexpected outcome {:?}", other),
        }

        // 2. Pre-master secret
        let request = sim.request(
            &mut session,
            EccOperation::ClientEcdh(EcdhInfo::new(server_point)),
        );
        let (status, result) = sim.exchange(&request).await.unwrap();
        assert_eq!(status, EccStatus::Success);
        let client_info = match result.unwrap().outcome {
            EccOutcome::Ecdh(info) => info,
            other => panic!("unexpected outcome {:?}", other),
        };

        let server_view = p256::ecdh::diffie_hellman(
            server_ephemeral.to_nonzero_scalar(),
            to_public(&client_info.public_key).as_affine(),
        );
        assert_eq!(
            client_info.shared_secret(),
            server_view.raw_secret_bytes().as_slice()
        );

        // 3. CertificateVerify with the device identity
        let transcript = b"handshake messages so far";
        let address = sim.stage(Sha256::digest(transcript).to_vec());
        let request = sim
            .request(
                &mut session,
                EccOperation::Sign(EcdsaSignRequestInfo::new(EcNamedCurve::Secp256r1, 32)),
            )
            .with_data_address(address);

        let (status, result) = sim.exchange(&request).await.unwrap();
        assert_eq!(status, EccStatus::Success);
        let signature = match result.unwrap().outcome {
            EccOutcome::Signature { signature, .. } => signature,
            other => panic!("unexpected outcome {:?}", other),
        };
        let signature = Signature::from_slice(&signature).unwrap();
        assert!(VerifyingKey::from(&identity_public())
            .verify(transcript, &signature)
            .is_ok());

        // Ephemeral key was released; only the identity key remains
        assert_eq!(sim.backend().key_store().len(), 1);
        assert_eq!(sim.bridge().stats().completed(), 3);
    }

    #[tokio::test]
    async fn test_forged_chain_fails_handshake() {
        let mut sim = simulator();
        let mut session = sim.open_session();

        let ca = SigningKey::random(&mut OsRng);
        let mut forged = certificate(&ca, b"tbsCertificate: CN=server");
        forged.hash = Sha256::digest(b"tbsCertificate: CN=attacker").to_vec();
        let chain = vec![certificate(&ca, b"tbsCertificate: CN=intermediate"), forged];

        let address = sim.stage_certificates(&chain);
        let request = sim
            .request(&mut session, EccOperation::Verify(EcdsaVerifyRequestInfo::new(2)))
            .with_data_address(address);

        let (status, result) = sim.exchange(&request).await.unwrap();
        assert_eq!(status, EccStatus::Failure);
        assert_eq!(result.unwrap().status(), EccStatus::Failure);
        assert_eq!(sim.bridge().stats().failed(), 1);
    }

    // =============================================================================
    // SERVER ROLE
    // =============================================================================

    #[tokio::test]
    async fn test_server_ecdhe_ecdsa_handshake() {
        let mut sim = simulator();
        let mut session = sim.open_session();

        // 1. Ephemeral key for ServerKeyExchange
        let request = sim.request(
            &mut session,
            EccOperation::GenerateKey(EcdhInfo::new(EcPoint::empty(32))),
        );
        let (status, result) = sim.exchange(&request).await.unwrap();
        assert_eq!(status, EccStatus::Success);
        let ephemeral = match result.unwrap().outcome {
            EccOutcome::KeyPair(point) => point,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(ephemeral.size, 32);
        assert!(ephemeral.private_key_id.is_assigned());

        // 2. Sign the ServerKeyExchange parameters
        let params = EcdhInfo::new(ephemeral.clone()).to_bytes();
        let address = sim.stage(Sha256::digest(params).to_vec());
        let request = sim
            .request(
                &mut session,
                EccOperation::Sign(EcdsaSignRequestInfo::new(EcNamedCurve::Secp256r1, 32)),
            )
            .with_data_address(address);
        let (status, result) = sim.exchange(&request).await.unwrap();
        assert_eq!(status, EccStatus::Success);
        let signature = match result.unwrap().outcome {
            EccOutcome::Signature { signature, .. } => Signature::from_slice(&signature).unwrap(),
            other => panic!("unexpected outcome {:?}", other),
        };
        assert!(VerifyingKey::from(&identity_public())
            .verify(&params, &signature)
            .is_ok());

        // 3. Client key exchange
        let client = SecretKey::random(&mut OsRng);
        let client_point = to_point(&client.public_key(), ephemeral.private_key_id);
        let request = sim.request(
            &mut session,
            EccOperation::ServerEcdh(EcdhInfo::new(client_point)),
        );
        let (status, result) = sim.exchange(&request).await.unwrap();
        assert_eq!(status, EccStatus::Success);
        let server_info = match result.unwrap().outcome {
            EccOutcome::Ecdh(info) => info,
            other => panic!("unexpected outcome {:?}", other),
        };

        let client_view = p256::ecdh::diffie_hellman(
            client.to_nonzero_scalar(),
            to_public(&ephemeral).as_affine(),
        );
        assert_eq!(
            server_info.shared_secret(),
            client_view.raw_secret_bytes().as_slice()
        );
    }

    #[tokio::test]
    async fn test_sign_without_identity_fails() {
        let mut sim = FirmwareSimulator::start(BridgeConfig::default(), None).unwrap();
        let mut session = sim.open_session();

        let address = sim.stage(vec![0xAB; 32]);
        let request = sim
            .request(
                &mut session,
                EccOperation::Sign(EcdsaSignRequestInfo::new(EcNamedCurve::Secp256r1, 32)),
            )
            .with_data_address(address);

        let (status, result) = sim.exchange(&request).await.unwrap();
        assert_eq!(status, EccStatus::Failure);
        assert!(result.is_none());
    }

    // =============================================================================
    // MANY SESSIONS
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sessions_each_complete_once() {
        let mut sim = simulator();

        let mut requests = Vec::new();
        for _ in 0..16 {
            let mut session = sim.open_session();
            requests.push(sim.request(
                &mut session,
                EccOperation::GenerateKey(EcdhInfo::new(EcPoint::empty(32))),
            ));
        }
        let tokens: HashSet<_> = requests.iter().map(|r| r.handshake).collect();

        let raised = futures::future::join_all(requests.iter().map(|r| sim.raise(r))).await;
        assert!(raised.iter().all(Result::is_ok));

        let mut seen = HashSet::new();
        for _ in 0..16 {
            let completion = sim.next_completion().await.unwrap();
            assert!(completion.is_success());
            assert!(seen.insert(completion.handshake), "duplicate completion");
        }
        assert_eq!(seen, tokens);
        assert_eq!(sim.bridge().stats().completed(), 16);
        assert_eq!(sim.bridge().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_rsa_only_suites_refuse_key_exchange() {
        let mut sim = simulator();
        sim.bridge()
            .configure_cipher_suites(groups::NON_ECC_AES_128)
            .unwrap();

        let mut session = sim.open_session();
        let peer = to_point(&SecretKey::random(&mut OsRng).public_key(), KeyHandle::UNASSIGNED);
        let request = sim.request(&mut session, EccOperation::ClientEcdh(EcdhInfo::new(peer)));

        match sim.raise(&request).await {
            Err(SimulatorError::Bridge(BridgeError::UnsupportedOperation(1))) => {}
            other => panic!("unexpected {:?}", other),
        }
        let completion = sim.next_completion().await.unwrap();
        assert_eq!(completion.status, EccStatus::Failure);
        assert_eq!(completion.handshake, request.handshake);
    }

    #[tokio::test]
    async fn test_completed_token_is_reusable() {
        let mut sim = simulator();
        let token = HandshakeInfo::new(0xBEEF, 1);

        assert!(!sim.bridge().cancel(token));

        let request = ecc_offload_bridge::EccRequest::new(
            token,
            EccOperation::GenerateKey(EcdhInfo::new(EcPoint::empty(32))),
        );
        let (status, _) = sim.exchange(&request).await.unwrap();
        assert_eq!(status, EccStatus::Success);
        let (status, _) = sim.exchange(&request).await.unwrap();
        assert_eq!(status, EccStatus::Success);
    }
}
