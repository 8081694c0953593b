//! # ECC Offload Benchmarks
//!
//! | Area | Measured |
//! |------|----------|
//! | Codec | request decode, response encode, certificate parsing |
//! | Software backend | P-256 key generation, ECDH, sign, batch verify |
//! | Bridge | one request from record to completion |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ecc_offload_bridge::adapters::{ChannelCompletionSink, InMemoryFirmwareMemory, SoftwareBackend};
use ecc_offload_bridge::{
    decode, encode, BridgeConfig, CryptoBackend, EccBridgeService, EccOffloadApi, EccOperation,
    EccOutcome, EccRequest, EccResult,
};
use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use shared_wire::{
    CertificateEntry, EcNamedCurve, EcPoint, EccRequestType, EcdhInfo, HandshakeInfo, KeyHandle,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn point_of(public: &PublicKey, handle: KeyHandle) -> EcPoint {
    let encoded = public.to_encoded_point(false);
    EcPoint::new(encoded.x().unwrap(), encoded.y().unwrap(), handle).unwrap()
}

fn signed_entry(signer: &SigningKey, message: &[u8]) -> CertificateEntry {
    let digest = Sha256::digest(message);
    let signature: Signature = signer.sign_prehash(&digest).unwrap();
    CertificateEntry {
        curve: EcNamedCurve::Secp256r1,
        public_key: point_of(&PublicKey::from(signer.verifying_key()), KeyHandle::UNASSIGNED),
        hash: digest.to_vec(),
        signature: signature.to_bytes().to_vec(),
    }
}

// ============================================================================
// Codec
// ============================================================================

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let handshake = HandshakeInfo::new(7, 1);
    let peer = point_of(&SecretKey::random(&mut OsRng).public_key(), KeyHandle(3));
    let request = EccRequest::new(handshake, EccOperation::ServerEcdh(EcdhInfo::new(peer.clone())));
    let payload = request.to_payload();

    group.bench_function("decode_server_ecdh", |b| {
        b.iter(|| {
            black_box(decode(
                EccRequestType::ServerEcdh.as_u16(),
                black_box(&payload),
                handshake,
            ))
        })
    });

    let result = EccResult::new(
        EccRequestType::ServerEcdh,
        EccOutcome::Ecdh(EcdhInfo::new(peer).with_shared_secret(&[0x42; 32]).unwrap()),
    );
    group.bench_function("encode_ecdh_response", |b| {
        b.iter(|| black_box(encode(black_box(&result), handshake)))
    });

    let signer = SigningKey::random(&mut OsRng);
    for count in [1usize, 4, 8] {
        let blob: Vec<u8> = (0..count)
            .flat_map(|i| signed_entry(&signer, format!("cert_{}", i).as_bytes()).to_bytes())
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("parse_certificates", count), &blob, |b, blob| {
            b.iter(|| black_box(CertificateEntry::parse_all(blob, count)))
        });
    }

    group.finish();
}

// ============================================================================
// Software backend
// ============================================================================

fn bench_software_backend(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("software-backend");
    group.measurement_time(Duration::from_secs(10));

    let backend = SoftwareBackend::new(4);
    let (_, local) = rt
        .block_on(backend.generate_key_pair(EcNamedCurve::Secp256r1))
        .unwrap();
    let peer = point_of(&SecretKey::random(&mut OsRng).public_key(), KeyHandle::UNASSIGNED);

    group.bench_function("generate_and_release", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (_, handle) = backend
                    .generate_key_pair(EcNamedCurve::Secp256r1)
                    .await
                    .unwrap();
                backend.release_key(handle).await.unwrap();
            })
        })
    });

    group.bench_function("ecdh", |b| {
        b.iter(|| black_box(rt.block_on(backend.ecdh(&peer, local)).unwrap().len()))
    });

    let digest = Sha256::digest(b"server key exchange params");
    group.bench_function("sign", |b| {
        b.iter(|| black_box(rt.block_on(backend.sign(&digest, 32, local)).unwrap()))
    });

    let signer = SigningKey::random(&mut OsRng);
    for count in [1usize, 4, 8] {
        let entries: Vec<_> = (0..count)
            .map(|i| signed_entry(&signer, format!("cert_{}", i).as_bytes()))
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("verify_batch", count), &entries, |b, entries| {
            b.iter(|| black_box(rt.block_on(backend.verify_batch(entries)).unwrap()))
        });
    }

    group.finish();
}

// ============================================================================
// Bridge round trip
// ============================================================================

fn bench_bridge_round_trip(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("bridge");

    let backend = Arc::new(SoftwareBackend::new(4));
    let memory = Arc::new(InMemoryFirmwareMemory::new());
    let (sink, mut completions) = ChannelCompletionSink::channel();
    let bridge = EccBridgeService::new(backend, memory, sink, BridgeConfig::default()).unwrap();

    let peer = point_of(&SecretKey::random(&mut OsRng).public_key(), KeyHandle::UNASSIGNED);
    let mut seq = 0u32;

    group.bench_function("client_ecdh_record", |b| {
        b.iter(|| {
            seq = seq.wrapping_add(1);
            let request = EccRequest::new(
                HandshakeInfo::new(1, seq),
                EccOperation::ClientEcdh(EcdhInfo::new(peer.clone())),
            );
            let record = request.to_record().to_bytes();
            rt.block_on(async {
                bridge.submit_record(&record, None).await.unwrap();
                black_box(completions.recv().await.unwrap())
            })
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_codec,
    bench_software_backend,
    bench_bridge_round_trip
);
criterion_main!(benches);
