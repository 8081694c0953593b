//! # ECC Offload Bridge
//!
//! Services the ECC requests a WINC co-processor raises while it performs a
//! TLS handshake it cannot finish alone (ECDH, key generation, ECDSA sign and
//! verify).
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): decoder, encoder, cipher-suite policy and
//!   per-handshake correlation. No I/O.
//! - **Ports Layer** (`ports/`): the inbound API and the crypto backend,
//!   firmware memory and completion sink the bridge depends on.
//! - **Adapters Layer** (`adapters/`): software P-256 backend with an
//!   in-memory key store, in-memory firmware memory, channel completion sink.
//! - **Service Layer** (`service.rs`): wires domain logic to ports and runs
//!   each accepted request as its own task.
//!
//! ## Flow
//!
//! ```text
//! firmware record ─→ decode ─→ Pending slot ─→ CryptoBackend ─→ encode ─→ CompletionSink
//!                                  │                                   ▲
//!                                  └── cancel(token) ── late result ───┘ discarded
//! ```
//!
//! ## Security Notes
//!
//! - Private keys never leave the backend; the wire only carries `KeyHandle`s.
//! - Shared secrets are zeroized on drop and never logged.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use config::{BridgeConfig, ConfigError};
pub use domain::correlation::{CorrelationStats, CorrelationTable, SlotState, Ticket};
pub use domain::decoder::decode;
pub use domain::encoder::{decode_response, encode, encode_failure};
pub use domain::entities::{
    EccCompletion, EccOperation, EccOutcome, EccRequest, EccResult, RequestEvent, SharedSecret,
};
pub use domain::errors::BridgeError;
pub use domain::policy::{select_suites, CipherSuitePolicy};
pub use ports::inbound::EccOffloadApi;
pub use ports::outbound::{BackendError, CompletionSink, CryptoBackend, FirmwareError, FirmwareMemory};
pub use service::EccBridgeService;
