//! # Shared Wire Crate
//!
//! Fixed-layout records exchanged with the WINC firmware while it offloads
//! ECC work to the host during a TLS handshake.
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | `entities` | EC point, ECDH info, ECDSA sign/verify info, handshake token, tags |
//! | `frame` | 112-byte request record and response record framing |
//! | `certificate` | Out-of-band certificate entries read for verify requests |
//! | `cipher` | IANA cipher-suite ids, bitmask mapping and named groups |
//! | `errors` | `WireError` |
//!
//! ## Design Principles
//!
//! - **Byte exact**: every structure has explicit offsets; `to_bytes` and
//!   `from_bytes` are inverse on valid input.
//! - **Little-endian**: the host interface byte order. The only exception is
//!   the certificate header, which the firmware writes big-endian.
//! - **No secrets**: private keys appear only as a `KeyHandle`.

pub mod certificate;
pub mod cipher;
pub mod entities;
pub mod errors;
pub mod frame;

pub use certificate::CertificateEntry;
pub use cipher::{CipherSuite, SetActiveCipherSuites};
pub use entities::*;
pub use errors::WireError;
pub use frame::{RecordHeader, RequestRecord, ResponseRecord};
