//! # WINC ECC Offload Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Codec and software backend benchmarks
//! └── src/
//!     ├── simulator.rs  # Firmware side of the host interface
//!     └── integration/  # Full TLS handshake choreographies
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p offload-tests
//!
//! # Handshake flows only
//! cargo test -p offload-tests integration::
//!
//! # Benchmarks
//! cargo bench -p offload-tests
//! ```

pub mod integration;
pub mod simulator;

pub use simulator::{FirmwareSimulator, SimulatorError};
