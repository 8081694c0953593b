//! # Offload Telemetry
//!
//! Structured logging for the ECC offload bridge.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use offload_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config).expect("Failed to init logging");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OFFLOAD_SERVICE_NAME` | `winc-ecc-offload` | Service name attached to the startup event |
//! | `OFFLOAD_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `OFFLOAD_JSON_LOGS` | `false` | Emit JSON lines instead of human-readable output |
//! | `OFFLOAD_CONSOLE_OUTPUT` | `true` | Write events to stdout |

#![warn(missing_docs)]

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{init_logging, init_test_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The log filter directive could not be parsed
    #[error("Invalid log filter: {0}")]
    Filter(String),

    /// A global subscriber was already installed
    #[error("Failed to install subscriber: {0}")]
    SubscriberInit(String),
}
