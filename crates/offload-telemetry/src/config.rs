//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging output.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error or a full directive)
    pub log_level: String,

    /// Whether to write events to stdout
    pub console_output: bool,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "winc-ecc-offload".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OFFLOAD_SERVICE_NAME`: Service name (default: winc-ecc-offload)
    /// - `OFFLOAD_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `OFFLOAD_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `OFFLOAD_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("OFFLOAD_SERVICE_NAME")
                .unwrap_or_else(|_| "winc-ecc-offload".to_string()),

            log_level: env::var("OFFLOAD_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("OFFLOAD_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("OFFLOAD_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Verbose configuration used by test harnesses.
    pub fn for_tests() -> Self {
        Self {
            service_name: "winc-ecc-offload-tests".to_string(),
            log_level: "debug".to_string(),
            ..Self::default()
        }
    }
}
