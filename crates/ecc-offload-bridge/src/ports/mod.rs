//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API the firmware host driver calls
//! - **Outbound (Driven)**: crypto backend, firmware memory, completion sink

pub mod inbound;
pub mod outbound;
