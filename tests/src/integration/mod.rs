//! # Integration Tests
//!
//! Full TLS handshake choreographies driven through the firmware simulator.

pub mod handshake_flows;
