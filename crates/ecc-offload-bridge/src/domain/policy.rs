//! Cipher-suite policy.
//!
//! The active bitmap decides which suites the firmware may negotiate and,
//! with it, which ECC operations the bridge is willing to service.

use crate::domain::entities::EccOperation;
use crate::domain::errors::BridgeError;
use shared_wire::{CipherSuite, SetActiveCipherSuites};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::info;

/// Resolve a cipher-suite bitmap to the known suites it enables.
///
/// Bits without a known suite are ignored. A mask that enables nothing fails.
pub fn select_suites(mask: u32) -> Result<BTreeSet<CipherSuite>, BridgeError> {
    let suites: BTreeSet<CipherSuite> = CipherSuite::in_mask(mask).collect();
    if suites.is_empty() {
        return Err(BridgeError::NoUsableCipherSuite(mask));
    }
    Ok(suites)
}

/// Holds the active cipher-suite bitmap.
#[derive(Debug)]
pub struct CipherSuitePolicy {
    mask: AtomicU32,
}

impl CipherSuitePolicy {
    pub fn new(mask: u32) -> Result<Self, BridgeError> {
        let suites = select_suites(mask)?;
        Ok(Self {
            mask: AtomicU32::new(known_bits(&suites)),
        })
    }

    /// Bitmap of the enabled known suites.
    pub fn active_mask(&self) -> u32 {
        self.mask.load(Ordering::Acquire)
    }

    pub fn active_suites(&self) -> BTreeSet<CipherSuite> {
        CipherSuite::in_mask(self.active_mask()).collect()
    }

    /// Whether any enabled suite uses an ephemeral EC key exchange.
    pub fn ecdhe_enabled(&self) -> bool {
        CipherSuite::in_mask(self.active_mask()).any(CipherSuite::uses_ecc)
    }

    /// Check that the active suites permit an operation.
    ///
    /// Key exchange and key generation need an ECDHE suite. Signing and
    /// verification are always permitted: certificate chains may be
    /// ECDSA-signed whatever the key exchange.
    pub fn permits(&self, operation: &EccOperation) -> Result<(), BridgeError> {
        match operation {
            EccOperation::ClientEcdh(_)
            | EccOperation::ServerEcdh(_)
            | EccOperation::GenerateKey(_)
                if !self.ecdhe_enabled() =>
            {
                Err(BridgeError::UnsupportedOperation(
                    operation.request_type().as_u16(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Replace the active bitmap.
    ///
    /// Refused while `active_handshakes` is non-zero.
    pub fn apply(
        &self,
        mask: u32,
        active_handshakes: usize,
    ) -> Result<SetActiveCipherSuites, BridgeError> {
        if active_handshakes > 0 {
            return Err(BridgeError::CipherSuitesLocked {
                active: active_handshakes,
            });
        }

        let suites = select_suites(mask)?;
        let bitmap = known_bits(&suites);
        self.mask.store(bitmap, Ordering::Release);

        info!(
            requested = %format!("{:#06x}", mask),
            active = %format!("{:#06x}", bitmap),
            suites = suites.len(),
            "Cipher suites updated"
        );

        Ok(SetActiveCipherSuites { bitmap })
    }
}

fn known_bits(suites: &BTreeSet<CipherSuite>) -> u32 {
    suites.iter().fold(0, |acc, suite| acc | suite.mask())
}
