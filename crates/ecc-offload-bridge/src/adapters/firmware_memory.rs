//! In-memory firmware memory.
//!
//! Stands in for the host interface in tests and simulators: buffers are
//! written at an address and read back by the bridge.

use crate::ports::outbound::{FirmwareError, FirmwareMemory};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct InMemoryFirmwareMemory {
    regions: RwLock<BTreeMap<u32, Vec<u8>>>,
}

impl InMemoryFirmwareMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `bytes` at `address`, replacing any region starting there.
    pub fn write(&self, address: u32, bytes: impl Into<Vec<u8>>) {
        self.regions.write().insert(address, bytes.into());
    }

    pub fn clear(&self) {
        self.regions.write().clear();
    }

    pub fn region_count(&self) -> usize {
        self.regions.read().len()
    }

    fn read_sync(&self, address: u32, len: usize) -> Result<Vec<u8>, FirmwareError> {
        let regions = self.regions.read();
        let (start, bytes) = regions
            .range(..=address)
            .next_back()
            .ok_or(FirmwareError::Unmapped(address))?;

        let offset = (address - start) as usize;
        if offset >= bytes.len() && len > 0 {
            return Err(FirmwareError::Unmapped(address));
        }
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= bytes.len())
            .ok_or(FirmwareError::OutOfBounds { address, len })?;

        Ok(bytes[offset..end].to_vec())
    }
}

#[async_trait]
impl FirmwareMemory for InMemoryFirmwareMemory {
    async fn read(&self, address: u32, len: usize) -> Result<Vec<u8>, FirmwareError> {
        self.read_sync(address, len)
    }
}
