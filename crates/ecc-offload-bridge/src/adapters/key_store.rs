//! In-memory key store.
//!
//! Maps key handles to P-256 secret keys. Reads take a shared lock;
//! insert and remove are serialized under the write lock. Secret keys are
//! zeroized when dropped.

use crate::ports::outbound::BackendError;
use p256::SecretKey;
use parking_lot::RwLock;
use shared_wire::KeyHandle;
use std::collections::HashMap;
use tracing::debug;

struct Slots {
    keys: HashMap<KeyHandle, SecretKey>,
    next: u16,
}

pub struct InMemoryKeyStore {
    slots: RwLock<Slots>,
    capacity: usize,
}

impl InMemoryKeyStore {
    /// `capacity` is clamped to the number of assignable handles.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(Slots {
                keys: HashMap::new(),
                next: 1,
            }),
            capacity: capacity.min(u16::MAX as usize),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.read().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, handle: KeyHandle) -> bool {
        self.slots.read().keys.contains_key(&handle)
    }

    /// Store a key under a fresh handle.
    ///
    /// Handles are never 0 and are not reused while the key they name is
    /// still stored.
    pub fn insert(&self, key: SecretKey) -> Result<KeyHandle, BackendError> {
        let mut slots = self.slots.write();
        if slots.keys.len() >= self.capacity {
            return Err(BackendError::KeyStoreFull {
                capacity: self.capacity,
            });
        }

        let mut candidate = slots.next;
        while candidate == 0 || slots.keys.contains_key(&KeyHandle(candidate)) {
            candidate = candidate.wrapping_add(1);
        }
        slots.next = candidate.wrapping_add(1);

        let handle = KeyHandle(candidate);
        slots.keys.insert(handle, key);
        debug!(handle = %handle, stored = slots.keys.len(), "Key stored");
        Ok(handle)
    }

    /// Store a key under a caller-chosen handle (provisioned identity keys).
    pub fn import(&self, handle: KeyHandle, key: SecretKey) -> Result<(), BackendError> {
        if !handle.is_assigned() {
            return Err(BackendError::InvalidInput(
                "key handle 0 is reserved".to_string(),
            ));
        }

        let mut slots = self.slots.write();
        if !slots.keys.contains_key(&handle) && slots.keys.len() >= self.capacity {
            return Err(BackendError::KeyStoreFull {
                capacity: self.capacity,
            });
        }
        slots.keys.insert(handle, key);
        Ok(())
    }

    pub fn get(&self, handle: KeyHandle) -> Result<SecretKey, BackendError> {
        self.slots
            .read()
            .keys
            .get(&handle)
            .cloned()
            .ok_or(BackendError::UnknownKeyHandle(handle))
    }

    /// Returns true if a key was stored under `handle`.
    pub fn remove(&self, handle: KeyHandle) -> bool {
        let removed = self.slots.write().keys.remove(&handle).is_some();
        if removed {
            debug!(handle = %handle, "Key removed");
        }
        removed
    }
}
