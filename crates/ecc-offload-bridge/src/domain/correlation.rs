//! Per-handshake correlation table.
//!
//! Tracks at most one in-flight request per handshake token and decides
//! whether a backend result may still be delivered.
//!
//! ```text
//!   Idle ──begin──→ Pending ──finish──→ Completed ──release──→ Idle
//!    ▲                 │                    │
//!    └──── cancel ─────┴────────────────────┘
//! ```
//!
//! Every accepted request gets a fresh generation. A result is delivered
//! only if its slot is still `Pending` with the same generation, so a result
//! that arrives after `cancel`, after the timeout fired, or after the token
//! was reused is discarded.
//!
//! The task attached to a slot is the request's timeout timer. It is aborted
//! when the result is delivered or the token is cancelled.

use crate::domain::errors::BridgeError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_wire::{EccRequestType, EccStatus, HandshakeInfo};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

/// Observable state of a handshake token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotState {
    Idle,
    Pending,
    Completed,
}

/// Proof of acceptance, needed to finish or release a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub handshake: HandshakeInfo,
    pub generation: u64,
}

struct Slot {
    generation: u64,
    state: SlotState,
    request: EccRequestType,
    accepted_at: Instant,
    task: Option<AbortHandle>,
}

/// Bridge statistics.
#[derive(Debug, Default)]
pub struct CorrelationStats {
    /// Requests accepted into a slot
    pub accepted: AtomicU64,
    /// Results delivered with `SUCCESS`
    pub completed: AtomicU64,
    /// Results delivered with `FAILURE`
    pub failed: AtomicU64,
    /// Pending requests cancelled
    pub cancelled: AtomicU64,
    /// Late results dropped after cancel
    pub discarded: AtomicU64,
    /// Requests refused because the token was already pending
    pub rejected: AtomicU64,
}

impl CorrelationStats {
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// Handshake token to slot map.
pub struct CorrelationTable {
    slots: DashMap<HandshakeInfo, Slot>,
    next_generation: AtomicU64,
    stats: Arc<CorrelationStats>,
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            next_generation: AtomicU64::new(1),
            stats: Arc::new(CorrelationStats::default()),
        }
    }

    /// Move `handshake` to `Pending`.
    ///
    /// Fails with `DuplicateInFlightRequest` if it is already pending.
    pub fn begin(
        &self,
        handshake: HandshakeInfo,
        request: EccRequestType,
    ) -> Result<Ticket, BridgeError> {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let slot = Slot {
            generation,
            state: SlotState::Pending,
            request,
            accepted_at: Instant::now(),
            task: None,
        };

        match self.slots.entry(handshake) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().state == SlotState::Pending {
                    self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        handshake = %handshake,
                        request = ?request,
                        pending = ?occupied.get().request,
                        "Request already in flight for handshake"
                    );
                    return Err(BridgeError::DuplicateInFlightRequest(handshake));
                }
                occupied.insert(slot);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
            }
        }

        self.stats.accepted.fetch_add(1, Ordering::Relaxed);
        debug!(handshake = %handshake, request = ?request, generation, "Request accepted");

        Ok(Ticket {
            handshake,
            generation,
        })
    }

    /// Remember the timer of `ticket` so `finish` and `cancel` can abort it.
    ///
    /// Returns false if the slot has already moved on; the caller owns the
    /// task then.
    pub fn attach_task(&self, ticket: &Ticket, task: AbortHandle) -> bool {
        match self.slots.get_mut(&ticket.handshake) {
            Some(mut slot)
                if slot.generation == ticket.generation && slot.state == SlotState::Pending =>
            {
                slot.task = Some(task);
                true
            }
            _ => false,
        }
    }

    /// Fail with `DuplicateInFlightRequest` if `handshake` is pending.
    ///
    /// Counts the refusal like a rejected `begin`.
    pub fn ensure_not_pending(&self, handshake: HandshakeInfo) -> Result<(), BridgeError> {
        if self.state_of(handshake) != SlotState::Pending {
            return Ok(());
        }
        self.stats.rejected.fetch_add(1, Ordering::Relaxed);
        warn!(handshake = %handshake, "Refusing event for a handshake already in flight");
        Err(BridgeError::DuplicateInFlightRequest(handshake))
    }

    /// Move a pending slot to `Completed`.
    ///
    /// Returns false, and counts the result as discarded, if the slot was
    /// cancelled or reused since `ticket` was issued.
    pub fn finish(&self, ticket: &Ticket, status: EccStatus) -> bool {
        let elapsed = match self.slots.get_mut(&ticket.handshake) {
            Some(mut slot)
                if slot.generation == ticket.generation && slot.state == SlotState::Pending =>
            {
                slot.state = SlotState::Completed;
                if let Some(timer) = slot.task.take() {
                    timer.abort();
                }
                slot.accepted_at.elapsed()
            }
            _ => {
                self.stats.discarded.fetch_add(1, Ordering::Relaxed);
                debug!(
                    handshake = %ticket.handshake,
                    generation = ticket.generation,
                    "Discarding late result"
                );
                return false;
            }
        };

        if status.is_success() {
            self.stats.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
        }
        debug!(
            handshake = %ticket.handshake,
            status = ?status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );
        true
    }

    /// Fail a pending slot whose timeout fired.
    ///
    /// Returns false if the result was already delivered or the token was
    /// cancelled; nothing is counted then.
    pub fn expire(&self, ticket: &Ticket) -> bool {
        match self.slots.get_mut(&ticket.handshake) {
            Some(mut slot)
                if slot.generation == ticket.generation && slot.state == SlotState::Pending =>
            {
                slot.state = SlotState::Completed;
                slot.task = None;
            }
            _ => return false,
        }
        self.stats.failed.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Return a completed slot to `Idle`.
    pub fn release(&self, ticket: &Ticket) {
        self.slots.remove_if(&ticket.handshake, |_, slot| {
            slot.generation == ticket.generation && slot.state == SlotState::Completed
        });
    }

    /// Force `handshake` back to `Idle`, aborting its timer.
    ///
    /// Returns true if the token was not already idle.
    pub fn cancel(&self, handshake: HandshakeInfo) -> bool {
        let Some((_, slot)) = self.slots.remove(&handshake) else {
            return false;
        };

        if let Some(task) = slot.task {
            task.abort();
        }
        if slot.state == SlotState::Pending {
            self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
            info!(
                handshake = %handshake,
                request = ?slot.request,
                "Pending request cancelled"
            );
        }
        true
    }

    pub fn state_of(&self, handshake: HandshakeInfo) -> SlotState {
        self.slots
            .get(&handshake)
            .map(|slot| slot.state)
            .unwrap_or(SlotState::Idle)
    }

    /// Number of tokens currently pending
    pub fn pending_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.state == SlotState::Pending)
            .count()
    }

    pub fn stats(&self) -> &CorrelationStats {
        &self.stats
    }

    /// Shared handle to the statistics.
    pub fn stats_handle(&self) -> Arc<CorrelationStats> {
        Arc::clone(&self.stats)
    }
}
