// gatekeeper-audit/src/store.rs
// ============================================================================
// Module: Audit Store
// Description: Durable append-only sink for flushed audit batches.
// Purpose: Decouple the emitter's writer task from a concrete persistence
// backend; production deployments supply their own `AuditStore`.
// Dependencies: gatekeeper_core, async_trait
// ============================================================================

//! ## Overview
//! `AuditStore` intentionally has no `read` method: spec.md's Non-goals
//! exclude persistence DDL and schema migrations from this core, so the only
//! contract it defines is the append path the writer task needs.
//! [`InMemoryAuditStore`] is the reference implementation used in tests and
//! as a bounded-size fallback for deployments without a durable backend.

use std::sync::Mutex;

use async_trait::async_trait;
use gatekeeper_core::audit::AuditEvent;
use gatekeeper_core::error::GatewayError;

/// An append-only destination for flushed audit batches.
///
/// # Invariants
/// - `append_batch` is at-least-once: a caller observing `Err` must assume
///   some prefix of the batch may have been durably written.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Appends `events` to the store.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InternalError`] when the batch cannot be
    /// written.
    async fn append_batch(&self, events: &[AuditEvent]) -> Result<(), GatewayError>;
}

/// In-memory audit store, bounded by a maximum retained event count.
///
/// # Invariants
/// - Once `max_events` is reached, the oldest retained event is dropped to
///   make room for the newest (ring-buffer semantics), mirroring the
///   emitter's own drop-oldest overflow policy.
pub struct InMemoryAuditStore {
    events: Mutex<Vec<AuditEvent>>,
    max_events: usize,
}

impl Default for InMemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuditStore {
    /// Default maximum retained event count.
    pub const DEFAULT_MAX_EVENTS: usize = 100_000;

    /// Creates a store bounded by [`Self::DEFAULT_MAX_EVENTS`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_MAX_EVENTS)
    }

    /// Creates a store bounded by `max_events`.
    #[must_use]
    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            max_events,
        }
    }

    /// Returns the number of currently retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        #[allow(
            clippy::unwrap_used,
            reason = "poisoned only on a prior panic; a length read tolerates a stale snapshot"
        )]
        self.events.lock().unwrap().len()
    }

    /// Returns true when no events are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a clone of all currently retained events, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AuditEvent> {
        #[allow(
            clippy::unwrap_used,
            reason = "poisoned only on a prior panic; a snapshot read tolerates a stale view"
        )]
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append_batch(&self, events: &[AuditEvent]) -> Result<(), GatewayError> {
        #[allow(
            clippy::unwrap_used,
            reason = "poisoned only on a prior panic; append is best-effort for this in-memory reference store"
        )]
        let mut stored = self.events.lock().unwrap();
        for event in events {
            if stored.len() >= self.max_events {
                stored.remove(0);
            }
            stored.push(event.clone());
        }
        Ok(())
    }
}
