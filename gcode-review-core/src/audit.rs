//! Audit log emission.
//!
//! Every classified edit ends up as an [`AuditBatch`] handed to an [`AuditStore`].
//! Two delivery paths exist:
//!
//! - **Patch path**: batches are enqueued in a bounded outbox and delivered later by
//!   [`AuditEmitter::drain`]. The edit itself never waits on the store.
//! - **Session flush**: [`AuditEmitter::flush_now`] is awaited by the caller before a
//!   focus switch completes. Older queued batches go first, so records of one context
//!   reach the store in the order they were made.
//!
//! A failed write is logged and the batch goes back into the outbox. When the outbox
//! is full the oldest batch is dropped with a warning. In-memory state never waits on
//! or rolls back because of the store.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::AuditError;
use crate::types::{AuditBatch, EditRecord};

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// The persistence collaborator: one call per batch.
pub trait AuditStore {
    fn save_edit_records(
        &self,
        batch: &AuditBatch,
    ) -> impl Future<Output = Result<(), AuditError>> + Send;
}

/// Result of an awaited flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The batch reached the store.
    Delivered,
    /// The batch is waiting in the outbox, behind older batches or after a failure.
    Queued,
}

/// Delivery counters, exposed for the status bar and for tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditStats {
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

#[derive(Debug)]
pub struct AuditEmitter<S> {
    store: S,
    outbox: VecDeque<AuditBatch>,
    capacity: usize,
    stats: AuditStats,
}

impl<S: AuditStore> AuditEmitter<S> {
    /// Creates an emitter whose outbox holds at most `capacity` batches (minimum 1).
    pub fn new(store: S, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            store,
            outbox: VecDeque::with_capacity(capacity.min(DEFAULT_QUEUE_CAPACITY)),
            capacity,
            stats: AuditStats::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn stats(&self) -> AuditStats {
        self.stats
    }

    /// Batches waiting for delivery.
    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Queues `batch` for best-effort delivery.
    pub fn enqueue(&mut self, batch: AuditBatch) {
        if self.outbox.len() >= self.capacity {
            if let Some(dropped) = self.outbox.pop_front() {
                self.stats.dropped += 1;
                tracing::warn!(
                    context = %dropped.context,
                    records = dropped.records.len(),
                    "audit outbox full, dropped oldest batch"
                );
            }
        }
        self.outbox.push_back(batch);
    }

    /// Delivers queued batches in order until the outbox is empty or a write fails.
    ///
    /// A failed batch stays at the front so ordering is preserved on the next drain.
    /// Returns the number of batches delivered.
    pub async fn drain(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(batch) = self.outbox.front() {
            match self.store.save_edit_records(batch).await {
                Ok(()) => {
                    self.stats.delivered += 1;
                    delivered += 1;
                    self.outbox.pop_front();
                }
                Err(e) => {
                    self.stats.failed += 1;
                    tracing::warn!(context = %batch.context, error = %e, "audit write failed, will retry");
                    break;
                }
            }
        }
        delivered
    }

    /// Delivers `batch` now, after everything already queued.
    ///
    /// If older batches cannot be delivered, or this write fails, the batch is queued
    /// and [`FlushOutcome::Queued`] is returned. The caller proceeds either way.
    pub async fn flush_now(&mut self, batch: AuditBatch) -> FlushOutcome {
        self.drain().await;
        if !self.outbox.is_empty() {
            self.enqueue(batch);
            return FlushOutcome::Queued;
        }
        match self.store.save_edit_records(&batch).await {
            Ok(()) => {
                self.stats.delivered += 1;
                FlushOutcome::Delivered
            }
            Err(e) => {
                self.stats.failed += 1;
                tracing::warn!(context = %batch.context, error = %e, "audit flush failed, queued for retry");
                self.enqueue(batch);
                FlushOutcome::Queued
            }
        }
    }
}

/// In-memory store. Clones share the same log, so a test can keep one handle while
/// the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditStore {
    batches: Arc<Mutex<Vec<AuditBatch>>>,
    failures: Arc<AtomicUsize>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` writes fail with [`AuditError::Rejected`].
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Batches stored so far, in delivery order.
    pub fn batches(&self) -> Vec<AuditBatch> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// All stored records flattened in delivery order.
    pub fn records(&self) -> Vec<EditRecord> {
        self.batches()
            .into_iter()
            .flat_map(|batch| batch.records)
            .collect()
    }
}

impl AuditStore for MemoryAuditStore {
    async fn save_edit_records(&self, batch: &AuditBatch) -> Result<(), AuditError> {
        let injected = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(AuditError::Rejected("injected failure".into()));
        }
        self.batches
            .lock()
            .map_err(|_| AuditError::Rejected("memory store poisoned".into()))?
            .push(batch.clone());
        Ok(())
    }
}
