//! # Sync Pipeline
//!
//! Mutations are applied to the in-memory tree first, then described as
//! [`Intent`]s queued in an [`Outbox`]. [`Outbox::flush`] replays the queue
//! against a [`PersistenceGateway`] strictly in order.
//!
//! ## Ordering
//!
//! The queue is FIFO and a failed intent stays at its head, so a later write
//! can never overtake an earlier one for the same row. Coalescing merges an
//! intent into the nearest earlier intent of the same table (pages or blocks)
//! when that one targets the same row. Intents of the other table in between
//! are skipped over: page rows and block rows never depend on each other at
//! the gateway. A same-table intent for another row stops the search.
//!
//! Typing into a block therefore queues one block update and one page touch,
//! however many keystrokes it takes.
//!
//! ## Failure Modes
//!
//! - Retryable errors (backend or I/O) are retried under the [`RetryPolicy`].
//!   Once attempts run out, flush stops and reports [`NoteError::Persistence`].
//! - A `NotFound` from the gateway means the target row is gone; the intent
//!   is dropped with a warning and flushing continues.
//! - Anything else stops the flush with that error, intent kept.
//!
//! Reconciliation after a failure is a reload, see [`reconcile`].

pub mod reconcile;
pub mod retry;

pub use reconcile::{load_tree, ReloadReport};
pub use retry::RetryPolicy;

use crate::error::{NoteError, Result};
use crate::gateway::{BlockChanges, BlockRecord, PageChanges, PageRecord, PersistenceGateway};
use crate::model::{BlockId, PageId};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

/// One pending call against the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    InsertPage(PageRecord),
    UpdatePage { id: PageId, changes: PageChanges },
    SoftDeletePage(PageId),
    InsertBlock(BlockRecord),
    UpdateBlock { id: BlockId, changes: BlockChanges },
    DeleteBlock(BlockId),
}

impl Intent {
    pub fn apply<G: PersistenceGateway + ?Sized>(&self, gateway: &G) -> Result<()> {
        match self {
            Intent::InsertPage(record) => gateway.insert_page(record.workspace_id, record).map(drop),
            Intent::UpdatePage { id, changes } => gateway.update_page(*id, changes),
            Intent::SoftDeletePage(id) => gateway.soft_delete_page(*id),
            Intent::InsertBlock(record) => gateway.insert_block(record.page_id, record).map(drop),
            Intent::UpdateBlock { id, changes } => gateway.update_block(*id, changes),
            Intent::DeleteBlock(id) => gateway.delete_block(*id),
        }
    }

    fn is_page_row(&self) -> bool {
        matches!(
            self,
            Intent::InsertPage(_) | Intent::UpdatePage { .. } | Intent::SoftDeletePage(_)
        )
    }

    /// Folds `later` into `self` when both target the same row and the result
    /// is equivalent to applying them in sequence. Returns `later` otherwise.
    fn absorb(&mut self, later: Intent) -> Option<Intent> {
        match (self, later) {
            (Intent::UpdatePage { id, changes }, Intent::UpdatePage { id: next, changes: more })
                if *id == next =>
            {
                changes.merge(more);
                None
            }
            (Intent::InsertPage(record), Intent::UpdatePage { id, changes }) if record.id == id => {
                record.apply(&changes);
                None
            }
            (Intent::UpdateBlock { id, changes }, Intent::UpdateBlock { id: next, changes: more })
                if *id == next =>
            {
                changes.merge(more);
                None
            }
            (Intent::InsertBlock(record), Intent::UpdateBlock { id, changes }) if record.id == id => {
                record.apply(&changes);
                None
            }
            (_, later) => Some(later),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::InsertPage(r) => write!(f, "insert page {}", r.id),
            Intent::UpdatePage { id, .. } => write!(f, "update page {}", id),
            Intent::SoftDeletePage(id) => write!(f, "archive page {}", id),
            Intent::InsertBlock(r) => write!(f, "insert block {}", r.id),
            Intent::UpdateBlock { id, .. } => write!(f, "update block {}", id),
            Intent::DeleteBlock(id) => write!(f, "delete block {}", id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Intents the gateway accepted.
    pub applied: usize,
    /// Extra attempts spent on transient failures.
    pub retries: usize,
    /// Intents dropped because their target no longer exists.
    pub dropped: usize,
}

/// FIFO queue of pending intents.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    queue: VecDeque<Intent>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, intent: Intent) {
        debug!(intent = %intent, "Enqueued");
        let mut leftover = Some(intent);
        for queued in self.queue.iter_mut().rev() {
            let Some(next) = leftover.take() else {
                break;
            };
            if queued.is_page_row() != next.is_page_row() {
                leftover = Some(next);
                continue;
            }
            leftover = queued.absorb(next);
            break;
        }
        if let Some(intent) = leftover {
            self.queue.push_back(intent);
        }
    }

    pub fn extend(&mut self, intents: impl IntoIterator<Item = Intent>) {
        for intent in intents {
            self.push(intent);
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intent> {
        self.queue.iter()
    }

    pub fn front(&self) -> Option<&Intent> {
        self.queue.front()
    }

    /// Drops everything still pending. Used when a reload replaces local state.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Drains the queue into `gateway`, in order.
    ///
    /// On error the failing intent and everything after it stay queued; the
    /// report of what did get through is lost with the error, but
    /// [`Self::len`] tells what is left.
    pub fn flush<G: PersistenceGateway + ?Sized>(
        &mut self,
        gateway: &G,
        policy: &RetryPolicy,
    ) -> Result<FlushReport> {
        let mut report = FlushReport::default();
        while let Some(intent) = self.queue.front() {
            let label = intent.to_string();
            match policy.run(&label, || intent.apply(gateway)) {
                Ok(done) => {
                    report.applied += 1;
                    report.retries += (done.attempts - 1) as usize;
                }
                Err(err) if err.is_not_found() => {
                    warn!(intent = %label, error = %err, "Dropping intent for a missing record");
                    report.dropped += 1;
                }
                Err(err) if err.is_retryable() => {
                    warn!(intent = %label, pending = self.queue.len(), "Flush stopped");
                    return Err(NoteError::Persistence(format!(
                        "{} failed after {} attempts: {}",
                        label,
                        policy.max_attempts.max(1),
                        err
                    )));
                }
                Err(err) => {
                    warn!(intent = %label, error = %err, "Flush stopped");
                    return Err(err);
                }
            }
            self.queue.pop_front();
        }
        Ok(report)
    }
}
