//! # Persistence Gateway
//!
//! The remote store behind the workspace, reached through plain CRUD calls.
//! The [`PersistenceGateway`] trait handles the "how" of storage (memory,
//! files, a hosted database), while [`crate::sync`] handles the "when" and the
//! [`crate::tree::PageTree`] the "what".
//!
//! Ids are generated client-side and carried in insert records, so optimistic
//! local state never needs to be remapped after a round-trip.
//!
//! Methods take `&self`: implementations keep their own interior mutability,
//! the same way the workspace holds one gateway and lends it out for reads and
//! writes alike.

pub mod fs;
pub mod mem;
pub mod records;

pub use fs::FsGateway;
pub use mem::MemGateway;
pub use records::{BlockChanges, BlockRecord, PageChanges, PageFilter, PageRecord};

use crate::error::Result;
use crate::model::{BlockId, PageId, WorkspaceId};

pub trait PersistenceGateway {
    // --- Pages ---

    /// Stores a new page record. Inserting an id that already exists
    /// overwrites it, so a retried insert is harmless.
    fn insert_page(&self, workspace: WorkspaceId, record: &PageRecord) -> Result<PageRecord>;

    /// Errors with `PageNotFound` when no record has this id.
    fn update_page(&self, id: PageId, changes: &PageChanges) -> Result<()>;

    /// Archives the page (soft delete, reversible through `update_page`).
    /// Unknown ids are accepted. Permanent deletion is an `update_page`
    /// setting `is_deleted`.
    fn soft_delete_page(&self, id: PageId) -> Result<()>;

    /// Records of `workspace` matching `filter`, in insertion order.
    fn list_pages(&self, workspace: WorkspaceId, filter: PageFilter) -> Result<Vec<PageRecord>>;

    // --- Blocks ---

    /// Stores a block record, overwriting one with the same id.
    fn insert_block(&self, page: PageId, record: &BlockRecord) -> Result<BlockRecord>;

    /// Errors with `RecordNotFound` when no record has this id.
    fn update_block(&self, id: BlockId, changes: &BlockChanges) -> Result<()>;

    /// Removes the record. Unknown ids are accepted.
    fn delete_block(&self, id: BlockId) -> Result<()>;

    /// Blocks of `page` ordered by position, ties broken by id.
    fn list_blocks(&self, page: PageId) -> Result<Vec<BlockRecord>>;
}

/// Orders block records the way every gateway must return them.
pub(crate) fn sort_blocks(records: &mut [BlockRecord]) {
    records.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
}

/// Places `record` in `table`, replacing any row with the same id.
pub(crate) fn upsert<T, K: PartialEq>(table: &mut Vec<T>, record: T, key: impl Fn(&T) -> K) {
    let id = key(&record);
    match table.iter_mut().find(|row| key(row) == id) {
        Some(row) => *row = record,
        None => table.push(record),
    }
}
