//! # Workspace Facade
//!
//! [`Workspace`] is the single entry point for every notezero operation. It
//! owns the page tree, the outbox, the persistence gateway and the
//! configuration; nothing lives in globals.
//!
//! ## Apply, Enqueue, Flush
//!
//! Every mutation follows the same pipeline:
//!
//! 1. **Validate and apply** against the in-memory [`PageTree`]. Invariant
//!    violations (cycles, missing parents, illegal transitions) are rejected
//!    here, before anything changes.
//! 2. **Enqueue** the [`Intent`]s that persist the change. Block operations
//!    also enqueue position updates for every sibling whose index moved.
//! 3. **Flush** on the caller's schedule with [`Workspace::flush`].
//!
//! A failed flush leaves the optimistic local state in place and the failing
//! intent queued. [`Workspace::reload`] is the reconciliation path: it
//! discards local state and pending intents and rebuilds from the gateway.
//!
//! ## Generic Over PersistenceGateway
//!
//! - Production: `Workspace<FsGateway>` or a hosted backend.
//! - Testing: `Workspace<MemGateway>`.

use crate::config::NoteConfig;
use crate::database::{Database, DatabaseId, RowId};
use crate::editing::{self, EditCommand, EditPlan};
use crate::error::{NoteError, Result};
use crate::gateway::{BlockChanges, BlockRecord, PageChanges, PageRecord, PersistenceGateway};
use crate::model::{Block, BlockId, BlockPatch, NewBlock, Page, PageId, PagePatch, WorkspaceId};
use crate::search::{self, SearchHit};
use crate::sync::{load_tree, FlushReport, Intent, Outbox, ReloadReport};
use crate::tree::PageTree;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Result of an editor command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOutcome {
    pub changed: bool,
    /// Block that should hold the caret afterwards.
    pub focus: Option<BlockId>,
}

pub struct Workspace<G: PersistenceGateway> {
    id: WorkspaceId,
    created_by: Option<String>,
    tree: PageTree,
    databases: Vec<Database>,
    outbox: Outbox,
    gateway: G,
    config: NoteConfig,
}

impl<G: PersistenceGateway> Workspace<G> {
    /// An empty workspace. Nothing is read from the gateway.
    pub fn new(gateway: G, id: WorkspaceId, config: NoteConfig) -> Self {
        Self {
            id,
            created_by: None,
            tree: PageTree::with_options(config.tree_options()),
            databases: Vec::new(),
            outbox: Outbox::new(),
            gateway,
            config,
        }
    }

    /// Loads the workspace from the gateway, repairing what needs it.
    /// Repairs are queued, not flushed.
    pub fn open(gateway: G, id: WorkspaceId, config: NoteConfig) -> Result<(Self, ReloadReport)> {
        let mut workspace = Self::new(gateway, id, config);
        let report = workspace.reload()?;
        Ok((workspace, report))
    }

    /// Stamps inserted page records with the acting user.
    pub fn with_created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = Some(user.into());
        self
    }

    pub fn id(&self) -> WorkspaceId {
        self.id
    }

    pub fn config(&self) -> &NoteConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn tree(&self) -> &PageTree {
        &self.tree
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    // --- Persistence ---

    /// Drains the outbox into the gateway under the configured retry policy.
    pub fn flush(&mut self) -> Result<FlushReport> {
        let policy = self.config.retry_policy();
        let report = self.outbox.flush(&self.gateway, &policy)?;
        if report.applied > 0 || report.dropped > 0 {
            debug!(
                applied = report.applied,
                retries = report.retries,
                dropped = report.dropped,
                "Outbox flushed"
            );
        }
        Ok(report)
    }

    /// Replaces local state with what the gateway holds.
    ///
    /// Pending intents are dropped: the gateway is the source of truth after a
    /// reload. Repairs found while loading are queued.
    pub fn reload(&mut self) -> Result<ReloadReport> {
        let (tree, report, repairs) = load_tree(&self.gateway, self.id, self.config.tree_options())?;
        if !self.outbox.is_empty() {
            warn!(discarded = self.outbox.len(), "Reload discards unflushed changes");
            self.outbox.clear();
        }
        self.tree = tree;
        self.outbox.extend(repairs);
        Ok(report)
    }

    fn enqueue_page_insert(&mut self, page: &Page) {
        let record = PageRecord::from_page(self.id, page, self.created_by.as_deref());
        self.outbox.push(Intent::InsertPage(record));
        for (position, block) in page.blocks.iter().enumerate() {
            self.outbox.push(Intent::InsertBlock(BlockRecord::from_block(
                page.id,
                block,
                position as i64,
            )));
        }
    }

    /// Queues position updates for blocks of `page_id` whose index differs
    /// from `before`. Blocks absent from `before` are skipped.
    fn enqueue_shifts(&mut self, page_id: PageId, before: &[(BlockId, i64)]) {
        let Some(page) = self.tree.get_page(page_id) else {
            return;
        };
        let old: HashMap<BlockId, i64> = before.iter().copied().collect();
        for (id, position) in page.blocks.positions() {
            if old.get(&id).is_some_and(|prev| *prev != position) {
                self.outbox.push(Intent::UpdateBlock {
                    id,
                    changes: BlockChanges::position(position),
                });
            }
        }
    }

    /// Queues the page's refreshed `updated_at` after a block change.
    fn enqueue_touch(&mut self, page_id: PageId) {
        if let Some(page) = self.tree.get_page(page_id) {
            let changes = PageChanges::touched(page);
            self.outbox.push(Intent::UpdatePage {
                id: page_id,
                changes,
            });
        }
    }

    fn positions(&self, page_id: PageId) -> Vec<(BlockId, i64)> {
        self.tree
            .get_page(page_id)
            .map(|p| p.blocks.positions())
            .unwrap_or_default()
    }

    fn position_of(&self, page_id: PageId, block_id: BlockId) -> i64 {
        self.tree
            .get_page(page_id)
            .and_then(|p| p.blocks.index_of(block_id))
            .map(|idx| idx as i64)
            .unwrap_or_default()
    }

    // --- Pages ---

    pub fn create_page(&mut self, title: &str, parent_id: Option<PageId>) -> Result<Page> {
        let page = self.tree.create(title, parent_id)?;
        info!(page = %page.id, parent = ?page.parent_id, "Page created");
        self.enqueue_page_insert(&page);
        Ok(page)
    }

    pub fn update_page(&mut self, id: PageId, patch: &PagePatch) -> Result<Option<Page>> {
        let updated = self.tree.update(id, patch)?;
        if let Some(page) = &updated {
            debug!(page = %id, "Page updated");
            self.outbox.push(Intent::UpdatePage {
                id,
                changes: PageChanges::from_patch(patch, page),
            });
        }
        Ok(updated)
    }

    pub fn move_page(&mut self, id: PageId, new_parent: Option<PageId>) -> Result<Page> {
        let page = self.tree.move_page(id, new_parent)?;
        info!(page = %id, parent = ?new_parent, "Page moved");
        self.outbox.push(Intent::UpdatePage {
            id,
            changes: PageChanges::parent(&page),
        });
        Ok(page)
    }

    pub fn toggle_favorite(&mut self, id: PageId) -> Result<Option<Page>> {
        let toggled = self.tree.toggle_favorite(id)?;
        if let Some(page) = &toggled {
            debug!(page = %id, favorite = page.is_favorite, "Favorite toggled");
            self.outbox.push(Intent::UpdatePage {
                id,
                changes: PageChanges::flags(page),
            });
        }
        Ok(toggled)
    }

    /// Soft delete: the page moves to the trash.
    pub fn archive_page(&mut self, id: PageId) -> Result<Option<Page>> {
        let archived = self.tree.archive(id)?;
        if let Some(page) = &archived {
            info!(page = %id, "Page archived");
            self.outbox.push(Intent::SoftDeletePage(id));
            self.outbox.push(Intent::UpdatePage {
                id,
                changes: PageChanges::touched(page),
            });
        }
        Ok(archived)
    }

    pub fn restore_page(&mut self, id: PageId) -> Result<Option<Page>> {
        let restored = self.tree.restore(id)?;
        if let Some(page) = &restored {
            info!(page = %id, "Page restored");
            self.outbox.push(Intent::UpdatePage {
                id,
                changes: PageChanges::flags(page),
            });
        }
        Ok(restored)
    }

    /// Irreversible. Takes every descendant with it. Returns the removed ids.
    ///
    /// Page rows stay behind as tombstones (`is_deleted`); their block rows
    /// are deleted.
    pub fn permanently_delete(&mut self, id: PageId) -> Result<Vec<PageId>> {
        let removed = self.tree.permanently_delete(id)?;
        if !removed.is_empty() {
            info!(page = %id, removed = removed.len(), "Page permanently deleted");
        }
        for page in &removed {
            self.outbox.push(Intent::UpdatePage {
                id: page.id,
                changes: PageChanges::flags(page),
            });
            for block in page.blocks.iter() {
                self.outbox.push(Intent::DeleteBlock(block.id));
            }
        }
        Ok(removed.iter().map(|p| p.id).collect())
    }

    /// Permanently deletes everything in the trash.
    pub fn empty_trash(&mut self) -> Result<Vec<PageId>> {
        let trashed: Vec<PageId> = self.tree.archived_pages().iter().map(|p| p.id).collect();
        let mut removed = Vec::new();
        for id in trashed {
            // An earlier cascade may already have taken this one.
            if self.tree.get_page(id).is_some() {
                removed.extend(self.permanently_delete(id)?);
            }
        }
        Ok(removed)
    }

    pub fn duplicate_page(&mut self, id: PageId) -> Result<Option<Page>> {
        let copy = self.tree.duplicate(id)?;
        if let Some(page) = &copy {
            info!(page = %id, copy = %page.id, "Page duplicated");
            self.enqueue_page_insert(page);
        }
        Ok(copy)
    }

    // --- Blocks ---

    /// Inserts after `anchor`, or at the end when the anchor is absent or unknown.
    pub fn insert_block(
        &mut self,
        page_id: PageId,
        anchor: Option<BlockId>,
        new_block: NewBlock,
    ) -> Result<Option<Block>> {
        let before = self.positions(page_id);
        let Some(block) = self.tree.insert_block(page_id, anchor, new_block)? else {
            return Ok(None);
        };
        let position = self.position_of(page_id, block.id);
        debug!(page = %page_id, block = %block.id, position, "Block inserted");
        self.outbox.push(Intent::InsertBlock(BlockRecord::from_block(
            page_id, &block, position,
        )));
        self.enqueue_shifts(page_id, &before);
        self.enqueue_touch(page_id);
        Ok(Some(block))
    }

    pub fn update_block(
        &mut self,
        page_id: PageId,
        block_id: BlockId,
        patch: &BlockPatch,
    ) -> Result<Option<Block>> {
        let updated = self.tree.update_block(page_id, block_id, patch)?;
        if let Some(block) = &updated {
            self.outbox.push(Intent::UpdateBlock {
                id: block_id,
                changes: BlockChanges::content_of(block),
            });
            self.enqueue_touch(page_id);
        }
        Ok(updated)
    }

    pub fn remove_block(&mut self, page_id: PageId, block_id: BlockId) -> Result<Option<Block>> {
        let before = self.positions(page_id);
        let removed = self.tree.remove_block(page_id, block_id)?;
        if removed.is_some() {
            debug!(page = %page_id, block = %block_id, "Block removed");
            self.outbox.push(Intent::DeleteBlock(block_id));
            self.enqueue_shifts(page_id, &before);
            self.enqueue_touch(page_id);
        }
        Ok(removed)
    }

    pub fn duplicate_block(&mut self, page_id: PageId, block_id: BlockId) -> Result<Option<Block>> {
        let before = self.positions(page_id);
        let Some(copy) = self.tree.duplicate_block(page_id, block_id)? else {
            return Ok(None);
        };
        let position = self.position_of(page_id, copy.id);
        debug!(page = %page_id, block = %block_id, copy = %copy.id, "Block duplicated");
        self.outbox.push(Intent::InsertBlock(BlockRecord::from_block(
            page_id, &copy, position,
        )));
        self.enqueue_shifts(page_id, &before);
        self.enqueue_touch(page_id);
        Ok(Some(copy))
    }

    /// Moves a block to `target_index` (clamped). Returns the final index.
    pub fn move_block(
        &mut self,
        page_id: PageId,
        block_id: BlockId,
        target_index: usize,
    ) -> Result<Option<usize>> {
        let before = self.positions(page_id);
        let moved = self.tree.move_block(page_id, block_id, target_index)?;
        if let Some(index) = moved {
            debug!(page = %page_id, block = %block_id, index, "Block moved");
            self.enqueue_shifts(page_id, &before);
            self.enqueue_touch(page_id);
        }
        Ok(moved)
    }

    /// Runs an editor command against a block.
    pub fn apply_edit(
        &mut self,
        page_id: PageId,
        block_id: BlockId,
        command: EditCommand,
    ) -> Result<EditOutcome> {
        let Some(page) = self.tree.get_page(page_id) else {
            if self.config.strict {
                return Err(NoteError::PageNotFound(page_id));
            }
            return Ok(EditOutcome {
                changed: false,
                focus: None,
            });
        };
        let exists = page.blocks.contains(block_id);

        match editing::plan(&page.blocks, block_id, command) {
            EditPlan::Nothing => Ok(EditOutcome {
                changed: false,
                focus: exists.then_some(block_id),
            }),
            EditPlan::Insert { after, block } => {
                let inserted = self.insert_block(page_id, Some(after), block)?;
                Ok(EditOutcome {
                    changed: inserted.is_some(),
                    focus: inserted.map(|b| b.id),
                })
            }
            EditPlan::Convert { block, patch } => {
                let updated = self.update_block(page_id, block, &patch)?;
                Ok(EditOutcome {
                    changed: updated.is_some(),
                    focus: Some(block),
                })
            }
        }
    }

    // --- Queries ---

    pub fn get_page(&self, id: PageId) -> Option<&Page> {
        self.tree.get_page(id)
    }

    pub fn page_path(&self, id: PageId) -> Vec<&Page> {
        self.tree.page_path(id)
    }

    pub fn root_pages(&self) -> Vec<&Page> {
        self.tree.root_pages()
    }

    pub fn child_pages(&self, parent_id: PageId) -> Vec<&Page> {
        self.tree.child_pages(parent_id)
    }

    pub fn favorite_pages(&self) -> Vec<&Page> {
        self.tree.favorite_pages()
    }

    /// The trash listing.
    pub fn archived_pages(&self) -> Vec<&Page> {
        self.tree.archived_pages()
    }

    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        search::search(&self.tree, query)
    }

    /// Title as shown in listings, with the configured placeholder.
    pub fn display_title(&self, page: &Page) -> String {
        page.display_title(&self.config.untitled_placeholder)
    }

    pub fn display_icon<'a>(&'a self, page: &'a Page) -> &'a str {
        page.display_icon(&self.config.default_icon)
    }

    // --- Databases ---

    pub fn create_database(&mut self, name: &str) -> &mut Database {
        let database = Database::new(name);
        info!(database = %database.id, "Database created");
        self.databases.push(database);
        let last = self.databases.len() - 1;
        &mut self.databases[last]
    }

    pub fn databases(&self) -> &[Database] {
        &self.databases
    }

    pub fn database(&self, id: DatabaseId) -> Option<&Database> {
        self.databases.iter().find(|d| d.id == id)
    }

    pub fn database_mut(&mut self, id: DatabaseId) -> Option<&mut Database> {
        self.databases.iter_mut().find(|d| d.id == id)
    }

    pub fn remove_database(&mut self, id: DatabaseId) -> Option<Database> {
        let idx = self.databases.iter().position(|d| d.id == id)?;
        Some(self.databases.remove(idx))
    }

    /// Rows of every database containing `query` in any cell.
    pub fn search_database_rows(&self, query: &str) -> Vec<(DatabaseId, RowId)> {
        self.databases
            .iter()
            .flat_map(|db| db.search_rows(query).into_iter().map(move |row| (db.id, row.id)))
            .collect()
    }
}
