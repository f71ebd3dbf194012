//! # Page Tree
//!
//! [`PageTree`] owns every live page of a workspace, keyed by id, plus the
//! insertion order that drives all listings. It is the only place where tree
//! invariants are enforced:
//!
//! 1. **Parent existence**: a `parent_id` points at a page in the tree. Pages
//!    are removed from the tree when permanently deleted, and the removal
//!    cascades to every descendant so no child is left pointing at nothing.
//! 2. **No cycles**: [`PageTree::move_page`] refuses a target that is the page
//!    itself or one of its descendants, before touching anything.
//!
//! ## Views
//!
//! Root, child and favorite listings only show active pages. The archived
//! listing shows archived pages. Deleted pages are not in the tree at all.
//!
//! ## Not-Found Policy
//!
//! Reads return `Option` / empty lists. Writes depend on [`TreeOptions::strict`]:
//! strict trees return [`NoteError::PageNotFound`] / [`NoteError::BlockNotFound`],
//! lenient trees return `Ok(None)`. Reparenting always fails on a missing page
//! or target, whatever the mode.

use crate::error::{NoteError, Result};
use crate::lifecycle::{Lifecycle, Transition};
use crate::model::{Block, BlockId, BlockPatch, NewBlock, Page, PageId, PagePatch};
use std::collections::{HashMap, HashSet, VecDeque};

/// Behavior switches for a [`PageTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeOptions {
    pub strict: bool,
    pub copy_suffix: String,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            strict: true,
            copy_suffix: " (copy)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageTree {
    pages: HashMap<PageId, Page>,
    order: Vec<PageId>,
    options: TreeOptions,
}

impl PageTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TreeOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Builds a tree from already-existing pages, keeping their order.
    /// Deleted pages are skipped.
    pub fn from_pages(pages: Vec<Page>, options: TreeOptions) -> Self {
        let mut tree = Self::with_options(options);
        for page in pages {
            if !page.is_deleted {
                tree.insert_page(page);
            }
        }
        tree
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All pages in insertion order, whatever their state.
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.order.iter().filter_map(|id| self.pages.get(id))
    }

    pub(crate) fn insert_page(&mut self, page: Page) {
        if self.pages.insert(page.id, page.clone()).is_none() {
            self.order.push(page.id);
        }
    }

    fn missing<T>(&self, id: PageId) -> Result<Option<T>> {
        if self.options.strict {
            Err(NoteError::PageNotFound(id))
        } else {
            Ok(None)
        }
    }

    fn missing_block<T>(&self, page: PageId, block: BlockId) -> Result<Option<T>> {
        if self.options.strict {
            Err(NoteError::BlockNotFound { page, block })
        } else {
            Ok(None)
        }
    }

    // --- Structure ---

    /// Creates a page holding one empty text block.
    ///
    /// Strict trees reject a parent that does not resolve; lenient trees drop
    /// it and create a root page.
    pub fn create(&mut self, title: impl Into<String>, parent_id: Option<PageId>) -> Result<Page> {
        let parent_id = match parent_id {
            Some(parent) if !self.pages.contains_key(&parent) => {
                if self.options.strict {
                    return Err(NoteError::PageNotFound(parent));
                }
                None
            }
            other => other,
        };
        let page = Page::new(title, parent_id);
        self.insert_page(page.clone());
        Ok(page)
    }

    pub fn update(&mut self, id: PageId, patch: &PagePatch) -> Result<Option<Page>> {
        match self.pages.get_mut(&id) {
            Some(page) => {
                page.apply(patch);
                Ok(Some(page.clone()))
            }
            None => self.missing(id),
        }
    }

    /// Reparents `id` under `new_parent` (`None` for root level).
    ///
    /// Fails with [`NoteError::CycleDetected`] when the target is the page or
    /// one of its descendants; the tree is left untouched.
    pub fn move_page(&mut self, id: PageId, new_parent: Option<PageId>) -> Result<Page> {
        if !self.pages.contains_key(&id) {
            return Err(NoteError::PageNotFound(id));
        }
        if let Some(target) = new_parent {
            if !self.pages.contains_key(&target) {
                return Err(NoteError::PageNotFound(target));
            }
            if target == id || self.is_descendant(target, id) {
                return Err(NoteError::CycleDetected { page: id, target });
            }
        }

        let page = self
            .pages
            .get_mut(&id)
            .ok_or(NoteError::PageNotFound(id))?;
        if page.parent_id != new_parent {
            page.parent_id = new_parent;
            page.touch();
        }
        Ok(page.clone())
    }

    /// True when `candidate` sits somewhere below `ancestor`.
    pub fn is_descendant(&self, candidate: PageId, ancestor: PageId) -> bool {
        let mut seen = HashSet::new();
        let mut current = self.pages.get(&candidate).and_then(|p| p.parent_id);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            if !seen.insert(parent) {
                return false;
            }
            current = self.pages.get(&parent).and_then(|p| p.parent_id);
        }
        false
    }

    /// Ids of every page below `id`, breadth first, in listing order.
    /// Archived descendants are included.
    pub fn descendant_ids(&self, id: PageId) -> Vec<PageId> {
        let mut children: HashMap<PageId, Vec<PageId>> = HashMap::new();
        for page in self.pages() {
            if let Some(parent) = page.parent_id {
                children.entry(parent).or_default().push(page.id);
            }
        }

        let mut result = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for child in children.get(&current).into_iter().flatten() {
                if seen.insert(*child) {
                    result.push(*child);
                    queue.push_back(*child);
                }
            }
        }
        result
    }

    // --- Lifecycle ---

    fn transition(&mut self, id: PageId, transition: Transition) -> Result<Option<Page>> {
        let Some(page) = self.pages.get_mut(&id) else {
            return self.missing(id);
        };
        let from = page.lifecycle();
        let to = from
            .apply(transition)
            .ok_or(NoteError::InvalidTransition {
                page: id,
                from,
                action: transition,
            })?;
        if from != to {
            let (is_archived, is_deleted) = to.flags();
            page.is_archived = is_archived;
            page.is_deleted = is_deleted;
            page.touch();
        }
        Ok(Some(page.clone()))
    }

    /// Soft delete. Descendants keep their own state; they drop out of the
    /// active views because their ancestor no longer shows.
    pub fn archive(&mut self, id: PageId) -> Result<Option<Page>> {
        self.transition(id, Transition::Archive)
    }

    pub fn restore(&mut self, id: PageId) -> Result<Option<Page>> {
        self.transition(id, Transition::Restore)
    }

    /// Removes the page and, transitively, all of its descendants.
    ///
    /// Returns the removed pages (page first, then descendants) with their
    /// flags set to the deleted state.
    pub fn permanently_delete(&mut self, id: PageId) -> Result<Vec<Page>> {
        if !self.pages.contains_key(&id) {
            return self.missing(id).map(|_: Option<()>| Vec::new());
        }

        let mut doomed = vec![id];
        doomed.extend(self.descendant_ids(id));

        let mut removed = Vec::with_capacity(doomed.len());
        for page_id in &doomed {
            if let Some(mut page) = self.pages.remove(page_id) {
                let was = page.lifecycle();
                if was.apply(Transition::PermanentlyDelete).is_some() {
                    // Tombstones always read as archived + deleted.
                    let (is_archived, is_deleted) = Lifecycle::Deleted.flags();
                    page.is_archived = is_archived;
                    page.is_deleted = is_deleted;
                    page.touch();
                }
                removed.push(page);
            }
        }
        let doomed: HashSet<PageId> = doomed.into_iter().collect();
        self.order.retain(|page_id| !doomed.contains(page_id));
        Ok(removed)
    }

    pub fn toggle_favorite(&mut self, id: PageId) -> Result<Option<Page>> {
        match self.pages.get_mut(&id) {
            Some(page) => {
                page.is_favorite = !page.is_favorite;
                page.touch();
                Ok(Some(page.clone()))
            }
            None => self.missing(id),
        }
    }

    /// Shallow copy: title (with the copy suffix), icon, cover and blocks under
    /// fresh ids, same parent, not a favorite, active. Children stay with the
    /// original.
    pub fn duplicate(&mut self, id: PageId) -> Result<Option<Page>> {
        let Some(original) = self.pages.get(&id) else {
            return self.missing(id);
        };
        let mut copy = Page::new(
            format!("{}{}", original.title, self.options.copy_suffix),
            original.parent_id,
        );
        copy.icon = original.icon.clone();
        copy.cover = original.cover.clone();
        copy.blocks = original.blocks.clone_with_new_ids();
        self.insert_page(copy.clone());
        Ok(Some(copy))
    }

    // --- Blocks ---

    fn page_for_blocks(&mut self, id: PageId) -> Result<Option<&mut Page>> {
        if self.pages.contains_key(&id) {
            Ok(self.pages.get_mut(&id))
        } else {
            self.missing(id)
        }
    }

    /// Inserts after `anchor` (appending when the anchor is absent or unknown).
    pub fn insert_block(
        &mut self,
        page_id: PageId,
        anchor: Option<BlockId>,
        new_block: NewBlock,
    ) -> Result<Option<Block>> {
        let Some(page) = self.page_for_blocks(page_id)? else {
            return Ok(None);
        };
        let block = page.blocks.insert_after(anchor, new_block);
        page.touch();
        Ok(Some(block))
    }

    pub fn update_block(
        &mut self,
        page_id: PageId,
        block_id: BlockId,
        patch: &BlockPatch,
    ) -> Result<Option<Block>> {
        let Some(page) = self.page_for_blocks(page_id)? else {
            return Ok(None);
        };
        match page.blocks.update(block_id, patch) {
            Some(block) => {
                page.touch();
                Ok(Some(block))
            }
            None => self.missing_block(page_id, block_id),
        }
    }

    pub fn remove_block(&mut self, page_id: PageId, block_id: BlockId) -> Result<Option<Block>> {
        let Some(page) = self.page_for_blocks(page_id)? else {
            return Ok(None);
        };
        match page.blocks.remove(block_id) {
            Some(block) => {
                page.touch();
                Ok(Some(block))
            }
            None => self.missing_block(page_id, block_id),
        }
    }

    pub fn duplicate_block(&mut self, page_id: PageId, block_id: BlockId) -> Result<Option<Block>> {
        let Some(page) = self.page_for_blocks(page_id)? else {
            return Ok(None);
        };
        match page.blocks.duplicate(block_id) {
            Some(block) => {
                page.touch();
                Ok(Some(block))
            }
            None => self.missing_block(page_id, block_id),
        }
    }

    /// Moves a block to `target_index` (clamped). Returns the final index.
    pub fn move_block(
        &mut self,
        page_id: PageId,
        block_id: BlockId,
        target_index: usize,
    ) -> Result<Option<usize>> {
        let Some(page) = self.page_for_blocks(page_id)? else {
            return Ok(None);
        };
        let Some(from) = page.blocks.index_of(block_id) else {
            return self.missing_block(page_id, block_id);
        };
        let to = page.blocks.move_to(block_id, target_index);
        if to != Some(from) {
            page.touch();
        }
        Ok(to)
    }

    // --- Queries ---

    pub fn get_page(&self, id: PageId) -> Option<&Page> {
        self.pages.get(&id)
    }

    /// Pages from the top of the tree down to `id`, inclusive.
    ///
    /// Empty when `id` is unknown. Terminates on any data, including a corrupt
    /// parent chain; a dangling parent ends the walk at the last page found.
    pub fn page_path(&self, id: PageId) -> Vec<&Page> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.pages.get(&id);
        while let Some(page) = current {
            if !seen.insert(page.id) {
                break;
            }
            path.push(page);
            current = page.parent_id.and_then(|parent| self.pages.get(&parent));
        }
        path.reverse();
        path
    }

    pub fn root_pages(&self) -> Vec<&Page> {
        self.pages()
            .filter(|p| p.parent_id.is_none() && p.is_active())
            .collect()
    }

    pub fn child_pages(&self, parent_id: PageId) -> Vec<&Page> {
        self.pages()
            .filter(|p| p.parent_id == Some(parent_id) && p.is_active())
            .collect()
    }

    pub fn favorite_pages(&self) -> Vec<&Page> {
        self.pages()
            .filter(|p| p.is_favorite && p.is_active())
            .collect()
    }

    pub fn archived_pages(&self) -> Vec<&Page> {
        self.pages()
            .filter(|p| p.lifecycle() == Lifecycle::Archived)
            .collect()
    }
}
