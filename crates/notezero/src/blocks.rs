//! # Block Sequences
//!
//! A [`BlockSequence`] is the ordered list of blocks owned by one page. The only
//! ordering that exists is sequence order: blocks do not store a position.
//!
//! ## Tolerant Policy
//!
//! Every primitive here is forgiving about unknown ids, because the editor fires
//! them from several places (inline typing, menus, drag handles) and a stale id
//! is routine, not exceptional:
//!
//! - `insert_after` with an unknown anchor appends.
//! - `update`, `remove`, `duplicate` and `move_to` on an unknown id do nothing
//!   and report it through their return value.
//!
//! Callers that want strictness (the page tree in strict mode) check the return
//! value and turn it into [`crate::error::NoteError::BlockNotFound`].
//!
//! ## Persisted Positions
//!
//! [`BlockSequence::positions`] numbers the blocks `0..n` in order. Reloading
//! goes through [`BlockSequence::from_positioned`], a stable sort by position
//! with the block id as tiebreak, so the relative order survives a round-trip
//! even if the backend hands back duplicate positions.

use crate::model::{Block, BlockId, BlockPatch, NewBlock};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockSequence {
    blocks: Vec<Block>,
}

impl BlockSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Rebuilds a sequence from persisted `(position, block)` pairs.
    pub fn from_positioned(mut rows: Vec<(i64, Block)>) -> Self {
        rows.sort_by(|(pa, a), (pb, b)| pa.cmp(pb).then_with(|| a.id.cmp(&b.id)));
        Self {
            blocks: rows.into_iter().map(|(_, block)| block).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn as_slice(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn ids(&self) -> Vec<BlockId> {
        self.blocks.iter().map(|b| b.id).collect()
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.index_of(id).is_some()
    }

    /// Inserts right after `anchor`, or at the end when the anchor is `None`
    /// or unknown. Returns a copy of the placed block.
    pub fn insert_after(&mut self, anchor: Option<BlockId>, new_block: NewBlock) -> Block {
        self.insert_block_after(anchor, new_block.into_block())
    }

    /// Same as [`Self::insert_after`] for a block that already has an id.
    /// An id already present in the sequence is replaced by a fresh one.
    pub fn insert_block_after(&mut self, anchor: Option<BlockId>, mut block: Block) -> Block {
        if self.contains(block.id) {
            block.id = BlockId::new();
        }
        let at = anchor
            .and_then(|id| self.index_of(id))
            .map(|idx| idx + 1)
            .unwrap_or(self.blocks.len());
        self.blocks.insert(at, block.clone());
        block
    }

    /// Merges `patch` into the block. Returns the updated block, or `None`
    /// when the id is unknown.
    pub fn update(&mut self, id: BlockId, patch: &BlockPatch) -> Option<Block> {
        let block = self.blocks.iter_mut().find(|b| b.id == id)?;
        block.apply(patch);
        Some(block.clone())
    }

    /// Removes the block, returning it.
    pub fn remove(&mut self, id: BlockId) -> Option<Block> {
        let idx = self.index_of(id)?;
        Some(self.blocks.remove(idx))
    }

    /// Clones the block under a new id directly after the original.
    pub fn duplicate(&mut self, id: BlockId) -> Option<Block> {
        let idx = self.index_of(id)?;
        let copy = self.blocks[idx].clone_with_new_id();
        self.blocks.insert(idx + 1, copy.clone());
        Some(copy)
    }

    /// Moves the block to `target_index`, clamped to `[0, len]`.
    ///
    /// The index addresses the sequence *after* the block has been taken out,
    /// which is how drop targets are reported. Returns the final index, or
    /// `None` when the id is unknown.
    pub fn move_to(&mut self, id: BlockId, target_index: usize) -> Option<usize> {
        let from = self.index_of(id)?;
        let block = self.blocks.remove(from);
        let to = target_index.min(self.blocks.len());
        self.blocks.insert(to, block);
        Some(to)
    }

    /// Persisted positions, numbered from zero in sequence order.
    pub fn positions(&self) -> Vec<(BlockId, i64)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(idx, b)| (b.id, idx as i64))
            .collect()
    }

    /// Deep copy with fresh ids for every block, order preserved.
    pub fn clone_with_new_ids(&self) -> Self {
        Self {
            blocks: self.blocks.iter().map(Block::clone_with_new_id).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a BlockSequence {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
