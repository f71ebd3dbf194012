//! Wire records exchanged with a [`super::PersistenceGateway`].
//!
//! Records use the backend's snake_case names. Every conversion between the
//! in-memory model and a record lives in this file.

use crate::blocks::BlockSequence;
use crate::model::{Block, BlockId, BlockType, Color, Page, PageId, PagePatch, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: PageId,
    pub workspace_id: WorkspaceId,
    #[serde(default)]
    pub parent_id: Option<PageId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PageRecord {
    pub fn from_page(workspace_id: WorkspaceId, page: &Page, created_by: Option<&str>) -> Self {
        Self {
            id: page.id,
            workspace_id,
            parent_id: page.parent_id,
            title: page.title.clone(),
            icon: page.icon.clone(),
            cover: page.cover.clone(),
            is_favorite: page.is_favorite,
            is_archived: page.is_archived,
            is_deleted: page.is_deleted,
            created_by: created_by.map(str::to_string),
            created_at: page.created_at,
            updated_at: page.updated_at,
        }
    }

    pub fn into_page(self, blocks: BlockSequence) -> Page {
        Page {
            id: self.id,
            title: self.title,
            icon: self.icon,
            cover: self.cover,
            parent_id: self.parent_id,
            blocks,
            is_favorite: self.is_favorite,
            is_archived: self.is_archived,
            is_deleted: self.is_deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn apply(&mut self, changes: &PageChanges) {
        if let Some(title) = &changes.title {
            self.title = title.clone();
        }
        if let Some(icon) = &changes.icon {
            self.icon = icon.clone();
        }
        if let Some(cover) = &changes.cover {
            self.cover = cover.clone();
        }
        if let Some(parent_id) = changes.parent_id {
            self.parent_id = parent_id;
        }
        if let Some(v) = changes.is_favorite {
            self.is_favorite = v;
        }
        if let Some(v) = changes.is_archived {
            self.is_archived = v;
        }
        if let Some(v) = changes.is_deleted {
            self.is_deleted = v;
        }
        if let Some(at) = changes.updated_at {
            self.updated_at = at;
        }
    }
}

/// Partial page update. `None` means "leave as stored".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<PageId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PageChanges {
    /// The presentation fields of `patch`, stamped with the page's `updated_at`.
    pub fn from_patch(patch: &PagePatch, page: &Page) -> Self {
        Self {
            title: patch.title.clone(),
            icon: patch.icon.clone(),
            cover: patch.cover.clone(),
            updated_at: Some(page.updated_at),
            ..Default::default()
        }
    }

    pub fn parent(page: &Page) -> Self {
        Self {
            parent_id: Some(page.parent_id),
            updated_at: Some(page.updated_at),
            ..Default::default()
        }
    }

    /// Favorite and lifecycle flags as they stand on `page`.
    pub fn flags(page: &Page) -> Self {
        Self {
            is_favorite: Some(page.is_favorite),
            is_archived: Some(page.is_archived),
            is_deleted: Some(page.is_deleted),
            updated_at: Some(page.updated_at),
            ..Default::default()
        }
    }

    pub fn touched(page: &Page) -> Self {
        Self {
            updated_at: Some(page.updated_at),
            ..Default::default()
        }
    }

    /// Folds `later` into `self`; fields set in `later` win.
    pub fn merge(&mut self, later: PageChanges) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if later.$field.is_some() { self.$field = later.$field; })*
            };
        }
        take!(title, icon, cover, parent_id, is_favorite, is_archived, is_deleted, updated_at);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub id: BlockId,
    pub page_id: PageId,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub position: i64,
}

impl BlockRecord {
    pub fn from_block(page_id: PageId, block: &Block, position: i64) -> Self {
        Self {
            id: block.id,
            page_id,
            block_type: block.block_type,
            content: block.content.clone(),
            checked: block.checked,
            color: block.color,
            position,
        }
    }

    /// The block plus its stored position, ready for
    /// [`BlockSequence::from_positioned`].
    pub fn into_positioned(self) -> (i64, Block) {
        (
            self.position,
            Block {
                id: self.id,
                block_type: self.block_type,
                content: self.content,
                checked: self.checked,
                color: self.color,
            },
        )
    }

    pub fn apply(&mut self, changes: &BlockChanges) {
        if let Some(block_type) = changes.block_type {
            self.block_type = block_type;
        }
        if let Some(content) = &changes.content {
            self.content = content.clone();
        }
        if let Some(checked) = changes.checked {
            self.checked = checked;
        }
        if let Some(color) = changes.color {
            self.color = color;
        }
        if let Some(position) = changes.position {
            self.position = position;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockChanges {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<BlockType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<Color>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl BlockChanges {
    /// Every editable field as it stands on `block`.
    pub fn content_of(block: &Block) -> Self {
        Self {
            block_type: Some(block.block_type),
            content: Some(block.content.clone()),
            checked: Some(block.checked),
            color: Some(block.color),
            position: None,
        }
    }

    pub fn position(position: i64) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn merge(&mut self, later: BlockChanges) {
        if later.block_type.is_some() {
            self.block_type = later.block_type;
        }
        if later.content.is_some() {
            self.content = later.content;
        }
        if later.checked.is_some() {
            self.checked = later.checked;
        }
        if later.color.is_some() {
            self.color = later.color;
        }
        if later.position.is_some() {
            self.position = later.position;
        }
    }
}

/// Which pages `list_pages` returns. Every filter skips deleted pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFilter {
    /// Active and archived pages.
    All,
    Root,
    ChildrenOf(PageId),
    Favorites,
    Archived,
}

impl PageFilter {
    pub fn matches(&self, record: &PageRecord) -> bool {
        if record.is_deleted {
            return false;
        }
        let active = !record.is_archived;
        match self {
            PageFilter::All => true,
            PageFilter::Root => active && record.parent_id.is_none(),
            PageFilter::ChildrenOf(parent) => active && record.parent_id == Some(*parent),
            PageFilter::Favorites => active && record.is_favorite,
            PageFilter::Archived => record.is_archived,
        }
    }
}
