//! # Domain Model: Pages and Blocks
//!
//! This module defines the core data structures for notezero: [`Page`], [`Block`]
//! and the identifiers that tie them together.
//!
//! ## Pages
//!
//! A page is a node in the workspace tree. It carries presentation fields (title,
//! icon, cover), an optional `parent_id`, an owned [`BlockSequence`] and three
//! independent flags:
//!
//! - `is_favorite`: orthogonal to everything else, a page can be a favorite while archived.
//! - `is_archived`: soft delete, reversible through restore.
//! - `is_deleted`: permanent delete, irreversible.
//!
//! The flags collapse to a [`Lifecycle`] state through [`Page::lifecycle`].
//!
//! ## Titles
//!
//! Titles are stored exactly as typed, including the empty string. Display code
//! asks [`Page::display_title`] for a placeholder-aware version, so an empty page
//! shows as "Untitled" (or the configured locale string) without the store ever
//! holding the placeholder.
//!
//! ## Blocks
//!
//! A [`Block`] is plain text plus a [`BlockType`]. Position is NOT part of a block:
//! it is implied by the order of the owning sequence and only materialized as an
//! integer when the block is written through the persistence gateway.
//!
//! ## Serialization
//!
//! The in-memory model serializes camelCase (`parentId`, `isFavorite`). The
//! snake_case naming of the backend lives exclusively in [`crate::gateway`].

use crate::blocks::BlockSequence;
use crate::lifecycle::Lifecycle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum display width for titles in listings.
pub const TITLE_DISPLAY_WIDTH: usize = 60;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(::uuid::Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(::uuid::Uuid::new_v4())
            }

            pub fn from_uuid(uuid: ::uuid::Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &::uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::uuid::Error;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                ::uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}
pub(crate) use id_type;

id_type!(
    /// Opaque page identifier, generated client-side at creation.
    PageId
);
id_type!(
    /// Opaque block identifier, unique within its page.
    BlockId
);
id_type!(
    /// Workspace identifier used to scope gateway listings.
    WorkspaceId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Text,
    Heading1,
    Heading2,
    Heading3,
    BulletedList,
    NumberedList,
    Todo,
    Quote,
    Divider,
    Code,
    Callout,
    Toggle,
    Image,
    #[serde(alias = "page")]
    PageReference,
}

impl BlockType {
    pub const ALL: [BlockType; 14] = [
        BlockType::Text,
        BlockType::Heading1,
        BlockType::Heading2,
        BlockType::Heading3,
        BlockType::BulletedList,
        BlockType::NumberedList,
        BlockType::Todo,
        BlockType::Quote,
        BlockType::Divider,
        BlockType::Code,
        BlockType::Callout,
        BlockType::Toggle,
        BlockType::Image,
        BlockType::PageReference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Text => "text",
            BlockType::Heading1 => "heading1",
            BlockType::Heading2 => "heading2",
            BlockType::Heading3 => "heading3",
            BlockType::BulletedList => "bulleted_list",
            BlockType::NumberedList => "numbered_list",
            BlockType::Todo => "todo",
            BlockType::Quote => "quote",
            BlockType::Divider => "divider",
            BlockType::Code => "code",
            BlockType::Callout => "callout",
            BlockType::Toggle => "toggle",
            BlockType::Image => "image",
            BlockType::PageReference => "page_reference",
        }
    }

    /// Whether the block's `content` carries user text.
    /// Dividers and images ignore it.
    pub fn has_text(&self) -> bool {
        !matches!(self, BlockType::Divider | BlockType::Image)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "page" {
            return Ok(BlockType::PageReference);
        }
        BlockType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown block type: {}", s))
    }
}

/// Presentational color tag. Carries no invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Default,
    Gray,
    Brown,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl Block {
    pub fn new(block_type: BlockType, content: impl Into<String>) -> Self {
        Self {
            id: BlockId::new(),
            block_type,
            content: content.into(),
            checked: false,
            color: None,
        }
    }

    /// The block every new page starts with.
    pub fn empty_text() -> Self {
        Self::new(BlockType::Text, "")
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Same type, content, checked state and color under a fresh id.
    pub fn clone_with_new_id(&self) -> Self {
        Self {
            id: BlockId::new(),
            ..self.clone()
        }
    }

    /// Merges a patch into this block.
    ///
    /// Converting to `todo` without an explicit `checked` resets it to `false`.
    /// Converting away from `todo` leaves `checked` untouched.
    pub fn apply(&mut self, patch: &BlockPatch) {
        if let Some(block_type) = patch.block_type {
            if block_type == BlockType::Todo && self.block_type != BlockType::Todo {
                self.checked = false;
            }
            self.block_type = block_type;
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(checked) = patch.checked {
            self.checked = checked;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
    }
}

/// A block that has not been placed in a sequence yet (no id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlock {
    pub block_type: BlockType,
    pub content: String,
    pub checked: Option<bool>,
    pub color: Option<Color>,
}

impl NewBlock {
    pub fn new(block_type: BlockType, content: impl Into<String>) -> Self {
        Self {
            block_type,
            content: content.into(),
            checked: None,
            color: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(BlockType::Text, content)
    }

    pub fn todo(content: impl Into<String>) -> Self {
        Self::new(BlockType::Todo, content)
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn into_block(self) -> Block {
        Block {
            id: BlockId::new(),
            block_type: self.block_type,
            content: self.content,
            checked: self.checked.unwrap_or(false),
            color: self.color,
        }
    }
}

/// Partial update for a block. `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockPatch {
    pub block_type: Option<BlockType>,
    pub content: Option<String>,
    pub checked: Option<bool>,
    /// `Some(None)` clears the color.
    pub color: Option<Option<Color>>,
}

impl BlockPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn block_type(block_type: BlockType) -> Self {
        Self {
            block_type: Some(block_type),
            ..Default::default()
        }
    }

    pub fn checked(checked: bool) -> Self {
        Self {
            checked: Some(checked),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.block_type.is_none()
            && self.content.is_none()
            && self.checked.is_none()
            && self.color.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    pub parent_id: Option<PageId>,
    pub blocks: BlockSequence,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// A fresh page with a single empty text block.
    pub fn new(title: impl Into<String>, parent_id: Option<PageId>) -> Self {
        let now = Utc::now();
        Self {
            id: PageId::new(),
            title: title.into(),
            icon: None,
            cover: None,
            parent_id,
            blocks: BlockSequence::from_blocks(vec![Block::empty_text()]),
            is_favorite: false,
            is_archived: false,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_flags(self.is_archived, self.is_deleted)
    }

    /// Active pages are neither archived nor deleted.
    pub fn is_active(&self) -> bool {
        self.lifecycle() == Lifecycle::Active
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn apply(&mut self, patch: &PagePatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(icon) = &patch.icon {
            self.icon = icon.clone();
        }
        if let Some(cover) = &patch.cover {
            self.cover = cover.clone();
        }
        self.touch();
    }

    /// Title for display: the placeholder when the stored title is blank,
    /// truncated with an ellipsis to [`TITLE_DISPLAY_WIDTH`] columns.
    pub fn display_title(&self, placeholder: &str) -> String {
        let title = self.title.trim();
        if title.is_empty() {
            placeholder.to_string()
        } else {
            truncate_to_width(title, TITLE_DISPLAY_WIDTH)
        }
    }

    pub fn display_icon<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.icon.as_deref().unwrap_or(fallback)
    }
}

/// Partial update for a page's presentation fields.
///
/// Structural fields (parent, flags) change only through the tree operations
/// that guard their invariants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagePatch {
    pub title: Option<String>,
    /// `Some(None)` clears the icon.
    pub icon: Option<Option<String>>,
    /// `Some(None)` clears the cover.
    pub cover: Option<Option<String>>,
}

impl PagePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn icon(icon: impl Into<String>) -> Self {
        Self {
            icon: Some(Some(icon.into())),
            ..Default::default()
        }
    }

    pub fn cover(cover: impl Into<String>) -> Self {
        Self {
            cover: Some(Some(cover.into())),
            ..Default::default()
        }
    }
}

/// Truncates to a terminal/display width, appending `…` when cut.
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push('…');
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_page_has_single_empty_text_block() {
        let page = Page::new("", None);
        assert_eq!(page.blocks.len(), 1);
        let block = &page.blocks.as_slice()[0];
        assert_eq!(block.block_type, BlockType::Text);
        assert!(block.content.is_empty());
        assert!(page.is_root());
        assert!(!page.is_favorite);
        assert_eq!(page.lifecycle(), Lifecycle::Active);
    }

    #[test]
    fn empty_title_is_stored_verbatim_and_displayed_as_placeholder() {
        let page = Page::new("", None);
        assert_eq!(page.title, "");
        assert_eq!(page.display_title("Untitled"), "Untitled");
        assert_eq!(page.display_title("Без названия"), "Без названия");
    }

    #[test]
    fn long_titles_are_truncated_for_display() {
        let page = Page::new("x".repeat(80), None);
        let shown = page.display_title("Untitled");
        assert!(shown.ends_with('…'));
        assert_eq!(shown.chars().count(), TITLE_DISPLAY_WIDTH);
        assert_eq!(page.title.len(), 80);
    }

    #[test]
    fn truncation_respects_wide_characters() {
        let shown = truncate_to_width("日本語のタイトル", 7);
        assert_eq!(shown, "日本語…");
    }

    #[test]
    fn display_icon_falls_back() {
        let mut page = Page::new("A", None);
        assert_eq!(page.display_icon("📄"), "📄");
        page.apply(&PagePatch::icon("🚀"));
        assert_eq!(page.display_icon("📄"), "🚀");
    }

    #[test]
    fn new_todo_block_defaults_to_unchecked() {
        let block = NewBlock::todo("Buy milk").into_block();
        assert_eq!(block.block_type, BlockType::Todo);
        assert!(!block.checked);
    }

    #[test]
    fn converting_to_todo_resets_checked() {
        let mut block = Block::new(BlockType::Text, "hi");
        block.checked = true;
        block.apply(&BlockPatch::block_type(BlockType::Todo));
        assert!(!block.checked);
    }

    #[test]
    fn converting_to_todo_keeps_explicit_checked() {
        let mut block = Block::new(BlockType::Text, "hi");
        block.apply(&BlockPatch {
            block_type: Some(BlockType::Todo),
            checked: Some(true),
            ..Default::default()
        });
        assert!(block.checked);
    }

    #[test]
    fn leaving_todo_keeps_checked() {
        let mut block = NewBlock::todo("done").with_checked(true).into_block();
        block.apply(&BlockPatch::block_type(BlockType::Text));
        assert_eq!(block.block_type, BlockType::Text);
        assert!(block.checked);
    }

    #[test]
    fn block_type_parses_legacy_page_name() {
        assert_eq!("page".parse::<BlockType>(), Ok(BlockType::PageReference));
        assert_eq!("todo".parse::<BlockType>(), Ok(BlockType::Todo));
        assert!("nope".parse::<BlockType>().is_err());
        let parsed: BlockType = serde_json::from_str("\"page\"").unwrap();
        assert_eq!(parsed, BlockType::PageReference);
    }

    #[test]
    fn page_serializes_camel_case() {
        let page = Page::new("A", None);
        let json = serde_json::to_value(&page).unwrap();
        assert!(json.get("parentId").is_some());
        assert!(json.get("isFavorite").is_some());
        assert!(json.get("parent_id").is_none());
    }

    #[test]
    fn page_patch_clears_icon() {
        let mut page = Page::new("A", None);
        page.apply(&PagePatch::icon("🏠"));
        page.apply(&PagePatch {
            icon: Some(None),
            ..Default::default()
        });
        assert!(page.icon.is_none());
    }
}
