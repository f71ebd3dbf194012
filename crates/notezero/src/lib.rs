//! # NoteZero Architecture
//!
//! NoteZero is the core of a block-based note workspace: a forest of pages,
//! each holding an ordered list of typed blocks. It has no UI and no network
//! code. A front end drives it through [`api::Workspace`] and renders what
//! comes back.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Workspace (api.rs)                                         │
//! │  - Single entry point, owns all state                       │
//! │  - Applies changes locally, then queues intents             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Domain (tree.rs, blocks.rs, lifecycle.rs, editing.rs)      │
//! │  - Page tree invariants: one parent, no cycles              │
//! │  - Block order, page lifecycle, editor commands             │
//! │  - Pure in-memory logic, no I/O                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Sync (sync/)                                               │
//! │  - Outbox of intents, flushed with retry                    │
//! │  - Reload and repair from the gateway                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Persistence (gateway/)                                     │
//! │  - PersistenceGateway trait over page and block rows        │
//! │  - FsGateway (JSON files), MemGateway (testing)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Optimistic Local State
//!
//! Every mutation lands in the in-memory tree first and is visible right
//! away. Persistence happens when the caller flushes. A failed flush keeps
//! both the local change and the queued intent, so nothing is lost and the
//! caller decides whether to retry or reload.
//!
//! ## Testing Strategy
//!
//! 1. **Domain** modules carry most of the unit tests, against plain values.
//! 2. **Workspace** tests use [`gateway::MemGateway`], which can be told to
//!    fail reads and writes.
//! 3. Integration tests under `tests/` cover full scenarios, including a
//!    round-trip through [`gateway::FsGateway`] on a temp directory.
//!
//! ## Module Overview
//!
//! - [`api`]: The workspace facade
//! - [`tree`]: Page forest and its invariants
//! - [`blocks`]: Ordered block sequence of a page
//! - [`lifecycle`]: Active, archived and deleted states
//! - [`editing`]: Editor commands (paragraph break, backspace, convert)
//! - [`search`]: Title and content search with highlight segments
//! - [`database`]: Typed property tables with filter, sort and grouping
//! - [`sync`]: Outbox, retry and reload
//! - [`gateway`]: Persistence trait and implementations
//! - [`seed`]: Starter content for new workspaces
//! - [`model`]: Core data types (`Page`, `Block`, ids)
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod api;
pub mod blocks;
pub mod config;
pub mod database;
pub mod editing;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod model;
pub mod search;
pub mod seed;
pub mod sync;
pub mod tree;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use api::{EditOutcome, Workspace};
pub use error::{NoteError, Result};
pub use model::{Block, BlockId, BlockType, NewBlock, Page, PageId, WorkspaceId};
