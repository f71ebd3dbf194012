use crate::lifecycle::{Lifecycle, Transition};
use crate::model::{BlockId, PageId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NoteError {
    #[error("Page not found: {0}")]
    PageNotFound(PageId),

    #[error("Block {block} not found on page {page}")]
    BlockNotFound { page: PageId, block: BlockId },

    #[error("No {table} record with id {id}")]
    RecordNotFound { table: &'static str, id: String },

    #[error("Cannot move page {page} under {target}: it would become its own ancestor")]
    CycleDetected { page: PageId, target: PageId },

    #[error("Cannot {action} page {page} while it is {from}")]
    InvalidTransition {
        page: PageId,
        from: Lifecycle,
        action: Transition,
    },

    #[error("Invalid property value: {0}")]
    InvalidProperty(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] confique::Error),
}

impl NoteError {
    /// True for the `NotFound` family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            NoteError::PageNotFound(_)
                | NoteError::BlockNotFound { .. }
                | NoteError::RecordNotFound { .. }
        )
    }

    pub(crate) fn block_record_missing(id: BlockId) -> Self {
        NoteError::RecordNotFound {
            table: "block",
            id: id.to_string(),
        }
    }

    /// Failures worth another attempt: the backend or the disk hiccuped.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NoteError::Persistence(_) | NoteError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, NoteError>;
