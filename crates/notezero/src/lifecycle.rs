//! # Page Lifecycle
//!
//! ```text
//!            archive                 permanently_delete
//!   Active ──────────▶ Archived ───────────────────────▶ Deleted
//!     ▲                   │                                 ▲
//!     └───── restore ─────┘                                 │
//!     └──────────────── permanently_delete ─────────────────┘
//! ```
//!
//! `Deleted` is terminal. The UI always archives before deleting, but a direct
//! `Active → Deleted` call is allowed since nothing depends on the detour.
//!
//! Restoring an active page and archiving an archived page are no-ops rather
//! than errors: both requests already describe the current state.
//!
//! Favorites are not part of this machine. `is_favorite` is an independent flag.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Active,
    Archived,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Archive,
    Restore,
    PermanentlyDelete,
}

impl Lifecycle {
    /// Collapses the stored flags. `is_deleted` wins over `is_archived`.
    pub fn from_flags(is_archived: bool, is_deleted: bool) -> Self {
        if is_deleted {
            Lifecycle::Deleted
        } else if is_archived {
            Lifecycle::Archived
        } else {
            Lifecycle::Active
        }
    }

    /// The state reached by applying `transition`, or `None` when the
    /// transition is not allowed from here.
    pub fn apply(self, transition: Transition) -> Option<Lifecycle> {
        use Lifecycle::*;
        use Transition::*;

        match (self, transition) {
            (Deleted, _) => None,
            (Active | Archived, Archive) => Some(Archived),
            (Active | Archived, Restore) => Some(Active),
            (Active | Archived, PermanentlyDelete) => Some(Deleted),
        }
    }

    /// `(is_archived, is_deleted)` for this state.
    ///
    /// A deleted page keeps `is_archived = true` when it came through the
    /// archive, which is how the backend stores tombstones.
    pub fn flags(self) -> (bool, bool) {
        match self {
            Lifecycle::Active => (false, false),
            Lifecycle::Archived => (true, false),
            Lifecycle::Deleted => (true, true),
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Active => write!(f, "active"),
            Lifecycle::Archived => write!(f, "archived"),
            Lifecycle::Deleted => write!(f, "deleted"),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Archive => write!(f, "archive"),
            Transition::Restore => write!(f, "restore"),
            Transition::PermanentlyDelete => write!(f, "permanently delete"),
        }
    }
}
