//! # Configuration
//!
//! Notezero configuration is declared with [`confique`], which layers values from
//! environment variables over an optional TOML file over compiled defaults.
//!
//! ## Resolution Order
//!
//! 1. **Environment variables**: `NOTEZERO_STRICT`, `NOTEZERO_UNTITLED`, `NOTEZERO_DATA`, ...
//! 2. **TOML file**: passed to [`NoteConfig::load`], usually `notezero.toml`.
//! 3. **Compiled Defaults**: `#[config(default = ...)]`, mirrored by `Default`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `strict` | `true` | Writes on unknown pages/blocks fail with NotFound |
//! | `untitled_placeholder` | `Untitled` | Shown for pages with an empty title |
//! | `default_icon` | `📄` | Shown for pages without an icon |
//! | `copy_suffix` | ` (copy)` | Appended to duplicated page titles |
//! | `data_dir` | OS data dir | Where the filesystem gateway keeps its tables |
//! | `retry.max_attempts` | `3` | Attempts per persistence call |
//! | `retry.initial_backoff_ms` | `50` | First retry delay |
//! | `retry.max_backoff_ms` | `2000` | Retry delay cap |

use crate::error::Result;
use crate::sync::RetryPolicy;
use crate::tree::TreeOptions;
use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a notezero workspace, stored in `notezero.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NoteConfig {
    /// Fail writes that reference unknown pages or blocks instead of ignoring them.
    #[config(default = true, env = "NOTEZERO_STRICT")]
    pub strict: bool,

    /// Display title for pages whose stored title is empty (e.g. "Без названия").
    #[config(default = "Untitled", env = "NOTEZERO_UNTITLED")]
    pub untitled_placeholder: String,

    /// Display icon for pages without one.
    #[config(default = "📄")]
    pub default_icon: String,

    /// Suffix appended to the title of a duplicated page.
    #[config(default = " (copy)")]
    pub copy_suffix: String,

    /// Directory for the filesystem gateway. Falls back to the OS data dir.
    #[config(env = "NOTEZERO_DATA")]
    pub data_dir: Option<PathBuf>,

    #[config(nested)]
    pub retry: RetryConfig,
}

/// Bounded retry for persistence calls.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    #[config(default = 3, env = "NOTEZERO_RETRY_MAX_ATTEMPTS")]
    pub max_attempts: u32,

    #[config(default = 50)]
    pub initial_backoff_ms: u64,

    #[config(default = 2000)]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 50,
            max_backoff_ms: 2000,
        }
    }
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            strict: true,
            untitled_placeholder: "Untitled".to_string(),
            default_icon: "📄".to_string(),
            copy_suffix: " (copy)".to_string(),
            data_dir: None,
            retry: RetryConfig::default(),
        }
    }
}

impl NoteConfig {
    /// Loads env overrides on top of `path` (if given and present) on top of defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Self::builder().env();
        if let Some(path) = path {
            builder = builder.file(path);
        }
        Ok(builder.load()?)
    }

    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            strict: self.strict,
            copy_suffix: self.copy_suffix.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }

    /// The configured data directory, or the OS-appropriate one.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(|| {
            ProjectDirs::from("com", "notezero", "notezero").map(|d| d.data_dir().to_path_buf())
        })
    }
}
