use super::{
    sort_blocks, upsert, BlockChanges, BlockRecord, PageChanges, PageFilter, PageRecord,
    PersistenceGateway,
};
use crate::config::NoteConfig;
use crate::error::{NoteError, Result};
use crate::model::{BlockId, PageId, WorkspaceId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const PAGES_FILE: &str = "pages.json";
const BLOCKS_FILE: &str = "blocks.json";

/// Gateway keeping two JSON tables (`pages.json`, `blocks.json`) in a directory.
///
/// Every write loads the table, changes it and writes it back through a
/// temporary file renamed over the original, so a crash never leaves a
/// half-written table behind.
pub struct FsGateway {
    root: PathBuf,
}

impl FsGateway {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Gateway rooted at the configured data directory.
    pub fn from_config(config: &NoteConfig) -> Result<Self> {
        let root = config.data_dir().ok_or_else(|| {
            NoteError::Persistence("no data directory could be determined".to_string())
        })?;
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
        }
        Ok(())
    }

    fn load_table<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let path = self.root.join(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save_table<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<()> {
        self.ensure_dir()?;
        let content = serde_json::to_string_pretty(rows)?;

        let tmp_file = self.root.join(format!(".{}-{}.tmp", name, Uuid::new_v4()));
        fs::write(&tmp_file, content)?;
        fs::rename(&tmp_file, self.root.join(name))?;
        Ok(())
    }

    fn pages(&self) -> Result<Vec<PageRecord>> {
        self.load_table(PAGES_FILE)
    }

    fn blocks(&self) -> Result<Vec<BlockRecord>> {
        self.load_table(BLOCKS_FILE)
    }
}

impl PersistenceGateway for FsGateway {
    fn insert_page(&self, workspace: WorkspaceId, record: &PageRecord) -> Result<PageRecord> {
        let mut pages = self.pages()?;
        let stored = PageRecord {
            workspace_id: workspace,
            ..record.clone()
        };
        upsert(&mut pages, stored.clone(), |r| r.id);
        self.save_table(PAGES_FILE, &pages)?;
        Ok(stored)
    }

    fn update_page(&self, id: PageId, changes: &PageChanges) -> Result<()> {
        let mut pages = self.pages()?;
        let record = pages
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(NoteError::PageNotFound(id))?;
        record.apply(changes);
        self.save_table(PAGES_FILE, &pages)
    }

    fn soft_delete_page(&self, id: PageId) -> Result<()> {
        let mut pages = self.pages()?;
        let Some(record) = pages.iter_mut().find(|r| r.id == id) else {
            return Ok(());
        };
        record.is_archived = true;
        self.save_table(PAGES_FILE, &pages)
    }

    fn list_pages(&self, workspace: WorkspaceId, filter: PageFilter) -> Result<Vec<PageRecord>> {
        Ok(self
            .pages()?
            .into_iter()
            .filter(|r| r.workspace_id == workspace && filter.matches(r))
            .collect())
    }

    fn insert_block(&self, page: PageId, record: &BlockRecord) -> Result<BlockRecord> {
        let mut blocks = self.blocks()?;
        let stored = BlockRecord {
            page_id: page,
            ..record.clone()
        };
        upsert(&mut blocks, stored.clone(), |r| r.id);
        self.save_table(BLOCKS_FILE, &blocks)?;
        Ok(stored)
    }

    fn update_block(&self, id: BlockId, changes: &BlockChanges) -> Result<()> {
        let mut blocks = self.blocks()?;
        let record = blocks
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| NoteError::block_record_missing(id))?;
        record.apply(changes);
        self.save_table(BLOCKS_FILE, &blocks)
    }

    fn delete_block(&self, id: BlockId) -> Result<()> {
        let mut blocks = self.blocks()?;
        let before = blocks.len();
        blocks.retain(|r| r.id != id);
        if blocks.len() == before {
            return Ok(());
        }
        self.save_table(BLOCKS_FILE, &blocks)
    }

    fn list_blocks(&self, page: PageId) -> Result<Vec<BlockRecord>> {
        let mut records: Vec<BlockRecord> = self
            .blocks()?
            .into_iter()
            .filter(|r| r.page_id == page)
            .collect();
        sort_blocks(&mut records);
        Ok(records)
    }
}
