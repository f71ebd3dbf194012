use super::{
    sort_blocks, upsert, BlockChanges, BlockRecord, PageChanges, PageFilter, PageRecord,
    PersistenceGateway,
};
use crate::error::{NoteError, Result};
use crate::model::{BlockId, PageId, WorkspaceId};
use std::cell::RefCell;

/// In-memory gateway for tests and offline use.
///
/// Uses `RefCell` for interior mutability since a workspace has a single
/// writer. Failure injection covers both permanent outages
/// ([`Self::set_simulate_write_error`]) and transient ones
/// ([`Self::fail_next_writes`]).
#[derive(Default)]
pub struct MemGateway {
    pages: RefCell<Vec<PageRecord>>,
    blocks: RefCell<Vec<BlockRecord>>,
    simulate_write_error: RefCell<bool>,
    simulate_read_error: RefCell<bool>,
    failing_writes: RefCell<u32>,
    write_calls: RefCell<usize>,
}

impl MemGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write fails until switched off.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    pub fn set_simulate_read_error(&self, simulate: bool) {
        *self.simulate_read_error.borrow_mut() = simulate;
    }

    /// The next `count` writes fail, later ones succeed.
    pub fn fail_next_writes(&self, count: u32) {
        *self.failing_writes.borrow_mut() = count;
    }

    /// Number of write calls received, failed ones included.
    pub fn write_calls(&self) -> usize {
        *self.write_calls.borrow()
    }

    /// The stored record, deleted or not.
    pub fn page_record(&self, id: PageId) -> Option<PageRecord> {
        self.pages.borrow().iter().find(|r| r.id == id).cloned()
    }

    pub fn block_record(&self, id: BlockId) -> Option<BlockRecord> {
        self.blocks.borrow().iter().find(|r| r.id == id).cloned()
    }

    pub fn page_count(&self) -> usize {
        self.pages.borrow().len()
    }

    fn check_write(&self) -> Result<()> {
        *self.write_calls.borrow_mut() += 1;
        if *self.simulate_write_error.borrow() {
            return Err(NoteError::Persistence("Simulated write error".to_string()));
        }
        let mut failing = self.failing_writes.borrow_mut();
        if *failing > 0 {
            *failing -= 1;
            return Err(NoteError::Persistence("Simulated transient error".to_string()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<()> {
        if *self.simulate_read_error.borrow() {
            return Err(NoteError::Persistence("Simulated read error".to_string()));
        }
        Ok(())
    }
}

impl PersistenceGateway for MemGateway {
    fn insert_page(&self, workspace: WorkspaceId, record: &PageRecord) -> Result<PageRecord> {
        self.check_write()?;
        let stored = PageRecord {
            workspace_id: workspace,
            ..record.clone()
        };
        upsert(&mut *self.pages.borrow_mut(), stored.clone(), |r| r.id);
        Ok(stored)
    }

    fn update_page(&self, id: PageId, changes: &PageChanges) -> Result<()> {
        self.check_write()?;
        let mut pages = self.pages.borrow_mut();
        let record = pages
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(NoteError::PageNotFound(id))?;
        record.apply(changes);
        Ok(())
    }

    fn soft_delete_page(&self, id: PageId) -> Result<()> {
        self.check_write()?;
        if let Some(record) = self.pages.borrow_mut().iter_mut().find(|r| r.id == id) {
            record.is_archived = true;
        }
        Ok(())
    }

    fn list_pages(&self, workspace: WorkspaceId, filter: PageFilter) -> Result<Vec<PageRecord>> {
        self.check_read()?;
        Ok(self
            .pages
            .borrow()
            .iter()
            .filter(|r| r.workspace_id == workspace && filter.matches(r))
            .cloned()
            .collect())
    }

    fn insert_block(&self, page: PageId, record: &BlockRecord) -> Result<BlockRecord> {
        self.check_write()?;
        let stored = BlockRecord {
            page_id: page,
            ..record.clone()
        };
        upsert(&mut *self.blocks.borrow_mut(), stored.clone(), |r| r.id);
        Ok(stored)
    }

    fn update_block(&self, id: BlockId, changes: &BlockChanges) -> Result<()> {
        self.check_write()?;
        let mut blocks = self.blocks.borrow_mut();
        let record = blocks
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| NoteError::block_record_missing(id))?;
        record.apply(changes);
        Ok(())
    }

    fn delete_block(&self, id: BlockId) -> Result<()> {
        self.check_write()?;
        self.blocks.borrow_mut().retain(|r| r.id != id);
        Ok(())
    }

    fn list_blocks(&self, page: PageId) -> Result<Vec<BlockRecord>> {
        self.check_read()?;
        let mut records: Vec<BlockRecord> = self
            .blocks
            .borrow()
            .iter()
            .filter(|r| r.page_id == page)
            .cloned()
            .collect();
        sort_blocks(&mut records);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, BlockType, Page};

    fn stored_page(gateway: &MemGateway, workspace: WorkspaceId, parent: Option<PageId>) -> PageId {
        let page = Page::new("P", parent);
        gateway
            .insert_page(workspace, &PageRecord::from_page(workspace, &page, None))
            .unwrap();
        page.id
    }

    #[test]
    fn list_pages_is_scoped_by_workspace() {
        let gateway = MemGateway::new();
        let ws = WorkspaceId::new();
        let other = WorkspaceId::new();
        let a = stored_page(&gateway, ws, None);
        stored_page(&gateway, other, None);

        let listed = gateway.list_pages(ws, PageFilter::All).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, a);
    }

    #[test]
    fn soft_delete_moves_page_to_archive() {
        let gateway = MemGateway::new();
        let ws = WorkspaceId::new();
        let a = stored_page(&gateway, ws, None);
        gateway.soft_delete_page(a).unwrap();

        let archived = gateway.list_pages(ws, PageFilter::Archived).unwrap();
        assert_eq!(archived.len(), 1);
        assert!(gateway.list_pages(ws, PageFilter::Root).unwrap().is_empty());
        assert!(!gateway.page_record(a).unwrap().is_deleted);
        // Archiving again is fine.
        gateway.soft_delete_page(a).unwrap();
        gateway.soft_delete_page(PageId::new()).unwrap();
    }

    #[test]
    fn deleted_flag_hides_from_every_filter() {
        let gateway = MemGateway::new();
        let ws = WorkspaceId::new();
        let a = stored_page(&gateway, ws, None);
        gateway
            .update_page(
                a,
                &PageChanges {
                    is_archived: Some(true),
                    is_deleted: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(gateway.list_pages(ws, PageFilter::All).unwrap().is_empty());
        assert!(gateway.list_pages(ws, PageFilter::Archived).unwrap().is_empty());
        assert!(gateway.page_record(a).unwrap().is_deleted);
    }

    #[test]
    fn update_unknown_page_is_not_found() {
        let gateway = MemGateway::new();
        let err = gateway
            .update_page(PageId::new(), &PageChanges::default())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn blocks_come_back_ordered_by_position() {
        let gateway = MemGateway::new();
        let page = PageId::new();
        let a = Block::new(BlockType::Text, "a");
        let b = Block::new(BlockType::Text, "b");
        gateway
            .insert_block(page, &BlockRecord::from_block(page, &b, 1))
            .unwrap();
        gateway
            .insert_block(page, &BlockRecord::from_block(page, &a, 0))
            .unwrap();

        let listed = gateway.list_blocks(page).unwrap();
        let contents: Vec<_> = listed.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b"]);
    }

    #[test]
    fn transient_failures_run_out() {
        let gateway = MemGateway::new();
        gateway.fail_next_writes(2);
        let ws = WorkspaceId::new();
        let page = Page::new("P", None);
        let record = PageRecord::from_page(ws, &page, None);

        assert!(gateway.insert_page(ws, &record).is_err());
        assert!(gateway.insert_page(ws, &record).is_err());
        assert!(gateway.insert_page(ws, &record).is_ok());
        assert_eq!(gateway.write_calls(), 3);
        assert_eq!(gateway.page_count(), 1);
    }

    #[test]
    fn simulated_write_error_blocks_writes() {
        let gateway = MemGateway::new();
        gateway.set_simulate_write_error(true);
        let err = gateway.delete_block(BlockId::new()).unwrap_err();
        assert!(err.is_retryable());
    }
}
