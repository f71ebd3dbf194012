//! Rebuilding the page tree from the gateway.
//!
//! The backend has no transactions spanning a page and its blocks, so what
//! comes back can be inconsistent. Loading repairs it in memory and returns
//! the intents that write the repairs back:
//!
//! - **Empty pages**: a page without blocks gets one empty text block.
//! - **Orphans**: a page whose parent is not among the loaded pages is moved
//!   to the root.
//! - **Cycles**: a persisted parent loop is cut by moving one of its pages to
//!   the root.
//! - **Positions**: blocks whose stored position differs from their rank are
//!   renumbered `0..n`.

use super::Intent;
use crate::blocks::BlockSequence;
use crate::error::Result;
use crate::gateway::{BlockChanges, BlockRecord, PageChanges, PageFilter, PersistenceGateway};
use crate::model::{Block, Page, PageId, WorkspaceId};
use crate::tree::{PageTree, TreeOptions};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadReport {
    pub pages_loaded: usize,
    pub filled_empty_pages: Vec<PageId>,
    pub orphans_moved_to_root: Vec<PageId>,
    pub cycles_broken: Vec<PageId>,
    pub renumbered_pages: Vec<PageId>,
}

impl ReloadReport {
    pub fn is_clean(&self) -> bool {
        self.filled_empty_pages.is_empty()
            && self.orphans_moved_to_root.is_empty()
            && self.cycles_broken.is_empty()
            && self.renumbered_pages.is_empty()
    }
}

/// Loads every non-deleted page of `workspace` with its blocks.
pub fn load_tree<G: PersistenceGateway + ?Sized>(
    gateway: &G,
    workspace: WorkspaceId,
    options: TreeOptions,
) -> Result<(PageTree, ReloadReport, Vec<Intent>)> {
    let records = gateway.list_pages(workspace, PageFilter::All)?;
    let mut report = ReloadReport {
        pages_loaded: records.len(),
        ..Default::default()
    };
    let mut repairs = Vec::new();

    let mut pages = Vec::with_capacity(records.len());
    for record in records {
        let block_records = gateway.list_blocks(record.id)?;
        let page_id = record.id;
        let misnumbered = block_records
            .iter()
            .enumerate()
            .any(|(idx, r)| r.position != idx as i64);

        let blocks = BlockSequence::from_positioned(
            block_records
                .into_iter()
                .map(BlockRecord::into_positioned)
                .collect(),
        );
        let mut page = record.into_page(blocks);

        if page.blocks.is_empty() {
            let block = page.blocks.insert_block_after(None, Block::empty_text());
            repairs.push(Intent::InsertBlock(BlockRecord::from_block(page_id, &block, 0)));
            report.filled_empty_pages.push(page_id);
        } else if misnumbered {
            repairs.extend(page.blocks.positions().into_iter().map(|(id, position)| {
                Intent::UpdateBlock {
                    id,
                    changes: BlockChanges::position(position),
                }
            }));
            report.renumbered_pages.push(page_id);
        }
        pages.push(page);
    }

    reattach_orphans(&mut pages, &mut report, &mut repairs);
    break_cycles(&mut pages, &mut report, &mut repairs);

    if report.is_clean() {
        info!(pages = report.pages_loaded, "Workspace loaded");
    } else {
        warn!(
            pages = report.pages_loaded,
            filled = report.filled_empty_pages.len(),
            orphans = report.orphans_moved_to_root.len(),
            cycles = report.cycles_broken.len(),
            renumbered = report.renumbered_pages.len(),
            "Workspace loaded with repairs"
        );
    }

    Ok((PageTree::from_pages(pages, options), report, repairs))
}

fn reattach_orphans(pages: &mut [Page], report: &mut ReloadReport, repairs: &mut Vec<Intent>) {
    let known: HashSet<PageId> = pages.iter().map(|p| p.id).collect();
    for page in pages.iter_mut() {
        if let Some(parent) = page.parent_id {
            if !known.contains(&parent) {
                page.parent_id = None;
                repairs.push(Intent::UpdatePage {
                    id: page.id,
                    changes: PageChanges::parent(page),
                });
                report.orphans_moved_to_root.push(page.id);
            }
        }
    }
}

fn break_cycles(pages: &mut [Page], report: &mut ReloadReport, repairs: &mut Vec<Intent>) {
    let index: HashMap<PageId, usize> = pages.iter().enumerate().map(|(i, p)| (p.id, i)).collect();

    for start in 0..pages.len() {
        let id = pages[start].id;
        let mut seen = HashSet::new();
        let mut current = pages[start].parent_id;
        while let Some(parent) = current {
            if parent == id {
                pages[start].parent_id = None;
                repairs.push(Intent::UpdatePage {
                    id,
                    changes: PageChanges::parent(&pages[start]),
                });
                report.cycles_broken.push(id);
                break;
            }
            // A loop further up that does not pass through `id` is cut when
            // its own members come up.
            if !seen.insert(parent) {
                break;
            }
            current = index.get(&parent).and_then(|&i| pages[i].parent_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MemGateway, PageRecord};
    use crate::model::BlockType;

    fn store(gateway: &MemGateway, ws: WorkspaceId, page: &Page, with_blocks: bool) {
        gateway
            .insert_page(ws, &PageRecord::from_page(ws, page, None))
            .unwrap();
        if with_blocks {
            for (id, position) in page.blocks.positions() {
                if let Some(block) = page.blocks.get(id) {
                    gateway
                        .insert_block(page.id, &BlockRecord::from_block(page.id, block, position))
                        .unwrap();
                }
            }
        }
    }

    #[test]
    fn clean_load_has_no_repairs() {
        let gateway = MemGateway::new();
        let ws = WorkspaceId::new();
        let a = Page::new("A", None);
        let b = Page::new("B", Some(a.id));
        store(&gateway, ws, &a, true);
        store(&gateway, ws, &b, true);

        let (tree, report, repairs) = load_tree(&gateway, ws, TreeOptions::default()).unwrap();
        assert!(report.is_clean());
        assert!(repairs.is_empty());
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.child_pages(a.id).len(), 1);
    }

    #[test]
    fn page_without_blocks_gets_an_empty_text_block() {
        let gateway = MemGateway::new();
        let ws = WorkspaceId::new();
        let a = Page::new("A", None);
        store(&gateway, ws, &a, false);

        let (tree, report, repairs) = load_tree(&gateway, ws, TreeOptions::default()).unwrap();
        assert_eq!(report.filled_empty_pages, vec![a.id]);
        let page = tree.get_page(a.id).unwrap();
        assert_eq!(page.blocks.len(), 1);
        assert_eq!(page.blocks.as_slice()[0].block_type, BlockType::Text);
        assert!(matches!(repairs.as_slice(), [Intent::InsertBlock(r)] if r.position == 0));
    }

    #[test]
    fn orphan_moves_to_root() {
        let gateway = MemGateway::new();
        let ws = WorkspaceId::new();
        let orphan = Page::new("Lost", Some(PageId::new()));
        store(&gateway, ws, &orphan, true);

        let (tree, report, repairs) = load_tree(&gateway, ws, TreeOptions::default()).unwrap();
        assert_eq!(report.orphans_moved_to_root, vec![orphan.id]);
        assert_eq!(tree.root_pages().len(), 1);
        assert_eq!(repairs.len(), 1);
    }

    #[test]
    fn persisted_cycle_is_broken() {
        let gateway = MemGateway::new();
        let ws = WorkspaceId::new();
        let mut a = Page::new("A", None);
        let mut b = Page::new("B", None);
        a.parent_id = Some(b.id);
        b.parent_id = Some(a.id);
        store(&gateway, ws, &a, true);
        store(&gateway, ws, &b, true);

        let (tree, report, _) = load_tree(&gateway, ws, TreeOptions::default()).unwrap();
        assert_eq!(report.cycles_broken, vec![a.id]);
        assert!(tree.get_page(a.id).unwrap().parent_id.is_none());
        assert_eq!(tree.get_page(b.id).unwrap().parent_id, Some(a.id));
        assert_eq!(tree.page_path(b.id).len(), 2);
    }

    #[test]
    fn gapped_positions_are_renumbered() {
        let gateway = MemGateway::new();
        let ws = WorkspaceId::new();
        let a = Page::new("A", None);
        store(&gateway, ws, &a, false);
        let x = Block::new(BlockType::Text, "x");
        let y = Block::new(BlockType::Text, "y");
        gateway
            .insert_block(a.id, &BlockRecord::from_block(a.id, &x, 10))
            .unwrap();
        gateway
            .insert_block(a.id, &BlockRecord::from_block(a.id, &y, 20))
            .unwrap();

        let (tree, report, repairs) = load_tree(&gateway, ws, TreeOptions::default()).unwrap();
        assert_eq!(report.renumbered_pages, vec![a.id]);
        assert_eq!(tree.get_page(a.id).unwrap().blocks.ids(), vec![x.id, y.id]);
        assert_eq!(repairs.len(), 2);
    }
}
