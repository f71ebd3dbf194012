use notezero::api::Workspace;
use notezero::config::{NoteConfig, RetryConfig};
use notezero::error::NoteError;
use notezero::gateway::{FsGateway, MemGateway, PageFilter, PageRecord, PersistenceGateway};
use notezero::model::{BlockPatch, BlockType, NewBlock, Page, PagePatch, WorkspaceId};
use tempfile::tempdir;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fast_config() -> NoteConfig {
    NoteConfig {
        retry: RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        },
        ..Default::default()
    }
}

fn order(ws: &Workspace<impl PersistenceGateway>, page: notezero::PageId) -> Vec<String> {
    ws.get_page(page)
        .unwrap()
        .blocks
        .iter()
        .map(|b| format!("{}:{}", b.id, b.content))
        .collect()
}

#[test]
fn test_block_order_survives_reload() {
    init_tracing();
    let mut ws = Workspace::new(MemGateway::new(), WorkspaceId::new(), fast_config());
    let page = ws.create_page("Ordering", None).unwrap();

    // Deterministic mix of inserts, removes and moves.
    let mut seed: u64 = 0x5eed;
    let mut next = |bound: usize| {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((seed >> 33) as usize) % bound.max(1)
    };
    for step in 0..60 {
        let ids = ws.get_page(page.id).unwrap().blocks.ids();
        match next(4) {
            0 | 1 => {
                let anchor = (!ids.is_empty()).then(|| ids[next(ids.len())]);
                ws.insert_block(page.id, anchor, NewBlock::text(format!("b{step}")))
                    .unwrap();
            }
            2 if ids.len() > 1 => {
                ws.remove_block(page.id, ids[next(ids.len())]).unwrap();
            }
            _ if !ids.is_empty() => {
                let target = next(ids.len() + 1);
                ws.move_block(page.id, ids[next(ids.len())], target).unwrap();
            }
            _ => {}
        }
    }

    let before = order(&ws, page.id);
    ws.flush().unwrap();
    let report = ws.reload().unwrap();
    assert!(report.is_clean());
    assert_eq!(order(&ws, page.id), before);
}

#[test]
fn test_fs_gateway_round_trip() {
    init_tracing();
    let dir = tempdir().unwrap();
    let config = NoteConfig {
        data_dir: Some(dir.path().to_path_buf()),
        ..fast_config()
    };
    let ws_id = WorkspaceId::new();

    let gateway = FsGateway::from_config(&config).unwrap();
    let mut ws = Workspace::new(gateway, ws_id, config.clone()).with_created_by("ana");
    let parent = ws.create_page("Projects", None).unwrap();
    let child = ws.create_page("Launch", Some(parent.id)).unwrap();
    ws.update_page(parent.id, &PagePatch::icon("🚀")).unwrap();
    ws.toggle_favorite(child.id).unwrap();
    let todo = ws
        .insert_block(child.id, None, NewBlock::todo("write notes"))
        .unwrap()
        .unwrap();
    ws.update_block(child.id, todo.id, &BlockPatch::checked(true))
        .unwrap();
    let trashed = ws.create_page("Old", None).unwrap();
    ws.archive_page(trashed.id).unwrap();
    ws.flush().unwrap();
    assert_eq!(ws.pending(), 0);

    let gateway = FsGateway::new(dir.path());
    let records = gateway.list_pages(ws_id, PageFilter::All).unwrap();
    assert_eq!(records.len(), 3);
    assert!(records
        .iter()
        .all(|r| r.created_by.as_deref() == Some("ana")));

    let (reopened, report) = Workspace::open(gateway, ws_id, config).unwrap();
    assert!(report.is_clean());
    assert_eq!(reopened.page_path(child.id).len(), 2);
    assert_eq!(
        reopened.get_page(parent.id).unwrap().icon.as_deref(),
        Some("🚀")
    );
    assert_eq!(reopened.favorite_pages().len(), 1);
    assert_eq!(reopened.archived_pages().len(), 1);

    let blocks: Vec<_> = reopened.get_page(child.id).unwrap().blocks.iter().collect();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].block_type, BlockType::Todo);
    assert!(blocks[1].checked);
}

#[test]
fn test_permanent_delete_is_not_reloaded() {
    let mut ws = Workspace::new(MemGateway::new(), WorkspaceId::new(), fast_config());
    let a = ws.create_page("A", None).unwrap();
    let b = ws.create_page("B", Some(a.id)).unwrap();
    ws.flush().unwrap();

    ws.archive_page(a.id).unwrap();
    ws.permanently_delete(a.id).unwrap();
    ws.flush().unwrap();

    let record = ws.gateway().page_record(b.id).unwrap();
    assert!(record.is_deleted);

    ws.reload().unwrap();
    assert!(ws.tree().is_empty());
}

#[test]
fn test_permanent_delete_removes_block_rows() {
    let mut ws = Workspace::new(MemGateway::new(), WorkspaceId::new(), fast_config());
    let page = ws.create_page("Doomed", None).unwrap();
    let todo = ws
        .insert_block(page.id, None, NewBlock::todo("one"))
        .unwrap()
        .unwrap();
    ws.flush().unwrap();
    assert_eq!(ws.gateway().list_blocks(page.id).unwrap().len(), 2);

    ws.archive_page(page.id).unwrap();
    ws.permanently_delete(page.id).unwrap();
    ws.flush().unwrap();

    assert!(ws.gateway().list_blocks(page.id).unwrap().is_empty());
    assert!(ws.gateway().block_record(todo.id).is_none());
}

#[test]
fn test_block_edit_updated_at_survives_reload() {
    let mut ws = Workspace::new(MemGateway::new(), WorkspaceId::new(), fast_config());
    let page = ws.create_page("Journal", None).unwrap();
    ws.flush().unwrap();

    let block = page.blocks.ids()[0];
    ws.update_block(page.id, block, &BlockPatch::content("today"))
        .unwrap();
    ws.flush().unwrap();
    let local = ws.get_page(page.id).unwrap().updated_at;

    ws.reload().unwrap();
    assert_eq!(ws.get_page(page.id).unwrap().updated_at, local);
}

#[test]
fn test_archive_reloads_as_archived_not_deleted() {
    let mut ws = Workspace::new(MemGateway::new(), WorkspaceId::new(), fast_config());
    let page = ws.create_page("Later", None).unwrap();
    ws.archive_page(page.id).unwrap();
    ws.flush().unwrap();

    let record = ws.gateway().page_record(page.id).unwrap();
    assert!(record.is_archived);
    assert!(!record.is_deleted);

    ws.reload().unwrap();
    assert_eq!(ws.archived_pages().len(), 1);
}

#[test]
fn test_transient_failures_are_retried() {
    let mut ws = Workspace::new(MemGateway::new(), WorkspaceId::new(), fast_config());
    ws.create_page("A", None).unwrap();

    ws.gateway().fail_next_writes(2);
    let report = ws.flush().unwrap();
    assert_eq!(report.applied, 2);
    assert_eq!(report.retries, 2);
    assert_eq!(ws.gateway().page_count(), 1);
}

#[test]
fn test_outage_keeps_local_state_and_queue() {
    let mut ws = Workspace::new(MemGateway::new(), WorkspaceId::new(), fast_config());
    let page = ws.create_page("Draft", None).unwrap();
    ws.update_page(page.id, &PagePatch::title("Final")).unwrap();
    let pending = ws.pending();

    ws.gateway().set_simulate_write_error(true);
    let err = ws.flush().unwrap_err();
    assert!(matches!(err, NoteError::Persistence(_)));
    assert_eq!(ws.pending(), pending);
    assert_eq!(ws.get_page(page.id).unwrap().title, "Final");
    assert_eq!(ws.gateway().write_calls(), 3);

    ws.gateway().set_simulate_write_error(false);
    ws.flush().unwrap();
    assert_eq!(ws.pending(), 0);
    assert_eq!(ws.gateway().page_record(page.id).unwrap().title, "Final");
}

#[test]
fn test_reload_discards_unflushed_changes() {
    let mut ws = Workspace::new(MemGateway::new(), WorkspaceId::new(), fast_config());
    let page = ws.create_page("Saved", None).unwrap();
    ws.flush().unwrap();

    ws.update_page(page.id, &PagePatch::title("Unsaved")).unwrap();
    ws.reload().unwrap();
    assert_eq!(ws.get_page(page.id).unwrap().title, "Saved");
    assert_eq!(ws.pending(), 0);
}

#[test]
fn test_open_repairs_page_without_blocks() {
    init_tracing();
    let gateway = MemGateway::new();
    let ws_id = WorkspaceId::new();
    // A page whose first block never made it to the backend.
    let page = Page::new("Half written", None);
    gateway
        .insert_page(ws_id, &PageRecord::from_page(ws_id, &page, None))
        .unwrap();

    let (mut ws, report) = Workspace::open(gateway, ws_id, fast_config()).unwrap();
    assert_eq!(report.filled_empty_pages, vec![page.id]);
    let loaded = ws.get_page(page.id).unwrap();
    assert_eq!(loaded.blocks.len(), 1);
    assert_eq!(loaded.blocks.as_slice()[0].block_type, BlockType::Text);

    assert_eq!(ws.pending(), 1);
    ws.flush().unwrap();
    assert_eq!(ws.gateway().list_blocks(page.id).unwrap().len(), 1);
}

#[test]
fn test_read_failure_surfaces_on_open() {
    let gateway = MemGateway::new();
    gateway.set_simulate_read_error(true);
    let result = Workspace::open(gateway, WorkspaceId::new(), fast_config());
    assert!(matches!(result, Err(NoteError::Persistence(_))));
}
