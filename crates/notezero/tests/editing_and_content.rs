use notezero::database::{FilterOp, PropertyValue, RowFilter, SortDirection};
use notezero::editing::EditCommand;
use notezero::model::{BlockPatch, BlockType, NewBlock};
use notezero::search::MatchSegment;
use notezero::test_utils::TreeFixture;

#[test]
fn test_backspace_on_new_empty_paragraph_keeps_it() {
    let mut fx = TreeFixture::new().page("Notes", None);
    let page = fx.id("Notes");
    let first = fx.get("Notes").blocks.ids()[0];
    fx.ws
        .update_block(page, first, &BlockPatch::content("hello"))
        .unwrap();

    let enter = fx
        .ws
        .apply_edit(page, first, EditCommand::ParagraphBreak)
        .unwrap();
    assert!(enter.changed);
    let new_block = enter.focus.unwrap();
    assert_eq!(fx.get("Notes").blocks.ids(), vec![first, new_block]);

    let back = fx
        .ws
        .apply_edit(page, new_block, EditCommand::DeleteBackward)
        .unwrap();
    assert!(!back.changed);
    assert_eq!(back.focus, Some(new_block));
    assert_eq!(fx.get("Notes").blocks.ids(), vec![first, new_block]);
}

#[test]
fn test_backspace_on_empty_todo_converts_in_place() {
    let mut fx = TreeFixture::new().page("Notes", None);
    let page = fx.id("Notes");
    let todo = fx
        .ws
        .insert_block(page, None, NewBlock::todo(""))
        .unwrap()
        .unwrap();

    let outcome = fx
        .ws
        .apply_edit(page, todo.id, EditCommand::DeleteBackward)
        .unwrap();
    assert_eq!(outcome.focus, Some(todo.id));
    let block = fx.get("Notes").blocks.get(todo.id).unwrap().clone();
    assert_eq!(block.block_type, BlockType::Text);
    assert_eq!(fx.get("Notes").blocks.len(), 2);
}

#[test]
fn test_backspace_on_only_block_does_nothing() {
    let mut fx = TreeFixture::new().page("Notes", None);
    let page = fx.id("Notes");
    let only = fx.get("Notes").blocks.ids()[0];

    let outcome = fx
        .ws
        .apply_edit(page, only, EditCommand::DeleteBackward)
        .unwrap();
    assert!(!outcome.changed);
    assert_eq!(fx.get("Notes").blocks.len(), 1);
}

#[test]
fn test_slash_convert_to_todo() {
    let mut fx = TreeFixture::new().page("Notes", None);
    let page = fx.id("Notes");
    let first = fx.get("Notes").blocks.ids()[0];
    fx.ws
        .update_block(page, first, &BlockPatch::content("/todo"))
        .unwrap();

    fx.ws
        .apply_edit(page, first, EditCommand::ConvertTo(BlockType::Todo))
        .unwrap();
    let block = fx.get("Notes").blocks.get(first).unwrap();
    assert_eq!(block.block_type, BlockType::Todo);
    assert!(block.content.is_empty());
    assert!(!block.checked);
}

#[test]
fn test_search_highlights_seeded_content() {
    let mut fx = TreeFixture::new();
    fx.ws.seed().unwrap();

    let hits = fx.ws.search("mvp");
    assert_eq!(hits.len(), 1);
    let page = fx.ws.get_page(hits[0].page_id).unwrap();
    assert_eq!(page.title, "Q4 Project Plan");
    let block = hits[0].block.as_ref().unwrap();
    assert!(block
        .segments
        .contains(&MatchSegment::Match("MVP".to_string())));
}

#[test]
fn test_seeded_tasks_board_and_filters() {
    let mut fx = TreeFixture::new();
    fx.ws.seed().unwrap();
    let tasks = &fx.ws.databases()[0];

    let board = tasks.group_by_select("status").unwrap();
    let columns: Vec<(&str, usize)> = board
        .iter()
        .map(|(option, rows)| (option.name.as_str(), rows.len()))
        .collect();
    assert_eq!(
        columns,
        vec![("To Do", 1), ("In Progress", 1), ("Done", 1)]
    );

    let high = tasks.rows_matching(&[RowFilter::new("priority", FilterOp::Equals, "high")]);
    assert_eq!(high.len(), 1);
    assert_eq!(
        high[0].cell("name"),
        Some(&PropertyValue::Text("Research Competitors".to_string()))
    );

    let by_due = tasks.sorted_rows("due-date", SortDirection::Ascending);
    assert_eq!(by_due[0].cell("name").unwrap().as_text(), "UI Design");

    assert_eq!(fx.ws.search_database_rows("roadmap").len(), 1);
}

#[test]
fn test_display_fallbacks_follow_config() {
    let mut fx = TreeFixture::new().page("", None);
    let page = fx.get("").clone();
    assert_eq!(fx.ws.display_title(&page), "Untitled");
    assert_eq!(fx.ws.display_icon(&page), "📄");

    let copy = fx.ws.duplicate_page(page.id).unwrap().unwrap();
    assert_eq!(copy.title, " (copy)");
}
