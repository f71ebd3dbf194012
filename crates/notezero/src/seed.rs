//! Starter content for a brand-new workspace.
//!
//! Seeding goes through the regular [`Workspace`] operations, so the starter
//! pages are queued for persistence like anything a user would create.

use crate::api::Workspace;
use crate::database::{Property, PropertyKind, PropertyValue, SelectOption};
use crate::error::Result;
use crate::gateway::PersistenceGateway;
use crate::model::{BlockPatch, BlockType, Color, NewBlock, PageId, PagePatch};
use chrono::NaiveDate;
use tracing::info;

struct StarterPage {
    title: &'static str,
    icon: &'static str,
    favorite: bool,
    blocks: &'static [(BlockType, &'static str, bool)],
}

const STARTER_PAGES: &[StarterPage] = &[
    StarterPage {
        title: "Home",
        icon: "🏠",
        favorite: true,
        blocks: &[
            (BlockType::Heading1, "Welcome to NoteZero", false),
            (
                BlockType::Text,
                "Start creating pages and organizing your workspace.",
                false,
            ),
        ],
    },
    StarterPage {
        title: "Getting Started",
        icon: "🚀",
        favorite: false,
        blocks: &[
            (BlockType::Heading1, "Getting Started", false),
            (
                BlockType::Text,
                "This is your first page. Click anywhere to start typing.",
                false,
            ),
            (BlockType::Todo, "Create your first page", false),
            (BlockType::Todo, "Add some blocks", false),
            (BlockType::Todo, "Explore the sidebar", true),
        ],
    },
    StarterPage {
        title: "Q4 Project Plan",
        icon: "📋",
        favorite: true,
        blocks: &[
            (BlockType::Heading1, "Q4 Project Plan", false),
            (
                BlockType::Text,
                "Key milestones and strategy for the upcoming quarter.",
                false,
            ),
            (BlockType::Heading2, "Goals", false),
            (BlockType::BulletedList, "Complete user research", false),
            (BlockType::BulletedList, "Launch MVP", false),
            (BlockType::BulletedList, "Gather feedback", false),
        ],
    },
];

impl<G: PersistenceGateway> Workspace<G> {
    /// Fills an empty workspace with the starter pages and a task database.
    /// A workspace that already has pages is left alone.
    pub fn seed(&mut self) -> Result<Vec<PageId>> {
        if !self.tree().is_empty() {
            return Ok(Vec::new());
        }

        let mut created = Vec::with_capacity(STARTER_PAGES.len());
        for starter in STARTER_PAGES {
            let page = self.create_page(starter.title, None)?;
            self.update_page(page.id, &PagePatch::icon(starter.icon))?;
            if starter.favorite {
                self.toggle_favorite(page.id)?;
            }

            // The fresh page's empty block becomes the first starter block.
            let mut anchor = page.blocks.ids().first().copied();
            for (idx, (block_type, content, checked)) in starter.blocks.iter().enumerate() {
                let new_block = NewBlock::new(*block_type, *content).with_checked(*checked);
                match (idx, anchor) {
                    (0, Some(first)) => {
                        let patch = BlockPatch {
                            block_type: Some(new_block.block_type),
                            content: Some(new_block.content),
                            checked: new_block.checked,
                            color: None,
                        };
                        self.update_block(page.id, first, &patch)?;
                    }
                    _ => {
                        anchor = self
                            .insert_block(page.id, anchor, new_block)?
                            .map(|b| b.id);
                    }
                }
            }
            created.push(page.id);
        }

        self.seed_tasks_database()?;
        info!(pages = created.len(), "Workspace seeded");
        Ok(created)
    }

    fn seed_tasks_database(&mut self) -> Result<()> {
        let db = self.create_database("Tasks");
        db.icon = Some("✅".to_string());
        db.add_property(Property::new("name", "Name", PropertyKind::Text))?;
        db.add_property(
            Property::new("status", "Status", PropertyKind::Select).with_options(vec![
                SelectOption::new("todo", "To Do", Color::Gray),
                SelectOption::new("in-progress", "In Progress", Color::Blue),
                SelectOption::new("done", "Done", Color::Green),
            ]),
        )?;
        db.add_property(
            Property::new("priority", "Priority", PropertyKind::Select).with_options(vec![
                SelectOption::new("low", "Low", Color::Blue),
                SelectOption::new("medium", "Medium", Color::Yellow),
                SelectOption::new("high", "High", Color::Red),
            ]),
        )?;
        db.add_property(Property::new("due-date", "Due Date", PropertyKind::Date))?;

        let rows = [
            ("Research Competitors", "in-progress", "high", (2024, 10, 15)),
            ("Draft Roadmap", "todo", "medium", (2024, 11, 1)),
            ("UI Design", "done", "low", (2024, 9, 30)),
        ];
        for (name, status, priority, (y, m, d)) in rows {
            let mut cells = vec![
                ("name".to_string(), PropertyValue::Text(name.to_string())),
                ("status".to_string(), PropertyValue::Select(status.to_string())),
                ("priority".to_string(), PropertyValue::Select(priority.to_string())),
            ];
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                cells.push(("due-date".to_string(), PropertyValue::Date(date)));
            }
            db.add_row(cells)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::api::Workspace;
    use crate::config::NoteConfig;
    use crate::gateway::MemGateway;
    use crate::model::{BlockType, WorkspaceId};

    #[test]
    fn seeds_starter_pages_once() {
        let mut ws = Workspace::new(MemGateway::new(), WorkspaceId::new(), NoteConfig::default());
        let created = ws.seed().unwrap();
        assert_eq!(created.len(), 3);
        assert_eq!(ws.root_pages().len(), 3);
        assert_eq!(ws.favorite_pages().len(), 2);

        let getting_started = ws.get_page(created[1]).unwrap();
        let types: Vec<_> = getting_started.blocks.iter().map(|b| b.block_type).collect();
        assert_eq!(types[0], BlockType::Heading1);
        assert_eq!(types.iter().filter(|t| **t == BlockType::Todo).count(), 3);
        assert!(getting_started.blocks.as_slice()[4].checked);
        assert_eq!(getting_started.icon.as_deref(), Some("🚀"));

        assert_eq!(ws.databases().len(), 1);
        assert_eq!(ws.databases()[0].rows.len(), 3);

        assert!(ws.seed().unwrap().is_empty());
    }

    #[test]
    fn seeded_pages_persist() {
        let mut ws = Workspace::new(MemGateway::new(), WorkspaceId::new(), NoteConfig::default());
        let created = ws.seed().unwrap();
        ws.flush().unwrap();
        ws.reload().unwrap();
        assert_eq!(ws.root_pages().len(), 3);
        let home = ws.get_page(created[0]).unwrap();
        assert_eq!(home.blocks.len(), 2);
        assert_eq!(home.blocks.as_slice()[0].content, "Welcome to NoteZero");
        assert!(home.is_favorite);
    }
}
