use crate::api::Workspace;
use crate::config::NoteConfig;
use crate::gateway::MemGateway;
use crate::model::{Page, PageId, WorkspaceId};
use std::collections::HashMap;

/// A workspace over a [`MemGateway`] with pages addressable by name.
///
/// ```ignore
/// let mut fx = TreeFixture::new().page("A", None).page("B", Some("A"));
/// fx.ws.move_page(fx.id("A"), Some(fx.id("B")));
/// ```
pub struct TreeFixture {
    pub ws: Workspace<MemGateway>,
    names: HashMap<String, PageId>,
}

impl Default for TreeFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeFixture {
    pub fn new() -> Self {
        Self::with_config(NoteConfig::default())
    }

    pub fn lenient() -> Self {
        Self::with_config(NoteConfig {
            strict: false,
            ..Default::default()
        })
    }

    pub fn with_config(config: NoteConfig) -> Self {
        Self {
            ws: Workspace::new(MemGateway::new(), WorkspaceId::new(), config),
            names: HashMap::new(),
        }
    }

    /// Creates a page titled `name` under the page named `parent`.
    pub fn page(mut self, name: &str, parent: Option<&str>) -> Self {
        let parent_id = parent.map(|p| self.id(p));
        let page = self
            .ws
            .create_page(name, parent_id)
            .expect("fixture page creation failed");
        self.names.insert(name.to_string(), page.id);
        self
    }

    pub fn id(&self, name: &str) -> PageId {
        *self
            .names
            .get(name)
            .unwrap_or_else(|| panic!("no fixture page named {name}"))
    }

    pub fn get(&self, name: &str) -> &Page {
        self.ws
            .get_page(self.id(name))
            .unwrap_or_else(|| panic!("fixture page {name} is gone"))
    }

    pub fn gateway(&self) -> &MemGateway {
        self.ws.gateway()
    }
}

/// Titles of `pages`, for compact assertions.
pub fn titles(pages: &[&Page]) -> Vec<String> {
    pages.iter().map(|p| p.title.clone()).collect()
}
