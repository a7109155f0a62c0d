//! Page model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A page as seen during one export run.
///
/// Pages are either loaded live from the hierarchy provider or reconstructed
/// as lightweight stubs from the previous manifest when their section did not
/// change. Stubs carry only identity and timestamps: no hierarchy links and no
/// content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Stable source identifier
    pub id: String,

    /// Display title
    pub title: String,

    /// Id of the owning (source) section
    pub section_id: String,

    /// Id of the node the page is attached to in the output.
    ///
    /// Equal to `section_id` unless the page hierarchy was restructured into
    /// synthetic sections.
    pub container_id: String,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Last modification timestamp reported by the source
    pub last_modified: DateTime<Utc>,

    /// Sub-page depth, 1 for top-level pages
    pub level: u32,

    /// Parent page id for sub-pages
    pub parent_page: Option<String>,

    /// Direct sub-page ids, in source order
    pub child_pages: Vec<String>,

    /// Position of the page within its section
    pub order: usize,

    /// Whether this page was reconstructed from the manifest
    pub is_stub: bool,
}

impl Page {
    /// Build a stub page from cached manifest metadata.
    #[must_use]
    pub fn stub(
        id: &str,
        title: &str,
        section_id: &str,
        last_modified: DateTime<Utc>,
        order: usize,
    ) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            section_id: section_id.to_string(),
            container_id: section_id.to_string(),
            created: last_modified,
            last_modified,
            level: 1,
            parent_page: None,
            child_pages: Vec::new(),
            order,
            is_stub: true,
        }
    }

    /// Title indented by sub-page depth, for progress output and flat layouts.
    #[must_use]
    pub fn title_with_level_prefix(&self) -> String {
        let depth = self.level.saturating_sub(1) as usize;
        format!("{}{}", "--".repeat(depth), self.title)
    }

    /// Whether the page has sub-pages.
    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.child_pages.is_empty()
    }
}
