//! Joplin raw directory output.
//!
//! Every node (notebook, section group, section, page) is a `<nodeId>.md`
//! file at the export root. The file holds the title, a blank line, the body
//! and a `key: value` metadata footer that Joplin's "RAW - Joplin Export
//! Directory" importer reads back.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use super::{NodeFile, OutputFormat, PathContext};
use crate::config::{ExportFormatKind, ExportSettings, PageHierarchy};
use crate::model::{Notebook, Page, Section};
use crate::source::RenderError;
use crate::sync::node_id;

const NODE_TYPE_NOTE: &str = "1";
const NODE_TYPE_FOLDER: &str = "2";

/// Flat directory of Joplin node files.
#[derive(Debug, Clone)]
pub struct JoplinFormat {
    settings: ExportSettings,
}

impl JoplinFormat {
    #[must_use]
    pub fn new(settings: ExportSettings) -> Self {
        Self { settings }
    }

    fn node_file(id: &str) -> PathBuf {
        PathBuf::from(format!("{}.md", node_id(id)))
    }
}

fn joplin_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Assemble a node file: title, body, then the metadata footer.
fn node_document(title: &str, body: &str, metadata: &[(&str, String)]) -> String {
    let mut out = format!("{title}\n\n{}\n", body.trim_end_matches('\n'));
    for (key, value) in metadata {
        out.push('\n');
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
    }
    out
}

/// Footer fields shared by every node type.
fn common_metadata(
    id: &str,
    parent_id: &str,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
) -> Vec<(&'static str, String)> {
    vec![
        ("id", id.to_string()),
        ("parent_id", parent_id.to_string()),
        ("is_shared", "0".to_string()),
        ("encryption_applied", "0".to_string()),
        ("encryption_cipher_text", String::new()),
        ("updated_time", joplin_date(updated)),
        ("user_updated_time", joplin_date(updated)),
        ("created_time", joplin_date(created)),
        ("user_created_time", joplin_date(created)),
    ]
}

/// Sort key Joplin uses to order notes inside a folder (higher first).
fn note_order(order: usize) -> i64 {
    let order = i64::try_from(order).unwrap_or(i64::MAX / 100_000);
    100_000_000 - order.saturating_mul(100_000)
}

impl OutputFormat for JoplinFormat {
    fn kind(&self) -> ExportFormatKind {
        ExportFormatKind::JoplinRawDir
    }

    fn includes_section_groups(&self) -> bool {
        true
    }

    fn restructures_hierarchy(&self) -> bool {
        self.settings.page_hierarchy == PageHierarchy::FolderTree
    }

    fn page_path(&self, page: &Page, _ctx: &PathContext<'_>) -> PathBuf {
        Self::node_file(&page.id)
    }

    fn section_node_path(&self, section_id: &str) -> Option<PathBuf> {
        Some(Self::node_file(section_id))
    }

    fn notebook_node(&self, notebook: &Notebook) -> Option<NodeFile> {
        let mut metadata = common_metadata(
            &node_id(&notebook.id),
            "",
            notebook.created,
            notebook.last_modified,
        );
        metadata.push(("type_", NODE_TYPE_FOLDER.to_string()));

        Some(NodeFile {
            path: Self::node_file(&notebook.id),
            content: node_document(&notebook.title, "", &metadata),
        })
    }

    fn section_node(&self, notebook: &Notebook, section: &Section) -> Option<NodeFile> {
        let parent = section.parent_id.as_deref().unwrap_or(&notebook.id);
        let mut metadata = common_metadata(
            &node_id(&section.id),
            &node_id(parent),
            section.created,
            section.last_modified,
        );
        metadata.push(("type_", NODE_TYPE_FOLDER.to_string()));

        Some(NodeFile {
            path: Self::node_file(&section.id),
            content: node_document(&section.title, "", &metadata),
        })
    }

    fn finalize_page(&self, page: &Page, body: &str) -> Result<String, RenderError> {
        let title = if self.settings.page_hierarchy == PageHierarchy::TitlePrefix {
            page.title_with_level_prefix()
        } else {
            page.title.clone()
        };

        let mut metadata = common_metadata(
            &node_id(&page.id),
            &node_id(&page.container_id),
            page.created,
            page.last_modified,
        );
        metadata.extend([
            ("is_conflict", "0".to_string()),
            ("latitude", "0.00000000".to_string()),
            ("longitude", "0.00000000".to_string()),
            ("altitude", "0.0000".to_string()),
            ("author", String::new()),
            ("source_url", String::new()),
            ("is_todo", "0".to_string()),
            ("todo_due", "0".to_string()),
            ("todo_completed", "0".to_string()),
            ("source", "nbexport".to_string()),
            ("source_application", env!("CARGO_PKG_NAME").to_string()),
            ("application_data", String::new()),
            ("order", note_order(page.order).to_string()),
            ("markup_language", "1".to_string()),
            ("type_", NODE_TYPE_NOTE.to_string()),
        ]);

        Ok(node_document(&title, body, &metadata))
    }

    fn render_link(&self, text: &str, _target: &Path, node_id: &str, _from: &Path) -> String {
        format!("[{text}](:/{node_id})")
    }
}
