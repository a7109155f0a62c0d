//! Output formats.
//!
//! An [`OutputFormat`] decides where each page lands under the notebook
//! export root, which structural node files exist, how a finished page is
//! wrapped and how resolved cross-page links are written:
//!
//! - [`MarkdownFormat`] (`md`): a directory tree mirroring the section
//!   hierarchy, one `.md` file per page.
//! - [`JoplinFormat`] (`joplin-raw-dir`): a flat directory of `<nodeId>.md`
//!   files with Joplin metadata footers.

mod joplin;
mod markdown;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{ExportFormatKind, ExportSettings};
use crate::model::{Notebook, Page, Section};
use crate::source::RenderError;

pub use joplin::JoplinFormat;
pub use markdown::MarkdownFormat;

/// What the format knows when it assigns a page path.
pub struct PathContext<'a> {
    /// Every section of the run by id, synthetic sections included
    pub sections: &'a HashMap<String, Section>,
    /// Paths assigned so far in this run, by page id
    pub assigned: &'a HashMap<String, PathBuf>,
}

/// A structural file written ahead of page content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFile {
    /// Path relative to the notebook export root
    pub path: PathBuf,
    pub content: String,
}

/// Target layout and markup of an export.
pub trait OutputFormat {
    /// Which format this is.
    fn kind(&self) -> ExportFormatKind;

    /// Format code recorded in the manifest.
    fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Whether section groups are part of the output (and thus requested from the provider).
    fn includes_section_groups(&self) -> bool;

    /// Whether pages with children are promoted into synthetic sections.
    fn restructures_hierarchy(&self) -> bool {
        false
    }

    /// Relative output path of a page. Collisions are resolved by the caller.
    fn page_path(&self, page: &Page, ctx: &PathContext<'_>) -> PathBuf;

    /// Relative path of a section's structural file, if the format has one.
    fn section_node_path(&self, _section_id: &str) -> Option<PathBuf> {
        None
    }

    /// Structural file for the notebook itself.
    fn notebook_node(&self, _notebook: &Notebook) -> Option<NodeFile> {
        None
    }

    /// Structural file for a section or section group.
    fn section_node(&self, _notebook: &Notebook, _section: &Section) -> Option<NodeFile> {
        None
    }

    /// Wrap a rendered page body into the final file content.
    ///
    /// # Errors
    ///
    /// Returns an error if a header or footer cannot be produced.
    fn finalize_page(&self, page: &Page, body: &str) -> Result<String, RenderError>;

    /// Render a resolved cross-page link.
    ///
    /// `target` is the linked page's output path and `from` the linking
    /// page's output path, both relative to the export root.
    fn render_link(&self, text: &str, target: &Path, node_id: &str, from: &Path) -> String;
}

/// Build the output format selected by `settings`.
#[must_use]
pub fn for_settings(settings: &ExportSettings) -> Box<dyn OutputFormat> {
    match settings.format {
        ExportFormatKind::Markdown => Box::new(MarkdownFormat::new(settings.clone())),
        ExportFormatKind::JoplinRawDir => Box::new(JoplinFormat::new(settings.clone())),
    }
}

/// Id of the synthetic section created for a page with children.
#[must_use]
pub fn synthetic_section_id(page_id: &str) -> String {
    format!("{page_id}/section")
}

/// Move every page with children, together with its direct children, into a
/// dedicated section named after the page.
///
/// Pages are visited in order, so a sub-page that has children of its own
/// gets a section nested in its parent's synthetic section. Only
/// `container_id` changes: `section_id` keeps pointing at the owning source
/// section, which is what the manifest and error tracking use.
pub fn restructure_page_hierarchy(
    pages: &mut [Page],
    sections: &HashMap<String, Section>,
) -> Vec<Section> {
    let mut created: Vec<Section> = Vec::new();

    for i in 0..pages.len() {
        if !pages[i].has_children() {
            continue;
        }

        let page = &pages[i];
        let container = page.container_id.clone();
        let mut path = sections
            .get(&container)
            .or_else(|| created.iter().find(|s| s.id == container))
            .map(|s| s.path.clone())
            .unwrap_or_default();
        path.push(page.title.clone());

        let section = Section {
            id: synthetic_section_id(&page.id),
            title: page.title.clone(),
            created: page.created,
            last_modified: page.last_modified,
            is_group: false,
            parent_id: Some(container),
            path,
            synthetic: true,
        };

        let mut moved: Vec<String> = page.child_pages.clone();
        moved.push(page.id.clone());
        for other in pages.iter_mut() {
            if moved.contains(&other.id) {
                other.container_id.clone_from(&section.id);
            }
        }

        tracing::debug!(page = %section.title, "Moved page hierarchy into its own section");
        created.push(section);
    }

    created
}

/// Path of `target` relative to the directory containing `from`.
pub(crate) fn relative_to(target: &Path, from: &Path) -> PathBuf {
    let from_dir: Vec<_> = from.parent().map(|p| p.components().collect()).unwrap_or_default();
    let target: Vec<_> = target.components().collect();

    let common = from_dir
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..from_dir.len() {
        out.push("..");
    }
    for component in &target[common..] {
        out.push(component);
    }
    out
}
