//! Collaborators consumed by the export engine.
//!
//! - [`HierarchyProvider`] enumerates notebooks, sections and pages and hands
//!   out raw page content and stable cross-reference keys.
//! - [`PageRenderer`] turns one page's raw content into target markup.
//!
//! The engine never interprets raw content itself. [`JsonWorkspaceSource`]
//! and [`MarkdownRenderer`] are the implementations used by the CLI.

mod json;
mod render;

use std::path::PathBuf;

use crate::model::{Notebook, Page, Section};

pub use json::{
    JsonWorkspaceSource, NotebookDocument, PageDocument, SectionDocument, WorkspaceDocument,
};
pub use render::MarkdownRenderer;

/// Errors raised by a hierarchy provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The source document could not be read.
    #[error("Failed to read source {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source document is not a valid workspace.
    #[error("Invalid source document {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A notebook id was requested that the source does not know.
    #[error("Unknown notebook: {0}")]
    UnknownNotebook(String),

    /// A section id was requested that the source does not know.
    #[error("Unknown section: {0}")]
    UnknownSection(String),

    /// The page exists but its content cannot be retrieved.
    #[error("No content available for page '{title}' ({id})")]
    MissingContent { id: String, title: String },
}

/// Errors raised while rendering a page.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to render page '{title}': {message}")]
    Failed { title: String, message: String },
}

/// Source of the live notebook hierarchy.
///
/// Implementations must return the same stable id for the same underlying
/// object on every call and across runs.
pub trait HierarchyProvider {
    /// List the notebooks available in the source.
    fn list_notebooks(&self) -> Result<Vec<Notebook>, ProviderError>;

    /// List the sections of a notebook in hierarchy order.
    ///
    /// Section groups are included only when `include_groups` is true.
    fn list_sections(
        &self,
        notebook: &Notebook,
        include_groups: bool,
    ) -> Result<Vec<Section>, ProviderError>;

    /// List the pages of a section in source order, with hierarchy links.
    fn list_pages(&self, section: &Section) -> Result<Vec<Page>, ProviderError>;

    /// Raw content of a page.
    fn page_content(&self, page: &Page) -> Result<String, ProviderError>;

    /// Stable cross-reference key of a page, as embedded in links pointing to it.
    fn link_key(&self, page_id: &str) -> Option<String>;
}

/// Converts raw page content into target markup.
pub trait PageRenderer {
    /// Render one page.
    ///
    /// # Errors
    ///
    /// A failure is counted against the run and the page is retried next run.
    fn render(&mut self, page: &Page, raw: &str) -> Result<String, RenderError>;
}
