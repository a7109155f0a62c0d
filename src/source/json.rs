//! File-backed hierarchy provider.
//!
//! Reads a workspace JSON document describing notebooks, nested section
//! groups, sections and pages:
//!
//! ```json
//! {"notebooks":[{"id":"nb1","title":"Work","lastModifiedAt":"2025-01-20T10:00:00Z",
//!   "sections":[{"id":"s1","title":"Meetings","lastModifiedAt":"2025-01-20T10:00:00Z",
//!     "pages":[{"id":"p1","title":"Kickoff","lastModifiedAt":"2025-01-20T10:00:00Z",
//!       "level":1,"linkKey":"{A1B2}","content":"# Kickoff"}]}]}]}
//! ```
//!
//! The document is indexed once at load time; every query afterwards is a
//! lookup. Sub-page relations are derived from `level`: a page's parent is
//! the nearest preceding page of the same section with a smaller level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{HierarchyProvider, ProviderError};
use crate::model::{Notebook, Page, Section};

/// Top-level workspace document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    #[serde(default)]
    pub notebooks: Vec<NotebookDocument>,
}

/// A notebook in the workspace document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookDocument {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub last_modified_at: DateTime<Utc>,
    #[serde(default)]
    pub sections: Vec<SectionDocument>,
}

/// A section or section group in the workspace document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDocument {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub last_modified_at: DateTime<Utc>,
    #[serde(default)]
    pub is_section_group: bool,
    /// Children of a section group
    #[serde(default)]
    pub sections: Vec<SectionDocument>,
    #[serde(default)]
    pub pages: Vec<PageDocument>,
}

/// A page in the workspace document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDocument {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub last_modified_at: DateTime<Utc>,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub link_key: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

fn default_level() -> u32 {
    1
}

/// Hierarchy provider backed by a [`WorkspaceDocument`].
#[derive(Debug, Default)]
pub struct JsonWorkspaceSource {
    notebooks: Vec<Notebook>,
    sections: HashMap<String, Vec<Section>>,
    pages: HashMap<String, Vec<Page>>,
    content: HashMap<String, Option<String>>,
    link_keys: HashMap<String, String>,
}

impl JsonWorkspaceSource {
    /// Open and index a workspace document on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid workspace.
    pub fn open(path: &Path) -> Result<Self, ProviderError> {
        let json = fs::read_to_string(path).map_err(|source| ProviderError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let document: WorkspaceDocument =
            serde_json::from_str(&json).map_err(|source| ProviderError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(
            path = %path.display(),
            notebooks = document.notebooks.len(),
            "Loaded workspace document"
        );

        Ok(Self::from_document(document))
    }

    /// Index an in-memory workspace document.
    #[must_use]
    pub fn from_document(document: WorkspaceDocument) -> Self {
        let mut source = Self::default();

        for notebook in document.notebooks {
            let mut sections = Vec::new();
            for section in notebook.sections {
                source.index_section(section, None, &[], &mut sections);
            }

            source.sections.insert(notebook.id.clone(), sections);
            source.notebooks.push(Notebook {
                created: notebook.created_at.unwrap_or(notebook.last_modified_at),
                last_modified: notebook.last_modified_at,
                id: notebook.id,
                title: notebook.title,
            });
        }

        source
    }

    /// Flatten a section subtree depth-first, groups before their children.
    fn index_section(
        &mut self,
        doc: SectionDocument,
        parent_id: Option<&str>,
        parent_path: &[String],
        out: &mut Vec<Section>,
    ) {
        let mut path = parent_path.to_vec();
        path.push(doc.title.clone());

        out.push(Section {
            id: doc.id.clone(),
            title: doc.title.clone(),
            created: doc.created_at.unwrap_or(doc.last_modified_at),
            last_modified: doc.last_modified_at,
            is_group: doc.is_section_group,
            parent_id: parent_id.map(ToString::to_string),
            path: path.clone(),
            synthetic: false,
        });

        if doc.is_section_group {
            for child in doc.sections {
                self.index_section(child, Some(&doc.id), &path, out);
            }
        } else {
            let pages = self.index_pages(&doc.id, doc.pages);
            self.pages.insert(doc.id, pages);
        }
    }

    fn index_pages(&mut self, section_id: &str, docs: Vec<PageDocument>) -> Vec<Page> {
        let mut pages: Vec<Page> = Vec::with_capacity(docs.len());
        // Indices of the current ancestor chain, innermost last
        let mut ancestors: Vec<usize> = Vec::new();

        for (order, doc) in docs.into_iter().enumerate() {
            let level = doc.level.max(1);
            while ancestors
                .last()
                .is_some_and(|&i| pages[i].level >= level)
            {
                ancestors.pop();
            }

            let parent_page = ancestors.last().map(|&i| pages[i].id.clone());
            if let Some(&i) = ancestors.last() {
                pages[i].child_pages.push(doc.id.clone());
            }

            if let Some(key) = doc.link_key {
                self.link_keys.insert(doc.id.clone(), key);
            }
            self.content.insert(doc.id.clone(), doc.content);

            pages.push(Page {
                id: doc.id,
                title: doc.title,
                section_id: section_id.to_string(),
                container_id: section_id.to_string(),
                created: doc.created_at.unwrap_or(doc.last_modified_at),
                last_modified: doc.last_modified_at,
                level,
                parent_page,
                child_pages: Vec::new(),
                order,
                is_stub: false,
            });
            ancestors.push(pages.len() - 1);
        }

        pages
    }
}

impl HierarchyProvider for JsonWorkspaceSource {
    fn list_notebooks(&self) -> Result<Vec<Notebook>, ProviderError> {
        Ok(self.notebooks.clone())
    }

    fn list_sections(
        &self,
        notebook: &Notebook,
        include_groups: bool,
    ) -> Result<Vec<Section>, ProviderError> {
        let sections = self
            .sections
            .get(&notebook.id)
            .ok_or_else(|| ProviderError::UnknownNotebook(notebook.id.clone()))?;

        Ok(sections
            .iter()
            .filter(|s| include_groups || !s.is_group)
            .cloned()
            .collect())
    }

    fn list_pages(&self, section: &Section) -> Result<Vec<Page>, ProviderError> {
        if section.is_group {
            return Ok(Vec::new());
        }

        self.pages
            .get(&section.id)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownSection(section.id.clone()))
    }

    fn page_content(&self, page: &Page) -> Result<String, ProviderError> {
        self.content
            .get(&page.id)
            .and_then(Clone::clone)
            .ok_or_else(|| ProviderError::MissingContent {
                id: page.id.clone(),
                title: page.title.clone(),
            })
    }

    fn link_key(&self, page_id: &str) -> Option<String> {
        self.link_keys.get(page_id).cloned()
    }
}
