//! Command implementations.

pub mod completions;
pub mod export;
pub mod init;
pub mod status;
pub mod version;

use std::path::Path;

use crate::error::{Error, Result};
use crate::model::Notebook;
use crate::source::{HierarchyProvider, JsonWorkspaceSource};

/// Open the workspace document at `path`.
fn open_source(path: &Path) -> Result<JsonWorkspaceSource> {
    if !path.exists() {
        return Err(Error::SourceNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(JsonWorkspaceSource::open(path)?)
}

/// Notebooks to operate on: all of them, or the one matching `wanted` by
/// title or id.
fn select_notebooks(
    provider: &dyn HierarchyProvider,
    wanted: Option<&str>,
) -> Result<Vec<Notebook>> {
    let notebooks = provider.list_notebooks()?;

    let Some(wanted) = wanted else {
        return Ok(notebooks);
    };

    if wanted.trim().is_empty() {
        return Err(Error::InvalidArgument("--notebook is empty".to_string()));
    }

    let selected: Vec<Notebook> = notebooks
        .iter()
        .filter(|nb| nb.title == wanted || nb.id == wanted)
        .cloned()
        .collect();

    if selected.is_empty() {
        return Err(Error::NotebookNotFound {
            name: wanted.to_string(),
            available: notebooks.into_iter().map(|nb| nb.title).collect(),
        });
    }

    Ok(selected)
}
