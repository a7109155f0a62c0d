//! Notebook and section models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::naming::sanitize_file_name;

/// A top-level notebook in the source workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    /// Stable source identifier
    pub id: String,

    /// Display title
    pub title: String,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Last modification timestamp reported by the source
    pub last_modified: DateTime<Utc>,
}

/// A section or section group.
///
/// Section groups are structural only: they never hold pages directly and
/// are never classified by the section differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Stable source identifier
    pub id: String,

    /// Display title
    pub title: String,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Last modification timestamp reported by the source
    pub last_modified: DateTime<Utc>,

    /// Whether this node is a section group
    pub is_group: bool,

    /// Id of the enclosing section group, `None` when directly under the notebook
    pub parent_id: Option<String>,

    /// Titles from the outermost section group down to this node (inclusive)
    pub path: Vec<String>,

    /// Whether the node was created by the exporter rather than the source
    /// (pages with children promoted to their own section).
    #[serde(default)]
    pub synthetic: bool,
}

impl Section {
    /// Relative directory of this section under the notebook export root.
    #[must_use]
    pub fn relative_dir(&self, max_len: usize) -> PathBuf {
        self.path
            .iter()
            .map(|segment| sanitize_file_name(segment, max_len))
            .collect()
    }

    /// Relative path as stored in the manifest (forward slashes).
    #[must_use]
    pub fn relative_path(&self, max_len: usize) -> String {
        self.path
            .iter()
            .map(|segment| sanitize_file_name(segment, max_len))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Human-readable location used in progress output.
    #[must_use]
    pub fn display_path(&self) -> String {
        self.path.join(" / ")
    }
}
