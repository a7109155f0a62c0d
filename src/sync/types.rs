//! Manifest and diff types for incremental export.
//!
//! The manifest is the only state kept between runs. It records, per
//! notebook, which sections and pages were exported, their source
//! timestamps and where each page's output lives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::model::{Page, Section};
use crate::source::{ProviderError, RenderError};

/// Manifest version that only tracks pages.
pub const LEGACY_MANIFEST_VERSION: &str = "1.0";

/// Current manifest version (adds section tracking).
pub const MANIFEST_VERSION: &str = "2.0";

/// Persisted snapshot of the last export of one notebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Format version
    #[serde(default = "legacy_version")]
    pub version: String,

    #[serde(default)]
    pub notebook_id: String,

    #[serde(default)]
    pub notebook_title: String,

    /// Output format code (`md`, `joplin-raw-dir`)
    #[serde(default)]
    pub export_format: String,

    #[serde(with = "timestamp", default)]
    pub last_export_date: DateTime<Utc>,

    /// Section entries by section id
    #[serde(default)]
    pub sections: BTreeMap<String, SectionEntry>,

    /// Page entries by page id
    #[serde(default)]
    pub pages: BTreeMap<String, PageEntry>,
}

fn legacy_version() -> String {
    LEGACY_MANIFEST_VERSION.to_string()
}

/// Retry state of a section.
///
/// `ErrorPending` is set when any page of the section fails and forces the
/// next run to reload the section. It is only cleared by writing a fresh
/// entry after a run that classified the section new or modified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportState {
    #[default]
    Clean,
    ErrorPending,
}

impl ExportState {
    #[must_use]
    pub const fn has_errors(self) -> bool {
        matches!(self, Self::ErrorPending)
    }
}

/// Manifest record of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionEntry {
    pub title: String,

    #[serde(alias = "oneNoteId")]
    pub section_id: String,

    #[serde(with = "timestamp")]
    pub last_modification_date: DateTime<Utc>,

    /// Section path under the export root
    #[serde(default, alias = "path")]
    pub relative_path: String,

    #[serde(default)]
    pub is_section_group: bool,

    /// Serialized as the `hasExportErrors` flag
    #[serde(rename = "hasExportErrors", with = "export_state", default)]
    pub export_state: ExportState,
}

/// Manifest record of an exported page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEntry {
    pub title: String,

    #[serde(alias = "oneNoteId")]
    pub page_id: String,

    /// Owning section (absent in version 1.0 manifests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,

    #[serde(with = "timestamp")]
    pub last_modification_date: DateTime<Utc>,

    /// Output path relative to the notebook export root, forward slashes
    pub export_path: String,
}

/// Outcome of comparing one live node against the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Change {
    New,
    Modified,
    Unchanged,
}

/// Live nodes that can be classified by id.
pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for Section {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Page {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Four-way classification of live nodes against a manifest.
///
/// Never persisted. `deleted` holds manifest entries, since the live node
/// no longer exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff<T, E> {
    pub new: Vec<T>,
    pub modified: Vec<T>,
    pub unchanged: Vec<T>,
    pub deleted: Vec<E>,
}

/// Section-level classification.
pub type SectionDiff = Diff<Section, SectionEntry>;

/// Page-level classification.
pub type ExportDiff = Diff<Page, PageEntry>;

impl<T, E> Default for Diff<T, E> {
    fn default() -> Self {
        Self {
            new: Vec::new(),
            modified: Vec::new(),
            unchanged: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl<T: Identified, E> Diff<T, E> {
    /// Nodes that need work: new plus modified.
    #[must_use]
    pub fn to_process(&self) -> usize {
        self.new.len() + self.modified.len()
    }

    /// Live nodes: new plus modified plus unchanged.
    #[must_use]
    pub fn total(&self) -> usize {
        self.to_process() + self.unchanged.len()
    }

    pub(crate) fn push(&mut self, change: Change, item: T) {
        match change {
            Change::New => self.new.push(item),
            Change::Modified => self.modified.push(item),
            Change::Unchanged => self.unchanged.push(item),
        }
    }

    /// Classification of every live node by id.
    #[must_use]
    pub fn changes(&self) -> HashMap<String, Change> {
        let tagged = [
            (Change::New, &self.new),
            (Change::Modified, &self.modified),
            (Change::Unchanged, &self.unchanged),
        ];

        tagged
            .into_iter()
            .flat_map(|(change, items)| items.iter().map(move |i| (i.id().to_string(), change)))
            .collect()
    }
}

/// Progress tag printed for every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    New,
    Update,
    Skip,
    Delete,
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "[NEW]"),
            Self::Update => write!(f, "[UPDATE]"),
            Self::Skip => write!(f, "[SKIP]"),
            Self::Delete => write!(f, "[DELETE]"),
        }
    }
}

/// Aggregate result of exporting one notebook.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookExportResult {
    pub pages_on_error: usize,
    pub pages_new: usize,
    pub pages_updated: usize,
    pub pages_skipped: usize,
    pub pages_deleted: usize,
    pub sections_loaded: usize,
    pub sections_skipped: usize,
    pub sections_deleted: usize,
}

impl NotebookExportResult {
    /// Pages written in this run.
    #[must_use]
    pub fn pages_written(&self) -> usize {
        self.pages_new + self.pages_updated
    }

    /// Fold another notebook's result into this one.
    pub fn absorb(&mut self, other: &Self) {
        self.pages_on_error += other.pages_on_error;
        self.pages_new += other.pages_new;
        self.pages_updated += other.pages_updated;
        self.pages_skipped += other.pages_skipped;
        self.pages_deleted += other.pages_deleted;
        self.sections_loaded += other.sections_loaded;
        self.sections_skipped += other.sections_skipped;
        self.sections_deleted += other.sections_deleted;
    }
}

/// Errors that abort a notebook export.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Failed to write manifest {}: {source}", path.display())]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Notebook not found: {0}")]
    NotebookNotFound(String),
}

/// Result type for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Errors that fail a single page. Counted, never fatal.
#[derive(Debug, thiserror::Error)]
pub enum PageExportError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// RFC 3339 timestamps, also accepting zone-less values as UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|date| date.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }
}

mod export_state {
    use super::ExportState;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(state: &ExportState, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(state.has_errors())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ExportState, D::Error> {
        Ok(if bool::deserialize(d)? {
            ExportState::ErrorPending
        } else {
            ExportState::Clean
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_page_status_display() {
        assert_eq!(PageStatus::New.to_string(), "[NEW]");
        assert_eq!(PageStatus::Update.to_string(), "[UPDATE]");
        assert_eq!(PageStatus::Skip.to_string(), "[SKIP]");
        assert_eq!(PageStatus::Delete.to_string(), "[DELETE]");
    }

    #[test]
    fn test_timestamp_parsing() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 20, 10, 0, 0).unwrap();
        assert_eq!(timestamp::parse("2025-01-20T10:00:00Z"), Some(expected));
        assert_eq!(timestamp::parse("2025-01-20T11:00:00+01:00"), Some(expected));
        assert_eq!(timestamp::parse("2025-01-20T10:00:00"), Some(expected));
        assert_eq!(
            timestamp::parse("2025-01-20T10:00:00.5000000"),
            Some(expected + chrono::Duration::milliseconds(500))
        );
        assert_eq!(timestamp::parse("yesterday"), None);
    }

    #[test]
    fn test_section_entry_field_names() {
        let entry = SectionEntry {
            title: "Meetings".to_string(),
            section_id: "s1".to_string(),
            last_modification_date: Utc.with_ymd_and_hms(2025, 1, 20, 10, 0, 0).unwrap(),
            relative_path: "Meetings".to_string(),
            is_section_group: false,
            export_state: ExportState::ErrorPending,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["sectionId"], "s1");
        assert_eq!(json["lastModificationDate"], "2025-01-20T10:00:00Z");
        assert_eq!(json["relativePath"], "Meetings");
        assert_eq!(json["hasExportErrors"], true);
    }

    #[test]
    fn test_legacy_field_aliases() {
        let json = r#"{
            "title": "Kickoff",
            "oneNoteId": "p1",
            "lastModificationDate": "2025-01-20T10:00:00",
            "exportPath": "Meetings/Kickoff.md"
        }"#;
        let entry: PageEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.page_id, "p1");
        assert!(entry.section_id.is_none());

        let json = r#"{
            "title": "Meetings",
            "oneNoteId": "s1",
            "lastModificationDate": "2025-01-20T10:00:00Z",
            "path": "Work/Meetings"
        }"#;
        let entry: SectionEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.section_id, "s1");
        assert_eq!(entry.relative_path, "Work/Meetings");
        assert_eq!(entry.export_state, ExportState::Clean);
    }

    #[test]
    fn test_result_absorb() {
        let mut total = NotebookExportResult::default();
        let one = NotebookExportResult {
            pages_new: 2,
            pages_on_error: 1,
            ..NotebookExportResult::default()
        };
        total.absorb(&one);
        total.absorb(&one);
        assert_eq!(total.pages_new, 4);
        assert_eq!(total.pages_on_error, 2);
        assert_eq!(total.pages_written(), 4);
    }
}
