//! Configuration management.
//!
//! This module resolves the settings file location and loads export settings.
//!
//! # Resolution
//!
//! Settings are read from the first location that applies:
//! 1. An explicit `--config` path
//! 2. The `NBEXPORT_CONFIG` environment variable
//! 3. The global location: `~/.nbexport/config.json`
//!
//! A missing file yields defaults. Command-line flags are applied on top of
//! whatever was loaded.

use crate::error::{Error, Result};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default manifest file name, written inside each notebook's export root.
pub const DEFAULT_MANIFEST_FILE_NAME: &str = ".nbexport-manifest.json";

/// Target output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ExportFormatKind {
    /// Markdown file tree
    #[default]
    #[serde(rename = "md")]
    #[value(name = "md")]
    Markdown,
    /// Joplin raw directory (importable with "RAW - Joplin Export Directory")
    #[serde(rename = "joplin-raw-dir")]
    #[value(name = "joplin-raw-dir")]
    JoplinRawDir,
}

impl ExportFormatKind {
    /// Format code recorded in the manifest.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::JoplinRawDir => "joplin-raw-dir",
        }
    }
}

impl std::fmt::Display for ExportFormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// How sub-pages are laid out in the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum PageHierarchy {
    /// All pages of a section side by side
    Ignore,
    /// Sub-pages nested in a directory named after their parent page
    #[default]
    FolderTree,
    /// Sub-pages prefixed with their parent page's file name
    TitlePrefix,
}

/// What to do with cross-page references found in rendered content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum LinkHandling {
    /// Leave the reference markup untouched
    Keep,
    /// Replace the reference with its display text
    Remove,
    /// Resolve to a relative Markdown link
    #[default]
    Markdown,
    /// Resolve to a `[[wikilink]]`
    Wikilink,
}

impl LinkHandling {
    /// Whether references should be looked up in the link registry.
    #[must_use]
    pub const fn resolves(self) -> bool {
        matches!(self, Self::Markdown | Self::Wikilink)
    }
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    /// Output format
    pub format: ExportFormatKind,

    /// Reuse the manifest to skip unchanged content
    pub incremental: bool,

    /// Delete output of pages that disappeared from the source
    pub cleanup_deleted_pages: bool,

    /// Remove directories left empty by the cleanup
    pub prune_empty_directories: bool,

    /// Sub-page layout
    pub page_hierarchy: PageHierarchy,

    /// Separator used by [`PageHierarchy::TitlePrefix`]
    pub page_title_prefix_separator: String,

    /// Cross-page reference policy
    pub link_handling: LinkHandling,

    /// Prepend a YAML front matter header to Markdown pages
    pub front_matter: bool,

    /// `chrono` format string for front matter dates
    pub front_matter_date_format: String,

    /// Maximum length of a generated file or directory name
    pub max_file_name_length: usize,

    /// Manifest file name inside each notebook export root
    pub manifest_file_name: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormatKind::default(),
            incremental: true,
            cleanup_deleted_pages: true,
            prune_empty_directories: true,
            page_hierarchy: PageHierarchy::default(),
            page_title_prefix_separator: "_".to_string(),
            link_handling: LinkHandling::default(),
            front_matter: true,
            front_matter_date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            max_file_name_length: 50,
            manifest_file_name: DEFAULT_MANIFEST_FILE_NAME.to_string(),
        }
    }
}

/// Get the global nbexport directory location (`~/.nbexport/`).
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".nbexport"))
}

/// Resolve the settings file path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `NBEXPORT_CONFIG` environment variable
/// 3. Global location: `~/.nbexport/config.json`
#[must_use]
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var("NBEXPORT_CONFIG") {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    global_config_dir().map(|dir| dir.join("config.json"))
}

/// Load export settings from `path`.
///
/// A missing file yields the defaults.
///
/// # Errors
///
/// Returns a configuration error if the file exists but cannot be read or parsed.
pub fn load_settings(path: &Path) -> Result<ExportSettings> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(ExportSettings::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {}: {e}", path.display())))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file {}: {e}", path.display())))
}

/// Resolve and load settings in one step.
///
/// # Errors
///
/// See [`load_settings`].
pub fn resolve_settings(explicit_path: Option<&Path>) -> Result<ExportSettings> {
    match resolve_config_path(explicit_path) {
        Some(path) => load_settings(&path),
        None => Ok(ExportSettings::default()),
    }
}

/// Save export settings to `path`, creating parent directories.
///
/// # Errors
///
/// Returns a configuration error if the file cannot be written.
pub fn save_settings(settings: &ExportSettings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    fs::write(path, content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_config_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/config.json");
        let result = resolve_config_path(Some(&explicit));
        assert_eq!(result, Some(explicit));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = load_settings(&temp_dir.path().join("config.json")).unwrap();
        assert_eq!(settings, ExportSettings::default());
        assert!(settings.incremental);
        assert!(settings.cleanup_deleted_pages);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"format":"joplin-raw-dir","linkHandling":"wikilink"}"#).unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.format, ExportFormatKind::JoplinRawDir);
        assert_eq!(settings.link_handling, LinkHandling::Wikilink);
        assert_eq!(settings.max_file_name_length, 50);
        assert_eq!(settings.page_hierarchy, PageHierarchy::FolderTree);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let result = load_settings(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");
        let settings = ExportSettings {
            page_hierarchy: PageHierarchy::TitlePrefix,
            front_matter: false,
            ..ExportSettings::default()
        };

        save_settings(&settings, &path).unwrap();
        assert_eq!(load_settings(&path).unwrap(), settings);
    }

    #[test]
    fn test_format_codes() {
        assert_eq!(ExportFormatKind::Markdown.code(), "md");
        assert_eq!(ExportFormatKind::JoplinRawDir.to_string(), "joplin-raw-dir");
        assert!(LinkHandling::Markdown.resolves());
        assert!(!LinkHandling::Remove.resolves());
    }
}
