//! Manifest store: load, migrate, save and build manifests.
//!
//! Load failures are never fatal: a missing or unreadable manifest simply
//! means there is no prior state and the run starts from scratch. Save
//! failures are always fatal, because every later checkpoint assumes the
//! previous one reached the disk.

use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::model::{Notebook, Page, Section};
use crate::sync::file::atomic_write;
use crate::sync::types::{
    ExportState, LEGACY_MANIFEST_VERSION, MANIFEST_VERSION, Manifest, PageEntry, SectionEntry,
    SyncError, SyncResult,
};

/// Load a manifest, migrating it to the current version.
///
/// Returns `None` when the file does not exist or cannot be parsed.
#[must_use]
pub fn load_manifest(path: &Path) -> Option<Manifest> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No manifest, starting from scratch");
            return None;
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read manifest, ignoring it");
            return None;
        }
    };

    let mut manifest: Manifest = match serde_json::from_str(&json) {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to parse manifest, ignoring it");
            return None;
        }
    };

    migrate_manifest(&mut manifest);

    tracing::debug!(
        path = %path.display(),
        sections = manifest.sections.len(),
        pages = manifest.pages.len(),
        "Loaded manifest"
    );

    Some(manifest)
}

/// Upgrade a manifest in place to [`MANIFEST_VERSION`].
///
/// Version 1.0 recorded no section metadata, so migrating it leaves the
/// section map empty and the next section diff treats every section as new.
/// Returns whether anything changed.
pub fn migrate_manifest(manifest: &mut Manifest) -> bool {
    match manifest.version.as_str() {
        MANIFEST_VERSION => false,
        LEGACY_MANIFEST_VERSION => {
            tracing::info!(
                from = LEGACY_MANIFEST_VERSION,
                to = MANIFEST_VERSION,
                "Migrating manifest"
            );
            manifest.sections = BTreeMap::new();
            manifest.version = MANIFEST_VERSION.to_string();
            true
        }
        other => {
            tracing::warn!(version = other, "Unknown manifest version, loading as-is");
            false
        }
    }
}

/// Keep a prior manifest only if it was written by `format_code`.
///
/// Paths recorded by another output format mean nothing to this one, so a
/// mismatched manifest counts as absent and the run starts from scratch.
#[must_use]
pub fn for_format<'m>(manifest: Option<&'m Manifest>, format_code: &str) -> Option<&'m Manifest> {
    manifest.filter(|m| {
        let matches = m.export_format == format_code;
        if !matches {
            tracing::warn!(
                recorded = %m.export_format,
                current = format_code,
                "Manifest was written by another format, ignoring it"
            );
        }
        matches
    })
}

/// Save a manifest as pretty JSON, replacing the file atomically.
///
/// # Errors
///
/// Returns [`SyncError::ManifestWrite`] if the file cannot be written.
pub fn save_manifest(manifest: &Manifest, path: &Path) -> SyncResult<()> {
    let mut json = serde_json::to_string_pretty(manifest)?;
    json.push('\n');

    atomic_write(path, &json).map_err(|source| SyncError::ManifestWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Create an empty current-version manifest for a notebook.
#[must_use]
pub fn create_manifest(notebook: &Notebook, export_format: &str) -> Manifest {
    Manifest {
        version: MANIFEST_VERSION.to_string(),
        notebook_id: notebook.id.clone(),
        notebook_title: notebook.title.clone(),
        export_format: export_format.to_string(),
        last_export_date: Utc::now(),
        sections: BTreeMap::new(),
        pages: BTreeMap::new(),
    }
}

/// Build a clean manifest entry from a live section.
#[must_use]
pub fn section_entry(section: &Section, max_file_name_length: usize) -> SectionEntry {
    SectionEntry {
        title: section.title.clone(),
        section_id: section.id.clone(),
        last_modification_date: section.last_modified,
        relative_path: section.relative_path(max_file_name_length),
        is_section_group: section.is_group,
        export_state: ExportState::Clean,
    }
}

/// Build a manifest entry for a page exported to `export_path`.
#[must_use]
pub fn page_entry(page: &Page, export_path: &str) -> PageEntry {
    PageEntry {
        title: page.title.clone(),
        page_id: page.id.clone(),
        section_id: Some(page.section_id.clone()),
        last_modification_date: page.last_modified,
        export_path: export_path.to_string(),
    }
}

/// Reconstruct the pages of an unchanged section from the manifest.
///
/// The stubs carry only cached metadata and no content.
#[must_use]
pub fn pages_from_manifest(manifest: &Manifest, section: &Section) -> Vec<Page> {
    manifest
        .pages
        .values()
        .filter(|entry| entry.section_id.as_deref() == Some(section.id.as_str()))
        .enumerate()
        .map(|(order, entry)| {
            Page::stub(
                &entry.page_id,
                &entry.title,
                &section.id,
                entry.last_modification_date,
                order,
            )
        })
        .collect()
}
