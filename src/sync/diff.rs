//! Section and page differs.
//!
//! Both are pure functions of the prior manifest and the live nodes. The
//! section diff decides which sections must be enumerated again; the page
//! diff decides which pages must be rendered again.

use std::collections::HashSet;

use crate::model::{Page, Section};
use crate::sync::types::{Change, ExportDiff, Manifest, SectionDiff};

/// Classify live sections against the prior manifest.
///
/// Section groups are structural and never classified. For a section known
/// to the manifest, in priority order: a newer timestamp, no recorded page
/// referencing it, or a pending error each make it modified; otherwise it
/// is unchanged. Manifest sections (groups included) matched by no live
/// node are deleted.
#[must_use]
pub fn diff_sections(existing: Option<&Manifest>, sections: &[Section]) -> SectionDiff {
    let mut diff = SectionDiff::default();
    let leaves = sections.iter().filter(|s| !s.is_group);

    let Some(manifest) = existing.filter(|m| !m.sections.is_empty()) else {
        diff.new.extend(leaves.cloned());
        return diff;
    };

    let referenced: HashSet<&str> = manifest
        .pages
        .values()
        .filter_map(|entry| entry.section_id.as_deref())
        .collect();

    let mut remaining: HashSet<&str> = manifest.sections.keys().map(String::as_str).collect();
    for section in sections {
        remaining.remove(section.id.as_str());
    }

    for section in leaves {
        let Some(entry) = manifest.sections.get(&section.id) else {
            tracing::debug!(section = %section.display_path(), "Section is new");
            diff.new.push(section.clone());
            continue;
        };

        let change = if section.last_modified > entry.last_modification_date {
            tracing::debug!(section = %section.display_path(), "Section timestamp is newer");
            Change::Modified
        } else if !referenced.contains(section.id.as_str()) {
            tracing::debug!(section = %section.display_path(), "Section has no recorded pages");
            Change::Modified
        } else if entry.export_state.has_errors() {
            tracing::debug!(section = %section.display_path(), "Section had export errors, retrying");
            Change::Modified
        } else {
            Change::Unchanged
        };

        diff.push(change, section.clone());
    }

    diff.deleted = manifest
        .sections
        .iter()
        .filter(|(id, _)| remaining.contains(id.as_str()))
        .map(|(_, entry)| entry.clone())
        .collect();

    diff
}

/// Classify live pages against the prior manifest.
///
/// Purely timestamp based: a strictly newer timestamp is a modification,
/// equal timestamps are unchanged.
#[must_use]
pub fn diff_pages(existing: Option<&Manifest>, pages: &[Page]) -> ExportDiff {
    let mut diff = ExportDiff::default();

    let Some(manifest) = existing.filter(|m| !m.pages.is_empty()) else {
        diff.new.extend(pages.iter().cloned());
        return diff;
    };

    let mut remaining: HashSet<&str> = manifest.pages.keys().map(String::as_str).collect();

    for page in pages {
        let change = match manifest.pages.get(&page.id) {
            None => Change::New,
            Some(entry) => {
                remaining.remove(page.id.as_str());
                if page.last_modified > entry.last_modification_date {
                    Change::Modified
                } else {
                    Change::Unchanged
                }
            }
        };
        diff.push(change, page.clone());
    }

    diff.deleted = manifest
        .pages
        .iter()
        .filter(|(id, _)| remaining.contains(id.as_str()))
        .map(|(_, entry)| entry.clone())
        .collect();

    diff
}
