//! Export status display.
//!
//! Computes what the next export of a notebook would do, without rendering
//! or writing anything: the manifest is loaded and both diffs are run
//! against the live source.

use std::path::Path;

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::config::ExportSettings;
use crate::format::OutputFormat;
use crate::model::Notebook;
use crate::source::HierarchyProvider;
use crate::sync::export::{ExportFilter, manifest_path, notebook_root, plan_export};
use crate::sync::file::file_size;
use crate::sync::manifest::{for_format, load_manifest};
use crate::sync::types::{Diff, SyncResult};

/// Sizes of the four diff buckets.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiffCounts {
    pub new: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl<T, E> From<&Diff<T, E>> for DiffCounts {
    fn from(diff: &Diff<T, E>) -> Self {
        Self {
            new: diff.new.len(),
            modified: diff.modified.len(),
            unchanged: diff.unchanged.len(),
            deleted: diff.deleted.len(),
        }
    }
}

impl DiffCounts {
    /// Whether the next export has nothing to do.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.new + self.modified + self.deleted == 0
    }
}

/// Pending work for one notebook.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStatus {
    pub notebook_id: String,
    pub notebook_title: String,
    pub export_root: String,
    pub manifest_path: String,
    pub has_manifest: bool,
    pub manifest_version: Option<String>,
    pub manifest_format: Option<String>,
    pub last_export_date: Option<DateTime<Utc>>,
    pub manifest_size: u64,
    /// Sections flagged for retry after page failures
    pub sections_with_errors: usize,
    pub sections: DiffCounts,
    pub pages: DiffCounts,
}

/// Get the export status of a notebook.
///
/// # Errors
///
/// Returns an error if the provider cannot list sections or pages.
pub fn get_export_status(
    provider: &dyn HierarchyProvider,
    format: &dyn OutputFormat,
    settings: &ExportSettings,
    output_dir: &Path,
    notebook: &Notebook,
) -> SyncResult<ExportStatus> {
    let manifest_file = manifest_path(output_dir, notebook, settings);
    let existing = load_manifest(&manifest_file);

    let plan = plan_export(
        provider,
        format,
        &ExportFilter::default(),
        notebook,
        for_format(existing.as_ref(), format.code()),
    )?;

    let sections_with_errors = existing.as_ref().map_or(0, |m| {
        m.sections
            .values()
            .filter(|s| s.export_state.has_errors())
            .count()
    });

    Ok(ExportStatus {
        notebook_id: notebook.id.clone(),
        notebook_title: notebook.title.clone(),
        export_root: notebook_root(output_dir, notebook, settings)
            .display()
            .to_string(),
        manifest_path: manifest_file.display().to_string(),
        has_manifest: existing.is_some(),
        manifest_version: existing.as_ref().map(|m| m.version.clone()),
        manifest_format: existing.as_ref().map(|m| m.export_format.clone()),
        last_export_date: existing.as_ref().map(|m| m.last_export_date),
        manifest_size: file_size(&manifest_file),
        sections_with_errors,
        sections: DiffCounts::from(&plan.section_diff),
        pages: DiffCounts::from(&plan.page_diff),
    })
}

/// Print export status to stdout in a human-readable format.
pub fn print_status(status: &ExportStatus) {
    println!(
        "{} {}",
        "Notebook:".bold(),
        status.notebook_title.bold().underline()
    );
    println!("  Export root: {}", status.export_root);

    if status.has_manifest {
        println!(
            "  Manifest:    {} ({}, version {})",
            status.manifest_path,
            format_size(status.manifest_size),
            status.manifest_version.as_deref().unwrap_or("?")
        );
        if let Some(date) = status.last_export_date {
            println!(
                "  Last export: {} ({})",
                date.format("%Y-%m-%d %H:%M:%S UTC"),
                status.manifest_format.as_deref().unwrap_or("?")
            );
        }
    } else {
        println!("  {}", "No manifest found, next export is a full export.".dimmed());
    }
    println!();

    print_counts("Sections", &status.sections);
    print_counts("Pages", &status.pages);

    if status.sections_with_errors > 0 {
        println!(
            "  {}",
            format!(
                "{} section(s) will be retried after earlier page errors.",
                status.sections_with_errors
            )
            .yellow()
        );
    }

    if status.pages.is_clean() && status.sections.is_clean() {
        println!("{}", "Up to date, nothing to export.".green());
    } else {
        println!(
            "{}",
            "Run 'nbexport export' to apply pending changes.".dimmed()
        );
    }
    println!();
}

fn print_counts(label: &str, counts: &DiffCounts) {
    println!("{}", format!("{label}:").blue().bold());
    println!(
        "  {} new, {} modified, {} unchanged, {} deleted",
        counts.new.to_string().green(),
        counts.modified.to_string().yellow(),
        counts.unchanged,
        counts.deleted.to_string().red()
    );
}

/// Format a byte size as a human-readable string.
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
