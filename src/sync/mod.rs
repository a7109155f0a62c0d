//! Incremental export engine.
//!
//! - **Manifest**: persisted snapshot of the last export of a notebook
//! - **Diff**: section-level and page-level classification against it
//! - **Export**: two-phase, checkpointed export of one notebook
//! - **Links**: deferred cross-page link resolution
//! - **Status**: preview of what the next export would do
//!
//! # Two-level change detection
//!
//! Sections are compared first. Only sections that are new, modified or
//! flagged for retry are enumerated by the source; unchanged sections are
//! rebuilt from the manifest. Pages are then compared by timestamp, and only
//! new or modified pages are rendered.
//!
//! # Manifest Format
//!
//! One pretty-printed JSON document per notebook, at the notebook export root:
//! ```json
//! {"version":"2.0","notebookId":"nb1","notebookTitle":"Work","exportFormat":"md",
//!  "lastExportDate":"2025-01-20T10:00:00Z",
//!  "sections":{"s1":{"title":"Meetings","sectionId":"s1","lastModificationDate":"2025-01-20T10:00:00Z",
//!                    "relativePath":"Meetings","isSectionGroup":false,"hasExportErrors":false}},
//!  "pages":{"p1":{"title":"Kickoff","pageId":"p1","sectionId":"s1",
//!                 "lastModificationDate":"2025-01-20T10:00:00Z","exportPath":"Meetings/Kickoff.md"}}}
//! ```
//!
//! # Example
//!
//! ```ignore
//! use nbexport::sync::Exporter;
//!
//! let mut exporter = Exporter::new(&source, &mut renderer, format.as_ref(), &settings, output_dir);
//! let result = exporter.export_notebook(&notebook)?;
//! println!("{} pages on error", result.pages_on_error);
//! ```

mod diff;
mod export;
mod file;
mod hash;
mod links;
mod manifest;
mod status;
mod types;

// Re-export main types and functions
pub use diff::{diff_pages, diff_sections};
pub use export::{ExportFilter, ExportPlan, Exporter, manifest_path, notebook_root, plan_export};
pub use file::{atomic_write, file_size, prune_empty_dirs, remove_output_file};
pub use hash::{NODE_ID_LEN, node_id};
pub use links::{LinkRegistry, LinkTarget};
pub use manifest::{
    create_manifest, for_format, load_manifest, migrate_manifest, page_entry, pages_from_manifest,
    save_manifest, section_entry,
};
pub use status::{DiffCounts, ExportStatus, get_export_status, print_status};
pub use types::{
    Change, Diff, ExportDiff, ExportState, Identified, LEGACY_MANIFEST_VERSION, MANIFEST_VERSION,
    Manifest, NotebookExportResult, PageEntry, PageExportError, PageStatus, SectionDiff,
    SectionEntry, SyncError, SyncResult,
};
