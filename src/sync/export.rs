//! Incremental notebook export.
//!
//! # Phases
//!
//! **Phase 1** collects every section of the notebook. Sections the section
//! diff reports unchanged are not enumerated again: their pages are rebuilt
//! as stubs from the prior manifest. The new manifest receives every section
//! entry and is saved right away, so an interruption still preserves section
//! identity.
//!
//! **Phase 2** assigns every page its output path and registers it for link
//! resolution, writes structural node files, then renders and writes each
//! page that is new or modified. Unchanged pages carry their prior manifest
//! entry forward untouched.
//!
//! # Checkpoints
//!
//! The manifest is rewritten in full after every successful page. A crash
//! loses at most the page in flight. A manifest write failure aborts the run;
//! a page failure never does.
//!
//! # Deletion
//!
//! Output of pages and sections that disappeared from the source is removed
//! last, best effort, using the paths recorded in the prior manifest.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::config::ExportSettings;
use crate::format::{NodeFile, OutputFormat, PathContext, restructure_page_hierarchy};
use crate::model::{Notebook, Page, Section, sanitize_file_name, to_manifest_path};
use crate::source::{HierarchyProvider, PageRenderer};
use crate::sync::diff::{diff_pages, diff_sections};
use crate::sync::file::{atomic_write, prune_empty_dirs, remove_output_file};
use crate::sync::hash::node_id;
use crate::sync::links::LinkRegistry;
use crate::sync::manifest::{
    create_manifest, for_format, load_manifest, page_entry, pages_from_manifest, save_manifest,
    section_entry,
};
use crate::sync::types::{
    Change, ExportDiff, ExportState, Manifest, NotebookExportResult, PageEntry, PageExportError,
    PageStatus, SectionDiff, SectionEntry, SyncResult,
};

/// Restricts a run to sections and pages with a given title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportFilter {
    pub section: Option<String>,
    pub page: Option<String>,
}

impl ExportFilter {
    /// Whether any restriction applies.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.section.is_some() || self.page.is_some()
    }

    /// Section groups always pass so filtered sections keep their parents.
    fn accepts_section(&self, section: &Section) -> bool {
        section.is_group
            || self
                .section
                .as_deref()
                .is_none_or(|title| section.title == title)
    }

    fn accepts_page(&self, page: &Page) -> bool {
        self.page.as_deref().is_none_or(|title| page.title == title)
    }
}

/// Result of phase 1: what the run will work on.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    /// Sections in hierarchy order (groups included when the format uses them)
    pub sections: Vec<Section>,
    /// Pages in collection order, live or rebuilt from the manifest
    pub pages: Vec<Page>,
    pub section_diff: SectionDiff,
    pub page_diff: ExportDiff,
    /// Sections whose pages were enumerated by the provider
    pub sections_loaded: usize,
    /// Sections whose pages were rebuilt from the manifest
    pub sections_skipped: usize,
}

/// Collect sections and pages and classify them against `existing`.
///
/// Nothing is rendered or written.
///
/// # Errors
///
/// Returns an error if the provider cannot list sections or pages.
pub fn plan_export(
    provider: &dyn HierarchyProvider,
    format: &dyn OutputFormat,
    filter: &ExportFilter,
    notebook: &Notebook,
    existing: Option<&Manifest>,
) -> SyncResult<ExportPlan> {
    let sections: Vec<Section> = provider
        .list_sections(notebook, format.includes_section_groups())?
        .into_iter()
        .filter(|s| filter.accepts_section(s))
        .collect();

    let section_diff = diff_sections(existing, &sections);
    let unchanged: HashSet<&str> = section_diff
        .unchanged
        .iter()
        .map(|s| s.id.as_str())
        .collect();

    let mut pages = Vec::new();
    let mut sections_loaded = 0;
    let mut sections_skipped = 0;

    for section in sections.iter().filter(|s| !s.is_group) {
        let section_pages = match existing {
            Some(manifest) if unchanged.contains(section.id.as_str()) => {
                sections_skipped += 1;
                tracing::info!("{} Section {}", PageStatus::Skip, section.display_path());
                pages_from_manifest(manifest, section)
            }
            _ => {
                sections_loaded += 1;
                tracing::info!("Loading section {}", section.display_path());
                provider.list_pages(section)?
            }
        };

        pages.extend(section_pages.into_iter().filter(|p| filter.accepts_page(p)));
    }

    let page_diff = diff_pages(existing, &pages);

    Ok(ExportPlan {
        sections,
        pages,
        section_diff,
        page_diff,
        sections_loaded,
        sections_skipped,
    })
}

/// Export root of a notebook: `<output>/<sanitized notebook title>`.
#[must_use]
pub fn notebook_root(output_dir: &Path, notebook: &Notebook, settings: &ExportSettings) -> PathBuf {
    output_dir.join(sanitize_file_name(
        &notebook.title,
        settings.max_file_name_length,
    ))
}

/// Manifest location of a notebook.
#[must_use]
pub fn manifest_path(output_dir: &Path, notebook: &Notebook, settings: &ExportSettings) -> PathBuf {
    notebook_root(output_dir, notebook, settings).join(&settings.manifest_file_name)
}

/// Prior entry of a page that can be carried forward without rendering.
fn reusable_entry<'m>(
    existing: Option<&'m Manifest>,
    changes: &HashMap<String, Change>,
    page: &Page,
) -> Option<&'m PageEntry> {
    if changes.get(&page.id) == Some(&Change::Unchanged) {
        existing.and_then(|m| m.pages.get(&page.id))
    } else {
        None
    }
}

/// Case-insensitive key used to detect output path collisions.
fn path_key(path: &str) -> String {
    path.to_lowercase()
}

/// Claim `candidate`, or the first free ` (n)` variant of it.
fn claim_path(candidate: PathBuf, claimed: &mut HashSet<String>) -> PathBuf {
    if claimed.insert(path_key(&to_manifest_path(&candidate))) {
        return candidate;
    }

    let stem = candidate
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = candidate
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 2;
    loop {
        let path = candidate.with_file_name(format!("{stem} ({n}){extension}"));
        if claimed.insert(path_key(&to_manifest_path(&path))) {
            return path;
        }
        n += 1;
    }
}

/// Exporter for one output directory.
///
/// Holds the collaborators of a run: the source, the renderer and the
/// output format. Each call to [`Exporter::export_notebook`] is one
/// independent run with its own manifest and link registry.
pub struct Exporter<'a> {
    provider: &'a dyn HierarchyProvider,
    renderer: &'a mut dyn PageRenderer,
    format: &'a dyn OutputFormat,
    settings: &'a ExportSettings,
    output_dir: PathBuf,
    filter: ExportFilter,
}

impl<'a> Exporter<'a> {
    /// Create a new exporter writing under `output_dir`.
    #[must_use]
    pub fn new(
        provider: &'a dyn HierarchyProvider,
        renderer: &'a mut dyn PageRenderer,
        format: &'a dyn OutputFormat,
        settings: &'a ExportSettings,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            provider,
            renderer,
            format,
            settings,
            output_dir,
            filter: ExportFilter::default(),
        }
    }

    /// Restrict runs to matching sections and pages.
    ///
    /// A filtered run keeps the manifest entries it did not visit and skips
    /// the deletion pass.
    #[must_use]
    pub fn with_filter(mut self, filter: ExportFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Get the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Export root of `notebook`.
    #[must_use]
    pub fn notebook_root(&self, notebook: &Notebook) -> PathBuf {
        notebook_root(&self.output_dir, notebook, self.settings)
    }

    /// Manifest location of `notebook`.
    #[must_use]
    pub fn manifest_path(&self, notebook: &Notebook) -> PathBuf {
        manifest_path(&self.output_dir, notebook, self.settings)
    }

    /// Export a notebook, reading the prior manifest from its export root.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails during phase 1, a structural
    /// file cannot be written, or any manifest checkpoint fails.
    pub fn export_notebook(&mut self, notebook: &Notebook) -> SyncResult<NotebookExportResult> {
        let existing = if self.settings.incremental {
            load_manifest(&self.manifest_path(notebook))
        } else {
            None
        };

        self.export_notebook_with(notebook, existing.as_ref())
    }

    /// Export a notebook against an explicit prior manifest.
    ///
    /// `existing` is read-only; the new manifest replaces it on disk at every
    /// checkpoint. In non-incremental mode `existing` is ignored and no
    /// manifest is written.
    ///
    /// # Errors
    ///
    /// See [`Exporter::export_notebook`].
    pub fn export_notebook_with(
        &mut self,
        notebook: &Notebook,
        existing: Option<&Manifest>,
    ) -> SyncResult<NotebookExportResult> {
        let incremental = self.settings.incremental;
        let existing = for_format(existing.filter(|_| incremental), self.format.code());
        let root = self.notebook_root(notebook);
        let manifest_path = self.manifest_path(notebook);
        let mut result = NotebookExportResult::default();

        // Phase 1: metadata collection
        tracing::info!(notebook = %notebook.title, "Phase 1: collecting sections and pages");
        let plan = plan_export(self.provider, self.format, &self.filter, notebook, existing)?;
        result.sections_loaded = plan.sections_loaded;
        result.sections_skipped = plan.sections_skipped;

        tracing::info!(
            "Sections: {} new, {} modified, {} unchanged, {} deleted",
            plan.section_diff.new.len(),
            plan.section_diff.modified.len(),
            plan.section_diff.unchanged.len(),
            plan.section_diff.deleted.len()
        );
        tracing::info!(
            "Pages: {} total, {} new, {} modified, {} unchanged, {} deleted",
            plan.page_diff.total(),
            plan.page_diff.new.len(),
            plan.page_diff.modified.len(),
            plan.page_diff.unchanged.len(),
            plan.page_diff.deleted.len()
        );

        let ExportPlan {
            sections,
            mut pages,
            section_diff,
            page_diff,
            ..
        } = plan;

        let mut manifest = create_manifest(notebook, self.format.code());
        if self.filter.is_active() {
            if let Some(prior) = existing {
                manifest.sections.clone_from(&prior.sections);
                manifest.pages.clone_from(&prior.pages);
            }
        }
        for section in &sections {
            let entry = self.visited_section_entry(section, existing);
            manifest.sections.insert(section.id.clone(), entry);
        }
        if incremental {
            save_manifest(&manifest, &manifest_path)?;
        }

        // Phase 2: content materialization
        tracing::info!(notebook = %notebook.title, "Phase 2: writing content");
        fs::create_dir_all(&root)?;

        let mut sections_by_id: HashMap<String, Section> = sections
            .iter()
            .map(|s| (s.id.clone(), s.clone()))
            .collect();
        let mut node_sections = sections;
        if self.format.restructures_hierarchy() {
            for section in restructure_page_hierarchy(&mut pages, &sections_by_id) {
                sections_by_id.insert(section.id.clone(), section.clone());
                node_sections.push(section);
            }
        }

        let changes = page_diff.changes();

        // Pass 1: assign every output path before any page is rendered, so
        // links to pages later in the run resolve.
        let mut registry = LinkRegistry::new(self.settings.link_handling);
        let mut assigned: HashMap<String, PathBuf> = HashMap::new();
        let mut claimed: HashSet<String> = pages
            .iter()
            .filter_map(|page| reusable_entry(existing, &changes, page))
            .map(|entry| path_key(&entry.export_path))
            .collect();
        if self.filter.is_active() {
            let in_run: HashSet<&str> = pages.iter().map(|p| p.id.as_str()).collect();
            claimed.extend(
                manifest
                    .pages
                    .iter()
                    .filter(|(id, _)| !in_run.contains(id.as_str()))
                    .map(|(_, entry)| path_key(&entry.export_path)),
            );
        }

        for page in &pages {
            let path = if let Some(entry) = reusable_entry(existing, &changes, page) {
                PathBuf::from(&entry.export_path)
            } else {
                let ctx = PathContext {
                    sections: &sections_by_id,
                    assigned: &assigned,
                };
                claim_path(self.format.page_path(page, &ctx), &mut claimed)
            };

            if let Some(key) = self.provider.link_key(&page.id) {
                registry.register(&node_id(&page.id), &page.id, &key, &path, &page.title);
            }
            assigned.insert(page.id.clone(), path);
        }
        tracing::debug!(links = registry.len(), "Link registry populated");

        // Structural files before page content
        if let Some(node) = self.format.notebook_node(notebook) {
            write_node(&root, &node)?;
        }
        for section in &node_sections {
            if let Some(node) = self.format.section_node(notebook, section) {
                tracing::info!("Section {}", section.display_path());
                write_node(&root, &node)?;
            }
        }

        // Pass 2: render and write
        let total = pages.len();
        for (index, page) in pages.iter().enumerate() {
            let section_title = sections_by_id
                .get(&page.section_id)
                .map_or(page.section_id.as_str(), |s| s.title.as_str());
            let label = format!(
                "Page {}/{total}: {section_title} / {}",
                index + 1,
                page.title_with_level_prefix()
            );

            if let Some(entry) = reusable_entry(existing, &changes, page) {
                tracing::info!("{} {label}", PageStatus::Skip);
                manifest.pages.insert(page.id.clone(), entry.clone());
                result.pages_skipped += 1;
                continue;
            }

            let status = if changes.get(&page.id) == Some(&Change::Modified) {
                PageStatus::Update
            } else {
                PageStatus::New
            };
            tracing::info!("{status} {label}");

            let Some(path) = assigned.get(&page.id) else {
                continue;
            };

            match self.export_page(page, path, &root, &registry) {
                Ok(()) => {
                    if status == PageStatus::Update {
                        result.pages_updated += 1;
                    } else {
                        result.pages_new += 1;
                    }

                    let export_path = to_manifest_path(path);
                    if let Some(prior) = existing.and_then(|m| m.pages.get(&page.id)) {
                        remove_stale_output(&root, prior, &export_path, &claimed, self.settings);
                    }

                    manifest
                        .pages
                        .insert(page.id.clone(), page_entry(page, &export_path));
                    if incremental {
                        save_manifest(&manifest, &manifest_path)?;
                    }
                }
                Err(e) => {
                    tracing::warn!(page = %page.title, error = %e, "Page export failed");
                    result.pages_on_error += 1;
                    if let Some(entry) = manifest.sections.get_mut(&page.section_id) {
                        entry.export_state = ExportState::ErrorPending;
                    }
                    // Keep tracking the old output so a later deletion can remove it
                    if let Some(prior) = existing.and_then(|m| m.pages.get(&page.id)) {
                        manifest.pages.insert(page.id.clone(), prior.clone());
                    }
                }
            }
        }

        if incremental && self.settings.cleanup_deleted_pages && existing.is_some() {
            if self.filter.is_active() {
                tracing::debug!("Filtered run, skipping deletion pass");
            } else {
                self.delete_removed(&root, &page_diff, &section_diff, &claimed, &mut result);
            }
        }

        if incremental {
            manifest.last_export_date = Utc::now();
            save_manifest(&manifest, &manifest_path)?;
            tracing::info!(pages = manifest.pages.len(), "Manifest saved");
        }

        if result.pages_skipped > 0 {
            tracing::info!(
                "{} pages unchanged and skipped, {} exported",
                result.pages_skipped,
                result.pages_written()
            );
        }

        Ok(result)
    }

    /// Manifest entry for a section visited in this run.
    ///
    /// A page-filtered run records only some of a section's pages, so it must
    /// not mark the section complete: the prior entry is kept as is, and a
    /// section seen for the first time is flagged for a full reload.
    fn visited_section_entry(
        &self,
        section: &Section,
        existing: Option<&Manifest>,
    ) -> SectionEntry {
        let fresh = section_entry(section, self.settings.max_file_name_length);
        if self.filter.page.is_none() || section.is_group {
            return fresh;
        }

        match existing.and_then(|m| m.sections.get(&section.id)) {
            Some(prior) => prior.clone(),
            None => SectionEntry {
                export_state: ExportState::ErrorPending,
                ..fresh
            },
        }
    }

    /// Render one page and write it to `path` under `root`.
    fn export_page(
        &mut self,
        page: &Page,
        path: &Path,
        root: &Path,
        registry: &LinkRegistry,
    ) -> Result<(), PageExportError> {
        let raw = self.provider.page_content(page)?;
        let body = self.renderer.render(page, &raw)?;

        let format = self.format;
        let body = registry.resolve(&body, |text, target, node| {
            format.render_link(text, target, node, path)
        });
        let content = format.finalize_page(page, &body)?;

        let full_path = root.join(path);
        atomic_write(&full_path, &content).map_err(|source| PageExportError::Write {
            path: full_path,
            source,
        })
    }

    /// Remove output of deleted pages and sections. Best effort.
    fn delete_removed(
        &self,
        root: &Path,
        page_diff: &ExportDiff,
        section_diff: &SectionDiff,
        claimed: &HashSet<String>,
        result: &mut NotebookExportResult,
    ) {
        let prune = self.settings.prune_empty_directories;

        for entry in &page_diff.deleted {
            result.pages_deleted += 1;

            if claimed.contains(&path_key(&entry.export_path)) {
                tracing::debug!(path = %entry.export_path, "Path reused in this run, keeping file");
                continue;
            }

            match remove_output_file(root, &entry.export_path, prune) {
                Ok(true) => {
                    tracing::info!("{} {} ({})", PageStatus::Delete, entry.title, entry.export_path);
                }
                Ok(false) => {
                    tracing::debug!(path = %entry.export_path, "Deleted page had no output file");
                }
                Err(e) => {
                    tracing::warn!(path = %entry.export_path, error = %e, "Failed to delete file");
                }
            }
        }

        for entry in &section_diff.deleted {
            result.sections_deleted += 1;

            if let Some(node) = self.format.section_node_path(&entry.section_id) {
                let node = to_manifest_path(&node);
                match remove_output_file(root, &node, false) {
                    Ok(true) => tracing::info!("{} Section {}", PageStatus::Delete, entry.title),
                    Ok(false) => {}
                    Err(e) => tracing::warn!(path = %node, error = %e, "Failed to delete file"),
                }
            } else if prune && !entry.relative_path.is_empty() {
                prune_empty_dirs(&root.join(&entry.relative_path), root);
            }
        }
    }
}

/// Write a structural node file under `root`.
fn write_node(root: &Path, node: &NodeFile) -> SyncResult<()> {
    atomic_write(&root.join(&node.path), &node.content)?;
    Ok(())
}

/// Remove the previous output of a page that moved to a new path.
fn remove_stale_output(
    root: &Path,
    prior: &PageEntry,
    export_path: &str,
    claimed: &HashSet<String>,
    settings: &ExportSettings,
) {
    if prior.export_path == export_path || claimed.contains(&path_key(&prior.export_path)) {
        return;
    }

    match remove_output_file(root, &prior.export_path, settings.prune_empty_directories) {
        Ok(true) => tracing::debug!(from = %prior.export_path, to = export_path, "Page moved"),
        Ok(false) => {}
        Err(e) => tracing::warn!(path = %prior.export_path, error = %e, "Failed to remove old output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExportFormatKind, LinkHandling};
    use crate::format;
    use crate::source::{
        JsonWorkspaceSource, NotebookDocument, PageDocument, ProviderError, RenderError,
        SectionDocument, WorkspaceDocument,
    };
    use crate::sync::types::SyncError;
    use chrono::{DateTime, TimeZone};
    use std::cell::Cell;
    use tempfile::TempDir;

    fn date(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 20, hour, 0, 0).unwrap()
    }

    fn page_doc(id: &str, title: &str, hour: u32, content: &str) -> PageDocument {
        PageDocument {
            id: id.to_string(),
            title: title.to_string(),
            created_at: Some(date(1)),
            last_modified_at: date(hour),
            level: 1,
            link_key: Some(format!("{{KEY-{id}}}")),
            content: Some(content.to_string()),
        }
    }

    fn section_doc(id: &str, title: &str, hour: u32, pages: Vec<PageDocument>) -> SectionDocument {
        SectionDocument {
            id: id.to_string(),
            title: title.to_string(),
            created_at: Some(date(1)),
            last_modified_at: date(hour),
            is_section_group: false,
            sections: Vec::new(),
            pages,
        }
    }

    fn workspace(sections: Vec<SectionDocument>) -> WorkspaceDocument {
        WorkspaceDocument {
            notebooks: vec![NotebookDocument {
                id: "nb1".to_string(),
                title: "Work".to_string(),
                created_at: Some(date(1)),
                last_modified_at: date(1),
                sections,
            }],
        }
    }

    fn two_pages(section_hour: u32, notes_hour: u32) -> WorkspaceDocument {
        workspace(vec![section_doc(
            "s1",
            "Meetings",
            section_hour,
            vec![
                page_doc("p1", "Kickoff", 10, "kickoff"),
                page_doc("p2", "Notes", notes_hour, "notes"),
            ],
        )])
    }

    struct CountingProvider {
        inner: JsonWorkspaceSource,
        list_pages_calls: Cell<usize>,
    }

    impl HierarchyProvider for CountingProvider {
        fn list_notebooks(&self) -> Result<Vec<Notebook>, ProviderError> {
            self.inner.list_notebooks()
        }

        fn list_sections(
            &self,
            notebook: &Notebook,
            include_groups: bool,
        ) -> Result<Vec<Section>, ProviderError> {
            self.inner.list_sections(notebook, include_groups)
        }

        fn list_pages(&self, section: &Section) -> Result<Vec<Page>, ProviderError> {
            self.list_pages_calls.set(self.list_pages_calls.get() + 1);
            self.inner.list_pages(section)
        }

        fn page_content(&self, page: &Page) -> Result<String, ProviderError> {
            self.inner.page_content(page)
        }

        fn link_key(&self, page_id: &str) -> Option<String> {
            self.inner.link_key(page_id)
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        rendered: Vec<String>,
        fail: HashSet<String>,
    }

    impl PageRenderer for RecordingRenderer {
        fn render(&mut self, page: &Page, raw: &str) -> Result<String, RenderError> {
            self.rendered.push(page.id.clone());
            if self.fail.contains(&page.id) {
                return Err(RenderError::Failed {
                    title: page.title.clone(),
                    message: "boom".to_string(),
                });
            }
            Ok(format!("{raw}\n"))
        }
    }

    struct Run {
        result: NotebookExportResult,
        list_pages_calls: usize,
    }

    fn settings() -> ExportSettings {
        ExportSettings {
            front_matter: false,
            ..ExportSettings::default()
        }
    }

    fn run_with(
        doc: &WorkspaceDocument,
        settings: &ExportSettings,
        output: &Path,
        renderer: &mut RecordingRenderer,
        filter: ExportFilter,
    ) -> SyncResult<Run> {
        let provider = CountingProvider {
            inner: JsonWorkspaceSource::from_document(doc.clone()),
            list_pages_calls: Cell::new(0),
        };
        let format = format::for_settings(settings);
        let notebook = provider.list_notebooks().unwrap().remove(0);

        let mut exporter = Exporter::new(
            &provider,
            renderer,
            format.as_ref(),
            settings,
            output.to_path_buf(),
        )
        .with_filter(filter);
        let result = exporter.export_notebook(&notebook)?;

        Ok(Run {
            result,
            list_pages_calls: provider.list_pages_calls.get(),
        })
    }

    fn run(
        doc: &WorkspaceDocument,
        settings: &ExportSettings,
        output: &Path,
        renderer: &mut RecordingRenderer,
    ) -> Run {
        run_with(doc, settings, output, renderer, ExportFilter::default()).unwrap()
    }

    fn read_manifest(output: &Path) -> Manifest {
        load_manifest(&output.join("Work").join(".nbexport-manifest.json")).unwrap()
    }

    #[test]
    fn test_first_run_exports_everything() {
        let temp_dir = TempDir::new().unwrap();
        let mut renderer = RecordingRenderer::default();

        let run = run(&two_pages(10, 10), &settings(), temp_dir.path(), &mut renderer);

        assert_eq!(run.result.pages_new, 2);
        assert_eq!(run.result.pages_on_error, 0);
        assert_eq!(run.result.sections_loaded, 1);
        assert_eq!(renderer.rendered, ["p1", "p2"]);

        let manifest = read_manifest(temp_dir.path());
        assert_eq!(manifest.pages["p1"].export_path, "Meetings/Kickoff.md");
        assert_eq!(manifest.pages["p2"].export_path, "Meetings/Notes.md");
        assert_eq!(manifest.pages["p2"].section_id.as_deref(), Some("s1"));
        assert_eq!(manifest.sections["s1"].export_state, ExportState::Clean);

        let content =
            fs::read_to_string(temp_dir.path().join("Work/Meetings/Kickoff.md")).unwrap();
        assert_eq!(content, "kickoff\n");
    }

    #[test]
    fn test_second_run_without_changes_skips_everything() {
        let temp_dir = TempDir::new().unwrap();
        let doc = two_pages(10, 10);

        run(&doc, &settings(), temp_dir.path(), &mut RecordingRenderer::default());
        let first = read_manifest(temp_dir.path());

        let mut renderer = RecordingRenderer::default();
        let second_run = run(&doc, &settings(), temp_dir.path(), &mut renderer);
        let second = read_manifest(temp_dir.path());

        assert!(renderer.rendered.is_empty());
        assert_eq!(second_run.list_pages_calls, 0);
        assert_eq!(second_run.result.pages_skipped, 2);
        assert_eq!(second_run.result.sections_skipped, 1);
        assert_eq!(second.pages, first.pages);
        assert_eq!(second.sections, first.sections);
    }

    #[test]
    fn test_modified_page_is_the_only_one_rendered() {
        let temp_dir = TempDir::new().unwrap();
        run(&two_pages(10, 10), &settings(), temp_dir.path(), &mut RecordingRenderer::default());

        let mut renderer = RecordingRenderer::default();
        let run = run(&two_pages(11, 11), &settings(), temp_dir.path(), &mut renderer);

        assert_eq!(renderer.rendered, ["p2"]);
        assert_eq!(run.result.pages_updated, 1);
        assert_eq!(run.result.pages_skipped, 1);
        assert_eq!(run.result.sections_loaded, 1);
        assert_eq!(read_manifest(temp_dir.path()).pages["p2"].last_modification_date, date(11));
    }

    #[test]
    fn test_deleted_page_output_is_removed() {
        let temp_dir = TempDir::new().unwrap();
        run(&two_pages(10, 10), &settings(), temp_dir.path(), &mut RecordingRenderer::default());
        let notes = temp_dir.path().join("Work/Meetings/Notes.md");
        assert!(notes.exists());

        let doc = workspace(vec![section_doc(
            "s1",
            "Meetings",
            11,
            vec![page_doc("p1", "Kickoff", 10, "kickoff")],
        )]);
        let run = run(&doc, &settings(), temp_dir.path(), &mut RecordingRenderer::default());

        assert_eq!(run.result.pages_deleted, 1);
        assert!(!notes.exists());
        assert!(temp_dir.path().join("Work/Meetings/Kickoff.md").exists());
        assert!(!read_manifest(temp_dir.path()).pages.contains_key("p2"));
    }

    #[test]
    fn test_deleted_section_directory_is_pruned() {
        let temp_dir = TempDir::new().unwrap();
        let doc = workspace(vec![
            section_doc("s1", "Meetings", 10, vec![page_doc("p1", "Kickoff", 10, "x")]),
            section_doc("s2", "Archive", 10, vec![page_doc("p2", "Old", 10, "y")]),
        ]);
        run(&doc, &settings(), temp_dir.path(), &mut RecordingRenderer::default());
        assert!(temp_dir.path().join("Work/Archive/Old.md").exists());

        let doc = workspace(vec![section_doc(
            "s1",
            "Meetings",
            10,
            vec![page_doc("p1", "Kickoff", 10, "x")],
        )]);
        let run = run(&doc, &settings(), temp_dir.path(), &mut RecordingRenderer::default());

        assert_eq!(run.result.sections_deleted, 1);
        assert_eq!(run.result.pages_deleted, 1);
        assert!(!temp_dir.path().join("Work/Archive").exists());
        assert!(temp_dir.path().join("Work/Meetings/Kickoff.md").exists());
    }

    #[test]
    fn test_render_failure_flags_section_and_retries() {
        let temp_dir = TempDir::new().unwrap();
        let doc = workspace(vec![section_doc(
            "s1",
            "Meetings",
            10,
            vec![
                page_doc("p1", "One", 10, "1"),
                page_doc("p2", "Two", 10, "2"),
                page_doc("p3", "Three", 10, "3"),
            ],
        )]);

        let mut renderer = RecordingRenderer::default();
        renderer.fail.insert("p2".to_string());
        let first = run(&doc, &settings(), temp_dir.path(), &mut renderer);

        assert_eq!(first.result.pages_on_error, 1);
        assert_eq!(first.result.pages_new, 2);
        let manifest = read_manifest(temp_dir.path());
        assert_eq!(manifest.sections["s1"].export_state, ExportState::ErrorPending);
        assert!(manifest.pages.contains_key("p1"));
        assert!(manifest.pages.contains_key("p3"));
        assert!(!manifest.pages.contains_key("p2"));

        // Unchanged timestamps, but the section is reloaded and p2 retried
        let mut renderer = RecordingRenderer::default();
        let second = run(&doc, &settings(), temp_dir.path(), &mut renderer);

        assert_eq!(second.list_pages_calls, 1);
        assert_eq!(renderer.rendered, ["p2"]);
        assert_eq!(second.result.pages_skipped, 2);
        let manifest = read_manifest(temp_dir.path());
        assert_eq!(manifest.sections["s1"].export_state, ExportState::Clean);
        assert!(manifest.pages.contains_key("p2"));
    }

    #[test]
    fn test_missing_content_counts_as_page_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut broken = page_doc("p2", "Broken", 10, "");
        broken.content = None;
        let doc = workspace(vec![section_doc(
            "s1",
            "Meetings",
            10,
            vec![page_doc("p1", "Fine", 10, "ok"), broken],
        )]);

        let run = run(&doc, &settings(), temp_dir.path(), &mut RecordingRenderer::default());
        assert_eq!(run.result.pages_on_error, 1);
        assert_eq!(run.result.pages_new, 1);
    }

    #[test]
    fn test_full_export_writes_no_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let settings = ExportSettings {
            incremental: false,
            ..settings()
        };

        let mut renderer = RecordingRenderer::default();
        run(&two_pages(10, 10), &settings, temp_dir.path(), &mut renderer);
        run(&two_pages(10, 10), &settings, temp_dir.path(), &mut renderer);

        assert_eq!(renderer.rendered.len(), 4);
        assert!(!temp_dir.path().join("Work/.nbexport-manifest.json").exists());
    }

    #[test]
    fn test_forward_links_resolve() {
        let temp_dir = TempDir::new().unwrap();
        let doc = workspace(vec![section_doc(
            "s1",
            "Meetings",
            10,
            vec![
                page_doc(
                    "p1",
                    "Kickoff",
                    10,
                    "see [the notes](onenote:Work.one#Notes&page-id={KEY-p2}&end)",
                ),
                page_doc("p2", "My Notes", 10, "notes"),
            ],
        )]);

        run(&doc, &settings(), temp_dir.path(), &mut RecordingRenderer::default());

        let content =
            fs::read_to_string(temp_dir.path().join("Work/Meetings/Kickoff.md")).unwrap();
        assert_eq!(content, "see [the notes](My%20Notes.md)\n");
    }

    #[test]
    fn test_wikilinks_to_skipped_pages_resolve() {
        let temp_dir = TempDir::new().unwrap();
        let settings = ExportSettings {
            link_handling: LinkHandling::Wikilink,
            ..settings()
        };
        let doc = |hour: u32, content: &str| {
            workspace(vec![section_doc(
                "s1",
                "Meetings",
                hour,
                vec![
                    page_doc("p1", "Kickoff", 10, "kickoff"),
                    page_doc("p2", "Notes", hour, content),
                ],
            )])
        };

        run(&doc(10, "first"), &settings, temp_dir.path(), &mut RecordingRenderer::default());
        run(
            &doc(11, "[back](onenote:x#y&page-id={key-p1}&end)"),
            &settings,
            temp_dir.path(),
            &mut RecordingRenderer::default(),
        );

        let content = fs::read_to_string(temp_dir.path().join("Work/Meetings/Notes.md")).unwrap();
        assert_eq!(content, "[[Meetings/Kickoff|back]]\n");
    }

    #[test]
    fn test_title_collisions_get_suffixes() {
        let temp_dir = TempDir::new().unwrap();
        let doc = workspace(vec![section_doc(
            "s1",
            "Meetings",
            10,
            vec![
                page_doc("p1", "Standup", 10, "a"),
                page_doc("p2", "Standup", 10, "b"),
            ],
        )]);

        run(&doc, &settings(), temp_dir.path(), &mut RecordingRenderer::default());

        let manifest = read_manifest(temp_dir.path());
        assert_eq!(manifest.pages["p1"].export_path, "Meetings/Standup.md");
        assert_eq!(manifest.pages["p2"].export_path, "Meetings/Standup (2).md");
    }

    #[test]
    fn test_joplin_folder_tree_restructures_pages() {
        let temp_dir = TempDir::new().unwrap();
        let settings = ExportSettings {
            format: ExportFormatKind::JoplinRawDir,
            ..settings()
        };
        let mut child = page_doc("p2", "Child", 10, "child");
        child.level = 2;
        let doc = workspace(vec![section_doc(
            "s1",
            "Meetings",
            10,
            vec![page_doc("p1", "Parent", 10, "parent"), child],
        )]);

        run(&doc, &settings, temp_dir.path(), &mut RecordingRenderer::default());

        let root = temp_dir.path().join("Work");
        let synthetic = node_id("p1/section");
        assert!(root.join(format!("{}.md", node_id("nb1"))).exists());
        assert!(root.join(format!("{}.md", node_id("s1"))).exists());
        assert!(root.join(format!("{synthetic}.md")).exists());

        let child = fs::read_to_string(root.join(format!("{}.md", node_id("p2")))).unwrap();
        assert!(child.contains(&format!("\nparent_id: {synthetic}\n")));

        let manifest = read_manifest(temp_dir.path());
        assert_eq!(manifest.export_format, "joplin-raw-dir");
        assert_eq!(manifest.pages["p2"].section_id.as_deref(), Some("s1"));
    }

    #[test]
    fn test_section_filter_keeps_other_entries() {
        let temp_dir = TempDir::new().unwrap();
        let doc = workspace(vec![
            section_doc("s1", "Meetings", 10, vec![page_doc("p1", "Kickoff", 10, "x")]),
            section_doc("s2", "Archive", 10, vec![page_doc("p2", "Old", 10, "y")]),
        ]);
        run(&doc, &settings(), temp_dir.path(), &mut RecordingRenderer::default());

        let filter = ExportFilter {
            section: Some("Meetings".to_string()),
            page: None,
        };
        let mut renderer = RecordingRenderer::default();
        let doc = workspace(vec![section_doc(
            "s1",
            "Meetings",
            11,
            vec![page_doc("p1", "Kickoff", 11, "x")],
        )]);
        let run = run_with(&doc, &settings(), temp_dir.path(), &mut renderer, filter).unwrap();

        assert_eq!(renderer.rendered, ["p1"]);
        assert_eq!(run.result.pages_deleted, 0);
        let manifest = read_manifest(temp_dir.path());
        assert!(manifest.pages.contains_key("p2"));
        assert!(manifest.sections.contains_key("s2"));
        assert!(temp_dir.path().join("Work/Archive/Old.md").exists());
    }

    fn page_filter(title: &str) -> ExportFilter {
        ExportFilter {
            section: None,
            page: Some(title.to_string()),
        }
    }

    #[test]
    fn test_page_filter_then_full_run_exports_every_page() {
        let temp_dir = TempDir::new().unwrap();
        let doc = two_pages(10, 10);

        let mut renderer = RecordingRenderer::default();
        let filter = page_filter("Kickoff");
        run_with(&doc, &settings(), temp_dir.path(), &mut renderer, filter).unwrap();
        assert_eq!(renderer.rendered, ["p1"]);
        let manifest = read_manifest(temp_dir.path());
        assert_eq!(manifest.sections["s1"].export_state, ExportState::ErrorPending);

        let mut renderer = RecordingRenderer::default();
        let full = run(&doc, &settings(), temp_dir.path(), &mut renderer);

        assert_eq!(full.list_pages_calls, 1);
        assert_eq!(renderer.rendered, ["p2"]);
        assert_eq!(full.result.pages_new, 1);
        assert_eq!(full.result.pages_skipped, 1);
        assert!(temp_dir.path().join("Work/Meetings/Notes.md").exists());
        assert_eq!(
            read_manifest(temp_dir.path()).sections["s1"].export_state,
            ExportState::Clean
        );
    }

    #[test]
    fn test_page_filter_keeps_pending_retry() {
        let temp_dir = TempDir::new().unwrap();
        let doc = two_pages(10, 10);

        let mut renderer = RecordingRenderer::default();
        renderer.fail.insert("p2".to_string());
        run(&doc, &settings(), temp_dir.path(), &mut renderer);

        run_with(
            &doc,
            &settings(),
            temp_dir.path(),
            &mut RecordingRenderer::default(),
            page_filter("Kickoff"),
        )
        .unwrap();
        assert_eq!(
            read_manifest(temp_dir.path()).sections["s1"].export_state,
            ExportState::ErrorPending
        );

        let mut renderer = RecordingRenderer::default();
        run(&doc, &settings(), temp_dir.path(), &mut renderer);
        assert_eq!(renderer.rendered, ["p2"]);
        assert!(temp_dir.path().join("Work/Meetings/Notes.md").exists());
    }

    #[test]
    fn test_format_switch_starts_over() {
        let temp_dir = TempDir::new().unwrap();
        let doc = two_pages(10, 10);
        run(&doc, &settings(), temp_dir.path(), &mut RecordingRenderer::default());

        let joplin = ExportSettings {
            format: ExportFormatKind::JoplinRawDir,
            ..settings()
        };
        let mut renderer = RecordingRenderer::default();
        let run = run(&doc, &joplin, temp_dir.path(), &mut renderer);

        assert_eq!(run.result.pages_new, 2);
        assert_eq!(run.result.pages_skipped, 0);
        assert_eq!(renderer.rendered, ["p1", "p2"]);

        let manifest = read_manifest(temp_dir.path());
        assert_eq!(manifest.export_format, "joplin-raw-dir");
        assert_eq!(manifest.pages["p1"].export_path, format!("{}.md", node_id("p1")));
        assert!(
            temp_dir
                .path()
                .join("Work")
                .join(format!("{}.md", node_id("p1")))
                .exists()
        );
    }

    #[test]
    fn test_failed_update_still_cleaned_up_after_deletion() {
        let temp_dir = TempDir::new().unwrap();
        run(&two_pages(10, 10), &settings(), temp_dir.path(), &mut RecordingRenderer::default());
        let notes = temp_dir.path().join("Work/Meetings/Notes.md");

        let mut renderer = RecordingRenderer::default();
        renderer.fail.insert("p2".to_string());
        let failed = run(&two_pages(11, 11), &settings(), temp_dir.path(), &mut renderer);
        assert_eq!(failed.result.pages_on_error, 1);

        let manifest = read_manifest(temp_dir.path());
        assert_eq!(manifest.pages["p2"].last_modification_date, date(10));
        assert_eq!(manifest.pages["p2"].export_path, "Meetings/Notes.md");
        assert!(notes.exists());

        let doc = workspace(vec![section_doc(
            "s1",
            "Meetings",
            12,
            vec![page_doc("p1", "Kickoff", 10, "kickoff")],
        )]);
        let run = run(&doc, &settings(), temp_dir.path(), &mut RecordingRenderer::default());

        assert_eq!(run.result.pages_deleted, 1);
        assert!(!notes.exists());
        assert!(!read_manifest(temp_dir.path()).pages.contains_key("p2"));
    }

    #[test]
    fn test_failed_delete_does_not_stop_the_pass() {
        let temp_dir = TempDir::new().unwrap();
        let doc = workspace(vec![section_doc(
            "s1",
            "Meetings",
            10,
            vec![
                page_doc("p1", "Kickoff", 10, "kickoff"),
                page_doc("p2", "Notes", 10, "notes"),
                page_doc("p3", "Agenda", 10, "agenda"),
            ],
        )]);
        run(&doc, &settings(), temp_dir.path(), &mut RecordingRenderer::default());

        // A recorded path outside the export root cannot be deleted
        let manifest_file = temp_dir.path().join("Work/.nbexport-manifest.json");
        let mut manifest = load_manifest(&manifest_file).unwrap();
        manifest.pages.get_mut("p2").unwrap().export_path = "../outside.md".to_string();
        save_manifest(&manifest, &manifest_file).unwrap();
        let outside = temp_dir.path().join("outside.md");
        fs::write(&outside, "keep").unwrap();

        let doc = workspace(vec![section_doc(
            "s1",
            "Meetings",
            11,
            vec![page_doc("p1", "Kickoff", 10, "kickoff")],
        )]);
        let run = run(&doc, &settings(), temp_dir.path(), &mut RecordingRenderer::default());

        assert_eq!(run.result.pages_deleted, 2);
        assert!(outside.exists());
        assert!(!temp_dir.path().join("Work/Meetings/Agenda.md").exists());
        let manifest = read_manifest(temp_dir.path());
        assert_eq!(manifest.pages.keys().collect::<Vec<_>>(), ["p1"]);
    }

    #[test]
    fn test_resume_from_section_checkpoint() {
        let temp_dir = TempDir::new().unwrap();
        let doc = two_pages(10, 10);
        run(&doc, &settings(), temp_dir.path(), &mut RecordingRenderer::default());

        // State left behind by a run interrupted right after phase 1
        let manifest_file = temp_dir.path().join("Work/.nbexport-manifest.json");
        let mut manifest = load_manifest(&manifest_file).unwrap();
        manifest.pages.clear();
        save_manifest(&manifest, &manifest_file).unwrap();

        let mut renderer = RecordingRenderer::default();
        let resumed = run(&doc, &settings(), temp_dir.path(), &mut renderer);

        assert_eq!(resumed.list_pages_calls, 1);
        assert_eq!(resumed.result.sections_loaded, 1);
        assert_eq!(resumed.result.sections_skipped, 0);
        assert_eq!(resumed.result.pages_new, 2);
        assert_eq!(renderer.rendered, ["p1", "p2"]);
        assert_eq!(read_manifest(temp_dir.path()).pages.len(), 2);
    }

    #[test]
    fn test_manifest_write_failure_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("Work/.nbexport-manifest.json")).unwrap();

        let result = run_with(
            &two_pages(10, 10),
            &settings(),
            temp_dir.path(),
            &mut RecordingRenderer::default(),
            ExportFilter::default(),
        );

        assert!(matches!(result, Err(SyncError::ManifestWrite { .. })));
    }

    #[test]
    fn test_claim_path() {
        let mut claimed = HashSet::new();
        assert_eq!(
            claim_path(PathBuf::from("A/x.md"), &mut claimed),
            PathBuf::from("A/x.md")
        );
        assert_eq!(
            claim_path(PathBuf::from("A/X.md"), &mut claimed),
            PathBuf::from("A/X (2).md")
        );
        assert_eq!(
            claim_path(PathBuf::from("A/x.md"), &mut claimed),
            PathBuf::from("A/x (3).md")
        );
    }
}
