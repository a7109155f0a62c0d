//! Export command implementation.
//!
//! Every selected notebook is exported independently into
//! `<output>/<notebook title>/`, with its own manifest. Pages that fail to
//! export are counted and reported but do not fail the command: the next
//! run retries them.

use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use crate::cli::ExportArgs;
use crate::cli::commands::{open_source, select_notebooks};
use crate::config::{ExportSettings, resolve_settings};
use crate::error::{Error, Result};
use crate::format;
use crate::source::MarkdownRenderer;
use crate::sync::{ExportFilter, Exporter, NotebookExportResult};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotebookOutput {
    notebook_id: String,
    notebook_title: String,
    export_root: String,
    #[serde(flatten)]
    result: NotebookExportResult,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportOutput {
    success: bool,
    output_dir: String,
    format: String,
    incremental: bool,
    notebooks: Vec<NotebookOutput>,
    totals: NotebookExportResult,
}

/// Apply command-line overrides on top of the loaded settings.
fn apply_overrides(settings: &mut ExportSettings, args: &ExportArgs) {
    if let Some(format) = args.format {
        settings.format = format;
    }
    if let Some(hierarchy) = args.hierarchy {
        settings.page_hierarchy = hierarchy;
    }
    if let Some(links) = args.links {
        settings.link_handling = links;
    }
    if args.full {
        settings.incremental = false;
    }
    if args.no_cleanup {
        settings.cleanup_deleted_pages = false;
    }
}

/// Execute the export command.
///
/// # Errors
///
/// Returns an error if the settings or the source cannot be loaded, the
/// requested notebook does not exist, or a notebook export aborts.
pub fn execute(args: &ExportArgs, config: Option<&Path>, json: bool, quiet: bool) -> Result<()> {
    let mut settings = resolve_settings(config)?;
    apply_overrides(&mut settings, args);

    for (flag, value) in [("--section", &args.section), ("--page", &args.page)] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(Error::InvalidArgument(format!("{flag} is empty")));
        }
    }

    let source = open_source(&args.source)?;
    let notebooks = select_notebooks(&source, args.notebook.as_deref())?;
    let output_format = format::for_settings(&settings);
    let filter = ExportFilter {
        section: args.section.clone(),
        page: args.page.clone(),
    };

    tracing::info!(
        source = %args.source.display(),
        output = %args.output.display(),
        format = %settings.format,
        incremental = settings.incremental,
        notebooks = notebooks.len(),
        "Starting export"
    );

    let mut renderer = MarkdownRenderer::default();
    let mut exporter = Exporter::new(
        &source,
        &mut renderer,
        output_format.as_ref(),
        &settings,
        args.output.clone(),
    )
    .with_filter(filter);

    let mut outputs = Vec::with_capacity(notebooks.len());
    let mut totals = NotebookExportResult::default();

    for notebook in &notebooks {
        let result = exporter.export_notebook(notebook)?;
        totals.absorb(&result);
        outputs.push(NotebookOutput {
            notebook_id: notebook.id.clone(),
            notebook_title: notebook.title.clone(),
            export_root: exporter.notebook_root(notebook).display().to_string(),
            result,
        });
    }

    if json {
        let output = ExportOutput {
            success: true,
            output_dir: args.output.display().to_string(),
            format: settings.format.code().to_string(),
            incremental: settings.incremental,
            notebooks: outputs,
            totals,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if !quiet {
        print_summary(&outputs, &totals);
    }

    Ok(())
}

fn print_summary(outputs: &[NotebookOutput], totals: &NotebookExportResult) {
    if outputs.is_empty() {
        println!("No notebooks to export.");
        return;
    }

    for output in outputs {
        let r = &output.result;
        println!(
            "{} {}",
            "Exported".green().bold(),
            output.notebook_title.bold()
        );
        println!("  Location: {}", output.export_root);
        println!(
            "  Pages:    {} new, {} updated, {} skipped, {} deleted",
            r.pages_new.to_string().green(),
            r.pages_updated.to_string().yellow(),
            r.pages_skipped,
            r.pages_deleted.to_string().red()
        );
        println!(
            "  Sections: {} loaded, {} skipped, {} deleted",
            r.sections_loaded, r.sections_skipped, r.sections_deleted
        );
        if r.pages_on_error > 0 {
            println!(
                "  {}",
                format!(
                    "{} page(s) failed and will be retried on the next run.",
                    r.pages_on_error
                )
                .yellow()
            );
        }
        println!();
    }

    if outputs.len() > 1 {
        println!(
            "Total: {} written, {} skipped, {} deleted, {} failed",
            totals.pages_written(),
            totals.pages_skipped,
            totals.pages_deleted,
            totals.pages_on_error
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExportFormatKind, LinkHandling, PageHierarchy};
    use std::path::PathBuf;

    fn args() -> ExportArgs {
        ExportArgs {
            source: PathBuf::from("workspace.json"),
            output: PathBuf::from("export"),
            notebook: None,
            section: None,
            page: None,
            format: None,
            full: false,
            no_cleanup: false,
            hierarchy: None,
            links: None,
        }
    }

    #[test]
    fn test_no_flags_keep_settings() {
        let mut settings = ExportSettings::default();
        apply_overrides(&mut settings, &args());
        assert_eq!(settings, ExportSettings::default());
    }

    #[test]
    fn test_flags_override_settings() {
        let mut settings = ExportSettings::default();
        let args = ExportArgs {
            format: Some(ExportFormatKind::JoplinRawDir),
            full: true,
            no_cleanup: true,
            hierarchy: Some(PageHierarchy::TitlePrefix),
            links: Some(LinkHandling::Wikilink),
            ..args()
        };
        apply_overrides(&mut settings, &args);

        assert_eq!(settings.format, ExportFormatKind::JoplinRawDir);
        assert!(!settings.incremental);
        assert!(!settings.cleanup_deleted_pages);
        assert_eq!(settings.page_hierarchy, PageHierarchy::TitlePrefix);
        assert_eq!(settings.link_handling, LinkHandling::Wikilink);
    }
}
