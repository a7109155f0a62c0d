//! Status command implementation.

use std::path::Path;

use crate::cli::StatusArgs;
use crate::cli::commands::{open_source, select_notebooks};
use crate::config::resolve_settings;
use crate::error::Result;
use crate::format;
use crate::sync::{get_export_status, print_status};

/// Execute the status command.
///
/// Nothing is rendered or written; the manifest of each notebook is
/// compared against the live source.
///
/// # Errors
///
/// Returns an error if the settings or the source cannot be loaded, or the
/// requested notebook does not exist.
pub fn execute(args: &StatusArgs, config: Option<&Path>, json: bool) -> Result<()> {
    let mut settings = resolve_settings(config)?;
    if let Some(format) = args.format {
        settings.format = format;
    }

    let source = open_source(&args.source)?;
    let notebooks = select_notebooks(&source, args.notebook.as_deref())?;
    let output_format = format::for_settings(&settings);

    let statuses = notebooks
        .iter()
        .map(|nb| {
            get_export_status(&source, output_format.as_ref(), &settings, &args.output, nb)
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if json {
        let output = serde_json::json!({
            "outputDir": args.output.display().to_string(),
            "notebooks": statuses,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if statuses.is_empty() {
        println!("No notebooks found in {}", args.source.display());
    }
    for status in &statuses {
        print_status(status);
    }

    Ok(())
}
