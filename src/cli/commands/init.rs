//! Write a default settings file.
//!
//! The file lands at the resolved config location (`--config`,
//! `NBEXPORT_CONFIG`, or `~/.nbexport/config.json`) and holds every
//! setting with its default value, ready for editing.

use crate::config::{ExportSettings, resolve_config_path, save_settings};
use crate::error::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct InitOutput {
    path: PathBuf,
    settings: ExportSettings,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if the config location cannot be determined, a file
/// already exists there and `force` is not set, or the file cannot be written.
pub fn execute(config: Option<&Path>, force: bool, json: bool) -> Result<()> {
    let path = resolve_config_path(config).ok_or_else(|| {
        Error::Config("Could not determine the settings file location".to_string())
    })?;

    if path.exists() && !force {
        return Err(Error::AlreadyInitialized { path });
    }

    let settings = ExportSettings::default();
    save_settings(&settings, &path)?;
    tracing::info!(path = %path.display(), "Wrote default settings");

    if json {
        let output = InitOutput { path, settings };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized nbexport settings");
        println!("  Config: {}", path.display());
    }

    Ok(())
}
