//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ExportFormatKind, LinkHandling, PageHierarchy};

pub mod commands;

/// nbexport - incremental exporter for hierarchical notebooks
#[derive(Parser, Debug)]
#[command(name = "nbexport", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (default: ~/.nbexport/config.json)
    #[arg(long, global = true, env = "NBEXPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export notebooks, skipping content unchanged since the last run
    Export(ExportArgs),

    /// Show what the next export would do
    Status(StatusArgs),

    /// Write a default settings file
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Export / Status Arguments
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Workspace document to read notebooks from
    pub source: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "export")]
    pub output: PathBuf,

    /// Only export the notebook with this title or id
    #[arg(long)]
    pub notebook: Option<String>,

    /// Only export sections with this title
    #[arg(long)]
    pub section: Option<String>,

    /// Only export pages with this title
    #[arg(long)]
    pub page: Option<String>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<ExportFormatKind>,

    /// Ignore the manifest and export everything
    #[arg(long)]
    pub full: bool,

    /// Keep output of pages deleted from the source
    #[arg(long)]
    pub no_cleanup: bool,

    /// Sub-page layout
    #[arg(long, value_enum)]
    pub hierarchy: Option<PageHierarchy>,

    /// Cross-page link handling
    #[arg(long, value_enum)]
    pub links: Option<LinkHandling>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Workspace document to read notebooks from
    pub source: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "export")]
    pub output: PathBuf,

    /// Only report the notebook with this title or id
    #[arg(long)]
    pub notebook: Option<String>,

    /// Output format the export would use
    #[arg(long, value_enum)]
    pub format: Option<ExportFormatKind>,
}
