//! Error types for nbexport.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (3=not_found, 4=validation, 6=export, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for `--json` consumers
//!
//! Page-level failures are not errors at this level: they are counted in the
//! export result and the command still succeeds.

use std::path::PathBuf;
use thiserror::Error;

use crate::source::ProviderError;
use crate::sync::SyncError;

/// Result type alias for nbexport operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Not Found (exit 3)
    NotebookNotFound,
    SourceNotFound,

    // Validation (exit 4)
    InvalidArgument,
    InvalidSource,
    AlreadyInitialized,

    // Export (exit 6)
    ExportError,
    ManifestWriteError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotebookNotFound => "NOTEBOOK_NOT_FOUND",
            Self::SourceNotFound => "SOURCE_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidSource => "INVALID_SOURCE",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::ExportError => "EXPORT_ERROR",
            Self::ManifestWriteError => "MANIFEST_WRITE_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotebookNotFound | Self::SourceNotFound => 3,
            Self::InvalidArgument | Self::InvalidSource | Self::AlreadyInitialized => 4,
            Self::ExportError | Self::ManifestWriteError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether retrying with corrected input can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument | Self::NotebookNotFound | Self::ManifestWriteError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in nbexport operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Already initialized at {}", path.display())]
    AlreadyInitialized { path: PathBuf },

    #[error("Notebook not found: {name}")]
    NotebookNotFound {
        name: String,
        /// Titles of the notebooks the source does have.
        available: Vec<String>,
    },

    #[error("Source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Source error: {0}")]
    Source(#[from] ProviderError),

    #[error("Export failed: {0}")]
    Export(#[from] SyncError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::NotebookNotFound { .. } | Self::Export(SyncError::NotebookNotFound(_)) => {
                ErrorCode::NotebookNotFound
            }
            Self::SourceNotFound { .. } => ErrorCode::SourceNotFound,
            Self::Source(_) | Self::Export(SyncError::Provider(_)) => ErrorCode::InvalidSource,
            Self::Export(SyncError::ManifestWrite { .. }) => ErrorCode::ManifestWriteError,
            Self::Export(_) => ErrorCode::ExportError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::AlreadyInitialized { path } => Some(format!(
                "Config already exists at {}. Use `--force` to overwrite it.",
                path.display()
            )),

            Self::NotebookNotFound { available, .. } => {
                if available.is_empty() {
                    Some("The source contains no notebooks.".to_string())
                } else {
                    Some(format!("Available notebooks: {}", available.join(", ")))
                }
            }

            Self::SourceNotFound { path } => Some(format!(
                "Check the path to the workspace file: {}",
                path.display()
            )),

            Self::Export(SyncError::ManifestWrite { path, .. }) => Some(format!(
                "The manifest at {} could not be saved. Check permissions and free space, \
                 then run the export again: completed pages are skipped.",
                path.display()
            )),

            Self::Config(_) => Some(
                "Fix the config file or regenerate it with `nbexport init --force`.".to_string(),
            ),

            Self::Source(_)
            | Self::Export(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
