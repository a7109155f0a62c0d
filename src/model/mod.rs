//! Data models for the notebook hierarchy.
//!
//! This module contains the live, in-memory view of a source workspace:
//! - Notebook
//! - Section (and section groups)
//! - Page
//!
//! These are what the hierarchy provider returns on every run. The persisted
//! counterparts live in [`crate::sync`] as manifest entries.

pub mod naming;
pub mod notebook;
pub mod page;

pub use naming::{sanitize_file_name, to_manifest_path};
pub use notebook::{Notebook, Section};
pub use page::Page;
