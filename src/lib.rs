//! nbexport - incremental notebook exporter
//!
//! This crate provides the core functionality for the `nbexport` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (Notebook, Section, Page) and file naming
//! - [`source`] - Hierarchy provider and page renderer seams
//! - [`format`] - Output formats (Markdown tree, Joplin raw directory)
//! - [`sync`] - Manifest, diffing, checkpointed export and link resolution
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod model;
pub mod source;
pub mod sync;

pub use error::{Error, Result};
