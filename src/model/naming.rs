//! File-name helpers shared by the output formats and the manifest.

use std::path::{Component, Path};

/// Characters that are unsafe in file names on at least one common platform.
const INVALID_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Sanitize a title for use as a file or directory name.
///
/// Invalid characters and control characters become `_`, surrounding
/// whitespace and trailing dots are dropped, and the result is truncated to
/// `max_len` characters. An empty result falls back to `"untitled"`.
#[must_use]
pub fn sanitize_file_name(title: &str, max_len: usize) -> String {
    let sanitized: String = title
        .trim()
        .chars()
        .map(|c| {
            if INVALID_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .take(max_len.max(1))
        .collect();

    let sanitized = sanitized.trim_end().trim_end_matches('.').trim_end();

    if sanitized.is_empty() {
        "untitled".to_string()
    } else {
        sanitized.to_string()
    }
}

/// Render a relative path the way it is stored in the manifest.
///
/// Always uses forward slashes so manifests stay portable across platforms.
#[must_use]
pub fn to_manifest_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
