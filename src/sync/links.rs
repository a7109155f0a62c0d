//! Cross-page link resolution.
//!
//! Rendered pages reference other pages with source-specific markup:
//! `[display text](onenote:...page-id={KEY}...)`. The registry maps each
//! page's stable cross-reference key to where that page ends up in the
//! output, and rewrites the markup once every path in the notebook is known.
//!
//! The registry lives for one export run and is owned by it.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::config::LinkHandling;

static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(?<text>[^\]]+)\]\(onenote:(?<url>[^\)]+)\)").expect("valid link pattern")
});

static PAGE_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)page-id=\{([^}]+)\}").expect("valid page id pattern"));

/// Where a linked page was exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    /// Deterministic node id of the page
    pub node_id: String,
    /// Stable source id of the page
    pub original_id: String,
    /// Cross-reference key as given by the source
    pub stable_key: String,
    /// Output path relative to the notebook export root
    pub output_path: PathBuf,
    pub title: String,
}

/// Table of link targets keyed by normalized cross-reference key.
#[derive(Debug, Default)]
pub struct LinkRegistry {
    entries: HashMap<String, LinkTarget>,
    handling: LinkHandling,
}

/// Keys are compared without braces and case-insensitively.
fn normalize_key(key: &str) -> String {
    key.trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .to_ascii_lowercase()
}

impl LinkRegistry {
    #[must_use]
    pub fn new(handling: LinkHandling) -> Self {
        Self {
            entries: HashMap::new(),
            handling,
        }
    }

    /// Register a page's output location. Last writer wins.
    pub fn register(
        &mut self,
        node_id: &str,
        original_id: &str,
        stable_key: &str,
        output_path: &Path,
        title: &str,
    ) {
        self.entries.insert(
            normalize_key(stable_key),
            LinkTarget {
                node_id: node_id.to_string(),
                original_id: original_id.to_string(),
                stable_key: stable_key.to_string(),
                output_path: output_path.to_path_buf(),
                title: title.to_string(),
            },
        );
    }

    /// Look up a target by cross-reference key.
    #[must_use]
    pub fn lookup(&self, stable_key: &str) -> Option<&LinkTarget> {
        self.entries.get(&normalize_key(stable_key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite every cross-page reference in `text`.
    ///
    /// A resolved reference becomes `render_link(display_text, output_path,
    /// node_id)`. An unresolved one, or any reference under
    /// [`LinkHandling::Remove`], degrades to its display text. Under
    /// [`LinkHandling::Keep`] the text is returned untouched.
    pub fn resolve<F>(&self, text: &str, render_link: F) -> String
    where
        F: Fn(&str, &Path, &str) -> String,
    {
        if self.handling == LinkHandling::Keep {
            return text.to_string();
        }

        LINK_PATTERN
            .replace_all(text, |caps: &Captures<'_>| {
                let label = &caps["text"];
                if !self.handling.resolves() {
                    return label.to_string();
                }

                let target = PAGE_ID_PATTERN
                    .captures(&caps["url"])
                    .and_then(|id| self.lookup(&id[1]));

                match target {
                    Some(target) => render_link(label, &target.output_path, &target.node_id),
                    None => {
                        tracing::debug!(link = %label, "Unresolved page link, keeping text only");
                        label.to_string()
                    }
                }
            })
            .into_owned()
    }
}
