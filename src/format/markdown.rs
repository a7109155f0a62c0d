//! Markdown file tree output.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::{OutputFormat, PathContext, relative_to};
use crate::config::{ExportFormatKind, ExportSettings, LinkHandling, PageHierarchy};
use crate::model::{Page, sanitize_file_name, to_manifest_path};
use crate::source::RenderError;

/// One `.md` file per page, in directories mirroring the section hierarchy.
#[derive(Debug, Clone)]
pub struct MarkdownFormat {
    settings: ExportSettings,
}

#[derive(Serialize)]
struct FrontMatter<'a> {
    title: &'a str,
    created: String,
    updated: String,
}

impl MarkdownFormat {
    #[must_use]
    pub fn new(settings: ExportSettings) -> Self {
        Self { settings }
    }

    fn file_name(&self, title: &str) -> String {
        format!(
            "{}.md",
            sanitize_file_name(title, self.settings.max_file_name_length)
        )
    }

    fn format_date(&self, page: &Page, date: DateTime<Utc>) -> Result<String, RenderError> {
        let mut out = String::new();
        write!(out, "{}", date.format(&self.settings.front_matter_date_format)).map_err(|_| {
            RenderError::Failed {
                title: page.title.clone(),
                message: format!(
                    "invalid front matter date format '{}'",
                    self.settings.front_matter_date_format
                ),
            }
        })?;
        Ok(out)
    }
}

impl OutputFormat for MarkdownFormat {
    fn kind(&self) -> ExportFormatKind {
        ExportFormatKind::Markdown
    }

    fn includes_section_groups(&self) -> bool {
        false
    }

    fn page_path(&self, page: &Page, ctx: &PathContext<'_>) -> PathBuf {
        let file_name = self.file_name(&page.title);
        let parent_path = page
            .parent_page
            .as_ref()
            .and_then(|id| ctx.assigned.get(id));

        match (self.settings.page_hierarchy, parent_path) {
            (PageHierarchy::FolderTree, Some(parent)) => parent.with_extension("").join(file_name),
            (PageHierarchy::TitlePrefix, Some(parent)) => {
                let stem = parent
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let name = format!(
                    "{stem}{}{file_name}",
                    self.settings.page_title_prefix_separator
                );
                match parent.parent() {
                    Some(dir) => dir.join(name),
                    None => PathBuf::from(name),
                }
            }
            _ => {
                let dir = ctx
                    .sections
                    .get(&page.container_id)
                    .map(|s| s.relative_dir(self.settings.max_file_name_length))
                    .unwrap_or_default();
                dir.join(file_name)
            }
        }
    }

    fn finalize_page(&self, page: &Page, body: &str) -> Result<String, RenderError> {
        if !self.settings.front_matter {
            return Ok(body.to_string());
        }

        let header = FrontMatter {
            title: &page.title,
            created: self.format_date(page, page.created)?,
            updated: self.format_date(page, page.last_modified)?,
        };
        let yaml = serde_yaml::to_string(&header).map_err(|e| RenderError::Failed {
            title: page.title.clone(),
            message: format!("front matter: {e}"),
        })?;

        Ok(format!("---\n{yaml}---\n\n{body}"))
    }

    fn render_link(&self, text: &str, target: &Path, _node_id: &str, from: &Path) -> String {
        if self.settings.link_handling == LinkHandling::Wikilink {
            let path = to_manifest_path(&target.with_extension(""));
            return if path == text {
                format!("[[{path}]]")
            } else {
                format!("[[{path}|{text}]]")
            };
        }

        let relative = to_manifest_path(&relative_to(target, from)).replace(' ', "%20");
        format!("[{text}]({relative})")
    }
}
