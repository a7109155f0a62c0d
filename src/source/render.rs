//! Default page renderer.

use super::{PageRenderer, RenderError};
use crate::model::Page;

/// Renderer for sources whose raw content is already Markdown.
///
/// Normalizes line endings to `\n`, strips trailing whitespace on every line
/// and guarantees exactly one trailing newline.
#[derive(Debug, Default)]
pub struct MarkdownRenderer {
    rendered: usize,
}

impl MarkdownRenderer {
    /// Number of pages rendered so far.
    #[must_use]
    pub fn rendered(&self) -> usize {
        self.rendered
    }
}

impl PageRenderer for MarkdownRenderer {
    fn render(&mut self, page: &Page, raw: &str) -> Result<String, RenderError> {
        if raw.contains('\0') {
            return Err(RenderError::Failed {
                title: page.title.clone(),
                message: "content contains NUL bytes".to_string(),
            });
        }

        let mut out = raw
            .replace("\r\n", "\n")
            .replace('\r', "\n")
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");

        let trimmed_len = out.trim_end_matches('\n').len();
        out.truncate(trimmed_len);
        out.push('\n');

        self.rendered += 1;
        Ok(out)
    }
}
