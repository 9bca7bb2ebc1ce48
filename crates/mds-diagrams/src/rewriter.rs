//! Document rewriting.
//!
//! Each successfully rendered block is replaced by a single Markdown image
//! line. Block line numbers refer to the original document, so a running
//! count of removed lines maps them onto the partially rewritten line array.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use crate::orchestrator::RenderResult;

/// Replaces rendered blocks with image references.
#[derive(Debug, Clone)]
pub struct DocumentRewriter {
    output_dir: PathBuf,
}

impl DocumentRewriter {
    /// Create a rewriter producing links relative to `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Rewrite `text`, replacing every successful block with an image line.
    ///
    /// Failed blocks are left untouched. Results may be given in any order.
    #[must_use]
    pub fn rewrite(&self, text: &str, results: &[RenderResult<'_>]) -> String {
        let mut lines: Vec<Cow<'_, str>> = text.split('\n').map(Cow::Borrowed).collect();

        let mut ordered: Vec<_> = results.iter().collect();
        ordered.sort_by_key(|r| r.block.line_start);

        // Every replacement collapses one or more lines into one, so the
        // offset from original to current coordinates only ever shrinks
        let mut removed = 0;
        let mut last_end = 0;

        for result in ordered {
            let block = result.block;
            let Some(artifact) = result.artifact() else {
                tracing::warn!(
                    line = block.line_start,
                    brief = %block.brief(),
                    "Diagram failed to render, keeping original block"
                );
                continue;
            };
            if block.line_start <= last_end {
                tracing::warn!(line = block.line_start, "Skipping overlapping block");
                continue;
            }

            let start = block.line_start - 1 - removed;
            let end = block.line_end - 1 - removed;
            if end >= lines.len() || start > end {
                tracing::warn!(
                    line_start = block.line_start,
                    line_end = block.line_end,
                    "Block lies outside the document, skipping"
                );
                continue;
            }

            let mut replacement = image_line(block.config.caption.as_deref(), &self.link(artifact));
            if lines[end].ends_with('\r') {
                replacement.push('\r');
            }
            lines.splice(start..=end, [Cow::Owned(replacement)]);

            removed += end - start;
            last_end = block.line_end;
        }

        lines.join("\n")
    }

    /// Artifact path relative to the output directory, with `/` separators.
    ///
    /// Artifacts outside the output directory are linked by their full path.
    fn link(&self, artifact: &Path) -> String {
        let Ok(relative) = artifact.strip_prefix(&self.output_dir) else {
            return artifact.display().to_string();
        };
        relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                Component::ParentDir => Some(Cow::Borrowed("..")),
                Component::RootDir | Component::Prefix(_) | Component::CurDir => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn image_line(caption: Option<&str>, link: &str) -> String {
    format!("![{}]({link})", caption.unwrap_or(""))
}
