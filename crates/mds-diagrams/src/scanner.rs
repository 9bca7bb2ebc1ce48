//! Mermaid block discovery.
//!
//! Three conventions are recognized, each matched independently over the
//! whole document:
//!
//! 1. Fenced blocks: ` ```mermaid ` directly followed by a newline.
//! 2. Fenced blocks tolerating whitespace after the info string and before
//!    the closing fence.
//! 3. Directive blocks: `:::mermaid` ... `:::`.
//!
//! Results keep the order of the conventions above. A match from a later
//! convention is dropped when it is the same occurrence as an accepted block
//! or overlaps one.

use std::sync::LazyLock;

use regex::Regex;

use crate::block::DiagramBlock;
use crate::header::split_header;

static FENCED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```mermaid\n(.*?)\n```").unwrap());

static FENCED_LOOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```mermaid\s*\n(.*?)\n\s*```").unwrap());

static DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s):::mermaid\s*\n(.*?)\n:::").unwrap());

/// Finds Mermaid blocks in Markdown text.
///
/// Scanning is a pure function of the text: the same input always yields the
/// same blocks in the same order.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockScanner;

impl BlockScanner {
    /// Create a new scanner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Scan a document and return its diagram blocks.
    #[must_use]
    pub fn scan(&self, text: &str) -> Vec<DiagramBlock> {
        let mut blocks = scan_convention(text, &FENCED_RE);

        for re in [&*FENCED_LOOSE_RE, &*DIRECTIVE_RE] {
            for block in scan_convention(text, re) {
                if blocks.contains(&block) {
                    continue;
                }
                if let Some(existing) = blocks.iter().find(|b| overlaps(b, &block)) {
                    tracing::debug!(
                        line_start = block.line_start,
                        line_end = block.line_end,
                        overlapping = existing.line_start,
                        "Skipping block overlapping an earlier match"
                    );
                    continue;
                }
                blocks.push(block);
            }
        }

        for block in &blocks {
            tracing::debug!(
                line_start = block.line_start,
                line_end = block.line_end,
                brief = %block.brief(),
                "Found diagram block"
            );
        }

        blocks
    }
}

fn scan_convention(text: &str, re: &Regex) -> Vec<DiagramBlock> {
    re.captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let body = caps.get(1)?;
            let line_start = line_number(text, whole.start());
            let line_end = line_number(text, whole.end());
            let (config, content) = split_header(body.as_str(), line_start);
            Some(DiagramBlock {
                content,
                config,
                line_start,
                line_end,
            })
        })
        .collect()
}

/// 1-based line number of a byte offset.
fn line_number(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

fn overlaps(a: &DiagramBlock, b: &DiagramBlock) -> bool {
    a.line_start <= b.line_end && b.line_start <= a.line_end
}
