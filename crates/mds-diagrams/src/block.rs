//! Diagram block data model.

use std::collections::BTreeMap;
use std::path::PathBuf;

use mds_config::ThemeChoice;

use crate::consts::BRIEF_MAX_CHARS;

/// Per-block configuration parsed from an embedded header.
///
/// Known keys are typed; anything else is kept verbatim in [`BlockConfig::extra`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockConfig {
    /// Image caption used as alt text in the rewritten document.
    pub caption: Option<String>,
    /// Theme requested by the block (`theme` or `render-theme` key).
    pub theme: Option<ThemeChoice>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub background_color: Option<String>,
    pub scale: Option<f64>,
    pub css_file: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    /// Id attribute of the rendered SVG element.
    pub element_id: Option<String>,
    /// Unrecognized keys, with hyphens normalized to underscores.
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// One diagram occurrence in a document.
///
/// `line_start` and `line_end` are 1-based, inclusive, and cover the whole
/// block including its fence or directive delimiters. They always refer to the
/// original document text.
#[derive(Debug, Clone)]
pub struct DiagramBlock {
    /// Diagram source with any header removed.
    pub content: String,
    pub config: BlockConfig,
    pub line_start: usize,
    pub line_end: usize,
}

/// Blocks are the same occurrence when they cover the same lines with the same
/// source; the parsed header does not take part.
impl PartialEq for DiagramBlock {
    fn eq(&self, other: &Self) -> bool {
        self.line_start == other.line_start
            && self.line_end == other.line_end
            && self.content == other.content
    }
}

impl Eq for DiagramBlock {}

/// Diagram keywords and the label shown when nothing follows them.
const DIAGRAM_LABELS: &[(&str, &str)] = &[
    ("flowchart", "Flow Chart"),
    ("graph", "Flow Chart"),
    ("sequenceDiagram", "Sequence Diagram"),
    ("classDiagram", "Class Diagram"),
    ("stateDiagram-v2", "State Diagram"),
    ("stateDiagram", "State Diagram"),
    ("erDiagram", "ER Diagram"),
    ("gantt", "Gantt Chart"),
    ("pie", "Pie Chart"),
    ("mindmap", "Mind Map"),
];

impl DiagramBlock {
    /// Short human-readable description for logs.
    ///
    /// Uses the first source line without its diagram keyword, truncated to
    /// 50 characters. Falls back to a label for the diagram type when the
    /// first line holds nothing but the keyword.
    #[must_use]
    pub fn brief(&self) -> String {
        let first_line = self.content.lines().next().unwrap_or("").trim();

        let keyword = DIAGRAM_LABELS
            .iter()
            .find(|(keyword, _)| first_line.starts_with(keyword));
        let rest = keyword.map_or(first_line, |(keyword, _)| &first_line[keyword.len()..]);
        let rest = rest.trim();

        if rest.is_empty() {
            return keyword
                .map_or("Mermaid Diagram", |(_, label)| label)
                .to_owned();
        }

        if rest.chars().count() > BRIEF_MAX_CHARS {
            let truncated: String = rest.chars().take(BRIEF_MAX_CHARS - 3).collect();
            format!("{truncated}...")
        } else {
            rest.to_owned()
        }
    }

    /// Number of document lines the block spans.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_end - self.line_start + 1
    }
}
