//! Colored terminal output utilities.

use console::{Style, Term};
use mds_diagrams::ProcessSummary;

/// Width of separator lines.
const SEPARATOR_WIDTH: usize = 60;

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    cyan_bold: Style,
    dim: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            cyan_bold: Style::new().cyan().bold(),
            dim: Style::new().dim(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print a highlighted message (cyan bold).
    pub(crate) fn highlight(&self, msg: &str) {
        let _ = self
            .term
            .write_line(&self.cyan_bold.apply_to(msg).to_string());
    }

    /// Print a `label: value` line with a dimmed label.
    pub(crate) fn field(&self, label: &str, value: &str) {
        let label = format!("{label}:");
        let _ = self.term.write_line(&format!(
            "  {} {value}",
            self.dim.apply_to(format!("{label:<11}"))
        ));
    }

    /// Print a separator line.
    pub(crate) fn separator(&self) {
        let _ = self.term.write_line(&"=".repeat(SEPARATOR_WIDTH));
    }

    /// Print the end-of-run summary between separator lines.
    pub(crate) fn summary(&self, summary: &ProcessSummary) {
        self.separator();
        self.highlight("Summary");
        self.field("Total", &summary.total.to_string());
        self.field(
            "Succeeded",
            &self.green.apply_to(summary.succeeded).to_string(),
        );
        let failed = if summary.failed > 0 {
            self.red.apply_to(summary.failed).to_string()
        } else {
            summary.failed.to_string()
        };
        self.field("Failed", &failed);
        self.field("Output", &summary.output_file.display().to_string());
        self.separator();
    }
}
