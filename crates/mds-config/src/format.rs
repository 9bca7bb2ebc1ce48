//! Output format and render backend command selection.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Error returned when a configuration choice string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (valid: {valid})")]
pub struct ParseChoiceError {
    kind: &'static str,
    value: String,
    valid: &'static str,
}

impl ParseChoiceError {
    pub(crate) fn new(kind: &'static str, value: &str, valid: &'static str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
            valid,
        }
    }
}

/// Final artifact format requested for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// SVG produced directly by the backend.
    #[default]
    Svg,
    /// PNG produced directly by the backend.
    Png,
    /// PDF produced directly by the backend.
    Pdf,
    /// SVG converted from a backend-rendered PDF (keeps text as outlines).
    EnhancedSvg,
}

impl OutputFormat {
    /// All formats, in display order.
    pub const ALL: [Self; 4] = [Self::Svg, Self::Png, Self::Pdf, Self::EnhancedSvg];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Pdf => "pdf",
            Self::EnhancedSvg => "enhanced-svg",
        }
    }

    /// Format the render backend is asked to produce.
    ///
    /// `EnhancedSvg` cannot be produced directly, so the backend renders a PDF
    /// that is converted afterwards.
    #[must_use]
    pub fn backend_format(self) -> Self {
        match self {
            Self::EnhancedSvg => Self::Pdf,
            other => other,
        }
    }

    /// Whether a conversion step is needed after the backend has run.
    #[must_use]
    pub fn needs_conversion(self) -> bool {
        self.backend_format() != self
    }

    /// File extension of the final artifact.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg | Self::EnhancedSvg => "svg",
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            "enhanced-svg" | "enhanced_svg" => Ok(Self::EnhancedSvg),
            _ => Err(ParseChoiceError::new(
                "output format",
                s,
                "svg, png, pdf, enhanced-svg",
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Package runner used to launch the Mermaid CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendCommand {
    /// Prefer `pnpx` when it is on `PATH`, otherwise `npx`.
    #[default]
    Auto,
    Npx,
    Pnpx,
}

impl BackendCommand {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Npx => "npx",
            Self::Pnpx => "pnpx",
        }
    }
}

impl FromStr for BackendCommand {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "npx" => Ok(Self::Npx),
            "pnpx" => Ok(Self::Pnpx),
            _ => Err(ParseChoiceError::new("backend command", s, "auto, npx, pnpx")),
        }
    }
}

impl fmt::Display for BackendCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
