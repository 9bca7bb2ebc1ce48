//! Fully resolved render options for one block.

use std::path::PathBuf;

use mds_config::{OutputFormat, ThemeChoice};
use serde::Serialize;

/// Backend-ready options for one diagram.
///
/// Produced by [`ConfigResolver`](crate::ConfigResolver). Unset optional
/// fields mean "use the render backend's default". The theme is either a
/// built-in theme or a custom theme name, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRenderRequest {
    pub theme: ThemeChoice,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub background_color: Option<String>,
    pub scale: Option<f64>,
    /// Final artifact format (not the backend's intermediate format).
    pub output_format: OutputFormat,
    pub config_file: Option<PathBuf>,
    pub css_file: Option<PathBuf>,
    pub pdf_fit: bool,
    pub element_id: Option<String>,
}
