//! Format conversion for intermediate PDF renders.
//!
//! The `enhanced-svg` output format is produced by rendering a PDF first and
//! converting its first page with poppler's `pdftocairo`.
//!
//! [`FormatConverter`] also accepts raster targets so library callers can turn
//! a rendered PDF into a PNG at a chosen resolution. The document pipeline
//! itself only requests [`ConvertTarget::Svg`].

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::command::{self, CommandError};
use crate::consts::CONVERT_DPI;

/// Conversion target.
///
/// `Png` is available to direct callers of a [`FormatConverter`]; rendering
/// a document never converts to a raster format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertTarget {
    Svg,
    Png { dpi: u32 },
}

impl ConvertTarget {
    /// PNG at the default conversion resolution.
    #[must_use]
    pub fn png() -> Self {
        Self::Png { dpi: CONVERT_DPI }
    }
}

/// Format conversion error.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("converter failed: {0}")]
    Command(String),
    #[error("converter exited with code {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CommandError> for ConvertError {
    fn from(err: CommandError) -> Self {
        Self::Command(err.to_string())
    }
}

/// Converts one page of a PDF into another format.
pub trait FormatConverter: Send + Sync {
    /// Convert `page` (1-based) of the PDF at `input`, writing `output`.
    fn convert(
        &self,
        input: &Path,
        page: u32,
        output: &Path,
        target: ConvertTarget,
    ) -> Result<(), ConvertError>;
}

/// Converter backed by poppler's `pdftocairo`.
#[derive(Debug, Clone)]
pub struct Pdftocairo {
    program: String,
    timeout: Option<Duration>,
}

impl Default for Pdftocairo {
    fn default() -> Self {
        Self {
            program: "pdftocairo".to_owned(),
            timeout: None,
        }
    }
}

impl Pdftocairo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the conversion timeout (`None` waits indefinitely).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn args(input: &Path, page: u32, output: &Path, target: ConvertTarget) -> Vec<String> {
        let page = page.to_string();
        let mut args = match target {
            ConvertTarget::Svg => vec!["-svg".to_owned()],
            ConvertTarget::Png { dpi } => vec![
                "-png".to_owned(),
                "-r".to_owned(),
                dpi.to_string(),
                "-singlefile".to_owned(),
            ],
        };
        args.extend([
            "-f".to_owned(),
            page.clone(),
            "-l".to_owned(),
            page,
            input.display().to_string(),
        ]);

        // With -singlefile, pdftocairo appends the extension itself
        let output = match target {
            ConvertTarget::Svg => output.to_path_buf(),
            ConvertTarget::Png { .. } => output.with_extension(""),
        };
        args.push(output.display().to_string());
        args
    }
}

impl FormatConverter for Pdftocairo {
    fn convert(
        &self,
        input: &Path,
        page: u32,
        output: &Path,
        target: ConvertTarget,
    ) -> Result<(), ConvertError> {
        let args = Self::args(input, page, output, target);
        tracing::debug!(program = %self.program, args = ?args, "Converting PDF page");

        let mut cmd = Command::new(&self.program);
        cmd.args(&args);
        let result = command::run(cmd, self.timeout)?;

        if !result.success {
            return Err(ConvertError::Exit {
                code: result.code,
                stderr: result.stderr.trim().to_owned(),
            });
        }
        if !output.exists() {
            return Err(ConvertError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("converter produced no file at {}", output.display()),
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_svg_args() {
        let args = Pdftocairo::args(
            Path::new("in.pdf"),
            1,
            Path::new("out/abc.svg"),
            ConvertTarget::Svg,
        );

        assert_eq!(args, vec!["-svg", "-f", "1", "-l", "1", "in.pdf", "out/abc.svg"]);
    }

    #[test]
    fn test_png_args_strip_extension() {
        let args = Pdftocairo::args(
            Path::new("in.pdf"),
            1,
            Path::new("out/abc.png"),
            ConvertTarget::png(),
        );

        assert_eq!(
            args,
            vec!["-png", "-r", "300", "-singlefile", "-f", "1", "-l", "1", "in.pdf", "out/abc"]
        );
    }

    #[test]
    fn test_missing_program_is_error() {
        let converter = Pdftocairo {
            program: "mds-no-such-converter".to_owned(),
            timeout: None,
        };

        let err = converter
            .convert(
                Path::new("in.pdf"),
                1,
                Path::new("out.svg"),
                ConvertTarget::Svg,
            )
            .unwrap_err();

        assert!(matches!(err, ConvertError::Command(_)));
    }
}
