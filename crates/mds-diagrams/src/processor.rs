//! Whole-document pipeline.
//!
//! [`DocumentProcessor`] reads a Markdown file, renders its diagram blocks
//! and writes the rewritten document to the output directory:
//!
//! ```text
//! read → BlockScanner → RenderOrchestrator → DocumentRewriter → write
//! ```
//!
//! Failing to read the input or to prepare the output directory aborts the
//! run before anything is rendered. Render failures are counted in the
//! [`ProcessSummary`] and leave the affected blocks untouched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mds_config::RunConfig;
use mds_themes::ThemeCatalog;

use crate::backend::RenderBackend;
use crate::convert::FormatConverter;
use crate::orchestrator::RenderOrchestrator;
use crate::rewriter::DocumentRewriter;
use crate::scanner::BlockScanner;

/// Document-level error. Aborts processing.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("input path has no file name: {}", .0.display())]
    InvalidInput(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("output file would overwrite the input: {}", .0.display())]
    OverwritesInput(PathBuf),
}

/// Counts reported after processing a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Number of diagram blocks found.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Path of the rewritten document.
    pub output_file: PathBuf,
}

/// Runs the full pipeline for one document.
pub struct DocumentProcessor<'a> {
    run: &'a RunConfig,
    catalog: &'a ThemeCatalog,
    backend: &'a dyn RenderBackend,
    converter: &'a dyn FormatConverter,
    scanner: BlockScanner,
}

impl<'a> DocumentProcessor<'a> {
    #[must_use]
    pub fn new(
        run: &'a RunConfig,
        catalog: &'a ThemeCatalog,
        backend: &'a dyn RenderBackend,
        converter: &'a dyn FormatConverter,
    ) -> Self {
        Self {
            run,
            catalog,
            backend,
            converter,
            scanner: BlockScanner::new(),
        }
    }

    /// Process `input`, writing `<output_dir>/<file name>` and its artifacts.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessError`] when the input cannot be read or the output
    /// cannot be written. Individual render failures are not errors.
    pub fn process(&self, input: &Path) -> Result<ProcessSummary, ProcessError> {
        let file_name = input
            .file_name()
            .ok_or_else(|| ProcessError::InvalidInput(input.to_path_buf()))?;
        let text = fs::read_to_string(input).map_err(|source| ProcessError::Read {
            path: input.to_path_buf(),
            source,
        })?;
        tracing::info!(input = %input.display(), "Processing document");

        let blocks = self.scanner.scan(&text);
        let output_file = self.run.output_dir.join(file_name);

        create_dir(&self.run.output_dir)?;
        if is_same_file(input, &output_file) {
            return Err(ProcessError::OverwritesInput(output_file));
        }

        if blocks.is_empty() {
            tracing::warn!(input = %input.display(), "No Mermaid diagrams found, copying document unchanged");
            write(&output_file, &text)?;
            return Ok(ProcessSummary {
                total: 0,
                succeeded: 0,
                failed: 0,
                output_file,
            });
        }
        tracing::info!(blocks = blocks.len(), "Found Mermaid diagrams");

        create_dir(&self.run.media_dir())?;

        let orchestrator =
            RenderOrchestrator::new(self.run, self.catalog, self.backend, self.converter);
        let results = orchestrator.render_all(&blocks);

        let rewritten = DocumentRewriter::new(&self.run.output_dir).rewrite(&text, &results);
        write(&output_file, &rewritten)?;

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let summary = ProcessSummary {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            output_file,
        };
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            output = %summary.output_file.display(),
            "Document processed"
        );

        Ok(summary)
    }
}

fn create_dir(path: &Path) -> Result<(), ProcessError> {
    fs::create_dir_all(path).map_err(|source| ProcessError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, contents: &str) -> Result<(), ProcessError> {
    fs::write(path, contents).map_err(|source| ProcessError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
