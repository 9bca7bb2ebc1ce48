//! Render fan-out.
//!
//! [`RenderOrchestrator`] renders every block of a document, sequentially or
//! on a bounded rayon pool, and returns one [`RenderResult`] per block in
//! input order. A failure (or panic) in one task never affects its siblings.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use mds_config::RunConfig;
use mds_themes::ThemeCatalog;
use rayon::prelude::*;

use crate::backend::{BackendError, RenderBackend, intermediate_path};
use crate::block::DiagramBlock;
use crate::convert::{ConvertError, ConvertTarget, FormatConverter};
use crate::key::ArtifactKey;
use crate::resolver::ConfigResolver;

/// Single diagram rendering error.
#[derive(Debug, thiserror::Error)]
#[error("diagram at line {line}: {kind}")]
pub struct RenderError {
    /// First line of the block in the original document.
    pub line: usize,
    pub kind: RenderErrorKind,
}

/// Kind of diagram rendering error.
#[derive(Debug, thiserror::Error)]
pub enum RenderErrorKind {
    #[error("render failed: {0}")]
    Backend(#[from] BackendError),
    #[error("conversion failed: {0}")]
    Convert(#[from] ConvertError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("render task panicked: {0}")]
    Panicked(String),
}

/// Outcome of rendering one block.
#[derive(Debug)]
pub struct RenderResult<'a> {
    pub block: &'a DiagramBlock,
    /// Path of the artifact on success.
    pub outcome: Result<PathBuf, RenderError>,
}

impl RenderResult<'_> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Artifact path, if the render succeeded.
    #[must_use]
    pub fn artifact(&self) -> Option<&Path> {
        self.outcome.as_deref().ok()
    }
}

/// Renders diagram blocks through a [`RenderBackend`].
pub struct RenderOrchestrator<'a> {
    run: &'a RunConfig,
    resolver: ConfigResolver<'a>,
    backend: &'a dyn RenderBackend,
    converter: &'a dyn FormatConverter,
}

impl<'a> RenderOrchestrator<'a> {
    #[must_use]
    pub fn new(
        run: &'a RunConfig,
        catalog: &'a ThemeCatalog,
        backend: &'a dyn RenderBackend,
        converter: &'a dyn FormatConverter,
    ) -> Self {
        Self {
            run,
            resolver: ConfigResolver::new(run, catalog),
            backend,
            converter,
        }
    }

    /// Render all blocks.
    ///
    /// Returns exactly one result per block, in the order of `blocks`,
    /// whichever mode is used. Artifacts are written to the run's media
    /// directory, which must already exist.
    pub fn render_all<'b>(&self, blocks: &'b [DiagramBlock]) -> Vec<RenderResult<'b>> {
        if !self.run.concurrent || blocks.len() <= 1 {
            return self.render_sequential(blocks);
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.run.max_workers)
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create render pool, rendering sequentially");
                return self.render_sequential(blocks);
            }
        };

        tracing::info!(
            blocks = blocks.len(),
            workers = self.run.max_workers,
            "Rendering diagrams concurrently"
        );
        // Indexed collect keeps input order regardless of completion order
        pool.install(|| blocks.par_iter().map(|block| self.render_task(block)).collect())
    }

    fn render_sequential<'b>(&self, blocks: &'b [DiagramBlock]) -> Vec<RenderResult<'b>> {
        tracing::info!(blocks = blocks.len(), "Rendering diagrams");
        blocks.iter().map(|block| self.render_task(block)).collect()
    }

    /// Render one block, turning errors and panics into a failed result.
    fn render_task<'b>(&self, block: &'b DiagramBlock) -> RenderResult<'b> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.render_one(block)))
            .unwrap_or_else(|payload| {
                Err(RenderError {
                    line: block.line_start,
                    kind: RenderErrorKind::Panicked(panic_message(payload.as_ref())),
                })
            });

        match &outcome {
            Ok(path) => tracing::debug!(
                line = block.line_start,
                brief = %block.brief(),
                artifact = %path.display(),
                "Rendered diagram"
            ),
            Err(e) => tracing::warn!(brief = %block.brief(), "{e}"),
        }

        RenderResult { block, outcome }
    }

    fn render_one(&self, block: &DiagramBlock) -> Result<PathBuf, RenderError> {
        let error = |kind: RenderErrorKind| RenderError {
            line: block.line_start,
            kind,
        };

        let request = self.resolver.resolve(block);
        tracing::debug!(line = block.line_start, request = ?request, "Resolved render options");

        let key = ArtifactKey {
            request: &request,
            source: &block.content,
        };
        let target = self.run.media_dir().join(key.file_name());

        if !request.output_format.needs_conversion() {
            self.backend
                .render(&block.content, &target, &request)
                .map_err(|e| error(e.into()))?;
            return Ok(target);
        }

        let work_dir = tempfile::tempdir().map_err(|e| error(e.into()))?;
        let intermediate = intermediate_path(work_dir.path(), &request);
        self.backend
            .render(&block.content, &intermediate, &request)
            .map_err(|e| error(e.into()))?;

        // Enhanced SVG is the only format rendered through an intermediate PDF
        self.converter
            .convert(&intermediate, 1, &target, ConvertTarget::Svg)
            .map_err(|e| error(e.into()))?;

        Ok(target)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
