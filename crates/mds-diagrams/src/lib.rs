//! Mermaid diagram pre-rendering for Markdown documents.
//!
//! This crate finds Mermaid blocks in a Markdown document, renders each one
//! to an image file and replaces the block with an image reference:
//! - [`BlockScanner`] finds fenced and directive blocks with optional YAML headers
//! - [`ConfigResolver`] merges block, theme and run configuration
//! - [`RenderOrchestrator`] renders blocks sequentially or on a rayon pool
//! - [`DocumentRewriter`] replaces rendered blocks in a single pass
//! - [`DocumentProcessor`] runs the whole pipeline for one file
//!
//! # Architecture
//!
//! The crate is organized into modules:
//! - `block`: Data model (`DiagramBlock`, `BlockConfig`)
//! - `header`: Embedded YAML header parsing
//! - `scanner`: Block discovery
//! - `resolver`: Render option precedence
//! - `key`: Content-based artifact naming
//! - `backend`: `RenderBackend` trait and the Mermaid CLI implementation
//! - `convert`: `FormatConverter` trait and the `pdftocairo` implementation
//! - `orchestrator`: Sequential and concurrent rendering
//! - `rewriter`: Offset-based document rewriting
//! - `processor`: Read, render, rewrite, write
//!
//! # Example
//!
//! ```ignore
//! use mds_config::Config;
//! use mds_diagrams::{DocumentProcessor, MermaidCli, Pdftocairo};
//! use mds_themes::ThemeCatalog;
//!
//! let config = Config::load(None, None)?;
//! let catalog = ThemeCatalog::scan(&config.run.theme_dirs);
//! let backend = MermaidCli::from_run_config(&config.run);
//! let converter = Pdftocairo::new();
//!
//! let summary = DocumentProcessor::new(&config.run, &catalog, &backend, &converter)
//!     .process(Path::new("README.md"))?;
//! println!("{} of {} diagrams rendered", summary.succeeded, summary.total);
//! ```

mod backend;
mod block;
mod command;
mod consts;
mod convert;
mod header;
mod key;
mod orchestrator;
mod processor;
mod request;
mod resolver;
mod rewriter;
mod scanner;

pub use backend::{BackendError, MermaidCli, RenderBackend};
pub use block::{BlockConfig, DiagramBlock};
pub use convert::{ConvertError, ConvertTarget, FormatConverter, Pdftocairo};
pub use header::HeaderError;
pub use key::ArtifactKey;
pub use orchestrator::{RenderError, RenderErrorKind, RenderOrchestrator, RenderResult};
pub use processor::{DocumentProcessor, ProcessError, ProcessSummary};
pub use request::ResolvedRenderRequest;
pub use resolver::ConfigResolver;
pub use rewriter::DocumentRewriter;
pub use scanner::BlockScanner;
