//! `mds render` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use mds_config::{BackendCommand, BuiltinTheme, CliSettings, Config, OutputFormat, ThemeChoice};
use mds_diagrams::{DocumentProcessor, MermaidCli, Pdftocairo};
use mds_themes::ThemeCatalog;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args, Debug)]
pub(crate) struct RenderArgs {
    /// Markdown document to process.
    input: PathBuf,

    /// Path to configuration file (default: auto-discover mds.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format: svg, png, pdf or enhanced-svg (overrides config).
    #[arg(short = 'f', long)]
    format: Option<OutputFormat>,

    /// Built-in theme name or custom theme from a themes directory.
    #[arg(short, long)]
    theme: Option<String>,

    /// Diagram width in pixels.
    #[arg(short, long)]
    width: Option<u32>,

    /// Diagram height in pixels.
    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Background color, e.g. `white` or `transparent`.
    #[arg(short, long)]
    background_color: Option<String>,

    /// Render scale factor.
    #[arg(short, long)]
    scale: Option<f64>,

    /// Mermaid JSON config file passed to every diagram.
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// CSS file passed to every diagram.
    #[arg(long)]
    css_file: Option<PathBuf>,

    /// Fit PDF output to the diagram size.
    #[arg(long)]
    pdf_fit: bool,

    /// Render diagrams on a worker pool.
    #[arg(long)]
    concurrent: bool,

    /// Render diagrams one after another.
    #[arg(long, conflicts_with = "concurrent")]
    sequential: bool,

    /// Worker count for concurrent rendering (values below 1 use the CPU count).
    #[arg(short = 'j', long, allow_negative_numbers = true)]
    max_workers: Option<i64>,

    /// Additional custom theme directory, searched before configured ones.
    #[arg(long = "themes-dir", value_name = "DIR")]
    themes_dirs: Vec<PathBuf>,

    /// Package runner: auto, npx or pnpx (overrides config).
    #[arg(long)]
    backend: Option<BackendCommand>,

    /// Per-diagram timeout in seconds, 0 disables it (overrides config).
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is missing, configuration fails, or the
    /// output cannot be written. Individual diagram failures are reported in
    /// the summary instead.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        validate_input(&self.input)?;

        let cli_settings = self.cli_settings();
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let run = &config.run;
        tracing::debug!(?run, "Resolved run configuration");

        let catalog = ThemeCatalog::scan(&run.theme_dirs);
        if let Some(message) = missing_theme_message(&run.theme, &catalog) {
            output.warning(&message);
        }

        let backend = MermaidCli::from_run_config(run);
        let converter = Pdftocairo::new().with_timeout(run.render_timeout);

        output.info(&format!("Rendering {}", self.input.display()));
        if let Some(path) = &config.config_path {
            output.info(&format!("Config: {}", path.display()));
        }
        output.info(&format!("Output directory: {}", run.output_dir.display()));
        output.info(&format!("Format: {}, theme: {}", run.output_format, run.theme));
        if run.concurrent {
            output.info(&format!("Workers: {}", run.max_workers));
        }
        output.info(&format!("Backend: {} {}", backend.runner(), run.cli_package));

        let summary = DocumentProcessor::new(run, &catalog, &backend, &converter)
            .process(&self.input)?;

        output.summary(&summary);
        if summary.failed > 0 {
            output.warning(&format!(
                "{} of {} diagrams failed to render",
                summary.failed, summary.total
            ));
        } else if summary.total > 0 {
            output.success("All diagrams rendered");
        }

        Ok(())
    }

    /// Collect every flag that overrides the configuration file.
    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            output_dir: self.output_dir.clone(),
            output_format: self.format,
            theme: self.theme.as_deref().map(ThemeChoice::parse),
            width: self.width,
            height: self.height,
            background_color: self.background_color.clone(),
            scale: self.scale,
            config_file: self.config_file.clone(),
            css_file: self.css_file.clone(),
            pdf_fit: self.pdf_fit.then_some(true),
            concurrent: self.resolve_concurrent(),
            max_workers: self.max_workers,
            theme_dirs: self.themes_dirs.clone(),
            backend_command: self.backend,
            timeout_secs: self.timeout,
        }
    }

    /// Resolve `concurrent` from --concurrent/--sequential flags.
    fn resolve_concurrent(&self) -> Option<bool> {
        if self.sequential {
            Some(false)
        } else {
            self.concurrent.then_some(true)
        }
    }
}

fn validate_input(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::Validation(format!(
            "Input file not found: {}",
            input.display()
        )));
    }
    if !input.is_file() {
        return Err(CliError::Validation(format!(
            "Input path is not a file: {}",
            input.display()
        )));
    }
    Ok(())
}

/// Warning text for a run-level custom theme missing from the catalog.
fn missing_theme_message(theme: &ThemeChoice, catalog: &ThemeCatalog) -> Option<String> {
    let name = theme.custom()?;
    if catalog.exists(name) {
        return None;
    }

    let builtin: Vec<&str> = BuiltinTheme::ALL.iter().map(|t| t.as_str()).collect();
    let custom: Vec<&str> = catalog.list_available().collect();
    let custom = if custom.is_empty() {
        "none".to_owned()
    } else {
        custom.join(", ")
    };

    Some(format!(
        "Theme '{name}' not found, falling back to '{}'. Built-in themes: {}. Custom themes: {custom}",
        BuiltinTheme::default(),
        builtin.join(", ")
    ))
}
