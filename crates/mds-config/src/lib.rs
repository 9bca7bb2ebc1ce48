//! Configuration management for mds.
//!
//! Parses `mds.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. The result of loading
//! is a single [`RunConfig`] that every pipeline component borrows.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `output.dir`
//! - `render.config_file`
//! - `render.css_file`
//! - `themes.dirs`
//! - `backend.package`

mod expand;
mod format;
mod theme;

pub use format::{BackendCommand, OutputFormat, ParseChoiceError};
pub use theme::{BuiltinTheme, ThemeChoice};

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
    /// Override output format.
    pub output_format: Option<OutputFormat>,
    /// Override run-level theme.
    pub theme: Option<ThemeChoice>,
    /// Override default diagram width.
    pub width: Option<u32>,
    /// Override default diagram height.
    pub height: Option<u32>,
    /// Override default background color.
    pub background_color: Option<String>,
    /// Override default scale factor.
    pub scale: Option<f64>,
    /// Override global Mermaid JSON config file.
    pub config_file: Option<PathBuf>,
    /// Override global CSS file.
    pub css_file: Option<PathBuf>,
    /// Override pdf-fit flag.
    pub pdf_fit: Option<bool>,
    /// Override concurrent rendering flag.
    pub concurrent: Option<bool>,
    /// Override worker count (zero or negative means host parallelism).
    pub max_workers: Option<i64>,
    /// Theme directories searched before the configured ones.
    pub theme_dirs: Vec<PathBuf>,
    /// Override package runner.
    pub backend_command: Option<BackendCommand>,
    /// Override render timeout in seconds (zero disables the timeout).
    pub timeout_secs: Option<u64>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mds.toml";

/// Mermaid CLI package, pinned unless `MERMAID_CLI_VERSION` says otherwise.
const DEFAULT_PACKAGE: &str = "@mermaid-js/mermaid-cli@${MERMAID_CLI_VERSION:-11.4.2}";

/// Default per-diagram render timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Worker count used when the host parallelism cannot be queried.
const FALLBACK_WORKERS: usize = 4;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output configuration (paths are relative strings from TOML).
    output: OutputConfigRaw,
    /// Run-level render defaults.
    render: RenderConfigRaw,
    /// Concurrency configuration.
    concurrency: ConcurrencyConfigRaw,
    /// Theme search configuration.
    themes: ThemesConfigRaw,
    /// Render backend configuration.
    backend: BackendConfigRaw,

    /// Resolved run configuration (set after loading).
    #[serde(skip)]
    pub run: RunConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OutputConfigRaw {
    dir: Option<String>,
    format: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RenderConfigRaw {
    theme: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    background_color: Option<String>,
    scale: Option<f64>,
    config_file: Option<String>,
    css_file: Option<String>,
    pdf_fit: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConcurrencyConfigRaw {
    enabled: Option<bool>,
    max_workers: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ThemesConfigRaw {
    dirs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BackendConfigRaw {
    command: Option<String>,
    package: Option<String>,
    timeout_secs: Option<u64>,
}

/// Resolved, read-only configuration for one invocation.
///
/// Built once by [`Config::load`] and passed by reference to every component
/// that needs a default.
#[derive(Debug)]
pub struct RunConfig {
    /// Directory receiving the rewritten document and the `media/` folder.
    pub output_dir: PathBuf,
    /// Final artifact format.
    pub output_format: OutputFormat,
    /// Whether blocks are rendered on a worker pool.
    pub concurrent: bool,
    /// Worker pool size (always at least 1).
    pub max_workers: usize,
    /// Run-level theme.
    pub theme: ThemeChoice,
    /// Default diagram width in pixels.
    pub width: Option<u32>,
    /// Default diagram height in pixels.
    pub height: Option<u32>,
    /// Default background color.
    pub background_color: Option<String>,
    /// Default scale factor.
    pub scale: Option<f64>,
    /// Global Mermaid JSON config file.
    pub config_file: Option<PathBuf>,
    /// Global CSS file.
    pub css_file: Option<PathBuf>,
    /// Fit PDF output to the diagram size.
    pub pdf_fit: bool,
    /// Directories scanned for custom themes, highest priority first.
    pub theme_dirs: Vec<PathBuf>,
    /// Package runner used to launch the Mermaid CLI.
    pub backend_command: BackendCommand,
    /// Mermaid CLI package specifier.
    pub cli_package: String,
    /// Per-diagram render timeout (`None` waits indefinitely).
    pub render_timeout: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

impl RunConfig {
    /// Create default run configuration with paths relative to `base`.
    #[must_use]
    pub fn default_with_base(base: &Path) -> Self {
        Self {
            output_dir: base.join("output"),
            output_format: OutputFormat::default(),
            concurrent: false,
            max_workers: default_workers(),
            theme: ThemeChoice::default(),
            width: None,
            height: None,
            background_color: None,
            scale: None,
            config_file: None,
            css_file: None,
            pdf_fit: false,
            theme_dirs: vec![base.join("themes")],
            backend_command: BackendCommand::default(),
            cli_package: default_package(),
            render_timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }

    /// Directory receiving rendered artifacts (`<output_dir>/media`).
    #[must_use]
    pub fn media_dir(&self) -> PathBuf {
        self.output_dir.join("media")
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`backend.package`").
        field: String,
        /// Error message (e.g., "${`MERMAID_CLI_VERSION`} not set").
        message: String,
    },
}

/// Normalize a requested worker count.
///
/// Zero or negative counts select the host's available parallelism.
#[must_use]
pub fn normalize_workers(requested: i64) -> usize {
    if requested <= 0 {
        return default_workers();
    }
    usize::try_from(requested).unwrap_or(FALLBACK_WORKERS)
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(FALLBACK_WORKERS, std::num::NonZeroUsize::get)
}

fn default_package() -> String {
    expand::expand_env(DEFAULT_PACKAGE, "backend.package")
        .unwrap_or_else(|_| "@mermaid-js/mermaid-cli@11.4.2".to_owned())
}

/// Require a dimension to be positive when set.
fn require_positive(value: Option<u32>, field: &str) -> Result<(), ConfigError> {
    if value == Some(0) {
        return Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

fn parse_choice<T>(value: Option<&str>, field: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = ParseChoiceError> + Default,
{
    value.map_or_else(
        || Ok(T::default()),
        |s| {
            s.parse()
                .map_err(|e| ConfigError::Validation(format!("{field}: {e}")))
        },
    )
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mds.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails, or
    /// the final configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }
        config.finalize();
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        let run = &mut self.run;
        if let Some(output_dir) = &settings.output_dir {
            run.output_dir.clone_from(output_dir);
        }
        if let Some(format) = settings.output_format {
            run.output_format = format;
        }
        if let Some(theme) = &settings.theme {
            run.theme = theme.clone();
        }
        if settings.width.is_some() {
            run.width = settings.width;
        }
        if settings.height.is_some() {
            run.height = settings.height;
        }
        if settings.background_color.is_some() {
            run.background_color.clone_from(&settings.background_color);
        }
        if settings.scale.is_some() {
            run.scale = settings.scale;
        }
        if settings.config_file.is_some() {
            run.config_file.clone_from(&settings.config_file);
        }
        if settings.css_file.is_some() {
            run.css_file.clone_from(&settings.css_file);
        }
        if let Some(pdf_fit) = settings.pdf_fit {
            run.pdf_fit = pdf_fit;
        }
        if let Some(concurrent) = settings.concurrent {
            run.concurrent = concurrent;
        }
        if let Some(max_workers) = settings.max_workers {
            run.max_workers = normalize_workers(max_workers);
        }
        if !settings.theme_dirs.is_empty() {
            let mut dirs = settings.theme_dirs.clone();
            dirs.append(&mut run.theme_dirs);
            run.theme_dirs = dirs;
        }
        if let Some(command) = settings.backend_command {
            run.backend_command = command;
        }
        if let Some(secs) = settings.timeout_secs {
            run.render_timeout = timeout_from_secs(secs);
        }
    }

    /// Apply rules that depend on the final combination of settings.
    fn finalize(&mut self) {
        // Enhanced SVG is cropped from a PDF page, which must hug the diagram
        if self.run.output_format == OutputFormat::EnhancedSvg {
            self.run.pdf_fit = true;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            output: OutputConfigRaw::default(),
            render: RenderConfigRaw::default(),
            concurrency: ConcurrencyConfigRaw::default(),
            themes: ThemesConfigRaw::default(),
            backend: BackendConfigRaw::default(),
            run: RunConfig::default_with_base(base),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically at the end of [`Config::load`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let run = &self.run;

        if run.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output.dir cannot be empty".to_owned(),
            ));
        }
        require_positive(run.width, "render.width")?;
        require_positive(run.height, "render.height")?;
        if let Some(scale) = run.scale
            && !(scale.is_finite() && scale > 0.0)
        {
            return Err(ConfigError::Validation(
                "render.scale must be a positive number".to_owned(),
            ));
        }
        if run.max_workers == 0 {
            return Err(ConfigError::Validation(
                "concurrency.max_workers must be greater than 0".to_owned(),
            ));
        }
        if run.cli_package.trim().is_empty() {
            return Err(ConfigError::Validation(
                "backend.package cannot be empty".to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref dir) = self.output.dir {
            self.output.dir = Some(expand::expand_env(dir, "output.dir")?);
        }
        if let Some(ref file) = self.render.config_file {
            self.render.config_file = Some(expand::expand_env(file, "render.config_file")?);
        }
        if let Some(ref file) = self.render.css_file {
            self.render.css_file = Some(expand::expand_env(file, "render.css_file")?);
        }
        if let Some(ref mut dirs) = self.themes.dirs {
            for dir in dirs.iter_mut() {
                *dir = expand::expand_env(dir, "themes.dirs")?;
            }
        }
        if let Some(ref package) = self.backend.package {
            self.backend.package = Some(expand::expand_env(package, "backend.package")?);
        }

        Ok(())
    }

    /// Resolve raw values into the run configuration.
    ///
    /// Relative paths are resolved against the config file's directory.
    fn resolve(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let resolve = |path: &str| config_dir.join(path);
        let defaults = RunConfig::default_with_base(config_dir);

        let theme_dirs = match &self.themes.dirs {
            Some(dirs) => dirs.iter().map(|d| resolve(d)).collect(),
            None => defaults.theme_dirs,
        };

        self.run = RunConfig {
            output_dir: self
                .output
                .dir
                .as_deref()
                .map_or(defaults.output_dir, resolve),
            output_format: parse_choice(self.output.format.as_deref(), "output.format")?,
            concurrent: self.concurrency.enabled.unwrap_or(false),
            max_workers: self
                .concurrency
                .max_workers
                .map_or(defaults.max_workers, normalize_workers),
            theme: self
                .render
                .theme
                .as_deref()
                .map_or_else(ThemeChoice::default, ThemeChoice::parse),
            width: self.render.width,
            height: self.render.height,
            background_color: self.render.background_color.clone(),
            scale: self.render.scale,
            config_file: self.render.config_file.as_deref().map(resolve),
            css_file: self.render.css_file.as_deref().map(resolve),
            pdf_fit: self.render.pdf_fit.unwrap_or(false),
            theme_dirs,
            backend_command: parse_choice(self.backend.command.as_deref(), "backend.command")?,
            cli_package: self.backend.package.clone().unwrap_or(defaults.cli_package),
            render_timeout: self
                .backend
                .timeout_secs
                .map_or(defaults.render_timeout, timeout_from_secs),
        };

        Ok(())
    }
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
