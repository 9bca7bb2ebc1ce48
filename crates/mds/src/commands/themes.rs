//! `mds themes` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use mds_config::{BuiltinTheme, CliSettings, Config};
use mds_themes::{ThemeCatalog, ThemeFiles};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the themes command.
#[derive(Args, Debug)]
pub(crate) struct ThemesArgs {
    /// Path to configuration file (default: auto-discover mds.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Additional custom theme directory, searched before configured ones.
    #[arg(long = "themes-dir", value_name = "DIR")]
    themes_dirs: Vec<PathBuf>,
}

impl ThemesArgs {
    /// Execute the themes command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails to load.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            theme_dirs: self.themes_dirs,
            ..Default::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let catalog = ThemeCatalog::scan(&config.run.theme_dirs);

        output.highlight("Built-in themes");
        for theme in BuiltinTheme::ALL {
            output.info(&format!("  {theme}"));
        }

        output.highlight("Custom themes");
        if catalog.is_empty() {
            let dirs: Vec<String> = catalog
                .dirs()
                .iter()
                .map(|dir| dir.display().to_string())
                .collect();
            output.info(&format!("  none found in {}", dirs.join(", ")));
        } else {
            for (name, files) in catalog.iter() {
                output.info(&format!("  {name}"));
                for line in describe_files(files) {
                    output.info(&format!("    {line}"));
                }
            }
        }

        Ok(())
    }
}

/// One line per file belonging to a custom theme.
fn describe_files(files: &ThemeFiles) -> Vec<String> {
    let config = files
        .config_file
        .as_deref()
        .map(|path| format!("config: {}", display_name(path)));
    let css = files
        .css_file
        .as_deref()
        .map(|path| format!("css:    {}", display_name(path)));
    config.into_iter().chain(css).collect()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}
