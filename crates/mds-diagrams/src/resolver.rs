//! Render option resolution.
//!
//! Each field is resolved independently, highest precedence first:
//!
//! 1. The block's embedded header.
//! 2. Files of the custom theme, when one is requested and found.
//! 3. The run configuration.
//! 4. Built-in defaults (default theme, everything else unset).

use mds_config::{BuiltinTheme, RunConfig, ThemeChoice};
use mds_themes::{ThemeCatalog, ThemeFiles};

use crate::block::DiagramBlock;
use crate::request::ResolvedRenderRequest;

/// Merges block, theme and run configuration into render requests.
///
/// Holds read-only references only, so one resolver can be shared by all
/// render workers.
#[derive(Debug, Clone, Copy)]
pub struct ConfigResolver<'a> {
    run: &'a RunConfig,
    catalog: &'a ThemeCatalog,
}

impl<'a> ConfigResolver<'a> {
    #[must_use]
    pub fn new(run: &'a RunConfig, catalog: &'a ThemeCatalog) -> Self {
        Self { run, catalog }
    }

    /// Resolve the render request for a block. Never fails.
    #[must_use]
    pub fn resolve(&self, block: &DiagramBlock) -> ResolvedRenderRequest {
        let config = &block.config;
        let run = self.run;
        let (theme, theme_files) = self.resolve_theme(block);
        let theme_files = theme_files.cloned().unwrap_or_default();

        ResolvedRenderRequest {
            theme,
            width: config.width.or(run.width),
            height: config.height.or(run.height),
            background_color: config
                .background_color
                .clone()
                .or_else(|| run.background_color.clone()),
            scale: config.scale.or(run.scale),
            output_format: run.output_format,
            config_file: config
                .config_file
                .clone()
                .or(theme_files.config_file)
                .or_else(|| run.config_file.clone()),
            css_file: config
                .css_file
                .clone()
                .or(theme_files.css_file)
                .or_else(|| run.css_file.clone()),
            pdf_fit: run.pdf_fit,
            element_id: config.element_id.clone(),
        }
    }

    /// Pick the block theme, then the run theme, skipping custom themes that
    /// cannot be found.
    fn resolve_theme(&self, block: &DiagramBlock) -> (ThemeChoice, Option<&'a ThemeFiles>) {
        let candidates = [
            (block.config.theme.as_ref(), true),
            (Some(&self.run.theme), false),
        ];

        for (theme, from_block) in candidates {
            match theme {
                Some(ThemeChoice::Builtin(builtin)) => {
                    return (ThemeChoice::Builtin(*builtin), None);
                }
                Some(ThemeChoice::Custom(name)) => {
                    if let Some(files) = self.catalog.lookup(name) {
                        return (ThemeChoice::Custom(name.clone()), Some(files));
                    }
                    // Missing run-level themes are reported once at start-up
                    if from_block {
                        tracing::warn!(
                            line = block.line_start,
                            theme = %name,
                            available = %self.available_themes(),
                            "Custom theme not found, falling back"
                        );
                    }
                }
                None => {}
            }
        }

        (ThemeChoice::Builtin(BuiltinTheme::default()), None)
    }

    fn available_themes(&self) -> String {
        BuiltinTheme::ALL
            .iter()
            .map(|t| t.as_str())
            .chain(self.catalog.list_available())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockConfig;
    use mds_config::OutputFormat;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn block(config: BlockConfig) -> DiagramBlock {
        DiagramBlock {
            content: "graph TD".to_owned(),
            config,
            line_start: 1,
            line_end: 3,
        }
    }

    fn run() -> RunConfig {
        RunConfig::default_with_base(Path::new("/project"))
    }

    fn catalog_with_theme(dir: &Path, name: &str, json: bool, css: bool) -> ThemeCatalog {
        let theme_dir = dir.join(name);
        fs::create_dir_all(&theme_dir).unwrap();
        if json {
            fs::write(theme_dir.join("config.json"), "{}").unwrap();
        }
        if css {
            fs::write(theme_dir.join("style.css"), "").unwrap();
        }
        ThemeCatalog::scan(&[dir.to_path_buf()])
    }

    #[test]
    fn test_defaults() {
        let run = run();
        let catalog = ThemeCatalog::new();

        let request = ConfigResolver::new(&run, &catalog).resolve(&block(BlockConfig::default()));

        assert_eq!(request.theme, ThemeChoice::Builtin(BuiltinTheme::Default));
        assert_eq!(request.width, None);
        assert_eq!(request.height, None);
        assert_eq!(request.scale, None);
        assert_eq!(request.background_color, None);
        assert_eq!(request.output_format, OutputFormat::Svg);
        assert_eq!(request.config_file, None);
        assert_eq!(request.css_file, None);
        assert!(!request.pdf_fit);
    }

    #[test]
    fn test_run_width_used_when_block_has_none() {
        let mut run = run();
        run.width = Some(800);
        let catalog = ThemeCatalog::new();

        let request = ConfigResolver::new(&run, &catalog).resolve(&block(BlockConfig::default()));

        assert_eq!(request.width, Some(800));
    }

    #[test]
    fn test_block_width_beats_theme_and_run() {
        let temp = tempfile::tempdir().unwrap();
        let catalog = catalog_with_theme(temp.path(), "ocean", true, true);
        let mut run = run();
        run.width = Some(800);

        let request = ConfigResolver::new(&run, &catalog).resolve(&block(BlockConfig {
            width: Some(1200),
            theme: Some(ThemeChoice::Custom("ocean".to_owned())),
            ..Default::default()
        }));

        assert_eq!(request.width, Some(1200));
    }

    #[test]
    fn test_block_values_override_run() {
        let mut run = run();
        run.theme = ThemeChoice::Builtin(BuiltinTheme::Forest);
        run.background_color = Some("white".to_owned());
        run.scale = Some(1.0);
        let catalog = ThemeCatalog::new();

        let request = ConfigResolver::new(&run, &catalog).resolve(&block(BlockConfig {
            theme: Some(ThemeChoice::Builtin(BuiltinTheme::Dark)),
            background_color: Some("transparent".to_owned()),
            scale: Some(3.0),
            element_id: Some("flow".to_owned()),
            ..Default::default()
        }));

        assert_eq!(request.theme, ThemeChoice::Builtin(BuiltinTheme::Dark));
        assert_eq!(request.background_color.as_deref(), Some("transparent"));
        assert_eq!(request.scale, Some(3.0));
        assert_eq!(request.element_id.as_deref(), Some("flow"));
    }

    #[test]
    fn test_run_theme_used_when_block_has_none() {
        let mut run = run();
        run.theme = ThemeChoice::Builtin(BuiltinTheme::Neutral);
        let catalog = ThemeCatalog::new();

        let request = ConfigResolver::new(&run, &catalog).resolve(&block(BlockConfig::default()));

        assert_eq!(request.theme, ThemeChoice::Builtin(BuiltinTheme::Neutral));
    }

    #[test]
    fn test_custom_theme_files_override_run_files() {
        let temp = tempfile::tempdir().unwrap();
        let catalog = catalog_with_theme(temp.path(), "ocean", true, true);
        let mut run = run();
        run.config_file = Some(PathBuf::from("/project/global.json"));
        run.css_file = Some(PathBuf::from("/project/global.css"));

        let request = ConfigResolver::new(&run, &catalog).resolve(&block(BlockConfig {
            theme: Some(ThemeChoice::Custom("ocean".to_owned())),
            ..Default::default()
        }));

        assert_eq!(request.theme, ThemeChoice::Custom("ocean".to_owned()));
        assert_eq!(request.config_file, Some(temp.path().join("ocean/config.json")));
        assert_eq!(request.css_file, Some(temp.path().join("ocean/style.css")));
    }

    #[test]
    fn test_custom_theme_without_css_keeps_run_css() {
        let temp = tempfile::tempdir().unwrap();
        let catalog = catalog_with_theme(temp.path(), "ocean", true, false);
        let mut run = run();
        run.css_file = Some(PathBuf::from("/project/global.css"));

        let request = ConfigResolver::new(&run, &catalog).resolve(&block(BlockConfig {
            theme: Some(ThemeChoice::Custom("ocean".to_owned())),
            ..Default::default()
        }));

        assert_eq!(request.config_file, Some(temp.path().join("ocean/config.json")));
        assert_eq!(request.css_file, Some(PathBuf::from("/project/global.css")));
    }

    #[test]
    fn test_block_files_beat_custom_theme_files() {
        let temp = tempfile::tempdir().unwrap();
        let catalog = catalog_with_theme(temp.path(), "ocean", true, true);
        let run = run();

        let request = ConfigResolver::new(&run, &catalog).resolve(&block(BlockConfig {
            theme: Some(ThemeChoice::Custom("ocean".to_owned())),
            css_file: Some(PathBuf::from("block.css")),
            ..Default::default()
        }));

        assert_eq!(request.css_file, Some(PathBuf::from("block.css")));
        assert_eq!(request.config_file, Some(temp.path().join("ocean/config.json")));
    }

    #[test]
    fn test_run_level_custom_theme() {
        let temp = tempfile::tempdir().unwrap();
        let catalog = catalog_with_theme(temp.path(), "corporate", false, true);
        let mut run = run();
        run.theme = ThemeChoice::Custom("corporate".to_owned());

        let request = ConfigResolver::new(&run, &catalog).resolve(&block(BlockConfig::default()));

        assert_eq!(request.theme, ThemeChoice::Custom("corporate".to_owned()));
        assert_eq!(request.css_file, Some(temp.path().join("corporate/style.css")));
    }

    #[test]
    fn test_missing_custom_theme_falls_back_to_run_theme() {
        let mut run = run();
        run.theme = ThemeChoice::Builtin(BuiltinTheme::Dark);
        run.css_file = Some(PathBuf::from("/project/global.css"));
        let catalog = ThemeCatalog::new();

        let request = ConfigResolver::new(&run, &catalog).resolve(&block(BlockConfig {
            theme: Some(ThemeChoice::Custom("missing".to_owned())),
            ..Default::default()
        }));

        assert_eq!(request.theme, ThemeChoice::Builtin(BuiltinTheme::Dark));
        assert_eq!(request.css_file, Some(PathBuf::from("/project/global.css")));
    }

    #[test]
    fn test_missing_custom_themes_fall_back_to_default() {
        let mut run = run();
        run.theme = ThemeChoice::Custom("also-missing".to_owned());
        let catalog = ThemeCatalog::new();

        let request = ConfigResolver::new(&run, &catalog).resolve(&block(BlockConfig {
            theme: Some(ThemeChoice::Custom("missing".to_owned())),
            ..Default::default()
        }));

        assert_eq!(request.theme, ThemeChoice::Builtin(BuiltinTheme::Default));
        assert_eq!(request.theme.custom(), None);
    }

    #[test]
    fn test_output_format_and_pdf_fit_come_from_run() {
        let mut run = run();
        run.output_format = OutputFormat::EnhancedSvg;
        run.pdf_fit = true;
        let catalog = ThemeCatalog::new();

        let request = ConfigResolver::new(&run, &catalog).resolve(&block(BlockConfig::default()));

        assert_eq!(request.output_format, OutputFormat::EnhancedSvg);
        assert!(request.pdf_fit);
    }
}
