//! Custom theme discovery.
//!
//! A custom theme is a subdirectory of a theme root containing a Mermaid JSON
//! config file and/or a CSS file:
//!
//! ```text
//! themes/
//! ├── corporate/
//! │   ├── config.json
//! │   └── style.css
//! └── ocean/
//!     └── ocean.css
//! ```
//!
//! [`ThemeCatalog`] scans theme roots once and answers lookups from memory.
//! Roots listed first take priority when two roots define the same theme name.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Files making up one custom theme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeFiles {
    /// Mermaid JSON configuration file (`*.json`).
    pub config_file: Option<PathBuf>,
    /// Stylesheet (`*.css`).
    pub css_file: Option<PathBuf>,
}

impl ThemeFiles {
    fn is_empty(&self) -> bool {
        self.config_file.is_none() && self.css_file.is_none()
    }
}

/// Catalog of custom themes found under one or more theme roots.
///
/// The catalog is populated before rendering starts and is only read while
/// diagrams render. [`ThemeCatalog::add_dir`] takes `&mut self`, so it cannot
/// run while the catalog is shared with render workers.
#[derive(Debug, Default)]
pub struct ThemeCatalog {
    dirs: Vec<PathBuf>,
    themes: BTreeMap<String, ThemeFiles>,
}

impl ThemeCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog by scanning `dirs` in priority order.
    ///
    /// Missing directories are skipped.
    #[must_use]
    pub fn scan(dirs: &[PathBuf]) -> Self {
        let mut catalog = Self::new();
        for dir in dirs {
            catalog.add_dir(dir);
        }
        catalog
    }

    /// Add a theme root with lower priority than the roots already added.
    ///
    /// Themes whose names are already known keep their existing files.
    pub fn add_dir(&mut self, dir: &Path) {
        self.dirs.push(dir.to_path_buf());

        let Ok(entries) = fs::read_dir(dir) else {
            tracing::debug!(dir = %dir.display(), "Theme directory not found");
            return;
        };

        let mut theme_dirs: Vec<_> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .map(|e| e.path())
            .collect();
        theme_dirs.sort();

        for theme_dir in theme_dirs {
            let Some(name) = theme_dir.file_name().map(|n| n.to_string_lossy().into_owned())
            else {
                continue;
            };
            if self.themes.contains_key(&name) {
                tracing::debug!(theme = %name, dir = %dir.display(), "Theme shadowed by earlier directory");
                continue;
            }

            let files = scan_theme_dir(&theme_dir);
            if files.is_empty() {
                continue;
            }
            tracing::debug!(
                theme = %name,
                config = ?files.config_file,
                css = ?files.css_file,
                "Found theme"
            );
            self.themes.insert(name, files);
        }
    }

    /// Look up the files of a custom theme.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ThemeFiles> {
        self.themes.get(name)
    }

    /// Check whether a custom theme exists.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.themes.contains_key(name)
    }

    /// Names of all custom themes, sorted.
    pub fn list_available(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }

    /// All custom themes with their files, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ThemeFiles)> {
        self.themes.iter().map(|(name, files)| (name.as_str(), files))
    }

    /// Theme roots in priority order.
    #[must_use]
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Whether no custom theme was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }
}

/// Pick the first `.json` and first `.css` file (by name) in a theme directory.
fn scan_theme_dir(dir: &Path) -> ThemeFiles {
    let Ok(entries) = fs::read_dir(dir) else {
        return ThemeFiles::default();
    };

    let mut files: Vec<_> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .map(|e| e.path())
        .collect();
    files.sort();

    let mut theme = ThemeFiles::default();
    for path in files {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") if theme.config_file.is_none() => theme.config_file = Some(path),
            Some("css") if theme.css_file.is_none() => theme.css_file = Some(path),
            _ => {}
        }
    }
    theme
}
