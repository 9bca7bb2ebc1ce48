//! Theme identifiers.
//!
//! A theme is either one of the Mermaid built-in themes or the name of a
//! file-backed custom theme. [`ThemeChoice`] makes the two mutually exclusive.

use std::fmt;

use serde::Serialize;

/// Themes shipped with Mermaid itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinTheme {
    #[default]
    Default,
    Forest,
    Dark,
    Neutral,
}

impl BuiltinTheme {
    pub const ALL: [Self; 4] = [Self::Default, Self::Forest, Self::Dark, Self::Neutral];

    /// Parse a built-in theme name, ignoring ASCII case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|theme| theme.as_str().eq_ignore_ascii_case(s.trim()))
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Forest => "forest",
            Self::Dark => "dark",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for BuiltinTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Either a built-in theme or a custom theme name, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    Builtin(BuiltinTheme),
    Custom(String),
}

impl ThemeChoice {
    /// Classify a theme name.
    ///
    /// Names matching a built-in theme (case-insensitively) become
    /// [`ThemeChoice::Builtin`]; anything else is kept verbatim as a custom name.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match BuiltinTheme::parse(s) {
            Some(theme) => Self::Builtin(theme),
            None => Self::Custom(s.trim().to_owned()),
        }
    }

    #[must_use]
    pub fn builtin(&self) -> Option<BuiltinTheme> {
        match self {
            Self::Builtin(theme) => Some(*theme),
            Self::Custom(_) => None,
        }
    }

    #[must_use]
    pub fn custom(&self) -> Option<&str> {
        match self {
            Self::Builtin(_) => None,
            Self::Custom(name) => Some(name),
        }
    }
}

impl Default for ThemeChoice {
    fn default() -> Self {
        Self::Builtin(BuiltinTheme::default())
    }
}

impl fmt::Display for ThemeChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(theme) => theme.fmt(f),
            Self::Custom(name) => f.write_str(name),
        }
    }
}
