//! Embedded block header parsing.
//!
//! A block may start with a YAML header between two `---` lines:
//!
//! ```text
//! ---
//! caption: Flow
//! render-theme: dark
//! ---
//! graph TD
//!   A --> B
//! ```
//!
//! Keys are normalized (`-` becomes `_`) before being matched against the
//! typed fields of [`BlockConfig`].

use std::path::PathBuf;

use mds_config::ThemeChoice;
use serde_yaml::{Mapping, Value};

use crate::block::BlockConfig;

/// Line that opens and closes a header.
const DELIMITER: &str = "---";

/// Header parsing error.
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("header must be a mapping of keys to values")]
    NotMapping,
}

/// Split a raw block body into its configuration and diagram source.
///
/// A header that fails to parse is treated as absent: the returned source is
/// the whole raw body (header lines included) and the configuration is empty.
/// The source is trimmed in both cases.
pub(crate) fn split_header(raw: &str, line: usize) -> (BlockConfig, String) {
    match parse_header(raw) {
        Ok(Some((mapping, body))) => (config_from_mapping(mapping, line), body.trim().to_owned()),
        Ok(None) => (BlockConfig::default(), raw.trim().to_owned()),
        Err(e) => {
            tracing::warn!(line, error = %e, "Ignoring malformed block header");
            (BlockConfig::default(), raw.trim().to_owned())
        }
    }
}

/// Find and parse the header.
///
/// Returns `Ok(None)` when the body has no complete header.
fn parse_header(raw: &str) -> Result<Option<(Mapping, &str)>, HeaderError> {
    let Some(first_end) = raw.find('\n') else {
        return Ok(None);
    };
    if raw[..first_end].trim_end_matches('\r') != DELIMITER {
        return Ok(None);
    }

    let rest = &raw[first_end + 1..];
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let mapping = match serde_yaml::from_str::<Value>(yaml)? {
                Value::Mapping(mapping) => mapping,
                Value::Null => Mapping::new(),
                _ => return Err(HeaderError::NotMapping),
            };
            return Ok(Some((mapping, body)));
        }
        offset += line.len();
    }

    Ok(None)
}

/// Normalize a header key: hyphens become underscores.
fn normalize_key(key: &str) -> String {
    key.trim().replace('-', "_")
}

fn config_from_mapping(mapping: Mapping, line: usize) -> BlockConfig {
    let mut config = BlockConfig::default();

    for (key, value) in mapping {
        let Some(key) = key.as_str().map(normalize_key) else {
            tracing::warn!(line, key = ?key, "Ignoring non-string header key");
            continue;
        };
        if value.is_null() {
            continue;
        }

        let applied = match key.as_str() {
            "caption" => set(&mut config.caption, as_string(&value)),
            "theme" | "render_theme" => set(
                &mut config.theme,
                as_string(&value).map(|v| ThemeChoice::parse(&v)),
            ),
            "custom_theme" => set(
                &mut config.theme,
                as_string(&value).map(|v| ThemeChoice::Custom(v.trim().to_owned())),
            ),
            "width" => set(&mut config.width, as_u32(&value)),
            "height" => set(&mut config.height, as_u32(&value)),
            "background_color" => set(&mut config.background_color, as_string(&value)),
            "scale" => set(&mut config.scale, as_f64(&value)),
            "css_file" => set(&mut config.css_file, as_string(&value).map(PathBuf::from)),
            "config_file" => set(&mut config.config_file, as_string(&value).map(PathBuf::from)),
            "element_id" => set(&mut config.element_id, as_string(&value)),
            _ => {
                config.extra.insert(key, value);
                continue;
            }
        };

        if !applied {
            tracing::warn!(line, key = %key, value = ?value, "Header value has the wrong type, keeping it untyped");
            config.extra.insert(key, value);
        }
    }

    config
}

/// Store a typed header value; `false` when the value had the wrong type.
fn set<T>(field: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(value) => {
            *field = Some(value);
            true
        }
        None => false,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mds_config::BuiltinTheme;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_with_builtin_theme() {
        let raw = "---\ncaption: Flow\nrender-theme: dark\n---\ngraph TD\n  A --> B";

        let (config, content) = split_header(raw, 1);

        assert_eq!(content, "graph TD\n  A --> B");
        assert_eq!(config.caption.as_deref(), Some("Flow"));
        assert_eq!(config.theme, Some(ThemeChoice::Builtin(BuiltinTheme::Dark)));
        assert!(config.extra.is_empty());
    }

    #[test]
    fn test_no_header() {
        let (config, content) = split_header("  graph TD\n  A --> B\n", 1);

        assert_eq!(config, BlockConfig::default());
        assert_eq!(content, "graph TD\n  A --> B");
    }

    #[test]
    fn test_theme_key_case_insensitive_builtin() {
        let (config, _) = split_header("---\ntheme: FOREST\n---\ngraph TD", 1);

        assert_eq!(config.theme, Some(ThemeChoice::Builtin(BuiltinTheme::Forest)));
    }

    #[test]
    fn test_custom_theme_name() {
        let (config, _) = split_header("---\ntheme: corporate\n---\ngraph TD", 1);

        assert_eq!(config.theme, Some(ThemeChoice::Custom("corporate".to_owned())));
        assert_eq!(config.theme.unwrap().builtin(), None);
    }

    #[test]
    fn test_typed_keys() {
        let raw = "---\nwidth: 800\nheight: \"600\"\nbackground-color: transparent\nscale: 2\ncss-file: style.css\nconfig-file: mermaid.json\nelement-id: flow\n---\ngraph TD";

        let (config, _) = split_header(raw, 1);

        assert_eq!(config.width, Some(800));
        assert_eq!(config.height, Some(600));
        assert_eq!(config.background_color.as_deref(), Some("transparent"));
        assert_eq!(config.scale, Some(2.0));
        assert_eq!(config.css_file, Some(PathBuf::from("style.css")));
        assert_eq!(config.config_file, Some(PathBuf::from("mermaid.json")));
        assert_eq!(config.element_id.as_deref(), Some("flow"));
    }

    #[test]
    fn test_unknown_keys_preserved() {
        let (config, _) = split_header("---\nlayout-engine: elk\nlegacy: 3\n---\ngraph TD", 1);

        assert_eq!(
            config.extra.get("layout_engine"),
            Some(&Value::String("elk".to_owned()))
        );
        assert!(config.extra.contains_key("legacy"));
    }

    #[test]
    fn test_wrong_type_kept_untyped() {
        let (config, content) = split_header("---\nwidth: wide\n---\ngraph TD", 1);

        assert_eq!(config.width, None);
        assert_eq!(
            config.extra.get("width"),
            Some(&Value::String("wide".to_owned()))
        );
        assert_eq!(content, "graph TD");
    }

    #[test]
    fn test_wrong_type_keeps_earlier_value() {
        let raw = "---\ntheme: dark\nrender-theme: [a, b]\ncustom-theme: ocean\n---\ngraph TD";

        let (config, _) = split_header(raw, 1);

        assert_eq!(config.theme, Some(ThemeChoice::Custom("ocean".to_owned())));
        assert!(config.extra.contains_key("render_theme"));
        assert!(!config.extra.contains_key("theme"));
    }

    #[test]
    fn test_malformed_header_keeps_raw_content() {
        let raw = "---\ncaption: [unclosed\n---\ngraph TD";

        let (config, content) = split_header(raw, 1);

        assert_eq!(config, BlockConfig::default());
        assert_eq!(content, raw);
    }

    #[test]
    fn test_scalar_header_keeps_raw_content() {
        let raw = "---\njust text\n---\ngraph TD";

        let (config, content) = split_header(raw, 1);

        assert_eq!(config, BlockConfig::default());
        assert_eq!(content, raw);
    }

    #[test]
    fn test_unterminated_header_is_content() {
        let raw = "---\ncaption: Flow\ngraph TD";

        let (config, content) = split_header(raw, 1);

        assert_eq!(config, BlockConfig::default());
        assert_eq!(content, raw);
    }

    #[test]
    fn test_empty_header() {
        let (config, content) = split_header("---\n---\ngraph TD", 1);

        assert_eq!(config, BlockConfig::default());
        assert_eq!(content, "graph TD");
    }

    #[test]
    fn test_crlf_header() {
        let raw = "---\r\ncaption: Flow\r\n---\r\ngraph TD\r\n  A --> B";

        let (config, content) = split_header(raw, 1);

        assert_eq!(config.caption.as_deref(), Some("Flow"));
        assert_eq!(content, "graph TD\r\n  A --> B");
    }

    #[test]
    fn test_content_never_contains_delimiters() {
        let (_, content) = split_header("---\ncaption: x\n---\ngraph TD\n  A --> B", 1);

        assert!(!content.lines().any(|l| l == DELIMITER));
    }
}
