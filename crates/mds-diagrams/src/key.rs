//! Artifact naming.
//!
//! Provides [`ArtifactKey`] for computing the content hash that names a
//! rendered artifact.

use sha2::{Digest, Sha256};

use crate::consts::HASH_LEN;
use crate::request::ResolvedRenderRequest;

/// Inputs that determine a rendered artifact.
///
/// Two blocks with the same source but different options get different
/// names, and re-running with identical input reuses the same name.
#[derive(Debug)]
pub struct ArtifactKey<'a> {
    /// Resolved render options (output format included).
    pub request: &'a ResolvedRenderRequest,
    /// Diagram source without its header.
    pub source: &'a str,
}

impl ArtifactKey<'_> {
    /// Compute the artifact hash.
    ///
    /// # Hash Format
    ///
    /// First 16 hex characters of SHA-256 of `"{request_json}\n{source}"`.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let request = serde_json::to_string(self.request)
            .unwrap_or_else(|_| format!("{:?}", self.request));
        let mut hasher = Sha256::new();
        hasher.update(request.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.source.as_bytes());
        let mut hash = hex::encode(hasher.finalize());
        hash.truncate(HASH_LEN);
        hash
    }

    /// File name of the artifact, e.g. `"3f2a9c0d1b4e5f60.svg"`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}.{}",
            self.compute_hash(),
            self.request.output_format.extension()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mds_config::{BuiltinTheme, OutputFormat, ThemeChoice};

    fn request() -> ResolvedRenderRequest {
        ResolvedRenderRequest {
            theme: ThemeChoice::Builtin(BuiltinTheme::Default),
            width: None,
            height: None,
            background_color: None,
            scale: None,
            output_format: OutputFormat::Svg,
            config_file: None,
            css_file: None,
            pdf_fit: false,
            element_id: None,
        }
    }

    #[test]
    fn test_hash_is_stable() {
        let request = request();
        let key1 = ArtifactKey {
            request: &request,
            source: "graph TD",
        };
        let key2 = ArtifactKey {
            request: &request,
            source: "graph TD",
        };

        assert_eq!(key1.compute_hash(), key2.compute_hash());
        assert_eq!(key1.compute_hash().len(), 16);
        assert!(key1.compute_hash().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_source_matters() {
        let request = request();
        let key1 = ArtifactKey {
            request: &request,
            source: "graph TD",
        };
        let key2 = ArtifactKey {
            source: "graph LR",
            ..key1
        };

        assert_ne!(key1.compute_hash(), key2.compute_hash());
    }

    #[test]
    fn test_options_matter() {
        let plain = request();
        let dark = ResolvedRenderRequest {
            theme: ThemeChoice::Builtin(BuiltinTheme::Dark),
            ..request()
        };
        let custom = ResolvedRenderRequest {
            theme: ThemeChoice::Custom("dark".to_owned()),
            ..request()
        };

        let hash = |request: &ResolvedRenderRequest| {
            ArtifactKey {
                request,
                source: "graph TD",
            }
            .compute_hash()
        };

        assert_ne!(hash(&plain), hash(&dark));
        assert_ne!(hash(&dark), hash(&custom));
    }

    #[test]
    fn test_format_changes_name() {
        let svg = request();
        let png = ResolvedRenderRequest {
            output_format: OutputFormat::Png,
            ..request()
        };
        let enhanced = ResolvedRenderRequest {
            output_format: OutputFormat::EnhancedSvg,
            ..request()
        };

        let svg_key = ArtifactKey {
            request: &svg,
            source: "pie",
        };
        let png_key = ArtifactKey {
            request: &png,
            source: "pie",
        };
        let enhanced_key = ArtifactKey {
            request: &enhanced,
            source: "pie",
        };

        assert!(svg_key.file_name().ends_with(".svg"));
        assert!(png_key.file_name().ends_with(".png"));
        assert!(enhanced_key.file_name().ends_with(".svg"));
        assert_ne!(svg_key.file_name(), enhanced_key.file_name());
    }
}
