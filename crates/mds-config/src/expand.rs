//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a configuration value.
///
/// `field` names the configuration key and is reported when a referenced
/// variable is unset and has no default.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_literal_unchanged() {
        assert_eq!(expand_env("output", "output.dir").unwrap(), "output");
    }

    #[test]
    fn test_expand_default_used_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MDS_EXPAND_TEST_UNSET");
        }
        let value = expand_env("pkg@${MDS_EXPAND_TEST_UNSET:-1.2.3}", "backend.package").unwrap();
        assert_eq!(value, "pkg@1.2.3");
    }

    #[test]
    fn test_expand_set_variable() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("MDS_EXPAND_TEST_SET", "9.9.9");
        }
        let value = expand_env("pkg@${MDS_EXPAND_TEST_SET:-1.2.3}", "backend.package").unwrap();
        assert_eq!(value, "pkg@9.9.9");
        unsafe {
            std::env::remove_var("MDS_EXPAND_TEST_SET");
        }
    }

    #[test]
    fn test_expand_missing_variable_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MDS_EXPAND_TEST_MISSING");
        }
        let err = expand_env("${MDS_EXPAND_TEST_MISSING}", "output.dir").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("output.dir"));
        assert!(err.to_string().contains("MDS_EXPAND_TEST_MISSING"));
    }
}
