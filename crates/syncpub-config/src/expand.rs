//! `${VAR}` expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// Strings without `${` are returned unchanged, so a bare `$` in a value is
/// left alone.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, UnsetVar> {
        std::env::var(var).map(Some).map_err(|_| UnsetVar(var.to_owned()))
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.0),
    })
}

struct UnsetVar(String);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_expand_set_var() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("SYNCPUB_TEST_HOST", "0.0.0.0");
        }
        let result = expand_env("${SYNCPUB_TEST_HOST}", "server.host").unwrap();
        assert_eq!(result, "0.0.0.0");
        unsafe {
            std::env::remove_var("SYNCPUB_TEST_HOST");
        }
    }

    #[test]
    fn test_expand_default() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::remove_var("SYNCPUB_TEST_UNSET");
        }
        let result = expand_env("${SYNCPUB_TEST_UNSET:-127.0.0.1}", "server.host").unwrap();
        assert_eq!(result, "127.0.0.1");
    }

    #[test]
    fn test_expand_missing_var_names_field() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::remove_var("SYNCPUB_TEST_MISSING");
        }
        let err = expand_env("${SYNCPUB_TEST_MISSING}", "storage.data_dir").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("SYNCPUB_TEST_MISSING"));
        assert!(err.to_string().contains("storage.data_dir"));
    }

    #[test]
    fn test_bare_dollar_unchanged() {
        assert_eq!(expand_env("/data/$x", "storage.data_dir").unwrap(), "/data/$x");
    }
}
