//! Settings file parsing with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::types::SettingsFile;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns an error if any referenced environment variable is not set.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in ENV_VAR_RE.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if !errors.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", errors.join(", "));
    }

    Ok(result)
}

/// Parse a settings TOML string (after env var substitution).
///
/// # Errors
///
/// Returns an error if env var substitution fails or the TOML is invalid.
pub fn parse_settings_str(toml_str: &str) -> Result<SettingsFile> {
    let substituted = substitute_env_vars(toml_str)?;
    let settings: SettingsFile =
        toml::from_str(&substituted).context("Failed to parse settings TOML")?;
    Ok(settings)
}

/// Load a settings file from disk.
///
/// A missing file is not an error: it means "no overrides" and yields
/// the default (empty) settings. A directory at the settings path is an
/// error.
///
/// # Errors
///
/// Returns an error if the path is unreadable for any reason other than
/// absence, points at a directory, or contains invalid TOML.
pub fn load_settings(path: &Path) -> Result<SettingsFile> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(SettingsFile::default());
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to stat settings file: {}", path.display()));
        }
    };
    if metadata.is_dir() {
        anyhow::bail!(
            "Settings path {} is a directory, expected a file",
            path.display()
        );
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
    parse_settings_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SQLRUN_TEST_PROJECT", "proj-from-env");
        let input = "project_id = \"${SQLRUN_TEST_PROJECT}\"";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("proj-from-env"));
        assert!(!result.contains("${SQLRUN_TEST_PROJECT}"));
        std::env::remove_var("SQLRUN_TEST_PROJECT");
    }

    #[test]
    fn test_missing_env_vars_all_reported() {
        let input = "${SQLRUN_MISSING_X} and ${SQLRUN_MISSING_Y}";
        let result = substitute_env_vars(input);
        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("SQLRUN_MISSING_X"));
        assert!(err_msg.contains("SQLRUN_MISSING_Y"));
    }

    #[test]
    fn test_no_env_vars_passthrough() {
        let input = "project_id = \"fixed\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, input);
    }

    #[test]
    fn test_parse_settings_from_string() {
        std::env::set_var("SQLRUN_TEST_DATASET", "analytics");
        let toml = r#"
directory = "sql/"
project_id = "my-project"
dataset = "${SQLRUN_TEST_DATASET}"
location = "US"

[vars]
env = "prod"
start_date = "2025-01-01"
"#;
        let settings = parse_settings_str(toml).unwrap();
        assert_eq!(settings.directory.as_deref(), Some("sql/"));
        assert_eq!(settings.project_id.as_deref(), Some("my-project"));
        assert_eq!(settings.dataset.as_deref(), Some("analytics"));
        assert_eq!(settings.vars["env"], "prod");
        assert_eq!(settings.vars["start_date"], "2025-01-01");
        std::env::remove_var("SQLRUN_TEST_DATASET");
    }

    #[test]
    fn test_parse_minimal_settings() {
        let settings = parse_settings_str("").unwrap();
        assert!(settings.directory.is_none());
        assert!(settings.project_id.is_none());
        assert!(settings.vars.is_empty());
    }

    #[test]
    fn test_parse_invalid_toml_errors() {
        let result = parse_settings_str("directory = [not toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let settings = load_settings(Path::new("/nonexistent/sqlrun.toml")).unwrap();
        assert!(settings.project_id.is_none());
        assert!(settings.vars.is_empty());
    }

    #[test]
    fn test_load_directory_path_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let result = load_settings(tmp.path());
        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("expected a file"), "got: {err_msg}");
    }

    #[test]
    fn test_load_settings_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sqlrun.toml");
        std::fs::write(&path, "project_id = \"p1\"\n\n[vars]\na = \"1\"\n").unwrap();
        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.project_id.as_deref(), Some("p1"));
        assert_eq!(settings.vars["a"], "1");
    }
}
