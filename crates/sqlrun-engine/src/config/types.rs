//! Settings file schema and the resolved per-run configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Serde mirror of the `sqlrun.toml` settings file.
///
/// Example TOML:
///
/// ```toml
/// directory = "sql/"
/// project_id = "my-project"
/// dataset = "analytics"
/// location = "US"
/// impersonate_service_account = "runner@my-project.iam.gserviceaccount.com"
///
/// [vars]
/// start_date = "2025-01-01"
/// env = "prod"
/// ```
///
/// All fields are optional and can be overridden via CLI flags.
/// Required-field validation is deferred to run time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsFile {
    pub directory: Option<String>,
    pub project_id: Option<String>,
    pub dataset: Option<String>,
    pub location: Option<String>,
    pub impersonate_service_account: Option<String>,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

/// Command-line overrides for the settings file.
///
/// `None` means "not provided on the command line", which is distinct
/// from an explicitly provided empty string: a provided value always
/// wins over the settings file, even when empty.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub directory: Option<String>,
    pub project_id: Option<String>,
    pub dataset: Option<String>,
    pub location: Option<String>,
    pub impersonate_service_account: Option<String>,
    pub dry_run: bool,
}

/// Resolved settings for one execution. Built once per run and
/// immutable afterwards; the engine receives it by reference and no
/// process-global state survives into the run loop.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root of the SQL unit tree.
    pub directory: PathBuf,
    /// Target project identifier. Must be non-empty to run.
    pub project_id: String,
    /// Optional dataset scope for submitted queries.
    pub dataset: Option<String>,
    /// Optional data processing location.
    pub location: Option<String>,
    /// Optional delegated-identity principal for engine authorization.
    pub impersonate_service_account: Option<String>,
    /// User variable mapping for template rendering.
    pub vars: BTreeMap<String, String>,
    /// Validate queries without executing them.
    pub dry_run: bool,
}

impl RunConfig {
    /// Merge a loaded settings file with command-line overrides.
    ///
    /// Precedence: a provided override always wins; an absent override
    /// defers to the settings file. Values that end up empty are
    /// normalized to `None`, so an explicitly empty override clears the
    /// corresponding file value. A relative `directory` resolves
    /// against `settings_dir` (the settings file's parent directory).
    pub fn resolve(settings: SettingsFile, overrides: Overrides, settings_dir: &Path) -> Self {
        let directory = match pick(overrides.directory, settings.directory) {
            Some(dir) => {
                let path = PathBuf::from(dir);
                if path.is_absolute() {
                    path
                } else {
                    settings_dir.join(path)
                }
            }
            None => PathBuf::new(),
        };

        Self {
            directory,
            project_id: pick(overrides.project_id, settings.project_id).unwrap_or_default(),
            dataset: pick(overrides.dataset, settings.dataset),
            location: pick(overrides.location, settings.location),
            impersonate_service_account: pick(
                overrides.impersonate_service_account,
                settings.impersonate_service_account,
            ),
            vars: settings.vars,
            dry_run: overrides.dry_run,
        }
    }
}

/// Two-tier precedence with empty-value normalization: a provided flag
/// beats the file value, and whatever survives is dropped when empty.
fn pick(flag: Option<String>, file: Option<String>) -> Option<String> {
    flag.or(file).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SettingsFile {
        SettingsFile {
            directory: Some("sql".to_string()),
            project_id: Some("file-project".to_string()),
            dataset: Some("file_dataset".to_string()),
            location: Some("US".to_string()),
            impersonate_service_account: None,
            vars: BTreeMap::from([("env".to_string(), "prod".to_string())]),
        }
    }

    #[test]
    fn flag_beats_file() {
        let overrides = Overrides {
            project_id: Some("flag-project".to_string()),
            ..Overrides::default()
        };
        let config = RunConfig::resolve(settings(), overrides, Path::new("/work"));
        assert_eq!(config.project_id, "flag-project");
        assert_eq!(config.dataset.as_deref(), Some("file_dataset"));
    }

    #[test]
    fn absent_flag_defers_to_file() {
        let config = RunConfig::resolve(settings(), Overrides::default(), Path::new("/work"));
        assert_eq!(config.project_id, "file-project");
        assert_eq!(config.location.as_deref(), Some("US"));
        assert_eq!(config.vars["env"], "prod");
    }

    #[test]
    fn provided_empty_flag_clears_file_value() {
        let overrides = Overrides {
            dataset: Some(String::new()),
            ..Overrides::default()
        };
        let config = RunConfig::resolve(settings(), overrides, Path::new("/work"));
        assert_eq!(config.dataset, None);
    }

    #[test]
    fn relative_directory_resolves_against_settings_dir() {
        let config = RunConfig::resolve(settings(), Overrides::default(), Path::new("/work/etc"));
        assert_eq!(config.directory, PathBuf::from("/work/etc/sql"));
    }

    #[test]
    fn absolute_directory_is_kept() {
        let overrides = Overrides {
            directory: Some("/data/sql".to_string()),
            ..Overrides::default()
        };
        let config = RunConfig::resolve(settings(), overrides, Path::new("/work/etc"));
        assert_eq!(config.directory, PathBuf::from("/data/sql"));
    }

    #[test]
    fn missing_directory_stays_empty() {
        let config = RunConfig::resolve(
            SettingsFile::default(),
            Overrides::default(),
            Path::new("/work"),
        );
        assert!(config.directory.as_os_str().is_empty());
        assert!(config.project_id.is_empty());
    }

    #[test]
    fn dry_run_comes_from_overrides_only() {
        let overrides = Overrides {
            dry_run: true,
            ..Overrides::default()
        };
        let config = RunConfig::resolve(settings(), overrides, Path::new("/work"));
        assert!(config.dry_run);
    }
}
