//! Precondition checks for a resolved run configuration.

use crate::config::types::RunConfig;
use crate::error::PipelineError;

/// Validate a resolved [`RunConfig`] before any unit is processed.
/// Returns `Ok(())` if valid, `Err` with all validation errors if not.
///
/// # Errors
///
/// Returns [`PipelineError::ConfigInvalid`] listing every failed check.
pub fn validate_config(config: &RunConfig) -> Result<(), PipelineError> {
    let mut errors = Vec::new();

    if config.project_id.trim().is_empty() {
        errors.push("project_id is required (settings file or --project)".to_string());
    }

    if config.directory.as_os_str().is_empty() {
        errors.push("directory is required (settings file or --directory)".to_string());
    } else {
        match std::fs::metadata(&config.directory) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => errors.push(format!(
                "{} exists but is not a directory",
                config.directory.display()
            )),
            Err(_) => errors.push(format!(
                "directory {} not found",
                config.directory.display()
            )),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::ConfigInvalid(errors.join("\n  - ")))
    }
}
