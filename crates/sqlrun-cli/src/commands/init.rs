use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Default file name searched for (and created as) sqlrun settings.
pub const DEFAULT_SETTINGS_FILENAME: &str = "sqlrun.toml";

/// Scaffold written by the `init` command. The format matches the
/// settings structure consumed by the engine's config parser.
const DEFAULT_SETTINGS: &str = r#"# sqlrun default settings (TOML)
# Written by `sqlrun init`. Adjust fields to suit your project.

directory = "sql/"
project_id = "your-project-id"
dataset = "your_dataset"
location = "US"
impersonate_service_account = ""

[vars]
env = "dev"
start_date = "2025-01-01"
"#;

/// Execute the `init` command: write a default settings file in the
/// current directory.
pub fn execute(force: bool) -> Result<()> {
    let path = write_settings(Path::new("."), force)?;
    println!("Created {}", path.display());
    Ok(())
}

fn write_settings(dir: &Path, force: bool) -> Result<PathBuf> {
    let path = dir.join(DEFAULT_SETTINGS_FILENAME);
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }
    std::fs::write(&path, DEFAULT_SETTINGS)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
