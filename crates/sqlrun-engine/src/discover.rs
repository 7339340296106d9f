//! Unit discovery: recursive scan for SQL files in lexical order.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::PipelineError;

/// One discovered SQL file. Content is loaded at execution time, not at
/// discovery time; a unit has no identity beyond its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub path: PathBuf,
}

/// Recursively collect the `.sql` units under `root`, sorted by full
/// path string ascending. Symlinks are not followed. The extension
/// match is case-insensitive, and directories themselves are excluded.
///
/// Zero units is a valid result, not an error. Two scans of an
/// unchanged tree yield identical sequences.
///
/// # Errors
///
/// Any traversal error (permission denied, vanished entry) aborts
/// discovery with [`PipelineError::DiscoveryFailed`]; discovery is
/// all-or-nothing, never best-effort.
pub fn discover_units(root: &Path) -> Result<Vec<Unit>, PipelineError> {
    let mut units = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| PipelineError::DiscoveryFailed {
            dir: root.to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if has_sql_extension(entry.path()) {
            units.push(Unit {
                path: entry.into_path(),
            });
        }
    }

    units.sort_by(|a, b| a.path.as_os_str().cmp(b.path.as_os_str()));
    Ok(units)
}

fn has_sql_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
}
