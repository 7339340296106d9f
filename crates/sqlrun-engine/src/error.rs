//! Pipeline error model.
//!
//! [`PipelineError`] covers every fatal condition of a run. All variants
//! abort the run on first occurrence; the skip-on-empty-render branch is
//! the only non-fatal path and is not an error. Per-unit variants carry
//! the offending unit's path so the reported failure is actionable
//! without re-running with added diagnostics.

use std::path::PathBuf;

/// Fatal errors produced while resolving, discovering, rendering, or
/// executing a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Resolved configuration failed precondition checks (missing
    /// project id, missing or invalid directory).
    #[error("invalid configuration:\n  - {0}")]
    ConfigInvalid(String),

    /// Directory traversal failed. Discovery is all-or-nothing.
    #[error("discovery failed under {}: {}", .dir.display(), .source)]
    DiscoveryFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A unit's resolved path escapes the configured root.
    #[error("invalid unit path detected: {}", .unit.display())]
    InvalidPath { unit: PathBuf },

    /// A discovered unit could not be read at execution time.
    #[error("cannot read {}: {}", .unit.display(), .source)]
    UnitUnreadable {
        unit: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A unit contains an unclosed or malformed placeholder.
    #[error("render failed for {}: {}", .unit.display(), .reason)]
    RenderFailed { unit: PathBuf, reason: String },

    /// A unit references a variable absent from its render context.
    #[error("undefined variable `{}` in {}", .name, .unit.display())]
    UndefinedVariable { name: String, unit: PathBuf },

    /// Query engine client construction or authentication failed.
    /// Fatal before any unit runs.
    #[error("query engine connection failed: {0}")]
    EngineConnectFailed(#[source] anyhow::Error),

    /// Submitting a unit's query to the engine failed.
    #[error("submit failed for {}: {}", .unit.display(), .source)]
    SubmitFailed {
        unit: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Waiting for a submitted job failed at the transport layer.
    #[error("wait failed for {}: {}", .unit.display(), .source)]
    AwaitFailed {
        unit: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The engine reported a query error for a unit's job.
    #[error("job failed for {}: {}", .unit.display(), .message)]
    JobFailed { unit: PathBuf, message: String },

    /// The run was cancelled by an external signal.
    #[error("run interrupted")]
    Interrupted,
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_variable_names_key_and_unit() {
        let err = PipelineError::UndefinedVariable {
            name: "env".to_string(),
            unit: PathBuf::from("sql/010_init.sql"),
        };
        let msg = err.to_string();
        assert!(msg.contains("`env`"), "got: {msg}");
        assert!(msg.contains("010_init.sql"), "got: {msg}");
    }

    #[test]
    fn job_failed_names_unit() {
        let err = PipelineError::JobFailed {
            unit: PathBuf::from("sql/b.sql"),
            message: "invalidQuery: Syntax error".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("b.sql"), "got: {msg}");
        assert!(msg.contains("Syntax error"), "got: {msg}");
    }

    #[test]
    fn submit_failed_retains_source() {
        use std::error::Error as _;

        let err = PipelineError::SubmitFailed {
            unit: PathBuf::from("a.sql"),
            source: anyhow::anyhow!("connection refused"),
        };
        assert!(err.source().is_some());
        assert!(err.source().unwrap().to_string().contains("refused"));
    }

    #[test]
    fn config_invalid_lists_failures() {
        let err = PipelineError::ConfigInvalid("project_id is required".to_string());
        assert!(err.to_string().contains("project_id"));
    }
}
