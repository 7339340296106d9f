//! Query engine seam.
//!
//! [`QueryEngine`] defines the submission contract between the
//! orchestrator and a concrete engine backend. The engine is
//! constructed once per run and reused for every unit; implementations
//! must be `Send + Sync` for use behind `&dyn QueryEngine`.

use async_trait::async_trait;

use crate::config::types::RunConfig;

/// Per-run submission scope shared by every unit.
#[derive(Debug, Clone, Default)]
pub struct QueryScope {
    /// Default dataset for unqualified table references.
    pub dataset: Option<String>,
    /// Data processing location.
    pub location: Option<String>,
    /// Validate only; no data is read or written and no cost incurred.
    pub dry_run: bool,
}

impl QueryScope {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            dataset: config.dataset.clone(),
            location: config.location.clone(),
            dry_run: config.dry_run,
        }
    }
}

/// Reference to a submitted job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    /// Server-assigned job id. Absent for dry-run validations, which
    /// are terminal at submit time.
    pub job_id: Option<String>,
    /// Location the job was routed to; required for status polls.
    pub location: Option<String>,
    /// Terminal outcome captured at submit time, when the engine's
    /// submit response already carries it (dry runs).
    pub immediate: Option<JobOutcome>,
}

/// Final state of a completed job.
#[derive(Debug, Clone, Default)]
pub struct JobOutcome {
    /// Structured failure reported by the engine; `None` means the job
    /// succeeded. A non-`None` failure is terminal and must never be
    /// swallowed.
    pub failure: Option<JobFailure>,
    /// Bytes the query would process (populated for dry runs).
    pub total_bytes_processed: Option<i64>,
}

/// Structured failure reported by the engine for a job.
#[derive(Debug, Clone)]
pub struct JobFailure {
    pub reason: Option<String>,
    pub message: String,
}

impl JobFailure {
    /// One-line description for error reporting.
    pub fn describe(&self) -> String {
        match &self.reason {
            Some(reason) => format!("{reason}: {}", self.message),
            None => self.message.clone(),
        }
    }
}

/// Submission contract for a remote analytical query engine.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Submit rendered query text for execution (or validation, when
    /// the scope's dry-run flag is set).
    ///
    /// # Errors
    ///
    /// Returns a transport or API error when the engine rejects the
    /// submission outright.
    async fn submit(&self, query: &str, scope: &QueryScope) -> anyhow::Result<JobHandle>;

    /// Block until the job reaches a terminal state and return its
    /// outcome. Job-level failures are reported inside the outcome,
    /// not as an `Err`.
    ///
    /// # Errors
    ///
    /// Returns a transport or API error when the status poll itself
    /// fails.
    async fn wait(&self, handle: &JobHandle) -> anyhow::Result<JobOutcome>;
}
