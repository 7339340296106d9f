//! Pipeline orchestrator: validates configuration, discovers units, and
//! renders, submits, and awaits them strictly one at a time.
//!
//! Later units may depend on side effects (tables, views) created by
//! earlier units, so no parallel submission is permitted. Any fatal
//! error terminates the sequence immediately; the skip-on-empty-render
//! branch is the only non-fatal path.

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::client::{QueryEngine, QueryScope};
use crate::config::types::RunConfig;
use crate::config::validator::validate_config;
use crate::discover::discover_units;
use crate::error::PipelineError;
use crate::result::{RunSummary, UnitOutcome, UnitStatus};
use crate::template::{render, RenderContext};

/// Execute the pipeline described by `config` against `engine`.
///
/// Cancelling `cancel` aborts the in-flight submit or await and
/// terminates the run without attempting further units.
///
/// # Errors
///
/// Returns the first fatal [`PipelineError`]; units after the failing
/// one are never submitted.
pub async fn run_pipeline(
    config: &RunConfig,
    engine: &dyn QueryEngine,
    cancel: &CancellationToken,
) -> Result<RunSummary, PipelineError> {
    let run_start = Instant::now();
    validate_config(config)?;

    let units = discover_units(&config.directory)?;
    if units.is_empty() {
        tracing::info!(
            directory = %config.directory.display(),
            "no SQL files found, nothing to do"
        );
        return Ok(RunSummary::empty(run_start.elapsed()));
    }
    tracing::info!(
        files = units.len(),
        directory = %config.directory.display(),
        "discovered SQL files"
    );

    let root = config
        .directory
        .canonicalize()
        .map_err(|source| PipelineError::DiscoveryFailed {
            dir: config.directory.clone(),
            source,
        })?;
    let ctx = RenderContext::new(config);
    let scope = QueryScope::from_config(config);

    let mut outcomes = Vec::with_capacity(units.len());
    for unit in &units {
        if cancel.is_cancelled() {
            return Err(PipelineError::Interrupted);
        }

        let started = Instant::now();
        tracing::info!(unit = %unit.path.display(), "processing");

        // Resolved path must stay within the configured root; symlinked
        // or relative escapes fail closed.
        let resolved = unit
            .path
            .canonicalize()
            .map_err(|_| PipelineError::InvalidPath {
                unit: unit.path.clone(),
            })?;
        if !resolved.starts_with(&root) {
            return Err(PipelineError::InvalidPath {
                unit: unit.path.clone(),
            });
        }

        let text =
            std::fs::read_to_string(&resolved).map_err(|source| PipelineError::UnitUnreadable {
                unit: unit.path.clone(),
                source,
            })?;

        let sql = render(&text, &ctx, &unit.path)?;
        if sql.trim().is_empty() {
            tracing::info!(unit = %unit.path.display(), "rendered SQL is empty, skipping");
            outcomes.push(UnitOutcome {
                path: unit.path.clone(),
                status: UnitStatus::Skipped,
                duration: started.elapsed(),
            });
            continue;
        }

        let handle = tokio::select! {
            () = cancel.cancelled() => return Err(PipelineError::Interrupted),
            result = engine.submit(&sql, &scope) => {
                result.map_err(|source| PipelineError::SubmitFailed {
                    unit: unit.path.clone(),
                    source,
                })?
            }
        };

        let outcome = tokio::select! {
            () = cancel.cancelled() => return Err(PipelineError::Interrupted),
            result = engine.wait(&handle) => {
                result.map_err(|source| PipelineError::AwaitFailed {
                    unit: unit.path.clone(),
                    source,
                })?
            }
        };

        if let Some(failure) = outcome.failure {
            return Err(PipelineError::JobFailed {
                unit: unit.path.clone(),
                message: failure.describe(),
            });
        }

        let duration = started.elapsed();
        let status = if config.dry_run {
            UnitStatus::Validated
        } else {
            UnitStatus::Completed
        };
        tracing::info!(
            unit = %unit.path.display(),
            elapsed_ms = duration.as_millis() as u64,
            outcome = status.label(),
            "unit finished"
        );
        outcomes.push(UnitOutcome {
            path: unit.path.clone(),
            status,
            duration,
        });
    }

    Ok(RunSummary {
        outcomes,
        duration: run_start.elapsed(),
    })
}
