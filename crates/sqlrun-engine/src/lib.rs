//! Core execution engine for sqlrun SQL pipelines.

pub mod client;
pub mod config;
pub mod discover;
pub mod error;
pub mod orchestrator;
pub mod result;
pub mod template;

// Re-export public API for convenience
pub use client::{JobFailure, JobHandle, JobOutcome, QueryEngine, QueryScope};
pub use error::PipelineError;
pub use orchestrator::run_pipeline;
pub use result::{RunSummary, UnitOutcome, UnitStatus};
