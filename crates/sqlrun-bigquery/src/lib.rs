//! BigQuery v2 REST implementation of the sqlrun query engine seam.

pub mod auth;
pub mod client;
pub mod error;
pub mod wire;

// Re-export public API for convenience
pub use auth::{exchange_impersonated_token, EnvToken, StaticToken, TokenProvider};
pub use client::BigQueryEngine;
pub use error::BigQueryError;
