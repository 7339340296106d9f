//! BigQuery client error types.

/// Errors produced by [`BigQueryEngine`](crate::BigQueryEngine) calls.
#[derive(Debug, thiserror::Error)]
pub enum BigQueryError {
    /// HTTP transport failure (connect, TLS, timeout).
    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("api error {code}: {message}")]
    Api { code: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The token provider failed to produce a credential.
    #[error("token acquisition failed: {0}")]
    Token(#[source] anyhow::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, BigQueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_code_and_message() {
        let err = BigQueryError::Api {
            code: 403,
            message: "Access Denied".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("403"), "got: {msg}");
        assert!(msg.contains("Access Denied"), "got: {msg}");
    }

    #[test]
    fn token_error_retains_source() {
        use std::error::Error as _;

        let err = BigQueryError::Token(anyhow::anyhow!("GOOGLE_OAUTH_ACCESS_TOKEN is not set"));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("token acquisition"));
    }

    #[test]
    fn malformed_displays_detail() {
        let err = BigQueryError::Malformed("job response missing jobReference".to_string());
        assert!(err.to_string().contains("jobReference"));
    }
}
