//! BigQuery query engine client.
//!
//! [`BigQueryEngine`] implements the engine seam over the BigQuery v2
//! REST API. It is constructed once per run — construction performs a
//! connectivity/authorization probe so credential or endpoint problems
//! fail the run before any unit executes — and is reused, immutably,
//! for every unit in the sequence.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use sqlrun_engine::{JobFailure, JobHandle, JobOutcome, QueryEngine, QueryScope};

use crate::auth::TokenProvider;
use crate::error::BigQueryError;
use crate::wire::{
    ApiErrorEnvelope, DatasetReference, InsertJobReference, InsertJobRequest, Job,
    JobConfiguration, QueryConfiguration,
};

/// Production BigQuery endpoint.
pub const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Client for submitting query jobs to BigQuery.
pub struct BigQueryEngine {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    tokens: Arc<dyn TokenProvider>,
    poll_interval: Duration,
}

impl BigQueryEngine {
    /// Connect to the production endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`BigQueryError`] when the probe request fails — bad
    /// credentials or an unreachable endpoint are detected here, once,
    /// up front.
    pub async fn connect(
        project_id: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, BigQueryError> {
        Self::connect_with_base_url(project_id, tokens, DEFAULT_BASE_URL).await
    }

    /// Connect against a non-default endpoint. Used by tests.
    ///
    /// # Errors
    ///
    /// Returns [`BigQueryError`] when the probe request fails.
    pub async fn connect_with_base_url(
        project_id: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        base_url: impl Into<String>,
    ) -> Result<Self, BigQueryError> {
        let engine = Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            project_id: project_id.into(),
            tokens,
            poll_interval: DEFAULT_POLL_INTERVAL,
        };
        engine.probe().await?;
        Ok(engine)
    }

    /// Override the job status poll interval. Used by tests.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Cheap authenticated call that verifies the endpoint is reachable
    /// and the credential is accepted for this project.
    async fn probe(&self) -> Result<(), BigQueryError> {
        let url = format!("{}/projects/{}/datasets", self.base_url, self.project_id);
        let response = self
            .http
            .get(&url)
            .query(&[("maxResults", "1")])
            .bearer_auth(self.token().await?)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn token(&self) -> Result<String, BigQueryError> {
        self.tokens
            .access_token()
            .await
            .map_err(BigQueryError::Token)
    }

    /// Map a non-success response to a typed API error, decoding the
    /// standard error envelope when the body carries one.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BigQueryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorEnvelope>(&body) {
            Ok(envelope) => envelope.error.message,
            Err(_) => body,
        };
        Err(BigQueryError::Api {
            code: status.as_u16(),
            message,
        })
    }

    fn job_outcome(job: &Job) -> JobOutcome {
        let failure = job
            .status
            .as_ref()
            .and_then(|status| status.error_result.as_ref())
            .map(|error| JobFailure {
                reason: error.reason.clone(),
                message: error.message.clone(),
            });
        let total_bytes_processed = job
            .statistics
            .as_ref()
            .and_then(|stats| stats.total_bytes_processed.as_deref())
            .and_then(|bytes| bytes.parse().ok());
        JobOutcome {
            failure,
            total_bytes_processed,
        }
    }
}

#[async_trait]
impl QueryEngine for BigQueryEngine {
    async fn submit(&self, query: &str, scope: &QueryScope) -> anyhow::Result<JobHandle> {
        let request = InsertJobRequest {
            configuration: JobConfiguration {
                query: QueryConfiguration {
                    query: query.to_string(),
                    use_legacy_sql: false,
                    default_dataset: scope.dataset.as_ref().map(|dataset| DatasetReference {
                        project_id: self.project_id.clone(),
                        dataset_id: dataset.clone(),
                    }),
                },
                dry_run: scope.dry_run,
            },
            job_reference: scope.location.as_ref().map(|location| InsertJobReference {
                location: Some(location.clone()),
            }),
        };

        let url = format!("{}/projects/{}/jobs", self.base_url, self.project_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.token().await?)
            .json(&request)
            .send()
            .await
            .map_err(BigQueryError::from)?;
        let response = Self::check_status(response).await?;
        let job: Job = response.json().await.map_err(BigQueryError::from)?;

        if scope.dry_run {
            // Dry-run responses carry no job id and are already
            // terminal; the outcome travels on the handle.
            return Ok(JobHandle {
                job_id: None,
                location: scope.location.clone(),
                immediate: Some(Self::job_outcome(&job)),
            });
        }

        let reference = job.job_reference.as_ref().ok_or_else(|| {
            BigQueryError::Malformed("job response missing jobReference".to_string())
        })?;
        let immediate = job
            .status
            .as_ref()
            .filter(|status| status.is_done())
            .map(|_| Self::job_outcome(&job));
        tracing::debug!(job_id = %reference.job_id, "job submitted");

        Ok(JobHandle {
            job_id: Some(reference.job_id.clone()),
            location: reference
                .location
                .clone()
                .or_else(|| scope.location.clone()),
            immediate,
        })
    }

    async fn wait(&self, handle: &JobHandle) -> anyhow::Result<JobOutcome> {
        if let Some(outcome) = &handle.immediate {
            return Ok(outcome.clone());
        }
        let job_id = handle.job_id.as_deref().ok_or_else(|| {
            BigQueryError::Malformed("job handle has neither id nor terminal outcome".to_string())
        })?;

        let url = format!(
            "{}/projects/{}/jobs/{}",
            self.base_url, self.project_id, job_id
        );
        loop {
            let mut request = self.http.get(&url).bearer_auth(self.token().await?);
            if let Some(location) = &handle.location {
                request = request.query(&[("location", location.as_str())]);
            }
            let response = request.send().await.map_err(BigQueryError::from)?;
            let response = Self::check_status(response).await?;
            let job: Job = response.json().await.map_err(BigQueryError::from)?;

            if job.status.as_ref().is_some_and(|status| status.is_done()) {
                return Ok(Self::job_outcome(&job));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
