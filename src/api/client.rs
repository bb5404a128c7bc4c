//! Core `AnalysisClient` trait and `HttpAnalysisClient` implementation.
//!
//! Endpoints are resolved relative to `AnalysisConfig::base_url`:
//!
//! | Call                | Method | Path                                  |
//! |---------------------|--------|---------------------------------------|
//! | realtime analysis   | POST   | `/exercises/{id}/realtime-analysis`   |
//! | session completion  | POST   | `/exercises/{id}/complete`            |
//! | exercise fetch      | GET    | `/exercises/{id}`                     |

use async_trait::async_trait;
use thiserror::Error;

use crate::api::types::{AnalysisRequest, CompletionRequest, ExerciseInfo, FeedbackResult};
use crate::config::AnalysisConfig;

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the analysis service.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be parsed as expected JSON.
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Parse(e.to_string())
        } else {
            ApiError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisClient trait
// ---------------------------------------------------------------------------

/// Async interface to the remote analysis service.
///
/// Implementors must be `Send + Sync`; the feedback dispatcher shares one
/// client across every in-flight request behind an `Arc<dyn AnalysisClient>`.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Score one pose.
    async fn analyze(
        &self,
        exercise_id: &str,
        request: &AnalysisRequest,
    ) -> Result<FeedbackResult, ApiError>;

    /// Report the finished session.
    async fn complete_session(
        &self,
        exercise_id: &str,
        request: &CompletionRequest,
    ) -> Result<(), ApiError>;

    /// Exercise metadata including the reference animation.
    async fn fetch_exercise(&self, exercise_id: &str) -> Result<ExerciseInfo, ApiError>;
}

// ---------------------------------------------------------------------------
// HttpAnalysisClient
// ---------------------------------------------------------------------------

/// JSON-over-HTTP client for the analysis service.
///
/// All connection details come from the [`AnalysisConfig`] passed to
/// [`HttpAnalysisClient::from_config`].
pub struct HttpAnalysisClient {
    client: reqwest::Client,
    config: AnalysisConfig,
}

impl HttpAnalysisClient {
    /// Build a client from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`; a default client is the fallback if the builder
    /// fails.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    /// Absolute URL for `path` under the configured base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Attach `Authorization: Bearer …` only when a non-empty token is set.
    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_token.as_deref() {
            Some(token) if !token.is_empty() => req.bearer_auth(token),
            _ => req,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn analyze(
        &self,
        exercise_id: &str,
        request: &AnalysisRequest,
    ) -> Result<FeedbackResult, ApiError> {
        let url = self.endpoint(&format!("exercises/{exercise_id}/realtime-analysis"));
        let response = self
            .authorize(self.client.post(&url).json(request))
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let result: FeedbackResult = response.json().await?;

        if result.score > 100 {
            return Err(ApiError::Parse(format!("score {} out of range", result.score)));
        }
        Ok(result)
    }

    async fn complete_session(
        &self,
        exercise_id: &str,
        request: &CompletionRequest,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("exercises/{exercise_id}/complete"));
        let response = self
            .authorize(self.client.post(&url).json(request))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn fetch_exercise(&self, exercise_id: &str) -> Result<ExerciseInfo, ApiError> {
        let url = self.endpoint(&format!("exercises/{exercise_id}"));
        let response = self.authorize(self.client.get(&url)).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
