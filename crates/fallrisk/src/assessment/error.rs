use std::fmt;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::repository::StoreError;
use super::scorer::ScorerError;

/// Failure taxonomy shared by submission, history, and aggregation.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Bad input. Never retried.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Expected data is absent; not an outage.
    #[error("{0}")]
    NotFound(String),
    /// The scoring collaborator failed or answered unexpectedly.
    #[error("scoring collaborator failed: {0}")]
    Upstream(#[from] ScorerError),
    /// Some independent lookups failed while others succeeded. Retryable.
    #[error(transparent)]
    PartialFailure(#[from] PartialFailure),
    /// Local persistence failed.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::Upstream(_) => StatusCode::BAD_GATEWAY,
            PipelineError::PartialFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::Upstream(_) | PipelineError::PartialFailure(_)
        )
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "retryable": self.is_retryable(),
        }));
        (status, body).into_response()
    }
}

/// Independently owned store consulted by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    UserProfile,
    RiskAssessment,
    Advice,
    Doctor,
}

impl Source {
    pub fn label(&self) -> &'static str {
        match self {
            Source::UserProfile => "user profile",
            Source::RiskAssessment => "risk assessment",
            Source::Advice => "advice table",
            Source::Doctor => "doctor assignment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Unavailable(String),
    TimedOut(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: Source,
    pub reason: FailureReason,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            FailureReason::Unavailable(cause) => {
                write!(f, "{} unavailable ({cause})", self.source.label())
            }
            FailureReason::TimedOut(limit) => write!(
                f,
                "{} timed out after {}ms",
                self.source.label(),
                limit.as_millis()
            ),
        }
    }
}

/// Lookups that could not be completed during a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialFailure {
    pub failures: Vec<SourceFailure>,
}

impl PartialFailure {
    pub fn sources(&self) -> Vec<Source> {
        self.failures.iter().map(|failure| failure.source).collect()
    }
}

impl fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.failures.iter().map(ToString::to_string).collect();
        write!(f, "cross-store lookup failed: {}", parts.join(", "))
    }
}

impl std::error::Error for PartialFailure {}
