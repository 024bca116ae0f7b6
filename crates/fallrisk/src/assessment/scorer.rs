use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{AnswerSet, RiskTier};
use super::scoring::{recommendation_for_label, ScoreOutcome, ScoringEngine};

/// Strategy computing a score for an answer set, in-process or through a collaborator.
#[async_trait]
pub trait Scorer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn score(&self, answers: &AnswerSet) -> Result<ScoreOutcome, ScorerError>;
}

/// Scores with the in-process engine. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScorer {
    engine: ScoringEngine,
}

impl LocalScorer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Scorer for LocalScorer {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn score(&self, answers: &AnswerSet) -> Result<ScoreOutcome, ScorerError> {
        Ok(self.engine.score(answers))
    }
}

/// Delegates to a remote collaborator speaking the `analyze` contract.
#[derive(Debug, Clone)]
pub struct RemoteScorer {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    answers: &'a AnswerSet,
}

#[derive(Debug, Deserialize)]
struct AnalyzeReply {
    total_score: i64,
    risk_level: String,
    #[serde(default)]
    recommendation: String,
}

impl RemoteScorer {
    /// `base_url` is the collaborator root, e.g. `http://scoring:8080`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        let endpoint = format!("{}/api/v1/analyze", base_url.trim_end_matches('/'));
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Scorer for RemoteScorer {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn score(&self, answers: &AnswerSet) -> Result<ScoreOutcome, ScorerError> {
        debug!(endpoint = %self.endpoint, answers = answers.len(), "delegating scoring");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&AnalyzeRequest { answers })
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ScorerError::Timeout(self.endpoint.clone())
                } else {
                    ScorerError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScorerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: AnalyzeReply = response
            .json()
            .await
            .map_err(|err| ScorerError::Decode(err.to_string()))?;

        let risk_level = RiskTier::parse(&reply.risk_level)
            .ok_or_else(|| ScorerError::Decode(format!("unknown tier '{}'", reply.risk_level)))?;

        let recommendation = if reply.recommendation.trim().is_empty() {
            recommendation_for_label(&reply.risk_level).to_string()
        } else {
            reply.recommendation
        };

        let outcome = ScoreOutcome {
            total_score: reply.total_score,
            risk_level,
            recommendation,
            contributions: Vec::new(),
        };

        if !outcome.is_consistent() {
            return Err(ScorerError::Inconsistent {
                total_score: outcome.total_score,
                risk_level,
            });
        }

        Ok(outcome)
    }
}

/// Failure of a scoring strategy.
#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    #[error("request to {0} timed out")]
    Timeout(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("collaborator returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unreadable reply: {0}")]
    Decode(String),
    #[error("reply tier {risk_level} does not follow from score {total_score}")]
    Inconsistent { total_score: i64, risk_level: RiskTier },
}
