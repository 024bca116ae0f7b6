use std::sync::Arc;

use tracing::{debug, error, warn};

use super::domain::{newest_first, RiskAssessment, UserId};
use super::error::PipelineError;
use super::repository::AssessmentStore;

/// Read-only views over a user's assessments. Never writes to any store.
pub struct HistoryService {
    store: Arc<dyn AssessmentStore>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn AssessmentStore>) -> Self {
        Self { store }
    }

    pub async fn latest(&self, user_id: i64) -> Result<RiskAssessment, PipelineError> {
        let user_id = parse_user(user_id, "latest")?;
        let latest = self.store.latest(user_id).await.map_err(|err| {
            error!(user_id = user_id.0, operation = "latest", error = %err, "lookup failed");
            PipelineError::Storage(err)
        })?;

        let assessment = latest.ok_or_else(|| not_found(user_id, "latest"))?;
        flag_if_stale(&assessment);
        Ok(assessment)
    }

    /// All assessments, newest first. Repeated calls without writes return the same sequence.
    pub async fn history(&self, user_id: i64) -> Result<Vec<RiskAssessment>, PipelineError> {
        let user_id = parse_user(user_id, "history")?;
        let mut rows = self.store.history(user_id).await.map_err(|err| {
            error!(user_id = user_id.0, operation = "history", error = %err, "lookup failed");
            PipelineError::Storage(err)
        })?;

        if rows.is_empty() {
            return Err(not_found(user_id, "history"));
        }

        newest_first(&mut rows);
        rows.iter().for_each(flag_if_stale);
        Ok(rows)
    }
}

fn parse_user(raw: i64, operation: &'static str) -> Result<UserId, PipelineError> {
    UserId::parse(raw).map_err(|err| {
        warn!(user_id = raw, operation, error = %err, "rejected lookup");
        err
    })
}

fn not_found(user_id: UserId, operation: &'static str) -> PipelineError {
    debug!(user_id = user_id.0, operation, "user has no assessments");
    PipelineError::NotFound(format!("no risk assessments found for user {user_id}"))
}

fn flag_if_stale(assessment: &RiskAssessment) {
    if !assessment.is_consistent() {
        warn!(
            user_id = assessment.user_id.0,
            assessment_id = assessment.id.0,
            total_score = assessment.total_score,
            risk_level = %assessment.risk_level,
            "stored tier does not match score"
        );
    }
}
