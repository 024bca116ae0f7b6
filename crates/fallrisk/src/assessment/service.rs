use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::domain::{AnswerSet, NewRiskAssessment, RiskAssessment, UserId};
use super::error::PipelineError;
use super::repository::AssessmentStore;
use super::scorer::Scorer;
use super::scoring::{ScoreOutcome, ScoringEngine};

/// Intake service: validates, scores once, and persists one assessment per submission.
pub struct SubmissionService {
    scorer: Arc<dyn Scorer>,
    store: Arc<dyn AssessmentStore>,
    engine: ScoringEngine,
}

impl SubmissionService {
    pub fn new(scorer: Arc<dyn Scorer>, store: Arc<dyn AssessmentStore>) -> Self {
        Self {
            scorer,
            store,
            engine: ScoringEngine::new(),
        }
    }

    /// Score and persist a submission.
    ///
    /// A failed or non-success remote scoring call fails the whole submission; the
    /// local engine is never used as a fallback so both paths cannot diverge.
    pub async fn submit(
        &self,
        user_id: i64,
        answers: &BTreeMap<String, i64>,
    ) -> Result<RiskAssessment, PipelineError> {
        let (user_id, answers) = validated(user_id, answers)?;

        let outcome = self.scorer.score(&answers).await.map_err(|err| {
            error!(
                user_id = user_id.0,
                operation = "submit",
                scorer = self.scorer.name(),
                error = %err,
                "scoring failed"
            );
            PipelineError::Upstream(err)
        })?;

        let record = NewRiskAssessment {
            user_id,
            total_score: outcome.total_score,
            risk_level: outcome.risk_level,
            recommendation: outcome.recommendation,
            question_responses: answers,
            created_at: Utc::now(),
        };

        let stored = self.store.insert(record).await.map_err(|err| {
            error!(
                user_id = user_id.0,
                operation = "submit",
                error = %err,
                "persisting assessment failed"
            );
            PipelineError::Storage(err)
        })?;

        info!(
            user_id = user_id.0,
            assessment_id = stored.id.0,
            total_score = stored.total_score,
            risk_level = %stored.risk_level,
            "assessment stored"
        );
        Ok(stored)
    }

    /// Score without persisting. Always uses the in-process engine, since this is the
    /// operation remote scorers call. An empty answer set scores 0 (Low).
    pub fn analyze(
        &self,
        user_id: Option<i64>,
        answers: &BTreeMap<String, i64>,
    ) -> Result<(Option<UserId>, ScoreOutcome), PipelineError> {
        let parsed = user_id
            .map(UserId::parse)
            .transpose()
            .and_then(|user_id| AnswerSet::from_wire(answers).map(|answers| (user_id, answers)));
        let (user_id, answers) = parsed.map_err(|err| {
            warn!(operation = "analyze", error = %err, "rejected analysis request");
            err
        })?;
        Ok((user_id, self.engine.score(&answers)))
    }
}

fn validated(
    raw_user_id: i64,
    answers: &BTreeMap<String, i64>,
) -> Result<(UserId, AnswerSet), PipelineError> {
    UserId::parse(raw_user_id)
        .and_then(|user_id| AnswerSet::from_wire(answers).map(|answers| (user_id, answers)))
        .and_then(|(user_id, answers)| {
            if answers.is_empty() {
                return Err(PipelineError::Validation(
                    "answers must contain at least one numeric question id".to_string(),
                ));
            }
            Ok((user_id, answers))
        })
        .map_err(|err| {
            warn!(
                user_id = raw_user_id,
                operation = "submit",
                error = %err,
                "rejected submission"
            );
            err
        })
}
