mod tier;
mod weights;

pub use tier::{recommendation_for_label, LOW_CEILING, MODERATE_CEILING, NO_RECOMMENDATION};
pub use weights::Question;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{AnswerSet, QuestionId, RiskTier};

/// Stateless engine turning an answer set into a score, tier, and recommendation.
///
/// Total over its input: unknown question ids contribute nothing and are only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, answers: &AnswerSet) -> ScoreOutcome {
        let mut total_score: i64 = 0;
        let mut contributions = Vec::with_capacity(answers.len());

        for (question_id, option) in answers.iter() {
            match Question::from_id(question_id) {
                Some(question) => {
                    let points = question.weight().saturating_mul(option);
                    total_score = total_score.saturating_add(points);
                    contributions.push(ScoreContribution {
                        question: question_id,
                        option,
                        points,
                    });
                }
                None => {
                    warn!(question_id = question_id.0, "ignoring unknown question id");
                }
            }
        }

        let risk_level = RiskTier::from_score(total_score);
        ScoreOutcome {
            total_score,
            risk_level,
            recommendation: risk_level.recommendation().to_string(),
            contributions,
        }
    }
}

/// Points a single answered question added to the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreContribution {
    pub question: QuestionId,
    pub option: i64,
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub total_score: i64,
    pub risk_level: RiskTier,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributions: Vec<ScoreContribution>,
}

impl ScoreOutcome {
    pub fn is_consistent(&self) -> bool {
        RiskTier::from_score(self.total_score) == self.risk_level
    }
}
