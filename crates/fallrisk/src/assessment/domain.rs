use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::PipelineError;

/// Identifier of a user as issued by the profile store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    /// Reject zero and negative identifiers before any side effect happens.
    pub fn parse(raw: i64) -> Result<Self, PipelineError> {
        if raw <= 0 {
            return Err(PipelineError::Validation(format!(
                "user_id must be a positive integer, got {raw}"
            )));
        }
        Ok(Self(raw))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned identifier; increases with insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentId(pub u64);

impl fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub u32);

/// One submission's questionnaire responses: question identifier to selected option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<QuestionId, i64>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, question: u32, option: i64) -> Self {
        self.0.insert(QuestionId(question), option);
        self
    }

    /// Convert the wire map (string keys) into typed answers.
    ///
    /// A negative option is a validation failure. Keys that are not integers are
    /// logged and dropped, matching how unknown question ids are treated by the
    /// scoring engine. An empty map yields an empty set.
    pub fn from_wire(raw: &BTreeMap<String, i64>) -> Result<Self, PipelineError> {
        let mut answers = BTreeMap::new();
        for (key, option) in raw {
            let Ok(question) = key.trim().parse::<u32>() else {
                warn!(question_key = %key, "ignoring non-numeric question id");
                continue;
            };
            if *option < 0 {
                return Err(PipelineError::Validation(format!(
                    "answer for question {question} must be non-negative, got {option}"
                )));
            }
            answers.insert(QuestionId(question), *option);
        }

        Ok(Self(answers))
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, i64)> + '_ {
        self.0.iter().map(|(question, option)| (*question, *option))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Coarse risk classification derived from the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl RiskTier {
    pub const ALL: [RiskTier; 3] = [RiskTier::Low, RiskTier::Moderate, RiskTier::High];

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Moderate => "Moderate",
            RiskTier::High => "High",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "moderate" | "medium" => Some(Self::Moderate),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Persisted scoring result. Append-only; the newest row is the user's current assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub id: AssessmentId,
    pub user_id: UserId,
    pub total_score: i64,
    pub risk_level: RiskTier,
    pub recommendation: String,
    pub question_responses: AnswerSet,
    pub created_at: DateTime<Utc>,
}

impl RiskAssessment {
    /// A row whose tier does not follow from its score is stale or corrupt.
    pub fn is_consistent(&self) -> bool {
        RiskTier::from_score(self.total_score) == self.risk_level
    }
}

/// Row handed to the assessment store; the store assigns the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRiskAssessment {
    pub user_id: UserId,
    pub total_score: i64,
    pub risk_level: RiskTier,
    pub recommendation: String,
    pub question_responses: AnswerSet,
    pub created_at: DateTime<Utc>,
}

/// Order assessments newest first: creation time, then identifier, both descending.
pub fn newest_first(assessments: &mut [RiskAssessment]) {
    assessments.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub doctor_id: i64,
    pub name: String,
}

/// Derived record appended when a notification view is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub user_id: UserId,
    pub assessment_id: AssessmentId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub assessment_id: AssessmentId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Derived record appended when a report is generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub id: u64,
    pub user_id: UserId,
    pub assessment_id: AssessmentId,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub user_id: UserId,
    pub assessment_id: AssessmentId,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(id: u64, minute: u32) -> RiskAssessment {
        RiskAssessment {
            id: AssessmentId(id),
            user_id: UserId(3),
            total_score: 4,
            risk_level: RiskTier::Low,
            recommendation: String::new(),
            question_responses: AnswerSet::new(),
            created_at: Utc
                .with_ymd_and_hms(2025, 3, 1, 9, minute, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[test]
    fn user_id_rejects_non_positive_values() {
        assert!(UserId::parse(0).is_err());
        assert!(UserId::parse(-4).is_err());
        assert_eq!(UserId::parse(9).expect("positive id"), UserId(9));
    }

    #[test]
    fn from_wire_drops_non_numeric_keys() {
        let mut raw = BTreeMap::new();
        raw.insert("1".to_string(), 1);
        raw.insert("dizziness".to_string(), 1);
        raw.insert(" 6 ".to_string(), 1);

        let answers = AnswerSet::from_wire(&raw).expect("valid answers");
        let collected: Vec<_> = answers.iter().collect();
        assert_eq!(collected, vec![(QuestionId(1), 1), (QuestionId(6), 1)]);
    }

    #[test]
    fn from_wire_accepts_empty_and_rejects_negative_answers() {
        let empty = AnswerSet::from_wire(&BTreeMap::new()).expect("empty map is valid");
        assert!(empty.is_empty());

        let mut raw = BTreeMap::new();
        raw.insert("2".to_string(), -1);
        assert!(matches!(
            AnswerSet::from_wire(&raw),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn newest_first_breaks_timestamp_ties_by_identifier() {
        let mut rows = vec![row(1, 5), row(3, 10), row(2, 10), row(4, 1)];
        newest_first(&mut rows);
        let ids: Vec<u64> = rows.iter().map(|row| row.id.0).collect();
        assert_eq!(ids, vec![3, 2, 1, 4]);
    }

    #[test]
    fn tier_parse_accepts_labels_case_insensitively() {
        assert_eq!(RiskTier::parse("HIGH"), Some(RiskTier::High));
        assert_eq!(RiskTier::parse(" moderate"), Some(RiskTier::Moderate));
        assert_eq!(RiskTier::parse("severe"), None);
    }

    #[test]
    fn answer_set_serializes_question_ids_as_string_keys() {
        let answers = AnswerSet::new().with(1, 1).with(6, 1);
        let value = serde_json::to_value(&answers).expect("serializes");
        assert_eq!(value, serde_json::json!({ "1": 1, "6": 1 }));
    }
}
