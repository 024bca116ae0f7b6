use super::super::domain::RiskTier;

pub const LOW_CEILING: i64 = 5;
pub const MODERATE_CEILING: i64 = 10;

pub const NO_RECOMMENDATION: &str = "No recommendation available.";

impl RiskTier {
    /// `score <= 5` is Low, `5 < score <= 10` is Moderate, anything higher is High.
    pub fn from_score(score: i64) -> Self {
        if score <= LOW_CEILING {
            RiskTier::Low
        } else if score <= MODERATE_CEILING {
            RiskTier::Moderate
        } else {
            RiskTier::High
        }
    }

    /// Built-in advice text for the tier.
    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskTier::Low => "Maintain a healthy lifestyle with balance exercises and check-ups.",
            RiskTier::Moderate => {
                "Consider physical therapy, improve home safety, and monitor medications."
            }
            RiskTier::High => {
                "Consult a healthcare provider for a fall risk assessment and use mobility aids."
            }
        }
    }
}

/// Recommendation for a tier label coming from outside the process.
pub fn recommendation_for_label(label: &str) -> &'static str {
    RiskTier::parse(label)
        .map(|tier| tier.recommendation())
        .unwrap_or(NO_RECOMMENDATION)
}
