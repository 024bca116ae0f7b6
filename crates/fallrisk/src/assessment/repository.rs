use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::domain::{
    Doctor, NewNotification, NewReport, NewRiskAssessment, Notification, Report, RiskAssessment,
    RiskTier, UserId, UserProfile,
};

/// Append-only store of scored assessments.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn insert(&self, record: NewRiskAssessment) -> Result<RiskAssessment, StoreError>;
    /// Newest row by creation time, ties broken by the larger identifier.
    async fn latest(&self, user_id: UserId) -> Result<Option<RiskAssessment>, StoreError>;
    async fn history(&self, user_id: UserId) -> Result<Vec<RiskAssessment>, StoreError>;
}

/// Read-only view of the user-profile store.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError>;
}

/// Externally maintained tier to advice table. May diverge from the engine's built-in text.
#[async_trait]
pub trait AdviceTable: Send + Sync {
    async fn advice_sheet(&self) -> Result<AdviceSheet, StoreError>;
}

#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn assigned_doctor(&self, user_id: UserId) -> Result<Option<Doctor>, StoreError>;
}

/// Log of derived notification rows.
#[async_trait]
pub trait NotificationLog: Send + Sync {
    async fn append(&self, record: NewNotification) -> Result<Notification, StoreError>;
    /// Append unless a row for the same user and assessment exists; `None` when skipped.
    async fn append_once(&self, record: NewNotification)
        -> Result<Option<Notification>, StoreError>;
}

/// Log of derived report rows.
#[async_trait]
pub trait ReportLog: Send + Sync {
    async fn append(&self, record: NewReport) -> Result<Report, StoreError>;
    async fn append_once(&self, record: NewReport) -> Result<Option<Report>, StoreError>;
}

/// Snapshot of the advice table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdviceSheet {
    entries: BTreeMap<RiskTier, String>,
}

impl AdviceSheet {
    pub fn new(entries: BTreeMap<RiskTier, String>) -> Self {
        Self { entries }
    }

    /// Sheet carrying the scoring engine's own recommendation text.
    pub fn builtin() -> Self {
        let entries = RiskTier::ALL
            .into_iter()
            .map(|tier| (tier, tier.recommendation().to_string()))
            .collect();
        Self { entries }
    }

    pub fn advice_for(&self, tier: RiskTier) -> Option<&str> {
        self.entries.get(&tier).map(String::as_str)
    }

    pub fn set(&mut self, tier: RiskTier, advice: impl Into<String>) {
        self.entries.insert(tier, advice.into());
    }
}

/// Handles to every independently owned store the pipeline touches.
#[derive(Clone)]
pub struct Stores {
    pub assessments: Arc<dyn AssessmentStore>,
    pub profiles: Arc<dyn ProfileDirectory>,
    pub advice: Arc<dyn AdviceTable>,
    pub doctors: Arc<dyn DoctorDirectory>,
    pub notifications: Arc<dyn NotificationLog>,
    pub reports: Arc<dyn ReportLog>,
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
