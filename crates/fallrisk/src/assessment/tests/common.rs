use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::assessment::aggregate::CrossStoreAggregator;
use crate::assessment::domain::{
    AnswerSet, Doctor, NewNotification, NewRiskAssessment, Notification, RiskAssessment,
    RiskTier, UserId, UserProfile,
};
use crate::assessment::memory::InMemoryStores;
use crate::assessment::repository::{
    AdviceSheet, AdviceTable, AssessmentStore, DoctorDirectory, NotificationLog,
    ProfileDirectory, StoreError, Stores,
};
use crate::assessment::scorer::{Scorer, ScorerError};
use crate::assessment::scoring::ScoreOutcome;
use crate::config::DerivedWritePolicy;

pub(super) const LOOKUP_TIMEOUT: Duration = Duration::from_millis(50);

pub(super) fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 14, 10, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn answers(pairs: &[(&str, i64)]) -> std::collections::BTreeMap<String, i64> {
    pairs
        .iter()
        .map(|(question, option)| (question.to_string(), *option))
        .collect()
}

pub(super) fn profile(user: i64, name: &str) -> UserProfile {
    UserProfile {
        user_id: UserId(user),
        name: name.to_string(),
        email: Some(format!("user{user}@example.com")),
        date_of_birth: Some("1950-04-02".to_string()),
        phone_number: None,
        address: Some("12 Jalan Bukit".to_string()),
    }
}

pub(super) fn doctor() -> Doctor {
    Doctor {
        doctor_id: 1,
        name: "Dr. Aisha Rahman".to_string(),
    }
}

/// Stores with a profile and doctor for `user`, but no assessments yet.
pub(super) fn seeded_stores(user: i64) -> InMemoryStores {
    let stores = InMemoryStores::default();
    stores
        .profiles
        .upsert(profile(user, "Lim Ah Kow"))
        .expect("profile seeds");
    stores
        .doctors
        .assign(UserId(user), doctor())
        .expect("doctor seeds");
    stores
}

pub(super) async fn insert_assessment(
    stores: &InMemoryStores,
    user: i64,
    score: i64,
    created_at: DateTime<Utc>,
) -> RiskAssessment {
    let tier = RiskTier::from_score(score);
    stores
        .assessments
        .insert(NewRiskAssessment {
            user_id: UserId(user),
            total_score: score,
            risk_level: tier,
            recommendation: tier.recommendation().to_string(),
            question_responses: AnswerSet::new().with(1, 1),
            created_at,
        })
        .await
        .expect("assessment inserts")
}

pub(super) fn aggregator(stores: Stores, policy: DerivedWritePolicy) -> CrossStoreAggregator {
    CrossStoreAggregator::new(stores, LOOKUP_TIMEOUT, policy)
}

/// Remote collaborator stand-in that always answers with a non-success status.
#[derive(Default)]
pub(super) struct RejectingScorer {
    pub(super) calls: AtomicUsize,
}

#[async_trait]
impl Scorer for RejectingScorer {
    fn name(&self) -> &'static str {
        "rejecting"
    }

    async fn score(&self, _answers: &AnswerSet) -> Result<ScoreOutcome, ScorerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ScorerError::Status {
            status: 503,
            body: "scoring offline".to_string(),
        })
    }
}

/// Assessment store whose writes always fail.
pub(super) struct BrokenAssessmentStore;

#[async_trait]
impl AssessmentStore for BrokenAssessmentStore {
    async fn insert(&self, _record: NewRiskAssessment) -> Result<RiskAssessment, StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    async fn latest(&self, _user_id: UserId) -> Result<Option<RiskAssessment>, StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    async fn history(&self, _user_id: UserId) -> Result<Vec<RiskAssessment>, StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }
}

/// Doctor directory that never answers within the lookup timeout.
pub(super) struct StalledDoctorDirectory;

#[async_trait]
impl DoctorDirectory for StalledDoctorDirectory {
    async fn assigned_doctor(&self, _user_id: UserId) -> Result<Option<Doctor>, StoreError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(Some(doctor()))
    }
}

pub(super) struct OfflineProfileDirectory;

#[async_trait]
impl ProfileDirectory for OfflineProfileDirectory {
    async fn profile(&self, _user_id: UserId) -> Result<Option<UserProfile>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

pub(super) struct BrokenNotificationLog;

#[async_trait]
impl NotificationLog for BrokenNotificationLog {
    async fn append(&self, _record: NewNotification) -> Result<Notification, StoreError> {
        Err(StoreError::Unavailable("read-only replica".to_string()))
    }

    async fn append_once(
        &self,
        _record: NewNotification,
    ) -> Result<Option<Notification>, StoreError> {
        Err(StoreError::Unavailable("read-only replica".to_string()))
    }
}

pub(super) fn with_doctors(stores: Stores, doctors: Arc<dyn DoctorDirectory>) -> Stores {
    Stores { doctors, ..stores }
}

/// Wraps a store and delays every read by a fixed amount.
pub(super) struct Sluggish<T> {
    pub(super) inner: T,
    pub(super) delay: Duration,
}

impl<T> Sluggish<T> {
    pub(super) fn new(inner: T, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<T: AssessmentStore> AssessmentStore for Sluggish<T> {
    async fn insert(&self, record: NewRiskAssessment) -> Result<RiskAssessment, StoreError> {
        self.inner.insert(record).await
    }

    async fn latest(&self, user_id: UserId) -> Result<Option<RiskAssessment>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.latest(user_id).await
    }

    async fn history(&self, user_id: UserId) -> Result<Vec<RiskAssessment>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.history(user_id).await
    }
}

#[async_trait]
impl<T: ProfileDirectory> ProfileDirectory for Sluggish<T> {
    async fn profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.profile(user_id).await
    }
}

#[async_trait]
impl<T: AdviceTable> AdviceTable for Sluggish<T> {
    async fn advice_sheet(&self) -> Result<AdviceSheet, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.advice_sheet().await
    }
}

#[async_trait]
impl<T: DoctorDirectory> DoctorDirectory for Sluggish<T> {
    async fn assigned_doctor(&self, user_id: UserId) -> Result<Option<Doctor>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.assigned_doctor(user_id).await
    }
}
