//! In-process stores. Each store owns its own lock so writes serialize per store,
//! never across stores.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use async_trait::async_trait;

use super::domain::{
    newest_first, AssessmentId, Doctor, NewNotification, NewReport, NewRiskAssessment,
    Notification, Report, RiskAssessment, RiskTier, UserId, UserProfile,
};
use super::repository::{
    AdviceSheet, AdviceTable, AssessmentStore, DoctorDirectory, NotificationLog,
    ProfileDirectory, ReportLog, StoreError, Stores,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, store: &str) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable(format!("{store} lock poisoned")))
}

#[derive(Default)]
struct AssessmentRows {
    next_id: u64,
    rows: Vec<RiskAssessment>,
}

#[derive(Default, Clone)]
pub struct InMemoryAssessmentStore {
    inner: Arc<Mutex<AssessmentRows>>,
}

impl InMemoryAssessmentStore {
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AssessmentStore for InMemoryAssessmentStore {
    async fn insert(&self, record: NewRiskAssessment) -> Result<RiskAssessment, StoreError> {
        let mut guard = lock(&self.inner, "assessment store")?;
        guard.next_id += 1;
        let stored = RiskAssessment {
            id: AssessmentId(guard.next_id),
            user_id: record.user_id,
            total_score: record.total_score,
            risk_level: record.risk_level,
            recommendation: record.recommendation,
            question_responses: record.question_responses,
            created_at: record.created_at,
        };
        guard.rows.push(stored.clone());
        Ok(stored)
    }

    async fn latest(&self, user_id: UserId) -> Result<Option<RiskAssessment>, StoreError> {
        let guard = lock(&self.inner, "assessment store")?;
        Ok(guard
            .rows
            .iter()
            .filter(|row| row.user_id == user_id)
            .max_by_key(|row| (row.created_at, row.id))
            .cloned())
    }

    async fn history(&self, user_id: UserId) -> Result<Vec<RiskAssessment>, StoreError> {
        let guard = lock(&self.inner, "assessment store")?;
        let mut rows: Vec<RiskAssessment> = guard
            .rows
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        drop(guard);
        newest_first(&mut rows);
        Ok(rows)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryProfileDirectory {
    profiles: Arc<RwLock<HashMap<UserId, UserProfile>>>,
}

impl InMemoryProfileDirectory {
    pub fn upsert(&self, profile: UserProfile) -> Result<(), StoreError> {
        let mut guard = self
            .profiles
            .write()
            .map_err(|_| StoreError::Unavailable("profile directory lock poisoned".into()))?;
        guard.insert(profile.user_id, profile);
        Ok(())
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryProfileDirectory {
    async fn profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError> {
        let guard = self
            .profiles
            .read()
            .map_err(|_| StoreError::Unavailable("profile directory lock poisoned".into()))?;
        Ok(guard.get(&user_id).cloned())
    }
}

#[derive(Clone)]
pub struct InMemoryAdviceTable {
    sheet: Arc<RwLock<AdviceSheet>>,
}

impl Default for InMemoryAdviceTable {
    fn default() -> Self {
        Self {
            sheet: Arc::new(RwLock::new(AdviceSheet::builtin())),
        }
    }
}

impl InMemoryAdviceTable {
    pub fn set(&self, tier: RiskTier, advice: impl Into<String>) -> Result<(), StoreError> {
        let mut guard = self
            .sheet
            .write()
            .map_err(|_| StoreError::Unavailable("advice table lock poisoned".into()))?;
        guard.set(tier, advice);
        Ok(())
    }
}

#[async_trait]
impl AdviceTable for InMemoryAdviceTable {
    async fn advice_sheet(&self) -> Result<AdviceSheet, StoreError> {
        let guard = self
            .sheet
            .read()
            .map_err(|_| StoreError::Unavailable("advice table lock poisoned".into()))?;
        Ok(guard.clone())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryDoctorDirectory {
    assignments: Arc<RwLock<HashMap<UserId, Doctor>>>,
}

impl InMemoryDoctorDirectory {
    pub fn assign(&self, user_id: UserId, doctor: Doctor) -> Result<(), StoreError> {
        let mut guard = self
            .assignments
            .write()
            .map_err(|_| StoreError::Unavailable("doctor directory lock poisoned".into()))?;
        guard.insert(user_id, doctor);
        Ok(())
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryDoctorDirectory {
    async fn assigned_doctor(&self, user_id: UserId) -> Result<Option<Doctor>, StoreError> {
        let guard = self
            .assignments
            .read()
            .map_err(|_| StoreError::Unavailable("doctor directory lock poisoned".into()))?;
        Ok(guard.get(&user_id).cloned())
    }
}

struct DerivedRows<T> {
    next_id: u64,
    rows: Vec<T>,
}

impl<T> Default for DerivedRows<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            rows: Vec::new(),
        }
    }
}

#[derive(Default, Clone)]
pub struct InMemoryNotificationLog {
    inner: Arc<Mutex<DerivedRows<Notification>>>,
}

impl InMemoryNotificationLog {
    pub fn entries(&self) -> Vec<Notification> {
        self.inner
            .lock()
            .map(|inner| inner.rows.clone())
            .unwrap_or_default()
    }

    fn push(rows: &mut DerivedRows<Notification>, record: NewNotification) -> Notification {
        rows.next_id += 1;
        let stored = Notification {
            id: rows.next_id,
            user_id: record.user_id,
            assessment_id: record.assessment_id,
            message: record.message,
            created_at: record.created_at,
        };
        rows.rows.push(stored.clone());
        stored
    }
}

#[async_trait]
impl NotificationLog for InMemoryNotificationLog {
    async fn append(&self, record: NewNotification) -> Result<Notification, StoreError> {
        let mut guard = lock(&self.inner, "notification log")?;
        Ok(Self::push(&mut guard, record))
    }

    async fn append_once(
        &self,
        record: NewNotification,
    ) -> Result<Option<Notification>, StoreError> {
        let mut guard = lock(&self.inner, "notification log")?;
        let exists = guard.rows.iter().any(|row| {
            row.user_id == record.user_id && row.assessment_id == record.assessment_id
        });
        if exists {
            return Ok(None);
        }
        Ok(Some(Self::push(&mut guard, record)))
    }
}

#[derive(Default, Clone)]
pub struct InMemoryReportLog {
    inner: Arc<Mutex<DerivedRows<Report>>>,
}

impl InMemoryReportLog {
    pub fn entries(&self) -> Vec<Report> {
        self.inner
            .lock()
            .map(|inner| inner.rows.clone())
            .unwrap_or_default()
    }

    fn push(rows: &mut DerivedRows<Report>, record: NewReport) -> Report {
        rows.next_id += 1;
        let stored = Report {
            id: rows.next_id,
            user_id: record.user_id,
            assessment_id: record.assessment_id,
            file_path: record.file_path,
            created_at: record.created_at,
        };
        rows.rows.push(stored.clone());
        stored
    }
}

#[async_trait]
impl ReportLog for InMemoryReportLog {
    async fn append(&self, record: NewReport) -> Result<Report, StoreError> {
        let mut guard = lock(&self.inner, "report log")?;
        Ok(Self::push(&mut guard, record))
    }

    async fn append_once(&self, record: NewReport) -> Result<Option<Report>, StoreError> {
        let mut guard = lock(&self.inner, "report log")?;
        let exists = guard.rows.iter().any(|row| {
            row.user_id == record.user_id && row.assessment_id == record.assessment_id
        });
        if exists {
            return Ok(None);
        }
        Ok(Some(Self::push(&mut guard, record)))
    }
}

/// Concrete in-memory stores, kept so callers can seed and inspect them.
#[derive(Default, Clone)]
pub struct InMemoryStores {
    pub assessments: InMemoryAssessmentStore,
    pub profiles: InMemoryProfileDirectory,
    pub advice: InMemoryAdviceTable,
    pub doctors: InMemoryDoctorDirectory,
    pub notifications: InMemoryNotificationLog,
    pub reports: InMemoryReportLog,
}

impl InMemoryStores {
    pub fn stores(&self) -> Stores {
        Stores {
            assessments: Arc::new(self.assessments.clone()),
            profiles: Arc::new(self.profiles.clone()),
            advice: Arc::new(self.advice.clone()),
            doctors: Arc::new(self.doctors.clone()),
            notifications: Arc::new(self.notifications.clone()),
            reports: Arc::new(self.reports.clone()),
        }
    }
}
