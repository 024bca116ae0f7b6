//! Read paths that join data owned by separate stores.
//!
//! Each build fans out independent point-lookups concurrently, bounds each with a
//! timeout, and only composes a view when every lookup found its data. The derived
//! record (notification or report) is written afterwards on a best-effort basis: the
//! assessment row stays the source of truth and derived rows can always be rebuilt.
//! Dropping the returned future cancels in-flight lookups without touching rows that
//! were already written.

mod lookup;

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use self::lookup::{bounded, fan_in_error, Lookup};
use super::domain::{AssessmentId, NewNotification, NewReport, RiskTier, UserId, UserProfile};
use super::error::{PipelineError, Source};
use super::repository::Stores;
use crate::config::DerivedWritePolicy;

/// Notification payload returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationView {
    pub name: String,
    pub risk_level: RiskTier,
    pub advice: String,
    pub timestamp: DateTime<Utc>,
    pub doctor: String,
}

/// Report payload returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportView {
    pub user: UserProfile,
    pub assessment_id: AssessmentId,
    pub total_score: i64,
    pub risk_level: RiskTier,
    pub recommendation: String,
    pub report_date: NaiveDate,
    pub file_path: String,
}

pub struct CrossStoreAggregator {
    stores: Stores,
    lookup_timeout: Duration,
    derived_writes: DerivedWritePolicy,
}

impl CrossStoreAggregator {
    pub fn new(
        stores: Stores,
        lookup_timeout: Duration,
        derived_writes: DerivedWritePolicy,
    ) -> Self {
        Self {
            stores,
            lookup_timeout,
            derived_writes,
        }
    }

    pub async fn build_notification(
        &self,
        user_id: UserId,
    ) -> Result<NotificationView, PipelineError> {
        let limit = self.lookup_timeout;
        let stores = &self.stores;

        let (profile, latest, sheet, doctor) = tokio::join!(
            bounded(Source::UserProfile, limit, stores.profiles.profile(user_id)),
            bounded(
                Source::RiskAssessment,
                limit,
                stores.assessments.latest(user_id)
            ),
            bounded(Source::Advice, limit, async {
                stores.advice.advice_sheet().await.map(Some)
            }),
            bounded(Source::Doctor, limit, stores.doctors.assigned_doctor(user_id)),
        );

        let (profile, assessment, sheet, doctor) = match (profile, latest, sheet, doctor) {
            (Lookup::Found(p), Lookup::Found(a), Lookup::Found(s), Lookup::Found(d)) => {
                (p, a, s, d)
            }
            (p, a, s, d) => {
                let gaps = [p.gap(), a.gap(), s.gap(), d.gap()]
                    .into_iter()
                    .flatten()
                    .collect();
                let err = fan_in_error(user_id, gaps);
                warn!(
                    user_id = user_id.0,
                    operation = "build_notification",
                    error = %err,
                    "notification lookups incomplete"
                );
                return Err(err);
            }
        };

        let advice = sheet
            .advice_for(assessment.risk_level)
            .map(str::to_string)
            .ok_or_else(|| {
                let err = PipelineError::NotFound(format!(
                    "no advice configured for tier {}",
                    assessment.risk_level
                ));
                warn!(
                    user_id = user_id.0,
                    operation = "build_notification",
                    error = %err,
                    "advice table has no entry"
                );
                err
            })?;

        let view = NotificationView {
            name: profile.name,
            risk_level: assessment.risk_level,
            advice,
            timestamp: Utc::now(),
            doctor: doctor.name,
        };

        let record = NewNotification {
            user_id,
            assessment_id: assessment.id,
            message: format!("Risk Level: {}. Advice: {}", view.risk_level, view.advice),
            created_at: view.timestamp,
        };
        self.record_notification(record).await;

        Ok(view)
    }

    pub async fn build_report(&self, user_id: UserId) -> Result<ReportView, PipelineError> {
        let limit = self.lookup_timeout;
        let stores = &self.stores;

        let (profile, latest) = tokio::join!(
            bounded(Source::UserProfile, limit, stores.profiles.profile(user_id)),
            bounded(
                Source::RiskAssessment,
                limit,
                stores.assessments.latest(user_id)
            ),
        );

        let (profile, assessment) = match (profile, latest) {
            (Lookup::Found(p), Lookup::Found(a)) => (p, a),
            (p, a) => {
                let gaps = [p.gap(), a.gap()].into_iter().flatten().collect();
                let err = fan_in_error(user_id, gaps);
                warn!(
                    user_id = user_id.0,
                    operation = "build_report",
                    error = %err,
                    "report lookups incomplete"
                );
                return Err(err);
            }
        };

        let now = Utc::now();
        let file_path = format!("/reports/user{}_report{}.pdf", user_id, now.timestamp());

        let view = ReportView {
            user: profile,
            assessment_id: assessment.id,
            total_score: assessment.total_score,
            risk_level: assessment.risk_level,
            recommendation: assessment.recommendation,
            report_date: now.date_naive(),
            file_path: file_path.clone(),
        };

        self.record_report(NewReport {
            user_id,
            assessment_id: assessment.id,
            file_path,
            created_at: now,
        })
        .await;

        Ok(view)
    }

    async fn record_notification(&self, record: NewNotification) {
        let user_id = record.user_id;
        let assessment_id = record.assessment_id;
        let result = match self.derived_writes {
            DerivedWritePolicy::AppendEveryRead => {
                self.stores.notifications.append(record).await.map(Some)
            }
            DerivedWritePolicy::OncePerAssessment => {
                self.stores.notifications.append_once(record).await
            }
        };

        match result {
            Ok(Some(stored)) => info!(
                user_id = user_id.0,
                assessment_id = assessment_id.0,
                notification_id = stored.id,
                "notification recorded"
            ),
            Ok(None) => debug!(
                user_id = user_id.0,
                assessment_id = assessment_id.0,
                "notification already recorded for assessment"
            ),
            Err(err) => warn!(
                user_id = user_id.0,
                assessment_id = assessment_id.0,
                operation = "build_notification",
                error = %err,
                "notification append failed; view still returned"
            ),
        }
    }

    async fn record_report(&self, record: NewReport) {
        let user_id = record.user_id;
        let assessment_id = record.assessment_id;
        let result = match self.derived_writes {
            DerivedWritePolicy::AppendEveryRead => {
                self.stores.reports.append(record).await.map(Some)
            }
            DerivedWritePolicy::OncePerAssessment => self.stores.reports.append_once(record).await,
        };

        match result {
            Ok(Some(stored)) => info!(
                user_id = user_id.0,
                assessment_id = assessment_id.0,
                file_path = %stored.file_path,
                "report recorded"
            ),
            Ok(None) => debug!(
                user_id = user_id.0,
                assessment_id = assessment_id.0,
                "report already recorded for assessment"
            ),
            Err(err) => warn!(
                user_id = user_id.0,
                assessment_id = assessment_id.0,
                operation = "build_report",
                error = %err,
                "report append failed; view still returned"
            ),
        }
    }
}
