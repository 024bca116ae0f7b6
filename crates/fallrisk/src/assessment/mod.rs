//! Fall-risk assessment pipeline: scoring, intake, history, and cross-store views.

pub mod aggregate;
pub mod domain;
pub mod error;
pub mod history;
pub mod identity;
pub mod memory;
pub mod repository;
pub mod router;
pub mod scorer;
pub mod scoring;
pub mod seed;
pub mod service;

#[cfg(test)]
mod tests;

pub use aggregate::{CrossStoreAggregator, NotificationView, ReportView};
pub use domain::{
    AnswerSet, AssessmentId, Doctor, Notification, QuestionId, Report, RiskAssessment, RiskTier,
    UserId, UserProfile,
};
pub use error::{FailureReason, PartialFailure, PipelineError, Source, SourceFailure};
pub use history::HistoryService;
pub use identity::{DefaultUserShim, HeaderIdentity, IdentityResolver};
pub use memory::InMemoryStores;
pub use repository::{
    AdviceSheet, AdviceTable, AssessmentStore, DoctorDirectory, NotificationLog, ProfileDirectory,
    ReportLog, StoreError, Stores,
};
pub use router::{assessment_router, PipelineState};
pub use scorer::{LocalScorer, RemoteScorer, Scorer, ScorerError};
pub use scoring::{ScoreOutcome, ScoringEngine};
pub use service::SubmissionService;
