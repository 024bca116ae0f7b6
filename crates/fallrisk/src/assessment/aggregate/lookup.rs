use std::future::Future;
use std::time::Duration;

use super::super::domain::UserId;
use super::super::error::{FailureReason, PartialFailure, PipelineError, Source, SourceFailure};
use super::super::repository::StoreError;

/// Result of one bounded point-lookup.
#[derive(Debug)]
pub(crate) enum Lookup<T> {
    Found(T),
    Missing(Source),
    Failed(SourceFailure),
}

/// Run a lookup under a deadline. A timeout is treated exactly like a connectivity failure.
pub(crate) async fn bounded<T, F>(source: Source, limit: Duration, lookup: F) -> Lookup<T>
where
    F: Future<Output = Result<Option<T>, StoreError>>,
{
    match tokio::time::timeout(limit, lookup).await {
        Ok(Ok(Some(value))) => Lookup::Found(value),
        Ok(Ok(None)) => Lookup::Missing(source),
        Ok(Err(StoreError::Unavailable(cause))) => Lookup::Failed(SourceFailure {
            source,
            reason: FailureReason::Unavailable(cause),
        }),
        Err(_) => Lookup::Failed(SourceFailure {
            source,
            reason: FailureReason::TimedOut(limit),
        }),
    }
}

/// What a non-found lookup contributes to the combined error.
#[derive(Debug)]
pub(crate) enum Gap {
    Missing(Source),
    Failed(SourceFailure),
}

impl<T> Lookup<T> {
    pub(crate) fn gap(self) -> Option<Gap> {
        match self {
            Lookup::Found(_) => None,
            Lookup::Missing(source) => Some(Gap::Missing(source)),
            Lookup::Failed(failure) => Some(Gap::Failed(failure)),
        }
    }
}

/// Combine the gaps of an incomplete fan-out.
///
/// Unreachable sources win over missing data: while a store is down, absence elsewhere
/// cannot be told apart from an outage, so the caller gets the retryable error.
pub(crate) fn fan_in_error(user_id: UserId, gaps: Vec<Gap>) -> PipelineError {
    let mut failures = Vec::new();
    let mut missing = Vec::new();
    for gap in gaps {
        match gap {
            Gap::Failed(failure) => failures.push(failure),
            Gap::Missing(source) => missing.push(source),
        }
    }

    if !failures.is_empty() {
        return PipelineError::PartialFailure(PartialFailure { failures });
    }

    if missing.contains(&Source::RiskAssessment) {
        return PipelineError::NotFound(format!(
            "user {user_id} has not completed a risk assessment"
        ));
    }

    let labels: Vec<&str> = missing.iter().map(Source::label).collect();
    PipelineError::NotFound(format!(
        "no {} recorded for user {user_id}",
        labels.join(" or ")
    ))
}
