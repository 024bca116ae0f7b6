use std::sync::Arc;

use super::common::*;
use crate::assessment::domain::{AnswerSet, NewRiskAssessment, RiskTier, UserId};
use crate::assessment::error::PipelineError;
use crate::assessment::history::HistoryService;
use crate::assessment::memory::InMemoryStores;
use crate::assessment::repository::AssessmentStore;

fn history_over(stores: &InMemoryStores) -> HistoryService {
    HistoryService::new(Arc::new(stores.assessments.clone()))
}

#[tokio::test]
async fn latest_returns_newest_row_and_is_idempotent() {
    let stores = InMemoryStores::default();
    insert_assessment(&stores, 4, 3, at(0)).await;
    let newest = insert_assessment(&stores, 4, 12, at(30)).await;
    insert_assessment(&stores, 4, 7, at(15)).await;
    insert_assessment(&stores, 5, 2, at(45)).await;

    let service = history_over(&stores);
    let first = service.latest(4).await.expect("latest");
    let second = service.latest(4).await.expect("latest again");

    assert_eq!(first, newest);
    assert_eq!(first, second);
    assert_eq!(first.risk_level, RiskTier::High);
    assert_eq!(stores.assessments.len(), 4);
}

#[tokio::test]
async fn history_is_newest_first_with_identifier_tiebreak() {
    let stores = InMemoryStores::default();
    let early = insert_assessment(&stores, 2, 1, at(0)).await;
    let tied_first = insert_assessment(&stores, 2, 6, at(20)).await;
    let tied_second = insert_assessment(&stores, 2, 9, at(20)).await;

    let service = history_over(&stores);
    let rows = service.history(2).await.expect("history");
    let ids: Vec<_> = rows.iter().map(|row| row.id).collect();
    assert_eq!(ids, vec![tied_second.id, tied_first.id, early.id]);

    assert_eq!(service.history(2).await.expect("history again"), rows);
    assert_eq!(service.latest(2).await.expect("latest"), tied_second);
}

#[tokio::test]
async fn users_without_assessments_are_not_found() {
    let stores = InMemoryStores::default();
    insert_assessment(&stores, 1, 4, at(0)).await;
    let service = history_over(&stores);

    match service.latest(99).await {
        Err(PipelineError::NotFound(message)) => assert!(message.contains("99")),
        other => panic!("expected not found, got {other:?}"),
    }
    assert!(matches!(
        service.history(99).await,
        Err(PipelineError::NotFound(_))
    ));
}

#[tokio::test]
async fn invalid_user_ids_are_rejected() {
    let service = history_over(&InMemoryStores::default());
    assert!(matches!(
        service.latest(0).await,
        Err(PipelineError::Validation(_))
    ));
    assert!(matches!(
        service.history(-4).await,
        Err(PipelineError::Validation(_))
    ));
}

#[tokio::test]
async fn store_outage_is_a_storage_error() {
    let service = HistoryService::new(Arc::new(BrokenAssessmentStore));
    assert!(matches!(
        service.latest(1).await,
        Err(PipelineError::Storage(_))
    ));
    assert!(matches!(
        service.history(1).await,
        Err(PipelineError::Storage(_))
    ));
}

#[tokio::test]
async fn inconsistent_rows_are_returned_unchanged() {
    let stores = InMemoryStores::default();
    let stale = stores
        .assessments
        .insert(NewRiskAssessment {
            user_id: UserId(8),
            total_score: 12,
            risk_level: RiskTier::Moderate,
            recommendation: RiskTier::Moderate.recommendation().to_string(),
            question_responses: AnswerSet::new().with(6, 3),
            created_at: at(5),
        })
        .await
        .expect("insert");

    let latest = history_over(&stores).latest(8).await.expect("latest");
    assert_eq!(latest, stale);
    assert!(!latest.is_consistent());
}
