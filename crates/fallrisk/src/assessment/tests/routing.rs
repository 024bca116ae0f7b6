use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::assessment::identity::USER_ID_HEADER;
use crate::assessment::memory::InMemoryStores;
use crate::assessment::router::{assessment_router, submit_handler, PipelineState, SubmitRequest};
use crate::assessment::scorer::LocalScorer;
use crate::config::PipelineConfig;

fn state_with(stores: &InMemoryStores, config: PipelineConfig) -> PipelineState {
    PipelineState::new(stores.stores(), Arc::new(LocalScorer::new()), &config)
}

fn router_with(stores: &InMemoryStores, config: PipelineConfig) -> Router {
    assessment_router(state_with(stores, config))
}

fn config() -> PipelineConfig {
    PipelineConfig {
        lookup_timeout: LOOKUP_TIMEOUT,
        ..PipelineConfig::default()
    }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("body is json")
}

#[tokio::test]
async fn submit_route_returns_stored_assessment() {
    let stores = InMemoryStores::default();
    let router = router_with(&stores, config());

    let response = router
        .oneshot(post_json(
            "/api/v1/assessments",
            json!({ "user_id": 4, "answers": { "1": 1, "2": 3, "6": 1 } }),
        ))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user_id"], 4);
    assert_eq!(body["total_score"], 7);
    assert_eq!(body["risk_level"], "Moderate");
    assert_eq!(body["question_responses"]["2"], 3);
    assert_eq!(stores.assessments.len(), 1);
}

#[tokio::test]
async fn submit_handler_rejects_missing_user() {
    let stores = InMemoryStores::default();
    let state = state_with(&stores, config());

    let request = SubmitRequest {
        user_id: 0,
        answers: answers(&[("1", 1)]),
    };
    let response = submit_handler(State(state), Ok(axum::Json(request)))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(stores.assessments.is_empty());
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let stores = InMemoryStores::default();
    let router = router_with(&stores, config());

    let response = router
        .oneshot(
            Request::post("/api/v1/assessments")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"user_id\": 3, \"answers\": "))
                .expect("request builds"),
        )
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn analyze_route_scores_without_storing() {
    let stores = InMemoryStores::default();
    let router = router_with(&stores, config());

    let response = router
        .oneshot(post_json(
            "/api/v1/analyze",
            json!({ "answers": { "1": 1, "6": 1 } }),
        ))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total_score"], 4);
    assert_eq!(body["risk_level"], "Low");
    assert!(body["user_id"].is_null());
    assert!(stores.assessments.is_empty());
}

#[tokio::test]
async fn analyze_route_scores_empty_answers_as_low() {
    let stores = InMemoryStores::default();
    let router = router_with(&stores, config());

    let response = router
        .oneshot(post_json("/api/v1/analyze", json!({ "answers": {} })))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total_score"], 0);
    assert_eq!(body["risk_level"], "Low");
}

#[tokio::test]
async fn latest_route_reports_not_found() {
    let stores = InMemoryStores::default();
    let router = router_with(&stores, config());

    let response = router
        .oneshot(
            Request::get("/api/v1/assessments/latest?user_id=21")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn history_route_accepts_query_and_body_selectors() {
    let stores = InMemoryStores::default();
    insert_assessment(&stores, 2, 3, at(0)).await;
    insert_assessment(&stores, 2, 11, at(5)).await;
    let router = router_with(&stores, config());

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/assessments/history?user_id=2")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let scores: Vec<i64> = body
        .as_array()
        .expect("array body")
        .iter()
        .filter_map(|row| row["total_score"].as_i64())
        .collect();
    assert_eq!(scores, vec![11, 3]);

    let response = router
        .oneshot(post_json(
            "/api/v1/assessments/history",
            json!({ "user_id": 2 }),
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn notification_route_resolves_identity_from_header() {
    let stores = seeded_stores(5);
    insert_assessment(&stores, 5, 12, at(0)).await;
    let router = router_with(&stores, config());

    let response = router
        .oneshot(
            Request::get("/api/v1/notifications")
                .header(USER_ID_HEADER, "5")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "Lim Ah Kow");
    assert_eq!(body["risk_level"], "High");
    assert_eq!(body["doctor"], "Dr. Aisha Rahman");
    assert_eq!(stores.notifications.entries().len(), 1);
}

#[tokio::test]
async fn missing_identity_is_rejected_when_default_user_is_disabled() {
    let stores = seeded_stores(1);
    insert_assessment(&stores, 1, 2, at(0)).await;
    let router = router_with(
        &stores,
        PipelineConfig {
            default_user_id: None,
            ..config()
        },
    );

    let response = router
        .oneshot(
            Request::get("/api/v1/notifications")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(stores.notifications.entries().is_empty());
}

#[tokio::test]
async fn requests_without_identity_default_to_user_one() {
    let stores = seeded_stores(1);
    insert_assessment(&stores, 1, 2, at(0)).await;
    let router = router_with(&stores, config());

    let response = router
        .oneshot(
            Request::get("/api/v1/reports")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["user_id"], 1);
    assert_eq!(stores.reports.entries().len(), 1);
}

#[tokio::test]
async fn stalled_lookup_surfaces_as_service_unavailable() {
    let stores = seeded_stores(5);
    insert_assessment(&stores, 5, 4, at(0)).await;
    let degraded = with_doctors(stores.stores(), Arc::new(StalledDoctorDirectory));
    let router = assessment_router(PipelineState::new(
        degraded,
        Arc::new(LocalScorer::new()),
        &config(),
    ));

    let response = router
        .oneshot(
            Request::get("/api/v1/notifications?user_id=5")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["retryable"], true);
}
