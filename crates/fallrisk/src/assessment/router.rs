use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::aggregate::{CrossStoreAggregator, NotificationView, ReportView};
use super::domain::{AnswerSet, AssessmentId, RiskAssessment, RiskTier, UserId};
use super::error::PipelineError;
use super::history::HistoryService;
use super::identity::{resolve_user, DefaultUserShim, HeaderIdentity, IdentityResolver};
use super::repository::Stores;
use super::scorer::Scorer;
use super::service::SubmissionService;
use crate::config::PipelineConfig;

/// Services shared by every request handler.
#[derive(Clone)]
pub struct PipelineState {
    pub submissions: Arc<SubmissionService>,
    pub history: Arc<HistoryService>,
    pub aggregator: Arc<CrossStoreAggregator>,
    pub identity: Arc<dyn IdentityResolver>,
}

impl PipelineState {
    pub fn new(stores: Stores, scorer: Arc<dyn Scorer>, config: &PipelineConfig) -> Self {
        let identity: Arc<dyn IdentityResolver> = match config.default_user_id {
            Some(fallback) => Arc::new(DefaultUserShim::new(HeaderIdentity, UserId(fallback))),
            None => Arc::new(HeaderIdentity),
        };

        Self {
            submissions: Arc::new(SubmissionService::new(scorer, stores.assessments.clone())),
            history: Arc::new(HistoryService::new(stores.assessments.clone())),
            aggregator: Arc::new(CrossStoreAggregator::new(
                stores,
                config.lookup_timeout,
                config.derived_writes,
            )),
            identity,
        }
    }
}

/// Router builder exposing the assessment pipeline over HTTP.
pub fn assessment_router(state: PipelineState) -> Router {
    Router::new()
        .route("/api/v1/assessments", post(submit_handler))
        .route("/api/v1/analyze", post(analyze_handler))
        .route(
            "/api/v1/assessments/latest",
            get(latest_query_handler).post(latest_body_handler),
        )
        .route(
            "/api/v1/assessments/history",
            get(history_query_handler).post(history_body_handler),
        )
        .route("/api/v1/notifications", get(notification_handler))
        .route("/api/v1/reports", get(report_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub answers: BTreeMap<String, i64>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub assessment_id: AssessmentId,
    pub user_id: UserId,
    pub total_score: i64,
    pub risk_level: RiskTier,
    pub recommendation: String,
    pub question_responses: AnswerSet,
    pub created_at: DateTime<Utc>,
}

impl From<RiskAssessment> for SubmitResponse {
    fn from(record: RiskAssessment) -> Self {
        Self {
            assessment_id: record.id,
            user_id: record.user_id,
            total_score: record.total_score,
            risk_level: record.risk_level,
            recommendation: record.recommendation,
            question_responses: record.question_responses,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub answers: BTreeMap<String, i64>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub user_id: Option<UserId>,
    pub total_score: i64,
    pub risk_level: RiskTier,
    pub recommendation: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserSelector {
    #[serde(default)]
    pub user_id: Option<i64>,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, PipelineError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| PipelineError::Validation(rejection.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, PipelineError> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| PipelineError::Validation(rejection.body_text()))
}

pub(crate) async fn submit_handler(
    State(state): State<PipelineState>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<SubmitResponse>, PipelineError> {
    let request = body(payload)?;
    let stored = state
        .submissions
        .submit(request.user_id, &request.answers)
        .await?;
    Ok(Json(stored.into()))
}

pub(crate) async fn analyze_handler(
    State(state): State<PipelineState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, PipelineError> {
    let request = body(payload)?;
    let (user_id, outcome) = state
        .submissions
        .analyze(request.user_id, &request.answers)?;
    Ok(Json(AnalyzeResponse {
        user_id,
        total_score: outcome.total_score,
        risk_level: outcome.risk_level,
        recommendation: outcome.recommendation,
    }))
}

async fn latest(
    state: &PipelineState,
    headers: &HeaderMap,
    selector: UserSelector,
) -> Result<Json<RiskAssessment>, PipelineError> {
    let user_id = resolve_user(selector.user_id, headers, state.identity.as_ref())?;
    let assessment = state.history.latest(user_id.0).await?;
    Ok(Json(assessment))
}

async fn history(
    state: &PipelineState,
    headers: &HeaderMap,
    selector: UserSelector,
) -> Result<Json<Vec<RiskAssessment>>, PipelineError> {
    let user_id = resolve_user(selector.user_id, headers, state.identity.as_ref())?;
    let rows = state.history.history(user_id.0).await?;
    Ok(Json(rows))
}

pub(crate) async fn latest_query_handler(
    State(state): State<PipelineState>,
    headers: HeaderMap,
    params: Result<Query<UserSelector>, QueryRejection>,
) -> Result<Json<RiskAssessment>, PipelineError> {
    latest(&state, &headers, query(params)?).await
}

pub(crate) async fn latest_body_handler(
    State(state): State<PipelineState>,
    headers: HeaderMap,
    payload: Result<Json<UserSelector>, JsonRejection>,
) -> Result<Json<RiskAssessment>, PipelineError> {
    latest(&state, &headers, body(payload)?).await
}

pub(crate) async fn history_query_handler(
    State(state): State<PipelineState>,
    headers: HeaderMap,
    params: Result<Query<UserSelector>, QueryRejection>,
) -> Result<Json<Vec<RiskAssessment>>, PipelineError> {
    history(&state, &headers, query(params)?).await
}

pub(crate) async fn history_body_handler(
    State(state): State<PipelineState>,
    headers: HeaderMap,
    payload: Result<Json<UserSelector>, JsonRejection>,
) -> Result<Json<Vec<RiskAssessment>>, PipelineError> {
    history(&state, &headers, body(payload)?).await
}

pub(crate) async fn notification_handler(
    State(state): State<PipelineState>,
    headers: HeaderMap,
    params: Result<Query<UserSelector>, QueryRejection>,
) -> Result<Json<NotificationView>, PipelineError> {
    let selector = query(params)?;
    let user_id = resolve_user(selector.user_id, &headers, state.identity.as_ref())?;
    let view = state.aggregator.build_notification(user_id).await?;
    Ok(Json(view))
}

pub(crate) async fn report_handler(
    State(state): State<PipelineState>,
    headers: HeaderMap,
    params: Result<Query<UserSelector>, QueryRejection>,
) -> Result<Json<ReportView>, PipelineError> {
    let selector = query(params)?;
    let user_id = resolve_user(selector.user_id, &headers, state.identity.as_ref())?;
    let view = state.aggregator.build_report(user_id).await?;
    Ok(Json(view))
}
