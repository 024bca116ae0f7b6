use crate::cli::ServeArgs;
use crate::infra::{build_scorer, build_stores, AppState};
use crate::routes::with_assessment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use fallrisk::assessment::PipelineState;
use fallrisk::config::AppConfig;
use fallrisk::error::AppError;
use fallrisk::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let stores = build_stores(&config.pipeline)?;
    let scorer = build_scorer(&config.scoring)?;
    let pipeline = PipelineState::new(stores.stores(), scorer, &config.pipeline);

    let app = with_assessment_routes(pipeline)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        lookup_timeout_ms = config.pipeline.lookup_timeout.as_millis() as u64,
        derived_writes = ?config.pipeline.derived_writes,
        "fall risk assessment service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
