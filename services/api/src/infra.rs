use fallrisk::assessment::{seed, InMemoryStores, LocalScorer, RemoteScorer, Scorer};
use fallrisk::config::{PipelineConfig, ScoringConfig, ScoringMode};
use fallrisk::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn build_scorer(config: &ScoringConfig) -> Result<Arc<dyn Scorer>, AppError> {
    match &config.mode {
        ScoringMode::Local => {
            info!(scorer = "local", "scoring in process");
            Ok(Arc::new(LocalScorer::new()))
        }
        ScoringMode::Remote { base_url } => {
            let scorer = RemoteScorer::new(base_url, config.remote_timeout)?;
            info!(
                scorer = "remote",
                endpoint = %scorer.endpoint(),
                timeout_ms = config.remote_timeout.as_millis() as u64,
                "delegating scoring"
            );
            Ok(Arc::new(scorer))
        }
    }
}

/// In-process stores, hydrated from the seed directory when one is configured.
pub(crate) fn build_stores(config: &PipelineConfig) -> Result<InMemoryStores, AppError> {
    let stores = InMemoryStores::default();
    if let Some(dir) = &config.seed_dir {
        seed::load_dir(dir, &stores)?;
    }
    Ok(stores)
}

/// Parse a `question=option` pair such as `6=1`.
pub(crate) fn parse_answer(raw: &str) -> Result<(u32, i64), String> {
    let (question, option) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected QUESTION=OPTION, got '{raw}'"))?;
    let question = question
        .trim()
        .parse::<u32>()
        .map_err(|err| format!("invalid question id '{question}' ({err})"))?;
    let option = option
        .trim()
        .parse::<i64>()
        .map_err(|err| format!("invalid option '{option}' ({err})"))?;
    Ok((question, option))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parse_answer_accepts_padded_pairs() {
        assert_eq!(parse_answer(" 6 = 2"), Ok((6, 2)));
        assert!(parse_answer("6").is_err());
        assert!(parse_answer("x=1").is_err());
    }

    #[test]
    fn remote_mode_builds_remote_scorer() {
        let config = ScoringConfig {
            mode: ScoringMode::Remote {
                base_url: "http://scoring.internal:8080".to_string(),
            },
            remote_timeout: Duration::from_millis(500),
        };
        let scorer = build_scorer(&config).expect("scorer builds");
        assert_eq!(scorer.name(), "remote");
    }

    #[test]
    fn missing_seed_dir_leaves_stores_empty() {
        let stores = build_stores(&PipelineConfig::default()).expect("stores build");
        assert!(stores.assessments.is_empty());
    }
}
