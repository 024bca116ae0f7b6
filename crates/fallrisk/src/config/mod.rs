use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat(raw))?,
            Err(_) => LogFormat::Compact,
        };

        let scoring = ScoringConfig::from_env()?;
        let pipeline = PipelineConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            scoring,
            pipeline,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing output controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Where risk scores are computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoringMode {
    Local,
    Remote { base_url: String },
}

#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub mode: ScoringMode,
    pub remote_timeout: Duration,
}

impl ScoringConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let remote_timeout = Duration::from_millis(parse_millis("SCORING_TIMEOUT_MS", 2000)?);
        let mode = match env::var("SCORING_MODE")
            .unwrap_or_else(|_| "local".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "local" => ScoringMode::Local,
            "remote" => {
                let base_url = env::var("SCORING_REMOTE_URL")
                    .ok()
                    .map(|url| url.trim().trim_end_matches('/').to_string())
                    .filter(|url| !url.is_empty())
                    .ok_or(ConfigError::MissingRemoteUrl)?;
                ScoringMode::Remote { base_url }
            }
            other => return Err(ConfigError::InvalidScoringMode(other.to_string())),
        };

        Ok(Self {
            mode,
            remote_timeout,
        })
    }
}

/// Whether read paths append a derived record on every call or once per assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedWritePolicy {
    AppendEveryRead,
    OncePerAssessment,
}

impl DerivedWritePolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "append" | "always" => Some(Self::AppendEveryRead),
            "dedupe" | "once" => Some(Self::OncePerAssessment),
            _ => None,
        }
    }
}

/// Settings for the read/aggregation side of the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub lookup_timeout: Duration,
    pub derived_writes: DerivedWritePolicy,
    /// Compatibility shim: the user assumed when a request presents no identity.
    pub default_user_id: Option<i64>,
    pub seed_dir: Option<PathBuf>,
}

impl PipelineConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let lookup_timeout = Duration::from_millis(parse_millis("LOOKUP_TIMEOUT_MS", 1500)?);

        let derived_writes = match env::var("DERIVED_WRITE_POLICY") {
            Ok(raw) => {
                DerivedWritePolicy::parse(&raw).ok_or(ConfigError::InvalidWritePolicy(raw))?
            }
            Err(_) => DerivedWritePolicy::AppendEveryRead,
        };

        let default_user_id = match env::var("IDENTITY_DEFAULT_USER_ID") {
            Ok(raw) => parse_default_user(&raw)?,
            Err(_) => Some(DEFAULT_USER_ID),
        };

        let seed_dir = env::var("FALLRISK_SEED_DIR")
            .ok()
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            lookup_timeout,
            derived_writes,
            default_user_id,
            seed_dir,
        })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_millis(1500),
            derived_writes: DerivedWritePolicy::AppendEveryRead,
            default_user_id: Some(DEFAULT_USER_ID),
            seed_dir: None,
        }
    }
}

/// User served to requests that present no identity unless the shim is disabled.
pub const DEFAULT_USER_ID: i64 = 1;

fn parse_default_user(raw: &str) -> Result<Option<i64>, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "none" | "off" | "disabled" => Ok(None),
        value => match value.parse::<i64>() {
            Ok(id) if id > 0 => Ok(Some(id)),
            _ => Err(ConfigError::InvalidDefaultUser(raw.to_string())),
        },
    }
}

fn parse_millis(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidDuration { key, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat(String),
    InvalidScoringMode(String),
    MissingRemoteUrl,
    InvalidDuration { key: &'static str, value: String },
    InvalidWritePolicy(String),
    InvalidDefaultUser(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'json', got '{value}'")
            }
            ConfigError::InvalidScoringMode(value) => {
                write!(f, "SCORING_MODE must be 'local' or 'remote', got '{value}'")
            }
            ConfigError::MissingRemoteUrl => {
                write!(f, "SCORING_REMOTE_URL is required when SCORING_MODE=remote")
            }
            ConfigError::InvalidDuration { key, value } => {
                write!(f, "{key} must be a positive number of milliseconds, got '{value}'")
            }
            ConfigError::InvalidWritePolicy(value) => {
                write!(
                    f,
                    "DERIVED_WRITE_POLICY must be 'append' or 'dedupe', got '{value}'"
                )
            }
            ConfigError::InvalidDefaultUser(value) => {
                write!(
                    f,
                    "IDENTITY_DEFAULT_USER_ID must be a positive integer or 'none', got '{value}'"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
