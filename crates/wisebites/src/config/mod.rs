use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::Duration;

use crate::scoring::{PolicyError, ScoringPolicy};

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
    pub integrations: IntegrationConfig,
    pub cache: CacheConfig,
    pub scoring: ScoringPolicy,
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
        let format = LogFormat::from_str(&env::var("APP_LOG_FORMAT").unwrap_or_default());

        let integrations = IntegrationConfig {
            google_api_key: optional_var("GOOGLE_API_KEY"),
            serpapi_key: optional_var("SERPAPI_KEY"),
            groq_api_key: optional_var("GROQ_API_KEY"),
            groq_model: optional_var("GROQ_MODEL")
                .unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
        };

        let freshness_days = parse_var::<i64>("CACHE_FRESHNESS_DAYS")?.unwrap_or(30);
        if freshness_days <= 0 || Duration::try_days(freshness_days).is_none() {
            return Err(ConfigError::InvalidNumber {
                name: "CACHE_FRESHNESS_DAYS",
            });
        }

        let scoring = scoring_policy_from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            integrations,
            cache: CacheConfig { freshness_days },
            scoring,
        })
    }
}

pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

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

/// Tracing controls.
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
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Credentials for outbound services. Keys are optional so the service can boot
/// without them; calls needing a missing key fail at request time.
#[derive(Clone, Default)]
pub struct IntegrationConfig {
    pub google_api_key: Option<String>,
    pub serpapi_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
}

impl fmt::Debug for IntegrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationConfig")
            .field("google_api_key", &self.google_api_key.as_ref().map(|_| "***"))
            .field("serpapi_key", &self.serpapi_key.as_ref().map(|_| "***"))
            .field("groq_api_key", &self.groq_api_key.as_ref().map(|_| "***"))
            .field("groq_model", &self.groq_model)
            .finish()
    }
}

/// How long an AI analysis stays valid before it is recomputed.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub freshness_days: i64,
}

impl CacheConfig {
    /// Saturates instead of overflowing; `load` already rejects such values.
    pub fn freshness(&self) -> Duration {
        Duration::try_days(self.freshness_days).unwrap_or(Duration::MAX)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { freshness_days: 30 }
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match optional_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { name }),
        None => Ok(None),
    }
}

fn scoring_policy_from_env() -> Result<ScoringPolicy, ConfigError> {
    let mut policy = ScoringPolicy::default();

    let overrides: [(&'static str, &mut f64); 8] = [
        ("SCORING_COMMUNITY_AI_WEIGHT", &mut policy.community_ai_weight),
        ("SCORING_COMMUNITY_RATING_SCALE", &mut policy.community_rating_scale),
        ("SCORING_COMMUNITY_RATING_WEIGHT", &mut policy.community_rating_weight),
        ("SCORING_UNSAFE_PENALTY", &mut policy.unsafe_report_penalty),
        ("SCORING_SAFE_BONUS", &mut policy.safe_report_bonus),
        ("SCORING_THIRD_PARTY_AI_WEIGHT", &mut policy.third_party_ai_weight),
        ("SCORING_THIRD_PARTY_RICH_WEIGHT", &mut policy.third_party_rich_weight),
        ("SCORING_THIRD_PARTY_SPARSE_WEIGHT", &mut policy.third_party_sparse_weight),
    ];

    for (name, slot) in overrides {
        if let Some(value) = parse_var::<f64>(name)? {
            *slot = value;
        }
    }

    if let Some(threshold) = parse_var::<u32>("SCORING_RICH_THRESHOLD")? {
        policy.rich_review_threshold = threshold;
    }

    policy.validate()?;
    Ok(policy)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str },
    Scoring(PolicyError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name } => {
                write!(f, "{name} must be a valid positive number")
            }
            ConfigError::Scoring(err) => write!(f, "invalid scoring policy: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::Scoring(err) => Some(err),
        }
    }
}

impl From<PolicyError> for ConfigError {
    fn from(value: PolicyError) -> Self {
        Self::Scoring(value)
    }
}
