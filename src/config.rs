use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Signal engine tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// How long snapshots are retained per asset.
    pub history_retention: Duration,
    /// Bucket size for history snapshots.
    pub history_cadence: Duration,
    /// Number of most recent snapshots the correlation engine looks at.
    pub correlation_window: usize,
    /// Snapshots needed before a correlation matrix is reported.
    pub correlation_min_history: usize,
    /// Snapshots needed before Mahalanobis uses historical covariance.
    pub covariance_min_history: usize,
    /// |r| above which a pair is reported as strongly correlated.
    pub strong_correlation_threshold: f64,
    /// Maximum number of strong pairs reported.
    pub strong_correlation_limit: usize,
    /// Seed history from the evaluated series before scoring.
    pub backfill_on_evaluate: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_retention: Duration::from_secs(240 * 3600), // 10 days
            history_cadence: Duration::from_secs(3600),
            correlation_window: 240,
            correlation_min_history: 30,
            covariance_min_history: 30,
            strong_correlation_threshold: 0.5,
            strong_correlation_limit: 5,
            backfill_on_evaluate: true,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| {
            let v = v.trim().to_lowercase();
            v == "true" || v == "1" || v == "yes"
        })
        .unwrap_or(default)
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let retention_hours = env_or(
            "HISTORY_RETENTION_HOURS",
            defaults.history_retention.as_secs() / 3600,
        );
        let cadence_secs = env_or("HISTORY_CADENCE_SECS", defaults.history_cadence.as_secs());

        Self {
            history_retention: Duration::from_secs(retention_hours.saturating_mul(3600)),
            history_cadence: Duration::from_secs(cadence_secs.max(1)),
            correlation_window: env_or("CORRELATION_WINDOW", defaults.correlation_window),
            correlation_min_history: env_or(
                "CORRELATION_MIN_HISTORY",
                defaults.correlation_min_history,
            ),
            covariance_min_history: env_or(
                "COVARIANCE_MIN_HISTORY",
                defaults.covariance_min_history,
            ),
            strong_correlation_threshold: env_or(
                "STRONG_CORRELATION_THRESHOLD",
                defaults.strong_correlation_threshold,
            ),
            strong_correlation_limit: env_or(
                "STRONG_CORRELATION_LIMIT",
                defaults.strong_correlation_limit,
            ),
            backfill_on_evaluate: env_bool("BACKFILL_ON_EVALUATE", defaults.backfill_on_evaluate),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3001);

        Self {
            host,
            port,
            engine: EngineConfig::from_env(),
        }
    }

    /// Socket address to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
