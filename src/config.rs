use std::str::FromStr;
use std::time::Duration;

use crate::evaluation::DEFAULT_BATCH_SIZE;

/// Runtime settings, read from the environment with defaults
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Postgres connection string; None runs on in-memory storage
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub token_expiration_hours: i64,
    /// Predictions processed per page during evaluate/revert
    pub evaluation_batch_size: usize,
    pub rank_recompute_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:3000".to_string(),
            jwt_secret: "your-secret-key-change-in-production".to_string(),
            token_expiration_hours: 12,
            evaluation_batch_size: DEFAULT_BATCH_SIZE,
            rank_recompute_interval: Duration::from_secs(60 * 60),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            jwt_secret: lookup("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            token_expiration_hours: parse_var(&lookup, "TOKEN_EXPIRATION_HOURS")
                .unwrap_or(defaults.token_expiration_hours),
            evaluation_batch_size: parse_var(&lookup, "EVALUATION_BATCH_SIZE")
                .filter(|size: &usize| *size > 0)
                .unwrap_or(defaults.evaluation_batch_size),
            rank_recompute_interval: parse_var(&lookup, "RANK_RECOMPUTE_INTERVAL_SECS")
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.rank_recompute_interval),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}
