//! Process configuration loaded from environment variables.

use std::net::SocketAddr;
use std::sync::Arc;

use stagecraft_observability::LogFormat;

use crate::kv::{InMemoryKvStore, KeyValueStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("REDIS_URL is set but this build has no redis support")]
    RedisUnavailable,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Test,
    Staging,
    Production,
}

impl AppEnv {
    pub fn is_production_like(self) -> bool {
        matches!(self, AppEnv::Staging | AppEnv::Production)
    }
}

impl core::str::FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "test" => Ok(AppEnv::Test),
            "staging" => Ok(AppEnv::Staging),
            "production" | "prod" => Ok(AppEnv::Production),
            other => Err(ConfigError::Invalid {
                var: "APP_ENV",
                reason: format!("unknown environment '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: AppEnv,
    pub bind_addr: SocketAddr,
    pub redis_url: Option<String>,
    pub bootstrap_secret: Option<String>,
    pub bootstrap_enabled: bool,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: AppEnv::Development,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            redis_url: None,
            bootstrap_secret: None,
            bootstrap_enabled: false,
            log_format: LogFormat::Json,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let env = var("APP_ENV").map(|v| v.parse::<AppEnv>()).transpose()?.unwrap_or(defaults.env);

        let bind_addr = match var("BIND_ADDR") {
            Some(v) => v.parse().map_err(|e| ConfigError::Invalid {
                var: "BIND_ADDR",
                reason: format!("{e}"),
            })?,
            None => defaults.bind_addr,
        };

        let bootstrap_enabled = match var("BOOTSTRAP_ENABLED").as_deref() {
            None => false,
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => true,
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => false,
            Some(v) => {
                return Err(ConfigError::Invalid {
                    var: "BOOTSTRAP_ENABLED",
                    reason: format!("expected true or false, got '{v}'"),
                });
            }
        };

        let log_format = match var("LOG_FORMAT").map(|v| v.to_ascii_lowercase()).as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some(v) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    reason: format!("expected json or pretty, got '{v}'"),
                });
            }
        };

        Ok(Self {
            env,
            bind_addr,
            redis_url: var("REDIS_URL"),
            bootstrap_secret: var("BOOTSTRAP_SECRET"),
            bootstrap_enabled,
            log_format,
        })
    }

    /// Bootstrap needs a secret, and in production-like environments an explicit opt-in.
    pub fn bootstrap_allowed(&self) -> bool {
        self.bootstrap_secret.is_some()
            && (!self.env.is_production_like() || self.bootstrap_enabled)
    }
}

/// Select the key/value backend once at startup.
pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn KeyValueStore>, ConfigError> {
    match config.redis_url.as_deref() {
        #[cfg(feature = "redis")]
        Some(url) => {
            let store = crate::kv::RedisKvStore::connect(url).await?;
            tracing::info!(backend = "redis", "key/value store connected");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        Some(_) => Err(ConfigError::RedisUnavailable),
        None => {
            tracing::warn!(backend = "memory", "REDIS_URL not set; using in-memory store");
            Ok(Arc::new(InMemoryKvStore::new()))
        }
    }
}
