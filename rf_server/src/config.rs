//! Server configuration management.
//!
//! Consolidates all environment variable reads and fails fast on missing
//! secrets.

use rentfleet::db::DatabaseConfig;
use rentfleet::payment::GatewayConfig;
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Secret validating identity-provider JWTs
    pub jwt_secret: String,
    /// Payment gateway settings
    pub gateway: GatewayConfig,
    /// Grace period before unpaid bookings are reclaimed
    pub cleanup_grace_secs: u64,
    /// Optional Prometheus exporter bind address
    pub metrics_bind: Option<SocketAddr>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {0} is invalid: {1}")]
    Invalid(&'static str, String),
}

impl ServerConfig {
    /// Load configuration, with CLI overrides taking precedence over the
    /// environment.
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => env::var("SERVER_BIND")
                .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
                .parse()
                .map_err(|e| ConfigError::Invalid("SERVER_BIND", format!("{e}")))?,
        };

        let database_url = database_url_override
            .or_else(|| env::var("DATABASE_URL").ok())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let database = DatabaseConfig {
            database_url,
            max_connections: env_or("DB_MAX_CONNECTIONS", 20),
            min_connections: env_or("DB_MIN_CONNECTIONS", 5),
            connection_timeout_secs: env_or("DB_CONNECTION_TIMEOUT", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT", 600),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME", 1800),
        };

        let gateway = GatewayConfig {
            pay_url: required("GATEWAY_PAY_URL")?,
            return_url: required("GATEWAY_RETURN_URL")?,
            wallet_return_url: required("GATEWAY_WALLET_RETURN_URL")?,
            merchant_code: required("GATEWAY_MERCHANT_CODE")?,
            secret: required("GATEWAY_HASH_SECRET")?,
            version: env::var("GATEWAY_VERSION").unwrap_or_else(|_| "2.1.0".to_string()),
            command: env::var("GATEWAY_COMMAND").unwrap_or_else(|_| "pay".to_string()),
            currency: env::var("GATEWAY_CURRENCY").unwrap_or_else(|_| "VND".to_string()),
        };

        let metrics_bind = match env::var("METRICS_BIND") {
            Ok(raw) => Some(
                raw.parse()
                    .map_err(|e| ConfigError::Invalid("METRICS_BIND", format!("{e}")))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            bind,
            database,
            jwt_secret: required("JWT_SECRET")?,
            gateway,
            cleanup_grace_secs: env_or("BOOKING_CLEANUP_GRACE_SECS", 900),
            metrics_bind,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
