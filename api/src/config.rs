//! API configuration
//!
//! Layered: built-in defaults, then the optional file named by
//! `CONFIG_PATH` (default `eventdesk.json`), then `EVENTDESK__*` environment
//! variables (e.g. `EVENTDESK__DATABASE_URL`).

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Secret used when none is configured; fine for local runs only
pub const DEV_JWT_SECRET: &str = "eventdesk-dev-secret";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Listen address
    pub bind_addr: String,
    /// PostgreSQL URL; the in-memory store is used when absent
    pub database_url: Option<String>,
    /// Connection pool size
    pub max_connections: u32,
    /// Apply migrations at startup
    pub run_migrations: bool,
    /// HS256 secret for admin bearer tokens
    pub jwt_secret: String,
    /// Allow any origin
    pub cors_permissive: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
            database_url: None,
            max_connections: 10,
            run_migrations: true,
            jwt_secret: DEV_JWT_SECRET.into(),
            cors_permissive: true,
        }
    }
}

impl ApiConfig {
    /// Load using `CONFIG_PATH`
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "eventdesk.json".into());
        Self::load_from(&path)
    }

    /// Load from a specific file (missing file is fine)
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Config::builder()
            .set_default("bind_addr", defaults.bind_addr)?
            .set_default("max_connections", i64::from(defaults.max_connections))?
            .set_default("run_migrations", defaults.run_migrations)?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("cors_permissive", defaults.cors_permissive)?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("EVENTDESK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}
