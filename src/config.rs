//! Application configuration
//!
//! Loaded from `~/.config/fleet-reservations/config.toml` unless `FLEET_CONFIG`
//! points elsewhere. Every field has a default, so a missing file or a partial
//! one is valid. Secrets may be supplied through the environment instead.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ReservationSettings;
use crate::infrastructure::{DatabaseConfig, HttpGatewayConfig};

pub const CONFIG_ENV: &str = "FLEET_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Default location of the config file
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fleet-reservations")
        .join("config.toml")
}

/// Config path from `FLEET_CONFIG`, falling back to [`default_config_path`]
pub fn config_path_from_env() -> PathBuf {
    std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_config_path())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSection,
    pub redis: RedisConfig,
    pub reservations: ReservationsConfig,
    pub payments: PaymentsConfig,
    pub documents: DocumentsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,
    /// Interval between purges of expired local locks
    pub lock_purge_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            lock_purge_interval_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        let defaults = DatabaseConfig::default();
        Self {
            url: defaults.url,
            max_connections: defaults.max_connections,
            run_migrations: true,
        }
    }
}

impl DatabaseSection {
    pub fn connection(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Shared lock store; locks stay process-local when unset
    pub url: Option<String>,
    pub command_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            command_timeout_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationsConfig {
    pub lock_ttl_secs: u64,
    /// Percent of the amount charged when cancelling inside the window
    pub cancellation_fee_percent: u32,
    pub cancellation_window_hours: i64,
    /// Guarantee used when a reservation is created without one, minor units
    pub standard_guarantee: i64,
    pub currency: String,
}

impl Default for ReservationsConfig {
    fn default() -> Self {
        Self {
            lock_ttl_secs: 15,
            cancellation_fee_percent: 20,
            cancellation_window_hours: 24,
            standard_guarantee: 30_000,
            currency: "EUR".to_string(),
        }
    }
}

impl ReservationsConfig {
    pub fn settings(&self) -> ReservationSettings {
        ReservationSettings {
            lock_ttl: Duration::from_secs(self.lock_ttl_secs.max(1)),
            cancellation_fee_percent: Decimal::from(self.cancellation_fee_percent),
            cancellation_window_hours: self.cancellation_window_hours,
            standard_guarantee: self.standard_guarantee,
            currency: self.currency.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    pub api_url: String,
    pub project_id: String,
    /// Shared secret for callback signatures
    pub sign_password: String,
    pub callback_url: Option<String>,
    pub return_url: Option<String>,
    /// Accepted difference between reported and expected amount, minor units
    pub amount_tolerance: i64,
    pub timeout_secs: u64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            api_url: "https://www.paysera.com/pay/v2/".to_string(),
            project_id: String::new(),
            sign_password: String::new(),
            callback_url: None,
            return_url: None,
            amount_tolerance: 1,
            timeout_secs: 10,
        }
    }
}

impl PaymentsConfig {
    pub fn gateway(&self) -> HttpGatewayConfig {
        HttpGatewayConfig {
            api_url: self.api_url.clone(),
            project_id: self.project_id.clone(),
            callback_url: self.callback_url.clone(),
            return_url: self.return_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Directory for rendered documents; kept in memory when unset
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Read `path`, or defaults when it does not exist, then apply
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::from_toml(&std::fs::read_to_string(path)?)?
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the config, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Secrets and connection strings from the environment win over the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database.url = url;
        }
        if let Some(url) = lookup("REDIS_URL").filter(|v| !v.is_empty()) {
            self.redis.url = Some(url);
        }
        if let Some(password) = lookup("PAYMENT_SIGN_PASSWORD").filter(|v| !v.is_empty()) {
            self.payments.sign_password = password;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 9100

            [reservations]
            cancellation_fee_percent = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.reservations.cancellation_fee_percent, 50);
        assert_eq!(config.reservations.cancellation_window_hours, 24);
        assert_eq!(config.payments.amount_tolerance, 1);
        assert!(config.redis.url.is_none());
    }

    #[test]
    fn test_env_overrides_secrets() {
        let mut config = AppConfig::default();
        config.apply_env(|name| match name {
            "REDIS_URL" => Some("redis://cache:6379".to_string()),
            "PAYMENT_SIGN_PASSWORD" => Some("s3cret".to_string()),
            "DATABASE_URL" => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.redis.url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.payments.sign_password, "s3cret");
        assert_eq!(config.database.url, DatabaseConfig::default().url);
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("fleet-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");
        let mut config = AppConfig::default();
        config.logging.json = true;
        config.save(&path).unwrap();

        let loaded = AppConfig::from_toml(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(loaded.logging.json);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_settings_conversion() {
        let settings = ReservationsConfig::default().settings();
        assert_eq!(settings.lock_ttl, Duration::from_secs(15));
        assert_eq!(settings.cancellation_fee_percent, Decimal::from(20));
    }
}
