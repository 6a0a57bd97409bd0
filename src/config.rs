// src/config.rs
//
// Layered settings: built-in defaults, then an optional TOML file, then
// `IVS__SECTION__KEY` environment variables. When no database URL is
// configured, the legacy DB_HOST/DB_PORT/DB_USER/DB_PASSWORD/DB_NAME
// variables compose a PostgreSQL one.

use crate::codec::ValueCodec;
use crate::store::RetryPolicy;
use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "indicator-values";
pub const ENV_PREFIX: &str = "IVS";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub store: StoreSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    /// Smallest magnitude a compacted value may have, as a decimal string
    pub min_val: String,
    pub retry_max: u32,
    pub retry_delay_ms: u64,
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    Ok(Config::builder()
        .set_default("database.max_connections", 10i64)?
        .set_default("store.min_val", "0.001")?
        .set_default("store.retry_max", 3i64)?
        .set_default("store.retry_delay_ms", 100i64)?)
}

impl Settings {
    /// Load settings from `path` (required) or from `indicator-values.toml`
    /// in the working directory (optional), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let builder = match path {
            Some(path) => defaults()?.add_source(File::from(path)),
            None => defaults()?.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("Failed to load configuration")?
            .try_deserialize::<Settings>()
            .context("Invalid configuration")?;

        // Fail early on a bad floor rather than on the first write
        settings.value_codec()?;
        Ok(settings)
    }

    pub fn value_codec(&self) -> Result<ValueCodec> {
        let min_val = Decimal::from_str(&self.store.min_val)
            .with_context(|| format!("store.min_val is not a decimal: {}", self.store.min_val))?;
        ValueCodec::new(min_val).context("Invalid store.min_val")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.store.retry_max,
            Duration::from_millis(self.store.retry_delay_ms),
        )
    }

    pub fn database_url(&self) -> Result<String> {
        if let Some(url) = &self.database.url {
            return Ok(url.clone());
        }

        let db_host = std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let db_port = std::env::var("DB_PORT")
            .unwrap_or_else(|_| "5432".to_string())
            .parse::<u16>()
            .context("DB_PORT is not a port number")?;
        let db_user = std::env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string());
        let db_password = std::env::var("DB_PASSWORD").unwrap_or_else(|_| "postgres".to_string());
        let db_name = std::env::var("DB_NAME").unwrap_or_else(|_| "indicators".to_string());

        Ok(format!(
            "postgres://{}:{}@{}:{}/{}",
            db_user, db_password, db_host, db_port, db_name
        ))
    }
}
