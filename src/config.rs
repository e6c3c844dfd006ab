use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::model::leave::Entitlements;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Pool
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,

    // Rate limiting
    pub rate_protected_per_min: u32,

    // Logging
    pub log_dir: String,
    pub log_level: tracing::Level,

    pub component_catalog_path: Option<PathBuf>,
    pub default_entitlements: Entitlements,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}='{raw}' is invalid: {e}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = Entitlements::default();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", 10)?,
            db_acquire_timeout_secs: parsed_or("DB_ACQUIRE_TIMEOUT_SECS", 30)?,

            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parsed_or("LOG_LEVEL", tracing::Level::DEBUG)?,

            component_catalog_path: env::var("COMPONENT_CATALOG_PATH").ok().map(PathBuf::from),
            default_entitlements: Entitlements {
                casual: parsed_or("LEAVE_ENTITLEMENT_CASUAL", defaults.casual)?,
                sick: parsed_or("LEAVE_ENTITLEMENT_SICK", defaults.sick)?,
                earned: parsed_or("LEAVE_ENTITLEMENT_EARNED", defaults.earned)?,
            },
        })
    }
}
