//! Configuration loading and representation.
//!
//! Everything comes from the process environment. Parsing is done against a
//! lookup function so it can be exercised without touching the real env.

use std::net::SocketAddr;

use thiserror::Error;

use siteops_auth::{FallbackPolicy, FallbackTrigger};

/// Feature flag: may the deprecated legacy partner→site relation be consulted?
pub const LEGACY_FALLBACK_ENV: &str = "SITEOPS_LEGACY_MAPPING_FALLBACK";
/// What triggers the fallback once enabled: `error`, `empty` or `either`.
pub const LEGACY_TRIGGER_ENV: &str = "SITEOPS_LEGACY_FALLBACK_TRIGGER";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const BIND_ADDR_ENV: &str = "SITEOPS_BIND_ADDR";
pub const FIXTURES_ENV: &str = "SITEOPS_FIXTURES";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// `None` selects the in-memory stores.
    pub database_url: Option<String>,
    /// JSON fixtures loaded into the in-memory stores at startup.
    pub fixtures_path: Option<String>,
    pub fallback: FallbackPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_raw = get(BIND_ADDR_ENV).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name: BIND_ADDR_ENV,
            value: bind_raw.clone(),
            reason: "expected host:port",
        })?;

        let database_url = get(DATABASE_URL_ENV);

        // A persistent deployment never runs on the dev secret.
        let jwt_secret = match (get(JWT_SECRET_ENV), &database_url) {
            (Some(secret), _) => secret,
            (None, Some(_)) => return Err(ConfigError::Missing(JWT_SECRET_ENV)),
            (None, None) => {
                tracing::warn!("{JWT_SECRET_ENV} not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let legacy_fallback_enabled = match get(LEGACY_FALLBACK_ENV) {
            Some(raw) => parse_flag(LEGACY_FALLBACK_ENV, &raw)?,
            None => false,
        };
        let trigger = match get(LEGACY_TRIGGER_ENV) {
            Some(raw) => parse_trigger(&raw)?,
            None => FallbackTrigger::default(),
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            database_url,
            fixtures_path: get(FIXTURES_ENV),
            fallback: FallbackPolicy {
                legacy_fallback_enabled,
                trigger,
            },
        })
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw.to_string(),
            reason: "expected true/false",
        }),
    }
}

fn parse_trigger(raw: &str) -> Result<FallbackTrigger, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "error" => Ok(FallbackTrigger::OnError),
        "empty" => Ok(FallbackTrigger::OnEmpty),
        "either" => Ok(FallbackTrigger::OnEmptyOrError),
        _ => Err(ConfigError::Invalid {
            name: LEGACY_TRIGGER_ENV,
            value: raw.to_string(),
            reason: "expected error, empty or either",
        }),
    }
}
