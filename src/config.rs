// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `SERVICE_ACCOUNT` | Service account email allowed through the gate | Required |
//! | `GOOGLE_CERTS_URL` | JWKS endpoint for Google identity tokens | Google v3 certs |
//! | `JWKS_CACHE_TTL_SECS` | JWKS cache lifetime when the response has no `max-age` | `300` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::jwks::{DEFAULT_CACHE_TTL, GOOGLE_CERTS_URL};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable holding the only service account the gate accepts.
///
/// Typically the account Cloud Scheduler or a Pub/Sub push subscription is
/// configured to authenticate as, e.g.
/// `scheduler@my-project.iam.gserviceaccount.com`.
pub const SERVICE_ACCOUNT_ENV: &str = "SERVICE_ACCOUNT";

pub const GOOGLE_CERTS_URL_ENV: &str = "GOOGLE_CERTS_URL";
pub const JWKS_CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub service_account: String,
    pub google_certs_url: String,
    pub jwks_cache_ttl: Duration,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let service_account = get(SERVICE_ACCOUNT_ENV)
            .map(|v| v.trim().to_string())
            .ok_or(ConfigError::Missing(SERVICE_ACCOUNT_ENV))?;

        let port = match get(PORT_ENV) {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                value: v,
            })?,
            None => DEFAULT_PORT,
        };

        let jwks_cache_ttl = match get(JWKS_CACHE_TTL_ENV) {
            Some(v) => v
                .trim()
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid {
                    name: JWKS_CACHE_TTL_ENV,
                    value: v,
                })?,
            None => DEFAULT_CACHE_TTL,
        };

        let log_format = match get(LOG_FORMAT_ENV) {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                value: v,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            service_account,
            google_certs_url: get(GOOGLE_CERTS_URL_ENV)
                .unwrap_or_else(|| GOOGLE_CERTS_URL.to_string()),
            jwks_cache_ttl,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: HOST_ENV,
                value: self.host.clone(),
            })
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` controls the filter, falling back to [`DEFAULT_LOG_FILTER`].
pub fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    // try_init: a subscriber may already be installed (tests)
    let _ = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
}
