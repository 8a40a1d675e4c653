// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read once from the environment at startup (a `.env` file
//! in the working directory is loaded first, if present).
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `PUBLIC_BASE_URL` | External URL, used for the OAuth redirect | `http://localhost:8080` |
//! | `DATA_DIR` | Directory of the redb database | unset (in-memory) |
//! | `SESSION_COOKIE_NAME` | Session cookie name | `session` |
//! | `SESSION_LIFETIME_SECS` | Session lifetime | `2678400` (31 days) |
//! | `SESSION_COOKIE_DOMAIN` | Cookie `Domain` attribute | unset |
//! | `SESSION_COOKIE_PATH` | Cookie `Path` attribute | `/` |
//! | `SESSION_COOKIE_SECURE` | Cookie `Secure` flag | `false` |
//! | `SESSION_COOKIE_HTTPONLY` | Cookie `HttpOnly` flag | `true` |
//! | `SESSION_COOKIE_SAMESITE` | `lax`, `strict` or `none` | `lax` |
//! | `SESSION_SWEEP_INTERVAL_SECS` | Period of the expired-session sweep | `900` |
//! | `GOOGLE_CLIENT_ID` | OAuth client id | Required |
//! | `GOOGLE_CLIENT_SECRET` | OAuth client secret | Required |
//! | `CIRCLE_API_KEY` | Wallet API key | Required |
//! | `CIRCLE_ENTITY_SECRET_CIPHERTEXT` | Registered entity secret ciphertext | Required |
//! | `CIRCLE_API_BASE_URL` | Wallet API base URL | `https://api.circle.com` |
//! | `WALLET_CHAINS` | Comma-separated chains to provision | `ARB-SEPOLIA` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ::cookie::SameSite;
use chrono::TimeDelta;
use url::Url;

use crate::auth::GoogleOAuthConfig;
use crate::session::{SessionSettings, DEFAULT_SWEEP_INTERVAL};
use crate::wallet::{client::DEFAULT_API_BASE_URL, CircleConfig, DEFAULT_CHAIN};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const PUBLIC_BASE_URL_ENV: &str = "PUBLIC_BASE_URL";

/// Environment variable name for the database directory.
///
/// When unset, sessions and accounts live in memory and are lost on restart.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const SESSION_COOKIE_NAME_ENV: &str = "SESSION_COOKIE_NAME";
pub const SESSION_LIFETIME_SECS_ENV: &str = "SESSION_LIFETIME_SECS";
pub const SESSION_COOKIE_DOMAIN_ENV: &str = "SESSION_COOKIE_DOMAIN";
pub const SESSION_COOKIE_PATH_ENV: &str = "SESSION_COOKIE_PATH";
pub const SESSION_COOKIE_SECURE_ENV: &str = "SESSION_COOKIE_SECURE";
pub const SESSION_COOKIE_HTTPONLY_ENV: &str = "SESSION_COOKIE_HTTPONLY";
pub const SESSION_COOKIE_SAMESITE_ENV: &str = "SESSION_COOKIE_SAMESITE";
pub const SESSION_SWEEP_INTERVAL_SECS_ENV: &str = "SESSION_SWEEP_INTERVAL_SECS";

pub const GOOGLE_CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";
pub const GOOGLE_CLIENT_SECRET_ENV: &str = "GOOGLE_CLIENT_SECRET";

pub const CIRCLE_API_KEY_ENV: &str = "CIRCLE_API_KEY";
pub const CIRCLE_ENTITY_SECRET_CIPHERTEXT_ENV: &str = "CIRCLE_ENTITY_SECRET_CIPHERTEXT";
pub const CIRCLE_API_BASE_URL_ENV: &str = "CIRCLE_API_BASE_URL";
pub const WALLET_CHAINS_ENV: &str = "WALLET_CHAINS";

/// Logging format selector (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT`; anything other than `json` is pretty.
    pub fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub public_base_url: String,
    pub data_dir: Option<PathBuf>,
    pub session: SessionSettings,
    pub sweep_interval: Duration,
    pub google: GoogleOAuthConfig,
    pub circle: CircleConfig,
    pub wallet_chains: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let host = env.or_default(HOST_ENV, DEFAULT_HOST);
        let port = env.parsed(PORT_ENV, DEFAULT_PORT)?;
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e| ConfigError::Invalid {
                    name: HOST_ENV,
                    reason: format!("{host}:{port} is not a socket address: {e}"),
                })?;

        let public_base_url = env.or_default(PUBLIC_BASE_URL_ENV, DEFAULT_PUBLIC_BASE_URL);
        Url::parse(&public_base_url).map_err(|e| ConfigError::Invalid {
            name: PUBLIC_BASE_URL_ENV,
            reason: e.to_string(),
        })?;
        let public_base_url = public_base_url.trim_end_matches('/').to_string();

        let defaults = SessionSettings::default();
        let lifetime_secs = env.parsed(
            SESSION_LIFETIME_SECS_ENV,
            defaults.lifetime.num_seconds().unsigned_abs(),
        )?;
        let lifetime = i64::try_from(lifetime_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .filter(|d| *d > TimeDelta::zero())
            .ok_or_else(|| ConfigError::Invalid {
                name: SESSION_LIFETIME_SECS_ENV,
                reason: format!("{lifetime_secs} is not a usable lifetime"),
            })?;

        let session = SessionSettings {
            cookie_name: env.or_default(SESSION_COOKIE_NAME_ENV, &defaults.cookie_name),
            lifetime,
            cookie_domain: env.optional(SESSION_COOKIE_DOMAIN_ENV),
            cookie_path: env.or_default(SESSION_COOKIE_PATH_ENV, &defaults.cookie_path),
            cookie_http_only: env.flag(SESSION_COOKIE_HTTPONLY_ENV, defaults.cookie_http_only)?,
            cookie_secure: env.flag(SESSION_COOKIE_SECURE_ENV, defaults.cookie_secure)?,
            cookie_same_site: match env.optional(SESSION_COOKIE_SAMESITE_ENV) {
                Some(value) => Some(parse_same_site(&value)?),
                None => defaults.cookie_same_site,
            },
        };
        if session.cookie_same_site == Some(SameSite::None) && !session.cookie_secure {
            tracing::warn!("SameSite=None without Secure; browsers will reject the session cookie");
        }

        let sweep_interval = Duration::from_secs(
            env.parsed(SESSION_SWEEP_INTERVAL_SECS_ENV, DEFAULT_SWEEP_INTERVAL.as_secs())?,
        );
        if sweep_interval.is_zero() {
            return Err(ConfigError::Invalid {
                name: SESSION_SWEEP_INTERVAL_SECS_ENV,
                reason: "must be greater than zero".to_string(),
            });
        }

        let google = GoogleOAuthConfig {
            client_id: env.required(GOOGLE_CLIENT_ID_ENV)?,
            client_secret: env.required(GOOGLE_CLIENT_SECRET_ENV)?,
        };

        let circle = CircleConfig {
            api_key: env.required(CIRCLE_API_KEY_ENV)?,
            entity_secret_ciphertext: env.required(CIRCLE_ENTITY_SECRET_CIPHERTEXT_ENV)?,
            api_base_url: env.or_default(CIRCLE_API_BASE_URL_ENV, DEFAULT_API_BASE_URL),
        };

        let wallet_chains: Vec<String> = env
            .or_default(WALLET_CHAINS_ENV, DEFAULT_CHAIN)
            .split(',')
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .collect();

        Ok(Self {
            bind_addr,
            public_base_url,
            data_dir: env.optional(DATA_DIR_ENV).map(PathBuf::from),
            session,
            sweep_interval,
            google,
            circle,
            wallet_chains,
        })
    }

    /// Absolute URL the identity provider redirects back to.
    pub fn callback_url(&self) -> String {
        format!("{}/callback", self.public_base_url)
    }
}

fn parse_same_site(value: &str) -> Result<SameSite, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "lax" => Ok(SameSite::Lax),
        "strict" => Ok(SameSite::Strict),
        "none" => Ok(SameSite::None),
        other => Err(ConfigError::Invalid {
            name: SESSION_COOKIE_SAMESITE_ENV,
            reason: format!("expected lax, strict or none, got {other:?}"),
        }),
    }
}

/// Trimmed, non-empty variable lookup.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(name).map(|v| v.to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) => match v.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid {
                    name,
                    reason: format!("expected a boolean, got {v:?}"),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let mut vars: HashMap<String, String> = [
            (GOOGLE_CLIENT_ID_ENV, "client"),
            (GOOGLE_CLIENT_SECRET_ENV, "secret"),
            (CIRCLE_API_KEY_ENV, "TEST_API_KEY:abc"),
            (CIRCLE_ENTITY_SECRET_CIPHERTEXT_ENV, "cipher"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config_with(&[]).unwrap();

        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.callback_url(), "http://localhost:8080/callback");
        assert!(config.data_dir.is_none());
        assert_eq!(config.session.cookie_name, "session");
        assert_eq!(config.session.lifetime, TimeDelta::days(31));
        assert_eq!(config.session.cookie_same_site, Some(SameSite::Lax));
        assert_eq!(config.sweep_interval, Duration::from_secs(900));
        assert_eq!(config.circle.api_base_url, "https://api.circle.com");
        assert_eq!(config.wallet_chains, vec!["ARB-SEPOLIA".to_string()]);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_with(&[
            (PORT_ENV, "3000"),
            (PUBLIC_BASE_URL_ENV, "https://wallet.example.com/"),
            (DATA_DIR_ENV, "/var/lib/revenant"),
            (SESSION_LIFETIME_SECS_ENV, "3600"),
            (SESSION_COOKIE_DOMAIN_ENV, "example.com"),
            (SESSION_COOKIE_SECURE_ENV, "true"),
            (SESSION_COOKIE_SAMESITE_ENV, "Strict"),
            (WALLET_CHAINS_ENV, "arb-sepolia, eth-sepolia,"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.callback_url(), "https://wallet.example.com/callback");
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/revenant")));
        assert_eq!(config.session.lifetime, TimeDelta::hours(1));
        assert_eq!(config.session.cookie_domain.as_deref(), Some("example.com"));
        assert!(config.session.cookie_secure);
        assert_eq!(config.session.cookie_same_site, Some(SameSite::Strict));
        assert_eq!(config.wallet_chains, vec!["ARB-SEPOLIA", "ETH-SEPOLIA"]);
    }

    #[test]
    fn missing_credentials_fail() {
        let err = AppConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(GOOGLE_CLIENT_ID_ENV)));
    }

    #[test]
    fn invalid_values_fail() {
        assert!(matches!(
            config_with(&[(PORT_ENV, "eighty")]),
            Err(ConfigError::Invalid { name: PORT_ENV, .. })
        ));
        assert!(matches!(
            config_with(&[(SESSION_COOKIE_SAMESITE_ENV, "sometimes")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config_with(&[(SESSION_LIFETIME_SECS_ENV, "0")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config_with(&[(SESSION_COOKIE_HTTPONLY_ENV, "maybe")]),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
