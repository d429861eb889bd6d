//! Configuration loading and representation.
//!
//! Everything comes from environment variables. [`AppConfig::from_lookup`]
//! takes the lookup as a closure so tests never touch the process env.

use secrecy::SecretString;
use thiserror::Error;

pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 30;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is required: {reason}")]
    Missing { name: &'static str, reason: &'static str },

    #[error("{name} has an invalid value '{value}': expected {expected}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: SecretString,
    pub max_connections: u32,
}

/// Account created (or left alone, if present) at startup.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub name: String,
    pub password: SecretString,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: SecretString,
    pub access_token_ttl: chrono::Duration,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
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

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => SecretString::new(secret),
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                SecretString::new(DEV_JWT_SECRET.to_string())
            }
        };

        let ttl_minutes = match get("ACCESS_TOKEN_TTL_MINUTES") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(minutes) if minutes > 0 => minutes,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "ACCESS_TOKEN_TTL_MINUTES",
                        value: raw,
                        expected: "a positive number of minutes",
                    });
                }
            },
            None => DEFAULT_ACCESS_TOKEN_TTL_MINUTES,
        };

        let use_persistent = match get("USE_PERSISTENT_STORES") {
            Some(raw) => parse_bool("USE_PERSISTENT_STORES", raw)?,
            None => false,
        };

        let database = if use_persistent {
            let url = get("DATABASE_URL").ok_or(ConfigError::Missing {
                name: "DATABASE_URL",
                reason: "USE_PERSISTENT_STORES is enabled",
            })?;
            let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
                Some(raw) => match raw.trim().parse::<u32>() {
                    Ok(n) if n > 0 => n,
                    _ => {
                        return Err(ConfigError::Invalid {
                            name: "DATABASE_MAX_CONNECTIONS",
                            value: raw,
                            expected: "a positive integer",
                        });
                    }
                },
                None => DEFAULT_MAX_CONNECTIONS,
            };
            Some(DatabaseConfig {
                url: SecretString::new(url),
                max_connections,
            })
        } else {
            None
        };

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_EMAIL"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email,
                name: get("BOOTSTRAP_ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                password: SecretString::new(password),
            }),
            (Some(_), None) => {
                return Err(ConfigError::Missing {
                    name: "BOOTSTRAP_ADMIN_PASSWORD",
                    reason: "BOOTSTRAP_ADMIN_EMAIL is set",
                });
            }
            _ => None,
        };

        Ok(Self {
            jwt_secret,
            access_token_ttl: chrono::Duration::minutes(ttl_minutes),
            database,
            bootstrap_admin,
        })
    }
}

fn parse_bool(name: &'static str, raw: String) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw,
            expected: "a boolean (true/false)",
        }),
    }
}
