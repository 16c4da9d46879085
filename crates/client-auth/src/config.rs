//! Client assertion validation configuration.
//!
//! Configuration is loaded from environment variables. The database URL is
//! redacted in Debug output.

use chrono::TimeDelta;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default issuance age limit in minutes.
pub const DEFAULT_REJECT_BEFORE_IN_MINUTES: u32 = 300;

/// Default mandatory claims.
pub const DEFAULT_MANDATORY_CLAIMS: &[&str] = &["iss", "sub", "aud", "exp", "jti"];

/// Default bound on the JTI cache tier.
pub const DEFAULT_JTI_CACHE_CAPACITY: u64 = 10_000;

/// Immutable validation policy bound to one validator instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Strict mode: any reuse of a JTI is rejected.
    pub prevent_token_reuse: bool,

    /// Expected audience. Overrides the tenant token endpoint when set.
    pub valid_audience: Option<String>,

    /// Expected issuer. Overrides the consumer key when set.
    pub valid_issuer: Option<String>,

    /// Maximum issuance age in minutes; 0 disables the check.
    pub reject_before_in_minutes: u32,

    pub mandatory_claims: Vec<String>,

    pub enable_jti_cache: bool,

    pub jti_cache_capacity: u64,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            prevent_token_reuse: true,
            valid_audience: None,
            valid_issuer: None,
            reject_before_in_minutes: DEFAULT_REJECT_BEFORE_IN_MINUTES,
            mandatory_claims: DEFAULT_MANDATORY_CLAIMS
                .iter()
                .map(ToString::to_string)
                .collect(),
            enable_jti_cache: true,
            jti_cache_capacity: DEFAULT_JTI_CACHE_CAPACITY,
        }
    }
}

/// Server-wide values the validator reads but does not own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub clock_skew: TimeDelta,

    /// This server's own token endpoint. Audience of last resort.
    pub token_endpoint: String,
}

impl ServerSettings {
    pub fn new(token_endpoint: &str, clock_skew_seconds: i64) -> Self {
        Self {
            clock_skew: TimeDelta::seconds(clock_skew_seconds),
            token_endpoint: token_endpoint.to_string(),
        }
    }
}

/// Client authentication configuration.
#[derive(Clone)]
pub struct Config {
    pub token_endpoint_url: String,

    /// JWT clock skew tolerance in seconds.
    pub jwt_clock_skew_seconds: i64,

    pub prevent_token_reuse: bool,

    pub valid_audience: Option<String>,

    pub valid_issuer: Option<String>,

    pub reject_before_in_minutes: u32,

    pub mandatory_claims: Vec<String>,

    pub enable_jti_cache: bool,

    pub jti_cache_capacity: u64,

    /// PostgreSQL connection URL for the durable JTI tier.
    pub database_url: Option<String>,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token_endpoint_url", &self.token_endpoint_url)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("prevent_token_reuse", &self.prevent_token_reuse)
            .field("valid_audience", &self.valid_audience)
            .field("valid_issuer", &self.valid_issuer)
            .field("reject_before_in_minutes", &self.reject_before_in_minutes)
            .field("mandatory_claims", &self.mandatory_claims)
            .field("enable_jti_cache", &self.enable_jti_cache)
            .field("jti_cache_capacity", &self.jti_cache_capacity)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid boolean configuration: {0}")]
    InvalidBoolean(String),

    #[error("Invalid reject-before configuration: {0}")]
    InvalidRejectBefore(String),

    #[error("Invalid JTI cache capacity configuration: {0}")]
    InvalidCacheCapacity(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let token_endpoint_url = non_empty(vars, "TOKEN_ENDPOINT_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("TOKEN_ENDPOINT_URL".to_string()))?;

        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        let prevent_token_reuse = parse_bool(vars, "JWT_PREVENT_TOKEN_REUSE", true)?;
        let enable_jti_cache = parse_bool(vars, "JWT_ENABLE_JTI_CACHE", true)?;

        let reject_before_in_minutes =
            if let Some(value_str) = vars.get("JWT_REJECT_BEFORE_IN_MINUTES") {
                value_str.trim().parse().map_err(|e| {
                    ConfigError::InvalidRejectBefore(format!(
                        "JWT_REJECT_BEFORE_IN_MINUTES must be a non-negative integer, got '{}': {}",
                        value_str, e
                    ))
                })?
            } else {
                DEFAULT_REJECT_BEFORE_IN_MINUTES
            };

        let mandatory_claims = match vars.get("JWT_MANDATORY_CLAIMS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|claim| !claim.is_empty())
                .map(ToString::to_string)
                .collect(),
            None => DEFAULT_MANDATORY_CLAIMS
                .iter()
                .map(ToString::to_string)
                .collect(),
        };

        let jti_cache_capacity = if let Some(value_str) = vars.get("JTI_CACHE_CAPACITY") {
            let value: u64 = value_str.trim().parse().map_err(|e| {
                ConfigError::InvalidCacheCapacity(format!(
                    "JTI_CACHE_CAPACITY must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidCacheCapacity(
                    "JTI_CACHE_CAPACITY must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_JTI_CACHE_CAPACITY
        };

        let config = Self {
            token_endpoint_url,
            jwt_clock_skew_seconds,
            prevent_token_reuse,
            valid_audience: non_empty(vars, "JWT_VALID_AUDIENCE"),
            valid_issuer: non_empty(vars, "JWT_VALID_ISSUER"),
            reject_before_in_minutes,
            mandatory_claims,
            enable_jti_cache,
            jti_cache_capacity,
            database_url: non_empty(vars, "DATABASE_URL"),
        };

        tracing::info!(
            target: "client_auth.config",
            prevent_token_reuse = config.prevent_token_reuse,
            enable_jti_cache = config.enable_jti_cache,
            jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
            reject_before_in_minutes = config.reject_before_in_minutes,
            durable_store = if config.database_url.is_some() { "postgres" } else { "memory" },
            "Client assertion validation configured"
        );

        Ok(config)
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            prevent_token_reuse: self.prevent_token_reuse,
            valid_audience: self.valid_audience.clone(),
            valid_issuer: self.valid_issuer.clone(),
            reject_before_in_minutes: self.reject_before_in_minutes,
            mandatory_claims: self.mandatory_claims.clone(),
            enable_jti_cache: self.enable_jti_cache,
            jti_cache_capacity: self.jti_cache_capacity,
        }
    }

    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings::new(&self.token_endpoint_url, self.jwt_clock_skew_seconds)
    }
}

/// Trimmed value of `name`, with empty treated as unset.
fn non_empty(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn parse_bool(
    vars: &HashMap<String, String>,
    name: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    match value_str.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean(format!(
            "{} must be true or false, got '{}'",
            name, value_str
        ))),
    }
}
