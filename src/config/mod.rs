//! Configuration module for Kagi Uploadr
//!
//! Both handlers are configured from environment variables. Values are read
//! once at startup; a missing or invalid value is fatal and the binary exits
//! before it accepts any event.
//!
//! | Variable | Handler | Default |
//! |----------|---------|---------|
//! | `REGION` | authorizer | required |
//! | `USER_POOLS_ID` | authorizer | required |
//! | `JWT_ALGORITHM_TYPE` | authorizer | `RS256` |
//! | `USER_POOLS_WEB_CLIENT_ID` | authorizer | unset (not enforced) |
//! | `JWKS_TIMEOUT_SECS` | authorizer | `5` |
//! | `JWKS_CACHE_TTL_SECS` | authorizer | `3600` |
//! | `JWKS_CACHE_MAX_ENTRIES` | authorizer | `100` |
//! | `BUCKET` | uploader | required |
//! | `ENV` / `BUCKET_ENDPOINT` | uploader | unset |
//! | `AWS_REGION` / `REGION` | uploader | `us-east-1` |
//! | `LOG_LEVEL` / `LOG_FORMAT` | both | `info` / `json` |

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Parse a signing algorithm.
///
/// Accepts full names (`RS256`, `PS384`, ...) or a bare bit size (`256`),
/// which selects the RSA PKCS#1 variant.
pub fn parse_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    let value = value.trim();
    let name = if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        format!("RS{}", value)
    } else {
        value.to_uppercase()
    };

    let algorithm = Algorithm::from_str(&name)
        .map_err(|_| ConfigError::Invalid(format!("Unknown JWT algorithm '{}'", value)))?;

    match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => Ok(algorithm),
        other => Err(ConfigError::Invalid(format!(
            "JWT algorithm {:?} is not supported: key sets only carry RSA keys",
            other
        ))),
    }
}

// ============================================================================
// Authorizer
// ============================================================================

/// Token authorizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizerConfig {
    /// AWS region of the user pool
    #[serde(default)]
    pub region: String,

    /// Cognito user pool id
    #[serde(default)]
    pub user_pools_id: String,

    /// Signing algorithm name or bit size
    #[serde(default = "default_jwt_algorithm")]
    pub jwt_algorithm_type: String,

    /// App client id. Loaded for completeness; tokens are not checked
    /// against it.
    #[serde(default)]
    pub user_pools_web_client_id: Option<String>,

    #[serde(default = "default_jwks_timeout_secs")]
    pub jwks_timeout_secs: u64,

    #[serde(default = "default_jwks_cache_ttl_secs")]
    pub jwks_cache_ttl_secs: u64,

    #[serde(default = "default_jwks_cache_max_entries")]
    pub jwks_cache_max_entries: usize,
}

fn default_jwt_algorithm() -> String {
    "RS256".to_string()
}

fn default_jwks_timeout_secs() -> u64 {
    5
}

fn default_jwks_cache_ttl_secs() -> u64 {
    3600
}

fn default_jwks_cache_max_entries() -> usize {
    100
}

impl AuthorizerConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&ConfigLoader::from_env())
    }

    /// Load from an explicit variable map
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(&ConfigLoader::from_vars(vars))
    }

    fn load(loader: &ConfigLoader) -> Result<Self, ConfigError> {
        let config: Self = loader.load()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::Missing("REGION"));
        }
        if self.user_pools_id.trim().is_empty() {
            return Err(ConfigError::Missing("USER_POOLS_ID"));
        }
        if self.jwks_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "JWKS_TIMEOUT_SECS must be greater than zero".into(),
            ));
        }
        if self.jwks_cache_max_entries == 0 {
            return Err(ConfigError::Invalid(
                "JWKS_CACHE_MAX_ENTRIES must be greater than zero".into(),
            ));
        }
        self.algorithm()?;
        Ok(())
    }

    /// Expected `iss` claim
    pub fn issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.region, self.user_pools_id
        )
    }

    /// Key set URL
    pub fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.issuer())
    }

    /// Parsed signing algorithm
    pub fn algorithm(&self) -> Result<Algorithm, ConfigError> {
        parse_algorithm(&self.jwt_algorithm_type)
    }
}

// ============================================================================
// Uploader
// ============================================================================

/// Default signing region when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Upload credential issuer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Target bucket
    #[serde(default)]
    pub bucket: String,

    /// Emulator endpoint, used only when `env` is `local`
    #[serde(default)]
    pub bucket_endpoint: Option<String>,

    /// Deployment environment (`local` targets an emulator)
    #[serde(default)]
    pub env: Option<String>,

    #[serde(default)]
    pub aws_region: Option<String>,

    #[serde(default)]
    pub region: Option<String>,
}

impl UploaderConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&ConfigLoader::from_env())
    }

    /// Load from an explicit variable map
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(&ConfigLoader::from_vars(vars))
    }

    fn load(loader: &ConfigLoader) -> Result<Self, ConfigError> {
        let config: Self = loader.load()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Missing("BUCKET"));
        }

        if let Some(endpoint) = self.endpoint() {
            if !is_valid_http_url(endpoint) {
                return Err(ConfigError::Invalid(
                    "Invalid BUCKET_ENDPOINT: must start with http:// or https://".into(),
                ));
            }
        }

        Ok(())
    }

    /// Whether uploads target a local emulator
    pub fn is_local(&self) -> bool {
        self.env.as_deref() == Some("local")
    }

    /// Endpoint override, only honoured for local runs.
    ///
    /// `None` means the regular AWS endpoint.
    pub fn endpoint(&self) -> Option<&str> {
        if self.is_local() {
            self.bucket_endpoint.as_deref()
        } else {
            None
        }
    }

    /// Region used for request signing
    pub fn signing_region(&self) -> &str {
        self.aws_region
            .as_deref()
            .or(self.region.as_deref())
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REGION)
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

impl LoggingConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        ConfigLoader::from_env().load()
    }

    /// Load from an explicit variable map
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        ConfigLoader::from_vars(vars).load()
    }
}
