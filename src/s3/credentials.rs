//! S3 Credentials Module
//!
//! Provides credential loading from various sources using a trait-based design.
//!
//! # Implementations
//!
//! - `StaticCredentials` - Fixed credentials (tests, explicit keys)
//! - `AwsDefaultChain` - The AWS SDK default provider chain (env, profile,
//!   container and instance metadata)
//!
//! # Example
//!
//! ```
//! use kagi_uploadr::s3::{CredentialsSource, StaticCredentials};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = StaticCredentials::new("access-key", "secret-key");
//!
//! let creds = provider.credentials().await?;
//! assert_eq!(creds.access_key_id(), "access-key");
//! assert_eq!(creds.secret_access_key(), "secret-key");
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use thiserror::Error;

/// Credential loading errors
#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Credential provider error: {0}")]
    ProviderError(String),
}

/// Credentials for AWS authentication
#[derive(Debug, Clone)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl Credentials {
    /// Create new credentials
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Create credentials with session token (for temporary credentials)
    pub fn with_session_token(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: Some(session_token.into()),
        }
    }

    /// Get the access key ID
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get the secret access key
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Get the session token (if any)
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

/// Source of signing credentials.
///
/// Called once per presign so rotating credentials are picked up.
#[async_trait]
pub trait CredentialsSource: Send + Sync {
    /// Get current credentials
    async fn credentials(&self) -> Result<Credentials, CredentialsError>;
}

/// Static credentials provider
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    credentials: Credentials,
}

impl StaticCredentials {
    /// Create a new static credentials provider
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(access_key_id, secret_access_key),
        }
    }

    /// Wrap existing credentials
    pub fn from_credentials(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialsSource for StaticCredentials {
    async fn credentials(&self) -> Result<Credentials, CredentialsError> {
        Ok(self.credentials.clone())
    }
}

/// AWS SDK default provider chain
///
/// The SDK caches and refreshes temporary credentials internally.
#[derive(Debug, Clone)]
pub struct AwsDefaultChain {
    provider: SharedCredentialsProvider,
}

impl AwsDefaultChain {
    /// Resolve the default chain
    pub async fn load() -> Result<Self, CredentialsError> {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let provider = sdk_config.credentials_provider().ok_or_else(|| {
            CredentialsError::MissingCredentials("no AWS credentials provider configured".into())
        })?;

        Ok(Self { provider })
    }
}

#[async_trait]
impl CredentialsSource for AwsDefaultChain {
    async fn credentials(&self) -> Result<Credentials, CredentialsError> {
        let creds = self
            .provider
            .provide_credentials()
            .await
            .map_err(|e| CredentialsError::ProviderError(e.to_string()))?;

        Ok(match creds.session_token() {
            Some(token) => Credentials::with_session_token(
                creds.access_key_id(),
                creds.secret_access_key(),
                token,
            ),
            None => Credentials::new(creds.access_key_id(), creds.secret_access_key()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_creation() {
        let creds = Credentials::new("access", "secret");
        assert_eq!(creds.access_key_id(), "access");
        assert_eq!(creds.secret_access_key(), "secret");
        assert!(creds.session_token().is_none());
    }

    #[test]
    fn test_credentials_with_session_token() {
        let creds = Credentials::with_session_token("access", "secret", "token");
        assert_eq!(creds.session_token(), Some("token"));
    }

    #[tokio::test]
    async fn test_static_credentials() {
        let provider = StaticCredentials::new("static-access", "static-secret");
        let creds = provider.credentials().await.unwrap();
        assert_eq!(creds.access_key_id(), "static-access");
        assert_eq!(creds.secret_access_key(), "static-secret");
    }
}
