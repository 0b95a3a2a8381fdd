//! Kagi Uploadr Library
//!
//! Two small serverless handlers behind API Gateway:
//!
//! - **Token authorizer**: verifies Cognito-issued RS256 bearer tokens
//!   against the user pool's JWKS and returns an IAM policy decision
//! - **Upload issuer**: hands out short-lived presigned S3 POST forms so
//!   browsers can upload directly to a bucket
//!
//! # Example
//!
//! ```no_run
//! use kagi_uploadr::auth::{authorize, jwt::TokenValidator, AuthorizationRequest};
//! use kagi_uploadr::config::AuthorizerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AuthorizerConfig::from_env()?;
//!     let validator = TokenValidator::from_config(&config)?;
//!
//!     let request = AuthorizationRequest::token(
//!         "Bearer eyJ...",
//!         "arn:aws:execute-api:us-east-1:123456789012:api/dev/GET/items",
//!     );
//!     let decision = authorize(&validator, &request).await?;
//!     println!("{}", serde_json::to_string(&decision)?);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod s3;
pub mod telemetry;
pub mod upload;

// Re-export commonly used types
pub use auth::{authorize, AuthorizationDecision, AuthorizationRequest, Unauthorized};
pub use config::{AuthorizerConfig, LoggingConfig, UploaderConfig};
pub use upload::UploadCredentialIssuer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
