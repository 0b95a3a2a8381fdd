//! Authentication module
//!
//! Bearer-token authorization for API Gateway `TOKEN` authorizers.
//!
//! A request flows through [`jwt::TokenValidator`] in a fixed order:
//!
//! ```text
//! Start → TokenExtracted → HeaderDecoded → KeyResolved → Verified → Decided
//!   └──────────────┴──────────────┴─────────────┴────────────┴──→ Denied
//! ```
//!
//! Any stage may fail; [`authorize`] collapses every failure into the same
//! opaque [`Unauthorized`] result so callers learn nothing about which stage
//! rejected the token.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod jwks;
pub mod jwt;
pub mod policy;

pub use policy::{AuthorizationDecision, DecisionContext, Effect, PolicyDocument, Statement};

/// Marker carried in `type` by API Gateway token authorizer events
pub const TOKEN_REQUEST_KIND: &str = "TOKEN";

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Key retrieval error: {0}")]
    KeyRetrieval(String),

    #[error("Token verification failed: {0}")]
    TokenVerification(#[source] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MalformedRequest(_) => "malformed_request",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::KeyRetrieval(_) => "key_retrieval",
            AuthError::TokenVerification(_) => "token_verification",
        }
    }
}

/// The only failure an authorizer caller ever sees.
///
/// API Gateway turns a handler error whose message is exactly
/// `Unauthorized` into a `401` response.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Unauthorized")]
pub struct Unauthorized;

/// Inbound token authorizer event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(rename = "authorizationToken", default)]
    pub authorization_token: Option<String>,

    #[serde(rename = "methodArn", default)]
    pub method_arn: String,
}

impl AuthorizationRequest {
    /// Build a `TOKEN` request for the given header value and resource
    pub fn token(authorization_token: impl Into<String>, method_arn: impl Into<String>) -> Self {
        Self {
            kind: TOKEN_REQUEST_KIND.to_string(),
            authorization_token: Some(authorization_token.into()),
            method_arn: method_arn.into(),
        }
    }
}

/// Authenticator trait
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate a request and decide on access to its resource
    async fn authenticate(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationDecision, AuthError>;
}

/// Run an authenticator and hide the failure reason from the caller.
///
/// The concrete [`AuthError`] is logged at `warn` and counted; the caller
/// only receives [`Unauthorized`].
pub async fn authorize<A>(
    authenticator: &A,
    request: &AuthorizationRequest,
) -> Result<AuthorizationDecision, Unauthorized>
where
    A: Authenticator + ?Sized,
{
    match authenticator.authenticate(request).await {
        Ok(decision) => {
            #[cfg(feature = "metrics")]
            crate::metrics::record_auth_decision("allow", None);
            Ok(decision)
        }
        Err(e) => {
            tracing::warn!(error.kind = e.kind(), error = %e, "Authorization denied");
            #[cfg(feature = "metrics")]
            crate::metrics::record_auth_decision("deny", Some(e.kind()));
            Err(Unauthorized)
        }
    }
}
