//! JWT bearer-token validation
//!
//! [`TokenValidator`] turns an API Gateway token authorizer event into an
//! [`AuthorizationDecision`]. Each step is also exposed on its own:
//! [`extract_token`], [`decode_unverified`], [`verify`].
//!
//! # Example
//!
//! ```no_run
//! use kagi_uploadr::auth::jwks::JwksClient;
//! use kagi_uploadr::auth::jwt::TokenValidator;
//! use kagi_uploadr::auth::{AuthorizationRequest, Authenticator};
//! use jsonwebtoken::Algorithm;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let issuer = "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_pool";
//! let jwks = JwksClient::new(&format!("{}/.well-known/jwks.json", issuer))?;
//! let validator = TokenValidator::new(jwks, issuer, Algorithm::RS256);
//!
//! let request = AuthorizationRequest::token("Bearer eyJ...", "arn:aws:execute-api:...");
//! let decision = validator.authenticate(&request).await?;
//! # Ok(())
//! # }
//! ```

use super::jwks::{JwksClient, SigningKey};
use super::{
    AuthError, AuthorizationDecision, AuthorizationRequest, Authenticator, TOKEN_REQUEST_KIND,
};
use crate::config::{AuthorizerConfig, ConfigError};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use lazy_static::lazy_static;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

lazy_static! {
    static ref BEARER_PATTERN: Regex = Regex::new(r"^Bearer (.+)$").unwrap();
}

/// Verified JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<serde_json::Value>,
}

/// Header fields needed to locate the verification key
#[derive(Debug, Clone)]
pub struct TokenHeader {
    pub key_id: String,
    pub algorithm: Algorithm,
}

/// Payload fields read without verification
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenPayload {
    #[serde(rename = "iss", default)]
    pub issuer: Option<String>,
    #[serde(rename = "sub", default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub scope: Option<serde_json::Value>,
}

/// Token decoded without checking its signature.
///
/// Only good for finding the key; nothing here is trusted.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    pub header: TokenHeader,
    pub payload: TokenPayload,
}

/// Pull the bearer token out of a `TOKEN` authorizer event
pub fn extract_token(request: &AuthorizationRequest) -> Result<&str, AuthError> {
    if request.kind != TOKEN_REQUEST_KIND {
        return Err(AuthError::MalformedRequest(format!(
            "Expected request type \"{}\", got \"{}\"",
            TOKEN_REQUEST_KIND, request.kind
        )));
    }

    let header = request
        .authorization_token
        .as_deref()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AuthError::MalformedRequest("Missing authorization token".into()))?;

    BEARER_PATTERN
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| {
            AuthError::MalformedRequest(
                "Authorization token does not match \"Bearer <token>\"".into(),
            )
        })
}

/// Decode header and payload without verifying the signature
pub fn decode_unverified(token: &str) -> Result<DecodedToken, AuthError> {
    let header = decode_header(token)
        .map_err(|e| AuthError::InvalidToken(format!("Invalid token header: {}", e)))?;

    let key_id = header
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or_else(|| AuthError::InvalidToken("Token header has no key id".into()))?;

    let mut segments = token.split('.');
    let payload_segment = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(AuthError::InvalidToken("Token must have three segments".into())),
    };

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_segment.trim_end_matches('='))
        .map_err(|e| AuthError::InvalidToken(format!("Invalid token payload: {}", e)))?;
    let payload: TokenPayload = serde_json::from_slice(&payload_bytes)
        .map_err(|e| AuthError::InvalidToken(format!("Invalid token payload: {}", e)))?;

    Ok(DecodedToken {
        header: TokenHeader {
            key_id,
            algorithm: header.alg,
        },
        payload,
    })
}

/// Verify signature, expiry, not-before and issuer
pub fn verify(
    token: &str,
    key: &SigningKey,
    issuer: &str,
    algorithm: Algorithm,
) -> Result<Claims, AuthError> {
    let decoding_key = key.to_decoding_key().map_err(AuthError::TokenVerification)?;

    let mut validation = Validation::new(algorithm);
    validation.set_issuer(&[issuer]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.validate_aud = false; // audience is not part of the contract

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(AuthError::TokenVerification)
}

/// JWKS-backed token validator
pub struct TokenValidator {
    jwks: JwksClient,
    issuer: String,
    algorithm: Algorithm,
}

impl TokenValidator {
    /// Create a validator
    pub fn new(jwks: JwksClient, issuer: &str, algorithm: Algorithm) -> Self {
        Self {
            jwks,
            issuer: issuer.to_string(),
            algorithm,
        }
    }

    /// Create a validator from authorizer configuration
    pub fn from_config(config: &AuthorizerConfig) -> Result<Self, ConfigError> {
        let algorithm = config.algorithm()?;

        let jwks = JwksClient::builder()
            .endpoint(&config.jwks_url())
            .timeout(Duration::from_secs(config.jwks_timeout_secs))
            .cache_ttl(Duration::from_secs(config.jwks_cache_ttl_secs))
            .max_entries(config.jwks_cache_max_entries)
            .build()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self::new(jwks, &config.issuer(), algorithm))
    }

    /// Expected issuer
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Expected signing algorithm
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Key set client
    pub fn jwks(&self) -> &JwksClient {
        &self.jwks
    }
}

#[async_trait]
impl Authenticator for TokenValidator {
    #[tracing::instrument(
        name = "auth.token",
        skip(self, request),
        fields(
            auth.method = "jwt",
            auth.token_present = request.authorization_token.is_some(),
            auth.kid = tracing::field::Empty
        )
    )]
    async fn authenticate(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationDecision, AuthError> {
        let token = extract_token(request)?;
        let decoded = decode_unverified(token)?;
        tracing::Span::current().record("auth.kid", decoded.header.key_id.as_str());

        let key = self.jwks.get_signing_key(&decoded.header.key_id).await?;
        let claims = verify(token, &key, &self.issuer, self.algorithm)?;

        tracing::info!(subject = %claims.sub, "JWT authentication successful");

        Ok(AuthorizationDecision::allow(
            claims.sub,
            &request.method_arn,
            claims.scope,
        ))
    }
}
