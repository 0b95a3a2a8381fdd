//! JWKS (JSON Web Key Set) key retrieval
//!
//! Fetches the key set from a remote endpoint and keeps resolved signing keys
//! in a process-wide TTL cache.
//!
//! # Cache policy
//!
//! - Keyed by `kid`
//! - Each entry expires a fixed time after insertion (default 1 hour)
//! - At most `max_entries` keys (default 100); when full, expired entries are
//!   purged first, then the oldest insertion is dropped
//! - No single-flight: two concurrent misses for the same `kid` may both fetch
//!
//! # Example
//!
//! ```no_run
//! use kagi_uploadr::auth::jwks::JwksClient;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = JwksClient::builder()
//!     .endpoint("https://cognito-idp.us-east-1.amazonaws.com/pool/.well-known/jwks.json")
//!     .timeout(Duration::from_secs(5))
//!     .cache_ttl(Duration::from_secs(3600))
//!     .build()?;
//!
//! let key = client.get_signing_key("key-1").await?;
//! # Ok(())
//! # }
//! ```

use super::AuthError;
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default signing key TTL (1 hour)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default maximum number of cached signing keys
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 100;

/// Default timeout for the key set request (5 seconds)
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// A single JSON Web Key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA")
    pub kty: String,

    /// Key ID
    #[serde(default)]
    pub kid: Option<String>,

    /// Intended use ("sig" for signature)
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// Algorithm (e.g., "RS256")
    #[serde(default)]
    pub alg: Option<String>,

    /// RSA modulus (base64url encoded)
    #[serde(default)]
    pub n: Option<String>,

    /// RSA exponent (base64url encoded)
    #[serde(default)]
    pub e: Option<String>,

    /// X.509 certificate chain (standard base64 DER, leaf first)
    #[serde(default)]
    pub x5c: Option<Vec<String>>,
}

impl Jwk {
    /// Whether this key may be used to verify signatures
    pub fn is_signing_key(&self) -> bool {
        self.key_use.as_deref().map_or(true, |u| u == "sig")
    }

    /// Extract verification material.
    ///
    /// A certificate in `x5c` wins over the raw RSA components.
    pub fn signing_key(&self) -> Option<SigningKey> {
        if let Some(cert) = self.x5c.as_ref().and_then(|chain| chain.first()) {
            return Some(SigningKey::PublicKey(certificate_pem(cert)));
        }

        match (&self.n, &self.e) {
            (Some(n), Some(e)) if self.kty == "RSA" => Some(SigningKey::RsaPublicKey {
                n: n.clone(),
                e: e.clone(),
            }),
            _ => None,
        }
    }
}

/// Wrap a base64 DER certificate in PEM armour
fn certificate_pem(der_base64: &str) -> String {
    let mut pem = String::from("-----BEGIN CERTIFICATE-----\n");
    for (i, c) in der_base64.chars().filter(|c| !c.is_whitespace()).enumerate() {
        if i > 0 && i % 64 == 0 {
            pem.push('\n');
        }
        pem.push(c);
    }
    pem.push_str("\n-----END CERTIFICATE-----\n");
    pem
}

/// JSON Web Key Set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Find a signing key by its key ID
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys
            .iter()
            .filter(|k| k.is_signing_key())
            .find(|k| k.kid.as_deref() == Some(kid))
    }
}

/// Resolved verification material
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningKey {
    /// PEM-encoded public key or certificate
    PublicKey(String),

    /// RSA public key components (base64url)
    RsaPublicKey { n: String, e: String },
}

impl SigningKey {
    /// Convert to a `jsonwebtoken` decoding key
    pub fn to_decoding_key(&self) -> jsonwebtoken::errors::Result<DecodingKey> {
        match self {
            SigningKey::PublicKey(pem) => DecodingKey::from_rsa_pem(pem.as_bytes()),
            SigningKey::RsaPublicKey { n, e } => DecodingKey::from_rsa_components(n, e),
        }
    }
}

/// Cached key with insertion time
struct CachedKey {
    key: SigningKey,
    inserted_at: Instant,
}

/// TTL cache of signing keys, keyed by `kid`
pub struct SigningKeyCache {
    entries: RwLock<HashMap<String, CachedKey>>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for SigningKeyCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, DEFAULT_CACHE_MAX_ENTRIES)
    }
}

impl SigningKeyCache {
    /// Create a cache with the given TTL and capacity
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Get the cache TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the cache capacity
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Look up a live entry
    pub async fn get(&self, kid: &str) -> Option<SigningKey> {
        let entries = self.entries.read().await;
        entries
            .get(kid)
            .filter(|cached| cached.inserted_at.elapsed() < self.ttl)
            .map(|cached| cached.key.clone())
    }

    /// Insert or replace an entry
    pub async fn insert(&self, kid: String, key: SigningKey) {
        let mut entries = self.entries.write().await;

        if !entries.contains_key(&kid) && entries.len() >= self.max_entries {
            let ttl = self.ttl;
            entries.retain(|_, v| v.inserted_at.elapsed() < ttl);

            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, v)| v.inserted_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            kid,
            CachedKey {
                key,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of stored entries, including expired ones not yet purged
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop all entries
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Builder for [`JwksClient`]
#[derive(Default)]
pub struct JwksClientBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
    cache_ttl: Option<Duration>,
    max_entries: Option<usize>,
}

impl JwksClientBuilder {
    /// Set the key set URL
    pub fn endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the signing key TTL
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Set the maximum number of cached keys
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<JwksClient, AuthError> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| AuthError::KeyRetrieval("JWKS endpoint is required".into()))?;

        let http = reqwest::Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT))
            .build()
            .map_err(|e| AuthError::KeyRetrieval(format!("Failed to build HTTP client: {}", e)))?;

        Ok(JwksClient {
            endpoint,
            http,
            cache: SigningKeyCache::new(
                self.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL),
                self.max_entries.unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
            ),
        })
    }
}

/// Caching key set client
///
/// Build one per process and share it; the cache only pays off when it
/// outlives a single request.
pub struct JwksClient {
    endpoint: String,
    http: reqwest::Client,
    cache: SigningKeyCache,
}

impl JwksClient {
    /// Create a client with default timeout and cache settings
    pub fn new(endpoint: &str) -> Result<Self, AuthError> {
        Self::builder().endpoint(endpoint).build()
    }

    /// Create a new builder
    pub fn builder() -> JwksClientBuilder {
        JwksClientBuilder::default()
    }

    /// Key set URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The signing key cache
    pub fn cache(&self) -> &SigningKeyCache {
        &self.cache
    }

    /// Fetch the key set document
    #[tracing::instrument(
        name = "auth.jwks.fetch",
        skip(self),
        fields(http.url = %self.endpoint, http.status_code = tracing::field::Empty),
        err
    )]
    pub async fn fetch_jwks(&self) -> Result<Jwks, AuthError> {
        let response = self.http.get(&self.endpoint).send().await.map_err(|e| {
            #[cfg(feature = "metrics")]
            crate::metrics::record_jwks_fetch("error");
            AuthError::KeyRetrieval(e.to_string())
        })?;

        let status = response.status();
        tracing::Span::current().record("http.status_code", status.as_u16());

        if !status.is_success() {
            #[cfg(feature = "metrics")]
            crate::metrics::record_jwks_fetch("error");
            return Err(AuthError::KeyRetrieval(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let jwks: Jwks = response.json().await.map_err(|e| {
            #[cfg(feature = "metrics")]
            crate::metrics::record_jwks_fetch("error");
            AuthError::KeyRetrieval(e.to_string())
        })?;

        #[cfg(feature = "metrics")]
        crate::metrics::record_jwks_fetch("success");
        tracing::debug!(keys = jwks.keys.len(), "Fetched key set");

        Ok(jwks)
    }

    /// Resolve the signing key for `kid`, consulting the cache first
    pub async fn get_signing_key(&self, kid: &str) -> Result<SigningKey, AuthError> {
        if let Some(key) = self.cache.get(kid).await {
            #[cfg(feature = "metrics")]
            crate::metrics::record_key_cache(true);
            return Ok(key);
        }

        #[cfg(feature = "metrics")]
        crate::metrics::record_key_cache(false);

        let jwks = self.fetch_jwks().await?;
        let jwk = jwks
            .find(kid)
            .ok_or_else(|| AuthError::KeyRetrieval(format!("Key not found: {}", kid)))?;
        let key = jwk.signing_key().ok_or_else(|| {
            AuthError::KeyRetrieval(format!("Key {} has no usable public key material", kid))
        })?;

        self.cache.insert(kid.to_string(), key.clone()).await;
        Ok(key)
    }
}
