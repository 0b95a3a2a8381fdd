//! Presigned POST policies
//!
//! Builds an S3 browser-upload policy and signs it with SigV4. The browser
//! posts a multipart form to [`PresignedPost::url`] containing every entry
//! of [`PresignedPost::fields`], a matching `Content-Type` field and the
//! file itself.
//!
//! Conditions attached to every policy:
//!
//! | Condition | Value |
//! |-----------|-------|
//! | `key` | exact object key |
//! | `acl` | `public-read` |
//! | `content-length-range` | `0..=1_000_000` bytes |
//! | `$Content-Type` | exact MIME type |
//! | expiration | 15 seconds after signing |

use super::{Credentials, S3Target};
use aws_sigv4::sign::v4::{calculate_signature, generate_signing_key};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::SystemTime;
use thiserror::Error;

/// SigV4 algorithm identifier
pub const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Default upload size ceiling in bytes
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1_000_000;

/// Default policy lifetime in seconds
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 15;

/// Canned ACL applied to uploaded objects
pub const DEFAULT_ACL: &str = "public-read";

/// Presign errors
#[derive(Error, Debug)]
pub enum PresignError {
    #[error("Policy error: {0}")]
    PolicyError(String),
}

/// A signed POST form
#[derive(Debug, Clone, Serialize)]
pub struct PresignedPost {
    pub url: String,
    pub fields: BTreeMap<String, String>,
}

/// Presigner for S3 POST uploads
#[derive(Debug, Clone)]
pub struct PostPresigner {
    target: S3Target,
    expires_in: Duration,
    max_upload_bytes: u64,
    acl: String,
}

impl PostPresigner {
    /// Create a presigner with the default constraints
    pub fn new(target: S3Target) -> Self {
        Self {
            target,
            expires_in: Duration::seconds(DEFAULT_EXPIRES_IN_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            acl: DEFAULT_ACL.to_string(),
        }
    }

    /// Set the policy lifetime
    #[must_use]
    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = expires_in;
        self
    }

    /// Set the upload size ceiling
    #[must_use]
    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Upload target
    pub fn target(&self) -> &S3Target {
        &self.target
    }

    /// Sign a POST policy for one object key
    #[tracing::instrument(
        name = "s3.presign_post",
        skip(self, credentials, now),
        fields(s3.bucket = %self.target.bucket, s3.key = %key),
        err
    )]
    pub fn presign(
        &self,
        credentials: &Credentials,
        key: &str,
        content_type: &str,
        now: DateTime<Utc>,
    ) -> Result<PresignedPost, PresignError> {
        if key.is_empty() {
            return Err(PresignError::PolicyError("object key is empty".into()));
        }

        let date = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let credential = format!(
            "{}/{}/{}/s3/aws4_request",
            credentials.access_key_id(),
            date,
            self.target.region
        );

        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), key.to_string());
        fields.insert("acl".to_string(), self.acl.clone());
        fields.insert("bucket".to_string(), self.target.bucket.clone());
        fields.insert("X-Amz-Algorithm".to_string(), SIGNING_ALGORITHM.to_string());
        fields.insert("X-Amz-Credential".to_string(), credential.clone());
        fields.insert("X-Amz-Date".to_string(), amz_date.clone());

        let mut conditions = vec![
            json!({"bucket": self.target.bucket}),
            json!({"key": key}),
            json!({"acl": self.acl}),
            json!(["content-length-range", 0, self.max_upload_bytes]),
            json!(["eq", "$Content-Type", content_type]),
            json!({"X-Amz-Algorithm": SIGNING_ALGORITHM}),
            json!({"X-Amz-Credential": credential}),
            json!({"X-Amz-Date": amz_date}),
        ];

        if let Some(token) = credentials.session_token() {
            fields.insert("X-Amz-Security-Token".to_string(), token.to_string());
            conditions.push(json!({"X-Amz-Security-Token": token}));
        }

        let expiration = (now + self.expires_in)
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        let policy: Value = json!({
            "expiration": expiration,
            "conditions": conditions,
        });
        let encoded_policy = STANDARD.encode(policy.to_string());

        let signing_key = generate_signing_key(
            credentials.secret_access_key(),
            SystemTime::from(now),
            &self.target.region,
            "s3",
        );
        let signature = calculate_signature(signing_key, encoded_policy.as_bytes());

        fields.insert("Policy".to_string(), encoded_policy);
        fields.insert("X-Amz-Signature".to_string(), signature);

        Ok(PresignedPost {
            url: self.target.post_url(),
            fields,
        })
    }
}
