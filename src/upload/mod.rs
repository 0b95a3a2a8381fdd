//! Upload module
//!
//! Issues presigned POST credentials for browser uploads. Each request gets
//! a fresh object key; the browser then uploads straight to S3 without the
//! file ever passing through the handler.

use crate::config::UploaderConfig;
use crate::s3::presign::{PostPresigner, PresignError, PresignedPost};
use crate::s3::{AwsDefaultChain, CredentialsError, CredentialsSource, S3Target};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::field::Empty;

pub mod event;

pub use event::{ProxyRequest, ProxyResponse};

/// Characters allowed in the random part of an object key
pub const OBJECT_KEY_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!-.*()";

/// Length of the random part of an object key
pub const OBJECT_KEY_RANDOM_LEN: usize = 10;

/// Query parameter carrying the upload's MIME type
pub const FILE_TYPE_PARAM: &str = "fileType";

/// Upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Querystring parameter fileType must be provided when creating a presigned URL, i.e. ?fileType=image/png")]
    MissingFileType,

    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error(transparent)]
    Presign(#[from] PresignError),
}

/// Generate an object key of the form `YYYYMMDD_xxxxxxxxxx`
pub fn generate_object_key<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..OBJECT_KEY_RANDOM_LEN)
        .map(|_| OBJECT_KEY_ALPHABET[rng.random_range(0..OBJECT_KEY_ALPHABET.len())] as char)
        .collect();
    format!("{}_{}", now.format("%Y%m%d"), suffix)
}

/// Successful upload credential
#[derive(Debug, Clone, Serialize)]
pub struct IssuedUpload {
    #[serde(flatten)]
    pub post: PresignedPost,

    #[serde(rename = "filePath")]
    pub file_path: String,
}

/// Issues presigned POST credentials
pub struct UploadCredentialIssuer {
    presigner: PostPresigner,
    credentials: Arc<dyn CredentialsSource>,
}

impl UploadCredentialIssuer {
    /// Create an issuer from a presigner and a credentials source
    pub fn new(presigner: PostPresigner, credentials: Arc<dyn CredentialsSource>) -> Self {
        Self {
            presigner,
            credentials,
        }
    }

    /// Build an issuer signing with the AWS default credential chain
    pub async fn from_config(config: &UploaderConfig) -> Result<Self, UploadError> {
        let presigner = PostPresigner::new(S3Target::from_config(config));
        let credentials = AwsDefaultChain::load().await?;
        Ok(Self::new(presigner, Arc::new(credentials)))
    }

    /// Presigner in use
    pub fn presigner(&self) -> &PostPresigner {
        &self.presigner
    }

    /// Issue a credential for one upload of the given MIME type
    pub async fn issue(&self, file_type: Option<&str>) -> Result<IssuedUpload, UploadError> {
        let file_type = file_type
            .filter(|t| !t.is_empty())
            .ok_or(UploadError::MissingFileType)?;

        let credentials = self.credentials.credentials().await?;

        let now = Utc::now();
        let file_path = generate_object_key(now, &mut rand::rng());
        let post = self
            .presigner
            .presign(&credentials, &file_path, file_type, now)?;

        Ok(IssuedUpload { post, file_path })
    }

    /// Handle an API Gateway proxy event
    ///
    /// Returns `200` with the presigned form and `filePath`, or `400` with
    /// `{"error": <message>}`.
    #[tracing::instrument(
        name = "upload.presign",
        skip(self, request),
        fields(upload.file_type = Empty, upload.key = Empty, http.status_code = Empty)
    )]
    pub async fn handle(&self, request: &ProxyRequest) -> ProxyResponse {
        tracing::debug!(event = ?request, "Received upload request");

        let file_type = request.query(FILE_TYPE_PARAM);
        if let Some(file_type) = file_type {
            tracing::Span::current().record("upload.file_type", file_type);
        }

        let response = match self.issue(file_type).await {
            Ok(issued) => {
                tracing::Span::current().record("upload.key", issued.file_path.as_str());
                tracing::info!(key = %issued.file_path, "Issued presigned upload");
                #[cfg(feature = "metrics")]
                crate::metrics::record_presign("success");
                ProxyResponse::json(200, &issued).with_cors()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Upload request rejected");
                #[cfg(feature = "metrics")]
                crate::metrics::record_presign("error");
                ProxyResponse::json(400, &json!({ "error": e.to_string() }))
            }
        };

        tracing::Span::current().record("http.status_code", response.status_code);
        response
    }
}
