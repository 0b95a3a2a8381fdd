//! API Gateway proxy event types
//!
//! Only the fields the upload handler reads are modelled; everything else in
//! the event is ignored on deserialization.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Inbound REST API proxy event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    #[serde(default)]
    pub http_method: Option<String>,

    #[serde(default)]
    pub path: Option<String>,

    /// API Gateway sends `null` when the URL has no query string
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
}

impl ProxyRequest {
    /// Build a request carrying the given query parameters
    pub fn with_query<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            query_string_parameters: Some(
                params
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    /// Non-empty query parameter value
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()
            .and_then(|params| params.get(name))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Outbound proxy response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    pub body: String,

    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl ProxyResponse {
    /// JSON response with a `Content-Type` header
    pub fn json<T: Serialize + ?Sized>(status_code: u16, body: &T) -> Self {
        let body = serde_json::to_string(body).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialize response body");
            String::from("{}")
        });

        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        Self {
            status_code,
            headers,
            body,
            is_base64_encoded: false,
        }
    }

    /// Allow browsers on any origin to read the response
    #[must_use]
    pub fn with_cors(mut self) -> Self {
        self.headers
            .insert("Access-Control-Allow-Origin".to_string(), "*".to_string());
        self.headers.insert(
            "Access-Control-Allow-Credentials".to_string(),
            "true".to_string(),
        );
        self
    }
}
