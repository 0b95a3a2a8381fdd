//! Authorization decision returned to API Gateway
//!
//! Serializes to the shape API Gateway expects from a custom authorizer:
//!
//! ```json
//! {
//!   "principalId": "user-123",
//!   "policyDocument": {
//!     "Version": "2012-10-17",
//!     "Statement": [
//!       {"Action": "execute-api:Invoke", "Effect": "Allow", "Resource": "arn:..."}
//!     ]
//!   },
//!   "context": {"scope": "..."}
//! }
//! ```

use serde::{Deserialize, Serialize};

/// IAM policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

/// Action granted or denied on the API resource
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// Single policy statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub action: String,
    pub effect: Effect,
    pub resource: String,
}

/// Policy document with exactly one statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    /// Build a document that applies `effect` to invoking `resource`
    pub fn for_resource(effect: Effect, resource: &str) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![Statement {
                action: INVOKE_ACTION.to_string(),
                effect,
                resource: resource.to_string(),
            }],
        }
    }
}

/// Context forwarded to the integration.
///
/// `scope` is the token's `scope` claim passed through untouched. Tokens
/// without one (ID tokens) get an empty context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<serde_json::Value>,
}

/// Authorizer output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDecision {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
    pub context: DecisionContext,
}

impl AuthorizationDecision {
    /// Create a decision for `principal_id` on `resource`
    pub fn new(
        principal_id: impl Into<String>,
        effect: Effect,
        resource: &str,
        scope: Option<serde_json::Value>,
    ) -> Self {
        Self {
            principal_id: principal_id.into(),
            policy_document: PolicyDocument::for_resource(effect, resource),
            context: DecisionContext { scope },
        }
    }

    /// Create an allow decision
    pub fn allow(
        principal_id: impl Into<String>,
        resource: &str,
        scope: Option<serde_json::Value>,
    ) -> Self {
        Self::new(principal_id, Effect::Allow, resource, scope)
    }

    /// Create a deny decision
    pub fn deny(principal_id: impl Into<String>, resource: &str) -> Self {
        Self::new(principal_id, Effect::Deny, resource, None)
    }

    /// Effect of the single statement
    pub fn effect(&self) -> Effect {
        self.policy_document
            .statement
            .first()
            .map(|s| s.effect)
            .unwrap_or(Effect::Deny)
    }
}
