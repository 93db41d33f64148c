//! Invocation context: session and per-request metadata.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Caller and workspace context, read-only for executors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_root: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_type: Option<String>,
}

/// Metadata generated fresh for every invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMeta {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
}

/// Everything an executor may read besides params and secrets.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub session: SessionContext,
    pub request: RequestMeta,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl SessionContext {
    /// Look up a session field by its camelCase or snake_case name.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "workspaceId" | "workspace_id" => self.workspace_id.as_deref(),
            "projectRoot" | "project_root" => self.project_root.as_deref(),
            "clientType" | "client_type" => self.client_type.as_deref(),
            _ => None,
        }
    }

    /// Fill unset fields from `defaults`.
    pub fn or(self, defaults: &SessionContext) -> Self {
        Self {
            workspace_id: self.workspace_id.or_else(|| defaults.workspace_id.clone()),
            project_root: self.project_root.or_else(|| defaults.project_root.clone()),
            client_type: self.client_type.or_else(|| defaults.client_type.clone()),
        }
    }
}

impl RequestMeta {
    /// Generate metadata for a new request.
    pub fn generate() -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Look up a request field by its camelCase or snake_case name.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "timestamp" => Some(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
            "requestId" | "request_id" => Some(self.request_id.clone()),
            _ => None,
        }
    }
}

impl InvocationContext {
    /// Create a context for a new invocation in `session`.
    pub fn new(session: SessionContext) -> Self {
        Self {
            session,
            request: RequestMeta::generate(),
        }
    }

    /// The `{session, request}` object handed to function executors.
    pub fn to_value(&self) -> Value {
        json!({
            "session": self.session,
            "request": self.request,
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new(SessionContext::default())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
