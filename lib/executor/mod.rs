//! Executor engine: resolves placeholders and runs static, http and function executors.
//!
//! The engine never touches the store. Callers hand it a snapshot of the
//! executor descriptor, so no registry lock is held while a call is in flight.

mod http;
mod prompt;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::RegistryConfig;
use crate::context::InvocationContext;
use crate::error::ExecutionError;
use crate::model::{ContentType, Executor};
use crate::sandbox::{Sandbox, SandboxLimits};
use crate::secrets::{EnvSecretStore, SecretStore};

//--------------------------------------------------------------------------------------------------
// Re-Exports
//--------------------------------------------------------------------------------------------------

pub use prompt::render_prompt;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Per-invocation options.
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// Override the configured HTTP timeout.
    pub http_timeout: Option<Duration>,

    /// Cancels the in-flight call when triggered.
    pub cancel: CancellationToken,
}

/// Result of a successful invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationOutput {
    pub content: Value,

    pub content_type: ContentType,

    /// Set for resource reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Runs executor descriptors.
#[derive(Clone)]
pub struct Engine {
    client: reqwest::Client,
    http_timeout: Duration,
    sandbox: Sandbox,
    secrets: Arc<dyn SecretStore>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Engine {
    /// Create an engine with explicit limits and secret store.
    pub fn new(
        http_timeout: Duration,
        limits: SandboxLimits,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        let client = reqwest::Client::new();
        Self {
            sandbox: Sandbox::new(limits, client.clone()),
            client,
            http_timeout,
            secrets,
        }
    }

    /// Create an engine from configuration, reading secrets from the environment.
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(
            config.http_timeout(),
            config.sandbox_limits(),
            Arc::new(EnvSecretStore::new()),
        )
    }

    /// Replace the secret store.
    pub fn with_secrets(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.secrets = secrets;
        self
    }

    /// Execute a descriptor.
    ///
    /// `static` content is returned as authored. `http` and `function`
    /// executors see `params` and `context`; only `http` sees secrets.
    pub async fn execute(
        &self,
        executor: &Executor,
        params: &Value,
        context: &InvocationContext,
        options: &InvokeOptions,
    ) -> Result<InvocationOutput, ExecutionError> {
        match executor {
            Executor::Static(s) => Ok(InvocationOutput {
                content: Value::String(s.content.clone()),
                content_type: s.content_type,
                mime_type: None,
            }),
            Executor::Http(h) => {
                let timeout = options.http_timeout.unwrap_or(self.http_timeout);
                http::execute(
                    &self.client,
                    h,
                    params,
                    context,
                    self.secrets.as_ref(),
                    timeout,
                    &options.cancel,
                )
                .await
            }
            Executor::Function(f) => {
                let content = self
                    .sandbox
                    .run(&f.code, params, &context.to_value(), options.cancel.clone())
                    .await?;
                let content_type = if content.is_string() {
                    ContentType::Text
                } else {
                    ContentType::Json
                };
                Ok(InvocationOutput {
                    content,
                    content_type,
                    mime_type: None,
                })
            }
        }
    }
}

impl InvocationOutput {
    /// Plain text output.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Value::String(content.into()),
            content_type: ContentType::Text,
            mime_type: None,
        }
    }

    /// The content rendered as text; JSON values are pretty-printed.
    pub fn to_text(&self) -> String {
        match &self.content {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("http_timeout", &self.http_timeout)
            .field("sandbox", &self.sandbox.limits())
            .finish_non_exhaustive()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
