//! MCP server exposing the registry's enabled tools, prompts and resources.
//!
//! Clients see only enabled entities, and nothing at all while the registry
//! is disabled.

use std::future::Future;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::service::{RequestContext, RoleServer};
use rmcp::transport::StreamableHttpServerConfig;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::tower::StreamableHttpService;
use rmcp::{ErrorData as McpError, ServerHandler, serve_server};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::executor::{InvocationOutput, InvokeOptions};
use crate::model::{self, EntityKind};
use crate::store::Registry;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Transport the server listens on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServeTransport {
    /// Standard input/output.
    #[default]
    Stdio,
    /// Streamable HTTP at `/mcp`.
    Http,
}

/// MCP handler backed by a shared registry.
#[derive(Clone)]
pub struct RegistryServer {
    registry: Arc<Registry>,
    info: ServerInfo,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl RegistryServer {
    pub fn new(registry: Arc<Registry>) -> Self {
        let mut info = ServerInfo::default();
        info.server_info.name = env!("CARGO_PKG_NAME").to_string();
        info.server_info.version = env!("CARGO_PKG_VERSION").to_string();
        info.capabilities = ServerCapabilities {
            tools: Some(ToolsCapability::default()),
            prompts: Some(PromptsCapability::default()),
            resources: Some(ResourcesCapability::default()),
            ..Default::default()
        };
        Self { registry, info }
    }

    /// Descriptors of enabled tools.
    pub async fn tools(&self) -> Result<Vec<Tool>, McpError> {
        if !self.registry.is_enabled() {
            return Ok(Vec::new());
        }
        self.registry
            .list::<model::Tool>()
            .await
            .iter()
            .filter(|tool| tool.enabled)
            .map(|tool| {
                convert(json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema,
                }))
            })
            .collect()
    }

    /// Descriptors of enabled prompts.
    pub async fn prompts(&self) -> Result<Vec<Prompt>, McpError> {
        if !self.registry.is_enabled() {
            return Ok(Vec::new());
        }
        self.registry
            .list::<model::Prompt>()
            .await
            .iter()
            .filter(|prompt| prompt.enabled)
            .map(|prompt| {
                convert(json!({
                    "name": prompt.name,
                    "description": prompt.description,
                    "arguments": prompt.arguments,
                }))
            })
            .collect()
    }

    /// Descriptors of enabled resources.
    pub async fn resources(&self) -> Result<Vec<Resource>, McpError> {
        if !self.registry.is_enabled() {
            return Ok(Vec::new());
        }
        self.registry
            .list::<model::Resource>()
            .await
            .iter()
            .filter(|resource| resource.enabled)
            .map(|resource| {
                convert(json!({
                    "uri": resource.uri,
                    "name": resource.name,
                    "description": resource.description,
                    "mimeType": resource.mime_type,
                }))
            })
            .collect()
    }

    /// Invoke a tool. Execution failures are tool results flagged as errors.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
        cancel: CancellationToken,
    ) -> Result<CallToolResult, McpError> {
        let params = arguments.map(Value::Object).unwrap_or(Value::Null);
        match self
            .registry
            .invoke(EntityKind::Tool, name, params, None, &options(cancel))
            .await
        {
            Ok(output) => Ok(CallToolResult::success(vec![Content::text(output.to_text())])),
            Err(RegistryError::Execution(e)) => {
                tracing::debug!(tool = name, reason = ?e.reason, "tool execution failed");
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
            Err(e) => Err(to_mcp_error(&e)),
        }
    }

    /// Render a prompt as a single user message.
    pub async fn prompt(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<GetPromptResult, McpError> {
        let args = arguments.map(Value::Object).unwrap_or(Value::Null);
        let prompt = self
            .registry
            .find::<model::Prompt>(name)
            .await
            .map_err(|e| to_mcp_error(&e))?;
        let output = self
            .registry
            .invoke(EntityKind::Prompt, &prompt.id, args, None, &InvokeOptions::default())
            .await
            .map_err(|e| to_mcp_error(&e))?;

        convert(json!({
            "description": prompt.description,
            "messages": [{
                "role": "user",
                "content": { "type": "text", "text": output.to_text() }
            }]
        }))
    }

    /// Read a resource by uri.
    pub async fn read(&self, uri: &str, cancel: CancellationToken) -> Result<ReadResourceResult, McpError> {
        let output = self
            .registry
            .invoke(EntityKind::Resource, uri, Value::Null, None, &options(cancel))
            .await
            .map_err(|e| to_mcp_error(&e))?;

        convert(json!({ "contents": [resource_contents(uri, &output)] }))
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[allow(clippy::manual_async_fn)]
impl ServerHandler for RegistryServer {
    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move { convert(json!({ "tools": self.tools().await? })) }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move { self.call(&request.name, request.arguments, context.ct).await }
    }

    fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListPromptsResult, McpError>> + Send + '_ {
        async move { convert(json!({ "prompts": self.prompts().await? })) }
    }

    fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<GetPromptResult, McpError>> + Send + '_ {
        async move { self.prompt(&request.name, request.arguments).await }
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        async move { convert(json!({ "resources": self.resources().await? })) }
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move { self.read(&request.uri, context.ct).await }
    }

    fn get_info(&self) -> ServerInfo {
        self.info.clone()
    }
}

impl std::str::FromStr for ServeTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdio" => Ok(ServeTransport::Stdio),
            "http" => Ok(ServeTransport::Http),
            _ => Err(format!("Unknown transport: '{}'. Use 'stdio' or 'http'.", s)),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Serve the registry until the client disconnects or Ctrl+C.
pub async fn serve(
    registry: Arc<Registry>,
    transport: ServeTransport,
    config: &ServerConfig,
) -> RegistryResult<()> {
    let server = RegistryServer::new(registry);
    match transport {
        ServeTransport::Stdio => serve_stdio(server).await,
        ServeTransport::Http => serve_http(server, config).await,
    }
}

async fn serve_stdio(server: RegistryServer) -> RegistryResult<()> {
    use tokio::io::{stdin, stdout};

    tracing::info!("starting stdio MCP server");
    let running = serve_server(server, (stdin(), stdout()))
        .await
        .map_err(|e| RegistryError::Generic(format!("Failed to start stdio server: {}", e)))?;

    running
        .waiting()
        .await
        .map_err(|e| RegistryError::Generic(format!("Server error: {}", e)))?;

    Ok(())
}

async fn serve_http(server: RegistryServer, config: &ServerConfig) -> RegistryResult<()> {
    let ct = CancellationToken::new();

    let service: StreamableHttpService<RegistryServer, LocalSessionManager> =
        StreamableHttpService::new(
            move || Ok(server.clone()),
            Default::default(),
            StreamableHttpServerConfig {
                stateful_mode: true,
                sse_keep_alive: None,
                cancellation_token: ct.child_token(),
            },
        );

    let router = axum::Router::new().nest_service("/mcp", service);

    let bind_addr = format!("{}:{}", config.host, config.port);
    let tcp_listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| RegistryError::Generic(format!("Failed to bind to {}: {}", bind_addr, e)))?;

    tracing::info!(address = %bind_addr, "streamable HTTP MCP server listening");
    eprintln!("MCP server listening on http://{}/mcp", bind_addr);
    eprintln!("Press Ctrl+C to stop");

    let shutdown = {
        let ct = ct.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Signal error: {}", e);
            }
            eprintln!("\nShutting down...");
            ct.cancel();
        }
    };

    run_http(tcp_listener, router, ct, shutdown).await
}

/// Serve `router` until `shutdown` completes or the server itself fails.
async fn run_http(
    listener: tokio::net::TcpListener,
    router: axum::Router,
    ct: CancellationToken,
    shutdown: impl Future<Output = ()>,
) -> RegistryResult<()> {
    let mut server_handle = tokio::spawn({
        let ct = ct.clone();
        async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { ct.cancelled_owned().await })
                .await
        }
    });

    let outcome = tokio::select! {
        joined = &mut server_handle => Some(joined),
        _ = shutdown => None,
    };
    let joined = match outcome {
        Some(joined) => joined,
        None => {
            ct.cancel();
            server_handle.await
        }
    };

    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            tracing::error!("HTTP server error: {}", e);
            Err(RegistryError::Generic(format!("HTTP server error: {}", e)))
        }
        Err(e) => {
            tracing::error!("HTTP server task failed: {}", e);
            Err(RegistryError::Generic(format!("HTTP server task failed: {}", e)))
        }
    }
}

fn options(cancel: CancellationToken) -> InvokeOptions {
    InvokeOptions {
        http_timeout: None,
        cancel,
    }
}

fn resource_contents(uri: &str, output: &InvocationOutput) -> Value {
    json!({
        "uri": uri,
        "mimeType": output.mime_type,
        "text": output.to_text(),
    })
}

/// Build an rmcp model value from its wire JSON.
fn convert<T: DeserializeOwned>(value: Value) -> Result<T, McpError> {
    serde_json::from_value(value)
        .map_err(|e| McpError::internal_error(format!("Failed to build MCP response: {}", e), None))
}

/// Map a registry error onto an MCP protocol error.
fn to_mcp_error(err: &RegistryError) -> McpError {
    let data = serde_json::to_value(err.to_body()).ok();
    let message = err.to_body().message;
    match err {
        RegistryError::Validation(_)
        | RegistryError::NotFound { .. }
        | RegistryError::Disabled { .. } => McpError::invalid_params(message, data),
        _ => McpError::internal_error(message, data),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::model::{ResourceDraft, ToolDraft};

    async fn server() -> (Arc<Registry>, RegistryServer) {
        let registry = Arc::new(Registry::in_memory(&RegistryConfig::default()));
        registry
            .create::<model::Tool>(
                serde_json::from_value::<ToolDraft>(json!({
                    "name": "greet",
                    "description": "Say hello",
                    "inputSchema": {
                        "type": "object",
                        "properties": { "who": { "type": "string" } },
                        "required": ["who"]
                    },
                    "executor": { "type": "function", "code": "(p) => `hello ${p.who}`" }
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        let hidden = registry
            .create::<model::Tool>(
                serde_json::from_value::<ToolDraft>(json!({
                    "name": "hidden",
                    "executor": { "type": "static", "content": "x" }
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        registry.toggle::<model::Tool>(&hidden.id).await.unwrap();
        registry
            .create::<model::Tool>(
                serde_json::from_value::<ToolDraft>(json!({
                    "name": "fail",
                    "executor": { "type": "function", "code": "() => { throw new Error('nope') }" }
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        registry
            .create::<model::Resource>(
                serde_json::from_value::<ResourceDraft>(json!({
                    "name": "config",
                    "uri": "app://config",
                    "mimeType": "application/json",
                    "executor": { "type": "static", "content": "{\"debug\":true}", "contentType": "json" }
                }))
                .unwrap(),
            )
            .await
            .unwrap();

        let server = RegistryServer::new(registry.clone());
        (registry, server)
    }

    #[tokio::test]
    async fn test_lists_enabled_only() {
        let (registry, server) = server().await;

        let tools = server.tools().await.unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names, vec!["greet", "fail"]);

        let resources = server.resources().await.unwrap();
        assert_eq!(resources.len(), 1);

        registry.disable().await.unwrap();
        assert!(server.tools().await.unwrap().is_empty());
        assert!(server.resources().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_call_tool() {
        let (_, server) = server().await;
        let args = json!({ "who": "ada" }).as_object().cloned();

        let result = server.call("greet", args, CancellationToken::new()).await.unwrap();
        assert_ne!(result.is_error, Some(true));
        let text = serde_json::to_value(&result.content).unwrap();
        assert_eq!(text[0]["text"], "hello ada");
    }

    #[tokio::test]
    async fn test_execution_failure_is_error_result() {
        let (_, server) = server().await;
        let result = server.call("fail", None, CancellationToken::new()).await.unwrap();
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_unknown_and_disabled_are_protocol_errors() {
        let (_, server) = server().await;
        assert!(server.call("missing", None, CancellationToken::new()).await.is_err());
        assert!(server.call("hidden", None, CancellationToken::new()).await.is_err());
        assert!(server.call("greet", None, CancellationToken::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_read_resource() {
        let (_, server) = server().await;
        let result = server.read("app://config", CancellationToken::new()).await.unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["contents"][0]["uri"], "app://config");
        assert_eq!(json["contents"][0]["mimeType"], "application/json");
        assert_eq!(json["contents"][0]["text"], "{\"debug\":true}");
    }

    #[test]
    fn test_transport_parse() {
        assert_eq!("HTTP".parse::<ServeTransport>().unwrap(), ServeTransport::Http);
        assert!("ws".parse::<ServeTransport>().is_err());
    }

    #[tokio::test]
    async fn test_http_serves_until_shutdown() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = axum::Router::new().route("/ping", axum::routing::get(|| async { "pong" }));
        let ct = CancellationToken::new();

        let shutdown = async move {
            let body = reqwest::get(format!("http://{}/ping", addr))
                .await
                .unwrap()
                .text()
                .await
                .unwrap();
            assert_eq!(body, "pong");
        };

        run_http(listener, router, ct.clone(), shutdown).await.unwrap();
        assert!(ct.is_cancelled());
    }
}
