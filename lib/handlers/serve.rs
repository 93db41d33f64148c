//! Serve command handler.

use std::path::Path;
use std::sync::Arc;

use super::common::open_registry;
use crate::error::RegistryResult;
use crate::server::{ServeTransport, serve};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Serve the registry over MCP. Flags override the `[server]` config section.
pub async fn registry_serve(
    config: Option<&Path>,
    transport: ServeTransport,
    host: Option<String>,
    port: Option<u16>,
) -> RegistryResult<()> {
    let (mut config, registry) = open_registry(config)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    serve(Arc::new(registry), transport, &config.server).await
}
