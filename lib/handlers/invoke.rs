//! Invoke command handler.

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use tokio_util::sync::CancellationToken;

use super::common::{open_registry, parse_params, print_json};
use crate::context::SessionContext;
use crate::error::RegistryResult;
use crate::executor::{InvocationOutput, InvokeOptions};
use crate::format::highlight_json;
use crate::model::{ContentType, EntityKind};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Invoke a tool, render a prompt or read a resource.
///
/// Ctrl+C cancels the in-flight invocation.
#[allow(clippy::too_many_arguments)]
pub async fn entity_invoke(
    config: Option<&Path>,
    kind: EntityKind,
    reference: &str,
    param: &[String],
    args: Option<&str>,
    timeout: Option<u64>,
    workspace: Option<String>,
    json: bool,
) -> RegistryResult<()> {
    let params = parse_params(param, args)?;
    let (_, registry) = open_registry(config)?;

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let options = InvokeOptions {
        http_timeout: timeout.map(Duration::from_secs),
        cancel,
    };
    let session = workspace.map(|workspace_id| SessionContext {
        workspace_id: Some(workspace_id),
        ..Default::default()
    });

    let result = registry
        .invoke(kind, reference, params, session, &options)
        .await;
    interrupt.abort();
    let output = result?;

    if json {
        return print_json(output);
    }

    print_output(kind, reference, &output);
    Ok(())
}

fn print_output(kind: EntityKind, reference: &str, output: &InvocationOutput) {
    let verb = match kind {
        EntityKind::Tool => "Invoked",
        EntityKind::Prompt => "Rendered",
        EntityKind::Resource => "Read",
    };
    let mut header = format!("  {} {} {}", "✓".bright_green(), verb, reference.bold());
    if let Some(mime) = &output.mime_type {
        header.push_str(&format!(" {}", format!("({})", mime).dimmed()));
    }
    println!("{}\n", header);

    let body = match (&output.content, output.content_type) {
        (serde_json::Value::String(s), ContentType::Json) => serde_json::from_str(s)
            .map(|value| highlight_json(&value))
            .unwrap_or_else(|_| s.clone()),
        (serde_json::Value::String(s), ContentType::Text) => s.clone(),
        (value, _) => highlight_json(value),
    };
    for line in body.lines() {
        println!("    {}", line);
    }
}
