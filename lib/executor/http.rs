//! `http` executor.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::context::InvocationContext;
use crate::error::{ExecutionError, TransportKind};
use crate::model::{ContentType, HttpExecutor};
use crate::secrets::SecretStore;
use crate::template::{Scope, Substitution};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A request after placeholder substitution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Resolve and send an `http` executor request.
///
/// Non-2xx responses become `http_status` errors carrying status and body.
/// Nothing is retried.
pub(super) async fn execute(
    client: &reqwest::Client,
    executor: &HttpExecutor,
    params: &Value,
    context: &InvocationContext,
    secrets: &dyn SecretStore,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<super::InvocationOutput, ExecutionError> {
    let scope = Scope::new(params, context).with_secrets(secrets);
    let request = resolve(executor, &scope);

    tracing::debug!(
        method = %request.method,
        url = %request.url,
        request_id = %context.request.request_id,
        "sending http executor request"
    );

    let method = reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|_| {
        ExecutionError::transport(
            TransportKind::Request,
            format!("invalid HTTP method `{}`", request.method),
        )
    })?;

    let mut headers = HeaderMap::new();
    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ExecutionError::transport(TransportKind::Request, format!("invalid header `{}`: {}", name, e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ExecutionError::transport(TransportKind::Request, format!("invalid value for header `{}`: {}", name, e))
        })?;
        headers.insert(name, value);
    }

    let mut builder = client
        .request(method, &request.url)
        .headers(headers)
        .timeout(timeout);
    if let Some(body) = request.body {
        builder = builder.body(body);
    }

    let exchange = async {
        let response = builder.send().await.map_err(map_transport)?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("json"));
        let text = response.text().await.map_err(map_transport)?;

        if !status.is_success() {
            return Err(ExecutionError::http_status(status.as_u16(), text));
        }

        let output = match serde_json::from_str::<Value>(&text) {
            Ok(json) if is_json => super::InvocationOutput {
                content: json,
                content_type: ContentType::Json,
                mime_type: None,
            },
            _ => super::InvocationOutput::text(text),
        };
        Ok(output)
    };

    tokio::select! {
        _ = cancel.cancelled() => Err(ExecutionError::cancelled()),
        result = exchange => result,
    }
}

/// Substitute placeholders in url, header values and body.
pub(crate) fn resolve(executor: &HttpExecutor, scope: &Scope<'_>) -> ResolvedRequest {
    let mut unresolved = Vec::new();
    let mut take = |sub: Substitution| {
        unresolved.extend(sub.unresolved);
        sub.output
    };

    let url = take(scope.substitute(executor.url.trim()));
    let mut headers: Vec<(String, String)> = executor
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), take(scope.substitute(value))))
        .collect();
    let body = executor.body.as_deref().map(|body| take(substitute_body(body, scope)));

    if let Some(body) = &body
        && looks_like_json(body)
        && !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("content-type"))
    {
        headers.push(("content-type".into(), "application/json".into()));
    }

    for token in &unresolved {
        tracing::warn!(placeholder = %token, url = %executor.url, "unresolved placeholder left literal");
    }

    ResolvedRequest {
        method: executor.method.trim().to_ascii_uppercase(),
        url,
        headers,
        body,
    }
}

/// Substitute placeholders in a request body.
///
/// When the body is a JSON document, a string that is exactly one placeholder
/// is replaced by the parameter's JSON value and other strings are
/// substituted in place, so values are escaped correctly. Any other body is
/// substituted as text.
fn substitute_body(body: &str, scope: &Scope<'_>) -> Substitution {
    let Ok(mut doc) = serde_json::from_str::<Value>(body) else {
        return scope.substitute(body);
    };

    let mut unresolved = Vec::new();
    substitute_json(&mut doc, scope, &mut unresolved);
    Substitution {
        output: doc.to_string(),
        unresolved,
    }
}

fn substitute_json(value: &mut Value, scope: &Scope<'_>, unresolved: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            if let Some(token) = whole_placeholder(s)
                && let Some(raw) = scope.resolve_value(token)
            {
                *value = raw;
                return;
            }
            let sub = scope.substitute(s);
            unresolved.extend(sub.unresolved);
            *s = sub.output;
        }
        Value::Array(items) => {
            for item in items {
                substitute_json(item, scope, unresolved);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute_json(item, scope, unresolved);
            }
        }
        _ => {}
    }
}

/// The inner token if `s` is exactly one `{{...}}` placeholder.
fn whole_placeholder(s: &str) -> Option<&str> {
    let inner = s.trim().strip_prefix("{{")?.strip_suffix("}}")?.trim();
    (!inner.is_empty() && !inner.contains("{{") && !inner.contains("}}")).then_some(inner)
}

fn looks_like_json(body: &str) -> bool {
    let body = body.trim_start();
    (body.starts_with('{') || body.starts_with('[')) && serde_json::from_str::<Value>(body).is_ok()
}

fn map_transport(err: reqwest::Error) -> ExecutionError {
    let kind = if err.is_timeout() {
        TransportKind::Timeout
    } else if err.is_connect() {
        TransportKind::Connect
    } else if err.is_body() || err.is_decode() {
        TransportKind::Body
    } else {
        TransportKind::Request
    };
    ExecutionError::transport(kind, format!("HTTP request failed: {}", err))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
