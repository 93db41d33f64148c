//! Executor and resource uri validation.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{ContentType, Executor, HttpExecutor, StaticExecutor};

use super::super::codes::ErrorCode;
use super::super::result::ValidationResult;
use super::function::validate_function;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// HTTP methods an `http` executor may use.
pub const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Scheme-qualified uri, e.g. `custom://notes/today`.
static URI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://\S+$").expect("Invalid regex pattern")
});

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Validate an executor descriptor.
pub fn validate_executor(executor: &Executor) -> ValidationResult {
    match executor {
        Executor::Static(s) => validate_static(s),
        Executor::Http(h) => validate_http(h),
        Executor::Function(f) => validate_function(&f.code),
    }
}

fn validate_static(executor: &StaticExecutor) -> ValidationResult {
    let mut result = ValidationResult::default();
    if executor.content_type == ContentType::Json
        && let Err(e) = serde_json::from_str::<serde_json::Value>(&executor.content)
    {
        result.error(
            ErrorCode::InvalidStaticJson,
            "invalid JSON content",
            "executor.content",
            format!("content is declared as json but does not parse: {}", e),
            Some("fix the JSON or set `contentType` to \"text\""),
        );
    }
    result
}

fn validate_http(executor: &HttpExecutor) -> ValidationResult {
    let mut result = ValidationResult::default();

    let method = executor.method.to_ascii_uppercase();
    if !HTTP_METHODS.contains(&method.as_str()) {
        result.error(
            ErrorCode::InvalidHttpMethod,
            "invalid HTTP method",
            "executor.method",
            format!("`{}` is not a supported method", executor.method),
            Some(&format!("use one of {}", HTTP_METHODS.join(", "))),
        );
    }

    let url = executor.url.trim();
    if url.is_empty() {
        result.error(
            ErrorCode::InvalidHttpUrl,
            "missing url",
            "executor.url",
            "url is required",
            None,
        );
    } else if !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with("{{"))
    {
        result.error(
            ErrorCode::InvalidHttpUrl,
            "invalid url",
            "executor.url",
            format!("`{}` must start with http:// or https://", url),
            None,
        );
    }

    result
}

/// Validate a resource uri's syntax and its uniqueness among resources.
///
/// `existing` yields `(id, uri)` pairs; `exclude_id` is ignored as on names.
pub fn validate_uri<'a>(
    uri: &str,
    existing: impl IntoIterator<Item = (&'a str, &'a str)>,
    exclude_id: Option<&str>,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    if !URI_REGEX.is_match(uri) {
        result.error(
            ErrorCode::InvalidUri,
            "invalid uri",
            "uri",
            format!("`{}` is not a scheme-qualified uri", uri),
            Some("use the form `scheme://path`, e.g. `custom://notes`"),
        );
        return result;
    }

    let taken = existing
        .into_iter()
        .any(|(id, other)| other == uri && Some(id) != exclude_id);
    if taken {
        result.error(
            ErrorCode::DuplicateUri,
            "duplicate uri",
            "uri",
            format!("uri `{}` is already in use", uri),
            None,
        );
    }

    result
}
