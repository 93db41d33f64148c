//! Error types for ext-registry.

use serde::Serialize;
use thiserror::Error;

use crate::model::EntityKind;
use crate::validate::ErrorCode;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Error type for registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Input failed a validator. Never persisted.
    #[error("Validation failed: {0}")]
    Validation(ValidationFailure),

    /// Unknown id or name.
    #[error("{kind} not found: {reference}")]
    NotFound {
        kind: EntityKind,
        reference: String,
        /// Optional "did you mean" hint.
        suggestion: Option<String>,
    },

    /// Duplicate name or uri, surfaced before any write.
    #[error("{kind} with {field} `{value}` already exists")]
    Conflict {
        kind: EntityKind,
        field: &'static str,
        value: String,
    },

    /// Invocation declined because the entity or the registry is disabled.
    #[error("{kind} `{name}` is disabled")]
    Disabled { kind: EntityKind, name: String },

    /// Executor failure (http status, transport, function throw or timeout).
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Export document written by a newer format.
    #[error("Unsupported export document version: {0}")]
    UnsupportedVersion(u32),

    /// Configuration could not be loaded.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error.
    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

/// A single validator rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    /// Validation code (e.g. `E003`).
    pub code: ErrorCode,

    /// Field that failed (e.g. `name`, `inputSchema.required`).
    pub field: String,

    /// Human-readable reason.
    pub message: String,
}

/// Failure raised while executing an executor.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
pub struct ExecutionError {
    /// Machine-readable reason.
    pub reason: ExecutionReason,

    /// Human-readable message.
    pub message: String,

    /// Transport failure class, for `reason == transport`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,

    /// HTTP status, for `reason == http_status`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Response body, for `reason == http_status`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Reason codes carried by [`ExecutionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionReason {
    /// Upstream answered with a non-2xx status.
    HttpStatus,
    /// The request never produced a response.
    Transport,
    /// Execution exceeded its time bound.
    Timeout,
    /// The function threw.
    Runtime,
    /// The function source could not be compiled at invocation time.
    Parse,
    /// The caller cancelled the invocation.
    Cancelled,
}

/// Transport failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Timeout,
    Connect,
    Request,
    Body,
}

/// Structured error shape handed to outer callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ExecutionReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// `{success, data?, error?}` envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Response<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl RegistryError {
    /// Build a validation error.
    pub fn validation(code: ErrorCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::Validation(ValidationFailure {
            code,
            field: field.into(),
            message: message.into(),
        })
    }

    /// Build a not-found error without suggestions.
    pub fn not_found(kind: EntityKind, reference: impl Into<String>) -> Self {
        RegistryError::NotFound {
            kind,
            reference: reference.into(),
            suggestion: None,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::Validation(_) => "validation_error",
            RegistryError::NotFound { .. } => "not_found",
            RegistryError::Conflict { .. } => "conflict",
            RegistryError::Disabled { .. } => "disabled",
            RegistryError::Execution(_) => "execution_error",
            RegistryError::UnsupportedVersion(_) => "unsupported_version",
            RegistryError::Config(_) => "config_error",
            RegistryError::Io(_) => "io_error",
            RegistryError::Json(_) => "json_error",
            RegistryError::TomlDe(_) => "toml_error",
            RegistryError::Generic(_) => "error",
        }
    }

    /// Convert into the structured error shape.
    pub fn to_body(&self) -> ErrorBody {
        let (reason, status) = match self {
            RegistryError::Execution(e) => (Some(e.reason), e.status),
            _ => (None, None),
        };

        let mut message = self.to_string();
        if let RegistryError::NotFound {
            suggestion: Some(hint),
            ..
        } = self
        {
            message = format!("{}. {}", message, hint);
        }

        ErrorBody {
            code: self.code(),
            message,
            reason,
            status,
        }
    }
}

impl ExecutionError {
    fn new(reason: ExecutionReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            transport: None,
            status: None,
            body: None,
        }
    }

    /// Non-2xx upstream response.
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            status: Some(status),
            body: Some(body),
            ..Self::new(
                ExecutionReason::HttpStatus,
                format!("HTTP request failed with status {}", status),
            )
        }
    }

    /// The request never produced a response.
    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        Self {
            transport: Some(kind),
            ..Self::new(ExecutionReason::Transport, message)
        }
    }

    /// Execution exceeded its bound.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ExecutionReason::Timeout, message)
    }

    /// The function threw.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ExecutionReason::Runtime, message)
    }

    /// The function could not be compiled.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ExecutionReason::Parse, message)
    }

    /// The caller cancelled the invocation.
    pub fn cancelled() -> Self {
        Self::new(ExecutionReason::Cancelled, "Invocation cancelled")
    }
}

impl<T> Response<T> {
    /// Successful envelope.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed envelope.
    pub fn err(error: &RegistryError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_body()),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl From<anyhow::Error> for RegistryError {
    fn from(err: anyhow::Error) -> Self {
        RegistryError::Generic(err.to_string())
    }
}

impl<T> From<RegistryResult<T>> for Response<T> {
    fn from(result: RegistryResult<T>) -> Self {
        match result {
            Ok(data) => Response::ok(data),
            Err(e) => Response::err(&e),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
