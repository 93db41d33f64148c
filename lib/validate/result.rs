//! Validation result types.

use serde::Serialize;

use super::codes::{ErrorCode, ValidationCode, WarningCode};
use crate::error::ValidationFailure;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Validation result with categorized issues.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ValidationResult {
    /// Validation errors (always block the write).
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

/// A validation issue (error or warning).
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    /// Error/warning code.
    pub code: ValidationCode,

    /// Short description (e.g., "invalid name").
    pub message: String,

    /// Field path (e.g., "name", "inputSchema.required[0]").
    pub location: String,

    /// Detailed explanation.
    pub details: String,

    /// Optional help suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// `{valid, error?}` shape for live UI feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ValidationResult {
    /// Returns true if there are no errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns true if there are no errors or warnings.
    pub fn is_strict_valid(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Record an error.
    pub fn error(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        location: impl Into<String>,
        details: impl Into<String>,
        help: Option<&str>,
    ) {
        self.errors.push(ValidationIssue {
            code: code.into(),
            message: message.into(),
            location: location.into(),
            details: details.into(),
            help: help.map(Into::into),
        });
    }

    /// Record a warning.
    pub fn warning(
        &mut self,
        code: WarningCode,
        message: impl Into<String>,
        location: impl Into<String>,
        details: impl Into<String>,
    ) {
        self.warnings.push(ValidationIssue {
            code: code.into(),
            message: message.into(),
            location: location.into(),
            details: details.into(),
            help: None,
        });
    }

    /// Append all issues from another result.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// The first error as a [`ValidationFailure`], if any.
    pub fn first_failure(&self) -> Option<ValidationFailure> {
        self.errors.iter().find_map(|issue| match issue.code {
            ValidationCode::Error(code) => Some(ValidationFailure {
                code,
                field: issue.location.clone(),
                message: issue.details.clone(),
            }),
            ValidationCode::Warning(_) => None,
        })
    }

    /// Check whether any error carries `code`.
    pub fn has_error(&self, code: ErrorCode) -> bool {
        self.errors
            .iter()
            .any(|issue| issue.code == ValidationCode::Error(code))
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<&ValidationResult> for ValidationOutcome {
    fn from(result: &ValidationResult) -> Self {
        Self {
            valid: result.is_valid(),
            error: result.errors.first().map(|issue| issue.details.clone()),
            warnings: result.warnings.iter().map(|w| w.details.clone()).collect(),
        }
    }
}

impl From<ValidationResult> for ValidationOutcome {
    fn from(result: ValidationResult) -> Self {
        ValidationOutcome::from(&result)
    }
}
