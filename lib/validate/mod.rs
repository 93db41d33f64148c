//! Entity validation: names, input schemas, function sources, executors and prompts.
//!
//! All validators are pure. The registry runs them before every write so an
//! invalid entity is never persisted; clients may also call them directly for
//! live feedback.

mod codes;
mod result;

pub mod validators;

#[cfg(test)]
mod tests;

//--------------------------------------------------------------------------------------------------
// Re-Exports
//--------------------------------------------------------------------------------------------------

pub use codes::{ErrorCode, ValidationCode, WarningCode};
pub use result::{ValidationIssue, ValidationOutcome, ValidationResult};
pub use validators::{
    check_params, is_valid_name, is_valid_param_name, normalize_name, validate_executor,
    validate_function, validate_name, validate_prompt, validate_schema, validate_uri,
};
