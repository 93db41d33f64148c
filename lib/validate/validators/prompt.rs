//! Prompt template and argument validation.

use std::collections::HashSet;

use crate::model::PromptArgument;
use crate::template::{Placeholder, extract_placeholders};

use super::super::codes::{ErrorCode, WarningCode};
use super::super::result::ValidationResult;
use super::name::is_valid_param_name;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Validate a prompt template against its declared arguments.
///
/// Placeholders with no declared argument and arguments the template never
/// uses are warnings; they do not block a write.
pub fn validate_prompt(template: &str, arguments: &[PromptArgument]) -> ValidationResult {
    let mut result = ValidationResult::default();

    if template.trim().is_empty() {
        result.error(
            ErrorCode::EmptyTemplate,
            "empty template",
            "template",
            "prompt template is empty",
            None,
        );
    }

    let mut declared = HashSet::new();
    for (i, arg) in arguments.iter().enumerate() {
        let location = format!("arguments[{}].name", i);
        if !is_valid_param_name(&arg.name) {
            result.error(
                ErrorCode::InvalidArgument,
                "invalid argument name",
                location,
                format!("`{}` is not a valid argument name", arg.name),
                Some("start with a letter or underscore; use letters, digits, `_` or `-`"),
            );
        } else if !declared.insert(arg.name.as_str()) {
            result.error(
                ErrorCode::InvalidArgument,
                "duplicate argument",
                location,
                format!("argument `{}` is declared more than once", arg.name),
                None,
            );
        }
    }

    let placeholders = extract_placeholders(template);
    let mut used = HashSet::new();
    for token in &placeholders {
        let Some(root) = Placeholder::parse(token).param_root() else {
            continue;
        };
        used.insert(root.to_string());
        if !declared.contains(root) {
            result.warning(
                WarningCode::UnresolvedPlaceholder,
                "unresolved placeholder",
                "template",
                format!("`{{{{{}}}}}` has no declared argument", token),
            );
        }
    }

    for (i, arg) in arguments.iter().enumerate() {
        if !used.contains(&arg.name) {
            result.warning(
                WarningCode::UnusedArgument,
                "unused argument",
                format!("arguments[{}]", i),
                format!("argument `{}` is never used by the template", arg.name),
            );
        }
    }

    result
}
