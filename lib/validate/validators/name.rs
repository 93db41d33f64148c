//! Entity and parameter name validation.

use crate::constants::MAX_NAME_LENGTH;

use super::super::codes::ErrorCode;
use super::super::result::ValidationResult;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Check if a name matches `^[a-z0-9_]+$` within the length bound.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LENGTH
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Check if a schema property or prompt argument name is usable as a parameter.
///
/// Looser than entity names: mixed case and `-` are allowed, but it must start
/// with a letter or underscore.
pub fn is_valid_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= MAX_NAME_LENGTH && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Normalize free-form input into the `[a-z0-9_]` name space.
///
/// Whitespace, `-` and `.` become `_`; other characters are dropped.
pub fn normalize_name(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.trim().chars() {
        match c {
            'a'..='z' | '0'..='9' | '_' => out.push(c),
            'A'..='Z' => out.push(c.to_ascii_lowercase()),
            '-' | '.' => out.push('_'),
            c if c.is_whitespace() => out.push('_'),
            _ => {}
        }
    }
    out.truncate(MAX_NAME_LENGTH);
    out
}

/// Validate a name's syntax and its uniqueness within a collection.
///
/// `existing` yields `(id, name)` pairs of the collection; the entry whose id
/// equals `exclude_id` is ignored so an entity can keep its own name on update.
pub fn validate_name<'a>(
    name: &str,
    existing: impl IntoIterator<Item = (&'a str, &'a str)>,
    exclude_id: Option<&str>,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    if name.is_empty() {
        result.error(
            ErrorCode::EmptyName,
            "empty name",
            "name",
            "name is required",
            Some("use lowercase letters, digits and underscores"),
        );
        return result;
    }

    if name.len() > MAX_NAME_LENGTH {
        result.error(
            ErrorCode::NameTooLong,
            "name too long",
            "name",
            format!(
                "name is {} characters, maximum is {}",
                name.len(),
                MAX_NAME_LENGTH
            ),
            None,
        );
        return result;
    }

    if !is_valid_name(name) {
        result.error(
            ErrorCode::InvalidNameCharacters,
            "invalid name",
            "name",
            format!("`{}` may only contain lowercase letters, digits and underscores", name),
            Some(&format!("try `{}`", normalize_name(name))),
        );
        return result;
    }

    let taken = existing
        .into_iter()
        .any(|(id, other)| other == name && Some(id) != exclude_id);
    if taken {
        result.error(
            ErrorCode::DuplicateName,
            "duplicate name",
            "name",
            format!("name `{}` is already in use", name),
            Some("choose a unique name"),
        );
    }

    result
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
