//! Invocation parameter checks against a tool's input schema.

use jsonschema::JSONSchema;
use serde_json::Value;

use super::super::codes::ErrorCode;
use super::super::result::ValidationResult;
use super::schema::{pointer_location, schema_type_name};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Check invocation params against an input schema.
///
/// The schema is compiled with `jsonschema` and every keyword applies,
/// including nested `required`, `minimum`, `enum` and `items`. `null` params
/// are treated as `{}`.
pub fn check_params(schema: &Value, params: &Value) -> ValidationResult {
    let mut result = ValidationResult::default();

    let empty = Value::Object(Default::default());
    let params = if params.is_null() { &empty } else { params };

    if !params.is_object() {
        result.error(
            ErrorCode::InvalidParams,
            "invalid params",
            "params",
            format!("params must be an object, got {}", schema_type_name(params)),
            None,
        );
        return result;
    }

    let compiled = match JSONSchema::compile(schema) {
        Ok(compiled) => compiled,
        Err(e) => {
            result.error(
                ErrorCode::InvalidParams,
                "unusable input schema",
                "inputSchema",
                format!("input schema does not compile: {}", e),
                None,
            );
            return result;
        }
    };

    if let Err(errors) = compiled.validate(params) {
        for error in errors {
            result.error(
                ErrorCode::InvalidParams,
                "invalid parameter",
                pointer_location("params", &error.instance_path.to_string()),
                error.to_string(),
                None,
            );
        }
    }

    result
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
