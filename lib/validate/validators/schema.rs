//! Input schema validation.

use jsonschema::JSONSchema;
use serde_json::{Map, Value};

use super::super::codes::ErrorCode;
use super::super::result::ValidationResult;
use super::name::is_valid_param_name;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Validate a tool input schema.
///
/// The root must be an object schema with `type: "object"`. `properties` keys
/// must be valid parameter names, `required` may only name declared
/// properties, and `$ref` is rejected anywhere in the tree. A schema passing
/// those checks must also be well-formed against the JSON Schema meta-schema,
/// nested property schemas included.
pub fn validate_schema(schema: &Value) -> ValidationResult {
    let mut result = ValidationResult::default();

    let Some(obj) = schema.as_object() else {
        result.error(
            ErrorCode::SchemaNotObject,
            "invalid inputSchema",
            "inputSchema",
            format!(
                "`inputSchema` must be a JSON Schema object, got {}",
                schema_type_name(schema)
            ),
            Some("use a valid JSON Schema object with `type`, `properties`, etc."),
        );
        return result;
    };

    match obj.get("type") {
        Some(Value::String(t)) if t == "object" => {}
        other => {
            let found = match other {
                Some(Value::String(t)) => format!("`{}`", t),
                Some(v) => schema_type_name(v).to_string(),
                None => "nothing".to_string(),
            };
            result.error(
                ErrorCode::SchemaRootType,
                "invalid inputSchema type",
                "inputSchema.type",
                format!("root `type` must be \"object\", found {}", found),
                Some("set `\"type\": \"object\"`"),
            );
        }
    }

    find_refs(schema, "inputSchema", &mut result);

    let declared = match obj.get("properties") {
        None => Map::new(),
        Some(Value::Object(props)) => {
            for (key, prop) in props {
                if !is_valid_param_name(key) {
                    result.error(
                        ErrorCode::InvalidPropertyName,
                        "invalid property name",
                        format!("inputSchema.properties.{}", key),
                        format!("`{}` is not a valid parameter name", key),
                        Some("start with a letter or underscore; use letters, digits, `_` or `-`"),
                    );
                }
                if !prop.is_object() && !prop.is_boolean() {
                    result.error(
                        ErrorCode::InvalidProperties,
                        "invalid property schema",
                        format!("inputSchema.properties.{}", key),
                        format!(
                            "property `{}` must be a schema object, got {}",
                            key,
                            schema_type_name(prop)
                        ),
                        None,
                    );
                }
            }
            props.clone()
        }
        Some(other) => {
            result.error(
                ErrorCode::InvalidProperties,
                "invalid inputSchema properties",
                "inputSchema.properties",
                format!("`properties` must be an object, got {}", schema_type_name(other)),
                Some("define properties as key-value pairs of property schemas"),
            );
            Map::new()
        }
    };

    match obj.get("required") {
        None => {}
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                let location = format!("inputSchema.required[{}]", i);
                match item.as_str() {
                    Some(name) if declared.contains_key(name) => {}
                    Some(name) => result.error(
                        ErrorCode::UndeclaredRequired,
                        "undeclared required property",
                        location,
                        format!("`{}` is required but not declared in `properties`", name),
                        Some("declare the property or remove it from `required`"),
                    ),
                    None => result.error(
                        ErrorCode::InvalidRequired,
                        "invalid inputSchema required",
                        location,
                        "`required` entries must be strings",
                        None,
                    ),
                }
            }
        }
        Some(_) => result.error(
            ErrorCode::InvalidRequired,
            "invalid inputSchema required",
            "inputSchema.required",
            "`required` must be an array of property names",
            Some("use an array of strings, e.g., [\"param1\", \"param2\"]"),
        ),
    }

    if result.is_valid()
        && let Err(e) = JSONSchema::compile(schema)
    {
        result.error(
            ErrorCode::MalformedSchema,
            "malformed inputSchema",
            pointer_location("inputSchema", &e.instance_path.to_string()),
            format!("`inputSchema` is not a valid JSON Schema: {}", e),
            None,
        );
    }

    result
}

/// Turn a JSON pointer (`/a/0/b`) into a dotted location under `root`.
pub(crate) fn pointer_location(root: &str, pointer: &str) -> String {
    pointer
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(root.to_string(), |mut path, segment| {
            path.push('.');
            path.push_str(&segment.replace("~1", "/").replace("~0", "~"));
            path
        })
}

/// Reject `$ref` anywhere in the schema tree.
fn find_refs(value: &Value, path: &str, result: &mut ValidationResult) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = format!("{}.{}", path, key);
                if key == "$ref" {
                    result.error(
                        ErrorCode::RefNotSupported,
                        "unsupported $ref",
                        child_path,
                        "`$ref` is not supported; inline the referenced schema",
                        None,
                    );
                } else {
                    find_refs(child, &child_path, result);
                }
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                find_refs(child, &format!("{}[{}]", path, i), result);
            }
        }
        _ => {}
    }
}

/// Get a human-readable name for a JSON value type.
pub(crate) fn schema_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
