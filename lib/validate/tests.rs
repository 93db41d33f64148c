//! Validation tests.

use serde_json::json;

use super::codes::{ErrorCode, ValidationCode, WarningCode};
use super::result::ValidationOutcome;
use super::validators::{
    validate_executor, validate_function, validate_name, validate_prompt, validate_schema,
    validate_uri,
};
use crate::model::{
    ContentType, Executor, FunctionExecutor, HttpExecutor, PromptArgument, StaticExecutor,
};

fn arg(name: &str, required: bool) -> PromptArgument {
    PromptArgument {
        name: name.to_string(),
        description: String::new(),
        required,
    }
}

fn http(method: &str, url: &str) -> Executor {
    Executor::Http(HttpExecutor {
        method: method.to_string(),
        url: url.to_string(),
        headers: Default::default(),
        body: None,
    })
}

#[test]
fn test_name_uniqueness_respects_exclude_id() {
    let existing = [("id-1", "weather"), ("id-2", "search")];

    let result = validate_name("weather", existing, None);
    assert!(result.has_error(ErrorCode::DuplicateName));

    // An entity keeps its own name on update.
    let result = validate_name("weather", existing, Some("id-1"));
    assert!(result.is_valid());

    let result = validate_name("weather", existing, Some("id-2"));
    assert!(result.has_error(ErrorCode::DuplicateName));
}

#[test]
fn test_name_syntax_errors() {
    let none: [(&str, &str); 0] = [];
    assert!(validate_name("", none, None).has_error(ErrorCode::EmptyName));
    assert!(validate_name(&"a".repeat(65), none, None).has_error(ErrorCode::NameTooLong));
    assert!(validate_name("Get-Weather", none, None).has_error(ErrorCode::InvalidNameCharacters));
    assert!(validate_name(&"a".repeat(64), none, None).is_valid());
}

#[test]
fn test_valid_schema() {
    let schema = json!({
        "type": "object",
        "properties": {
            "city": { "type": "string" },
            "days": { "type": "integer" }
        },
        "required": ["city"]
    });
    assert!(validate_schema(&schema).is_strict_valid());
}

#[test]
fn test_schema_root_must_be_object_type() {
    let result = validate_schema(&json!("object"));
    assert!(result.has_error(ErrorCode::SchemaNotObject));

    let result = validate_schema(&json!({ "type": "array" }));
    assert!(result.has_error(ErrorCode::SchemaRootType));
    assert_eq!(result.errors[0].location, "inputSchema.type");

    let result = validate_schema(&json!({ "properties": {} }));
    assert!(result.has_error(ErrorCode::SchemaRootType));
}

#[test]
fn test_schema_required_must_be_declared() {
    let schema = json!({
        "type": "object",
        "properties": { "city": { "type": "string" } },
        "required": ["city", "country"]
    });
    let result = validate_schema(&schema);
    assert_eq!(result.errors.len(), 1);
    assert!(result.has_error(ErrorCode::UndeclaredRequired));
    assert_eq!(result.errors[0].location, "inputSchema.required[1]");

    let result = validate_schema(&json!({ "type": "object", "required": "city" }));
    assert!(result.has_error(ErrorCode::InvalidRequired));
}

#[test]
fn test_schema_rejects_ref_and_bad_property_names() {
    let schema = json!({
        "type": "object",
        "properties": {
            "1st": { "type": "string" },
            "nested": { "items": { "$ref": "#/defs/item" } }
        }
    });
    let result = validate_schema(&schema);
    assert!(result.has_error(ErrorCode::InvalidPropertyName));
    assert!(result.has_error(ErrorCode::RefNotSupported));

    let refs: Vec<_> = result
        .errors
        .iter()
        .filter(|e| e.code == ValidationCode::Error(ErrorCode::RefNotSupported))
        .collect();
    assert_eq!(refs[0].location, "inputSchema.properties.nested.items.$ref");
}

#[test]
fn test_schema_nested_property_schemas_must_be_well_formed() {
    let schema = json!({
        "type": "object",
        "properties": {
            "city": { "type": "strng" },
            "n": { "minimum": "zero" }
        }
    });
    let result = validate_schema(&schema);
    assert!(result.has_error(ErrorCode::MalformedSchema));
    assert!(result.errors[0].location.starts_with("inputSchema.properties."));

    let nested = json!({
        "type": "object",
        "properties": {
            "o": { "type": "object", "required": "x" }
        }
    });
    assert!(validate_schema(&nested).has_error(ErrorCode::MalformedSchema));
}

#[test]
fn test_function_sources() {
    assert!(validate_function("(params, context) => params.a + params.b").is_valid());
    assert!(validate_function("async (params) => { return params; }").is_valid());
    assert!(validate_function("function (params) { return 1; }").is_valid());
    assert!(validate_function("() => 42;").is_valid());

    assert!(validate_function("").has_error(ErrorCode::NotAFunction));
    assert!(validate_function("(a, b, c) => a").has_error(ErrorCode::FunctionArity));
    assert!(validate_function("params.a").has_error(ErrorCode::NotAFunction));
    assert!(validate_function("(params) => {").has_error(ErrorCode::FunctionParse));
}

#[test]
fn test_static_executor_json_must_parse() {
    let ok = Executor::Static(StaticExecutor {
        content: r#"{"a": 1}"#.to_string(),
        content_type: ContentType::Json,
        editor_mode: None,
    });
    assert!(validate_executor(&ok).is_valid());

    let bad = Executor::Static(StaticExecutor {
        content: "{ nope".to_string(),
        content_type: ContentType::Json,
        editor_mode: None,
    });
    assert!(validate_executor(&bad).has_error(ErrorCode::InvalidStaticJson));

    // Text content is never parsed.
    let text = Executor::Static(StaticExecutor {
        content: "{ nope".to_string(),
        content_type: ContentType::Text,
        editor_mode: None,
    });
    assert!(validate_executor(&text).is_valid());
}

#[test]
fn test_http_executor() {
    assert!(validate_executor(&http("get", "https://api.example.com/{{city}}")).is_valid());
    assert!(validate_executor(&http("POST", "{{SECRET.base_url}}/items")).is_valid());

    assert!(validate_executor(&http("FETCH", "https://x.dev")).has_error(ErrorCode::InvalidHttpMethod));
    assert!(validate_executor(&http("GET", "  ")).has_error(ErrorCode::InvalidHttpUrl));
    assert!(validate_executor(&http("GET", "ftp://x.dev")).has_error(ErrorCode::InvalidHttpUrl));
}

#[test]
fn test_function_executor_delegates() {
    let executor = Executor::Function(FunctionExecutor {
        code: "not a function".to_string(),
    });
    assert!(!validate_executor(&executor).is_valid());
}

#[test]
fn test_uri_syntax_and_uniqueness() {
    let existing = [("r1", "custom://notes")];

    assert!(validate_uri("custom://today", existing, None).is_valid());
    assert!(validate_uri("notes", existing, None).has_error(ErrorCode::InvalidUri));
    assert!(validate_uri("custom://notes", existing, None).has_error(ErrorCode::DuplicateUri));
    assert!(validate_uri("custom://notes", existing, Some("r1")).is_valid());
}

#[test]
fn test_prompt_warnings_do_not_block() {
    let result = validate_prompt(
        "Summarize {{text}} in {{language}}",
        &[arg("text", true), arg("tone", false)],
    );
    assert!(result.is_valid());
    assert!(!result.is_strict_valid());

    let codes: Vec<_> = result.warnings.iter().map(|w| w.code).collect();
    assert!(codes.contains(&ValidationCode::Warning(WarningCode::UnresolvedPlaceholder)));
    assert!(codes.contains(&ValidationCode::Warning(WarningCode::UnusedArgument)));
}

#[test]
fn test_prompt_errors() {
    assert!(validate_prompt("   ", &[]).has_error(ErrorCode::EmptyTemplate));

    let result = validate_prompt("{{a}}", &[arg("a", true), arg("a", false)]);
    assert!(result.has_error(ErrorCode::InvalidArgument));

    let result = validate_prompt("{{x}}", &[arg("9lives", false)]);
    assert!(result.has_error(ErrorCode::InvalidArgument));
}

#[test]
fn test_outcome_and_first_failure() {
    let result = validate_schema(&json!({ "type": "string" }));
    let failure = result.first_failure().unwrap();
    assert_eq!(failure.code, ErrorCode::SchemaRootType);
    assert_eq!(failure.field, "inputSchema.type");

    let outcome = ValidationOutcome::from(&result);
    assert!(!outcome.valid);
    assert!(outcome.error.unwrap().contains("\"object\""));

    let outcome = ValidationOutcome::from(validate_prompt("{{a}}", &[]));
    assert!(outcome.valid);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.warnings.len(), 1);
}

#[test]
fn test_codes_serialize_as_short_codes() {
    let code = ValidationCode::Error(ErrorCode::DuplicateUri);
    assert_eq!(serde_json::to_value(code).unwrap(), json!("E016"));
    assert_eq!(code.to_string(), "E016");
    assert_eq!(WarningCode::MissingDescription.to_string(), "W003");
}
