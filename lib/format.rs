//! Formatting utilities for human-readable output.

use colored::Colorize;
use serde_json::Value;

use crate::model::{ContentType, Executor};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Maximum length for single-line descriptions before truncation.
const MAX_DESC_LEN: usize = 60;

/// Maximum length of a url shown in an executor summary.
const MAX_URL_LEN: usize = 48;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// First non-empty line of a description, truncated for list views.
pub fn format_description(desc: &str) -> Option<String> {
    let line = desc.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(truncate(line, MAX_DESC_LEN))
}

/// Truncate on a char boundary, appending "..." when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// One-line summary of an executor, e.g. `http GET https://api...`.
pub fn executor_summary(executor: &Executor) -> String {
    match executor {
        Executor::Static(s) => match s.content_type {
            ContentType::Json => "static json".to_string(),
            ContentType::Text => "static text".to_string(),
        },
        Executor::Http(h) => format!("http {} {}", h.method, truncate(&h.url, MAX_URL_LEN)),
        Executor::Function(f) => format!("function ({} lines)", f.code.lines().count()),
    }
}

/// Syntax highlight a JSON value for terminal output.
///
/// Keys are cyan, strings green, numbers yellow, booleans magenta and null dimmed.
pub fn highlight_json(value: &Value) -> String {
    let mut out = String::new();
    write_highlighted(value, 0, &mut out);
    out
}

fn write_highlighted(value: &Value, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth + 1);
    match value {
        Value::Null => out.push_str(&"null".dimmed().to_string()),
        Value::Bool(b) => out.push_str(&b.to_string().magenta().to_string()),
        Value::Number(n) => out.push_str(&n.to_string().yellow().to_string()),
        Value::String(_) => out.push_str(&value.to_string().green().to_string()),
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Array(items) => {
            out.push_str("[\n");
            for (i, item) in items.iter().enumerate() {
                out.push_str(&pad);
                write_highlighted(item, depth + 1, out);
                out.push_str(if i + 1 < items.len() { ",\n" } else { "\n" });
            }
            out.push_str(&"  ".repeat(depth));
            out.push(']');
        }
        Value::Object(map) => {
            out.push_str("{\n");
            for (i, (key, item)) in map.iter().enumerate() {
                out.push_str(&pad);
                out.push_str(&Value::String(key.clone()).to_string().cyan().to_string());
                out.push_str(": ");
                write_highlighted(item, depth + 1, out);
                out.push_str(if i + 1 < map.len() { ",\n" } else { "\n" });
            }
            out.push_str(&"  ".repeat(depth));
            out.push('}');
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FunctionExecutor, HttpExecutor};
    use serde_json::json;

    #[test]
    fn test_format_description() {
        assert_eq!(format_description(""), None);
        assert_eq!(
            format_description("\n  Get the weather.\nMore detail"),
            Some("Get the weather.".to_string())
        );
        let long = "x".repeat(100);
        let formatted = format_description(&long).unwrap();
        assert_eq!(formatted.chars().count(), MAX_DESC_LEN);
        assert!(formatted.ends_with("..."));
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
        assert_eq!(truncate("short", 8), "short");
    }

    #[test]
    fn test_executor_summary() {
        let http = Executor::Http(HttpExecutor {
            method: "POST".into(),
            url: "https://api.example.com/v1".into(),
            headers: Default::default(),
            body: None,
        });
        assert_eq!(executor_summary(&http), "http POST https://api.example.com/v1");

        let function = Executor::Function(FunctionExecutor {
            code: "(p) => {\n  return p;\n}".into(),
        });
        assert_eq!(executor_summary(&function), "function (3 lines)");
    }

    #[test]
    fn test_highlight_json_structure() {
        colored::control::set_override(false);
        let out = highlight_json(&json!({"a": [1, "two\n"], "b": {}, "c": null}));
        assert_eq!(
            out,
            "{\n  \"a\": [\n    1,\n    \"two\\n\"\n  ],\n  \"b\": {},\n  \"c\": null\n}"
        );
        colored::control::unset_override();
    }
}
