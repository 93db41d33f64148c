//! Placeholder substitution for executor templates and prompts.
//!
//! Handles `{{name}}`, `{{params.path}}`, `{{SECRET.key}}`, `{{SESSION.field}}`
//! and `{{REQUEST.field}}` tokens. Tokens that cannot be resolved are left in
//! place and reported back to the caller.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::context::InvocationContext;
use crate::secrets::SecretStore;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Regex pattern for placeholder tokens.
pub const PLACEHOLDER_PATTERN: &str = r"\{\{\s*([^{}]+?)\s*\}\}";

/// Namespace for secret placeholders.
pub const SECRET_NAMESPACE: &str = "SECRET";

/// Namespace for session placeholders.
pub const SESSION_NAMESPACE: &str = "SESSION";

/// Namespace for request placeholders.
pub const REQUEST_NAMESPACE: &str = "REQUEST";

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN).expect("Invalid regex pattern"));

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A parsed placeholder token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder<'a> {
    /// A parameter or argument path, e.g. `city` or `params.address.city`.
    Param(&'a str),
    Secret(&'a str),
    Session(&'a str),
    Request(&'a str),
}

/// Output of a substitution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub output: String,

    /// Tokens left literal because nothing resolved them.
    pub unresolved: Vec<String>,
}

/// Values available to a substitution pass.
pub struct Scope<'a> {
    params: &'a Value,
    context: &'a InvocationContext,
    secrets: Option<&'a dyn SecretStore>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<'a> Placeholder<'a> {
    /// Parse the inner text of a `{{...}}` token.
    pub fn parse(token: &'a str) -> Self {
        let token = token.trim();
        match token.split_once('.') {
            Some((SECRET_NAMESPACE, key)) => Placeholder::Secret(key),
            Some((SESSION_NAMESPACE, field)) => Placeholder::Session(field),
            Some((REQUEST_NAMESPACE, field)) => Placeholder::Request(field),
            Some(("params", path)) => Placeholder::Param(path),
            _ => Placeholder::Param(token),
        }
    }

    /// The top-level parameter name this placeholder reads, if any.
    pub fn param_root(&self) -> Option<&'a str> {
        match self {
            Placeholder::Param(path) => path.split('.').next(),
            _ => None,
        }
    }
}

impl<'a> Scope<'a> {
    /// A scope without secrets, as used by prompts and function executors.
    pub fn new(params: &'a Value, context: &'a InvocationContext) -> Self {
        Self {
            params,
            context,
            secrets: None,
        }
    }

    /// Make `SECRET.*` placeholders resolvable from `store`.
    pub fn with_secrets(mut self, store: &'a dyn SecretStore) -> Self {
        self.secrets = Some(store);
        self
    }

    /// Resolve a single token.
    pub fn resolve(&self, token: &str) -> Option<String> {
        match Placeholder::parse(token) {
            Placeholder::Param(path) => lookup_path(self.params, path).map(render_value),
            Placeholder::Secret(key) => self.secrets.and_then(|store| store.get(key)),
            Placeholder::Session(field) => self.context.session.field(field).map(str::to_string),
            Placeholder::Request(field) => self.context.request.field(field),
        }
    }

    /// Resolve a single token to a JSON value, keeping parameter types.
    pub fn resolve_value(&self, token: &str) -> Option<Value> {
        match Placeholder::parse(token) {
            Placeholder::Param(path) => lookup_path(self.params, path).cloned(),
            _ => self.resolve(token).map(Value::String),
        }
    }

    /// Substitute all tokens in `s`.
    pub fn substitute(&self, s: &str) -> Substitution {
        substitute_with(s, |token| self.resolve(token))
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Extract the inner text of every placeholder in `s`, in order of appearance.
pub fn extract_placeholders(s: &str) -> Vec<String> {
    PLACEHOLDER_REGEX
        .captures_iter(s)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Substitute placeholders using `resolve`.
///
/// Unresolved tokens stay literal in the output and are listed in
/// [`Substitution::unresolved`].
pub fn substitute_with(s: &str, resolve: impl Fn(&str) -> Option<String>) -> Substitution {
    let mut unresolved = Vec::new();
    let output = PLACEHOLDER_REGEX
        .replace_all(s, |cap: &Captures| match resolve(&cap[1]) {
            Some(value) => value,
            None => {
                unresolved.push(cap[1].to_string());
                cap[0].to_string()
            }
        })
        .into_owned();

    Substitution { output, unresolved }
}

/// Follow a dotted path through objects and arrays.
fn lookup_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Render a JSON value for insertion into text.
///
/// Strings are inserted raw; everything else as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
