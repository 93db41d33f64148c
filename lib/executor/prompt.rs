//! Prompt rendering.

use serde_json::Value;

use crate::context::InvocationContext;
use crate::error::{RegistryError, RegistryResult};
use crate::model::Prompt;
use crate::template::Scope;
use crate::validate::ErrorCode;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Render a prompt template with argument values.
///
/// Arguments resolve bare `{{name}}` tokens; `SESSION.*` and `REQUEST.*`
/// resolve from `context`. Secrets are never available to prompts.
pub fn render_prompt(
    prompt: &Prompt,
    arguments: &Value,
    context: &InvocationContext,
) -> RegistryResult<String> {
    let empty = Value::Object(Default::default());
    let arguments = match arguments {
        Value::Null => &empty,
        Value::Object(_) => arguments,
        _ => {
            return Err(RegistryError::validation(
                ErrorCode::InvalidParams,
                "arguments",
                "prompt arguments must be an object",
            ));
        }
    };

    for arg in prompt.arguments.iter().filter(|a| a.required) {
        if arguments.get(&arg.name).is_none_or(Value::is_null) {
            return Err(RegistryError::validation(
                ErrorCode::MissingArgument,
                format!("arguments.{}", arg.name),
                format!("required argument `{}` is missing", arg.name),
            ));
        }
    }

    let rendered = Scope::new(arguments, context).substitute(&prompt.template);
    for token in &rendered.unresolved {
        tracing::warn!(prompt = %prompt.name, placeholder = %token, "unresolved placeholder left literal");
    }

    Ok(rendered.output)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
