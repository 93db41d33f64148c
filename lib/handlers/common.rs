//! Shared helpers for command handlers.

use std::io::Read;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult, Response};
use crate::store::Registry;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Load config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> RegistryResult<RegistryConfig> {
    RegistryConfig::load_with(path)
}

/// Open the persistent registry described by the config.
pub fn open_registry(config_path: Option<&Path>) -> RegistryResult<(RegistryConfig, Registry)> {
    let config = load_config(config_path)?;
    let registry = Registry::open(&config)?;
    Ok((config, registry))
}

/// Read a file, or stdin when `path` is `-`.
pub fn read_input(path: &Path) -> RegistryResult<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        return Ok(content);
    }

    std::fs::read_to_string(path).map_err(|e| {
        RegistryError::Generic(format!("Failed to read {}: {}", path.display(), e))
    })
}

/// Read and parse a JSON file, or stdin when `path` is `-`.
pub fn read_json(path: &Path) -> RegistryResult<Value> {
    let content = read_input(path)?;
    serde_json::from_str(&content).map_err(|e| {
        RegistryError::Generic(format!("Invalid JSON in {}: {}", path.display(), e))
    })
}

/// Print a successful `{success, data}` envelope.
pub fn print_json<T: Serialize>(data: T) -> RegistryResult<()> {
    println!("{}", serde_json::to_string_pretty(&Response::ok(data))?);
    Ok(())
}

/// Build invocation params from `--args` and `-p key=value` flags.
///
/// Values parse as JSON when they can, otherwise they are strings. `-p`
/// values override keys from `--args`.
pub fn parse_params(params: &[String], args: Option<&str>) -> RegistryResult<Value> {
    let mut result = match args {
        None => Map::new(),
        Some(raw) => match serde_json::from_str(raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(RegistryError::Generic(
                    "--args must be a JSON object".to_string(),
                ));
            }
            Err(e) => return Err(RegistryError::Generic(format!("Invalid --args JSON: {}", e))),
        },
    };

    for param in params {
        let Some((key, value)) = param.split_once('=') else {
            return Err(RegistryError::Generic(format!(
                "Invalid parameter format '{}'. Expected key=value",
                param
            )));
        };
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        result.insert(key.to_string(), value);
    }

    Ok(Value::Object(result))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
