//! Constants for ext-registry.
//!
//! This module contains all path, limit and configuration constants.
//! Review these to ensure they match your environment.

use std::path::PathBuf;
use std::sync::LazyLock;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Maximum length of an entity name.
pub const MAX_NAME_LENGTH: usize = 64;

/// Current export document format version.
pub const EXPORT_VERSION: u32 = 1;

/// File holding the persisted tools collection.
pub const TOOLS_FILE: &str = "tools.json";

/// File holding the persisted prompts collection.
pub const PROMPTS_FILE: &str = "prompts.json";

/// File holding the persisted resources collection.
pub const RESOURCES_FILE: &str = "resources.json";

/// File holding registry-wide settings (the global gate).
pub const SETTINGS_FILE: &str = "settings.json";

/// Config file name inside the home directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable pointing at a custom config file.
pub const CONFIG_PATH_ENV: &str = "EXTREG_CONFIG";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "EXTREG_DATA_DIR";

/// Prefix for environment-backed secrets (`EXTREG_SECRET_API_KEY` -> `{{SECRET.API_KEY}}`).
pub const SECRET_ENV_PREFIX: &str = "EXTREG_SECRET_";

/// Default timeout for HTTP executors, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default wall-clock bound for function executors, in milliseconds.
pub const DEFAULT_FUNCTION_TIMEOUT_MS: u64 = 5_000;

/// Default heap limit for a function executor runtime.
pub const DEFAULT_FUNCTION_MEMORY_LIMIT: usize = 32 * 1024 * 1024;

/// Default stack limit for a function executor runtime.
pub const DEFAULT_FUNCTION_STACK_LIMIT: usize = 1024 * 1024;

/// Default port for the MCP HTTP server.
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Default bind host for the MCP HTTP server.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default client type reported in `{{SESSION.clientType}}`.
pub const DEFAULT_CLIENT_TYPE: &str = "mcp";

/// Default home directory for registry configuration and data.
pub static DEFAULT_HOME_PATH: LazyLock<PathBuf> = LazyLock::new(|| {
    dirs::home_dir()
        .map(|h| h.join(".extreg"))
        .unwrap_or_else(|| PathBuf::from(".extreg"))
});

/// Default path for persisted registry data.
pub static DEFAULT_DATA_PATH: LazyLock<PathBuf> = LazyLock::new(|| DEFAULT_HOME_PATH.join("data"));

/// Default path of the config file.
pub static DEFAULT_CONFIG_PATH: LazyLock<PathBuf> =
    LazyLock::new(|| DEFAULT_HOME_PATH.join(CONFIG_FILE));

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Get the config file path, checking EXTREG_CONFIG env var first.
pub fn get_config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.clone())
}
