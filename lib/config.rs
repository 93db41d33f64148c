//! Registry configuration loaded from `~/.extreg/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DATA_DIR_ENV, DEFAULT_CLIENT_TYPE, DEFAULT_DATA_PATH, DEFAULT_FUNCTION_MEMORY_LIMIT,
    DEFAULT_FUNCTION_STACK_LIMIT, DEFAULT_FUNCTION_TIMEOUT_MS, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, get_config_path,
};
use crate::context::SessionContext;
use crate::error::{RegistryError, RegistryResult};
use crate::sandbox::SandboxLimits;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Top-level registry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Directory holding the persisted collections.
    pub data_dir: PathBuf,

    pub http: HttpConfig,

    pub sandbox: SandboxConfig,

    /// Session defaults for invocations that don't carry their own.
    pub session: SessionConfig,

    pub server: ServerConfig,
}

/// `[http]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout for HTTP executor calls, in seconds.
    pub timeout_secs: u64,
}

/// `[sandbox]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub timeout_ms: u64,
    pub memory_limit_bytes: usize,
    pub max_stack_bytes: usize,
}

/// `[session]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub workspace_id: Option<String>,
    pub project_root: Option<String>,
    pub client_type: Option<String>,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl RegistryConfig {
    /// Load configuration from `EXTREG_CONFIG` or the default path.
    ///
    /// A missing file yields defaults. `EXTREG_DATA_DIR` overrides `data_dir`.
    pub fn load() -> RegistryResult<Self> {
        Self::load_with(None)
    }

    /// Like [`RegistryConfig::load`], reading `path` instead of the default location.
    pub fn load_with(path: Option<&Path>) -> RegistryResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load_from(&get_config_path())?,
        };
        if let Ok(dir) = std::env::var(DATA_DIR_ENV)
            && !dir.is_empty()
        {
            config.data_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> RegistryResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| RegistryError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Config rooted at `data_dir`, everything else default.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn sandbox_limits(&self) -> SandboxLimits {
        SandboxLimits {
            timeout: Duration::from_millis(self.sandbox.timeout_ms),
            memory_limit: self.sandbox.memory_limit_bytes,
            max_stack: self.sandbox.max_stack_bytes,
        }
    }

    /// The configured session defaults.
    pub fn default_session(&self) -> SessionContext {
        SessionContext {
            workspace_id: self.session.workspace_id.clone(),
            project_root: self.session.project_root.clone(),
            client_type: self.session.client_type.clone(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_PATH.clone(),
            http: HttpConfig::default(),
            sandbox: SandboxConfig::default(),
            session: SessionConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_FUNCTION_TIMEOUT_MS,
            memory_limit_bytes: DEFAULT_FUNCTION_MEMORY_LIMIT,
            max_stack_bytes: DEFAULT_FUNCTION_STACK_LIMIT,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            workspace_id: None,
            project_root: std::env::current_dir()
                .ok()
                .map(|p| p.to_string_lossy().to_string()),
            client_type: Some(DEFAULT_CLIENT_TYPE.to_string()),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.http.timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
        assert_eq!(config.server.port, DEFAULT_SERVER_PORT);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
data_dir = "/var/lib/extreg"

[sandbox]
timeout_ms = 250

[session]
workspace_id = "ws"
"#,
        )
        .unwrap();

        let config = RegistryConfig::load_from(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/extreg"));
        assert_eq!(config.sandbox_limits().timeout, Duration::from_millis(250));
        assert_eq!(config.sandbox.memory_limit_bytes, DEFAULT_FUNCTION_MEMORY_LIMIT);
        assert_eq!(config.default_session().workspace_id.as_deref(), Some("ws"));
        assert_eq!(config.http_timeout(), Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[http\ntimeout_secs = ").unwrap();

        let err = RegistryConfig::load_from(&path).unwrap_err();
        assert_eq!(err.code(), "config_error");
    }
}
