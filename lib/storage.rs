//! JSON file persistence for registry collections.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::constants::SETTINGS_FILE;
use crate::error::{RegistryError, RegistryResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Registry-wide settings persisted next to the collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// The global gate.
    pub enabled: bool,
}

/// Data directory holding one JSON file per collection.
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

/// Identity of a file's current contents, used to notice writes made by
/// other processes sharing the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    modified: SystemTime,
    len: u64,
    inode: u64,
}

/// Exclusive advisory lock on one collection, released on drop.
#[derive(Debug)]
pub struct FileLock {
    _file: fs::File,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Storage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load a collection. Returns an empty list if the file doesn't exist.
    ///
    /// A file that exists but doesn't parse is an error; it is never
    /// silently replaced.
    pub fn load_collection<T: DeserializeOwned>(&self, file: &str) -> RegistryResult<Vec<T>> {
        let path = self.dir.join(file);
        match read_optional(&path)? {
            Some(content) => serde_json::from_str(&content).map_err(|e| {
                RegistryError::Generic(format!("Failed to load {}: {}", path.display(), e))
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Save a collection with atomic write (temp file + rename).
    pub fn save_collection<T: Serialize>(&self, file: &str, items: &[T]) -> RegistryResult<()> {
        let content = serde_json::to_string_pretty(items)?;
        write_atomic(&self.dir.join(file), content.as_bytes())
    }

    /// Load settings. Defaults to enabled if the file doesn't exist.
    pub fn load_settings(&self) -> RegistryResult<Settings> {
        let path = self.dir.join(SETTINGS_FILE);
        match read_optional(&path)? {
            Some(content) => serde_json::from_str(&content).map_err(|e| {
                RegistryError::Generic(format!("Failed to load {}: {}", path.display(), e))
            }),
            None => Ok(Settings::default()),
        }
    }

    pub fn save_settings(&self, settings: &Settings) -> RegistryResult<()> {
        let content = serde_json::to_string_pretty(settings)?;
        write_atomic(&self.dir.join(SETTINGS_FILE), content.as_bytes())
    }

    /// Current stamp of `file`, or `None` if it doesn't exist.
    pub fn stamp(&self, file: &str) -> RegistryResult<Option<FileStamp>> {
        let metadata = match fs::metadata(self.dir.join(file)) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        #[cfg(unix)]
        let inode = std::os::unix::fs::MetadataExt::ino(&metadata);
        #[cfg(not(unix))]
        let inode = 0;

        Ok(Some(FileStamp {
            modified: metadata.modified()?,
            len: metadata.len(),
            inode,
        }))
    }

    /// Take the exclusive lock guarding writes to `file`.
    ///
    /// Waits for other holders, in this process or another one. The lock
    /// lives in a `<file>.lock` sibling so atomic renames never replace it.
    pub async fn lock(&self, file: &str) -> RegistryResult<FileLock> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.lock", file));

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<fs::File> {
            let file = fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)?;
            file.lock()?;
            Ok(file)
        })
        .await
        .map_err(|e| RegistryError::Generic(format!("Lock task failed: {}", e)))??;

        Ok(FileLock { _file: file })
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for Settings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Read a file, treating a missing or blank file as absent.
fn read_optional(path: &Path) -> RegistryResult<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(content))
}

/// Write `content` to `path` via a temp file and rename.
pub fn write_atomic(path: &Path, content: &[u8]) -> RegistryResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        RegistryError::Io(e)
    })?;

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
