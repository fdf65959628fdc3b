//! File-based local cache for native platforms.

use super::{CacheError, CacheResult, LocalCache};
use std::fs;
use std::path::{Path, PathBuf};

/// File-based local cache for native platforms.
///
/// Stores each key as a JSON file in a directory. File names are the
/// percent-encoded key, so distinct keys never share a file and `keys()`
/// returns the original keys.
pub struct FileCache {
    /// Base directory for cache files.
    base_path: PathBuf,
}

impl FileCache {
    /// Create a new file cache with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> CacheResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                CacheError::Io(format!("Failed to create cache directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create a file cache in the default location.
    ///
    /// On Unix: `~/.local/share/dashlayout/layouts/`
    /// On Windows: `%LOCALAPPDATA%\dashlayout\layouts\`
    pub fn default_location() -> CacheResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| CacheError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("dashlayout").join("layouts"))
    }

    /// Get the file path for a key.
    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", urlencoding::encode(key)))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl LocalCache for FileCache {
    fn read(&self, key: &str) -> Option<String> {
        let path = self.entry_path(key);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> CacheResult<()> {
        let path = self.entry_path(key);
        fs::write(&path, value)
            .map_err(|e| CacheError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        let path = self.entry_path(key);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                CacheError::Io(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Failed to read cache directory: {}", e);
                return vec![];
            }
        };

        let mut keys = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    match urlencoding::decode(stem) {
                        Ok(key) => keys.push(key.into_owned()),
                        Err(e) => log::warn!("Skipping cache file {}: {}", path.display(), e),
                    }
                }
            }
        }
        keys
    }
}
