//! Key/value persistence backends for the event store.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StyleResult;

/// String key/value storage, in the manner of browser local storage.
pub trait StorageBackend: Send {
    /// Read a value, `None` when the key was never written.
    fn load(&self, key: &str) -> StyleResult<Option<String>>;

    /// Write a value, replacing any previous one.
    fn save(&mut self, key: &str, value: &str) -> StyleResult<()>;

    /// Delete a key. Missing keys are not an error.
    fn remove(&mut self, key: &str) -> StyleResult<()>;
}

/// Backend keeping everything in a map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self, key: &str) -> StyleResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> StyleResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StyleResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Backend writing one `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    /// Open a backend rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> StyleResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StorageBackend for JsonFileBackend {
    fn load(&self, key: &str) -> StyleResult<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn save(&mut self, key: &str, value: &str) -> StyleResult<()> {
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StyleResult<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
