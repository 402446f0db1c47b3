// Storage backends for job documents, source assets and rendered artifacts
//
// Objects are addressed by relative, slash-separated keys such as
// "job_ids/abc.json" or "sequences/abc_0.json".

use crate::error::{EngineError, EngineResult};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use walkdir::WalkDir;

/// Object store used by the job runners
pub trait Storage: Send + Sync {
    fn fetch(&self, key: &str) -> EngineResult<Vec<u8>>;

    fn store(&self, key: &str, bytes: &[u8]) -> EngineResult<()>;

    fn exists(&self, key: &str) -> EngineResult<bool>;

    fn delete(&self, key: &str) -> EngineResult<()>;

    /// Keys starting with `prefix`, sorted
    fn list(&self, prefix: &str) -> EngineResult<Vec<String>>;
}

/// Rejects keys that could escape the storage root
fn check_key(key: &str) -> EngineResult<&Path> {
    let path = Path::new(key);
    let valid = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if valid {
        Ok(path)
    } else {
        Err(EngineError::Storage(format!("invalid object key '{}'", key)))
    }
}

/// Directory-backed storage
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> EngineResult<PathBuf> {
        Ok(self.root.join(check_key(key)?))
    }
}

impl Storage for LocalStorage {
    fn fetch(&self, key: &str) -> EngineResult<Vec<u8>> {
        let path = self.resolve(key)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EngineError::StorageNotFound(key.to_string()),
            _ => EngineError::Io(e),
        })
    }

    fn store(&self, key: &str, bytes: &[u8]) -> EngineResult<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        tracing::debug!(key, bytes = bytes.len(), "stored object");
        Ok(())
    }

    fn exists(&self, key: &str) -> EngineResult<bool> {
        Ok(self.resolve(key)?.is_file())
    }

    fn delete(&self, key: &str) -> EngineResult<()> {
        let path = self.resolve(key)?;
        std::fs::remove_file(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EngineError::StorageNotFound(key.to_string()),
            _ => EngineError::Io(e),
        })
    }

    fn list(&self, prefix: &str) -> EngineResult<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry.map_err(|e| EngineError::Storage(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-memory storage for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> EngineResult<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.objects
            .lock()
            .map_err(|_| EngineError::Storage("memory storage lock poisoned".to_string()))
    }
}

impl Storage for MemoryStorage {
    fn fetch(&self, key: &str) -> EngineResult<Vec<u8>> {
        check_key(key)?;
        self.objects()?
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::StorageNotFound(key.to_string()))
    }

    fn store(&self, key: &str, bytes: &[u8]) -> EngineResult<()> {
        check_key(key)?;
        self.objects()?.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, key: &str) -> EngineResult<bool> {
        check_key(key)?;
        Ok(self.objects()?.contains_key(key))
    }

    fn delete(&self, key: &str) -> EngineResult<()> {
        check_key(key)?;
        self.objects()?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| EngineError::StorageNotFound(key.to_string()))
    }

    fn list(&self, prefix: &str) -> EngineResult<Vec<String>> {
        Ok(self
            .objects()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
