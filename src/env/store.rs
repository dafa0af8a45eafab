use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::foundation::error::{WobblazError, WobblazResult};

/// Persisted key/value strings (the `localStorage` role).
pub trait OverrideStore {
    /// Read `key`, `Ok(None)` when absent.
    fn load(&self, key: &str) -> WobblazResult<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &str) -> WobblazResult<()>;
}

/// Process-lifetime store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let s = Self::new();
        s.entries.borrow_mut().insert(key.into(), value.into());
        s
    }
}

impl OverrideStore for MemoryStore {
    fn load(&self, key: &str) -> WobblazResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> WobblazResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a single JSON object file mapping keys to string values.
///
/// A missing file reads as empty; every save rewrites the whole file.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at `path`. The file is not touched until the first access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> WobblazResult<BTreeMap<String, String>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            WobblazError::serde(format!(
                "override store '{}' is not a JSON string map: {e}",
                self.path.display()
            ))
        })
    }
}

impl OverrideStore for JsonFileStore {
    fn load(&self, key: &str) -> WobblazResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> WobblazResult<()> {
        let mut all = self.read_all()?;
        all.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&all)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/env/store.rs"]
mod tests;
