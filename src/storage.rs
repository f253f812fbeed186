use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::StorageError;

/// A durable key-value slot holding whole-document JSON text.
pub trait Storage: Send {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

fn check_quota(quota: Option<usize>, value: &str) -> Result<(), StorageError> {
    match quota {
        Some(quota) if value.len() > quota => Err(StorageError::QuotaExceeded { needed: value.len(), quota }),
        _ => Ok(()),
    }
}

/// One `<key>.json` file per slot under `dir`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    quota: Option<usize>,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), quota: None }
    }

    pub fn with_quota(mut self, quota: Option<usize>) -> Self {
        self.quota = quota;
        self
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.slot_path(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        check_quota(self.quota, value)?;
        fs::create_dir_all(&self.dir)?;
        // write-then-rename so a crash never leaves a half-written slot
        let path = self.slot_path(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    slots: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self { slots: HashMap::new(), quota: Some(quota) }
    }

    pub fn seeded(key: &str, value: impl Into<String>) -> Self {
        let mut slots = HashMap::new();
        slots.insert(key.to_string(), value.into());
        Self { slots, quota: None }
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        check_quota(self.quota, value)?;
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
