use std::env;
use std::path::PathBuf;

use crate::store::DEFAULT_STORAGE_KEY;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub port: u16,
    pub storage_key: String,
    /// Byte cap on the persisted document, like a browser storage quota.
    pub storage_quota: Option<usize>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            data_dir: PathBuf::from(get("DATA_DIR").unwrap_or_else(|| "./data".into())),
            port: get("PORT").and_then(|s| s.parse().ok()).unwrap_or(8081),
            storage_key: get("LMS_STORAGE_KEY")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_STORAGE_KEY.into()),
            storage_quota: get("LMS_STORAGE_QUOTA").and_then(|s| s.parse().ok()),
        }
    }
}
