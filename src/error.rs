use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Import failed. Ensure the JSON structure is valid.")]
    Malformed(#[from] serde_json::Error),
    #[error("Import failed. Ensure the JSON structure is valid.")]
    NotAnObject,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage quota exceeded ({needed} bytes, quota {quota})")]
    QuotaExceeded { needed: usize, quota: usize },
}
