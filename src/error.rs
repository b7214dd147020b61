use crate::extract::ExtractionError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WardrobeError {
    #[error("{0}")]
    Extraction(#[from] ExtractionError),
    #[error("AI response is missing the `{expected}` field")]
    SchemaMismatch { expected: &'static str },
    #[error("AI declined to analyse the item: {0}")]
    ModelDeclined(String),
    #[error("Asset not found: {claimed} in {}", dir.display())]
    AssetNotFound { claimed: String, dir: PathBuf },
    #[error("Store file {} is corrupt: {reason}", path.display())]
    StoreCorrupt { path: PathBuf, reason: String },
    #[error("Failed to persist {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Duplicate item id: {0}")]
    DuplicateId(String),
}

impl WardrobeError {
    /// Wrap an I/O error with the path it happened on
    pub fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, WardrobeError>;
