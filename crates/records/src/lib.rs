//! On-disk layout of generated artifacts and the JSON records that describe them.

pub mod naming;
pub mod record;
pub mod store;

use thiserror::Error;

pub use naming::{GenerationNames, Stamp, StrokeNames};
pub use record::{GenerationRecord, SkipNote, StrokeRecord};
pub use store::{ArtifactStore, SavedGeneration, SavedStroke};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Refusing to overwrite existing artifact {0}")]
    AlreadyExists(std::path::PathBuf),
}

pub type Result<T> = std::result::Result<T, RecordError>;

/// blake3 hex digest of an input file's bytes, recorded so a record can be
/// matched back to the exact background it was generated from.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(bytes);
    hasher.finalize().to_hex().to_string()
}
