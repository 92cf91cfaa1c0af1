use std::path::PathBuf;

use bimclass_core::ElementId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("model snapshot not found: {0}")]
    SnapshotNotFound(PathBuf),

    #[error("duplicate id {0} in model snapshot")]
    DuplicateId(ElementId),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
