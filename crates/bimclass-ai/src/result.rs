//! Classifier result file decoding.

use std::path::{Path, PathBuf};

use bimclass_core::ClassificationResult;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ResultParseError {
    #[error("failed to read result file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed classification result: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decode a JSON object of object id → classification code.
///
/// Anything other than an object of string values is rejected whole. Keys are
/// not checked here; unusable keys are skipped when the result is applied.
pub fn parse_results(text: &str) -> Result<ClassificationResult, ResultParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    Ok(serde_json::from_str(text)?)
}

pub fn read_results(path: &Path) -> Result<ClassificationResult, ResultParseError> {
    let text = std::fs::read_to_string(path).map_err(|source| ResultParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let result = parse_results(&text)?;
    debug!(path = %path.display(), entries = result.len(), "read classification result");
    Ok(result)
}
