//! Interchange files handed to the external classifier.
//!
//! The JSON document mirrors the record set field for field. The CSV form is
//! UTF-8 with a byte-order mark and one header row taken from the first
//! record. Header names are quoted only when they need it; every data cell is
//! quoted, kept on a single line, and an empty value is written as the
//! sentinel.

use std::fs;
use std::path::{Path, PathBuf};

use bimclass_core::{FeatureRecordSet, SENTINEL};
use thiserror::Error;
use tracing::info;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pretty-printed JSON array, keys in record order.
pub fn to_json(records: &FeatureRecordSet) -> Result<String, ExchangeError> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Quoted CSV with a leading BOM. An empty set encodes as the BOM alone.
pub fn to_csv(records: &FeatureRecordSet) -> Result<Vec<u8>, ExchangeError> {
    let mut out = UTF8_BOM.to_vec();
    let headers = records.headers();
    if headers.is_empty() {
        return Ok(out);
    }

    let mut header = csv_writer(csv::QuoteStyle::Necessary, &mut out);
    header.write_record(headers.iter().map(|h| single_line(h)))?;
    header.flush().map_err(csv::Error::from)?;
    drop(header);

    let mut writer = csv_writer(csv::QuoteStyle::Always, &mut out);
    for record in records.iter() {
        let row = headers.iter().map(|h| cell(record.get(h)));
        writer.write_record(row)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    drop(writer);

    Ok(out)
}

fn csv_writer(quote: csv::QuoteStyle, out: &mut Vec<u8>) -> csv::Writer<&mut Vec<u8>> {
    csv::WriterBuilder::new()
        .quote_style(quote)
        .terminator(csv::Terminator::Any(b'\n'))
        .flexible(false)
        .from_writer(out)
}

fn cell(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => single_line(v),
        _ => SENTINEL.to_string(),
    }
}

/// Write both interchange files, creating parent directories as needed.
pub fn write_exchange(
    records: &FeatureRecordSet,
    json_path: &Path,
    csv_path: &Path,
) -> Result<(), ExchangeError> {
    let json = to_json(records)?;
    let csv = to_csv(records)?;
    write_file(json_path, json.as_bytes())?;
    write_file(csv_path, &csv)?;

    info!(
        count = records.len(),
        json = %json_path.display(),
        csv = %csv_path.display(),
        "wrote exchange files"
    );
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), ExchangeError> {
    let write_err = |source: std::io::Error| ExchangeError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, contents).map_err(write_err)
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
