//! Feature extraction from a model store and the classifier interchange files.

pub mod exchange;
pub mod extract;

pub use exchange::{ExchangeError, to_csv, to_json, write_exchange};
pub use extract::{Curvature, ExtractionConfig, extract, extract_element};
