use thiserror::Error;

use crate::ElementId;

/// Failures raised by a model store while querying or mutating elements.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("element {0} not found")]
    ElementNotFound(ElementId),

    #[error("parameter '{name}' not found on element {element}")]
    ParameterNotFound { element: ElementId, name: String },

    #[error("parameter '{name}' on element {element} is read-only")]
    ReadOnly { element: ElementId, name: String },

    #[error("parameter '{name}' on element {element} does not store text")]
    StorageMismatch { element: ElementId, name: String },

    #[error("no transaction is open")]
    NoTransaction,

    #[error("transaction '{0}' is already open")]
    TransactionOpen(String),

    #[error("{0}")]
    Other(String),
}
