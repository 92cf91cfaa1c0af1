//! Model storage: a JSON snapshot of elements, types, and materials behind the model store traits.

mod error;
pub use error::StoreError;

mod snapshot;
pub use snapshot::{ElementRecord, MaterialRecord, ModelSnapshot, SnapshotStore, TypeRecord};
