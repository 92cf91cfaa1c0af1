//! Core types, model store traits, and the feature record schema.

pub mod category;
pub mod error;
pub mod model;
pub mod record;
pub mod schema;
pub mod transaction;
pub mod units;

pub use category::{Category, LoadBearing, ParseCategoryError};
pub use error::ModelError;
pub use model::{
    BoundingBox, BuiltInParam, CurveLocation, ElementId, ElementInfo, ElementType, GeometryObject,
    Location, ModelReader, ModelWriter, ParamValue, Parameter, Point3, Solid,
};
pub use record::{ClassificationResult, FeatureRecord, FeatureRecordSet};
pub use transaction::Transaction;
pub use units::SENTINEL;
