//! Model store interface: the read and mutation surface the pipeline consumes.
//!
//! The host model store owns every element. The pipeline only reads through
//! [`ModelReader`] and writes through [`ModelWriter`] inside a transaction.
//! Lengths, areas, and volumes are reported in the store's native units
//! (feet, square feet, cubic feet).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ModelError;
use crate::category::Category;
use crate::units::format_number;

/// Stable integer identifier of an element in the model store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub i64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Typed value of a named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    Double(f64),
    Integer(i64),
    Text(String),
    ElementId(ElementId),
}

/// A parameter as the store exposes it: raw value, optional display text,
/// and whether it accepts writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub value: ParamValue,
    /// Display string as the host formats it (level names for element
    /// references, unit-suffixed lengths, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
}

impl Parameter {
    pub fn new(value: ParamValue) -> Self {
        Self {
            value,
            display: None,
            read_only: false,
        }
    }

    pub fn double(value: f64) -> Self {
        Self::new(ParamValue::Double(value))
    }

    pub fn integer(value: i64) -> Self {
        Self::new(ParamValue::Integer(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(ParamValue::Text(value.into()))
    }

    pub fn element(id: ElementId) -> Self {
        Self::new(ParamValue::ElementId(id))
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Numeric value, only for double storage.
    pub fn as_double(&self) -> Option<f64> {
        match self.value {
            ParamValue::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self.value {
            ParamValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Display text if the host supplied one, otherwise the raw value.
    ///
    /// Element references have no textual form without a display string.
    pub fn value_string(&self) -> Option<String> {
        if let Some(display) = &self.display {
            return Some(display.clone());
        }
        match &self.value {
            ParamValue::Double(v) => Some(format_number(*v)),
            ParamValue::Integer(v) => Some(v.to_string()),
            ParamValue::Text(s) => Some(s.clone()),
            ParamValue::ElementId(_) => None,
        }
    }

    /// True unless the host marks the parameter read-only. Storage is not
    /// checked; a text write to non-text storage still fails.
    pub fn is_writable(&self) -> bool {
        !self.read_only
    }
}

/// Well-known parameters addressed by identity rather than by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuiltInParam {
    HostVolumeComputed,
    HostAreaComputed,
    CurveElemLength,
    WallStructuralSignificant,
    FloorParamIsStructural,
}

/// Identity of an element instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    pub id: ElementId,
    /// Category display name, when the element has a category.
    pub category: Option<String>,
    pub type_id: Option<ElementId>,
}

/// Shared type definition referenced by instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementType {
    pub id: ElementId,
    pub family_name: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Solid {
    pub volume: f64,
    pub face_count: usize,
    pub centroid: Point3,
}

/// One node of an element's geometry tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryObject {
    Solid(Solid),
    /// Nested family instance geometry, already in model coordinates.
    Instance(Vec<GeometryObject>),
}

/// Axis-aligned bounds in native units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox {
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    pub fn dx(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn dy(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn dz(&self) -> f64 {
        self.max.z - self.min.z
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveLocation {
    pub start: Point3,
    pub end: Point3,
    #[serde(default)]
    pub is_cyclic: bool,
    #[serde(default = "default_true")]
    pub is_bound: bool,
}

fn default_true() -> bool {
    true
}

/// Positional locator of an element.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    #[default]
    None,
    Point(Point3),
    Curve(CurveLocation),
}

/// Read access to the host model store.
pub trait ModelReader {
    /// Instances of a category in collection order, type definitions excluded.
    fn instances_of(&self, category: Category) -> Result<Vec<ElementId>, ModelError>;

    fn element(&self, id: ElementId) -> Result<Option<ElementInfo>, ModelError>;

    fn element_type(&self, id: ElementId) -> Result<Option<ElementType>, ModelError>;

    /// Named parameter lookup; works for instances and type definitions.
    fn parameter(&self, id: ElementId, name: &str) -> Result<Option<Parameter>, ModelError>;

    fn builtin_parameter(
        &self,
        id: ElementId,
        param: BuiltInParam,
    ) -> Result<Option<Parameter>, ModelError>;

    /// `Ok(None)` when the element has no geometry at all.
    fn geometry(&self, id: ElementId) -> Result<Option<Vec<GeometryObject>>, ModelError>;

    fn bounding_box(&self, id: ElementId) -> Result<Option<BoundingBox>, ModelError>;

    fn location(&self, id: ElementId) -> Result<Location, ModelError>;

    /// Names of the materials the element uses, unresolvable ids omitted.
    fn material_names(&self, id: ElementId) -> Result<Vec<String>, ModelError>;
}

/// Mutation access to the host model store.
///
/// Writes are only valid between [`begin_transaction`](Self::begin_transaction)
/// and [`commit`](Self::commit) or [`rollback`](Self::rollback). Prefer the
/// [`Transaction`](crate::Transaction) guard over calling these directly.
pub trait ModelWriter: ModelReader {
    fn begin_transaction(&mut self, name: &str) -> Result<(), ModelError>;

    fn commit(&mut self) -> Result<(), ModelError>;

    /// Discard every write made since the transaction began.
    fn rollback(&mut self) -> Result<(), ModelError>;

    /// Set an existing, writable text parameter on an element instance.
    fn set_text_parameter(
        &mut self,
        id: ElementId,
        name: &str,
        value: &str,
    ) -> Result<(), ModelError>;
}
