//! JSON-backed model store.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use bimclass_core::{
    BoundingBox, BuiltInParam, Category, ElementId, ElementInfo, ElementType, GeometryObject,
    Location, ModelError, ModelReader, ModelWriter, ParamValue, Parameter,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::StoreError;

/// Serialized form of a model: element instances, type definitions, materials.
///
/// Ids share one space across all three lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    #[serde(default)]
    pub elements: Vec<ElementRecord>,
    #[serde(default)]
    pub types: Vec<TypeRecord>,
    #[serde(default)]
    pub materials: Vec<MaterialRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub id: ElementId,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub type_id: Option<ElementId>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Parameter>,
    #[serde(default)]
    pub builtin: BTreeMap<BuiltInParam, Parameter>,
    #[serde(default)]
    pub geometry: Option<Vec<GeometryObject>>,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub material_ids: Vec<ElementId>,
}

impl ElementRecord {
    pub fn new(id: i64, category: Category) -> Self {
        Self {
            id: ElementId(id),
            category: Some(category.name().to_string()),
            type_id: None,
            parameters: BTreeMap::new(),
            builtin: BTreeMap::new(),
            geometry: None,
            bounding_box: None,
            location: Location::None,
            material_ids: Vec::new(),
        }
    }

    pub fn with_type(mut self, type_id: i64) -> Self {
        self.type_id = Some(ElementId(type_id));
        self
    }

    pub fn with_parameter(mut self, name: &str, parameter: Parameter) -> Self {
        self.parameters.insert(name.to_string(), parameter);
        self
    }

    pub fn with_builtin(mut self, param: BuiltInParam, parameter: Parameter) -> Self {
        self.builtin.insert(param, parameter);
        self
    }

    pub fn with_geometry(mut self, geometry: Vec<GeometryObject>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_materials(mut self, ids: &[i64]) -> Self {
        self.material_ids = ids.iter().copied().map(ElementId).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRecord {
    pub id: ElementId,
    pub family_name: String,
    pub name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, Parameter>,
}

impl TypeRecord {
    pub fn new(id: i64, family_name: &str, name: &str) -> Self {
        Self {
            id: ElementId(id),
            family_name: family_name.to_string(),
            name: name.to_string(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: &str, parameter: Parameter) -> Self {
        self.parameters.insert(name.to_string(), parameter);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub id: ElementId,
    pub name: String,
}

impl MaterialRecord {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id: ElementId(id),
            name: name.to_string(),
        }
    }
}

/// Model store over a [`ModelSnapshot`].
///
/// Supports in-memory and file-backed modes. Use [`open`](Self::open) or
/// [`from_snapshot`](Self::from_snapshot) for a store whose commits stay in
/// memory, and [`open_persistent`](Self::open_persistent) for one whose
/// commits are written back to the snapshot file. A failed or rolled-back
/// transaction never touches the file.
pub struct SnapshotStore {
    snapshot: ModelSnapshot,
    elements: HashMap<ElementId, usize>,
    types: HashMap<ElementId, usize>,
    materials: HashMap<ElementId, usize>,
    path: Option<PathBuf>,
    /// Open transaction name and the element list as it was when it began.
    pending: Option<(String, Vec<ElementRecord>)>,
}

impl SnapshotStore {
    pub fn from_snapshot(snapshot: ModelSnapshot) -> Result<Self, StoreError> {
        let mut seen = HashSet::new();
        let elements = index_ids(snapshot.elements.iter().map(|e| e.id), &mut seen)?;
        let types = index_ids(snapshot.types.iter().map(|t| t.id), &mut seen)?;
        let materials = index_ids(snapshot.materials.iter().map(|m| m.id), &mut seen)?;

        Ok(Self {
            snapshot,
            elements,
            types,
            materials,
            path: None,
            pending: None,
        })
    }

    /// Load a snapshot file; commits stay in memory.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::SnapshotNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: ModelSnapshot = serde_json::from_str(&text)?;
        let store = Self::from_snapshot(snapshot)?;
        info!(
            path = %path.display(),
            elements = store.snapshot.elements.len(),
            types = store.snapshot.types.len(),
            "loaded model snapshot"
        );
        Ok(store)
    }

    /// Load a snapshot file; every commit rewrites it.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let mut store = Self::open(path)?;
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    pub fn snapshot(&self) -> &ModelSnapshot {
        &self.snapshot
    }

    pub fn in_transaction(&self) -> bool {
        self.pending.is_some()
    }

    /// Write the snapshot atomically: temp file in the target directory, then rename.
    pub fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        serde_json::to_writer_pretty(&mut tmp, &self.snapshot)?;
        tmp.write_all(b"\n").map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        debug!(path = %path.display(), "saved model snapshot");
        Ok(())
    }

    fn element_record(&self, id: ElementId) -> Option<&ElementRecord> {
        self.elements.get(&id).map(|&i| &self.snapshot.elements[i])
    }

    fn type_record(&self, id: ElementId) -> Option<&TypeRecord> {
        self.types.get(&id).map(|&i| &self.snapshot.types[i])
    }

    fn require_element(&self, id: ElementId) -> Result<&ElementRecord, ModelError> {
        self.element_record(id).ok_or(ModelError::ElementNotFound(id))
    }
}

fn index_ids(
    ids: impl Iterator<Item = ElementId>,
    seen: &mut HashSet<ElementId>,
) -> Result<HashMap<ElementId, usize>, StoreError> {
    let mut index = HashMap::new();
    for (i, id) in ids.enumerate() {
        if !seen.insert(id) {
            return Err(StoreError::DuplicateId(id));
        }
        index.insert(id, i);
    }
    Ok(index)
}

impl ModelReader for SnapshotStore {
    fn instances_of(&self, category: Category) -> Result<Vec<ElementId>, ModelError> {
        Ok(self
            .snapshot
            .elements
            .iter()
            .filter(|e| e.category.as_deref() == Some(category.name()))
            .map(|e| e.id)
            .collect())
    }

    fn element(&self, id: ElementId) -> Result<Option<ElementInfo>, ModelError> {
        Ok(self.element_record(id).map(|e| ElementInfo {
            id: e.id,
            category: e.category.clone(),
            type_id: e.type_id,
        }))
    }

    fn element_type(&self, id: ElementId) -> Result<Option<ElementType>, ModelError> {
        Ok(self.type_record(id).map(|t| ElementType {
            id: t.id,
            family_name: t.family_name.clone(),
            name: t.name.clone(),
        }))
    }

    fn parameter(&self, id: ElementId, name: &str) -> Result<Option<Parameter>, ModelError> {
        if let Some(e) = self.element_record(id) {
            return Ok(e.parameters.get(name).cloned());
        }
        if let Some(t) = self.type_record(id) {
            return Ok(t.parameters.get(name).cloned());
        }
        Err(ModelError::ElementNotFound(id))
    }

    fn builtin_parameter(
        &self,
        id: ElementId,
        param: BuiltInParam,
    ) -> Result<Option<Parameter>, ModelError> {
        Ok(self.require_element(id)?.builtin.get(&param).cloned())
    }

    fn geometry(&self, id: ElementId) -> Result<Option<Vec<GeometryObject>>, ModelError> {
        Ok(self.require_element(id)?.geometry.clone())
    }

    fn bounding_box(&self, id: ElementId) -> Result<Option<BoundingBox>, ModelError> {
        Ok(self.require_element(id)?.bounding_box)
    }

    fn location(&self, id: ElementId) -> Result<Location, ModelError> {
        Ok(self.require_element(id)?.location)
    }

    fn material_names(&self, id: ElementId) -> Result<Vec<String>, ModelError> {
        Ok(self
            .require_element(id)?
            .material_ids
            .iter()
            .filter_map(|m| self.materials.get(m))
            .map(|&i| self.snapshot.materials[i].name.clone())
            .collect())
    }
}

impl ModelWriter for SnapshotStore {
    fn begin_transaction(&mut self, name: &str) -> Result<(), ModelError> {
        if let Some((open, _)) = &self.pending {
            return Err(ModelError::TransactionOpen(open.clone()));
        }
        self.pending = Some((name.to_string(), self.snapshot.elements.clone()));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ModelError> {
        let (name, before) = self.pending.take().ok_or(ModelError::NoTransaction)?;
        if let Some(path) = &self.path
            && let Err(e) = self.save_to(path)
        {
            // Keep the transaction open so the caller can still roll back.
            self.pending = Some((name.clone(), before));
            return Err(ModelError::Other(format!("commit '{name}': {e}")));
        }
        info!(transaction = %name, "committed");
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), ModelError> {
        let (name, before) = self.pending.take().ok_or(ModelError::NoTransaction)?;
        self.snapshot.elements = before;
        debug!(transaction = %name, "rolled back");
        Ok(())
    }

    fn set_text_parameter(
        &mut self,
        id: ElementId,
        name: &str,
        value: &str,
    ) -> Result<(), ModelError> {
        if self.pending.is_none() {
            return Err(ModelError::NoTransaction);
        }
        let index = *self
            .elements
            .get(&id)
            .ok_or(ModelError::ElementNotFound(id))?;
        let param = self.snapshot.elements[index]
            .parameters
            .get_mut(name)
            .ok_or_else(|| ModelError::ParameterNotFound {
                element: id,
                name: name.to_string(),
            })?;
        if param.read_only {
            return Err(ModelError::ReadOnly {
                element: id,
                name: name.to_string(),
            });
        }
        if !matches!(param.value, ParamValue::Text(_)) {
            return Err(ModelError::StorageMismatch {
                element: id,
                name: name.to_string(),
            });
        }
        param.value = ParamValue::Text(value.to_string());
        param.display = None;
        Ok(())
    }
}
