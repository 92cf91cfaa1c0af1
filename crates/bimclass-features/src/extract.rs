//! Feature extraction: one canonical record per element instance.
//!
//! Walks the configured categories in order and derives every field of
//! [`schema::FIELDS`] for each instance. A field whose source is missing,
//! non-numeric, or whose store query fails is set to the sentinel; only a
//! failure to enumerate a category aborts extraction.

use std::collections::{HashMap, HashSet};

use bimclass_core::category::structural_flag;
use bimclass_core::schema::{self, fields};
use bimclass_core::units::{
    CU_FEET_TO_CU_METERS, FEET_TO_METERS, SQ_FEET_TO_SQ_METERS, format_number, format_optional,
    format_text,
};
use bimclass_core::{
    BoundingBox, BuiltInParam, Category, ElementId, ElementInfo, ElementType, FeatureRecord,
    FeatureRecordSet, GeometryObject, LoadBearing, Location, ModelError, ModelReader, Point3,
    SENTINEL,
};
use tracing::{debug, info};

/// Which categories to scan, in scan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionConfig {
    pub categories: Vec<Category>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            categories: Category::SCAN_ORDER.to_vec(),
        }
    }
}

impl ExtractionConfig {
    /// Scan `categories`, or the default list when empty.
    pub fn with_categories(categories: Vec<Category>) -> Self {
        if categories.is_empty() {
            Self::default()
        } else {
            Self { categories }
        }
    }
}

/// Topology of a curve-located element's driving curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curvature {
    Cyclic,
    Bound,
    Unbound,
}

impl Curvature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cyclic => "Cyclic",
            Self::Bound => "Bound",
            Self::Unbound => "Unbound",
        }
    }
}

/// Extract a record for every instance of every configured category.
pub fn extract<R: ModelReader + ?Sized>(
    model: &R,
    config: &ExtractionConfig,
) -> Result<FeatureRecordSet, ModelError> {
    let mut records = FeatureRecordSet::new();

    for &category in &config.categories {
        let ids = model.instances_of(category)?;
        let mut skipped = 0usize;
        for &id in &ids {
            match extract_element(model, id) {
                Some(record) => records.push(record),
                None => {
                    skipped += 1;
                    debug!(element = %id, category = %category, "no resolvable type, skipped");
                }
            }
        }
        info!(
            category = %category,
            count = ids.len() - skipped,
            skipped,
            "extracted category"
        );
    }

    info!(count = records.len(), "extraction complete");
    Ok(records)
}

/// Record for one element, or `None` when its type cannot be resolved.
pub fn extract_element<R: ModelReader + ?Sized>(model: &R, id: ElementId) -> Option<FeatureRecord> {
    let info = model.element(id).ok().flatten()?;
    let ty = model.element_type(info.type_id?).ok().flatten()?;

    let mut values = ElementFeatures::new(model, &info, &ty).compute();
    Some(FeatureRecord::from_fields(schema::FIELDS, |name| {
        values
            .remove(name)
            .unwrap_or_else(|| SENTINEL.to_string())
    }))
}

struct ElementFeatures<'a, R: ModelReader + ?Sized> {
    model: &'a R,
    info: &'a ElementInfo,
    ty: &'a ElementType,
    values: HashMap<&'static str, String>,
}

impl<'a, R: ModelReader + ?Sized> ElementFeatures<'a, R> {
    fn new(model: &'a R, info: &'a ElementInfo, ty: &'a ElementType) -> Self {
        Self {
            model,
            info,
            ty,
            values: HashMap::with_capacity(schema::FIELDS.len()),
        }
    }

    fn compute(mut self) -> HashMap<&'static str, String> {
        self.identity();
        self.measures();
        self.named_parameters();
        self.bounding_box();
        self.geometry();
        self.location();
        self.materials();
        self.values
    }

    fn set(&mut self, field: &'static str, value: String) {
        self.values.insert(field, value);
    }

    fn identity(&mut self) {
        let family_and_type = format!("{} - {}", self.ty.family_name, self.ty.name);
        self.set(fields::ELEMENT_ID, self.info.id.to_string());
        self.set(fields::FAMILY_AND_TYPE, format_text(Some(family_and_type.as_str())));
        self.set(fields::CATEGORY, format_text(self.info.category.as_deref()));
        self.set(
            fields::LOAD_BEARING_STATUS,
            load_bearing(self.model, self.info).as_str().to_string(),
        );
    }

    fn measures(&mut self) {
        let id = self.info.id;
        let volume = builtin_double(self.model, id, BuiltInParam::HostVolumeComputed);
        let area = builtin_double(self.model, id, BuiltInParam::HostAreaComputed);
        let length = builtin_double(self.model, id, BuiltInParam::CurveElemLength);
        self.set(fields::VOLUME, scaled(volume, CU_FEET_TO_CU_METERS));
        self.set(fields::AREA, scaled(area, SQ_FEET_TO_SQ_METERS));
        self.set(fields::LENGTH, scaled(length, FEET_TO_METERS));

        let height = first_numeric(self.model, id, self.ty.id, schema::HEIGHT_CANDIDATES);
        let width = first_numeric(self.model, id, self.ty.id, schema::WIDTH_CANDIDATES);
        self.set(fields::HEIGHT, scaled(height, FEET_TO_METERS));
        self.set(fields::THICKNESS_WIDTH, scaled(width, FEET_TO_METERS));
    }

    fn named_parameters(&mut self) {
        for &(field, name) in schema::INSTANCE_TEXT_FIELDS {
            let value = display_string(self.model, self.info.id, name);
            self.set(field, format_text(value.as_deref()));
        }
        for &(field, name) in schema::TYPE_TEXT_FIELDS {
            let value = display_string(self.model, self.ty.id, name);
            self.set(field, format_text(value.as_deref()));
        }
        for &(field, name) in schema::INSTANCE_LENGTH_FIELDS {
            let value = named_double(self.model, self.info.id, name);
            self.set(field, scaled(value, FEET_TO_METERS));
        }
    }

    fn bounding_box(&mut self) {
        let bbox = self.model.bounding_box(self.info.id).ok().flatten();
        let dim = |f: fn(&BoundingBox) -> f64, factor: f64| {
            format_optional(bbox.as_ref().map(|b| f(b) * factor))
        };
        self.set(fields::BOUNDING_BOX_WIDTH, dim(BoundingBox::dx, FEET_TO_METERS));
        self.set(fields::BOUNDING_BOX_DEPTH, dim(BoundingBox::dy, FEET_TO_METERS));
        self.set(fields::BOUNDING_BOX_HEIGHT, dim(BoundingBox::dz, FEET_TO_METERS));
        self.set(
            fields::TOTAL_SURFACE_AREA,
            dim(|b: &BoundingBox| b.dx() * b.dy(), SQ_FEET_TO_SQ_METERS),
        );
    }

    fn geometry(&mut self) {
        let geometry = self.model.geometry(self.info.id).ok().flatten();
        let geometry = geometry.as_deref().unwrap_or_default();

        let centroid = first_solid_centroid(geometry);
        let [x, y, z] = point_fields(centroid);
        self.set(fields::CENTROID_X, x);
        self.set(fields::CENTROID_Y, y);
        self.set(fields::CENTROID_Z, z);

        let faces = face_count(geometry);
        let faces = if faces > 0 {
            faces.to_string()
        } else {
            SENTINEL.to_string()
        };
        self.set(fields::NUMBER_OF_FACES, faces);
    }

    fn location(&mut self) {
        let location = self.model.location(self.info.id).unwrap_or_default();
        let (start, end) = match location {
            Location::Point(p) => (Some(p), None),
            Location::Curve(c) => (Some(c.start), Some(c.end)),
            Location::None => (None, None),
        };

        let [sx, sy, sz] = point_fields(start);
        let [ex, ey, ez] = point_fields(end);
        self.set(fields::START_X, sx);
        self.set(fields::START_Y, sy);
        self.set(fields::START_Z, sz);
        self.set(fields::END_X, ex);
        self.set(fields::END_Y, ey);
        self.set(fields::END_Z, ez);

        self.set(
            fields::ORIENTATION_ANGLE,
            format_optional(orientation_angle(&location)),
        );
        self.set(
            fields::CURVATURE,
            curvature(&location).map_or_else(|| SENTINEL.to_string(), |c| c.as_str().to_string()),
        );
    }

    fn materials(&mut self) {
        let names = self.model.material_names(self.info.id).unwrap_or_default();
        let mut seen = HashSet::new();
        // Names are kept as the model stores them; only blank ones are dropped.
        let joined = names
            .iter()
            .map(String::as_str)
            .filter(|n| !n.trim().is_empty() && seen.insert(*n))
            .collect::<Vec<_>>()
            .join(" | ");
        self.set(fields::MATERIALS, format_text(Some(joined.as_str())));
    }
}

fn scaled(value: Option<f64>, factor: f64) -> String {
    format_optional(value.map(|v| v * factor))
}

fn builtin_double<R: ModelReader + ?Sized>(
    model: &R,
    id: ElementId,
    param: BuiltInParam,
) -> Option<f64> {
    model
        .builtin_parameter(id, param)
        .ok()
        .flatten()
        .and_then(|p| p.as_double())
}

fn named_double<R: ModelReader + ?Sized>(model: &R, id: ElementId, name: &str) -> Option<f64> {
    model
        .parameter(id, name)
        .ok()
        .flatten()
        .and_then(|p| p.as_double())
}

fn display_string<R: ModelReader + ?Sized>(model: &R, id: ElementId, name: &str) -> Option<String> {
    model
        .parameter(id, name)
        .ok()
        .flatten()
        .and_then(|p| p.value_string())
}

/// First numeric candidate, each name tried on the instance before the type.
fn first_numeric<R: ModelReader + ?Sized>(
    model: &R,
    instance: ElementId,
    ty: ElementId,
    candidates: &[&str],
) -> Option<f64> {
    candidates.iter().find_map(|name| {
        named_double(model, instance, name).or_else(|| named_double(model, ty, name))
    })
}

fn load_bearing<R: ModelReader + ?Sized>(model: &R, info: &ElementInfo) -> LoadBearing {
    let Some(param) = info.category.as_deref().and_then(structural_flag) else {
        return LoadBearing::NotApplicable;
    };
    match model.builtin_parameter(info.id, param) {
        Ok(p) => LoadBearing::from_flag(p.and_then(|p| p.as_integer())),
        Err(_) => LoadBearing::NotApplicable,
    }
}

/// Centroid of the first top-level solid with positive volume.
pub fn first_solid_centroid(geometry: &[GeometryObject]) -> Option<Point3> {
    geometry.iter().find_map(|g| match g {
        GeometryObject::Solid(s) if s.volume > 0.0 => Some(s.centroid),
        _ => None,
    })
}

/// Faces of top-level solids plus solids one instance level down.
pub fn face_count(geometry: &[GeometryObject]) -> usize {
    geometry
        .iter()
        .map(|g| match g {
            GeometryObject::Solid(s) => s.face_count,
            GeometryObject::Instance(children) => children
                .iter()
                .map(|c| match c {
                    GeometryObject::Solid(s) => s.face_count,
                    GeometryObject::Instance(_) => 0,
                })
                .sum(),
        })
        .sum()
}

/// Plan angle of a curve's direction in degrees, from +X towards +Y.
pub fn orientation_angle(location: &Location) -> Option<f64> {
    let Location::Curve(curve) = location else {
        return None;
    };
    let (dx, dy, dz) = (
        curve.end.x - curve.start.x,
        curve.end.y - curve.start.y,
        curve.end.z - curve.start.z,
    );
    let len = (dx * dx + dy * dy + dz * dz).sqrt();
    if len == 0.0 || !len.is_finite() {
        return None;
    }
    Some((dy / len).atan2(dx / len).to_degrees())
}

pub fn curvature(location: &Location) -> Option<Curvature> {
    match location {
        Location::Curve(c) if c.is_cyclic => Some(Curvature::Cyclic),
        Location::Curve(c) if c.is_bound => Some(Curvature::Bound),
        Location::Curve(_) => Some(Curvature::Unbound),
        _ => None,
    }
}

fn point_fields(point: Option<Point3>) -> [String; 3] {
    match point {
        Some(p) => [p.x, p.y, p.z].map(|v| format_number(v * FEET_TO_METERS)),
        None => [SENTINEL, SENTINEL, SENTINEL].map(String::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimclass_core::{CurveLocation, Parameter, Solid};
    use bimclass_store::{ElementRecord, MaterialRecord, ModelSnapshot, SnapshotStore, TypeRecord};

    fn solid(volume: f64, faces: usize, centroid: Point3) -> GeometryObject {
        GeometryObject::Solid(Solid {
            volume,
            face_count: faces,
            centroid,
        })
    }

    fn wall() -> ElementRecord {
        ElementRecord::new(101, Category::Walls)
            .with_type(201)
            .with_builtin(BuiltInParam::CurveElemLength, Parameter::double(10.0))
            .with_builtin(BuiltInParam::HostAreaComputed, Parameter::double(100.0))
            .with_builtin(BuiltInParam::HostVolumeComputed, Parameter::double(50.0))
            .with_builtin(BuiltInParam::WallStructuralSignificant, Parameter::integer(1))
            .with_parameter("Unconnected Height", Parameter::double(10.0))
            .with_parameter(
                "Base Constraint",
                Parameter::element(ElementId(9)).with_display("PISO 1"),
            )
            .with_parameter("Base Offset", Parameter::double(-1.0))
            .with_parameter("Comments", Parameter::text(""))
            .with_location(Location::Curve(CurveLocation {
                start: Point3::new(0.0, 0.0, 0.0),
                end: Point3::new(10.0, 10.0, 0.0),
                is_cyclic: false,
                is_bound: true,
            }))
            .with_bounding_box(BoundingBox::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(10.0, 2.0, 10.0),
            ))
            .with_geometry(vec![
                solid(0.0, 2, Point3::new(9.0, 9.0, 9.0)),
                solid(50.0, 6, Point3::new(5.0, 1.0, 5.0)),
                GeometryObject::Instance(vec![
                    solid(1.0, 4, Point3::default()),
                    GeometryObject::Instance(vec![solid(1.0, 100, Point3::default())]),
                ]),
            ])
            .with_materials(&[301, 302, 303, 304, 305])
    }

    fn snapshot() -> ModelSnapshot {
        ModelSnapshot {
            elements: vec![
                wall(),
                ElementRecord::new(102, Category::Doors)
                    .with_type(202)
                    .with_location(Location::Point(Point3::new(1.0, 2.0, 0.0))),
                // No type definition: skipped.
                ElementRecord::new(103, Category::Walls),
                ElementRecord::new(104, Category::Floors)
                    .with_type(203)
                    .with_builtin(BuiltInParam::FloorParamIsStructural, Parameter::integer(0)),
                ElementRecord::new(105, Category::Walls).with_type(201),
            ],
            types: vec![
                TypeRecord::new(201, "Basic Wall", "Generic - 200mm")
                    .with_parameter("Width", Parameter::double(0.5))
                    .with_parameter("ClassificacaoSecclassSsNumero", Parameter::text("Ss_25_10")),
                TypeRecord::new(202, "Single-Flush", "0915 x 2134mm")
                    .with_parameter("Width", Parameter::text("wide"))
                    .with_parameter("Thickness", Parameter::double(0.25)),
                TypeRecord::new(203, "Floor", "Generic 150mm"),
            ],
            materials: vec![
                MaterialRecord::new(301, "Concrete"),
                MaterialRecord::new(302, " "),
                MaterialRecord::new(303, "Concrete"),
                MaterialRecord::new(304, "Plaster"),
                MaterialRecord::new(305, " Gypsum Board "),
            ],
        }
    }

    fn store() -> SnapshotStore {
        SnapshotStore::from_snapshot(snapshot()).unwrap()
    }

    fn record(id: i64) -> FeatureRecord {
        extract_element(&store(), ElementId(id)).unwrap()
    }

    fn m(native: f64) -> String {
        format_number(native * FEET_TO_METERS)
    }

    #[test]
    fn scan_follows_category_order_and_skips_untyped() {
        let records = extract(&store(), &ExtractionConfig::default()).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.get("ElementID").unwrap()).collect();
        // Walls (101, 105), then Floors (104), then Doors (102).
        assert_eq!(ids, ["101", "105", "104", "102"]);
    }

    #[test]
    fn every_record_has_the_full_schema_in_order() {
        let records = extract(&store(), &ExtractionConfig::default()).unwrap();
        for r in records.iter() {
            assert_eq!(r.keys().collect::<Vec<_>>(), schema::FIELDS);
            assert!(r.iter().all(|(_, v)| !v.is_empty()));
        }
    }

    #[test]
    fn category_subset_is_respected() {
        let config = ExtractionConfig::with_categories(vec![Category::Doors]);
        let records = extract(&store(), &config).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records.first().unwrap().get("Category"), Some("Doors"));
    }

    #[test]
    fn identity_fields() {
        let r = record(101);
        assert_eq!(r.get("ElementID"), Some("101"));
        assert_eq!(r.get("Family and Type"), Some("Basic Wall - Generic - 200mm"));
        assert_eq!(r.get("Category"), Some("Walls"));
        assert_eq!(r.get("SECClasS_Code_Ss"), Some("Ss_25_10"));
        assert_eq!(r.get("SECClass_Code_EF"), Some("None"));
    }

    #[test]
    fn measures_convert_to_metric() {
        let r = record(101);
        assert_eq!(r.get("Length"), Some((10.0_f64 * 0.3048).to_string().as_str()));
        assert_eq!(r.get("Area"), Some(format_number(100.0 * 0.092903).as_str()));
        assert_eq!(r.get("Volume"), Some(format_number(50.0 * 0.0283168).as_str()));
        assert_eq!(r.get("Height"), Some(m(10.0).as_str()));
        assert_eq!(r.get("Thickness/Width"), Some(m(0.5).as_str()));
        assert_eq!(r.get("Base_offset"), Some(m(-1.0).as_str()));
        assert_eq!(r.get("Top_offset"), Some("None"));
    }

    #[test]
    fn missing_parameters_are_sentinel() {
        let r = record(105);
        for field in ["Volume", "Area", "Length", "Height", "Base_constraint", "Level"] {
            assert_eq!(r.get(field), Some("None"), "{field}");
        }
        assert_eq!(r.get("Comments"), Some("None"));
        assert_eq!(r.get("Materials"), Some("None"));
    }

    #[test]
    fn reserved_fields_are_always_sentinel() {
        let r = record(101);
        for field in ["Volume_to_Surface_Area_Ratio", "Aspect_Ratio", "Total_Edge_Length"] {
            assert_eq!(r.get(field), Some("None"));
        }
    }

    #[test]
    fn width_falls_through_non_numeric_candidates() {
        // Type 202 has a text "Width", so "Thickness" wins.
        assert_eq!(record(102).get("Thickness/Width"), Some(m(0.25).as_str()));
    }

    #[test]
    fn display_strings_used_for_references() {
        assert_eq!(record(101).get("Base_constraint"), Some("PISO 1"));
    }

    #[test]
    fn load_bearing_status_by_category() {
        assert_eq!(record(101).get("load_bearing_status"), Some("Load-Bearing"));
        assert_eq!(record(105).get("load_bearing_status"), Some("Non Load-Bearing"));
        assert_eq!(record(104).get("load_bearing_status"), Some("Non Load-Bearing"));
        assert_eq!(record(102).get("load_bearing_status"), Some("None"));
    }

    #[test]
    fn curve_location_fields() {
        let r = record(101);
        assert_eq!(r.get("Start_X"), Some("0"));
        assert_eq!(r.get("End_X"), Some(m(10.0).as_str()));
        assert_eq!(r.get("End_Y"), Some(m(10.0).as_str()));
        let diagonal = format_number(1.0_f64.atan2(1.0).to_degrees());
        assert_eq!(r.get("Orientation_Angle"), Some(diagonal.as_str()));
        assert_eq!(r.get("Curvature"), Some("Bound"));
    }

    #[test]
    fn point_location_fields() {
        let r = record(102);
        assert_eq!(r.get("Start_X"), Some(m(1.0).as_str()));
        assert_eq!(r.get("Start_Y"), Some(m(2.0).as_str()));
        for field in ["End_X", "End_Y", "End_Z", "Orientation_Angle", "Curvature"] {
            assert_eq!(r.get(field), Some("None"), "{field}");
        }
    }

    #[test]
    fn bounding_box_fields() {
        let r = record(101);
        assert_eq!(r.get("Bounding_Box_Width"), Some(m(10.0).as_str()));
        assert_eq!(r.get("Bounding_Box_Depth"), Some(m(2.0).as_str()));
        assert_eq!(r.get("Bounding_Box_Height"), Some(m(10.0).as_str()));
        assert_eq!(
            r.get("Total_Surface_Area"),
            Some(format_number(20.0 * 0.092903).as_str())
        );
        assert_eq!(record(105).get("Bounding_Box_Width"), Some("None"));
    }

    #[test]
    fn geometry_fields() {
        let r = record(101);
        // First positive-volume solid, not the empty one before it.
        assert_eq!(r.get("Centroid_X"), Some(m(5.0).as_str()));
        assert_eq!(r.get("Centroid_Y"), Some(m(1.0).as_str()));
        // 2 + 6 at top level, 4 one instance down; deeper levels ignored.
        assert_eq!(r.get("Number_of_Faces"), Some("12"));
        assert_eq!(record(105).get("Number_of_Faces"), Some("None"));
        assert_eq!(record(105).get("Centroid_X"), Some("None"));
    }

    #[test]
    fn materials_deduplicated_and_blank_filtered() {
        assert_eq!(
            record(101).get("Materials"),
            Some("Concrete | Plaster |  Gypsum Board ")
        );
    }

    #[test]
    fn orientation_of_degenerate_curve_is_unavailable() {
        let loc = Location::Curve(CurveLocation {
            start: Point3::new(1.0, 1.0, 0.0),
            end: Point3::new(1.0, 1.0, 0.0),
            is_cyclic: false,
            is_bound: true,
        });
        assert_eq!(orientation_angle(&loc), None);
    }

    #[test]
    fn curvature_flags() {
        let mut c = CurveLocation {
            start: Point3::default(),
            end: Point3::new(1.0, 0.0, 0.0),
            is_cyclic: true,
            is_bound: true,
        };
        assert_eq!(curvature(&Location::Curve(c)), Some(Curvature::Cyclic));
        c.is_cyclic = false;
        assert_eq!(curvature(&Location::Curve(c)), Some(Curvature::Bound));
        c.is_bound = false;
        assert_eq!(curvature(&Location::Curve(c)), Some(Curvature::Unbound));
        assert_eq!(curvature(&Location::None), None);
    }

    #[test]
    fn extraction_is_deterministic() {
        let a = extract(&store(), &ExtractionConfig::default()).unwrap();
        let b = extract(&store(), &ExtractionConfig::default()).unwrap();
        assert_eq!(a, b);
    }
}
