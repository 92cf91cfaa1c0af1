//! The canonical feature record: its ordered field names and the parameter
//! lookup tables that fill them.

/// Field names of the canonical feature record, grouped by concern.
pub mod fields {
    // Identity
    pub const ELEMENT_ID: &str = "ElementID";
    pub const FAMILY_AND_TYPE: &str = "Family and Type";
    pub const CATEGORY: &str = "Category";

    // Classification placeholders, read from the type definition
    pub const SECCLASS_CODE_EF: &str = "SECClass_Code_EF";
    pub const SECCLASS_TITLE_EF: &str = "SECClass_Title_EF";
    pub const SECCLASS_CODE_SS: &str = "SECClasS_Code_Ss";
    pub const SECCLASS_TITLE_SS: &str = "SECClasS_Title_Ss";
    pub const SECCLASS_CODE_PR: &str = "SECClass_Code_Pr";
    pub const SECCLASS_TITLE_PR: &str = "SECClass_Title_Pr";

    // Physical measures
    pub const VOLUME: &str = "Volume";
    pub const AREA: &str = "Area";
    pub const VOLUME_TO_SURFACE_AREA_RATIO: &str = "Volume_to_Surface_Area_Ratio";
    pub const LOAD_BEARING_STATUS: &str = "load_bearing_status";
    pub const LENGTH: &str = "Length";
    pub const HEIGHT: &str = "Height";
    pub const THICKNESS_WIDTH: &str = "Thickness/Width";
    pub const ASPECT_RATIO: &str = "Aspect_Ratio";
    pub const TOTAL_SURFACE_AREA: &str = "Total_Surface_Area";
    pub const TOTAL_EDGE_LENGTH: &str = "Total_Edge_Length";

    // Constraints and levels
    pub const BASE_CONSTRAINT: &str = "Base_constraint";
    pub const TOP_CONSTRAINT: &str = "Top_constraint";
    pub const BASE_EXTENSION_DISTANCE: &str = "Base_extension_distance";
    pub const LEVEL: &str = "Level";
    pub const BASE_LEVEL: &str = "Base_level";
    pub const BASE_OFFSET: &str = "Base_offset";
    pub const TOP_LEVEL: &str = "Top_level";
    pub const TOP_OFFSET: &str = "Top_offset";
    pub const NUMBER_OF_FACES: &str = "Number_of_Faces";
    pub const PHASE_CREATED: &str = "Phase_Created";

    // Position
    pub const START_X: &str = "Start_X";
    pub const START_Y: &str = "Start_Y";
    pub const START_Z: &str = "Start_Z";
    pub const END_X: &str = "End_X";
    pub const END_Y: &str = "End_Y";
    pub const END_Z: &str = "End_Z";

    // Derived geometry
    pub const BOUNDING_BOX_WIDTH: &str = "Bounding_Box_Width";
    pub const BOUNDING_BOX_HEIGHT: &str = "Bounding_Box_Height";
    pub const BOUNDING_BOX_DEPTH: &str = "Bounding_Box_Depth";
    pub const CENTROID_X: &str = "Centroid_X";
    pub const CENTROID_Y: &str = "Centroid_Y";
    pub const CENTROID_Z: &str = "Centroid_Z";
    pub const ORIENTATION_ANGLE: &str = "Orientation_Angle";
    pub const CURVATURE: &str = "Curvature";

    // Annotation
    pub const COMMENTS: &str = "Comments";
    pub const KEYNOTE: &str = "Keynote";
    pub const DESCRIPTION: &str = "Description";
    pub const MATERIALS: &str = "Materials";
}

use fields::*;

/// Every feature record carries exactly these fields, in this order.
pub const FIELDS: [&str; 47] = [
    ELEMENT_ID,
    SECCLASS_CODE_EF,
    SECCLASS_TITLE_EF,
    SECCLASS_CODE_SS,
    SECCLASS_TITLE_SS,
    SECCLASS_CODE_PR,
    SECCLASS_TITLE_PR,
    FAMILY_AND_TYPE,
    CATEGORY,
    VOLUME,
    AREA,
    VOLUME_TO_SURFACE_AREA_RATIO,
    LOAD_BEARING_STATUS,
    LENGTH,
    HEIGHT,
    THICKNESS_WIDTH,
    ASPECT_RATIO,
    TOTAL_SURFACE_AREA,
    TOTAL_EDGE_LENGTH,
    BASE_CONSTRAINT,
    TOP_CONSTRAINT,
    BASE_EXTENSION_DISTANCE,
    LEVEL,
    BASE_LEVEL,
    BASE_OFFSET,
    TOP_LEVEL,
    TOP_OFFSET,
    NUMBER_OF_FACES,
    PHASE_CREATED,
    START_X,
    START_Y,
    START_Z,
    END_X,
    END_Y,
    END_Z,
    BOUNDING_BOX_WIDTH,
    BOUNDING_BOX_HEIGHT,
    BOUNDING_BOX_DEPTH,
    CENTROID_X,
    CENTROID_Y,
    CENTROID_Z,
    ORIENTATION_ANGLE,
    CURVATURE,
    COMMENTS,
    KEYNOTE,
    DESCRIPTION,
    MATERIALS,
];

/// Type-definition parameters that feed the classification placeholder fields.
pub const TYPE_TEXT_FIELDS: &[(&str, &str)] = &[
    (SECCLASS_CODE_EF, "ClassificacaoSecclassEFNumero"),
    (SECCLASS_TITLE_EF, "ClassificacaoSecclassEFDescricao"),
    (SECCLASS_CODE_SS, "ClassificacaoSecclassSsNumero"),
    (SECCLASS_TITLE_SS, "ClassificacaoSecclassSsDescricao"),
    (SECCLASS_CODE_PR, "ClassificacaoSecclassPrNumero"),
    (SECCLASS_TITLE_PR, "ClassificacaoSecclassPrDescricao"),
    (KEYNOTE, "Keynote"),
    (DESCRIPTION, "Description"),
];

/// Instance parameters copied as display text.
pub const INSTANCE_TEXT_FIELDS: &[(&str, &str)] = &[
    (BASE_CONSTRAINT, "Base Constraint"),
    (TOP_CONSTRAINT, "Top Constraint"),
    (LEVEL, "Level"),
    (BASE_LEVEL, "Base Level"),
    (TOP_LEVEL, "Top Level"),
    (PHASE_CREATED, "Phase Created"),
    (COMMENTS, "Comments"),
];

/// Instance length parameters, converted to meters.
pub const INSTANCE_LENGTH_FIELDS: &[(&str, &str)] = &[
    (BASE_EXTENSION_DISTANCE, "Base Extension Distance"),
    (BASE_OFFSET, "Base Offset"),
    (TOP_OFFSET, "Top Offset"),
];

/// Height candidates in priority order; first numeric match wins.
pub const HEIGHT_CANDIDATES: &[&str] = &["Height", "Unconnected Height", "Altura", "Head Height"];

/// Width/thickness candidates in priority order; first numeric match wins.
pub const WIDTH_CANDIDATES: &[&str] = &["Width", "Thickness"];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn fields_are_unique_and_start_with_id() {
        let unique: HashSet<&str> = FIELDS.iter().copied().collect();
        assert_eq!(unique.len(), FIELDS.len());
        assert_eq!(FIELDS[0], "ElementID");
        assert_eq!(FIELDS[FIELDS.len() - 1], "Materials");
    }

    #[test]
    fn parameter_tables_target_known_fields() {
        let known: HashSet<&str> = FIELDS.iter().copied().collect();
        for (field, _) in TYPE_TEXT_FIELDS
            .iter()
            .chain(INSTANCE_TEXT_FIELDS)
            .chain(INSTANCE_LENGTH_FIELDS)
        {
            assert!(known.contains(field), "{field} missing from FIELDS");
        }
    }
}
