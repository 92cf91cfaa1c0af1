//! Scanned element categories and the category → structural-flag dispatch.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::BuiltInParam;

/// Element categories the extractor knows how to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Walls,
    Floors,
    Roofs,
    StructuralColumns,
    StructuralFraming,
    Columns,
    Doors,
    Windows,
    CurtainPanels,
    Stairs,
    StructuralFoundations,
}

impl Category {
    /// Default scan order; record order follows it.
    pub const SCAN_ORDER: [Category; 11] = [
        Category::Walls,
        Category::Floors,
        Category::Roofs,
        Category::StructuralColumns,
        Category::StructuralFraming,
        Category::Columns,
        Category::Doors,
        Category::Windows,
        Category::CurtainPanels,
        Category::Stairs,
        Category::StructuralFoundations,
    ];

    /// Display name as the model store reports it on elements.
    pub fn name(self) -> &'static str {
        match self {
            Self::Walls => "Walls",
            Self::Floors => "Floors",
            Self::Roofs => "Roofs",
            Self::StructuralColumns => "Structural Columns",
            Self::StructuralFraming => "Structural Framing",
            Self::Columns => "Columns",
            Self::Doors => "Doors",
            Self::Windows => "Windows",
            Self::CurtainPanels => "Curtain Panels",
            Self::Stairs => "Stairs",
            Self::StructuralFoundations => "Structural Foundations",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
#[error("unknown category '{0}'")]
pub struct ParseCategoryError(String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    /// Accepts display names case-insensitively, with `-` or `_` in place of spaces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', '_'], " ").to_lowercase();
        Self::SCAN_ORDER
            .into_iter()
            .find(|c| c.name().to_lowercase() == wanted)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

/// Categories whose structural significance is recorded in a boolean parameter.
const STRUCTURAL_FLAGS: &[(&str, BuiltInParam)] = &[
    ("Walls", BuiltInParam::WallStructuralSignificant),
    ("Floors", BuiltInParam::FloorParamIsStructural),
];

/// The parameter that flags structural significance for a category name, if any.
pub fn structural_flag(category_name: &str) -> Option<BuiltInParam> {
    STRUCTURAL_FLAGS
        .iter()
        .find(|(name, _)| *name == category_name)
        .map(|&(_, param)| param)
}

/// Load-bearing status written to the `load_bearing_status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBearing {
    LoadBearing,
    NonLoadBearing,
    /// Category has no structural flag, or the flag could not be read.
    NotApplicable,
}

impl LoadBearing {
    /// Status from the flag value; anything but `1` is non load-bearing.
    pub fn from_flag(flag: Option<i64>) -> Self {
        if flag == Some(1) {
            Self::LoadBearing
        } else {
            Self::NonLoadBearing
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoadBearing => "Load-Bearing",
            Self::NonLoadBearing => "Non Load-Bearing",
            Self::NotApplicable => crate::SENTINEL,
        }
    }
}
