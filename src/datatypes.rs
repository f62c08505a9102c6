//! Fixed registry of geometry kinds.
//!
//! The engine reports concrete types as integer tags; this module owns the
//! closed, process-wide mapping from tag to canonical type name and back. The
//! table is positional and read-only: tag `n` is `GEOMETRY_TYPES[n]`.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{GeoShellError, Result};

/// Canonical geometry type names, indexed by engine type tag.
pub const GEOMETRY_TYPES: [&str; 8] = [
    "Point",
    "LineString",
    "LinearRing",
    "Polygon",
    "MultiPoint",
    "MultiLineString",
    "MultiPolygon",
    "GeometryCollection",
];

/// Concrete kind of a wrapped geometry.
///
/// The discriminants are the engine's type tags and must not be reordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum GeometryType {
    Point = 0,
    LineString = 1,
    LinearRing = 2,
    Polygon = 3,
    MultiPoint = 4,
    MultiLineString = 5,
    MultiPolygon = 6,
    GeometryCollection = 7,
}

impl GeometryType {
    /// Resolves an engine-reported tag against the registry.
    ///
    /// An out-of-range tag means the engine broke its contract; this is
    /// surfaced as [`GeoShellError::EngineInvariantViolation`], never mapped
    /// to a guessed kind.
    pub fn from_tag(tag: u32) -> Result<Self> {
        Self::try_from(tag).map_err(|_| {
            GeoShellError::EngineInvariantViolation(format!(
                "engine reported unknown geometry type tag {tag}"
            ))
        })
    }

    /// Canonical name, e.g. `"Point"`.
    pub fn name(&self) -> &'static str {
        GEOMETRY_TYPES[u32::from(*self) as usize]
    }

    /// True for kinds composed of indexed child geometries.
    pub fn is_multi_part(&self) -> bool {
        matches!(
            self,
            GeometryType::MultiPoint
                | GeometryType::MultiLineString
                | GeometryType::MultiPolygon
                | GeometryType::GeometryCollection
        )
    }

    /// Declared element kind of a homogeneous multi-part geometry.
    ///
    /// `None` for single-part kinds and for `GeometryCollection`, whose
    /// elements vary per index.
    pub fn element_type(&self) -> Option<GeometryType> {
        match self {
            GeometryType::MultiPoint => Some(GeometryType::Point),
            GeometryType::MultiLineString => Some(GeometryType::LineString),
            GeometryType::MultiPolygon => Some(GeometryType::Polygon),
            _ => None,
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
