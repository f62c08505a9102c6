//! The single dispatch point from engine tokens to typed wrappers.
//!
//! Every geometry-producing operation in the crate funnels its result token
//! through [`geom_factory`]; nothing else decides a wrapper's concrete kind.

use crate::datatypes::GeometryType;
use crate::engine::{Engine, RawGeometry};
use crate::error::{GeoShellError, Result};

use super::Geometry;

/// Canonical type name of the referent, or [`GeoShellError::InvalidGeometry`]
/// for a null reference.
pub fn geometry_type_name(engine: &Engine, raw: Option<RawGeometry>) -> Result<&'static str> {
    let raw = raw.ok_or_else(|| {
        GeoShellError::InvalidGeometry("null geometry reference has no type".to_string())
    })?;
    let kind = GeometryType::from_tag(engine.type_tag(raw)?)?;
    Ok(kind.name())
}

/// Wraps an engine token in an owning [`Geometry`] of the matching kind.
///
/// A `None` input fails with [`GeoShellError::InvalidGeometry`]: operations
/// that can produce nothing must surface that before a wrapper exists. The
/// returned wrapper owns the allocation and releases it on drop.
pub fn geom_factory(engine: &Engine, raw: Option<RawGeometry>) -> Result<Geometry> {
    let raw = raw.ok_or_else(|| {
        GeoShellError::InvalidGeometry("cannot wrap a null geometry reference".to_string())
    })?;
    let kind = GeometryType::from_tag(engine.type_tag(raw)?)?;
    let mut geometry = Geometry::shell(engine.clone(), kind);
    geometry.install(raw, true);
    Ok(geometry)
}
