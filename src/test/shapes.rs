//! Canonical geometries used across test modules.
//!
//! Every helper takes the engine so tests can keep release accounting
//! observable on a private backend instance.

use crate::engine::Engine;
use crate::geometry::Geometry;

pub(crate) fn point(engine: &Engine) -> Geometry {
    Geometry::from_wkt(engine, "POINT (1 2)").unwrap()
}

pub(crate) fn open_line(engine: &Engine) -> Geometry {
    Geometry::from_wkt(engine, "LINESTRING (0 0, 4 0, 4 3)").unwrap()
}

pub(crate) fn unit_square(engine: &Engine) -> Geometry {
    Geometry::from_wkt(engine, "POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap()
}

pub(crate) fn multi_point(engine: &Engine) -> Geometry {
    Geometry::from_wkt(engine, "MULTIPOINT (0 0, 1 1, 2 4)").unwrap()
}

pub(crate) fn collection(engine: &Engine) -> Geometry {
    Geometry::from_wkt(
        engine,
        "GEOMETRYCOLLECTION (POINT (3 4), LINESTRING (0 0, 2 0))",
    )
    .unwrap()
}
