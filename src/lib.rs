//! Typed geometry handles and operation dispatch over a swappable 2D
//! geometry engine.
//!
//! The crate splits responsibility three ways:
//!
//! - [`engine`] defines the operation table ([`GeometryEngine`]) and opaque
//!   [`RawGeometry`] tokens, plus the default backend built on the pure-Rust
//!   `geo` crate.
//! - [`datatypes`] owns the closed registry mapping engine type tags to
//!   canonical geometry kind names.
//! - [`geometry`] provides the user-facing [`Geometry`] wrapper: an
//!   ownership-tracked handle with null guards, boolean predicates, and
//!   re-synchronizing coordinate and part sequence views.
//!
//! # Examples
//!
//! ```
//! use geoshell::{GeoEngine, Geometry};
//!
//! let engine = GeoEngine::new_engine();
//! let line = Geometry::from_wkt(&engine, "LINESTRING (0 0, 10 0)")?;
//! let midpoint = line.interpolate(0.5, true)?;
//! assert_eq!(midpoint.geom_type()?, "Point");
//! assert_eq!(line.project(&midpoint, false)?, 5.0);
//! # Ok::<(), geoshell::GeoShellError>(())
//! ```

#![cfg_attr(not(test), deny(unused_crate_dependencies))]

pub mod datatypes;
pub mod engine;
pub mod error;
pub mod geometry;

#[cfg(test)]
pub(crate) mod test;

pub use datatypes::{GeometryType, GEOMETRY_TYPES};
pub use engine::{default_engine, Engine, GeoEngine, GeometryEngine, PartPath, RawGeometry};
pub use error::{GeoShellError, Result};
pub use geometry::{
    geom_factory, geometry_type_name, ArrayInterface, CoordSeq, Geometry, Handle,
    MixedPartSequence, PartSequence,
};
