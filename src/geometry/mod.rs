//! Typed geometry wrappers over engine tokens.
//!
//! A [`Geometry`] couples an ownership-tracked [`Handle`] with the concrete
//! [`GeometryType`] the factory resolved for it. All spatial behavior is
//! delegated through the engine's operation table; the wrapper contributes
//! the guard rails: null-handle checks, boolean coercion of the engine's
//! integer predicates, and routing of every produced token back through
//! [`geom_factory`].

use std::fmt;
use std::sync::Arc;

use crate::datatypes::GeometryType;
use crate::engine::{Engine, RawGeometry};
use crate::error::{GeoShellError, Result};

mod coords;
mod factory;
mod handle;
mod parts;

pub use coords::{ArrayInterface, CoordSeq};
pub use factory::{geom_factory, geometry_type_name};
pub use handle::Handle;
pub use parts::{MixedPartSequence, PartSequence};

/// Resolves a possibly-negative index against `len`, wrapping once from the
/// end. Anything out of range afterwards is an error carrying the index as
/// originally written.
pub(crate) fn resolve_index(index: isize, len: usize) -> Result<usize> {
    let adjusted = if index < 0 {
        // Checked: `index` may sit near `isize::MIN`, where plain addition
        // overflows.
        index.checked_add(len as isize)
    } else {
        Some(index)
    };
    match adjusted {
        Some(i) if i >= 0 && (i as usize) < len => Ok(i as usize),
        _ => Err(GeoShellError::IndexOutOfRange { index, len }),
    }
}

/// A typed handle on one engine geometry.
///
/// Wrappers produced by the factory own their allocation and release it on
/// drop; children handed out by part sequences alias their parent's storage
/// and do not. A wrapper can also be null (no handle installed), in which
/// case every operation fails with [`GeoShellError::NullGeometry`] naming
/// the operation.
///
/// # Examples
///
/// ```
/// use geoshell::{GeoEngine, Geometry};
///
/// let engine = GeoEngine::new_engine();
/// let square = Geometry::from_wkt(&engine, "POLYGON ((0 0, 2 0, 2 2, 0 2, 0 0))")?;
/// assert_eq!(square.geom_type()?, "Polygon");
/// assert_eq!(square.area()?, 4.0);
/// assert!(square.contains(&square.centroid()?)?);
/// # Ok::<(), geoshell::GeoShellError>(())
/// ```
#[derive(Debug)]
pub struct Geometry {
    handle: Handle,
    kind: GeometryType,
    crs: Option<String>,
}

impl Geometry {
    /// Blank wrapper of a declared kind with no handle installed.
    pub(crate) fn shell(engine: Engine, kind: GeometryType) -> Geometry {
        Geometry {
            handle: Handle::empty(engine),
            kind,
            crs: None,
        }
    }

    /// Public form of the blank wrapper, mostly useful for exercising
    /// null-handle behavior.
    pub fn null(engine: Engine, kind: GeometryType) -> Geometry {
        Geometry::shell(engine, kind)
    }

    /// Stores a `geo` geometry in the engine and wraps the result.
    pub fn from_geo(engine: &Engine, geometry: geo::Geometry) -> Result<Geometry> {
        let raw = engine.from_geo(geometry)?;
        geom_factory(engine, Some(raw))
    }

    pub fn from_wkt(engine: &Engine, wkt: &str) -> Result<Geometry> {
        let raw = engine.from_wkt(wkt)?;
        geom_factory(engine, Some(raw))
    }

    pub fn from_wkb(engine: &Engine, bytes: &[u8]) -> Result<Geometry> {
        let raw = engine.from_wkb(bytes)?;
        geom_factory(engine, Some(raw))
    }

    // Handle plumbing.

    pub(crate) fn install(&mut self, raw: RawGeometry, owns: bool) {
        self.handle.install(raw, owns);
    }

    pub(crate) fn demote(&mut self) {
        self.handle.demote();
    }

    pub(crate) fn raw_checked(&self, op: &'static str) -> Result<RawGeometry> {
        self.handle.raw().ok_or(GeoShellError::NullGeometry(op))
    }

    fn pair_checked(
        &self,
        other: &Geometry,
        op: &'static str,
    ) -> Result<(RawGeometry, RawGeometry)> {
        if !Arc::ptr_eq(self.engine(), other.engine()) {
            return Err(GeoShellError::UnsupportedOperation {
                op,
                reason: "operands belong to different engines".to_string(),
            });
        }
        Ok((self.raw_checked(op)?, other.raw_checked(op)?))
    }

    pub fn engine(&self) -> &Engine {
        self.handle.engine()
    }

    pub fn raw(&self) -> Option<RawGeometry> {
        self.handle.raw()
    }

    pub fn owns(&self) -> bool {
        self.handle.owns()
    }

    pub fn is_null(&self) -> bool {
        self.handle.raw().is_none()
    }

    /// The kind recorded when this wrapper was built. Unlike
    /// [`geom_type`](Self::geom_type) this never consults the engine.
    pub fn kind(&self) -> GeometryType {
        self.kind
    }

    /// Coordinate dimensionality; this crate's engines are strictly planar.
    pub fn ndim(&self) -> usize {
        2
    }

    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    pub fn set_crs(&mut self, crs: Option<String>) {
        self.crs = crs;
    }

    /// Releases the underlying allocation now rather than at drop. Safe to
    /// call repeatedly.
    pub fn release(&mut self) {
        self.handle.release();
    }

    // Introspection.

    /// Canonical type name, re-resolved against the engine on every call.
    pub fn geom_type(&self) -> Result<&'static str> {
        geometry_type_name(self.engine(), self.handle.raw())
    }

    // Real-valued operations.

    pub fn area(&self) -> Result<f64> {
        self.engine().area(self.raw_checked("area")?)
    }

    pub fn length(&self) -> Result<f64> {
        self.engine().length(self.raw_checked("length")?)
    }

    /// `(minx, miny, maxx, maxy)` of the geometry's extent.
    pub fn bounds(&self) -> Result<(f64, f64, f64, f64)> {
        self.engine().bounds(self.raw_checked("bounds")?)
    }

    pub fn distance(&self, other: &Geometry) -> Result<f64> {
        let (a, b) = self.pair_checked(other, "distance")?;
        self.engine().distance(a, b)
    }

    // Topology.

    fn derived(
        &self,
        op: &'static str,
        f: impl FnOnce(&Engine, RawGeometry) -> Result<RawGeometry>,
    ) -> Result<Geometry> {
        let raw = self.raw_checked(op)?;
        let out = f(self.engine(), raw)?;
        geom_factory(self.engine(), Some(out))
    }

    fn derived2(
        &self,
        other: &Geometry,
        op: &'static str,
        f: impl FnOnce(&Engine, RawGeometry, RawGeometry) -> Result<RawGeometry>,
    ) -> Result<Geometry> {
        let (a, b) = self.pair_checked(other, op)?;
        let out = f(self.engine(), a, b)?;
        geom_factory(self.engine(), Some(out))
    }

    pub fn boundary(&self) -> Result<Geometry> {
        self.derived("boundary", |e, r| e.boundary(r))
    }

    pub fn centroid(&self) -> Result<Geometry> {
        self.derived("centroid", |e, r| e.centroid(r))
    }

    pub fn convex_hull(&self) -> Result<Geometry> {
        self.derived("convex_hull", |e, r| e.convex_hull(r))
    }

    pub fn envelope(&self) -> Result<Geometry> {
        self.derived("envelope", |e, r| e.envelope(r))
    }

    /// Buffers by `distance`, approximating circular arcs with `quadsegs`
    /// segments per quadrant. A zero distance is a tidying pass; a negative
    /// distance shrinks areal geometry and empties everything else.
    pub fn buffer(&self, distance: f64, quadsegs: u32) -> Result<Geometry> {
        self.derived("buffer", |e, r| e.buffer(r, distance, quadsegs))
    }

    /// Simplifies with `tolerance`. With `preserve_topology` the engine's
    /// topology-preserving entry is used; without it the result may be
    /// invalid, which is reported by [`is_valid`](Self::is_valid) rather
    /// than as an error here.
    pub fn simplify(&self, tolerance: f64, preserve_topology: bool) -> Result<Geometry> {
        if preserve_topology {
            self.derived("simplify", |e, r| e.topology_preserve_simplify(r, tolerance))
        } else {
            self.derived("simplify", |e, r| e.simplify(r, tolerance))
        }
    }

    // Overlay.

    pub fn difference(&self, other: &Geometry) -> Result<Geometry> {
        self.derived2(other, "difference", |e, a, b| e.difference(a, b))
    }

    pub fn intersection(&self, other: &Geometry) -> Result<Geometry> {
        self.derived2(other, "intersection", |e, a, b| e.intersection(a, b))
    }

    pub fn symmetric_difference(&self, other: &Geometry) -> Result<Geometry> {
        self.derived2(other, "symmetric_difference", |e, a, b| {
            e.symmetric_difference(a, b)
        })
    }

    pub fn union(&self, other: &Geometry) -> Result<Geometry> {
        self.derived2(other, "union", |e, a, b| e.union(a, b))
    }

    // Predicates. The engine speaks integers; the wrapper speaks booleans.

    pub fn has_z(&self) -> Result<bool> {
        Ok(self.engine().has_z(self.raw_checked("has_z")?)? != 0)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.engine().is_empty(self.raw_checked("is_empty")?)? != 0)
    }

    pub fn is_ring(&self) -> Result<bool> {
        Ok(self.engine().is_ring(self.raw_checked("is_ring")?)? != 0)
    }

    pub fn is_simple(&self) -> Result<bool> {
        Ok(self.engine().is_simple(self.raw_checked("is_simple")?)? != 0)
    }

    pub fn is_valid(&self) -> Result<bool> {
        Ok(self.engine().is_valid(self.raw_checked("is_valid")?)? != 0)
    }

    /// DE-9IM matrix of `self` against `other` as a nine-character string.
    pub fn relate(&self, other: &Geometry) -> Result<String> {
        let (a, b) = self.pair_checked(other, "relate")?;
        self.engine().relate(a, b)
    }

    pub fn contains(&self, other: &Geometry) -> Result<bool> {
        let (a, b) = self.pair_checked(other, "contains")?;
        Ok(self.engine().contains(a, b)? != 0)
    }

    pub fn crosses(&self, other: &Geometry) -> Result<bool> {
        let (a, b) = self.pair_checked(other, "crosses")?;
        Ok(self.engine().crosses(a, b)? != 0)
    }

    pub fn disjoint(&self, other: &Geometry) -> Result<bool> {
        let (a, b) = self.pair_checked(other, "disjoint")?;
        Ok(self.engine().disjoint(a, b)? != 0)
    }

    /// Topological equality; for structural equality see
    /// [`equals_exact`](Self::equals_exact).
    pub fn equals(&self, other: &Geometry) -> Result<bool> {
        let (a, b) = self.pair_checked(other, "equals")?;
        Ok(self.engine().equals(a, b)? != 0)
    }

    pub fn intersects(&self, other: &Geometry) -> Result<bool> {
        let (a, b) = self.pair_checked(other, "intersects")?;
        Ok(self.engine().intersects(a, b)? != 0)
    }

    pub fn overlaps(&self, other: &Geometry) -> Result<bool> {
        let (a, b) = self.pair_checked(other, "overlaps")?;
        Ok(self.engine().overlaps(a, b)? != 0)
    }

    pub fn touches(&self, other: &Geometry) -> Result<bool> {
        let (a, b) = self.pair_checked(other, "touches")?;
        Ok(self.engine().touches(a, b)? != 0)
    }

    pub fn within(&self, other: &Geometry) -> Result<bool> {
        let (a, b) = self.pair_checked(other, "within")?;
        Ok(self.engine().within(a, b)? != 0)
    }

    /// Structural equality: same kind and coordinates equal per axis within
    /// `tolerance`.
    pub fn equals_exact(&self, other: &Geometry, tolerance: f64) -> Result<bool> {
        let (a, b) = self.pair_checked(other, "equals_exact")?;
        Ok(self.engine().equals_exact(a, b, tolerance)? != 0)
    }

    /// Approximate structural equality to `decimal` places: defined as
    /// [`equals_exact`](Self::equals_exact) with tolerance
    /// `0.5 * 10^-decimal`.
    pub fn almost_equals(&self, other: &Geometry, decimal: i32) -> Result<bool> {
        self.equals_exact(other, 0.5 * 10f64.powi(-decimal))
    }

    // Linear referencing.

    /// Distance along this line to the point on it nearest `other`. With
    /// `normalized`, a fraction of the line's length instead; the two forms
    /// are distinct engine entries, never a wrapper-side rescaling.
    pub fn project(&self, other: &Geometry, normalized: bool) -> Result<f64> {
        let (line, point) = self.pair_checked(other, "project")?;
        if normalized {
            self.engine().project_normalized(line, point)
        } else {
            self.engine().project(line, point)
        }
    }

    /// Point at `distance` along this line, or at the `distance` fraction of
    /// its length with `normalized`. Values beyond either end clamp to it.
    pub fn interpolate(&self, distance: f64, normalized: bool) -> Result<Geometry> {
        if normalized {
            self.derived("interpolate", |e, r| e.interpolate_normalized(r, distance))
        } else {
            self.derived("interpolate", |e, r| e.interpolate(r, distance))
        }
    }

    // Serialization.

    pub fn wkb(&self) -> Result<Vec<u8>> {
        self.engine().to_wkb(self.raw_checked("wkb")?)
    }

    pub fn wkt(&self) -> Result<String> {
        self.engine().to_wkt(self.raw_checked("wkt")?)
    }

    // Sequences.

    /// Coordinate sequence view.
    ///
    /// Gated on the wrapper's declared kind before the handle check:
    /// multi-part kinds refuse regardless of whether a geometry is
    /// installed, directing callers at their parts instead. A null
    /// single-part wrapper fails the same way every other operation does.
    pub fn coords(&self) -> Result<CoordSeq<'_>> {
        if self.kind.is_multi_part() {
            return Err(GeoShellError::UnsupportedOperation {
                op: "coords",
                reason: format!(
                    "{} does not expose a coordinate sequence; access its parts",
                    self.kind
                ),
            });
        }
        self.raw_checked("coords")?;
        Ok(CoordSeq::new(self))
    }

    /// Coordinates snapshotted into a flat array-protocol buffer. Same
    /// kind gating as [`coords`](Self::coords).
    pub fn array_interface(&self) -> Result<ArrayInterface> {
        let seq = self.coords()?;
        ArrayInterface::from_coords(&seq)
    }

    /// Part sequence view of a homogeneous multi geometry.
    pub fn parts(&self) -> Result<PartSequence<'_>> {
        match self.kind.element_type() {
            Some(element) => Ok(PartSequence::new(self, element)),
            None => Err(GeoShellError::UnsupportedOperation {
                op: "geoms",
                reason: format!("{} has no homogeneous part sequence", self.kind),
            }),
        }
    }

    /// Part sequence view of a geometry collection, typing each element
    /// through the factory.
    pub fn mixed_parts(&self) -> Result<MixedPartSequence<'_>> {
        if self.kind == GeometryType::GeometryCollection {
            Ok(MixedPartSequence::new(self))
        } else {
            Err(GeoShellError::UnsupportedOperation {
                op: "geoms",
                reason: format!("{} is not a geometry collection", self.kind),
            })
        }
    }
}

impl fmt::Display for Geometry {
    /// Best-effort WKT; a null or stale wrapper prints a placeholder
    /// instead of failing the formatter.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.wkt() {
            Ok(wkt) => f.write_str(&wkt),
            Err(_) => write!(f, "<null {}>", self.kind),
        }
    }
}
