//! The engine boundary: opaque geometry tokens and the operation table.
//!
//! Every spatial operation in this crate is indirected through
//! [`GeometryEngine`], one trait method per operation-name in the fixed
//! vocabulary. A backend is swapped as a unit by constructing wrappers against
//! a different [`Engine`]; no wrapper code changes.

use std::fmt::Debug;
use std::sync::{Arc, OnceLock};

use crate::error::Result;

pub mod geo_backend;

pub use geo_backend::GeoEngine;

/// Deepest interior aliasing the default backend supports (collection of
/// multis of parts is depth 3; the headroom costs nothing).
pub(crate) const MAX_PART_DEPTH: usize = 8;

/// Interior path from a stored root geometry down to one of its parts.
///
/// The empty path is the root itself. Paths are value types so that
/// [`RawGeometry`] stays `Copy`, matching the pointer-sized tokens a native
/// engine would hand out.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct PartPath {
    segments: [u32; MAX_PART_DEPTH],
    len: u8,
}

impl PartPath {
    /// The root path.
    pub const ROOT: PartPath = PartPath {
        segments: [0; MAX_PART_DEPTH],
        len: 0,
    };

    pub fn is_root(&self) -> bool {
        self.len == 0
    }

    /// Extends the path by one child index; `None` once the fixed depth is
    /// exhausted.
    pub fn child(mut self, index: u32) -> Option<PartPath> {
        if usize::from(self.len) == MAX_PART_DEPTH {
            return None;
        }
        self.segments[usize::from(self.len)] = index;
        self.len += 1;
        Some(self)
    }

    pub fn segments(&self) -> &[u32] {
        &self.segments[..usize::from(self.len)]
    }
}

/// Opaque reference to one engine-allocated geometry object.
///
/// The token is interpreted only by the engine that issued it. The default
/// backend encodes a store slot, a generation counter guarding against stale
/// aliases, and an interior [`PartPath`] for references into a parent's
/// storage. Holding a token conveys no ownership; ownership lives in the
/// wrapper layer's [`Handle`](crate::geometry::Handle).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RawGeometry {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
    pub(crate) path: PartPath,
}

impl RawGeometry {
    /// True if this token aliases the interior of another geometry rather
    /// than a root allocation.
    pub fn is_alias(&self) -> bool {
        !self.path.is_root()
    }
}

/// The operation table.
///
/// One method per fixed operation name. Methods that produce a geometry
/// return a fresh, not-yet-owned [`RawGeometry`] which the caller must route
/// through [`geom_factory`](crate::geometry::geom_factory); predicate entries
/// return the engine's integer convention and are coerced to strict booleans
/// by the wrapper.
pub trait GeometryEngine: Debug + Send + Sync {
    // Allocation and structural introspection.

    /// Allocates engine storage for a geometry value and returns its token.
    fn from_geo(&self, geometry: geo::Geometry) -> Result<RawGeometry>;

    /// Releases a root allocation. Must tolerate stale or aliasing tokens
    /// silently: this is called from destructor paths that cannot propagate
    /// failures.
    fn release(&self, raw: RawGeometry);

    /// Integer type tag of the referent, resolved by the registry in
    /// [`crate::datatypes`].
    fn type_tag(&self, raw: RawGeometry) -> Result<u32>;

    /// Child count of a multi-part geometry; 1 for single-part geometries,
    /// per the usual engine convention.
    fn num_parts(&self, raw: RawGeometry) -> Result<usize>;

    /// Token aliasing the `index`-th child inside the referent's storage.
    fn part_at(&self, raw: RawGeometry, index: usize) -> Result<RawGeometry>;

    /// Length of the referent's own coordinate sequence. Fails for kinds
    /// that have none (polygons, multi-part geometries).
    fn coord_count(&self, raw: RawGeometry) -> Result<usize>;

    fn coord_at(&self, raw: RawGeometry, index: usize) -> Result<(f64, f64)>;

    // Real-valued operations.

    fn area(&self, raw: RawGeometry) -> Result<f64>;
    fn length(&self, raw: RawGeometry) -> Result<f64>;
    fn distance(&self, a: RawGeometry, b: RawGeometry) -> Result<f64>;
    /// `(minx, miny, maxx, maxy)`.
    fn bounds(&self, raw: RawGeometry) -> Result<(f64, f64, f64, f64)>;

    // Topology, producing new geometries.

    fn boundary(&self, raw: RawGeometry) -> Result<RawGeometry>;
    fn centroid(&self, raw: RawGeometry) -> Result<RawGeometry>;
    fn convex_hull(&self, raw: RawGeometry) -> Result<RawGeometry>;
    fn envelope(&self, raw: RawGeometry) -> Result<RawGeometry>;
    fn buffer(&self, raw: RawGeometry, distance: f64, quadsegs: u32) -> Result<RawGeometry>;
    fn simplify(&self, raw: RawGeometry, tolerance: f64) -> Result<RawGeometry>;
    fn topology_preserve_simplify(&self, raw: RawGeometry, tolerance: f64)
        -> Result<RawGeometry>;

    // Overlay.

    fn difference(&self, a: RawGeometry, b: RawGeometry) -> Result<RawGeometry>;
    fn intersection(&self, a: RawGeometry, b: RawGeometry) -> Result<RawGeometry>;
    fn symmetric_difference(&self, a: RawGeometry, b: RawGeometry) -> Result<RawGeometry>;
    fn union(&self, a: RawGeometry, b: RawGeometry) -> Result<RawGeometry>;

    // Unary predicates, engine integer convention (0 false, non-zero true).

    fn has_z(&self, raw: RawGeometry) -> Result<i32>;
    fn is_empty(&self, raw: RawGeometry) -> Result<i32>;
    fn is_ring(&self, raw: RawGeometry) -> Result<i32>;
    fn is_simple(&self, raw: RawGeometry) -> Result<i32>;
    fn is_valid(&self, raw: RawGeometry) -> Result<i32>;

    // Binary predicates.

    /// DE-9IM matrix of `a` against `b` as a nine-character string.
    fn relate(&self, a: RawGeometry, b: RawGeometry) -> Result<String>;
    fn contains(&self, a: RawGeometry, b: RawGeometry) -> Result<i32>;
    fn crosses(&self, a: RawGeometry, b: RawGeometry) -> Result<i32>;
    fn disjoint(&self, a: RawGeometry, b: RawGeometry) -> Result<i32>;
    fn equals(&self, a: RawGeometry, b: RawGeometry) -> Result<i32>;
    fn intersects(&self, a: RawGeometry, b: RawGeometry) -> Result<i32>;
    fn overlaps(&self, a: RawGeometry, b: RawGeometry) -> Result<i32>;
    fn touches(&self, a: RawGeometry, b: RawGeometry) -> Result<i32>;
    fn within(&self, a: RawGeometry, b: RawGeometry) -> Result<i32>;
    /// Structural equality, coordinates compared per axis within `tolerance`.
    fn equals_exact(&self, a: RawGeometry, b: RawGeometry, tolerance: f64) -> Result<i32>;

    // Linear referencing. Absolute-distance and fraction-of-length semantics
    // are distinct table entries; normalization is backend-defined, never a
    // post-scaling at the wrapper layer.

    fn project(&self, line: RawGeometry, point: RawGeometry) -> Result<f64>;
    fn project_normalized(&self, line: RawGeometry, point: RawGeometry) -> Result<f64>;
    fn interpolate(&self, line: RawGeometry, distance: f64) -> Result<RawGeometry>;
    fn interpolate_normalized(&self, line: RawGeometry, fraction: f64) -> Result<RawGeometry>;

    // Serialization. Opaque collaborators as far as the wrapper layer is
    // concerned; the default backend speaks WKB/WKT.

    fn to_wkb(&self, raw: RawGeometry) -> Result<Vec<u8>>;
    fn from_wkb(&self, bytes: &[u8]) -> Result<RawGeometry>;
    fn to_wkt(&self, raw: RawGeometry) -> Result<String>;
    fn from_wkt(&self, wkt: &str) -> Result<RawGeometry>;
}

/// Shared, swappable backend reference held by every wrapper.
pub type Engine = Arc<dyn GeometryEngine>;

/// Process-wide default backend, initialized lazily on first use.
///
/// Wrappers built through convenience constructors that do not name an engine
/// share this instance; tests normally construct a fresh [`GeoEngine`] so
/// that release accounting stays observable.
pub fn default_engine() -> Engine {
    static DEFAULT: OnceLock<Engine> = OnceLock::new();
    DEFAULT
        .get_or_init(|| Arc::new(GeoEngine::new()) as Engine)
        .clone()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn part_path_extends_to_fixed_depth() {
        let mut path = PartPath::ROOT;
        assert!(path.is_root());
        for i in 0..MAX_PART_DEPTH {
            path = path.child(i as u32).unwrap();
        }
        assert_eq!(path.segments().len(), MAX_PART_DEPTH);
        assert!(path.child(0).is_none());
    }

    #[test]
    fn default_engine_is_shared() {
        let a = default_engine();
        let b = default_engine();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
