//! Default engine backend, built on the pure-Rust `geo` crate.
//!
//! The backend owns a [`GeometryStore`] of `geo::Geometry` values and
//! implements every operation-table entry by resolving tokens against the
//! store and delegating to the algorithm glue in [`ops`]. No native library
//! is involved; everything the table promises is computed in process.

use std::sync::Arc;

use crate::engine::{Engine, GeometryEngine, RawGeometry};
use crate::error::{GeoShellError, Result};

mod ops;
mod store;

use ops::OverlayOp;
use store::GeometryStore;

/// Engine backend over the `geo` crate.
#[derive(Debug, Default)]
pub struct GeoEngine {
    store: GeometryStore,
}

impl GeoEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh backend behind the shared [`Engine`] handle type.
    pub fn new_engine() -> Engine {
        Arc::new(Self::new())
    }

    /// Number of live root allocations. Exposed so callers can assert
    /// release-exactly-once behavior.
    pub fn live_geometries(&self) -> usize {
        self.store.live()
    }

    fn store_result(&self, geometry: geo::Geometry) -> Result<RawGeometry> {
        Ok(self.store.insert(geometry))
    }
}

impl GeometryEngine for GeoEngine {
    fn from_geo(&self, geometry: geo::Geometry) -> Result<RawGeometry> {
        self.store_result(ops::normalize(geometry))
    }

    fn release(&self, raw: RawGeometry) {
        self.store.remove(raw);
    }

    fn type_tag(&self, raw: RawGeometry) -> Result<u32> {
        self.store.with_view(raw, |v| v.type_tag())
    }

    fn num_parts(&self, raw: RawGeometry) -> Result<usize> {
        self.store.with_view(raw, |v| Ok(v.num_parts()))
    }

    fn part_at(&self, raw: RawGeometry, index: usize) -> Result<RawGeometry> {
        self.store.with_view(raw, |v| {
            let len = v.num_parts();
            if index >= len {
                return Err(GeoShellError::IndexOutOfRange {
                    index: index as isize,
                    len,
                });
            }
            if v.is_collection() {
                let path = raw.path.child(index as u32).ok_or_else(|| {
                    GeoShellError::UnsupportedOperation {
                        op: "part_at",
                        reason: "nesting depth exceeds the backend limit".to_string(),
                    }
                })?;
                Ok(RawGeometry { path, ..raw })
            } else {
                // Part 0 of a single-part geometry is the geometry itself.
                Ok(raw)
            }
        })
    }

    fn coord_count(&self, raw: RawGeometry) -> Result<usize> {
        self.store.with_view(raw, |v| v.coord_count())
    }

    fn coord_at(&self, raw: RawGeometry, index: usize) -> Result<(f64, f64)> {
        self.store.with_view(raw, |v| v.coord_at(index))
    }

    fn area(&self, raw: RawGeometry) -> Result<f64> {
        self.store.with(raw, |g| Ok(ops::area(g)))
    }

    fn length(&self, raw: RawGeometry) -> Result<f64> {
        self.store.with(raw, ops::length)
    }

    fn distance(&self, a: RawGeometry, b: RawGeometry) -> Result<f64> {
        self.store.with2(a, b, ops::distance)
    }

    fn bounds(&self, raw: RawGeometry) -> Result<(f64, f64, f64, f64)> {
        self.store.with(raw, ops::bounds)
    }

    fn boundary(&self, raw: RawGeometry) -> Result<RawGeometry> {
        let out = self.store.with(raw, ops::boundary)?;
        self.store_result(out)
    }

    fn centroid(&self, raw: RawGeometry) -> Result<RawGeometry> {
        let out = self.store.with(raw, ops::centroid)?;
        self.store_result(out)
    }

    fn convex_hull(&self, raw: RawGeometry) -> Result<RawGeometry> {
        let out = self.store.with(raw, ops::convex_hull)?;
        self.store_result(out)
    }

    fn envelope(&self, raw: RawGeometry) -> Result<RawGeometry> {
        let out = self.store.with(raw, ops::envelope)?;
        self.store_result(out)
    }

    fn buffer(&self, raw: RawGeometry, distance: f64, quadsegs: u32) -> Result<RawGeometry> {
        let out = self.store.with(raw, |g| ops::buffer(g, distance, quadsegs))?;
        self.store_result(out)
    }

    fn simplify(&self, raw: RawGeometry, tolerance: f64) -> Result<RawGeometry> {
        let out = self.store.with(raw, |g| ops::simplify(g, tolerance, false))?;
        self.store_result(out)
    }

    fn topology_preserve_simplify(
        &self,
        raw: RawGeometry,
        tolerance: f64,
    ) -> Result<RawGeometry> {
        let out = self.store.with(raw, |g| ops::simplify(g, tolerance, true))?;
        self.store_result(out)
    }

    fn difference(&self, a: RawGeometry, b: RawGeometry) -> Result<RawGeometry> {
        let out = self
            .store
            .with2(a, b, |x, y| ops::overlay(x, y, OverlayOp::Difference))?;
        self.store_result(out)
    }

    fn intersection(&self, a: RawGeometry, b: RawGeometry) -> Result<RawGeometry> {
        let out = self
            .store
            .with2(a, b, |x, y| ops::overlay(x, y, OverlayOp::Intersection))?;
        self.store_result(out)
    }

    fn symmetric_difference(&self, a: RawGeometry, b: RawGeometry) -> Result<RawGeometry> {
        let out = self.store.with2(a, b, |x, y| {
            ops::overlay(x, y, OverlayOp::SymmetricDifference)
        })?;
        self.store_result(out)
    }

    fn union(&self, a: RawGeometry, b: RawGeometry) -> Result<RawGeometry> {
        let out = self
            .store
            .with2(a, b, |x, y| ops::overlay(x, y, OverlayOp::Union))?;
        self.store_result(out)
    }

    fn has_z(&self, raw: RawGeometry) -> Result<i32> {
        // Strictly planar backend, but the token must still be live.
        self.store.with_view(raw, |_| Ok(0))
    }

    fn is_empty(&self, raw: RawGeometry) -> Result<i32> {
        self.store.with(raw, |g| Ok(ops::is_empty(g) as i32))
    }

    fn is_ring(&self, raw: RawGeometry) -> Result<i32> {
        self.store.with(raw, |g| Ok(ops::is_ring(g) as i32))
    }

    fn is_simple(&self, raw: RawGeometry) -> Result<i32> {
        self.store.with(raw, |g| Ok(ops::is_simple(g) as i32))
    }

    fn is_valid(&self, raw: RawGeometry) -> Result<i32> {
        self.store.with(raw, |g| Ok(ops::is_valid(g) as i32))
    }

    fn relate(&self, a: RawGeometry, b: RawGeometry) -> Result<String> {
        self.store.with2(a, b, ops::relate_matrix)
    }

    fn contains(&self, a: RawGeometry, b: RawGeometry) -> Result<i32> {
        self.store.with2(a, b, |x, y| Ok(ops::contains(x, y)? as i32))
    }

    fn crosses(&self, a: RawGeometry, b: RawGeometry) -> Result<i32> {
        self.store.with2(a, b, |x, y| Ok(ops::crosses(x, y)? as i32))
    }

    fn disjoint(&self, a: RawGeometry, b: RawGeometry) -> Result<i32> {
        self.store.with2(a, b, |x, y| Ok(ops::disjoint(x, y)? as i32))
    }

    fn equals(&self, a: RawGeometry, b: RawGeometry) -> Result<i32> {
        self.store.with2(a, b, |x, y| Ok(ops::equals(x, y)? as i32))
    }

    fn intersects(&self, a: RawGeometry, b: RawGeometry) -> Result<i32> {
        self.store
            .with2(a, b, |x, y| Ok(ops::intersects(x, y)? as i32))
    }

    fn overlaps(&self, a: RawGeometry, b: RawGeometry) -> Result<i32> {
        self.store.with2(a, b, |x, y| Ok(ops::overlaps(x, y)? as i32))
    }

    fn touches(&self, a: RawGeometry, b: RawGeometry) -> Result<i32> {
        self.store.with2(a, b, |x, y| Ok(ops::touches(x, y)? as i32))
    }

    fn within(&self, a: RawGeometry, b: RawGeometry) -> Result<i32> {
        self.store.with2(a, b, |x, y| Ok(ops::within(x, y)? as i32))
    }

    fn equals_exact(&self, a: RawGeometry, b: RawGeometry, tolerance: f64) -> Result<i32> {
        self.store
            .with2(a, b, |x, y| Ok(ops::equals_exact(x, y, tolerance)? as i32))
    }

    fn project(&self, line: RawGeometry, point: RawGeometry) -> Result<f64> {
        self.store.with2(line, point, |l, p| ops::project(l, p, false))
    }

    fn project_normalized(&self, line: RawGeometry, point: RawGeometry) -> Result<f64> {
        self.store.with2(line, point, |l, p| ops::project(l, p, true))
    }

    fn interpolate(&self, line: RawGeometry, distance: f64) -> Result<RawGeometry> {
        let out = self
            .store
            .with(line, |l| ops::interpolate(l, distance, false))?;
        self.store_result(out)
    }

    fn interpolate_normalized(&self, line: RawGeometry, fraction: f64) -> Result<RawGeometry> {
        let out = self
            .store
            .with(line, |l| ops::interpolate(l, fraction, true))?;
        self.store_result(out)
    }

    fn to_wkb(&self, raw: RawGeometry) -> Result<Vec<u8>> {
        self.store.with(raw, ops::to_wkb)
    }

    fn from_wkb(&self, bytes: &[u8]) -> Result<RawGeometry> {
        self.store_result(ops::normalize(ops::from_wkb(bytes)?))
    }

    fn to_wkt(&self, raw: RawGeometry) -> Result<String> {
        self.store.with(raw, ops::to_wkt)
    }

    fn from_wkt(&self, wkt: &str) -> Result<RawGeometry> {
        self.store_result(ops::normalize(ops::from_wkt(wkt)?))
    }
}
