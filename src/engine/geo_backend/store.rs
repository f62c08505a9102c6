//! Generational slot storage behind [`GeoEngine`](super::GeoEngine).
//!
//! A root allocation occupies one slot; releasing it bumps the slot's
//! generation, so tokens minted earlier can be detected as stale instead of
//! resolving to whatever geometry reuses the slot. Interior tokens carry a
//! [`PartPath`] and are resolved by walking the parent's storage on every
//! access; a path that no longer fits the parent (the parent was replaced by
//! a differently-shaped geometry) reads as stale too.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::engine::{PartPath, RawGeometry};
use crate::error::{GeoShellError, Result};

use super::ops;

#[derive(Debug, Default)]
pub(crate) struct GeometryStore {
    slots: Mutex<Slots>,
}

#[derive(Debug, Default)]
struct Slots {
    entries: Vec<Slot>,
    free: Vec<u32>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    value: Option<geo::Geometry>,
}

/// Borrowed view of a stored geometry or one of its interior parts.
///
/// Children of homogeneous multi geometries are typed values, not
/// `geo::Geometry` variants, so interior access is a view rather than a
/// reference.
#[derive(Clone, Copy, Debug)]
pub(crate) enum PartView<'a> {
    Full(&'a geo::Geometry),
    Point(&'a geo::Point),
    LineString(&'a geo::LineString),
    Polygon(&'a geo::Polygon),
}

impl<'a> PartView<'a> {
    pub(crate) fn type_tag(&self) -> Result<u32> {
        match self {
            PartView::Full(g) => ops::type_tag_of(g),
            PartView::Point(_) => Ok(0),
            PartView::LineString(_) => Ok(1),
            PartView::Polygon(_) => Ok(3),
        }
    }

    /// Child count; 1 for single-part kinds.
    pub(crate) fn num_parts(&self) -> usize {
        match self {
            PartView::Full(geo::Geometry::MultiPoint(mp)) => mp.0.len(),
            PartView::Full(geo::Geometry::MultiLineString(mls)) => mls.0.len(),
            PartView::Full(geo::Geometry::MultiPolygon(mp)) => mp.0.len(),
            PartView::Full(geo::Geometry::GeometryCollection(gc)) => gc.0.len(),
            _ => 1,
        }
    }

    /// True when `part_at` must descend into interior storage instead of
    /// returning the receiver itself.
    pub(crate) fn is_collection(&self) -> bool {
        matches!(
            self,
            PartView::Full(geo::Geometry::MultiPoint(_))
                | PartView::Full(geo::Geometry::MultiLineString(_))
                | PartView::Full(geo::Geometry::MultiPolygon(_))
                | PartView::Full(geo::Geometry::GeometryCollection(_))
        )
    }

    pub(crate) fn coord_count(&self) -> Result<usize> {
        match self {
            PartView::Point(_) | PartView::Full(geo::Geometry::Point(_)) => Ok(1),
            PartView::LineString(ls) => Ok(ls.0.len()),
            PartView::Full(geo::Geometry::LineString(ls)) => Ok(ls.0.len()),
            _ => Err(coords_unsupported()),
        }
    }

    pub(crate) fn coord_at(&self, index: usize) -> Result<(f64, f64)> {
        let coord = match self {
            PartView::Point(p) => (index == 0).then(|| p.0),
            PartView::Full(geo::Geometry::Point(p)) => (index == 0).then(|| p.0),
            PartView::LineString(ls) => ls.0.get(index).copied(),
            PartView::Full(geo::Geometry::LineString(ls)) => ls.0.get(index).copied(),
            _ => return Err(coords_unsupported()),
        };
        coord.map(|c| (c.x, c.y)).ok_or(GeoShellError::IndexOutOfRange {
            index: index as isize,
            len: self.coord_count().unwrap_or(0),
        })
    }

    fn to_owned_geometry(self) -> geo::Geometry {
        match self {
            PartView::Full(g) => g.clone(),
            PartView::Point(p) => geo::Geometry::Point(*p),
            PartView::LineString(ls) => geo::Geometry::LineString(ls.clone()),
            PartView::Polygon(p) => geo::Geometry::Polygon(p.clone()),
        }
    }
}

fn coords_unsupported() -> GeoShellError {
    GeoShellError::UnsupportedOperation {
        op: "coords",
        reason: "only points and line strings expose a coordinate sequence".to_string(),
    }
}

fn stale() -> GeoShellError {
    GeoShellError::InvalidGeometry("geometry reference is stale or released".to_string())
}

enum Resolved<'a> {
    Borrowed(&'a geo::Geometry),
    Owned(geo::Geometry),
}

impl Resolved<'_> {
    fn as_geometry(&self) -> &geo::Geometry {
        match self {
            Resolved::Borrowed(g) => g,
            Resolved::Owned(g) => g,
        }
    }
}

fn resolve<'a>(root: &'a geo::Geometry, path: &PartPath) -> Result<PartView<'a>> {
    let mut view = PartView::Full(root);
    for &seg in path.segments() {
        let index = seg as usize;
        view = match view {
            PartView::Full(geo::Geometry::MultiPoint(mp)) => {
                PartView::Point(mp.0.get(index).ok_or_else(stale)?)
            }
            PartView::Full(geo::Geometry::MultiLineString(mls)) => {
                PartView::LineString(mls.0.get(index).ok_or_else(stale)?)
            }
            PartView::Full(geo::Geometry::MultiPolygon(mp)) => {
                PartView::Polygon(mp.0.get(index).ok_or_else(stale)?)
            }
            PartView::Full(geo::Geometry::GeometryCollection(gc)) => {
                PartView::Full(gc.0.get(index).ok_or_else(stale)?)
            }
            // Part 0 of a single-part geometry is the geometry itself.
            other if seg == 0 => other,
            _ => return Err(stale()),
        };
    }
    Ok(view)
}

impl GeometryStore {
    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a root geometry, returning a token with the root path.
    pub(crate) fn insert(&self, geometry: geo::Geometry) -> RawGeometry {
        let mut slots = self.lock();
        let slot = match slots.free.pop() {
            Some(idx) => {
                let entry = &mut slots.entries[idx as usize];
                entry.value = Some(geometry);
                RawGeometry {
                    slot: idx,
                    generation: entry.generation,
                    path: PartPath::ROOT,
                }
            }
            None => {
                let idx = slots.entries.len() as u32;
                slots.entries.push(Slot {
                    generation: 0,
                    value: Some(geometry),
                });
                RawGeometry {
                    slot: idx,
                    generation: 0,
                    path: PartPath::ROOT,
                }
            }
        };
        slot
    }

    /// Frees a root allocation. Aliasing, stale, and already-freed tokens are
    /// ignored; returns whether a geometry was actually freed.
    pub(crate) fn remove(&self, raw: RawGeometry) -> bool {
        if raw.is_alias() {
            return false;
        }
        let mut slots = self.lock();
        match slots.entries.get_mut(raw.slot as usize) {
            Some(entry) if entry.generation == raw.generation && entry.value.is_some() => {
                entry.value = None;
                entry.generation = entry.generation.wrapping_add(1);
                slots.free.push(raw.slot);
                true
            }
            _ => false,
        }
    }

    /// Number of live root allocations, for release accounting in tests.
    pub(crate) fn live(&self) -> usize {
        self.lock()
            .entries
            .iter()
            .filter(|e| e.value.is_some())
            .count()
    }

    fn entry_geometry<'a>(slots: &'a Slots, raw: RawGeometry) -> Result<&'a geo::Geometry> {
        slots
            .entries
            .get(raw.slot as usize)
            .filter(|e| e.generation == raw.generation)
            .and_then(|e| e.value.as_ref())
            .ok_or_else(stale)
    }

    fn resolve_owned_or_borrowed<'a>(
        slots: &'a Slots,
        raw: RawGeometry,
    ) -> Result<Resolved<'a>> {
        let root = Self::entry_geometry(slots, raw)?;
        Ok(match resolve(root, &raw.path)? {
            PartView::Full(g) => Resolved::Borrowed(g),
            leaf => Resolved::Owned(leaf.to_owned_geometry()),
        })
    }

    /// Runs `f` against the resolved referent. Interior leaves of homogeneous
    /// multi geometries are materialized as owned values for the duration of
    /// the call.
    pub(crate) fn with<R>(
        &self,
        raw: RawGeometry,
        f: impl FnOnce(&geo::Geometry) -> Result<R>,
    ) -> Result<R> {
        let slots = self.lock();
        let resolved = Self::resolve_owned_or_borrowed(&slots, raw)?;
        f(resolved.as_geometry())
    }

    /// Binary form of [`with`](Self::with); both referents resolve under one
    /// lock acquisition.
    pub(crate) fn with2<R>(
        &self,
        a: RawGeometry,
        b: RawGeometry,
        f: impl FnOnce(&geo::Geometry, &geo::Geometry) -> Result<R>,
    ) -> Result<R> {
        let slots = self.lock();
        let ra = Self::resolve_owned_or_borrowed(&slots, a)?;
        let rb = Self::resolve_owned_or_borrowed(&slots, b)?;
        f(ra.as_geometry(), rb.as_geometry())
    }

    /// Structural access that never clones: the closure gets a [`PartView`].
    pub(crate) fn with_view<R>(
        &self,
        raw: RawGeometry,
        f: impl FnOnce(PartView<'_>) -> Result<R>,
    ) -> Result<R> {
        let slots = self.lock();
        let root = Self::entry_geometry(&slots, raw)?;
        f(resolve(root, &raw.path)?)
    }
}

#[cfg(test)]
mod test {
    use geo::{point, polygon};

    use super::*;

    fn multi_point() -> geo::Geometry {
        geo::Geometry::MultiPoint(geo::MultiPoint(vec![
            point!(x: 0.0, y: 0.0),
            point!(x: 1.0, y: 2.0),
        ]))
    }

    #[test]
    fn insert_resolve_remove() {
        let store = GeometryStore::default();
        let raw = store.insert(geo::Geometry::Point(point!(x: 3.0, y: 4.0)));
        assert_eq!(store.live(), 1);
        let tag = store.with_view(raw, |v| v.type_tag()).unwrap();
        assert_eq!(tag, 0);
        assert!(store.remove(raw));
        assert_eq!(store.live(), 0);
        assert!(!store.remove(raw));
    }

    #[test]
    fn stale_token_does_not_resolve_to_slot_reuse() {
        let store = GeometryStore::default();
        let first = store.insert(geo::Geometry::Point(point!(x: 0.0, y: 0.0)));
        store.remove(first);
        let second = store.insert(multi_point());
        assert_eq!(second.slot, first.slot);
        assert!(matches!(
            store.with(first, |_| Ok(())),
            Err(GeoShellError::InvalidGeometry(_))
        ));
        assert!(store.with(second, |_| Ok(())).is_ok());
    }

    #[test]
    fn interior_alias_resolves_and_survives_leaf_materialization() {
        let store = GeometryStore::default();
        let raw = store.insert(multi_point());
        let child = RawGeometry {
            path: PartPath::ROOT.child(1).unwrap(),
            ..raw
        };
        let tag = store.with_view(child, |v| v.type_tag()).unwrap();
        assert_eq!(tag, 0);
        let (x, y) = store.with_view(child, |v| v.coord_at(0)).unwrap();
        assert_eq!((x, y), (1.0, 2.0));
        // The cloning path yields the same geometry.
        store
            .with(child, |g| {
                assert_eq!(*g, geo::Geometry::Point(point!(x: 1.0, y: 2.0)));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn out_of_range_interior_path_reads_as_stale() {
        let store = GeometryStore::default();
        let raw = store.insert(multi_point());
        let bogus = RawGeometry {
            path: PartPath::ROOT.child(9).unwrap(),
            ..raw
        };
        assert!(matches!(
            store.with_view(bogus, |v| v.type_tag()),
            Err(GeoShellError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn releasing_an_alias_is_a_no_op() {
        let store = GeometryStore::default();
        let raw = store.insert(multi_point());
        let child = RawGeometry {
            path: PartPath::ROOT.child(0).unwrap(),
            ..raw
        };
        assert!(!store.remove(child));
        assert_eq!(store.live(), 1);
    }

    #[test]
    fn coords_of_polygons_are_unsupported() {
        let store = GeometryStore::default();
        let raw = store.insert(geo::Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]));
        assert!(matches!(
            store.with_view(raw, |v| v.coord_count()),
            Err(GeoShellError::UnsupportedOperation { op: "coords", .. })
        ));
    }
}
