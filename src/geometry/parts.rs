//! Part sequence views over multi-part geometries.
//!
//! Like coordinate sequences, these hold no parts of their own: length and
//! element access re-query the engine every time, so a view taken before the
//! parent changed stays truthful afterwards. Children are non-owning aliases
//! into the parent's storage and must not outlive it, which the borrow on
//! the parent enforces.

use crate::datatypes::GeometryType;
use crate::error::Result;

use super::{geom_factory, resolve_index, Geometry};

/// View over the parts of a homogeneous multi geometry.
///
/// Every element has the declared element kind, so children skip the factory
/// and are built directly.
#[derive(Debug)]
pub struct PartSequence<'a> {
    parent: &'a Geometry,
    element: GeometryType,
}

impl<'a> PartSequence<'a> {
    pub(crate) fn new(parent: &'a Geometry, element: GeometryType) -> Self {
        PartSequence { parent, element }
    }

    pub fn len(&self) -> Result<usize> {
        let raw = self.parent.raw_checked("geoms")?;
        self.parent.engine().num_parts(raw)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Part at `index` as a non-owning child wrapper. Negative indices count
    /// from the end; anything still out of range after that resolution is an
    /// [`IndexOutOfRange`](crate::error::GeoShellError::IndexOutOfRange).
    pub fn get(&self, index: isize) -> Result<Geometry> {
        let raw = self.parent.raw_checked("geoms")?;
        let engine = self.parent.engine();
        let len = engine.num_parts(raw)?;
        let resolved = resolve_index(index, len)?;
        let part = engine.part_at(raw, resolved)?;
        let mut child = Geometry::shell(engine.clone(), self.element);
        child.install(part, false);
        Ok(child)
    }

    /// Iterates parts front to back; the first error ends the iteration.
    pub fn iter(&self) -> impl Iterator<Item = Result<Geometry>> + '_ {
        part_iter(|| self.len(), |i| self.get(i))
    }
}

/// View over the parts of a geometry collection, whose element kinds vary
/// per index. Children are typed through the factory, then demoted to
/// non-owning.
#[derive(Debug)]
pub struct MixedPartSequence<'a> {
    parent: &'a Geometry,
}

impl<'a> MixedPartSequence<'a> {
    pub(crate) fn new(parent: &'a Geometry) -> Self {
        MixedPartSequence { parent }
    }

    pub fn len(&self) -> Result<usize> {
        let raw = self.parent.raw_checked("geoms")?;
        self.parent.engine().num_parts(raw)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn get(&self, index: isize) -> Result<Geometry> {
        let raw = self.parent.raw_checked("geoms")?;
        let engine = self.parent.engine();
        let len = engine.num_parts(raw)?;
        let resolved = resolve_index(index, len)?;
        let part = engine.part_at(raw, resolved)?;
        let mut child = geom_factory(engine, Some(part))?;
        child.demote();
        Ok(child)
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<Geometry>> + '_ {
        part_iter(|| self.len(), |i| self.get(i))
    }
}

fn part_iter<'s>(
    len: impl Fn() -> Result<usize> + 's,
    get: impl Fn(isize) -> Result<Geometry> + 's,
) -> impl Iterator<Item = Result<Geometry>> + 's {
    let mut index = 0usize;
    let mut done = false;
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        let len = match len() {
            Ok(len) => len,
            Err(e) => {
                done = true;
                return Some(Err(e));
            }
        };
        if index >= len {
            return None;
        }
        let item = get(index as isize);
        if item.is_err() {
            done = true;
        }
        index += 1;
        Some(item)
    })
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::engine::{Engine, GeoEngine};
    use crate::error::GeoShellError;
    use crate::geometry::Geometry;

    fn multi_point(engine: &Engine) -> Geometry {
        Geometry::from_wkt(engine, "MULTIPOINT (0 0, 1 1, 2 4)").unwrap()
    }

    #[test]
    fn length_and_negative_indexing() {
        let engine = GeoEngine::new_engine();
        let mp = multi_point(&engine);
        let parts = mp.parts().unwrap();
        assert_eq!(parts.len().unwrap(), 3);
        let last = parts.get(-1).unwrap();
        assert_eq!(last.geom_type().unwrap(), "Point");
        assert_eq!(last.coords().unwrap().get(0).unwrap(), (2.0, 4.0));
        assert!(matches!(
            parts.get(3),
            Err(GeoShellError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(
            parts.get(-4),
            Err(GeoShellError::IndexOutOfRange { index: -4, len: 3 })
        ));
    }

    #[test]
    fn children_do_not_own_parent_storage() {
        let backend = Arc::new(GeoEngine::new());
        let engine: Engine = backend.clone();
        let mp = multi_point(&engine);
        assert_eq!(backend.live_geometries(), 1);
        {
            let parts = mp.parts().unwrap();
            let child = parts.get(0).unwrap();
            assert!(!child.owns());
        }
        // Dropping children and the view released nothing.
        assert_eq!(backend.live_geometries(), 1);
        assert_eq!(mp.parts().unwrap().len().unwrap(), 3);
    }

    #[test]
    fn iteration_yields_each_part() {
        let engine = GeoEngine::new_engine();
        let mp = multi_point(&engine);
        let parts = mp.parts().unwrap();
        let xs: Vec<f64> = parts
            .iter()
            .map(|p| p.unwrap().coords().unwrap().get(0).unwrap().0)
            .collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn mixed_sequence_types_children_through_the_factory() {
        let engine = GeoEngine::new_engine();
        let gc = Geometry::from_wkt(
            &engine,
            "GEOMETRYCOLLECTION (POINT (1 2), LINESTRING (0 0, 1 1))",
        )
        .unwrap();
        let parts = gc.mixed_parts().unwrap();
        assert_eq!(parts.len().unwrap(), 2);
        let first = parts.get(0).unwrap();
        let second = parts.get(1).unwrap();
        assert_eq!(first.geom_type().unwrap(), "Point");
        assert_eq!(second.geom_type().unwrap(), "LineString");
        assert!(!first.owns() && !second.owns());
    }

    #[test]
    fn part_sequences_are_not_available_on_single_part_kinds() {
        let engine = GeoEngine::new_engine();
        let point = Geometry::from_wkt(&engine, "POINT (0 0)").unwrap();
        assert!(matches!(
            point.parts(),
            Err(GeoShellError::UnsupportedOperation { op: "geoms", .. })
        ));
    }
}
