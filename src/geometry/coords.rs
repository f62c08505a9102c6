//! Coordinate sequence views.
//!
//! A [`CoordSeq`] holds no coordinate data of its own: every access goes back
//! to the engine, so the view re-synchronizes with whatever the underlying
//! geometry currently is. Negative indices count from the end, once.

use crate::error::Result;

use super::{resolve_index, Geometry};

/// Live view over the coordinate sequence of a point or line string.
#[derive(Debug)]
pub struct CoordSeq<'a> {
    geometry: &'a Geometry,
}

impl<'a> CoordSeq<'a> {
    pub(crate) fn new(geometry: &'a Geometry) -> Self {
        CoordSeq { geometry }
    }

    pub fn len(&self) -> Result<usize> {
        let raw = self.geometry.raw_checked("coords")?;
        self.geometry.engine().coord_count(raw)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Coordinate at `index`, negative indices resolved against the current
    /// length.
    pub fn get(&self, index: isize) -> Result<(f64, f64)> {
        let raw = self.geometry.raw_checked("coords")?;
        let len = self.geometry.engine().coord_count(raw)?;
        let resolved = resolve_index(index, len)?;
        self.geometry.engine().coord_at(raw, resolved)
    }

    /// Iterates coordinates front to back, re-reading the length on every
    /// step. The first error ends the iteration.
    pub fn iter(&self) -> impl Iterator<Item = Result<(f64, f64)>> + '_ {
        let mut index = 0usize;
        let mut done = false;
        std::iter::from_fn(move || {
            if done {
                return None;
            }
            let len = match self.len() {
                Ok(len) => len,
                Err(e) => {
                    done = true;
                    return Some(Err(e));
                }
            };
            if index >= len {
                return None;
            }
            let item = self.get(index as isize);
            if item.is_err() {
                done = true;
            }
            index += 1;
            Some(item)
        })
    }

    pub fn to_vec(&self) -> Result<Vec<(f64, f64)>> {
        self.iter().collect()
    }
}

#[cfg(target_endian = "little")]
const F64_TYPESTR: &str = "<f8";
#[cfg(target_endian = "big")]
const F64_TYPESTR: &str = ">f8";

/// Snapshot of a coordinate sequence as a flat, row-major `f64` buffer with
/// array-protocol metadata: `shape` is `(coords, 2)` and `typestr` names the
/// native-endian 8-byte float format.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayInterface {
    pub shape: (usize, usize),
    pub typestr: &'static str,
    pub data: Vec<f64>,
}

impl ArrayInterface {
    pub(crate) fn from_coords(seq: &CoordSeq<'_>) -> Result<Self> {
        let coords = seq.to_vec()?;
        let mut data = Vec::with_capacity(coords.len() * 2);
        for (x, y) in &coords {
            data.push(*x);
            data.push(*y);
        }
        Ok(ArrayInterface {
            shape: (coords.len(), 2),
            typestr: F64_TYPESTR,
            data,
        })
    }
}

#[cfg(test)]
mod test {
    use crate::error::GeoShellError;
    use crate::geometry::Geometry;
    use crate::engine::GeoEngine;

    #[test]
    fn negative_indices_wrap_once() {
        let engine = GeoEngine::new_engine();
        let line = Geometry::from_wkt(&engine, "LINESTRING (0 0, 1 0, 2 1)").unwrap();
        let coords = line.coords().unwrap();
        assert_eq!(coords.len().unwrap(), 3);
        assert_eq!(coords.get(-1).unwrap(), (2.0, 1.0));
        assert_eq!(coords.get(-3).unwrap(), (0.0, 0.0));
        assert!(matches!(
            coords.get(-4),
            Err(GeoShellError::IndexOutOfRange { index: -4, len: 3 })
        ));
        assert!(matches!(
            coords.get(3),
            Err(GeoShellError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(
            coords.get(isize::MIN),
            Err(GeoShellError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn iteration_visits_every_coordinate() {
        let engine = GeoEngine::new_engine();
        let line = Geometry::from_wkt(&engine, "LINESTRING (0 0, 1 0, 2 1)").unwrap();
        let coords = line.coords().unwrap().to_vec().unwrap();
        assert_eq!(coords, vec![(0.0, 0.0), (1.0, 0.0), (2.0, 1.0)]);
    }

    #[test]
    fn array_interface_is_row_major_xy() {
        let engine = GeoEngine::new_engine();
        let line = Geometry::from_wkt(&engine, "LINESTRING (0 0, 1 2)").unwrap();
        let arr = line.array_interface().unwrap();
        assert_eq!(arr.shape, (2, 2));
        assert_eq!(arr.data, vec![0.0, 0.0, 1.0, 2.0]);
        assert!(arr.typestr.ends_with("f8"));
    }

    #[test]
    fn point_exposes_a_single_coordinate() {
        let engine = GeoEngine::new_engine();
        let point = Geometry::from_wkt(&engine, "POINT (3 4)").unwrap();
        let coords = point.coords().unwrap();
        assert_eq!(coords.len().unwrap(), 1);
        assert_eq!(coords.get(0).unwrap(), (3.0, 4.0));
        assert_eq!(coords.get(-1).unwrap(), (3.0, 4.0));
    }
}
