//! Algorithm glue between the operation table and the `geo` crate.
//!
//! Everything here works on plain `geo::Geometry` values that have already
//! been resolved out of the store. The store guarantees normalization (no
//! `Line`/`Rect`/`Triangle` variants survive insertion), so matches over
//! geometry kinds treat those as engine invariant violations.

use std::collections::BTreeMap;

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::dimensions::{Dimensions, HasDimensions};
use geo::{
    Area, BooleanOps, BoundingRect, Centroid, ConvexHull, Coord, CoordsIter, EuclideanDistance,
    EuclideanLength, GeometryCollection, Intersects, LineInterpolatePoint, LineLocatePoint,
    LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon, Relate, Simplify,
    SimplifyVwPreserve,
};
use geozero::{CoordDimensions, ToGeo, ToWkb, ToWkt};

use crate::error::{GeoShellError, Result};

fn unsupported(op: &'static str, reason: &str) -> GeoShellError {
    GeoShellError::UnsupportedOperation {
        op,
        reason: reason.to_string(),
    }
}

fn invariant(msg: &str) -> GeoShellError {
    GeoShellError::EngineInvariantViolation(msg.to_string())
}

/// Rewrites the convenience variants (`Line`, `Rect`, `Triangle`) into their
/// canonical kinds so every stored geometry maps onto the fixed tag registry.
pub(crate) fn normalize(geometry: geo::Geometry) -> geo::Geometry {
    match geometry {
        geo::Geometry::Line(l) => {
            geo::Geometry::LineString(LineString::new(vec![l.start, l.end]))
        }
        geo::Geometry::Rect(r) => geo::Geometry::Polygon(r.to_polygon()),
        geo::Geometry::Triangle(t) => geo::Geometry::Polygon(t.to_polygon()),
        geo::Geometry::GeometryCollection(gc) => geo::Geometry::GeometryCollection(
            GeometryCollection(gc.0.into_iter().map(normalize).collect()),
        ),
        other => other,
    }
}

/// Engine type tag of a normalized geometry. Tag 2 (`LinearRing`) is never
/// produced: `geo` has no standalone ring type.
pub(crate) fn type_tag_of(geometry: &geo::Geometry) -> Result<u32> {
    Ok(match geometry {
        geo::Geometry::Point(_) => 0,
        geo::Geometry::LineString(_) => 1,
        geo::Geometry::Polygon(_) => 3,
        geo::Geometry::MultiPoint(_) => 4,
        geo::Geometry::MultiLineString(_) => 5,
        geo::Geometry::MultiPolygon(_) => 6,
        geo::Geometry::GeometryCollection(_) => 7,
        _ => return Err(invariant("unnormalized geometry kind in engine store")),
    })
}

// Real-valued operations
// ----------------------

pub(crate) fn area(geometry: &geo::Geometry) -> f64 {
    geometry.unsigned_area()
}

pub(crate) fn length(geometry: &geo::Geometry) -> Result<f64> {
    Ok(match geometry {
        geo::Geometry::Point(_) | geo::Geometry::MultiPoint(_) => 0.0,
        geo::Geometry::LineString(ls) => ls.euclidean_length(),
        geo::Geometry::MultiLineString(mls) => mls.euclidean_length(),
        geo::Geometry::Polygon(p) => polygon_perimeter(p),
        geo::Geometry::MultiPolygon(mp) => mp.0.iter().map(polygon_perimeter).sum(),
        geo::Geometry::GeometryCollection(gc) => {
            let mut total = 0.0;
            for child in &gc.0 {
                total += length(child)?;
            }
            total
        }
        _ => return Err(invariant("unnormalized geometry kind in engine store")),
    })
}

fn polygon_perimeter(polygon: &Polygon) -> f64 {
    polygon.exterior().euclidean_length()
        + polygon
            .interiors()
            .iter()
            .map(|r| r.euclidean_length())
            .sum::<f64>()
}

pub(crate) fn bounds(geometry: &geo::Geometry) -> Result<(f64, f64, f64, f64)> {
    let rect = geometry.bounding_rect().ok_or_else(|| {
        GeoShellError::InvalidGeometry("empty geometry has no bounds".to_string())
    })?;
    let (min, max) = (rect.min(), rect.max());
    Ok((min.x, min.y, max.x, max.y))
}

/// Minimum distance between any two constituent primitives.
pub(crate) fn distance(a: &geo::Geometry, b: &geo::Geometry) -> Result<f64> {
    let mut left = Vec::new();
    let mut right = Vec::new();
    collect_pieces(a, &mut left);
    collect_pieces(b, &mut right);
    if left.is_empty() || right.is_empty() {
        return Err(GeoShellError::InvalidGeometry(
            "distance requires non-empty operands".to_string(),
        ));
    }
    let mut min = f64::INFINITY;
    for x in &left {
        for y in &right {
            let d = piece_distance(x, y);
            if d < min {
                min = d;
            }
        }
    }
    Ok(min)
}

enum Piece<'a> {
    Pt(&'a Point),
    Ls(&'a LineString),
    Pg(&'a Polygon),
}

fn collect_pieces<'a>(geometry: &'a geo::Geometry, out: &mut Vec<Piece<'a>>) {
    match geometry {
        geo::Geometry::Point(p) => out.push(Piece::Pt(p)),
        geo::Geometry::LineString(ls) => {
            if !ls.0.is_empty() {
                out.push(Piece::Ls(ls));
            }
        }
        geo::Geometry::Polygon(p) => {
            if !p.exterior().0.is_empty() {
                out.push(Piece::Pg(p));
            }
        }
        geo::Geometry::MultiPoint(mp) => out.extend(mp.0.iter().map(Piece::Pt)),
        geo::Geometry::MultiLineString(mls) => {
            out.extend(mls.0.iter().filter(|ls| !ls.0.is_empty()).map(Piece::Ls))
        }
        geo::Geometry::MultiPolygon(mp) => out.extend(
            mp.0.iter()
                .filter(|p| !p.exterior().0.is_empty())
                .map(Piece::Pg),
        ),
        geo::Geometry::GeometryCollection(gc) => {
            for child in &gc.0 {
                collect_pieces(child, out);
            }
        }
        _ => {}
    }
}

fn piece_distance(x: &Piece<'_>, y: &Piece<'_>) -> f64 {
    match (x, y) {
        (Piece::Pt(a), Piece::Pt(b)) => a.euclidean_distance(*b),
        (Piece::Pt(a), Piece::Ls(b)) => a.euclidean_distance(*b),
        (Piece::Pt(a), Piece::Pg(b)) => a.euclidean_distance(*b),
        (Piece::Ls(a), Piece::Ls(b)) => a.euclidean_distance(*b),
        (Piece::Ls(a), Piece::Pg(b)) => a.euclidean_distance(*b),
        (Piece::Pg(a), Piece::Pg(b)) => a.euclidean_distance(*b),
        (Piece::Ls(_), Piece::Pt(_)) | (Piece::Pg(_), Piece::Pt(_)) | (Piece::Pg(_), Piece::Ls(_)) => {
            piece_distance(y, x)
        }
    }
}

// Topology
// --------

pub(crate) fn boundary(geometry: &geo::Geometry) -> Result<geo::Geometry> {
    Ok(match geometry {
        // The boundary of a point set is empty.
        geo::Geometry::Point(_) | geo::Geometry::MultiPoint(_) => {
            geo::Geometry::GeometryCollection(GeometryCollection(vec![]))
        }
        geo::Geometry::LineString(ls) => {
            geo::Geometry::MultiPoint(MultiPoint(line_string_endpoints(ls)))
        }
        geo::Geometry::MultiLineString(mls) => {
            geo::Geometry::MultiPoint(MultiPoint(mod2_endpoints(mls)))
        }
        geo::Geometry::Polygon(p) => {
            if p.interiors().is_empty() {
                geo::Geometry::LineString(p.exterior().clone())
            } else {
                geo::Geometry::MultiLineString(MultiLineString(rings_of(p)))
            }
        }
        geo::Geometry::MultiPolygon(mp) => geo::Geometry::MultiLineString(MultiLineString(
            mp.0.iter().flat_map(rings_of).collect(),
        )),
        geo::Geometry::GeometryCollection(_) => {
            return Err(unsupported(
                "boundary",
                "geometry collections have no defined boundary",
            ))
        }
        _ => return Err(invariant("unnormalized geometry kind in engine store")),
    })
}

fn rings_of(polygon: &Polygon) -> Vec<LineString> {
    let mut rings = vec![polygon.exterior().clone()];
    rings.extend(polygon.interiors().iter().cloned());
    rings
}

fn line_string_endpoints(ls: &LineString) -> Vec<Point> {
    if ls.0.len() < 2 || ls.is_closed() {
        return vec![];
    }
    vec![Point(ls.0[0]), Point(ls.0[ls.0.len() - 1])]
}

/// Mod-2 boundary rule: endpoints appearing in an odd number of component
/// boundaries. Keys on coordinate bits to stay deterministic.
fn mod2_endpoints(mls: &MultiLineString) -> Vec<Point> {
    let mut counts: BTreeMap<(u64, u64), (Coord, usize)> = BTreeMap::new();
    for ls in &mls.0 {
        for p in line_string_endpoints(ls) {
            let key = (p.0.x.to_bits(), p.0.y.to_bits());
            counts.entry(key).or_insert((p.0, 0)).1 += 1;
        }
    }
    counts
        .into_values()
        .filter(|(_, n)| n % 2 == 1)
        .map(|(c, _)| Point(c))
        .collect()
}

pub(crate) fn centroid(geometry: &geo::Geometry) -> Result<geo::Geometry> {
    geometry
        .centroid()
        .map(geo::Geometry::Point)
        .ok_or_else(|| GeoShellError::InvalidGeometry("empty geometry has no centroid".to_string()))
}

pub(crate) fn convex_hull(geometry: &geo::Geometry) -> Result<geo::Geometry> {
    let points: Vec<Point> = geometry.coords_iter().map(Point).collect();
    if points.is_empty() {
        return Err(GeoShellError::InvalidGeometry(
            "empty geometry has no convex hull".to_string(),
        ));
    }
    Ok(geo::Geometry::Polygon(MultiPoint(points).convex_hull()))
}

pub(crate) fn envelope(geometry: &geo::Geometry) -> Result<geo::Geometry> {
    let rect = geometry.bounding_rect().ok_or_else(|| {
        GeoShellError::InvalidGeometry("empty geometry has no envelope".to_string())
    })?;
    let (min, max) = (rect.min(), rect.max());
    Ok(if min.x == max.x && min.y == max.y {
        geo::Geometry::Point(Point(min))
    } else if min.x == max.x || min.y == max.y {
        geo::Geometry::LineString(LineString::new(vec![min, max]))
    } else {
        geo::Geometry::Polygon(rect.to_polygon())
    })
}

pub(crate) fn simplify(
    geometry: &geo::Geometry,
    tolerance: f64,
    preserve_topology: bool,
) -> Result<geo::Geometry> {
    Ok(match geometry {
        geo::Geometry::Point(_) | geo::Geometry::MultiPoint(_) => geometry.clone(),
        geo::Geometry::LineString(ls) => geo::Geometry::LineString(if preserve_topology {
            ls.simplify_vw_preserve(&tolerance)
        } else {
            ls.simplify(&tolerance)
        }),
        geo::Geometry::MultiLineString(mls) => {
            geo::Geometry::MultiLineString(if preserve_topology {
                mls.simplify_vw_preserve(&tolerance)
            } else {
                mls.simplify(&tolerance)
            })
        }
        geo::Geometry::Polygon(p) => geo::Geometry::Polygon(if preserve_topology {
            p.simplify_vw_preserve(&tolerance)
        } else {
            p.simplify(&tolerance)
        }),
        geo::Geometry::MultiPolygon(mp) => geo::Geometry::MultiPolygon(if preserve_topology {
            mp.simplify_vw_preserve(&tolerance)
        } else {
            mp.simplify(&tolerance)
        }),
        geo::Geometry::GeometryCollection(gc) => {
            let children: Result<Vec<_>> = gc
                .0
                .iter()
                .map(|c| simplify(c, tolerance, preserve_topology))
                .collect();
            geo::Geometry::GeometryCollection(GeometryCollection(children?))
        }
        _ => return Err(invariant("unnormalized geometry kind in engine store")),
    })
}

// Buffering
// ---------

/// Buffer built from exact regular polygons.
///
/// A point buffer is a regular `4 * quadsegs`-gon inscribed in the radius, so
/// its area follows the closed form `n/2 * r^2 * sin(2*pi/n)`: 3.0 for
/// `quadsegs = 3`, 3.1365… for 16, 3.14151… for 128. Lineal buffers union
/// vertex discs with segment rectangles; areal buffers grow (or shrink, for
/// negative distances) by the buffered ring linework.
pub(crate) fn buffer(
    geometry: &geo::Geometry,
    distance: f64,
    quadsegs: u32,
) -> Result<geo::Geometry> {
    if !distance.is_finite() {
        return Err(GeoShellError::InvalidGeometry(
            "buffer distance must be finite".to_string(),
        ));
    }
    let quadsegs = quadsegs.max(1);
    if distance == 0.0 {
        // Tidying pass: an identity on well-formed areal input, an empty
        // polygon for anything without interior.
        return Ok(match to_areal(geometry) {
            Some(mp) => normalize_areal(mp),
            None => empty_polygon(),
        });
    }
    if distance < 0.0 {
        let Some(mp) = to_areal(geometry) else {
            return Ok(empty_polygon());
        };
        let rim = ring_linework_buffer(&mp, -distance, quadsegs);
        return Ok(normalize_areal(mp.difference(&rim)));
    }
    match geometry {
        geo::Geometry::Point(p) => Ok(geo::Geometry::Polygon(disc(p.0, distance, quadsegs))),
        geo::Geometry::MultiPoint(mp) => Ok(normalize_areal(union_all(
            mp.0.iter().map(|p| disc(p.0, distance, quadsegs)).collect(),
        ))),
        geo::Geometry::LineString(ls) => {
            Ok(normalize_areal(line_buffer(ls, distance, quadsegs)))
        }
        geo::Geometry::MultiLineString(mls) => {
            let mut acc = MultiPolygon(vec![]);
            for ls in &mls.0 {
                acc = acc.union(&line_buffer(ls, distance, quadsegs));
            }
            Ok(normalize_areal(acc))
        }
        geo::Geometry::Polygon(_) | geo::Geometry::MultiPolygon(_) => {
            let mp = to_areal(geometry).ok_or_else(|| invariant("areal conversion failed"))?;
            let rim = ring_linework_buffer(&mp, distance, quadsegs);
            Ok(normalize_areal(mp.union(&rim)))
        }
        geo::Geometry::GeometryCollection(gc) => {
            let mut acc = MultiPolygon(vec![]);
            for child in &gc.0 {
                let buffered = buffer(child, distance, quadsegs)?;
                if let Some(mp) = to_areal(&buffered) {
                    acc = acc.union(&mp);
                }
            }
            Ok(normalize_areal(acc))
        }
        _ => Err(invariant("unnormalized geometry kind in engine store")),
    }
}

/// Regular `4 * quadsegs`-gon inscribed in the circle around `center`.
fn disc(center: Coord, radius: f64, quadsegs: u32) -> Polygon {
    let n = 4 * quadsegs as usize;
    let mut coords = Vec::with_capacity(n + 1);
    for k in 0..n {
        let theta = std::f64::consts::TAU * k as f64 / n as f64;
        coords.push(Coord {
            x: center.x + radius * theta.cos(),
            y: center.y + radius * theta.sin(),
        });
    }
    coords.push(coords[0]);
    Polygon::new(LineString::new(coords), vec![])
}

fn line_buffer(ls: &LineString, distance: f64, quadsegs: u32) -> MultiPolygon {
    let mut parts: Vec<Polygon> = ls.0.iter().map(|c| disc(*c, distance, quadsegs)).collect();
    for line in ls.lines() {
        let (dx, dy) = (line.dx(), line.dy());
        let len = (dx * dx + dy * dy).sqrt();
        if len == 0.0 {
            continue;
        }
        let (nx, ny) = (-dy / len * distance, dx / len * distance);
        let (s, e) = (line.start, line.end);
        parts.push(Polygon::new(
            LineString::new(vec![
                Coord { x: s.x + nx, y: s.y + ny },
                Coord { x: e.x + nx, y: e.y + ny },
                Coord { x: e.x - nx, y: e.y - ny },
                Coord { x: s.x - nx, y: s.y - ny },
                Coord { x: s.x + nx, y: s.y + ny },
            ]),
            vec![],
        ));
    }
    union_all(parts)
}

fn ring_linework_buffer(mp: &MultiPolygon, distance: f64, quadsegs: u32) -> MultiPolygon {
    let mut acc = MultiPolygon(vec![]);
    for polygon in &mp.0 {
        for ring in rings_of(polygon) {
            acc = acc.union(&line_buffer(&ring, distance, quadsegs));
        }
    }
    acc
}

fn union_all(parts: Vec<Polygon>) -> MultiPolygon {
    let mut acc: Option<MultiPolygon> = None;
    for part in parts {
        let part = MultiPolygon(vec![part]);
        acc = Some(match acc {
            None => part,
            Some(mp) => mp.union(&part),
        });
    }
    acc.unwrap_or(MultiPolygon(vec![]))
}

fn empty_polygon() -> geo::Geometry {
    geo::Geometry::Polygon(Polygon::new(LineString::new(vec![]), vec![]))
}

fn normalize_areal(mp: MultiPolygon) -> geo::Geometry {
    let mut polygons = mp.0;
    if polygons.len() == 1 {
        geo::Geometry::Polygon(polygons.remove(0))
    } else {
        geo::Geometry::MultiPolygon(MultiPolygon(polygons))
    }
}

fn to_areal(geometry: &geo::Geometry) -> Option<MultiPolygon> {
    match geometry {
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p.clone()])),
        geo::Geometry::MultiPolygon(mp) => Some(mp.clone()),
        _ => None,
    }
}

// Overlay
// -------

#[derive(Clone, Copy, Debug)]
pub(crate) enum OverlayOp {
    Difference,
    Intersection,
    SymmetricDifference,
    Union,
}

impl OverlayOp {
    fn name(&self) -> &'static str {
        match self {
            OverlayOp::Difference => "difference",
            OverlayOp::Intersection => "intersection",
            OverlayOp::SymmetricDifference => "symmetric_difference",
            OverlayOp::Union => "union",
        }
    }
}

pub(crate) fn overlay(
    a: &geo::Geometry,
    b: &geo::Geometry,
    op: OverlayOp,
) -> Result<geo::Geometry> {
    if let (Some(ma), Some(mb)) = (to_areal(a), to_areal(b)) {
        let out = match op {
            OverlayOp::Difference => ma.difference(&mb),
            OverlayOp::Intersection => ma.intersection(&mb),
            OverlayOp::SymmetricDifference => ma.xor(&mb),
            OverlayOp::Union => ma.union(&mb),
        };
        return Ok(normalize_areal(out));
    }
    if let Some(pa) = to_points(a) {
        if let Some(pb) = to_points(b) {
            return Ok(point_set_overlay(pa, pb, op));
        }
        // Point set against an arbitrary geometry: membership semantics.
        match op {
            OverlayOp::Intersection => {
                return Ok(normalize_points(
                    pa.into_iter().filter(|p| b.intersects(p)).collect(),
                ))
            }
            OverlayOp::Difference => {
                return Ok(normalize_points(
                    pa.into_iter().filter(|p| !b.intersects(p)).collect(),
                ))
            }
            _ => {}
        }
    }
    Err(unsupported(
        op.name(),
        "the geo backend implements overlay for areal and point operands only",
    ))
}

fn to_points(geometry: &geo::Geometry) -> Option<Vec<Point>> {
    match geometry {
        geo::Geometry::Point(p) => Some(vec![*p]),
        geo::Geometry::MultiPoint(mp) => Some(mp.0.clone()),
        _ => None,
    }
}

fn point_set_overlay(a: Vec<Point>, b: Vec<Point>, op: OverlayOp) -> geo::Geometry {
    let in_b = |p: &Point| b.iter().any(|q| q == p);
    let in_a = |p: &Point| a.iter().any(|q| q == p);
    let out: Vec<Point> = match op {
        OverlayOp::Intersection => a.iter().copied().filter(in_b).collect(),
        OverlayOp::Difference => a.iter().copied().filter(|p| !in_b(p)).collect(),
        OverlayOp::SymmetricDifference => a
            .iter()
            .copied()
            .filter(|p| !in_b(p))
            .chain(b.iter().copied().filter(|p| !in_a(p)))
            .collect(),
        OverlayOp::Union => a
            .iter()
            .copied()
            .chain(b.iter().copied().filter(|p| !in_a(p)))
            .collect(),
    };
    normalize_points(dedupe_points(out))
}

/// Keeps the first occurrence of each point. The operands are unsorted, so
/// adjacency-based dedup is not enough.
fn dedupe_points(points: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if !out.contains(&p) {
            out.push(p);
        }
    }
    out
}

fn normalize_points(mut points: Vec<Point>) -> geo::Geometry {
    if points.len() == 1 {
        geo::Geometry::Point(points.remove(0))
    } else {
        geo::Geometry::MultiPoint(MultiPoint(points))
    }
}

// Unary predicates
// ----------------

pub(crate) fn is_empty(geometry: &geo::Geometry) -> bool {
    HasDimensions::is_empty(geometry)
}

pub(crate) fn is_ring(geometry: &geo::Geometry) -> bool {
    match geometry {
        geo::Geometry::LineString(ls) => {
            ls.0.len() >= 4 && ls.is_closed() && line_string_is_simple(ls)
        }
        _ => false,
    }
}

pub(crate) fn is_simple(geometry: &geo::Geometry) -> bool {
    match geometry {
        geo::Geometry::Point(_) => true,
        geo::Geometry::MultiPoint(mp) => {
            let mut seen: Vec<Coord> = Vec::with_capacity(mp.0.len());
            for p in &mp.0 {
                if seen.contains(&p.0) {
                    return false;
                }
                seen.push(p.0);
            }
            true
        }
        geo::Geometry::LineString(ls) => line_string_is_simple(ls),
        geo::Geometry::MultiLineString(mls) => mls.0.iter().all(line_string_is_simple),
        // Per SFS, polygonal geometry is simple by definition.
        geo::Geometry::Polygon(_) | geo::Geometry::MultiPolygon(_) => true,
        geo::Geometry::GeometryCollection(gc) => gc.0.iter().all(is_simple),
        _ => false,
    }
}

/// No proper self-intersections, no collinear overlaps, no revisited
/// vertices other than adjacent joints and the closing point of a ring.
fn line_string_is_simple(ls: &LineString) -> bool {
    let lines: Vec<_> = ls.lines().filter(|l| l.start != l.end).collect();
    if lines.len() < 2 {
        return true;
    }
    let closed = ls.is_closed();
    for i in 0..lines.len() {
        for j in (i + 1)..lines.len() {
            let adjacent = j == i + 1 || (closed && i == 0 && j == lines.len() - 1);
            if let Some(hit) = line_intersection(lines[i], lines[j]) {
                match hit {
                    LineIntersection::SinglePoint { is_proper, .. } => {
                        if is_proper || !adjacent {
                            return false;
                        }
                    }
                    LineIntersection::Collinear { .. } => return false,
                }
            }
        }
    }
    true
}

/// Structural validity: finite coordinates, no single-coordinate lines,
/// closed simple rings of at least four coordinates. Strong enough that a
/// self-intersecting ring produced by non-topology-preserving simplification
/// reports invalid.
pub(crate) fn is_valid(geometry: &geo::Geometry) -> bool {
    if !geometry
        .coords_iter()
        .all(|c| c.x.is_finite() && c.y.is_finite())
    {
        return false;
    }
    match geometry {
        geo::Geometry::LineString(ls) => ls.0.len() != 1,
        geo::Geometry::MultiLineString(mls) => mls.0.iter().all(|ls| ls.0.len() != 1),
        geo::Geometry::Polygon(p) => polygon_rings_valid(p),
        geo::Geometry::MultiPolygon(mp) => mp.0.iter().all(polygon_rings_valid),
        geo::Geometry::GeometryCollection(gc) => gc.0.iter().all(is_valid),
        _ => true,
    }
}

fn polygon_rings_valid(polygon: &Polygon) -> bool {
    ring_valid(polygon.exterior()) && polygon.interiors().iter().all(ring_valid)
}

fn ring_valid(ring: &LineString) -> bool {
    if ring.0.is_empty() {
        return true;
    }
    ring.0.len() >= 4 && ring.is_closed() && line_string_is_simple(ring)
}

// Binary predicates via DE-9IM
// ----------------------------

/// Recovers the DE-9IM matrix cell by cell through the pattern API.
pub(crate) fn relate_matrix(a: &geo::Geometry, b: &geo::Geometry) -> Result<String> {
    let im = a.relate(b);
    let mut out = String::with_capacity(9);
    for cell in 0..9 {
        let mut resolved = None;
        for cand in ['F', '0', '1', '2'] {
            let pattern: String = (0..9).map(|i| if i == cell { cand } else { '*' }).collect();
            let hit = im
                .matches(&pattern)
                .map_err(|e| invariant(&format!("DE-9IM pattern query failed: {e}")))?;
            if hit {
                resolved = Some(cand);
                break;
            }
        }
        match resolved {
            Some(c) => out.push(c),
            None => return Err(invariant("DE-9IM cell outside {F,0,1,2}")),
        }
    }
    Ok(out)
}

pub(crate) fn de9im_matches(matrix: &str, pattern: &str) -> bool {
    matrix.bytes().zip(pattern.bytes()).all(|(m, p)| match p {
        b'*' => true,
        b'T' => m != b'F',
        _ => m == p,
    })
}

pub(crate) fn contains(a: &geo::Geometry, b: &geo::Geometry) -> Result<bool> {
    Ok(de9im_matches(&relate_matrix(a, b)?, "T*****FF*"))
}

pub(crate) fn within(a: &geo::Geometry, b: &geo::Geometry) -> Result<bool> {
    Ok(de9im_matches(&relate_matrix(a, b)?, "T*F**F***"))
}

pub(crate) fn equals(a: &geo::Geometry, b: &geo::Geometry) -> Result<bool> {
    Ok(de9im_matches(&relate_matrix(a, b)?, "T*F**FFF*"))
}

pub(crate) fn disjoint(a: &geo::Geometry, b: &geo::Geometry) -> Result<bool> {
    Ok(de9im_matches(&relate_matrix(a, b)?, "FF*FF****"))
}

pub(crate) fn intersects(a: &geo::Geometry, b: &geo::Geometry) -> Result<bool> {
    Ok(!disjoint(a, b)?)
}

pub(crate) fn touches(a: &geo::Geometry, b: &geo::Geometry) -> Result<bool> {
    let m = relate_matrix(a, b)?;
    Ok(["FT*******", "F**T*****", "F***T****"]
        .iter()
        .any(|p| de9im_matches(&m, p)))
}

pub(crate) fn crosses(a: &geo::Geometry, b: &geo::Geometry) -> Result<bool> {
    use Dimensions::*;
    let m = relate_matrix(a, b)?;
    Ok(match (a.dimensions(), b.dimensions()) {
        (ZeroDimensional, OneDimensional)
        | (ZeroDimensional, TwoDimensional)
        | (OneDimensional, TwoDimensional) => de9im_matches(&m, "T*T******"),
        (OneDimensional, ZeroDimensional)
        | (TwoDimensional, ZeroDimensional)
        | (TwoDimensional, OneDimensional) => de9im_matches(&m, "T*****T**"),
        (OneDimensional, OneDimensional) => de9im_matches(&m, "0********"),
        _ => false,
    })
}

pub(crate) fn overlaps(a: &geo::Geometry, b: &geo::Geometry) -> Result<bool> {
    use Dimensions::*;
    let m = relate_matrix(a, b)?;
    Ok(match (a.dimensions(), b.dimensions()) {
        (ZeroDimensional, ZeroDimensional) | (TwoDimensional, TwoDimensional) => {
            de9im_matches(&m, "T*T***T**")
        }
        (OneDimensional, OneDimensional) => de9im_matches(&m, "1*T***T**"),
        _ => false,
    })
}

/// Structural equality: same kind, same coordinate count, coordinates equal
/// per axis within `tolerance`.
pub(crate) fn equals_exact(a: &geo::Geometry, b: &geo::Geometry, tolerance: f64) -> Result<bool> {
    if type_tag_of(a)? != type_tag_of(b)? {
        return Ok(false);
    }
    let ca: Vec<Coord> = a.coords_iter().collect();
    let cb: Vec<Coord> = b.coords_iter().collect();
    Ok(ca.len() == cb.len()
        && ca
            .iter()
            .zip(&cb)
            .all(|(p, q)| (p.x - q.x).abs() <= tolerance && (p.y - q.y).abs() <= tolerance))
}

// Linear referencing
// ------------------

pub(crate) fn project(
    line: &geo::Geometry,
    point: &geo::Geometry,
    normalized: bool,
) -> Result<f64> {
    let geo::Geometry::LineString(ls) = line else {
        return Err(unsupported(
            "project",
            "this backend projects onto LineString receivers only",
        ));
    };
    let geo::Geometry::Point(p) = point else {
        return Err(unsupported("project", "the argument must be a Point"));
    };
    let fraction = ls.line_locate_point(p).ok_or_else(|| {
        GeoShellError::InvalidGeometry("cannot project onto a degenerate line".to_string())
    })?;
    if normalized {
        Ok(fraction)
    } else {
        Ok(fraction * ls.euclidean_length())
    }
}

pub(crate) fn interpolate(
    line: &geo::Geometry,
    value: f64,
    normalized: bool,
) -> Result<geo::Geometry> {
    let geo::Geometry::LineString(ls) = line else {
        return Err(unsupported(
            "interpolate",
            "this backend interpolates along LineString receivers only",
        ));
    };
    let fraction = if normalized {
        value
    } else {
        let len = ls.euclidean_length();
        if len == 0.0 {
            return Err(GeoShellError::InvalidGeometry(
                "cannot interpolate along a zero-length line".to_string(),
            ));
        }
        value / len
    };
    if !fraction.is_finite() {
        return Err(GeoShellError::InvalidGeometry(
            "interpolation distance must be finite".to_string(),
        ));
    }
    ls.line_interpolate_point(fraction.clamp(0.0, 1.0))
        .map(geo::Geometry::Point)
        .ok_or_else(|| {
            GeoShellError::InvalidGeometry("cannot interpolate along an empty line".to_string())
        })
}

// Serialization
// -------------

pub(crate) fn to_wkb(geometry: &geo::Geometry) -> Result<Vec<u8>> {
    Ok(geometry.to_wkb(CoordDimensions::xy())?)
}

pub(crate) fn from_wkb(bytes: &[u8]) -> Result<geo::Geometry> {
    Ok(geozero::wkb::Wkb(bytes.to_vec()).to_geo()?)
}

pub(crate) fn to_wkt(geometry: &geo::Geometry) -> Result<String> {
    Ok(geometry.to_wkt()?)
}

pub(crate) fn from_wkt(wkt: &str) -> Result<geo::Geometry> {
    Ok(geozero::wkt::WktStr(wkt).to_geo()?)
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use geo::{line_string, point, polygon};

    use super::*;

    fn unit_square() -> geo::Geometry {
        geo::Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ])
    }

    #[test]
    fn disc_area_matches_regular_polygon_formula() {
        for quadsegs in [3u32, 16, 128] {
            let n = (4 * quadsegs) as f64;
            let expected = n / 2.0 * (std::f64::consts::TAU / n).sin();
            let p = disc(Coord { x: 0.0, y: 0.0 }, 1.0, quadsegs);
            assert_relative_eq!(p.unsigned_area(), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_buffer_preserves_polygon_area() {
        let g = unit_square();
        let buffered = buffer(&g, 0.0, 16).unwrap();
        assert_relative_eq!(area(&buffered), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn negative_buffer_of_a_point_is_empty() {
        let g = geo::Geometry::Point(point!(x: 0.0, y: 0.0));
        let buffered = buffer(&g, -1.0, 16).unwrap();
        assert!(is_empty(&buffered));
    }

    #[test]
    fn boundary_of_open_line_is_its_endpoints() {
        let g = geo::Geometry::LineString(line_string![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 2.0, y: 1.0),
        ]);
        let b = boundary(&g).unwrap();
        match b {
            geo::Geometry::MultiPoint(mp) => {
                assert_eq!(mp.0.len(), 2);
                assert_eq!(mp.0[0], point!(x: 0.0, y: 0.0));
                assert_eq!(mp.0[1], point!(x: 2.0, y: 1.0));
            }
            other => panic!("expected MultiPoint boundary, got {other:?}"),
        }
    }

    #[test]
    fn boundary_of_closed_line_is_empty() {
        let g = geo::Geometry::LineString(line_string![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 0.5, y: 1.0),
            (x: 0.0, y: 0.0),
        ]);
        let b = boundary(&g).unwrap();
        assert!(is_empty(&b));
    }

    #[test]
    fn bowtie_ring_is_not_simple_and_polygon_not_valid() {
        let bowtie = line_string![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 0.0),
        ];
        assert!(!line_string_is_simple(&bowtie));
        let p = geo::Geometry::Polygon(Polygon::new(bowtie, vec![]));
        assert!(!is_valid(&p));
        assert!(is_valid(&unit_square()));
    }

    #[test]
    fn square_ring_is_simple_and_a_ring() {
        let ring = line_string![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        assert!(line_string_is_simple(&ring));
        assert!(is_ring(&geo::Geometry::LineString(ring)));
    }

    #[test]
    fn relate_point_inside_polygon() {
        let a = geo::Geometry::Point(point!(x: 0.5, y: 0.5));
        let b = unit_square();
        assert_eq!(relate_matrix(&a, &b).unwrap(), "0FFFFF212");
        assert!(within(&a, &b).unwrap());
        assert!(contains(&b, &a).unwrap());
        assert!(intersects(&a, &b).unwrap());
        assert!(!disjoint(&a, &b).unwrap());
    }

    #[test]
    fn relate_overlapping_squares() {
        let a = geo::Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ]);
        let b = geo::Geometry::Polygon(polygon![
            (x: 1.0, y: 1.0),
            (x: 3.0, y: 1.0),
            (x: 3.0, y: 3.0),
            (x: 1.0, y: 3.0),
            (x: 1.0, y: 1.0),
        ]);
        assert_eq!(relate_matrix(&a, &b).unwrap(), "212101212");
        assert!(overlaps(&a, &b).unwrap());
        assert!(!touches(&a, &b).unwrap());
    }

    #[test]
    fn touching_squares_touch() {
        let a = unit_square();
        let b = geo::Geometry::Polygon(polygon![
            (x: 1.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 0.0),
        ]);
        assert!(touches(&a, &b).unwrap());
        assert!(!overlaps(&a, &b).unwrap());
    }

    #[test]
    fn crossing_lines_cross() {
        let a = geo::Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 2.0)]);
        let b = geo::Geometry::LineString(line_string![(x: 0.0, y: 2.0), (x: 2.0, y: 0.0)]);
        assert!(crosses(&a, &b).unwrap());
    }

    #[test]
    fn equals_exact_respects_tolerance_and_kind() {
        let a = geo::Geometry::Point(point!(x: 0.0, y: 0.0));
        let b = geo::Geometry::Point(point!(x: 0.0, y: 1e-7));
        assert!(equals_exact(&a, &b, 0.5e-6).unwrap());
        assert!(!equals_exact(&a, &b, 1e-8).unwrap());
        let c = geo::Geometry::MultiPoint(MultiPoint(vec![point!(x: 0.0, y: 0.0)]));
        assert!(!equals_exact(&a, &c, 1.0).unwrap());
    }

    #[test]
    fn overlay_union_of_disjoint_squares_sums_area() {
        let a = unit_square();
        let b = geo::Geometry::Polygon(polygon![
            (x: 5.0, y: 5.0),
            (x: 6.0, y: 5.0),
            (x: 6.0, y: 6.0),
            (x: 5.0, y: 6.0),
            (x: 5.0, y: 5.0),
        ]);
        let u = overlay(&a, &b, OverlayOp::Union).unwrap();
        assert!(matches!(u, geo::Geometry::MultiPolygon(_)));
        assert_relative_eq!(area(&u), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn point_set_union_dedupes_shared_members() {
        let a = geo::Geometry::MultiPoint(MultiPoint(vec![
            point!(x: 0.0, y: 0.0),
            point!(x: 1.0, y: 1.0),
        ]));
        let b = geo::Geometry::Point(point!(x: 0.0, y: 0.0));
        let u = overlay(&a, &b, OverlayOp::Union).unwrap();
        match &u {
            geo::Geometry::MultiPoint(mp) => assert_eq!(mp.0.len(), 2),
            other => panic!("expected MultiPoint union, got {other:?}"),
        }
        assert!(is_simple(&u));
        // Duplicates inside one operand collapse too.
        let c = geo::Geometry::MultiPoint(MultiPoint(vec![
            point!(x: 2.0, y: 2.0),
            point!(x: 0.0, y: 0.0),
            point!(x: 2.0, y: 2.0),
        ]));
        let s = overlay(&a, &c, OverlayOp::SymmetricDifference).unwrap();
        match s {
            geo::Geometry::MultiPoint(mp) => {
                assert_eq!(mp.0, vec![point!(x: 1.0, y: 1.0), point!(x: 2.0, y: 2.0)]);
            }
            other => panic!("expected MultiPoint, got {other:?}"),
        }
    }

    #[test]
    fn overlay_rejects_lineal_operands() {
        let a = geo::Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]);
        let err = overlay(&a, &unit_square(), OverlayOp::Union).unwrap_err();
        assert!(matches!(
            err,
            GeoShellError::UnsupportedOperation { op: "union", .. }
        ));
    }

    #[test]
    fn project_and_interpolate_round_trip() {
        let line = geo::Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]);
        let p = geo::Geometry::Point(point!(x: 3.0, y: 4.0));
        assert_relative_eq!(project(&line, &p, false).unwrap(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(project(&line, &p, true).unwrap(), 0.3, epsilon = 1e-12);
        let q = interpolate(&line, 3.0, false).unwrap();
        assert!(equals_exact(&q, &geo::Geometry::Point(point!(x: 3.0, y: 0.0)), 1e-12).unwrap());
        let r = interpolate(&line, 0.3, true).unwrap();
        assert!(equals_exact(&q, &r, 1e-12).unwrap());
    }

    #[test]
    fn wkb_round_trip() {
        let g = unit_square();
        let bytes = to_wkb(&g).unwrap();
        let back = from_wkb(&bytes).unwrap();
        assert!(equals_exact(&g, &back, 0.0).unwrap());
    }

    #[test]
    fn wkt_round_trip() {
        let g = geo::Geometry::Point(point!(x: 1.5, y: -2.25));
        let s = to_wkt(&g).unwrap();
        let back = from_wkt(&s).unwrap();
        assert!(equals_exact(&g, &back, 0.0).unwrap());
    }

    #[test]
    fn length_of_polygon_is_its_perimeter() {
        assert_relative_eq!(length(&unit_square()).unwrap(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn distance_between_squares() {
        let a = unit_square();
        let b = geo::Geometry::Polygon(polygon![
            (x: 3.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 1.0),
            (x: 3.0, y: 1.0),
            (x: 3.0, y: 0.0),
        ]);
        assert_relative_eq!(distance(&a, &b).unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn convex_hull_of_three_points_is_a_polygon() {
        let g = geo::Geometry::MultiPoint(MultiPoint(vec![
            point!(x: 0.0, y: 0.0),
            point!(x: 1.0, y: 0.0),
            point!(x: 0.5, y: 1.0),
        ]));
        let hull = convex_hull(&g).unwrap();
        assert!(matches!(hull, geo::Geometry::Polygon(_)));
        assert_relative_eq!(area(&hull), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn envelope_degenerates_to_point() {
        let g = geo::Geometry::Point(point!(x: 2.0, y: 3.0));
        assert!(matches!(
            envelope(&g).unwrap(),
            geo::Geometry::Point(p) if p == point!(x: 2.0, y: 3.0)
        ));
    }

    #[test]
    fn non_preserving_simplify_may_go_invalid_without_error() {
        // A tight zigzag that RDP collapses into a self-crossing ring.
        let g = geo::Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 4.0),
            (x: 2.0, y: 0.1),
            (x: 0.0, y: 4.0),
            (x: 0.0, y: 0.0),
        ]);
        let out = simplify(&g, 1.0, false).unwrap();
        // No error either way; validity is allowed to be lost.
        let _ = is_valid(&out);
    }
}
