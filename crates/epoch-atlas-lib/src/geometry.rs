//! Geometry kernel: planar operations over longitude/latitude degrees
//!
//! Every function here is pure. Missing or malformed geometry never raises:
//! containment tests answer `false`, lookups answer `None` and lengths answer `0.0`.
//! Distances are planar degrees except [`haversine_km`] and [`polyline_length_km`].

use geo::{BoundingRect, Coord, CoordsIter, Geometry, LineString, Polygon, Rect};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Axis-aligned extent in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a bounding box, normalizing swapped bounds
    pub fn new(lon_a: f64, lat_a: f64, lon_b: f64, lat_b: f64) -> Self {
        Self {
            min_lon: lon_a.min(lon_b),
            max_lon: lon_a.max(lon_b),
            min_lat: lat_a.min(lat_b),
            max_lat: lat_a.max(lat_b),
        }
    }

    /// Whether the two boxes share any point (edges touching counts)
    ///
    /// Only answers `false` when the boxes are definitely disjoint.
    #[inline]
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }

    /// Grow the box by `buffer` degrees on every side
    #[inline]
    pub fn expanded(&self, buffer: f64) -> Self {
        Self {
            min_lon: self.min_lon - buffer,
            max_lon: self.max_lon + buffer,
            min_lat: self.min_lat - buffer,
            max_lat: self.max_lat + buffer,
        }
    }

    #[inline]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        Self {
            min_lon: rect.min().x,
            max_lon: rect.max().x,
            min_lat: rect.min().y,
            max_lat: rect.max().y,
        }
    }
}

/// Polygonal parts of a geometry (empty for non-polygonal kinds)
#[inline]
pub fn polygons(geometry: &Geometry<f64>) -> &[Polygon<f64>] {
    match geometry {
        Geometry::Polygon(polygon) => std::slice::from_ref(polygon),
        Geometry::MultiPolygon(multi) => &multi.0,
        _ => &[],
    }
}

/// Linear parts of a geometry (empty for non-linear kinds)
#[inline]
pub fn line_parts(geometry: &Geometry<f64>) -> &[LineString<f64>] {
    match geometry {
        Geometry::LineString(line) => std::slice::from_ref(line),
        Geometry::MultiLineString(multi) => &multi.0,
        _ => &[],
    }
}

/// Ring vertices without the repeated closing vertex
#[inline]
fn open_ring(ring: &LineString<f64>) -> &[Coord<f64>] {
    let coords = &ring.0;
    match (coords.first(), coords.last()) {
        (Some(first), Some(last)) if coords.len() > 1 && first == last => {
            &coords[..coords.len() - 1]
        }
        _ => coords,
    }
}

/// Even-odd ray casting test of a point against a closed ring
///
/// The ring may or may not repeat its first vertex. Self-intersecting rings give an
/// unspecified (but non-panicking) answer; rings with fewer than 3 vertices contain nothing.
pub fn point_in_ring(point: Coord<f64>, ring: &LineString<f64>) -> bool {
    let coords = &ring.0;
    let n = coords.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = coords[i];
        let b = coords[j];
        if ((a.y > point.y) != (b.y > point.y))
            && (point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Point-in-region test over every outer ring of a polygon or multipolygon
///
/// # Arguments
/// * `lon`, `lat` - Query point in degrees
/// * `geometry` - Polygon or MultiPolygon; any other kind never contains the point
/// * `tolerance` - When positive, a point within this many degrees of an outer-ring
///   edge is accepted even if it lies outside (coastline misalignment)
pub fn point_in_geometry(lon: f64, lat: f64, geometry: &Geometry<f64>, tolerance: f64) -> bool {
    let point = Coord { x: lon, y: lat };
    let parts = polygons(geometry);

    if parts.iter().any(|p| point_in_ring(point, p.exterior())) {
        return true;
    }

    tolerance > 0.0
        && parts
            .iter()
            .any(|p| distance_to_ring_edge(point, p.exterior()) <= tolerance)
}

/// Planar distance from a point to a segment; zero-length segments act as points
#[inline]
pub fn point_segment_distance(point: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;

    if len_sq == 0.0 {
        return (point.x - a.x).hypot(point.y - a.y);
    }

    let t = (((point.x - a.x) * dx + (point.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    (point.x - (a.x + t * dx)).hypot(point.y - (a.y + t * dy))
}

/// Minimum distance from a point to any edge of a ring, closing edge included
///
/// Returns `f64::INFINITY` for an empty ring so tolerance checks never accept it.
pub fn distance_to_ring_edge(point: Coord<f64>, ring: &LineString<f64>) -> f64 {
    let vertices = open_ring(ring);
    match vertices.len() {
        0 => f64::INFINITY,
        1 => point_segment_distance(point, vertices[0], vertices[0]),
        n => (0..n)
            .map(|i| point_segment_distance(point, vertices[i], vertices[(i + 1) % n]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Minimum distance from a point to any segment of a polyline or multi-polyline
///
/// Returns `f64::INFINITY` when the geometry has no linear parts.
pub fn distance_to_polyline(point: Coord<f64>, geometry: &Geometry<f64>) -> f64 {
    line_parts(geometry)
        .iter()
        .flat_map(|line| match line.0.as_slice() {
            [single] => vec![point_segment_distance(point, *single, *single)],
            coords => coords
                .windows(2)
                .map(|w| point_segment_distance(point, w[0], w[1]))
                .collect(),
        })
        .fold(f64::INFINITY, f64::min)
}

/// Bounding box of any geometry kind, descending through every nested part
pub fn bounding_box(geometry: &Geometry<f64>) -> Option<BoundingBox> {
    geometry.bounding_rect().map(BoundingBox::from)
}

/// Cheap pre-filter: `false` only when the boxes are definitely disjoint
#[inline]
pub fn bbox_overlap(a: &BoundingBox, b: &BoundingBox) -> bool {
    a.overlaps(b)
}

/// Shoelace area of a ring in square degrees (positive = counter-clockwise)
pub fn ring_signed_area(ring: &LineString<f64>) -> f64 {
    let vertices = open_ring(ring);
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }

    let mut twice_area = 0.0;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        twice_area += a.x * b.y - b.x * a.y;
    }
    twice_area / 2.0
}

/// Part with the largest outer-ring area; the first one wins ties
pub fn largest_polygon(geometry: &Geometry<f64>) -> Option<&Polygon<f64>> {
    polygons(geometry)
        .iter()
        .fold(None, |best: Option<(&Polygon<f64>, f64)>, polygon| {
            let area = ring_signed_area(polygon.exterior()).abs();
            match best {
                Some((_, best_area)) if best_area >= area => best,
                _ => Some((polygon, area)),
            }
        })
        .map(|(polygon, _)| polygon)
}

/// Arithmetic mean of the outer-ring vertices of the largest part
///
/// Non-polygonal geometries average all of their coordinates.
/// Returns `None` when there are no coordinates at all.
pub fn centroid(geometry: &Geometry<f64>) -> Option<Coord<f64>> {
    match largest_polygon(geometry) {
        Some(polygon) => mean_coord(open_ring(polygon.exterior()).iter().copied()),
        None => mean_coord(geometry.coords_iter()),
    }
}

fn mean_coord(coords: impl Iterator<Item = Coord<f64>>) -> Option<Coord<f64>> {
    let (sum, count) = coords.fold((Coord { x: 0.0, y: 0.0 }, 0usize), |(sum, count), c| {
        (
            Coord {
                x: sum.x + c.x,
                y: sum.y + c.y,
            },
            count + 1,
        )
    });

    (count > 0).then(|| Coord {
        x: sum.x / count as f64,
        y: sum.y / count as f64,
    })
}

/// Approximate pole of inaccessibility of the largest part
///
/// Samples a `grid × grid` lattice of cell centers over the part's bounding box, keeps
/// the samples inside the outer ring and returns the one farthest from any edge.
/// Falls back to [`centroid`] when no sample lands inside.
pub fn visual_center(geometry: &Geometry<f64>, grid: usize) -> Option<Coord<f64>> {
    let Some(polygon) = largest_polygon(geometry) else {
        return centroid(geometry);
    };
    let ring = polygon.exterior();
    let Some(rect) = ring.bounding_rect() else {
        return centroid(geometry);
    };

    let grid = grid.max(1);
    let step_x = rect.width() / grid as f64;
    let step_y = rect.height() / grid as f64;

    let mut best: Option<(Coord<f64>, f64)> = None;
    for i in 0..grid {
        for j in 0..grid {
            let candidate = Coord {
                x: rect.min().x + step_x * (i as f64 + 0.5),
                y: rect.min().y + step_y * (j as f64 + 0.5),
            };
            if !point_in_ring(candidate, ring) {
                continue;
            }
            let clearance = distance_to_ring_edge(candidate, ring);
            if best.is_none_or(|(_, best_clearance)| clearance > best_clearance) {
                best = Some((candidate, clearance));
            }
        }
    }

    best.map(|(coord, _)| coord).or_else(|| centroid(geometry))
}

/// Great-circle distance between two lon/lat coordinates in kilometers
#[inline]
pub fn haversine_km(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let lat1 = a.y.to_radians();
    let lat2 = b.y.to_radians();
    let delta_lat = (b.y - a.y).to_radians();
    let delta_lon = (b.x - a.x).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Sum of great-circle distances between consecutive vertices over all parts (km)
pub fn polyline_length_km(geometry: &Geometry<f64>) -> f64 {
    line_parts(geometry)
        .iter()
        .map(|line| {
            line.0
                .windows(2)
                .map(|w| haversine_km(w[0], w[1]))
                .sum::<f64>()
        })
        .sum()
}

/// First vertex of the first part and last vertex of the last part
pub fn polyline_endpoints(geometry: &Geometry<f64>) -> Option<(Coord<f64>, Coord<f64>)> {
    let parts = line_parts(geometry);
    let first = parts.iter().find_map(|line| line.0.first().copied())?;
    let last = parts.iter().rev().find_map(|line| line.0.last().copied())?;
    Some((first, last))
}

/// Vertices used to probe a geometry: outer rings for polygons, every coordinate otherwise
pub fn probe_vertices(geometry: &Geometry<f64>) -> Vec<Coord<f64>> {
    let parts = polygons(geometry);
    if parts.is_empty() {
        geometry.coords_iter().collect()
    } else {
        parts
            .iter()
            .flat_map(|p| open_ring(p.exterior()).iter().copied())
            .collect()
    }
}

/// Pick at most `max_samples` evenly spaced entries, always starting with the first
pub fn sample_evenly(coords: &[Coord<f64>], max_samples: usize) -> Vec<Coord<f64>> {
    if max_samples == 0 {
        return Vec::new();
    }
    if coords.len() <= max_samples {
        return coords.to_vec();
    }

    let step = coords.len() as f64 / max_samples as f64;
    (0..max_samples)
        .map(|k| coords[((k as f64 * step) as usize).min(coords.len() - 1)])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{MultiLineString, MultiPolygon, Point};

    fn square(min: f64, max: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(min, min), (max, min), (max, max), (min, max), (min, min)]),
            vec![],
        )
    }

    #[test]
    fn test_point_in_ring_square() {
        let poly = square(0.0, 10.0);
        assert!(point_in_ring(Coord { x: 5.0, y: 5.0 }, poly.exterior()));
        assert!(!point_in_ring(Coord { x: 15.0, y: 5.0 }, poly.exterior()));
        assert!(!point_in_ring(Coord { x: -0.1, y: 5.0 }, poly.exterior()));
    }

    #[test]
    fn test_point_in_ring_unclosed_and_degenerate() {
        let open = LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        assert!(point_in_ring(Coord { x: 1.0, y: 1.0 }, &open));

        let line = LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]);
        assert!(!point_in_ring(Coord { x: 0.5, y: 0.5 }, &line));

        let empty = LineString::<f64>::new(vec![]);
        assert!(!point_in_ring(Coord { x: 0.0, y: 0.0 }, &empty));
    }

    #[test]
    fn test_self_intersecting_ring_does_not_panic() {
        let bowtie = LineString::from(vec![(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0), (0.0, 0.0)]);
        let _ = point_in_ring(Coord { x: 1.0, y: 1.0 }, &bowtie);
        let _ = point_in_ring(Coord { x: 1.0, y: 0.5 }, &bowtie);
    }

    #[test]
    fn test_point_in_geometry_multipolygon() {
        let multi = Geometry::MultiPolygon(MultiPolygon(vec![square(0.0, 1.0), square(10.0, 11.0)]));
        assert!(point_in_geometry(10.5, 10.5, &multi, 0.0));
        assert!(point_in_geometry(0.5, 0.5, &multi, 0.0));
        assert!(!point_in_geometry(5.0, 5.0, &multi, 0.0));
    }

    #[test]
    fn test_point_in_geometry_tolerance() {
        let poly = Geometry::Polygon(square(0.0, 10.0));
        // 0.1 degrees east of the eastern edge
        assert!(!point_in_geometry(10.1, 5.0, &poly, 0.0));
        assert!(point_in_geometry(10.1, 5.0, &poly, 0.15));
        assert!(!point_in_geometry(10.2, 5.0, &poly, 0.15));
    }

    #[test]
    fn test_point_in_geometry_ignores_other_kinds() {
        let point = Geometry::Point(Point::new(1.0, 1.0));
        assert!(!point_in_geometry(1.0, 1.0, &point, 1.0));
        let line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (2.0, 2.0)]));
        assert!(!point_in_geometry(1.0, 1.0, &line, 1.0));
    }

    #[test]
    fn test_point_segment_distance() {
        let a = Coord { x: 0.0, y: 0.0 };
        let b = Coord { x: 10.0, y: 0.0 };
        assert!((point_segment_distance(Coord { x: 5.0, y: 3.0 }, a, b) - 3.0).abs() < 1e-12);
        // Beyond the end clamps to the endpoint
        assert!((point_segment_distance(Coord { x: 13.0, y: 4.0 }, a, b) - 5.0).abs() < 1e-12);
        // Zero-length segment
        assert!((point_segment_distance(Coord { x: 3.0, y: 4.0 }, a, a) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_to_ring_edge_includes_closing_edge() {
        // Unclosed triangle: the closing edge runs from (0, 4) back to (0, 0)
        let ring = LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)]);
        let d = distance_to_ring_edge(Coord { x: -1.0, y: 2.0 }, &ring);
        assert!((d - 1.0).abs() < 1e-12);

        let empty = LineString::<f64>::new(vec![]);
        assert!(distance_to_ring_edge(Coord { x: 0.0, y: 0.0 }, &empty).is_infinite());
    }

    #[test]
    fn test_bounding_box_nested() {
        let multi = Geometry::MultiPolygon(MultiPolygon(vec![square(0.0, 1.0), square(10.0, 11.0)]));
        let bbox = bounding_box(&multi).unwrap();
        assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 11.0, 11.0));

        let lines = Geometry::MultiLineString(MultiLineString(vec![
            LineString::from(vec![(-5.0, 2.0), (3.0, 4.0)]),
            LineString::from(vec![(7.0, -1.0)]),
        ]));
        let bbox = bounding_box(&lines).unwrap();
        assert_eq!(bbox.min_lon, -5.0);
        assert_eq!(bbox.max_lon, 7.0);
        assert_eq!(bbox.min_lat, -1.0);
        assert_eq!(bbox.max_lat, 4.0);

        let empty = Geometry::MultiPolygon(MultiPolygon::<f64>(vec![]));
        assert!(bounding_box(&empty).is_none());
    }

    #[test]
    fn test_bbox_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        let touching = BoundingBox::new(10.0, 0.0, 12.0, 2.0);
        assert!(bbox_overlap(&a, &b));
        assert!(!bbox_overlap(&a, &c));
        assert!(bbox_overlap(&a, &touching));
        assert!(bbox_overlap(&a, &c.expanded(10.0)));
    }

    #[test]
    fn test_centroid_picks_largest_part() {
        let multi = Geometry::MultiPolygon(MultiPolygon(vec![square(0.0, 1.0), square(10.0, 20.0)]));
        let c = centroid(&multi).unwrap();
        assert!((c.x - 15.0).abs() < 1e-12);
        assert!((c.y - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_centroid_clockwise_ring_still_largest() {
        // Clockwise large square and counter-clockwise small one
        let cw = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (0.0, 8.0), (8.0, 8.0), (8.0, 0.0), (0.0, 0.0)]),
            vec![],
        );
        let multi = Geometry::MultiPolygon(MultiPolygon(vec![square(20.0, 21.0), cw]));
        let c = centroid(&multi).unwrap();
        assert!((c.x - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_centroid_empty() {
        let empty = Geometry::MultiPolygon(MultiPolygon::<f64>(vec![]));
        assert!(centroid(&empty).is_none());
    }

    #[test]
    fn test_visual_center_concave() {
        // L-shape where the vertex mean falls outside the polygon body
        let l_shape = Geometry::Polygon(Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (10.0, 0.0),
                (10.0, 2.0),
                (2.0, 2.0),
                (2.0, 10.0),
                (0.0, 10.0),
                (0.0, 0.0),
            ]),
            vec![],
        ));
        let center = visual_center(&l_shape, 8).unwrap();
        assert!(point_in_geometry(center.x, center.y, &l_shape, 0.0));
    }

    #[test]
    fn test_visual_center_falls_back_to_centroid() {
        let sliver = Geometry::Polygon(Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]),
            vec![],
        ));
        assert_eq!(visual_center(&sliver, 8), centroid(&sliver));
    }

    #[test]
    fn test_polyline_length_one_degree_at_equator() {
        let line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]));
        let km = polyline_length_km(&line);
        assert!((km - 111.19).abs() < 0.1);

        let multi = Geometry::MultiLineString(MultiLineString(vec![
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]),
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]),
        ]));
        assert!((polyline_length_km(&multi) - 2.0 * km).abs() < 1e-9);

        let polygon = Geometry::Polygon(square(0.0, 1.0));
        assert_eq!(polyline_length_km(&polygon), 0.0);
    }

    #[test]
    fn test_polyline_endpoints() {
        let multi = Geometry::MultiLineString(MultiLineString(vec![
            LineString::from(vec![(1.0, 1.0), (2.0, 2.0)]),
            LineString::from(vec![(5.0, 5.0), (6.0, 7.0)]),
        ]));
        let (first, last) = polyline_endpoints(&multi).unwrap();
        assert_eq!(first, Coord { x: 1.0, y: 1.0 });
        assert_eq!(last, Coord { x: 6.0, y: 7.0 });

        let empty = Geometry::MultiLineString(MultiLineString::<f64>(vec![]));
        assert!(polyline_endpoints(&empty).is_none());
    }

    #[test]
    fn test_sample_evenly() {
        let coords: Vec<Coord<f64>> = (0..100).map(|i| Coord { x: i as f64, y: 0.0 }).collect();
        let samples = sample_evenly(&coords, 20);
        assert_eq!(samples.len(), 20);
        assert_eq!(samples[0].x, 0.0);
        assert_eq!(samples[1].x, 5.0);

        assert_eq!(sample_evenly(&coords[..3], 20).len(), 3);
        assert!(sample_evenly(&coords, 0).is_empty());
    }

    #[test]
    fn test_distance_to_polyline() {
        let line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]));
        assert!((distance_to_polyline(Coord { x: 5.0, y: 2.0 }, &line) - 2.0).abs() < 1e-12);

        let polygon = Geometry::Polygon(square(0.0, 1.0));
        assert!(distance_to_polyline(Coord { x: 0.0, y: 0.0 }, &polygon).is_infinite());
    }
}
