//! Spatial joins between points, lines and the visible region set
//!
//! Exact polygon intersection on coarse historical boundaries misses matches near
//! edges, so these joins sample vertices and accept a tolerance band instead.
//! Overlapping claims resolve to the first match in dataset order; for city joins a
//! strict match is looked for before the tolerance band.

use crate::geometry::{self, BoundingBox};
use crate::visibility::visible_at;
use crate::{Region, Year};
use geo::{Coord, Geometry};

/// Region containing the point at `year`, first match in dataset order
pub fn region_at(lon: f64, lat: f64, year: Year, regions: &[Region]) -> Option<&Region> {
    #[cfg(feature = "profiling")]
    profiling::scope!("spatial::region_at");

    visible_at(year, regions)
        .into_iter()
        .find(|r| r.contains(lon, lat, 0.0))
}

/// Like [`region_at`] over an already filtered set, with a coastline tolerance band
///
/// A region that strictly contains the point always beats one that only reaches it
/// through the band; the band is consulted only when no boundary holds the point, and
/// then the first region in dataset order wins.
///
/// # Arguments
/// * `visible` - Regions visible at the query year
/// * `tolerance` - Degrees a point may sit outside a boundary and still match
pub fn city_region<'a>(
    lon: f64,
    lat: f64,
    visible: &[&'a Region],
    tolerance: f64,
) -> Option<&'a Region> {
    let inside = visible.iter().copied().find(|r| r.contains(lon, lat, 0.0));
    if inside.is_some() || tolerance <= 0.0 {
        return inside;
    }
    visible
        .iter()
        .copied()
        .find(|r| r.contains(lon, lat, tolerance))
}

/// Regions a polyline passes through
///
/// Candidates are pre-filtered by bounding box, then up to `max_samples` evenly
/// spaced vertices of the line are tested; a region is kept on its first hit.
pub fn regions_along_line<'a>(
    line: &Geometry<f64>,
    visible: &[&'a Region],
    max_samples: usize,
) -> Vec<&'a Region> {
    #[cfg(feature = "profiling")]
    profiling::scope!("spatial::regions_along_line");

    let Some(line_bbox) = geometry::bounding_box(line) else {
        return Vec::new();
    };
    let samples = geometry::sample_evenly(&geometry::probe_vertices(line), max_samples);

    visible
        .iter()
        .copied()
        .filter(|r| overlaps(r, &line_bbox, 0.0))
        .filter(|r| samples.iter().any(|p| r.contains(p.x, p.y, 0.0)))
        .collect()
}

/// Regions touching or lying just beyond a polygon's perimeter
///
/// Up to `max_samples` perimeter points are probed at their own position and offset by
/// `buffer` degrees east, west, north and south, which catches coastal neighbours that
/// never share an edge with the area.
pub fn regions_adjacent_to_area<'a>(
    area: &Geometry<f64>,
    visible: &[&'a Region],
    max_samples: usize,
    buffer: f64,
) -> Vec<&'a Region> {
    #[cfg(feature = "profiling")]
    profiling::scope!("spatial::regions_adjacent_to_area");

    let Some(area_bbox) = geometry::bounding_box(area) else {
        return Vec::new();
    };
    let perimeter = geometry::sample_evenly(&geometry::probe_vertices(area), max_samples);
    let probes: Vec<Coord<f64>> = perimeter
        .iter()
        .flat_map(|p| {
            [
                *p,
                Coord { x: p.x + buffer, y: p.y },
                Coord { x: p.x - buffer, y: p.y },
                Coord { x: p.x, y: p.y + buffer },
                Coord { x: p.x, y: p.y - buffer },
            ]
        })
        .collect();

    visible
        .iter()
        .copied()
        .filter(|r| overlaps(r, &area_bbox, buffer))
        .filter(|r| probes.iter().any(|p| r.contains(p.x, p.y, 0.0)))
        .collect()
}

#[inline]
fn overlaps(region: &Region, bbox: &BoundingBox, buffer: f64) -> bool {
    region
        .bounding_box()
        .is_some_and(|own| own.expanded(buffer).overlaps(bbox))
}
