//! Identity and continuity tracking across fragmented region records
//!
//! A polity's boundary history arrives as many fragments sharing one name. This
//! module recovers the entity-level view: its founding year over every fragment,
//! merged reign intervals at a location, and the label shown for a fragment.

use crate::visibility::{Temporal, is_composite_name};
use crate::{Region, Year};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Earliest `valid_from` per entity name over the full dataset
///
/// Built once when the dataset is loaded and never updated afterwards.
#[derive(Debug, Clone, Default)]
pub struct FoundingYearIndex {
    years: HashMap<String, Year>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl FoundingYearIndex {
    /// Scan every fragment once, skipping composite wrappers
    pub fn build<'a>(regions: impl IntoIterator<Item = &'a Region>) -> Self {
        let mut years: HashMap<String, Year> = HashMap::new();
        for region in regions {
            if region.is_composite() {
                continue;
            }
            years
                .entry(region.name().to_string())
                .and_modify(|earliest| *earliest = (*earliest).min(region.valid_from()))
                .or_insert(region.valid_from());
        }

        tracing::debug!("Founding year index built for {} entities", years.len());
        Self { years }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<Year> {
        self.years.get(name).copied()
    }

    /// Years elapsed since founding; `None` for unknown names
    #[inline]
    pub fn age_at(&self, name: &str, year: Year) -> Option<i64> {
        self.get(name).map(|founded| year as i64 - founded as i64)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.years.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

/// Minimum `valid_from` over every non-composite fragment named `name`
///
/// Uncached; [`FoundingYearIndex`] answers the same question in O(1).
pub fn founding_year(name: &str, regions: &[Region]) -> Option<Year> {
    regions
        .iter()
        .filter(|r| !r.is_composite() && r.name() == name)
        .map(|r| r.valid_from())
        .min()
}

/// A continuity-merged run of one entity's fragments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReignInterval {
    pub name: String,
    pub display_name: String,
    pub valid_from: Year,
    pub valid_to: Year,
    /// Largest fragment area within the run (km²)
    pub area: f64,
    /// Number of source fragments merged into this run
    pub fragments: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikipedia: Option<String>,
}

impl ReignInterval {
    pub fn from_region(region: &Region) -> Self {
        Self {
            name: region.name().to_string(),
            display_name: display_name(region),
            valid_from: region.valid_from(),
            valid_to: region.valid_to(),
            area: region.area(),
            fragments: 1,
            wikipedia: region.wikipedia().map(str::to_string),
        }
    }
}

/// Merge consecutive same-name intervals whose gap is at most `merge_gap` years
///
/// Input must already be ordered by `valid_from`. Overlapping intervals have a negative
/// gap and always merge.
pub fn merge_reigns(
    intervals: impl IntoIterator<Item = ReignInterval>,
    merge_gap: u32,
) -> Vec<ReignInterval> {
    let mut merged: Vec<ReignInterval> = Vec::new();

    for next in intervals {
        match merged.last_mut() {
            Some(prev)
                if prev.name == next.name
                    && next.valid_from as i64 - prev.valid_to as i64 <= merge_gap as i64 =>
            {
                prev.valid_to = prev.valid_to.max(next.valid_to);
                prev.area = prev.area.max(next.area);
                prev.fragments += next.fragments;
                if prev.wikipedia.is_none() {
                    prev.wikipedia = next.wikipedia;
                }
            }
            _ => merged.push(next),
        }
    }

    merged
}

/// Every reign that ever covered a point, oldest first
///
/// Collects the non-composite fragments containing the point across all years,
/// orders them by `valid_from` (stable, so dataset order breaks ties) and merges
/// runs split only by small filing gaps.
pub fn history(lon: f64, lat: f64, regions: &[Region], merge_gap: u32) -> Vec<ReignInterval> {
    #[cfg(feature = "profiling")]
    profiling::scope!("continuity::history");

    let mut hits: Vec<&Region> = regions
        .iter()
        .filter(|r| !r.is_composite() && r.contains(lon, lat, 0.0))
        .collect();
    hits.sort_by_key(|r| r.valid_from());

    let reigns = merge_reigns(hits.into_iter().map(ReignInterval::from_region), merge_gap);
    tracing::debug!(
        "History at ({lon}, {lat}): {} reigns from {} regions",
        reigns.len(),
        regions.len()
    );
    reigns
}

/// Strip the parentheses of a composite reference
fn composite_inner(reference: &str) -> &str {
    let reference = reference.trim();
    if is_composite_name(reference) {
        reference[1..reference.len() - 1].trim()
    } else {
        reference
    }
}

/// A parent reference naming the entity itself, directly or as its own composite
fn is_self_reference(name: &str, reference: &str) -> bool {
    composite_inner(reference) == name.trim()
}

/// First parent reference that is not a self-reference, parentheses stripped
pub fn parent_label(region: &Region) -> Option<&str> {
    region
        .parent_refs()
        .into_iter()
        .find(|reference| !is_self_reference(region.name(), reference))
        .map(composite_inner)
        .filter(|label| !label.is_empty())
}

/// Label combining the fragment's name with its parent entity, if it has one
pub fn display_name(region: &Region) -> String {
    match parent_label(region) {
        Some(parent) => format!("{} ({})", region.name(), parent),
        None => region.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry, LineString, Polygon};

    fn square(min: f64, max: f64) -> Geometry<f64> {
        Geometry::Polygon(Polygon::new(
            LineString::from(vec![(min, min), (max, min), (max, max), (min, max), (min, min)]),
            vec![],
        ))
    }

    fn region(name: &str, from: Year, to: Year) -> Region {
        Region::new(name, from, to, 100.0, square(0.0, 10.0)).unwrap()
    }

    #[test]
    fn test_founding_year_is_minimum() {
        let regions = vec![
            region("Rome", -27, 100),
            region("Rome", -509, -28),
            region("(Rome)", -800, 400),
            region("Carthage", -814, -146),
        ];
        let index = FoundingYearIndex::build(&regions);
        assert_eq!(index.get("Rome"), Some(-509));
        assert_eq!(index.get("Carthage"), Some(-814));
        assert_eq!(index.get("(Rome)"), None);
        assert_eq!(index.len(), 2);
        assert_eq!(founding_year("Rome", &regions), Some(-509));
        assert_eq!(founding_year("Atlantis", &regions), None);
        assert_eq!(index.age_at("Rome", 1), Some(510));
    }

    #[test]
    fn test_history_merges_small_gaps() {
        let regions = vec![region("Kingdom X", 153, 200), region("Kingdom X", 100, 150)];
        let reigns = history(5.0, 5.0, &regions, 5);
        assert_eq!(reigns.len(), 1);
        assert_eq!(reigns[0].valid_from, 100);
        assert_eq!(reigns[0].valid_to, 200);
        assert_eq!(reigns[0].fragments, 2);
    }

    #[test]
    fn test_history_keeps_large_gaps_apart() {
        let regions = vec![region("Kingdom X", 100, 150), region("Kingdom X", 156, 200)];
        let reigns = history(5.0, 5.0, &regions, 5);
        assert_eq!(reigns.len(), 2);
        assert_eq!(reigns[0].valid_to, 150);
        assert_eq!(reigns[1].valid_from, 156);
    }

    #[test]
    fn test_history_does_not_merge_different_names() {
        let regions = vec![
            region("A", 0, 10),
            region("B", 11, 20),
            region("A", 21, 30),
            region("(Wrapper)", 0, 30),
        ];
        let reigns = history(5.0, 5.0, &regions, 5);
        let names: Vec<&str> = reigns.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "A"]);
    }

    #[test]
    fn test_history_outside_point_is_empty() {
        let regions = vec![region("A", 0, 10)];
        assert!(history(50.0, 50.0, &regions, 5).is_empty());
    }

    #[test]
    fn test_merge_overlap_takes_max_end() {
        let a = ReignInterval::from_region(&region("A", 0, 100));
        let b = ReignInterval::from_region(&region("A", 50, 80));
        let merged = merge_reigns(vec![a, b], 5);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].valid_to, 100);
    }

    #[test]
    fn test_display_name_with_parent() {
        let r = region("Satrapy of Egypt", 0, 10)
            .with_member_of(Some("(Achaemenid Empire)".to_string()));
        assert_eq!(display_name(&r), "Satrapy of Egypt (Achaemenid Empire)");
    }

    #[test]
    fn test_display_name_suppresses_self_reference() {
        let r = region("Rome", 0, 10).with_member_of(Some("(Rome)".to_string()));
        assert_eq!(display_name(&r), "Rome");
        assert!(parent_label(&r).is_none());
    }

    #[test]
    fn test_display_name_skips_self_reference_to_next_parent() {
        let r = region("Rome", 0, 10)
            .with_member_of(Some("(Rome); (Latin League); Etruria".to_string()));
        assert_eq!(display_name(&r), "Rome (Latin League)");
    }
}
