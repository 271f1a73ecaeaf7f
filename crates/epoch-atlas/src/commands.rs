//! Query subcommands answered as JSON values

use crate::error::Result;
use crate::load::LoadReport;
use crate::runtime;
use crate::settings::Command;
use epoch_atlas_lib::{Atlas, PrecomputePlan, Region, RegionSummary, Year, YearTotals};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// Region summary with its display colour
#[derive(Debug, Serialize)]
struct RegionView {
    #[serde(flatten)]
    summary: RegionSummary,
    color: &'static str,
}

impl RegionView {
    fn new(atlas: &Atlas, region: &Region) -> Self {
        Self {
            summary: atlas.summary(region),
            color: atlas.color_for(region.name()),
        }
    }
}

#[derive(Debug, Serialize)]
struct TrendPoint {
    year: Year,
    #[serde(flatten)]
    totals: YearTotals,
}

#[derive(Debug, Serialize)]
struct RiverHit<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_id: Option<i64>,
    rank: u8,
    length_km: f64,
    /// Planar distance in degrees from the query point
    distance: f64,
}

fn region_views<'a>(atlas: &Atlas, regions: impl IntoIterator<Item = &'a Region>) -> Vec<RegionView> {
    regions
        .into_iter()
        .map(|region| RegionView::new(atlas, region))
        .collect()
}

/// Answer one query against the loaded snapshot
///
/// # Arguments
/// * `command` - The parsed subcommand
/// * `atlas` - Engine snapshot, shared with the precompute task
/// * `report` - Outcome of the load pass, echoed by `info`
///
/// # Returns
/// The JSON answer; "no data" answers are `null` or empty arrays, not errors
pub async fn execute(command: &Command, atlas: Arc<Atlas>, report: &LoadReport) -> Result<Value> {
    #[cfg(feature = "profiling")]
    profiling::scope!("commands::execute");

    tracing::debug!("Executing {:?}", command);

    let value = match command {
        Command::Info => json!({
            "atlas": atlas.info(),
            "sources": report.sources,
            "complete": report.is_complete(),
        }),

        Command::Visible { year } => {
            serde_json::to_value(region_views(&atlas, atlas.visible_at(*year)))?
        }

        Command::RegionAt { lon, lat, year } => serde_json::to_value(
            atlas
                .region_at(*lon, *lat, *year)
                .map(|r| RegionView::new(&atlas, r)),
        )?,

        Command::CityRegion { lon, lat, year } => serde_json::to_value(
            atlas
                .city_region(*lon, *lat, *year)
                .map(|r| RegionView::new(&atlas, r)),
        )?,

        Command::Cities { year, density } => serde_json::to_value(atlas.cities_at(*year, *density))?,

        Command::Population { city, year } => json!({
            "city": city,
            "year": year,
            "estimate": atlas.resolve_population(city, *year),
        }),

        Command::History { lon, lat } => serde_json::to_value(atlas.history(*lon, *lat))?,

        Command::Founding { name } => json!({
            "name": name,
            "founding_year": atlas.founding_year(name),
        }),

        Command::Metrics { year } => serde_json::to_value(&*atlas.year_metrics(*year))?,

        Command::Series {
            from,
            to,
            stride,
            batch_size,
            top,
        } => {
            let plan = PrecomputePlan::new(*from, *to)
                .with_stride(*stride)
                .with_batch_size(*batch_size);
            runtime::spawn(runtime::precompute(atlas.clone(), plan)).await?;

            let totals: Vec<TrendPoint> = atlas
                .trend_series(plan.years())
                .into_iter()
                .map(|(year, totals)| TrendPoint { year, totals })
                .collect();
            let stacked = top.map(|n| atlas.stacked_series(plan.years(), n));

            json!({
                "plan": plan,
                "totals": totals,
                "stacked": stacked,
            })
        }

        Command::Rivers {
            year,
            lon,
            lat,
            radius,
            detail,
        } => {
            let hits: Vec<RiverHit> = atlas
                .rivers_near(*lon, *lat, *radius, *detail)
                .into_iter()
                .map(|(feature, distance)| RiverHit {
                    name: feature.name.as_deref(),
                    group_id: feature.group_id,
                    rank: feature.rank,
                    length_km: feature.length_km(),
                    distance,
                })
                .collect();
            // Rivers carry no years; the year places the point in a region
            let region = atlas
                .region_at(*lon, *lat, *year)
                .map(|r| atlas.display_name(r));

            json!({
                "region": region,
                "rivers": hits,
            })
        }

        Command::RiverRegions { group, year } => json!({
            "system": atlas.river_system(*group),
            "regions": region_views(&atlas, atlas.regions_along_river_system(*group, *year)),
        }),

        Command::Neighbours { name, year } => {
            serde_json::to_value(region_views(&atlas, atlas.neighbours(name, *year)))?
        }

        Command::World { year } => serde_json::to_value(atlas.world_stat_at(*year))?,
    };

    Ok(value)
}
