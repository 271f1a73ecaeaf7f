use crate::error::{AppError, Result};
use crate::load::DataPaths;
use clap::{Parser, Subcommand};
use epoch_atlas_lib::{CityDensity, ColorHash, DetailLevel, EngineConfig, Palette, Year};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Epoch Atlas - Query a historical world map by year and location
pub struct Settings {
    /// Region polygon files; part files are concatenated in the order given
    #[clap(short, long, value_name = "FILE")]
    pub regions: Vec<PathBuf>,

    /// City point collection
    #[clap(short, long, value_name = "FILE")]
    pub cities: Option<PathBuf>,

    /// Second city source merged into the first
    #[clap(long, value_name = "FILE")]
    pub secondary_cities: Option<PathBuf>,

    /// Years before this take their populations from the second city source
    #[clap(long, default_value = "1000", allow_negative_numbers = true)]
    pub prefer_secondary_before: Year,

    /// River and lake-centerline collections
    #[clap(long, value_name = "FILE")]
    pub rivers: Vec<PathBuf>,

    /// World population and GDP series
    #[clap(long, value_name = "FILE")]
    pub world_stats: Option<PathBuf>,

    /// Engine config as JSON; the options below override it
    #[clap(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Degrees a city may sit outside a coastline and still match (default 0.15)
    #[clap(long)]
    pub city_tolerance: Option<f64>,

    /// Largest gap in years merged into one reign (default 5)
    #[clap(long)]
    pub merge_gap: Option<u32>,

    /// Entity colour palette: vivid, pastel or earth
    #[clap(long)]
    pub palette: Option<Palette>,

    /// Name hash for colour seeds: crc32, fnv1a or djb2
    #[clap(long)]
    pub color_hash: Option<ColorHash>,

    /// Pretty-print the JSON output
    #[clap(long, default_value = "false")]
    pub pretty: bool,

    /// Write a Chrome trace to this file (profiling builds only)
    #[clap(long, value_name = "FILE")]
    pub trace: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

/// One query per invocation
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Dataset counts, year span and load status
    Info,
    /// Regions visible at a year
    #[clap(allow_negative_numbers = true)]
    Visible {
        #[clap(long)]
        year: Year,
    },
    /// Region containing a point
    #[clap(allow_negative_numbers = true)]
    RegionAt {
        #[clap(long)]
        lon: f64,
        #[clap(long)]
        lat: f64,
        #[clap(long)]
        year: Year,
    },
    /// Region a city at this point belongs to, with coastline tolerance
    #[clap(allow_negative_numbers = true)]
    CityRegion {
        #[clap(long)]
        lon: f64,
        #[clap(long)]
        lat: f64,
        #[clap(long)]
        year: Year,
    },
    /// Cities shown at a year, largest first
    #[clap(allow_negative_numbers = true)]
    Cities {
        #[clap(long)]
        year: Year,
        /// sparse, normal, dense or all
        #[clap(long, default_value = "normal")]
        density: CityDensity,
    },
    /// Population estimate of one city
    #[clap(allow_negative_numbers = true)]
    Population {
        #[clap(long)]
        city: String,
        #[clap(long)]
        year: Year,
    },
    /// Every reign that covered a point, oldest first
    #[clap(allow_negative_numbers = true)]
    History {
        #[clap(long)]
        lon: f64,
        #[clap(long)]
        lat: f64,
    },
    /// Earliest year an entity appears
    Founding {
        #[clap(long)]
        name: String,
    },
    /// World totals and per-entity breakdown at a year
    #[clap(allow_negative_numbers = true)]
    Metrics {
        #[clap(long)]
        year: Year,
    },
    /// Totals over a year range, precomputed in batches
    #[clap(allow_negative_numbers = true)]
    Series {
        #[clap(long)]
        from: Year,
        #[clap(long)]
        to: Year,
        #[clap(long, default_value = "50")]
        stride: u32,
        #[clap(long, default_value = "8")]
        batch_size: usize,
        /// Also stack the areas of this many largest entities
        #[clap(long)]
        top: Option<usize>,
    },
    /// Rivers passing near a point
    #[clap(allow_negative_numbers = true)]
    Rivers {
        #[clap(long)]
        year: Year,
        #[clap(long)]
        lon: f64,
        #[clap(long)]
        lat: f64,
        /// Search radius in degrees
        #[clap(long, default_value = "0.5")]
        radius: f64,
        /// major, standard or full
        #[clap(long, default_value = "full")]
        detail: DetailLevel,
    },
    /// Regions a river system flows through
    #[clap(allow_negative_numbers = true)]
    RiverRegions {
        #[clap(long)]
        group: i64,
        #[clap(long)]
        year: Year,
    },
    /// Entities bordering an entity
    #[clap(allow_negative_numbers = true)]
    Neighbours {
        #[clap(long)]
        name: String,
        #[clap(long)]
        year: Year,
    },
    /// World population and GDP per capita
    #[clap(allow_negative_numbers = true)]
    World {
        #[clap(long)]
        year: Year,
    },
}

impl Settings {
    /// Parse the process arguments, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn data_paths(&self) -> DataPaths {
        DataPaths {
            regions: self.regions.clone(),
            cities: self.cities.clone(),
            secondary_cities: self.secondary_cities.clone(),
            prefer_secondary_before: self.prefer_secondary_before,
            rivers: self.rivers.clone(),
            world_stats: self.world_stats.clone(),
        }
    }

    /// Engine config from the optional JSON file, with command-line overrides applied
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| AppError::Read {
                    path: path.clone(),
                    source,
                })?;
                serde_json::from_str(&text).map_err(|source| AppError::Config {
                    path: path.clone(),
                    source,
                })?
            }
            None => EngineConfig::default(),
        };

        if let Some(tolerance) = self.city_tolerance {
            config.city_tolerance = tolerance.max(0.0);
        }
        if let Some(gap) = self.merge_gap {
            config.merge_gap = gap;
        }
        if let Some(palette) = self.palette {
            config.palette = palette;
        }
        if let Some(color_hash) = self.color_hash {
            config.color_hash = color_hash;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_negative_years() {
        let settings = Settings::try_parse_from([
            "epoch-atlas",
            "--regions",
            "a.geojson",
            "--regions",
            "b.geojson",
            "region-at",
            "--lon",
            "-3.7",
            "--lat",
            "40.4",
            "--year",
            "-200",
        ])
        .unwrap();

        assert_eq!(settings.regions.len(), 2);
        assert_eq!(
            settings.command,
            Command::RegionAt {
                lon: -3.7,
                lat: 40.4,
                year: -200
            }
        );
    }

    #[test]
    fn test_overrides_applied_to_config() {
        let settings = Settings::try_parse_from([
            "epoch-atlas",
            "--merge-gap",
            "10",
            "--palette",
            "earth",
            "info",
        ])
        .unwrap();

        let config = settings.engine_config().unwrap();
        assert_eq!(config.merge_gap, 10);
        assert_eq!(config.palette, Palette::Earth);
        assert_eq!(config.city_tolerance, 0.15);
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let result = Settings::try_parse_from(["epoch-atlas", "--palette", "neon", "info"]);
        assert!(result.is_err());

        let result =
            Settings::try_parse_from(["epoch-atlas", "cities", "--year", "0", "--density", "packed"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_series_defaults() {
        let settings =
            Settings::try_parse_from(["epoch-atlas", "series", "--from", "-500", "--to", "500"])
                .unwrap();
        match settings.command {
            Command::Series {
                from,
                to,
                stride,
                batch_size,
                top,
            } => {
                assert_eq!((from, to, stride, batch_size, top), (-500, 500, 50, 8, None));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
