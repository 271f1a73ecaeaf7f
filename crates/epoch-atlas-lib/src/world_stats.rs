//! Externally supplied world-level yearly aggregates

use crate::Year;
use serde::{Deserialize, Serialize};

/// One world-level sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldStat {
    pub year: Year,
    /// World population in millions
    pub population: f64,
    pub gdp_per_capita: f64,
}

/// Sparse world statistics, sorted by year
#[derive(Debug, Clone, Default)]
pub struct WorldStatSeries {
    samples: Vec<WorldStat>,
}

impl WorldStatSeries {
    /// Build a series; samples are sorted and a duplicated year keeps its last sample
    pub fn new(mut samples: Vec<WorldStat>) -> Self {
        samples.retain(|s| s.population.is_finite() && s.gdp_per_capita.is_finite());
        samples.sort_by_key(|s| s.year);

        let mut deduped: Vec<WorldStat> = Vec::with_capacity(samples.len());
        for sample in samples {
            match deduped.last_mut() {
                Some(last) if last.year == sample.year => *last = sample,
                _ => deduped.push(sample),
            }
        }

        Self { samples: deduped }
    }

    #[inline]
    pub fn samples(&self) -> &[WorldStat] {
        &self.samples
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// First and last sampled year
    pub fn span(&self) -> Option<(Year, Year)> {
        Some((self.samples.first()?.year, self.samples.last()?.year))
    }

    /// Value at `year`: the exact sample, or a linear blend of the bracketing samples
    ///
    /// `None` outside the sampled span.
    pub fn at(&self, year: Year) -> Option<WorldStat> {
        let index = match self.samples.binary_search_by_key(&year, |s| s.year) {
            Ok(exact) => return Some(self.samples[exact]),
            Err(insert_at) => insert_at,
        };
        if index == 0 || index >= self.samples.len() {
            return None;
        }

        let before = self.samples[index - 1];
        let after = self.samples[index];
        let t = (year - before.year) as f64 / (after.year - before.year) as f64;
        let lerp = |a: f64, b: f64| a + (b - a) * t;

        Some(WorldStat {
            year,
            population: lerp(before.population, after.population),
            gdp_per_capita: lerp(before.gdp_per_capita, after.gdp_per_capita),
        })
    }
}
