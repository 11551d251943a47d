//! Population totals over polygon regions.

pub mod accumulate;
pub mod engine;

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::chunk::PixelWindow;

/// Edge length of the square blocks read from the raster.
pub const DEFAULT_TILE_SIZE: usize = 256;

/// No-data sentinel used when neither the caller nor the raster declares one.
pub const DEFAULT_NODATA: f64 = -200.0;

fn default_tile_size() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_TILE_SIZE).unwrap_or(NonZeroUsize::MIN)
}

/// Tuning knobs for a population scan.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Blocks are at most `tile_size` x `tile_size` pixels.
    pub tile_size: NonZeroUsize,
    /// Overrides the raster's declared no-data value.
    pub nodata: Option<f64>,
    /// Evaluate each tile's rows on the rayon pool.
    pub parallel: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            tile_size: default_tile_size(),
            nodata: None,
            parallel: false,
        }
    }
}

impl ScanOptions {
    #[must_use]
    pub fn with_tile_size(mut self, tile_size: NonZeroUsize) -> Self {
        self.tile_size = tile_size;
        self
    }

    #[must_use]
    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// The sentinel to skip: explicit override, then the raster's, then [`DEFAULT_NODATA`].
    pub fn resolve_nodata(&self, declared: Option<f64>) -> f64 {
        self.nodata.or(declared).unwrap_or(DEFAULT_NODATA)
    }
}

/// Totals from a completed scan.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PopulationSummary {
    /// Sum of all contained, valid cells.
    pub population: f64,
    /// Number of cells that contributed to `population`.
    pub cells: usize,
    /// Number of blocks read from the raster.
    pub tiles: usize,
    /// Scanned pixel rectangle; `None` when the region clipped to nothing.
    #[serde(skip)]
    pub window: Option<PixelWindow>,
}

impl PopulationSummary {
    pub(crate) fn empty() -> Self {
        Self {
            population: 0.0,
            cells: 0,
            tiles: 0,
            window: None,
        }
    }
}

/// Result of a population computation that did not fail.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PopulationOutcome {
    Counted(PopulationSummary),
    /// The region's extent is disjoint from the raster's.
    NoOverlap,
}

impl PopulationOutcome {
    /// Population total; zero when the region misses the raster.
    pub fn population(&self) -> f64 {
        match self {
            PopulationOutcome::Counted(summary) => summary.population,
            PopulationOutcome::NoOverlap => 0.0,
        }
    }

    pub fn is_no_overlap(&self) -> bool {
        matches!(self, PopulationOutcome::NoOverlap)
    }

    pub fn status(&self) -> &'static str {
        match self {
            PopulationOutcome::Counted(_) => "counted",
            PopulationOutcome::NoOverlap => "no_overlap",
        }
    }

    pub fn summary(&self) -> Option<&PopulationSummary> {
        match self {
            PopulationOutcome::Counted(summary) => Some(summary),
            PopulationOutcome::NoOverlap => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodata_resolution_order() {
        let opts = ScanOptions::default();
        assert_eq!(opts.resolve_nodata(None), DEFAULT_NODATA);
        assert_eq!(opts.resolve_nodata(Some(-9999.0)), -9999.0);
        assert_eq!(opts.with_nodata(0.0).resolve_nodata(Some(-9999.0)), 0.0);
    }

    #[test]
    fn test_options_from_json() {
        let opts: ScanOptions = serde_json::from_str(r#"{"tile_size": 64}"#).unwrap();
        assert_eq!(opts.tile_size.get(), 64);
        assert_eq!(opts.nodata, None);
        assert!(!opts.parallel);

        let opts: ScanOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, ScanOptions::default());
        assert_eq!(opts.tile_size.get(), DEFAULT_TILE_SIZE);

        assert!(serde_json::from_str::<ScanOptions>(r#"{"tile_size": 0}"#).is_err());
    }

    #[test]
    fn test_outcome_accessors() {
        let counted = PopulationOutcome::Counted(PopulationSummary {
            population: 12.5,
            cells: 3,
            tiles: 1,
            window: None,
        });
        assert_eq!(counted.population(), 12.5);
        assert_eq!(counted.status(), "counted");
        assert!(!counted.is_no_overlap());

        let missed = PopulationOutcome::NoOverlap;
        assert_eq!(missed.population(), 0.0);
        assert_eq!(missed.status(), "no_overlap");
        assert!(missed.summary().is_none());
    }
}
