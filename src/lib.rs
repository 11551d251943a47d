//! Population totals for polygon regions over gridded population rasters.
//!
//! A GeoJSON Polygon or MultiPolygon is overlaid on a single-band raster and
//! every cell whose centre falls inside the region is summed, skipping
//! no-data cells. The raster is scanned in fixed-size tiles so memory use is
//! bounded by the tile size, not the region.
//!
//! ```rust,no_run
//! use popgrid::population::{engine, ScanOptions};
//!
//! let geojson = r#"{"type": "Polygon", "coordinates": [[[0,0],[0,1],[1,1],[1,0],[0,0]]]}"#;
//! let outcome = engine::compute_population_from_path(geojson, "pop.tif", &ScanOptions::default())?;
//! println!("{} ({})", outcome.population(), outcome.status());
//! # Ok::<(), popgrid::error::PopulationError>(())
//! ```

#[cfg(feature = "python")]
use pyo3::prelude::*;

pub mod affine;
pub mod chunk;
pub mod error;
pub mod geojson;
pub mod geometry;
pub mod logging;
pub mod population;
pub mod raster;
#[cfg(feature = "python")]
mod py;

pub use error::{GeometryError, PopulationError, RasterError};
pub use population::engine::{compute_population, compute_population_from_path};
pub use population::{PopulationOutcome, PopulationSummary, ScanOptions};

/// A Python module implemented in Rust.
#[cfg(feature = "python")]
#[pymodule]
fn popgrid(m: &Bound<'_, PyModule>) -> PyResult<()> {
    py::register(m)?;
    Ok(())
}
