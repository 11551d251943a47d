//! PyO3 bindings for the population engine.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use numpy::PyReadonlyArray2;
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::affine::Affine;
use crate::error::{PopulationError, RasterError};
use crate::population::engine::{compute_population, compute_population_from_path};
use crate::population::{PopulationOutcome, ScanOptions, DEFAULT_TILE_SIZE};
use crate::raster::MemoryRaster;

/// Geometry and transform problems are the caller's input; everything else is I/O.
fn to_py_err(err: PopulationError) -> PyErr {
    match err {
        PopulationError::Geometry(_) | PopulationError::Raster(RasterError::Transform(_)) => {
            PyValueError::new_err(err.to_string())
        }
        PopulationError::Raster(_) => PyIOError::new_err(err.to_string()),
    }
}

fn scan_options(tile_size: usize, nodata: Option<f64>, parallel: bool) -> PyResult<ScanOptions> {
    let tile_size = NonZeroUsize::new(tile_size)
        .ok_or_else(|| PyValueError::new_err("tile_size must be > 0"))?;
    Ok(ScanOptions {
        tile_size,
        nodata,
        parallel,
    })
}

fn run_path(
    py: Python<'_>,
    geojson: &str,
    raster_path: PathBuf,
    options: ScanOptions,
) -> PyResult<PopulationOutcome> {
    // Copy to owned before releasing GIL
    let geojson = geojson.to_string();
    py.allow_threads(move || compute_population_from_path(&geojson, &raster_path, &options))
        .map_err(to_py_err)
}

/// Total population inside a GeoJSON Polygon or MultiPolygon.
///
/// Args:
///     geojson: GeoJSON geometry object as a string.
///     raster_path: Path to a single-band GeoTIFF population grid.
///     tile_size: Edge length of the blocks read from the raster.
///     nodata: No-data value; defaults to the raster's GDAL_NODATA tag, then -200.
///     parallel: Evaluate each block's rows on a thread pool.
///
/// Returns:
///     The summed population. 0.0 when the geometry does not overlap the raster.
#[pyfunction]
#[pyo3(signature = (geojson, raster_path, tile_size=DEFAULT_TILE_SIZE, nodata=None, parallel=false))]
pub fn calculate_population(
    py: Python<'_>,
    geojson: &str,
    raster_path: PathBuf,
    tile_size: usize,
    nodata: Option<f64>,
    parallel: bool,
) -> PyResult<f64> {
    let options = scan_options(tile_size, nodata, parallel)?;
    run_path(py, geojson, raster_path, options).map(|outcome| outcome.population())
}

/// Like `calculate_population`, but reports how the total was obtained.
///
/// Returns:
///     Dict with keys:
///     - population: float
///     - status: "counted" or "no_overlap"
///     - cells: number of raster cells summed
///     - tiles: number of blocks read
#[pyfunction]
#[pyo3(signature = (geojson, raster_path, tile_size=DEFAULT_TILE_SIZE, nodata=None, parallel=false))]
pub fn population_report<'py>(
    py: Python<'py>,
    geojson: &str,
    raster_path: PathBuf,
    tile_size: usize,
    nodata: Option<f64>,
    parallel: bool,
) -> PyResult<Bound<'py, PyDict>> {
    let options = scan_options(tile_size, nodata, parallel)?;
    let outcome = run_path(py, geojson, raster_path, options)?;
    let (cells, tiles) = outcome
        .summary()
        .map(|s| (s.cells, s.tiles))
        .unwrap_or_default();

    let dict = PyDict::new(py);
    dict.set_item("population", outcome.population())?;
    dict.set_item("status", outcome.status())?;
    dict.set_item("cells", cells)?;
    dict.set_item("tiles", tiles)?;
    Ok(dict)
}

/// Total population inside a GeoJSON geometry over an in-memory grid.
///
/// Args:
///     geojson: GeoJSON geometry object as a string.
///     values: 2D float64 array indexed [row, col].
///     transform: Affine transform as 6-element tuple (a, b, c, d, e, f)
///         in rasterio convention: (pixel_width, rot_x, x_origin, rot_y, pixel_height, y_origin).
///         pixel_height is signed and already negative for north-up grids.
///     nodata: No-data value; defaults to -200.
///     tile_size: Edge length of the blocks scanned at a time.
///
/// Returns:
///     The summed population. 0.0 when the geometry does not overlap the grid.
#[pyfunction]
#[pyo3(signature = (geojson, values, transform, nodata=None, tile_size=DEFAULT_TILE_SIZE))]
pub fn population_from_array<'py>(
    py: Python<'py>,
    geojson: &str,
    values: PyReadonlyArray2<'py, f64>,
    transform: [f64; 6],
    nodata: Option<f64>,
    tile_size: usize,
) -> PyResult<f64> {
    let options = scan_options(tile_size, None, false)?;
    let geojson = geojson.to_string();
    let data = values.as_array().to_owned();

    let outcome = py
        .allow_threads(move || {
            let affine = Affine::new(
                transform[0],
                transform[1],
                transform[2],
                transform[3],
                transform[4],
                transform[5],
            );
            compute_population(
                &geojson,
                || Ok(MemoryRaster::new(data, affine, nodata)),
                &options,
            )
        })
        .map_err(to_py_err)?;

    Ok(outcome.population())
}
