//! Top-level population computation.
//!
//! Parse the region, open the raster, reject disjoint extents, plan the pixel
//! window and run the chunked accumulator. The raster is owned by the call
//! and dropped on every exit path.

use std::path::Path;

use tracing::{debug, info};

use crate::chunk::plan_window;
use crate::error::{GeometryError, PopulationError, RasterError};
use crate::geojson::parse_geometry;
use crate::geometry::Geometry;
use crate::raster::{GeoTiffSource, RasterSource};

use super::accumulate::accumulate;
use super::{PopulationOutcome, PopulationSummary, ScanOptions};

/// Population inside a GeoJSON region over the raster produced by `open`.
///
/// The geometry is parsed before `open` is called, so malformed input never
/// touches the raster.
pub fn compute_population<S, F>(
    geojson: &str,
    open: F,
    options: &ScanOptions,
) -> Result<PopulationOutcome, PopulationError>
where
    S: RasterSource,
    F: FnOnce() -> Result<S, RasterError>,
{
    let geometry = parse_geometry(geojson)?;
    let mut source = open()?;
    population_in(&geometry, &mut source, options)
}

/// [`compute_population`] over a GeoTIFF file.
pub fn compute_population_from_path<P: AsRef<Path>>(
    geojson: &str,
    raster_path: P,
    options: &ScanOptions,
) -> Result<PopulationOutcome, PopulationError> {
    compute_population(geojson, || GeoTiffSource::open(raster_path), options)
}

/// Population inside an already-built geometry.
pub fn population_in<S: RasterSource + ?Sized>(
    geometry: &Geometry,
    source: &mut S,
    options: &ScanOptions,
) -> Result<PopulationOutcome, PopulationError> {
    let transform = source.transform();
    transform.check_north_up()?;

    let (width, height) = source.dimensions();
    let geometry_box = geometry.bounding_box().ok_or_else(|| {
        GeometryError::InvalidCoordinates("geometry has no polygons".into())
    })?;
    let raster_box = transform.bounds(width, height);

    if !geometry_box.overlaps(&raster_box) {
        info!(
            geometry = ?geometry_box,
            raster = ?raster_box,
            "Geometry does not overlap the raster"
        );
        return Ok(PopulationOutcome::NoOverlap);
    }

    let Some(window) = plan_window(&geometry_box, &transform, width, height) else {
        debug!(geometry = ?geometry_box, "Pixel window is empty after clamping");
        return Ok(PopulationOutcome::Counted(PopulationSummary::empty()));
    };

    let nodata = options.resolve_nodata(source.nodata());
    debug!(
        ?window,
        pixels = window.pixel_count(),
        tile_size = options.tile_size.get(),
        nodata,
        "Planned pixel window"
    );

    let acc = accumulate(
        &window,
        geometry,
        &transform,
        options.tile_size,
        source,
        nodata,
        options.parallel,
    )?;

    Ok(PopulationOutcome::Counted(PopulationSummary {
        population: acc.sum,
        cells: acc.cells,
        tiles: acc.tiles,
        window: Some(window),
    }))
}
