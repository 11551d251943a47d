//! Chunked scan that sums raster cells whose centre falls inside a geometry.
//!
//! The pixel window is read tile by tile into one reusable buffer, so memory
//! stays bounded by the tile size no matter how large the region is. Each
//! cell is sampled at its centre only; cells are not area-weighted.

use std::num::NonZeroUsize;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::affine::Affine;
use crate::chunk::{PixelWindow, TileWindow};
use crate::error::RasterError;
use crate::geometry::Geometry;
use crate::raster::RasterSource;

/// Running totals of a scan.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Accumulation {
    pub sum: f64,
    pub cells: usize,
    pub tiles: usize,
}

/// Sum every non-no-data cell of `window` whose centre lies in `geometry`.
///
/// Tiles are visited top to bottom, left to right, with exactly one read per
/// tile. Any read failure aborts the scan; no partial sum is returned.
#[allow(clippy::too_many_arguments)]
pub fn accumulate<S: RasterSource + ?Sized>(
    window: &PixelWindow,
    geometry: &Geometry,
    transform: &Affine,
    tile_size: NonZeroUsize,
    source: &mut S,
    nodata: f64,
    parallel: bool,
) -> Result<Accumulation, RasterError> {
    let side = tile_size.get();
    let mut buf = Vec::with_capacity(side.saturating_mul(side).min(window.pixel_count()));
    let mut total = Accumulation::default();

    source.begin_scan(window, tile_size);
    for tile in window.tiles(tile_size) {
        source.read_block(tile.col_off, tile.row_off, tile.width, tile.height, &mut buf)?;
        if buf.len() != tile.width * tile.height {
            return Err(RasterError::Read(format!(
                "block at ({}, {}) returned {} values, expected {}",
                tile.col_off,
                tile.row_off,
                buf.len(),
                tile.width * tile.height
            )));
        }

        let (sum, cells) = if parallel {
            buf.par_chunks(tile.width)
                .enumerate()
                .map(|(i, row)| scan_row(row, &tile, i, geometry, transform, nodata))
                .reduce(|| (0.0, 0), |a, b| (a.0 + b.0, a.1 + b.1))
        } else {
            buf.chunks(tile.width)
                .enumerate()
                .map(|(i, row)| scan_row(row, &tile, i, geometry, transform, nodata))
                .fold((0.0, 0), |a, b| (a.0 + b.0, a.1 + b.1))
        };

        trace!(
            col = tile.col_off,
            row = tile.row_off,
            width = tile.width,
            height = tile.height,
            sum,
            cells,
            "Scanned tile"
        );

        total.sum += sum;
        total.cells += cells;
        total.tiles += 1;
    }

    debug!(
        sum = total.sum,
        cells = total.cells,
        tiles = total.tiles,
        "Accumulated population"
    );
    Ok(total)
}

/// Sum of one tile row; `local_row` is relative to the tile's top edge.
fn scan_row(
    values: &[f64],
    tile: &TileWindow,
    local_row: usize,
    geometry: &Geometry,
    transform: &Affine,
    nodata: f64,
) -> (f64, usize) {
    let row = tile.row_off + local_row;
    let mut sum = 0.0;
    let mut cells = 0;

    for (j, &value) in values.iter().enumerate() {
        if value == nodata || value.is_nan() {
            continue;
        }
        let (x, y) = transform.pixel_center(tile.col_off + j, row);
        if geometry.contains(x, y) {
            sum += value;
            cells += 1;
        }
    }

    (sum, cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::plan_window;
    use crate::raster::MemoryRaster;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    fn ts(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn full_window(raster: &MemoryRaster) -> PixelWindow {
        let (w, h) = raster.dimensions();
        PixelWindow {
            x_start: 0,
            x_end: w - 1,
            y_start: 0,
            y_end: h - 1,
        }
    }

    #[test]
    fn test_unit_square_counts_one_cell() {
        let transform = Affine::north_up(0.0, 2.0, 1.0, -1.0);
        let mut raster = MemoryRaster::new(array![[5.0, 5.0], [5.0, 5.0]], transform, None);
        let geom =
            Geometry::polygon(vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)])
                .unwrap();
        let window = plan_window(&geom.bounding_box().unwrap(), &transform, 2, 2).unwrap();

        let acc = accumulate(&window, &geom, &transform, ts(256), &mut raster, -200.0, false)
            .unwrap();
        assert_relative_eq!(acc.sum, 5.0);
        assert_eq!(acc.cells, 1);
        assert_eq!(acc.tiles, 1);
    }

    #[test]
    fn test_nodata_cells_never_count() {
        let transform = Affine::north_up(0.0, 3.0, 1.0, -1.0);
        let mut raster = MemoryRaster::new(
            array![[1.0, -200.0, 1.0], [-200.0, 4.0, f64::NAN], [1.0, 1.0, -200.0]],
            transform,
            None,
        );
        let geom = Geometry::polygon(vec![(0.0, 0.0), (3.0, 0.0), (3.0, 3.0), (0.0, 3.0)]).unwrap();
        let window = full_window(&raster);

        let acc = accumulate(&window, &geom, &transform, ts(2), &mut raster, -200.0, false)
            .unwrap();
        assert_relative_eq!(acc.sum, 8.0);
        assert_eq!(acc.cells, 5);
    }

    #[test]
    fn test_one_read_per_tile() {
        let transform = Affine::north_up(0.0, 10.0, 1.0, -1.0);
        let mut raster = MemoryRaster::new(Array2::from_elem((10, 10), 1.0), transform, None);
        let geom =
            Geometry::polygon(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]).unwrap();
        let window = full_window(&raster);

        let acc = accumulate(&window, &geom, &transform, ts(3), &mut raster, -200.0, false)
            .unwrap();
        // 10 / 3 -> 4 tiles per axis
        assert_eq!(acc.tiles, 16);
        assert_eq!(raster.reads(), 16);
        assert_relative_eq!(acc.sum, 100.0);
    }

    #[test]
    fn test_tile_size_invariance() {
        let transform = Affine::north_up(-3.0, 4.0, 0.25, -0.25);
        let data = Array2::from_shape_fn((37, 29), |(r, c)| ((r * 31 + c * 17) % 11) as f64);
        let geom = Geometry::polygon(vec![
            (-2.3, 0.1),
            (1.9, -3.9),
            (4.0, 0.5),
            (0.7, 3.8),
            (-1.0, 1.2),
        ])
        .unwrap();
        let window = plan_window(&geom.bounding_box().unwrap(), &transform, 29, 37).unwrap();

        let run = |tile: usize, parallel: bool| {
            let mut raster = MemoryRaster::new(data.clone(), transform, None);
            accumulate(&window, &geom, &transform, ts(tile), &mut raster, -200.0, parallel)
                .unwrap()
        };

        let reference = run(256, false);
        assert!(reference.cells > 0);
        for (tile, parallel) in [(1, false), (5, false), (16, true), (256, true)] {
            let acc = run(tile, parallel);
            assert_eq!(acc.sum, reference.sum, "tile {tile}, parallel {parallel}");
            assert_eq!(acc.cells, reference.cells);
        }
    }

    struct FailingRaster {
        inner: MemoryRaster,
        fail_on: usize,
    }

    impl RasterSource for FailingRaster {
        fn dimensions(&self) -> (usize, usize) {
            self.inner.dimensions()
        }

        fn transform(&self) -> Affine {
            self.inner.transform()
        }

        fn nodata(&self) -> Option<f64> {
            None
        }

        fn read_block(
            &mut self,
            col: usize,
            row: usize,
            width: usize,
            height: usize,
            buf: &mut Vec<f64>,
        ) -> Result<(), RasterError> {
            if self.inner.reads() == self.fail_on {
                return Err(RasterError::Read("disk went away".into()));
            }
            self.inner.read_block(col, row, width, height, buf)
        }
    }

    #[test]
    fn test_read_failure_aborts_scan() {
        let transform = Affine::north_up(0.0, 4.0, 1.0, -1.0);
        let mut raster = FailingRaster {
            inner: MemoryRaster::new(Array2::from_elem((4, 4), 1.0), transform, None),
            fail_on: 2,
        };
        let geom = Geometry::polygon(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]).unwrap();
        let window = PixelWindow {
            x_start: 0,
            x_end: 3,
            y_start: 0,
            y_end: 3,
        };

        let result = accumulate(&window, &geom, &transform, ts(2), &mut raster, -200.0, false);
        assert!(matches!(result, Err(RasterError::Read(_))));
    }
}
