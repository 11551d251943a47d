//! Raster sources consumed by the population scan.

pub mod geotiff;
pub mod memory;

pub use geotiff::GeoTiffSource;
pub use memory::MemoryRaster;

use std::num::NonZeroUsize;

use crate::affine::Affine;
use crate::chunk::PixelWindow;
use crate::error::RasterError;

/// A single-band numeric grid with a geotransform.
///
/// Sources are closed when dropped.
pub trait RasterSource {
    /// (width, height) in pixels.
    fn dimensions(&self) -> (usize, usize);

    fn transform(&self) -> Affine;

    /// Declared no-data sentinel, if the source carries one.
    fn nodata(&self) -> Option<f64>;

    /// Read the `width` x `height` block whose top-left pixel is (`col`, `row`)
    /// into `buf`, row-major. `buf` is cleared first and holds exactly
    /// `width * height` values on success.
    fn read_block(
        &mut self,
        col: usize,
        row: usize,
        width: usize,
        height: usize,
        buf: &mut Vec<f64>,
    ) -> Result<(), RasterError>;

    /// Called once before `window` is read in `tile_size` blocks, so the
    /// source can size any caches to one row of tiles.
    fn begin_scan(&mut self, _window: &PixelWindow, _tile_size: NonZeroUsize) {}
}

/// Reject blocks that extend past the raster edge.
pub(crate) fn check_block(
    dims: (usize, usize),
    col: usize,
    row: usize,
    width: usize,
    height: usize,
) -> Result<(), RasterError> {
    let (cols, rows) = dims;
    let col_end = col.checked_add(width);
    let row_end = row.checked_add(height);
    match (col_end, row_end) {
        (Some(ce), Some(re)) if ce <= cols && re <= rows => Ok(()),
        _ => Err(RasterError::Read(format!(
            "block {width}x{height} at ({col}, {row}) exceeds raster {cols}x{rows}"
        ))),
    }
}
