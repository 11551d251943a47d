//! In-memory raster backed by an `ndarray` grid.

use ndarray::{s, Array2};

use crate::affine::Affine;
use crate::error::RasterError;

use super::{check_block, RasterSource};

/// A raster held entirely in memory, indexed `[(row, col)]`.
#[derive(Clone, Debug)]
pub struct MemoryRaster {
    data: Array2<f64>,
    transform: Affine,
    nodata: Option<f64>,
    reads: usize,
}

impl MemoryRaster {
    pub fn new(data: Array2<f64>, transform: Affine, nodata: Option<f64>) -> Self {
        Self {
            data,
            transform,
            nodata,
            reads: 0,
        }
    }

    /// Number of `read_block` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl RasterSource for MemoryRaster {
    fn dimensions(&self) -> (usize, usize) {
        (self.data.ncols(), self.data.nrows())
    }

    fn transform(&self) -> Affine {
        self.transform
    }

    fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    fn read_block(
        &mut self,
        col: usize,
        row: usize,
        width: usize,
        height: usize,
        buf: &mut Vec<f64>,
    ) -> Result<(), RasterError> {
        check_block(self.dimensions(), col, row, width, height)?;
        self.reads += 1;

        buf.clear();
        buf.extend(
            self.data
                .slice(s![row..row + height, col..col + width])
                .iter()
                .copied(),
        );
        Ok(())
    }
}
