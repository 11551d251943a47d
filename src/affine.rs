use crate::error::RasterError;
use crate::geometry::bbox::BoundingBox;

/// A 2D affine transform representing a raster geotransform.
///
/// Maps pixel coordinates (col, row) to map coordinates (x, y):
///   x = a * col + b * row + c
///   y = d * col + e * row + f
///
/// In GDAL convention: [c, a, b, f, d, e], i.e.
/// [origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height].
/// We store as: [a, b, c, d, e, f]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// North-up transform from an upper-left origin and pixel size.
    ///
    /// `pixel_height` is signed; population grids almost always use a negative value.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self::new(pixel_width, 0.0, origin_x, 0.0, pixel_height, origin_y)
    }

    /// Apply the forward transform: (col, row) -> (x, y).
    pub fn forward(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.a * col + self.b * row + self.c;
        let y = self.d * col + self.e * row + self.f;
        (x, y)
    }

    /// Map coordinates of the centre of pixel (col, row).
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.forward(col as f64 + 0.5, row as f64 + 0.5)
    }

    pub fn is_north_up(&self) -> bool {
        self.b == 0.0 && self.d == 0.0
    }

    /// Reject transforms the window planner cannot invert axis by axis.
    pub fn check_north_up(&self) -> Result<(), RasterError> {
        if !self.is_north_up() {
            return Err(RasterError::Transform(format!(
                "rotated geotransforms are not supported (b={}, d={})",
                self.b, self.d
            )));
        }
        if self.a == 0.0 || self.e == 0.0 || !self.a.is_finite() || !self.e.is_finite() {
            return Err(RasterError::Transform(format!(
                "pixel size must be finite and non-zero (a={}, e={})",
                self.a, self.e
            )));
        }
        Ok(())
    }

    /// Map-space extent of a `width` x `height` grid under this transform.
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.forward(0.0, 0.0),
            self.forward(w, 0.0),
            self.forward(0.0, h),
            self.forward(w, h),
        ];
        BoundingBox::from_points(corners.iter().copied())
            .unwrap_or_else(|| BoundingBox::new(self.c, self.c, self.f, self.f))
    }
}
