//! Window planner: maps a map-space bounding box to the raster pixels it can
//! touch, then partitions that window into read tiles.
//!
//! The inversion is done axis by axis, which is only valid for north-up
//! rasters (no rotation terms). Callers must check
//! [`Affine::check_north_up`] first.

use std::num::NonZeroUsize;

use crate::affine::Affine;
use crate::geometry::bbox::BoundingBox;

/// Inclusive pixel rectangle, always inside `[0, width-1] x [0, height-1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelWindow {
    pub x_start: usize,
    pub x_end: usize,
    pub y_start: usize,
    pub y_end: usize,
}

impl PixelWindow {
    pub fn width(&self) -> usize {
        self.x_end - self.x_start + 1
    }

    pub fn height(&self) -> usize {
        self.y_end - self.y_start + 1
    }

    pub fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }

    /// Split into tiles of at most `tile_size` x `tile_size` pixels, row of
    /// tiles by row of tiles, left to right.
    pub fn tiles(&self, tile_size: NonZeroUsize) -> Tiles {
        Tiles {
            window: *self,
            size: tile_size.get(),
            col: self.x_start,
            row: self.y_start,
        }
    }
}

/// A block of pixels read and scanned as one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileWindow {
    /// Global column of the tile's left edge.
    pub col_off: usize,
    /// Global row of the tile's top edge.
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

/// Iterator returned by [`PixelWindow::tiles`].
#[derive(Clone, Debug)]
pub struct Tiles {
    window: PixelWindow,
    size: usize,
    col: usize,
    row: usize,
}

impl Iterator for Tiles {
    type Item = TileWindow;

    fn next(&mut self) -> Option<TileWindow> {
        if self.row > self.window.y_end {
            return None;
        }

        let col1 = self.col.saturating_add(self.size - 1).min(self.window.x_end);
        let row1 = self.row.saturating_add(self.size - 1).min(self.window.y_end);
        let tile = TileWindow {
            col_off: self.col,
            row_off: self.row,
            width: col1 - self.col + 1,
            height: row1 - self.row + 1,
        };

        if col1 == self.window.x_end {
            self.col = self.window.x_start;
            self.row = row1 + 1;
        } else {
            self.col = col1 + 1;
        }

        Some(tile)
    }
}

/// Pixel rectangle covering `bbox` on a `width` x `height` raster.
///
/// Returns `None` when no pixel of the box falls inside the raster.
pub fn plan_window(
    bbox: &BoundingBox,
    transform: &Affine,
    width: usize,
    height: usize,
) -> Option<PixelWindow> {
    if width == 0 || height == 0 {
        return None;
    }

    let (x_start, x_end) = axis_span(bbox.min_x, bbox.max_x, transform.c, transform.a)?;
    let (y_start, y_end) = axis_span(bbox.min_y, bbox.max_y, transform.f, transform.e)?;

    let (x_start, x_end) = clamp_span(x_start, x_end, width)?;
    let (y_start, y_end) = clamp_span(y_start, y_end, height)?;

    Some(PixelWindow {
        x_start,
        x_end,
        y_start,
        y_end,
    })
}

/// Pixel indices of `lo` and `hi` along one axis, ordered so that a negative
/// pixel size (north-up rows) maps the larger coordinate to the smaller index.
fn axis_span(lo: f64, hi: f64, origin: f64, pixel_size: f64) -> Option<(i64, i64)> {
    let a = ((lo - origin) / pixel_size).floor();
    let b = ((hi - origin) / pixel_size).floor();
    if !a.is_finite() || !b.is_finite() {
        return None;
    }
    let (a, b) = (a as i64, b as i64);
    Some((a.min(b), a.max(b)))
}

fn clamp_span(start: i64, end: i64, len: usize) -> Option<(usize, usize)> {
    let last = len as i64 - 1;
    if end < 0 || start > last {
        return None;
    }
    Some((start.max(0) as usize, end.min(last) as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile_size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_unit_square_on_north_up_grid() {
        // 2x2 grid, origin (0, 2), 1 unit pixels
        let transform = Affine::north_up(0.0, 2.0, 1.0, -1.0);
        let bbox = BoundingBox::new(0.0, 1.0, 0.0, 1.0);
        let window = plan_window(&bbox, &transform, 2, 2).unwrap();
        assert_eq!(
            window,
            PixelWindow {
                x_start: 0,
                x_end: 1,
                y_start: 1,
                y_end: 1,
            }
        );
    }

    #[test]
    fn test_window_is_clamped() {
        let transform = Affine::north_up(100.0, 50.0, 0.5, -0.5);
        let bbox = BoundingBox::new(90.0, 200.0, -10.0, 49.0);
        let window = plan_window(&bbox, &transform, 40, 30).unwrap();
        assert_eq!(window.x_start, 0);
        assert_eq!(window.x_end, 39);
        assert_eq!(window.y_start, 2);
        assert_eq!(window.y_end, 29);
    }

    #[test]
    fn test_never_out_of_range() {
        let transform = Affine::north_up(-5.0, 5.0, 0.75, -0.75);
        let (width, height) = (13, 9);
        let coords = [-40.0, -6.0, -5.0, -1.3, 0.0, 2.2, 4.99, 5.0, 9.0, 60.0];
        for &x0 in &coords {
            for &x1 in &coords {
                for &y0 in &coords {
                    for &y1 in &coords {
                        if x1 < x0 || y1 < y0 {
                            continue;
                        }
                        let bbox = BoundingBox::new(x0, x1, y0, y1);
                        if let Some(w) = plan_window(&bbox, &transform, width, height) {
                            assert!(w.x_start <= w.x_end && w.x_end < width, "{bbox:?} -> {w:?}");
                            assert!(w.y_start <= w.y_end && w.y_end < height, "{bbox:?} -> {w:?}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_disjoint_box_is_empty() {
        let transform = Affine::north_up(0.0, 10.0, 1.0, -1.0);
        let left = BoundingBox::new(-5.0, -3.0, 2.0, 4.0);
        let above = BoundingBox::new(2.0, 4.0, 12.0, 15.0);
        assert!(plan_window(&left, &transform, 10, 10).is_none());
        assert!(plan_window(&above, &transform, 10, 10).is_none());
        assert!(plan_window(&BoundingBox::new(0.0, 1.0, 0.0, 1.0), &transform, 0, 10).is_none());
    }

    #[test]
    fn test_tiles_cover_window_without_gaps() {
        let window = PixelWindow {
            x_start: 3,
            x_end: 12,
            y_start: 5,
            y_end: 11,
        };
        let mut covered = vec![vec![0u32; 20]; 20];
        let tiles: Vec<_> = window.tiles(tile_size(4)).collect();
        // 10 columns x 7 rows -> 3 x 2 tiles
        assert_eq!(tiles.len(), 6);
        for tile in &tiles {
            assert!(tile.width <= 4 && tile.height <= 4);
            for row in &mut covered[tile.row_off..tile.row_off + tile.height] {
                for cell in &mut row[tile.col_off..tile.col_off + tile.width] {
                    *cell += 1;
                }
            }
        }
        for (r, row) in covered.iter().enumerate() {
            for (c, &n) in row.iter().enumerate() {
                let inside = (3..=12).contains(&c) && (5..=11).contains(&r);
                assert_eq!(n, u32::from(inside), "pixel ({c}, {r})");
            }
        }
    }

    #[test]
    fn test_tile_order_rows_then_columns() {
        let window = PixelWindow {
            x_start: 0,
            x_end: 4,
            y_start: 0,
            y_end: 4,
        };
        let offsets: Vec<_> = window
            .tiles(tile_size(3))
            .map(|t| (t.col_off, t.row_off, t.width, t.height))
            .collect();
        assert_eq!(
            offsets,
            vec![(0, 0, 3, 3), (3, 0, 2, 3), (0, 3, 3, 2), (3, 3, 2, 2)]
        );
    }

    #[test]
    fn test_single_tile_when_large() {
        let window = PixelWindow {
            x_start: 2,
            x_end: 2,
            y_start: 7,
            y_end: 8,
        };
        let tiles: Vec<_> = window.tiles(tile_size(256)).collect();
        assert_eq!(
            tiles,
            vec![TileWindow {
                col_off: 2,
                row_off: 7,
                width: 1,
                height: 2,
            }]
        );
        assert_eq!(window.pixel_count(), 2);
    }
}
