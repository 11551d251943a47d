//! Pixel window planning and tiling for chunked raster scans.

pub mod planner;

pub use planner::{plan_window, PixelWindow, TileWindow, Tiles};
