//! Single-band GeoTIFF source (no GDAL dependency).
//!
//! Georeferencing comes from ModelTransformationTag, or from ModelPixelScale
//! plus ModelTiepoint. Rasters flagged PixelIsPoint in the GeoKey directory
//! are shifted half a pixel so the transform addresses pixel corners. The
//! no-data sentinel comes from the GDAL_NODATA ascii tag when present.
//! Blocks are served by decoding only the strips or tiles they intersect;
//! decoded chunks are kept in an LRU sized to one row of read tiles, so each
//! chunk is decompressed once per tile row.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::num::NonZeroUsize;
use std::path::Path;

use lru::LruCache;
use num_traits::ToPrimitive;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::{debug, trace};

use crate::affine::Affine;
use crate::chunk::PixelWindow;
use crate::error::RasterError;

use super::{check_block, RasterSource};

// GeoKey IDs
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;

// GeoKey values
const RASTER_PIXEL_IS_POINT: u16 = 2;

/// A decoded strip or tile, widened to f64.
struct DecodedChunk {
    values: Vec<f64>,
    /// Distance between rows in `values`; larger than `width` for padded edge tiles.
    stride: usize,
    width: usize,
    height: usize,
}

/// A GeoTIFF opened for block reads.
pub struct GeoTiffSource<R: Read + Seek = BufReader<File>> {
    decoder: Decoder<R>,
    width: usize,
    height: usize,
    transform: Affine,
    nodata: Option<f64>,
    chunk_width: usize,
    chunk_height: usize,
    chunks_across: usize,
    cache: LruCache<u32, DecodedChunk>,
    decoded: usize,
}

impl GeoTiffSource {
    /// Open a GeoTIFF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| RasterError::Open(format!("{}: {e}", path.display())))?;

        let source = Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            RasterError::Open(msg) => RasterError::Open(format!("{}: {msg}", path.display())),
            other => other,
        })?;

        debug!(
            path = %path.display(),
            width = source.width,
            height = source.height,
            chunk = ?source.chunk_dimensions(),
            nodata = ?source.nodata,
            "Opened GeoTIFF"
        );
        Ok(source)
    }
}

impl<R: Read + Seek> GeoTiffSource<R> {
    /// Read GeoTIFF metadata from any seekable reader.
    pub fn from_reader(reader: R) -> Result<Self, RasterError> {
        let mut decoder = Decoder::new(reader)
            .map_err(|e| RasterError::Open(format!("TIFF decode error: {e}")))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| RasterError::Open(format!("Cannot read dimensions: {e}")))?;

        match decoder
            .colortype()
            .map_err(|e| RasterError::Open(format!("Cannot read color type: {e}")))?
        {
            ColorType::Gray(_) => {}
            other => {
                return Err(RasterError::Unsupported(format!(
                    "expected a single-band raster, found {other:?}"
                )))
            }
        }

        let transform = read_transform(&mut decoder)?;
        let nodata = read_nodata(&mut decoder);

        let (chunk_width, chunk_height) = decoder.chunk_dimensions();
        let (chunk_width, chunk_height) = (chunk_width as usize, chunk_height as usize);
        if chunk_width == 0 || chunk_height == 0 {
            return Err(RasterError::Unsupported(format!(
                "invalid chunk size {chunk_width}x{chunk_height}"
            )));
        }

        let width = width as usize;
        let chunks_across = width.div_ceil(chunk_width);
        // Resized by begin_scan once the read tile size is known
        let capacity = NonZeroUsize::new(chunks_across + 1).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            decoder,
            width,
            height: height as usize,
            transform,
            nodata,
            chunk_width,
            chunk_height,
            chunks_across,
            cache: LruCache::new(capacity),
            decoded: 0,
        })
    }

    /// Size of the file's strips or tiles in pixels.
    pub fn chunk_dimensions(&self) -> (usize, usize) {
        (self.chunk_width, self.chunk_height)
    }

    /// Number of strips or tiles decompressed so far.
    pub fn decoded_chunks(&self) -> usize {
        self.decoded
    }

    fn chunk(&mut self, cx: usize, cy: usize) -> Result<&DecodedChunk, RasterError> {
        let index = u32::try_from(cy * self.chunks_across + cx)
            .map_err(|_| RasterError::Read(format!("chunk ({cx}, {cy}) out of range")))?;

        if !self.cache.contains(&index) {
            let width = self.chunk_width.min(self.width - cx * self.chunk_width);
            let height = self.chunk_height.min(self.height - cy * self.chunk_height);

            let decoded = self
                .decoder
                .read_chunk(index)
                .map_err(|e| RasterError::Read(format!("chunk {index}: {e}")))?;
            let values = widen(decoded)?;
            self.decoded += 1;

            let stride = if values.len() == width * height {
                width
            } else if values.len() >= self.chunk_width * height {
                self.chunk_width
            } else {
                return Err(RasterError::Read(format!(
                    "chunk {index} decoded to {} values, expected {}",
                    values.len(),
                    width * height
                )));
            };

            trace!(index, width, height, "Decoded GeoTIFF chunk");
            self.cache.put(
                index,
                DecodedChunk {
                    values,
                    stride,
                    width,
                    height,
                },
            );
        }

        self.cache
            .get(&index)
            .ok_or_else(|| RasterError::Read(format!("chunk {index} missing from cache")))
    }
}

impl<R: Read + Seek> RasterSource for GeoTiffSource<R> {
    fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
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
        buf.clear();
        if width == 0 || height == 0 {
            return Ok(());
        }
        buf.resize(width * height, 0.0);

        let (cw, ch) = (self.chunk_width, self.chunk_height);
        let (col_end, row_end) = (col + width, row + height);

        for cy in row / ch..=(row_end - 1) / ch {
            for cx in col / cw..=(col_end - 1) / cw {
                let (chunk_col, chunk_row) = (cx * cw, cy * ch);
                let chunk = self.chunk(cx, cy)?;

                let c0 = col.max(chunk_col);
                let c1 = col_end.min(chunk_col + chunk.width);
                let r0 = row.max(chunk_row);
                let r1 = row_end.min(chunk_row + chunk.height);
                let n = c1 - c0;

                for r in r0..r1 {
                    let src = (r - chunk_row) * chunk.stride + (c0 - chunk_col);
                    let dst = (r - row) * width + (c0 - col);
                    buf[dst..dst + n].copy_from_slice(&chunk.values[src..src + n]);
                }
            }
        }

        Ok(())
    }

    fn begin_scan(&mut self, window: &PixelWindow, tile_size: NonZeroUsize) {
        let (cw, ch) = (self.chunk_width, self.chunk_height);
        // Chunk columns under the window, chunk rows under one unaligned tile row
        let across = window.x_end / cw - window.x_start / cw + 1;
        let tile_height = tile_size.get().min(window.height());
        let down = (tile_height.div_ceil(ch) + 1).min(self.height.div_ceil(ch));

        let capacity = NonZeroUsize::new(across.saturating_mul(down)).unwrap_or(NonZeroUsize::MIN);
        debug!(capacity, across, down, "Sized GeoTIFF chunk cache");
        self.cache.resize(capacity);
    }
}

fn widen(result: DecodingResult) -> Result<Vec<f64>, RasterError> {
    fn cast<T: ToPrimitive>(values: Vec<T>) -> Vec<f64> {
        values
            .into_iter()
            .map(|v| v.to_f64().unwrap_or(f64::NAN))
            .collect()
    }

    Ok(match result {
        DecodingResult::U8(buf) => cast(buf),
        DecodingResult::U16(buf) => cast(buf),
        DecodingResult::U32(buf) => cast(buf),
        DecodingResult::U64(buf) => cast(buf),
        DecodingResult::I8(buf) => cast(buf),
        DecodingResult::I16(buf) => cast(buf),
        DecodingResult::I32(buf) => cast(buf),
        DecodingResult::I64(buf) => cast(buf),
        DecodingResult::F32(buf) => cast(buf),
        DecodingResult::F64(buf) => buf,
        #[allow(unreachable_patterns)]
        _ => {
            return Err(RasterError::Unsupported(
                "unsupported TIFF sample format".into(),
            ))
        }
    })
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Affine, RasterError> {
    let transform = read_model_transform(decoder)?;
    if raster_type(decoder) != Some(RASTER_PIXEL_IS_POINT) {
        return Ok(transform);
    }

    // PixelIsPoint: model coordinates name pixel centres
    let (c, f) = transform.forward(-0.5, -0.5);
    Ok(Affine { c, f, ..transform })
}

fn read_model_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Affine, RasterError> {
    // ModelTransformation: row-major 4x4 matrix mapping (col, row, 0, 1) to (x, y, z, 1)
    if let Ok(m) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        if m.len() >= 8 {
            return Ok(Affine::new(m[0], m[1], m[3], m[4], m[5], m[7]));
        }
    }

    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| RasterError::Transform("no ModelPixelScale tag".into()))?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| RasterError::Transform("no ModelTiepoint tag".into()))?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(RasterError::Transform(format!(
            "malformed georeferencing tags (scale: {}, tiepoint: {})",
            scale.len(),
            tiepoint.len()
        )));
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Ok(Affine::north_up(origin_x, origin_y, scale[0], -scale[1]))
}

/// GTRasterTypeGeoKey from the GeoKey directory, if present.
fn raster_type<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<u16> {
    // Header [version, revision, minor, count], then [key, location, count, value] entries
    let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).ok()?;
    let count = usize::from(*keys.get(3)?);
    keys.get(4..)?
        .chunks_exact(4)
        .take(count)
        .find(|entry| entry[0] == GT_RASTER_TYPE_GEO_KEY && entry[1] == 0)
        .map(|entry| entry[3])
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(Tag::GdalNodata).ok()?;
    text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .parse()
        .ok()
}
