//! Pixel buffer types and the stride-aware row copy shared by the converter
//! and the presenter.

use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

/// Pixel formats a surface can be configured with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8 bits per channel, R G B A byte order.
    Rgba8888,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8888 => 4,
        }
    }
}

/// Frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Bytes in one tightly packed row.
    pub const fn row_bytes(&self, format: PixelFormat) -> usize {
        self.width as usize * format.bytes_per_pixel()
    }

    /// Bytes in a tightly packed frame.
    pub const fn frame_bytes(&self, format: PixelFormat) -> usize {
        self.row_bytes(format) * self.height as usize
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The converted-frame slot: one tightly packed RGBA8888 buffer, allocated
/// once per session and overwritten in place for every frame.
#[derive(Clone, Debug)]
pub struct RgbaFrame {
    geometry: Geometry,
    stride: usize,
    data: Vec<u8>,
}

impl RgbaFrame {
    /// Allocate a zeroed `width * height * 4` byte buffer.
    pub fn alloc(geometry: Geometry) -> Self {
        let stride = geometry.row_bytes(PixelFormat::Rgba8888);
        Self {
            geometry,
            stride,
            data: vec![0u8; geometry.frame_bytes(PixelFormat::Rgba8888)],
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Bytes between the starts of consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// One row of pixels, or `None` past the last row.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.geometry.height {
            return None;
        }
        let start = y as usize * self.stride;
        self.data.get(start..start + self.stride)
    }

    /// Copy a converter output plane whose rows may be padded.
    pub fn fill_from_plane(&mut self, src: &[u8], src_stride: usize) -> Result<(), PlaybackError> {
        copy_rows(
            src,
            src_stride,
            &mut self.data,
            self.stride,
            self.stride,
            self.geometry.height as usize,
        )
    }
}

/// Copy `rows` rows of `row_bytes` bytes between buffers with independent
/// strides.
///
/// Bytes past `row_bytes` in each destination row are left untouched. The
/// layout is validated up front; on error nothing has been written.
pub fn copy_rows(
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    row_bytes: usize,
    rows: usize,
) -> Result<(), PlaybackError> {
    if rows == 0 || row_bytes == 0 {
        return Ok(());
    }

    if src_stride < row_bytes || dst_stride < row_bytes {
        return Err(PlaybackError::BufferLayout(format!(
            "stride shorter than row (src {src_stride}, dst {dst_stride}, row {row_bytes})"
        )));
    }

    let src_needed = (rows - 1) * src_stride + row_bytes;
    let dst_needed = (rows - 1) * dst_stride + row_bytes;
    if src.len() < src_needed || dst.len() < dst_needed {
        return Err(PlaybackError::BufferLayout(format!(
            "{rows} rows need {src_needed} source / {dst_needed} destination bytes, have {} / {}",
            src.len(),
            dst.len()
        )));
    }

    for (src_row, dst_row) in src
        .chunks(src_stride)
        .zip(dst.chunks_mut(dst_stride))
        .take(rows)
    {
        dst_row[..row_bytes].copy_from_slice(&src_row[..row_bytes]);
    }

    Ok(())
}
