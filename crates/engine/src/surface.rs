//! Drawable targets frames are presented to.

use tracing::debug;

use crate::error::PlaybackError;
use crate::frame::{copy_rows, Geometry, PixelFormat};

/// A writable view into a surface's back buffer.
#[derive(Debug)]
pub struct SurfaceBuffer<'a> {
    /// Back buffer bytes, `stride` bytes per row.
    pub pixels: &'a mut [u8],
    /// Bytes between row starts. May exceed `width * 4`.
    pub stride: usize,
    /// Dimensions of the locked buffer.
    pub geometry: Geometry,
}

/// A caller-supplied drawable.
///
/// `start` moves the surface into the decode thread, which is then its only
/// user. Teardown calls [`release`](Self::release) exactly once and then
/// drops the box, which releases the handle itself.
pub trait Surface: Send {
    /// Set the back buffer size and format.
    fn configure_geometry(
        &mut self,
        geometry: Geometry,
        format: PixelFormat,
    ) -> Result<(), PlaybackError>;

    /// Lock the back buffer for writing.
    ///
    /// Returns [`PlaybackError::SurfaceBufferUnavailable`] when the surface
    /// is not ready; the frame is then dropped.
    fn lock_buffer(&mut self) -> Result<SurfaceBuffer<'_>, PlaybackError>;

    /// Unlock the buffer and make it visible.
    fn present(&mut self) -> Result<(), PlaybackError>;

    /// Release the window resource held for the session.
    fn release(&mut self) {}
}

/// Headless surface backed by process memory.
///
/// The back buffer rows carry `row_padding` extra bytes, so the destination
/// stride differs from the frame stride the way real window buffers often
/// do. Presenting copies the visible part into a tightly packed front
/// buffer.
#[derive(Debug, Default)]
pub struct MemorySurface {
    geometry: Option<Geometry>,
    row_padding: usize,
    back: Vec<u8>,
    front: Vec<u8>,
    presented: u64,
    released: bool,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface whose rows are `padding` bytes wider than the image.
    pub fn with_row_padding(padding: usize) -> Self {
        Self {
            row_padding: padding,
            ..Self::default()
        }
    }

    pub fn geometry(&self) -> Option<Geometry> {
        self.geometry
    }

    pub fn stride(&self) -> usize {
        self.geometry
            .map_or(0, |g| g.row_bytes(PixelFormat::Rgba8888) + self.row_padding)
    }

    pub fn presented_count(&self) -> u64 {
        self.presented
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Tightly packed RGBA of the last presented frame.
    pub fn front_buffer(&self) -> Option<(Geometry, &[u8])> {
        match self.geometry {
            Some(g) if self.presented > 0 => Some((g, &self.front)),
            _ => None,
        }
    }
}

impl Surface for MemorySurface {
    fn configure_geometry(
        &mut self,
        geometry: Geometry,
        format: PixelFormat,
    ) -> Result<(), PlaybackError> {
        if geometry.is_empty() {
            return Err(PlaybackError::SurfaceSetup {
                width: geometry.width,
                height: geometry.height,
                reason: "empty geometry".to_string(),
            });
        }

        let stride = geometry.row_bytes(format) + self.row_padding;
        self.back = vec![0u8; stride * geometry.height as usize];
        self.front = vec![0u8; geometry.frame_bytes(format)];
        self.geometry = Some(geometry);

        debug!(%geometry, stride, "Memory surface configured");
        Ok(())
    }

    fn lock_buffer(&mut self) -> Result<SurfaceBuffer<'_>, PlaybackError> {
        if self.released {
            return Err(PlaybackError::SurfaceBufferUnavailable);
        }
        let geometry = self
            .geometry
            .ok_or(PlaybackError::SurfaceBufferUnavailable)?;
        let stride = self.stride();

        Ok(SurfaceBuffer {
            pixels: &mut self.back,
            stride,
            geometry,
        })
    }

    fn present(&mut self) -> Result<(), PlaybackError> {
        let geometry = self
            .geometry
            .ok_or(PlaybackError::SurfaceBufferUnavailable)?;
        let row_bytes = geometry.row_bytes(PixelFormat::Rgba8888);

        copy_rows(
            &self.back,
            self.stride(),
            &mut self.front,
            row_bytes,
            row_bytes,
            geometry.height as usize,
        )?;
        self.presented += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
        debug!(presented = self.presented, "Memory surface released");
    }
}
