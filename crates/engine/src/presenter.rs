//! Presenter: copies converted frames into the surface and posts them.

use tracing::{debug, warn};

use crate::error::PlaybackError;
use crate::frame::{copy_rows, Geometry, PixelFormat, RgbaFrame};
use crate::surface::Surface;

/// What happened to a frame handed to the presenter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Presented {
    Shown,
    /// The surface had no buffer available; the frame was skipped.
    Dropped,
}

/// Holds the session's surface handle.
pub(crate) struct Presenter {
    surface: Option<Box<dyn Surface>>,
    geometry: Option<Geometry>,
    released: bool,
}

impl Presenter {
    pub fn new(surface: Box<dyn Surface>) -> Self {
        Self {
            surface: Some(surface),
            geometry: None,
            released: false,
        }
    }

    /// Configure the surface to the decoder geometry. Done once per session.
    pub fn configure(&mut self, geometry: Geometry) -> Result<(), PlaybackError> {
        let Some(surface) = self.surface.as_mut() else {
            return Err(PlaybackError::SurfaceBufferUnavailable);
        };

        surface.configure_geometry(geometry, PixelFormat::Rgba8888)?;
        self.geometry = Some(geometry);
        debug!(%geometry, "Surface geometry configured");
        Ok(())
    }

    /// Copy `frame` into a locked surface buffer row by row and present it.
    pub fn present(&mut self, frame: &RgbaFrame) -> Result<Presented, PlaybackError> {
        let Some(surface) = self.surface.as_mut() else {
            return Err(PlaybackError::SurfaceBufferUnavailable);
        };

        let copied = {
            let buffer = match surface.lock_buffer() {
                Ok(buffer) => buffer,
                Err(PlaybackError::SurfaceBufferUnavailable) => return Ok(Presented::Dropped),
                Err(e) => {
                    warn!("Surface lock failed: {}", e);
                    return Ok(Presented::Dropped);
                }
            };

            let frame_geometry = frame.geometry();
            let width = frame_geometry.width.min(buffer.geometry.width);
            let rows = frame_geometry.height.min(buffer.geometry.height) as usize;
            let row_bytes = Geometry::new(width, 1).row_bytes(PixelFormat::Rgba8888);

            copy_rows(
                frame.data(),
                frame.stride(),
                buffer.pixels,
                buffer.stride,
                row_bytes,
                rows,
            )
        };

        // The buffer is locked either way; posting it is what unlocks it.
        surface.present()?;

        match copied {
            Ok(()) => Ok(Presented::Shown),
            Err(e) => {
                warn!("Frame copy failed: {}", e);
                Ok(Presented::Dropped)
            }
        }
    }

    /// Release the surface's window resource. Runs at most once.
    pub fn release_surface(&mut self) {
        if self.released {
            return;
        }
        if let Some(surface) = self.surface.as_mut() {
            surface.release();
            self.released = true;
        }
    }

    /// Drop the borrowed surface handle.
    pub fn release_handle(&mut self) {
        if self.surface.take().is_some() {
            debug!("Surface handle released");
        }
        self.geometry = None;
    }
}
