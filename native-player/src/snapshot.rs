//! Memory surface that saves its last frame as JPEG on release.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageBuffer, Rgba};
use np_engine::{Geometry, MemorySurface, PixelFormat, PlaybackError, Surface, SurfaceBuffer};
use tracing::{error, info};

const JPEG_QUALITY: u8 = 90;

pub struct SnapshotSurface {
    inner: MemorySurface,
    path: PathBuf,
}

impl SnapshotSurface {
    pub fn new(row_padding: usize, path: impl Into<PathBuf>) -> Self {
        Self {
            inner: MemorySurface::with_row_padding(row_padding),
            path: path.into(),
        }
    }
}

impl Surface for SnapshotSurface {
    fn configure_geometry(
        &mut self,
        geometry: Geometry,
        format: PixelFormat,
    ) -> Result<(), PlaybackError> {
        self.inner.configure_geometry(geometry, format)
    }

    fn lock_buffer(&mut self) -> Result<SurfaceBuffer<'_>, PlaybackError> {
        self.inner.lock_buffer()
    }

    fn present(&mut self) -> Result<(), PlaybackError> {
        self.inner.present()
    }

    fn release(&mut self) {
        self.inner.release();

        let Some((geometry, rgba)) = self.inner.front_buffer() else {
            info!("No frame presented, skipping snapshot");
            return;
        };
        match write_jpeg(&self.path, geometry, rgba) {
            Ok(()) => info!("Snapshot written to {}", self.path.display()),
            Err(e) => error!("Failed to write snapshot: {:#}", e),
        }
    }
}

/// Encode tightly packed RGBA as JPEG (alpha dropped).
pub fn write_jpeg(path: &Path, geometry: Geometry, rgba: &[u8]) -> Result<()> {
    let img: ImageBuffer<Rgba<u8>, _> =
        ImageBuffer::from_raw(geometry.width, geometry.height, rgba.to_vec())
            .ok_or_else(|| anyhow!("buffer too small for {}", geometry))?;
    let rgb = DynamicImage::ImageRgba8(img).into_rgb8();

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .with_context(|| format!("encoding {}", path.display()))?;
    Ok(())
}
