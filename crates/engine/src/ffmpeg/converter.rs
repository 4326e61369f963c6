//! Color conversion into RGBA

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use tracing::{debug, warn};

use super::pixel_for;
use crate::backend::FrameConverter;
use crate::error::PlaybackError;
use crate::frame::{Geometry, PixelFormat, RgbaFrame};

/// Bilinear swscale context converting decoder output at native size.
pub struct FfmpegConverter {
    scaler: ScalingContext,
    src_format: Pixel,
    src_geometry: Geometry,
    dst_format: Pixel,
    geometry: Geometry,
    output: VideoFrame,
}

fn scaler(
    src_format: Pixel,
    src: Geometry,
    dst_format: Pixel,
    dst: Geometry,
) -> Result<ScalingContext, PlaybackError> {
    ScalingContext::get(
        src_format,
        src.width,
        src.height,
        dst_format,
        dst.width,
        dst.height,
        ScalingFlags::BILINEAR,
    )
    .map_err(|e| PlaybackError::ConverterSetup(e.to_string()))
}

impl FfmpegConverter {
    pub fn new(
        src_format: Pixel,
        dst_format: PixelFormat,
        geometry: Geometry,
    ) -> Result<Self, PlaybackError> {
        let dst_format = pixel_for(dst_format);
        let scaler = scaler(src_format, geometry, dst_format, geometry)?;
        debug!(?src_format, ?dst_format, %geometry, "Scaler created");

        Ok(Self {
            scaler,
            src_format,
            src_geometry: geometry,
            dst_format,
            geometry,
            output: VideoFrame::new(dst_format, geometry.width, geometry.height),
        })
    }
}

impl FrameConverter for FfmpegConverter {
    type Frame = VideoFrame;

    fn convert(&mut self, frame: &VideoFrame, dst: &mut RgbaFrame) -> Result<(), PlaybackError> {
        let src_geometry = Geometry::new(frame.width(), frame.height());
        if frame.format() != self.src_format || src_geometry != self.src_geometry {
            // Mid-stream parameter change; scale back to the session geometry.
            warn!(
                from = %self.src_geometry,
                to = %src_geometry,
                format = ?frame.format(),
                "Decoded frame parameters changed, rebuilding scaler"
            );
            self.scaler = scaler(frame.format(), src_geometry, self.dst_format, self.geometry)?;
            self.src_format = frame.format();
            self.src_geometry = src_geometry;
        }

        self.scaler
            .run(frame, &mut self.output)
            .map_err(|e| PlaybackError::Convert(e.to_string()))?;

        dst.fill_from_plane(self.output.data(0), self.output.stride(0))
    }
}
