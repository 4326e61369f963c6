//! FFmpeg media backend
//!
//! Demuxing, decoding and color conversion through `ffmpeg-next`. Every
//! object created here lives on the decode thread; FFmpeg handles are freed
//! when the wrappers drop.

mod converter;
mod decoder;
mod source;

use std::sync::OnceLock;

use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use tracing::{error, info};

use crate::backend::MediaBackend;
use crate::error::PlaybackError;
use crate::frame::{Geometry, PixelFormat};

pub use converter::FfmpegConverter;
pub use decoder::FfmpegDecoder;
pub use source::FfmpegSource;

static FFMPEG_INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// [`MediaBackend`] backed by the system FFmpeg libraries.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> Self {
        Self
    }
}

impl MediaBackend for FfmpegBackend {
    type Packet = ffmpeg::Packet;
    type Frame = VideoFrame;
    type Format = Pixel;
    type Source = FfmpegSource;
    type Decoder = FfmpegDecoder;
    type Converter = FfmpegConverter;

    fn init(&self) -> Result<(), PlaybackError> {
        FFMPEG_INIT
            .get_or_init(|| match ffmpeg::init() {
                Ok(()) => {
                    info!("FFmpeg initialized");
                    Ok(())
                }
                Err(e) => {
                    error!("Failed to initialize FFmpeg: {}", e);
                    Err(e.to_string())
                }
            })
            .clone()
            .map_err(PlaybackError::Init)
    }

    fn open_source(&self, path: &str) -> Result<FfmpegSource, PlaybackError> {
        FfmpegSource::open(path)
    }

    fn open_decoder(
        &self,
        source: &FfmpegSource,
        stream_index: usize,
    ) -> Result<FfmpegDecoder, PlaybackError> {
        FfmpegDecoder::open(source, stream_index)
    }

    fn new_frame(&self) -> VideoFrame {
        VideoFrame::empty()
    }

    fn create_converter(
        &self,
        src_format: Pixel,
        dst_format: PixelFormat,
        geometry: Geometry,
    ) -> Result<FfmpegConverter, PlaybackError> {
        FfmpegConverter::new(src_format, dst_format, geometry)
    }
}

/// FFmpeg pixel format for an engine output format.
pub(crate) fn pixel_for(format: PixelFormat) -> Pixel {
    match format {
        PixelFormat::Rgba8888 => Pixel::RGBA,
    }
}
