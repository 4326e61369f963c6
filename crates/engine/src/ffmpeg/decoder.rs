//! Video decoder for one stream

use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use tracing::debug;

use super::source::FfmpegSource;
use crate::backend::{DecodeStatus, VideoDecoder};
use crate::error::PlaybackError;
use crate::frame::Geometry;

pub struct FfmpegDecoder {
    decoder: ffmpeg::decoder::Video,
}

impl FfmpegDecoder {
    /// Open a decoder from the codec parameters of `stream_index`.
    pub fn open(source: &FfmpegSource, stream_index: usize) -> Result<Self, PlaybackError> {
        let open_err = |reason: String| PlaybackError::DecoderOpen {
            stream_index,
            reason,
        };

        let stream = source
            .input()
            .stream(stream_index)
            .ok_or_else(|| open_err("stream index out of range".to_string()))?;

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| open_err(e.to_string()))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| open_err(e.to_string()))?;

        debug!(
            codec = decoder.codec().map(|c| c.name().to_string()).unwrap_or_default(),
            width = decoder.width(),
            height = decoder.height(),
            "Decoder opened"
        );

        Ok(Self { decoder })
    }
}

/// EAGAIN means "feed more input", EOF means "fully drained".
fn is_pending(err: &ffmpeg::Error) -> bool {
    match err {
        ffmpeg::Error::Eof => true,
        ffmpeg::Error::Other { errno } => *errno == ffmpeg::error::EAGAIN,
        _ => false,
    }
}

impl VideoDecoder for FfmpegDecoder {
    type Packet = ffmpeg::Packet;
    type Frame = VideoFrame;
    type Format = Pixel;

    fn geometry(&self) -> Geometry {
        Geometry::new(self.decoder.width(), self.decoder.height())
    }

    fn format(&self) -> Pixel {
        self.decoder.format()
    }

    fn submit(&mut self, packet: &ffmpeg::Packet) -> Result<(), PlaybackError> {
        self.decoder
            .send_packet(packet)
            .map_err(|e| PlaybackError::Decode(e.to_string()))
    }

    fn submit_end_of_stream(&mut self) -> Result<(), PlaybackError> {
        self.decoder
            .send_eof()
            .map_err(|e| PlaybackError::Decode(e.to_string()))
    }

    fn receive_frame(&mut self, frame: &mut VideoFrame) -> Result<DecodeStatus, PlaybackError> {
        match self.decoder.receive_frame(frame) {
            Ok(()) => Ok(DecodeStatus::Frame),
            Err(e) if is_pending(&e) => Ok(DecodeStatus::Pending),
            Err(e) => Err(PlaybackError::Decode(e.to_string())),
        }
    }
}
