//! Capabilities the engine consumes from a demux/decode/convert library.
//!
//! A [`MediaBackend`] is a factory shared with the decode thread. Everything
//! it creates ([`MediaSource`], [`VideoDecoder`], [`FrameConverter`], packets
//! and frames) is created on that thread and never leaves it, so none of
//! those types need to be `Send`. Closing happens on drop.

use std::fmt;

use crate::error::PlaybackError;
use crate::frame::{Geometry, PixelFormat, RgbaFrame};

/// Kind of elementary stream in a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Unknown,
}

/// One entry of a container's stream table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamInfo {
    pub index: usize,
    pub kind: MediaKind,
    pub codec: String,
}

/// Index of the first video stream, the one a session plays.
pub fn select_video_stream(streams: &[StreamInfo]) -> Option<usize> {
    streams
        .iter()
        .find(|s| s.kind == MediaKind::Video)
        .map(|s| s.index)
}

/// Result of a packet read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The packet buffer now holds a packet of stream `stream_index`.
    Packet { stream_index: usize },
    /// The source is exhausted.
    EndOfStream,
}

/// Result of asking the decoder for a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeStatus {
    /// The frame buffer now holds a decoded picture.
    Frame,
    /// The decoder needs more input (or has been fully drained).
    Pending,
}

/// Factory for the per-session media objects.
pub trait MediaBackend: Send + Sync + 'static {
    type Packet;
    type Frame;
    type Format: Copy + fmt::Debug;
    type Source: MediaSource<Packet = Self::Packet>;
    type Decoder: VideoDecoder<Packet = Self::Packet, Frame = Self::Frame, Format = Self::Format>;
    type Converter: FrameConverter<Frame = Self::Frame>;

    /// Process-wide one-time setup. Must be idempotent.
    fn init(&self) -> Result<(), PlaybackError> {
        Ok(())
    }

    /// Open a container.
    fn open_source(&self, path: &str) -> Result<Self::Source, PlaybackError>;

    /// Open a decoder bound to the parameters of `stream_index`.
    fn open_decoder(
        &self,
        source: &Self::Source,
        stream_index: usize,
    ) -> Result<Self::Decoder, PlaybackError>;

    /// Allocate an empty decode-target frame.
    fn new_frame(&self) -> Self::Frame;

    /// Set up conversion from the decoder's native format.
    fn create_converter(
        &self,
        src_format: Self::Format,
        dst_format: PixelFormat,
        geometry: Geometry,
    ) -> Result<Self::Converter, PlaybackError>;
}

/// An opened container.
pub trait MediaSource {
    type Packet;

    /// Read the stream table.
    fn probe_streams(&mut self) -> Result<Vec<StreamInfo>, PlaybackError>;

    /// Allocate the reusable packet buffer.
    fn new_packet(&self) -> Self::Packet;

    /// Read the next packet into `packet`, replacing its previous contents.
    fn read_packet(&mut self, packet: &mut Self::Packet) -> Result<ReadOutcome, PlaybackError>;
}

/// A decoder for one video stream.
pub trait VideoDecoder {
    type Packet;
    type Frame;
    type Format;

    fn geometry(&self) -> Geometry;

    /// Native pixel format of decoded frames.
    fn format(&self) -> Self::Format;

    fn submit(&mut self, packet: &Self::Packet) -> Result<(), PlaybackError>;

    /// Signal that no more packets will follow, so buffered frames are released.
    fn submit_end_of_stream(&mut self) -> Result<(), PlaybackError>;

    fn receive_frame(&mut self, frame: &mut Self::Frame) -> Result<DecodeStatus, PlaybackError>;
}

/// Color conversion into the engine's RGBA slot.
pub trait FrameConverter {
    type Frame;

    /// Convert `frame` into `dst` in place.
    fn convert(&mut self, frame: &Self::Frame, dst: &mut RgbaFrame) -> Result<(), PlaybackError>;
}
