//! Frame pipeline: read packet → decode → convert into the RGBA slot.

use tracing::{debug, info, trace, warn};

use crate::backend::{
    select_video_stream, DecodeStatus, FrameConverter, MediaBackend, MediaSource, ReadOutcome,
    VideoDecoder,
};
use crate::error::PlaybackError;
use crate::events::SessionStats;
use crate::frame::{Geometry, PixelFormat, RgbaFrame};

/// Outcome of one pipeline iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// The RGBA slot holds a new frame.
    Converted,
    /// Nothing to present this iteration (other stream, decoder needs more
    /// input).
    Skipped,
    EndOfStream,
}

/// Owns every decode-side session resource.
///
/// Each resource sits in an `Option` so setup can stop at any point and
/// [`teardown`](Self::teardown) only releases what was acquired.
pub(crate) struct FramePipeline<B: MediaBackend> {
    source: Option<B::Source>,
    decoder: Option<B::Decoder>,
    converter: Option<B::Converter>,
    packet: Option<B::Packet>,
    decoded: Option<B::Frame>,
    converted: Option<RgbaFrame>,
    stream_index: usize,
    geometry: Geometry,
    drain_on_end_of_stream: bool,
    draining: bool,
    stats: SessionStats,
}

impl<B: MediaBackend> FramePipeline<B> {
    pub fn new(drain_on_end_of_stream: bool) -> Self {
        Self {
            source: None,
            decoder: None,
            converter: None,
            packet: None,
            decoded: None,
            converted: None,
            stream_index: 0,
            geometry: Geometry::new(0, 0),
            drain_on_end_of_stream,
            draining: false,
            stats: SessionStats::default(),
        }
    }

    /// Open the source, pick the video stream and open its decoder.
    /// Returns the decoder geometry.
    pub fn open(&mut self, backend: &B, path: &str) -> Result<Geometry, PlaybackError> {
        let source = self.source.insert(backend.open_source(path)?);

        let streams = source.probe_streams()?;
        debug!(count = streams.len(), "Probed streams");

        let stream_index = select_video_stream(&streams).ok_or(PlaybackError::NoVideoStream)?;
        self.stream_index = stream_index;

        let decoder = self
            .decoder
            .insert(backend.open_decoder(source, stream_index)?);

        let geometry = decoder.geometry();
        if geometry.is_empty() {
            return Err(PlaybackError::DecoderOpen {
                stream_index,
                reason: format!("invalid dimensions {geometry}"),
            });
        }
        self.geometry = geometry;

        let codec = streams
            .iter()
            .find(|s| s.index == stream_index)
            .map_or("unknown", |s| s.codec.as_str());
        info!(
            stream_index,
            %geometry,
            codec,
            format = ?decoder.format(),
            "Opened video stream"
        );

        Ok(geometry)
    }

    /// Allocate the packet, both frames and the converter. Requires `open`.
    pub fn allocate(&mut self, backend: &B) -> Result<(), PlaybackError> {
        let (Some(source), Some(decoder)) = (&self.source, &self.decoder) else {
            return Err(PlaybackError::ConverterSetup(
                "pipeline not opened".to_string(),
            ));
        };

        self.decoded = Some(backend.new_frame());
        self.packet = Some(source.new_packet());
        self.converted = Some(RgbaFrame::alloc(self.geometry));
        self.converter = Some(backend.create_converter(
            decoder.format(),
            PixelFormat::Rgba8888,
            self.geometry,
        )?);

        debug!(
            geometry = %self.geometry,
            bytes = self.geometry.frame_bytes(PixelFormat::Rgba8888),
            "Allocated frame buffers"
        );
        Ok(())
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// The most recently converted frame.
    pub fn converted(&self) -> Option<&RgbaFrame> {
        self.converted.as_ref()
    }

    /// Run one iteration: read exactly one packet (or, once the source is
    /// exhausted, pull one buffered frame from the decoder).
    ///
    /// Errors other than [`PlaybackError::PacketRead`] concern a single
    /// packet or frame only.
    pub fn step(&mut self) -> Result<Step, PlaybackError> {
        if self.draining {
            return match self.receive() {
                Ok(Step::Converted) => Ok(Step::Converted),
                Ok(_) => Ok(Step::EndOfStream),
                Err(e) => {
                    warn!("Error while draining decoder: {}", e);
                    Ok(Step::EndOfStream)
                }
            };
        }

        let (Some(source), Some(packet)) = (self.source.as_mut(), self.packet.as_mut()) else {
            return Ok(Step::EndOfStream);
        };

        let stream_index = match source.read_packet(packet)? {
            ReadOutcome::Packet { stream_index } => stream_index,
            ReadOutcome::EndOfStream => return self.end_of_stream(),
        };

        self.stats.packets_read += 1;
        if stream_index != self.stream_index {
            trace!(stream_index, "Skipping packet from other stream");
            return Ok(Step::Skipped);
        }

        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(Step::EndOfStream);
        };
        if let Err(e) = decoder.submit(packet) {
            self.stats.decode_errors += 1;
            return Err(e);
        }

        self.receive()
    }

    fn end_of_stream(&mut self) -> Result<Step, PlaybackError> {
        if !self.drain_on_end_of_stream {
            return Ok(Step::EndOfStream);
        }
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(Step::EndOfStream);
        };

        debug!("End of stream, draining decoder");
        if let Err(e) = decoder.submit_end_of_stream() {
            warn!("Failed to signal end of stream to decoder: {}", e);
            return Ok(Step::EndOfStream);
        }
        self.draining = true;
        self.step()
    }

    /// Pull at most one frame from the decoder and convert it.
    fn receive(&mut self) -> Result<Step, PlaybackError> {
        let (Some(decoder), Some(decoded), Some(converter), Some(converted)) = (
            self.decoder.as_mut(),
            self.decoded.as_mut(),
            self.converter.as_mut(),
            self.converted.as_mut(),
        ) else {
            return Ok(Step::EndOfStream);
        };

        match decoder.receive_frame(decoded) {
            Ok(DecodeStatus::Pending) => Ok(Step::Skipped),
            Ok(DecodeStatus::Frame) => {
                self.stats.frames_decoded += 1;
                converter.convert(decoded, converted)?;
                Ok(Step::Converted)
            }
            Err(e) => {
                self.stats.decode_errors += 1;
                Err(e)
            }
        }
    }

    /// Release decode-side resources in order: converter, packet, decode
    /// frame, conversion frame with its pixel buffer, decoder, source.
    /// Missing resources are skipped.
    pub fn teardown(&mut self) {
        drop(self.converter.take());
        drop(self.packet.take());
        drop(self.decoded.take());
        drop(self.converted.take());
        drop(self.decoder.take());
        if self.source.take().is_some() {
            debug!("Media source closed");
        }
        self.draining = false;
    }
}
