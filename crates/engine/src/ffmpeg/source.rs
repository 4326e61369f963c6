//! Container access

use std::path::Path;

use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::context::Input;
use ffmpeg_next::media::Type;
use tracing::debug;

use crate::backend::{MediaKind, MediaSource, ReadOutcome, StreamInfo};
use crate::error::PlaybackError;

/// An opened container. Closes on drop.
pub struct FfmpegSource {
    input: Input,
}

impl FfmpegSource {
    pub fn open(path: &str) -> Result<Self, PlaybackError> {
        if !Path::new(path).exists() {
            return Err(PlaybackError::SourceOpen {
                path: path.to_string(),
                reason: "file not found".to_string(),
            });
        }

        let input = ffmpeg::format::input(&path).map_err(|e| PlaybackError::SourceOpen {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        debug!(
            format = input.format().name(),
            streams = input.nb_streams(),
            "Opened container"
        );

        Ok(Self { input })
    }

    pub(crate) fn input(&self) -> &Input {
        &self.input
    }
}

fn media_kind(medium: Type) -> MediaKind {
    match medium {
        Type::Video => MediaKind::Video,
        Type::Audio => MediaKind::Audio,
        Type::Subtitle => MediaKind::Subtitle,
        Type::Data | Type::Attachment => MediaKind::Data,
        Type::Unknown => MediaKind::Unknown,
    }
}

impl MediaSource for FfmpegSource {
    type Packet = ffmpeg::Packet;

    fn probe_streams(&mut self) -> Result<Vec<StreamInfo>, PlaybackError> {
        // `format::input` already ran stream-info discovery.
        let streams: Vec<StreamInfo> = self
            .input
            .streams()
            .map(|stream| {
                let params = stream.parameters();
                StreamInfo {
                    index: stream.index(),
                    kind: media_kind(params.medium()),
                    codec: format!("{:?}", params.id()).to_lowercase(),
                }
            })
            .collect();

        if streams.is_empty() {
            return Err(PlaybackError::StreamProbe(
                "container has no streams".to_string(),
            ));
        }
        Ok(streams)
    }

    fn new_packet(&self) -> ffmpeg::Packet {
        ffmpeg::Packet::empty()
    }

    fn read_packet(&mut self, packet: &mut ffmpeg::Packet) -> Result<ReadOutcome, PlaybackError> {
        // av_read_frame expects a blank packet; release the previous payload.
        unsafe {
            ffmpeg::ffi::av_packet_unref(packet.as_mut_ptr());
        }

        match packet.read(&mut self.input) {
            Ok(()) => Ok(ReadOutcome::Packet {
                stream_index: packet.stream(),
            }),
            Err(ffmpeg::Error::Eof) => Ok(ReadOutcome::EndOfStream),
            Err(e) => Err(PlaybackError::PacketRead(e.to_string())),
        }
    }
}
