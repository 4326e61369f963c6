//! Scripted media backend and surface for tests.
//!
//! Every mock resource reports acquisition and release to a shared [`Probe`],
//! so tests can check that teardown releases everything once and in order.
//! Decoded frames carry their 1-based position in the stream, and the mock
//! converter fills every RGBA byte with it; the mock surface records the
//! first byte of each presented buffer.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::backend::{
    DecodeStatus, FrameConverter, MediaBackend, MediaKind, MediaSource, ReadOutcome, StreamInfo,
    VideoDecoder,
};
use crate::error::PlaybackError;
use crate::frame::{Geometry, PixelFormat, RgbaFrame};
use crate::surface::{Surface, SurfaceBuffer};

const PADDING_BYTE: u8 = 0xEE;

#[derive(Default)]
struct ProbeInner {
    acquired: HashMap<&'static str, usize>,
    released: HashMap<&'static str, usize>,
    order: Vec<&'static str>,
    geometry: Vec<Geometry>,
    presented: Vec<u8>,
    padding_intact: bool,
    surface_releases: usize,
    surface_drops: usize,
    init_calls: usize,
}

/// Shared record of what mocks did.
#[derive(Clone)]
pub(crate) struct Probe {
    inner: Arc<Mutex<ProbeInner>>,
}

impl Probe {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ProbeInner {
                padding_intact: true,
                ..Default::default()
            })),
        }
    }

    fn acquire(&self, kind: &'static str) {
        *self.inner.lock().acquired.entry(kind).or_default() += 1;
    }

    fn release(&self, kind: &'static str) {
        let mut inner = self.inner.lock();
        *inner.released.entry(kind).or_default() += 1;
        inner.order.push(kind);
    }

    /// Every acquired backend resource has been released exactly once.
    pub fn is_balanced(&self) -> bool {
        let inner = self.inner.lock();
        inner
            .acquired
            .iter()
            .all(|(kind, n)| inner.released.get(kind) == Some(n))
            && inner
                .released
                .keys()
                .filter(|k| !k.starts_with("surface"))
                .all(|k| inner.acquired.contains_key(k))
    }

    pub fn release_order(&self) -> Vec<&'static str> {
        self.inner.lock().order.clone()
    }

    pub fn sources_opened(&self) -> usize {
        self.inner.lock().acquired.get("source").copied().unwrap_or(0)
    }

    pub fn configured_geometry(&self) -> Vec<Geometry> {
        self.inner.lock().geometry.clone()
    }

    pub fn presented(&self) -> Vec<u8> {
        self.inner.lock().presented.clone()
    }

    pub fn padding_intact(&self) -> bool {
        self.inner.lock().padding_intact
    }

    pub fn surface_releases(&self) -> usize {
        self.inner.lock().surface_releases
    }

    pub fn surface_drops(&self) -> usize {
        self.inner.lock().surface_drops
    }

    pub fn init_calls(&self) -> usize {
        self.inner.lock().init_calls
    }

    /// Poll until at least `count` frames were presented.
    pub fn wait_for_presents(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.inner.lock().presented.len() >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }
}

// ---------------------------------------------------------------------------
// Media script
// ---------------------------------------------------------------------------

const VIDEO_STREAM: usize = 0;
const AUDIO_STREAM: usize = 1;

/// Describes the stream a [`MockBackend`] serves.
#[derive(Clone, Debug)]
pub(crate) struct MockMedia {
    width: u32,
    height: u32,
    frames: usize,
    audio_between_frames: bool,
    audio_only: bool,
    decoder_delay: usize,
    read_error_at: Option<usize>,
    decode_error_at: Option<usize>,
    decoder_open_error: bool,
}

impl MockMedia {
    pub fn new(width: u32, height: u32, frames: usize) -> Self {
        Self {
            width,
            height,
            frames,
            audio_between_frames: false,
            audio_only: false,
            decoder_delay: 0,
            read_error_at: None,
            decode_error_at: None,
            decoder_open_error: false,
        }
    }

    /// Interleave an audio packet after every video packet.
    pub fn with_audio_between_frames(mut self) -> Self {
        self.audio_between_frames = true;
        self
    }

    /// Container without a video stream.
    pub fn audio_only(mut self) -> Self {
        self.audio_only = true;
        self
    }

    /// Decoder holds back this many frames until end of stream.
    pub fn with_decoder_delay(mut self, frames: usize) -> Self {
        self.decoder_delay = frames;
        self
    }

    /// The read call with this 0-based number fails.
    pub fn with_read_error_at(mut self, read: usize) -> Self {
        self.read_error_at = Some(read);
        self
    }

    /// Submitting the video packet with this 0-based number fails.
    pub fn with_decode_error_at(mut self, packet: usize) -> Self {
        self.decode_error_at = Some(packet);
        self
    }

    pub fn with_decoder_open_error(mut self) -> Self {
        self.decoder_open_error = true;
        self
    }

    fn packets(&self) -> VecDeque<(usize, u8)> {
        let mut packets = VecDeque::new();
        for n in 0..self.frames {
            let seq = (n + 1) as u8;
            if self.audio_only {
                packets.push_back((VIDEO_STREAM, 0));
                continue;
            }
            packets.push_back((VIDEO_STREAM, seq));
            if self.audio_between_frames {
                packets.push_back((AUDIO_STREAM, 0));
            }
        }
        packets
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Opens [`MockMedia`] for any path except those starting with "missing".
pub(crate) struct MockBackend {
    media: MockMedia,
    probe: Probe,
}

impl MockBackend {
    pub fn new(media: MockMedia) -> Self {
        Self::with_probe(media, Probe::new())
    }

    pub fn with_probe(media: MockMedia, probe: Probe) -> Self {
        Self { media, probe }
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

impl MediaBackend for MockBackend {
    type Packet = MockPacket;
    type Frame = MockFrame;
    type Format = &'static str;
    type Source = MockSource;
    type Decoder = MockDecoder;
    type Converter = MockConverter;

    fn init(&self) -> Result<(), PlaybackError> {
        self.probe.inner.lock().init_calls += 1;
        Ok(())
    }

    fn open_source(&self, path: &str) -> Result<MockSource, PlaybackError> {
        let name = path.rsplit('/').next().unwrap_or(path);
        if name.starts_with("missing") {
            return Err(PlaybackError::SourceOpen {
                path: path.to_string(),
                reason: "No such file or directory".to_string(),
            });
        }

        self.probe.acquire("source");
        Ok(MockSource {
            packets: self.media.packets(),
            reads: 0,
            media: self.media.clone(),
            probe: self.probe.clone(),
        })
    }

    fn open_decoder(
        &self,
        _source: &MockSource,
        stream_index: usize,
    ) -> Result<MockDecoder, PlaybackError> {
        if self.media.decoder_open_error {
            return Err(PlaybackError::DecoderOpen {
                stream_index,
                reason: "codec not supported".to_string(),
            });
        }

        self.probe.acquire("decoder");
        Ok(MockDecoder {
            geometry: Geometry::new(self.media.width, self.media.height),
            delay: self.media.decoder_delay,
            decode_error_at: self.media.decode_error_at,
            queue: VecDeque::new(),
            submitted: 0,
            eof: false,
            probe: self.probe.clone(),
        })
    }

    fn new_frame(&self) -> MockFrame {
        self.probe.acquire("frame");
        MockFrame {
            seq: 0,
            probe: self.probe.clone(),
        }
    }

    fn create_converter(
        &self,
        src_format: &'static str,
        dst_format: PixelFormat,
        geometry: Geometry,
    ) -> Result<MockConverter, PlaybackError> {
        if src_format != "yuv420p" || dst_format != PixelFormat::Rgba8888 {
            return Err(PlaybackError::ConverterSetup(format!(
                "unsupported conversion {src_format} -> {dst_format:?}"
            )));
        }

        self.probe.acquire("converter");
        Ok(MockConverter {
            geometry,
            probe: self.probe.clone(),
        })
    }
}

pub(crate) struct MockPacket {
    stream_index: usize,
    seq: u8,
    probe: Probe,
}

impl Drop for MockPacket {
    fn drop(&mut self) {
        self.probe.release("packet");
    }
}

pub(crate) struct MockFrame {
    seq: u8,
    probe: Probe,
}

impl Drop for MockFrame {
    fn drop(&mut self) {
        self.probe.release("frame");
    }
}

pub(crate) struct MockSource {
    packets: VecDeque<(usize, u8)>,
    reads: usize,
    media: MockMedia,
    probe: Probe,
}

impl MediaSource for MockSource {
    type Packet = MockPacket;

    fn probe_streams(&mut self) -> Result<Vec<StreamInfo>, PlaybackError> {
        if self.media.audio_only {
            return Ok(vec![StreamInfo {
                index: 0,
                kind: MediaKind::Audio,
                codec: "aac".to_string(),
            }]);
        }
        Ok(vec![
            StreamInfo {
                index: VIDEO_STREAM,
                kind: MediaKind::Video,
                codec: "h264".to_string(),
            },
            StreamInfo {
                index: AUDIO_STREAM,
                kind: MediaKind::Audio,
                codec: "aac".to_string(),
            },
        ])
    }

    fn new_packet(&self) -> MockPacket {
        self.probe.acquire("packet");
        MockPacket {
            stream_index: 0,
            seq: 0,
            probe: self.probe.clone(),
        }
    }

    fn read_packet(&mut self, packet: &mut MockPacket) -> Result<ReadOutcome, PlaybackError> {
        let read = self.reads;
        self.reads += 1;
        if self.media.read_error_at == Some(read) {
            return Err(PlaybackError::PacketRead("Input/output error".to_string()));
        }

        match self.packets.pop_front() {
            Some((stream_index, seq)) => {
                packet.stream_index = stream_index;
                packet.seq = seq;
                Ok(ReadOutcome::Packet { stream_index })
            }
            None => Ok(ReadOutcome::EndOfStream),
        }
    }
}

impl Drop for MockSource {
    fn drop(&mut self) {
        self.probe.release("source");
    }
}

pub(crate) struct MockDecoder {
    geometry: Geometry,
    delay: usize,
    decode_error_at: Option<usize>,
    queue: VecDeque<u8>,
    submitted: usize,
    eof: bool,
    probe: Probe,
}

impl VideoDecoder for MockDecoder {
    type Packet = MockPacket;
    type Frame = MockFrame;
    type Format = &'static str;

    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn format(&self) -> &'static str {
        "yuv420p"
    }

    fn submit(&mut self, packet: &MockPacket) -> Result<(), PlaybackError> {
        let n = self.submitted;
        self.submitted += 1;
        if self.decode_error_at == Some(n) {
            return Err(PlaybackError::Decode("invalid NAL unit".to_string()));
        }
        self.queue.push_back(packet.seq);
        Ok(())
    }

    fn submit_end_of_stream(&mut self) -> Result<(), PlaybackError> {
        self.eof = true;
        Ok(())
    }

    fn receive_frame(&mut self, frame: &mut MockFrame) -> Result<DecodeStatus, PlaybackError> {
        if self.queue.len() > self.delay || (self.eof && !self.queue.is_empty()) {
            if let Some(seq) = self.queue.pop_front() {
                frame.seq = seq;
                return Ok(DecodeStatus::Frame);
            }
        }
        Ok(DecodeStatus::Pending)
    }
}

impl Drop for MockDecoder {
    fn drop(&mut self) {
        self.probe.release("decoder");
    }
}

pub(crate) struct MockConverter {
    geometry: Geometry,
    probe: Probe,
}

impl FrameConverter for MockConverter {
    type Frame = MockFrame;

    fn convert(&mut self, frame: &MockFrame, dst: &mut RgbaFrame) -> Result<(), PlaybackError> {
        if dst.geometry() != self.geometry {
            return Err(PlaybackError::Convert("geometry mismatch".to_string()));
        }
        dst.data_mut().fill(frame.seq);
        Ok(())
    }
}

impl Drop for MockConverter {
    fn drop(&mut self) {
        self.probe.release("converter");
    }
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

type PresentHook = Box<dyn FnMut(usize) + Send>;

/// Surface with padded rows that records what reaches it.
pub(crate) struct MockSurface {
    probe: Probe,
    row_padding: usize,
    failing_locks: Vec<usize>,
    locks: usize,
    geometry: Option<Geometry>,
    back: Vec<u8>,
    on_present: Option<PresentHook>,
}

impl MockSurface {
    pub fn new(probe: &Probe) -> Self {
        Self {
            probe: probe.clone(),
            row_padding: 8,
            failing_locks: Vec::new(),
            locks: 0,
            geometry: None,
            back: Vec::new(),
            on_present: None,
        }
    }

    pub fn with_row_padding(mut self, padding: usize) -> Self {
        self.row_padding = padding;
        self
    }

    /// Lock attempts (1-based) that report the buffer as unavailable.
    pub fn failing_locks(mut self, attempts: &[usize]) -> Self {
        self.failing_locks = attempts.to_vec();
        self
    }

    /// Run `hook` with the number of presents so far after each present.
    pub fn on_present(mut self, hook: impl FnMut(usize) + Send + 'static) -> Self {
        self.on_present = Some(Box::new(hook));
        self
    }

    fn stride(&self) -> usize {
        self.geometry
            .map_or(0, |g| g.row_bytes(PixelFormat::Rgba8888) + self.row_padding)
    }
}

impl Surface for MockSurface {
    fn configure_geometry(
        &mut self,
        geometry: Geometry,
        format: PixelFormat,
    ) -> Result<(), PlaybackError> {
        let stride = geometry.row_bytes(format) + self.row_padding;
        self.back = vec![PADDING_BYTE; stride * geometry.height as usize];
        self.geometry = Some(geometry);
        self.probe.inner.lock().geometry.push(geometry);
        Ok(())
    }

    fn lock_buffer(&mut self) -> Result<SurfaceBuffer<'_>, PlaybackError> {
        self.locks += 1;
        if self.failing_locks.contains(&self.locks) {
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
        let stride = self.stride();
        let row_bytes = self
            .geometry
            .map_or(0, |g| g.row_bytes(PixelFormat::Rgba8888));

        let count = {
            let mut inner = self.probe.inner.lock();
            let padding_ok = self
                .back
                .chunks(stride.max(1))
                .all(|row| row[row_bytes.min(row.len())..].iter().all(|&b| b == PADDING_BYTE));
            inner.padding_intact &= padding_ok;
            inner.presented.push(self.back.first().copied().unwrap_or(0));
            inner.presented.len()
        };

        if let Some(hook) = self.on_present.as_mut() {
            hook(count);
        }
        Ok(())
    }

    fn release(&mut self) {
        let mut inner = self.probe.inner.lock();
        inner.surface_releases += 1;
        inner.order.push("surface.release");
    }
}

impl Drop for MockSurface {
    fn drop(&mut self) {
        let mut inner = self.probe.inner.lock();
        inner.surface_drops += 1;
        inner.order.push("surface");
    }
}
