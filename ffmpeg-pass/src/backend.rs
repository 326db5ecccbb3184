//! Capability boundaries between the pass orchestrator and a codec library.
//!
//! The orchestrator only ever talks to these traits; [`crate::av::AvBackend`]
//! implements them on top of libav through `ffmpeg-next`.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::TranscodeConfig;
use crate::error::Result;
use crate::time_base::TimeBase;

/// Which traversal of the input is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    First,
    Second,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::First => write!(f, "first"),
            Pass::Second => write!(f, "second"),
        }
    }
}

/// Where a pass sends its multiplexed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    /// Runs the muxer against a null device; nothing is retained.
    Discard,
    File(PathBuf),
}

impl SinkTarget {
    pub fn path(&self) -> Option<&Path> {
        match self {
            SinkTarget::Discard => None,
            SinkTarget::File(path) => Some(path),
        }
    }
}

impl fmt::Display for SinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkTarget::Discard => write!(f, "<discard>"),
            SinkTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Statistics mode of the rate-controlled encoder.
#[derive(Debug, Clone, Copy)]
pub enum RateControl<'a> {
    /// Gather per-frame cost statistics into the file.
    Collect(&'a Path),
    /// Allocate bits from statistics a previous pass wrote to the file.
    Consume(&'a Path),
}

/// Parameters of the selected input video stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamParams {
    pub index: usize,
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub pixel_format: String,
    pub time_base: TimeBase,
    pub frame_rate: Option<TimeBase>,
}

pub trait Timestamped {
    fn pts(&self) -> Option<i64>;
    fn dts(&self) -> Option<i64>;
    fn size(&self) -> usize;
    fn rescale_ts(&mut self, from: TimeBase, to: TimeBase);
}

/// Pull-based decoder over one input container.
pub trait FrameSource {
    type Frame;

    fn params(&self) -> &StreamParams;

    /// Next decoded frame, or `None` once the container is exhausted.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>>;
}

/// Pixel format and geometry conversion into the encoder's input layout.
/// The returned frame is a buffer owned by the converter and overwritten
/// on the next call.
pub trait FrameConverter {
    type Frame;

    fn convert(&mut self, frame: &Self::Frame) -> Result<&mut Self::Frame>;
}

pub trait RateEncoder {
    type Frame;
    type Packet: Timestamped;

    fn time_base(&self) -> TimeBase;

    /// Encodes `frame` stamped with `pts`; an empty result is normal while
    /// the encoder is buffering.
    fn submit(&mut self, frame: &mut Self::Frame, pts: i64) -> Result<Vec<Self::Packet>>;

    /// Signals end of stream and drains every remaining packet.
    fn flush(&mut self) -> Result<Vec<Self::Packet>>;
}

pub trait Muxer {
    type Packet: Timestamped;

    fn stream_time_base(&self) -> TimeBase;

    /// Appends a packet whose timestamps are already in the stream time base.
    fn write_packet(&mut self, packet: Self::Packet) -> Result<()>;

    /// Writes the trailer/index.
    fn finalize(&mut self) -> Result<()>;
}

/// Opens one instance of every stage for a single pass.
pub trait Backend {
    type Frame;
    type Packet: Timestamped;
    type Source: FrameSource<Frame = Self::Frame>;
    type Converter: FrameConverter<Frame = Self::Frame>;
    type Encoder: RateEncoder<Frame = Self::Frame, Packet = Self::Packet>;
    type Muxer: Muxer<Packet = Self::Packet>;

    fn open_source(&self, input: &Path) -> Result<Self::Source>;

    fn open_muxer(&self, target: &SinkTarget, config: &TranscodeConfig) -> Result<Self::Muxer>;

    fn open_encoder(
        &self,
        source: &Self::Source,
        muxer: &Self::Muxer,
        config: &TranscodeConfig,
        rate_control: RateControl<'_>,
    ) -> Result<Self::Encoder>;

    /// Declares the output stream from the opened encoder and writes the
    /// container header.
    fn start_muxer(&self, muxer: &mut Self::Muxer, encoder: &Self::Encoder) -> Result<()>;

    fn open_converter(
        &self,
        source: &Self::Source,
        encoder: &Self::Encoder,
        config: &TranscodeConfig,
    ) -> Result<Self::Converter>;
}
