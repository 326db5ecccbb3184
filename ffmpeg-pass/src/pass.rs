//! One traversal of the input: decode, convert, encode, multiplex.

use std::fmt;
use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::backend::{
    Backend, FrameConverter, FrameSource, Pass, RateControl, RateEncoder, SinkTarget,
};
use crate::config::TranscodeConfig;
use crate::error::{Result, TranscodeError};
use crate::sink::{MuxSink, OutputGuard};
use crate::stats::RateControlStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Opening,
    Streaming,
    Flushing,
    Finalizing,
    Closed,
    Failed,
}

/// Hands out presentation timestamps at the fixed output rate: every frame
/// gets the next tick, whatever its original timing was.
#[derive(Debug, Default)]
pub struct FrameCounter {
    next: i64,
}

impl FrameCounter {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn next_pts(&mut self) -> i64 {
        let pts = self.next;
        self.next += 1;
        pts
    }

    pub fn count(&self) -> u64 {
        self.next as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub pass: Pass,
    pub frames_decoded: u64,
    pub frames_encoded: u64,
    pub packets_written: u64,
    pub bytes_written: u64,
    pub last_pts: Option<i64>,
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pass: {} frames decoded, {} encoded, {} packets / {} bytes written",
            self.pass,
            self.frames_decoded,
            self.frames_encoded,
            self.packets_written,
            self.bytes_written
        )
    }
}

/// Everything one pass owns. Built fresh per pass and threaded through
/// every stage call, so nothing leaks from one pass into the next.
pub struct PassContext<'a> {
    pass: Pass,
    input: &'a Path,
    target: SinkTarget,
    config: &'a TranscodeConfig,
    stats: Option<&'a RateControlStats>,
    cancel: CancellationToken,
    counter: FrameCounter,
    state: PassState,
}

impl<'a> PassContext<'a> {
    /// First pass: statistics go into `stats`, output is discarded.
    pub fn first(
        input: &'a Path,
        config: &'a TranscodeConfig,
        stats: &'a RateControlStats,
    ) -> Self {
        Self::new(Pass::First, input, SinkTarget::Discard, config, Some(stats))
    }

    /// Second pass: reads `stats` and writes the real output.
    pub fn second(
        input: &'a Path,
        output: &'a Path,
        config: &'a TranscodeConfig,
        stats: Option<&'a RateControlStats>,
    ) -> Self {
        Self::new(
            Pass::Second,
            input,
            SinkTarget::File(output.to_path_buf()),
            config,
            stats,
        )
    }

    fn new(
        pass: Pass,
        input: &'a Path,
        target: SinkTarget,
        config: &'a TranscodeConfig,
        stats: Option<&'a RateControlStats>,
    ) -> Self {
        Self {
            pass,
            input,
            target,
            config,
            stats,
            cancel: CancellationToken::new(),
            counter: FrameCounter::new(),
            state: PassState::Opening,
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    pub fn pass(&self) -> Pass {
        self.pass
    }

    fn transition(&mut self, next: PassState) {
        log::debug!("{} pass: {:?} -> {:?}", self.pass, self.state, next);
        self.state = next;
    }

    fn rate_control(&self) -> Result<RateControl<'a>> {
        let stats = self.stats.ok_or_else(|| {
            TranscodeError::MissingStats(format!("no statistics handle for the {} pass", self.pass))
        })?;
        match self.pass {
            Pass::First => Ok(RateControl::Collect(stats.path())),
            Pass::Second => {
                stats.check_usable(self.config)?;
                Ok(RateControl::Consume(stats.path()))
            }
        }
    }
}

/// Drives one pass to `Closed`, or to `Failed` with the first error.
/// Every context, buffer and file handle opened along the way is released
/// before this returns, on both paths.
pub fn run_pass<B: Backend>(backend: &B, ctx: &mut PassContext<'_>) -> Result<PassReport> {
    log::info!("{} pass started: {} -> {}", ctx.pass, ctx.input.display(), ctx.target);
    match drive(backend, ctx) {
        Ok(report) => {
            ctx.transition(PassState::Closed);
            log::info!("{}", report);
            Ok(report)
        }
        Err(e) => {
            ctx.transition(PassState::Failed);
            Err(e)
        }
    }
}

fn drive<B: Backend>(backend: &B, ctx: &mut PassContext<'_>) -> Result<PassReport> {
    let rate_control = ctx.rate_control()?;

    let mut source = backend.open_source(ctx.input)?;
    let params = source.params().clone();
    log::debug!(
        "{} pass input stream #{}: {} {}x{} {} time base {}",
        ctx.pass,
        params.index,
        params.codec,
        params.width,
        params.height,
        params.pixel_format,
        params.time_base
    );

    let mut guard = OutputGuard::new(&ctx.target, ctx.config.keep_partial_output);
    let mut muxer = backend.open_muxer(&ctx.target, ctx.config)?;
    guard.arm();
    let mut encoder = backend.open_encoder(&source, &muxer, ctx.config, rate_control)?;
    backend.start_muxer(&mut muxer, &encoder)?;
    let mut converter = backend.open_converter(&source, &encoder, ctx.config)?;
    let sink = MuxSink::new(ctx.target.clone(), muxer, encoder.time_base());

    ctx.transition(PassState::Streaming);
    let mut frames_decoded = 0_u64;
    let mut last_pts = None;
    while let Some(frame) = source.next_frame()? {
        if ctx.cancel.is_cancelled() {
            return Err(TranscodeError::Cancelled);
        }
        frames_decoded += 1;
        let converted = converter.convert(&frame)?;
        let pts = ctx.counter.next_pts();
        for packet in encoder.submit(converted, pts)? {
            sink.write_packet(packet)?;
        }
        last_pts = Some(pts);
    }
    if frames_decoded == 0 {
        return Err(TranscodeError::Decode(format!(
            "no video frames decoded from {}",
            ctx.input.display()
        )));
    }

    ctx.transition(PassState::Flushing);
    for packet in encoder.flush()? {
        sink.write_packet(packet)?;
    }

    ctx.transition(PassState::Finalizing);
    sink.finalize()?;
    guard.commit();

    Ok(PassReport {
        pass: ctx.pass,
        frames_decoded,
        frames_encoded: ctx.counter.count(),
        packets_written: sink.packets_written(),
        bytes_written: sink.bytes_written(),
        last_pts,
    })
}

#[cfg(test)]
#[path = "pass_test.rs"]
mod pass_test;
