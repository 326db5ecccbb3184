use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::{Muxer, SinkTarget, Timestamped};
use crate::error::{Result, TranscodeError};
use crate::time_base::TimeBase;

struct SinkState<M> {
    muxer: M,
    finalized: bool,
}

/// Multiplexed output of one pass. Every append goes through a single lock,
/// so packets land in the container in the order the writers acquired it
/// and the muxer's interleaving state is never touched concurrently.
pub struct MuxSink<M: Muxer> {
    target: SinkTarget,
    encoder_time_base: TimeBase,
    state: Mutex<SinkState<M>>,
    packets: AtomicU64,
    bytes: AtomicU64,
}

impl<M: Muxer> MuxSink<M> {
    pub fn new(target: SinkTarget, muxer: M, encoder_time_base: TimeBase) -> Self {
        Self {
            target,
            encoder_time_base,
            state: Mutex::new(SinkState {
                muxer,
                finalized: false,
            }),
            packets: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    /// Rescales `packet` from the encoder time base to the stream time base
    /// and appends it.
    pub fn write_packet(&self, mut packet: M::Packet) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| TranscodeError::write(&self.target, "writer lock poisoned"))?;
        if state.finalized {
            return Err(TranscodeError::write(
                &self.target,
                "packet written after finalize",
            ));
        }
        let stream_time_base = state.muxer.stream_time_base();
        packet.rescale_ts(self.encoder_time_base, stream_time_base);
        let size = packet.size() as u64;
        state.muxer.write_packet(packet)?;
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(size, Ordering::Relaxed);
        Ok(())
    }

    /// Writes the container trailer. Only the first call reaches the muxer.
    pub fn finalize(&self) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| TranscodeError::write(&self.target, "writer lock poisoned"))?;
        if state.finalized {
            return Err(TranscodeError::write(&self.target, "sink already finalized"));
        }
        state.finalized = true;
        state.muxer.finalize()
    }

    pub fn packets_written(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Removes a partially written output file unless committed.
///
/// Declare it before the muxer that writes `path` so the muxer closes its
/// handle first when both go out of scope.
pub struct OutputGuard {
    path: Option<PathBuf>,
    armed: bool,
    keep: bool,
}

impl OutputGuard {
    pub fn new(target: &SinkTarget, keep: bool) -> Self {
        Self {
            path: target.path().map(Path::to_path_buf),
            armed: false,
            keep,
        }
    }

    /// Called once the output file has been created.
    pub fn arm(&mut self) {
        self.armed = self.path.is_some();
    }

    pub fn commit(&mut self) {
        self.armed = false;
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Some(path) = self.path.as_ref() else {
            return;
        };
        if self.keep {
            log::warn!("leaving incomplete output in place: {}", path.display());
            return;
        }
        match std::fs::remove_file(path) {
            Ok(()) => log::warn!("removed incomplete output: {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::error!("could not remove incomplete output {}: {}", path.display(), e),
        }
    }
}
