/// Registers FFmpeg components. Call once at startup before opening any
/// input or output.
pub fn init() -> Result<()> {
    ffmpeg_next::init().map_err(|e| TranscodeError::Resource(format!("ffmpeg_next init: {}", e)))
}

/// Sets libav's own log level: errors only by default, info and up when
/// `verbose`.
pub fn set_av_log_level(verbose: bool) {
    let level = if verbose {
        ffmpeg_next::util::log::Level::Info
    } else {
        ffmpeg_next::util::log::Level::Error
    };
    ffmpeg_next::util::log::set_level(level);
}

pub mod av;
pub mod backend;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod input;
pub mod metadata;
pub mod output;
pub mod packet;
pub mod pass;
pub mod scaler;
pub mod sink;
pub mod stats;
pub mod stream;
pub mod time_base;
pub mod transcoder;

#[cfg(test)]
mod mock;

pub use av::AvBackend;
pub use backend::{Backend, Pass, SinkTarget};
pub use config::{OutputPixelFormat, ScalerKind, TranscodeConfig};
pub use error::{ErrorKind, Result, TranscodeError};
pub use metadata::{MediaInfo, probe};
pub use pass::{PassReport, PassState};
pub use stats::RateControlStats;
pub use time_base::TimeBase;
pub use transcoder::{TranscodeReport, Transcoder};
