use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TranscodeError};
use crate::time_base::TimeBase;

/// Resampling algorithm used by the frame converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerKind {
    FastBilinear,
    Bilinear,
    Bicubic,
    Area,
    Point,
    Lanczos,
}

/// Pixel layouts the H.264 encoder is fed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputPixelFormat {
    Yuv420p,
    Yuv422p,
    Yuv444p,
}

impl OutputPixelFormat {
    /// Whether the chroma planes are subsampled horizontally and vertically.
    pub fn subsampled(&self) -> (bool, bool) {
        match self {
            OutputPixelFormat::Yuv420p => (true, true),
            OutputPixelFormat::Yuv422p => (true, false),
            OutputPixelFormat::Yuv444p => (false, false),
        }
    }
}

/// Encoder and muxer settings shared by both passes. The second pass must
/// run with exactly the configuration the first pass collected statistics
/// with, so one value is built per run and never mutated in between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    // encoder name, e.g. "libx264"
    pub codec: String,
    // muxer short name, e.g. "mp4"
    pub container: String,
    pub pixel_format: OutputPixelFormat,
    // None = keep the source size
    pub width: Option<u32>,
    pub height: Option<u32>,
    // bps
    pub bit_rate: u64,
    pub time_base: TimeBase,
    pub frame_rate: TimeBase,
    pub gop_size: u32,
    pub max_b_frames: u32,
    // 0 = let the encoder decide
    pub threads: usize,
    pub preset: String,
    pub tune: Option<String>,
    pub profile: Option<String>,
    pub scaler: ScalerKind,
    /// Leave a partially written output in place when the second pass fails.
    pub keep_partial_output: bool,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            container: "mp4".to_string(),
            pixel_format: OutputPixelFormat::Yuv420p,
            width: None,
            height: None,
            bit_rate: 500_000,
            time_base: TimeBase::new(1, 60),
            frame_rate: TimeBase::new(60, 1),
            gop_size: 60,
            max_b_frames: 3,
            threads: 32,
            preset: "veryfast".to_string(),
            tune: Some("film".to_string()),
            profile: Some("high".to_string()),
            scaler: ScalerKind::Bilinear,
            keep_partial_output: false,
        }
    }
}

impl TranscodeConfig {
    /// Reads a JSON document; any field it omits keeps its default.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: TranscodeConfig = serde_json::from_str(&text)
            .map_err(|e| TranscodeError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.codec.is_empty() {
            return Err(TranscodeError::Config("codec name is empty".to_string()));
        }
        if self.container.is_empty() {
            return Err(TranscodeError::Config("container name is empty".to_string()));
        }
        if self.bit_rate == 0 {
            return Err(TranscodeError::Config(
                "two-pass rate control needs a non-zero bit rate".to_string(),
            ));
        }
        if self.gop_size == 0 {
            return Err(TranscodeError::Config("gop size must be at least 1".to_string()));
        }
        if !self.time_base.is_valid() {
            return Err(TranscodeError::Config(format!(
                "invalid time base {}",
                self.time_base
            )));
        }
        if !self.frame_rate.is_valid() {
            return Err(TranscodeError::Config(format!(
                "invalid frame rate {}",
                self.frame_rate
            )));
        }
        let (sub_x, sub_y) = self.pixel_format.subsampled();
        for (name, value, subsampled) in [("width", self.width, sub_x), ("height", self.height, sub_y)]
        {
            match value {
                Some(0) => {
                    return Err(TranscodeError::Config(format!("{} must be positive", name)));
                }
                Some(v) if subsampled && v % 2 != 0 => {
                    return Err(TranscodeError::Config(format!(
                        "{} {} must be even for {:?}",
                        name, v, self.pixel_format
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
