//! Rate-control statistics handed from the first pass to the second.
//!
//! The encoder persists its per-frame cost log as a side file; this handle
//! owns the scratch directory holding it and removes it on drop.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::TranscodeConfig;
use crate::error::{Result, TranscodeError};

const STATS_FILE: &str = "x264_2pass.log";

#[derive(Debug)]
struct Collected {
    frames: u64,
    config: TranscodeConfig,
}

#[derive(Debug)]
pub struct RateControlStats {
    dir: TempDir,
    path: PathBuf,
    collected: Option<Collected>,
}

impl RateControlStats {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("lite-transcode-stats-")
            .tempdir()?;
        let path = dir.path().join(STATS_FILE);
        Ok(Self {
            dir,
            path,
            collected: None,
        })
    }

    /// Where the encoder reads and writes its statistics.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Frames the first pass collected statistics for.
    pub fn frames(&self) -> Option<u64> {
        self.collected.as_ref().map(|c| c.frames)
    }

    pub(crate) fn mark_collected(&mut self, frames: u64, config: &TranscodeConfig) {
        self.collected = Some(Collected {
            frames,
            config: config.clone(),
        });
    }

    /// True once a first pass completed and left a non-empty stats file.
    pub fn is_populated(&self) -> bool {
        self.collected.is_some()
            && std::fs::metadata(&self.path)
                .map(|m| m.is_file() && m.len() > 0)
                .unwrap_or(false)
    }

    /// Checks the handle can seed a second pass encoding with `config`.
    pub(crate) fn check_usable(&self, config: &TranscodeConfig) -> Result<()> {
        let collected = self.collected.as_ref().ok_or_else(|| {
            TranscodeError::MissingStats("first pass has not run".to_string())
        })?;
        if !self.is_populated() {
            return Err(TranscodeError::MissingStats(format!(
                "{} is missing or empty",
                self.path.display()
            )));
        }
        if collected.config != *config {
            return Err(TranscodeError::Config(
                "statistics were collected with a different encoder configuration".to_string(),
            ));
        }
        Ok(())
    }
}
