use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::backend::Backend;
use crate::config::TranscodeConfig;
use crate::error::{Result, TranscodeError};
use crate::pass::{PassContext, PassReport, run_pass};
use crate::stats::RateControlStats;

#[derive(Debug, Clone)]
pub struct TranscodeReport {
    pub first: PassReport,
    pub second: PassReport,
    pub output: PathBuf,
}

/// Runs the statistics pass and then the encoding pass over one input.
/// The passes are strictly sequential; a failure in the first one stops
/// the run before the output is touched.
pub struct Transcoder<B: Backend> {
    backend: B,
    config: TranscodeConfig,
    cancel: CancellationToken,
}

impl<B: Backend> Transcoder<B> {
    pub fn new(backend: B, config: TranscodeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            config,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn run(&self, input: &Path, output: &Path) -> Result<TranscodeReport> {
        check_distinct(input, output)?;
        let mut stats = RateControlStats::new()?;
        let first = self.first_pass(input, &mut stats)?;
        let second = self.second_pass(input, output, Some(&stats))?;
        if second.frames_encoded != first.frames_encoded {
            log::warn!(
                "pass frame counts differ: first {}, second {}",
                first.frames_encoded,
                second.frames_encoded
            );
        }
        Ok(TranscodeReport {
            first,
            second,
            output: output.to_path_buf(),
        })
    }

    /// Collects rate-control statistics into `stats`, discarding output.
    pub fn first_pass(&self, input: &Path, stats: &mut RateControlStats) -> Result<PassReport> {
        let report = {
            let mut ctx =
                PassContext::first(input, &self.config, stats).with_cancel(self.cancel.clone());
            run_pass(&self.backend, &mut ctx)?
        };
        stats.mark_collected(report.frames_encoded, &self.config);
        if !stats.is_populated() {
            return Err(TranscodeError::MissingStats(format!(
                "first pass left no statistics at {}",
                stats.path().display()
            )));
        }
        Ok(report)
    }

    /// Encodes `input` into `output` using statistics from [`Self::first_pass`].
    pub fn second_pass(
        &self,
        input: &Path,
        output: &Path,
        stats: Option<&RateControlStats>,
    ) -> Result<PassReport> {
        let mut ctx = PassContext::second(input, output, &self.config, stats)
            .with_cancel(self.cancel.clone());
        run_pass(&self.backend, &mut ctx)
    }
}

fn check_distinct(input: &Path, output: &Path) -> Result<()> {
    let same = match (input.canonicalize(), output.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => input == output,
    };
    if same {
        return Err(TranscodeError::Config(format!(
            "output {} would overwrite the input",
            output.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "transcoder_test.rs"]
mod transcoder_test;
