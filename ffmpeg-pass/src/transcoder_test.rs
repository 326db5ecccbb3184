use std::path::Path;

use tokio_util::sync::CancellationToken;

use super::Transcoder;
use crate::backend::{Pass, SinkTarget};
use crate::config::TranscodeConfig;
use crate::error::ErrorKind;
use crate::mock::MockBackend;
use crate::stats::RateControlStats;

#[test]
fn test_run_does_both_passes_in_order() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("clip.mp4");
    let transcoder = Transcoder::new(MockBackend::new(60), TranscodeConfig::default())?;

    let report = transcoder.run(Path::new("clip.y4m"), &output)?;

    assert_eq!(report.first.pass, Pass::First);
    assert_eq!(report.second.pass, Pass::Second);
    assert_eq!(report.first.frames_decoded, 60);
    assert_eq!(report.second.frames_encoded, 60);
    assert_eq!(report.output, output);
    assert!(output.exists());

    let backend = transcoder.backend();
    assert_eq!(backend.muxers.lock().unwrap().len(), 2);
    assert_eq!(
        backend.mux_log(0).lock().unwrap().target,
        Some(SinkTarget::Discard)
    );
    assert_eq!(
        backend.mux_log(1).lock().unwrap().target,
        Some(SinkTarget::File(output.clone()))
    );
    assert_eq!(backend.live_resources(), 0);
    Ok(())
}

#[test]
fn test_runs_are_repeatable() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let transcoder = Transcoder::new(MockBackend::new(25), TranscodeConfig::default())?;

    transcoder.run(Path::new("clip.y4m"), &dir.path().join("a.mp4"))?;
    transcoder.run(Path::new("clip.y4m"), &dir.path().join("b.mp4"))?;

    let backend = transcoder.backend();
    let first = backend.mux_log(1).lock().unwrap().packets.clone();
    let second = backend.mux_log(3).lock().unwrap().packets.clone();
    assert_eq!(first.len(), 25);
    let ts = |packets: &[crate::mock::MockPacket]| -> Vec<(Option<i64>, Option<i64>)> {
        packets.iter().map(|p| (p.pts, p.dts)).collect()
    };
    assert_eq!(ts(&first), ts(&second));
    Ok(())
}

#[test]
fn test_first_pass_failure_never_touches_output() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("clip.mp4");
    let mut backend = MockBackend::new(10);
    backend.fail_decode_at = Some(3);
    let transcoder = Transcoder::new(backend, TranscodeConfig::default())?;

    let err = transcoder.run(Path::new("clip.y4m"), &output).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert!(!output.exists());
    assert_eq!(transcoder.backend().muxers.lock().unwrap().len(), 1);
    Ok(())
}

#[test]
fn test_first_pass_marks_stats() -> anyhow::Result<()> {
    let transcoder = Transcoder::new(MockBackend::new(4), TranscodeConfig::default())?;
    let mut stats = RateControlStats::new()?;
    transcoder.first_pass(Path::new("clip.y4m"), &mut stats)?;
    assert!(stats.is_populated());
    assert_eq!(stats.frames(), Some(4));
    Ok(())
}

#[test]
fn test_second_pass_alone_needs_stats() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("clip.mp4");
    let transcoder = Transcoder::new(MockBackend::new(4), TranscodeConfig::default())?;
    let err = transcoder
        .second_pass(Path::new("clip.y4m"), &output, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingStats);
    assert!(!output.exists());
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected_up_front() {
    let mut config = TranscodeConfig::default();
    config.bit_rate = 0;
    let err = Transcoder::new(MockBackend::new(1), config).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_output_may_not_overwrite_input() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("clip.mp4");
    std::fs::write(&input, b"source")?;
    let transcoder = Transcoder::new(MockBackend::new(4), TranscodeConfig::default())?;
    let err = transcoder.run(&input, &input).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(std::fs::read(&input)?, b"source");
    Ok(())
}

#[test]
fn test_cancelled_run_leaves_no_output() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("clip.mp4");
    let cancel = CancellationToken::new();
    let transcoder = Transcoder::new(MockBackend::new(10), TranscodeConfig::default())?
        .with_cancel(cancel.clone());
    cancel.cancel();
    let err = transcoder.run(Path::new("clip.y4m"), &output).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(!output.exists());
    Ok(())
}
