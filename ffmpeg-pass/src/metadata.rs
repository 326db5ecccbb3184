//! Media file metadata (similar to ffprobe).

use std::fmt;
use std::path::Path;

use ffmpeg_next::media;

use crate::{error::TranscodeError, stream::AvStream, time_base::TimeBase};

/// Format-level info (corresponds to ffprobe format).
#[derive(Debug, Clone)]
pub struct FormatInfo {
    /// Format name, e.g. "mov,mp4,m4a,3gp,3g2,mj2"
    pub format_name: String,
    /// Duration in seconds; None if unknown (e.g. raw h264).
    pub duration_sec: Option<f64>,
    /// Total bitrate in bps; 0 if unknown.
    pub bit_rate: i64,
    pub nb_streams: u32,
}

/// Per-stream info (corresponds to ffprobe stream).
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub index: usize,
    /// "video" | "audio" | "subtitle" etc.
    pub codec_type: String,
    /// e.g. "h264", "aac"
    pub codec_name: String,
    pub time_base: TimeBase,
    /// Stream duration in time_base units; None if unknown.
    pub duration_ts: Option<i64>,
    /// Average frame rate, e.g. 60/1; None if unset.
    pub frame_rate: Option<TimeBase>,
    /// Frame count from the container index; None if unknown.
    pub frames: Option<i64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub format: FormatInfo,
    pub streams: Vec<StreamInfo>,
}

impl MediaInfo {
    pub fn video_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(|s| s.codec_type == "video")
    }
}

impl fmt::Display for MediaInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[FORMAT]")?;
        writeln!(f, "format_name={}", self.format.format_name)?;
        if let Some(d) = self.format.duration_sec {
            writeln!(f, "duration_sec={:.3}", d)?;
        } else {
            writeln!(f, "duration_sec=N/A")?;
        }
        writeln!(f, "bit_rate={}", self.format.bit_rate)?;
        writeln!(f, "nb_streams={}", self.format.nb_streams)?;
        writeln!(f, "[/FORMAT]")?;
        for s in &self.streams {
            writeln!(f, "[STREAM]")?;
            writeln!(f, "index={}", s.index)?;
            writeln!(f, "codec_type={}", s.codec_type)?;
            writeln!(f, "codec_name={}", s.codec_name)?;
            writeln!(f, "time_base={}", s.time_base)?;
            if let Some(d) = s.duration_ts {
                writeln!(f, "duration_ts={}", d)?;
            }
            if let Some(r) = s.frame_rate {
                writeln!(f, "avg_frame_rate={}", r)?;
            }
            if let Some(n) = s.frames {
                writeln!(f, "nb_frames={}", n)?;
            }
            if let Some(w) = s.width {
                writeln!(f, "width={}", w)?;
            }
            if let Some(h) = s.height {
                writeln!(f, "height={}", h)?;
            }
            writeln!(f, "[/STREAM]")?;
        }
        Ok(())
    }
}

fn known(value: i64) -> Option<i64> {
    if value == ffmpeg_next::ffi::AV_NOPTS_VALUE as i64 || value < 0 {
        None
    } else {
        Some(value)
    }
}

/// Opens a file and returns media metadata.
pub fn probe(path: &Path) -> crate::Result<MediaInfo> {
    let input = ffmpeg_next::format::input(path).map_err(|e| TranscodeError::open(path, e))?;

    let format_name = input.format().name().to_string();
    let nb_streams = input.nb_streams();
    let bit_rate = input.bit_rate();
    // AV_TIME_BASE = 1_000_000; duration is in 1/AV_TIME_BASE seconds
    let duration_sec = known(input.duration())
        .filter(|d| *d > 0)
        .map(|d| d as f64 / 1_000_000.0);

    let streams = input
        .streams()
        .map(|stream| {
            let duration_ts = known(stream.duration());
            let av_stream = AvStream::from(stream);
            let (width, height) = if av_stream.is_video() {
                let (w, h) = av_stream.dimensions();
                (Some(w), Some(h))
            } else {
                (None, None)
            };
            StreamInfo {
                index: av_stream.index(),
                codec_type: format!("{:?}", av_stream.medium()).to_lowercase(),
                codec_name: av_stream.codec_name(),
                time_base: av_stream.time_base().into(),
                duration_ts,
                frame_rate: av_stream.frame_rate(),
                frames: Some(av_stream.frames()).filter(|n| *n > 0),
                width,
                height,
            }
        })
        .collect();

    Ok(MediaInfo {
        format: FormatInfo {
            format_name,
            duration_sec,
            bit_rate,
            nb_streams,
        },
        streams,
    })
}

/// Packet timestamps of the best video stream, in container order.
#[derive(Debug, Clone)]
pub struct VideoTimeline {
    pub time_base: TimeBase,
    pub pts: Vec<Option<i64>>,
    pub dts: Vec<Option<i64>>,
    pub bytes: u64,
}

impl VideoTimeline {
    pub fn packets(&self) -> usize {
        self.pts.len()
    }

    /// Presentation times in display order, converted to `time_base`.
    pub fn presentation_ticks(&self, time_base: TimeBase) -> Vec<i64> {
        let mut ticks: Vec<i64> = self
            .pts
            .iter()
            .flatten()
            .map(|ts| TimeBase::rescale(*ts, self.time_base, time_base))
            .collect();
        ticks.sort_unstable();
        ticks
    }
}

pub fn video_timeline(path: &Path) -> crate::Result<VideoTimeline> {
    let mut input =
        ffmpeg_next::format::input(path).map_err(|e| TranscodeError::open(path, e))?;
    let (index, time_base) = input
        .streams()
        .best(media::Type::Video)
        .map(|s| (s.index(), TimeBase::from(s.time_base())))
        .ok_or_else(|| TranscodeError::open(path, "no video stream"))?;

    let mut timeline = VideoTimeline {
        time_base,
        pts: Vec::new(),
        dts: Vec::new(),
        bytes: 0,
    };
    for (stream, packet) in input.packets() {
        if stream.index() != index {
            continue;
        }
        timeline.pts.push(packet.pts());
        timeline.dts.push(packet.dts());
        timeline.bytes += packet.size() as u64;
    }
    Ok(timeline)
}
