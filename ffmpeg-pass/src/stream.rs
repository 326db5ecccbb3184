use ffmpeg_next::{Rational, codec::Parameters, format::stream::Stream, media};

use crate::time_base::TimeBase;

/// Codec parameters and timing copied out of a container stream, so they
/// outlive the borrow of the format context.
#[derive(Clone)]
pub struct AvStream {
    index: usize,
    parameters: Parameters,
    time_base: Rational,
    avg_frame_rate: Rational,
    frames: i64,
}

impl AvStream {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn medium(&self) -> media::Type {
        self.parameters.medium()
    }

    pub fn is_video(&self) -> bool {
        self.medium() == media::Type::Video
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    /// Average frame rate; `None` when the container leaves it unset.
    pub fn frame_rate(&self) -> Option<TimeBase> {
        let rate = TimeBase::from(self.avg_frame_rate);
        rate.is_valid().then_some(rate)
    }

    /// Frame count recorded by the container; 0 when unknown.
    pub fn frames(&self) -> i64 {
        self.frames
    }

    pub fn codec_name(&self) -> String {
        format!("{:?}", self.parameters.id()).to_lowercase()
    }

    /// Coded width and height; ffmpeg-next does not expose them on
    /// `Parameters`.
    pub fn dimensions(&self) -> (u32, u32) {
        unsafe {
            let ptr = self.parameters.as_ptr() as *const ffmpeg_next::ffi::AVCodecParameters;
            ((*ptr).width.max(0) as u32, (*ptr).height.max(0) as u32)
        }
    }
}

impl From<Stream<'_>> for AvStream {
    fn from(stream: Stream<'_>) -> Self {
        Self {
            index: stream.index(),
            parameters: stream.parameters(),
            time_base: stream.time_base(),
            avg_frame_rate: stream.avg_frame_rate(),
            frames: stream.frames(),
        }
    }
}
