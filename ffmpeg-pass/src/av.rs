//! [`Backend`] over libav: demux and decode with libavformat/libavcodec,
//! convert with libswscale, encode with libx264 and mux to MP4.

use std::path::Path;

use ffmpeg_next::format::Pixel;

use crate::{
    backend::{Backend, FrameSource, RateControl, SinkTarget},
    config::TranscodeConfig,
    decoder::VideoSource,
    encoder::Encoder,
    output::AvOutput,
    packet::RawPacket,
    scaler::{Scaler, scaling_flags},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct AvBackend;

impl Backend for AvBackend {
    type Frame = ffmpeg_next::frame::Video;
    type Packet = RawPacket;
    type Source = VideoSource;
    type Converter = Scaler;
    type Encoder = Encoder;
    type Muxer = AvOutput;

    fn open_source(&self, input: &Path) -> crate::Result<VideoSource> {
        VideoSource::open(input)
    }

    fn open_muxer(&self, target: &SinkTarget, config: &TranscodeConfig) -> crate::Result<AvOutput> {
        AvOutput::open(target, &config.container)
    }

    fn open_encoder(
        &self,
        source: &VideoSource,
        muxer: &AvOutput,
        config: &TranscodeConfig,
        rate_control: RateControl<'_>,
    ) -> crate::Result<Encoder> {
        Encoder::open(source, config, rate_control, muxer.wants_global_header())
    }

    fn start_muxer(&self, muxer: &mut AvOutput, encoder: &Encoder) -> crate::Result<()> {
        muxer.start(encoder)
    }

    fn open_converter(
        &self,
        source: &VideoSource,
        encoder: &Encoder,
        config: &TranscodeConfig,
    ) -> crate::Result<Scaler> {
        let params = source.params();
        let decoder = source.decoder();
        let src: (Pixel, u32, u32) = (decoder.format(), params.width, params.height);
        let dst = (encoder.format(), encoder.width(), encoder.height());
        Scaler::new(src, dst, scaling_flags(config.scaler))
    }
}

#[cfg(test)]
#[path = "av_test.rs"]
pub(crate) mod av_test;
