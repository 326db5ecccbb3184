use ffmpeg_next::Rational;

use crate::{
    backend::{FrameSource, StreamParams},
    error::TranscodeError,
    input::AvInput,
    packet::RawPacket,
};

/// Video decoder for the selected input stream.
pub struct Decoder {
    inner: ffmpeg_next::codec::decoder::Video,
    decoder_time_base: Rational,
}

impl Decoder {
    pub fn new(input: &AvInput) -> crate::Result<Self> {
        let stream = input.video_stream();
        let mut decoder_ctx =
            ffmpeg_next::codec::Context::from_parameters(stream.parameters().clone())
                .map_err(|e| TranscodeError::open(input.path(), e))?;
        unsafe {
            (*decoder_ctx.as_mut_ptr()).time_base = stream.time_base().into();
        }

        let video_decoder = decoder_ctx.decoder().video().map_err(|e| {
            TranscodeError::open(
                input.path(),
                format!("no decoder for {}: {}", stream.codec_name(), e),
            )
        })?;

        if video_decoder.format() == ffmpeg_next::format::Pixel::None
            || video_decoder.width() == 0
            || video_decoder.height() == 0
        {
            return Err(TranscodeError::open(input.path(), "missing codec parameters"));
        }

        let decoder_time_base = stream.time_base();
        Ok(Self {
            inner: video_decoder,
            decoder_time_base,
        })
    }

    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    pub fn format(&self) -> ffmpeg_next::format::Pixel {
        self.inner.format()
    }

    pub fn aspect_ratio(&self) -> Rational {
        self.inner.aspect_ratio()
    }

    pub fn send_packet(&mut self, mut packet: RawPacket) -> crate::Result<()> {
        let time_base = packet.time_base();
        let packet = packet.get_mut();
        packet.rescale_ts(time_base, self.decoder_time_base);
        self.inner
            .send_packet(packet)
            .map_err(|e| TranscodeError::Decode(format!("send packet: {}", e)))
    }

    pub fn send_eof(&mut self) -> crate::Result<()> {
        self.inner
            .send_eof()
            .map_err(|e| TranscodeError::Decode(format!("send eof: {}", e)))
    }

    /// `Ok(None)` when the decoder needs more input or is fully drained.
    pub fn receive_frame(&mut self) -> crate::Result<Option<ffmpeg_next::frame::Video>> {
        let mut frame = ffmpeg_next::frame::Video::empty();
        match self.inner.receive_frame(&mut frame) {
            Ok(()) => Ok(Some(frame)),
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::util::error::EAGAIN => {
                Ok(None)
            }
            Err(err) => Err(TranscodeError::Decode(format!("receive frame: {}", err))),
        }
    }
}

/// Pulls decoded frames out of an input file, feeding the decoder packets
/// until it yields one.
pub struct VideoSource {
    input: AvInput,
    decoder: Decoder,
    params: StreamParams,
    eof_sent: bool,
    finished: bool,
}

impl VideoSource {
    pub fn open(path: &std::path::Path) -> crate::Result<Self> {
        let input = AvInput::open(path)?;
        let decoder = Decoder::new(&input)?;
        let stream = input.video_stream();
        let params = StreamParams {
            index: stream.index(),
            codec: stream.codec_name(),
            width: decoder.width(),
            height: decoder.height(),
            pixel_format: format!("{:?}", decoder.format()).to_lowercase(),
            time_base: stream.time_base().into(),
            frame_rate: stream.frame_rate(),
        };
        Ok(Self {
            input,
            decoder,
            params,
            eof_sent: false,
            finished: false,
        })
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }
}

impl FrameSource for VideoSource {
    type Frame = ffmpeg_next::frame::Video;

    fn params(&self) -> &StreamParams {
        &self.params
    }

    fn next_frame(&mut self) -> crate::Result<Option<Self::Frame>> {
        if self.finished {
            return Ok(None);
        }
        loop {
            if let Some(frame) = self.decoder.receive_frame()? {
                return Ok(Some(frame));
            }
            if self.eof_sent {
                log::debug!("decoder drained: {}", self.input.path().display());
                self.finished = true;
                return Ok(None);
            }
            match self.input.read_packet()? {
                Some(packet) => self.decoder.send_packet(packet)?,
                None => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
            }
        }
    }
}
