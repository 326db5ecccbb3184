use ffmpeg_next::{Dictionary, Rational, codec::Flags, format::Pixel};

use crate::{
    backend::{RateControl, RateEncoder},
    config::TranscodeConfig,
    decoder::VideoSource,
    error::TranscodeError,
    packet::RawPacket,
    scaler::pixel_format,
    time_base::TimeBase,
};

/// Source dimension used when no override is configured. Chroma-subsampled
/// axes must be even, so an odd source loses its last row or column.
fn fit_dimension(name: &str, value: u32, subsampled: bool) -> u32 {
    if subsampled && value % 2 == 1 {
        log::warn!("source {} {} is odd, encoding {}", name, value, value - 1);
        value - 1
    } else {
        value
    }
}

/// H.264 encoder configured for one pass of two-pass average bitrate
/// control. Statistics are exchanged through the encoder's stats file.
pub struct Encoder {
    inner: ffmpeg_next::codec::encoder::Video,
    codec: ffmpeg_next::Codec,
    encoder_time_base: Rational,
    width: u32,
    height: u32,
    format: Pixel,
    frame_rate: Rational,
}

impl Encoder {
    pub fn open(
        source: &VideoSource,
        config: &TranscodeConfig,
        rate_control: RateControl<'_>,
        global_header: bool,
    ) -> crate::Result<Self> {
        let codec = ffmpeg_next::encoder::find_by_name(&config.codec)
            .ok_or_else(|| TranscodeError::UnsupportedEncoder(config.codec.clone()))?;

        let mut context = ffmpeg_next::codec::Context::new_with_codec(codec);
        if config.threads > 0 {
            let mut threading = ffmpeg_next::codec::threading::Config::kind(
                ffmpeg_next::codec::threading::Type::Frame,
            );
            threading.count = config.threads;
            context.set_threading(threading);
        }
        let mut encoder = context.encoder().video().map_err(|e| {
            TranscodeError::UnsupportedEncoder(format!("{} is not a video encoder: {}", config.codec, e))
        })?;

        let decoder = source.decoder();
        let (sub_x, sub_y) = config.pixel_format.subsampled();
        let width = config
            .width
            .unwrap_or_else(|| fit_dimension("width", decoder.width(), sub_x));
        let height = config
            .height
            .unwrap_or_else(|| fit_dimension("height", decoder.height(), sub_y));
        if width == 0 || height == 0 {
            return Err(TranscodeError::Config(format!(
                "cannot encode a {}x{} picture",
                width, height
            )));
        }
        let format = pixel_format(config.pixel_format);
        let time_base = Rational::from(config.time_base);
        let frame_rate = Rational::from(config.frame_rate);

        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(format);
        encoder.set_aspect_ratio(decoder.aspect_ratio());
        encoder.set_time_base(time_base);
        encoder.set_frame_rate(Some(frame_rate));
        encoder.set_bit_rate(config.bit_rate as usize);
        encoder.set_gop(config.gop_size);
        encoder.set_max_b_frames(config.max_b_frames as usize);

        let (pass_flag, stats_path) = match rate_control {
            RateControl::Collect(path) => (Flags::PASS1, path),
            RateControl::Consume(path) => (Flags::PASS2, path),
        };
        let mut flags = pass_flag;
        if global_header {
            flags |= Flags::GLOBAL_HEADER;
        }
        encoder.set_flags(flags);

        let stats_path = stats_path.to_str().ok_or_else(|| {
            TranscodeError::Config(format!(
                "stats path is not valid UTF-8: {}",
                stats_path.display()
            ))
        })?;
        let mut opts = Dictionary::new();
        opts.set("preset", &config.preset);
        if let Some(tune) = &config.tune {
            opts.set("tune", tune);
        }
        if let Some(profile) = &config.profile {
            opts.set("profile", profile);
        }
        opts.set("stats", stats_path);

        let encoder = encoder.open_with(opts).map_err(|e| {
            TranscodeError::Encode(format!("could not open {}: {}", config.codec, e))
        })?;

        let encoder_time_base: Rational = unsafe { (*encoder.0.as_ptr()).time_base.into() };
        log::info!(
            "encoder {} opened: {}x{} {:?}, {} b/s, gop {}, b-frames {}, time base {}, {:?}",
            config.codec,
            width,
            height,
            format,
            config.bit_rate,
            config.gop_size,
            config.max_b_frames,
            TimeBase::from(encoder_time_base),
            pass_flag
        );

        Ok(Self {
            inner: encoder,
            codec,
            encoder_time_base,
            width,
            height,
            format,
            frame_rate,
        })
    }

    pub fn codec(&self) -> ffmpeg_next::Codec {
        self.codec
    }

    pub fn inner(&self) -> &ffmpeg_next::codec::encoder::Video {
        &self.inner
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> Pixel {
        self.format
    }

    pub fn frame_rate(&self) -> Rational {
        self.frame_rate
    }

    fn receive_packets(&mut self) -> crate::Result<Vec<RawPacket>> {
        let mut packets = Vec::new();
        loop {
            let mut packet = ffmpeg_next::codec::packet::Packet::empty();
            match self.inner.receive_packet(&mut packet) {
                Ok(()) => packets.push(RawPacket::from((packet, self.encoder_time_base))),
                Err(ffmpeg_next::Error::Other { errno })
                    if errno == ffmpeg_next::util::error::EAGAIN =>
                {
                    break;
                }
                Err(ffmpeg_next::Error::Eof) => break,
                Err(err) => {
                    return Err(TranscodeError::Encode(format!("receive packet: {}", err)));
                }
            }
        }
        Ok(packets)
    }
}

impl RateEncoder for Encoder {
    type Frame = ffmpeg_next::frame::Video;
    type Packet = RawPacket;

    fn time_base(&self) -> TimeBase {
        self.encoder_time_base.into()
    }

    fn submit(
        &mut self,
        frame: &mut ffmpeg_next::frame::Video,
        pts: i64,
    ) -> crate::Result<Vec<RawPacket>> {
        frame.set_pts(Some(pts));
        self.inner
            .send_frame(frame)
            .map_err(|e| TranscodeError::Encode(format!("send frame {}: {}", pts, e)))?;
        self.receive_packets()
    }

    fn flush(&mut self) -> crate::Result<Vec<RawPacket>> {
        self.inner
            .send_eof()
            .map_err(|e| TranscodeError::Encode(format!("send eof: {}", e)))?;
        self.receive_packets()
    }
}
