use std::path::PathBuf;

use ffmpeg_next::Rational;

use crate::{
    backend::{Muxer, RateEncoder, SinkTarget},
    encoder::Encoder,
    error::TranscodeError,
    packet::RawPacket,
    time_base::TimeBase,
};

#[cfg(windows)]
const NULL_DEVICE: &str = "NUL";
#[cfg(not(windows))]
const NULL_DEVICE: &str = "/dev/null";

/// Output container holding a single video stream.
pub struct AvOutput {
    target: SinkTarget,
    inner: ffmpeg_next::format::context::Output,
    stream_index: usize,
    stream_time_base: Rational,
    have_written_header: bool,
    have_written_trailer: bool,
}

impl AvOutput {
    /// Opens `target` with the named muxer. A discard target runs the same
    /// muxer against the null device.
    pub fn open(target: &SinkTarget, container: &str) -> crate::Result<Self> {
        let path = match target {
            SinkTarget::Discard => PathBuf::from(NULL_DEVICE),
            SinkTarget::File(path) => path.clone(),
        };
        let output = ffmpeg_next::format::output_as(&path, container)
            .map_err(|e| TranscodeError::write(target, format!("open {} muxer: {}", container, e)))?;
        Ok(Self {
            target: target.clone(),
            inner: output,
            stream_index: 0,
            stream_time_base: Rational::new(0, 1),
            have_written_header: false,
            have_written_trailer: false,
        })
    }

    pub fn wants_global_header(&self) -> bool {
        self.inner
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER)
    }

    /// Adds the video stream described by `encoder` and writes the header.
    pub fn start(&mut self, encoder: &Encoder) -> crate::Result<()> {
        if self.have_written_header {
            return Err(TranscodeError::write(&self.target, "header already written"));
        }
        let stream_index = {
            let mut stream = self
                .inner
                .add_stream(encoder.codec())
                .map_err(|e| TranscodeError::write(&self.target, format!("add stream: {}", e)))?;
            stream.set_parameters(encoder.inner());
            stream.set_time_base(Rational::from(encoder.time_base()));
            stream.set_avg_frame_rate(encoder.frame_rate());
            stream.index()
        };
        self.inner
            .write_header()
            .map_err(|e| TranscodeError::write(&self.target, format!("write header: {}", e)))?;
        self.have_written_header = true;

        // The muxer may pick its own stream time base while writing the header.
        self.stream_index = stream_index;
        self.stream_time_base = self
            .inner
            .stream(stream_index)
            .map(|s| s.time_base())
            .ok_or_else(|| TranscodeError::write(&self.target, "output stream vanished"))?;
        log::debug!(
            "{} header written, stream #{} time base {}",
            self.target,
            stream_index,
            TimeBase::from(self.stream_time_base)
        );
        Ok(())
    }
}

impl Muxer for AvOutput {
    type Packet = RawPacket;

    fn stream_time_base(&self) -> TimeBase {
        self.stream_time_base.into()
    }

    fn write_packet(&mut self, mut packet: RawPacket) -> crate::Result<()> {
        if !self.have_written_header {
            return Err(TranscodeError::write(&self.target, "header not written"));
        }
        let p = packet.get_mut();
        p.set_stream(self.stream_index);
        p.set_position(-1);
        p.write_interleaved(&mut self.inner)
            .map_err(|e| TranscodeError::write(&self.target, e))
    }

    fn finalize(&mut self) -> crate::Result<()> {
        if !self.have_written_header {
            return Err(TranscodeError::write(&self.target, "header not written"));
        }
        if !self.have_written_trailer {
            self.have_written_trailer = true;
            self.inner
                .write_trailer()
                .map_err(|e| TranscodeError::write(&self.target, format!("write trailer: {}", e)))?;
        }
        Ok(())
    }
}
