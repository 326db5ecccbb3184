use std::path::{Path, PathBuf};

use ffmpeg_next::media;

use crate::{error::TranscodeError, packet::RawPacket, stream::AvStream};

/// An opened input container with its best video stream selected.
pub struct AvInput {
    path: PathBuf,
    inner: ffmpeg_next::format::context::Input,
    video: AvStream,
}

impl AvInput {
    pub fn open(path: &Path) -> crate::Result<Self> {
        let input =
            ffmpeg_next::format::input(path).map_err(|e| TranscodeError::open(path, e))?;

        let video = input
            .streams()
            .best(media::Type::Video)
            .map(AvStream::from)
            .ok_or_else(|| TranscodeError::open(path, "no video stream"))?;

        log::debug!(
            "opened {} ({}), {} streams, video stream #{}",
            path.display(),
            input.format().name(),
            input.nb_streams(),
            video.index()
        );

        Ok(Self {
            path: path.to_path_buf(),
            inner: input,
            video,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn video_stream(&self) -> &AvStream {
        &self.video
    }

    /// Next packet of the selected video stream; packets of other streams
    /// are skipped. `Ok(None)` once the container is exhausted, and any
    /// other read failure is returned as a decode error.
    pub fn read_packet(&mut self) -> crate::Result<Option<RawPacket>> {
        let index = self.video.index();
        loop {
            let mut packet = ffmpeg_next::codec::packet::Packet::empty();
            match packet.read(&mut self.inner) {
                Ok(()) => {
                    if packet.stream() != index {
                        continue;
                    }
                    return Ok(Some((packet, self.video.time_base()).into()));
                }
                Err(ffmpeg_next::Error::Eof) => return Ok(None),
                Err(err) => {
                    return Err(TranscodeError::Decode(format!(
                        "read {}: {}",
                        self.path.display(),
                        err
                    )));
                }
            }
        }
    }
}
