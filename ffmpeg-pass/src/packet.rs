use ffmpeg_next::Rational;

use crate::backend::Timestamped;
use crate::time_base::TimeBase;

/// A compressed packet together with the time base its timestamps are in.
pub struct RawPacket {
    packet: ffmpeg_next::codec::packet::Packet,
    time_base: Rational,
}

impl RawPacket {
    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn get_mut(&mut self) -> &mut ffmpeg_next::codec::packet::Packet {
        &mut self.packet
    }
}

impl Timestamped for RawPacket {
    fn pts(&self) -> Option<i64> {
        self.packet.pts()
    }

    fn dts(&self) -> Option<i64> {
        self.packet.dts()
    }

    fn size(&self) -> usize {
        self.packet.size()
    }

    /// Rescales pts, dts and duration with libav's exact rational rescale.
    fn rescale_ts(&mut self, from: TimeBase, to: TimeBase) {
        self.packet.rescale_ts(Rational::from(from), Rational::from(to));
        self.time_base = to.into();
    }
}

impl From<(ffmpeg_next::codec::packet::Packet, Rational)> for RawPacket {
    fn from((packet, time_base): (ffmpeg_next::codec::packet::Packet, Rational)) -> Self {
        Self { packet, time_base }
    }
}
