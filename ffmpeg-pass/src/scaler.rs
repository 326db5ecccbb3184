use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling::{context::Context, flag::Flags};

use crate::{
    backend::FrameConverter,
    config::{OutputPixelFormat, ScalerKind},
    error::TranscodeError,
};

pub fn scaling_flags(kind: ScalerKind) -> Flags {
    match kind {
        ScalerKind::FastBilinear => Flags::FAST_BILINEAR,
        ScalerKind::Bilinear => Flags::BILINEAR,
        ScalerKind::Bicubic => Flags::BICUBIC,
        ScalerKind::Area => Flags::AREA,
        ScalerKind::Point => Flags::POINT,
        ScalerKind::Lanczos => Flags::LANCZOS,
    }
}

pub fn pixel_format(format: OutputPixelFormat) -> Pixel {
    match format {
        OutputPixelFormat::Yuv420p => Pixel::YUV420P,
        OutputPixelFormat::Yuv422p => Pixel::YUV422P,
        OutputPixelFormat::Yuv444p => Pixel::YUV444P,
    }
}

/// Converts decoded frames into the encoder's pixel format and size.
///
/// The conversion context and the destination frame are built once per
/// pass; every call overwrites the same destination buffer. If a decoded
/// frame arrives with a different format or size than the context was built
/// for, the context is rebuilt for the new source and the destination stays
/// as it is.
pub struct Scaler {
    context: Context,
    src: (Pixel, u32, u32),
    dst: (Pixel, u32, u32),
    flags: Flags,
    buffer: ffmpeg_next::frame::Video,
}

fn build_context(
    (src_format, src_width, src_height): (Pixel, u32, u32),
    (dst_format, dst_width, dst_height): (Pixel, u32, u32),
    flags: Flags,
) -> crate::Result<Context> {
    let context = Context::get(
        src_format, src_width, src_height, dst_format, dst_width, dst_height, flags,
    )
    .map_err(|e| {
        TranscodeError::Convert(format!(
            "{:?} {}x{} -> {:?} {}x{}: {}",
            src_format, src_width, src_height, dst_format, dst_width, dst_height, e
        ))
    })?;
    log::debug!(
        "scaler {:?} {}x{} -> {:?} {}x{}",
        src_format,
        src_width,
        src_height,
        dst_format,
        dst_width,
        dst_height
    );
    Ok(context)
}

impl Scaler {
    pub fn new(
        src: (Pixel, u32, u32),
        dst: (Pixel, u32, u32),
        flags: Flags,
    ) -> crate::Result<Self> {
        let context = build_context(src, dst, flags)?;

        let (dst_format, dst_width, dst_height) = dst;
        let buffer = ffmpeg_next::frame::Video::new(dst_format, dst_width, dst_height);
        if buffer.is_empty() {
            return Err(TranscodeError::Resource(format!(
                "{:?} {}x{} frame buffer",
                dst_format, dst_width, dst_height
            )));
        }

        Ok(Self {
            context,
            src,
            dst,
            flags,
            buffer,
        })
    }
}

impl FrameConverter for Scaler {
    type Frame = ffmpeg_next::frame::Video;

    fn convert(
        &mut self,
        frame: &ffmpeg_next::frame::Video,
    ) -> crate::Result<&mut ffmpeg_next::frame::Video> {
        let geometry = (frame.format(), frame.width(), frame.height());
        if geometry != self.src {
            log::info!(
                "input changed from {:?} {}x{} to {:?} {}x{}, rebuilding scaler",
                self.src.0,
                self.src.1,
                self.src.2,
                geometry.0,
                geometry.1,
                geometry.2
            );
            self.context = build_context(geometry, self.dst, self.flags)?;
            self.src = geometry;
        }

        // The encoder may still hold a reference to the previous picture.
        let ret = unsafe { ffmpeg_next::ffi::av_frame_make_writable(self.buffer.as_mut_ptr()) };
        if ret < 0 {
            return Err(TranscodeError::Resource(format!(
                "writable frame buffer: {}",
                ffmpeg_next::Error::from(ret)
            )));
        }
        self.context.run(frame, &mut self.buffer).map_err(|e| {
            TranscodeError::Convert(format!(
                "{:?} {}x{} frame: {}",
                frame.format(),
                frame.width(),
                frame.height(),
                e
            ))
        })?;
        Ok(&mut self.buffer)
    }
}
