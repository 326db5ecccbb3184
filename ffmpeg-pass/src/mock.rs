//! In-memory backend used by the pipeline tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::backend::{
    Backend, FrameConverter, FrameSource, Muxer, RateControl, RateEncoder, SinkTarget,
    StreamParams, Timestamped,
};
use crate::config::TranscodeConfig;
use crate::error::{Result, TranscodeError};
use crate::time_base::TimeBase;

/// Counts a live resource until dropped.
pub struct LiveToken(Arc<AtomicIsize>);

impl LiveToken {
    pub fn new(counter: &Arc<AtomicIsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for LiveToken {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockFrame {
    pub seq: u64,
    pub width: u32,
    pub height: u32,
    pub pts: Option<i64>,
    _live: LiveToken,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockPacket {
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub data: Vec<u8>,
}

impl Timestamped for MockPacket {
    fn pts(&self) -> Option<i64> {
        self.pts
    }

    fn dts(&self) -> Option<i64> {
        self.dts
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn rescale_ts(&mut self, from: TimeBase, to: TimeBase) {
        self.pts = self.pts.map(|ts| TimeBase::rescale(ts, from, to));
        self.dts = self.dts.map(|ts| TimeBase::rescale(ts, from, to));
    }
}

pub struct MockSource {
    params: StreamParams,
    total: u64,
    next: u64,
    fail_at: Option<u64>,
    live: Arc<AtomicIsize>,
    _token: LiveToken,
}

impl FrameSource for MockSource {
    type Frame = MockFrame;

    fn params(&self) -> &StreamParams {
        &self.params
    }

    fn next_frame(&mut self) -> Result<Option<MockFrame>> {
        if self.fail_at == Some(self.next) {
            return Err(TranscodeError::Decode(format!("corrupt frame {}", self.next)));
        }
        if self.next >= self.total {
            return Ok(None);
        }
        let frame = MockFrame {
            seq: self.next,
            width: self.params.width,
            height: self.params.height,
            // Source timing is irregular on purpose; the pipeline must ignore it.
            pts: Some((self.next * 3 + self.next % 2) as i64),
            _live: LiveToken::new(&self.live),
        };
        self.next += 1;
        Ok(Some(frame))
    }
}

pub struct MockConverter {
    buffer: MockFrame,
    _token: LiveToken,
}

impl FrameConverter for MockConverter {
    type Frame = MockFrame;

    fn convert(&mut self, frame: &MockFrame) -> Result<&mut MockFrame> {
        self.buffer.seq = frame.seq;
        self.buffer.pts = frame.pts;
        Ok(&mut self.buffer)
    }
}

/// Emits packets in groups of three with the last frame of each group
/// first, the way a B-frame encoder reorders them.
pub struct MockEncoder {
    time_base: TimeBase,
    pending: Vec<i64>,
    emitted: i64,
    stats: Option<(PathBuf, Vec<String>)>,
    fail_at: Option<u64>,
    submitted: u64,
    _token: LiveToken,
}

impl MockEncoder {
    fn emit(&mut self, pts: i64) -> MockPacket {
        let dts = self.emitted - 1;
        self.emitted += 1;
        if let Some((_, lines)) = self.stats.as_mut() {
            lines.push(format!("in:{} out:{} type:P", pts, dts + 1));
        }
        MockPacket {
            pts: Some(pts),
            dts: Some(dts),
            data: vec![0xab; 100 + (pts % 7) as usize],
        }
    }
}

impl RateEncoder for MockEncoder {
    type Frame = MockFrame;
    type Packet = MockPacket;

    fn time_base(&self) -> TimeBase {
        self.time_base
    }

    fn submit(&mut self, frame: &mut MockFrame, pts: i64) -> Result<Vec<MockPacket>> {
        if self.fail_at == Some(self.submitted) {
            return Err(TranscodeError::Encode(format!(
                "encoder rejected frame {}",
                self.submitted
            )));
        }
        self.submitted += 1;
        frame.pts = Some(pts);
        self.pending.push(pts);
        if self.pending.len() < 3 {
            return Ok(Vec::new());
        }
        let group: Vec<i64> = self.pending.drain(..).collect();
        Ok(vec![self.emit(group[2]), self.emit(group[0]), self.emit(group[1])])
    }

    fn flush(&mut self) -> Result<Vec<MockPacket>> {
        let rest: Vec<i64> = self.pending.drain(..).collect();
        let packets = rest.into_iter().map(|pts| self.emit(pts)).collect();
        if let Some((path, lines)) = self.stats.take() {
            std::fs::write(&path, lines.join("\n"))?;
        }
        Ok(packets)
    }
}

#[derive(Debug, Default)]
pub struct MuxLog {
    pub target: Option<SinkTarget>,
    pub header_written: bool,
    pub packets: Vec<MockPacket>,
    pub finalized: bool,
    pub max_concurrent_writes: usize,
}

pub struct MockMuxer {
    stream_time_base: TimeBase,
    log: Arc<Mutex<MuxLog>>,
    in_flight: Arc<AtomicUsize>,
    write_delay: bool,
    fail_at: Option<usize>,
    file: Option<PathBuf>,
    _token: Option<LiveToken>,
}

impl MockMuxer {
    pub fn new(stream_time_base: TimeBase) -> Self {
        Self {
            stream_time_base,
            log: Arc::new(Mutex::new(MuxLog::default())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            write_delay: false,
            fail_at: None,
            file: None,
            _token: None,
        }
    }

    pub fn with_write_delay(mut self) -> Self {
        self.write_delay = true;
        self
    }

    pub fn log(&self) -> Arc<Mutex<MuxLog>> {
        self.log.clone()
    }
}

impl Muxer for MockMuxer {
    type Packet = MockPacket;

    fn stream_time_base(&self) -> TimeBase {
        self.stream_time_base
    }

    fn write_packet(&mut self, packet: MockPacket) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        if self.write_delay {
            std::thread::sleep(Duration::from_micros(50));
        }
        let mut log = self
            .log
            .lock()
            .map_err(|_| TranscodeError::write("mock", "log poisoned"))?;
        log.max_concurrent_writes = log.max_concurrent_writes.max(now);
        let failed = self.fail_at == Some(log.packets.len());
        if !failed {
            log.packets.push(packet);
        }
        drop(log);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if failed {
            return Err(TranscodeError::write("mock", "device full"));
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(path) = &self.file {
            std::fs::write(path, b"ftyp....moov")?;
        }
        let mut log = self
            .log
            .lock()
            .map_err(|_| TranscodeError::write("mock", "log poisoned"))?;
        log.finalized = true;
        Ok(())
    }
}

/// Knobs and probes for one mock run.
#[derive(Default)]
pub struct MockBackend {
    pub frames: u64,
    pub width: u32,
    pub height: u32,
    pub no_video: bool,
    pub no_encoder: bool,
    pub fail_decode_at: Option<u64>,
    pub fail_encode_at: Option<u64>,
    pub fail_write_at: Option<usize>,
    pub live: Arc<AtomicIsize>,
    pub converters_opened: Arc<AtomicUsize>,
    pub muxers: Arc<Mutex<Vec<Arc<Mutex<MuxLog>>>>>,
}

impl MockBackend {
    pub fn new(frames: u64) -> Self {
        Self {
            frames,
            width: 640,
            height: 480,
            ..Default::default()
        }
    }

    pub fn live_resources(&self) -> isize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn mux_log(&self, index: usize) -> Arc<Mutex<MuxLog>> {
        self.muxers.lock().unwrap()[index].clone()
    }
}

impl Backend for MockBackend {
    type Frame = MockFrame;
    type Packet = MockPacket;
    type Source = MockSource;
    type Converter = MockConverter;
    type Encoder = MockEncoder;
    type Muxer = MockMuxer;

    fn open_source(&self, input: &Path) -> Result<MockSource> {
        if self.no_video {
            return Err(TranscodeError::open(input, "no video stream"));
        }
        Ok(MockSource {
            params: StreamParams {
                index: 0,
                codec: "rawvideo".to_string(),
                width: self.width,
                height: self.height,
                pixel_format: "rgb24".to_string(),
                time_base: TimeBase::new(1, 30),
                frame_rate: Some(TimeBase::new(30, 1)),
            },
            total: self.frames,
            next: 0,
            fail_at: self.fail_decode_at,
            live: self.live.clone(),
            _token: LiveToken::new(&self.live),
        })
    }

    fn open_muxer(&self, target: &SinkTarget, _config: &TranscodeConfig) -> Result<MockMuxer> {
        let mut muxer = MockMuxer::new(TimeBase::new(1, 15360));
        muxer.fail_at = self.fail_write_at;
        muxer._token = Some(LiveToken::new(&self.live));
        if let SinkTarget::File(path) = target {
            std::fs::write(path, b"")?;
            muxer.file = Some(path.clone());
        }
        muxer.log.lock().unwrap().target = Some(target.clone());
        self.muxers.lock().unwrap().push(muxer.log());
        Ok(muxer)
    }

    fn open_encoder(
        &self,
        _source: &MockSource,
        _muxer: &MockMuxer,
        config: &TranscodeConfig,
        rate_control: RateControl<'_>,
    ) -> Result<MockEncoder> {
        if self.no_encoder {
            return Err(TranscodeError::UnsupportedEncoder(config.codec.clone()));
        }
        let stats = match rate_control {
            RateControl::Collect(path) => Some((path.to_path_buf(), Vec::new())),
            RateControl::Consume(path) => {
                let text = std::fs::read_to_string(path).unwrap_or_default();
                if text.is_empty() {
                    return Err(TranscodeError::MissingStats(path.display().to_string()));
                }
                None
            }
        };
        Ok(MockEncoder {
            time_base: config.time_base,
            pending: Vec::new(),
            emitted: 0,
            stats,
            fail_at: self.fail_encode_at,
            submitted: 0,
            _token: LiveToken::new(&self.live),
        })
    }

    fn start_muxer(&self, muxer: &mut MockMuxer, _encoder: &MockEncoder) -> Result<()> {
        muxer.log.lock().unwrap().header_written = true;
        Ok(())
    }

    fn open_converter(
        &self,
        source: &MockSource,
        _encoder: &MockEncoder,
        config: &TranscodeConfig,
    ) -> Result<MockConverter> {
        self.converters_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockConverter {
            buffer: MockFrame {
                seq: 0,
                width: config.width.unwrap_or(source.params.width),
                height: config.height.unwrap_or(source.params.height),
                pts: None,
                _live: LiveToken::new(&self.live),
            },
            _token: LiveToken::new(&self.live),
        })
    }
}
