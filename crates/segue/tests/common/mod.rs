use std::{
    collections::{HashMap, VecDeque},
    io::{BufRead, BufReader, Cursor, Read},
    ops::ControlFlow,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use bytes::Bytes;
use reqwest::{StatusCode, Url};
use segue::{
    AudioFrame, Clock, ContainerFormat, FrameSink, PacketStream, Segment, SegmentBody,
    SegmentChain, SegmentFetcher, SegmentListLoader, SegueError, SegueResult, StreamPosition,
    TrackHandler,
};

pub const HEADER: &str = "SEGUE-HEADER";

/// Frames are laid out one per second.
pub const FRAME_INTERVAL: u64 = 1000;

pub fn segment_url(version: &str, index: usize) -> Url {
    format!("https://cdn.example.com/{version}/{index}.opus")
        .parse()
        .unwrap()
}

/// Segment list whose URLs carry `version`, as a refreshed playlist would.
pub fn segment_list(version: &str, durations: &[Option<u64>]) -> Vec<Segment> {
    durations
        .iter()
        .enumerate()
        .map(|(i, d)| Segment::new(segment_url(version, i), *d))
        .collect()
}

/// Encodes the bodies of a track for [`LineContainer`]. Segments with an
/// unknown duration hold two frames.
pub fn segment_bodies(durations: &[Option<u64>]) -> Vec<Vec<u8>> {
    let mut start = 0;
    durations
        .iter()
        .enumerate()
        .map(|(i, duration)| {
            let mut body = String::new();
            if i == 0 {
                body.push_str(HEADER);
                body.push('\n');
            }

            let length = duration.unwrap_or(2 * FRAME_INTERVAL);
            let mut timecode = start;
            while timecode < start + length {
                body.push_str(&format!("{timecode}:frame-{timecode}\n"));
                timecode += FRAME_INTERVAL;
            }
            start += length;
            body.into_bytes()
        })
        .collect()
}

/// In-memory segment host. Every body handed out is tracked until dropped.
#[derive(Default)]
pub struct MemoryFetcher {
    bodies: Mutex<HashMap<Url, Vec<u8>>>,
    fetched: Mutex<Vec<Url>>,
    open: Arc<AtomicUsize>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hosts a track under the URLs of `version`.
    pub fn with_track(self, version: &str, durations: &[Option<u64>]) -> Self {
        for (i, body) in segment_bodies(durations).into_iter().enumerate() {
            self.insert(segment_url(version, i), body);
        }
        self
    }

    pub fn insert(&self, url: Url, body: Vec<u8>) {
        self.bodies.lock().unwrap().insert(url, body);
    }

    pub fn remove(&self, url: &Url) {
        self.bodies.lock().unwrap().remove(url);
    }

    pub fn fetched(&self) -> Vec<Url> {
        self.fetched.lock().unwrap().clone()
    }

    /// Bodies handed out and not dropped yet
    pub fn open_bodies(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

impl SegmentFetcher for MemoryFetcher {
    fn fetch(&self, segment: &Segment) -> SegueResult<SegmentBody> {
        self.fetched.lock().unwrap().push(segment.url.clone());

        let body = self
            .bodies
            .lock()
            .unwrap()
            .get(&segment.url)
            .cloned()
            .ok_or(SegueError::HttpError(StatusCode::NOT_FOUND))?;

        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TrackedBody {
            data: Cursor::new(body),
            open: self.open.clone(),
        }))
    }
}

struct TrackedBody {
    data: Cursor<Vec<u8>>,
    open: Arc<AtomicUsize>,
}

impl Read for TrackedBody {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.data.read(buf)
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Answers loads from a queue of prepared results, failing once it runs dry.
#[derive(Default)]
pub struct MemoryLoader {
    responses: Mutex<VecDeque<SegueResult<Vec<Segment>>>>,
    calls: AtomicUsize,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: SegueResult<Vec<Segment>>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SegmentListLoader for MemoryLoader {
    fn load_segments(&self, _identifier: &str) -> SegueResult<Vec<Segment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(SegueError::M3u8FetchError))
    }
}

pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        *self.now.lock().unwrap() += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerEvent {
    HeaderProbe { found: bool },
    NewTrack,
    Session(StreamPosition),
}

/// Line based container: a header line, then `<timecode>:<payload>` frames.
#[derive(Clone, Default)]
pub struct LineContainer {
    events: Arc<Mutex<Vec<ContainerEvent>>>,
}

impl LineContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ContainerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl ContainerFormat for LineContainer {
    type Stream = LineStream;

    fn open_stream(&self, chain: SegmentChain) -> Self::Stream {
        LineStream {
            reader: BufReader::new(chain),
            events: self.events.clone(),
        }
    }
}

pub struct LineStream {
    reader: BufReader<SegmentChain>,
    events: Arc<Mutex<Vec<ContainerEvent>>>,
}

impl LineStream {
    fn record(&self, event: ContainerEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl PacketStream for LineStream {
    type Blueprint = String;

    fn detect_header(&mut self) -> SegueResult<Option<String>> {
        let mut line = String::new();
        self.reader.read_line(&mut line)?;

        let found = line.trim_end() == HEADER;
        self.record(ContainerEvent::HeaderProbe { found });
        Ok(found.then(|| HEADER.to_string()))
    }

    fn start_new_track(&mut self) -> SegueResult<()> {
        self.record(ContainerEvent::NewTrack);
        Ok(())
    }

    fn load_handler<'s>(
        &'s mut self,
        _blueprint: &String,
        position: StreamPosition,
    ) -> SegueResult<Box<dyn TrackHandler + 's>> {
        self.record(ContainerEvent::Session(position));
        Ok(Box::new(LineHandler {
            reader: &mut self.reader,
            position,
        }))
    }
}

struct LineHandler<'s> {
    reader: &'s mut BufReader<SegmentChain>,
    position: StreamPosition,
}

impl TrackHandler for LineHandler<'_> {
    fn provide_frames(&mut self, sink: &mut dyn FrameSink) -> SegueResult<()> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(());
            }

            let malformed = || SegueError::Container(format!("malformed frame {line:?}"));
            let (timecode, payload) = line.trim_end().split_once(':').ok_or_else(malformed)?;
            let timecode: u64 = timecode.parse().map_err(|_| malformed())?;
            if timecode < self.position.desired {
                continue;
            }

            let frame = AudioFrame {
                timecode,
                data: Bytes::copy_from_slice(payload.as_bytes()),
            };
            if sink.push(frame).is_break() {
                return Ok(());
            }
        }
    }
}

/// Sink keeping every frame.
#[derive(Default)]
pub struct VecSink {
    pub frames: Vec<AudioFrame>,
}

impl VecSink {
    pub fn timecodes(&self) -> Vec<u64> {
        self.frames.iter().map(|f| f.timecode).collect()
    }
}

impl FrameSink for VecSink {
    fn push(&mut self, frame: AudioFrame) -> ControlFlow<()> {
        self.frames.push(frame);
        ControlFlow::Continue(())
    }
}

pub fn timecodes(range: std::ops::Range<u64>) -> Vec<u64> {
    range.step_by(FRAME_INTERVAL as usize).collect()
}
