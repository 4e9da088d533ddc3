use std::{cell::RefCell, io, rc::Rc, sync::Arc, time::Duration, time::Instant};

use crate::{
    chain::ChainedStream,
    config::DEFAULT_REFRESH_INTERVAL,
    container::{ContainerFormat, PacketStream, StreamPosition},
    error::{SegueError, SegueResult},
    refresh::{validate_refresh, Clock, RefreshError, SystemClock},
    segment::{known_extent, Segment},
    SegmentBody, SegmentFetcher, SegmentListLoader,
};

/// Segment list and read position shared by the tracker and its feed.
struct SegmentCursor {
    identifier: String,
    segments: Vec<Segment>,
    /// Next segment to fetch
    index: usize,

    loader: Arc<dyn SegmentListLoader>,
    clock: Arc<dyn Clock>,
    refresh_interval: Duration,
    last_refresh: Instant,
}

impl SegmentCursor {
    fn next_segment(&mut self) -> Option<Segment> {
        if self.index >= self.segments.len() {
            return None;
        }

        let current = self.index;
        self.index += 1;
        self.check_refresh();

        self.segments.get(current).cloned()
    }

    fn check_refresh(&mut self) {
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(self.last_refresh);
        if elapsed <= self.refresh_interval {
            return;
        }

        log::debug!(
            "For {}, {}ms has passed since last segment update, updating",
            self.identifier,
            elapsed.as_millis()
        );
        match self.refresh() {
            Ok(()) => self.last_refresh = now,
            Err(e) => log::error!("For {}, {e}, skipping.", self.identifier),
        }
    }

    fn refresh(&mut self) -> Result<(), RefreshError> {
        let candidate = self.loader.load_segments(&self.identifier)?;
        validate_refresh(&self.segments, &candidate)?;

        for (segment, refreshed) in self.segments.iter_mut().zip(candidate) {
            *segment = refreshed;
        }
        Ok(())
    }
}

/// Yields the body of each segment in turn, starting from the tracker's
/// current segment index.
///
/// A feed cannot be rewound. Seeking drops it together with the chain that
/// owns it and builds a new one.
pub struct SegmentFeed {
    cursor: Rc<RefCell<SegmentCursor>>,
    fetcher: Arc<dyn SegmentFetcher>,
}

impl Iterator for SegmentFeed {
    type Item = io::Result<SegmentBody>;

    fn next(&mut self) -> Option<Self::Item> {
        let segment = self.cursor.borrow_mut().next_segment()?;
        log::trace!("Fetching segment {}", segment.url);

        Some(self.fetcher.fetch(&segment).map_err(SegueError::into_io))
    }
}

/// Keeps track of which segment of a track is being read, and maps timecodes
/// to segments when seeking.
///
/// The tracker and the stream it hands out share the segment list without
/// synchronisation, so both must stay on one thread. This is enforced by the
/// tracker not being `Send`.
pub struct SegmentTracker<C: ContainerFormat> {
    identifier: String,
    container: C,
    fetcher: Arc<dyn SegmentFetcher>,
    cursor: Rc<RefCell<SegmentCursor>>,

    stream: Option<C::Stream>,
    position: StreamPosition,
}

impl<C: ContainerFormat> SegmentTracker<C> {
    pub fn new(
        identifier: impl Into<String>,
        segments: Vec<Segment>,
        container: C,
        loader: Arc<dyn SegmentListLoader>,
        fetcher: Arc<dyn SegmentFetcher>,
    ) -> Self {
        let identifier = identifier.into();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cursor = SegmentCursor {
            identifier: identifier.clone(),
            segments,
            index: 0,
            loader,
            last_refresh: clock.now(),
            clock,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        };

        Self {
            identifier,
            container,
            fetcher,
            cursor: Rc::new(RefCell::new(cursor)),
            stream: None,
            position: StreamPosition::default(),
        }
    }

    pub fn with_refresh_interval(self, refresh_interval: Duration) -> Self {
        self.cursor.borrow_mut().refresh_interval = refresh_interval;
        self
    }

    /// Replaces the clock used to schedule refreshes. The refresh timer
    /// restarts from the new clock's current time.
    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        {
            let mut cursor = self.cursor.borrow_mut();
            cursor.last_refresh = clock.now();
            cursor.clock = clock;
        }
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Start and desired timecodes as of the last seek.
    pub fn position(&self) -> StreamPosition {
        self.position
    }

    /// Index of the next segment to fetch.
    pub fn segment_index(&self) -> usize {
        self.cursor.borrow().index
    }

    pub fn segments(&self) -> Vec<Segment> {
        self.cursor.borrow().segments.clone()
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Returns the open stream, creating it at the current segment index if
    /// there is none.
    pub fn current_stream(&mut self) -> &mut C::Stream {
        let container = &self.container;
        let cursor = &self.cursor;
        let fetcher = &self.fetcher;

        self.stream.get_or_insert_with(|| {
            container.open_stream(ChainedStream::new(SegmentFeed {
                cursor: cursor.clone(),
                fetcher: fetcher.clone(),
            }))
        })
    }

    /// Repositions the stream at the segment containing `timecode`.
    ///
    /// Timecodes at or beyond the known extent of the track leave the tracker
    /// at the end of the segment list, so the next read ends the stream.
    pub fn seek(&mut self, timecode: u64) -> SegueResult<()> {
        let located = locate(&self.cursor.borrow().segments, timecode);

        match located {
            Some((index, segment_start)) => self.seek_to_segment(index, timecode, segment_start),
            None => {
                self.seek_to_end();
                Ok(())
            }
        }
    }

    fn seek_to_segment(
        &mut self,
        index: usize,
        timecode: u64,
        segment_start: u64,
    ) -> SegueResult<()> {
        self.close();

        self.cursor.borrow_mut().index = index;
        self.position = StreamPosition {
            start: segment_start,
            desired: timecode,
        };
        log::debug!(
            "For {}, seeking to {timecode}ms in segment {index} starting at {segment_start}ms",
            self.identifier
        );

        // only the first segment carries the header
        if segment_start == 0 {
            let blueprint = self.current_stream().detect_header()?;
            if blueprint.is_none() {
                log::warn!(
                    "For {}, no container header found after seeking to the start",
                    self.identifier
                );
            }
        } else {
            self.current_stream().start_new_track()?;
        }

        Ok(())
    }

    fn seek_to_end(&mut self) {
        self.close();

        let mut cursor = self.cursor.borrow_mut();
        let end = cursor.segments.len();
        cursor.index = end;
        log::debug!(
            "For {}, seek is beyond the known {}ms of the track, ending stream",
            self.identifier,
            known_extent(&cursor.segments)
        );
    }

    /// Releases the open stream, if any. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            log::trace!("For {}, segment stream closed", self.identifier);
        }
    }
}

impl<C: ContainerFormat> Drop for SegmentTracker<C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Finds the segment containing `timecode`, returning its index and start.
fn locate(segments: &[Segment], timecode: u64) -> Option<(usize, u64)> {
    let mut segment_start: u64 = 0;

    for (index, segment) in segments.iter().enumerate() {
        // unknown durations only appear at the live edge
        let duration = segment.duration?;
        // no timecode lies beyond u64::MAX, so saturating keeps the scan exact
        let next_start = segment_start.saturating_add(duration);

        if timecode >= segment_start && timecode < next_start {
            return Some((index, segment_start));
        }
        segment_start = next_start;
    }

    None
}
