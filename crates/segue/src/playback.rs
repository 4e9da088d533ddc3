use std::sync::Arc;

use crate::{
    config::PlaybackConfig,
    container::{ContainerFormat, FrameSink, PacketStream},
    error::{SegueError, SegueResult},
    refresh::{Clock, SystemClock},
    tracker::SegmentTracker,
    SegmentFetcher, SegmentListLoader,
};

/// One playback attempt as seen by a [`PlaybackController`].
pub trait DecodeSession {
    /// Runs a fresh decode session from the current tracker position until
    /// the stream is exhausted or `sink` breaks.
    fn decode(&mut self, sink: &mut dyn FrameSink) -> SegueResult<()>;

    /// Moves playback to `timecode`. Only called between decode sessions.
    fn seek(&mut self, timecode: u64) -> SegueResult<()>;
}

/// Drives decode sessions and decides when seeks are applied.
pub trait PlaybackController {
    fn execute_processing_loop(&mut self, session: &mut dyn DecodeSession) -> SegueResult<()>;
}

/// Plays a track published as a list of segments.
///
/// Each call to [`SegmentedPlayback::process`] is one playback attempt: the
/// segment list is loaded, the container header is probed, and decode
/// sessions run until the controller returns. Loading and fetching block, so
/// `process` belongs on a dedicated thread.
pub struct SegmentedPlayback<C> {
    identifier: String,
    loader: Arc<dyn SegmentListLoader>,
    fetcher: Arc<dyn SegmentFetcher>,
    container: C,

    config: PlaybackConfig,
    clock: Arc<dyn Clock>,
}

impl<C> SegmentedPlayback<C>
where
    C: ContainerFormat + Clone,
{
    pub fn new(
        identifier: impl Into<String>,
        loader: Arc<dyn SegmentListLoader>,
        fetcher: Arc<dyn SegmentFetcher>,
        container: C,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            loader,
            fetcher,
            container,
            config: Default::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn process(&self, controller: &mut dyn PlaybackController) -> SegueResult<()> {
        let mut tracker = self.create_tracker()?;

        let result = self.play(&mut tracker, controller);
        tracker.close();

        if let Err(e) = &result {
            log::debug!("For {}, playback ended with error: {e}", self.identifier);
        }
        result
    }

    fn create_tracker(&self) -> SegueResult<SegmentTracker<C>> {
        let segments = self.loader.load_segments(&self.identifier)?;
        log::debug!(
            "For {}, loaded {} segments",
            self.identifier,
            segments.len()
        );

        Ok(SegmentTracker::new(
            self.identifier.clone(),
            segments,
            self.container.clone(),
            self.loader.clone(),
            self.fetcher.clone(),
        )
        .with_refresh_interval(self.config.refresh_interval)
        .with_clock(self.clock.clone()))
    }

    fn play(
        &self,
        tracker: &mut SegmentTracker<C>,
        controller: &mut dyn PlaybackController,
    ) -> SegueResult<()> {
        let blueprint = tracker
            .current_stream()
            .detect_header()?
            .ok_or_else(|| SegueError::NoContainerHeader(self.identifier.clone()))?;

        let mut session = TrackerSession { tracker, blueprint };
        controller.execute_processing_loop(&mut session)
    }
}

struct TrackerSession<'t, C: ContainerFormat> {
    tracker: &'t mut SegmentTracker<C>,
    blueprint: <C::Stream as PacketStream>::Blueprint,
}

impl<C: ContainerFormat> DecodeSession for TrackerSession<'_, C> {
    fn decode(&mut self, sink: &mut dyn FrameSink) -> SegueResult<()> {
        let position = self.tracker.position();
        let mut handler = self
            .tracker
            .current_stream()
            .load_handler(&self.blueprint, position)?;

        handler.provide_frames(sink)
    }

    fn seek(&mut self, timecode: u64) -> SegueResult<()> {
        self.tracker.seek(timecode)
    }
}
