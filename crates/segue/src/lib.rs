pub mod chain;
pub mod config;
pub mod container;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod hls;
pub mod playback;
pub mod refresh;
pub mod segment;
pub mod tracker;
mod util;

use std::io::Read;

pub use chain::ChainedStream;
pub use config::PlaybackConfig;
pub use container::{
    AudioFrame, ContainerFormat, FrameSink, PacketStream, SegmentChain, StreamPosition,
    TrackHandler,
};
pub use controller::{playback_channel, PlaybackHandle, QueuedController};
pub use error::{SegueError, SegueResult};
pub use fetch::HttpSegmentFetcher;
pub use playback::{DecodeSession, PlaybackController, SegmentedPlayback};
pub use refresh::{Clock, SystemClock};
pub use segment::Segment;
pub use tracker::SegmentTracker;
pub use util::http::HttpClient;

/// Body of a single segment.
pub type SegmentBody = Box<dyn Read + Send>;

/// ┌──────────────────┐  load_segments   ┌──────────────────┐
/// │                  ◄──────────────────┤                  │
/// │    Segment List  │                  │  SegmentTracker  │◄── seek(timecode)
/// │      Loader      │  (every refresh  │                  │
/// │                  │    interval)     │  index, position │
/// └──────────────────┘                  └────────┬─────────┘
///                                                │ next segment
///                                       ┌────────▼─────────┐
///      Segment 0 ─┐                     │                  │
///      Segment 1 ─┼──── fetch ─────────►│  ChainedStream   ├──► PacketStream ──► frames
///      Segment N ─┘                     │                  │
///                                       └──────────────────┘
pub trait SegmentListLoader: Send + Sync {
    /// Loads the complete, ordered segment list of the track `identifier`.
    fn load_segments(&self, identifier: &str) -> SegueResult<Vec<Segment>>;
}

/// Opens the body of a segment. The whole segment is requested at once.
pub trait SegmentFetcher: Send + Sync {
    fn fetch(&self, segment: &Segment) -> SegueResult<SegmentBody>;
}
