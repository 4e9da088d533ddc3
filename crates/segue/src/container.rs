//! Boundary to the container layer that frames and decodes the bitstream.
//!
//! The segment machinery only moves bytes. A [`ContainerFormat`] wraps the
//! chained segment bytes into a [`PacketStream`], which knows how to find the
//! global header and how to resume at a segment boundary.

use std::ops::ControlFlow;

use bytes::Bytes;

use crate::{chain::ChainedStream, error::SegueResult, tracker::SegmentFeed, SegmentBody};

/// All segments of a track, read back to back.
pub type SegmentChain = ChainedStream<SegmentFeed, SegmentBody>;

/// Where a decode session starts, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamPosition {
    /// Timecode of the first byte of the stream
    pub start: u64,
    /// Timecode playback was asked to resume from. Frames before it are
    /// expected to be skipped by the handler.
    pub desired: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub timecode: u64,
    pub data: Bytes,
}

/// Receives decoded frames.
pub trait FrameSink {
    /// `Break` asks the handler to stop providing frames and return.
    fn push(&mut self, frame: AudioFrame) -> ControlFlow<()>;
}

/// Frame source bound to one decode session.
pub trait TrackHandler {
    /// Provides frames until the stream is exhausted or the sink breaks.
    fn provide_frames(&mut self, sink: &mut dyn FrameSink) -> SegueResult<()>;
}

pub trait ContainerFormat {
    type Stream: PacketStream;

    fn open_stream(&self, chain: SegmentChain) -> Self::Stream;
}

pub trait PacketStream {
    /// Decoding parameters read from the header
    type Blueprint;

    /// Looks for the global header at the current position.
    fn detect_header(&mut self) -> SegueResult<Option<Self::Blueprint>>;

    /// Prepares the stream to continue at a segment boundary, where no header
    /// is repeated.
    fn start_new_track(&mut self) -> SegueResult<()>;

    fn load_handler<'s>(
        &'s mut self,
        blueprint: &Self::Blueprint,
        position: StreamPosition,
    ) -> SegueResult<Box<dyn TrackHandler + 's>>;
}
