use std::ops::ControlFlow;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    container::{AudioFrame, FrameSink},
    error::{SegueError, SegueResult},
    playback::{DecodeSession, PlaybackController},
};

/// Control side of a playback running on another thread.
#[derive(Clone)]
pub struct PlaybackHandle {
    seeks: mpsc::UnboundedSender<u64>,
    token: CancellationToken,
}

impl PlaybackHandle {
    /// Requests a seek to `timecode`. Returns `false` once playback has ended.
    pub fn seek(&self, timecode: u64) -> bool {
        self.seeks.send(timecode).is_ok()
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token to hand to the segment fetcher so `stop` also aborts reads
    /// blocked on the network.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Controller fed by a [`PlaybackHandle`].
///
/// Frames are delivered through a bounded channel. Seeks are applied once the
/// running decode session has returned, and only the latest pending seek is
/// kept.
pub struct QueuedController {
    seeks: mpsc::UnboundedReceiver<u64>,
    pending_seek: Option<u64>,
    frames: mpsc::Sender<AudioFrame>,
    token: CancellationToken,
    detached: bool,
}

pub fn playback_channel(
    capacity: usize,
) -> (PlaybackHandle, QueuedController, mpsc::Receiver<AudioFrame>) {
    let (seek_sender, seek_receiver) = mpsc::unbounded_channel();
    let (frame_sender, frame_receiver) = mpsc::channel(capacity);
    let token = CancellationToken::new();

    let handle = PlaybackHandle {
        seeks: seek_sender,
        token: token.clone(),
    };
    let controller = QueuedController {
        seeks: seek_receiver,
        pending_seek: None,
        frames: frame_sender,
        token,
        detached: false,
    };
    (handle, controller, frame_receiver)
}

impl QueuedController {
    fn poll_seek(&mut self) -> bool {
        while let Ok(timecode) = self.seeks.try_recv() {
            self.pending_seek = Some(timecode);
        }
        self.pending_seek.is_some()
    }

    fn check_cancelled(&self, error: SegueError) -> SegueError {
        if self.token.is_cancelled() {
            SegueError::Cancelled
        } else {
            error
        }
    }
}

impl FrameSink for QueuedController {
    fn push(&mut self, frame: AudioFrame) -> ControlFlow<()> {
        if self.token.is_cancelled() || self.poll_seek() {
            return ControlFlow::Break(());
        }

        let sent = futures::executor::block_on(async {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => false,
                result = self.frames.send(frame) => result.is_ok(),
            }
        });
        if !sent {
            if !self.token.is_cancelled() {
                log::debug!("Frame receiver dropped, stopping playback");
                self.detached = true;
            }
            return ControlFlow::Break(());
        }

        ControlFlow::Continue(())
    }
}

impl PlaybackController for QueuedController {
    fn execute_processing_loop(&mut self, session: &mut dyn DecodeSession) -> SegueResult<()> {
        loop {
            if self.token.is_cancelled() {
                return Err(SegueError::Cancelled);
            }

            self.poll_seek();
            if let Some(timecode) = self.pending_seek.take() {
                session
                    .seek(timecode)
                    .map_err(|e| self.check_cancelled(e))?;
            }

            session.decode(self).map_err(|e| self.check_cancelled(e))?;

            if self.detached {
                return Ok(());
            }
            if self.token.is_cancelled() {
                return Err(SegueError::Cancelled);
            }
            if !self.poll_seek() {
                return Ok(());
            }
        }
    }
}
