use std::time::Instant;

use thiserror::Error;

use crate::{error::SegueError, segment::Segment};

/// Source of the monotonic time used to schedule playlist refreshes.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Reasons a refreshed playlist is thrown away.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("received {actual} segments on update, expected {expected}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("segment {index} has different length than previously on update")]
    DurationMismatch { index: usize },

    #[error("failed to load segment list: {0}")]
    Load(#[from] SegueError),
}

/// Checks that `candidate` describes the same segment boundaries as `current`.
///
/// Only URLs may differ between the two lists; playback positions are derived
/// from durations and would drift otherwise.
pub fn validate_refresh(current: &[Segment], candidate: &[Segment]) -> Result<(), RefreshError> {
    if current.len() != candidate.len() {
        return Err(RefreshError::CountMismatch {
            expected: current.len(),
            actual: candidate.len(),
        });
    }

    for (index, (old, new)) in current.iter().zip(candidate).enumerate() {
        if old.duration != new.duration {
            return Err(RefreshError::DurationMismatch { index });
        }
    }

    Ok(())
}
