use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long a segment list is trusted before it is reloaded for fresh URLs.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Minimum time between two reloads of the segment list
    pub refresh_interval: Duration,
    /// Attempts made to fetch a playlist before giving up
    pub playlist_retries: u32,
    /// User agent of the default HTTP client
    pub user_agent: Option<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            playlist_retries: 3,
            user_agent: None,
        }
    }
}

impl PlaybackConfig {
    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.playlist_retries = retry;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}
