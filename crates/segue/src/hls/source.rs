use reqwest::Url;
use tokio::runtime::Handle;

use crate::{
    config::PlaybackConfig,
    error::SegueResult,
    hls::utils::{load_m3u8, parse_segments, resolve_playback_url},
    segment::Segment,
    util::http::HttpClient,
    SegmentListLoader,
};

/// Where the media playlist of a track is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistLocation {
    /// URL of the playlist itself
    Direct(Url),
    /// Endpoint answering `{"url": "<playlist url>"}`
    Lookup(Url),
}

/// Loads segment lists from an HLS media playlist.
pub struct M3u8SegmentLoader {
    client: HttpClient,
    location: PlaylistLocation,
    retry: u32,
    handle: Handle,
}

impl M3u8SegmentLoader {
    /// Creates a loader bound to the current Tokio runtime.
    ///
    /// Must be called from within a Tokio runtime context.
    pub fn new(client: HttpClient, location: PlaylistLocation) -> Self {
        Self {
            client,
            location,
            retry: PlaybackConfig::default().playlist_retries,
            handle: Handle::current(),
        }
    }

    /// Creates a loader with the playlist retries of `config`.
    ///
    /// Must be called from within a Tokio runtime context.
    pub fn from_config(
        client: HttpClient,
        location: PlaylistLocation,
        config: &PlaybackConfig,
    ) -> Self {
        Self::new(client, location).with_retry(config.playlist_retries)
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handle = handle;
        self
    }

    pub async fn load(&self) -> SegueResult<Vec<Segment>> {
        let playlist_url = match &self.location {
            PlaylistLocation::Direct(url) => url.clone(),
            PlaylistLocation::Lookup(lookup_url) => {
                resolve_playback_url(&self.client, lookup_url.clone()).await?
            }
        };

        let (playlist_url, playlist) = load_m3u8(&self.client, playlist_url, self.retry).await?;
        parse_segments(&playlist_url, &playlist)
    }
}

impl SegmentListLoader for M3u8SegmentLoader {
    /// Blocks on the runtime the loader is bound to, so it must not be called
    /// from an async context.
    fn load_segments(&self, identifier: &str) -> SegueResult<Vec<Segment>> {
        log::debug!("For {identifier}, loading segment list");
        self.handle.block_on(self.load())
    }
}
