use m3u8_rs::{MediaPlaylist, Playlist};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{
    error::{SegueError, SegueResult},
    segment::Segment,
};

#[async_recursion::async_recursion]
pub async fn load_m3u8(
    client: &Client,
    url: Url,
    total_retry: u32,
) -> SegueResult<(Url, MediaPlaylist)> {
    log::info!("Start fetching M3U8 file.");

    let mut retry = total_retry;
    let m3u8_parsed = loop {
        if retry == 0 {
            return Err(SegueError::M3u8FetchError);
        }

        match client.get(url.clone()).send().await {
            Ok(resp) if !resp.status().is_success() => {
                log::warn!("Failed to fetch M3U8 file: HTTP {}", resp.status());
                retry -= 1;
            }
            Ok(resp) => match resp.bytes().await {
                Ok(m3u8_bytes) => match m3u8_rs::parse_playlist_res(&m3u8_bytes) {
                    Ok(parsed) => break parsed,
                    Err(error) => {
                        log::warn!("Failed to parse M3U8 file: {error}");
                        retry -= 1;
                    }
                },
                Err(error) => {
                    log::warn!("Failed to fetch M3U8 file: {error}");
                    retry -= 1;
                }
            },
            Err(error) => {
                log::warn!("Failed to fetch M3U8 file: {error}");
                retry -= 1;
            }
        }
    };
    log::info!("M3U8 file fetched.");

    match m3u8_parsed {
        Playlist::MasterPlaylist(pl) => {
            log::info!("Master playlist input detected. Auto selecting highest bandwidth stream.");
            let variant = pl
                .variants
                .iter()
                .filter(|v| !v.is_i_frame)
                .max_by_key(|v| v.bandwidth)
                .ok_or_else(|| SegueError::M3u8ParseError("No variant found".to_string()))?;
            let url = url.join(&variant.uri)?;

            log::info!(
                "Best stream: {url}; Bandwidth: {bandwidth}",
                bandwidth = variant.bandwidth
            );
            load_m3u8(client, url, total_retry).await
        }
        Playlist::MediaPlaylist(pl) => Ok((url, pl)),
    }
}

/// Body of a stream lookup endpoint.
#[derive(Debug, Deserialize)]
struct PlaybackLocation {
    url: String,
}

/// Asks a lookup endpoint where the playlist currently lives. The answer is
/// a short-lived signed URL, so it is resolved again on every load.
pub async fn resolve_playback_url(client: &Client, lookup_url: Url) -> SegueResult<Url> {
    let response = client.get(lookup_url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SegueError::HttpError(status));
    }

    let location: PlaybackLocation = serde_json::from_slice(&response.bytes().await?)?;
    Ok(Url::parse(&location.url)?)
}

/// Converts an `#EXTINF` duration into milliseconds. A missing duration is
/// parsed as zero and reported as unknown.
fn duration_millis(seconds: f32) -> Option<u64> {
    if seconds.is_finite() && seconds > 0.0 {
        Some((f64::from(seconds) * 1000.0).round() as u64)
    } else {
        None
    }
}

pub fn parse_segments(playlist_url: &Url, playlist: &MediaPlaylist) -> SegueResult<Vec<Segment>> {
    let segments = playlist
        .segments
        .iter()
        .map(|segment| {
            let url = playlist_url.join(&segment.uri)?;
            Ok(Segment::new(url, duration_millis(segment.duration)))
        })
        .collect::<SegueResult<Vec<_>>>()?;

    if segments.is_empty() {
        return Err(SegueError::EmptyPlaylist(playlist_url.to_string()));
    }
    Ok(segments)
}
