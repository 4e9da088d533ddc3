use reqwest::Url;

/// One HTTP-fetchable piece of a track's bitstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub url: Url,
    /// Length in milliseconds. `None` marks the trailing segment of a live
    /// playlist whose length is not known yet.
    pub duration: Option<u64>,
}

impl Segment {
    pub fn new(url: Url, duration: Option<u64>) -> Self {
        Self { url, duration }
    }
}

/// Total length of the segments before the first one with an unknown duration.
pub fn known_extent(segments: &[Segment]) -> u64 {
    segments
        .iter()
        .map_while(|s| s.duration)
        .fold(0, u64::saturating_add)
}
