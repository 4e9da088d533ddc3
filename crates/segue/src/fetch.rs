use std::io::{self, Read};

use futures::{StreamExt, TryStreamExt};
use reqwest::{Response, Url};
use tokio::runtime::Handle;
use tokio_util::{
    io::{StreamReader, SyncIoBridge},
    sync::CancellationToken,
};

use crate::{
    error::{SegueError, SegueResult},
    segment::Segment,
    util::http::HttpClient,
    SegmentBody, SegmentFetcher,
};

/// Fetches whole segments over HTTP and streams their bodies.
///
/// Reads block on the runtime the fetcher is bound to. Cancelling the token
/// aborts pending requests and makes every open body fail on its next read.
pub struct HttpSegmentFetcher {
    client: HttpClient,
    handle: Handle,
    token: CancellationToken,
}

impl HttpSegmentFetcher {
    /// Creates a fetcher bound to the current Tokio runtime.
    ///
    /// Must be called from within a Tokio runtime context.
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            handle: Handle::current(),
            token: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handle = handle;
        self
    }

    async fn request(&self, url: Url) -> SegueResult<Response> {
        let response = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(SegueError::Cancelled),
            response = self.client.get(url).send() => response?,
        };

        if !response.status().is_success() {
            let status = response.status();
            if let Ok(body) = response.text().await {
                log::warn!("Error body: {body}");
            }
            return Err(SegueError::HttpError(status));
        }
        Ok(response)
    }
}

impl SegmentFetcher for HttpSegmentFetcher {
    fn fetch(&self, segment: &Segment) -> SegueResult<SegmentBody> {
        if self.token.is_cancelled() {
            return Err(SegueError::Cancelled);
        }

        let response = self.handle.block_on(self.request(segment.url.clone()))?;
        let body = response
            .bytes_stream()
            .map_err(io::Error::other)
            .take_until(self.token.clone().cancelled_owned());
        let reader = StreamReader::new(Box::pin(body));

        Ok(Box::new(CancellableRead {
            inner: SyncIoBridge::new_with_handle(reader, self.handle.clone()),
            token: self.token.clone(),
        }))
    }
}

/// Turns the early end of a cancelled body into an error, so a cut-off
/// segment is never mistaken for a complete one.
struct CancellableRead<R> {
    inner: R,
    token: CancellationToken,
}

impl<R: Read> Read for CancellableRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.token.is_cancelled() {
            return Err(SegueError::Cancelled.into_io());
        }

        let read = self.inner.read(buf)?;
        if read == 0 && !buf.is_empty() && self.token.is_cancelled() {
            return Err(SegueError::Cancelled.into_io());
        }
        Ok(read)
    }
}
