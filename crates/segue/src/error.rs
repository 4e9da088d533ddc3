use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegueError {
    #[error("HTTP error: {0}")]
    HttpError(reqwest::StatusCode),

    #[error("M3u8 fetch error")]
    M3u8FetchError,

    #[error("Invalid m3u8 file: {0}")]
    M3u8ParseError(String),

    #[error("Playlist of {0} contains no segments")]
    EmptyPlaylist(String),

    #[error("No container header detected in the stream of {0}")]
    NoContainerHeader(String),

    #[error("Container error: {0}")]
    Container(String),

    #[error("Playback cancelled")]
    Cancelled,

    #[error(transparent)]
    IOError(std::io::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

impl SegueError {
    /// Wraps the error so it can cross a [`std::io::Read`] boundary and be
    /// recovered intact on the other side.
    pub fn into_io(self) -> std::io::Error {
        match self {
            Self::IOError(e) => e,
            e => std::io::Error::other(e),
        }
    }
}

impl From<std::io::Error> for SegueError {
    fn from(error: std::io::Error) -> Self {
        if !error.get_ref().is_some_and(|inner| inner.is::<SegueError>()) {
            return Self::IOError(error);
        }

        let kind = error.kind();
        match error.into_inner().map(|inner| inner.downcast::<SegueError>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(inner)) => Self::IOError(std::io::Error::new(kind, inner)),
            None => Self::IOError(kind.into()),
        }
    }
}

pub type SegueResult<T> = Result<T, SegueError>;
