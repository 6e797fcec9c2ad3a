use std::path::PathBuf;
use reqwest::StatusCode;
use thiserror::Error;

/// Raised when the argument list cannot be interpreted without guessing.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum UsageError {
    #[error("{count} arguments start with `{prefix}`; pass it at most once")]
    Ambiguous { prefix: &'static str, count: usize },
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("`{address}` is not a valid URL: {source}")]
    InvalidAddress {
        address: String,
        source: url::ParseError,
    },
    #[error("failed to initialize HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    /// Connection failures, timeouts, and certificate rejections.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        source: reqwest::Error,
    },
    #[error("{url} answered {status}")]
    Status { url: String, status: StatusCode },
    #[error("I/O error while writing {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not move download into place at {path:?}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}
