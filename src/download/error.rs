//! Error types for the download module.
//!
//! Every variant carries the resource URL or file path it concerns so callers
//! can log which resource failed and why.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while pre-allocating a staging file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Requested size was zero.
    #[error("cannot allocate {size} bytes at {path}: expected size > 0")]
    InvalidSize {
        /// Target path.
        path: PathBuf,
        /// Rejected size.
        size: u64,
    },

    /// Target path already exists.
    #[error("file at {path} already exists")]
    AlreadyExists {
        /// Existing path.
        path: PathBuf,
    },

    /// File system error while creating the file or its parents.
    #[error("IO error allocating {path}: {source}")]
    Io {
        /// Target path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while fetching the resources of a content item.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The resource could not be turned into a valid request (bad header name, etc.)
    #[error("invalid request for {url}: {reason}")]
    InvalidRequest {
        /// The resource URL.
        url: String,
        /// What was wrong with the request.
        reason: String,
    },

    /// Server answered `204 No Content`.
    #[error("resource {url} has no content (HTTP 204)")]
    EmptyResource {
        /// The resource URL.
        url: String,
    },

    /// Server answered with a status the fetch strategy does not handle.
    #[error("unhandled HTTP {status} fetching {url}")]
    UnhandledStatus {
        /// The resource URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A partial response could not be continued and its total size is unknown.
    #[error("cannot plan follow-up ranges for {url} from Content-Range '{content_range}'")]
    RangeIterationFailed {
        /// The resource URL.
        url: String,
        /// The Content-Range value of the first response.
        content_range: String,
    },

    /// A follow-up range request failed.
    #[error("HTTP {status} fetching range '{range}' of {url}")]
    RangeRequestFailed {
        /// The resource URL.
        url: String,
        /// The `Range` header value that was requested.
        range: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Staging file allocation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// File system error while writing a staging file.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A fetch task panicked or was cancelled.
    #[error("fetch task for resource #{index} failed: {reason}")]
    TaskFailed {
        /// Index of the resource in its content item.
        index: usize,
        /// Join error description.
        reason: String,
    },

    /// The worker pool was closed while work was still being submitted.
    #[error("fetch worker pool closed unexpectedly")]
    PoolClosed,

    /// No registered downloader can handle the content.
    #[error("no downloader can handle content {content_id}")]
    Unsupported {
        /// Identifier of the rejected content.
        content_id: String,
    },
}

impl FetchError {
    /// Creates a network error, promoting timeouts to [`FetchError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::Timeout { url: url.into() };
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid-request error.
    pub fn invalid_request(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an empty-resource error.
    pub fn empty_resource(url: impl Into<String>) -> Self {
        Self::EmptyResource { url: url.into() }
    }

    /// Creates an unhandled-status error.
    pub fn unhandled_status(url: impl Into<String>, status: u16) -> Self {
        Self::UnhandledStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a range-iteration error.
    pub fn range_iteration_failed(url: impl Into<String>, content_range: impl Into<String>) -> Self {
        Self::RangeIterationFailed {
            url: url.into(),
            content_range: content_range.into(),
        }
    }

    /// Creates a range-request error.
    pub fn range_request_failed(url: impl Into<String>, range: impl Into<String>, status: u16) -> Self {
        Self::RangeRequestFailed {
            url: url.into(),
            range: range.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the URL of the resource the error concerns, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Network { url, .. }
            | Self::Timeout { url }
            | Self::InvalidRequest { url, .. }
            | Self::EmptyResource { url }
            | Self::UnhandledStatus { url, .. }
            | Self::RangeIterationFailed { url, .. }
            | Self::RangeRequestFailed { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Returns the HTTP status the error was caused by, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::EmptyResource { .. } => Some(204),
            Self::UnhandledStatus { status, .. } | Self::RangeRequestFailed { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}
