//! Constants for the download module (timeouts, chunking, concurrency).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default size of the chunks response bodies are written and reported in.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Upper bound on simultaneous resource fetches for one content item.
pub const DEFAULT_MAX_CONNECTIONS: usize = 8;
