//! Resource fetching: from a content item's resources to staging files.
//!
//! # Features
//!
//! - Streaming transfers written in bounded chunks with a progress hook
//! - Transparent continuation of `206 Partial Content` responses via
//!   sequential `Range` requests
//! - Concurrent fetching of a content item's resources (8 connections)
//! - Content-addressed staging file names
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use mediafetch::download::{HttpClient, build_default_downloader_registry};
//! use mediafetch::model::{Content, HttpResource};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = build_default_downloader_registry(HttpClient::new(), 4096);
//! let url: url::Url = "https://example.com/song.mp3".parse()?;
//! let content = Content::new("song", "Song", url.clone(), "audio/mpeg", vec![HttpResource::get(url).into()]);
//! let manifest = registry
//!     .select(&content)
//!     .download_content(&content, Path::new("./staging"), None)
//!     .await?;
//! println!("staged: {:?}", manifest.paths().collect::<Vec<_>>());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

mod client;
mod constants;
mod engine;
mod error;
pub mod range;
mod registry;
pub mod storage;
mod strategy;

pub use client::HttpClient;
pub use constants::{CONNECT_TIMEOUT_SECS, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONNECTIONS, READ_TIMEOUT_SECS};
pub use engine::HttpDownloader;
pub use error::{FetchError, StorageError};
pub use range::{ByteRange, ContentRange, FallbackReason, RangePlanner, parse_content_range};
pub use registry::{Downloader, DownloaderRegistry, build_default_downloader_registry};
pub use storage::allocate;

/// Progress callback invoked after every chunk written to a staging file.
///
/// Receives the number of bytes just written and the expected total size of
/// the resource, when known. It runs synchronously on the fetch task, so it
/// should return quickly; a panic fails the resource.
pub type UpdateHook = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;
