//! Mediafetch Core Library
//!
//! Discovers downloadable content behind a URL and fetches it to local
//! storage, transparently continuing partial HTTP responses with byte-range
//! requests.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`model`] - Content, resource and manifest types
//! - [`download`] - Range planning, fetch strategy and concurrent downloaders
//! - [`plugin`] - Site plugins for content discovery and merging
//! - [`filter`] - Content selection (best quality, matching)
//! - [`service`] - End-to-end pipeline from URL to merged files
//! - [`config`] - Configuration file loading
//! - [`hash`] - SHA-2 digests for fingerprints and checksums

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod filter;
pub mod hash;
pub mod model;
pub mod plugin;
pub mod service;
mod user_agent;

// Re-export commonly used types
pub use download::{
    Downloader, DownloaderRegistry, FetchError, HttpClient, HttpDownloader, RangePlanner,
    StorageError, UpdateHook,
};
pub use filter::{ContentSelection, best_content};
pub use model::{Content, HttpResource, Manifest, Resource};
pub use plugin::{GenericPlugin, Plugin, PluginError, PluginRegistry};
pub use service::{DownloadOptions, DownloadService, ServiceError};
