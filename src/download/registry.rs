//! Downloader capability dispatch.
//!
//! The [`DownloaderRegistry`] holds downloaders in registration order and picks
//! the first whose [`Downloader::can_handle`] accepts a content item, falling
//! back to the plain [`HttpDownloader`] when none does.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::UpdateHook;
use super::client::HttpClient;
use super::engine::HttpDownloader;
use super::error::FetchError;
use crate::model::{Content, Manifest};

/// A strategy that fetches every resource of a content item to staging files.
///
/// This trait uses `async_trait` so downloaders can live in the registry as
/// `Box<dyn Downloader>`.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Returns the downloader's name (e.g. "http").
    fn name(&self) -> &str;

    /// Returns true if this downloader can fetch every resource of `content`.
    ///
    /// Must not perform I/O.
    fn can_handle(&self, content: &Content) -> bool;

    /// Fetches the resources of `content` into `staging_dir`.
    async fn download_content(
        &self,
        content: &Content,
        staging_dir: &Path,
        update_hook: Option<UpdateHook>,
    ) -> Result<Manifest, FetchError>;
}

/// An ordered collection of downloaders with an HTTP fallback.
pub struct DownloaderRegistry {
    downloaders: Vec<Box<dyn Downloader>>,
    fallback: HttpDownloader,
}

impl DownloaderRegistry {
    /// Creates an empty registry that falls back to `fallback`.
    #[must_use]
    pub fn new(fallback: HttpDownloader) -> Self {
        Self {
            downloaders: Vec::new(),
            fallback,
        }
    }

    /// Appends a downloader; earlier registrations win.
    #[instrument(skip(self, downloader), fields(downloader_name = downloader.name()))]
    pub fn register(&mut self, downloader: Box<dyn Downloader>) {
        debug!("registering downloader");
        self.downloaders.push(downloader);
    }

    /// Returns the number of registered downloaders (excluding the fallback).
    #[must_use]
    pub fn len(&self) -> usize {
        self.downloaders.len()
    }

    /// Returns true if only the fallback is available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.downloaders.is_empty()
    }

    /// Names of the registered downloaders in dispatch order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.downloaders.iter().map(|d| d.name()).collect()
    }

    /// Selects the downloader for `content`.
    #[must_use]
    #[instrument(skip(self, content), fields(content_id = %content.id))]
    pub fn select(&self, content: &Content) -> &dyn Downloader {
        match self.downloaders.iter().find(|d| d.can_handle(content)) {
            Some(downloader) => {
                debug!(downloader = downloader.name(), "selected downloader");
                downloader.as_ref()
            }
            None => {
                debug!(downloader = self.fallback.name(), "no downloader matched; using fallback");
                &self.fallback
            }
        }
    }
}

impl std::fmt::Debug for DownloaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloaderRegistry")
            .field("downloaders", &self.names())
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

/// Builds the registry used by the download service.
#[must_use]
pub fn build_default_downloader_registry(client: HttpClient, chunk_size: usize) -> DownloaderRegistry {
    let http = HttpDownloader::with_client(client).with_chunk_size(chunk_size);
    let mut registry = DownloaderRegistry::new(http.clone());
    registry.register(Box::new(http));
    registry
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Artifact, HttpResource};

    struct StaticDownloader {
        name: &'static str,
        accepts: bool,
    }

    #[async_trait]
    impl Downloader for StaticDownloader {
        fn name(&self) -> &str {
            self.name
        }

        fn can_handle(&self, _content: &Content) -> bool {
            self.accepts
        }

        async fn download_content(
            &self,
            content: &Content,
            staging_dir: &Path,
            _update_hook: Option<UpdateHook>,
        ) -> Result<Manifest, FetchError> {
            Ok(Manifest {
                content_id: content.id.clone(),
                artifacts: vec![Artifact {
                    fingerprint: self.name.to_string(),
                    path: staging_dir.join(self.name),
                }],
            })
        }
    }

    fn content() -> Content {
        let url: url::Url = "https://example.com/a".parse().unwrap();
        Content::new("a", "A", url.clone(), "video/mp4", vec![HttpResource::get(url).into()])
    }

    #[test]
    fn test_select_first_matching_downloader() {
        let mut registry = DownloaderRegistry::new(HttpDownloader::new());
        registry.register(Box::new(StaticDownloader { name: "never", accepts: false }));
        registry.register(Box::new(StaticDownloader { name: "first", accepts: true }));
        registry.register(Box::new(StaticDownloader { name: "second", accepts: true }));

        assert_eq!(registry.select(&content()).name(), "first");
        assert_eq!(registry.names(), vec!["never", "first", "second"]);
    }

    #[test]
    fn test_select_falls_back_to_http() {
        let mut registry = DownloaderRegistry::new(HttpDownloader::new());
        registry.register(Box::new(StaticDownloader { name: "never", accepts: false }));
        assert_eq!(registry.select(&content()).name(), HttpDownloader::NAME);
    }

    #[test]
    fn test_empty_registry_uses_fallback() {
        let registry = DownloaderRegistry::new(HttpDownloader::new());
        assert!(registry.is_empty());
        assert_eq!(registry.select(&content()).name(), HttpDownloader::NAME);
    }

    #[test]
    fn test_default_registry_contains_http() {
        let registry = build_default_downloader_registry(HttpClient::new(), 1024);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec![HttpDownloader::NAME]);
    }

    #[tokio::test]
    async fn test_selected_downloader_is_used_for_dispatch() {
        let mut registry = DownloaderRegistry::new(HttpDownloader::new());
        registry.register(Box::new(StaticDownloader { name: "stub", accepts: true }));
        let manifest = registry
            .select(&content())
            .download_content(&content(), Path::new("/stage"), None)
            .await
            .unwrap();
        assert_eq!(manifest.artifacts[0].path, Path::new("/stage/stub"));
    }
}
