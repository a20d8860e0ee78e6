//! Concurrent fetch orchestrator for the resources of one content item.
//!
//! [`HttpDownloader`] fans out one task per resource on a Tokio [`JoinSet`],
//! gated by a semaphore of [`DEFAULT_MAX_CONNECTIONS`] permits, and assembles
//! the resulting staging files into a [`Manifest`] in resource order.
//!
//! # Concurrency Model
//!
//! - A semaphore permit is acquired before spawning each fetch task
//! - Permits are released automatically when tasks complete (RAII)
//! - Every task runs to completion before the first failure is reported
//! - Dropping the returned future drops the `JoinSet`, aborting in-flight tasks
//!
//! # Example
//!
//! ```no_run
//! use mediafetch::download::HttpDownloader;
//! use mediafetch::model::{Content, HttpResource};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let url: url::Url = "https://example.com/video.mp4".parse()?;
//! let content = Content::new(
//!     "video",
//!     "Video",
//!     url.clone(),
//!     "video/mp4",
//!     vec![HttpResource::get(url).into()],
//! );
//! let manifest = HttpDownloader::new()
//!     .download_content(&content, Path::new("./staging"), None)
//!     .await?;
//! println!("{} artifacts", manifest.artifacts.len());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::client::HttpClient;
use super::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONNECTIONS};
use super::error::FetchError;
use super::registry::Downloader;
use super::strategy::download_resource;
use super::UpdateHook;
use crate::model::{Artifact, Content, HttpResource, Manifest, ResourceKind};

/// Downloader for content made only of HTTP(S) resources.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: HttpClient,
    chunk_size: usize,
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

/// One resource scheduled for fetching.
#[derive(Debug, Clone)]
struct FetchTarget {
    index: usize,
    resource: HttpResource,
    fingerprint: String,
    path: PathBuf,
}

/// Outcome of a successful fetch task.
#[derive(Debug)]
struct FetchResult {
    index: usize,
    fingerprint: String,
    path: PathBuf,
}

impl HttpDownloader {
    /// Registry name of this downloader.
    pub const NAME: &'static str = "http";

    /// Creates a downloader with a default client and chunk size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(HttpClient::new())
    }

    /// Creates a downloader sharing an existing client.
    #[must_use]
    pub fn with_client(client: HttpClient) -> Self {
        Self {
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets the largest slice written (and reported to the update hook) at once.
    ///
    /// Zero is raised to one byte.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Returns the configured chunk size.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Fetches every resource of `content` into `staging_dir`.
    ///
    /// Staging files are named `{content.id}.{fingerprint}`. When several
    /// resources share a fingerprint each of them gets a `.{index}` suffix so
    /// no two tasks ever write the same file.
    ///
    /// # Errors
    ///
    /// Returns the first failure observed once all tasks have finished:
    /// - [`FetchError::Unsupported`] if a resource is not an HTTP resource
    /// - [`FetchError::TaskFailed`] if a task panicked (e.g. in the update hook)
    /// - [`FetchError::PoolClosed`] if the worker semaphore was closed
    /// - any error from fetching a single resource
    #[instrument(
        skip(self, content, update_hook),
        fields(content_id = %content.id, resources = content.resources.len(), staging_dir = %staging_dir.display())
    )]
    pub async fn download_content(
        &self,
        content: &Content,
        staging_dir: &Path,
        update_hook: Option<UpdateHook>,
    ) -> Result<Manifest, FetchError> {
        let targets = plan_targets(content, staging_dir)?;
        let semaphore = Arc::new(Semaphore::new(DEFAULT_MAX_CONNECTIONS));
        let mut tasks = JoinSet::new();
        let mut task_indices = HashMap::with_capacity(targets.len());

        info!("fetching content resources");

        for target in targets {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| FetchError::PoolClosed)?;

            let client = self.client.clone();
            let hook = update_hook.clone();
            let chunk_size = self.chunk_size;
            let index = target.index;

            let handle = tasks.spawn(async move {
                let _permit = permit;
                let result = download_resource(
                    &client,
                    &target.resource,
                    &target.path,
                    chunk_size,
                    hook.as_ref(),
                )
                .await;
                result.map(|path| FetchResult {
                    index: target.index,
                    fingerprint: target.fingerprint,
                    path,
                })
            });
            task_indices.insert(handle.id(), index);
        }

        debug!(task_count = task_indices.len(), "waiting for fetch tasks");

        let mut fetched = Vec::with_capacity(task_indices.len());
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(result)) => {
                    debug!(index = result.index, path = %result.path.display(), "resource fetched");
                    fetched.push(result);
                }
                Ok(Err(error)) => {
                    warn!(error = %error, "resource fetch failed");
                    first_error.get_or_insert(error);
                }
                Err(join_error) => {
                    let index = task_indices.get(&join_error.id()).copied().unwrap_or_default();
                    warn!(index, error = %join_error, "fetch task did not complete");
                    first_error.get_or_insert(FetchError::TaskFailed {
                        index,
                        reason: join_error.to_string(),
                    });
                }
            }
        }

        if let Some(error) = first_error {
            return Err(error);
        }

        fetched.sort_by_key(|result| result.index);
        info!(artifacts = fetched.len(), "content fetched");

        Ok(Manifest {
            content_id: content.id.clone(),
            artifacts: fetched
                .into_iter()
                .map(|result| Artifact {
                    fingerprint: result.fingerprint,
                    path: result.path,
                })
                .collect(),
        })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn can_handle(&self, content: &Content) -> bool {
        content
            .resources
            .iter()
            .all(|resource| resource.kind() == ResourceKind::Http)
    }

    async fn download_content(
        &self,
        content: &Content,
        staging_dir: &Path,
        update_hook: Option<UpdateHook>,
    ) -> Result<Manifest, FetchError> {
        HttpDownloader::download_content(self, content, staging_dir, update_hook).await
    }
}

fn plan_targets(content: &Content, staging_dir: &Path) -> Result<Vec<FetchTarget>, FetchError> {
    let mut targets = Vec::with_capacity(content.resources.len());
    for (index, resource) in content.resources.iter().enumerate() {
        let Some(http) = resource.as_http() else {
            return Err(FetchError::Unsupported {
                content_id: content.id.clone(),
            });
        };
        targets.push(FetchTarget {
            index,
            resource: http.clone(),
            fingerprint: http.fingerprint(),
            path: PathBuf::new(),
        });
    }

    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for target in &targets {
        *occurrences.entry(target.fingerprint.as_str()).or_default() += 1;
    }
    let duplicated: Vec<bool> = targets
        .iter()
        .map(|target| occurrences[target.fingerprint.as_str()] > 1)
        .collect();

    for (target, duplicated) in targets.iter_mut().zip(duplicated) {
        let name = if duplicated {
            format!("{}.{}.{}", content.id, target.fingerprint, target.index)
        } else {
            format!("{}.{}", content.id, target.fingerprint)
        };
        target.path = staging_dir.join(name);
    }
    Ok(targets)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Resource;

    fn content(resources: Vec<Resource>) -> Content {
        let url: url::Url = "https://example.com/v".parse().unwrap();
        Content::new("vid", "Video", url, "video/mp4", resources)
    }

    fn http(url: &str) -> Resource {
        HttpResource::get(url.parse().unwrap()).into()
    }

    #[test]
    fn test_plan_targets_names_by_content_and_fingerprint() {
        let content = content(vec![http("https://example.com/a"), http("https://example.com/b")]);
        let targets = plan_targets(&content, Path::new("/stage")).unwrap();

        assert_eq!(targets.len(), 2);
        for (index, target) in targets.iter().enumerate() {
            assert_eq!(target.index, index);
            assert_eq!(target.fingerprint, content.resources[index].fingerprint());
            assert_eq!(
                target.path,
                Path::new("/stage").join(format!("vid.{}", target.fingerprint))
            );
        }
    }

    #[test]
    fn test_plan_targets_disambiguates_duplicate_fingerprints() {
        let content = content(vec![
            http("https://example.com/a"),
            http("https://example.com/b"),
            http("https://example.com/a"),
        ]);
        let targets = plan_targets(&content, Path::new("/stage")).unwrap();
        let fingerprint_a = content.resources[0].fingerprint();
        let fingerprint_b = content.resources[1].fingerprint();

        assert_eq!(
            targets[0].path,
            Path::new("/stage").join(format!("vid.{fingerprint_a}.0"))
        );
        assert_eq!(
            targets[1].path,
            Path::new("/stage").join(format!("vid.{fingerprint_b}"))
        );
        assert_eq!(
            targets[2].path,
            Path::new("/stage").join(format!("vid.{fingerprint_a}.2"))
        );
    }

    #[test]
    fn test_can_handle_http_only_content() {
        let downloader = HttpDownloader::new();
        assert!(downloader.can_handle(&content(vec![http("https://example.com/a")])));
        assert!(downloader.can_handle(&content(Vec::new())));
    }

    #[test]
    fn test_with_chunk_size_rejects_zero() {
        assert_eq!(HttpDownloader::new().with_chunk_size(0).chunk_size(), 1);
        assert_eq!(HttpDownloader::new().with_chunk_size(512).chunk_size(), 512);
        assert_eq!(HttpDownloader::new().chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[tokio::test]
    async fn test_download_content_without_resources_is_empty_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = HttpDownloader::new()
            .download_content(&content(Vec::new()), dir.path(), None)
            .await
            .unwrap();
        assert_eq!(manifest.content_id, "vid");
        assert!(manifest.artifacts.is_empty());
    }
}
