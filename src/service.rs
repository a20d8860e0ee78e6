//! Download service: URL in, merged files out.
//!
//! The [`DownloadService`] wires the plugin registry (content discovery and
//! merging) to the downloader registry (resource fetching):
//!
//! 1. Find the plugin for the URL and extract its content
//! 2. Apply the [`ContentSelection`]
//! 3. Fetch every selected content item's resources to the staging directory
//! 4. Merge the staged artifacts with the plugin and copy the result out
//! 5. Verify checksums and clean up staging files

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::download::{
    DownloaderRegistry, FetchError, HttpClient, UpdateHook, build_default_downloader_registry,
};
use crate::filter::ContentSelection;
use crate::hash::{HashType, hash_file};
use crate::model::{Content, Manifest};
use crate::plugin::{Plugin, PluginError, PluginRegistry, build_default_plugin_registry};

/// Errors returned by [`DownloadService`] operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The input is not an absolute `http`/`https` URL.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected input.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The output location is not an existing directory.
    #[error("{path} is not a directory")]
    NotADirectory {
        /// The rejected path.
        path: PathBuf,
    },

    /// The output file already exists and overwriting is disabled.
    #[error("file at {path} already exists")]
    AlreadyExists {
        /// The existing file.
        path: PathBuf,
    },

    /// The merged file does not match one of the content's checksums.
    #[error("{kind} checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The merged file (removed after the check).
        path: PathBuf,
        /// Hash algorithm.
        kind: HashType,
        /// Checksum published by the site.
        expected: String,
        /// Checksum of the merged file.
        actual: String,
    },

    /// Plugin failure while extracting or merging content.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// Resource fetch failure.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// File system error in the staging or output directory.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ServiceError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Options for [`DownloadService::download`].
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Which extracted content to download.
    pub selection: ContentSelection,
    /// Replace existing output files instead of failing.
    pub overwrite: bool,
}

/// Pipeline from a URL to merged content files.
#[derive(Debug)]
pub struct DownloadService {
    plugins: PluginRegistry,
    downloaders: DownloaderRegistry,
    staging_dir: PathBuf,
}

impl DownloadService {
    /// Creates a service from explicit registries.
    #[must_use]
    pub fn new(
        plugins: PluginRegistry,
        downloaders: DownloaderRegistry,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            plugins,
            downloaders,
            staging_dir: staging_dir.into(),
        }
    }

    /// Creates a service with the default registries sharing one client.
    #[must_use]
    pub fn with_defaults(client: HttpClient, chunk_size: usize, staging_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            build_default_plugin_registry(client.clone()),
            build_default_downloader_registry(client, chunk_size),
            staging_dir,
        )
    }

    /// Returns the plugin registry.
    #[must_use]
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Returns the directory resources are staged in.
    #[must_use]
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Finds the plugin responsible for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidUrl`] if `url` is not an `http(s)` URL.
    pub fn find_plugin(&self, url: &str) -> Result<&dyn Plugin, ServiceError> {
        let url = normalize_url(url)?;
        Ok(self.plugins.find(&url))
    }

    /// Discovers the content available at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidUrl`] for unusable input and
    /// [`ServiceError::Plugin`] if extraction fails.
    #[instrument(skip(self))]
    pub async fn extract_content(&self, url: &str) -> Result<Vec<Content>, ServiceError> {
        let url = normalize_url(url)?;
        let plugin = self.plugins.find(&url);
        let content = plugin.extract_content(&url).await?;
        info!(plugin = plugin.name(), count = content.len(), "extracted content");
        Ok(content)
    }

    /// Downloads the content at `url` into `to_dir`, returning the written files.
    ///
    /// Content whose resources fail to download is skipped with a warning.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidUrl`] for unusable input
    /// - [`ServiceError::NotADirectory`] if `to_dir` is not a directory
    /// - [`ServiceError::AlreadyExists`] if an output file exists and
    ///   `options.overwrite` is false
    /// - [`ServiceError::ChecksumMismatch`] if a merged file fails verification
    /// - plugin, merge and IO failures
    #[instrument(skip(self, options, update_hook), fields(to_dir = %to_dir.display()))]
    pub async fn download(
        &self,
        url: &str,
        to_dir: &Path,
        options: &DownloadOptions,
        update_hook: Option<UpdateHook>,
    ) -> Result<Vec<PathBuf>, ServiceError> {
        ensure_directory(to_dir).await?;
        let content = options.selection.apply(self.extract_content(url).await?);
        self.download_selected(url, content, to_dir, options, update_hook)
            .await
    }

    /// Downloads already extracted and selected `content` found at `url`.
    ///
    /// Lets callers inspect the selection (e.g. to size a progress display)
    /// before fetching. `options.selection` is not applied again.
    ///
    /// # Errors
    ///
    /// Same as [`DownloadService::download`].
    #[instrument(skip(self, content, options, update_hook), fields(count = content.len(), to_dir = %to_dir.display()))]
    pub async fn download_selected(
        &self,
        url: &str,
        content: Vec<Content>,
        to_dir: &Path,
        options: &DownloadOptions,
        update_hook: Option<UpdateHook>,
    ) -> Result<Vec<PathBuf>, ServiceError> {
        ensure_directory(to_dir).await?;
        let url = normalize_url(url)?;
        let plugin = self.plugins.find(&url);
        info!(plugin = plugin.name(), count = content.len(), "downloading selected content");

        tokio::fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(|e| ServiceError::io(&self.staging_dir, e))?;

        let mut written = Vec::with_capacity(content.len());
        for item in content {
            let to_path = to_dir.join(item.filename());
            if tokio::fs::try_exists(&to_path).await.unwrap_or(false) {
                if !options.overwrite {
                    return Err(ServiceError::AlreadyExists { path: to_path });
                }
                debug!(path = %to_path.display(), "removing existing output");
                tokio::fs::remove_file(&to_path)
                    .await
                    .map_err(|e| ServiceError::io(&to_path, e))?;
            }

            let downloader = self.downloaders.select(&item);
            let manifest = match downloader
                .download_content(&item, &self.staging_dir, update_hook.clone())
                .await
            {
                Ok(manifest) => manifest,
                Err(error) => {
                    warn!(content_id = %item.id, error = %error, "skipping content that failed to download");
                    continue;
                }
            };

            let result = self.write_content(plugin, &manifest, &to_path).await;
            remove_artifacts(&manifest).await;
            let path = result?;
            verify_checksums(&item, &path).await?;

            info!(content_id = %item.id, path = %path.display(), "content written");
            written.push(path);
        }
        Ok(written)
    }

    /// Merges the artifacts of `manifest` with `plugin` and writes the result to
    /// `to_path`.
    ///
    /// The plugin merges into a temporary file inside the staging directory,
    /// which is then copied to `to_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::AlreadyExists`] if `to_path` exists, and plugin
    /// or IO errors from the merge and copy.
    #[instrument(skip(self, plugin, manifest), fields(content_id = %manifest.content_id, to_path = %to_path.display()))]
    pub async fn write_content(
        &self,
        plugin: &dyn Plugin,
        manifest: &Manifest,
        to_path: &Path,
    ) -> Result<PathBuf, ServiceError> {
        if tokio::fs::try_exists(to_path).await.unwrap_or(false) {
            return Err(ServiceError::AlreadyExists {
                path: to_path.to_path_buf(),
            });
        }

        let merge_path = self
            .staging_dir
            .join(format!("{}.merge", manifest.content_id));
        remove_if_exists(&merge_path)
            .await
            .map_err(|e| ServiceError::io(&merge_path, e))?;

        let merged = plugin.write_content(manifest, &merge_path).await?;
        let copied = tokio::fs::copy(&merged, to_path)
            .await
            .map_err(|e| ServiceError::io(to_path, e));
        if let Err(error) = remove_if_exists(&merged).await {
            warn!(path = %merged.display(), error = %error, "failed to remove merged staging file");
        }
        let bytes = copied?;

        debug!(bytes, "merged content copied");
        Ok(to_path.to_path_buf())
    }
}

async fn ensure_directory(path: &Path) -> Result<(), ServiceError> {
    let is_dir = tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if is_dir {
        Ok(())
    } else {
        Err(ServiceError::NotADirectory {
            path: path.to_path_buf(),
        })
    }
}

/// Parses `url` and requires an `http` or `https` scheme.
fn normalize_url(url: &str) -> Result<Url, ServiceError> {
    let parsed = Url::parse(url.trim()).map_err(|e| ServiceError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ServiceError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// Checks `path` against every checksum of `content` with a supported type.
///
/// A mismatching file is removed.
async fn verify_checksums(content: &Content, path: &Path) -> Result<(), ServiceError> {
    for checksum in &content.checksums {
        let kind = match checksum.kind.parse::<HashType>() {
            Ok(kind) => kind,
            Err(reason) => {
                debug!(%reason, "skipping checksum");
                continue;
            }
        };
        let actual = hash_file(path, kind)
            .await
            .map_err(|e| ServiceError::io(path, e))?;
        if !actual.eq_ignore_ascii_case(checksum.value.trim()) {
            if let Err(error) = remove_if_exists(path).await {
                warn!(path = %path.display(), error = %error, "failed to remove corrupt file");
            }
            return Err(ServiceError::ChecksumMismatch {
                path: path.to_path_buf(),
                kind,
                expected: checksum.value.clone(),
                actual,
            });
        }
        debug!(%kind, "checksum verified");
    }
    Ok(())
}

async fn remove_artifacts(manifest: &Manifest) {
    for path in manifest.paths() {
        if let Err(error) = remove_if_exists(path).await {
            warn!(path = %path.display(), error = %error, "failed to remove staging artifact");
        }
    }
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
