//! Error types for plugin operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::download::FetchError;

/// Errors raised while extracting or writing content.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A request made during content discovery failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The manifest does not hold the number of artifacts the plugin merges.
    #[error("{plugin} expects {expected} artifact(s), manifest for {content_id} has {found}")]
    ArtifactCount {
        /// Plugin name.
        plugin: String,
        /// Content the manifest belongs to.
        content_id: String,
        /// Number of artifacts the plugin can merge.
        expected: usize,
        /// Number of artifacts found.
        found: usize,
    },

    /// An artifact listed in the manifest is not a file on disk.
    #[error("no artifact file exists at {path}")]
    MissingArtifact {
        /// The expected artifact path.
        path: PathBuf,
    },

    /// File system error while writing merged content.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Site-specific extraction failure.
    #[error("{plugin} could not extract content from {url}: {reason}")]
    Extraction {
        /// Plugin name.
        plugin: String,
        /// The URL being extracted.
        url: String,
        /// What went wrong.
        reason: String,
    },
}

impl PluginError {
    /// Creates an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a site-specific extraction error.
    pub fn extraction(
        plugin: impl Into<String>,
        url: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Extraction {
            plugin: plugin.into(),
            url: url.into(),
            reason: reason.into(),
        }
    }
}
