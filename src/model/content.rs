//! Content items discovered by plugins and the manifests produced by downloaders.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use super::resource::Resource;

/// A checksum that fetched content can be validated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    /// Checksum algorithm label (e.g. `sha256`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Lowercase hex digest.
    pub value: String,
}

impl Checksum {
    /// Creates a new checksum entry.
    #[must_use]
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// Optional descriptive metadata reported by the site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    /// The site's identifier of the content.
    pub id: Option<String>,
    /// The site's title of the content.
    pub title: Option<String>,
    /// The site's description of the content.
    pub description: Option<String>,
    /// Name of the publisher.
    pub publisher: Option<String>,
    /// RFC 3339 publication timestamp.
    pub published_at: Option<String>,
    /// Duration in milliseconds.
    pub duration: Option<u64>,
    /// Remote filename if known.
    pub filename: Option<String>,
    /// Thumbnail URL if known.
    pub thumbnail: Option<Url>,
}

/// One discovered downloadable unit.
///
/// The order of [`Content::resources`] is significant: downloaders return
/// their manifest artifacts in exactly this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Identifier of the content; variants of the same item share it.
    pub id: String,
    /// Name of this variant.
    pub name: String,
    /// Relative quality among variants (larger is better).
    pub quality: f64,
    /// Size in bytes (0 when unknown).
    pub size: u64,
    /// Mime type of the final merged content.
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Source URL the content was extracted from.
    pub url: Url,
    /// Resources to fetch, in merge order.
    pub resources: Vec<Resource>,
    /// Checksums of the final merged content.
    #[serde(default)]
    pub checksums: Vec<Checksum>,
    /// Explicit file extension (including the leading dot).
    #[serde(default)]
    pub extension: Option<String>,
    /// Unstructured plugin-specific details.
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
    /// Descriptive metadata.
    #[serde(default)]
    pub metadata: Option<ContentMetadata>,
}

impl Content {
    /// Creates content with the required fields; optional fields start empty.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url: Url,
        mime_type: impl Into<String>,
        resources: Vec<Resource>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quality: 1.0,
            size: 0,
            mime_type: mime_type.into(),
            url,
            resources,
            checksums: Vec::new(),
            extension: None,
            extra: BTreeMap::new(),
            metadata: None,
        }
    }

    /// File suffix for the merged content: the explicit extension, otherwise
    /// one derived from the mime type, otherwise empty.
    #[must_use]
    pub fn suffix(&self) -> String {
        if let Some(extension) = &self.extension {
            return extension.clone();
        }
        extension_from_mime(&self.mime_type)
            .map(str::to_string)
            .unwrap_or_default()
    }

    /// Filename used to store the merged content.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}{}", self.id, self.suffix())
    }
}

/// Maps a mime type to a conventional file extension.
#[must_use]
pub fn extension_from_mime(mime_type: &str) -> Option<&'static str> {
    let mime = mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    let extension = match mime.as_str() {
        "text/html" => ".html",
        "text/plain" => ".txt",
        "application/json" => ".json",
        "application/xml" | "text/xml" => ".xml",
        "application/pdf" => ".pdf",
        "application/zip" => ".zip",
        "application/gzip" => ".gz",
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "video/mp4" => ".mp4",
        "video/webm" => ".webm",
        "video/x-matroska" => ".mkv",
        "video/quicktime" => ".mov",
        "video/mp2t" => ".ts",
        "audio/mpeg" => ".mp3",
        "audio/mp4" => ".m4a",
        "audio/ogg" => ".ogg",
        "audio/wav" | "audio/x-wav" => ".wav",
        "audio/flac" => ".flac",
        "application/vnd.apple.mpegurl" | "application/x-mpegurl" => ".m3u8",
        _ => return None,
    };
    Some(extension)
}

/// A fetched resource paired with the staging file it was written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Fingerprint of the fetched resource.
    pub fingerprint: String,
    /// Staging file holding the resource bytes.
    pub path: PathBuf,
}

/// Ordered artifacts for one content item, ready to be merged by its plugin.
///
/// `artifacts[i]` always corresponds to `content.resources[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Identifier of the content the artifacts belong to.
    pub content_id: String,
    /// Artifacts in resource declaration order.
    pub artifacts: Vec<Artifact>,
}

impl Manifest {
    /// Staging paths in artifact order.
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.artifacts.iter().map(|artifact| &artifact.path)
    }
}
