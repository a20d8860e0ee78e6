//! Fallback plugin treating any URL as one downloadable file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::{debug, instrument};
use url::Url;

use super::{ANY_DOMAIN, Plugin, PluginError};
use crate::download::HttpClient;
use crate::hash::{HashType, hash_bytes};
use crate::model::{Content, HttpMethod, HttpResource, Manifest};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";
const CONTENT_ID_HASH_LEN: usize = 32;

/// Plugin that assumes it can handle any URL.
///
/// Discovery issues a `HEAD` request; the content is the response body of a
/// plain `GET` of the same URL.
#[derive(Debug, Clone, Default)]
pub struct GenericPlugin {
    client: HttpClient,
}

impl GenericPlugin {
    /// Display name of the plugin.
    pub const NAME: &'static str = "Generic Plugin";

    /// Creates the plugin with a shared HTTP client.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Stable content id for `url`.
    #[must_use]
    pub fn content_id(url: &Url) -> String {
        let digest = hash_bytes(url.as_str().as_bytes(), HashType::Sha256);
        format!("generic-{}", &digest[..CONTENT_ID_HASH_LEN])
    }
}

#[async_trait]
impl Plugin for GenericPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn domains(&self) -> &[&str] {
        &[ANY_DOMAIN]
    }

    fn can_handle(&self, _url: &Url) -> bool {
        true
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn extract_content(&self, url: &Url) -> Result<Vec<Content>, PluginError> {
        let head = HttpResource::new(HttpMethod::Head, url.clone());
        let response = self.client.send(&head).await?;
        if !response.status().is_success() {
            debug!(status = response.status().as_u16(), "HEAD request failed; no content");
            return Ok(Vec::new());
        }

        let headers = response.headers();
        let size = headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(0);
        let mime_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or(DEFAULT_MIME_TYPE, str::trim)
            .to_string();

        let mut content = Content::new(
            Self::content_id(url),
            "Generic Content",
            url.clone(),
            mime_type,
            vec![HttpResource::get(url.clone()).into()],
        );
        content.size = size;
        debug!(content_id = %content.id, size, mime_type = %content.mime_type, "discovered content");
        Ok(vec![content])
    }

    #[instrument(skip(self, manifest), fields(content_id = %manifest.content_id, to_path = %to_path.display()))]
    async fn write_content(&self, manifest: &Manifest, to_path: &Path) -> Result<PathBuf, PluginError> {
        let [artifact] = manifest.artifacts.as_slice() else {
            return Err(PluginError::ArtifactCount {
                plugin: Self::NAME.to_string(),
                content_id: manifest.content_id.clone(),
                expected: 1,
                found: manifest.artifacts.len(),
            });
        };

        let is_file = tokio::fs::metadata(&artifact.path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(PluginError::MissingArtifact {
                path: artifact.path.clone(),
            });
        }

        tokio::fs::rename(&artifact.path, to_path)
            .await
            .map_err(|e| PluginError::io(to_path, e))?;
        Ok(to_path.to_path_buf())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Artifact;

    fn url() -> Url {
        "https://example.com/files/report.pdf".parse().unwrap()
    }

    #[test]
    fn test_content_id_is_stable_and_prefixed() {
        let id = GenericPlugin::content_id(&url());
        assert_eq!(id, GenericPlugin::content_id(&url()));
        assert!(id.starts_with("generic-"));
        assert_eq!(id.len(), "generic-".len() + CONTENT_ID_HASH_LEN);
        assert_ne!(
            id,
            GenericPlugin::content_id(&"https://example.com/other".parse().unwrap())
        );
    }

    #[test]
    fn test_handles_everything() {
        let plugin = GenericPlugin::default();
        assert!(plugin.can_handle(&url()));
        assert_eq!(plugin.domains(), &[ANY_DOMAIN]);
    }

    #[tokio::test]
    async fn test_write_content_moves_single_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("staged");
        tokio::fs::write(&artifact, b"payload").await.unwrap();
        let manifest = Manifest {
            content_id: "c".to_string(),
            artifacts: vec![Artifact {
                fingerprint: "f".to_string(),
                path: artifact.clone(),
            }],
        };
        let target = dir.path().join("final.bin");

        let written = GenericPlugin::default()
            .write_content(&manifest, &target)
            .await
            .unwrap();

        assert_eq!(written, target);
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"payload");
        assert!(!artifact.exists());
    }

    #[tokio::test]
    async fn test_write_content_rejects_multiple_artifacts() {
        let manifest = Manifest {
            content_id: "c".to_string(),
            artifacts: vec![
                Artifact {
                    fingerprint: "a".to_string(),
                    path: PathBuf::from("a"),
                },
                Artifact {
                    fingerprint: "b".to_string(),
                    path: PathBuf::from("b"),
                },
            ],
        };
        let result = GenericPlugin::default()
            .write_content(&manifest, Path::new("out"))
            .await;
        assert!(matches!(
            result,
            Err(PluginError::ArtifactCount { found: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_write_content_requires_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest {
            content_id: "c".to_string(),
            artifacts: vec![Artifact {
                fingerprint: "a".to_string(),
                path: dir.path().join("missing"),
            }],
        };
        let result = GenericPlugin::default()
            .write_content(&manifest, &dir.path().join("out"))
            .await;
        assert!(matches!(result, Err(PluginError::MissingArtifact { .. })));
    }
}
