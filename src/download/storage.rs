//! Staging file pre-allocation.

use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, instrument};

use super::error::StorageError;

/// Pre-allocates a sparse file of exactly `size` bytes at `path`.
///
/// Parent directories are created as needed. The file is created with
/// `create_new`, so an existing file (e.g. one still being written by another
/// fetch of the same resource) is never clobbered.
///
/// # Errors
///
/// - [`StorageError::InvalidSize`] if `size` is zero
/// - [`StorageError::AlreadyExists`] if `path` already exists
/// - [`StorageError::Io`] if creating directories or the file fails
#[instrument(level = "debug", skip(path), fields(path = %path.display()))]
pub async fn allocate(path: &Path, size: u64) -> Result<PathBuf, StorageError> {
    if size == 0 {
        return Err(StorageError::InvalidSize {
            path: path.to_path_buf(),
            size,
        });
    }

    let io_error = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|source| {
            if source.kind() == ErrorKind::AlreadyExists {
                StorageError::AlreadyExists {
                    path: path.to_path_buf(),
                }
            } else {
                io_error(source)
            }
        })?;

    file.seek(SeekFrom::Start(size - 1))
        .await
        .map_err(io_error)?;
    file.write_all(&[0]).await.map_err(io_error)?;
    file.flush().await.map_err(io_error)?;

    debug!(size, "allocated staging file");
    Ok(path.to_path_buf())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_allocate_creates_file_of_exact_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("content.fingerprint");

        let allocated = allocate(&path, 512).await.unwrap();

        assert_eq!(allocated, path);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 512);
        assert!(std::fs::read(&path).unwrap().iter().all(|b| *b == 0));
    }

    #[tokio::test]
    async fn test_allocate_creates_missing_parents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("deeper").join("file");

        allocate(&path, 1).await.unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_allocate_rejects_zero_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("zero");

        let result = allocate(&path, 0).await;

        assert!(matches!(result, Err(StorageError::InvalidSize { size: 0, .. })));
        assert!(!path.exists(), "no file should be created for invalid size");
    }

    #[tokio::test]
    async fn test_allocate_rejects_existing_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("existing");
        std::fs::write(&path, b"partial data from a previous run").unwrap();

        let result = allocate(&path, 64).await;

        assert!(matches!(result, Err(StorageError::AlreadyExists { .. })));
        assert_eq!(
            std::fs::read(&path).unwrap(),
            b"partial data from a previous run",
            "existing data must not be touched"
        );
    }
}
