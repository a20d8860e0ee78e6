//! Single-resource fetch strategy.
//!
//! A resource is requested once and the response status decides how its bytes
//! reach the staging file:
//!
//! - `200 OK` streams the body as-is (normal transfer)
//! - `206 Partial Content` writes the first range, then chases the remaining
//!   ranges with sequential `Range` requests appended to the same file
//! - anything else fails the resource

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Response, StatusCode};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, warn};

use super::UpdateHook;
use super::client::HttpClient;
use super::error::{FetchError, StorageError};
use super::range::{ByteRange, ContentRange, RangePlanner, parse_content_range};
use super::storage::allocate;
use crate::model::HttpResource;

/// Fetches `resource` into `to_path`, returning the path on success.
///
/// Any file already present at `to_path` is replaced.
///
/// # Errors
///
/// - [`FetchError::EmptyResource`] for `204 No Content`
/// - [`FetchError::UnhandledStatus`] for any status other than `200`/`206`
/// - [`FetchError::RangeIterationFailed`] / [`FetchError::RangeRequestFailed`]
///   when a partial transfer cannot be completed
/// - network, storage and IO errors from the transfer itself
#[instrument(skip(client, resource, hook), fields(url = %resource.url, path = %to_path.display()))]
pub(crate) async fn download_resource(
    client: &HttpClient,
    resource: &HttpResource,
    to_path: &Path,
    chunk_size: usize,
    hook: Option<&UpdateHook>,
) -> Result<PathBuf, FetchError> {
    let response = client.send(resource).await?;
    let status = response.status();
    let url = resource.url.as_str();

    match status {
        StatusCode::NO_CONTENT => Err(FetchError::empty_resource(url)),
        StatusCode::OK => {
            remove_stale(to_path).await?;
            download_normal(response, to_path, chunk_size, hook).await
        }
        StatusCode::PARTIAL_CONTENT => {
            remove_stale(to_path).await?;
            download_partial(client, resource, response, to_path, chunk_size, hook).await
        }
        other => {
            warn!(status = other.as_u16(), "unhandled response status");
            Err(FetchError::unhandled_status(url, other.as_u16()))
        }
    }
}

async fn download_normal(
    response: Response,
    to_path: &Path,
    chunk_size: usize,
    hook: Option<&UpdateHook>,
) -> Result<PathBuf, FetchError> {
    let total = response.content_length();
    debug!(?total, "normal transfer");

    allocate_best_effort(to_path, total).await?;
    let mut file = StagingFile::open(to_path, chunk_size, total, hook).await?;
    if let Err(error) = file.write_response(response).await {
        file.abandon().await;
        return Err(error);
    }
    let written = file.finish().await?;

    debug!(bytes = written, "normal transfer complete");
    Ok(to_path.to_path_buf())
}

async fn download_partial(
    client: &HttpClient,
    resource: &HttpResource,
    response: Response,
    to_path: &Path,
    chunk_size: usize,
    hook: Option<&UpdateHook>,
) -> Result<PathBuf, FetchError> {
    let raw_header = response
        .headers()
        .get(CONTENT_RANGE)
        .map(|value| value.to_str().unwrap_or_default().to_string());

    let ContentRange { unit, range, size } = match parse_content_range(raw_header.as_deref()) {
        Ok(content_range) => content_range,
        Err(reason) => {
            debug!(%reason, "cannot continue partial response; treating it as a full body");
            return download_normal(response, to_path, chunk_size, hook).await;
        }
    };
    debug!(%unit, start = range.start, end = range.end, ?size, "partial transfer");

    allocate_best_effort(to_path, size).await?;
    let mut file = StagingFile::open(to_path, chunk_size, size, hook).await?;
    let chased = chase_ranges(
        client, resource, response, &mut file, &unit, range, size, raw_header,
    )
    .await;
    if let Err(error) = chased {
        file.abandon().await;
        return Err(error);
    }

    let written = file.finish().await?;
    debug!(bytes = written, "partial transfer complete");
    Ok(to_path.to_path_buf())
}

/// Writes the first partial body, then requests and appends every following
/// range until the planner is exhausted or the server reports the end.
#[allow(clippy::too_many_arguments)]
async fn chase_ranges(
    client: &HttpClient,
    resource: &HttpResource,
    response: Response,
    file: &mut StagingFile<'_>,
    unit: &str,
    range: ByteRange,
    size: Option<u64>,
    raw_header: Option<String>,
) -> Result<(), FetchError> {
    let url = resource.url.as_str();
    file.write_response(response).await?;

    let mut planner = RangePlanner::new(range.start, range.end, size, None).peekable();
    planner.next();
    if planner.peek().is_none() {
        if size.is_none() {
            return Err(FetchError::range_iteration_failed(
                url,
                raw_header.unwrap_or_default(),
            ));
        }
        return Ok(());
    }

    for next in planner {
        let range_header = next.to_header(unit);
        let ranged = resource.with_header("Range", range_header.as_str());
        let response = client.send(&ranged).await?;
        let status = response.status();

        if !status.is_success() {
            if size.is_none() && status == StatusCode::RANGE_NOT_SATISFIABLE {
                debug!(range = %range_header, "server reported end of stream");
                break;
            }
            return Err(FetchError::range_request_failed(
                url,
                range_header,
                status.as_u16(),
            ));
        }

        let appended = file.write_response(response).await?;
        if size.is_none() && appended == 0 {
            debug!(range = %range_header, "empty range body; treating as end of stream");
            break;
        }
    }
    Ok(())
}

/// Pre-allocates the staging file when the final size is known.
///
/// A zero size is not worth allocating; any other allocation failure is fatal.
async fn allocate_best_effort(path: &Path, size: Option<u64>) -> Result<(), FetchError> {
    let Some(size) = size else {
        return Ok(());
    };
    match allocate(path, size).await {
        Ok(_) | Err(StorageError::InvalidSize { .. }) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn remove_stale(path: &Path) -> Result<(), FetchError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale staging file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FetchError::io(path, e)),
    }
}

/// Sequential writer over one staging file.
///
/// Bytes are written from offset 0 onwards; on [`StagingFile::finish`] the
/// file is truncated to the bytes actually written so a pre-allocated file
/// never keeps a zero-filled tail. A failed transfer calls
/// [`StagingFile::abandon`] instead, which only flushes.
struct StagingFile<'a> {
    path: &'a Path,
    writer: BufWriter<File>,
    written: u64,
    chunk_size: usize,
    total: Option<u64>,
    hook: Option<&'a UpdateHook>,
}

impl<'a> StagingFile<'a> {
    async fn open(
        path: &'a Path,
        chunk_size: usize,
        total: Option<u64>,
        hook: Option<&'a UpdateHook>,
    ) -> Result<Self, FetchError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .await
            .map_err(|e| FetchError::io(path, e))?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
            chunk_size: chunk_size.max(1),
            total,
            hook,
        })
    }

    /// Streams a response body into the file, returning the bytes appended.
    async fn write_response(&mut self, response: Response) -> Result<u64, FetchError> {
        let url = response.url().to_string();
        let mut stream = response.bytes_stream();
        let mut appended = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::network(&url, e))?;
            for piece in chunk.chunks(self.chunk_size) {
                self.writer
                    .write_all(piece)
                    .await
                    .map_err(|e| FetchError::io(self.path, e))?;
                let len = piece.len() as u64;
                appended += len;
                self.written += len;
                if let Some(hook) = self.hook {
                    hook(len, self.total);
                }
            }
        }
        Ok(appended)
    }

    /// Flushes buffered bytes after a failed transfer and leaves the file in
    /// place, pre-allocated length included.
    async fn abandon(mut self) {
        if let Err(e) = self.writer.flush().await {
            warn!(path = %self.path.display(), error = %e, "failed to flush partial staging file");
        } else {
            debug!(path = %self.path.display(), bytes = self.written, "left partial staging file");
        }
    }

    async fn finish(mut self) -> Result<u64, FetchError> {
        self.writer
            .flush()
            .await
            .map_err(|e| FetchError::io(self.path, e))?;
        let file = self.writer.into_inner();
        file.set_len(self.written)
            .await
            .map_err(|e| FetchError::io(self.path, e))?;
        Ok(self.written)
    }
}
