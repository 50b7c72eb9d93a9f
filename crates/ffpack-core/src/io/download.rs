//! Source archive download with pipelined extraction.
//!
//! The tarball is streamed once: every chunk is written to the archive file,
//! fed to a SHA-256 hasher, and pushed through a channel into a gzip/tar
//! extractor running on its own task. Extraction finishes moments after the
//! last byte arrives. Both land in a staging directory first.

use std::path::{Path, PathBuf};

use async_compression::tokio::bufread::GzipDecoder;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_tar::Archive;
use tokio_util::io::StreamReader;

use crate::Reporter;
use crate::paths::{Layout, filename_from_url};

/// Failure obtaining the source tree.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request failed or the server answered with a non-success status.
    #[error("HTTP error")]
    Http(#[from] reqwest::Error),

    /// Writing the archive to disk failed.
    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// The archive could not be unpacked, or did not contain the expected tree.
    #[error("Extraction failed: {0}")]
    Extract(String),
}

/// What [`fetch_source`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The source tree already existed; nothing was downloaded.
    AlreadyPresent(PathBuf),
    /// The archive was downloaded and extracted.
    Downloaded {
        /// Extracted source tree.
        source_dir: PathBuf,
        /// Downloaded archive, kept for inspection.
        archive: PathBuf,
        /// Hex SHA-256 of the archive.
        sha256: String,
        /// Archive size in bytes.
        size: u64,
    },
}

impl FetchOutcome {
    /// Extracted source tree, regardless of how it got there.
    pub fn source_dir(&self) -> &Path {
        match self {
            Self::AlreadyPresent(dir) | Self::Downloaded { source_dir: dir, .. } => dir,
        }
    }
}

/// Ensure the FFmpeg source tree for `layout` exists.
///
/// If `build/ffmpeg-<v>` is already a directory this returns immediately
/// without touching the network.
///
/// Otherwise the archive is downloaded and unpacked inside a staging
/// directory under `build/`. The tree and the archive are moved into place
/// only after both the download and the extraction have finished, so an
/// interrupted run never leaves a partial `build/ffmpeg-<v>` behind.
///
/// # Errors
///
/// Returns [`FetchError`] if the download, the archive write, or the
/// extraction fails.
pub async fn fetch_source<R: Reporter + ?Sized>(
    client: &Client,
    layout: &Layout,
    reporter: &R,
) -> Result<FetchOutcome, FetchError> {
    let source_dir = layout.source_dir();
    if source_dir.is_dir() {
        tracing::info!(path = %source_dir.display(), "source tree present, skipping download");
        return Ok(FetchOutcome::AlreadyPresent(source_dir));
    }

    let work_dir = layout.work_dir();
    tokio::fs::create_dir_all(&work_dir).await?;

    let url = layout.source_url();
    let archive_name = filename_from_url(&url);
    tracing::info!(%url, "downloading FFmpeg sources");

    let response = client
        .get(&url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    // Removed on drop, taking any partial download or extraction with it.
    let staging = tempfile::Builder::new()
        .prefix(".fetch-")
        .tempdir_in(&work_dir)?;
    let staged_archive = staging.path().join(archive_name);

    // Channel for pipelined extraction
    let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(32);
    let stream_reader = StreamReader::new(ReceiverStream::new(rx));

    let extract_dest = staging.path().to_path_buf();
    let extractor_handle = tokio::spawn(async move {
        let decoder = GzipDecoder::new(stream_reader);
        let mut archive = Archive::new(decoder);
        archive.unpack(&extract_dest).await
    });

    let streamed = stream_archive(response, &staged_archive, &tx, reporter).await;
    // Closing the channel ends the extractor's input either way.
    drop(tx);
    let extracted = extractor_handle.await.unwrap_or_else(|e| Err(std::io::Error::other(e)));

    let (sha256, size) = streamed?;
    tracing::debug!(%sha256, bytes = size, "archive downloaded");
    extracted.map_err(|e| FetchError::Extract(e.to_string()))?;

    let staged_tree = staging.path().join(layout.source_dir_name());
    if !staged_tree.is_dir() {
        return Err(FetchError::Extract(format!(
            "{archive_name} did not contain {}/",
            layout.source_dir_name()
        )));
    }

    let archive_path = layout.archive_path();
    tokio::fs::rename(&staged_tree, &source_dir).await?;
    tokio::fs::rename(&staged_archive, &archive_path).await?;
    tracing::debug!(archive = %archive_path.display(), "source tree in place");

    Ok(FetchOutcome::Downloaded {
        source_dir,
        archive: archive_path,
        sha256,
        size,
    })
}

/// Write the response body to `archive_path`, hashing it and forwarding
/// every chunk to the extractor. Returns the hex SHA-256 and byte count.
async fn stream_archive<R: Reporter + ?Sized>(
    response: reqwest::Response,
    archive_path: &Path,
    tx: &mpsc::Sender<Result<Bytes, std::io::Error>>,
    reporter: &R,
) -> Result<(String, u64), FetchError> {
    let total_size = response.content_length();
    reporter.downloading(0, total_size);

    let mut stream = response.bytes_stream();
    let mut file = File::create(archive_path).await?;
    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;

    while let Some(chunk_res) = stream.next().await {
        let chunk = chunk_res?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);

        downloaded += chunk.len() as u64;
        reporter.downloading(downloaded, total_size);

        if tx.send(Ok(chunk)).await.is_err() {
            // Extractor is gone; its own error is reported by the caller.
            break;
        }
    }

    file.flush().await?;
    Ok((hex::encode(hasher.finalize()), downloaded))
}
