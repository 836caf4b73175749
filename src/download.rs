//! Streaming downloads of export artifacts.
//!
//! A [`Download`] is an open HTTP response body. [`save_to_file`] drains it
//! into a file chunk by chunk, reporting [`DownloadProgress`] to a
//! [`ProgressObserver`] after every chunk. The file handle is owned by the
//! transfer and is closed on every exit path; a failed transfer removes the
//! partial file.

use std::path::Path;
use std::time::Instant;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, trace};

use crate::error::{ExportError, Result};

/// An in-flight HTTP response body.
pub struct Download {
  /// Value of the `content-length` header, when the server sent one.
  pub content_length: Option<u64>,
  /// Response body chunks in arrival order.
  pub body: BoxStream<'static, Result<Bytes>>,
}

impl Download {
  /// Build a download from in-memory chunks.
  pub fn from_chunks(chunks: Vec<Bytes>, content_length: Option<u64>) -> Self {
    Self {
      content_length,
      body: futures::stream::iter(chunks.into_iter().map(Ok)).boxed(),
    }
  }
}

/// Byte counters for one transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadProgress {
  pub received: u64,
  pub total: Option<u64>,
}

impl DownloadProgress {
  /// Percentage of `total` received so far; `None` while the total is unknown
  /// or zero.
  pub fn percentage(&self) -> Option<f64> {
    match self.total {
      Some(total) if total > 0 => Some(self.received as f64 * 100.0 / total as f64),
      _ => None,
    }
  }
}

/// Receives progress notifications during a transfer.
pub trait ProgressObserver: Send {
  /// Called once the response headers are known.
  fn started(&mut self, _total: Option<u64>) {}

  /// Called after every chunk has been written.
  fn advanced(&mut self, progress: &DownloadProgress);

  /// Called when the body has been fully written.
  fn finished(&mut self, _progress: &DownloadProgress) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
  fn advanced(&mut self, _progress: &DownloadProgress) {}
}

/// Stream `download` into a new file at `path`.
///
/// # Returns
/// The number of bytes written.
///
/// # Errors
/// I/O errors creating or writing the file, transport errors while reading
/// the body, and [`ExportError::Incomplete`] when fewer bytes than the
/// advertised `content-length` arrived. The partial file is removed on error.
pub async fn save_to_file(download: Download, path: &Path, observer: &mut dyn ProgressObserver) -> Result<u64> {
  let started = Instant::now();
  let file = File::create(path).await.map_err(|e| ExportError::io(path, e))?;

  let result = stream_into(file, download, path, observer).await;

  match &result {
    Ok(received) => debug!(
      path = %path.display(),
      bytes = received,
      elapsed_ms = started.elapsed().as_millis() as u64,
      "download complete"
    ),
    Err(_) => {
      debug!(path = %path.display(), "removing partial download after error");
      let _ = tokio::fs::remove_file(path).await;
    }
  }

  result
}

async fn stream_into(file: File, download: Download, path: &Path, observer: &mut dyn ProgressObserver) -> Result<u64> {
  let Download { content_length, mut body } = download;
  let mut writer = BufWriter::new(file);
  let mut progress = DownloadProgress {
    received: 0,
    total: content_length,
  };

  observer.started(content_length);

  while let Some(chunk) = body.next().await {
    let chunk = chunk?;
    writer.write_all(&chunk).await.map_err(|e| ExportError::io(path, e))?;

    progress.received += chunk.len() as u64;
    trace!(received = progress.received, total = ?progress.total, "chunk written");
    observer.advanced(&progress);
  }

  writer.flush().await.map_err(|e| ExportError::io(path, e))?;
  writer
    .into_inner()
    .sync_all()
    .await
    .map_err(|e| ExportError::io(path, e))?;

  if let Some(expected) = content_length
    && progress.received < expected
  {
    return Err(ExportError::Incomplete {
      path: path.to_path_buf(),
      expected,
      received: progress.received,
    });
  }

  observer.finished(&progress);
  Ok(progress.received)
}
