//! Whole-space export pipeline.
//!
//! `Requesting → LinkObtained → Downloading → Validated`, with any failure
//! ending the run for that space. Nothing is retried.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use crate::confluence::{ConfluenceApi, ExportLink};
use crate::download::{self, ProgressObserver};
use crate::error::{ExportError, Result};
use crate::format::ExportType;

const BYTES_PER_MIB: f64 = 1_048_576.0;

/// Pipeline stage, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
  Requesting,
  LinkObtained,
  Downloading,
  Validated,
}

impl fmt::Display for ExportStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      ExportStage::Requesting => "requesting",
      ExportStage::LinkObtained => "link-obtained",
      ExportStage::Downloading => "downloading",
      ExportStage::Validated => "validated",
    })
  }
}

/// Parameters for one space export.
#[derive(Debug, Clone)]
pub struct SpaceExportRequest<'a> {
  /// Space key, e.g. `CAP`.
  pub key: &'a str,
  pub export_type: ExportType,
  /// Host name used as the filename prefix.
  pub host: &'a str,
  /// Directory the artifact is written to.
  pub output_dir: &'a Path,
}

/// Outcome of a successful space export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceExport {
  pub path: PathBuf,
  pub bytes: u64,
  pub download_link: String,
}

/// Export a space and download the resulting artifact.
///
/// # Errors
/// Any API, protocol, or I/O failure, and [`ExportError::EmptyExport`] when
/// the downloaded artifact has no bytes (the empty file is removed).
pub async fn export_space(
  client: &dyn ConfluenceApi,
  request: &SpaceExportRequest<'_>,
  observer: &mut dyn ProgressObserver,
) -> Result<SpaceExport> {
  let key = request.key.trim();
  if key.is_empty() {
    return Err(ExportError::InvalidInput("a space key is required".to_string()));
  }

  tokio::fs::create_dir_all(request.output_dir)
    .await
    .map_err(|e| ExportError::io(request.output_dir, e))?;

  let started = Instant::now();
  info!("Generating {} export file for space {key}", request.export_type);
  log_stage(key, ExportStage::Requesting);

  let download_link = request_download_link(client, key, request.export_type).await?;
  debug!(elapsed_ms = started.elapsed().as_millis() as u64, "export job finished");
  info!("{key} space export download link: {download_link}");
  log_stage(key, ExportStage::LinkObtained);

  debug!("fetching space details to build the export file name");
  let space = client.get_space(key).await?;
  let filename = space_export_filename(request.host, key, &space.name, request.export_type);
  let path = request.output_dir.join(filename);
  debug!(path = %path.display(), "resolved export file path");

  info!("{key} space download starting at {}", timestamp());
  log_stage(key, ExportStage::Downloading);
  let download = client.download(&download_link).await?;
  if let Some(total) = download.content_length {
    info!("{key} space export file size: {:.2} MB", total as f64 / BYTES_PER_MIB);
  }

  let bytes = download::save_to_file(download, &path, observer).await?;
  if bytes == 0 {
    let _ = tokio::fs::remove_file(&path).await;
    return Err(ExportError::EmptyExport { key: key.to_string() });
  }

  log_stage(key, ExportStage::Validated);
  info!("{key} space download finished at {}: {}", timestamp(), path.display());
  debug!(elapsed_ms = started.elapsed().as_millis() as u64, "space export complete");

  Ok(SpaceExport {
    path,
    bytes,
    download_link,
  })
}

async fn request_download_link(client: &dyn ConfluenceApi, key: &str, export_type: ExportType) -> Result<String> {
  match export_type.rpc_kind() {
    Some(kind) => {
      debug!("requesting {export_type} export via the JSON-RPC API");
      let raw = client.export_space(key, kind).await?;
      debug!(raw = %raw, "raw export response");
      decode_export_link(&raw)
    }
    None => {
      debug!("requesting PDF export via the SOAP plugin");
      client.export_space_to_pdf(key).await
    }
  }
}

/// Decode the JSON-RPC export response into a download URL.
///
/// The body is a JSON value holding either `{"downloadLink": ...}` or a bare
/// string; some servers encode the object a second time inside the string.
///
/// # Errors
/// [`ExportError::Decode`] when the body is not JSON and
/// [`ExportError::Protocol`] when the link is empty.
pub fn decode_export_link(raw: &str) -> Result<String> {
  let link: ExportLink = serde_json::from_str(raw.trim()).map_err(|source| ExportError::Decode {
    what: "export response",
    source,
  })?;
  let mut url = link.into_url();

  if let Ok(inner) = serde_json::from_str::<ExportLink>(&url) {
    url = inner.into_url();
  }

  let url = url.trim().to_string();
  if url.is_empty() {
    return Err(ExportError::Protocol("export response contained an empty download link".to_string()));
  }
  Ok(url)
}

/// `<host>-<key>-<space_name>.<suffix>` with every non-alphanumeric
/// character of the space name replaced by `_`.
pub fn space_export_filename(host: &str, key: &str, space_name: &str, export_type: ExportType) -> String {
  let name: String = space_name
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
    .collect();
  format!("{host}-{key}-{name}.{}", export_type.space_file_suffix())
}

fn log_stage(key: &str, stage: ExportStage) {
  debug!(space = key, %stage, "space export stage");
}

fn timestamp() -> String {
  chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
