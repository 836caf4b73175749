//! Error taxonomy shared by the API client and the export pipelines.
//!
//! Every remote failure is normalized into [`ExportError`] so callers can
//! branch on the HTTP status (see [`ExportError::status`]) without caring
//! whether the failure came from the REST, JSON-RPC, or SOAP interfaces.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T, E = ExportError> = std::result::Result<T, E>;

/// A page candidate reported when a title lookup matches more than one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCandidate {
  pub id: String,
  pub title: String,
}

/// Errors produced while talking to Confluence or writing exports to disk.
#[derive(Debug, Error)]
pub enum ExportError {
  /// Network-level failure (DNS, connection reset, TLS, timeout, ...).
  #[error("request to {url} failed: {source}")]
  Transport {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  /// Non-2xx response other than 404.
  #[error("Confluence returned HTTP {status} for {url}: {message}")]
  HttpStatus { url: String, status: u16, message: String },

  /// HTTP 404.
  #[error("resource not found: {url}")]
  NotFound { url: String },

  /// A legacy SOAP response did not contain the expected element.
  #[error("unexpected response from legacy endpoint: {0}")]
  Protocol(String),

  /// A response body could not be decoded.
  #[error("failed to decode {what}: {source}")]
  Decode {
    what: &'static str,
    #[source]
    source: serde_json::Error,
  },

  /// Bad export type, empty identifier, malformed page hierarchy, ...
  #[error("{0}")]
  InvalidInput(String),

  /// Title-based page lookup without a space key.
  #[error("a space key is required when selecting a page by title (\"{title}\")")]
  MissingSpaceKey { title: String },

  /// The requested page does not exist.
  #[error("{0}")]
  PageNotFound(String),

  /// More than one page matched a title lookup.
  #[error("multiple pages titled \"{title}\" were found in space {space_key}; use a page ID instead")]
  AmbiguousPage {
    title: String,
    space_key: String,
    candidates: Vec<PageCandidate>,
  },

  /// The finished download contained no bytes.
  #[error("export of {key} is empty (0 bytes downloaded); is the space empty?")]
  EmptyExport { key: String },

  /// The transfer ended before `content-length` bytes arrived.
  #[error("download to {path} is incomplete: expected {expected} bytes, received {received}")]
  Incomplete { path: PathBuf, expected: u64, received: u64 },

  /// One or more required connection settings are absent.
  #[error("missing required connection settings: {}", missing.join(", "))]
  MissingConfig { missing: Vec<&'static str> },

  /// Local filesystem failure.
  #[error("I/O error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl ExportError {
  /// HTTP status code carried by the error, when one is known.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::HttpStatus { status, .. } => Some(*status),
      Self::NotFound { .. } => Some(404),
      Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
      _ => None,
    }
  }

  /// Whether this error represents an HTTP 404.
  pub fn is_not_found(&self) -> bool {
    self.status() == Some(404)
  }

  pub(crate) fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
    Self::Transport {
      url: url.into(),
      source,
    }
  }

  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }

  /// Build the error for a non-success HTTP status.
  pub(crate) fn from_status(url: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
    let url = url.into();
    if status == 404 {
      Self::NotFound { url }
    } else {
      Self::HttpStatus {
        url,
        status,
        message: message.into(),
      }
    }
  }
}
