//! Export format definitions and utilities.

use std::fmt;
use std::str::FromStr;

use crate::confluence::rpc::RpcExportKind;
use crate::error::ExportError;

/// Artifact types a space can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportType {
  /// Full XML backup archive (zip)
  Xml,
  /// Static HTML site archive (zip)
  Html,
  /// Single PDF document
  Pdf,
}

impl ExportType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ExportType::Xml => "xml",
      ExportType::Html => "html",
      ExportType::Pdf => "pdf",
    }
  }

  /// File suffix for a space export of this type (`xml.zip`, `html.zip`, `pdf`).
  pub fn space_file_suffix(&self) -> &'static str {
    match self {
      ExportType::Xml => "xml.zip",
      ExportType::Html => "html.zip",
      ExportType::Pdf => "pdf",
    }
  }

  /// JSON-RPC export kind; `None` for PDF, which goes through SOAP.
  pub fn rpc_kind(&self) -> Option<RpcExportKind> {
    match self {
      ExportType::Xml => Some(RpcExportKind::Xml),
      ExportType::Html => Some(RpcExportKind::Html),
      ExportType::Pdf => None,
    }
  }
}

impl FromStr for ExportType {
  type Err = ExportError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "xml" => Ok(ExportType::Xml),
      "html" => Ok(ExportType::Html),
      "pdf" => Ok(ExportType::Pdf),
      other => Err(ExportError::InvalidInput(format!(
        "the export file type can only be xml, html or pdf (got {other:?})"
      ))),
    }
  }
}

impl fmt::Display for ExportType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Formats supported when exporting individual pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
  /// One `index.html` per page.
  Html,
  /// One `<title>-<id>.pdf` per page.
  Pdf,
}

impl TryFrom<ExportType> for PageFormat {
  type Error = ExportError;

  fn try_from(value: ExportType) -> Result<Self, Self::Error> {
    match value {
      ExportType::Html => Ok(PageFormat::Html),
      ExportType::Pdf => Ok(PageFormat::Pdf),
      ExportType::Xml => Err(ExportError::InvalidInput(
        "individual page export only supports html or pdf output types".to_string(),
      )),
    }
  }
}
