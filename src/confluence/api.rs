//! Trait definitions for interacting with Confluence.

use async_trait::async_trait;

use super::models::{Page, Space};
use super::rpc::RpcExportKind;
use crate::download::Download;
use crate::error::Result;

/// Expansion used when resolving the page an export starts from.
pub const EXPAND_PAGE: &str = "space,body.export_view,ancestors";
/// Expansion used when listing child pages during a recursive export.
pub const EXPAND_CHILDREN: &str = "space,body.export_view";
/// Page size for child page listings.
pub const DEFAULT_CHILD_LIMIT: usize = 25;

/// Confluence operations used by the export pipelines (enables testing with
/// fake implementations).
///
/// Every method makes its remote calls sequentially and exactly once; nothing
/// is retried.
#[async_trait]
pub trait ConfluenceApi: Send + Sync {
  /// Fetch a space by key.
  ///
  /// # Errors
  /// [`crate::ExportError::NotFound`] if the key does not exist.
  async fn get_space(&self, key: &str) -> Result<Space>;

  /// Fetch a page by numeric ID, optionally expanding nested fields.
  ///
  /// # Errors
  /// [`crate::ExportError::NotFound`] on HTTP 404, otherwise a transport or
  /// status error.
  async fn get_page_by_id(&self, id: &str, expand: Option<&str>) -> Result<Page>;

  /// Search pages by exact title. An empty vector means no match.
  async fn find_pages_by_title(
    &self,
    title: &str,
    space_key: Option<&str>,
    expand: Option<&str>,
    limit: Option<usize>,
  ) -> Result<Vec<Page>>;

  /// All direct children of a page, following pagination until the service
  /// stops advertising a `next` link.
  async fn get_child_pages(&self, id: &str, expand: Option<&str>, limit: usize) -> Result<Vec<Page>>;

  /// Every space visible to the authenticated user, de-paginated.
  async fn get_all_spaces(&self, limit: usize, expand: Option<&str>, space_type: Option<&str>) -> Result<Vec<Space>>;

  /// Mark a space as archived through the JSON-RPC interface. Returns the raw
  /// response body.
  async fn archive_space(&self, key: &str) -> Result<String>;

  /// Start a space export job through the JSON-RPC interface.
  ///
  /// # Returns
  /// The raw response body, itself a JSON document describing the download
  /// link.
  async fn export_space(&self, key: &str, kind: RpcExportKind) -> Result<String>;

  /// [`ConfluenceApi::export_space`] fixed to the XML archive format.
  async fn export_space_to_xml(&self, key: &str) -> Result<String> {
    self.export_space(key, RpcExportKind::Xml).await
  }

  /// [`ConfluenceApi::export_space`] fixed to the HTML archive format.
  async fn export_space_to_html(&self, key: &str) -> Result<String> {
    self.export_space(key, RpcExportKind::Html).await
  }

  /// Log in to the PDF export SOAP plugin and return the session token.
  ///
  /// # Errors
  /// [`crate::ExportError::Protocol`] when the response carries no token.
  async fn plugin_login(&self) -> Result<String>;

  /// Export a space to PDF through the SOAP plugin (logs in first) and return
  /// the download link.
  async fn export_space_to_pdf(&self, key: &str) -> Result<String>;

  /// Open a streaming download of an export artifact. Relative links are
  /// resolved against the instance base URL.
  ///
  /// # Errors
  /// A status error when the response is not successful; no body is read in
  /// that case.
  async fn download(&self, link: &str) -> Result<Download>;

  /// Open a streaming download of a single page rendered to PDF.
  async fn download_page_pdf(&self, page_id: &str) -> Result<Download>;
}
