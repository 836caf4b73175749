//! Fake Confluence API client for testing
//!
//! This module provides a stub implementation of the Confluence API that
//! returns predefined responses without making any network requests. Every
//! call is recorded so tests can assert on what the pipelines asked for.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use confluence_export::confluence::rpc::RpcExportKind;
use confluence_export::confluence::{ConfluenceApi, Page, Space};
use confluence_export::download::Download;
use confluence_export::{ExportError, Result};

use crate::common::fixtures;

/// A fake Confluence client that returns predefined responses for testing
#[derive(Default)]
pub struct FakeConfluenceClient {
  pages: Vec<Page>,
  child_pages: HashMap<String, Vec<String>>,
  children_not_found: HashSet<String>,
  spaces: Vec<Space>,
  export_responses: HashMap<String, String>,
  pdf_links: HashMap<String, String>,
  downloads: HashMap<String, (Vec<Bytes>, Option<u64>)>,
  failing_downloads: HashMap<String, u16>,
  page_pdfs: HashMap<String, Vec<u8>>,
  calls: Mutex<Vec<String>>,
}

impl FakeConfluenceClient {
  /// Create a new fake client with no data
  pub fn new() -> Self {
    Self::default()
  }

  /// A page tree rooted at "Release Notes": children A and B, B has child C.
  pub fn with_page_tree() -> Self {
    let mut client = Self::new();
    client.add_page_from_json(fixtures::release_notes_page());
    client.add_page_from_json(fixtures::child_a_page());
    client.add_page_from_json(fixtures::child_b_page());
    client.add_page_from_json(fixtures::grandchild_c_page());
    client.add_child_pages("1001", &["1002", "1003"]);
    client.add_child_pages("1003", &["1004"]);
    client
  }

  /// Add a page from a JSON value
  pub fn add_page_from_json(&mut self, json: serde_json::Value) {
    if let Ok(page) = serde_json::from_value::<Page>(json) {
      self.pages.push(page);
    }
  }

  /// Add child pages for a parent page, in listing order
  pub fn add_child_pages(&mut self, parent_id: &str, child_ids: &[&str]) {
    self
      .child_pages
      .insert(parent_id.to_string(), child_ids.iter().map(|id| id.to_string()).collect());
  }

  /// Make the child listing of `page_id` answer 404
  pub fn fail_children_with_not_found(&mut self, page_id: &str) {
    self.children_not_found.insert(page_id.to_string());
  }

  pub fn add_space_from_json(&mut self, json: serde_json::Value) {
    if let Ok(space) = serde_json::from_value::<Space>(json) {
      self.spaces.push(space);
    }
  }

  /// Raw JSON-RPC `exportSpace` response body for a space key
  pub fn set_export_response(&mut self, key: &str, body: impl Into<String>) {
    self.export_responses.insert(key.to_string(), body.into());
  }

  /// Download link returned by the SOAP PDF export for a space key
  pub fn set_pdf_link(&mut self, key: &str, link: &str) {
    self.pdf_links.insert(key.to_string(), link.to_string());
  }

  /// Body served for a download link
  pub fn add_download(&mut self, link: &str, chunks: Vec<Bytes>, content_length: Option<u64>) {
    self.downloads.insert(link.to_string(), (chunks, content_length));
  }

  /// Make a download link answer with a non-success status
  pub fn fail_download(&mut self, link: &str, status: u16) {
    self.failing_downloads.insert(link.to_string(), status);
  }

  /// PDF bytes served for a page
  pub fn add_page_pdf(&mut self, page_id: &str, pdf: &[u8]) {
    self.page_pdfs.insert(page_id.to_string(), pdf.to_vec());
  }

  /// Every API call made so far, as `method:argument`
  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
  }

  fn record(&self, call: String) {
    if let Ok(mut calls) = self.calls.lock() {
      calls.push(call);
    }
  }

  fn find_page(&self, id: &str) -> Option<&Page> {
    self.pages.iter().find(|page| page.id == id)
  }
}

fn not_found(url: String) -> ExportError {
  ExportError::NotFound { url }
}

#[async_trait]
impl ConfluenceApi for FakeConfluenceClient {
  async fn get_space(&self, key: &str) -> Result<Space> {
    self.record(format!("get_space:{key}"));
    self
      .spaces
      .iter()
      .find(|space| space.key == key)
      .cloned()
      .ok_or_else(|| not_found(format!("/rest/api/space/{key}")))
  }

  async fn get_page_by_id(&self, id: &str, _expand: Option<&str>) -> Result<Page> {
    self.record(format!("get_page_by_id:{id}"));
    self
      .find_page(id)
      .cloned()
      .ok_or_else(|| not_found(format!("/rest/api/content/{id}")))
  }

  async fn find_pages_by_title(
    &self,
    title: &str,
    space_key: Option<&str>,
    _expand: Option<&str>,
    _limit: Option<usize>,
  ) -> Result<Vec<Page>> {
    self.record(format!("find_pages_by_title:{title}"));
    Ok(
      self
        .pages
        .iter()
        .filter(|page| page.title == title)
        .filter(|page| space_key.is_none() || page.space_key() == space_key)
        .cloned()
        .collect(),
    )
  }

  async fn get_child_pages(&self, id: &str, _expand: Option<&str>, _limit: usize) -> Result<Vec<Page>> {
    self.record(format!("get_child_pages:{id}"));
    if self.children_not_found.contains(id) {
      return Err(not_found(format!("/rest/api/content/{id}/child/page")));
    }

    let child_ids = self.child_pages.get(id).cloned().unwrap_or_default();
    Ok(
      child_ids
        .iter()
        .filter_map(|child_id| self.find_page(child_id).cloned())
        .collect(),
    )
  }

  async fn get_all_spaces(&self, _limit: usize, _expand: Option<&str>, space_type: Option<&str>) -> Result<Vec<Space>> {
    self.record("get_all_spaces".to_string());
    Ok(
      self
        .spaces
        .iter()
        .filter(|space| space_type.is_none_or(|t| space.space_type == t))
        .cloned()
        .collect(),
    )
  }

  async fn archive_space(&self, key: &str) -> Result<String> {
    self.record(format!("archive_space:{key}"));
    Ok("true".to_string())
  }

  async fn export_space(&self, key: &str, kind: RpcExportKind) -> Result<String> {
    self.record(format!("export_space:{key}:{}", kind.as_rpc_str()));
    self
      .export_responses
      .get(key)
      .cloned()
      .ok_or_else(|| ExportError::HttpStatus {
        url: "/rpc/json-rpc/confluenceservice-v2/exportSpace".to_string(),
        status: 500,
        message: format!("no export configured for {key}"),
      })
  }

  async fn plugin_login(&self) -> Result<String> {
    self.record("plugin_login".to_string());
    Ok("fake-token".to_string())
  }

  async fn export_space_to_pdf(&self, key: &str) -> Result<String> {
    self.plugin_login().await?;
    self.record(format!("export_space_to_pdf:{key}"));
    self
      .pdf_links
      .get(key)
      .cloned()
      .ok_or_else(|| ExportError::Protocol("response does not contain a <exportSpaceReturn> value".to_string()))
  }

  async fn download(&self, link: &str) -> Result<Download> {
    self.record(format!("download:{link}"));
    if let Some(status) = self.failing_downloads.get(link) {
      return Err(ExportError::HttpStatus {
        url: link.to_string(),
        status: *status,
        message: "Internal Server Error".to_string(),
      });
    }

    let (chunks, content_length) = self
      .downloads
      .get(link)
      .cloned()
      .ok_or_else(|| not_found(link.to_string()))?;
    Ok(Download::from_chunks(chunks, content_length))
  }

  async fn download_page_pdf(&self, page_id: &str) -> Result<Download> {
    self.record(format!("download_page_pdf:{page_id}"));
    let pdf = self
      .page_pdfs
      .get(page_id)
      .cloned()
      .ok_or_else(|| not_found(format!("/spaces/flyingpdf/pdfpageexport.action?pageId={page_id}")))?;
    let length = pdf.len() as u64;
    Ok(Download::from_chunks(vec![Bytes::from(pdf)], Some(length)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_fake_client_empty() {
    let client = FakeConfluenceClient::new();
    let error = client.get_page_by_id("123456", None).await.unwrap_err();
    assert!(error.is_not_found());
  }

  #[tokio::test]
  async fn test_fake_client_page_tree() {
    let client = FakeConfluenceClient::with_page_tree();

    let root = client.get_page_by_id("1001", None).await.unwrap();
    assert_eq!(root.title, "Release Notes");

    let children = client.get_child_pages("1001", None, 25).await.unwrap();
    let titles: Vec<&str> = children.iter().map(|page| page.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B"]);

    assert_eq!(
      client.calls(),
      vec!["get_page_by_id:1001".to_string(), "get_child_pages:1001".to_string()]
    );
  }

  #[tokio::test]
  async fn test_fake_client_children_not_found() {
    let mut client = FakeConfluenceClient::with_page_tree();
    client.fail_children_with_not_found("1003");
    assert!(client.get_child_pages("1003", None, 25).await.unwrap_err().is_not_found());
  }
}
