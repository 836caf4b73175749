//! HTTP client implementation for the Confluence REST, JSON-RPC and SOAP
//! interfaces.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::StreamExt;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::api::ConfluenceApi;
use super::models::{Page, PagedResponse, Space};
use super::rpc::{self, RpcExportKind};
use crate::config::ConnectionConfig;
use crate::download::Download;
use crate::error::{ExportError, Result};

/// Timeout for calls that start long-running export jobs on the server.
pub const EXPORT_TIMEOUT: Duration = Duration::from_secs(600);

/// Longest error body excerpt carried in an [`ExportError::HttpStatus`].
const ERROR_EXCERPT_CHARS: usize = 300;

/// Confluence API client bound to a single instance and user.
pub struct ConfluenceClient {
  config: ConnectionConfig,
  base_url: String,
  client: reqwest::Client,
  timeout: Duration,
}

impl ConfluenceClient {
  /// Create a new Confluence client.
  ///
  /// # Arguments
  /// * `config` - Validated connection settings; owned by the client.
  /// * `timeout_secs` - Connect timeout and total timeout for API calls, in
  ///   seconds. Export-job calls use [`EXPORT_TIMEOUT`] instead. Downloads
  ///   are only bounded by the connect timeout, so large archives can stream
  ///   for as long as they need.
  ///
  /// # Errors
  /// Returns an error if the underlying `reqwest::Client` cannot be built.
  pub fn new(config: ConnectionConfig, timeout_secs: u64) -> Result<Self> {
    let base_url = config.base_url();
    Self::with_base_url(config, base_url, timeout_secs)
  }

  /// Like [`ConfluenceClient::new`] but talking to an explicit base URL
  /// instead of the one derived from `config` (useful behind proxies and in
  /// tests).
  pub fn with_base_url(config: ConnectionConfig, base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
    let base_url = base_url.into().trim_end_matches('/').to_string();
    let timeout = Duration::from_secs(timeout_secs);

    let client = reqwest::Client::builder()
      .connect_timeout(timeout)
      .user_agent(format!(
        "confluence-export/{} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("TARGET")
      ))
      .build()
      .map_err(|e| ExportError::transport(&base_url, e))?;

    debug!(base_url = %base_url, username = %config.username, timeout_secs, "initialized Confluence client");

    Ok(Self {
      config,
      base_url,
      client,
      timeout,
    })
  }

  /// Connection settings the client was built from.
  pub fn config(&self) -> &ConnectionConfig {
    &self.config
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// Get the authorization header value (Basic auth).
  fn auth_header(&self) -> String {
    let credentials = format!("{}:{}", self.config.username, self.config.password);
    format!("Basic {}", BASE64.encode(credentials.as_bytes()))
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  /// Turn a link returned by the server into an absolute URL.
  fn resolve_link(&self, link: &str) -> String {
    let link = link.trim();
    if link.starts_with("http://") || link.starts_with("https://") {
      return link.to_string();
    }

    if link.starts_with('/') {
      return format!("{}{}", self.base_url, link);
    }

    format!("{}/{}", self.base_url, link)
  }

  fn request(&self, method: Method, url: &str) -> RequestBuilder {
    self
      .client
      .request(method, url)
      .header("Authorization", self.auth_header())
  }

  /// Send a request, logging it without credentials, and normalize every
  /// failure into an [`ExportError`].
  async fn send(&self, builder: RequestBuilder) -> Result<Response> {
    let request = builder
      .build()
      .map_err(|e| ExportError::transport(&self.base_url, e))?;
    let url = request.url().to_string();

    debug!(
      method = %request.method(),
      url = %url,
      headers = ?request.headers().keys().map(|name| name.as_str()).collect::<Vec<_>>(),
      has_body = request.body().is_some(),
      "sending request to Confluence"
    );

    let started = Instant::now();
    let response = self
      .client
      .execute(request)
      .await
      .map_err(|e| ExportError::transport(&url, e))?;

    let status = response.status();
    debug!(
      url = %url,
      status = status.as_u16(),
      content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown"),
      elapsed_ms = started.elapsed().as_millis() as u64,
      "received response from Confluence"
    );

    if !status.is_success() {
      let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("(no error details)"));
      let excerpt: String = error_text.trim().chars().take(ERROR_EXCERPT_CHARS).collect();
      return Err(ExportError::from_status(url, status.as_u16(), excerpt));
    }

    Ok(response)
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)], what: &'static str) -> Result<T> {
    let url = self.endpoint(path);
    let builder = self
      .request(Method::GET, &url)
      .header("Accept", "application/json")
      .query(query)
      .timeout(self.timeout);
    let response = self.send(builder).await?;

    let body = response
      .bytes()
      .await
      .map_err(|e| ExportError::transport(&url, e))?;
    serde_json::from_slice(&body).map_err(|source| ExportError::Decode { what, source })
  }

  async fn post_text(&self, path: &str, content_type: &str, body: String, soap: bool) -> Result<String> {
    self.post_text_with_timeout(path, content_type, body, soap, None).await
  }

  async fn post_text_with_timeout(
    &self,
    path: &str,
    content_type: &str,
    body: String,
    soap: bool,
    timeout: Option<Duration>,
  ) -> Result<String> {
    let url = self.endpoint(path);
    let mut builder = self
      .request(Method::POST, &url)
      .header("Content-Type", content_type)
      .body(body);
    if soap {
      builder = builder.header("SOAPAction", "");
    }
    builder = builder.timeout(timeout.unwrap_or(self.timeout));

    let response = self.send(builder).await?;
    response.text().await.map_err(|e| ExportError::transport(&url, e))
  }

  /// Walk a `start`/`limit` paginated collection until the service stops
  /// advertising a `next` link.
  ///
  /// A page that comes back empty ends the walk even if `next` is present, so
  /// an inconsistent server cannot keep us looping.
  async fn paginate<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
    limit: usize,
    what: &'static str,
  ) -> Result<Vec<T>> {
    if limit == 0 {
      return Err(ExportError::InvalidInput("pagination limit must be at least 1".to_string()));
    }

    let mut items = Vec::new();
    let mut start = 0usize;

    loop {
      let mut page_query = query.to_vec();
      page_query.push(("limit", limit.to_string()));
      page_query.push(("start", start.to_string()));

      let page: PagedResponse<T> = self.get_json(path, &page_query, what).await?;
      let received = page.results.len();
      let has_next = page.has_next();
      items.extend(page.results);

      debug!(path, start, retrieved = received, has_next, "received {what} page");

      if !has_next {
        break;
      }
      if received == 0 {
        warn!(path, start, "Confluence advertised more {what} but returned an empty page; stopping");
        break;
      }
      start += limit;
    }

    Ok(items)
  }

  /// Start a streaming GET. No total timeout applies here.
  async fn open_download(&self, url: String, accept: Option<&str>) -> Result<Download> {
    let mut builder = self.request(Method::GET, &url);
    if let Some(accept) = accept {
      builder = builder.header("Accept", accept);
    }

    let response = self.send(builder).await?;
    let content_length = response.content_length();
    let body = response
      .bytes_stream()
      .map(move |chunk| chunk.map_err(|e| ExportError::transport(&url, e)))
      .boxed();

    Ok(Download { content_length, body })
  }
}

fn optional_param(query: &mut Vec<(&'static str, String)>, name: &'static str, value: Option<&str>) {
  if let Some(value) = value.filter(|v| !v.is_empty()) {
    query.push((name, value.to_string()));
  }
}

#[async_trait]
impl ConfluenceApi for ConfluenceClient {
  async fn get_space(&self, key: &str) -> Result<Space> {
    self.get_json(&format!("/rest/api/space/{key}"), &[], "space").await
  }

  async fn get_page_by_id(&self, id: &str, expand: Option<&str>) -> Result<Page> {
    let mut query = Vec::new();
    optional_param(&mut query, "expand", expand);
    self.get_json(&format!("/rest/api/content/{id}"), &query, "page").await
  }

  async fn find_pages_by_title(
    &self,
    title: &str,
    space_key: Option<&str>,
    expand: Option<&str>,
    limit: Option<usize>,
  ) -> Result<Vec<Page>> {
    let mut query = vec![("title", title.to_string()), ("type", "page".to_string())];
    optional_param(&mut query, "spaceKey", space_key);
    optional_param(&mut query, "expand", expand);
    if let Some(limit) = limit {
      query.push(("limit", limit.to_string()));
    }

    let response: PagedResponse<Page> = self.get_json("/rest/api/content", &query, "page search").await?;
    Ok(response.results)
  }

  async fn get_child_pages(&self, id: &str, expand: Option<&str>, limit: usize) -> Result<Vec<Page>> {
    let mut query = Vec::new();
    optional_param(&mut query, "expand", expand);
    self
      .paginate(&format!("/rest/api/content/{id}/child/page"), &query, limit, "child pages")
      .await
  }

  async fn get_all_spaces(&self, limit: usize, expand: Option<&str>, space_type: Option<&str>) -> Result<Vec<Space>> {
    debug!(limit, expand, space_type, "fetching Confluence spaces");
    let mut query = Vec::new();
    optional_param(&mut query, "type", space_type);
    optional_param(&mut query, "expand", expand);
    self.paginate("/rest/api/space", &query, limit, "spaces").await
  }

  async fn archive_space(&self, key: &str) -> Result<String> {
    self
      .post_text(
        rpc::SET_SPACE_STATUS_PATH,
        "application/json",
        rpc::archive_space_body(key),
        false,
      )
      .await
  }

  async fn export_space(&self, key: &str, kind: RpcExportKind) -> Result<String> {
    self
      .post_text_with_timeout(
        rpc::EXPORT_SPACE_PATH,
        "application/json",
        rpc::export_space_body(key, kind),
        false,
        Some(EXPORT_TIMEOUT),
      )
      .await
  }

  async fn plugin_login(&self) -> Result<String> {
    debug!("authenticating via the PDF export plugin");
    let envelope = rpc::login_envelope(&self.config.username, &self.config.password);
    let body = self
      .post_text(rpc::PDF_EXPORT_SOAP_PATH, "text/html", envelope, true)
      .await?;
    let token = rpc::extract_login_token(&body)?;
    debug!("PDF export plugin token retrieved");
    Ok(token)
  }

  async fn export_space_to_pdf(&self, key: &str) -> Result<String> {
    let token = self.plugin_login().await?;
    let envelope = rpc::export_space_pdf_envelope(&token, key);
    let body = self
      .post_text_with_timeout(
        rpc::PDF_EXPORT_SOAP_PATH,
        "text/html",
        envelope,
        true,
        Some(EXPORT_TIMEOUT),
      )
      .await?;
    let link = rpc::extract_pdf_download_link(&body)?;
    debug!(link = %link, "PDF export download link retrieved");
    Ok(link)
  }

  async fn download(&self, link: &str) -> Result<Download> {
    self.open_download(self.resolve_link(link), None).await
  }

  async fn download_page_pdf(&self, page_id: &str) -> Result<Download> {
    let url = url::Url::parse_with_params(
      &self.endpoint("/spaces/flyingpdf/pdfpageexport.action"),
      &[("pageId", page_id)],
    )
    .map_err(|e| ExportError::InvalidInput(format!("cannot build PDF export URL for page {page_id}: {e}")))?;
    self.open_download(url.to_string(), Some("application/pdf")).await
  }
}
