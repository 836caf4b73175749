//! Data transfer objects returned by the Confluence REST and RPC APIs.

use serde::{Deserialize, Serialize};

/// Space information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
  /// Short key that uniquely identifies the space.
  pub key: String,
  /// Human-readable space name.
  #[serde(default)]
  pub name: String,
  /// Space classification such as `"global"` or `"personal"`.
  #[serde(rename = "type", default)]
  pub space_type: String,
}

/// Confluence page metadata and (optionally) rendered content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
  /// Unique numeric identifier assigned by Confluence.
  pub id: String,
  /// Human-readable title displayed in the UI.
  pub title: String,
  /// Space the page lives in, present when `space` is expanded.
  #[serde(default)]
  pub space: Option<Space>,
  /// Rendered bodies, present when a `body.*` field is expanded.
  #[serde(default)]
  pub body: Option<PageBody>,
  /// Parent chain from the space root, present when `ancestors` is expanded.
  #[serde(default)]
  pub ancestors: Option<Vec<PageRef>>,
}

impl Page {
  /// The export-view HTML, when it was expanded and is non-empty.
  pub fn export_view_html(&self) -> Option<&str> {
    self
      .body
      .as_ref()
      .and_then(|body| body.export_view.as_ref())
      .map(|view| view.value.as_str())
      .filter(|html| !html.is_empty())
  }

  /// Key of the owning space, when known.
  pub fn space_key(&self) -> Option<&str> {
    self.space.as_ref().map(|space| space.key.as_str()).filter(|key| !key.is_empty())
  }
}

/// Page body content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageBody {
  /// Self-contained HTML suitable for offline viewing.
  #[serde(default)]
  pub export_view: Option<BodyRepresentation>,
}

/// A single body rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyRepresentation {
  pub value: String,
  #[serde(default)]
  pub representation: String,
}

/// Lightweight reference to another page (used for ancestors).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
  pub id: String,
  #[serde(default)]
  pub title: String,
}

/// One page of a paginated collection (`results` plus `_links.next`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResponse<T> {
  #[serde(default = "Vec::new")]
  pub results: Vec<T>,
  #[serde(rename = "_links", default)]
  pub links: PageLinks,
}

impl<T> PagedResponse<T> {
  /// Whether the service advertises another page of results.
  pub fn has_next(&self) -> bool {
    self.links.next.as_deref().is_some_and(|next| !next.is_empty())
  }
}

/// Navigation links attached to a paginated response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageLinks {
  #[serde(default)]
  pub next: Option<String>,
}

/// Download link produced by an export job.
///
/// The JSON-RPC export endpoint answers with either `{"downloadLink": "..."}`
/// or a bare string, depending on the server version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExportLink {
  Wrapped {
    #[serde(rename = "downloadLink")]
    download_link: String,
  },
  Bare(String),
}

impl ExportLink {
  pub fn into_url(self) -> String {
    match self {
      Self::Wrapped { download_link } => download_link,
      Self::Bare(url) => url,
    }
  }
}
