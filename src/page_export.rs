//! Single-page export with optional descendants.
//!
//! A page is resolved by numeric ID or by title within a space, then exported
//! depth-first into a directory tree that mirrors the page tree: every page
//! gets its own directory and each child's directory is nested inside its
//! parent's. Children are exported one at a time in the order Confluence
//! returns them, and the first failure aborts the whole export.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::confluence::api::{DEFAULT_CHILD_LIMIT, EXPAND_CHILDREN, EXPAND_PAGE};
use crate::confluence::{ConfluenceApi, Page};
use crate::download::{self, NoProgress};
use crate::error::{ExportError, PageCandidate, Result};
use crate::format::PageFormat;

/// Upper bound on the length of a sanitized name, in characters.
pub const MAX_NAME_CHARS: usize = 120;

/// Written when Confluence has no export-view body for a page.
pub const EMPTY_PAGE_HTML: &str = "<html><body><p>(empty page)</p></body></html>";

/// Largest number of title matches fetched when resolving by title.
const TITLE_SEARCH_LIMIT: usize = 25;

/// How pages are exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageExportOptions {
  pub format: PageFormat,
  /// Recurse into descendants.
  pub with_children: bool,
  /// Deepest level to export when recursing (root is depth 0); `None` exports
  /// the whole subtree.
  pub max_depth: Option<usize>,
}

/// Outcome of a page export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageExportSummary {
  /// Directory holding the root page's export.
  pub root_dir: PathBuf,
  /// Number of pages written, root included.
  pub pages_exported: usize,
  /// Ids of pages met again deeper in the tree and skipped.
  pub repeated_pages: Vec<String>,
  /// Ids of pages whose child listing answered 404; their descendants are
  /// missing from the export.
  pub unlisted_children: Vec<String>,
}

/// Make a page title safe for use as a path component.
///
/// Reserved characters (`< > : " / \ | ? *`), control characters and
/// whitespace become `_`, runs of `_` collapse to one, leading and trailing
/// `_` are removed and the result is capped at [`MAX_NAME_CHARS`]
/// characters. Falls back to `page` when nothing is left.
pub fn sanitize_for_filename(name: &str) -> String {
  let mut collapsed = String::with_capacity(name.len());
  for c in name.chars() {
    let c = match c {
      '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
      c if c.is_control() || c.is_whitespace() => '_',
      c => c,
    };
    if c == '_' && collapsed.ends_with('_') {
      continue;
    }
    collapsed.push(c);
  }

  let truncated: String = collapsed.trim_matches('_').chars().take(MAX_NAME_CHARS).collect();
  let trimmed = truncated.trim_end_matches('_');

  if trimmed.is_empty() {
    "page".to_string()
  } else {
    trimmed.to_string()
  }
}

/// Directory name for a page nested below its parent: `<title>-<id>`.
pub fn page_dir_name(page: &Page) -> String {
  format!("{}-{}", sanitize_for_filename(&page.title), page.id)
}

/// Directory name for the root of a page export:
/// `<host>-<space_key>-page-<title>-<id>`.
pub fn root_dir_name(host: &str, space_key: &str, page: &Page) -> String {
  format!("{host}-{space_key}-page-{}", page_dir_name(page))
}

fn is_page_id(identifier: &str) -> bool {
  !identifier.is_empty() && identifier.bytes().all(|b| b.is_ascii_digit())
}

/// Resolve a page by numeric ID, or by title within `space_key`.
///
/// # Errors
/// * [`ExportError::PageNotFound`] when the ID returns 404 or no title
///   matches.
/// * [`ExportError::MissingSpaceKey`] for a title lookup without a space key
///   (no request is made).
/// * [`ExportError::AmbiguousPage`] listing every candidate when a title
///   matches more than one page.
pub async fn resolve_page(client: &dyn ConfluenceApi, identifier: &str, space_key: Option<&str>) -> Result<Page> {
  let identifier = identifier.trim();
  if identifier.is_empty() {
    return Err(ExportError::InvalidInput("a page ID or title is required".to_string()));
  }

  if is_page_id(identifier) {
    return match client.get_page_by_id(identifier, Some(EXPAND_PAGE)).await {
      Err(e) if e.is_not_found() => Err(ExportError::PageNotFound(format!(
        "page with ID {identifier} was not found"
      ))),
      result => result,
    };
  }

  let space_key = space_key
    .map(str::trim)
    .filter(|key| !key.is_empty())
    .ok_or_else(|| ExportError::MissingSpaceKey {
      title: identifier.to_string(),
    })?;

  let mut pages = client
    .find_pages_by_title(identifier, Some(space_key), Some(EXPAND_PAGE), Some(TITLE_SEARCH_LIMIT))
    .await?;

  if pages.len() > 1 {
    return Err(ExportError::AmbiguousPage {
      title: identifier.to_string(),
      space_key: space_key.to_string(),
      candidates: pages
        .into_iter()
        .map(|page| PageCandidate {
          id: page.id,
          title: page.title,
        })
        .collect(),
    });
  }

  pages.pop().ok_or_else(|| {
    ExportError::PageNotFound(format!(
      "page titled \"{identifier}\" was not found in space {space_key}"
    ))
  })
}

/// Resolve `identifier` and export it (and optionally its descendants) below
/// `output_dir`.
///
/// The root directory is named by [`root_dir_name`] using the page's own
/// space key, falling back to `space_key` and then to `page`.
pub async fn export_page(
  client: &dyn ConfluenceApi,
  identifier: &str,
  space_key: Option<&str>,
  host: &str,
  output_dir: &Path,
  options: PageExportOptions,
) -> Result<PageExportSummary> {
  let started = Instant::now();
  let page = resolve_page(client, identifier, space_key).await?;

  let dir_space_key = page
    .space_key()
    .map(str::to_string)
    .or_else(|| space_key.map(str::trim).filter(|k| !k.is_empty()).map(str::to_string))
    .unwrap_or_else(|| "page".to_string());
  let root_dir = output_dir.join(root_dir_name(host, &dir_space_key, &page));

  info!("Saving export to {}", root_dir.display());

  let summary = export_page_tree(client, &page, &root_dir, options).await?;

  debug!(
    pages = summary.pages_exported,
    repeated = summary.repeated_pages.len(),
    unlisted = summary.unlisted_children.len(),
    elapsed_ms = started.elapsed().as_millis() as u64,
    "page export complete"
  );

  Ok(summary)
}

/// Export `page` into `target_dir` and, when requested, its descendants into
/// nested `<title>-<id>` directories.
///
/// The summary's `root_dir` is `target_dir`.
pub async fn export_page_tree(
  client: &dyn ConfluenceApi,
  page: &Page,
  target_dir: &Path,
  options: PageExportOptions,
) -> Result<PageExportSummary> {
  let mut walk = TreeWalk::default();
  let pages_exported = export_page_recursive(client, page, target_dir.to_path_buf(), 0, options, &mut walk).await?;

  Ok(PageExportSummary {
    root_dir: target_dir.to_path_buf(),
    pages_exported,
    repeated_pages: walk.repeated_pages,
    unlisted_children: walk.unlisted_children,
  })
}

#[derive(Default)]
struct TreeWalk {
  visited: HashSet<String>,
  repeated_pages: Vec<String>,
  unlisted_children: Vec<String>,
}

fn export_page_recursive<'a>(
  client: &'a dyn ConfluenceApi,
  page: &'a Page,
  page_dir: PathBuf,
  depth: usize,
  options: PageExportOptions,
  walk: &'a mut TreeWalk,
) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>> {
  Box::pin(async move {
    if !walk.visited.insert(page.id.clone()) {
      warn!(
        "Page {} (\"{}\") appears more than once in the page tree; skipping repeat",
        page.id, page.title
      );
      walk.repeated_pages.push(page.id.clone());
      return Ok(0);
    }

    info!("Exporting page \"{}\" (ID: {})", page.title, page.id);
    let started = Instant::now();

    tokio::fs::create_dir_all(&page_dir)
      .await
      .map_err(|e| ExportError::io(&page_dir, e))?;

    match options.format {
      PageFormat::Html => write_html(client, page, &page_dir).await?,
      PageFormat::Pdf => write_pdf(client, page, &page_dir).await?,
    }

    debug!(
      page_id = %page.id,
      elapsed_ms = started.elapsed().as_millis() as u64,
      "page written"
    );

    let mut exported = 1;

    if !options.with_children || options.max_depth.is_some_and(|max| depth >= max) {
      return Ok(exported);
    }

    let Some(children) = fetch_children(client, &page.id).await? else {
      walk.unlisted_children.push(page.id.clone());
      return Ok(exported);
    };
    if children.is_empty() {
      debug!("No child pages found for page {}", page.id);
      return Ok(exported);
    }

    info!(
      "Found {} child page{} for \"{}\"",
      children.len(),
      if children.len() == 1 { "" } else { "s" },
      page.title
    );

    for child in &children {
      let child_dir = page_dir.join(page_dir_name(child));
      exported += export_page_recursive(client, child, child_dir, depth + 1, options, walk).await?;
    }

    Ok(exported)
  })
}

async fn write_html(client: &dyn ConfluenceApi, page: &Page, page_dir: &Path) -> Result<()> {
  let html = match page.export_view_html() {
    Some(html) => html.to_string(),
    None => {
      debug!(page_id = %page.id, "export view not expanded; fetching it");
      let refreshed = client.get_page_by_id(&page.id, Some("body.export_view")).await?;
      refreshed.export_view_html().unwrap_or(EMPTY_PAGE_HTML).to_string()
    }
  };

  let path = page_dir.join("index.html");
  tokio::fs::write(&path, html)
    .await
    .map_err(|e| ExportError::io(&path, e))?;
  debug!(path = %path.display(), "wrote HTML file");
  Ok(())
}

async fn write_pdf(client: &dyn ConfluenceApi, page: &Page, page_dir: &Path) -> Result<()> {
  let path = page_dir.join(format!("{}.pdf", page_dir_name(page)));
  debug!(page_id = %page.id, path = %path.display(), "downloading page PDF");

  let download = client.download_page_pdf(&page.id).await?;
  download::save_to_file(download, &path, &mut NoProgress).await?;
  Ok(())
}

/// Child pages of `page_id`, or `None` when the listing answers 404.
async fn fetch_children(client: &dyn ConfluenceApi, page_id: &str) -> Result<Option<Vec<Page>>> {
  match client
    .get_child_pages(page_id, Some(EXPAND_CHILDREN), DEFAULT_CHILD_LIMIT)
    .await
  {
    Ok(children) => Ok(Some(children)),
    Err(e) if e.is_not_found() => {
      warn!("Unable to retrieve children for page {page_id}: {e}");
      Ok(None)
    }
    Err(e) => Err(e),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn page(id: &str, title: &str) -> Page {
    Page {
      id: id.to_string(),
      title: title.to_string(),
      space: None,
      body: None,
      ancestors: None,
    }
  }

  #[test]
  fn sanitize_replaces_reserved_characters() {
    let name = sanitize_for_filename("Page: A/B?");
    assert_eq!(name, "Page_A_B");
    for forbidden in [':', '/', '?'] {
      assert!(!name.contains(forbidden));
    }
  }

  #[test]
  fn sanitize_collapses_and_trims_separators() {
    assert_eq!(sanitize_for_filename("  Release   notes\t2024  "), "Release_notes_2024");
    assert_eq!(sanitize_for_filename("__a__b__"), "a_b");
    assert_eq!(sanitize_for_filename("a\u{0007}b"), "a_b");
  }

  #[test]
  fn sanitize_falls_back_to_page() {
    assert_eq!(sanitize_for_filename(""), "page");
    assert_eq!(sanitize_for_filename("???"), "page");
  }

  #[test]
  fn sanitize_truncates_without_trailing_separator() {
    let long = format!("{} tail", "x".repeat(MAX_NAME_CHARS - 1));
    let name = sanitize_for_filename(&long);
    assert_eq!(name.chars().count(), MAX_NAME_CHARS - 1);
    assert!(!name.ends_with('_'));
  }

  #[test]
  fn sanitize_keeps_unicode_letters() {
    assert_eq!(sanitize_for_filename("Página X"), "Página_X");
  }

  #[test]
  fn directory_names_include_id() {
    let p = page("42", "Page: A/B?");
    assert_eq!(page_dir_name(&p), "Page_A_B-42");
    assert_eq!(root_dir_name("wiki", "CAP", &p), "wiki-CAP-page-Page_A_B-42");
  }

  #[test]
  fn numeric_identifier_detection() {
    assert!(is_page_id("123456"));
    assert!(!is_page_id("123abc"));
    assert!(!is_page_id(""));
    assert!(!is_page_id("-1"));
  }
}
