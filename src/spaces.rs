//! Listing the spaces visible to the authenticated user.

use std::time::Instant;

use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::confluence::{ConfluenceApi, Space};
use crate::error::Result;

/// Page size used when listing spaces for display.
pub const LIST_PAGE_SIZE: usize = 100;

const HEADERS: [&str; 3] = ["Key", "Name", "Type"];

/// Fetch every space, optionally restricted to a space type
/// (`global`/`personal`).
pub async fn list_spaces(client: &dyn ConfluenceApi, space_type: Option<&str>) -> Result<Vec<Space>> {
  let started = Instant::now();
  let spaces = client.get_all_spaces(LIST_PAGE_SIZE, None, space_type).await?;
  debug!(
    count = spaces.len(),
    elapsed_ms = started.elapsed().as_millis() as u64,
    "listed spaces"
  );
  Ok(spaces)
}

/// Render spaces as an aligned text table (header, dashed rule, one row per
/// space). Empty cells are shown as `-`.
pub fn render_table(spaces: &[Space]) -> Vec<String> {
  let rows: Vec<[&str; 3]> = spaces
    .iter()
    .map(|space| [cell(&space.key), cell(&space.name), cell(&space.space_type)])
    .collect();

  let mut widths = HEADERS.map(UnicodeWidthStr::width);
  for row in &rows {
    for (width, value) in widths.iter_mut().zip(row) {
      *width = (*width).max(value.width());
    }
  }

  let format_row = |cells: &[&str; 3]| {
    let padded: Vec<String> = cells
      .iter()
      .zip(widths)
      .map(|(value, width)| format!("{value}{}", " ".repeat(width - value.width())))
      .collect();
    padded.join("  ").trim_end().to_string()
  };

  let mut lines = Vec::with_capacity(rows.len() + 2);
  lines.push(format_row(&HEADERS));
  lines.push(widths.map(|width| "-".repeat(width)).join("  "));
  lines.extend(rows.iter().map(format_row));
  lines
}

fn cell(value: &str) -> &str {
  if value.trim().is_empty() { "-" } else { value }
}
