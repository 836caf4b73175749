//! Page export command.

use std::process;

use anyhow::Context;

use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::commands::{connect, exit_code};
use crate::error::ExportError;
use crate::format::{ExportType, PageFormat};
use crate::page_export::{self, PageExportOptions, PageExportSummary};

/// Handle `--page ID_OR_TITLE --type TYPE`.
pub(crate) async fn handle_page_export(
  identifier: &str,
  space_key: Option<&str>,
  export_type: ExportType,
  with_children: bool,
  max_depth: Option<usize>,
  cli: &Cli,
  colors: &ColorScheme,
) {
  println!("{} {}", colors.progress("→"), colors.info("Exporting page"));
  println!("  {}: {}", colors.emphasis("Page"), colors.emphasis(identifier));
  if let Some(key) = space_key {
    println!("  {}: {}", colors.emphasis("Space"), colors.emphasis(key));
  }
  println!("  {}: {}", colors.emphasis("Type"), export_type);
  println!("  {}: {}", colors.emphasis("Output"), colors.path(cli.output.output.display()));

  if with_children {
    println!("  {} {}", colors.success("✓"), colors.info("Including child pages"));
    if let Some(depth) = max_depth {
      println!("    {} {}", colors.emphasis("Maximum depth:"), colors.number(depth));
    }
  }

  match export(identifier, space_key, export_type, with_children, max_depth, cli, colors).await {
    Ok(summary) => {
      println!(
        "\n{} {} {} {}",
        colors.success("✓"),
        colors.success("Exported"),
        colors.number(summary.pages_exported),
        colors.success(if summary.pages_exported == 1 { "page" } else { "pages" })
      );
      println!("  {}: {}", colors.emphasis("Directory"), colors.path(summary.root_dir.display()));
      for id in &summary.unlisted_children {
        println!(
          "  {} {}",
          colors.warning("⚠"),
          colors.warning(format!("Child pages of {id} could not be listed and were skipped"))
        );
      }
      for id in &summary.repeated_pages {
        println!(
          "  {} {}",
          colors.warning("⚠"),
          colors.warning(format!("Page {id} appears more than once in the tree; exported once"))
        );
      }
    }
    Err(error) => {
      eprintln!("{} {}", colors.error("✗"), colors.error("Failed to export page"));
      eprintln!("  {}: {:#}", colors.emphasis("Error"), error);
      if let Some(ExportError::AmbiguousPage { candidates, .. }) = error.downcast_ref::<ExportError>() {
        eprintln!("  {}", colors.emphasis("Candidates:"));
        for candidate in candidates {
          eprintln!(
            "    - ID: {} | Title: {}",
            colors.number(&candidate.id),
            candidate.title
          );
        }
      }
      process::exit(exit_code(&error));
    }
  }
}

async fn export(
  identifier: &str,
  space_key: Option<&str>,
  export_type: ExportType,
  with_children: bool,
  max_depth: Option<usize>,
  cli: &Cli,
  colors: &ColorScheme,
) -> anyhow::Result<PageExportSummary> {
  let format = PageFormat::try_from(export_type)?;

  let client = connect(cli, colors);

  println!("\n{} {}", colors.progress("→"), colors.info("Connecting to Confluence"));
  println!("  {}: {}", colors.emphasis("Instance"), colors.link(client.base_url()));

  let options = PageExportOptions {
    format,
    with_children,
    max_depth,
  };

  println!("{} {}", colors.progress("→"), colors.info("Resolving and exporting pages"));
  let summary = page_export::export_page(
    &client,
    identifier,
    space_key,
    &client.config().host,
    &cli.output.output,
    options,
  )
  .await
  .with_context(|| format!("Page \"{identifier}\" could not be exported"))?;

  Ok(summary)
}
