//! Space export command.

use std::io::IsTerminal;
use std::process;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::commands::{connect, exit_code};
use crate::download::{DownloadProgress, ProgressObserver};
use crate::format::ExportType;
use crate::space_export::{self, SpaceExport, SpaceExportRequest};

const BAR_TEMPLATE: &str = "  {bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "  {spinner} {bytes} ({bytes_per_sec})";

/// Handle `--key KEY --type TYPE`.
pub(crate) async fn handle_space_export(key: &str, export_type: ExportType, cli: &Cli, colors: &ColorScheme) {
  println!("{} {}", colors.progress("→"), colors.info("Exporting space"));
  println!("  {}: {}", colors.emphasis("Space"), colors.emphasis(key));
  println!("  {}: {}", colors.emphasis("Type"), export_type);
  println!("  {}: {}", colors.emphasis("Output"), colors.path(cli.output.output.display()));

  let client = connect(cli, colors);
  println!("  {}: {}", colors.emphasis("Instance"), colors.link(client.base_url()));

  let request = SpaceExportRequest {
    key,
    export_type,
    host: &client.config().host,
    output_dir: &cli.output.output,
  };

  println!(
    "\n{} {}",
    colors.progress("→"),
    colors.info("Waiting for Confluence to build the export (this can take a while)")
  );

  let result = if std::io::stderr().is_terminal() && !cli.behavior.quiet {
    space_export::export_space(&client, &request, &mut BarProgress::default()).await
  } else {
    space_export::export_space(&client, &request, &mut LogProgress::new(key)).await
  };

  match result {
    Ok(export) => report_success(&export, colors),
    Err(error) => {
      eprintln!("{} {}", colors.error("✗"), colors.error(format!("Failed to export space {key}")));
      eprintln!("  {}: {}", colors.emphasis("Error"), error);
      process::exit(exit_code(&anyhow::Error::from(error)));
    }
  }
}

fn report_success(export: &SpaceExport, colors: &ColorScheme) {
  println!("  {}: {}", colors.emphasis("Download link"), colors.link(&export.download_link));
  println!(
    "\n{} {} {} {}",
    colors.success("✓"),
    colors.success("Saved"),
    colors.path(export.path.display()),
    colors.dimmed(format!("({} bytes)", export.bytes))
  );
}

/// Terminal progress bar; a spinner when the size is unknown.
#[derive(Default)]
struct BarProgress {
  bar: Option<ProgressBar>,
}

impl ProgressObserver for BarProgress {
  fn started(&mut self, total: Option<u64>) {
    let (bar, template) = match total {
      Some(total) => (ProgressBar::new(total), BAR_TEMPLATE),
      None => (ProgressBar::new_spinner(), SPINNER_TEMPLATE),
    };
    if let Ok(style) = ProgressStyle::with_template(template) {
      bar.set_style(style.progress_chars("=> "));
    }
    self.bar = Some(bar);
  }

  fn advanced(&mut self, progress: &DownloadProgress) {
    if let Some(bar) = &self.bar {
      bar.set_position(progress.received);
    }
  }

  fn finished(&mut self, _progress: &DownloadProgress) {
    if let Some(bar) = self.bar.take() {
      bar.finish_and_clear();
    }
  }
}

impl Drop for BarProgress {
  fn drop(&mut self) {
    if let Some(bar) = self.bar.take() {
      bar.abandon();
    }
  }
}

/// Logs a line every time the whole-percent figure changes.
struct LogProgress {
  key: String,
  last_percent: Option<u64>,
}

impl LogProgress {
  fn new(key: &str) -> Self {
    Self {
      key: key.to_string(),
      last_percent: None,
    }
  }

  /// Whole percent to report for `progress`, if it differs from the last one.
  fn next_report(&mut self, progress: &DownloadProgress) -> Option<u64> {
    let percent = progress.percentage()?.floor() as u64;
    if self.last_percent == Some(percent) {
      return None;
    }
    self.last_percent = Some(percent);
    Some(percent)
  }
}

impl ProgressObserver for LogProgress {
  fn advanced(&mut self, progress: &DownloadProgress) {
    if let Some(percent) = self.next_report(progress) {
      info!("{} space download progress: {percent}%", self.key);
    }
  }

  fn finished(&mut self, progress: &DownloadProgress) {
    info!("{} space download received {} bytes", self.key, progress.received);
  }
}
