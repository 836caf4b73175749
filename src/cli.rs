//! Command-line interface definitions for confluence-export.
//!
//! The tool runs in exactly one of three modes: export a whole space
//! (`--key` + `--type`), export a page and optionally its descendants
//! (`--page` + `--type`), or list spaces (`--list-spaces`).

use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::{Args, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::color::ColorScheme;
use crate::commands::page::handle_page_export;
use crate::commands::space::handle_space_export;
use crate::commands::spaces::handle_list_spaces;
use crate::commands::EXIT_INVALID_INPUT;
use crate::config::ConnectionSettings;
use crate::format::ExportType;

/// confluence-export - Export Confluence spaces and pages
#[derive(Debug, Parser)]
#[command(
  name = "confluence-export",
  version,
  long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ", ", env!("TARGET"), ")"),
  about = "Export Confluence spaces and pages to XML, HTML, or PDF",
  long_about = "Exports a Confluence space to an XML/HTML archive or a PDF document, or a single page\n\
                (optionally with all of its descendants) to HTML or PDF files in a mirrored directory tree.",
  after_help = "Examples:\n  \
                confluence-export -k CAP -t xml\n  \
                confluence-export --page \"Release notes\" --with-children -t html -k CAP\n  \
                confluence-export --envvar ./envvar --list-spaces",
  styles = get_clap_styles()
)]
pub struct Cli {
  /// What to export
  #[command(flatten)]
  pub target: TargetOptions,

  /// Connection options
  #[command(flatten)]
  pub connection: ConnectionOptions,

  /// Output options
  #[command(flatten)]
  pub output: OutputOptions,

  /// Behavior options
  #[command(flatten)]
  pub behavior: BehaviorOptions,

  /// Performance options
  #[command(flatten)]
  pub performance: PerformanceOptions,
}

/// Export target selection
#[derive(Debug, Args)]
pub struct TargetOptions {
  /// Confluence space key
  #[arg(short, long, value_name = "KEY")]
  pub key: Option<String>,

  /// Export file type: xml, html or pdf
  #[arg(short = 't', long = "type", value_name = "TYPE", value_parser = parse_export_type)]
  pub export_type: Option<ExportType>,

  /// Page ID or title to export individually
  #[arg(short, long, value_name = "ID_OR_TITLE")]
  pub page: Option<String>,

  /// Include all descendant pages recursively when exporting a single page
  #[arg(short = 'c', long)]
  pub with_children: bool,

  /// Maximum depth when exporting descendants (0 exports only the page)
  #[arg(long, value_name = "N")]
  pub max_depth: Option<usize>,

  /// List spaces accessible to the authenticated user
  #[arg(short, long)]
  pub list_spaces: bool,

  /// Only list spaces of this type (e.g. global, personal)
  #[arg(long, value_name = "TYPE", requires = "list_spaces")]
  pub space_type: Option<String>,
}

/// Connection options (fall back to `--envvar`, then to the process environment)
#[derive(Debug, Args)]
pub struct ConnectionOptions {
  /// Protocol used to reach Confluence (http or https) [env: PROTOCOL]
  #[arg(long, value_name = "PROTOCOL")]
  pub protocol: Option<String>,

  /// Confluence host name [env: HOST]
  #[arg(long, value_name = "HOST")]
  pub host: Option<String>,

  /// Confluence port [env: PORT]
  #[arg(long, value_name = "PORT")]
  pub port: Option<String>,

  /// Confluence user name [env: USERNAME]
  #[arg(long, value_name = "USER")]
  pub username: Option<String>,

  /// Confluence password [env: PASSWORD]
  #[arg(long, value_name = "PASSWORD")]
  pub password: Option<String>,

  /// Path to an environment variables file (KEY=VALUE per line, overrides the process environment)
  #[arg(short, long, value_name = "FILE")]
  pub envvar: Option<PathBuf>,
}

impl ConnectionOptions {
  /// Settings given as flags.
  pub fn settings(&self) -> ConnectionSettings {
    ConnectionSettings {
      protocol: self.protocol.clone(),
      host: self.host.clone(),
      port: self.port.clone(),
      username: self.username.clone(),
      password: self.password.clone(),
    }
  }
}

/// Output options
#[derive(Debug, Args)]
pub struct OutputOptions {
  /// Directory the export is written to
  #[arg(short, long, default_value = ".", value_name = "DIR")]
  pub output: PathBuf,
}

/// Behavior options
#[derive(Debug, Args)]
pub struct BehaviorOptions {
  /// Increase verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = clap::ArgAction::Count)]
  pub verbose: u8,

  /// Suppress all output except errors
  #[arg(short, long, conflicts_with = "verbose")]
  pub quiet: bool,

  /// Colorize output
  #[arg(long, value_enum, default_value = "auto", value_name = "WHEN")]
  pub color: ColorOption,
}

/// Color output options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorOption {
  Auto,
  Always,
  Never,
}

/// Performance options
#[derive(Debug, Args)]
pub struct PerformanceOptions {
  /// Request timeout in seconds (export jobs always allow 600 seconds)
  #[arg(long, default_value = "30", value_name = "SECONDS")]
  pub timeout: u64,
}

/// The operation selected on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  ListSpaces {
    space_type: Option<String>,
  },
  Page {
    identifier: String,
    space_key: Option<String>,
    export_type: ExportType,
    with_children: bool,
    max_depth: Option<usize>,
  },
  Space {
    key: String,
    export_type: ExportType,
  },
}

fn parse_export_type(value: &str) -> Result<ExportType, String> {
  value.parse::<ExportType>().map_err(|e| e.to_string())
}

impl Cli {
  /// Validate the argument combination and work out the mode.
  ///
  /// Returns an error message if the combination is invalid.
  pub fn mode(&self) -> Result<Mode, String> {
    let target = &self.target;

    if target.max_depth.is_some() && !target.with_children {
      return Err("--max-depth requires --with-children".to_string());
    }

    if target.list_spaces {
      return Ok(Mode::ListSpaces {
        space_type: target.space_type.clone(),
      });
    }

    if let Some(page) = &target.page {
      let Some(export_type) = target.export_type else {
        return Err("The option --type is required when exporting a page.".to_string());
      };
      if page.trim().is_empty() {
        return Err("The --page option must not be empty.".to_string());
      }
      return Ok(Mode::Page {
        identifier: page.trim().to_string(),
        space_key: target.key.clone(),
        export_type,
        with_children: target.with_children,
        max_depth: target.max_depth,
      });
    }

    if target.with_children {
      return Err("--with-children can only be used together with --page".to_string());
    }

    match (&target.key, target.export_type) {
      (Some(key), Some(export_type)) if !key.trim().is_empty() => Ok(Mode::Space {
        key: key.trim().to_string(),
        export_type,
      }),
      _ => Err("The options --key and --type are required unless --list-spaces or --page is used.".to_string()),
    }
  }
}

/// Parse CLI arguments, initialize logging, and dispatch to the chosen mode.
pub async fn run() {
  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(e) => match parse_failure_exit_code(e.kind()) {
      Some(code) => {
        let _ = e.print();
        process::exit(code);
      }
      None => e.exit(),
    },
  };

  init_tracing(&cli.behavior);

  let colors = ColorScheme::new(cli.behavior.color);

  let mode = match cli.mode() {
    Ok(mode) => mode,
    Err(e) => {
      eprintln!("{} {}", colors.error("Error:"), e);
      process::exit(EXIT_INVALID_INPUT);
    }
  };

  match mode {
    Mode::ListSpaces { space_type } => {
      handle_list_spaces(space_type.as_deref(), &cli, &colors).await;
    }
    Mode::Page {
      identifier,
      space_key,
      export_type,
      with_children,
      max_depth,
    } => {
      handle_page_export(
        &identifier,
        space_key.as_deref(),
        export_type,
        with_children,
        max_depth,
        &cli,
        &colors,
      )
      .await;
    }
    Mode::Space { key, export_type } => {
      handle_space_export(&key, export_type, &cli, &colors).await;
    }
  }
}

/// Exit code for a failed argument parse, `None` for help and version output.
fn parse_failure_exit_code(kind: ErrorKind) -> Option<i32> {
  match kind {
    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => None,
    _ => Some(EXIT_INVALID_INPUT),
  }
}

fn init_tracing(behavior: &BehaviorOptions) {
  let level = if behavior.quiet {
    LevelFilter::ERROR
  } else {
    match behavior.verbose {
      0 => LevelFilter::WARN,
      1 => LevelFilter::INFO,
      2 => LevelFilter::DEBUG,
      _ => LevelFilter::TRACE,
    }
  };

  let env_filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy();

  let _ = tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .try_init();
}

/// Get custom styles for clap help output
fn get_clap_styles() -> clap::builder::Styles {
  use clap::builder::styling::{AnsiColor, Effects};

  clap::builder::Styles::styled()
    .header(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
    .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
    .literal(AnsiColor::BrightGreen.on_default())
    .placeholder(AnsiColor::BrightCyan.on_default())
    .error(AnsiColor::BrightRed.on_default() | Effects::BOLD)
    .valid(AnsiColor::BrightGreen.on_default())
    .invalid(AnsiColor::BrightRed.on_default())
}
