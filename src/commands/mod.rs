//! Command handlers.
//!
//! One module per mode of `confluence-export`. Handlers own all user-facing
//! output and decide the process exit code; the export logic itself lives in
//! the library modules.

use std::process;

use anyhow::Context;
use tracing::debug;

use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::config::{ConnectionSettings, EnvFile};
use crate::confluence::ConfluenceClient;
use crate::error::ExportError;

pub mod page;
pub mod space;
pub mod spaces;

/// Exit code for failed exports and listings.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code when connection settings are missing.
pub const EXIT_MISSING_CONFIG: i32 = 2;
/// Exit code for invalid command-line input.
pub const EXIT_INVALID_INPUT: i32 = 4;

/// Build the API client from flags, `--envvar` and the process environment.
///
/// Exits the process when the settings are incomplete or the environment
/// file cannot be read.
pub(crate) fn connect(cli: &Cli, colors: &ColorScheme) -> ConfluenceClient {
  match build_client(cli) {
    Ok(client) => client,
    Err(error) => {
      eprintln!("{} {}", colors.error("✗"), colors.error("Invalid connection settings"));
      eprintln!("  {}: {:#}", colors.emphasis("Error"), error);
      if matches!(error.downcast_ref::<ExportError>(), Some(ExportError::MissingConfig { .. })) {
        eprintln!(
          "  {}",
          colors.dimmed("Provide them as flags, environment variables, or in a file passed with --envvar")
        );
      }
      process::exit(exit_code(&error));
    }
  }
}

fn build_client(cli: &Cli) -> anyhow::Result<ConfluenceClient> {
  let env_file = match &cli.connection.envvar {
    Some(path) => {
      let env_file = EnvFile::load(path)
        .with_context(|| format!("Unable to read environment file {}", path.display()))?;
      debug!(path = %path.display(), entries = env_file.len(), "loaded environment file");
      Some(env_file)
    }
    None => None,
  };

  let settings = ConnectionSettings::layered(
    cli.connection.settings(),
    env_file.as_ref(),
    ConnectionSettings::from_process_env(),
  );
  let config = settings.resolve()?;
  debug!(?config, "resolved connection settings");

  ConfluenceClient::new(config, cli.performance.timeout).context("Unable to construct Confluence API client")
}

/// Map a handler error to the process exit code.
pub(crate) fn exit_code(error: &anyhow::Error) -> i32 {
  match error.downcast_ref::<ExportError>() {
    Some(ExportError::MissingConfig { .. }) => EXIT_MISSING_CONFIG,
    Some(ExportError::InvalidInput(_) | ExportError::MissingSpaceKey { .. }) => EXIT_INVALID_INPUT,
    _ => EXIT_FAILURE,
  }
}
