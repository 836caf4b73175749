//! Connection configuration.
//!
//! Settings come from command-line flags, an optional `KEY=VALUE`
//! environment file and the process environment, in that order of
//! precedence. They are merged into
//! [`ConnectionSettings`] and validated once into an immutable
//! [`ConnectionConfig`], which is then handed to the API client.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::warn;

use crate::error::{ExportError, Result};

/// Environment keys that must all be present before any request is made.
pub const REQUIRED_KEYS: [&str; 5] = ["PROTOCOL", "HOST", "PORT", "USERNAME", "PASSWORD"];

/// Validated connection parameters for one Confluence instance.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
  pub protocol: String,
  pub host: String,
  pub port: u16,
  pub username: String,
  pub password: String,
}

impl ConnectionConfig {
  /// `<protocol>://<host>:<port>`, the prefix for every endpoint.
  pub fn base_url(&self) -> String {
    format!("{}://{}:{}", self.protocol, self.host, self.port)
  }
}

impl fmt::Debug for ConnectionConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ConnectionConfig")
      .field("protocol", &self.protocol)
      .field("host", &self.host)
      .field("port", &self.port)
      .field("username", &self.username)
      .field("password", &"<redacted>")
      .finish()
  }
}

/// Possibly incomplete connection settings gathered from the various sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSettings {
  pub protocol: Option<String>,
  pub host: Option<String>,
  pub port: Option<String>,
  pub username: Option<String>,
  pub password: Option<String>,
}

impl ConnectionSettings {
  /// Read every key through `lookup`; empty values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
    Self {
      protocol: get("PROTOCOL"),
      host: get("HOST"),
      port: get("PORT"),
      username: get("USERNAME"),
      password: get("PASSWORD"),
    }
  }

  /// Settings from the process environment.
  pub fn from_process_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Settings from a loaded environment file.
  pub fn from_env_file(env_file: &EnvFile) -> Self {
    Self::from_lookup(|key| env_file.get(key).map(str::to_string))
  }

  /// Fill every unset field from `fallback`; values already present win.
  pub fn or(self, fallback: ConnectionSettings) -> Self {
    let pick = |value: Option<String>, other: Option<String>| value.filter(|v| !v.is_empty()).or(other);
    Self {
      protocol: pick(self.protocol, fallback.protocol),
      host: pick(self.host, fallback.host),
      port: pick(self.port, fallback.port),
      username: pick(self.username, fallback.username),
      password: pick(self.password, fallback.password),
    }
  }

  /// Layer the sources: flags first, then the environment file, then the
  /// process environment.
  pub fn layered(flags: ConnectionSettings, env_file: Option<&EnvFile>, process_env: ConnectionSettings) -> Self {
    let settings = match env_file {
      Some(env_file) => flags.or(Self::from_env_file(env_file)),
      None => flags,
    };
    settings.or(process_env)
  }

  /// Validate the settings.
  ///
  /// # Errors
  /// [`ExportError::MissingConfig`] naming every absent or empty key, or
  /// [`ExportError::InvalidInput`] when the port is not a valid number.
  pub fn resolve(self) -> Result<ConnectionConfig> {
    let fields = [
      &self.protocol,
      &self.host,
      &self.port,
      &self.username,
      &self.password,
    ];
    let missing: Vec<&'static str> = REQUIRED_KEYS
      .iter()
      .zip(fields)
      .filter(|(_, value)| value.as_deref().map(str::trim).is_none_or(str::is_empty))
      .map(|(key, _)| *key)
      .collect();

    if !missing.is_empty() {
      return Err(ExportError::MissingConfig { missing });
    }

    // All present past this point.
    let take = |value: Option<String>| value.unwrap_or_default().trim().to_string();

    let port_text = take(self.port);
    let port = port_text
      .parse::<u16>()
      .map_err(|_| ExportError::InvalidInput(format!("PORT must be a number between 0 and 65535, got {port_text:?}")))?;

    Ok(ConnectionConfig {
      protocol: take(self.protocol).trim_end_matches("://").to_string(),
      host: take(self.host),
      port,
      username: take(self.username),
      // Passwords may legitimately carry surrounding whitespace.
      password: self.password.unwrap_or_default(),
    })
  }
}

/// Parsed `KEY=VALUE` environment file.
///
/// Loading never touches the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
  vars: HashMap<String, String>,
}

impl EnvFile {
  /// Read and parse an environment file.
  ///
  /// # Errors
  /// Returns [`ExportError::Io`] if the file does not exist or cannot be read.
  pub fn load(path: &Path) -> Result<Self> {
    let entries = dotenvy::from_path_iter(path).map_err(|e| match e {
      dotenvy::Error::Io(source) => ExportError::io(path, source),
      other => ExportError::InvalidInput(format!("cannot read environment file {}: {other}", path.display())),
    })?;
    Ok(Self::collect(entries))
  }

  /// Parse environment file contents (`dotenv` syntax: `#` comments,
  /// optional `export ` prefix, quoted values). Lines that do not parse are
  /// skipped with a warning.
  pub fn parse(content: &str) -> Self {
    Self::collect(dotenvy::from_read_iter(content.as_bytes()))
  }

  fn collect(entries: impl Iterator<Item = dotenvy::Result<(String, String)>>) -> Self {
    let mut vars = HashMap::new();
    for entry in entries {
      match entry {
        Ok((key, value)) => {
          vars.insert(key, value);
        }
        Err(dotenvy::Error::LineParse(line, index)) => {
          warn!("skipping malformed environment file line {line:?} (at character {index})");
        }
        Err(e) => {
          warn!("stopped reading environment file: {e}");
          break;
        }
      }
    }
    Self { vars }
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.vars.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }
}
