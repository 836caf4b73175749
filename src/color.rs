//! Color utilities for terminal output.
//!
//! Semantic styles (success, error, path, ...) so every command renders the
//! same kind of information the same way, honoring `--color`.

use std::fmt::Display;
use std::io::IsTerminal;

use owo_colors::{OwoColorize, Style};

use crate::cli::ColorOption;

/// Color scheme for the application.
pub struct ColorScheme {
  enabled: bool,
}

impl ColorScheme {
  /// Create a color scheme from the user preference; `auto` colors only when
  /// stdout is a terminal.
  pub fn new(color_option: ColorOption) -> Self {
    let enabled = match color_option {
      ColorOption::Always => true,
      ColorOption::Never => false,
      ColorOption::Auto => std::io::stdout().is_terminal(),
    };

    Self { enabled }
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  fn paint<T: Display>(&self, text: T, style: Style) -> String {
    if self.enabled {
      text.style(style).to_string()
    } else {
      text.to_string()
    }
  }

  pub fn success<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().green())
  }

  pub fn error<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().bright_red().bold())
  }

  pub fn warning<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().yellow())
  }

  pub fn info<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().cyan())
  }

  /// Labels and titles.
  pub fn emphasis<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().bright_white().bold())
  }

  /// URLs (download links, instance URL).
  pub fn link<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().blue().underline())
  }

  /// Files and directories written by an export.
  pub fn path<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().magenta())
  }

  /// Counts, sizes and IDs.
  pub fn number<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().bright_blue())
  }

  pub fn dimmed<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().dimmed())
  }

  /// Step markers such as `→`.
  pub fn progress<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().bright_cyan())
  }
}
