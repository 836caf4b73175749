//! `--list-spaces` command.

use std::process;

use anyhow::bail;

use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::commands::{connect, exit_code};
use crate::confluence::{ConfluenceClient, Space};
use crate::spaces::{list_spaces, render_table};

/// Print every space visible to the user as a table.
pub(crate) async fn handle_list_spaces(space_type: Option<&str>, cli: &Cli, colors: &ColorScheme) {
  let client = connect(cli, colors);

  println!("{} {}", colors.progress("→"), colors.info("Listing spaces"));
  println!("  {}: {}", colors.emphasis("Instance"), colors.link(client.base_url()));
  if let Some(space_type) = space_type {
    println!("  {}: {}", colors.emphasis("Type"), space_type);
  }

  match fetch(&client, space_type).await {
    Ok(spaces) => {
      println!();
      let lines = render_table(&spaces);
      for (index, line) in lines.iter().enumerate() {
        if index == 0 {
          println!("{}", colors.emphasis(line));
        } else if index == 1 {
          println!("{}", colors.dimmed(line));
        } else {
          println!("{line}");
        }
      }
      println!(
        "\n{} {} {}",
        colors.success("✓"),
        colors.number(spaces.len()),
        colors.success(if spaces.len() == 1 { "space" } else { "spaces" })
      );
    }
    Err(error) => {
      eprintln!("{} {}", colors.error("✗"), colors.error("Failed to list spaces"));
      eprintln!("  {}: {:#}", colors.emphasis("Error"), error);
      process::exit(exit_code(&error));
    }
  }
}

async fn fetch(client: &ConfluenceClient, space_type: Option<&str>) -> anyhow::Result<Vec<Space>> {
  let spaces = list_spaces(client, space_type).await?;
  if spaces.is_empty() {
    bail!("no spaces returned");
  }
  Ok(spaces)
}
