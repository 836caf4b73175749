//! confluence-export - Export Confluence spaces and pages
//!
//! This is the main entry point for the CLI application.

#[tokio::main]
async fn main() {
  confluence_export::cli::run().await;
}
