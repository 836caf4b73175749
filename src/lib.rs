//! Confluence export library
//!
//! This library exports Confluence spaces (XML, HTML, or PDF) and individual
//! pages with their descendants (HTML or PDF) through the REST, JSON-RPC and
//! SOAP interfaces of a Confluence Server instance.

pub mod cli;
pub mod color;
pub mod commands;
pub mod config;
pub mod confluence;
pub mod download;
pub mod error;
pub mod format;
pub mod page_export;
pub mod space_export;
pub mod spaces;

pub use error::{ExportError, PageCandidate, Result};
