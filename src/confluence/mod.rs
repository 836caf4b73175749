//! Confluence module providing the API abstraction, the HTTP client, data
//! models, and the hand-built bodies for the legacy RPC interfaces.

pub mod api;
pub mod client;
pub mod models;
pub mod rpc;

pub use api::ConfluenceApi;
pub use client::ConfluenceClient;
pub use models::{BodyRepresentation, ExportLink, Page, PageBody, PageLinks, PageRef, PagedResponse, Space};
