//! Request builders and response extractors for the legacy RPC interfaces.
//!
//! The JSON-RPC endpoints take a positional JSON array and the PDF export
//! plugin only speaks SOAP 1.1 (Axis 1). Both bodies are built by hand so the
//! bytes on the wire match what the remote RPC layer expects.

use crate::error::{ExportError, Result};

/// Relative path of the JSON-RPC space status endpoint.
pub const SET_SPACE_STATUS_PATH: &str = "/rpc/json-rpc/confluenceservice-v2/setSpaceStatus";
/// Relative path of the JSON-RPC space export endpoint.
pub const EXPORT_SPACE_PATH: &str = "/rpc/json-rpc/confluenceservice-v2/exportSpace";
/// Relative path of the SOAP PDF export servlet (used for login and export).
pub const PDF_EXPORT_SOAP_PATH: &str = "/plugins/servlet/soap-axis1/pdfexport";

/// Archive format understood by the JSON-RPC `exportSpace` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcExportKind {
  Xml,
  Html,
}

impl RpcExportKind {
  pub fn as_rpc_str(self) -> &'static str {
    match self {
      Self::Xml => "TYPE_XML",
      Self::Html => "TYPE_HTML",
    }
  }
}

/// `["KEY","ARCHIVED"]`
pub fn archive_space_body(key: &str) -> String {
  format!("[{},\"ARCHIVED\"]", json_quote(key))
}

/// `["KEY","TYPE_XML","true"]` (the trailing flag exports comments too).
pub fn export_space_body(key: &str, kind: RpcExportKind) -> String {
  format!("[{},\"{}\",\"true\"]", json_quote(key), kind.as_rpc_str())
}

/// SOAP envelope for `rpc:login` against the PDF export plugin.
pub fn login_envelope(username: &str, password: &str) -> String {
  soap_envelope(
    "http://rpc.confluence.atlassian.com",
    "login",
    &[username, password],
  )
}

/// SOAP envelope for the flying-pdf `rpc:exportSpace` call.
pub fn export_space_pdf_envelope(token: &str, key: &str) -> String {
  soap_envelope(
    "http://rpc.flyingpdf.extra.confluence.atlassian.com",
    "exportSpace",
    &[token, key],
  )
}

/// Pull the session token out of a `login` response.
///
/// # Errors
/// [`ExportError::Protocol`] when the body is not XML or has no
/// `loginReturn` value.
pub fn extract_login_token(body: &str) -> Result<String> {
  extract_return_value(body, "loginReturn")
}

/// Pull the download link out of an `exportSpace` response.
///
/// # Errors
/// [`ExportError::Protocol`] when the body is not XML or has no
/// `exportSpaceReturn` value.
pub fn extract_pdf_download_link(body: &str) -> Result<String> {
  extract_return_value(body, "exportSpaceReturn")
}

fn soap_envelope(rpc_namespace: &str, operation: &str, args: &[&str]) -> String {
  let mut envelope = format!(
    "<soapenv:Envelope xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
     xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\" \
     xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\" \
     xmlns:rpc=\"{rpc_namespace}\">\
     <soapenv:Header/>\
     <soapenv:Body>\
     <rpc:{operation} soapenv:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">"
  );

  for (index, arg) in args.iter().enumerate() {
    envelope.push_str(&format!(
      "<in{index} xsi:type=\"xsd:string\">{}</in{index}>",
      xml_escape(arg)
    ));
  }

  envelope.push_str(&format!("</rpc:{operation}></soapenv:Body></soapenv:Envelope>"));
  envelope
}

fn extract_return_value(body: &str, element: &str) -> Result<String> {
  let document = roxmltree::Document::parse(body)
    .map_err(|e| ExportError::Protocol(format!("response is not valid XML ({e}); expected <{element}>")))?;

  document
    .descendants()
    .find(|node| node.is_element() && node.tag_name().name() == element)
    .and_then(|node| node.text())
    .map(str::trim)
    .filter(|value| !value.is_empty())
    .map(str::to_string)
    .ok_or_else(|| ExportError::Protocol(format!("response does not contain a <{element}> value")))
}

fn json_quote(value: &str) -> String {
  let mut quoted = String::with_capacity(value.len() + 2);
  quoted.push('"');
  for c in value.chars() {
    match c {
      '"' => quoted.push_str("\\\""),
      '\\' => quoted.push_str("\\\\"),
      c if c.is_control() => quoted.push_str(&format!("\\u{:04x}", c as u32)),
      c => quoted.push(c),
    }
  }
  quoted.push('"');
  quoted
}

fn xml_escape(value: &str) -> String {
  let mut escaped = String::with_capacity(value.len());
  for c in value.chars() {
    match c {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\'' => escaped.push_str("&apos;"),
      c => escaped.push(c),
    }
  }
  escaped
}
