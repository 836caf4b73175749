//! Test fixtures for Confluence API responses
//!
//! Sample data shaped like the Confluence Server REST and JSON-RPC APIs.

use confluence_export::config::ConnectionConfig;
use serde_json::json;

/// Connection settings for a test instance.
pub fn connection_config() -> ConnectionConfig {
  ConnectionConfig {
    protocol: "http".to_string(),
    host: "wiki.example.com".to_string(),
    port: 8090,
    username: "admin".to_string(),
    password: "secret".to_string(),
  }
}

/// `GET /rest/api/space/CAP`
pub fn capability_space_response() -> serde_json::Value {
  json!({
    "id": 98305,
    "key": "CAP",
    "name": "Capability Team",
    "type": "global",
    "_links": {
      "webui": "/display/CAP",
      "self": "http://wiki.example.com:8090/rest/api/space/CAP"
    }
  })
}

/// A page with its space, export view and ancestors expanded.
pub fn page_response(id: &str, title: &str, space_key: &str, html: &str) -> serde_json::Value {
  json!({
    "id": id,
    "type": "page",
    "status": "current",
    "title": title,
    "space": {
      "key": space_key,
      "name": "Capability Team",
      "type": "global"
    },
    "body": {
      "export_view": {
        "value": html,
        "representation": "storage"
      }
    },
    "ancestors": [],
    "_links": {
      "webui": format!("/pages/viewpage.action?pageId={id}")
    }
  })
}

/// A page returned without an expanded body.
pub fn page_without_body(id: &str, title: &str, space_key: &str) -> serde_json::Value {
  json!({
    "id": id,
    "type": "page",
    "status": "current",
    "title": title,
    "space": { "key": space_key, "name": "Capability Team", "type": "global" }
  })
}

/// Release notes page used as the root of a small tree.
pub fn release_notes_page() -> serde_json::Value {
  page_response(
    "1001",
    "Release Notes",
    "CAP",
    "<h1>Release Notes</h1><p>Everything that shipped.</p>",
  )
}

/// First child of the release notes page.
pub fn child_a_page() -> serde_json::Value {
  page_response("1002", "A", "CAP", "<p>Page A</p>")
}

/// Second child of the release notes page.
pub fn child_b_page() -> serde_json::Value {
  page_response("1003", "B", "CAP", "<p>Page B</p>")
}

/// Child of page B.
pub fn grandchild_c_page() -> serde_json::Value {
  page_response("1004", "C", "CAP", "<p>Page C</p>")
}

/// JSON-RPC `exportSpace` response holding a wrapped download link.
pub fn export_space_response(link: &str) -> String {
  serde_json::to_string(&json!({ "downloadLink": link })).unwrap_or_default()
}

/// One page of `GET /rest/api/space` results.
pub fn spaces_page(keys: &[&str], next: Option<&str>) -> serde_json::Value {
  let results: Vec<serde_json::Value> = keys
    .iter()
    .map(|key| json!({ "key": key, "name": format!("Space {key}"), "type": "global" }))
    .collect();

  let mut links = json!({ "base": "http://wiki.example.com:8090" });
  if let Some(next) = next {
    links["next"] = json!(next);
  }

  json!({
    "results": results,
    "start": 0,
    "limit": keys.len(),
    "size": keys.len(),
    "_links": links
  })
}

/// One page of `GET /rest/api/content/{id}/child/page` results.
pub fn child_pages_page(pages: Vec<serde_json::Value>, next: Option<&str>) -> serde_json::Value {
  let size = pages.len();
  let mut links = json!({});
  if let Some(next) = next {
    links["next"] = json!(next);
  }
  json!({
    "results": pages,
    "size": size,
    "_links": links
  })
}

/// SOAP response to `rpc:login`.
pub fn soap_login_response(token: &str) -> String {
  format!(
    r#"<?xml version="1.0" encoding="utf-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <soapenv:Body>
    <ns1:loginResponse soapenv:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/" xmlns:ns1="http://rpc.confluence.atlassian.com">
      <loginReturn xsi:type="xsd:string">{token}</loginReturn>
    </ns1:loginResponse>
  </soapenv:Body>
</soapenv:Envelope>"#
  )
}

/// SOAP response to the flying-pdf `rpc:exportSpace`.
pub fn soap_export_response(link: &str) -> String {
  format!(
    r#"<?xml version="1.0" encoding="utf-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <soapenv:Body>
    <ns1:exportSpaceResponse soapenv:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/" xmlns:ns1="http://rpc.flyingpdf.extra.confluence.atlassian.com">
      <exportSpaceReturn xsi:type="xsd:string">{link}</exportSpaceReturn>
    </ns1:exportSpaceResponse>
  </soapenv:Body>
</soapenv:Envelope>"#
  )
}
