//! Traffic entry extraction.
//!
//! Every field is optional in the wild; missing values fall back to empty
//! strings, zero sizes and zero timings rather than dropping the entry.

use lmsdiag_core::{Node, ParsedDocument};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Document,
    Script,
    Stylesheet,
    Image,
    Font,
    Xhr,
    Fetch,
    Media,
    Websocket,
    Other,
}

impl ResourceType {
    /// Browser-recorded resource type (`_resourceType`).
    pub fn from_recorded(value: &str) -> Option<Self> {
        Some(match value.trim().to_lowercase().as_str() {
            "document" => ResourceType::Document,
            "script" => ResourceType::Script,
            "stylesheet" => ResourceType::Stylesheet,
            "image" => ResourceType::Image,
            "font" => ResourceType::Font,
            "xhr" => ResourceType::Xhr,
            "fetch" => ResourceType::Fetch,
            "media" => ResourceType::Media,
            "websocket" => ResourceType::Websocket,
            "" => return None,
            _ => ResourceType::Other,
        })
    }

    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_lowercase();
        if mime.contains("html") {
            ResourceType::Document
        } else if mime.contains("javascript") || mime.contains("ecmascript") {
            ResourceType::Script
        } else if mime.contains("css") {
            ResourceType::Stylesheet
        } else if mime.starts_with("image/") {
            ResourceType::Image
        } else if mime.starts_with("font/") || mime.contains("woff") {
            ResourceType::Font
        } else if mime.contains("json") || mime.contains("xml") {
            ResourceType::Xhr
        } else if mime.starts_with("audio/") || mime.starts_with("video/") {
            ResourceType::Media
        } else {
            ResourceType::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Phase timings in milliseconds. Phases the capture marks as not
/// applicable (`-1`) are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timings {
    pub dns: f64,
    pub connect: f64,
    pub wait: f64,
    pub receive: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficEntry {
    /// Position in the capture, starting at 0
    pub sequence_id: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_date_time: Option<String>,
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub path: String,
    /// 0 means the request never completed
    pub status: u16,
    pub status_text: String,
    pub resource_type: ResourceType,
    pub mime_type: String,
    pub content_size: u64,
    pub transfer_size: u64,
    /// Total elapsed time in milliseconds
    pub time: f64,
    pub timings: Timings,
    pub request_headers: Vec<Header>,
    pub response_headers: Vec<Header>,
    /// Cookies the response set
    pub cookies_set: usize,
    /// Transport error recorded by the browser
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrafficEntry {
    pub fn is_script(&self) -> bool {
        self.resource_type == ResourceType::Script || ResourceType::from_mime(&self.mime_type) == ResourceType::Script
    }

    /// Transport failure or HTTP error status.
    pub fn is_error(&self) -> bool {
        self.status == 0 || self.status >= 400 || self.error.is_some()
    }

    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status) && self.error.is_none()
    }

    /// Informational 1xx answer, e.g. a WebSocket upgrade. Neither a
    /// success nor a failure.
    pub fn is_protocol_switch(&self) -> bool {
        (100..200).contains(&self.status) && self.error.is_none()
    }

    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.response_headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_date_time: Option<String>,
}

fn text(node: &Node, keys: &[&str]) -> String {
    node.path(keys).and_then(Node::text).unwrap_or_default().to_string()
}

fn number(node: &Node, keys: &[&str]) -> Option<f64> {
    node.path(keys).and_then(Node::as_f64).filter(|n| n.is_finite())
}

fn non_negative(node: &Node, keys: &[&str]) -> f64 {
    number(node, keys).filter(|n| *n >= 0.0).unwrap_or(0.0)
}

fn list<'a>(node: &'a Node, parent: &[&str], key: &str) -> &'a [Node] {
    node.path(parent).map(|p| p.children(key)).unwrap_or(&[])
}

fn headers(node: &Node, parent: &str) -> Vec<Header> {
    list(node, &[parent], "headers")
        .iter()
        .filter(|h| h.is_map())
        .map(|h| Header {
            name: text(h, &["name"]),
            value: text(h, &["value"]),
        })
        .collect()
}

fn split_url(url: &str) -> (Option<String>, String) {
    match url::Url::parse(url) {
        Ok(parsed) => (
            parsed.host_str().map(str::to_lowercase),
            parsed.path().to_string(),
        ),
        Err(_) => (None, url.split(['?', '#']).next().unwrap_or_default().to_string()),
    }
}

fn entry(node: &Node, sequence_id: usize) -> TrafficEntry {
    let url = text(node, &["request", "url"]);
    let (host, path) = split_url(&url);
    let mime_type = text(node, &["response", "content", "mimeType"]);

    let resource_type = node
        .get("_resourceType")
        .and_then(Node::text)
        .and_then(ResourceType::from_recorded)
        .unwrap_or_else(|| ResourceType::from_mime(&mime_type));

    let status = number(node, &["response", "status"])
        .filter(|s| *s >= 0.0)
        .map(|s| s.min(u16::MAX as f64) as u16)
        .unwrap_or(0);

    let transfer_size = number(node, &["response", "_transferSize"])
        .filter(|n| *n >= 0.0)
        .or_else(|| {
            let header_bytes = number(node, &["response", "headersSize"])?;
            let body_bytes = number(node, &["response", "bodySize"])?;
            (header_bytes >= 0.0 && body_bytes >= 0.0).then_some(header_bytes + body_bytes)
        })
        .unwrap_or(0.0) as u64;

    let response_headers = headers(node, "response");
    let cookie_headers = response_headers
        .iter()
        .filter(|h| h.name.eq_ignore_ascii_case("set-cookie"))
        .count();
    let cookie_list = list(node, &["response"], "cookies")
        .iter()
        .filter(|n| n.is_map())
        .count();

    let error = node
        .path(&["response", "_error"])
        .or_else(|| node.get("_error"))
        .and_then(Node::text)
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string);

    TrafficEntry {
        sequence_id,
        started_date_time: node.get("startedDateTime").and_then(Node::text).map(str::to_string),
        method: text(node, &["request", "method"]).to_uppercase(),
        url,
        host,
        path,
        status,
        status_text: text(node, &["response", "statusText"]),
        resource_type,
        mime_type,
        content_size: non_negative(node, &["response", "content", "size"]) as u64,
        transfer_size,
        time: non_negative(node, &["time"]),
        timings: Timings {
            dns: non_negative(node, &["timings", "dns"]),
            connect: non_negative(node, &["timings", "connect"]),
            wait: non_negative(node, &["timings", "wait"]),
            receive: non_negative(node, &["timings", "receive"]),
        },
        request_headers: headers(node, "request"),
        response_headers,
        cookies_set: cookie_headers.max(cookie_list),
        error,
    }
}

/// Entries in capture order.
pub fn extract_entries(doc: &ParsedDocument) -> Vec<TrafficEntry> {
    list(doc.root(), &["log"], "entries")
        .iter()
        .filter(|n| n.is_map())
        .enumerate()
        .map(|(i, n)| entry(n, i))
        .collect()
}

pub fn extract_pages(doc: &ParsedDocument) -> Vec<Page> {
    list(doc.root(), &["log"], "pages")
        .iter()
        .filter(|n| n.is_map())
        .map(|p| Page {
            id: p.get("id").and_then(Node::text).map(str::to_string),
            title: text(p, &["title"]),
            started_date_time: p.get("startedDateTime").and_then(Node::text).map(str::to_string),
        })
        .collect()
}
