//! Response heuristics: oversized text payloads and error records.

use crate::entries::TrafficEntry;
use crate::settings::CaptureSettings;
use serde::{Deserialize, Serialize};

/// Text payload kinds the oversized-response check looks at.
const TEXT_MIME_MARKERS: &[&str] = &["text/", "html", "json", "javascript", "xml"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OversizedResponse {
    pub sequence_id: usize,
    pub url: String,
    pub mime_type: String,
    pub size: u64,
}

/// A failed application request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub sequence_id: usize,
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub path: String,
    pub status: u16,
    pub status_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn is_telemetry(entry: &TrafficEntry, settings: &CaptureSettings) -> bool {
    entry
        .host
        .as_deref()
        .map(|h| settings.is_telemetry_host(h))
        .unwrap_or(false)
}

fn is_text_payload(mime: &str) -> bool {
    let mime = mime.to_lowercase();
    TEXT_MIME_MARKERS.iter().any(|m| mime.contains(m))
}

/// Text responses larger than the configured threshold, in capture order.
pub fn oversized_responses(entries: &[TrafficEntry], settings: &CaptureSettings) -> Vec<OversizedResponse> {
    entries
        .iter()
        .filter(|e| !is_telemetry(e, settings))
        .filter(|e| e.content_size > settings.oversized_threshold && is_text_payload(&e.mime_type))
        .map(|e| OversizedResponse {
            sequence_id: e.sequence_id,
            url: e.url.clone(),
            mime_type: e.mime_type.clone(),
            size: e.content_size,
        })
        .collect()
}

/// Non-telemetry entries that failed, in capture order.
pub fn error_records(entries: &[TrafficEntry], settings: &CaptureSettings) -> Vec<ErrorRecord> {
    entries
        .iter()
        .filter(|e| e.is_error() && !is_telemetry(e, settings))
        .map(|e| ErrorRecord {
            sequence_id: e.sequence_id,
            method: e.method.clone(),
            url: e.url.clone(),
            host: e.host.clone(),
            path: e.path.clone(),
            status: e.status,
            status_text: e.status_text.clone(),
            error: e.error.clone(),
        })
        .collect()
}

/// First `limit` items, in source order.
pub fn sample<T: Clone>(items: &[T], limit: usize) -> Vec<T> {
    items.iter().take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::entries::extract_entries;

    #[test]
    fn test_oversized_and_errors() {
        let doc = parse(
            r#"{"log":{"entries":[
              {"request":{"method":"GET","url":"https://app.edu/big"},"response":{"status":200,"content":{"mimeType":"text/html","size":204800}}},
              {"request":{"method":"GET","url":"https://app.edu/img.png"},"response":{"status":200,"content":{"mimeType":"image/png","size":504800}}},
              {"request":{"method":"POST","url":"https://app.edu/api"},"response":{"status":500,"statusText":"Server Error","content":{}}},
              {"request":{"method":"POST","url":"https://o1.ingest.sentry.io/api/1/envelope"},"response":{"status":429,"content":{}}}
            ]}}"#
                .to_string(),
        );
        let entries = extract_entries(&doc);
        let settings = CaptureSettings::default();

        let big = oversized_responses(&entries, &settings);
        assert_eq!(big.len(), 1);
        assert_eq!(big[0].sequence_id, 0);

        let errors = error_records(&entries, &settings);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].status, 500);
        assert_eq!(errors[0].path, "/api");
    }

    #[test]
    fn test_sample_preserves_order() {
        let items = vec![3, 1, 2, 5, 4];
        assert_eq!(sample(&items, 3), vec![3, 1, 2]);
        assert_eq!(sample(&items, 10).len(), 5);
    }
}
