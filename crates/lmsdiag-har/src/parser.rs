//! Capture parsing.
//!
//! Lowers the JSON log into the shared `Node` tree. Never fails: invalid
//! JSON or a document without a `log` object is reported through
//! `parse_errors` with `well_formed = false`.

use lmsdiag_core::{decode_text, FormatVersion, Node, ParseIssue, ParseIssueKind, ParsedDocument};
use serde_json::error::Category;
use serde_json::Value;

pub fn detect_version(version: Option<&str>) -> FormatVersion {
    match version.map(str::trim) {
        Some("1.2") => FormatVersion::Har12,
        Some("1.1") => FormatVersion::Har11,
        _ => FormatVersion::Unknown,
    }
}

pub fn parse_bytes(bytes: &[u8]) -> ParsedDocument {
    parse(decode_text(bytes))
}

pub fn parse(source: String) -> ParsedDocument {
    if source.trim().is_empty() {
        return ParsedDocument::malformed(
            FormatVersion::Unknown,
            ParseIssue::new(ParseIssueKind::Empty, "capture is empty"),
            source,
        );
    }

    let value: Value = match serde_json::from_str(&source) {
        Ok(v) => v,
        Err(e) => {
            let kind = match e.classify() {
                Category::Eof => ParseIssueKind::Truncated,
                _ => ParseIssueKind::Syntax,
            };
            tracing::debug!(error = %e, "capture is not valid JSON");
            let issue = ParseIssue::new(kind, e.to_string()).at(format!("{}:{}", e.line(), e.column()));
            return ParsedDocument::malformed(FormatVersion::Unknown, issue, source);
        }
    };

    let Some(log) = value.get("log").filter(|l| l.is_object()) else {
        return ParsedDocument::malformed(
            FormatVersion::Unknown,
            ParseIssue::new(ParseIssueKind::Shape, "missing top-level log object"),
            source,
        );
    };

    let version = detect_version(log.get("version").and_then(Value::as_str));
    ParsedDocument::parsed(version, Node::from(&value), source)
}
