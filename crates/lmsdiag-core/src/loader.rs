//! Raw input loading and sniffing.
//!
//! The discriminator between a single document and a container is taken
//! from the leading bytes, never from the file extension.

use crate::error::{DiagError, Result};
use std::path::Path;

/// Kind of a single (non-container) document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Json,
    Markup,
    /// Leading bytes matched nothing we know; routed to the markup parser,
    /// which reports it as not well-formed.
    Unknown,
}

/// Caller-owned input, passed by reference into the parsers.
#[derive(Debug, Clone)]
pub enum RawArchive {
    Document { bytes: Vec<u8>, kind: DocumentKind },
    Container { bytes: Vec<u8> },
}

/// Magic numbers of container types we recognize but cannot open.
const LEGACY_MAGICS: &[(&[u8], &str)] = &[
    (b"Rar!\x1a\x07", "rar"),
    (b"7z\xbc\xaf\x27\x1c", "7z"),
    (b"\x1f\x8b", "gzip"),
    (b"BZh", "bzip2"),
    (b"\xd0\xcf\x11\xe0\xa1\xb1\x1a\xe1", "ole2"),
];

const ZIP_MAGICS: &[&[u8]] = &[b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];

impl RawArchive {
    /// Classify raw bytes. Fails only for recognized legacy containers.
    pub fn sniff(bytes: Vec<u8>) -> Result<Self> {
        if ZIP_MAGICS.iter().any(|m| bytes.starts_with(m)) {
            return Ok(RawArchive::Container { bytes });
        }
        if let Some((_, name)) = LEGACY_MAGICS.iter().find(|(m, _)| bytes.starts_with(m)) {
            return Err(DiagError::UnsupportedContainer((*name).to_string()));
        }
        if bytes.len() > 262 && &bytes[257..262] == b"ustar" {
            return Err(DiagError::UnsupportedContainer("tar".to_string()));
        }

        let text = decode_text(&bytes);
        let kind = match text.trim_start().chars().next() {
            Some('{') | Some('[') => DocumentKind::Json,
            Some('<') => DocumentKind::Markup,
            _ => DocumentKind::Unknown,
        };
        Ok(RawArchive::Document { bytes, kind })
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            RawArchive::Document { bytes, .. } | RawArchive::Container { bytes } => bytes,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, RawArchive::Container { .. })
    }
}

/// Read and sniff a file from disk.
pub async fn load_path(path: impl AsRef<Path>) -> Result<RawArchive> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "loaded input");
    RawArchive::sniff(bytes)
}

/// Decode document bytes to text, honouring UTF-8 and UTF-16 byte order marks.
/// Invalid sequences are replaced rather than rejected.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(b"\xef\xbb\xbf") {
        return String::from_utf8_lossy(rest).into_owned();
    }
    let utf16 = |rest: &[u8], le: bool| -> String {
        let units = rest.chunks_exact(2).map(|c| {
            if le {
                u16::from_le_bytes([c[0], c[1]])
            } else {
                u16::from_be_bytes([c[0], c[1]])
            }
        });
        char::decode_utf16(units)
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    };
    if let Some(rest) = bytes.strip_prefix(b"\xff\xfe") {
        return utf16(rest, true);
    }
    if let Some(rest) = bytes.strip_prefix(b"\xfe\xff") {
        return utf16(rest, false);
    }
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_zip_is_container() {
        let raw = RawArchive::sniff(b"PK\x03\x04rest".to_vec()).unwrap();
        assert!(raw.is_container());
    }

    #[test]
    fn test_sniff_documents() {
        match RawArchive::sniff(b"  {\"log\":{}}".to_vec()).unwrap() {
            RawArchive::Document { kind, .. } => assert_eq!(kind, DocumentKind::Json),
            _ => panic!("expected document"),
        }
        match RawArchive::sniff(b"\xef\xbb\xbf<?xml version=\"1.0\"?><a/>".to_vec()).unwrap() {
            RawArchive::Document { kind, .. } => assert_eq!(kind, DocumentKind::Markup),
            _ => panic!("expected document"),
        }
        match RawArchive::sniff(Vec::new()).unwrap() {
            RawArchive::Document { kind, .. } => assert_eq!(kind, DocumentKind::Unknown),
            _ => panic!("expected document"),
        }
    }

    #[test]
    fn test_legacy_container_rejected() {
        let err = RawArchive::sniff(b"Rar!\x1a\x07\x00data".to_vec()).unwrap_err();
        assert!(matches!(err, DiagError::UnsupportedContainer(ref f) if f == "rar"));
        assert_eq!(err.code(), "unsupported_container");
    }

    #[test]
    fn test_decode_utf16_bom() {
        let mut bytes = vec![0xff, 0xfe];
        for unit in "<a/>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_text(&bytes), "<a/>");
    }

    #[tokio::test]
    async fn test_load_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.har");
        std::fs::write(&path, b"{\"log\":{\"entries\":[]}}").unwrap();
        let raw = load_path(&path).await.unwrap();
        assert!(!raw.is_container());

        let missing = load_path(dir.path().join("nope.har")).await;
        assert!(matches!(missing, Err(DiagError::Io(_))));
    }
}
