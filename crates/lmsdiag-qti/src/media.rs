//! Media reference resolution.
//!
//! References are found by scanning the raw document text rather than the
//! parsed tree, so markup that lives inside escaped item text is still seen.
//! Each distinct raw reference yields exactly one record, classified as:
//! - `external` when it carries a URL scheme or is protocol-relative
//! - `resolved` / `missing` when a container inventory is available
//! - `unknown` otherwise

use lazy_static::lazy_static;
use lmsdiag_core::ParsedDocument;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Placeholder base path Common Cartridge exports put in front of file references.
pub const FILEBASE_TOKENS: &[&str] = &["$IMS-CC-FILEBASE$", "$IMS_CC_FILEBASE$"];

/// Directory file-base content lives in inside Common Cartridge packages.
pub const WEB_RESOURCES_DIR: &str = "web_resources/";

lazy_static! {
    /// Media attributes specific to assessment markup.
    static ref STRUCTURAL_ATTR: Regex = Regex::new(
        r#"(?i)<(?:[\w.-]+:)?(?:matimage|mataudio|matvideo|matapplet|matapplication)\b[^>]*?\buri\s*=\s*(?:"([^"]*)"|'([^']*)')|<(?:[\w.-]+:)?object\b[^>]*?\bdata\s*=\s*(?:"([^"]*)"|'([^']*)')"#
    ).unwrap();

    /// Generic `src`/`href` attributes, including entity-escaped quotes used
    /// inside item text.
    static ref MARKUP_ATTR: Regex = Regex::new(
        r#"(?i)\b(?:src|href)\s*=\s*(?:"([^"]*)"|'([^']*)'|&quot;(.*?)&quot;|&#34;(.*?)&#34;|&#39;(.*?)&#39;)"#
    ).unwrap();

    static ref URL_SCHEME: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").unwrap();
}

/// Schemes that never point at a package resource.
const NON_RESOURCE_PREFIXES: &[&str] = &["#", "mailto:", "javascript:", "data:", "tel:", "about:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    StructuralAttribute,
    MarkupAttribute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Resolved,
    Missing,
    External,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaReference {
    pub raw_reference: String,
    pub decoded_reference: String,
    pub normalized_path: String,
    pub source_kind: SourceKind,
    pub classification: Resolution,
    pub is_internal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

/// What a container says it holds and what it actually holds, keyed for
/// case-insensitive, separator-normalized lookup.
#[derive(Debug, Clone, Default)]
pub struct ContainerInventory {
    declared: HashSet<String>,
    physical: HashSet<String>,
}

impl ContainerInventory {
    pub fn new<D, P>(declared: D, physical: P) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        Self {
            declared: declared.into_iter().map(|p| lookup_key(p.as_ref())).collect(),
            physical: physical.into_iter().map(|p| lookup_key(p.as_ref())).collect(),
        }
    }

    /// Present in either the declared or the physical listing.
    pub fn contains(&self, path: &str) -> bool {
        let key = lookup_key(path);
        self.physical.contains(&key) || self.declared.contains(&key)
    }
}

/// Normalize a path for inventory comparison: forward slashes, no `./` or
/// leading `/`, `..` segments collapsed, lowercase.
pub fn lookup_key(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/").to_lowercase()
}

/// Raw references in source order, deduplicated by raw value.
pub fn scan_references(source: &str) -> Vec<(String, SourceKind)> {
    let mut found: Vec<(usize, String, SourceKind)> = Vec::new();
    for (pattern, kind) in [
        (&*STRUCTURAL_ATTR, SourceKind::StructuralAttribute),
        (&*MARKUP_ATTR, SourceKind::MarkupAttribute),
    ] {
        for caps in pattern.captures_iter(source) {
            if let Some(m) = caps.iter().skip(1).flatten().next() {
                found.push((m.start(), m.as_str().trim().to_string(), kind));
            }
        }
    }
    found.sort_by_key(|(pos, _, _)| *pos);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|(_, raw, _)| !raw.is_empty() && seen.insert(raw.clone()))
        .map(|(_, raw, kind)| (raw, kind))
        .collect()
}

/// Percent-decode a reference. Entity-escaped ampersands are unescaped
/// first. A value that does not decode to UTF-8 is returned unchanged.
pub fn decode_reference(raw: &str) -> String {
    let unescaped = raw.replace("&amp;", "&");
    match percent_decode_str(&unescaped).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

pub fn is_external(reference: &str) -> bool {
    reference.starts_with("//") || URL_SCHEME.is_match(reference)
}

fn strip_filebase(path: &str) -> (String, bool) {
    for token in FILEBASE_TOKENS {
        if let Some(idx) = path.find(token) {
            let rest = &path[idx + token.len()..];
            return (rest.trim_start_matches('/').to_string(), true);
        }
    }
    (path.to_string(), false)
}

/// Path used for inventory lookups: forward slashes, placeholder base path
/// stripped, no leading `./`, query and fragment removed.
pub fn normalize_reference(decoded: &str) -> String {
    let (path, _) = strip_filebase(&decoded.replace('\\', "/"));
    let mut path = path.as_str();
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path[..end].to_string()
}

fn is_resource_reference(decoded: &str) -> bool {
    let lower = decoded.trim().to_lowercase();
    if lower.is_empty() || NON_RESOURCE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return false;
    }
    // Item and manifest references are structure, not media
    let path_end = lower.find(['?', '#']).unwrap_or(lower.len());
    !lower[..path_end].ends_with(".xml")
}

/// Resolve every media reference in `doc` against an optional container
/// inventory.
pub fn resolve_references(
    doc: &ParsedDocument,
    inventory: Option<&ContainerInventory>,
) -> Vec<MediaReference> {
    let base_dir = doc.base_dir();
    scan_references(&doc.source)
        .into_iter()
        .filter_map(|(raw, source_kind)| {
            let decoded = decode_reference(&raw);
            if !is_resource_reference(&decoded) {
                return None;
            }
            let external = is_external(&decoded);
            let normalized_path = if external {
                decoded.clone()
            } else {
                normalize_reference(&decoded)
            };
            let classification = if external {
                Resolution::External
            } else {
                match inventory {
                    None => Resolution::Unknown,
                    Some(inv) => {
                        let with_filebase = strip_filebase(&decoded).1;
                        if candidates(&normalized_path, base_dir, with_filebase)
                            .iter()
                            .any(|c| inv.contains(c))
                        {
                            Resolution::Resolved
                        } else {
                            Resolution::Missing
                        }
                    }
                }
            };
            Some(MediaReference {
                raw_reference: raw,
                decoded_reference: decoded,
                normalized_path,
                source_kind,
                classification,
                is_internal: !external,
                source_file: doc.path.clone(),
            })
        })
        .collect()
}

/// Paths a relative reference may resolve to inside the container.
fn candidates(normalized: &str, base_dir: &str, with_filebase: bool) -> Vec<String> {
    let mut out = vec![normalized.to_string()];
    if !base_dir.is_empty() && !normalized.starts_with('/') {
        out.push(format!("{base_dir}{normalized}"));
    }
    if with_filebase {
        out.push(format!("{WEB_RESOURCES_DIR}{normalized}"));
    }
    out
}

/// Union of reference lists, keeping the first record per raw reference.
pub fn merge_references<I>(lists: I) -> Vec<MediaReference>
where
    I: IntoIterator<Item = Vec<MediaReference>>,
{
    let mut seen = BTreeSet::new();
    lists
        .into_iter()
        .flatten()
        .filter(|r| seen.insert(r.raw_reference.clone()))
        .collect()
}
