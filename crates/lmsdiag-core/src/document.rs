//! Parsed document model shared by both analyzers.
use crate::node::Node;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Detected format of a parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormatVersion {
    #[serde(rename = "qti-1.2")]
    Qti12,
    #[serde(rename = "qti-2.1")]
    Qti21,
    #[serde(rename = "qti-2.2")]
    Qti22,
    #[serde(rename = "har-1.2")]
    Har12,
    #[serde(rename = "har-1.1")]
    Har11,
    #[serde(rename = "unknown")]
    Unknown,
}

impl FormatVersion {
    /// Older format still accepted by importers but with reduced fidelity.
    pub fn is_legacy(&self) -> bool {
        matches!(self, FormatVersion::Qti12)
    }

    pub fn label(&self) -> &'static str {
        match self {
            FormatVersion::Qti12 => "QTI 1.2",
            FormatVersion::Qti21 => "QTI 2.1",
            FormatVersion::Qti22 => "QTI 2.2",
            FormatVersion::Har12 => "HAR 1.2",
            FormatVersion::Har11 => "HAR 1.1",
            FormatVersion::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseIssueKind {
    /// Mismatched tags, bad tokens, invalid JSON syntax
    Syntax,
    /// Stream ended before the document was complete
    Truncated,
    /// Input was empty or whitespace only
    Empty,
    /// Parsed, but the top-level shape is not the expected one
    Shape,
}

/// A single structural defect found while parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseIssue {
    pub kind: ParseIssueKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ParseIssue {
    pub fn new(kind: ParseIssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Output of a parser. Never mutated once built.
///
/// When `well_formed` is false, `tree` may be absent and downstream stages
/// treat every missing field as unknown.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Member path inside a container, if any
    pub path: Option<String>,
    pub format_version: FormatVersion,
    pub tree: Option<Node>,
    pub parse_errors: Vec<ParseIssue>,
    pub well_formed: bool,
    /// Decoded source text, kept for raw-text scans
    pub source: String,
}

impl ParsedDocument {
    pub fn parsed(format_version: FormatVersion, tree: Node, source: String) -> Self {
        Self {
            path: None,
            format_version,
            tree: Some(tree),
            parse_errors: Vec::new(),
            well_formed: true,
            source,
        }
    }

    pub fn malformed(format_version: FormatVersion, issue: ParseIssue, source: String) -> Self {
        Self {
            path: None,
            format_version,
            tree: None,
            parse_errors: vec![issue],
            well_formed: false,
            source,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Root of the tree, or an empty map when the document did not parse.
    pub fn root(&self) -> &Node {
        static EMPTY: Node = Node::Map(BTreeMap::new());
        self.tree.as_ref().unwrap_or(&EMPTY)
    }

    /// Directory part of `path`, with a trailing slash, or empty.
    pub fn base_dir(&self) -> &str {
        match self.path.as_deref().and_then(|p| p.rfind('/').map(|i| &p[..=i])) {
            Some(dir) => dir,
            None => "",
        }
    }
}
