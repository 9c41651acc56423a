//! Assessment document parsing.
//!
//! Converts markup into the shared `Node` tree:
//! - attributes become `@name` keys
//! - element text becomes a leaf, or `#text` when the element has other content
//! - repeated children are grouped into a `List` under their tag name
//! - tags in the always-plural allowlist are a `List` even when single
//!
//! Version detection looks at content only, never at the file name.

use lazy_static::lazy_static;
use lmsdiag_core::node::TEXT_KEY;
use lmsdiag_core::{decode_text, FormatVersion, Node, ParseIssue, ParseIssueKind, ParsedDocument};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

lazy_static! {
    /// Tags that may repeat under their parent. Stored as lists regardless
    /// of how many instances a given document has.
    static ref ALWAYS_PLURAL: HashSet<&'static str> = [
        // QTI 1.2
        "assessment", "objectbank", "section", "item", "response_label",
        "respcondition", "itemfeedback", "qtimetadatafield", "material",
        "mattext", "matimage", "mataudio", "matvideo", "response_lid",
        "response_str", "response_num", "response_xy", "response_grp",
        "render_choice", "flow", "flow_mat", "flow_label", "varequal",
        "setvar", "displayfeedback", "decvar",
        // QTI 2.x
        "testPart", "assessmentSection", "assessmentItemRef", "simpleChoice",
        "responseDeclaration", "outcomeDeclaration", "modalFeedback",
        "mapEntry", "value", "choiceInteraction", "textEntryInteraction",
        "inlineChoiceInteraction", "inlineChoice", "simpleAssociableChoice",
        "hotspotChoice",
        // Content packaging
        "resource", "file", "dependency", "organization",
    ]
    .into_iter()
    .collect();

    /// Root markers of documents that carry assessment content.
    static ref ASSESSMENT_ROOT: Regex =
        Regex::new(r"<(?:[A-Za-z_][\w.-]*:)?(?:questestinterop|assessmentItem|assessmentTest)[\s>/]").unwrap();
}

/// Ordered content signatures: the most specific version is checked first,
/// QTI 1.2 is the fallback.
const VERSION_SIGNATURES: &[(&str, FormatVersion)] = &[
    ("imsqti_v2p2", FormatVersion::Qti22),
    ("imsqti_v2p1", FormatVersion::Qti21),
    ("imsqti_v2p0", FormatVersion::Qti21),
    ("<assessmentItem", FormatVersion::Qti21),
    ("<assessmentTest", FormatVersion::Qti21),
    (":assessmentItem", FormatVersion::Qti21),
    (":assessmentTest", FormatVersion::Qti21),
];

/// Detect the QTI version from document content.
pub fn detect_version(text: &str) -> FormatVersion {
    VERSION_SIGNATURES
        .iter()
        .find(|(marker, _)| text.contains(marker))
        .map(|(_, version)| *version)
        .unwrap_or(FormatVersion::Qti12)
}

/// Content sniff used to pick candidate members out of a container.
pub fn is_assessment_document(text: &str) -> bool {
    ASSESSMENT_ROOT.is_match(text)
}

/// Parse raw bytes (BOM-aware).
pub fn parse_bytes(bytes: &[u8]) -> ParsedDocument {
    parse(decode_text(bytes))
}

/// Parse assessment markup. Never fails: malformed input yields a document
/// with `well_formed = false` and the first defect in `parse_errors`.
pub fn parse(source: String) -> ParsedDocument {
    let version = detect_version(&source);

    if source.trim().is_empty() {
        return ParsedDocument::malformed(
            version,
            ParseIssue::new(ParseIssueKind::Empty, "document is empty"),
            source,
        );
    }

    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };

    let tree = match roxmltree::Document::parse_with_options(&source, options) {
        Ok(doc) => {
            let root = doc.root_element();
            let mut map = BTreeMap::new();
            map.insert(root.tag_name().name().to_string(), element_to_node(root));
            Node::Map(map)
        }
        Err(e) => {
            let pos = e.pos();
            let message = e.to_string();
            let kind = if message.contains("end of stream") {
                ParseIssueKind::Truncated
            } else {
                ParseIssueKind::Syntax
            };
            tracing::debug!(%message, "assessment markup is not well-formed");
            let issue = ParseIssue::new(kind, message).at(format!("{}:{}", pos.row, pos.col));
            return ParsedDocument::malformed(version, issue, source);
        }
    };

    ParsedDocument::parsed(version, tree, source)
}

fn element_to_node(element: roxmltree::Node) -> Node {
    let mut map = BTreeMap::new();
    for attr in element.attributes() {
        map.insert(format!("@{}", attr.name()), Node::Leaf(attr.value().to_string()));
    }

    let mut text = String::new();
    let mut grouped: BTreeMap<String, Vec<Node>> = BTreeMap::new();
    for child in element.children() {
        if child.is_element() {
            grouped
                .entry(child.tag_name().name().to_string())
                .or_default()
                .push(element_to_node(child));
        } else if child.is_text() {
            if let Some(t) = child.text() {
                text.push_str(t);
            }
        }
    }
    let text = text.trim();

    if map.is_empty() && grouped.is_empty() {
        return Node::Leaf(text.to_string());
    }
    if !text.is_empty() {
        map.insert(TEXT_KEY.to_string(), Node::Leaf(text.to_string()));
    }
    for (name, mut nodes) in grouped {
        let value = if nodes.len() == 1 && !ALWAYS_PLURAL.contains(name.as_str()) {
            nodes.remove(0)
        } else {
            Node::List(nodes)
        };
        map.insert(name, value);
    }
    Node::Map(map)
}
