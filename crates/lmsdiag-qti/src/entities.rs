//! Question extraction.
//!
//! Walks a parsed assessment document and produces a flat, ordered list of
//! questions. Sections nest without a depth limit. Tests that only reference
//! external item files produce one `Referenced Item` per reference; those
//! files are never opened here.

use crate::media::lookup_key;
use crate::question_type::{self, QuestionType};
use lazy_static::lazy_static;
use lmsdiag_core::{Node, ParsedDocument};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Points used when no maximum-score construct is present.
pub const DEFAULT_POINTS: f64 = 1.0;

lazy_static! {
    /// Markup that embeds media inside item text.
    static ref MEDIA_MARKUP: Regex =
        Regex::new(r"(?i)<(?:img|video|audio|object|embed|iframe)\b|\$IMS[-_]CC[-_]FILEBASE\$").unwrap();
}

const MEDIA_ELEMENTS: &[&str] = &[
    "matimage", "mataudio", "matvideo", "img", "object", "audio", "video",
];

const FEEDBACK_ELEMENTS_QTI12: &[&str] = &["itemfeedback"];
const FEEDBACK_ELEMENTS_QTI2: &[&str] = &["modalFeedback", "feedbackInline", "feedbackBlock"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub points: f64,
    pub has_feedback: bool,
    pub has_media: bool,
    /// Container member the question came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// Item file a `Referenced Item` points at, as a lookup key relative to
    /// the container root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_ref: Option<String>,
}

/// Extract every question in document order.
///
/// A document that did not parse yields an empty list.
pub fn extract_questions(doc: &ParsedDocument) -> Vec<Question> {
    let root = doc.root();
    let mut out = Vec::new();

    if let Some(qti) = root.get("questestinterop") {
        for key in ["assessment", "objectbank"] {
            for container in qti.children(key) {
                walk_qti12(container, &mut out);
            }
        }
        walk_qti12(qti, &mut out);
    } else if let Some(item) = root.get("assessmentItem") {
        out.push(qti2_item(item, 0));
    } else if let Some(test) = root.get("assessmentTest") {
        for part in test.children("testPart") {
            walk_qti2_test(part, &mut out);
        }
        walk_qti2_test(test, &mut out);
    }

    let base_dir = doc.base_dir();
    for q in &mut out {
        if let Some(href) = q.item_ref.take() {
            q.item_ref = Some(lookup_key(&format!("{base_dir}{href}")));
        }
        if let Some(path) = &doc.path {
            q.source_file = Some(path.clone());
        }
    }
    out
}

fn walk_qti12(container: &Node, out: &mut Vec<Question>) {
    for item in container.children("item") {
        let index = out.len();
        out.push(qti12_item(item, index));
    }
    for section in container.children("section") {
        walk_qti12(section, out);
    }
}

fn walk_qti2_test(container: &Node, out: &mut Vec<Question>) {
    for reference in container.children("assessmentItemRef") {
        let index = out.len();
        out.push(Question {
            id: reference
                .attr("identifier")
                .map(str::to_string)
                .unwrap_or_else(|| fallback_id(index)),
            title: None,
            question_type: QuestionType::ReferencedItem,
            points: DEFAULT_POINTS,
            has_feedback: false,
            has_media: false,
            source_file: None,
            item_ref: reference.attr("href").map(str::to_string),
        });
    }
    for section in container.children("assessmentSection") {
        walk_qti2_test(section, out);
    }
}

fn fallback_id(index: usize) -> String {
    format!("item-{}", index + 1)
}

fn qti12_item(item: &Node, index: usize) -> Question {
    let question_type = question_type::metadata_type(item)
        .or_else(|| question_type::infer_qti12(item))
        .unwrap_or(QuestionType::Unknown);

    let points = question_type::metadata_field(item, "points_possible")
        .and_then(|p| p.trim().parse::<f64>().ok())
        .or_else(|| {
            item.find_all("decvar")
                .into_iter()
                .find_map(|d| d.attr("maxvalue").and_then(|v| v.trim().parse::<f64>().ok()))
        });

    Question {
        id: item
            .attr("ident")
            .map(str::to_string)
            .unwrap_or_else(|| fallback_id(index)),
        title: item.attr("title").map(str::to_string),
        question_type,
        points: sanitize_points(points),
        has_feedback: item.contains_key(FEEDBACK_ELEMENTS_QTI12),
        has_media: has_media(item),
        source_file: None,
        item_ref: None,
    }
}

fn qti2_item(item: &Node, index: usize) -> Question {
    let question_type = question_type::infer_qti2(item).unwrap_or(QuestionType::Unknown);

    let outcomes = item.children("outcomeDeclaration");
    let outcome = |id: &str| {
        outcomes
            .iter()
            .find(|o| o.attr("identifier").map(|i| i.eq_ignore_ascii_case(id)).unwrap_or(false))
    };
    let points = outcome("MAXSCORE")
        .and_then(|o| o.path(&["defaultValue", "value"]))
        .and_then(Node::as_f64)
        .or_else(|| {
            outcome("SCORE")
                .and_then(|o| o.attr("normalMaximum"))
                .and_then(|v| v.trim().parse::<f64>().ok())
        });

    Question {
        id: item
            .attr("identifier")
            .map(str::to_string)
            .unwrap_or_else(|| fallback_id(index)),
        title: item.attr("title").map(str::to_string),
        question_type,
        points: sanitize_points(points),
        has_feedback: item.contains_key(FEEDBACK_ELEMENTS_QTI2),
        has_media: has_media(item),
        source_file: None,
        item_ref: None,
    }
}

fn sanitize_points(points: Option<f64>) -> f64 {
    match points {
        Some(p) if p.is_finite() && p >= 0.0 => p,
        _ => DEFAULT_POINTS,
    }
}

/// Media presence over the item subtree: a media element, or embedded
/// markup in item text.
fn has_media(item: &Node) -> bool {
    item.contains_key(MEDIA_ELEMENTS) || item.any_leaf(&|s| MEDIA_MARKUP.is_match(s))
}
