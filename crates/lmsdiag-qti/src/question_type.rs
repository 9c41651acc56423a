//! Question type classification.
//!
//! Precedence:
//! 1. explicit type metadata mapped through the canonical-name table
//! 2. structural inference from the response construct
//! 3. `Unknown`

use lazy_static::lazy_static;
use lmsdiag_core::Node;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "Multiple Choice")]
    MultipleChoice,
    #[serde(rename = "True/False")]
    TrueFalse,
    #[serde(rename = "Multiple Answer")]
    MultipleAnswer,
    #[serde(rename = "Fill in the Blank")]
    FillInBlank,
    #[serde(rename = "Fill in Multiple Blanks")]
    FillInMultipleBlanks,
    #[serde(rename = "Multiple Dropdowns")]
    MultipleDropdowns,
    #[serde(rename = "Matching")]
    Matching,
    #[serde(rename = "Numerical")]
    Numerical,
    #[serde(rename = "Formula")]
    Formula,
    #[serde(rename = "Essay")]
    Essay,
    #[serde(rename = "File Upload")]
    FileUpload,
    #[serde(rename = "Text (no question)")]
    TextOnly,
    #[serde(rename = "Hotspot")]
    Hotspot,
    #[serde(rename = "Ordering")]
    Ordering,
    #[serde(rename = "Categorization")]
    Categorization,
    #[serde(rename = "Slider")]
    Slider,
    #[serde(rename = "Referenced Item")]
    ReferencedItem,
    #[serde(rename = "unknown")]
    Unknown,
}

impl QuestionType {
    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "Multiple Choice",
            QuestionType::TrueFalse => "True/False",
            QuestionType::MultipleAnswer => "Multiple Answer",
            QuestionType::FillInBlank => "Fill in the Blank",
            QuestionType::FillInMultipleBlanks => "Fill in Multiple Blanks",
            QuestionType::MultipleDropdowns => "Multiple Dropdowns",
            QuestionType::Matching => "Matching",
            QuestionType::Numerical => "Numerical",
            QuestionType::Formula => "Formula",
            QuestionType::Essay => "Essay",
            QuestionType::FileUpload => "File Upload",
            QuestionType::TextOnly => "Text (no question)",
            QuestionType::Hotspot => "Hotspot",
            QuestionType::Ordering => "Ordering",
            QuestionType::Categorization => "Categorization",
            QuestionType::Slider => "Slider",
            QuestionType::ReferencedItem => "Referenced Item",
            QuestionType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

lazy_static! {
    /// Metadata values (Canvas `question_type`, Common Cartridge `cc_profile`,
    /// `qmd_itemtype`) mapped to canonical types. Keys are lowercase.
    static ref CANONICAL_NAMES: HashMap<&'static str, QuestionType> = {
        use QuestionType::*;
        let mut m = HashMap::new();
        m.insert("multiple_choice_question", MultipleChoice);
        m.insert("true_false_question", TrueFalse);
        m.insert("multiple_answers_question", MultipleAnswer);
        m.insert("short_answer_question", FillInBlank);
        m.insert("fill_in_multiple_blanks_question", FillInMultipleBlanks);
        m.insert("multiple_dropdowns_question", MultipleDropdowns);
        m.insert("matching_question", Matching);
        m.insert("numerical_question", Numerical);
        m.insert("calculated_question", Formula);
        m.insert("essay_question", Essay);
        m.insert("file_upload_question", FileUpload);
        m.insert("text_only_question", TextOnly);
        m.insert("hot_spot_question", Hotspot);
        m.insert("ordering_question", Ordering);
        m.insert("categorization_question", Categorization);
        m.insert("cc.multiple_choice.v0p1", MultipleChoice);
        m.insert("cc.true_false.v0p1", TrueFalse);
        m.insert("cc.multiple_response.v0p1", MultipleAnswer);
        m.insert("cc.fib.v0p1", FillInBlank);
        m.insert("cc.pattern_match.v0p1", FillInBlank);
        m.insert("cc.essay.v0p1", Essay);
        m.insert("multiple-choice", MultipleChoice);
        m.insert("true/false", TrueFalse);
        m.insert("multiple-response", MultipleAnswer);
        m.insert("fill-in-blank", FillInBlank);
        m.insert("essay", Essay);
        m
    };

    static ref TAGS: Regex = Regex::new(r"<[^>]*>").unwrap();
}

/// Metadata field labels that carry an explicit type.
const TYPE_FIELDS: &[&str] = &["question_type", "cc_profile", "qmd_itemtype"];

/// Pairs of choice labels that identify a true/false question, in any order.
const TRUE_FALSE_PAIRS: &[(&str, &str)] = &[
    ("true", "false"),
    ("verdadeiro", "falso"),
    ("verdadero", "falso"),
    ("vrai", "faux"),
    ("wahr", "falsch"),
];

/// Map an explicit metadata value through the canonical table.
pub fn from_metadata(value: &str) -> Option<QuestionType> {
    CANONICAL_NAMES.get(value.trim().to_lowercase().as_str()).copied()
}

/// Explicit type declared in QTI 1.2 item metadata.
pub fn metadata_type(item: &Node) -> Option<QuestionType> {
    TYPE_FIELDS
        .iter()
        .filter_map(|field| metadata_field(item, field))
        .find_map(from_metadata)
}

/// Value of a `qtimetadatafield` whose `fieldlabel` equals `label`.
pub fn metadata_field<'a>(item: &'a Node, label: &str) -> Option<&'a str> {
    item.find_all("qtimetadatafield").into_iter().find_map(|field| {
        let name = field.first("fieldlabel").and_then(Node::text)?;
        if name.trim().eq_ignore_ascii_case(label) {
            field.first("fieldentry").and_then(Node::text)
        } else {
            None
        }
    })
}

/// Two choices whose labels form a true/false pair.
pub fn is_true_false(labels: &[String]) -> bool {
    if labels.len() != 2 {
        return false;
    }
    let a = labels[0].trim().to_lowercase();
    let b = labels[1].trim().to_lowercase();
    TRUE_FALSE_PAIRS
        .iter()
        .any(|(t, f)| (a == *t && b == *f) || (a == *f && b == *t))
}

fn plain_text(s: &str) -> String {
    TAGS.replace_all(s, "").trim().to_string()
}

/// Visible label of a choice, whatever block markup wraps it.
fn choice_label(choice: &Node) -> String {
    plain_text(&choice.text_content())
}

fn has_multiple_cardinality(node: &Node, attr: &str) -> bool {
    node.attr(attr)
        .map(|c| c.trim().eq_ignore_ascii_case("multiple"))
        .unwrap_or(false)
}

/// Structural inference for a QTI 1.2 `item`.
pub fn infer_qti12(item: &Node) -> Option<QuestionType> {
    let presentation = item.first("presentation")?;

    if presentation.contains_key(&["response_xy"]) {
        return Some(QuestionType::Hotspot);
    }

    let lids = presentation.find_all("response_lid");
    if let Some(first) = lids.first() {
        if lids.iter().any(|l| has_multiple_cardinality(l, "rcardinality")) {
            return Some(QuestionType::MultipleAnswer);
        }
        if lids.len() > 1 {
            return Some(QuestionType::Matching);
        }
        let labels: Vec<String> = first
            .find_all("response_label")
            .into_iter()
            .map(|label| {
                let mattext: Vec<String> = label
                    .find_all("mattext")
                    .into_iter()
                    .map(Node::text_content)
                    .collect();
                if mattext.is_empty() {
                    choice_label(label)
                } else {
                    plain_text(&mattext.join(" "))
                }
            })
            .collect();
        if is_true_false(&labels) {
            return Some(QuestionType::TrueFalse);
        }
        return Some(QuestionType::MultipleChoice);
    }

    if presentation.contains_key(&["response_num"]) {
        return Some(QuestionType::Numerical);
    }
    if presentation.contains_key(&["response_grp"]) {
        return Some(QuestionType::Matching);
    }
    let strs = presentation.find_all("response_str");
    match strs.len() {
        0 => Some(QuestionType::TextOnly),
        1 => Some(QuestionType::FillInBlank),
        _ => Some(QuestionType::FillInMultipleBlanks),
    }
}

/// Structural inference for a QTI 2.x `assessmentItem`.
pub fn infer_qti2(item: &Node) -> Option<QuestionType> {
    let body = item.first("itemBody")?;

    if body.contains_key(&["hotspotInteraction", "selectPointInteraction"]) {
        return Some(QuestionType::Hotspot);
    }

    let choices = body.find_all("choiceInteraction");
    if !choices.is_empty() {
        let declared_multiple = item
            .children("responseDeclaration")
            .iter()
            .any(|d| has_multiple_cardinality(d, "cardinality"));
        let multi_select = choices
            .iter()
            .any(|c| c.attr("maxChoices").map(|m| m.trim() != "1").unwrap_or(false));
        if declared_multiple || multi_select {
            return Some(QuestionType::MultipleAnswer);
        }
        let labels: Vec<String> = choices[0]
            .find_all("simpleChoice")
            .into_iter()
            .map(choice_label)
            .collect();
        if is_true_false(&labels) {
            return Some(QuestionType::TrueFalse);
        }
        return Some(QuestionType::MultipleChoice);
    }

    let table: &[(&[&str], QuestionType)] = &[
        (&["inlineChoiceInteraction"], QuestionType::MultipleDropdowns),
        (&["extendedTextInteraction"], QuestionType::Essay),
        (
            &["matchInteraction", "associateInteraction", "gapMatchInteraction"],
            QuestionType::Matching,
        ),
        (&["orderInteraction", "graphicOrderInteraction"], QuestionType::Ordering),
        (&["uploadInteraction"], QuestionType::FileUpload),
        (&["sliderInteraction"], QuestionType::Slider),
    ];
    if let Some((_, t)) = table.iter().find(|(keys, _)| body.contains_key(keys)) {
        return Some(*t);
    }

    match body.find_all("textEntryInteraction").len() {
        0 => {}
        1 => return Some(QuestionType::FillInBlank),
        _ => return Some(QuestionType::FillInMultipleBlanks),
    }

    if body.contains_key(&["customInteraction", "drawingInteraction", "mediaInteraction"]) {
        return None;
    }
    Some(QuestionType::TextOnly)
}
