//! Structural validation of parsed assessment documents.

use lmsdiag_core::{FormatVersion, ParsedDocument};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn finish(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// Check that the document has the root and required children expected
/// for its version. Never fails; defects are returned as data.
pub fn validate(doc: &ParsedDocument) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !doc.well_formed {
        let detail = doc
            .parse_errors
            .first()
            .map(|e| e.message.as_str())
            .unwrap_or("parse failed");
        errors.push(format!("document is not well-formed: {detail}"));
        return ValidationResult::finish(errors, warnings);
    }

    let root = doc.root();
    match doc.format_version {
        FormatVersion::Qti12 => match root.get("questestinterop") {
            None => errors.push("missing questestinterop root element".to_string()),
            Some(qti) => {
                let has_content = ["assessment", "objectbank", "section", "item"]
                    .iter()
                    .any(|k| !qti.children(k).is_empty());
                if !has_content {
                    warnings.push("questestinterop contains no assessment, section or item".to_string());
                }
                for assessment in qti.children("assessment") {
                    if assessment.attr("ident").is_none() {
                        warnings.push("assessment has no ident attribute".to_string());
                    }
                }
                let missing_ident = qti
                    .find_all("item")
                    .into_iter()
                    .filter(|item| item.attr("ident").is_none())
                    .count();
                if missing_ident > 0 {
                    warnings.push(format!("{missing_ident} item(s) have no ident attribute"));
                }
            }
        },
        FormatVersion::Qti21 | FormatVersion::Qti22 => {
            if let Some(item) = root.get("assessmentItem") {
                if item.attr("identifier").is_none() {
                    warnings.push("assessmentItem has no identifier attribute".to_string());
                }
                if item.get("itemBody").is_none() {
                    warnings.push("assessmentItem has no itemBody".to_string());
                }
            } else if let Some(test) = root.get("assessmentTest") {
                if test.attr("identifier").is_none() {
                    warnings.push("assessmentTest has no identifier attribute".to_string());
                }
                if test.children("testPart").is_empty() {
                    warnings.push("assessmentTest has no testPart".to_string());
                }
            } else {
                errors.push("missing assessmentItem or assessmentTest root element".to_string());
            }
        }
        other => errors.push(format!("unsupported document format: {other}")),
    }

    ValidationResult::finish(errors, warnings)
}
