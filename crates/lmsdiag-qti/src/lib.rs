//! Assessment package analysis
//!
//! Parses IMS QTI documents (1.2 and 2.x), extracts questions, validates
//! structure and cross-references media against a container inventory.
//!
//! # Example
//!
//! ```ignore
//! use lmsdiag_qti::{analyze_document, parser};
//!
//! let doc = parser::parse(std::fs::read_to_string("quiz.xml")?);
//! let analysis = analyze_document(&doc, None);
//! println!("{} questions", analysis.questions.len());
//! ```

pub mod entities;
pub mod media;
pub mod package;
pub mod parser;
pub mod question_type;
pub mod validator;

pub use entities::{extract_questions, Question};
pub use media::{resolve_references, ContainerInventory, MediaReference, Resolution, SourceKind};
pub use package::{extract, ContainerManifest, ExtractedPackage, FailedFile, MemberDocument};
pub use question_type::QuestionType;
pub use validator::{validate, ValidationResult};

use lmsdiag_core::{DiagError, FormatVersion, ParseIssue, ParsedDocument, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// Everything learned from one assessment document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub format_version: FormatVersion,
    pub well_formed: bool,
    pub parse_errors: Vec<ParseIssue>,
    pub validation: ValidationResult,
    pub questions: Vec<Question>,
    pub references: Vec<MediaReference>,
}

/// Merged analysis of every usable document in a container.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageAnalysis {
    /// Format of the first usable document
    pub format_version: FormatVersion,
    pub documents: Vec<DocumentAnalysis>,
    pub questions: Vec<Question>,
    pub references: Vec<MediaReference>,
    pub validation: ValidationResult,
    pub failed_files: Vec<FailedFile>,
    pub manifest: ContainerManifest,
}

/// Run extraction, validation and media resolution over one parsed document.
pub fn analyze_document(doc: &ParsedDocument, inventory: Option<&ContainerInventory>) -> DocumentAnalysis {
    let questions = extract_questions(doc);
    let references = resolve_references(doc, inventory);
    let validation = validate(doc);
    debug!(
        path = doc.path.as_deref().unwrap_or("-"),
        version = %doc.format_version,
        questions = questions.len(),
        references = references.len(),
        "document analyzed"
    );
    DocumentAnalysis {
        path: doc.path.clone(),
        format_version: doc.format_version,
        well_formed: doc.well_formed,
        parse_errors: doc.parse_errors.clone(),
        validation,
        questions,
        references,
    }
}

/// Parse and analyze one container member. A member that is not
/// well-formed becomes a failed file rather than a partial analysis.
pub fn analyze_member(
    member: &MemberDocument,
    inventory: &ContainerInventory,
) -> std::result::Result<DocumentAnalysis, FailedFile> {
    let doc = parser::parse(member.text.clone()).with_path(member.path.clone());
    if !doc.well_formed {
        let error = doc
            .parse_errors
            .first()
            .map(|e| match &e.location {
                Some(loc) => format!("{} at {loc}", e.message),
                None => e.message.clone(),
            })
            .unwrap_or_else(|| "not well-formed".to_string());
        return Err(FailedFile {
            path: member.path.clone(),
            error,
        });
    }
    Ok(analyze_document(&doc, Some(inventory)))
}

/// Inventory built from an extracted container's manifest and listing.
pub fn inventory_for(package: &ExtractedPackage) -> ContainerInventory {
    ContainerInventory::new(
        &package.manifest.declared_member_paths,
        &package.manifest.physical_member_paths,
    )
}

/// Combine per-member results, in member order. Fails when nothing in the
/// container was usable.
pub fn merge_members(
    package: &ExtractedPackage,
    results: Vec<std::result::Result<DocumentAnalysis, FailedFile>>,
) -> Result<PackageAnalysis> {
    if package.member_documents.is_empty() {
        return Err(DiagError::NoUsableContent(
            "container holds no assessment documents".to_string(),
        ));
    }

    let mut documents = Vec::new();
    let mut failed_files = package.unreadable.clone();
    for result in results {
        match result {
            Ok(analysis) => documents.push(analysis),
            Err(failed) => failed_files.push(failed),
        }
    }
    if documents.is_empty() {
        return Err(DiagError::NoUsableContent(format!(
            "all {} assessment documents failed to parse",
            package.member_documents.len()
        )));
    }

    // A reference to an item file that was itself analyzed would count the
    // same question twice
    let analyzed: HashSet<String> = documents
        .iter()
        .filter_map(|d| d.path.as_deref().map(media::lookup_key))
        .collect();
    let format_version = documents[0].format_version;
    let questions = documents
        .iter()
        .flat_map(|d| d.questions.iter())
        .filter(|q| {
            q.question_type != QuestionType::ReferencedItem
                || !q.item_ref.as_ref().is_some_and(|r| analyzed.contains(r))
        })
        .cloned()
        .collect();
    let references = media::merge_references(documents.iter().map(|d| d.references.clone()));

    let mut validation = ValidationResult {
        valid: true,
        ..Default::default()
    };
    for doc in &documents {
        let label = doc.path.as_deref().unwrap_or("document");
        validation
            .errors
            .extend(doc.validation.errors.iter().map(|e| format!("{label}: {e}")));
        validation
            .warnings
            .extend(doc.validation.warnings.iter().map(|w| format!("{label}: {w}")));
    }
    validation.valid = validation.errors.is_empty();

    info!(
        documents = documents.len(),
        failed = failed_files.len(),
        "package analyzed"
    );
    Ok(PackageAnalysis {
        format_version,
        documents,
        questions,
        references,
        validation,
        failed_files,
        manifest: package.manifest.clone(),
    })
}
