//! LMS Diagnostics Engine: entry points and report assembly
//!
//! Routes raw input to the right analyzer and assembles the report.
//!
//! # Pipeline Flow
//!
//! ```text
//! RawArchive ─┬─ container ─→ unpack → analyze (per member) → merge → classify → assemble
//!             ├─ markup ────→ parse → validate → extract → resolve → classify → assemble
//!             └─ json ──────→ parse → extract → classify (rule chain) → assemble
//! ```
//!
//! # Example
//!
//! ```
//! use lmsdiag_core::RawArchive;
//! use lmsdiag_engine::{analyze, AnalysisOptions};
//!
//! let raw = RawArchive::sniff(br#"{"log":{"entries":[]}}"#.to_vec()).unwrap();
//! let report = analyze(&raw, &AnalysisOptions::default()).unwrap();
//! assert_eq!(report.kind(), "traffic");
//! ```

pub mod assessment;
pub mod logging;
pub mod options;
pub mod report;
pub mod traffic;

pub use assessment::analyze_package_async;
pub use options::AnalysisOptions;
pub use report::{AssessmentReport, ErrorSample, FileSummary, Report, ReportHeader, TrafficReport};

use lmsdiag_core::{load_path, AnalysisContext, DiagError, DocumentKind, RawArchive, Result};
use std::path::Path;

/// Analyze any supported input.
pub fn analyze(raw: &RawArchive, options: &AnalysisOptions) -> Result<Report> {
    match raw {
        RawArchive::Container { bytes } => assessment::analyze_package(bytes, options),
        RawArchive::Document {
            bytes,
            kind: DocumentKind::Json,
        } => traffic::analyze_capture(bytes, options),
        RawArchive::Document { bytes, .. } => Ok(assessment::analyze_document(bytes, options)),
    }
}

/// Analyze a multi-file assessment container.
pub fn analyze_package(raw: &RawArchive, options: &AnalysisOptions) -> Result<Report> {
    match raw {
        RawArchive::Container { bytes } => assessment::analyze_package(bytes, options),
        RawArchive::Document { .. } => Err(DiagError::Extraction(
            "input is a single document, not a container".to_string(),
        )),
    }
}

/// Load a file and analyze it. Containers fan out one task per member.
pub async fn analyze_path(path: impl AsRef<Path>, options: &AnalysisOptions) -> Result<Report> {
    let path = path.as_ref();
    let raw = load_path(path).await?;

    let mut options = options.clone();
    if options.context.source_name.is_none() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        options.context = AnalysisContext {
            source_name: Some(name),
            ..options.context
        };
    }

    match raw {
        RawArchive::Container { bytes } => analyze_package_async(bytes, &options).await,
        document => analyze(&document, &options),
    }
}
