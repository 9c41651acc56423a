//! Assessment pipeline: single documents and containers

use crate::options::AnalysisOptions;
use crate::report::{AssessmentReport, FileSummary, Report, ReportHeader};
use futures::future::join_all;
use lmsdiag_core::{digest, DiagError, Result, StageTrace};
use lmsdiag_qti::{
    analyze_member, extract, extract_questions, inventory_for, merge_members, parser,
    resolve_references, validate, DocumentAnalysis, ExtractedPackage, FailedFile, PackageAnalysis,
};
use lmsdiag_quality::{AssessmentInput, AssessmentMetrics, CompatibilityGate};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Analyze one assessment document. Never fails: a malformed document
/// still produces a report describing the defect.
pub fn analyze_document(bytes: &[u8], options: &AnalysisOptions) -> Report {
    let mut trace = StageTrace::new();
    let mut doc = trace.run("parse", || parser::parse_bytes(bytes), |d| usize::from(d.well_formed));
    if let Some(name) = &options.context.source_name {
        doc = doc.with_path(name.clone());
    }
    let validation = trace.run("validate", || validate(&doc), |v| v.errors.len());
    let questions = trace.run("extract", || extract_questions(&doc), Vec::len);
    // No container, so nothing can be asserted about internal references
    let references = trace.run("resolve", || resolve_references(&doc, None), Vec::len);

    let analysis = DocumentAnalysis {
        path: doc.path.clone(),
        format_version: doc.format_version,
        well_formed: doc.well_formed,
        parse_errors: doc.parse_errors.clone(),
        validation,
        questions,
        references,
    };

    let (metrics, compatibility) = trace.run(
        "classify",
        || {
            let input = AssessmentInput {
                format_version: analysis.format_version,
                questions: &analysis.questions,
                references: &analysis.references,
                errors: &analysis.validation.errors,
                failed_files: &[],
            };
            let metrics = AssessmentMetrics::collect(&analysis.questions, &analysis.references, 1, 0);
            (metrics, CompatibilityGate::new(options.compatibility_profile()).evaluate(&input))
        },
        |r| r.1.issues.len() + r.1.warnings.len(),
    );

    let started = Instant::now();
    let mut report = AssessmentReport {
        header: ReportHeader::new(&options.context, digest(bytes)),
        format_version: analysis.format_version,
        well_formed: analysis.well_formed,
        parse_errors: analysis.parse_errors.clone(),
        files: vec![FileSummary::from_analysis(&analysis, "document")],
        failed_files: Vec::new(),
        has_manifest: false,
        manifest: None,
        validation: analysis.validation,
        metrics,
        compatibility,
        questions: analysis.questions,
        references: analysis.references,
    };
    trace.record("assemble", started, 1);
    report.header.stages = trace.into_records();

    info!(
        kind = "assessment",
        questions = report.metrics.question_count,
        score = report.compatibility.score,
        well_formed = report.well_formed,
        "analysis complete"
    );
    Report::Assessment(report)
}

/// Analyze a container, one member after another.
pub fn analyze_package(bytes: &[u8], options: &AnalysisOptions) -> Result<Report> {
    let mut trace = StageTrace::new();
    let package = trace.run("unpack", || extract(bytes), |r| {
        r.as_ref().map(|p| p.member_documents.len()).unwrap_or(0)
    });
    let package = package.map_err(|e| {
        warn!(error = %e, "container rejected");
        e
    })?;

    let inventory = inventory_for(&package);
    let results = trace.run(
        "analyze",
        || {
            package
                .member_documents
                .iter()
                .map(|m| analyze_member(m, &inventory))
                .collect::<Vec<_>>()
        },
        |r| r.iter().filter(|x| x.is_ok()).count(),
    );

    finish_package(&package, results, trace, digest(bytes), options)
}

/// Analyze a container with one blocking task per member. Results are
/// joined in member order, so the report matches the sequential path.
pub async fn analyze_package_async(bytes: Vec<u8>, options: &AnalysisOptions) -> Result<Report> {
    let source_digest = digest(&bytes);
    let mut trace = StageTrace::new();

    let started = Instant::now();
    let package = tokio::task::spawn_blocking(move || extract(&bytes))
        .await
        .map_err(|e| DiagError::Extraction(format!("extraction task failed: {e}")))?
        .map_err(|e| {
            warn!(error = %e, "container rejected");
            e
        })?;
    trace.record("unpack", started, package.member_documents.len());

    let started = Instant::now();
    let inventory = Arc::new(inventory_for(&package));
    let tasks = package.member_documents.iter().cloned().map(|member| {
        let inventory = Arc::clone(&inventory);
        async move {
            let path = member.path.clone();
            tokio::task::spawn_blocking(move || analyze_member(&member, &inventory))
                .await
                .unwrap_or_else(|e| {
                    Err(FailedFile {
                        path,
                        error: format!("analysis task failed: {e}"),
                    })
                })
        }
    });
    let results = join_all(tasks).await;
    trace.record("analyze", started, results.iter().filter(|r| r.is_ok()).count());

    finish_package(&package, results, trace, source_digest, options)
}

fn finish_package(
    package: &ExtractedPackage,
    results: Vec<std::result::Result<DocumentAnalysis, FailedFile>>,
    mut trace: StageTrace,
    source_digest: String,
    options: &AnalysisOptions,
) -> Result<Report> {
    for failed in results.iter().filter_map(|r| r.as_ref().err()) {
        warn!(path = %failed.path, error = %failed.error, "member failed");
    }

    let merged = trace.run("merge", || merge_members(package, results), |r| {
        r.as_ref().map(|m| m.documents.len()).unwrap_or(0)
    });
    let merged: PackageAnalysis = merged.map_err(|e| {
        warn!(error = %e, "no usable content");
        e
    })?;

    let (metrics, compatibility) = trace.run(
        "classify",
        || {
            let input = AssessmentInput {
                format_version: merged.format_version,
                questions: &merged.questions,
                references: &merged.references,
                errors: &merged.validation.errors,
                failed_files: &merged.failed_files,
            };
            let metrics = AssessmentMetrics::collect(
                &merged.questions,
                &merged.references,
                merged.documents.len(),
                merged.failed_files.len(),
            );
            (metrics, CompatibilityGate::new(options.compatibility_profile()).evaluate(&input))
        },
        |r| r.1.issues.len() + r.1.warnings.len(),
    );

    let started = Instant::now();
    let files = merged
        .documents
        .iter()
        .map(|d| FileSummary::from_analysis(d, "document"))
        .collect();
    let has_manifest = merged.manifest.manifest_path.is_some();
    let mut report = AssessmentReport {
        header: ReportHeader::new(&options.context, source_digest),
        format_version: merged.format_version,
        well_formed: true,
        parse_errors: Vec::new(),
        files,
        failed_files: merged.failed_files,
        has_manifest,
        manifest: Some(merged.manifest),
        validation: merged.validation,
        metrics,
        compatibility,
        questions: merged.questions,
        references: merged.references,
    };
    trace.record("assemble", started, report.files.len());
    report.header.stages = trace.into_records();

    info!(
        kind = "assessment",
        files = report.files.len(),
        failed = report.failed_files.len(),
        questions = report.metrics.question_count,
        score = report.compatibility.score,
        "analysis complete"
    );
    Ok(Report::Assessment(report))
}
