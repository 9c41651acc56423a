//! Traffic pipeline: capture → entries → diagnosis

use crate::options::AnalysisOptions;
use crate::report::{ErrorSample, Report, ReportHeader, TrafficReport};
use lmsdiag_core::{digest, Result, StageTrace};
use lmsdiag_har::heuristics::sample;
use lmsdiag_har::{analyze_capture as extract_capture, parser};
use lmsdiag_policy::diagnose;
use std::time::Instant;
use tracing::info;

/// Analyze one traffic capture. Fails only when the configured rule
/// patterns do not compile; a malformed capture is reported as data.
pub fn analyze_capture(bytes: &[u8], options: &AnalysisOptions) -> Result<Report> {
    let rules = options.traffic.compile()?;
    let limit = rules.capture.sample_limit;

    let mut trace = StageTrace::new();
    let doc = trace.run("parse", || parser::parse_bytes(bytes), |d| usize::from(d.well_formed));
    let capture = trace.run("extract", || extract_capture(&doc, &rules.capture), |c| c.entries.len());
    let diagnosis = trace.run("classify", || diagnose(&capture, &rules), |d| d.matched_rules.len());

    let started = Instant::now();
    let mut report = TrafficReport {
        header: ReportHeader::new(&options.context, digest(bytes)),
        format_version: capture.format_version,
        well_formed: capture.well_formed,
        parse_errors: capture.parse_errors,
        metrics: capture.metrics,
        diagnosis,
        pages: capture.pages,
        first_party_hosts: capture.first_party_hosts,
        third_party_scripts: sample(&capture.third_party_scripts, limit),
        oversized_responses: sample(&capture.oversized_responses, limit),
        errors: capture.errors.iter().take(limit).map(ErrorSample::from).collect(),
    };
    trace.record("assemble", started, report.errors.len());
    report.header.stages = trace.into_records();

    info!(
        kind = "traffic",
        entries = report.metrics.total_entries,
        failed = report.metrics.failed_requests(),
        root_cause = report.diagnosis.root_cause.map(|c| c.as_str()).unwrap_or("none"),
        severity = %report.diagnosis.severity,
        "analysis complete"
    );
    Ok(Report::Traffic(report))
}
