//! Serializable reports
//!
//! A report is either an assessment report (single document or container)
//! or a traffic report. Both carry the same header: identity, provenance
//! and stage timings.

use chrono::{DateTime, Utc};
use lmsdiag_core::{AnalysisContext, FormatVersion, ParseIssue, StageRecord, ENGINE_VERSION};
use lmsdiag_har::{ErrorRecord, OversizedResponse, Page, ThirdPartyScript, TrafficMetrics};
use lmsdiag_policy::Diagnosis;
use lmsdiag_qti::{
    ContainerManifest, DocumentAnalysis, FailedFile, MediaReference, Question, ValidationResult,
};
use lmsdiag_quality::{AssessmentMetrics, CompatibilityReport};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    Assessment(AssessmentReport),
    Traffic(TrafficReport),
}

impl Report {
    pub fn header(&self) -> &ReportHeader {
        match self {
            Report::Assessment(r) => &r.header,
            Report::Traffic(r) => &r.header,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Report::Assessment(_) => "assessment",
            Report::Traffic(_) => "traffic",
        }
    }

    pub fn as_assessment(&self) -> Option<&AssessmentReport> {
        match self {
            Report::Assessment(r) => Some(r),
            Report::Traffic(_) => None,
        }
    }

    pub fn as_traffic(&self) -> Option<&TrafficReport> {
        match self {
            Report::Traffic(r) => Some(r),
            Report::Assessment(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportHeader {
    pub id: String,
    pub generated_at: DateTime<Utc>,
    pub engine_version: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    /// `blake3:<hex>` of the raw input
    pub source_digest: String,
    pub stages: Vec<StageRecord>,
}

impl ReportHeader {
    pub fn new(context: &AnalysisContext, source_digest: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            trace_id: context.trace_id.clone(),
            source_name: context.source_name.clone(),
            source_digest,
            stages: Vec::new(),
        }
    }
}

/// One analyzed document, as listed in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub path: String,
    pub format_version: FormatVersion,
    pub questions: usize,
    pub valid: bool,
    pub errors: Vec<String>,
}

impl FileSummary {
    pub fn from_analysis(analysis: &DocumentAnalysis, fallback_path: &str) -> Self {
        Self {
            path: analysis.path.clone().unwrap_or_else(|| fallback_path.to_string()),
            format_version: analysis.format_version,
            questions: analysis.questions.len(),
            valid: analysis.validation.valid,
            errors: analysis.validation.errors.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentReport {
    #[serde(flatten)]
    pub header: ReportHeader,
    pub format_version: FormatVersion,
    pub well_formed: bool,
    pub parse_errors: Vec<ParseIssue>,
    pub files: Vec<FileSummary>,
    pub failed_files: Vec<FailedFile>,
    pub has_manifest: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<ContainerManifest>,
    pub validation: ValidationResult,
    pub metrics: AssessmentMetrics,
    pub compatibility: CompatibilityReport,
    pub questions: Vec<Question>,
    pub references: Vec<MediaReference>,
}

/// A failed request as listed in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSample {
    pub sequence_id: usize,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub status_text: String,
}

impl From<&ErrorRecord> for ErrorSample {
    fn from(record: &ErrorRecord) -> Self {
        let status_text = match (&record.error, record.status_text.is_empty()) {
            (Some(error), true) => error.clone(),
            _ => record.status_text.clone(),
        };
        Self {
            sequence_id: record.sequence_id,
            method: record.method.clone(),
            url: record.url.clone(),
            status: record.status,
            status_text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficReport {
    #[serde(flatten)]
    pub header: ReportHeader,
    pub format_version: FormatVersion,
    pub well_formed: bool,
    pub parse_errors: Vec<ParseIssue>,
    pub metrics: TrafficMetrics,
    pub diagnosis: Diagnosis,
    pub pages: Vec<Page>,
    pub first_party_hosts: Vec<String>,
    pub third_party_scripts: Vec<ThirdPartyScript>,
    pub oversized_responses: Vec<OversizedResponse>,
    pub errors: Vec<ErrorSample>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_sample_uses_transport_error_when_no_status_text() {
        let record = ErrorRecord {
            sequence_id: 4,
            method: "GET".to_string(),
            url: "https://school.edu/x".to_string(),
            host: Some("school.edu".to_string()),
            path: "/x".to_string(),
            status: 0,
            status_text: String::new(),
            error: Some("net::ERR_CONNECTION_RESET".to_string()),
        };
        let sample = ErrorSample::from(&record);
        assert_eq!(sample.status_text, "net::ERR_CONNECTION_RESET");
        assert_eq!(sample.sequence_id, 4);
    }

    #[test]
    fn test_header_carries_context() {
        let context = AnalysisContext::named("quiz.zip");
        let header = ReportHeader::new(&context, "blake3:00".to_string());
        assert_eq!(header.trace_id, context.trace_id);
        assert_eq!(header.source_name.as_deref(), Some("quiz.zip"));
        assert_eq!(header.engine_version, ENGINE_VERSION);
    }
}
