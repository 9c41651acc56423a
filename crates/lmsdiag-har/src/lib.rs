//! Traffic capture analysis
//!
//! Parses HTTP Archive captures, extracts entries and pages, separates
//! telemetry from application traffic, ranks domains and runs the
//! response heuristics the diagnosis rules draw on.

pub mod domains;
pub mod entries;
pub mod heuristics;
pub mod metrics;
pub mod parser;
pub mod settings;

pub use domains::{DomainCount, ThirdPartyScript};
pub use entries::{Header, Page, ResourceType, Timings, TrafficEntry};
pub use heuristics::{ErrorRecord, OversizedResponse};
pub use metrics::{SlowRequest, TrafficMetrics};
pub use settings::CaptureSettings;

use lmsdiag_core::{FormatVersion, ParseIssue, ParsedDocument};
use serde::{Deserialize, Serialize};

/// Everything extracted from one capture, before diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureAnalysis {
    pub format_version: FormatVersion,
    pub well_formed: bool,
    pub parse_errors: Vec<ParseIssue>,
    pub entries: Vec<TrafficEntry>,
    pub pages: Vec<Page>,
    pub metrics: TrafficMetrics,
    pub first_party_hosts: Vec<String>,
    pub third_party_scripts: Vec<ThirdPartyScript>,
    pub oversized_responses: Vec<OversizedResponse>,
    pub errors: Vec<ErrorRecord>,
}

impl CaptureAnalysis {
    /// Title of the last recorded page, if any.
    pub fn last_page_title(&self) -> Option<&str> {
        self.pages.last().map(|p| p.title.as_str())
    }

    /// Entries that are not telemetry.
    pub fn application_entries<'a>(
        &'a self,
        settings: &'a CaptureSettings,
    ) -> impl Iterator<Item = &'a TrafficEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| !heuristics::is_telemetry(e, settings))
    }
}

/// Extract and cross-reference a parsed capture.
pub fn analyze_capture(doc: &ParsedDocument, settings: &CaptureSettings) -> CaptureAnalysis {
    let entries = entries::extract_entries(doc);
    let pages = entries::extract_pages(doc);

    let ranking = domains::rank_domains(&entries, settings);
    let first_party_hosts = domains::first_party_hosts(&ranking, settings.first_party_top_n);
    let third_party_scripts = domains::third_party_scripts(&entries, &first_party_hosts, settings);
    let oversized_responses = heuristics::oversized_responses(&entries, settings);
    let errors = heuristics::error_records(&entries, settings);
    let metrics = metrics::TrafficMetrics::collect(&entries, ranking, pages.len(), settings);

    tracing::debug!(
        entries = entries.len(),
        errors = errors.len(),
        first_party = ?first_party_hosts,
        "capture analyzed"
    );

    CaptureAnalysis {
        format_version: doc.format_version,
        well_formed: doc.well_formed,
        parse_errors: doc.parse_errors.clone(),
        entries,
        pages,
        metrics,
        first_party_hosts,
        third_party_scripts,
        oversized_responses,
        errors,
    }
}
