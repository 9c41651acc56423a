//! Capture analysis settings
//!
//! Thresholds and host lists shared by the domain resolver and the
//! heuristics. The diagnosis rule tables embed these.

use serde::{Deserialize, Serialize};

/// Largest text response considered normal, in bytes.
pub const DEFAULT_OVERSIZED_THRESHOLD: u64 = 100 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Observability and error-reporting hosts. Matched as substrings of
    /// the lowercased request host.
    pub telemetry_hosts: Vec<String>,

    /// Most-requested hosts treated as first-party
    pub first_party_top_n: usize,

    pub oversized_threshold: u64,

    /// Upper bound on every sample list in a report
    pub sample_limit: usize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            telemetry_hosts: [
                "sentry.io",
                "sentry-cdn",
                "ingest.sentry",
                "nr-data.net",
                "newrelic.com",
                "google-analytics.com",
                "googletagmanager.com",
                "datadoghq.com",
                "pendo.io",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            first_party_top_n: 3,
            oversized_threshold: DEFAULT_OVERSIZED_THRESHOLD,
            sample_limit: 5,
        }
    }
}

impl CaptureSettings {
    pub fn is_telemetry_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.telemetry_hosts.iter().any(|t| host.contains(t.as_str()))
    }
}
