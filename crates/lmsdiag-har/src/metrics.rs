//! Traffic metrics

use crate::domains::DomainCount;
use crate::entries::{Timings, TrafficEntry};
use crate::heuristics::is_telemetry;
use crate::settings::CaptureSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowRequest {
    pub sequence_id: usize,
    pub url: String,
    pub time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficMetrics {
    pub total_entries: usize,
    pub telemetry_entries: usize,
    pub application_entries: usize,
    /// `1xx`..`5xx`, plus `failed` for requests that never completed
    pub status_classes: BTreeMap<String, usize>,
    pub total_content_bytes: u64,
    pub total_transfer_bytes: u64,
    pub average_timings: Timings,
    pub slowest: Vec<SlowRequest>,
    pub domains: Vec<DomainCount>,
    pub session_cookies_set: usize,
    pub pages: usize,
}

fn status_class(entry: &TrafficEntry) -> String {
    if entry.status == 0 || entry.error.is_some() {
        "failed".to_string()
    } else {
        format!("{}xx", entry.status / 100)
    }
}

impl TrafficMetrics {
    pub fn collect(
        entries: &[TrafficEntry],
        domains: Vec<DomainCount>,
        pages: usize,
        settings: &CaptureSettings,
    ) -> Self {
        let app: Vec<&TrafficEntry> = entries.iter().filter(|e| !is_telemetry(e, settings)).collect();

        let mut status_classes = BTreeMap::new();
        for e in &app {
            *status_classes.entry(status_class(e)).or_default() += 1;
        }

        let n = app.len().max(1) as f64;
        let sum = app.iter().fold(Timings::default(), |acc, e| Timings {
            dns: acc.dns + e.timings.dns,
            connect: acc.connect + e.timings.connect,
            wait: acc.wait + e.timings.wait,
            receive: acc.receive + e.timings.receive,
        });

        let mut by_time: Vec<&&TrafficEntry> = app.iter().collect();
        // Stable: equal times stay in capture order
        by_time.sort_by(|a, b| b.time.total_cmp(&a.time));
        let slowest = by_time
            .into_iter()
            .take(settings.sample_limit)
            .map(|e| SlowRequest {
                sequence_id: e.sequence_id,
                url: e.url.clone(),
                time: e.time,
            })
            .collect();

        Self {
            total_entries: entries.len(),
            telemetry_entries: entries.len() - app.len(),
            application_entries: app.len(),
            status_classes,
            total_content_bytes: app.iter().map(|e| e.content_size).sum(),
            total_transfer_bytes: app.iter().map(|e| e.transfer_size).sum(),
            average_timings: Timings {
                dns: sum.dns / n,
                connect: sum.connect / n,
                wait: sum.wait / n,
                receive: sum.receive / n,
            },
            slowest,
            domains,
            session_cookies_set: app.iter().map(|e| e.cookies_set).sum(),
            pages,
        }
    }

    /// Requests that ended in a 4xx/5xx status or never completed.
    pub fn failed_requests(&self) -> usize {
        ["4xx", "5xx", "failed"]
            .iter()
            .filter_map(|k| self.status_classes.get(*k))
            .sum()
    }
}
