//! Domain ranking and third-party script detection.
//!
//! The most-requested hosts stand in for the application's own domains.
//! Script responses served from anywhere else, and not from a telemetry
//! host, are third-party.

use crate::entries::TrafficEntry;
use crate::settings::CaptureSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCount {
    pub host: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThirdPartyScript {
    pub sequence_id: usize,
    pub host: String,
    pub url: String,
}

/// Hosts by request count, descending. Ties keep first-seen order.
/// Telemetry hosts are left out.
pub fn rank_domains(entries: &[TrafficEntry], settings: &CaptureSettings) -> Vec<DomainCount> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for host in entries.iter().filter_map(|e| e.host.as_deref()) {
        if settings.is_telemetry_host(host) {
            continue;
        }
        let count = counts.entry(host).or_insert(0);
        if *count == 0 {
            order.push(host.to_string());
        }
        *count += 1;
    }

    let mut ranking: Vec<DomainCount> = order
        .into_iter()
        .map(|host| {
            let count = counts.get(host.as_str()).copied().unwrap_or(0);
            DomainCount { host, count }
        })
        .collect();
    // Stable sort keeps first-seen order between equal counts
    ranking.sort_by(|a, b| b.count.cmp(&a.count));
    ranking
}

pub fn first_party_hosts(ranking: &[DomainCount], top_n: usize) -> Vec<String> {
    ranking.iter().take(top_n).map(|d| d.host.clone()).collect()
}

/// Exact match or a subdomain of a first-party host.
pub fn is_first_party(host: &str, first_party: &[String]) -> bool {
    let host = host.to_lowercase();
    first_party.iter().any(|fp| {
        host == *fp || host.strip_suffix(fp.as_str()).map(|rest| rest.ends_with('.')).unwrap_or(false)
    })
}

/// Script responses hosted outside the first-party set, in capture order.
pub fn third_party_scripts(
    entries: &[TrafficEntry],
    first_party: &[String],
    settings: &CaptureSettings,
) -> Vec<ThirdPartyScript> {
    entries
        .iter()
        .filter(|e| e.is_script())
        .filter_map(|e| {
            let host = e.host.as_deref()?;
            if settings.is_telemetry_host(host) || is_first_party(host, first_party) {
                return None;
            }
            Some(ThirdPartyScript {
                sequence_id: e.sequence_id,
                host: host.to_string(),
                url: e.url.clone(),
            })
        })
        .collect()
}
