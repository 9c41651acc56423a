//! Stage timing: records how long each pipeline stage took and how many
//! records it produced.
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub id: String,
    pub latency_ms: u64,
    pub items: usize,
}

#[derive(Debug, Default)]
pub struct StageTrace {
    records: Vec<StageRecord>,
}

impl StageTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `stage`, recording its latency and the item count reported by `count`.
    pub fn run<T>(
        &mut self,
        id: &str,
        stage: impl FnOnce() -> T,
        count: impl FnOnce(&T) -> usize,
    ) -> T {
        let start = Instant::now();
        let out = stage();
        self.record(id, start, count(&out));
        out
    }

    /// Record a stage that was timed by the caller, e.g. one that awaited.
    pub fn record(&mut self, id: &str, started: Instant, items: usize) {
        let latency_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(stage = id, latency_ms, items, "stage complete");
        self.records.push(StageRecord {
            id: id.to_string(),
            latency_ms,
            items,
        });
    }

    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<StageRecord> {
        self.records
    }
}

/// Content digest stamped on reports.
pub fn digest(data: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let mut trace = StageTrace::new();
        let v = trace.run("parse", || vec![1, 2, 3], |v| v.len());
        trace.run("classify", || (), |_| 0);
        assert_eq!(v.len(), 3);
        let ids: Vec<_> = trace.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["parse", "classify"]);
        assert_eq!(trace.records()[0].items, 3);
    }

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(digest(b"abc"), digest(b"abc"));
        assert!(digest(b"abc").starts_with("blake3:"));
        assert_ne!(digest(b"abc"), digest(b"abd"));
    }
}
