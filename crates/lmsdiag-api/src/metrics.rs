//! Prometheus registry served on `/metrics`.
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

pub struct ApiMetrics {
    registry: Registry,
    /// Labels: kind (assessment/traffic/unknown), outcome (ok/error code)
    pub analyses: IntCounterVec,
    pub latency: HistogramVec,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let analyses = IntCounterVec::new(
            Opts::new("lmsdiag_analyses_total", "Analyses served, by report kind and outcome"),
            &["kind", "outcome"],
        )?;
        let latency = HistogramVec::new(
            HistogramOpts::new("lmsdiag_analysis_seconds", "Wall time per analysis request"),
            &["kind"],
        )?;
        registry.register(Box::new(analyses.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        Ok(Self {
            registry,
            analyses,
            latency,
        })
    }

    pub fn observe(&self, kind: &str, outcome: &str, seconds: f64) {
        self.analyses.with_label_values(&[kind, outcome]).inc();
        self.latency.with_label_values(&[kind]).observe(seconds);
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
