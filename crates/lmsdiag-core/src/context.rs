//! Per-analysis context carried into reports and log spans
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub trace_id: String,
    /// File name or label supplied by the host, if any
    pub source_name: Option<String>,
}

impl AnalysisContext {
    pub fn new() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            source_name: None,
        }
    }

    pub fn named(source_name: impl Into<String>) -> Self {
        Self {
            source_name: Some(source_name.into()),
            ..Self::new()
        }
    }
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self::new()
    }
}
