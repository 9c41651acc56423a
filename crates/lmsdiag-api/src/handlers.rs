//! API Handlers
use crate::metrics::ApiMetrics;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use lmsdiag_core::{AnalysisContext, DiagError, DocumentKind, RawArchive, ENGINE_VERSION};
use lmsdiag_engine::{analyze_package_async, AnalysisOptions, Report};
use lmsdiag_quality::CompatibilityProfile;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// Optional header carrying the file name the host picked
pub const SOURCE_HEADER: &str = "x-lmsdiag-source";

#[derive(Clone)]
pub struct AppState {
    pub options: Arc<AnalysisOptions>,
    pub metrics: Arc<ApiMetrics>,
}

impl AppState {
    pub fn new(options: AnalysisOptions) -> Result<Self, prometheus::Error> {
        Ok(Self {
            options: Arc::new(options),
            metrics: Arc::new(ApiMetrics::new()?),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeParams {
    /// Compatibility preset for this request
    pub target: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    Analysis(DiagError),
    UnsupportedMedia(String),
    Internal(String),
}

impl From<DiagError> for ApiError {
    fn from(e: DiagError) -> Self {
        ApiError::Analysis(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Analysis(DiagError::UnsupportedContainer(_)) | ApiError::UnsupportedMedia(_) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ApiError::Analysis(DiagError::NoUsableContent(_) | DiagError::Extraction(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Analysis(DiagError::Config(_) | DiagError::Io(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Analysis(e) => e.code(),
            ApiError::UnsupportedMedia(_) => "unsupported_media",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Analysis(e) => e.to_string(),
            ApiError::UnsupportedMedia(m) | ApiError::Internal(m) => m.clone(),
        };
        tracing::warn!(code = self.code(), error = %message, "analysis request failed");
        (self.status(), Json(json!({ "error": message, "code": self.code() }))).into_response()
    }
}

#[derive(Debug, Clone, Copy)]
enum Expect {
    Any,
    Capture,
    Package,
}

fn options_for(state: &AppState, params: &AnalyzeParams, headers: &HeaderMap) -> AnalysisOptions {
    let context = match headers.get(SOURCE_HEADER).and_then(|v| v.to_str().ok()) {
        Some(name) if !name.trim().is_empty() => AnalysisContext::named(name.trim()),
        _ => AnalysisContext::new(),
    };
    let options = state.options.as_ref().clone().with_context(context);
    match &params.target {
        Some(target) => AnalysisOptions {
            profile: None,
            ..options.with_target(target.clone())
        },
        None => options,
    }
}

async fn analyze_body(
    state: &AppState,
    params: &AnalyzeParams,
    headers: &HeaderMap,
    body: Bytes,
    expect: Expect,
) -> Result<Report, ApiError> {
    let raw = RawArchive::sniff(body.to_vec())?;
    match (expect, &raw) {
        (Expect::Any, _)
        | (Expect::Package, RawArchive::Container { .. })
        | (Expect::Capture, RawArchive::Document { kind: DocumentKind::Json, .. }) => {}
        (Expect::Capture, _) => {
            return Err(ApiError::UnsupportedMedia("expected a JSON traffic capture".to_string()))
        }
        (Expect::Package, _) => {
            return Err(ApiError::UnsupportedMedia("expected a zip container".to_string()))
        }
    }

    let options = options_for(state, params, headers);
    match raw {
        RawArchive::Container { bytes } => Ok(analyze_package_async(bytes, &options).await?),
        document => {
            let report = tokio::task::spawn_blocking(move || lmsdiag_engine::analyze(&document, &options))
                .await
                .map_err(|e| ApiError::Internal(format!("analysis task failed: {e}")))??;
            Ok(report)
        }
    }
}

async fn serve(
    state: AppState,
    params: AnalyzeParams,
    headers: HeaderMap,
    body: Bytes,
    expect: Expect,
) -> Result<Json<Report>, ApiError> {
    let started = Instant::now();
    let result = analyze_body(&state, &params, &headers, body, expect).await;
    let (kind, outcome) = match &result {
        Ok(report) => (report.kind(), "ok"),
        Err(e) => ("unknown", e.code()),
    };
    state.metrics.observe(kind, outcome, started.elapsed().as_secs_f64());
    result.map(Json)
}

pub async fn analyze(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Report>, ApiError> {
    serve(state, params, headers, body, Expect::Any).await
}

pub async fn analyze_har(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Report>, ApiError> {
    serve(state, params, headers, body, Expect::Capture).await
}

pub async fn analyze_package(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Report>, ApiError> {
    serve(state, params, headers, body, Expect::Package).await
}

pub async fn list_profiles(State(state): State<AppState>) -> Json<Value> {
    let presets: Vec<CompatibilityProfile> = CompatibilityProfile::targets()
        .iter()
        .map(|t| CompatibilityProfile::for_target(t))
        .collect();
    Json(json!({
        "default": state.options.compatibility_profile().target,
        "profiles": presets,
    }))
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok", "version": ENGINE_VERSION })))
}

pub async fn metrics(State(state): State<AppState>) -> Result<String, ApiError> {
    state
        .metrics
        .encode()
        .map_err(|e| ApiError::Internal(format!("metrics encoding failed: {e}")))
}
