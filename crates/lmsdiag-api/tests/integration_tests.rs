//! Route-level tests against the in-process router.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use lmsdiag_api::{create_app, AppState};
use lmsdiag_engine::AnalysisOptions;
use serde_json::Value;
use std::io::{Cursor, Write};
use tower::ServiceExt;
use zip::write::SimpleFileOptions;

fn app() -> axum::Router {
    create_app(AppState::new(AnalysisOptions::default()).unwrap())
}

async fn post(uri: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("x-lmsdiag-source", "upload.bin")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

const CAPTURE: &str = r#"{"log":{"version":"1.2","entries":[
  {"request":{"method":"GET","url":"https://school.edu/api/v1/jwts"},"response":{"status":401}},
  {"request":{"method":"GET","url":"https://school.edu/login"},"response":{"status":401}}
]}}"#;

#[tokio::test]
async fn test_analyze_capture() {
    let (status, body) = post("/v1/analyze/har", CAPTURE.as_bytes().to_vec()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "traffic");
    assert_eq!(body["sourceName"], "upload.bin");
    assert_eq!(body["diagnosis"]["rootCause"], "backend_service_auth_failure");
    assert_eq!(body["diagnosis"]["severity"], "critical");
}

#[tokio::test]
async fn test_generic_route_dispatches_markup() {
    let doc = r#"<assessmentItem xmlns="http://www.imsglobal.org/xsd/imsqti_v2p1" identifier="i1">
      <itemBody><extendedTextInteraction responseIdentifier="R"/></itemBody>
    </assessmentItem>"#;
    let (status, body) = post("/v1/analyze?target=new_quizzes", doc.as_bytes().to_vec()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "assessment");
    assert_eq!(body["compatibility"]["profile"], "new_quizzes@1.0");
}

#[tokio::test]
async fn test_wrong_input_for_route() {
    let (status, body) = post("/v1/analyze/har", b"<questestinterop/>".to_vec()).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["code"], "unsupported_media");

    let (status, _) = post("/v1/analyze/package", CAPTURE.as_bytes().to_vec()).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_legacy_container_is_415() {
    let (status, body) = post("/v1/analyze", b"7z\xbc\xaf\x27\x1cpayload".to_vec()).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["code"], "unsupported_container");
}

#[tokio::test]
async fn test_empty_container_is_422() {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer.start_file("readme.txt", options).unwrap();
    writer.write_all(b"nothing here").unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let (status, body) = post("/v1/analyze/package", bytes).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "no_usable_content");
    assert!(body["error"].as_str().unwrap().starts_with("CONTENT/"));
}

#[tokio::test]
async fn test_profiles_and_health() {
    let response = app()
        .oneshot(Request::builder().uri("/v1/profiles").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["default"], "canvas_classic");
    assert_eq!(body["profiles"].as_array().unwrap().len(), 2);

    let response = app()
        .oneshot(Request::builder().uri("/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
