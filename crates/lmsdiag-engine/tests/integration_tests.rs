//! End-to-end tests: raw bytes in, assembled report out.

use lmsdiag_core::{AnalysisContext, DiagError, RawArchive};
use lmsdiag_engine::{analyze, analyze_package, analyze_package_async, analyze_path, AnalysisOptions, Report};
use lmsdiag_policy::{DiagnosisSeverity, RootCause};
use lmsdiag_qti::Resolution;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

fn build_zip(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, body) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest identifier="m1" xmlns="http://www.imsglobal.org/xsd/imsccv1p1/imscp_v1p1">
  <resources>
    <resource identifier="quiz" type="imsqti_xmlv1p2/imscc_xmlv1p1/assessment" href="quiz/assessment.xml">
      <file href="quiz/assessment.xml"/>
    </resource>
    <resource identifier="img" type="webcontent" href="media/a.png">
      <file href="media/a.png"/>
    </resource>
  </resources>
</manifest>"#;

const QUIZ: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<questestinterop xmlns="http://www.imsglobal.org/xsd/ims_qtiasiv1p2">
  <assessment ident="a1" title="Unit 1">
    <section ident="root_section">
      <item ident="q1" title="Picture">
        <presentation>
          <material><mattext texttype="text/html">&lt;img src="media/a.png"&gt;</mattext></material>
          <response_lid ident="response1" rcardinality="Single">
            <render_choice>
              <response_label ident="1"><material><mattext>Cat</mattext></material></response_label>
              <response_label ident="2"><material><mattext>Dog</mattext></material></response_label>
            </render_choice>
          </response_lid>
        </presentation>
      </item>
      <item ident="q2" title="Missing picture">
        <presentation>
          <material><mattext texttype="text/html">&lt;img src="media/gone.png"&gt; &lt;a href="https://example.com/ref"&gt;ref&lt;/a&gt;</mattext></material>
          <response_str ident="r"/>
        </presentation>
      </item>
    </section>
  </assessment>
</questestinterop>"#;

const BROKEN: &str = "<questestinterop><assessment ident=\"b\"><item";

fn package_bytes() -> Vec<u8> {
    build_zip(&[
        ("imsmanifest.xml", MANIFEST),
        ("quiz/assessment.xml", QUIZ),
        ("quiz/broken.xml", BROKEN),
        ("Media/a.png", "PNG"),
    ])
}

fn capture(urls: &[(&str, u16)], title: &str) -> Vec<u8> {
    let entries: Vec<_> = urls
        .iter()
        .map(|(url, status)| {
            serde_json::json!({
                "request": {"method": "GET", "url": url},
                "response": {"status": status, "content": {"mimeType": "text/html", "size": 512}}
            })
        })
        .collect();
    serde_json::json!({
        "log": {"version": "1.2", "pages": [{"id": "p1", "title": title}], "entries": entries}
    })
    .to_string()
    .into_bytes()
}

#[test]
fn test_package_report() {
    let raw = RawArchive::sniff(package_bytes()).unwrap();
    let report = analyze(&raw, &AnalysisOptions::default()).unwrap();
    let report = report.as_assessment().unwrap();

    assert!(report.has_manifest);
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].path, "quiz/assessment.xml");
    assert_eq!(report.files[0].questions, 2);
    assert_eq!(report.failed_files.len(), 1);
    assert_eq!(report.failed_files[0].path, "quiz/broken.xml");
    assert_eq!(report.metrics.question_count, 2);
    assert_eq!(report.metrics.failed_files, 1);

    let resolved = report
        .references
        .iter()
        .find(|r| r.raw_reference == "media/a.png")
        .unwrap();
    assert_eq!(resolved.classification, Resolution::Resolved);

    // legacy (-5), failed file (-5), missing media (-10), external media (-5)
    assert_eq!(report.compatibility.score, 75);
    assert!(report.compatibility.compatible);

    let stages: Vec<_> = report.header.stages.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(stages, vec!["unpack", "analyze", "merge", "classify", "assemble"]);
    assert!(report.header.source_digest.starts_with("blake3:"));
}

#[tokio::test]
async fn test_async_fan_out_matches_sequential() {
    let options = AnalysisOptions::default();
    let sequential = analyze(&RawArchive::sniff(package_bytes()).unwrap(), &options).unwrap();
    let concurrent = analyze_package_async(package_bytes(), &options).await.unwrap();

    let (a, b) = (sequential.as_assessment().unwrap(), concurrent.as_assessment().unwrap());
    assert_eq!(a.questions, b.questions);
    assert_eq!(a.references, b.references);
    assert_eq!(a.failed_files, b.failed_files);
    assert_eq!(a.compatibility.score, b.compatibility.score);
    assert_eq!(a.header.source_digest, b.header.source_digest);
}

#[test]
fn test_single_document_report() {
    let options = AnalysisOptions::default().with_context(AnalysisContext::named("quiz.xml"));
    let raw = RawArchive::sniff(QUIZ.as_bytes().to_vec()).unwrap();
    let report = analyze(&raw, &options).unwrap();
    let report = report.as_assessment().unwrap();

    assert!(report.well_formed);
    assert!(!report.has_manifest);
    assert_eq!(report.files[0].path, "quiz.xml");
    assert_eq!(report.header.source_name.as_deref(), Some("quiz.xml"));
    // no container: internal references cannot be checked
    assert!(report
        .references
        .iter()
        .filter(|r| !r.raw_reference.starts_with("https://"))
        .all(|r| r.classification == Resolution::Unknown));

    let stages: Vec<_> = report.header.stages.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(
        stages,
        vec!["parse", "validate", "extract", "resolve", "classify", "assemble"]
    );
}

#[test]
fn test_malformed_document_still_reports() {
    let raw = RawArchive::sniff(BROKEN.as_bytes().to_vec()).unwrap();
    let report = analyze(&raw, &AnalysisOptions::default()).unwrap();
    let report = report.as_assessment().unwrap();
    assert!(!report.well_formed);
    assert!(!report.parse_errors.is_empty());
    assert!(!report.compatibility.compatible);
    assert!(report.questions.is_empty());
}

#[test]
fn test_healthy_capture_is_client_side_crash() {
    let bytes = capture(
        &[
            ("https://school.edu/", 200),
            ("https://school.edu/courses", 200),
            ("https://school.edu/api/v1/courses", 200),
        ],
        "Dashboard",
    );
    let report = analyze(&RawArchive::sniff(bytes).unwrap(), &AnalysisOptions::default()).unwrap();
    let traffic = report.as_traffic().unwrap();

    assert_eq!(traffic.diagnosis.root_cause, Some(RootCause::ClientSideCrash));
    assert!(traffic.diagnosis.is_incomplete);
    assert_eq!(traffic.diagnosis.severity, DiagnosisSeverity::Warning);
    assert!(traffic.errors.is_empty());
    assert_eq!(traffic.first_party_hosts, vec!["school.edu"]);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["kind"], "traffic");
    assert_eq!(json["diagnosis"]["rootCause"], "client_side_crash");
    assert_eq!(json["formatVersion"], "har-1.2");
    assert!(json["sourceDigest"].as_str().unwrap().starts_with("blake3:"));
}

#[test]
fn test_capture_error_sample_is_bounded() {
    let urls: Vec<(String, u16)> = (0..8).map(|i| (format!("https://school.edu/f/{i}"), 404)).collect();
    let refs: Vec<(&str, u16)> = urls.iter().map(|(u, s)| (u.as_str(), *s)).collect();
    let report = analyze(
        &RawArchive::sniff(capture(&refs, "Files")).unwrap(),
        &AnalysisOptions::default(),
    )
    .unwrap();
    let traffic = report.as_traffic().unwrap();
    assert_eq!(traffic.errors.len(), 5);
    assert_eq!(traffic.errors[0].sequence_id, 0);
    assert_eq!(traffic.metrics.failed_requests(), 8);
    assert_eq!(traffic.diagnosis.reasons, vec!["8 requests failed"]);
}

#[test]
fn test_package_entry_rejects_single_document() {
    let raw = RawArchive::sniff(QUIZ.as_bytes().to_vec()).unwrap();
    let err = analyze_package(&raw, &AnalysisOptions::default()).unwrap_err();
    assert_eq!(err.code(), "extraction_failed");
}

#[test]
fn test_container_without_assessments_is_fatal() {
    let raw = RawArchive::sniff(build_zip(&[("notes/readme.txt", "hello")])).unwrap();
    let err = analyze(&raw, &AnalysisOptions::default()).unwrap_err();
    assert!(matches!(err, DiagError::NoUsableContent(_)));
}

#[tokio::test]
async fn test_analyze_path_names_the_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.imscc");
    std::fs::write(&path, package_bytes()).unwrap();

    let report = analyze_path(&path, &AnalysisOptions::default()).await.unwrap();
    assert_eq!(report.header().source_name.as_deref(), Some("export.imscc"));
    assert!(matches!(report, Report::Assessment(_)));

    let legacy = dir.path().join("old.rar");
    std::fs::write(&legacy, b"Rar!\x1a\x07\x00payload").unwrap();
    let err = analyze_path(&legacy, &AnalysisOptions::default()).await.unwrap_err();
    assert_eq!(err.code(), "unsupported_container");
}
