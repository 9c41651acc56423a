//! Integration tests for assessment package analysis.
//!
//! Containers are assembled in memory so every scenario is self-describing.

use lmsdiag_core::Result;
use lmsdiag_qti::{
    analyze_document, analyze_member, extract, inventory_for, merge_members, parser, ExtractedPackage,
    PackageAnalysis, QuestionType, Resolution,
};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

fn analyze_package(package: &ExtractedPackage) -> Result<PackageAnalysis> {
    let inventory = inventory_for(package);
    let results = package
        .member_documents
        .iter()
        .map(|m| analyze_member(m, &inventory))
        .collect();
    merge_members(package, results)
}

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
        <itemmetadata><qtimetadata>
          <qtimetadatafield><fieldlabel>question_type</fieldlabel><fieldentry>multiple_choice_question</fieldentry></qtimetadatafield>
          <qtimetadatafield><fieldlabel>points_possible</fieldlabel><fieldentry>2</fieldentry></qtimetadatafield>
        </qtimetadata></itemmetadata>
        <presentation>
          <material><mattext texttype="text/html">&lt;p&gt;&lt;img src="media/a.png"&gt;&lt;/p&gt;</mattext></material>
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

#[test]
fn test_case_insensitive_container_resolution() {
    let bytes = build_zip(&[
        ("imsmanifest.xml", MANIFEST),
        ("quiz/assessment.xml", QUIZ),
        ("Media/a.png", "PNG"),
    ]);
    let package = extract(&bytes).unwrap();
    let analysis = analyze_package(&package).unwrap();

    let by_raw = |raw: &str| {
        analysis
            .references
            .iter()
            .find(|r| r.raw_reference == raw)
            .unwrap()
            .classification
    };
    assert_eq!(by_raw("media/a.png"), Resolution::Resolved);
    assert_eq!(by_raw("media/gone.png"), Resolution::Missing);
    assert_eq!(by_raw("https://example.com/ref"), Resolution::External);
}

#[test]
fn test_package_questions_and_manifest() {
    let bytes = build_zip(&[
        ("imsmanifest.xml", MANIFEST),
        ("quiz/assessment.xml", QUIZ),
        ("quiz/assessment_meta.xml", "<quiz identifier=\"x\"/>"),
        ("Media/a.png", "PNG"),
    ]);
    let analysis = analyze_package(&extract(&bytes).unwrap()).unwrap();
    assert_eq!(analysis.documents.len(), 1);
    assert_eq!(analysis.questions.len(), 2);
    assert_eq!(analysis.questions[0].question_type, QuestionType::MultipleChoice);
    assert_eq!(analysis.questions[0].points, 2.0);
    assert!(analysis.questions[0].has_media);
    assert_eq!(analysis.questions[1].question_type, QuestionType::FillInBlank);
    assert_eq!(analysis.questions[1].source_file.as_deref(), Some("quiz/assessment.xml"));
    assert_eq!(analysis.manifest.assessment_resources, vec!["quiz/assessment.xml"]);
    assert!(analysis.validation.valid);
}

#[test]
fn test_true_false_single_item() {
    let doc = parser::parse(
        r#"<assessmentItem xmlns="http://www.imsglobal.org/xsd/imsqti_v2p1" identifier="tf1" title="Sky">
          <responseDeclaration identifier="RESPONSE" cardinality="single" baseType="identifier"/>
          <itemBody>
            <choiceInteraction responseIdentifier="RESPONSE" maxChoices="1">
              <prompt>The sky is blue.</prompt>
              <simpleChoice identifier="A">TRUE</simpleChoice>
              <simpleChoice identifier="B">false</simpleChoice>
            </choiceInteraction>
          </itemBody>
        </assessmentItem>"#
            .to_string(),
    );
    let analysis = analyze_document(&doc, None);
    assert_eq!(analysis.questions.len(), 1);
    assert_eq!(analysis.questions[0].question_type, QuestionType::TrueFalse);
    assert_eq!(analysis.questions[0].points, 1.0);
}

#[test]
fn test_partial_failure_is_collected() {
    let bytes = build_zip(&[
        ("good.xml", "<questestinterop><assessment ident=\"a\"><section><item ident=\"q\"/></section></assessment></questestinterop>"),
        ("bad.xml", "<questestinterop><assessment><item></questestinterop>"),
    ]);
    let analysis = analyze_package(&extract(&bytes).unwrap()).unwrap();
    assert_eq!(analysis.documents.len(), 1);
    assert_eq!(analysis.failed_files.len(), 1);
    assert_eq!(analysis.failed_files[0].path, "bad.xml");
    assert_eq!(analysis.questions.len(), 1);
}

#[test]
fn test_all_members_failing_is_fatal() {
    let bytes = build_zip(&[
        ("a.xml", "<questestinterop><item>"),
        ("b.xml", "<assessmentItem><itemBody></assessmentItem>"),
    ]);
    let err = analyze_package(&extract(&bytes).unwrap()).unwrap_err();
    assert_eq!(err.code(), "no_usable_content");
}

#[test]
fn test_container_without_assessments_is_fatal() {
    let bytes = build_zip(&[("readme.txt", "hello"), ("notes.xml", "<notes/>")]);
    let err = analyze_package(&extract(&bytes).unwrap()).unwrap_err();
    assert_eq!(err.code(), "no_usable_content");
}

#[test]
fn test_references_deduplicated_across_members() {
    let item = |id: &str| {
        format!(
            r#"<assessmentItem identifier="{id}"><itemBody><p><img src="shared/logo.png"/></p><extendedTextInteraction responseIdentifier="R"/></itemBody></assessmentItem>"#
        )
    };
    let first = item("i1");
    let second = item("i2");
    let bytes = build_zip(&[("items/i1.xml", first.as_str()), ("items/i2.xml", second.as_str())]);
    let analysis = analyze_package(&extract(&bytes).unwrap()).unwrap();
    assert_eq!(analysis.questions.len(), 2);
    assert_eq!(analysis.references.len(), 1);
    assert_eq!(analysis.references[0].classification, Resolution::Missing);
    assert_eq!(analysis.references[0].source_file.as_deref(), Some("items/i1.xml"));
}

#[test]
fn test_test_and_its_item_files_count_each_question_once() {
    let test = r#"<assessmentTest xmlns="http://www.imsglobal.org/xsd/imsqti_v2p1" identifier="t">
      <testPart identifier="p"><assessmentSection identifier="s">
        <assessmentItemRef identifier="i1" href="items/i1.xml"/>
        <assessmentItemRef identifier="i2" href="items/i2.xml"/>
      </assessmentSection></testPart></assessmentTest>"#;
    let item = r#"<assessmentItem xmlns="http://www.imsglobal.org/xsd/imsqti_v2p1" identifier="i1">
      <itemBody><extendedTextInteraction responseIdentifier="R"/></itemBody></assessmentItem>"#;
    let bytes = build_zip(&[("test.xml", test), ("items/i1.xml", item)]);
    let analysis = analyze_package(&extract(&bytes).unwrap()).unwrap();

    let types: Vec<_> = analysis.questions.iter().map(|q| q.question_type).collect();
    // i2 has no file in the container, so its reference stays
    assert_eq!(types, vec![QuestionType::ReferencedItem, QuestionType::Essay]);
    assert_eq!(analysis.questions[0].id, "i2");
    assert_eq!(analysis.documents.len(), 2);
}
