//! Compatibility gate for assessment packages
//!
//! Evaluates extracted questions, media references and structural defects
//! against a compatibility profile and produces a scored report.

use super::profile::CompatibilityProfile;
use lmsdiag_core::FormatVersion;
use lmsdiag_qti::{FailedFile, MediaReference, Question, QuestionType, Resolution};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Starting score before any deduction.
pub const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    UnsupportedType,
    LimitedSupport,
    LegacyFormat,
    MissingMedia,
    ExternalMedia,
    NoQuestions,
    Structure,
    FailedFile,
}

/// Single finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    pub message: String,
    pub impact: i32, // Score impact (negative)
}

/// Inputs to a compatibility evaluation
#[derive(Debug, Clone, Copy)]
pub struct AssessmentInput<'a> {
    pub format_version: FormatVersion,
    pub questions: &'a [Question],
    pub references: &'a [MediaReference],
    /// Structural validation errors
    pub errors: &'a [String],
    pub failed_files: &'a [FailedFile],
}

/// Overall compatibility report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityReport {
    /// Numeric score (0-100)
    pub score: u32,

    /// No issues, warnings allowed
    pub compatible: bool,

    pub issues: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub recommendations: Vec<String>,

    /// Profile used for evaluation
    pub profile: String,
}

/// Gate that evaluates assessment content for one import target
pub struct CompatibilityGate {
    profile: CompatibilityProfile,
}

impl CompatibilityGate {
    pub fn new(profile: CompatibilityProfile) -> Self {
        Self { profile }
    }

    pub fn for_target(target: &str) -> Self {
        Self::new(CompatibilityProfile::for_target(target))
    }

    pub fn profile(&self) -> &CompatibilityProfile {
        &self.profile
    }

    fn issue(&self, kind: FindingKind, severity: Severity, message: String) -> Finding {
        Finding {
            kind,
            severity,
            message,
            impact: -(self.profile.issue_penalties.for_severity(severity) as i32),
        }
    }

    fn warning(&self, kind: FindingKind, severity: Severity, message: String) -> Finding {
        Finding {
            kind,
            severity,
            message,
            impact: -(self.profile.warning_penalties.for_severity(severity) as i32),
        }
    }

    /// Evaluate assessment content against the profile
    pub fn evaluate(&self, input: &AssessmentInput) -> CompatibilityReport {
        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        // === Question Types ===
        let mut by_type: BTreeMap<QuestionType, usize> = BTreeMap::new();
        for q in input.questions {
            *by_type.entry(q.question_type).or_default() += 1;
        }
        for (question_type, count) in &by_type {
            if self.profile.is_limited(*question_type) {
                warnings.push(self.warning(
                    FindingKind::LimitedSupport,
                    Severity::Medium,
                    format!("{count} {question_type} question(s) have limited support in {}", self.profile.target),
                ));
            } else if !self.profile.is_supported(*question_type) {
                issues.push(self.issue(
                    FindingKind::UnsupportedType,
                    Severity::High,
                    format!("{count} {question_type} question(s) are not supported by {}", self.profile.target),
                ));
            }
        }

        if input.questions.is_empty() {
            warnings.push(self.warning(
                FindingKind::NoQuestions,
                Severity::High,
                "No questions found".to_string(),
            ));
        }

        // === Format ===
        if self.profile.warn_on_legacy && input.format_version.is_legacy() {
            warnings.push(self.warning(
                FindingKind::LegacyFormat,
                Severity::Medium,
                format!("Package uses the older {} format", input.format_version),
            ));
        }

        // === Structure ===
        for error in input.errors {
            issues.push(self.issue(FindingKind::Structure, Severity::High, error.clone()));
        }
        if !input.failed_files.is_empty() {
            warnings.push(self.warning(
                FindingKind::FailedFile,
                Severity::Medium,
                format!("{} file(s) could not be parsed and were skipped", input.failed_files.len()),
            ));
        }

        // === Media ===
        let count = |r: Resolution| input.references.iter().filter(|m| m.classification == r).count();
        let missing = count(Resolution::Missing);
        if missing > 0 {
            warnings.push(self.warning(
                FindingKind::MissingMedia,
                Severity::High,
                format!("{missing} media reference(s) point to files missing from the package"),
            ));
        }
        let external = count(Resolution::External);
        if external > 0 {
            warnings.push(self.warning(
                FindingKind::ExternalMedia,
                Severity::Medium,
                format!("{external} media reference(s) load from external hosts"),
            ));
        }

        let score = score_for(&issues, &warnings);
        let recommendations = recommendations_for(issues.iter().chain(&warnings));

        CompatibilityReport {
            score,
            compatible: issues.is_empty(),
            issues,
            warnings,
            recommendations,
            profile: self.profile.name.clone(),
        }
    }
}

impl Default for CompatibilityGate {
    fn default() -> Self {
        Self::new(CompatibilityProfile::default())
    }
}

/// Sum of finding impacts applied to `MAX_SCORE`, floored at 0.
pub fn score_for(issues: &[Finding], warnings: &[Finding]) -> u32 {
    let deduction: i64 = issues
        .iter()
        .chain(warnings)
        .map(|f| -(f.impact as i64))
        .filter(|d| *d > 0)
        .sum();
    (MAX_SCORE as i64 - deduction).max(0) as u32
}

fn recommendation(kind: FindingKind) -> &'static str {
    match kind {
        FindingKind::UnsupportedType => "Rebuild unsupported questions with a supported type before import",
        FindingKind::LimitedSupport => "Review limited-support questions after import",
        FindingKind::LegacyFormat => "Re-export the package in the newer format if the source system allows it",
        FindingKind::MissingMedia => "Add the missing media files to the package or fix their paths",
        FindingKind::ExternalMedia => "Confirm external media hosts are reachable from the target system",
        FindingKind::NoQuestions => "Check that the export included quiz content",
        FindingKind::Structure => "Repair the structural errors and re-export",
        FindingKind::FailedFile => "Re-export the files that could not be parsed",
    }
}

fn recommendations_for<'a>(findings: impl Iterator<Item = &'a Finding>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for finding in findings {
        let text = recommendation(finding.kind);
        if !out.iter().any(|r| r == text) {
            out.push(text.to_string());
        }
    }
    out
}
