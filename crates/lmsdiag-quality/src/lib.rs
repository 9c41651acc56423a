//! LMS Diagnostics Quality: assessment compatibility evaluation
//!
//! Scores extracted assessment content against a compatibility profile
//! for an import target (classic vs new quizzes).
//!
//! # Example
//!
//! ```ignore
//! use lmsdiag_quality::{CompatibilityGate, AssessmentInput};
//!
//! let gate = CompatibilityGate::for_target("canvas_classic");
//! let report = gate.evaluate(&AssessmentInput {
//!     format_version: analysis.format_version,
//!     questions: &analysis.questions,
//!     references: &analysis.references,
//!     errors: &analysis.validation.errors,
//!     failed_files: &analysis.failed_files,
//! });
//! println!("score: {} compatible: {}", report.score, report.compatible);
//! ```

pub mod gate;
pub mod metrics;
pub mod profile;

pub use gate::{
    score_for, AssessmentInput, CompatibilityGate, CompatibilityReport, Finding, FindingKind,
    Severity, MAX_SCORE,
};
pub use metrics::{AssessmentMetrics, ReferenceMetrics};
pub use profile::{CompatibilityProfile, PenaltyTable};
