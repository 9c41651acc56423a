//! Compatibility profiles for import targets
//!
//! A profile states which question types an importer handles fully, which
//! it handles with reduced fidelity, and how much each finding costs.

use lmsdiag_core::{DiagError, Result};
use lmsdiag_qti::QuestionType;
use serde::{Deserialize, Serialize};

use crate::Severity;

/// Score deduction per finding, by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyTable {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

impl PenaltyTable {
    pub fn for_severity(&self, severity: Severity) -> u32 {
        match severity {
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }
}

/// Compatibility profile for one import target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityProfile {
    /// Profile name (e.g., "canvas_classic@1.0")
    pub name: String,

    /// Target system the profile describes
    pub target: String,

    // === Type Support ===

    /// Types imported with full fidelity
    pub supported_types: Vec<QuestionType>,

    /// Types that import, but lose behaviour or formatting
    #[serde(default)]
    pub limited_types: Vec<QuestionType>,

    // === Scoring ===

    #[serde(default = "default_issue_penalties")]
    pub issue_penalties: PenaltyTable,

    #[serde(default = "default_warning_penalties")]
    pub warning_penalties: PenaltyTable,

    /// Warn when the package uses the older format version
    #[serde(default = "default_true")]
    pub warn_on_legacy: bool,
}

fn default_issue_penalties() -> PenaltyTable {
    PenaltyTable { high: 20, medium: 10, low: 5 }
}

fn default_warning_penalties() -> PenaltyTable {
    PenaltyTable { high: 10, medium: 5, low: 2 }
}

fn default_true() -> bool {
    true
}

impl CompatibilityProfile {
    /// Classic quizzes engine
    pub fn canvas_classic() -> Self {
        use QuestionType::*;
        Self {
            name: "canvas_classic@1.0".to_string(),
            target: "canvas_classic".to_string(),
            supported_types: vec![
                MultipleChoice,
                TrueFalse,
                MultipleAnswer,
                FillInBlank,
                FillInMultipleBlanks,
                MultipleDropdowns,
                Matching,
                Numerical,
                Formula,
                Essay,
                FileUpload,
                TextOnly,
            ],
            limited_types: vec![ReferencedItem],
            issue_penalties: default_issue_penalties(),
            warning_penalties: default_warning_penalties(),
            warn_on_legacy: true,
        }
    }

    /// Newer quizzes engine: wider interaction support, weaker on formula
    /// and upload items after migration
    pub fn new_quizzes() -> Self {
        use QuestionType::*;
        Self {
            name: "new_quizzes@1.0".to_string(),
            target: "new_quizzes".to_string(),
            supported_types: vec![
                MultipleChoice,
                TrueFalse,
                MultipleAnswer,
                FillInBlank,
                FillInMultipleBlanks,
                MultipleDropdowns,
                Matching,
                Numerical,
                Essay,
                TextOnly,
                Hotspot,
                Ordering,
                Categorization,
            ],
            limited_types: vec![Formula, FileUpload, ReferencedItem],
            issue_penalties: default_issue_penalties(),
            warning_penalties: default_warning_penalties(),
            warn_on_legacy: true,
        }
    }

    /// Load profile from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| DiagError::Config(format!("compatibility profile: {e}")))
    }

    /// Get profile by target name
    pub fn for_target(target: &str) -> Self {
        match target {
            "new_quizzes" => Self::new_quizzes(),
            _ => Self::canvas_classic(),
        }
    }

    /// Names accepted by `for_target`.
    pub fn targets() -> &'static [&'static str] {
        &["canvas_classic", "new_quizzes"]
    }

    pub fn is_supported(&self, t: QuestionType) -> bool {
        self.supported_types.contains(&t) || self.limited_types.contains(&t)
    }

    pub fn is_limited(&self, t: QuestionType) -> bool {
        self.limited_types.contains(&t)
    }
}

impl Default for CompatibilityProfile {
    fn default() -> Self {
        Self::canvas_classic()
    }
}
