//! Assessment metrics collection
//!
//! Aggregates are recomputed from the merged question and reference sets
//! on every analysis.

use lmsdiag_qti::{MediaReference, Question, Resolution};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Collection of assessment metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentMetrics {
    pub question_count: usize,
    /// Question count per type label
    pub type_distribution: BTreeMap<String, usize>,
    pub total_points: f64,
    pub questions_with_feedback: usize,
    pub questions_with_media: usize,
    pub references: ReferenceMetrics,
    /// Documents that contributed questions
    pub documents: usize,
    pub failed_files: usize,
}

/// Media reference counts by classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMetrics {
    pub total: usize,
    pub resolved: usize,
    pub missing: usize,
    pub external: usize,
    pub unknown: usize,
}

impl ReferenceMetrics {
    pub fn collect(references: &[MediaReference]) -> Self {
        let mut m = Self {
            total: references.len(),
            ..Self::default()
        };
        for r in references {
            match r.classification {
                Resolution::Resolved => m.resolved += 1,
                Resolution::Missing => m.missing += 1,
                Resolution::External => m.external += 1,
                Resolution::Unknown => m.unknown += 1,
            }
        }
        m
    }

    /// Share of internal references found in the package, when any were
    /// checked against an inventory.
    pub fn resolution_rate(&self) -> Option<f32> {
        let checked = self.resolved + self.missing;
        if checked == 0 {
            None
        } else {
            Some(self.resolved as f32 / checked as f32)
        }
    }
}

impl AssessmentMetrics {
    pub fn collect(
        questions: &[Question],
        references: &[MediaReference],
        documents: usize,
        failed_files: usize,
    ) -> Self {
        let mut type_distribution = BTreeMap::new();
        for q in questions {
            *type_distribution.entry(q.question_type.label().to_string()).or_default() += 1;
        }
        Self {
            question_count: questions.len(),
            type_distribution,
            total_points: questions.iter().map(|q| q.points).sum(),
            questions_with_feedback: questions.iter().filter(|q| q.has_feedback).count(),
            questions_with_media: questions.iter().filter(|q| q.has_media).count(),
            references: ReferenceMetrics::collect(references),
            documents,
            failed_files,
        }
    }
}
