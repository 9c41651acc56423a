//! Analysis options
//!
//! One YAML document configures both analyzers:
//!
//! ```yaml
//! target: new_quizzes        # preset, ignored when `profile` is given
//! profile: { ... }           # full CompatibilityProfile
//! traffic:
//!   in_progress_markers: ["Loading", "Carregando"]
//!   capture:
//!     first_party_top_n: 3
//! ```

use lmsdiag_core::{AnalysisContext, DiagError, Result};
use lmsdiag_policy::TrafficRules;
use lmsdiag_quality::CompatibilityProfile;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the YAML options file
pub const CONFIG_ENV: &str = "LMSDIAG_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Compatibility preset name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Custom compatibility profile; wins over `target`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<CompatibilityProfile>,

    pub traffic: TrafficRules,

    #[serde(skip)]
    pub context: AnalysisContext,
}

impl AnalysisOptions {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| DiagError::Config(format!("analysis options: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let options = Self::from_yaml(&text)?;
        tracing::info!(path = %path.display(), "loaded analysis options");
        Ok(options)
    }

    /// Options from the file named by `LMSDIAG_CONFIG`, or defaults.
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_path(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_context(mut self, context: AnalysisContext) -> Self {
        self.context = context;
        self
    }

    /// Profile used for compatibility scoring.
    pub fn compatibility_profile(&self) -> CompatibilityProfile {
        match (&self.profile, &self.target) {
            (Some(profile), _) => profile.clone(),
            (None, Some(target)) => CompatibilityProfile::for_target(target),
            (None, None) => CompatibilityProfile::default(),
        }
    }
}
