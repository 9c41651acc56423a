//! Pattern tables for the diagnosis rules
//!
//! Loaded from YAML or taken from defaults, then compiled once into regex
//! sets before evaluation.

use lmsdiag_core::{DiagError, Result};
use lmsdiag_har::CaptureSettings;
use regex::RegexSet;
use serde::{Deserialize, Serialize};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Configurable tables consumed by the rule chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficRules {
    /// Backend and identity-service endpoints, matched against the full URL
    pub backend_identity_patterns: Vec<String>,

    /// Login, SSO and token endpoints, matched against the URL path
    pub auth_path_patterns: Vec<String>,

    /// Anything that suggests an auth flow, matched against the full URL
    pub auth_hint_patterns: Vec<String>,

    /// Evidence that an authorization flow returned to the application
    pub callback_markers: Vec<String>,

    /// Page title fragments shown while a page is still loading
    pub in_progress_markers: Vec<String>,

    /// Recommendations attached when the capture ends mid-load and no
    /// rule produced its own
    pub generic_recommendations: Vec<String>,

    pub capture: CaptureSettings,
}

impl Default for TrafficRules {
    fn default() -> Self {
        Self {
            backend_identity_patterns: strings(&[
                r"(?i)/api/v\d+/jwts",
                r"(?i)/api/v\d+/services/",
                r"(?i)/api/v\d+/users/self",
                r"(?i)/identity/",
                r"(?i)^https?://[^/]*identity[^/]*/",
            ]),
            auth_path_patterns: strings(&[
                r"(?i)/(login|logout|signin|sign_in|sso|cas)(/|$)",
                r"(?i)/(oauth2?|saml2?|openid|oidc)(/|$)",
                r"(?i)/(authorize|auth|token)(/|$)",
            ]),
            auth_hint_patterns: strings(&[
                r"(?i)oauth",
                r"(?i)saml",
                r"(?i)openid|oidc",
                r"(?i)/sso\b|/authorize\b",
                r"(?i)/login\b",
            ]),
            callback_markers: strings(&[
                r"(?i)callback",
                r"(?i)[?&]code=",
                r"(?i)[?&#]id_token=",
                r"(?i)SAMLResponse",
                r"(?i)/acs\b",
            ]),
            in_progress_markers: strings(&[
                "Loading",
                "Please wait",
                "Redirecting",
                "Signing in",
                "Processing",
            ]),
            generic_recommendations: strings(&[
                "Reload the page and capture again once it has finished loading",
                "Clear the browser cache and cookies for the site, then retry",
                "Try a private window with extensions disabled",
                "Share the capture with the LMS administrator if the problem persists",
            ]),
            capture: CaptureSettings::default(),
        }
    }
}

impl TrafficRules {
    /// Load rule tables from YAML; absent keys keep their defaults
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| DiagError::Config(format!("traffic rules: {e}")))
    }

    pub fn compile(&self) -> Result<CompiledRules> {
        let set = |name: &str, patterns: &[String]| {
            RegexSet::new(patterns).map_err(|e| DiagError::Config(format!("{name}: {e}")))
        };
        let markers: Vec<String> = self
            .in_progress_markers
            .iter()
            .map(|m| format!("(?i){}", regex::escape(m)))
            .collect();
        Ok(CompiledRules {
            backend_identity: set("backend_identity_patterns", &self.backend_identity_patterns)?,
            auth_path: set("auth_path_patterns", &self.auth_path_patterns)?,
            auth_hint: set("auth_hint_patterns", &self.auth_hint_patterns)?,
            callback: set("callback_markers", &self.callback_markers)?,
            in_progress: set("in_progress_markers", &markers)?,
            generic_recommendations: self.generic_recommendations.clone(),
            capture: self.capture.clone(),
        })
    }
}

/// Rule tables ready for matching
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub backend_identity: RegexSet,
    pub auth_path: RegexSet,
    pub auth_hint: RegexSet,
    pub callback: RegexSet,
    pub in_progress: RegexSet,
    pub generic_recommendations: Vec<String>,
    pub capture: CaptureSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables_compile() {
        let rules = TrafficRules::default().compile().unwrap();
        assert!(rules.backend_identity.is_match("https://school.edu/api/v1/jwts"));
        assert!(rules.backend_identity.is_match("https://identity.school.edu/token"));
        assert!(rules.auth_path.is_match("/login"));
        assert!(rules.auth_path.is_match("/login/saml"));
        assert!(!rules.auth_path.is_match("/courses/1/authoring"));
        assert!(rules.in_progress.is_match("please wait..."));
        assert!(rules.callback.is_match("https://app.edu/login/oauth2/callback?code=x"));
    }

    #[test]
    fn test_yaml_overrides_keep_defaults() {
        let rules = TrafficRules::from_yaml(
            "in_progress_markers: [\"Carregando\"]\ncapture:\n  first_party_top_n: 5\n",
        )
        .unwrap();
        assert_eq!(rules.in_progress_markers, vec!["Carregando"]);
        assert_eq!(rules.capture.first_party_top_n, 5);
        assert_eq!(rules.capture.sample_limit, 5);
        assert!(!rules.auth_path_patterns.is_empty());
    }

    #[test]
    fn test_bad_pattern_is_config_error() {
        let rules = TrafficRules {
            auth_path_patterns: vec!["(unclosed".to_string()],
            ..TrafficRules::default()
        };
        assert_eq!(rules.compile().unwrap_err().code(), "config");
    }
}
