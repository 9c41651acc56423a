//! Diagnosis types produced by the rule chain

use lmsdiag_har::{OversizedResponse, ThirdPartyScript};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Single classified cause of a broken session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootCause {
    BackendServiceAuthFailure,
    AuthenticationFailure,
    ClientSideCrash,
    OauthIncomplete,
    SessionCookieMissing,
}

impl RootCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            RootCause::BackendServiceAuthFailure => "backend_service_auth_failure",
            RootCause::AuthenticationFailure => "authentication_failure",
            RootCause::ClientSideCrash => "client_side_crash",
            RootCause::OauthIncomplete => "oauth_incomplete",
            RootCause::SessionCookieMissing => "session_cookie_missing",
        }
    }
}

impl fmt::Display for RootCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnosis severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosisSeverity {
    #[default]
    Info,
    Warning,
    Critical,
}

impl fmt::Display for DiagnosisSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosisSeverity::Info => write!(f, "info"),
            DiagnosisSeverity::Warning => write!(f, "warning"),
            DiagnosisSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Samples collected when the network looks healthy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashEvidence {
    pub oversized_responses: Vec<OversizedResponse>,
    pub third_party_scripts: Vec<ThirdPartyScript>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub is_incomplete: bool,
    pub severity: DiagnosisSeverity,
    pub root_cause: Option<RootCause>,
    pub reasons: Vec<String>,
    pub recommendations: Vec<String>,

    /// Ids of the rules that fired, in evaluation order
    pub matched_rules: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<CrashEvidence>,
}

impl Diagnosis {
    /// Raise severity; never lowers it
    pub fn escalate(&mut self, severity: DiagnosisSeverity) {
        self.severity = self.severity.max(severity);
    }

    pub fn reason(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    pub fn recommend(&mut self, recommendation: impl Into<String>) {
        let recommendation = recommendation.into();
        if !self.recommendations.contains(&recommendation) {
            self.recommendations.push(recommendation);
        }
    }
}
