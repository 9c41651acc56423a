//! Ordered diagnosis rule chain
//!
//! Rules run strictly in the order of [`CHAIN`]. A rule that returns
//! [`Flow::Terminal`] stops evaluation. Backend failures are checked before
//! client-side explanations, and a healthy network is never read as an
//! auth problem.

use crate::diagnosis::{CrashEvidence, Diagnosis, DiagnosisSeverity, RootCause};
use crate::rules::CompiledRules;
use lmsdiag_har::heuristics::sample;
use lmsdiag_har::{CaptureAnalysis, ErrorRecord, TrafficEntry};

/// What the chain does after a rule fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Terminal,
}

/// A rule returns `None` when it does not apply
pub type RuleFn = fn(&Facts<'_>, &mut Diagnosis) -> Option<Flow>;

pub const CHAIN: &[(&str, RuleFn)] = &[
    ("backend_identity_401", backend_identity_401),
    ("page_in_progress", page_in_progress),
    ("auth_path_error", auth_path_error),
    ("healthy_network", healthy_network),
    ("oauth_without_callback", oauth_without_callback),
    ("session_cookie_missing", session_cookie_missing),
    ("generic_incomplete", generic_incomplete),
];

/// Derived view of a capture shared by every rule
pub struct Facts<'a> {
    pub analysis: &'a CaptureAnalysis,
    pub rules: &'a CompiledRules,
    pub application: Vec<&'a TrafficEntry>,
    pub auth_observed: bool,
    pub callback_observed: bool,
}

impl<'a> Facts<'a> {
    pub fn new(analysis: &'a CaptureAnalysis, rules: &'a CompiledRules) -> Self {
        let application: Vec<&TrafficEntry> = analysis.application_entries(&rules.capture).collect();
        let auth_observed = application
            .iter()
            .any(|e| rules.auth_hint.is_match(&e.url) || rules.auth_path.is_match(&e.path));
        let callback_observed = application.iter().any(|e| {
            rules.callback.is_match(&e.url)
                || e
                    .response_header("location")
                    .map(|loc| rules.callback.is_match(loc))
                    .unwrap_or(false)
        });
        Self {
            analysis,
            rules,
            application,
            auth_observed,
            callback_observed,
        }
    }

    fn errors(&self) -> &'a [ErrorRecord] {
        &self.analysis.errors
    }

    fn is_auth_related(&self, error: &ErrorRecord) -> bool {
        self.rules.auth_hint.is_match(&error.url) || self.rules.auth_path.is_match(&error.path)
    }
}

fn describe(error: &ErrorRecord) -> String {
    if error.status == 0 {
        let cause = error.error.as_deref().unwrap_or("no response");
        format!("{} {} failed ({cause})", error.method, error.url)
    } else {
        format!("{} {} returned {}", error.method, error.url, error.status)
    }
}

fn backend_identity_401(facts: &Facts<'_>, d: &mut Diagnosis) -> Option<Flow> {
    let hit = facts
        .errors()
        .iter()
        .find(|e| e.status == 401 && facts.rules.backend_identity.is_match(&e.url))?;

    d.root_cause = Some(RootCause::BackendServiceAuthFailure);
    d.escalate(DiagnosisSeverity::Critical);
    d.reason(format!(
        "A backend identity service rejected the session: {}",
        describe(hit)
    ));
    d.recommend("Check the LMS status page or contact the LMS administrator; the failure is on the service side");
    d.recommend("Verify the integration's developer key or service credentials have not expired");
    Some(Flow::Terminal)
}

fn page_in_progress(facts: &Facts<'_>, d: &mut Diagnosis) -> Option<Flow> {
    let title = facts.analysis.last_page_title()?;
    if !facts.rules.in_progress.is_match(title) {
        return None;
    }
    d.is_incomplete = true;
    d.escalate(DiagnosisSeverity::Warning);
    d.reason(format!("The last page never finished loading (title \"{title}\")"));
    Some(Flow::Continue)
}

fn auth_path_error(facts: &Facts<'_>, d: &mut Diagnosis) -> Option<Flow> {
    let hit = facts
        .errors()
        .iter()
        .find(|e| facts.rules.auth_path.is_match(&e.path))?;

    d.root_cause = Some(RootCause::AuthenticationFailure);
    d.escalate(DiagnosisSeverity::Critical);
    d.reason(format!("Sign-in request failed: {}", describe(hit)));
    d.recommend("Sign out completely, clear cookies for the site and sign in again");
    d.recommend("Confirm the account is active and allowed to use this login method");
    Some(Flow::Terminal)
}

fn healthy_network(facts: &Facts<'_>, d: &mut Diagnosis) -> Option<Flow> {
    if facts.application.is_empty()
        || !facts.errors().is_empty()
        || !facts
            .application
            .iter()
            .all(|e| e.is_success() || e.is_protocol_switch())
    {
        return None;
    }

    let limit = facts.rules.capture.sample_limit;
    let evidence = CrashEvidence {
        oversized_responses: sample(&facts.analysis.oversized_responses, limit),
        third_party_scripts: sample(&facts.analysis.third_party_scripts, limit),
    };

    d.root_cause = Some(RootCause::ClientSideCrash);
    d.is_incomplete = true;
    d.escalate(DiagnosisSeverity::Warning);
    d.reason(format!(
        "All {} application requests succeeded; the failure happened in the browser",
        facts.application.len()
    ));
    if !evidence.oversized_responses.is_empty() {
        d.reason(format!(
            "{} oversized text response(s) may stall page rendering",
            facts.analysis.oversized_responses.len()
        ));
        d.recommend("Reduce the size of large pages or API responses");
    }
    if !evidence.third_party_scripts.is_empty() {
        d.reason(format!(
            "{} script(s) loaded from third-party hosts",
            facts.analysis.third_party_scripts.len()
        ));
        d.recommend("Retry with browser extensions disabled and check third-party scripts for errors");
    }
    d.recommend("Open the browser console and capture any JavaScript errors");
    d.evidence = Some(evidence);
    Some(Flow::Terminal)
}

fn oauth_without_callback(facts: &Facts<'_>, d: &mut Diagnosis) -> Option<Flow> {
    if !facts.auth_observed || facts.callback_observed {
        return None;
    }
    let hit = facts.errors().iter().find(|e| facts.is_auth_related(e))?;

    d.root_cause = Some(RootCause::OauthIncomplete);
    d.escalate(DiagnosisSeverity::Warning);
    d.reason(format!(
        "Authorization flow started but never returned to the application: {}",
        describe(hit)
    ));
    d.recommend("Allow third-party cookies and pop-ups for the identity provider");
    d.recommend("Check that the tool's redirect URI matches its registration");
    Some(Flow::Continue)
}

fn session_cookie_missing(facts: &Facts<'_>, d: &mut Diagnosis) -> Option<Flow> {
    if facts.analysis.metrics.session_cookies_set > 0
        || !facts.auth_observed
        || facts.errors().is_empty()
    {
        return None;
    }

    if d.root_cause.is_none() {
        d.root_cause = Some(RootCause::SessionCookieMissing);
    }
    d.escalate(DiagnosisSeverity::Warning);
    d.reason("Authentication traffic was seen but no session cookie was ever set");
    d.recommend("Make sure the browser accepts cookies for the LMS domain");
    Some(Flow::Continue)
}

fn generic_incomplete(facts: &Facts<'_>, d: &mut Diagnosis) -> Option<Flow> {
    if d.root_cause.is_some() || !d.is_incomplete || !d.recommendations.is_empty() {
        return None;
    }
    for r in &facts.rules.generic_recommendations {
        d.recommend(r.clone());
    }
    Some(Flow::Continue)
}

/// Run the chain over one analyzed capture.
pub fn diagnose(analysis: &CaptureAnalysis, rules: &CompiledRules) -> Diagnosis {
    let facts = Facts::new(analysis, rules);
    let mut diagnosis = Diagnosis::default();

    for (id, rule) in CHAIN {
        let Some(flow) = rule(&facts, &mut diagnosis) else {
            continue;
        };
        tracing::debug!(rule = id, ?flow, "diagnosis rule matched");
        diagnosis.matched_rules.push(id.to_string());
        if flow == Flow::Terminal {
            break;
        }
    }

    if diagnosis.matched_rules.is_empty() {
        if facts.application.is_empty() {
            diagnosis.reason("Capture contains no application requests");
        } else if !facts.errors().is_empty() {
            diagnosis.escalate(DiagnosisSeverity::Warning);
            diagnosis.reason(format!("{} requests failed", facts.errors().len()));
        } else {
            let unusual = facts
                .application
                .iter()
                .filter(|e| !e.is_success() && !e.is_protocol_switch())
                .count();
            diagnosis.reason(format!(
                "No failed requests; {unusual} responses outside 2xx/3xx"
            ));
        }
    }

    diagnosis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::TrafficRules;
    use lmsdiag_har::{analyze_capture, parser};
    use serde_json::{json, Value};

    fn entry(url: &str, status: u16) -> Value {
        json!({
            "request": {"method": "GET", "url": url, "headers": []},
            "response": {"status": status, "headers": [], "content": {"mimeType": "text/html", "size": 100}}
        })
    }

    fn run(entries: Vec<Value>, title: Option<&str>) -> Diagnosis {
        let pages = match title {
            Some(t) => json!([{"id": "page_1", "title": t}]),
            None => json!([]),
        };
        let text = json!({"log": {"version": "1.2", "pages": pages, "entries": entries}}).to_string();
        let rules = TrafficRules::default();
        let analysis = analyze_capture(&parser::parse(text), &rules.capture);
        diagnose(&analysis, &rules.compile().unwrap())
    }

    #[test]
    fn test_backend_401_outranks_login_401() {
        let d = run(
            vec![
                entry("https://school.edu/login", 401),
                entry("https://school.edu/api/v1/jwts", 401),
            ],
            None,
        );
        assert_eq!(d.root_cause, Some(RootCause::BackendServiceAuthFailure));
        assert_eq!(d.severity, DiagnosisSeverity::Critical);
        assert_eq!(d.matched_rules, vec!["backend_identity_401"]);
    }

    #[test]
    fn test_login_error_is_authentication_failure() {
        let d = run(
            vec![
                entry("https://school.edu/courses", 200),
                entry("https://school.edu/login/saml", 500),
            ],
            Some("Signing in..."),
        );
        assert_eq!(d.root_cause, Some(RootCause::AuthenticationFailure));
        assert!(d.is_incomplete);
        assert_eq!(d.severity, DiagnosisSeverity::Critical);
        assert_eq!(d.matched_rules, vec!["page_in_progress", "auth_path_error"]);
    }

    #[test]
    fn test_three_healthy_entries_is_client_side_crash() {
        let d = run(
            vec![
                entry("https://school.edu/", 200),
                entry("https://school.edu/courses", 200),
                entry("https://school.edu/api/v1/courses", 200),
            ],
            None,
        );
        assert_eq!(d.root_cause, Some(RootCause::ClientSideCrash));
        assert!(d.is_incomplete);
        assert_eq!(d.severity, DiagnosisSeverity::Warning);
        assert!(d.evidence.is_some());
    }

    #[test]
    fn test_healthy_trace_with_auth_urls_is_not_auth_problem() {
        let d = run(
            vec![
                entry("https://school.edu/login/oauth2/auth?client_id=1", 302),
                entry("https://school.edu/login", 200),
                entry("https://school.edu/dashboard", 200),
            ],
            None,
        );
        assert_eq!(d.root_cause, Some(RootCause::ClientSideCrash));
    }

    #[test]
    fn test_telemetry_errors_are_ignored() {
        let d = run(
            vec![
                entry("https://school.edu/", 200),
                entry("https://o1.ingest.sentry.io/api/1/envelope", 429),
            ],
            None,
        );
        assert_eq!(d.root_cause, Some(RootCause::ClientSideCrash));
    }

    #[test]
    fn test_oauth_without_callback() {
        let d = run(
            vec![
                entry("https://school.edu/courses/1/external_tools/7", 200),
                entry("https://tool.example.com/lti/launch?oauth_consumer_key=k", 403),
            ],
            None,
        );
        assert_eq!(d.root_cause, Some(RootCause::OauthIncomplete));
        assert_eq!(d.severity, DiagnosisSeverity::Warning);
        // no cookies were set either, so the cookie finding is appended
        assert_eq!(d.matched_rules, vec!["oauth_without_callback", "session_cookie_missing"]);
        assert!(d.recommendations.iter().any(|r| r.contains("cookies")));
    }

    #[test]
    fn test_cookie_finding_without_other_cause() {
        let d = run(
            vec![
                entry("https://school.edu/login/oauth2/callback?code=abc", 200),
                entry("https://school.edu/oauth2/token", 200),
                entry("https://school.edu/courses", 500),
            ],
            None,
        );
        assert_eq!(d.root_cause, Some(RootCause::SessionCookieMissing));
        assert_eq!(d.matched_rules, vec!["session_cookie_missing"]);
    }

    #[test]
    fn test_in_progress_title_gets_generic_recommendations() {
        let d = run(
            vec![
                entry("https://school.edu/", 200),
                entry("https://school.edu/courses", 404),
            ],
            Some("Loading..."),
        );
        assert!(d.is_incomplete);
        assert_eq!(d.root_cause, None);
        assert_eq!(d.matched_rules, vec!["page_in_progress", "generic_incomplete"]);
        assert_eq!(d.recommendations, TrafficRules::default().generic_recommendations);
    }

    #[test]
    fn test_fallback_counts_failed_requests() {
        let d = run(
            vec![
                entry("https://school.edu/", 200),
                entry("https://school.edu/courses", 404),
                entry("https://school.edu/files", 500),
            ],
            None,
        );
        assert!(d.matched_rules.is_empty());
        assert_eq!(d.severity, DiagnosisSeverity::Warning);
        assert_eq!(d.reasons, vec!["2 requests failed"]);
    }

    #[test]
    fn test_websocket_upgrade_counts_as_healthy() {
        let d = run(
            vec![
                entry("https://school.edu/", 200),
                entry("https://school.edu/courses", 200),
                entry("wss://school.edu/socket.io/?transport=websocket", 101),
            ],
            None,
        );
        assert_eq!(d.root_cause, Some(RootCause::ClientSideCrash));
        assert_eq!(d.severity, DiagnosisSeverity::Warning);
        assert_eq!(d.matched_rules, vec!["healthy_network"]);
    }

    #[test]
    fn test_unmatched_capture_without_failures_explains_itself() {
        let d = run(
            vec![
                entry("https://school.edu/", 200),
                entry("https://school.edu/poll", 99),
            ],
            None,
        );
        assert!(d.matched_rules.is_empty());
        assert_eq!(d.root_cause, None);
        assert_eq!(d.reasons, vec!["No failed requests; 1 responses outside 2xx/3xx"]);
    }

    #[test]
    fn test_empty_capture() {
        let d = run(vec![], None);
        assert_eq!(d.root_cause, None);
        assert_eq!(d.severity, DiagnosisSeverity::Info);
        assert_eq!(d.reasons.len(), 1);
    }
}
