//! Traffic capture diagnosis
//!
//! Classifies an analyzed capture into at most one root cause by running
//! an ordered rule chain.
//!
//! ```text
//! CaptureAnalysis → Facts → rule 1 … rule 7 → Diagnosis
//!                              ↑
//!                        CompiledRules (YAML or defaults)
//! ```
//!
//! # Example
//!
//! ```
//! use lmsdiag_har::{analyze_capture, parser};
//! use lmsdiag_policy::{diagnose, RootCause, TrafficRules};
//!
//! let capture = r#"{"log":{"entries":[
//!   {"request":{"method":"GET","url":"https://school.edu/"},"response":{"status":200}}
//! ]}}"#;
//! let rules = TrafficRules::default();
//! let analysis = analyze_capture(&parser::parse(capture.to_string()), &rules.capture);
//! let diagnosis = diagnose(&analysis, &rules.compile().unwrap());
//! assert_eq!(diagnosis.root_cause, Some(RootCause::ClientSideCrash));
//! ```

pub mod chain;
pub mod diagnosis;
pub mod rules;

pub use chain::{diagnose, Flow, CHAIN};
pub use diagnosis::{CrashEvidence, Diagnosis, DiagnosisSeverity, RootCause};
pub use rules::{CompiledRules, TrafficRules};
