//! LMS Diagnostics Core: object model shared by the analyzers
//!
//! Both pipelines (assessment packages and traffic captures) follow the
//! same shape: Parse → Normalize → Cross-Reference → Classify → Report.
//! This crate holds what they share: the `Node` tree, `ParsedDocument`,
//! the fatal error taxonomy, input sniffing and stage timing.

pub mod context;
pub mod document;
pub mod error;
pub mod loader;
pub mod node;
pub mod runner;

pub use context::AnalysisContext;
pub use document::{FormatVersion, ParseIssue, ParseIssueKind, ParsedDocument};
pub use error::{DiagError, Result};
pub use loader::{decode_text, load_path, DocumentKind, RawArchive};
pub use node::Node;
pub use runner::{digest, StageRecord, StageTrace};

/// Analyzer engine version stamped on reports
pub const ENGINE_VERSION: &str = "1.0.0";
