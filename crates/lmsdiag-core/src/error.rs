//! Unified Error Model
//!
//! Only conditions that prevent a report from being produced are errors.
//! Malformed single documents and validation failures are reported as data.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiagError {
    /// Container could not be opened (corrupt archive)
    #[error("EXTRACT/{0}")]
    Extraction(String),

    /// Recognized but unsupported legacy container type
    #[error("CONTAINER/unsupported container format: {0}")]
    UnsupportedContainer(String),

    /// Nothing analyzable was found
    #[error("CONTENT/{0}")]
    NoUsableContent(String),

    #[error("CONFIG/{0}")]
    Config(String),

    #[error("IO/{0}")]
    Io(#[from] std::io::Error),
}

impl DiagError {
    /// Stable short code for hosts that map errors to messages.
    pub fn code(&self) -> &'static str {
        match self {
            DiagError::Extraction(_) => "extraction_failed",
            DiagError::UnsupportedContainer(_) => "unsupported_container",
            DiagError::NoUsableContent(_) => "no_usable_content",
            DiagError::Config(_) => "config",
            DiagError::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, DiagError>;
