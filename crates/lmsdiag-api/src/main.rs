//! Binary entrypoint for the LMS diagnostics sidecar.
use lmsdiag_api::{run, DEFAULT_ADDR};
use lmsdiag_engine::{logging, AnalysisOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("info");

    // LMSDIAG_CONFIG names an optional YAML options file
    let options = AnalysisOptions::from_env()?;
    // Listen address can be overridden with LMSDIAG_ADDR
    let addr = std::env::var("LMSDIAG_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    run(&addr, options).await
}
