//! e5e Conformance Runtime
//!
//! Runtime binary started by the platform as
//! `e5e-conformance <entrypoint> <event> <context>`.
//! stdout carries the output envelope; diagnostics go to stderr.

use std::io;
use std::process;

use tracing::error;
use tracing_subscriber::EnvFilter;

mod handler;

fn main() {
    // Logging goes to stderr (stdout is for the envelope) and stays silent
    // unless E5E_LOG asks for it.
    let filter = EnvFilter::try_from_env(e5e_core::LOG_FILTER_VAR)
        .unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();

    let entrypoints = handler::entrypoints();

    if let Err(e) = e5e_core::start(&entrypoints) {
        error!("Invocation failed: {:?}", e);
        eprint!("{}", e);
        process::exit(e.exit_code());
    }
}
