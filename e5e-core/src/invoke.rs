//! Entrypoint invocation
//!
//! Drives one invocation from process arguments to the output envelope:
//! parse arguments, resolve and validate the entrypoint, load and decode the
//! payloads, run the entrypoint with stdout captured, then classify what it
//! returned.

use std::ffi::OsString;
use std::io::{self, Write};

use tracing::debug;

use crate::args::Invocation;
use crate::capture::StdoutCapture;
use crate::config::RuntimeConfig;
use crate::error::{StartError, EXIT_SUCCESS, EXIT_USER_ERROR};
use crate::protocol::Envelope;
use crate::registry::{Entrypoints, ReturnSlot, RETURN_COUNT};

/// What the process has to write and how it has to exit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Serialized envelope for stdout
    pub envelope: String,
    /// Message for stderr when the entrypoint reported an error
    pub error_message: Option<String>,
    pub exit_code: i32,
}

impl Completion {
    /// Write the error message (if any) to stderr, then the envelope to stdout.
    pub fn emit(&self) -> io::Result<()> {
        if let Some(message) = &self.error_message {
            let mut stderr = io::stderr().lock();
            stderr.write_all(message.as_bytes())?;
            stderr.flush()?;
        }

        let mut stdout = io::stdout().lock();
        stdout.write_all(self.envelope.as_bytes())?;
        stdout.flush()
    }
}

/// Run the invocation described by `args` without touching the process
/// streams or exiting.
///
/// Every failure before the entrypoint runs, and every failure to build the
/// envelope afterwards, is returned as a [`StartError`].
pub fn run<H, I>(
    entrypoints: &Entrypoints<H>,
    args: I,
    config: &RuntimeConfig,
) -> Result<Completion, StartError>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let invocation = Invocation::from_args(args)?;

    let entrypoint = entrypoints.resolve(&invocation.entrypoint)?;
    debug!(
        "Resolved entrypoint {} {:?}",
        entrypoint.name(),
        entrypoint.signature()
    );

    let (event, context) = invocation.payloads(config.payload_source)?;
    let call = entrypoint.bind(entrypoints.handler(), &event, &context)?;

    let capture = StdoutCapture::begin().map_err(|source| StartError::CaptureError { source })?;
    let slots = call();
    let output = capture
        .finish()
        .map_err(|source| StartError::CaptureError { source })?;

    settle(slots, output)
}

/// Classify the returned slots and build the envelope.
pub fn settle(slots: Vec<ReturnSlot>, output: String) -> Result<Completion, StartError> {
    let found = slots.len();
    let Ok([result, error]) = <[ReturnSlot; RETURN_COUNT]>::try_from(slots) else {
        return Err(StartError::InvalidReturnCount { found });
    };

    let completion = match error {
        ReturnSlot::Error(message) => {
            let envelope = Envelope::new(output, None)
                .to_json()
                .map_err(StartError::envelope)?;
            Completion {
                envelope,
                error_message: Some(message),
                exit_code: EXIT_USER_ERROR,
            }
        }
        ReturnSlot::Value(_) => return Err(StartError::InvalidErrorValue),
        ReturnSlot::Absent => {
            let result = match result {
                ReturnSlot::Absent => None,
                ReturnSlot::Value(value) => Some(value.encode().map_err(StartError::envelope)?),
                ReturnSlot::Error(message) => Some(
                    serde_json::value::to_raw_value(&message).map_err(StartError::envelope)?,
                ),
            };
            let envelope = Envelope::new(output, result)
                .to_json()
                .map_err(StartError::envelope)?;
            Completion {
                envelope,
                error_message: None,
                exit_code: EXIT_SUCCESS,
            }
        }
    };

    debug!("Invocation settled with exit code {}", completion.exit_code);
    Ok(completion)
}

/// Handle the invocation the platform started this process for.
///
/// Reads the configuration from the environment and the invocation from the
/// process arguments. Does not return once the envelope has been written:
/// the process exits with 0, or with -1 if the entrypoint reported an error.
/// Any other outcome is returned, and the caller is expected to print it to
/// stderr and exit with [`StartError::exit_code`].
pub fn start<H>(entrypoints: &Entrypoints<H>) -> Result<(), StartError> {
    let config = RuntimeConfig::from_env();
    let completion = run(entrypoints, std::env::args_os(), &config)?;
    completion
        .emit()
        .map_err(|source| StartError::EmitError { source })?;

    std::process::exit(completion.exit_code)
}
