//! Process argument handling
//!
//! The platform starts the runtime as
//! `<binary> <entrypoint> <event> <context>`.

use std::borrow::Cow;
use std::ffi::OsString;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::PayloadSource;
use crate::error::StartError;

/// One invocation request, read from the process arguments
///
/// The payload arguments are kept as they came from the OS so that
/// file-mode paths need not be valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub entrypoint: String,
    pub event: OsString,
    pub context: OsString,
}

impl Invocation {
    /// Validate the argument list. The first element (the binary) is ignored.
    pub fn from_args<I>(args: I) -> Result<Self, StartError>
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let found = args.len();

        let [_, entrypoint, event, context] = <[OsString; 4]>::try_from(args)
            .map_err(|_| StartError::InvalidArgumentCount { found })?;

        // A name that is not UTF-8 cannot match a registered one.
        let entrypoint = entrypoint.to_string_lossy().into_owned();

        Ok(Self {
            entrypoint,
            event,
            context,
        })
    }

    /// The event and context JSON texts, loaded according to `source`.
    pub fn payloads(&self, source: PayloadSource) -> Result<(Cow<'_, str>, Cow<'_, str>), StartError> {
        match source {
            PayloadSource::Inline => Ok((self.event.to_string_lossy(), self.context.to_string_lossy())),
            PayloadSource::File => {
                let (event_path, context_path) = (Path::new(&self.event), Path::new(&self.context));
                debug!(
                    "Reading payloads from {} and {}",
                    event_path.display(),
                    context_path.display()
                );
                let event = fs::read_to_string(event_path).map_err(|source| {
                    StartError::EventReadError {
                        path: event_path.display().to_string(),
                        source,
                    }
                })?;
                let context = fs::read_to_string(context_path).map_err(|source| {
                    StartError::ContextReadError {
                        path: context_path.display().to_string(),
                        source,
                    }
                })?;
                Ok((Cow::Owned(event), Cow::Owned(context)))
            }
        }
    }
}
