//! Invocation error types

use thiserror::Error;

use crate::finite::NonFinite;

/// Exit code after a successful invocation.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code after the entrypoint reported an error.
pub const EXIT_USER_ERROR: i32 = -1;
/// Exit code the bootstrap uses for every [`StartError`].
pub const EXIT_FAILURE: i32 = -255;

#[derive(Error, Debug)]
pub enum StartError {
    // Argument errors
    #[error("invalid number of process arguments")]
    InvalidArgumentCount { found: usize },

    // Resolution errors
    #[error("invalid entrypoint name")]
    UnknownEntrypoint { name: String },

    #[error("invalid number of entrypoint parameters")]
    InvalidParameterCount { found: usize },

    #[error("invalid number of entrypoint return values")]
    InvalidReturnCount { found: usize },

    // Payload errors
    #[error("cannot read event object file '{path}'")]
    EventReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read context object file '{path}'")]
    ContextReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot apply event object to '{type_name}' type")]
    EventDecodeError {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot apply context object to '{type_name}' type")]
    ContextDecodeError {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    // Result errors
    #[error("invalid error return value")]
    InvalidErrorValue,

    #[error("cannot marshal return value")]
    EnvelopeEncodeError {
        #[source]
        source: EncodeError,
    },

    // Process stream errors
    #[error("cannot capture standard output")]
    CaptureError {
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write output envelope")]
    EmitError {
        #[source]
        source: std::io::Error,
    },
}

impl StartError {
    pub fn unknown_entrypoint(name: impl Into<String>) -> Self {
        StartError::UnknownEntrypoint { name: name.into() }
    }

    pub fn envelope(source: impl Into<EncodeError>) -> Self {
        StartError::EnvelopeEncodeError {
            source: source.into(),
        }
    }

    /// Exit code the process should terminate with after this error.
    pub fn exit_code(&self) -> i32 {
        EXIT_FAILURE
    }
}

/// Why a call result could not be encoded into the envelope.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error(transparent)]
    NonFinite(#[from] NonFinite),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}
