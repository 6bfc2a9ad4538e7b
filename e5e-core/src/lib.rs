//! e5e Core Library
//!
//! Runtime adapter between the e5e platform and user entrypoints:
//! - Process argument validation
//! - Entrypoint registration and resolution by name
//! - Type-directed JSON decoding of event and context
//! - Stdout capture around the call and the output envelope

pub mod args;
pub mod capture;
pub mod config;
pub mod error;
pub mod finite;
pub mod invoke;
pub mod protocol;
pub mod registry;

pub use config::{PayloadSource, RuntimeConfig, LOG_FILTER_VAR};
pub use error::{EncodeError, StartError, EXIT_FAILURE, EXIT_SUCCESS, EXIT_USER_ERROR};
pub use invoke::{run, start, Completion};
pub use protocol::{Context, Envelope, Event, Return};
pub use registry::{Entrypoint, Entrypoints, Signature};
