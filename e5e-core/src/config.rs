//! Runtime configuration
//!
//! The platform configures the runtime through environment variables only.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// Selects how the event and context arguments are interpreted.
pub const PAYLOAD_SOURCE_VAR: &str = "E5E_PAYLOAD_SOURCE";
/// `tracing_subscriber::EnvFilter` directives for runtime binaries.
pub const LOG_FILTER_VAR: &str = "E5E_LOG";

/// Where the event and context JSON documents come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadSource {
    /// The arguments are the JSON texts themselves
    #[default]
    Inline,
    /// The arguments are paths of files holding the JSON texts
    File,
}

impl PayloadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadSource::Inline => "inline",
            PayloadSource::File => "file",
        }
    }
}

impl fmt::Display for PayloadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(PayloadSource::Inline),
            "file" => Ok(PayloadSource::File),
            other => Err(format!("unknown payload source '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub payload_source: PayloadSource,
}

impl RuntimeConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Values that do not parse are logged and replaced by their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(PAYLOAD_SOURCE_VAR) {
            match raw.parse() {
                Ok(source) => config.payload_source = source,
                Err(e) => warn!("Ignoring {}: {}", PAYLOAD_SOURCE_VAR, e),
            }
        }

        config
    }
}
