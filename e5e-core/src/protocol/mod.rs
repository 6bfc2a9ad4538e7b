//! Platform wire types
//!
//! Defines the payloads the platform hands to an entrypoint and the envelope
//! written back on stdout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Request metadata of an event.
///
/// Entrypoints usually embed this in their own event type next to a `data`
/// member:
///
/// ```
/// use e5e_core::Event;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct GreetEvent {
///     #[serde(flatten)]
///     event: Event,
///     #[serde(default)]
///     data: String,
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Query parameters, possibly repeated
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub request_headers: BTreeMap<String, String>,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

/// Invocation context supplied by the platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    #[serde(rename = "async", default, skip_serializing_if = "is_false")]
    pub is_async: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub date: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

/// Structured result of an entrypoint. Unset members are left off the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Return<T = serde_json::Value> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub response_headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

impl<T> Default for Return<T> {
    fn default() -> Self {
        Self {
            status: None,
            response_headers: BTreeMap::new(),
            data: None,
            kind: String::new(),
        }
    }
}

impl<T> Return<T> {
    pub fn with_data(data: T) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response_headers.insert(name.into(), value.into());
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }
}

/// The single JSON document written to stdout after an entrypoint ran.
#[derive(Debug, Serialize)]
pub struct Envelope {
    /// Everything the entrypoint wrote to stdout
    pub output: String,
    /// Pre-encoded result, `null` when absent
    pub result: Option<Box<RawValue>>,
}

impl Envelope {
    pub fn new(output: String, result: Option<Box<RawValue>>) -> Self {
        Self { output, result }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
