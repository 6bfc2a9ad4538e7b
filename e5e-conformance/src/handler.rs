//! Entrypoints of the conformance runtime
//!
//! One entrypoint per path through the platform protocol. The last three are
//! registered across the dynamic boundary because their declared shapes are
//! wrong on purpose.

use anyhow::{bail, Result};
use e5e_core::{Context, Entrypoints, Event, Return, Signature};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
pub struct SumData {
    #[serde(default)]
    pub a: i64,
    #[serde(default)]
    pub b: i64,
}

#[derive(Debug, Deserialize)]
pub struct SumEvent {
    #[serde(flatten)]
    pub event: Event,
    #[serde(default)]
    pub data: SumData,
}

#[derive(Debug, Default, Deserialize)]
pub struct FloodData {
    #[serde(default)]
    pub bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct FloodEvent {
    #[serde(default)]
    pub data: FloodData,
}

pub struct Handler {
    /// Status reported by the echo entrypoint
    echo_status: u16,
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler {
    pub fn new() -> Self {
        Self { echo_status: 200 }
    }

    pub fn simple(&self, _event: Event, _context: Context) -> Result<Option<Return>> {
        Ok(None)
    }

    pub fn sum(&self, event: SumEvent, _context: Context) -> Result<Option<Return<i64>>> {
        debug!(
            "Sum request of type '{}': a={}, b={}",
            event.event.kind, event.data.a, event.data.b
        );
        Ok(Some(Return::with_data(event.data.a + event.data.b)))
    }

    pub fn print_stdout(&self, _event: Event, _context: Context) -> Result<Option<Return>> {
        print!("print");
        Ok(None)
    }

    pub fn error(&self, _event: Event, _context: Context) -> Result<Option<Return>> {
        bail!("error")
    }

    pub fn infinite(&self, _event: Event, _context: Context) -> Result<Option<Return<f64>>> {
        Ok(Some(Return::with_data(f64::INFINITY)))
    }

    pub fn flood(&self, event: FloodEvent, _context: Context) -> Result<usize> {
        let chunk = "0123456789abcdef".repeat(64);
        let mut written = 0;
        while written < event.data.bytes {
            let take = chunk.len().min(event.data.bytes - written);
            print!("{}", &chunk[..take]);
            written += take;
        }
        Ok(written)
    }

    /// Mirror the request metadata back as a structured return.
    pub fn echo(&self, event: Event, context: Context) -> Result<Return<Value>> {
        println!("echo {}", event.kind);
        let mut ret = Return::with_data(json!({
            "params": event.params,
            "async": context.is_async,
        }))
        .status(self.echo_status)
        .kind("echo");
        for (name, value) in event.request_headers {
            ret = ret.header(name, value);
        }
        Ok(ret)
    }
}

pub fn entrypoints() -> Entrypoints<Handler> {
    Entrypoints::new(Handler::new())
        .method("SimpleEntrypoint", Handler::simple)
        .method("SumEntrypoint", Handler::sum)
        .method("PrintStdOutEntrypoint", Handler::print_stdout)
        .method("ErrorEntrypoint", Handler::error)
        .method("InvalidReturnValueEntrypoint", Handler::infinite)
        .method("FloodEntrypoint", Handler::flood)
        .method("EchoEntrypoint", Handler::echo)
        .dynamic(
            "InvalidParametersEntrypoint",
            Signature::new(Vec::<String>::new(), 2),
            |_, _| vec![Value::Null, Value::Null],
        )
        .dynamic(
            "InvalidReturnEntrypoint",
            Signature::new(["Event", "Context"], 0),
            |_, _| Vec::new(),
        )
        .dynamic(
            "InvalidErrorReturnValueEntrypoint",
            Signature::new(["Event", "Context"], 2),
            |_, _| vec![Value::Null, json!(1)],
        )
}
