//! Entrypoint registration and resolution
//!
//! A handler value is registered together with a table of named
//! entrypoints. Each entry records the shape it declares (parameter type
//! names and the number of return slots) and a type-erased binder that turns
//! the raw event and context texts into a ready-to-run call.

mod typename;

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{EncodeError, StartError};
use crate::finite::ensure_finite;

pub use typename::{short_type_name, type_name_of};

/// Number of parameters every entrypoint must declare (event, context).
pub const PARAMETER_COUNT: usize = 2;
/// Number of return slots every entrypoint must declare (result, error).
pub const RETURN_COUNT: usize = 2;

const EVENT_PARAM: usize = 0;
const CONTEXT_PARAM: usize = 1;
const ERROR_SLOT: usize = 1;

/// Declared shape of an entrypoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<String>,
    returns: usize,
}

impl Signature {
    pub fn new<I, S>(params: I, returns: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            returns,
        }
    }

    /// Shape of a typed `(E, C) -> Result<_, _>` entrypoint.
    pub fn of<E, C>() -> Self {
        Self {
            params: vec![type_name_of::<E>(), type_name_of::<C>()],
            returns: RETURN_COUNT,
        }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn returns(&self) -> usize {
        self.returns
    }

    fn check(&self) -> Result<(), StartError> {
        if self.params.len() != PARAMETER_COUNT {
            return Err(StartError::InvalidParameterCount {
                found: self.params.len(),
            });
        }
        if self.returns != RETURN_COUNT {
            return Err(StartError::InvalidReturnCount {
                found: self.returns,
            });
        }
        Ok(())
    }
}

/// A call result that can be encoded into the envelope
pub trait EncodeResult {
    fn encode(&self) -> Result<Box<RawValue>, EncodeError>;
}

impl<T: Serialize> EncodeResult for T {
    fn encode(&self) -> Result<Box<RawValue>, EncodeError> {
        ensure_finite(self)?;
        Ok(serde_json::value::to_raw_value(self)?)
    }
}

/// One value returned by an entrypoint
pub enum ReturnSlot {
    /// Nothing was returned in this slot
    Absent,
    /// A plain value
    Value(Box<dyn EncodeResult>),
    /// An error-shaped value, already rendered to its message
    Error(String),
}

impl ReturnSlot {
    pub fn value<T: Serialize + 'static>(value: T) -> Self {
        ReturnSlot::Value(Box::new(value))
    }

    /// Interpret a slot returned across a dynamic boundary.
    ///
    /// `null` is absent. In the error slot an object with a string `message`
    /// member is an error; anything else stays a plain value.
    fn from_json(index: usize, value: Value) -> Self {
        if value.is_null() {
            return ReturnSlot::Absent;
        }
        if index == ERROR_SLOT {
            if let Some(message) = value.get("message").and_then(Value::as_str) {
                return ReturnSlot::Error(message.to_string());
            }
        }
        ReturnSlot::Value(Box::new(value))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ReturnSlot::Absent)
    }
}

impl fmt::Debug for ReturnSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnSlot::Absent => f.write_str("Absent"),
            ReturnSlot::Value(_) => f.write_str("Value(..)"),
            ReturnSlot::Error(message) => f.debug_tuple("Error").field(message).finish(),
        }
    }
}

/// A decoded call waiting to run
pub(crate) type Call<'a> = Box<dyn FnOnce() -> Vec<ReturnSlot> + 'a>;

/// Which payload failed to decode
pub(crate) enum Mismatch {
    Event(serde_json::Error),
    Context(serde_json::Error),
}

trait Bind<H> {
    fn bind<'a>(&'a self, handler: &'a H, event: &str, context: &str) -> Result<Call<'a>, Mismatch>;
}

/// Entrypoint with statically typed payloads and a `Result` return.
struct Typed<F, E, C, R, X> {
    f: F,
    _marker: PhantomData<fn(E, C) -> (R, X)>,
}

impl<H, F, E, C, R, X> Bind<H> for Typed<F, E, C, R, X>
where
    F: Fn(&H, E, C) -> Result<R, X>,
    E: DeserializeOwned + 'static,
    C: DeserializeOwned + 'static,
    R: Serialize + 'static,
    X: fmt::Display,
{
    fn bind<'a>(&'a self, handler: &'a H, event: &str, context: &str) -> Result<Call<'a>, Mismatch> {
        // Both payloads are decoded before either failure is reported.
        let event = serde_json::from_str::<E>(event);
        let context = serde_json::from_str::<C>(context);
        let event = event.map_err(Mismatch::Event)?;
        let context = context.map_err(Mismatch::Context)?;

        Ok(Box::new(move || match (self.f)(handler, event, context) {
            Ok(result) => vec![ReturnSlot::value(result), ReturnSlot::Absent],
            Err(error) => vec![ReturnSlot::Absent, ReturnSlot::Error(error.to_string())],
        }))
    }
}

/// Entrypoint whose shape is only known at runtime (plugin boundaries).
struct Dynamic<F>(F);

impl<H, F> Bind<H> for Dynamic<F>
where
    F: Fn(&H, Vec<Value>) -> Vec<Value>,
{
    fn bind<'a>(&'a self, handler: &'a H, event: &str, context: &str) -> Result<Call<'a>, Mismatch> {
        let event = serde_json::from_str::<Value>(event);
        let context = serde_json::from_str::<Value>(context);
        let args = vec![
            event.map_err(Mismatch::Event)?,
            context.map_err(Mismatch::Context)?,
        ];

        Ok(Box::new(move || {
            (self.0)(handler, args)
                .into_iter()
                .enumerate()
                .map(|(index, value)| ReturnSlot::from_json(index, value))
                .collect()
        }))
    }
}

/// A registered entrypoint
pub struct Entrypoint<H> {
    name: String,
    signature: Signature,
    binder: Box<dyn Bind<H>>,
}

impl<H> Entrypoint<H> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Decode both payloads and prepare the call.
    pub(crate) fn bind<'a>(
        &'a self,
        handler: &'a H,
        event: &str,
        context: &str,
    ) -> Result<Call<'a>, StartError> {
        self.binder
            .bind(handler, event, context)
            .map_err(|mismatch| match mismatch {
                Mismatch::Event(source) => StartError::EventDecodeError {
                    type_name: self.param_name(EVENT_PARAM),
                    source,
                },
                Mismatch::Context(source) => StartError::ContextDecodeError {
                    type_name: self.param_name(CONTEXT_PARAM),
                    source,
                },
            })
    }

    fn param_name(&self, index: usize) -> String {
        self.signature.params.get(index).cloned().unwrap_or_default()
    }
}

/// The handler together with its named entrypoints
pub struct Entrypoints<H> {
    handler: H,
    table: HashMap<String, Entrypoint<H>>,
}

impl<H> Entrypoints<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            table: HashMap::new(),
        }
    }

    /// Register a typed entrypoint.
    ///
    /// The event and context are decoded into `E` and `C`. `Ok` becomes the
    /// envelope's result, `Err` is reported as the entrypoint's error.
    pub fn method<F, E, C, R, X>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&H, E, C) -> Result<R, X> + 'static,
        E: DeserializeOwned + 'static,
        C: DeserializeOwned + 'static,
        R: Serialize + 'static,
        X: fmt::Display + 'static,
    {
        let binder = Typed {
            f,
            _marker: PhantomData,
        };
        self.insert(name.into(), Signature::of::<E, C>(), Box::new(binder))
    }

    /// Register an entrypoint with a declared shape and JSON-valued slots.
    pub fn dynamic<F>(self, name: impl Into<String>, signature: Signature, f: F) -> Self
    where
        F: Fn(&H, Vec<Value>) -> Vec<Value> + 'static,
    {
        self.insert(name.into(), signature, Box::new(Dynamic(f)))
    }

    fn insert(mut self, name: String, signature: Signature, binder: Box<dyn Bind<H>>) -> Self {
        if self.table.contains_key(&name) {
            warn!("Entrypoint '{}' registered twice; keeping the later one", name);
        }
        let entrypoint = Entrypoint {
            name: name.clone(),
            signature,
            binder,
        };
        self.table.insert(name, entrypoint);
        self
    }

    /// Look up `name` and validate its declared shape.
    pub fn resolve(&self, name: &str) -> Result<&Entrypoint<H>, StartError> {
        let entrypoint = self.table.get(name).ok_or_else(|| {
            debug!("No entrypoint '{}' among {:?}", name, self.names());
            StartError::unknown_entrypoint(name)
        })?;

        entrypoint.signature.check()?;
        Ok(entrypoint)
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
