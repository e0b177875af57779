//! # Field Values
//!
//! Input values for validation runs.
//!
//! A field value is either immediately available or produced by an
//! asynchronous source. Deferred values are shared futures, so the owning
//! field and every dependant can await the same resolution, and the
//! resolved value (never the future) is what validators receive.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;

/// Resolved dependency values keyed by dependency field id.
///
/// Declared dependencies with no corresponding input are present and map
/// to `Value::Null` rather than being omitted.
pub type DependencyValues = HashMap<String, Value>;

/// A field value, resolved now or later.
#[derive(Clone)]
pub enum FieldValue {
    /// Value available synchronously
    Ready(Value),

    /// Value produced by an asynchronous source; shared so it can be
    /// awaited once per interested party and resolved exactly once
    Deferred(Shared<BoxFuture<'static, Value>>),
}

impl FieldValue {
    /// Wrap a synchronously available value
    pub fn ready(value: impl Into<Value>) -> Self {
        FieldValue::Ready(value.into())
    }

    /// Wrap an asynchronous value source
    pub fn deferred<F>(fut: F) -> Self
    where
        F: Future<Output = Value> + Send + 'static,
    {
        FieldValue::Deferred(fut.boxed().shared())
    }

    /// Await the value; cheap for `Ready` and for already-settled
    /// deferred values
    pub async fn resolve(&self) -> Value {
        match self {
            FieldValue::Ready(value) => value.clone(),
            FieldValue::Deferred(fut) => fut.clone().await,
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            FieldValue::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Ready(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Ready(Value::String(value.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Ready(Value::String(value))
    }
}
