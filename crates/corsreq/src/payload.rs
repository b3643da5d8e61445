//! Request payload encoding.
//!
//! Structured values (objects and arrays) are sent as JSON text. Primitive
//! values are sent as their plain textual representation: a string goes out
//! verbatim, without JSON quoting. Encoding is best-effort: a value that
//! cannot be represented as JSON produces no body rather than an error, and
//! the request still goes ahead.

use serde::Serialize;
use serde_json::{Number, Value};

/// A request payload prior to encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A JSON value. Objects and arrays are JSON-encoded; primitives are sent
    /// as text.
    Value(Value),
    /// Text sent verbatim.
    Text(String),
    /// A value whose encoding already failed. Sent as an empty body.
    Unencodable,
}

impl Payload {
    /// Converts any serialisable value into a payload.
    ///
    /// Serialisation failures (for example a map with non-string keys) yield
    /// [`Payload::Unencodable`] and a warning; they are never returned.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::Value(value),
            Err(err) => {
                tracing::warn!(error = %err, "payload could not be encoded; sending empty body");
                Self::Unencodable
            }
        }
    }

    /// Encodes the payload into the body handed to the transport.
    ///
    /// An empty encoding is no body at all, not an empty one.
    pub fn encode(&self) -> Option<String> {
        let text = match self {
            Self::Value(value @ (Value::Object(_) | Value::Array(_))) => {
                match serde_json::to_string(value) {
                    Ok(text) => Some(text),
                    Err(err) => {
                        tracing::warn!(error = %err, "payload could not be encoded; sending empty body");
                        None
                    }
                }
            }
            Self::Value(Value::String(text)) | Self::Text(text) => Some(text.clone()),
            Self::Value(Value::Number(number)) => Some(number_text(number)),
            Self::Value(primitive) => Some(primitive.to_string()),
            Self::Unencodable => None,
        };
        text.filter(|text| !text.is_empty())
    }
}

/// Integral floats drop their fractional part (`1.0` is sent as `1`).
fn number_text(number: &Number) -> String {
    match number.as_f64() {
        Some(float) if number.is_f64() => float.to_string(),
        _ => number.to_string(),
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}
