//! Frame codec for the `(event, payload)` wire representation.
//!
//! The default wire format is the textual JSON two-element array
//! `[event, payload]`. Both directions are pluggable: a caller-supplied
//! [`FrameEncoder`]/[`FrameDecoder`] pair fully replaces the defaults,
//! enabling alternate wire formats without touching the rest of the stack.

use crate::error::Error;
use serde_json::{json, Value};
use tracing::trace;

/// Type alias for frame encoding functions.
///
/// A `FrameEncoder` turns an `(event, payload)` pair into the serialized
/// message carried by a channel frame.
///
/// # Function Signature
///
/// ```text
/// fn(&str, &Value) -> Result<String, Error>
/// ```
pub type FrameEncoder = fn(&str, &Value) -> Result<String, Error>;

/// Type alias for frame decoding functions.
///
/// A `FrameDecoder` turns a raw inbound frame back into its
/// `(event, payload)` pair. Returning an error drops the frame; it never
/// closes the channel.
///
/// # Function Signature
///
/// ```text
/// fn(&str) -> Result<(String, Value), Error>
/// ```
pub type FrameDecoder = fn(&str) -> Result<(String, Value), Error>;

/// Codec pair containing encoder and decoder functions.
///
/// [`FrameCodec::default()`] wires in the JSON-array functions
/// [`encode_json`] and [`decode_json`]. Install a custom pair with
/// [`Connection::with_codec`](crate::Connection::with_codec).
#[derive(Clone, Copy)]
pub struct FrameCodec {
    pub encoder: FrameEncoder,
    pub decoder: FrameDecoder,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self {
            encoder: encode_json,
            decoder: decode_json,
        }
    }
}

/// Encodes an `(event, payload)` pair as the JSON array `[event, payload]`.
pub fn encode_json(event: &str, payload: &Value) -> Result<String, Error> {
    trace!(event, "Encoding frame");
    serde_json::to_string(&json!([event, payload])).map_err(Error::Encode)
}

/// Decodes a JSON-array frame back into its `(event, payload)` pair.
///
/// Anything that is not a two-element JSON array whose first element is a
/// string is rejected with [`Error::MalformedFrame`].
pub fn decode_json(raw: &str) -> Result<(String, Value), Error> {
    let value: Value = serde_json::from_str(raw).map_err(Error::Decode)?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(Error::MalformedFrame(format!(
                "expected a two-element array, got {other}"
            )))
        }
    };

    let mut items = items.into_iter();
    match (items.next(), items.next(), items.next()) {
        (Some(Value::String(event)), Some(payload), None) => Ok((event, payload)),
        (Some(event), Some(_), None) => Err(Error::MalformedFrame(format!(
            "event name must be a string, got {event}"
        ))),
        _ => Err(Error::MalformedFrame(
            "expected a two-element array".to_string(),
        )),
    }
}

/// Checks the `success` field of a decoded payload with the truthiness rules
/// of the original wire protocol: a missing field, `null`, `false`, numeric
/// zero, and the empty string all count as failure. Payloads that are not
/// objects have no `success` field and therefore count as failure too.
pub(crate) fn is_success(payload: &Value) -> bool {
    match payload.get("success") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Null) | None => false,
        // Arrays and objects are truthy
        Some(_) => true,
    }
}
