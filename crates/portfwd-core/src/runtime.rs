//! Runtime message protocol between the forwarder and the bridge.
//!
//! Messages travel over the runtime bus as untyped JSON objects shaped
//! `{ type, index, message?, current?, total? }`. The bridge only relays the
//! three tags below; every other tag is dropped without complaint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};

pub const LISTEN_ERROR: &str = "listenError";
pub const CONNECT_ERROR: &str = "connectError";
pub const CONNECTION_COUNT: &str = "connectionCount";

/// Sending half of the runtime message bus.
pub type RuntimeSender = mpsc::UnboundedSender<Value>;
/// Receiving half of the runtime message bus.
pub type RuntimeReceiver = mpsc::UnboundedReceiver<Value>;

/// Create the runtime message bus.
pub fn runtime_channel() -> (RuntimeSender, RuntimeReceiver) {
    mpsc::unbounded_channel()
}

/// An event raised by the background forwarder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuntimeEvent {
    /// Binding the local address of forward `index` failed.
    ListenError { index: i64, message: String },
    /// Dialing the remote address of forward `index` failed.
    ConnectError { index: i64, message: String },
    /// Open and lifetime connection counts for forward `index` changed.
    ConnectionCount { index: i64, current: i64, total: i64 },
}

impl RuntimeEvent {
    /// The wire tag of this event.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ListenError { .. } => LISTEN_ERROR,
            Self::ConnectError { .. } => CONNECT_ERROR,
            Self::ConnectionCount { .. } => CONNECTION_COUNT,
        }
    }

    /// Encode as a runtime bus message.
    pub fn to_message(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Decode a runtime bus message.
    ///
    /// Returns `Ok(None)` for a missing or unrecognized tag. A recognized tag
    /// with missing or ill-typed fields is an `Error::InvalidMessage`.
    pub fn from_message(msg: &Value) -> Result<Option<Self>> {
        let Some(tag) = field(msg, "type").and_then(Value::as_str) else {
            return Ok(None);
        };

        let event = match tag {
            LISTEN_ERROR => Self::ListenError {
                index: int_field(msg, tag, "index")?,
                message: str_field(msg, tag, "message")?,
            },
            CONNECT_ERROR => Self::ConnectError {
                index: int_field(msg, tag, "index")?,
                message: str_field(msg, tag, "message")?,
            },
            CONNECTION_COUNT => Self::ConnectionCount {
                index: int_field(msg, tag, "index")?,
                current: int_field(msg, tag, "current")?,
                total: int_field(msg, tag, "total")?,
            },
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Put this event on the runtime bus. A closed bus is not an error.
    pub fn send(&self, tx: &RuntimeSender) {
        if tx.send(self.to_message()).is_err() {
            debug!("Runtime bus closed, dropping {} event", self.tag());
        }
    }
}

/// Look up a field by its wire name, accepting a capitalized spelling too.
fn field<'a>(msg: &'a Value, name: &str) -> Option<&'a Value> {
    let obj = msg.as_object()?;
    obj.get(name).or_else(|| {
        let mut chars = name.chars();
        let capitalized: String = chars
            .next()
            .map(|c| c.to_ascii_uppercase())
            .into_iter()
            .chain(chars)
            .collect();
        obj.get(&capitalized)
    })
}

fn int_field(msg: &Value, tag: &str, name: &str) -> Result<i64> {
    field(msg, name)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::InvalidMessage(format!("{}: missing integer field '{}'", tag, name)))
}

fn str_field(msg: &Value, tag: &str, name: &str) -> Result<String> {
    field(msg, name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidMessage(format!("{}: missing string field '{}'", tag, name)))
}
