//! Relay message type.
//!
//! A [`Message`] is an ordered mapping of string keys to JSON values. The
//! broker only ever interprets a handful of reserved fields; everything else
//! is opaque payload that belongs to the worker behind the session.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RelayError, Result};
use crate::session::SessionId;

/// Field carrying the session reference.
pub const SESSION_FIELD: &str = "session";
/// Field carrying a control command directed at the worker.
pub const CMD_FIELD: &str = "cmd";
/// Control command asking a worker to terminate without doing domain work.
pub const STOP_CMD: &str = "stop";
/// Injected caller-address annotation.
pub const CLIENT_FIELD: &str = "client";
/// Injected caller-identity annotation.
pub const CLIENT_ID_FIELD: &str = "client_id";

/// An ordered JSON-object message exchanged between clients and workers.
///
/// Key order is preserved across decode/encode (serde_json `preserve_order`),
/// so a worker sees fields in the order the client wrote them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Map<String, Value>);

impl Message {
    /// Create an empty message.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Decode a message from raw JSON bytes.
    ///
    /// Anything that is not a JSON object is rejected.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| RelayError::MalformedMessage(e.to_string()))
    }

    /// The synthetic control message that asks a worker to terminate.
    pub fn stop() -> Self {
        let mut msg = Self::new();
        msg.insert(CMD_FIELD, Value::String(STOP_CMD.into()));
        msg
    }

    /// Whether this message is the stop control message.
    pub fn is_stop(&self) -> bool {
        matches!(self.0.get(CMD_FIELD), Some(Value::String(cmd)) if cmd == STOP_CMD)
    }

    /// The raw session reference, if the message carries one.
    pub fn session_field(&self) -> Option<&str> {
        match self.0.get(SESSION_FIELD) {
            Some(Value::String(id)) => Some(id.as_str()),
            // A non-string session value is still "carries a reference";
            // it will fail to parse and be rejected uniformly.
            Some(_) => Some(""),
            None => None,
        }
    }

    /// Stamp the message with a session id, replacing any existing value.
    pub fn set_session(&mut self, id: SessionId) {
        self.0
            .insert(SESSION_FIELD.into(), Value::String(id.to_string()));
    }

    /// Inject caller metadata. This is the only payload mutation the broker
    /// performs on the way in.
    pub fn annotate(&mut self, client: &str, client_id: Option<&str>) {
        self.0
            .insert(CLIENT_FIELD.into(), Value::String(client.into()));
        if let Some(identity) = client_id {
            self.0
                .insert(CLIENT_ID_FIELD.into(), Value::String(identity.into()));
        }
    }

    /// Get a field by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert a field, replacing any existing value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Iterate over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the message has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
