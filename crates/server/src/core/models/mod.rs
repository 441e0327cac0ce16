use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Identity of one live real-time connection.
///
/// A fresh id is minted for every transport connection; a reconnecting client
/// never gets its old id back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A persisted record of one relayed `message` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub task_id: String,
    pub sender: String,
    pub receiver: String,
    pub message: String,
    /// Client supplied send time. `None` when the client sent a value that
    /// could not be read as a timestamp.
    pub date_time: Option<DateTime<Utc>>,
    pub received_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Build a record from an untyped `message` payload.
    ///
    /// Nothing is validated here: missing or non-string fields become empty
    /// strings and an absent `dateTime` falls back to the receipt time.
    pub fn from_payload(payload: &Value, received_at: DateTime<Utc>) -> Self {
        let date_time = match payload.get("dateTime") {
            None | Some(Value::Null) => Some(received_at),
            Some(raw) => parse_client_time(raw),
        };

        Self {
            id: Uuid::new_v4(),
            task_id: string_field(payload, "taskId"),
            sender: string_field(payload, "sender"),
            receiver: string_field(payload, "receiver"),
            message: string_field(payload, "message"),
            date_time,
            received_at,
        }
    }

    /// Ordering key for history listings.
    pub fn sort_time(&self) -> DateTime<Utc> {
        self.date_time.unwrap_or(self.received_at)
    }
}

fn string_field(payload: &Value, key: &str) -> String {
    match payload.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Accepts RFC 3339 strings and epoch milliseconds (what browsers send for
/// `Date.now()` or `new Date()`).
fn parse_client_time(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<i64>().ok().and_then(millis_to_time)),
        Value::Number(n) => n.as_i64().and_then(millis_to_time),
        _ => None,
    }
}

fn millis_to_time(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Body of `GET /presence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshot {
    pub clients_total: usize,
}
