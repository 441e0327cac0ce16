//! Real-time channel wire format
//!
//! Every frame is a JSON text frame shaped `{"event": <name>, "data": <payload>}`.
//!
//! ```text
//! -> {"event":"message","data":{"taskId":"t1","sender":"A","receiver":"B","message":"hi","dateTime":"..."}}
//! <- {"event":"chat-message","data":{"taskId":"t1","sender":"A",...}}
//! <- {"event":"clients-total","data":3}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Events a client may send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Chat message; persisted and relayed as `chat-message`.
    Message(Value),
    /// Opaque feedback blob; relayed as-is.
    Feedback(Value),
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    ClientsTotal(usize),
    ChatMessage(Value),
    Feedback(Value),
}

/// Why an inbound frame was ignored.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown event {0:?}")]
    UnknownEvent(String),
}

/// Raw inbound frame. A frame without `data` carries `null`.
#[derive(Deserialize)]
struct InboundFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

impl ClientEvent {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let frame: InboundFrame = serde_json::from_str(text)?;
        match frame.event.as_str() {
            "message" => Ok(ClientEvent::Message(frame.data)),
            "feedback" => Ok(ClientEvent::Feedback(frame.data)),
            _ => Err(FrameError::UnknownEvent(frame.event)),
        }
    }
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::ClientsTotal(_) => "clients-total",
            ServerEvent::ChatMessage(_) => "chat-message",
            ServerEvent::Feedback(_) => "feedback",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_client_events() {
        let msg = ClientEvent::parse(r#"{"event":"message","data":{"taskId":"t1","message":"hi"}}"#)
            .unwrap();
        assert_eq!(msg, ClientEvent::Message(json!({"taskId": "t1", "message": "hi"})));

        let fb = ClientEvent::parse(r#"{"event":"feedback","data":{"rating":5}}"#).unwrap();
        assert_eq!(fb, ClientEvent::Feedback(json!({"rating": 5})));
    }

    #[test]
    fn test_frame_without_data_is_null() {
        let fb = ClientEvent::parse(r#"{"event":"feedback"}"#).unwrap();
        assert_eq!(fb, ClientEvent::Feedback(Value::Null));

        let msg = ClientEvent::parse(r#"{"event":"message"}"#).unwrap();
        assert_eq!(msg, ClientEvent::Message(Value::Null));
    }

    #[test]
    fn test_unknown_event_rejected() {
        assert!(matches!(
            ClientEvent::parse(r#"{"event":"clients-total","data":1}"#),
            Err(FrameError::UnknownEvent(name)) if name == "clients-total"
        ));
        assert!(matches!(ClientEvent::parse("not json"), Err(FrameError::Json(_))));
        assert!(ClientEvent::parse(r#"{"data":1}"#).is_err());
    }

    #[test]
    fn test_server_event_shape() {
        let total = ServerEvent::ClientsTotal(3).to_json().unwrap();
        let value: Value = serde_json::from_str(&total).unwrap();
        assert_eq!(value, json!({"event": "clients-total", "data": 3}));

        let chat = ServerEvent::ChatMessage(json!({"message": "hi"}));
        assert_eq!(chat.name(), "chat-message");
        let value: Value = serde_json::from_str(&chat.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"event": "chat-message", "data": {"message": "hi"}}));
    }
}
