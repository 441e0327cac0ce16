//! Chat relay
//!
//! Fans `message` and `feedback` events out to every other open connection.
//! Chat messages are also handed to the [`MessageStore`], but the broadcast
//! never waits on that: a message can be delivered live and still fail to
//! persist. Failures end in a log line and nowhere else.

use crate::chat::presence::PresenceRegistry;
use crate::chat::protocol::ServerEvent;
use crate::core::models::{ChatMessage, ConnectionId};
use crate::core::store::MessageStore;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

pub struct ChatRelay {
    presence: Arc<PresenceRegistry>,
    store: Arc<dyn MessageStore>,
}

impl ChatRelay {
    pub fn new(presence: Arc<PresenceRegistry>, store: Arc<dyn MessageStore>) -> Self {
        Self { presence, store }
    }

    /// Relay a chat message to everyone but `sender` and persist it in the
    /// background.
    ///
    /// The returned handle resolves once persistence has finished (either
    /// way); dropping it detaches the task. It yields whether the save
    /// succeeded.
    pub fn on_message(&self, sender: ConnectionId, payload: Value) -> JoinHandle<bool> {
        let record = ChatMessage::from_payload(&payload, Utc::now());
        debug!(
            "Message from {} for task {:?} ({} -> {})",
            sender, record.task_id, record.sender, record.receiver
        );

        let store = self.store.clone();
        let persist = tokio::spawn(async move {
            let id = record.id;
            match store.save(record).await {
                Ok(()) => true,
                Err(e) => {
                    error!("Error saving message {} to storage: {}", id, e);
                    false
                }
            }
        });

        self.presence
            .broadcast_except(sender, &ServerEvent::ChatMessage(payload));

        persist
    }

    /// Relay a feedback payload verbatim to everyone but `sender`.
    pub fn on_feedback(&self, sender: ConnectionId, payload: Value) -> usize {
        debug!("Feedback from {}", sender);
        self.presence
            .broadcast_except(sender, &ServerEvent::Feedback(payload))
    }
}
