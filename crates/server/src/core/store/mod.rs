//! Chat message storage
//!
//! The relay only needs `save`; the history endpoints use the two queries.

pub mod json_store;

pub use json_store::JsonMessageStore;

use crate::core::models::ChatMessage;
use async_trait::async_trait;
use std::io;
use thiserror::Error;
use uuid::Uuid;

/// Errors returned by a [`MessageStore`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("invalid task id {0:?}")]
    InvalidTaskId(String),

    #[error("message {0} has no readable dateTime")]
    InvalidTimestamp(Uuid),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable home for chat messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist one message. Not transactional with anything the caller does.
    async fn save(&self, message: ChatMessage) -> Result<(), StoreError>;

    /// All messages of one task, oldest first.
    async fn messages_for_task(&self, task_id: &str) -> Result<Vec<ChatMessage>, StoreError>;

    /// All messages addressed to `receiver`, oldest first.
    async fn messages_for_receiver(&self, receiver: &str) -> Result<Vec<ChatMessage>, StoreError>;
}

/// Task ids double as file names, so only a conservative alphabet is allowed.
pub fn is_valid_task_id(task_id: &str) -> bool {
    !task_id.is_empty()
        && task_id.len() <= 128
        && task_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
