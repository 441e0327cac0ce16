//! Stored chat history
//!
//! Read-only views over the message store: the conversation of one task and
//! the inbox of one user.

use crate::core::models::ChatMessage;
use crate::core::store::is_valid_task_id;
use crate::core::{AppState, Error, Result};
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

/// GET /chat/{task_id}/messages
pub async fn get_task_messages(
    Path(task_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ChatMessage>>> {
    info!("GET /chat/{}/messages", task_id);

    if !is_valid_task_id(&task_id) {
        return Err(Error::InvalidTaskId(task_id));
    }

    let messages = state.store.messages_for_task(&task_id).await?;
    Ok(Json(messages))
}

/// GET /inbox/{receiver}
pub async fn get_inbox(
    Path(receiver): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ChatMessage>>> {
    info!("GET /inbox/{}", receiver);

    if receiver.trim().is_empty() {
        return Err(Error::InvalidReceiver);
    }

    let messages = state.store.messages_for_receiver(&receiver).await?;
    Ok(Json(messages))
}
