//! Chat Handlers and Router
//!
//! Real-time channel plus the read-only history and presence routes.

use crate::core::AppState;
use axum::{routing::get, Router};

pub mod history;
pub mod presence;
pub mod ws;

pub fn router() -> Router<AppState> {
    Router::new()
        // Real-time channel
        .route("/ws", get(ws::ws_connect))
        // Presence
        .route("/presence", get(presence::get_presence))
        // Stored history
        .route("/chat/{task_id}/messages", get(history::get_task_messages))
        .route("/inbox/{receiver}", get(history::get_inbox))
}
