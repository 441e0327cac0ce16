//! WebSocket endpoint for the real-time channel
//!
//! One reader loop per connection handles inbound frames strictly in arrival
//! order; a writer task drains the connection's outbox into the socket.

use crate::chat::presence::outbox;
use crate::chat::protocol::ClientEvent;
use crate::core::config::AppState;
use crate::core::models::ConnectionId;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

/// GET /ws
pub async fn ws_connect(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.max_message_size(state.config.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let id = ConnectionId::new();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut outbox_rx) = outbox();

    state.presence.on_open(id, tx);

    let mut writer = tokio::spawn(async move {
        while let Some(event) = outbox_rx.recv().await {
            let json = match event.to_json() {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to serialize {} for {}: {}", event.name(), id, e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                debug!("WebSocket send failed, connection {} is gone", id);
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => dispatch(&state, id, text.as_str()),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Binary(_))) => {
                        warn!("Ignoring binary frame from {}", id);
                    }
                    // Pings are answered by axum itself.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("WebSocket error on {}: {}", id, e);
                        break;
                    }
                }
            }
            _ = &mut writer => {
                // Writer stopped: the peer can no longer hear us.
                break;
            }
        }
    }

    state.presence.on_close(id);
    writer.abort();
    info!("Connection {} finished", id);
}

fn dispatch(state: &AppState, id: ConnectionId, text: &str) {
    match ClientEvent::parse(text) {
        Ok(ClientEvent::Message(payload)) => {
            // Persistence runs detached; the relay logs its outcome.
            drop(state.relay.on_message(id, payload));
        }
        Ok(ClientEvent::Feedback(payload)) => {
            state.relay.on_feedback(id, payload);
        }
        Err(e) => {
            warn!("Ignoring unreadable frame from {}: {}", id, e);
        }
    }
}
