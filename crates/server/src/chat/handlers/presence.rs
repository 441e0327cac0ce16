use crate::core::models::PresenceSnapshot;
use crate::core::AppState;
use axum::{extract::State, Json};

/// GET /presence
pub async fn get_presence(State(state): State<AppState>) -> Json<PresenceSnapshot> {
    Json(PresenceSnapshot {
        clients_total: state.presence.count(),
    })
}
