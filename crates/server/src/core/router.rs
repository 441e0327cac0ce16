//! Core Router
//!
//! Infrastructure routes that do not belong to a feature.

use crate::core::AppState;
use axum::{routing::get, Router};

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "OK - Task Chat Relay"
}
