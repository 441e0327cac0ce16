//! Core Service Layer
//!
//! Shared infrastructure for the relay server: configuration, data models,
//! errors and message storage.

pub mod config;
pub mod error;
pub mod models;
pub mod router;
pub mod store;

// Re-exports for convenience
pub use config::{AppState, RelayConfig};
pub use error::{Error, Result};
pub use router::router;
