//! Chat Service Layer
//!
//! Presence tracking and message fan-out over the real-time channel.

pub mod handlers;
pub mod presence;
pub mod protocol;
pub mod relay;

pub use handlers::router;
pub use presence::PresenceRegistry;
pub use relay::ChatRelay;
