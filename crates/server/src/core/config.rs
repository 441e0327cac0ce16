//! Relay server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tracing::warn;

use crate::chat::presence::PresenceRegistry;
use crate::chat::relay::ChatRelay;
use crate::core::store::MessageStore;

/// Configuration for the relay server
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Directory holding one JSON file per task
    pub storage_dir: PathBuf,
    /// Address the HTTP/WebSocket listener binds to
    pub bind_addr: SocketAddr,
    /// Largest inbound WebSocket message accepted, in bytes
    pub max_message_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("relay_data").join("messages"),
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 6969),
            max_message_bytes: 64 * 1024,
        }
    }
}

impl RelayConfig {
    /// Create config with custom base directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base: PathBuf = base_dir.into();
        Self {
            storage_dir: base.join("messages"),
            ..Self::default()
        }
    }

    /// Read `RELAY_*` variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = match std::env::var("RELAY_ROOT") {
            Ok(root) if !root.is_empty() => Self::with_base_dir(root),
            _ => Self::default(),
        };

        let host = env_or("RELAY_HOST", config.bind_addr.ip());
        let port = env_or("RELAY_PORT", config.bind_addr.port());
        config.bind_addr = SocketAddr::new(host, port);
        config.max_message_bytes = env_or("RELAY_MAX_MESSAGE_BYTES", config.max_message_bytes);

        config
    }

    /// Ensure all directories exist
    pub async fn ensure_dirs(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.storage_dir).await?;
        Ok(())
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub store: Arc<dyn MessageStore>,
    pub presence: Arc<PresenceRegistry>,
    pub relay: Arc<ChatRelay>,
}

impl AppState {
    /// Wire a fresh registry and relay around `store`.
    pub fn new(config: RelayConfig, store: Arc<dyn MessageStore>) -> Self {
        let presence = Arc::new(PresenceRegistry::new());
        let relay = Arc::new(ChatRelay::new(presence.clone(), store.clone()));
        Self {
            config,
            store,
            presence,
            relay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_dir_layout() {
        let config = RelayConfig::with_base_dir("/tmp/relay-test");
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/relay-test/messages"));
        assert_eq!(config.bind_addr.port(), 6969);
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        std::env::set_var("RELAY_TEST_PORT_GARBAGE", "not-a-port");
        assert_eq!(env_or("RELAY_TEST_PORT_GARBAGE", 1234u16), 1234);
        std::env::set_var("RELAY_TEST_PORT_GOOD", " 8080 ");
        assert_eq!(env_or("RELAY_TEST_PORT_GOOD", 1234u16), 8080);
        assert_eq!(env_or("RELAY_TEST_PORT_UNSET", 42usize), 42);
    }
}
