//! JSON-based message storage
//!
//! One file per task under the storage directory, rewritten atomically
//! (temp file + rename) on every save and cached in memory.

use super::{is_valid_task_id, MessageStore, StoreError};
use crate::core::config::RelayConfig;
use crate::core::models::ChatMessage;
use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub struct JsonMessageStore {
    storage_dir: PathBuf,
    /// task id -> messages in arrival order
    tasks: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl JsonMessageStore {
    /// Open the store, loading every task file already on disk.
    pub async fn new(config: &RelayConfig) -> anyhow::Result<Self> {
        config.ensure_dirs().await?;

        let store = Self {
            storage_dir: config.storage_dir.clone(),
            tasks: RwLock::new(HashMap::new()),
        };

        store
            .load_existing_tasks()
            .await
            .with_context(|| format!("Failed to load messages from {:?}", store.storage_dir))?;

        info!(
            "JSON MessageStore initialized with {} tasks",
            store.tasks.read().await.len()
        );

        Ok(store)
    }

    fn task_path(&self, task_id: &str) -> PathBuf {
        self.storage_dir.join(format!("{}.json", task_id))
    }

    async fn load_existing_tasks(&self) -> Result<(), StoreError> {
        let mut entries = fs::read_dir(&self.storage_dir).await?;
        let mut tasks = self.tasks.write().await;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(task_id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_valid_task_id(task_id) {
                warn!("Skipping unexpected file {:?}", path);
                continue;
            }

            match load_task_file(&path).await {
                Ok(messages) => {
                    tasks.insert(task_id.to_string(), messages);
                }
                Err(e) => {
                    warn!("Failed to load task messages from {:?}: {}", path, e);
                }
            }
        }

        Ok(())
    }

    async fn write_task_file(&self, task_id: &str, messages: &[ChatMessage]) -> Result<(), StoreError> {
        let path = self.task_path(task_id);
        let temp_path = path.with_extension("tmp");

        let json = serde_json::to_string_pretty(messages)?;
        fs::write(&temp_path, json).await?;
        fs::rename(&temp_path, &path).await?;

        Ok(())
    }
}

async fn load_task_file(path: &Path) -> Result<Vec<ChatMessage>, StoreError> {
    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Oldest first; equal client times fall back to arrival order, since
/// concurrent saves may reach the file in either order.
fn sorted(mut messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    messages.sort_by_key(|m| (m.sort_time(), m.received_at));
    messages
}

#[async_trait]
impl MessageStore for JsonMessageStore {
    async fn save(&self, message: ChatMessage) -> Result<(), StoreError> {
        if !is_valid_task_id(&message.task_id) {
            return Err(StoreError::InvalidTaskId(message.task_id));
        }
        if message.date_time.is_none() {
            return Err(StoreError::InvalidTimestamp(message.id));
        }

        let mut tasks = self.tasks.write().await;
        let mut updated = tasks.get(&message.task_id).cloned().unwrap_or_default();
        let task_id = message.task_id.clone();
        let id = message.id;
        updated.push(message);

        // Memory only changes once the file is on disk.
        self.write_task_file(&task_id, &updated).await?;
        tasks.insert(task_id.clone(), updated);

        debug!("Saved message {} for task {}", id, task_id);
        Ok(())
    }

    async fn messages_for_task(&self, task_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        if !is_valid_task_id(task_id) {
            return Err(StoreError::InvalidTaskId(task_id.to_string()));
        }
        let tasks = self.tasks.read().await;
        Ok(sorted(tasks.get(task_id).cloned().unwrap_or_default()))
    }

    async fn messages_for_receiver(&self, receiver: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let tasks = self.tasks.read().await;
        let inbox = tasks
            .values()
            .flatten()
            .filter(|m| m.receiver == receiver)
            .cloned()
            .collect();
        Ok(sorted(inbox))
    }
}
