use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::StorageError;
use crate::storage::EntryStore;

/// Volatile in-process entry store.
///
/// Holds a plain `name -> value` map shared across requests. Not durable;
/// intended for demos and tests. Concurrent `put`s to the same name are
/// last-write-wins under the write lock.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
    latency: Option<Duration>,
}

fn demo_entries() -> HashMap<String, String> {
    HashMap::from([
        ("first".to_string(), "test".to_string()),
        ("second".to_string(), "not here".to_string()),
    ])
}

impl MemoryStore {
    /// Store pre-seeded with the two demo entries.
    pub fn new() -> Arc<Self> {
        Self::with_entries(demo_entries())
    }

    /// Store over an explicit initial map.
    pub fn with_entries(entries: HashMap<String, String>) -> Arc<Self> {
        Arc::new(Self { entries: Arc::new(RwLock::new(entries)), latency: None })
    }

    /// Demo store that sleeps for `latency` before every operation, to make
    /// the web client's loading states observable. A fixed sleep, not a
    /// retry or backoff mechanism.
    pub fn with_artificial_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            entries: Arc::new(RwLock::new(demo_entries())),
            latency: Some(latency),
        })
    }

    async fn simulate_latency(&self) {
        if let Some(delay) = self.latency {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn list(&self) -> Result<Vec<String>, StorageError> {
        self.simulate_latency().await;
        let entries = self.entries.read().await;
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn get(&self, name: &str) -> Result<String, StorageError> {
        self.simulate_latency().await;
        let entries = self.entries.read().await;
        Ok(entries.get(name).cloned().unwrap_or_default())
    }

    async fn put(&self, name: &str, value: &str) -> Result<(), StorageError> {
        self.simulate_latency().await;
        let mut entries = self.entries.write().await;
        entries.insert(name.to_string(), value.to_string());
        Ok(())
    }
}
