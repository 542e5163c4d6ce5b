//! Known MEV actor registry

use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::info;

#[async_trait]
pub trait ActorRegistry: Send + Sync {
    async fn is_known(&self, address: &Address) -> bool;

    /// Returns `true` if the address was not already registered.
    async fn add(&self, address: Address, label: Option<String>) -> bool;

    async fn remove(&self, address: &Address) -> bool;

    /// Point-in-time copy used for one detection cycle.
    async fn snapshot(&self) -> HashSet<Address>;
}

#[derive(Debug, Clone)]
struct ActorEntry {
    label: Option<String>,
    added_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct InMemoryActorRegistry {
    actors: RwLock<HashMap<Address, ActorEntry>>,
}

impl InMemoryActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actors(addresses: impl IntoIterator<Item = Address>) -> Self {
        let now = Utc::now();
        let actors = addresses
            .into_iter()
            .map(|a| (a, ActorEntry { label: None, added_at: now }))
            .collect();
        Self {
            actors: RwLock::new(actors),
        }
    }

    pub async fn label(&self, address: &Address) -> Option<String> {
        self.actors.read().await.get(address).and_then(|e| e.label.clone())
    }

    pub async fn len(&self) -> usize {
        self.actors.read().await.len()
    }

    /// Registration time of a known actor.
    pub async fn added_at(&self, address: &Address) -> Option<DateTime<Utc>> {
        self.actors.read().await.get(address).map(|e| e.added_at)
    }
}

#[async_trait]
impl ActorRegistry for InMemoryActorRegistry {
    async fn is_known(&self, address: &Address) -> bool {
        self.actors.read().await.contains_key(address)
    }

    async fn add(&self, address: Address, label: Option<String>) -> bool {
        let mut actors = self.actors.write().await;
        if actors.contains_key(&address) {
            return false;
        }
        info!(actor = %address, label = ?label, "Registered known MEV actor");
        actors.insert(address, ActorEntry { label, added_at: Utc::now() });
        true
    }

    async fn remove(&self, address: &Address) -> bool {
        self.actors.write().await.remove(address).is_some()
    }

    async fn snapshot(&self) -> HashSet<Address> {
        self.actors.read().await.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_remove_and_snapshot() {
        let registry = InMemoryActorRegistry::new();
        let bot = Address::repeat_byte(0xaa);

        assert!(registry.add(bot, Some("searcher".to_string())).await);
        assert!(!registry.add(bot, None).await);
        assert!(registry.is_known(&bot).await);
        assert_eq!(registry.label(&bot).await.as_deref(), Some("searcher"));

        let snapshot = registry.snapshot().await;
        assert!(registry.remove(&bot).await);
        assert!(!registry.is_known(&bot).await);
        assert!(snapshot.contains(&bot));
    }
}
