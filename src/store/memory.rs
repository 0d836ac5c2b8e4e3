use super::{Profile, ReplicaStore};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-process replica
///
/// Useful when embedding the engine next to a remote that is reached some
/// other way, and for exercising the engine without touching disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, Profile>>,
    name: String,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            docs: RwLock::new(BTreeMap::new()),
            name: name.into(),
        }
    }

    /// Number of stored profiles
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

#[async_trait]
impl ReplicaStore for MemoryStore {
    async fn read(&self, profile_id: &str) -> Result<Option<Profile>> {
        Ok(self.docs.read().await.get(profile_id).cloned())
    }

    async fn write(&self, profile_id: &str, profile: &Profile) -> Result<()> {
        self.docs
            .write()
            .await
            .insert(profile_id.to_string(), profile.clone());
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        Ok(self.docs.read().await.keys().cloned().collect())
    }

    async fn exists(&self, profile_id: &str) -> Result<bool> {
        Ok(self.docs.read().await.contains_key(profile_id))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
