use super::{Profile, ReplicaStore};
use crate::error::{Result, StoreError};
use async_trait::async_trait;

/// Stand-in for a remote replica that is not configured
///
/// Holds nothing and accepts nothing: reads report absence and writes fail
/// with `StoreError::Unavailable`, so every profile looks local-only.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedStore;

impl DetachedStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReplicaStore for DetachedStore {
    async fn read(&self, _profile_id: &str) -> Result<Option<Profile>> {
        Ok(None)
    }

    async fn write(&self, profile_id: &str, _profile: &Profile) -> Result<()> {
        Err(StoreError::Unavailable(format!(
            "no remote replica configured, cannot store {}",
            profile_id
        )))
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "cloud"
    }
}
