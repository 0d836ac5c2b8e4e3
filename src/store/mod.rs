pub mod detached;
pub mod fs;
pub mod memory;
pub mod router;

pub use detached::DetachedStore;
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use router::StoreRouter;

use crate::error::Result;
use async_trait::async_trait;

/// A profile document: a JSON object keyed by field name
pub type Profile = serde_json::Map<String, serde_json::Value>;

/// Set on the local replica whenever the engine writes it
pub const LAST_SYNC: &str = "last_sync";
/// Digest of the document at the time of the local write
pub const SYNC_HASH: &str = "sync_hash";
/// Set on the remote replica whenever the engine writes it
pub const LAST_CLOUD_SYNC: &str = "last_cloud_sync";

/// Top-level keys owned by the engine rather than the caller
pub const METADATA_KEYS: [&str; 3] = [LAST_SYNC, SYNC_HASH, LAST_CLOUD_SYNC];

/// Storage abstraction for one replica (local or remote)
///
/// Absence of a profile is a normal outcome (`Ok(None)`); errors are reserved
/// for I/O and decoding faults.
#[async_trait]
pub trait ReplicaStore: Send + Sync {
    /// Read the document stored under `profile_id`
    async fn read(&self, profile_id: &str) -> Result<Option<Profile>>;

    /// Replace the document stored under `profile_id`
    ///
    /// Readers never observe a partially written document.
    async fn write(&self, profile_id: &str, profile: &Profile) -> Result<()>;

    /// Ids currently held by this replica, sorted
    async fn list_ids(&self) -> Result<Vec<String>>;

    /// Check if a profile exists
    async fn exists(&self, profile_id: &str) -> Result<bool> {
        Ok(self.read(profile_id).await?.is_some())
    }

    /// Short label for log messages
    fn name(&self) -> &str;
}
