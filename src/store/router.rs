use super::{DetachedStore, FsStore, Profile, ReplicaStore};
use crate::config::{Config, RemoteKind};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Router that dispatches to the configured replica implementation
///
/// This lets the engine be built with one concrete type for both replicas
/// while the remote side is chosen at runtime.
pub enum StoreRouter {
    Fs(FsStore),
    Detached(DetachedStore),
}

impl StoreRouter {
    /// Local replica for `config`
    ///
    /// When the remote is shadowed in the same directory, its prefix is
    /// excluded so shadow documents are never listed as local profiles.
    pub fn local(config: &Config) -> Self {
        let store = FsStore::new(&config.data_dir);
        let store = match config.remote {
            RemoteKind::Shadow if shares_directory(&config.data_dir, config.remote_root()) => {
                store.excluding(config.shadow_prefix.clone())
            }
            _ => store,
        };
        StoreRouter::Fs(store)
    }

    /// Remote replica for `config`
    pub fn remote(config: &Config) -> Self {
        match config.remote {
            RemoteKind::Shadow => StoreRouter::Fs(FsStore::shadow(
                config.remote_root(),
                config.shadow_prefix.clone(),
            )),
            RemoteKind::Detached => StoreRouter::Detached(DetachedStore::new()),
        }
    }
}

/// Whether two spellings name the same directory
///
/// Paths that cannot be resolved (not created yet, unreadable) count as
/// shared, so the shadow prefix is hidden rather than listed.
fn shares_directory(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => true,
    }
}

#[async_trait]
impl ReplicaStore for StoreRouter {
    async fn read(&self, profile_id: &str) -> Result<Option<Profile>> {
        match self {
            StoreRouter::Fs(s) => s.read(profile_id).await,
            StoreRouter::Detached(s) => s.read(profile_id).await,
        }
    }

    async fn write(&self, profile_id: &str, profile: &Profile) -> Result<()> {
        match self {
            StoreRouter::Fs(s) => s.write(profile_id, profile).await,
            StoreRouter::Detached(s) => s.write(profile_id, profile).await,
        }
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        match self {
            StoreRouter::Fs(s) => s.list_ids().await,
            StoreRouter::Detached(s) => s.list_ids().await,
        }
    }

    async fn exists(&self, profile_id: &str) -> Result<bool> {
        match self {
            StoreRouter::Fs(s) => s.exists(profile_id).await,
            StoreRouter::Detached(s) => s.exists(profile_id).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            StoreRouter::Fs(s) => s.name(),
            StoreRouter::Detached(s) => s.name(),
        }
    }
}
