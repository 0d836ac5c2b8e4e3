// Replica synchronization engine
//
// Reconciles one profile at a time between a local and a remote replica.
// Exactly one of four cases applies, decided by which replicas hold the
// profile: upload, download, no-op/conflict, or not found.

use crate::hash::{body_digest, digest};
use crate::log::{LogEntry, SyncLog};
use crate::resolve::Strategy;
use crate::store::{Profile, ReplicaStore, LAST_CLOUD_SYNC, LAST_SYNC, SYNC_HASH};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OwnedMutexGuard;

/// Strategy name used when the caller does not pick one
pub const DEFAULT_STRATEGY: &str = "newest";

/// Entries returned by `get_log` when the caller does not pick a limit
pub const DEFAULT_LOG_LIMIT: usize = 20;

/// Profiles reconciled concurrently by `sync_all` unless configured
pub const DEFAULT_WORKERS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    Error,
}

/// What a reconciliation did
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// Local only: copied to the remote
    UploadedToCloud,
    /// Remote only: copied to local
    DownloadedFromCloud,
    /// Both present with equal bodies
    AlreadySynced,
    /// Both present with different bodies; resolved and written to both
    ConflictResolved,
    /// Neither replica holds the profile
    ProfileNotFound,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::UploadedToCloud => "uploaded_to_cloud",
            SyncAction::DownloadedFromCloud => "downloaded_from_cloud",
            SyncAction::AlreadySynced => "already_synced",
            SyncAction::ConflictResolved => "conflict_resolved",
            SyncAction::ProfileNotFound => "profile_not_found",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one reconciliation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub profile_id: String,
    pub status: SyncStatus,
    pub action: SyncAction,
    pub profile: Option<Profile>,
    /// Strategy name as requested, present only when a conflict was resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

impl SyncResult {
    fn synced(profile_id: &str, action: SyncAction, profile: Profile) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            status: SyncStatus::Synced,
            action,
            profile: Some(profile),
            strategy: None,
        }
    }

    fn not_found(profile_id: &str) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            status: SyncStatus::Error,
            action: SyncAction::ProfileNotFound,
            profile: None,
            strategy: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == SyncStatus::Error
    }
}

/// Two-replica profile synchronizer
///
/// Store failures never reach the caller: they are logged and the replica is
/// treated as not holding the profile. A transient remote outage therefore
/// looks like "never uploaded" and triggers an upload.
pub struct SyncEngine<L, R> {
    local: L,
    remote: R,
    log: SyncLog,
    locks: IdLocks,
    workers: usize,
}

impl<L: ReplicaStore, R: ReplicaStore> SyncEngine<L, R> {
    pub fn new(local: L, remote: R) -> Self {
        Self {
            local,
            remote,
            log: SyncLog::default(),
            locks: IdLocks::default(),
            workers: DEFAULT_WORKERS,
        }
    }

    /// Keep at most `capacity` log entries (minimum 1)
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log = SyncLog::new(capacity);
        self
    }

    /// Reconcile up to `workers` profiles at once in `sync_all` (minimum 1)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn log(&self) -> &SyncLog {
        &self.log
    }

    /// The most recent `limit` log entries, oldest first
    pub fn get_log(&self, limit: usize) -> Vec<LogEntry> {
        self.log.recent(limit)
    }

    /// Reconcile one profile
    ///
    /// Calls for the same id are serialized; calls for different ids run
    /// independently.
    pub async fn sync(&self, profile_id: &str, strategy: &str) -> SyncResult {
        let _slot = self.locks.acquire(profile_id).await;
        self.reconcile(profile_id, strategy).await
    }

    /// Reconcile every profile held by the local replica
    ///
    /// Results come back in `list_ids` order. A failing profile never stops
    /// the batch.
    pub async fn sync_all(&self, strategy: &str) -> Vec<SyncResult> {
        self.sync_all_with(strategy, |_| {}).await
    }

    /// Like `sync_all`, calling `on_result` as each result becomes available
    pub async fn sync_all_with<F>(&self, strategy: &str, mut on_result: F) -> Vec<SyncResult>
    where
        F: FnMut(&SyncResult),
    {
        let ids = match self.local.list_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                self.log.error(format!("Error listing {} profiles: {}", self.local.name(), e));
                Vec::new()
            }
        };

        tracing::debug!("Syncing {} profiles with {} workers", ids.len(), self.workers);

        let results: Vec<SyncResult> = stream::iter(ids.iter())
            .map(|id| self.sync(id, strategy))
            .buffered(self.workers)
            .inspect(|result| on_result(result))
            .collect()
            .await;

        self.log.info(format!("Synced {} profiles", results.len()));
        results
    }

    async fn reconcile(&self, profile_id: &str, strategy: &str) -> SyncResult {
        tracing::debug!(
            "Reconciling {} ({} / {})",
            profile_id,
            self.local.name(),
            self.remote.name()
        );

        let local = self.load_local(profile_id).await;
        let remote = self.fetch_remote(profile_id).await;

        match (local, remote) {
            (Some(local), None) => {
                self.push_remote(profile_id, local.clone()).await;
                SyncResult::synced(profile_id, SyncAction::UploadedToCloud, local)
            }
            (None, Some(remote)) => {
                let saved = self.save_local(profile_id, remote).await;
                SyncResult::synced(profile_id, SyncAction::DownloadedFromCloud, saved)
            }
            (Some(local), Some(remote)) => {
                let local_hash = body_digest(&local);
                let remote_hash = body_digest(&remote);

                if local_hash == remote_hash {
                    self.log.info(format!("Profile {} already synced", profile_id));
                    return SyncResult::synced(profile_id, SyncAction::AlreadySynced, local);
                }

                tracing::debug!(
                    "Conflict on {}: local {} vs cloud {}",
                    profile_id,
                    local_hash,
                    remote_hash
                );

                let resolved = self.resolve_conflict(profile_id, &local, &remote, strategy);
                let saved = self.save_local(profile_id, resolved).await;
                self.push_remote(profile_id, saved.clone()).await;

                SyncResult {
                    strategy: Some(strategy.to_string()),
                    ..SyncResult::synced(profile_id, SyncAction::ConflictResolved, saved)
                }
            }
            (None, None) => {
                self.log.error(format!("Profile {} not found on either replica", profile_id));
                SyncResult::not_found(profile_id)
            }
        }
    }

    fn resolve_conflict(
        &self,
        profile_id: &str,
        local: &Profile,
        remote: &Profile,
        strategy: &str,
    ) -> Profile {
        match Strategy::from_name(strategy) {
            Some(known) => {
                let resolved = known.resolve(local, remote);
                self.log.info(format!(
                    "Conflict on {} resolved using {} strategy",
                    profile_id, known
                ));
                resolved
            }
            None => {
                self.log.info(format!(
                    "Unknown strategy '{}' for {}, keeping local version",
                    strategy, profile_id
                ));
                local.clone()
            }
        }
    }

    async fn load_local(&self, profile_id: &str) -> Option<Profile> {
        match self.local.read(profile_id).await {
            Ok(profile) => profile,
            Err(e) => {
                self.log.error(format!("Error loading local profile {}: {}", profile_id, e));
                None
            }
        }
    }

    async fn fetch_remote(&self, profile_id: &str) -> Option<Profile> {
        match self.remote.read(profile_id).await {
            Ok(Some(profile)) => {
                self.log.success(format!("Fetched cloud profile {}", profile_id));
                Some(profile)
            }
            Ok(None) => None,
            Err(e) => {
                self.log.error(format!("Error fetching cloud profile {}: {}", profile_id, e));
                None
            }
        }
    }

    /// Stamp `last_sync`/`sync_hash` and write locally; returns the stamped
    /// document whether or not the write succeeded
    async fn save_local(&self, profile_id: &str, mut profile: Profile) -> Profile {
        stamp_local(&mut profile);
        match self.local.write(profile_id, &profile).await {
            Ok(()) => self.log.success(format!("Saved local profile {}", profile_id)),
            Err(e) => self.log.error(format!("Error saving local profile {}: {}", profile_id, e)),
        }
        profile
    }

    /// Stamp `last_cloud_sync` and write to the remote
    async fn push_remote(&self, profile_id: &str, mut profile: Profile) {
        stamp_remote(&mut profile);
        match self.remote.write(profile_id, &profile).await {
            Ok(()) => self.log.success(format!("Pushed cloud profile {}", profile_id)),
            Err(e) => self.log.error(format!("Error pushing cloud profile {}: {}", profile_id, e)),
        }
    }
}

/// `sync_hash` covers the whole document as it stands after `last_sync` is
/// set, including any metadata a previous sync left behind.
fn stamp_local(profile: &mut Profile) {
    profile.insert(LAST_SYNC.to_string(), Value::String(crate::timestamp()));
    let hash = digest(profile);
    profile.insert(SYNC_HASH.to_string(), Value::String(hash.to_hex()));
}

fn stamp_remote(profile: &mut Profile) {
    profile.insert(LAST_CLOUD_SYNC.to_string(), Value::String(crate::timestamp()));
}

/// Per-profile-id async mutexes
///
/// A slot exists only while some call holds or waits for it.
#[derive(Default)]
struct IdLocks {
    slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

struct IdSlot<'a> {
    locks: &'a IdLocks,
    id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl IdLocks {
    async fn acquire(&self, id: &str) -> IdSlot<'_> {
        let slot = Arc::clone(self.slots().entry(id.to_string()).or_default());
        let guard = slot.lock_owned().await;
        IdSlot {
            locks: self,
            id: id.to_string(),
            guard: Some(guard),
        }
    }

    fn release(&self, id: &str) {
        let mut slots = self.slots();
        if slots.get(id).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            slots.remove(id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for IdSlot<'_> {
    fn drop(&mut self) {
        // Unlock before checking whether anyone else still references the slot
        self.guard.take();
        self.locks.release(&self.id);
    }
}
