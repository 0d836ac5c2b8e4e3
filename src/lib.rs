//! Two-replica profile synchronization.
//!
//! A profile is a JSON document held by a local and a remote replica. The
//! [`SyncEngine`] reconciles the two: it uploads local-only profiles,
//! downloads remote-only ones, detects divergence by hashing a canonical
//! rendering of each document, and resolves conflicts with a [`Strategy`].
//!
//! ```no_run
//! use profsync::{FsStore, SyncEngine, DEFAULT_STRATEGY};
//!
//! # async fn run() {
//! let local = FsStore::new("data/profiles").excluding("cloud_");
//! let remote = FsStore::shadow("data/profiles", "cloud_");
//! let engine = SyncEngine::new(local, remote);
//!
//! let result = engine.sync("hero", DEFAULT_STRATEGY).await;
//! println!("{}: {}", result.profile_id, result.action);
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod hash;
pub mod log;
pub mod output;
pub mod resolve;
pub mod store;

pub use engine::{
    SyncAction, SyncEngine, SyncResult, SyncStatus, DEFAULT_LOG_LIMIT, DEFAULT_STRATEGY,
};
pub use error::{ConfigError, StoreError};
pub use hash::ContentHash;
pub use log::{LogEntry, LogLevel, SyncLog};
pub use resolve::Strategy;
pub use store::{
    DetachedStore, FsStore, MemoryStore, Profile, ReplicaStore, StoreRouter,
};

/// Local wall-clock time, fixed width (`2024-06-01T12:30:00.000000`)
///
/// Fixed width keeps string comparison of engine-written timestamps in
/// chronological order.
pub fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_fixed_width_and_ordered() {
        let first = timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = timestamp();

        assert_eq!(first.len(), 26);
        assert_eq!(&first[10..11], "T");
        assert!(second > first);
    }
}
