// Conflict resolution strategies
//
// Applied when both replicas hold a profile and their bodies differ.
// Resolution is pure: no I/O, no failure.

use crate::store::{Profile, LAST_CLOUD_SYNC, LAST_SYNC};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Timestamp assumed for a replica that has never been stamped
pub const EPOCH_TIMESTAMP: &str = "1970-01-01T00:00:00";

/// How to pick the winning document in a conflict
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Most recently written replica wins (compares sync timestamps)
    #[default]
    Newest,

    /// Local document always wins
    Local,

    /// Remote document always wins
    Cloud,

    /// Shallow union of both documents, remote keys override local ones
    Merge,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Newest,
        Strategy::Local,
        Strategy::Cloud,
        Strategy::Merge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Newest => "newest",
            Strategy::Local => "local",
            Strategy::Cloud => "cloud",
            Strategy::Merge => "merge",
        }
    }

    /// Look up a strategy by its exact name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Produce the document both replicas will hold after the conflict
    pub fn resolve(&self, local: &Profile, remote: &Profile) -> Profile {
        match self {
            Strategy::Newest => {
                // Plain string comparison: only chronological for fixed-width,
                // same-timezone timestamps. Ties go to the remote copy.
                let local_time = timestamp(local, LAST_SYNC);
                let remote_time = timestamp(remote, LAST_CLOUD_SYNC);
                if local_time > remote_time {
                    local.clone()
                } else {
                    remote.clone()
                }
            }
            Strategy::Local => local.clone(),
            Strategy::Cloud => remote.clone(),
            Strategy::Merge => {
                let mut merged = local.clone();
                for (key, value) in remote {
                    merged.insert(key.clone(), value.clone());
                }
                merged
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn timestamp<'a>(profile: &'a Profile, key: &str) -> &'a str {
    profile
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(EPOCH_TIMESTAMP)
}
