use std::path::PathBuf;
use thiserror::Error;

/// Failure on a single replica.
///
/// The sync engine never propagates these to its caller: they are logged and
/// the replica is treated as not holding the profile.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read profile: {path}\nCause: {source}\nCheck that the file is readable.")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write profile: {path}\nCause: {source}\nCheck disk space and write permissions on the replica directory.")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to list replica directory: {path}\nCause: {source}\nCheck that the directory exists and you have read permissions.")]
    List {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt profile document: {path}\nCause: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Profile document is not a JSON object: {path}")]
    NotAnObject { path: PathBuf },

    #[error("Invalid profile id: {id:?}\nIds must be non-empty, may not start with '.', and may not contain path separators.")]
    InvalidId { id: String },

    #[error("Replica unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {path}\nCause: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {path}\nCause: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Cannot determine config directory (HOME not set)\nSet PROFSYNC_CONFIG to point at a config file.")]
    NoConfigDir,
}
