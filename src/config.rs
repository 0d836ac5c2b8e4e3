use crate::error::ConfigError;
use crate::log::DEFAULT_LOG_CAPACITY;
use crate::resolve::Strategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV: &str = "PROFSYNC_CONFIG";

/// Where the remote replica lives
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    /// Shadow copies in a directory, under `shadow_prefix`
    #[default]
    Shadow,

    /// No remote configured: profiles only ever exist locally
    Detached,
}

/// Configuration file (`~/.config/profsync/config.toml`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the local replica
    pub data_dir: PathBuf,

    /// Directory holding the shadow remote (defaults to `data_dir`)
    pub remote_dir: Option<PathBuf>,

    pub remote: RemoteKind,

    /// File-name prefix of shadow remote documents
    pub shadow_prefix: String,

    /// Strategy used when none is given on the command line
    pub strategy: Strategy,

    /// Entries kept in the operation log
    pub log_capacity: usize,

    /// Profiles reconciled concurrently by `sync-all`
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/profiles"),
            remote_dir: None,
            remote: RemoteKind::Shadow,
            shadow_prefix: "cloud_".to_string(),
            strategy: Strategy::Newest,
            log_capacity: DEFAULT_LOG_CAPACITY,
            workers: num_cpus::get().max(1),
        }
    }
}

impl Config {
    /// Path of the config file: `$PROFSYNC_CONFIG`, else the user config dir
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("profsync").join("config.toml"))
    }

    /// Load the config file, falling back to defaults when it does not exist
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_capacity == 0 {
            return Err(ConfigError::Invalid(
                "log_capacity must be at least 1".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        if self.remote == RemoteKind::Shadow {
            if self.shadow_prefix.is_empty() {
                return Err(ConfigError::Invalid(
                    "shadow_prefix must not be empty (remote copies would overwrite local ones)"
                        .to_string(),
                ));
            }
            if self.shadow_prefix.contains(['/', '\\']) || self.shadow_prefix.starts_with('.') {
                return Err(ConfigError::Invalid(format!(
                    "shadow_prefix {:?} must be a plain file-name prefix",
                    self.shadow_prefix
                )));
            }
        }
        Ok(())
    }

    /// Directory the shadow remote is stored in
    pub fn remote_root(&self) -> &Path {
        self.remote_dir.as_deref().unwrap_or(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_from(&temp.path().join("absent.toml")).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("data/profiles"));
        assert_eq!(config.remote, RemoteKind::Shadow);
        assert_eq!(config.shadow_prefix, "cloud_");
        assert_eq!(config.strategy, Strategy::Newest);
        assert_eq!(config.log_capacity, 100);
        assert!(config.workers >= 1);
        assert_eq!(config.remote_root(), Path::new("data/profiles"));
    }

    #[test]
    fn test_partial_file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
data_dir = "/srv/profiles"
remote_dir = "/mnt/cloud"
strategy = "merge"
workers = 3
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/profiles"));
        assert_eq!(config.remote_root(), Path::new("/mnt/cloud"));
        assert_eq!(config.strategy, Strategy::Merge);
        assert_eq!(config.workers, 3);
        assert_eq!(config.log_capacity, 100);
    }

    #[test]
    fn test_detached_remote() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "remote = \"detached\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.remote, RemoteKind::Detached);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "strategy = \"oldest\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "cloud_url = \"https://example.com\"\n").unwrap();

        assert!(matches!(
            Config::load_from(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn test_validation() {
        let config = Config {
            log_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            shadow_prefix: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            shadow_prefix: "remote/".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        // Prefix is irrelevant without a shadow remote
        let config = Config {
            remote: RemoteKind::Detached,
            shadow_prefix: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
