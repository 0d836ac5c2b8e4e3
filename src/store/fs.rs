use super::{Profile, ReplicaStore};
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const DOC_SUFFIX: &str = ".json";

/// Directory-backed replica: one pretty-printed JSON document per profile
///
/// The local replica stores `<id>.json`. A remote replica can be shadowed in
/// the same directory under a file-name prefix (`cloud_<id>.json`); the local
/// store is then told to exclude that prefix from `list_ids`.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    prefix: String,
    exclude: Option<String>,
    name: String,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prefix: String::new(),
            exclude: None,
            name: "local".to_string(),
        }
    }

    /// Remote replica simulated inside `root` under `prefix`
    pub fn shadow(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
            exclude: None,
            name: "cloud".to_string(),
        }
    }

    /// Hide documents whose file name starts with `prefix` from `list_ids`
    pub fn excluding(mut self, prefix: impl Into<String>) -> Self {
        self.exclude = Some(prefix.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the replica directory if it does not exist yet
    pub fn create_root(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| StoreError::Write {
            path: self.root.clone(),
            source: e,
        })
    }

    /// Path of the document for `profile_id`
    pub fn path_for(&self, profile_id: &str) -> Result<PathBuf> {
        validate_id(profile_id)?;
        Ok(self.root.join(format!("{}{}{}", self.prefix, profile_id, DOC_SUFFIX)))
    }

    fn id_from_file_name(&self, file_name: &str) -> Option<String> {
        if file_name.starts_with('.') {
            return None;
        }
        if let Some(exclude) = &self.exclude {
            if file_name.starts_with(exclude.as_str()) {
                return None;
            }
        }
        let id = file_name
            .strip_suffix(DOC_SUFFIX)?
            .strip_prefix(self.prefix.as_str())?;
        (!id.is_empty()).then(|| id.to_string())
    }
}

fn validate_id(profile_id: &str) -> Result<()> {
    let invalid = profile_id.is_empty()
        || profile_id.starts_with('.')
        || profile_id.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StoreError::InvalidId {
            id: profile_id.to_string(),
        });
    }
    Ok(())
}

fn decode(path: &Path, bytes: &[u8]) -> Result<Profile> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        source: e,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}

#[async_trait]
impl ReplicaStore for FsStore {
    async fn read(&self, profile_id: &str) -> Result<Option<Profile>> {
        let path = self.path_for(profile_id)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Read { path, source: e }),
        };

        tracing::trace!("Read {} bytes from {}", bytes.len(), path.display());
        decode(&path, &bytes).map(Some)
    }

    async fn write(&self, profile_id: &str, profile: &Profile) -> Result<()> {
        let path = self.path_for(profile_id)?;
        let bytes = serde_json::to_vec_pretty(profile).map_err(|e| StoreError::Write {
            path: path.clone(),
            source: e.into(),
        })?;
        let root = self.root.clone();

        // Write to a temp file in the same directory, then rename over the target
        tokio::task::spawn_blocking(move || {
            let write_err = |e: std::io::Error| StoreError::Write {
                path: path.clone(),
                source: e,
            };

            std::fs::create_dir_all(&root).map_err(write_err)?;

            let temp = tempfile::Builder::new()
                .prefix(".profsync-")
                .suffix(".tmp")
                .tempfile_in(&root)
                .map_err(write_err)?;

            {
                let mut writer = BufWriter::new(temp.as_file());
                writer.write_all(&bytes).map_err(write_err)?;
                writer.flush().map_err(write_err)?;
            }
            temp.as_file().sync_all().map_err(write_err)?;

            temp.persist(&path).map_err(|e| write_err(e.error))?;

            tracing::trace!("Wrote {} bytes to {}", bytes.len(), path.display());
            Ok::<(), StoreError>(())
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e.to_string())))?
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::List {
                    path: self.root.clone(),
                    source: e,
                })
            }
        };

        let list_err = |e: std::io::Error| StoreError::List {
            path: self.root.clone(),
            source: e,
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
            if !entry.file_type().await.map_err(list_err)?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(id) = self.id_from_file_name(file_name) {
                ids.push(id);
            }
        }

        ids.sort();
        Ok(ids)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn sample() -> Profile {
        match json!({"name": "Aria", "level": 3, "stats": {"str": 10}}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path());

        store.write("hero", &sample()).await.unwrap();

        let loaded = store.read("hero").await.unwrap().unwrap();
        assert_eq!(loaded, sample());
        assert!(temp.path().join("hero.json").exists());
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path());

        assert!(store.read("ghost").await.unwrap().is_none());
        assert!(!store.exists("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_document_is_pretty_printed() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path());

        store.write("hero", &sample()).await.unwrap();

        let text = fs::read_to_string(temp.path().join("hero.json")).unwrap();
        assert!(text.starts_with("{\n  \""));
        assert!(text.contains("\n    \"str\": 10"));
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path());

        store.write("hero", &sample()).await.unwrap();
        store.write("hero", &sample()).await.unwrap();

        let names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["hero.json".to_string()]);
    }

    #[tokio::test]
    async fn test_write_creates_missing_root() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path().join("nested").join("profiles"));

        store.write("hero", &sample()).await.unwrap();
        assert!(store.read("hero").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("broken.json"), "{ not json").unwrap();
        let store = FsStore::new(temp.path());

        let err = store.read("broken").await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_non_object_document_is_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("list.json"), "[1, 2, 3]").unwrap();
        let store = FsStore::new(temp.path());

        let err = store.read("list").await.unwrap_err();
        assert!(matches!(err, StoreError::NotAnObject { .. }));
    }

    #[tokio::test]
    async fn test_invalid_ids_rejected() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path());

        for id in ["", "../escape", "a/b", "a\\b", ".hidden"] {
            let err = store.read(id).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidId { .. }), "id {:?}", id);
        }
        assert!(store.write("../escape", &sample()).await.is_err());
    }

    #[tokio::test]
    async fn test_local_list_excludes_shadow_prefix() {
        let temp = TempDir::new().unwrap();
        let local = FsStore::new(temp.path()).excluding("cloud_");
        let cloud = FsStore::shadow(temp.path(), "cloud_");

        local.write("beta", &sample()).await.unwrap();
        local.write("alpha", &sample()).await.unwrap();
        cloud.write("alpha", &sample()).await.unwrap();
        cloud.write("gamma", &sample()).await.unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(temp.path().join("dir.json")).unwrap();

        assert_eq!(local.list_ids().await.unwrap(), vec!["alpha", "beta"]);
        assert_eq!(cloud.list_ids().await.unwrap(), vec!["alpha", "gamma"]);
    }

    #[tokio::test]
    async fn test_shadow_store_uses_prefixed_file() {
        let temp = TempDir::new().unwrap();
        let cloud = FsStore::shadow(temp.path(), "cloud_");

        cloud.write("hero", &sample()).await.unwrap();

        assert!(temp.path().join("cloud_hero.json").exists());
        assert!(!temp.path().join("hero.json").exists());
        assert_eq!(cloud.name(), "cloud");
    }

    #[tokio::test]
    async fn test_list_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path().join("absent"));

        assert!(store.list_ids().await.unwrap().is_empty());
    }
}
