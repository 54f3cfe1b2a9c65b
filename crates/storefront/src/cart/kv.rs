//! Persistent string key-value store.
//!
//! Holds the whole map in memory behind a mutex and rewrites a JSON object
//! file after every mutation (temp file + rename). Suited to small, low-write
//! data such as shopping carts.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

/// Errors from the key-value store.
#[derive(Debug, Error)]
pub enum KvError {
    /// Reading or writing the backing file failed.
    #[error("Storage I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file is not a JSON object of strings.
    #[error("Corrupt storage file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A string-to-string map, optionally persisted to a JSON file.
#[derive(Clone)]
pub struct KvStore {
    inner: Arc<KvStoreInner>,
}

struct KvStoreInner {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, String>>,
}

impl KvStore {
    /// Open a file-backed store. A missing file starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, KvError> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| KvError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(KvError::Io { path, source }),
        };

        tracing::info!(path = %path.display(), keys = entries.len(), "Key-value store opened");
        Ok(Self::with_entries(Some(path), entries))
    }

    /// A store that lives only in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_entries(None, BTreeMap::new())
    }

    fn with_entries(path: Option<PathBuf>, entries: BTreeMap<String, String>) -> Self {
        Self {
            inner: Arc::new(KvStoreInner {
                path,
                entries: Mutex::new(entries),
            }),
        }
    }

    /// Backing file, if persistent.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Read a value.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.inner.entries.lock().await.get(key).cloned()
    }

    /// Write a value.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails; the previous value is kept.
    pub async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        self.update(key, |_| Some(value)).await.map(|_| ())
    }

    /// Delete a value.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub async fn remove(&self, key: &str) -> Result<(), KvError> {
        self.update(key, |_| None).await.map(|_| ())
    }

    /// Keys starting with `prefix`, in sorted order.
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.inner
            .entries
            .lock()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Read-modify-write one key under a single lock.
    ///
    /// `f` receives the current value and returns the new one (`None`
    /// deletes). Returns the value now stored.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails; the stored value is then unchanged.
    pub async fn update<F>(&self, key: &str, f: F) -> Result<Option<String>, KvError>
    where
        F: FnOnce(Option<&str>) -> Option<String>,
    {
        let mut entries = self.inner.entries.lock().await;
        let current = entries.get(key).map(String::as_str);
        let next = f(current);

        if next.as_deref() == current {
            return Ok(next);
        }

        // The file is written from a staged copy; memory changes only once it lands.
        let mut staged = entries.clone();
        match &next {
            Some(value) => {
                staged.insert(key.to_string(), value.clone());
            }
            None => {
                staged.remove(key);
            }
        }

        if let Some(path) = &self.inner.path {
            persist(path, &staged).await?;
        }
        *entries = staged;
        Ok(next)
    }
}

/// Write the map atomically: temp file in the same directory, then rename.
async fn persist(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), KvError> {
    let io_err = |source| KvError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
    }

    let json = serde_json::to_vec_pretty(entries).map_err(|source| KvError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, json).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_get_set_remove() {
        let kv = KvStore::in_memory();
        assert_eq!(kv.get("a").await, None);

        kv.set("a", "1".to_string()).await.unwrap();
        assert_eq!(kv.get("a").await.as_deref(), Some("1"));

        kv.remove("a").await.unwrap();
        assert_eq!(kv.get("a").await, None);
        kv.remove("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_sees_current_value() {
        let kv = KvStore::in_memory();
        kv.set("n", "1".to_string()).await.unwrap();

        let stored = kv
            .update("n", |current| {
                let n: u32 = current.unwrap().parse().unwrap();
                Some((n + 1).to_string())
            })
            .await
            .unwrap();
        assert_eq!(stored.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_keys_with_prefix() {
        let kv = KvStore::in_memory();
        kv.set("cart:b", "[]".to_string()).await.unwrap();
        kv.set("cart:a", "[]".to_string()).await.unwrap();
        kv.set("other", "x".to_string()).await.unwrap();
        assert_eq!(kv.keys_with_prefix("cart:").await, vec!["cart:a", "cart:b"]);
    }

    #[tokio::test]
    async fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/carts.json");

        let kv = KvStore::open(&path).await.unwrap();
        kv.set("cart:x", "[1]".to_string()).await.unwrap();
        drop(kv);

        let reopened = KvStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("cart:x").await.as_deref(), Some("[1]"));
        assert_eq!(reopened.path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_open_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("carts.json");
        tokio::fs::write(&path, "{ nope").await.unwrap();

        let err = KvStore::open(&path).await.err().unwrap();
        assert!(matches!(err, KvError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_open_empty_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("carts.json");
        tokio::fs::write(&path, "").await.unwrap();

        let kv = KvStore::open(&path).await.unwrap();
        assert!(kv.keys_with_prefix("").await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        let path = sub.join("carts.json");

        let kv = KvStore::open(&path).await.unwrap();
        kv.set("cart:a", "[1]".to_string()).await.unwrap();

        // Replace the directory with a plain file so every write fails.
        tokio::fs::remove_dir_all(&sub).await.unwrap();
        tokio::fs::write(&sub, "blocker").await.unwrap();

        assert!(kv.set("cart:a", "[2]".to_string()).await.is_err());
        assert_eq!(kv.get("cart:a").await.as_deref(), Some("[1]"));

        assert!(kv.set("cart:b", "[3]".to_string()).await.is_err());
        assert_eq!(kv.get("cart:b").await, None);

        assert!(kv.remove("cart:a").await.is_err());
        assert_eq!(kv.get("cart:a").await.as_deref(), Some("[1]"));
    }
}
