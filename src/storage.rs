//! Key-value storage backing per-user progress (session identity, stats, achievements, history).
//!
//! Values are JSON strings. `FileStorage` writes one `<percent-encoded key>.json` file per key.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::Arc,
};

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio::sync::RwLock;

use crate::error::AppError;

#[async_trait]
pub trait ProgressStorage: Send + Sync {
  async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
  async fn put(&self, key: &str, value: String) -> Result<(), AppError>;
  async fn remove(&self, key: &str) -> Result<(), AppError>;
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
  inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl ProgressStorage for MemoryStorage {
  async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
    Ok(self.inner.read().await.get(key).cloned())
  }

  async fn put(&self, key: &str, value: String) -> Result<(), AppError> {
    self.inner.write().await.insert(key.to_string(), value);
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), AppError> {
    self.inner.write().await.remove(key);
    Ok(())
  }
}

/// Everything but `[A-Za-z0-9_-]` is escaped, `%` included, so distinct keys never share a file.
const FILE_KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

#[derive(Clone, Debug)]
pub struct FileStorage {
  dir: PathBuf,
}

impl FileStorage {
  pub fn new(dir: impl AsRef<Path>) -> Self {
    Self { dir: dir.as_ref().to_path_buf() }
  }

  /// Keys come from client-supplied user ids; they are percent-encoded into a single file name.
  fn path_for(&self, key: &str) -> PathBuf {
    let safe = utf8_percent_encode(key, FILE_KEY_ENCODE_SET);
    self.dir.join(format!("{safe}.json"))
  }
}

#[async_trait]
impl ProgressStorage for FileStorage {
  async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
    match tokio::fs::read_to_string(self.path_for(key)).await {
      Ok(s) => Ok(Some(s)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  async fn put(&self, key: &str, value: String) -> Result<(), AppError> {
    tokio::fs::create_dir_all(&self.dir).await?;
    let path = self.path_for(key);
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, value).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), AppError> {
    match tokio::fs::remove_file(self.path_for(key)).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }
}

/// `MemoryStorage` whose `put` fails for keys containing a configured fragment.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct FailingStorage {
  pub inner: MemoryStorage,
  fail_on: Arc<std::sync::Mutex<Option<String>>>,
}

#[cfg(test)]
impl FailingStorage {
  pub fn fail_puts_on(&self, fragment: Option<&str>) {
    *self.fail_on.lock().unwrap() = fragment.map(str::to_string);
  }
}

#[cfg(test)]
#[async_trait]
impl ProgressStorage for FailingStorage {
  async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
    self.inner.get(key).await
  }

  async fn put(&self, key: &str, value: String) -> Result<(), AppError> {
    let failing = self.fail_on.lock().unwrap().as_deref().is_some_and(|f| key.contains(f));
    if failing {
      return Err(AppError::Storage(format!("disk full writing {key}")));
    }
    self.inner.put(key, value).await
  }

  async fn remove(&self, key: &str) -> Result<(), AppError> {
    self.inner.remove(key).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn file_storage_put_get_remove() {
    let dir = std::env::temp_dir().join(format!("mathpractice-test-{}", uuid::Uuid::new_v4()));
    let storage = FileStorage::new(&dir);
    assert_eq!(storage.get("user_1:stats").await.unwrap(), None);
    storage.put("user_1:stats", "{\"total\":1}".into()).await.unwrap();
    assert_eq!(storage.get("user_1:stats").await.unwrap().as_deref(), Some("{\"total\":1}"));
    storage.remove("user_1:stats").await.unwrap();
    storage.remove("user_1:stats").await.unwrap();
    assert_eq!(storage.get("user_1:stats").await.unwrap(), None);
    let _ = std::fs::remove_dir_all(&dir);
  }

  #[test]
  fn keys_cannot_escape_the_directory() {
    let storage = FileStorage::new("/data");
    let p = storage.path_for("../../etc/passwd");
    assert_eq!(p, PathBuf::from("/data/%2E%2E%2F%2E%2E%2Fetc%2Fpasswd.json"));
    assert_eq!(storage.path_for("user_1:progress"), PathBuf::from("/data/user_1%3Aprogress.json"));
  }

  #[tokio::test]
  async fn similar_user_ids_get_separate_files() {
    let dir = std::env::temp_dir().join(format!("mathpractice-test-{}", uuid::Uuid::new_v4()));
    let storage = FileStorage::new(&dir);
    storage.put("alice.smith:progress", "1".into()).await.unwrap();
    storage.put("alice%2Esmith:progress", "3".into()).await.unwrap();
    assert_eq!(storage.get("alice_smith:progress").await.unwrap(), None);
    assert_eq!(storage.get("ålice:progress").await.unwrap(), None);
    storage.put("ælice:progress", "2".into()).await.unwrap();
    assert_eq!(storage.get("ålice:progress").await.unwrap(), None);
    assert_eq!(storage.get("alice.smith:progress").await.unwrap().as_deref(), Some("1"));
    assert_eq!(storage.get("alice%2Esmith:progress").await.unwrap().as_deref(), Some("3"));
    let _ = std::fs::remove_dir_all(&dir);
  }

  #[tokio::test]
  async fn memory_storage_overwrites() {
    let storage = MemoryStorage::new();
    storage.put("k", "1".into()).await.unwrap();
    storage.put("k", "2".into()).await.unwrap();
    assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("2"));
  }
}
