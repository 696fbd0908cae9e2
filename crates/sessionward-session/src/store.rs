//! Durable key-value persistence for the bearer token and role.
//!
//! The session only ever touches two keys ([`TOKEN_KEY`], [`ROLE_KEY`]),
//! but the store is a plain string map so it can be backed by whatever the
//! host platform offers.
//!
//! [`TOKEN_KEY`]: sessionward_protocol::TOKEN_KEY
//! [`ROLE_KEY`]: sessionward_protocol::ROLE_KEY

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Errors raised by a [`CredentialStore`].
///
/// Storage failures are best-effort from the session's point of view:
/// they are logged and the in-memory transition proceeds regardless.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file or device failed.
    #[error("credential store I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The persisted data could not be parsed.
    #[error("credential store is corrupt: {0}")]
    Corrupt(String),

    /// The store refused the operation.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Durable string key-value storage.
///
/// Empty strings are how some platforms spell "unset"; callers treat an
/// empty value the same as a missing one.
pub trait CredentialStore: Send + Sync + 'static {
    /// Reads a value.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Writes a value.
    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes every listed key. Missing keys are not an error.
    fn remove_many(
        &self,
        keys: &[&str],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<T: CredentialStore> CredentialStore for Arc<T> {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
        (**self).get(key)
    }

    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).set(key, value)
    }

    fn remove_many(
        &self,
        keys: &[&str],
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).remove_many(keys)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Which operations a [`MemoryStore`] should fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreFailures {
    pub get: bool,
    pub set: bool,
    pub remove: bool,
}

/// In-process [`CredentialStore`]. Nothing survives a restart.
///
/// Failures can be injected per operation to exercise the best-effort
/// paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    failures: Mutex<StoreFailures>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `entries`.
    pub fn with_entries<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let store = Self::new();
        {
            let mut map = store.lock_entries();
            for (k, v) in entries {
                map.insert(k.to_string(), v.to_string());
            }
        }
        store
    }

    /// Replaces the failure flags.
    pub fn set_failures(&self, failures: StoreFailures) {
        *self
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = failures;
    }

    /// Reads a value without going through the async API.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.lock_entries().get(key).cloned()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    fn failures(&self) -> StoreFailures {
        *self
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // Every critical section is a single map operation, so a poisoned
        // lock still guards a consistent map.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.failures().get {
            return Err(StoreError::Unavailable("get disabled".into()));
        }
        Ok(self.lock_entries().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.failures().set {
            return Err(StoreError::Unavailable("set disabled".into()));
        }
        self.lock_entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        if self.failures().remove {
            return Err(StoreError::Unavailable("remove disabled".into()));
        }
        let mut map = self.lock_entries();
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// [`CredentialStore`] persisted as a JSON object in a single file.
///
/// Every write rewrites the whole file through a temp file + rename, so a
/// crash mid-write leaves either the old or the new contents. Operations
/// are serialized by an async lock; read-modify-write never interleaves.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        // A missing or empty file is a store with nothing in it yet.
        // `BTreeMap` keeps the rewritten file in a stable key order.
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Corrupt(e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn write_map(
        &self,
        map: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            // `Path::parent` of a bare file name is `Some("")`.
            if !parent.as_os_str().is_empty() {
                // `?` turns the `io::Error` into `StoreError::Io` via `#[from]`.
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(map)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        // Rename is atomic on the same filesystem; readers never see a
        // half-written file.
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

impl CredentialStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_map().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        let before = map.len();
        for key in keys {
            map.remove(*key);
        }
        if map.len() == before {
            return Ok(());
        }
        self.write_map(&map).await
    }
}
