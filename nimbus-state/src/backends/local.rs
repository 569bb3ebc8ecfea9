//! Local file backend for state storage
//!
//! State is kept in a JSON file (default: nimbus.state.json). A `.lock`
//! file next to it holds the lock.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Duration;
use tokio::io::AsyncWriteExt;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};
use crate::lock::{DEFAULT_LOCK_TIMEOUT_SECS, LockInfo};
use crate::state::StateFile;

pub struct LocalBackend {
    state_path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

impl LocalBackend {
    pub const DEFAULT_STATE_FILE: &'static str = "nimbus.state.json";

    pub fn new() -> Self {
        Self::with_path(PathBuf::from(Self::DEFAULT_STATE_FILE))
    }

    pub fn with_path(state_path: PathBuf) -> Self {
        let lock_path = state_path.with_extension("lock");
        Self {
            state_path,
            lock_path,
            lock_timeout: Duration::seconds(DEFAULT_LOCK_TIMEOUT_SECS),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Attributes: `path` (state file), `lock_timeout_secs`
    pub fn from_config(config: &BackendConfig) -> BackendResult<Self> {
        let path = config
            .get_string("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_STATE_FILE));
        let mut backend = Self::with_path(path);

        if let Some(secs) = config.get_int("lock_timeout_secs") {
            if secs <= 0 {
                return Err(BackendError::configuration(format!(
                    "lock_timeout_secs must be positive, got {}",
                    secs
                )));
            }
            backend = backend.with_lock_timeout(Duration::seconds(secs));
        }
        Ok(backend)
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    async fn read_lock(&self) -> BackendResult<Option<LockInfo>> {
        let content = match tokio::fs::read_to_string(&self.lock_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read lock file", e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| BackendError::InvalidState(format!("Failed to parse lock file: {}", e)))
    }

    async fn remove_lock(&self) -> BackendResult<()> {
        tokio::fs::remove_file(&self.lock_path)
            .await
            .map_err(|e| io_error("remove lock file", e))
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateBackend for LocalBackend {
    async fn read_state(&self) -> BackendResult<Option<StateFile>> {
        let content = match tokio::fs::read_to_string(&self.state_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read state file", e)),
        };
        let state = serde_json::from_str(&content).map_err(|e| {
            BackendError::InvalidState(format!("Failed to parse state file: {}", e))
        })?;
        Ok(Some(state))
    }

    async fn write_state(&self, state: &StateFile) -> BackendResult<()> {
        if let Some(stored) = self.read_state().await? {
            if stored.lineage != state.lineage {
                return Err(BackendError::LineageMismatch {
                    expected: stored.lineage,
                    actual: state.lineage.clone(),
                });
            }
            if state.serial < stored.serial {
                return Err(BackendError::StaleSerial {
                    stored: stored.serial,
                    actual: state.serial,
                });
            }
        }

        let content = serde_json::to_string_pretty(state).map_err(|e| {
            BackendError::Serialization(format!("Failed to serialize state: {}", e))
        })?;

        // Replace the file in one step so readers never see a partial state
        let tmp_path = self.state_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|e| io_error("write state file", e))?;
        tokio::fs::rename(&tmp_path, &self.state_path)
            .await
            .map_err(|e| io_error("replace state file", e))?;

        log::debug!(
            "Wrote state serial {} to {}",
            state.serial,
            self.state_path.display()
        );
        Ok(())
    }

    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo> {
        if let Some(existing) = self.read_lock().await? {
            if !existing.is_expired() {
                return Err(BackendError::locked(&existing));
            }
            log::warn!(
                "Removing expired lock {} held by {}",
                existing.id,
                existing.who
            );
            self.remove_lock().await?;
        }

        let lock = LockInfo::with_timeout(operation, self.lock_timeout);
        let content = serde_json::to_vec_pretty(&lock)
            .map_err(|e| BackendError::Serialization(format!("Failed to serialize lock: {}", e)))?;

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
            .await
        {
            Ok(file) => file,
            // Another process won the race
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return match self.read_lock().await? {
                    Some(other) => Err(BackendError::locked(&other)),
                    None => Err(io_error("create lock file", e)),
                };
            }
            Err(e) => return Err(io_error("create lock file", e)),
        };
        file.write_all(&content)
            .await
            .map_err(|e| io_error("write lock file", e))?;
        file.flush()
            .await
            .map_err(|e| io_error("write lock file", e))?;

        log::debug!("Acquired lock {} for {}", lock.id, lock.operation);
        Ok(lock)
    }

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()> {
        let existing = self
            .read_lock()
            .await?
            .ok_or_else(|| BackendError::LockNotFound(lock.id.clone()))?;

        if existing.id != lock.id {
            return Err(BackendError::LockMismatch {
                expected: lock.id.clone(),
                actual: existing.id,
            });
        }
        self.remove_lock().await
    }

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()> {
        match self.read_lock().await {
            Ok(None) => return Err(BackendError::LockNotFound(lock_id.to_string())),
            Ok(Some(existing)) if existing.id != lock_id => {
                return Err(BackendError::LockMismatch {
                    expected: lock_id.to_string(),
                    actual: existing.id,
                });
            }
            // An unreadable lock file is removed too
            Ok(Some(_)) | Err(BackendError::InvalidState(_)) => {}
            Err(e) => return Err(e),
        }
        log::warn!("Force unlocking {}", self.lock_path.display());
        self.remove_lock().await
    }

    async fn init(&self) -> BackendResult<()> {
        if let Some(parent) = self.state_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create state directory", e))?;
        }
        Ok(())
    }
}

fn io_error(action: &str, error: std::io::Error) -> BackendError {
    BackendError::Io(format!("Failed to {}: {}", action, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_core::resource::{ResourceAddress, Value};
    use tempfile::tempdir;

    use crate::state::ResourceState;

    #[tokio::test]
    async fn read_write_round_trip() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));
        assert!(backend.read_state().await.unwrap().is_none());

        let mut state = StateFile::new();
        state.upsert_resource(ResourceState::new(
            "/subscriptions/sub1",
            &ResourceAddress::new("subscription", "main"),
            "azurerm",
        ));
        state.increment_serial();
        backend.write_state(&state).await.unwrap();

        let read = backend.read_state().await.unwrap().unwrap();
        assert_eq!(read.serial, 1);
        assert!(read.find_by_id("/subscriptions/sub1").is_some());
    }

    #[tokio::test]
    async fn write_rejects_other_lineage_and_stale_serial() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));

        let mut state = StateFile::with_lineage("lineage-a".to_string());
        state.increment_serial();
        state.increment_serial();
        backend.write_state(&state).await.unwrap();

        let other = StateFile::with_lineage("lineage-b".to_string());
        assert!(matches!(
            backend.write_state(&other).await,
            Err(BackendError::LineageMismatch { .. })
        ));

        let mut stale = state.clone();
        stale.serial = 1;
        assert!(matches!(
            backend.write_state(&stale).await,
            Err(BackendError::StaleSerial { stored: 2, actual: 1 })
        ));
    }

    #[tokio::test]
    async fn locking() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));

        let lock = backend.acquire_lock("import").await.unwrap();
        assert!(backend.lock_path().exists());
        assert!(matches!(
            backend.acquire_lock("import").await,
            Err(BackendError::Locked { .. })
        ));

        backend.release_lock(&lock).await.unwrap();
        assert!(!backend.lock_path().exists());

        let lock = backend.acquire_lock("import").await.unwrap();
        backend.release_lock(&lock).await.unwrap();
    }

    #[tokio::test]
    async fn expired_lock_is_replaced() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"))
            .with_lock_timeout(Duration::seconds(-1));

        let stale = backend.acquire_lock("import").await.unwrap();
        let lock = backend.acquire_lock("import").await.unwrap();
        assert_ne!(stale.id, lock.id);

        assert!(matches!(
            backend.release_lock(&stale).await,
            Err(BackendError::LockMismatch { .. })
        ));
        backend.release_lock(&lock).await.unwrap();
    }

    #[tokio::test]
    async fn force_unlock_checks_id() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));

        assert!(matches!(
            backend.force_unlock("missing").await,
            Err(BackendError::LockNotFound(_))
        ));

        let lock = backend.acquire_lock("import").await.unwrap();
        assert!(backend.force_unlock("other").await.is_err());
        backend.force_unlock(&lock.id).await.unwrap();
        assert!(!backend.lock_path().exists());
    }

    #[tokio::test]
    async fn init_creates_directory() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("nested/dir/test.state.json"));
        backend.init().await.unwrap();
        assert!(dir.path().join("nested/dir").is_dir());
    }

    #[test]
    fn from_config() {
        let backend = LocalBackend::from_config(&BackendConfig::new("local")).unwrap();
        assert_eq!(backend.state_path(), Path::new("nimbus.state.json"));
        assert_eq!(backend.lock_path(), Path::new("nimbus.state.lock"));

        let config = BackendConfig::new("local")
            .with_attribute("path", Value::string("prod.state.json"))
            .with_attribute("lock_timeout_secs", Value::Int(0));
        assert!(matches!(
            LocalBackend::from_config(&config),
            Err(BackendError::Configuration(_))
        ));
    }
}
