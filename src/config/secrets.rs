// src/config/secrets.rs
//! In-memory snapshot of `config.json` (admin secret + mystery code).
//!
//! Loaded once at startup, swapped after every successful set-code, and
//! optionally reloaded when the file is edited by hand.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

use crate::error::StoreError;
use crate::model::ConfigRecord;
use crate::store::{Record, RecordStore};

#[derive(Clone, Debug)]
pub struct SecretsHandle {
    inner: Arc<RwLock<ConfigRecord>>,
}

impl SecretsHandle {
    pub fn new(record: ConfigRecord) -> Self {
        Self {
            inner: Arc::new(RwLock::new(record)),
        }
    }

    /// Read the current config record from the store.
    pub async fn load(store: &RecordStore) -> Result<Self, StoreError> {
        Ok(Self::new(store.config().await?))
    }

    /// Re-read `config.json` and swap the snapshot.
    pub async fn reload(&self, store: &RecordStore) -> Result<(), StoreError> {
        let _guard = store.lock(Record::Config).await;
        let fresh = store.config().await?;
        self.replace(fresh);
        info!(target: "config", "secrets reloaded");
        Ok(())
    }

    pub fn admin_matches(&self, candidate: &str) -> bool {
        self.read().admin_password == candidate
    }

    pub fn mystery_matches(&self, candidate: &str) -> bool {
        self.read().mystery_code == candidate
    }

    pub fn mystery_code(&self) -> String {
        self.read().mystery_code.clone()
    }

    /// Persist a new mystery code, then swap the snapshot.
    pub async fn store_mystery_code(
        &self,
        store: &RecordStore,
        new_code: &str,
    ) -> Result<(), StoreError> {
        let _guard = store.lock(Record::Config).await;
        let mut record = store.config().await?;
        record.mystery_code = new_code.to_string();
        store.write_config(&record).await?;
        self.replace(record);
        Ok(())
    }

    fn replace(&self, record: ConfigRecord) {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        *guard = record;
    }

    fn read(&self) -> RwLockReadGuard<'_, ConfigRecord> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }
}

/// Poll `path` every two seconds; when its mtime moves forward, parse it and
/// swap the snapshot. Unparseable edits are logged and skipped.
pub fn start_hot_reload_thread(handle: SecretsHandle, path: PathBuf) {
    start_hot_reload_thread_with(handle, path, Duration::from_secs(2));
}

pub(crate) fn start_hot_reload_thread_with(handle: SecretsHandle, path: PathBuf, poll: Duration) {
    info!(target: "config", path = %path.display(), "secrets hot reload enabled");
    thread::spawn(move || {
        let mut last_mtime: Option<SystemTime> = None;

        loop {
            if let Ok(mtime) = fs::metadata(&path).and_then(|m| m.modified()) {
                let changed = match last_mtime {
                    None => {
                        last_mtime = Some(mtime);
                        false
                    }
                    Some(prev) => mtime > prev,
                };
                if changed {
                    match fs::read_to_string(&path)
                        .map_err(|e| e.to_string())
                        .and_then(|s| {
                            serde_json::from_str::<ConfigRecord>(&s).map_err(|e| e.to_string())
                        }) {
                        Ok(record) => {
                            handle.replace(record);
                            info!(target: "config", "secrets reloaded from disk");
                        }
                        Err(error) => {
                            warn!(target: "config", %error, "ignoring unreadable config.json");
                        }
                    }
                    last_mtime = Some(mtime);
                }
            }
            thread::sleep(poll);
        }
    });
}
