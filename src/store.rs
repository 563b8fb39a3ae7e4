//! # Record Store
//!
//! Durable storage for the three records of the service: menu, ratings list
//! and config. Each record is an independent JSON document that is rewritten
//! whole on every mutation.
//!
//! - `Backend` is the storage seam: `FileBackend` for deployments,
//!   `MemoryBackend` for tests and throwaway instances.
//! - Writers take the per-record lock from `RecordStore::lock` for the whole
//!   read-modify-write. Reads outside a lock see the last complete write.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tokio::{fs, sync::Mutex as AsyncMutex, sync::MutexGuard};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::model::{ConfigRecord, Menu, Rating, RatingsDoc};

/// The logical records kept by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Record {
    Menu,
    Ratings,
    Config,
}

impl Record {
    pub const ALL: [Record; 3] = [Record::Menu, Record::Ratings, Record::Config];

    pub fn file_name(self) -> &'static str {
        match self {
            Record::Menu => "menu.json",
            Record::Ratings => "ratings.json",
            Record::Config => "config.json",
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Raw byte storage for whole records.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `Ok(None)` when the record was never written.
    async fn read(&self, record: Record) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the record. Must never leave a half-written record behind.
    async fn write(&self, record: Record, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Filesystem location of the record, if it has one.
    fn location(&self, _record: Record) -> Option<PathBuf> {
        None
    }
}

/// One JSON file per record inside `dir`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Create the data directory if needed.
    pub async fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::DataDir {
                path: dir.clone(),
                source,
            })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, record: Record) -> PathBuf {
        self.dir.join(record.file_name())
    }
}

#[async_trait]
impl Backend for FileBackend {
    async fn read(&self, record: Record) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.path(record)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { record, source }),
        }
    }

    async fn write(&self, record: Record, bytes: Vec<u8>) -> Result<(), StoreError> {
        // Write a sibling temp file, then rename over the target.
        let target = self.path(record);
        let tmp = self.dir.join(format!(".{}.tmp", record.file_name()));
        fs::write(&tmp, &bytes)
            .await
            .map_err(|source| StoreError::Write { record, source })?;
        fs::rename(&tmp, &target)
            .await
            .map_err(|source| StoreError::Write { record, source })?;
        debug!(target: "store", %record, bytes = bytes.len(), "record written");
        Ok(())
    }

    fn location(&self, record: Record) -> Option<PathBuf> {
        Some(self.path(record))
    }
}

/// Process-local storage; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<HashMap<Record, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn read(&self, record: Record) -> Result<Option<Vec<u8>>, StoreError> {
        let map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        Ok(map.get(&record).cloned())
    }

    async fn write(&self, record: Record, bytes: Vec<u8>) -> Result<(), StoreError> {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.insert(record, bytes);
        Ok(())
    }
}

/// Typed access to the records plus one writer lock per record.
pub struct RecordStore {
    backend: Arc<dyn Backend>,
    menu_lock: AsyncMutex<()>,
    ratings_lock: AsyncMutex<()>,
    config_lock: AsyncMutex<()>,
}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

impl RecordStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            menu_lock: AsyncMutex::new(()),
            ratings_lock: AsyncMutex::new(()),
            config_lock: AsyncMutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Exclusive writer access to one record. Hold the guard across the
    /// whole read-check-write sequence.
    pub async fn lock(&self, record: Record) -> MutexGuard<'_, ()> {
        match record {
            Record::Menu => self.menu_lock.lock().await,
            Record::Ratings => self.ratings_lock.lock().await,
            Record::Config => self.config_lock.lock().await,
        }
    }

    /// Write first-run contents for every record that does not exist yet.
    pub async fn seed(&self, config: &ConfigRecord) -> Result<(), StoreError> {
        for record in Record::ALL {
            let _guard = self.lock(record).await;
            if self.backend.read(record).await?.is_some() {
                continue;
            }
            match record {
                Record::Menu => self.put(record, &Menu::default()).await?,
                Record::Ratings => self.put(record, &RatingsDoc::default()).await?,
                Record::Config => self.put(record, config).await?,
            }
            info!(target: "store", %record, "seeded empty record");
        }
        Ok(())
    }

    pub async fn menu(&self) -> Result<Menu, StoreError> {
        self.get(Record::Menu).await
    }

    /// Caller must hold `lock(Record::Menu)`.
    pub async fn write_menu(&self, menu: &Menu) -> Result<(), StoreError> {
        self.put(Record::Menu, menu).await
    }

    pub async fn ratings(&self) -> Result<Vec<Rating>, StoreError> {
        let doc: RatingsDoc = self.get(Record::Ratings).await?;
        Ok(doc.ratings)
    }

    /// Caller must hold `lock(Record::Ratings)`.
    pub async fn write_ratings(&self, ratings: Vec<Rating>) -> Result<(), StoreError> {
        self.put(Record::Ratings, &RatingsDoc { ratings }).await
    }

    pub async fn config(&self) -> Result<ConfigRecord, StoreError> {
        self.get(Record::Config).await
    }

    /// Caller must hold `lock(Record::Config)`.
    pub async fn write_config(&self, config: &ConfigRecord) -> Result<(), StoreError> {
        self.put(Record::Config, config).await
    }

    async fn get<T: DeserializeOwned + Default>(&self, record: Record) -> Result<T, StoreError> {
        match self.backend.read(record).await? {
            None => Ok(T::default()),
            Some(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(T::default()),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|source| StoreError::Decode { record, source }),
        }
    }

    async fn put<T: Serialize + ?Sized>(&self, record: Record, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|source| StoreError::Encode { record, source })?;
        self.backend.write(record, bytes).await
    }
}
