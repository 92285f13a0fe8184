// # File State Store
//
// File-based implementation of the state traits with crash recovery.
//
// ## Purpose
//
// Provides a persistent baseline across daemon restarts without an external
// database. Suitable for a single host running the monitor on a schedule.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "regions": {
//     "us-west-2": {
//       "snap-1": {
//         "identifier": "snap-1",
//         "status": "available",
//         "expires_at": "2025-01-16T12:00:00Z"
//       }
//     }
//   }
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::StateStoreConfig;
use crate::snapshot::SnapshotInfo;
use crate::state::{DEFAULT_PAGE_SIZE, Partitions, apply_batch, read_page};
use crate::traits::{Page, StateEntry, StateReader, StateStore, StateStoreFactory, StateWriter};

/// State file format version
/// Used for future migration if format changes
const STATE_FILE_VERSION: &str = "1.0";

/// File-based state store with crash recovery
///
/// This implementation persists every partition to one JSON file with atomic
/// writes and automatic corruption recovery. Each `write_batch` call is one
/// file write.
///
/// # Example
///
/// ```rust,no_run
/// use snapmon_core::state::FileStateStore;
/// use snapmon_core::traits::StateReader;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/snapmon/state.json").await?;
///
///     let page = store.query_partition("us-west-2", None).await?;
///     println!("{} known snapshot(s)", page.items.len());
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    partitions: Arc<RwLock<Partitions>>,
    page_size: usize,
}

/// Serializable state file format
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StateFileFormat {
    version: String,
    #[serde(default)]
    regions: Partitions,
}

impl FileStateStore {
    /// Create or load a file state store
    ///
    /// This will:
    /// 1. Try to load existing state file
    /// 2. If corruption detected, try to load from backup
    /// 3. If both fail, start with empty state
    /// 4. Create parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create state directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let partitions = Self::load_state_with_recovery(&path).await?;

        Ok(Self {
            path,
            partitions: Arc::new(RwLock::new(partitions)),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Return at most `page_size` entries per page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load state from file with automatic recovery
    ///
    /// Only a parse failure counts as corruption. I/O errors on the main file
    /// are returned as-is.
    async fn load_state_with_recovery(path: &Path) -> Result<Partitions, Error> {
        let error = match Self::load_state(path).await {
            Ok(partitions) => {
                tracing::debug!("Loaded state from file: {} region(s)", partitions.len());
                return Ok(partitions);
            }
            Err(Error::Json(e)) => e,
            Err(e) => return Err(e),
        };

        tracing::warn!(
            "State file {} appears corrupted: {}. Attempting recovery from backup.",
            path.display(),
            error
        );

        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            tracing::warn!("No backup file found. Starting with empty state.");
            return Ok(Partitions::new());
        }

        match Self::load_state(&backup_path).await {
            Ok(partitions) => {
                tracing::info!("Recovered state from backup: {} region(s)", partitions.len());

                if let Err(restore_err) = Self::restore_from_backup(path, &backup_path).await {
                    tracing::error!("Failed to restore state file from backup: {}", restore_err);
                }

                Ok(partitions)
            }
            Err(backup_err) => {
                tracing::error!(
                    "Backup also unreadable: {}. Starting with empty state.",
                    backup_err
                );
                Ok(Partitions::new())
            }
        }
    }

    /// Load state from file
    async fn load_state(path: &Path) -> Result<Partitions, Error> {
        if !path.exists() {
            tracing::debug!("State file does not exist: {}", path.display());
            return Ok(Partitions::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::backend(
                "file",
                format!("Failed to read state file {}: {}", path.display(), e),
            )
        })?;

        let state_file: StateFileFormat = serde_json::from_str(&content)?;

        if state_file.version != STATE_FILE_VERSION {
            tracing::warn!(
                "State file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                STATE_FILE_VERSION,
                state_file.version
            );
        }

        Ok(state_file.regions)
    }

    /// Write state to file atomically
    async fn write_state(&self, partitions: &Partitions) -> Result<(), Error> {
        let state_file = StateFileFormat {
            version: STATE_FILE_VERSION.to_string(),
            regions: partitions.clone(),
        };

        let json = serde_json::to_string_pretty(&state_file)?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::backend(
                    "file",
                    format!("Failed to create temp file {}: {}", temp_path.display(), e),
                )
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::backend(
                    "file",
                    format!("Failed to write to temp file {}: {}", temp_path.display(), e),
                )
            })?;

            file.flush().await.map_err(|e| {
                Error::backend(
                    "file",
                    format!("Failed to flush temp file {}: {}", temp_path.display(), e),
                )
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::backend(
                "file",
                format!(
                    "Failed to rename {} to {}: {}",
                    temp_path.display(),
                    self.path.display(),
                    e
                ),
            )
        })?;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    /// Restore state file from backup
    async fn restore_from_backup(path: &Path, backup_path: &Path) -> Result<(), Error> {
        fs::copy(backup_path, path).await.map_err(|e| {
            Error::backend(
                "file",
                format!(
                    "Failed to restore from backup {} to {}: {}",
                    backup_path.display(),
                    path.display(),
                    e
                ),
            )
        })?;

        tracing::info!("Restored state file from backup");
        Ok(())
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    /// Get path to backup file
    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl StateReader for FileStateStore {
    async fn query_partition(
        &self,
        region: &str,
        page_token: Option<String>,
    ) -> Result<Page<StateEntry>, Error> {
        let guard = self.partitions.read().await;
        Ok(read_page(
            guard.get(region),
            page_token.as_deref(),
            self.page_size,
            Utc::now(),
        ))
    }
}

#[async_trait]
impl StateWriter for FileStateStore {
    async fn write_batch(
        &self,
        region: &str,
        records: &[SnapshotInfo],
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        // Hold the write lock across the file write so the on-disk state
        // never lags behind a later batch.
        let mut guard = self.partitions.write().await;
        let mut next = guard.clone();
        apply_batch(&mut next, region, records, expires_at, Utc::now());

        self.write_state(&next).await?;
        *guard = next;
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "file"
    }
}

/// Factory for JSON file state stores
pub struct FileStateStoreFactory;

#[async_trait]
impl StateStoreFactory for FileStateStoreFactory {
    async fn create(&self, config: &StateStoreConfig) -> Result<Arc<dyn StateStore>, Error> {
        match config {
            StateStoreConfig::File { path } => Ok(Arc::new(FileStateStore::new(path).await?)),
            _ => Err(Error::config("Invalid config for file state store")),
        }
    }
}
