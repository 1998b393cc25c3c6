//! JSON file-backed pending store.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use super::{PendingRecord, PendingStore, RecordTable, Resolution};
use crate::action::ApprovalMode;
use crate::error::{GateError, Result};
use crate::types::RequestToken;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreSnapshot {
    version: u32,
    session: String,
    saved_at: DateTime<Utc>,
    records: RecordTable,
}

/// Snapshot file plus the advisory lock file guarding it.
#[derive(Debug)]
struct SnapshotFile {
    path: PathBuf,
    lock_path: PathBuf,
    session: String,
}

impl SnapshotFile {
    /// Lock held until the returned handle is dropped.
    fn lock(&self, exclusive: bool) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        if exclusive {
            FileExt::lock_exclusive(&file)?;
        } else {
            FileExt::lock_shared(&file)?;
        }
        Ok(file)
    }

    fn load(&self) -> Result<RecordTable> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(RecordTable::default())
            }
            Err(err) => return Err(err.into()),
        };
        let snapshot: StoreSnapshot = serde_json::from_slice(&bytes).map_err(|e| {
            GateError::Storage(format!("corrupt snapshot {}: {e}", self.path.display()))
        })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(GateError::Storage(format!(
                "unsupported snapshot version {} in {}",
                snapshot.version,
                self.path.display()
            )));
        }
        Ok(snapshot.records)
    }

    fn save(&self, table: &RecordTable) -> Result<()> {
        let snapshot = StoreSnapshot {
            version: SNAPSHOT_VERSION,
            session: self.session.clone(),
            saved_at: Utc::now(),
            records: table.clone(),
        };
        let data = serde_json::to_vec_pretty(&snapshot)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Pending store persisted as one JSON snapshot per session.
///
/// Every operation locks the session's lock file and works on a fresh load
/// of the snapshot, so any number of stores (in this process or others) can
/// share one session. Mutations hold the lock exclusively and write the
/// snapshot (temp file + rename) before releasing it.
#[derive(Clone)]
pub struct FilePendingStore {
    file: Arc<SnapshotFile>,
}

impl FilePendingStore {
    /// Open (or create) the snapshot for `session` under `base_dir`.
    pub async fn open(base_dir: impl AsRef<Path>, session: &str) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        tokio::fs::create_dir_all(base_dir).await?;
        let label = normalize_label(session);
        let store = Self {
            file: Arc::new(SnapshotFile {
                path: base_dir.join(format!("pending-{label}.json")),
                lock_path: base_dir.join(format!("pending-{label}.lock")),
                session: session.to_string(),
            }),
        };

        let records = store.read(|table| table.list().len()).await?;
        tracing::debug!(
            path = %store.path().display(),
            session,
            records,
            "opened pending store"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    /// Run `op` on the current snapshot under a shared lock.
    async fn read<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&RecordTable) -> T + Send + 'static,
    {
        let file = Arc::clone(&self.file);
        blocking(move || {
            let _lock = file.lock(false)?;
            let table = file.load()?;
            Ok(op(&table))
        })
        .await
    }

    /// Apply `op` to the current snapshot under an exclusive lock and persist
    /// the result. Nothing is written when `op` fails.
    async fn mutate<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut RecordTable) -> Result<T> + Send + 'static,
    {
        let file = Arc::clone(&self.file);
        blocking(move || {
            let _lock = file.lock(true)?;
            let mut table = file.load()?;
            let value = op(&mut table)?;
            file.save(&table)?;
            Ok(value)
        })
        .await
    }
}

async fn blocking<T, F>(op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| GateError::Storage(format!("store task failed: {e}")))?
}

#[async_trait]
impl PendingStore for FilePendingStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn put(&self, record: PendingRecord) -> Result<()> {
        self.mutate(move |table| table.insert_new(record)).await
    }

    async fn get(&self, token: &RequestToken) -> Result<Option<PendingRecord>> {
        let token = token.clone();
        self.read(move |table| table.get(&token)).await
    }

    async fn begin_execution(
        &self,
        token: &RequestToken,
        mode: ApprovalMode,
    ) -> Result<PendingRecord> {
        let token = token.clone();
        self.mutate(move |table| table.begin_execution(&token, mode))
            .await
    }

    async fn release(&self, token: &RequestToken) -> Result<PendingRecord> {
        let token = token.clone();
        self.mutate(move |table| table.release(&token)).await
    }

    async fn resolve(&self, token: &RequestToken, resolution: Resolution) -> Result<PendingRecord> {
        let token = token.clone();
        self.mutate(move |table| table.resolve(&token, resolution))
            .await
    }

    async fn remove(&self, token: &RequestToken) -> Result<bool> {
        let token = token.clone();
        self.mutate(move |table| {
            if table.remove(&token) {
                Ok(true)
            } else {
                Err(GateError::not_found(token.as_str()))
            }
        })
        .await
        .or_else(|err| match err {
            GateError::NotFound { .. } => Ok(false),
            other => Err(other),
        })
    }

    async fn list(&self) -> Result<Vec<PendingRecord>> {
        self.read(|table| table.list()).await
    }
}

impl std::fmt::Debug for FilePendingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePendingStore")
            .field("path", &self.file.path)
            .field("session", &self.file.session)
            .finish()
    }
}

/// Lowercase, `[a-z0-9-]` only; blank labels become `default`.
pub(crate) fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    let out: String = trimmed
        .chars()
        .map(|ch| {
            let lower = ch.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '-' {
                lower
            } else {
                '-'
            }
        })
        .collect();
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}
