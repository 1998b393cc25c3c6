//! In-memory pending store (non-persistent).

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PendingRecord, PendingStore, RecordTable, Resolution};
use crate::action::ApprovalMode;
use crate::error::Result;
use crate::types::RequestToken;

#[derive(Clone, Default)]
pub struct InMemoryPendingStore {
    table: Arc<RwLock<RecordTable>>,
}

impl InMemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingStore for InMemoryPendingStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn put(&self, record: PendingRecord) -> Result<()> {
        self.table.write().await.insert_new(record)
    }

    async fn get(&self, token: &RequestToken) -> Result<Option<PendingRecord>> {
        Ok(self.table.read().await.get(token))
    }

    async fn begin_execution(
        &self,
        token: &RequestToken,
        mode: ApprovalMode,
    ) -> Result<PendingRecord> {
        self.table.write().await.begin_execution(token, mode)
    }

    async fn release(&self, token: &RequestToken) -> Result<PendingRecord> {
        self.table.write().await.release(token)
    }

    async fn resolve(&self, token: &RequestToken, resolution: Resolution) -> Result<PendingRecord> {
        self.table.write().await.resolve(token, resolution)
    }

    async fn remove(&self, token: &RequestToken) -> Result<bool> {
        Ok(self.table.write().await.remove(token))
    }

    async fn list(&self) -> Result<Vec<PendingRecord>> {
        Ok(self.table.read().await.list())
    }
}

impl std::fmt::Debug for InMemoryPendingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryPendingStore").finish_non_exhaustive()
    }
}
