//! Pending-request storage with pluggable backends.
//!
//! Supports:
//! - `memory`: in-memory records, gone when the owning session closes
//! - `file`: one JSON snapshot per session, survives process restarts

mod file;
mod memory;

pub use file::FilePendingStore;
pub use memory::InMemoryPendingStore;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::action::ApprovalMode;
use crate::error::{GateError, Result};
use crate::types::{Decision, Outcome, Request, RequestToken, ResultStatus, ToolResult};

/// Lifecycle phase of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordPhase {
    New,
    AwaitingConfirmation,
    /// The action was started and its outcome is not recorded yet.
    Executing,
    Resolved,
}

/// Terminal result attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
    pub message: String,
    /// Present when a human decided; absent for auto-approvals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RecordState {
    Awaiting,
    /// Claimed before the action runs. An executing record never runs its
    /// action again.
    Executing {
        mode: ApprovalMode,
        started_at: DateTime<Utc>,
    },
    Resolved(Resolution),
}

/// What the store holds for one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRecord {
    pub request: Request,
    /// Message returned while the request is paused.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub state: RecordState,
}

impl PendingRecord {
    pub fn awaiting(request: Request, message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            request,
            message: message.into(),
            hint,
            state: RecordState::Awaiting,
        }
    }

    pub fn executing(request: Request, message: impl Into<String>, mode: ApprovalMode) -> Self {
        Self {
            request,
            message: message.into(),
            hint: None,
            state: RecordState::Executing {
                mode,
                started_at: Utc::now(),
            },
        }
    }

    pub fn resolved(request: Request, resolution: Resolution) -> Self {
        Self {
            request,
            message: resolution.message.clone(),
            hint: None,
            state: RecordState::Resolved(resolution),
        }
    }

    pub fn token(&self) -> &RequestToken {
        &self.request.token
    }

    pub fn phase(&self) -> RecordPhase {
        match self.state {
            RecordState::Awaiting => RecordPhase::AwaitingConfirmation,
            RecordState::Executing { .. } => RecordPhase::Executing,
            RecordState::Resolved(_) => RecordPhase::Resolved,
        }
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        match &self.state {
            RecordState::Resolved(resolution) => Some(resolution),
            _ => None,
        }
    }

    /// Awaiting records older than `ttl` are expired. Resolved records never expire.
    pub fn is_expired(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        let Some(ttl) = ttl else {
            return false;
        };
        if !matches!(self.state, RecordState::Awaiting) {
            return false;
        }
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now - self.request.created_at > ttl,
            Err(_) => false,
        }
    }

    /// Result the caller sees for this record's current state.
    pub fn to_result(&self) -> ToolResult {
        let token = self.request.token.to_string();
        match &self.state {
            RecordState::Awaiting | RecordState::Executing { .. } => ToolResult {
                status: ResultStatus::Pending,
                outcome: Outcome::Pending,
                token,
                result_id: None,
                message: self.message.clone(),
                hint: self.hint.clone(),
            },
            RecordState::Resolved(resolution) => ToolResult {
                status: resolution.outcome.status(),
                outcome: resolution.outcome,
                token,
                result_id: resolution.result_id.clone(),
                message: resolution.message.clone(),
                hint: None,
            },
        }
    }
}

/// Storage for paused requests, keyed by token.
#[async_trait]
pub trait PendingStore: Send + Sync {
    /// Whether records survive a process restart.
    fn is_persistent(&self) -> bool;

    /// Register a record. Fails with `Conflict` if the token is taken.
    async fn put(&self, record: PendingRecord) -> Result<()>;

    /// Look a token up. `None` means not found.
    async fn get(&self, token: &RequestToken) -> Result<Option<PendingRecord>>;

    /// Move an awaiting record to executing before its action runs.
    ///
    /// `NotFound` for unknown tokens, `Conflict` unless the record is awaiting.
    async fn begin_execution(&self, token: &RequestToken, mode: ApprovalMode)
        -> Result<PendingRecord>;

    /// Move an executing record back to awaiting after its action failed.
    async fn release(&self, token: &RequestToken) -> Result<PendingRecord>;

    /// Move an awaiting or executing record to resolved.
    ///
    /// `NotFound` for unknown tokens, `Conflict` if already resolved.
    async fn resolve(&self, token: &RequestToken, resolution: Resolution) -> Result<PendingRecord>;

    /// Drop a record. Returns whether it existed.
    async fn remove(&self, token: &RequestToken) -> Result<bool>;

    async fn list(&self) -> Result<Vec<PendingRecord>>;
}

/// Token-keyed table shared by the backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct RecordTable {
    records: HashMap<RequestToken, PendingRecord>,
}

impl RecordTable {
    pub(crate) fn insert_new(&mut self, record: PendingRecord) -> Result<()> {
        if let Some(existing) = self.records.get(record.token()) {
            let reason = match existing.phase() {
                RecordPhase::Resolved => "token already resolved",
                RecordPhase::Executing => "token is being executed",
                _ => "token already awaiting confirmation",
            };
            return Err(GateError::conflict(record.token().as_str(), reason));
        }
        self.records.insert(record.token().clone(), record);
        Ok(())
    }

    pub(crate) fn get(&self, token: &RequestToken) -> Option<PendingRecord> {
        self.records.get(token).cloned()
    }

    pub(crate) fn begin_execution(
        &mut self,
        token: &RequestToken,
        mode: ApprovalMode,
    ) -> Result<PendingRecord> {
        let record = self.awaiting_mut(token)?;
        record.state = RecordState::Executing {
            mode,
            started_at: Utc::now(),
        };
        Ok(record.clone())
    }

    pub(crate) fn release(&mut self, token: &RequestToken) -> Result<PendingRecord> {
        let record = self
            .records
            .get_mut(token)
            .ok_or_else(|| GateError::not_found(token.as_str()))?;
        if record.phase() != RecordPhase::Executing {
            return Err(GateError::conflict(token.as_str(), "token is not executing"));
        }
        record.state = RecordState::Awaiting;
        Ok(record.clone())
    }

    fn awaiting_mut(&mut self, token: &RequestToken) -> Result<&mut PendingRecord> {
        let record = self
            .records
            .get_mut(token)
            .ok_or_else(|| GateError::not_found(token.as_str()))?;
        match record.phase() {
            RecordPhase::AwaitingConfirmation => Ok(record),
            RecordPhase::Executing => Err(GateError::conflict(
                token.as_str(),
                "token is being executed",
            )),
            _ => Err(GateError::conflict(token.as_str(), "token already resolved")),
        }
    }

    pub(crate) fn resolve(
        &mut self,
        token: &RequestToken,
        resolution: Resolution,
    ) -> Result<PendingRecord> {
        let record = self
            .records
            .get_mut(token)
            .ok_or_else(|| GateError::not_found(token.as_str()))?;
        if record.phase() == RecordPhase::Resolved {
            return Err(GateError::conflict(token.as_str(), "token already resolved"));
        }
        record.state = RecordState::Resolved(resolution);
        Ok(record.clone())
    }

    pub(crate) fn remove(&mut self, token: &RequestToken) -> bool {
        self.records.remove(token).is_some()
    }

    pub(crate) fn list(&self) -> Vec<PendingRecord> {
        let mut records: Vec<PendingRecord> = self.records.values().cloned().collect();
        records.sort_by(|a, b| a.request.created_at.cmp(&b.request.created_at));
        records
    }
}
