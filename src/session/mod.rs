//! Sessions: the scope that owns one pending store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::action::ApprovalAction;
use crate::config::GateConfig;
use crate::dispatcher::{self, EventSink, ResumeDispatcher};
use crate::error::{GateError, Result};
use crate::gate::ApprovalGate;
use crate::store::PendingStore;
use crate::util::locks::TokenLocks;

/// One session: a store plus the lock table shared by its dispatchers.
pub struct Session {
    id: String,
    store: Arc<dyn PendingStore>,
    locks: TokenLocks,
    config: GateConfig,
    event_sink: Option<EventSink>,
    opened_at: DateTime<Utc>,
    closed: AtomicBool,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        store: Arc<dyn PendingStore>,
        config: GateConfig,
        event_sink: Option<EventSink>,
    ) -> Self {
        Self {
            id: id.into(),
            store,
            locks: TokenLocks::new(),
            config,
            event_sink,
            opened_at: Utc::now(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn store(&self) -> &Arc<dyn PendingStore> {
        &self.store
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Build a dispatcher for `action` using this session's store and
    /// configuration.
    pub fn dispatcher(&self, action: Arc<dyn ApprovalAction>) -> Result<ResumeDispatcher> {
        if self.is_closed() {
            return Err(GateError::SessionClosed(self.id.clone()));
        }
        let gate = ApprovalGate::new(self.config.threshold_for(action.name()));
        Ok(ResumeDispatcher::new(action, Arc::clone(&self.store), gate)
            .with_locks(self.locks.clone())
            .with_retry(self.config.retry_policy())
            .with_expiry(self.config.expiry())
            .with_event_sink(self.event_sink.clone()))
    }

    /// Remove expired awaiting records across every action in the session.
    pub async fn reclaim_expired(&self) -> Result<usize> {
        if self.is_closed() {
            return Err(GateError::SessionClosed(self.id.clone()));
        }
        dispatcher::reclaim_expired(
            self.store.as_ref(),
            &self.locks,
            self.config.expiry(),
            self.event_sink.as_ref(),
        )
        .await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("persistent", &self.store.is_persistent())
            .field("opened_at", &self.opened_at)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Manages multiple named sessions.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<String, Arc<Session>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: Arc<Session>) {
        self.sessions.insert(session.id().to_string(), session);
    }

    /// Get an existing session.
    pub fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(session_id).cloned()
    }

    /// Remove and close a session.
    pub fn remove(&mut self, session_id: &str) -> Option<Arc<Session>> {
        let session = self.sessions.remove(session_id)?;
        session.close();
        Some(session)
    }

    /// Close every session. Returns how many were open.
    pub fn clear(&mut self) -> usize {
        let count = self.sessions.len();
        for (_, session) in self.sessions.drain() {
            session.close();
        }
        count
    }

    /// List session IDs.
    pub fn session_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.sessions.keys().map(|k| k.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}
