//! Process-level context: configuration plus the sessions it has opened.
//!
//! Create one [`GateContext`] at startup, pass it to whatever needs a
//! session, and call [`shutdown`](GateContext::shutdown) on the way out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::{GateConfig, StoreBackend};
use crate::dispatcher::EventSink;
use crate::error::{GateError, Result};
use crate::session::{Session, SessionManager};
use crate::store::{FilePendingStore, InMemoryPendingStore, PendingStore};

pub struct GateContext {
    config: GateConfig,
    sessions: Mutex<SessionManager>,
    event_sink: Option<EventSink>,
    shut_down: AtomicBool,
}

impl GateContext {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(SessionManager::new()),
            event_sink: None,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Receive dispatcher events from every session opened afterwards.
    pub fn with_event_sink(mut self, sink: EventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Open `session_id`, or return it if already open.
    pub async fn open_session(&self, session_id: &str) -> Result<Arc<Session>> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(GateError::SessionClosed(session_id.to_string()));
        }
        let mut sessions = self.sessions.lock().await;
        if let Some(existing) = sessions.get(session_id) {
            return Ok(existing);
        }

        let store: Arc<dyn PendingStore> = match self.config.store.backend {
            StoreBackend::Memory => Arc::new(InMemoryPendingStore::new()),
            StoreBackend::File => {
                Arc::new(FilePendingStore::open(self.config.store_dir(), session_id).await?)
            }
        };
        let session = Arc::new(Session::new(
            session_id,
            store,
            self.config.clone(),
            self.event_sink.clone(),
        ));
        sessions.insert(Arc::clone(&session));

        tracing::debug!(
            session = session_id,
            backend = %self.config.store.backend,
            "session opened"
        );
        Ok(session)
    }

    pub async fn session(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.lock().await.get(session_id)
    }

    /// Close a session. In-memory records go with it.
    pub async fn close_session(&self, session_id: &str) -> bool {
        let closed = self.sessions.lock().await.remove(session_id).is_some();
        if closed {
            tracing::debug!(session = session_id, "session closed");
        }
        closed
    }

    pub async fn session_ids(&self) -> Vec<String> {
        self.sessions
            .lock()
            .await
            .session_ids()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Close every session and refuse new ones. Returns how many were open.
    pub async fn shutdown(&self) -> usize {
        self.shut_down.store(true, Ordering::SeqCst);
        let closed = self.sessions.lock().await.clear();
        tracing::info!(sessions = closed, "gate context shut down");
        closed
    }
}

impl std::fmt::Debug for GateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateContext")
            .field("config", &self.config)
            .field("shut_down", &self.shut_down.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
