//! Per-token async locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::RequestToken;

type LockTable = HashMap<RequestToken, LockEntry>;

struct LockEntry {
    mutex: Arc<AsyncMutex<()>>,
    /// Holders plus waiters.
    users: usize,
}

/// Serializes operations on the same token.
///
/// Clones share one table, so every dispatcher built from a session
/// contends on the same locks. Entries are dropped once nobody holds or
/// waits on them, including waiters whose future was cancelled.
#[derive(Clone, Default)]
pub struct TokenLocks {
    table: Arc<Mutex<LockTable>>,
}

impl TokenLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `token`.
    pub async fn lock(&self, token: &RequestToken) -> TokenGuard {
        let (mutex, lease) = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            let entry = table.entry(token.clone()).or_insert_with(|| LockEntry {
                mutex: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            entry.users += 1;
            let lease = Lease {
                token: token.clone(),
                table: Arc::clone(&self.table),
            };
            (Arc::clone(&entry.mutex), lease)
        };
        let guard = mutex.lock_owned().await;
        TokenGuard {
            _guard: guard,
            _lease: lease,
        }
    }

    /// Number of tokens with a live lock entry.
    pub fn active(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for TokenLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenLocks")
            .field("active", &self.active())
            .finish()
    }
}

/// Held while a token is being worked on.
pub struct TokenGuard {
    // Released before the lease so the entry is idle when it is checked.
    _guard: OwnedMutexGuard<()>,
    _lease: Lease,
}

/// One use of a table entry, from the start of the wait until release.
struct Lease {
    token: RequestToken,
    table: Arc<Mutex<LockTable>>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = match table.get_mut(&self.token) {
            Some(entry) => {
                entry.users = entry.users.saturating_sub(1);
                entry.users == 0
            }
            None => false,
        };
        if idle {
            table.remove(&self.token);
        }
    }
}
