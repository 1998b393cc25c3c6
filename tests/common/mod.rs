//! Shared test helpers: counting hooks and dispatcher fixtures.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::FutureExt;

use gatehouse::action::{ActionHook, ApprovalMode, ShippingOrder};
use gatehouse::dispatcher::{DispatchEvent, EventSink, ResumeDispatcher};
use gatehouse::error::GateError;
use gatehouse::gate::ApprovalGate;
use gatehouse::store::{InMemoryPendingStore, PendingRecord, PendingStore, Resolution};
use gatehouse::types::{Request, RequestToken};

/// Records every side effect the action performs.
#[derive(Clone, Default)]
pub struct SideEffects {
    calls: Arc<Mutex<Vec<(Request, ApprovalMode)>>>,
}

impl SideEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hook(&self) -> ActionHook {
        let calls = Arc::clone(&self.calls);
        Arc::new(move |request: Request, mode: ApprovalMode| {
            calls.lock().unwrap().push((request, mode));
            async { Ok::<(), GateError>(()) }.boxed()
        })
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn modes(&self) -> Vec<ApprovalMode> {
        self.calls.lock().unwrap().iter().map(|(_, mode)| *mode).collect()
    }
}

/// A hook that fails transiently `failures` times before succeeding.
pub fn flaky_hook(failures: usize, attempts: Arc<AtomicUsize>) -> ActionHook {
    Arc::new(move |_request: Request, _mode: ApprovalMode| {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt < failures {
                Err(GateError::transient("shipping_order", "carrier unavailable"))
            } else {
                Ok(())
            }
        }
        .boxed()
    })
}

/// Collects dispatcher events.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<DispatchEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> EventSink {
        let events = Arc::clone(&self.events);
        Arc::new(move |event: DispatchEvent| events.lock().unwrap().push(event))
    }

    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().unwrap().clone()
    }
}

/// Shipping dispatcher over a fresh in-memory store at threshold 5.
pub fn shipping_dispatcher(effects: &SideEffects) -> (ResumeDispatcher, Arc<InMemoryPendingStore>) {
    let store = Arc::new(InMemoryPendingStore::new());
    let action = Arc::new(ShippingOrder::new().with_hook(effects.hook()));
    let dispatcher = ResumeDispatcher::new(
        action,
        Arc::clone(&store) as Arc<dyn PendingStore>,
        ApprovalGate::new(5),
    );
    (dispatcher, store)
}

/// In-memory store whose `resolve` can be made to fail, as a crash between
/// running the action and recording its outcome would.
#[derive(Default)]
pub struct FailingResolveStore {
    inner: InMemoryPendingStore,
    fail_resolve: AtomicBool,
}

impl FailingResolveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_resolve(&self, fail: bool) {
        self.fail_resolve.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PendingStore for FailingResolveStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn put(&self, record: PendingRecord) -> gatehouse::error::Result<()> {
        self.inner.put(record).await
    }

    async fn get(&self, token: &RequestToken) -> gatehouse::error::Result<Option<PendingRecord>> {
        self.inner.get(token).await
    }

    async fn begin_execution(
        &self,
        token: &RequestToken,
        mode: ApprovalMode,
    ) -> gatehouse::error::Result<PendingRecord> {
        self.inner.begin_execution(token, mode).await
    }

    async fn release(&self, token: &RequestToken) -> gatehouse::error::Result<PendingRecord> {
        self.inner.release(token).await
    }

    async fn resolve(
        &self,
        token: &RequestToken,
        resolution: Resolution,
    ) -> gatehouse::error::Result<PendingRecord> {
        if self.fail_resolve.load(Ordering::SeqCst) {
            return Err(GateError::Storage("disk full".into()));
        }
        self.inner.resolve(token, resolution).await
    }

    async fn remove(&self, token: &RequestToken) -> gatehouse::error::Result<bool> {
        self.inner.remove(token).await
    }

    async fn list(&self) -> gatehouse::error::Result<Vec<PendingRecord>> {
        self.inner.list().await
    }
}
